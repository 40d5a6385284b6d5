use std::collections::HashSet;

use serde::Serialize;

use crate::api::OsdrClient;
use crate::classify;
use crate::config::Settings;
use crate::discover::{self, DiscoverySource};
use crate::domain::{DownloadStats, FileRecord, FilterSpec, MeasurementTechPair, OsdAccession};
use crate::download::{DownloadOutcome, Downloader};
use crate::error::OsdrError;
use crate::layout::OutputLayout;
use crate::metadata::MetadataClient;
use crate::output::format_size;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Report matching files without downloading them.
    pub list_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Warn,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub level: EventLevel,
    pub message: String,
}

impl ProgressEvent {
    fn info(message: impl Into<String>) -> Self {
        Self {
            level: EventLevel::Info,
            message: message.into(),
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            level: EventLevel::Warn,
            message: message.into(),
        }
    }
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// How the set of passes was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Measurement and technology both given: a single pass.
    Explicit,
    /// Measurement only: every discovered technology for it.
    Measurement,
    /// No measurement: every discovered pair.
    All,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppliedFilters {
    pub measurement: Option<String>,
    pub technology: Option<String>,
    pub include_ext: Option<String>,
    pub exclude_ext: Option<String>,
    pub processed_only: bool,
}

impl From<&FilterSpec> for AppliedFilters {
    fn from(spec: &FilterSpec) -> Self {
        Self {
            measurement: spec.measurement().map(str::to_string),
            technology: spec.technology().map(str::to_string),
            include_ext: spec.include_ext().map(str::to_string),
            exclude_ext: spec.exclude_ext().map(str::to_string),
            processed_only: spec.processed_only(),
        }
    }
}

impl AppliedFilters {
    pub fn is_empty(&self) -> bool {
        self.measurement.is_none()
            && self.technology.is_none()
            && self.include_ext.is_none()
            && self.exclude_ext.is_none()
            && !self.processed_only
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub pair: MeasurementTechPair,
    pub stats: DownloadStats,
    pub duplicates_removed: usize,
    pub filtered_out: usize,
    pub failed_files: Vec<FailedFile>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub accession: String,
    pub output_dir: String,
    pub processed_dir_name: String,
    pub list_only: bool,
    pub mode: RunMode,
    pub discovery: Option<DiscoverySource>,
    pub filters: AppliedFilters,
    pub stats: DownloadStats,
    pub raw_files: usize,
    pub passes: Vec<PassReport>,
    pub finished_at: String,
}

/// Result of classifying (and optionally downloading) one pass's records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessResult {
    pub stats: DownloadStats,
    pub duplicates_removed: usize,
    pub failed_files: Vec<FailedFile>,
}

pub struct App<C: OsdrClient> {
    client: C,
    settings: Settings,
    layout: OutputLayout,
}

impl<C: OsdrClient> App<C> {
    pub fn new(client: C, settings: Settings, layout: OutputLayout) -> Self {
        Self {
            client,
            settings,
            layout,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Runs every pass selected by `spec`. Only the initial connectivity
    /// check can fail the run; query and download failures are reported
    /// through `sink` and counted.
    pub fn run(
        &self,
        spec: &FilterSpec,
        options: RunOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunReport, OsdrError> {
        sink.event(ProgressEvent::info("Testing API connectivity..."));
        self.client.check_connectivity()?;
        sink.event(ProgressEvent::info("API connectivity test passed"));

        let (mode, discovery, pairs) = self.plan(spec, sink);

        let mut stats = DownloadStats::default();
        let mut passes = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let pass = self.run_pass(spec, &pair, options, sink);
            stats += pass.stats;
            passes.push(pass);
        }

        Ok(RunReport {
            accession: spec.accession().to_string(),
            output_dir: self.layout.root().to_string(),
            processed_dir_name: self.layout.processed_dir_name().to_string(),
            list_only: options.list_only,
            mode,
            discovery,
            filters: AppliedFilters::from(spec),
            stats,
            raw_files: stats.raw(),
            passes,
            finished_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    fn plan(
        &self,
        spec: &FilterSpec,
        sink: &dyn ProgressSink,
    ) -> (RunMode, Option<DiscoverySource>, Vec<MeasurementTechPair>) {
        match (spec.measurement(), spec.technology()) {
            (Some(measurement), Some(technology)) => (
                RunMode::Explicit,
                None,
                vec![MeasurementTechPair::new(measurement, technology)],
            ),
            (Some(measurement), None) => {
                let discovery = self.discover(spec.accession(), sink);
                let wanted = measurement.to_lowercase();
                let pairs: Vec<_> = discovery
                    .pairs
                    .into_iter()
                    .filter(|pair| pair.measurement.to_lowercase() == wanted)
                    .collect();
                if pairs.is_empty() {
                    sink.event(ProgressEvent::warn(format!(
                        "No technology types found for measurement '{measurement}' in {}",
                        spec.accession()
                    )));
                }
                (RunMode::Measurement, Some(discovery.source), pairs)
            }
            (None, technology) => {
                if let Some(technology) = technology {
                    tracing::warn!(
                        technology,
                        "technology filter without a measurement is ignored; processing all combinations"
                    );
                    sink.event(ProgressEvent::warn(format!(
                        "--tech '{technology}' needs --measurement; processing all combinations"
                    )));
                }
                let discovery = self.discover(spec.accession(), sink);
                (RunMode::All, Some(discovery.source), discovery.pairs)
            }
        }
    }

    fn discover(&self, accession: &OsdAccession, sink: &dyn ProgressSink) -> discover::Discovery {
        sink.event(ProgressEvent::info(format!(
            "Discovering available data for {accession}..."
        )));
        let discovery = discover::discover(&self.client, &self.settings.api_base_url, accession);
        if discovery.source == DiscoverySource::Default {
            sink.event(ProgressEvent::warn(format!(
                "Could not determine measurement/technology combinations for {accession}; using {}",
                MeasurementTechPair::default_pair()
            )));
        }
        let listed = discovery
            .pairs
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        sink.event(ProgressEvent::info(format!(
            "Discovered measurement/technology combinations: {listed}"
        )));
        discovery
    }

    fn run_pass(
        &self,
        spec: &FilterSpec,
        pair: &MeasurementTechPair,
        options: RunOptions,
        sink: &dyn ProgressSink,
    ) -> PassReport {
        sink.event(ProgressEvent::info(format!("Processing {pair}...")));
        tracing::info!(%pair, "pass started");

        let metadata = MetadataClient::new(&self.client, &self.settings.api_base_url);
        let records = match metadata.query(&spec.for_pair(pair)) {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(%pair, error = %err, "pass skipped");
                sink.event(ProgressEvent::warn(format!("Error processing {pair}: {err}")));
                return PassReport {
                    pair: pair.clone(),
                    stats: DownloadStats::default(),
                    duplicates_removed: 0,
                    filtered_out: 0,
                    failed_files: Vec::new(),
                    error: Some(err.to_string()),
                };
            }
        };
        sink.event(ProgressEvent::info(format!("Found {} files", records.len())));

        let before = records.len();
        let records: Vec<FileRecord> = records
            .into_iter()
            .filter(|record| spec.accepts_filename(&record.filename))
            .collect();
        let filtered_out = before - records.len();
        if spec.has_extension_filter() && filtered_out > 0 {
            sink.event(ProgressEvent::info(format!(
                "Filtered {before} files to {} by extension",
                records.len()
            )));
        }

        let result = self.process_files(records, pair, options.list_only, sink);
        tracing::info!(
            %pair,
            total = result.stats.total,
            downloaded = result.stats.downloaded,
            failed = result.stats.failed,
            "pass finished"
        );
        PassReport {
            pair: pair.clone(),
            stats: result.stats,
            duplicates_removed: result.duplicates_removed,
            filtered_out,
            failed_files: result.failed_files,
            error: None,
        }
    }

    /// De-duplicates by filename (first occurrence wins), classifies each
    /// record and either lists or downloads it.
    pub fn process_files(
        &self,
        records: Vec<FileRecord>,
        pair: &MeasurementTechPair,
        list_only: bool,
        sink: &dyn ProgressSink,
    ) -> ProcessResult {
        let mut result = ProcessResult::default();
        if records.is_empty() {
            sink.event(ProgressEvent::info("No files found matching the criteria."));
            return result;
        }

        let (unique, duplicates_removed) = dedupe_by_filename(records);
        result.duplicates_removed = duplicates_removed;
        if duplicates_removed > 0 {
            sink.event(ProgressEvent::info(format!(
                "Removed {duplicates_removed} duplicate file entries"
            )));
        }

        let heading = if list_only {
            "Files available for"
        } else {
            "Downloading files for"
        };
        sink.event(ProgressEvent::info(format!("{heading} {pair}:")));

        let downloader = Downloader::new(
            &self.client,
            &self.settings.api_base_url,
            &self.settings.site_url,
        );

        for record in &unique {
            result.stats.total += 1;
            let processed = classify::classify_record(record).is_some();
            if processed {
                result.stats.processed += 1;
            }
            sink.event(ProgressEvent::info(listing_line(record, processed)));

            if list_only {
                continue;
            }

            let destination = match self.layout.file_path(pair, processed, &record.filename) {
                Ok(path) => path,
                Err(err) => {
                    result.stats.failed += 1;
                    sink.event(ProgressEvent::warn(format!(
                        "  ✗ Failed to download {}: {err}",
                        record.filename
                    )));
                    result.failed_files.push(FailedFile {
                        filename: record.filename.clone(),
                        error: err.to_string(),
                    });
                    continue;
                }
            };

            let outcome = downloader.attempt(&record.filename, destination.as_std_path(), record);
            if outcome.succeeded() {
                result.stats.downloaded += 1;
            } else {
                result.stats.failed += 1;
            }
            if let Some(error) = report_outcome(&record.filename, &outcome, sink) {
                result.failed_files.push(FailedFile {
                    filename: record.filename.clone(),
                    error,
                });
            }
        }

        result
    }
}

/// Keeps the first record per filename; nameless records are dropped.
/// Returns the survivors and the number of duplicates removed.
pub fn dedupe_by_filename(records: Vec<FileRecord>) -> (Vec<FileRecord>, usize) {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(records.len());
    let mut duplicates = 0;
    for record in records {
        if record.filename.is_empty() {
            tracing::debug!("skipping metadata record without a file name");
            continue;
        }
        if seen.insert(record.filename.clone()) {
            unique.push(record);
        } else {
            duplicates += 1;
        }
    }
    (unique, duplicates)
}

fn listing_line(record: &FileRecord, processed: bool) -> String {
    let marker = if processed { "[GeneLab]" } else { "[Raw]    " };
    let data_type = if record.data_type.is_empty() {
        "Unknown"
    } else {
        record.data_type.as_str()
    };
    format!(
        "{marker} {} ({}) - {data_type}",
        record.filename,
        format_size(record.file_size_bytes)
    )
}

/// Emits the per-file progress line. Returns the failure cause, if any.
fn report_outcome(
    filename: &str,
    outcome: &DownloadOutcome,
    sink: &dyn ProgressSink,
) -> Option<String> {
    match outcome {
        DownloadOutcome::Primary { .. } => {
            sink.event(ProgressEvent::info(format!("  ✓ Downloaded: {filename}")));
            None
        }
        DownloadOutcome::Fallback { primary_error, .. } => {
            tracing::warn!(filename, error = %primary_error, "data endpoint failed; used remote URL");
            sink.event(ProgressEvent::info(format!(
                "  ✓ Downloaded via alternative URL: {filename}"
            )));
            None
        }
        DownloadOutcome::Failed {
            primary_error,
            fallback_error,
        } => {
            let cause = match fallback_error {
                Some(fallback) => {
                    format!("{primary_error}; alternative URL also failed: {fallback}")
                }
                None => primary_error.to_string(),
            };
            tracing::warn!(filename, error = %cause, "download failed");
            sink.event(ProgressEvent::warn(format!(
                "  ✗ Failed to download {filename}: {cause}"
            )));
            Some(cause)
        }
    }
}
