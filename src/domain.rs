use std::fmt;
use std::ops::AddAssign;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::error::OsdrError;

/// Raw record keys requested from the metadata endpoint.
pub const FIELD_FILE_NAME: &str = "file.file_name";
pub const FIELD_DATA_TYPE: &str = "file.data_type";
pub const FIELD_FILE_SIZE: &str = "file.file_size";
pub const FIELD_REMOTE_URL: &str = "file.remote_url";
pub const FIELD_CATEGORY: &str = "file.category";
pub const FIELD_PROTOCOL_REF: &str = "assay.protocol ref";
pub const FIELD_MEASUREMENT_TYPE: &str = "investigation.study assays.study assay measurement type";
pub const FIELD_TECHNOLOGY_TYPE: &str = "investigation.study assays.study assay technology type";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OsdAccession(String);

impl OsdAccession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OsdAccession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OsdAccession {
    type Err = OsdrError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let is_valid = value
            .strip_prefix("OSD-")
            .map(|digits| !digits.is_empty() && digits.chars().all(|ch| ch.is_ascii_digit()))
            .unwrap_or(false);
        if !is_valid {
            return Err(OsdrError::InvalidAccession(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }
}

/// User-selected query filters. Built once per run and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    accession: OsdAccession,
    measurement: Option<String>,
    technology: Option<String>,
    include_ext: Option<String>,
    exclude_ext: Option<String>,
    processed_only: bool,
}

impl FilterSpec {
    /// Blank strings count as absent. Fails when the include and exclude
    /// extensions are the same (case-insensitive).
    pub fn new(
        accession: OsdAccession,
        measurement: Option<String>,
        technology: Option<String>,
        include_ext: Option<String>,
        exclude_ext: Option<String>,
    ) -> Result<Self, OsdrError> {
        let include_ext = non_blank(include_ext);
        let exclude_ext = non_blank(exclude_ext);
        if let (Some(include), Some(exclude)) = (&include_ext, &exclude_ext) {
            if include.to_lowercase() == exclude.to_lowercase() {
                return Err(OsdrError::ConflictingExtensions(include.clone()));
            }
        }
        Ok(Self {
            accession,
            measurement: non_blank(measurement),
            technology: non_blank(technology),
            include_ext,
            exclude_ext,
            processed_only: false,
        })
    }

    pub fn for_accession(accession: OsdAccession) -> Self {
        Self {
            accession,
            measurement: None,
            technology: None,
            include_ext: None,
            exclude_ext: None,
            processed_only: false,
        }
    }

    pub fn with_processed_only(mut self, processed_only: bool) -> Self {
        self.processed_only = processed_only;
        self
    }

    /// Same accession and extension filters, pinned to one discovered pair.
    pub fn for_pair(&self, pair: &MeasurementTechPair) -> Self {
        Self {
            measurement: Some(pair.measurement.clone()),
            technology: Some(pair.technology.clone()),
            ..self.clone()
        }
    }

    pub fn accession(&self) -> &OsdAccession {
        &self.accession
    }

    pub fn measurement(&self) -> Option<&str> {
        self.measurement.as_deref()
    }

    pub fn technology(&self) -> Option<&str> {
        self.technology.as_deref()
    }

    pub fn include_ext(&self) -> Option<&str> {
        self.include_ext.as_deref()
    }

    pub fn exclude_ext(&self) -> Option<&str> {
        self.exclude_ext.as_deref()
    }

    pub fn processed_only(&self) -> bool {
        self.processed_only
    }

    pub fn has_extension_filter(&self) -> bool {
        self.include_ext.is_some() || self.exclude_ext.is_some()
    }

    /// Client-side check mirroring the extension filters sent to the API.
    pub fn accepts_filename(&self, filename: &str) -> bool {
        let lower = filename.to_lowercase();
        if let Some(ext) = &self.include_ext {
            if !lower.ends_with(&format!(".{}", ext.to_lowercase())) {
                return false;
            }
        }
        if let Some(ext) = &self.exclude_ext {
            if lower.ends_with(&format!(".{}", ext.to_lowercase())) {
                return false;
            }
        }
        true
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// One file entry from the metadata endpoint. Missing text fields are
/// empty strings; missing size and remote URL are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub filename: String,
    pub data_type: String,
    pub file_size_bytes: Option<u64>,
    pub category: String,
    pub protocol_ref: String,
    pub remote_url: Option<String>,
}

impl FileRecord {
    pub fn from_json(raw: &Value) -> Self {
        Self {
            filename: text_field(raw, FIELD_FILE_NAME),
            data_type: text_field(raw, FIELD_DATA_TYPE),
            file_size_bytes: raw.get(FIELD_FILE_SIZE).and_then(size_value),
            category: text_field(raw, FIELD_CATEGORY),
            protocol_ref: text_field(raw, FIELD_PROTOCOL_REF),
            remote_url: raw
                .get(FIELD_REMOTE_URL)
                .and_then(|v| v.as_str())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        }
    }
}

fn text_field(raw: &Value, key: &str) -> String {
    raw.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

fn size_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MeasurementTechPair {
    pub measurement: String,
    pub technology: String,
}

impl MeasurementTechPair {
    pub fn new(measurement: impl Into<String>, technology: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            technology: technology.into(),
        }
    }

    pub fn default_pair() -> Self {
        Self::new("transcription profiling", "RNA sequencing")
    }
}

impl fmt::Display for MeasurementTechPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.measurement, self.technology)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DownloadStats {
    pub total: usize,
    pub downloaded: usize,
    pub failed: usize,
    pub processed: usize,
}

impl DownloadStats {
    pub fn raw(&self) -> usize {
        self.total.saturating_sub(self.processed)
    }
}

impl AddAssign for DownloadStats {
    fn add_assign(&mut self, other: Self) {
        self.total += other.total;
        self.downloaded += other.downloaded;
        self.failed += other.failed;
        self.processed += other.processed;
    }
}
