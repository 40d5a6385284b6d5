use std::path::Path;

use crate::api::OsdrClient;
use crate::domain::FileRecord;
use crate::error::OsdrError;
use crate::query;

#[derive(Debug)]
pub enum DownloadOutcome {
    Primary { bytes: u64 },
    Fallback { bytes: u64, primary_error: OsdrError },
    Failed {
        primary_error: OsdrError,
        fallback_error: Option<OsdrError>,
    },
}

impl DownloadOutcome {
    pub fn succeeded(&self) -> bool {
        !matches!(self, DownloadOutcome::Failed { .. })
    }
}

/// Fetches one file through the data endpoint, retrying once through the
/// record's `file.remote_url` when that fails.
pub struct Downloader<'a, C: OsdrClient> {
    client: &'a C,
    base_url: &'a str,
    site_url: &'a str,
}

impl<'a, C: OsdrClient> Downloader<'a, C> {
    pub fn new(client: &'a C, base_url: &'a str, site_url: &'a str) -> Self {
        Self {
            client,
            base_url,
            site_url,
        }
    }

    pub fn download(&self, filename: &str, destination: &Path, record: &FileRecord) -> bool {
        self.attempt(filename, destination, record).succeeded()
    }

    pub fn attempt(
        &self,
        filename: &str,
        destination: &Path,
        record: &FileRecord,
    ) -> DownloadOutcome {
        let primary_url = query::file_download_url(self.base_url, filename);
        let primary_error = match self.client.download_to(&primary_url, destination) {
            Ok(bytes) => return DownloadOutcome::Primary { bytes },
            Err(err) => err,
        };
        tracing::debug!(filename, error = %primary_error, "primary download failed");

        let Some(remote_url) = record.remote_url.as_deref().filter(|url| !url.is_empty()) else {
            return DownloadOutcome::Failed {
                primary_error,
                fallback_error: None,
            };
        };

        let fallback_url = query::remote_fallback_url(self.site_url, remote_url);
        match self.client.download_to(&fallback_url, destination) {
            Ok(bytes) => DownloadOutcome::Fallback {
                bytes,
                primary_error,
            },
            Err(err) => DownloadOutcome::Failed {
                primary_error,
                fallback_error: Some(err),
            },
        }
    }
}
