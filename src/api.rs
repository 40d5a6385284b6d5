use std::path::Path;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;

use crate::config::Settings;
use crate::error::OsdrError;
use crate::fs_util;
use crate::query;

/// Blocking HTTP boundary to the OSDR API. One request is in flight at a
/// time; callers own retry decisions.
pub trait OsdrClient: Send + Sync {
    /// Fails with `OsdrError::Connectivity` when the API root is unreachable.
    fn check_connectivity(&self) -> Result<(), OsdrError>;

    /// GET `url` and decode the body as JSON. Errors are API-class.
    fn get_json(&self, url: &str) -> Result<Value, OsdrError>;

    /// Stream the body of `url` into `destination`, returning bytes written.
    fn download_to(&self, url: &str, destination: &Path) -> Result<u64, OsdrError>;
}

#[derive(Clone)]
pub struct OsdrHttpClient {
    client: Client,
    settings: Settings,
}

impl OsdrHttpClient {
    pub fn new(settings: Settings) -> Result<Self, OsdrError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("osdr-dl/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| OsdrError::ApiHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| OsdrError::ApiHttp(err.to_string()))?;
        Ok(Self { client, settings })
    }

    fn error_message(response: Response, fallback: &str) -> String {
        response
            .text()
            .ok()
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}

impl OsdrClient for OsdrHttpClient {
    fn check_connectivity(&self) -> Result<(), OsdrError> {
        let url = query::connectivity_url(&self.settings.api_base_url);
        tracing::debug!(%url, "checking API connectivity");
        let response = self
            .client
            .get(&url)
            .timeout(self.settings.connect_timeout)
            .send()
            .map_err(|err| OsdrError::Connectivity(err.to_string()))?;
        if !response.status().is_success() {
            return Err(OsdrError::Connectivity(format!(
                "{url} returned status {}",
                response.status().as_u16()
            )));
        }
        Ok(())
    }

    fn get_json(&self, url: &str) -> Result<Value, OsdrError> {
        tracing::debug!(%url, "metadata request");
        let response = self
            .client
            .get(url)
            .timeout(self.settings.query_timeout)
            .send()
            .map_err(|err| OsdrError::ApiHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = Self::error_message(response, "OSDR metadata request failed");
            return Err(OsdrError::ApiStatus { status, message });
        }
        response
            .json()
            .map_err(|err| OsdrError::UnexpectedResponse(err.to_string()))
    }

    fn download_to(&self, url: &str, destination: &Path) -> Result<u64, OsdrError> {
        tracing::debug!(%url, destination = %destination.display(), "download request");
        let mut response = self
            .client
            .get(url)
            .timeout(self.settings.download_timeout)
            .send()
            .map_err(|err| OsdrError::DownloadHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = Self::error_message(response, "OSDR file request failed");
            return Err(OsdrError::DownloadStatus { status, message });
        }
        fs_util::write_stream_atomic(&mut response, destination)
    }
}
