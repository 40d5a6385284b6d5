#![allow(dead_code)]

use std::path::Path;
use std::sync::Mutex;

use serde_json::{Value, json};

use osdr_downloader::api::OsdrClient;
use osdr_downloader::app::{ProgressEvent, ProgressSink};
use osdr_downloader::error::OsdrError;
use osdr_downloader::fs_util;

pub const BASE_URL: &str = "https://osdr.test/api";
pub const SITE_URL: &str = "https://osdr.test";

/// Canned OSDR API. JSON queries are routed by shape: file queries ask for
/// `file.remote_url`, inference queries ask for `file.file_name` only, and
/// everything else is the assay combinations query.
pub struct MockOsdr {
    online: bool,
    combinations: Result<Value, String>,
    inference: Result<Value, String>,
    files: Vec<(String, Result<Value, String>)>,
    downloads: Vec<(String, Vec<u8>)>,
    pub json_calls: Mutex<Vec<String>>,
    pub download_calls: Mutex<Vec<String>>,
    pub connectivity_checks: Mutex<usize>,
}

impl MockOsdr {
    pub fn online() -> Self {
        Self {
            online: true,
            combinations: Ok(json!({"data": []})),
            inference: Ok(json!({"data": []})),
            files: Vec::new(),
            downloads: Vec::new(),
            json_calls: Mutex::new(Vec::new()),
            download_calls: Mutex::new(Vec::new()),
            connectivity_checks: Mutex::new(0),
        }
    }

    pub fn offline() -> Self {
        Self {
            online: false,
            ..Self::online()
        }
    }

    pub fn with_combinations(mut self, body: Value) -> Self {
        self.combinations = Ok(body);
        self
    }

    pub fn with_failing_combinations(mut self) -> Self {
        self.combinations = Err("combinations unavailable".to_string());
        self
    }

    pub fn with_inference(mut self, body: Value) -> Self {
        self.inference = Ok(body);
        self
    }

    /// File query answer for URLs containing `needle`.
    pub fn with_files(mut self, needle: &str, body: Value) -> Self {
        self.files.push((needle.to_string(), Ok(body)));
        self
    }

    pub fn with_failing_files(mut self, needle: &str) -> Self {
        self.files
            .push((needle.to_string(), Err("internal server error".to_string())));
        self
    }

    /// Downloads of URLs containing `needle` succeed with `body`; all
    /// others answer 404.
    pub fn with_download(mut self, needle: &str, body: &[u8]) -> Self {
        self.downloads.push((needle.to_string(), body.to_vec()));
        self
    }

    pub fn json_calls(&self) -> Vec<String> {
        self.json_calls.lock().unwrap().clone()
    }

    pub fn file_queries(&self) -> Vec<String> {
        self.json_calls()
            .into_iter()
            .filter(|url| url.contains("file.remote_url"))
            .collect()
    }

    pub fn download_calls(&self) -> Vec<String> {
        self.download_calls.lock().unwrap().clone()
    }

    fn answer(result: &Result<Value, String>) -> Result<Value, OsdrError> {
        result.clone().map_err(|message| OsdrError::ApiStatus {
            status: 500,
            message,
        })
    }
}

impl OsdrClient for MockOsdr {
    fn check_connectivity(&self) -> Result<(), OsdrError> {
        *self.connectivity_checks.lock().unwrap() += 1;
        if self.online {
            Ok(())
        } else {
            Err(OsdrError::Connectivity("connection refused".to_string()))
        }
    }

    fn get_json(&self, url: &str) -> Result<Value, OsdrError> {
        self.json_calls.lock().unwrap().push(url.to_string());
        if url.contains("file.remote_url") {
            return self
                .files
                .iter()
                .find(|(needle, _)| url.contains(needle.as_str()))
                .map(|(_, result)| Self::answer(result))
                .unwrap_or_else(|| Ok(json!({"data": []})));
        }
        if url.contains("file.file_name") {
            return Self::answer(&self.inference);
        }
        Self::answer(&self.combinations)
    }

    fn download_to(&self, url: &str, destination: &Path) -> Result<u64, OsdrError> {
        self.download_calls.lock().unwrap().push(url.to_string());
        match self
            .downloads
            .iter()
            .find(|(needle, _)| url.contains(needle.as_str()))
        {
            Some((_, body)) => fs_util::write_stream_atomic(&mut body.as_slice(), destination),
            None => Err(OsdrError::DownloadStatus {
                status: 404,
                message: "not found".to_string(),
            }),
        }
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|event| event.message.clone())
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn file_record(filename: &str) -> Value {
    json!({
        "file.file_name": filename,
        "file.data_type": "",
        "file.file_size": 1024,
        "file.category": "",
        "assay.protocol ref": "",
        "file.remote_url": "",
    })
}
