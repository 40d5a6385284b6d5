use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum OsdrError {
    #[error("invalid OSD accession: {0} (expected OSD-<digits>, e.g. OSD-101)")]
    InvalidAccession(String),

    #[error("--ext and --exclude-ext cannot be the same extension: {0}")]
    ConflictingExtensions(String),

    #[error("cannot connect to OSDR API: {0}")]
    Connectivity(String),

    #[error("OSDR API request failed: {0}")]
    ApiHttp(String),

    #[error("OSDR API returned status {status}: {message}")]
    ApiStatus { status: u16, message: String },

    #[error("OSDR API error: {0}")]
    Api(String),

    #[error("unexpected OSDR API response: {0}")]
    UnexpectedResponse(String),

    #[error("download request failed: {0}")]
    DownloadHttp(String),

    #[error("download returned status {status}: {message}")]
    DownloadStatus { status: u16, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),
}
