use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::OsdrError;

pub const DEFAULT_API_BASE_URL: &str = "https://visualization.osdr.nasa.gov/biodata/api/v2";
pub const DEFAULT_SITE_URL: &str = "https://visualization.osdr.nasa.gov";
pub const DEFAULT_PROCESSED_DIR: &str = "GeneLab_processed_data_files";
pub const DEFAULT_CONFIG_FILE: &str = "osdr-dl.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub site_url: Option<String>,
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    #[serde(default)]
    pub query_timeout_secs: Option<u64>,
    #[serde(default)]
    pub download_timeout_secs: Option<u64>,
    #[serde(default)]
    pub processed_dir_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    /// Host prefixed onto relative `file.remote_url` values.
    pub site_url: String,
    pub connect_timeout: Duration,
    pub query_timeout: Duration,
    pub download_timeout: Duration,
    pub processed_dir_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            site_url: DEFAULT_SITE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            query_timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(60),
            processed_dir_name: DEFAULT_PROCESSED_DIR.to_string(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// An explicit path must exist; the implicit `osdr-dl.json` is optional.
    /// `OSDR_API_URL` and `OSDR_SITE_URL` override whatever the file says.
    pub fn resolve(path: Option<&str>) -> Result<Settings, OsdrError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config = if path.is_none() && !config_path.exists() {
            ConfigFile::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| OsdrError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content).map_err(|err| OsdrError::ConfigParse(err.to_string()))?
        };

        let mut settings = Self::resolve_config(config)?;
        if let Some(value) = env_override("OSDR_API_URL") {
            settings.api_base_url = trim_url(&value);
        }
        if let Some(value) = env_override("OSDR_SITE_URL") {
            settings.site_url = trim_url(&value);
        }
        Ok(settings)
    }

    pub fn resolve_config(config: ConfigFile) -> Result<Settings, OsdrError> {
        let defaults = Settings::default();

        let processed_dir_name = match config.processed_dir_name {
            Some(name) if name.trim().is_empty() || name.contains(['/', '\\']) => {
                return Err(OsdrError::ConfigParse(format!(
                    "processed_dir_name must be a single non-empty path segment, got {name:?}"
                )));
            }
            Some(name) => name,
            None => defaults.processed_dir_name,
        };

        Ok(Settings {
            api_base_url: config
                .api_base_url
                .map(|value| trim_url(&value))
                .unwrap_or(defaults.api_base_url),
            site_url: config
                .site_url
                .map(|value| trim_url(&value))
                .unwrap_or(defaults.site_url),
            connect_timeout: timeout(config.connect_timeout_secs, defaults.connect_timeout)?,
            query_timeout: timeout(config.query_timeout_secs, defaults.query_timeout)?,
            download_timeout: timeout(config.download_timeout_secs, defaults.download_timeout)?,
            processed_dir_name,
        })
    }
}

fn timeout(value: Option<u64>, default: Duration) -> Result<Duration, OsdrError> {
    match value {
        Some(0) => Err(OsdrError::ConfigParse(
            "timeouts must be at least one second".to_string(),
        )),
        Some(secs) => Ok(Duration::from_secs(secs)),
        None => Ok(default),
    }
}

fn env_override(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn trim_url(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let settings = ConfigLoader::resolve_config(ConfigFile::default()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn config_overrides_and_trims_urls() {
        let config: ConfigFile = serde_json::from_str(
            r#"{"api_base_url": "http://127.0.0.1:8080/api/", "download_timeout_secs": 300}"#,
        )
        .unwrap();
        let settings = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(settings.api_base_url, "http://127.0.0.1:8080/api");
        assert_eq!(settings.download_timeout, Duration::from_secs(300));
        assert_eq!(settings.query_timeout, Duration::from_secs(30));
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = ConfigFile {
            query_timeout_secs: Some(0),
            ..ConfigFile::default()
        };
        let err = ConfigLoader::resolve_config(config).unwrap_err();
        assert_matches!(err, OsdrError::ConfigParse(_));
    }

    #[test]
    fn nested_processed_dir_rejected() {
        let config = ConfigFile {
            processed_dir_name: Some("a/b".to_string()),
            ..ConfigFile::default()
        };
        let err = ConfigLoader::resolve_config(config).unwrap_err();
        assert_matches!(err, OsdrError::ConfigParse(_));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = ConfigLoader::resolve(Some("/nonexistent/osdr-dl.json")).unwrap_err();
        assert_matches!(err, OsdrError::ConfigRead(_));
    }
}
