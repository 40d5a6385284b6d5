use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

use crate::domain::{MeasurementTechPair, OsdAccession};
use crate::error::OsdrError;

/// On-disk layout of a run:
/// `<root>/<measurement>_<technology>/` for raw files and
/// `<root>/<measurement>_<technology>/<processed dir>/` for processed ones.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: Utf8PathBuf,
    processed_dir_name: String,
}

impl OutputLayout {
    pub fn new(root: Utf8PathBuf, processed_dir_name: impl Into<String>) -> Self {
        Self {
            root,
            processed_dir_name: processed_dir_name.into(),
        }
    }

    pub fn default_root(accession: &OsdAccession) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("osdr_downloads_{accession}"))
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn processed_dir_name(&self) -> &str {
        &self.processed_dir_name
    }

    pub fn pair_dir(&self, pair: &MeasurementTechPair) -> Utf8PathBuf {
        self.root.join(pair_dir_name(pair))
    }

    pub fn processed_dir(&self, pair: &MeasurementTechPair) -> Utf8PathBuf {
        self.pair_dir(pair).join(&self.processed_dir_name)
    }

    /// Destination for `filename`. Names that are not a single plain path
    /// component are rejected.
    pub fn file_path(
        &self,
        pair: &MeasurementTechPair,
        processed: bool,
        filename: &str,
    ) -> Result<Utf8PathBuf, OsdrError> {
        let mut components = Utf8Path::new(filename).components();
        match (components.next(), components.next()) {
            (Some(Utf8Component::Normal(name)), None) if !name.contains('\\') => {
                let dir = if processed {
                    self.processed_dir(pair)
                } else {
                    self.pair_dir(pair)
                };
                Ok(dir.join(name))
            }
            _ => Err(OsdrError::Filesystem(format!(
                "refusing unsafe file name from API: {filename:?}"
            ))),
        }
    }
}

/// `transcription profiling` + `RNA-Seq` -> `transcription_profiling_RNA_Seq`.
pub fn pair_dir_name(pair: &MeasurementTechPair) -> String {
    format!("{}_{}", pair.measurement, pair.technology).replace([' ', '-', '/', '\\'], "_")
}
