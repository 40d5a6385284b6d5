//! Finds the (measurement, technology) assay pairs a study exposes.
//!
//! Discovery never fails: transport or parse problems fall back to the
//! default transcription-profiling pair.

use serde::Serialize;
use serde_json::Value;

use crate::api::OsdrClient;
use crate::domain::{
    FIELD_DATA_TYPE, FIELD_FILE_NAME, FIELD_MEASUREMENT_TYPE, FIELD_TECHNOLOGY_TYPE,
    MeasurementTechPair, OsdAccession,
};
use crate::error::OsdrError;
use crate::metadata::unwrap_records;
use crate::query;

/// Where a discovered pair list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoverySource {
    Assays,
    Inferred,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub pairs: Vec<MeasurementTechPair>,
    pub source: DiscoverySource,
}

struct InferenceRule {
    matches: fn(&str, &str) -> bool,
    measurement: &'static str,
    technology: &'static str,
}

// Evaluated top to bottom, first hit wins. Arguments are the lowercased
// filename and data type.
const INFERENCE_RULES: &[InferenceRule] = &[
    InferenceRule {
        matches: is_rna_seq,
        measurement: "transcription profiling",
        technology: "RNA sequencing",
    },
    InferenceRule {
        matches: is_rna,
        measurement: "transcription profiling",
        technology: "RNA-Seq",
    },
    InferenceRule {
        matches: is_microarray,
        measurement: "transcription profiling",
        technology: "microarray",
    },
    InferenceRule {
        matches: is_proteomics,
        measurement: "protein expression profiling",
        technology: "mass spectrometry",
    },
];

fn is_rna_seq(filename: &str, data_type: &str) -> bool {
    is_rna(filename, data_type) && (filename.contains("seq") || data_type.contains("seq"))
}

fn is_rna(filename: &str, data_type: &str) -> bool {
    filename.contains("rna") || data_type.contains("rna")
}

fn is_microarray(filename: &str, data_type: &str) -> bool {
    filename.contains("microarray") || data_type.contains("microarray")
}

fn is_proteomics(filename: &str, data_type: &str) -> bool {
    filename.contains("proteom") || data_type.contains("mass")
}

/// Always returns at least one pair, in first-seen order without duplicates.
pub fn discover<C: OsdrClient>(client: &C, base_url: &str, accession: &OsdAccession) -> Discovery {
    match try_discover(client, base_url, accession) {
        Ok(Some(discovery)) => discovery,
        Ok(None) => default_discovery(),
        Err(err) => {
            tracing::warn!(
                %accession,
                error = %err,
                "could not discover measurement/technology combinations"
            );
            default_discovery()
        }
    }
}

fn try_discover<C: OsdrClient>(
    client: &C,
    base_url: &str,
    accession: &OsdAccession,
) -> Result<Option<Discovery>, OsdrError> {
    let body = client.get_json(&query::combinations_query_url(base_url, accession))?;
    let records = unwrap_records(body)?;
    tracing::debug!(%accession, count = records.len(), "assay metadata records");
    let pairs = pairs_from_assays(&records);
    if !pairs.is_empty() {
        return Ok(Some(Discovery {
            pairs,
            source: DiscoverySource::Assays,
        }));
    }

    let body = client.get_json(&query::inference_query_url(base_url, accession))?;
    let records = unwrap_records(body)?;
    let pairs = infer_pairs(&records);
    if pairs.is_empty() {
        return Ok(None);
    }
    tracing::info!(%accession, "inferred measurement/technology combinations from file names");
    Ok(Some(Discovery {
        pairs,
        source: DiscoverySource::Inferred,
    }))
}

fn default_discovery() -> Discovery {
    Discovery {
        pairs: vec![MeasurementTechPair::default_pair()],
        source: DiscoverySource::Default,
    }
}

pub fn pairs_from_assays(records: &[Value]) -> Vec<MeasurementTechPair> {
    let mut pairs = Vec::new();
    for record in records {
        let measurement = assay_value(record, FIELD_MEASUREMENT_TYPE);
        let technology = assay_value(record, FIELD_TECHNOLOGY_TYPE);
        if let (Some(measurement), Some(technology)) = (measurement, technology) {
            push_unique(&mut pairs, MeasurementTechPair::new(measurement, technology));
        }
    }
    pairs
}

pub fn infer_pairs(records: &[Value]) -> Vec<MeasurementTechPair> {
    let mut pairs = Vec::new();
    for record in records {
        let filename = lowercase_field(record, FIELD_FILE_NAME);
        let data_type = lowercase_field(record, FIELD_DATA_TYPE);
        if let Some(pair) = infer_pair(&filename, &data_type) {
            push_unique(&mut pairs, pair);
        }
    }
    pairs
}

/// Expects lowercased inputs.
pub fn infer_pair(filename: &str, data_type: &str) -> Option<MeasurementTechPair> {
    INFERENCE_RULES
        .iter()
        .find(|rule| (rule.matches)(filename, data_type))
        .map(|rule| MeasurementTechPair::new(rule.measurement, rule.technology))
}

fn assay_value<'a>(record: &'a Value, key: &str) -> Option<&'a str> {
    record
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|v| !v.is_empty() && *v != "null")
}

fn lowercase_field(record: &Value, key: &str) -> String {
    record
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_lowercase()
}

fn push_unique(pairs: &mut Vec<MeasurementTechPair>, pair: MeasurementTechPair) {
    if !pairs.contains(&pair) {
        pairs.push(pair);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn assay_pairs_skip_null_and_duplicates() {
        let records = vec![
            json!({FIELD_MEASUREMENT_TYPE: "transcription profiling", FIELD_TECHNOLOGY_TYPE: "RNA Sequencing (RNA-Seq)"}),
            json!({FIELD_MEASUREMENT_TYPE: "transcription profiling", FIELD_TECHNOLOGY_TYPE: "RNA Sequencing (RNA-Seq)"}),
            json!({FIELD_MEASUREMENT_TYPE: "null", FIELD_TECHNOLOGY_TYPE: "microarray"}),
            json!({FIELD_MEASUREMENT_TYPE: "metabolite profiling"}),
            json!({FIELD_MEASUREMENT_TYPE: "protein expression profiling", FIELD_TECHNOLOGY_TYPE: "mass spectrometry"}),
        ];
        let pairs = pairs_from_assays(&records);
        assert_eq!(
            pairs,
            vec![
                MeasurementTechPair::new("transcription profiling", "RNA Sequencing (RNA-Seq)"),
                MeasurementTechPair::new("protein expression profiling", "mass spectrometry"),
            ]
        );
    }

    #[test]
    fn inference_rules_apply_in_order() {
        assert_eq!(
            infer_pair("glds-1_rna_seq_reads.fastq.gz", ""),
            Some(MeasurementTechPair::new("transcription profiling", "RNA sequencing"))
        );
        assert_eq!(
            infer_pair("glds-1_rna_counts.csv", ""),
            Some(MeasurementTechPair::new("transcription profiling", "RNA-Seq"))
        );
        // rna outranks the mass-spectrometry rule even when both match.
        assert_eq!(
            infer_pair("sample.raw", "rna mass"),
            Some(MeasurementTechPair::new("transcription profiling", "RNA-Seq"))
        );
        assert_eq!(
            infer_pair("glds-2_microarray.cel", ""),
            Some(MeasurementTechPair::new("transcription profiling", "microarray"))
        );
        assert_eq!(
            infer_pair("glds-3_proteomics.raw", ""),
            Some(MeasurementTechPair::new("protein expression profiling", "mass spectrometry"))
        );
        assert_eq!(infer_pair("readme.txt", "document"), None);
    }

    #[test]
    fn proteom_only_checked_in_filename_and_mass_only_in_data_type() {
        assert_eq!(infer_pair("notes.txt", "proteomics"), None);
        assert_eq!(infer_pair("mass_table.csv", ""), None);
        assert!(infer_pair("table.csv", "mass spec").is_some());
    }

    #[test]
    fn inferred_pairs_are_lowercased_and_unique() {
        let records = vec![
            json!({FIELD_FILE_NAME: "GLDS-1_RNA_Seq_R1.fastq.gz"}),
            json!({FIELD_FILE_NAME: "GLDS-1_rna_seq_R2.fastq.gz"}),
            json!({FIELD_FILE_NAME: "GLDS-1_Microarray.CEL"}),
        ];
        let pairs = infer_pairs(&records);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].technology, "RNA sequencing");
        assert_eq!(pairs[1].technology, "microarray");
    }
}
