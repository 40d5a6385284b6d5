//! Splits study files into GeneLab-processed outputs and raw data.
//!
//! Signals are checked in a fixed order and the first hit decides. The
//! protocol reference and category are authoritative; filename patterns
//! and data-type keywords only apply when neither says "processed".

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::domain::FileRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessedSignal {
    ProtocolRef,
    Category,
    FilenamePattern,
    DataType,
}

const FILENAME_PATTERNS: &[&str] = &[
    r"^GLDS-\d+_.*_(unnormalized|normalized|differential).*counts",
    r"^GLDS-\d+_.*_differential_expression",
    r"^GLDS-\d+_.*_(VST|RSEM|STAR)_.*counts",
    r"^GLDS-\d+_.*_contrasts",
    r"^GLDS-\d+_.*_sampletable",
];

const DATA_TYPE_KEYWORDS: &[&str] = &[
    "unnormalized counts",
    "normalized counts",
    "differential expression",
    "sample table",
    "differential expression contrasts",
];

static FILENAME_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    FILENAME_PATTERNS
        .iter()
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .expect("processed filename patterns are valid")
        })
        .collect()
});

/// Returns the first signal marking the file as processed, or `None` for raw data.
pub fn processed_signal(
    filename: &str,
    data_type: &str,
    category: &str,
    protocol_ref: &str,
) -> Option<ProcessedSignal> {
    let protocol = protocol_ref.to_lowercase();
    if protocol.contains("genelab") && protocol.contains("data processing protocol") {
        return Some(ProcessedSignal::ProtocolRef);
    }

    let category = category.to_lowercase();
    if category.contains("genelab processed") && category.contains("files") {
        return Some(ProcessedSignal::Category);
    }

    if FILENAME_REGEXES.iter().any(|regex| regex.is_match(filename)) {
        return Some(ProcessedSignal::FilenamePattern);
    }

    let data_type = data_type.to_lowercase();
    if DATA_TYPE_KEYWORDS
        .iter()
        .any(|keyword| data_type.contains(keyword))
    {
        return Some(ProcessedSignal::DataType);
    }

    None
}

pub fn classify(filename: &str, data_type: &str, category: &str, protocol_ref: &str) -> bool {
    processed_signal(filename, data_type, category, protocol_ref).is_some()
}

pub fn classify_record(record: &FileRecord) -> Option<ProcessedSignal> {
    processed_signal(
        &record.filename,
        &record.data_type,
        &record.category,
        &record.protocol_ref,
    )
}
