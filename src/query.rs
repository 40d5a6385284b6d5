//! URL construction for the OSDR biodata API.
//!
//! Field specifiers and filter values are percent-encoded, except the
//! file-name extension filters, which carry regex metacharacters the API
//! must receive verbatim.

use std::borrow::Cow;

use crate::domain::{
    FIELD_CATEGORY, FIELD_DATA_TYPE, FIELD_FILE_NAME, FIELD_FILE_SIZE, FIELD_MEASUREMENT_TYPE,
    FIELD_PROTOCOL_REF, FIELD_REMOTE_URL, FIELD_TECHNOLOGY_TYPE, FilterSpec, OsdAccession,
};

const RESPONSE_FORMAT: &str = "format=json.records";

/// Fields every file query asks for, in request order.
const FILE_FIELDS: &[&str] = &[
    FIELD_FILE_NAME,
    FIELD_DATA_TYPE,
    FIELD_FILE_SIZE,
    FIELD_REMOTE_URL,
    FIELD_CATEGORY,
    FIELD_PROTOCOL_REF,
];

const PROCESSED_CATEGORY_FILTER: &str = "file.category=/GeneLab%20Processed%20.*%20Files/";

pub fn connectivity_url(base_url: &str) -> String {
    format!("{base_url}/datasets/")
}

/// Builds the file metadata query for `spec`.
pub fn metadata_query_url(base_url: &str, spec: &FilterSpec) -> String {
    let mut encoded_parts = vec![accession_part(spec.accession())];
    encoded_parts.extend(FILE_FIELDS.iter().map(|field| encode_field(field).into_owned()));
    encoded_parts.push(RESPONSE_FORMAT.to_string());

    if spec.processed_only() {
        encoded_parts.push(PROCESSED_CATEGORY_FILTER.to_string());
    }
    if let Some(measurement) = spec.measurement() {
        encoded_parts.push(regex_filter(FIELD_MEASUREMENT_TYPE, measurement));
    }
    if let Some(technology) = spec.technology() {
        encoded_parts.push(regex_filter(FIELD_TECHNOLOGY_TYPE, technology));
    }

    let mut regex_parts = Vec::new();
    if let Some(ext) = spec.include_ext() {
        regex_parts.push(format!("{FIELD_FILE_NAME}=/\\.{ext}$/"));
    }
    if let Some(ext) = spec.exclude_ext() {
        regex_parts.push(format!("{FIELD_FILE_NAME}!=/\\.{ext}$/"));
    }

    encoded_parts.extend(regex_parts);
    format!("{base_url}/query/metadata/?{}", encoded_parts.join("&"))
}

/// Asks only for the assay measurement and technology columns.
pub fn combinations_query_url(base_url: &str, accession: &OsdAccession) -> String {
    let parts = [
        accession_part(accession),
        encode_field(FIELD_MEASUREMENT_TYPE).into_owned(),
        encode_field(FIELD_TECHNOLOGY_TYPE).into_owned(),
        RESPONSE_FORMAT.to_string(),
    ];
    format!("{base_url}/query/metadata/?{}", parts.join("&"))
}

/// File names and data types only, used to guess assay pairs.
pub fn inference_query_url(base_url: &str, accession: &OsdAccession) -> String {
    let parts = [
        accession_part(accession),
        encode_field(FIELD_FILE_NAME).into_owned(),
        encode_field(FIELD_DATA_TYPE).into_owned(),
        RESPONSE_FORMAT.to_string(),
    ];
    format!("{base_url}/query/metadata/?{}", parts.join("&"))
}

pub fn file_download_url(base_url: &str, filename: &str) -> String {
    format!(
        "{base_url}/query/data/?{FIELD_FILE_NAME}={}",
        urlencoding::encode(filename)
    )
}

/// Absolute URL for a stored `file.remote_url`; relative values are
/// resolved against `site_url`.
pub fn remote_fallback_url(site_url: &str, remote_url: &str) -> String {
    if remote_url.starts_with("http") {
        return remote_url.to_string();
    }
    if remote_url.starts_with('/') {
        format!("{site_url}{remote_url}")
    } else {
        format!("{site_url}/{remote_url}")
    }
}

/// Parentheses become `.*` so a label such as `RNA sequencing (Illumina)`
/// matches the API's stored value without escaping.
pub fn wildcard_pattern(value: &str) -> String {
    value.replace(['(', ')'], ".*")
}

fn accession_part(accession: &OsdAccession) -> String {
    format!("id.accession={}", urlencoding::encode(accession.as_str()))
}

fn encode_field(field: &str) -> Cow<'_, str> {
    urlencoding::encode(field)
}

fn regex_filter(field: &str, value: &str) -> String {
    format!(
        "{}=/{}/",
        encode_field(field),
        urlencoding::encode(&wildcard_pattern(value))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://visualization.osdr.nasa.gov/biodata/api/v2";

    fn spec(
        measurement: Option<&str>,
        technology: Option<&str>,
        include: Option<&str>,
        exclude: Option<&str>,
    ) -> FilterSpec {
        FilterSpec::new(
            "OSD-101".parse().unwrap(),
            measurement.map(str::to_string),
            technology.map(str::to_string),
            include.map(str::to_string),
            exclude.map(str::to_string),
        )
        .unwrap()
    }

    #[test]
    fn unfiltered_query_lists_every_file() {
        let url = metadata_query_url(BASE, &spec(None, None, None, None));
        assert_eq!(
            url,
            format!(
                "{BASE}/query/metadata/?id.accession=OSD-101&file.file_name&file.data_type\
                 &file.file_size&file.remote_url&file.category&assay.protocol%20ref\
                 &format=json.records"
            )
        );
    }

    #[test]
    fn include_extension_is_not_encoded() {
        let url = metadata_query_url(BASE, &spec(None, None, Some("csv"), None));
        assert!(url.contains(r"file.file_name=/\.csv$/"));
        assert!(url.ends_with(r"&file.file_name=/\.csv$/"));
    }

    #[test]
    fn exclude_extension_follows_include() {
        let url = metadata_query_url(BASE, &spec(None, None, Some("csv"), Some("tar.gz")));
        assert!(url.ends_with(r"file.file_name=/\.csv$/&file.file_name!=/\.tar.gz$/"));
    }

    #[test]
    fn parentheses_become_wildcards_before_encoding() {
        let url = metadata_query_url(
            BASE,
            &spec(Some("transcription profiling (RNA)"), None, None, None),
        );
        assert!(!url.contains('('));
        assert!(!url.contains(')'));
        assert!(url.contains(
            "investigation.study%20assays.study%20assay%20measurement%20type\
             =/transcription%20profiling%20.%2ARNA.%2A/"
        ));
    }

    #[test]
    fn technology_filter_precedes_extension_filters() {
        let url = metadata_query_url(BASE, &spec(Some("x"), Some("RNA-Seq"), Some("csv"), None));
        let tech = url
            .find("investigation.study%20assays.study%20assay%20technology%20type=/RNA-Seq/")
            .unwrap();
        let ext = url.find("file.file_name=/").unwrap();
        assert!(tech < ext);
    }

    #[test]
    fn processed_only_adds_category_filter() {
        let url = metadata_query_url(
            BASE,
            &spec(None, None, None, None).with_processed_only(true),
        );
        assert!(url.contains("&file.category=/GeneLab%20Processed%20.*%20Files/"));
    }

    #[test]
    fn discovery_urls() {
        let acc: OsdAccession = "OSD-48".parse().unwrap();
        assert_eq!(
            combinations_query_url(BASE, &acc),
            format!(
                "{BASE}/query/metadata/?id.accession=OSD-48\
                 &investigation.study%20assays.study%20assay%20measurement%20type\
                 &investigation.study%20assays.study%20assay%20technology%20type\
                 &format=json.records"
            )
        );
        assert_eq!(
            inference_query_url(BASE, &acc),
            format!("{BASE}/query/metadata/?id.accession=OSD-48&file.file_name&file.data_type&format=json.records")
        );
    }

    #[test]
    fn download_url_encodes_filename() {
        assert_eq!(
            file_download_url(BASE, "GLDS-1 raw#1.fastq.gz"),
            format!("{BASE}/query/data/?file.file_name=GLDS-1%20raw%231.fastq.gz")
        );
    }

    #[test]
    fn fallback_url_prefixes_relative_paths() {
        let site = "https://visualization.osdr.nasa.gov";
        assert_eq!(
            remote_fallback_url(site, "/geode-py/ws/studies/OSD-101/download?file=a.csv"),
            format!("{site}/geode-py/ws/studies/OSD-101/download?file=a.csv")
        );
        assert_eq!(
            remote_fallback_url(site, "https://example.org/a.csv"),
            "https://example.org/a.csv"
        );
    }
}
