use serde_json::Value;

use crate::api::OsdrClient;
use crate::domain::{FileRecord, FilterSpec};
use crate::error::OsdrError;
use crate::query;

/// Runs file metadata queries and turns the loosely shaped JSON answer
/// into `FileRecord`s.
pub struct MetadataClient<'a, C: OsdrClient> {
    client: &'a C,
    base_url: &'a str,
}

impl<'a, C: OsdrClient> MetadataClient<'a, C> {
    pub fn new(client: &'a C, base_url: &'a str) -> Self {
        Self { client, base_url }
    }

    pub fn query(&self, spec: &FilterSpec) -> Result<Vec<FileRecord>, OsdrError> {
        let url = query::metadata_query_url(self.base_url, spec);
        let body = self.client.get_json(&url)?;
        let records = parse_file_records(body)?;
        tracing::debug!(count = records.len(), accession = %spec.accession(), "metadata records");
        Ok(records)
    }
}

pub fn parse_file_records(body: Value) -> Result<Vec<FileRecord>, OsdrError> {
    Ok(unwrap_records(body)?
        .iter()
        .map(FileRecord::from_json)
        .collect())
}

/// Accepts a bare array, or an object with a `data` array. An object with
/// an `error` key, or any other shape, is an error.
pub fn unwrap_records(body: Value) -> Result<Vec<Value>, OsdrError> {
    let data = match body {
        Value::Object(mut map) => {
            if let Some(error) = map.get("error") {
                let message = match error {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                return Err(OsdrError::Api(message));
            }
            match map.remove("data") {
                Some(data) => data,
                None => {
                    return Err(OsdrError::UnexpectedResponse(
                        "object without `data` or `error` field".to_string(),
                    ));
                }
            }
        }
        other => other,
    };

    match data {
        Value::Array(items) => Ok(items),
        other => Err(OsdrError::UnexpectedResponse(format!(
            "expected a list of records, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn bare_array_is_accepted() {
        let records = parse_file_records(json!([
            {"file.file_name": "a.csv", "file.file_size": 10},
            {"file.file_name": "b.csv"}
        ]))
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].file_size_bytes, Some(10));
        assert_eq!(records[1].file_size_bytes, None);
    }

    #[test]
    fn data_envelope_is_unwrapped() {
        let records = parse_file_records(json!({"data": [{"file.file_name": "a.csv"}]})).unwrap();
        assert_eq!(records[0].filename, "a.csv");
    }

    #[test]
    fn error_key_wins_over_data() {
        let err = parse_file_records(json!({"error": "no such dataset", "data": []})).unwrap_err();
        assert_matches!(err, OsdrError::Api(message) if message == "no such dataset");
    }

    #[test]
    fn object_without_data_is_unexpected() {
        let err = parse_file_records(json!({"rows": []})).unwrap_err();
        assert_matches!(err, OsdrError::UnexpectedResponse(_));
    }

    #[test]
    fn non_array_data_is_unexpected() {
        let err = parse_file_records(json!({"data": "nope"})).unwrap_err();
        assert_matches!(err, OsdrError::UnexpectedResponse(_));

        let err = parse_file_records(json!("nope")).unwrap_err();
        assert_matches!(err, OsdrError::UnexpectedResponse(_));
    }
}
