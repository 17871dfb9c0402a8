// src/ingest/providers/json_file.rs
//! JSON news fixtures: either a top-level array of records or `{ "news": [...] }`.

use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::IngestError;
use crate::ingest::types::{NewsItem, NewsRecord, NewsSource};
use crate::ingest::{read_bounded, MAX_SOURCE_BYTES};

pub struct JsonNewsSource {
    mode: Mode,
}

enum Mode {
    File(PathBuf),
    // Owned copy so callers can hand over request bodies or decoded buffers.
    Inline { label: String, content: String },
}

impl JsonNewsSource {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self {
            mode: Mode::File(path.as_ref().to_path_buf()),
        }
    }

    /// `label` names the content in error messages.
    pub fn from_fixture_str(label: &str, content: &str) -> Self {
        Self {
            mode: Mode::Inline {
                label: label.to_string(),
                content: content.to_string(),
            },
        }
    }

    fn parse_items_from_str(origin: &str, s: &str) -> Result<Vec<NewsItem>, IngestError> {
        let parse_err = |message: String| IngestError::Parse {
            origin: origin.to_string(),
            message,
        };

        let doc: Value = serde_json::from_str(s).map_err(|e| parse_err(e.to_string()))?;
        let records = match doc {
            Value::Array(v) => v,
            Value::Object(mut obj) => match obj.remove("news") {
                Some(Value::Array(v)) => v,
                _ => {
                    return Err(parse_err(
                        "expected an array of records or an object with a `news` array".into(),
                    ))
                }
            },
            _ => {
                return Err(parse_err(
                    "expected an array of records or an object with a `news` array".into(),
                ))
            }
        };

        let mut out = Vec::with_capacity(records.len());
        for (i, raw) in records.into_iter().enumerate() {
            if !raw.is_object() {
                return Err(parse_err(format!("record {i}: expected an object")));
            }
            let rec: NewsRecord =
                serde_json::from_value(raw).map_err(|e| parse_err(format!("record {i}: {e}")))?;
            out.push(NewsItem::from_record(i, rec)?);
        }
        Ok(out)
    }
}

impl NewsSource for JsonNewsSource {
    fn read_items(&self) -> Result<Vec<NewsItem>, IngestError> {
        match &self.mode {
            Mode::File(path) => {
                let content = read_bounded(path)?;
                Self::parse_items_from_str(&path.display().to_string(), &content)
            }
            Mode::Inline { label, content } => {
                if content.len() as u64 > MAX_SOURCE_BYTES {
                    return Err(IngestError::TooLarge {
                        origin: label.clone(),
                        limit: MAX_SOURCE_BYTES,
                    });
                }
                Self::parse_items_from_str(label, content)
            }
        }
    }

    fn name(&self) -> &str {
        "json"
    }
}

/// Records that already arrived decoded (e.g. inside a request body).
pub struct RecordListSource {
    records: Vec<NewsRecord>,
}

impl RecordListSource {
    pub fn new(records: Vec<NewsRecord>) -> Self {
        Self { records }
    }
}

impl NewsSource for RecordListSource {
    fn read_items(&self) -> Result<Vec<NewsItem>, IngestError> {
        self.records
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, rec)| NewsItem::from_record(i, rec))
            .collect()
    }

    fn name(&self) -> &str {
        "records"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_list_validates_each_record() {
        let ok = NewsRecord::new("Fed", "2025-10-01T13:30:00Z", "H", "");
        let bad = NewsRecord {
            source: None,
            ..ok.clone()
        };
        assert_eq!(RecordListSource::new(vec![ok.clone()]).read_items().unwrap().len(), 1);
        let err = RecordListSource::new(vec![ok, bad]).read_items().unwrap_err();
        assert!(matches!(
            err,
            IngestError::MissingField {
                index: 1,
                field: "source"
            }
        ));
    }

    #[test]
    fn accepts_wrapped_document() {
        let s = r#"{"news":[{"source":"Reuters","timestamp":"2025-10-01T13:30:00Z","headline":"H","body":"B"}]}"#;
        let items = JsonNewsSource::from_fixture_str("inline", s)
            .read_items()
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source(), "Reuters");
    }

    #[test]
    fn accepts_published_at_alias() {
        let s = r#"[{"source":"Fed","published_at":"2025-10-01T13:30:00Z","headline":"H","body":""}]"#;
        let items = JsonNewsSource::from_fixture_str("inline", s)
            .read_items()
            .unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn scalar_document_is_parse_error() {
        let err = JsonNewsSource::from_fixture_str("inline", "42")
            .read_items()
            .unwrap_err();
        assert!(matches!(err, IngestError::Parse { .. }));
    }

    #[test]
    fn wrong_field_type_is_parse_error() {
        let s = r#"[{"source":"Fed","timestamp":"2025-10-01T13:30:00Z","headline":7,"body":""}]"#;
        let err = JsonNewsSource::from_fixture_str("inline", s)
            .read_items()
            .unwrap_err();
        match err {
            IngestError::Parse { message, .. } => assert!(message.starts_with("record 0")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
