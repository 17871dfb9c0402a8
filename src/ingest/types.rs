// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// A record exactly as it appears on the wire (fixture file, request body).
/// Every field is optional here so that absence can be reported per field
/// instead of as an opaque decode failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>, // e.g. "Reuters", "Bloomberg"
    #[serde(
        default,
        rename = "timestamp",
        alias = "published_at",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<String>, // RFC 3339
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl NewsRecord {
    pub fn new(source: &str, timestamp: &str, headline: &str, body: &str) -> Self {
        Self {
            source: Some(source.to_string()),
            timestamp: Some(timestamp.to_string()),
            headline: Some(headline.to_string()),
            body: Some(body.to_string()),
        }
    }
}

/// One validated news item. Fields are private: an item cannot change after ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsItem {
    source: String,
    // wire text, written back untouched
    timestamp: String,
    #[serde(skip)]
    published_at: DateTime<Utc>,
    headline: String,
    body: String,
}

impl NewsItem {
    /// Validate a wire record. `index` is the record's position in its source and
    /// only feeds error messages.
    pub fn from_record(index: usize, rec: NewsRecord) -> Result<Self, IngestError> {
        let source = required(index, "source", rec.source)?;
        let timestamp = required(index, "timestamp", rec.timestamp)?;
        let headline = required(index, "headline", rec.headline)?;
        let body = required(index, "body", rec.body)?;

        if source.trim().is_empty() {
            return Err(IngestError::EmptyField {
                index,
                field: "source",
            });
        }
        if headline.trim().is_empty() {
            return Err(IngestError::EmptyField {
                index,
                field: "headline",
            });
        }

        let published_at = DateTime::parse_from_rfc3339(timestamp.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| IngestError::InvalidTimestamp {
                index,
                value: timestamp.clone(),
            })?;

        Ok(Self {
            source,
            timestamp,
            published_at,
            headline,
            body,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    /// Timestamp exactly as the source wrote it.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn headline(&self) -> &str {
        &self.headline
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Back to the wire shape, field values unchanged.
    pub fn to_record(&self) -> NewsRecord {
        NewsRecord {
            source: Some(self.source.clone()),
            timestamp: Some(self.timestamp.clone()),
            headline: Some(self.headline.clone()),
            body: Some(self.body.clone()),
        }
    }
}

fn required(
    index: usize,
    field: &'static str,
    value: Option<String>,
) -> Result<String, IngestError> {
    value.ok_or(IngestError::MissingField { index, field })
}

/// Items ordered by `published_at` ascending. Ties keep source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NewsBatch {
    items: Vec<NewsItem>,
}

impl NewsBatch {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a batch from items in any order.
    pub fn from_items(mut items: Vec<NewsItem>) -> Self {
        // stable sort: equal timestamps keep feed order
        items.sort_by_key(|it| it.published_at);
        Self { items }
    }

    /// Validate a list of wire records into a batch. Fails on the first bad record.
    pub fn from_records(records: Vec<NewsRecord>) -> Result<Self, IngestError> {
        let items = records
            .into_iter()
            .enumerate()
            .map(|(i, rec)| NewsItem::from_record(i, rec))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_items(items))
    }

    /// Keep a subsequence of an already ordered batch.
    pub(crate) fn from_ordered(items: Vec<NewsItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[NewsItem] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NewsItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Keep only the newest `max` items. Returns the trimmed batch and how many were dropped.
    pub fn newest(mut self, max: usize) -> (Self, usize) {
        let excess = self.items.len().saturating_sub(max);
        if excess > 0 {
            self.items.drain(0..excess);
        }
        (self, excess)
    }

    pub fn to_records(&self) -> Vec<NewsRecord> {
        self.items.iter().map(NewsItem::to_record).collect()
    }
}

impl<'a> IntoIterator for &'a NewsBatch {
    type Item = &'a NewsItem;
    type IntoIter = std::slice::Iter<'a, NewsItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Anything that can hand over one bounded set of news items in a single read.
pub trait NewsSource {
    fn read_items(&self) -> Result<Vec<NewsItem>, IngestError>;
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_is_reported_with_index() {
        let rec = NewsRecord {
            headline: None,
            ..NewsRecord::new("Reuters", "2025-10-01T13:30:00Z", "x", "y")
        };
        let err = NewsItem::from_record(3, rec).unwrap_err();
        assert!(matches!(
            err,
            IngestError::MissingField {
                index: 3,
                field: "headline"
            }
        ));
    }

    #[test]
    fn blank_source_is_rejected() {
        let rec = NewsRecord::new("  ", "2025-10-01T13:30:00Z", "Headline", "");
        let err = NewsItem::from_record(0, rec).unwrap_err();
        assert!(matches!(err, IngestError::EmptyField { field: "source", .. }));
    }

    #[test]
    fn empty_body_is_allowed() {
        let rec = NewsRecord::new("Fed", "2025-10-01T13:30:00Z", "Rates unchanged", "");
        let it = NewsItem::from_record(0, rec).unwrap();
        assert_eq!(it.body(), "");
    }

    #[test]
    fn offset_timestamps_normalize_to_utc() {
        let rec = NewsRecord::new("Fed", "2025-10-01T15:30:00+02:00", "H", "B");
        let it = NewsItem::from_record(0, rec).unwrap();
        assert_eq!(it.published_at().to_rfc3339(), "2025-10-01T13:30:00+00:00");
    }

    #[test]
    fn to_record_keeps_offset_and_fraction_text() {
        let recs = vec![
            NewsRecord::new("Fed", "2025-10-01T10:00:00+02:00", "H1", "B"),
            NewsRecord::new("Fed", "2025-10-01T10:00:00.5Z", "H2", ""),
        ];
        let b = NewsBatch::from_records(recs.clone()).unwrap();
        // +02:00 is the earlier instant
        assert_eq!(b.to_records(), recs);
        assert_eq!(b.items()[0].timestamp(), "2025-10-01T10:00:00+02:00");
    }

    #[test]
    fn batch_sorts_stably_by_time() {
        let recs = vec![
            NewsRecord::new("B", "2025-10-01T12:00:00Z", "second", ""),
            NewsRecord::new("A", "2025-10-01T11:00:00Z", "first", ""),
            NewsRecord::new("C", "2025-10-01T12:00:00Z", "third", ""),
        ];
        let b = NewsBatch::from_records(recs).unwrap();
        let heads: Vec<_> = b.iter().map(|i| i.headline()).collect();
        assert_eq!(heads, vec!["first", "second", "third"]);
    }

    #[test]
    fn newest_drops_oldest_items() {
        let recs = (0..5)
            .map(|i| NewsRecord::new("S", &format!("2025-10-01T1{i}:00:00Z"), &format!("h{i}"), ""))
            .collect();
        let (b, dropped) = NewsBatch::from_records(recs).unwrap().newest(2);
        assert_eq!(dropped, 3);
        let heads: Vec<_> = b.iter().map(|i| i.headline()).collect();
        assert_eq!(heads, vec!["h3", "h4"]);
    }
}
