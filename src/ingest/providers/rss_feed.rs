// src/ingest/providers/rss_feed.rs
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::error::IngestError;
use crate::ingest::types::{NewsItem, NewsRecord, NewsSource};
use crate::ingest::{normalize_text, read_bounded, MAX_SOURCE_BYTES};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// RFC 2822 `pubDate` → RFC 3339 UTC string; `None` when unparseable.
fn rfc2822_to_rfc3339(ts: &str) -> Option<String> {
    let secs = OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()?
        .unix_timestamp();
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// RSS 2.0 feed read from a file or an in-memory fixture.
/// Item title becomes the headline, description (markup stripped) the body.
/// The source label is the configured name, else the channel title.
pub struct RssNewsSource {
    mode: Mode,
    source_name: Option<String>,
}

enum Mode {
    File(PathBuf),
    Inline { label: String, content: String },
}

impl RssNewsSource {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self {
            mode: Mode::File(path.as_ref().to_path_buf()),
            source_name: None,
        }
    }

    pub fn from_fixture_str(label: &str, content: &str) -> Self {
        Self {
            mode: Mode::Inline {
                label: label.to_string(),
                content: content.to_string(),
            },
            source_name: None,
        }
    }

    /// Label every item with `name` instead of the channel title.
    pub fn with_source_name(mut self, name: &str) -> Self {
        self.source_name = Some(name.to_string());
        self
    }

    fn parse_items_from_str(&self, origin: &str, s: &str) -> Result<Vec<NewsItem>, IngestError> {
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean).map_err(|e| IngestError::Parse {
            origin: origin.to_string(),
            message: e.to_string(),
        })?;

        let source = self
            .source_name
            .clone()
            .or(rss.channel.title)
            .map(|t| normalize_text(&t));

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for (i, it) in rss.channel.item.into_iter().enumerate() {
            let timestamp = match it.pub_date {
                Some(raw) => Some(
                    rfc2822_to_rfc3339(&raw)
                        .ok_or(IngestError::InvalidTimestamp { index: i, value: raw })?,
                ),
                None => None,
            };
            let rec = NewsRecord {
                source: source.clone(),
                timestamp,
                headline: it.title.as_deref().map(normalize_text),
                // RSS allows title-only items
                body: Some(normalize_text(it.description.as_deref().unwrap_or_default())),
            };
            out.push(NewsItem::from_record(i, rec)?);
        }
        Ok(out)
    }
}

impl NewsSource for RssNewsSource {
    fn read_items(&self) -> Result<Vec<NewsItem>, IngestError> {
        match &self.mode {
            Mode::File(path) => {
                let content = read_bounded(path)?;
                self.parse_items_from_str(&path.display().to_string(), &content)
            }
            Mode::Inline { label, content } => {
                if content.len() as u64 > MAX_SOURCE_BYTES {
                    return Err(IngestError::TooLarge {
                        origin: label.clone(),
                        limit: MAX_SOURCE_BYTES,
                    });
                }
                self.parse_items_from_str(label, content)
            }
        }
    }

    fn name(&self) -> &str {
        "rss"
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
