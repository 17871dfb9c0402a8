// src/ingest/mod.rs
pub mod providers;
pub mod types;

use crate::error::IngestError;
use crate::ingest::providers::{json_file::JsonNewsSource, rss_feed::RssNewsSource};
use crate::ingest::types::{NewsBatch, NewsSource};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Upper bound on items kept from one source.
pub const DEFAULT_MAX_ITEMS: usize = 500;

/// Upper bound on the raw size of one source (8 MiB).
pub const MAX_SOURCE_BYTES: u64 = 8 * 1024 * 1024;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_items_total", "News items accepted from sources.");
        describe_counter!(
            "ingest_errors_total",
            "Sources rejected as unreadable or malformed."
        );
        describe_counter!(
            "ingest_truncated_total",
            "Items dropped because a source exceeded the item cap."
        );
        describe_histogram!("ingest_parse_ms", "Source parse time in milliseconds.");
    });
}

/// Normalize text: decode entities, strip tags, collapse whitespace.
/// Used for feed markup; fixture records are kept verbatim.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize typographic quotes to ASCII
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

/// Read a whole file, refusing anything above `MAX_SOURCE_BYTES`.
/// The handle is dropped on every return path.
pub(crate) fn read_bounded(path: &Path) -> Result<String, IngestError> {
    let io_err = |source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(io_err)?;

    let mut content = String::new();
    file.take(MAX_SOURCE_BYTES + 1)
        .read_to_string(&mut content)
        .map_err(io_err)?;

    if content.len() as u64 > MAX_SOURCE_BYTES {
        return Err(IngestError::TooLarge {
            origin: path.display().to_string(),
            limit: MAX_SOURCE_BYTES,
        });
    }
    Ok(content)
}

/// Single-shot read of `source`, capped at `DEFAULT_MAX_ITEMS`.
pub fn ingest<S: NewsSource + ?Sized>(source: &S) -> Result<NewsBatch, IngestError> {
    ingest_bounded(source, DEFAULT_MAX_ITEMS)
}

/// Single-shot read of `source`. No retries: the first failure is returned to the caller.
/// When the source holds more than `max_items`, only the newest are kept.
pub fn ingest_bounded<S: NewsSource + ?Sized>(
    source: &S,
    max_items: usize,
) -> Result<NewsBatch, IngestError> {
    ensure_metrics_described();

    let t0 = std::time::Instant::now();
    let items = match source.read_items() {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(target: "ingest", error = %e, source = source.name(), "source rejected");
            counter!("ingest_errors_total").increment(1);
            return Err(e);
        }
    };
    histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

    let (batch, dropped) = NewsBatch::from_items(items).newest(max_items.max(1));
    if dropped > 0 {
        tracing::warn!(
            target: "ingest",
            source = source.name(),
            dropped,
            max_items,
            "source exceeded item cap; oldest items dropped"
        );
        counter!("ingest_truncated_total").increment(dropped as u64);
    }

    counter!("ingest_items_total").increment(batch.len() as u64);
    tracing::info!(target: "ingest", source = source.name(), kept = batch.len(), "ingested");
    Ok(batch)
}

/// Pick a reader by file extension: `.xml`/`.rss` as RSS, anything else as JSON.
pub fn source_for_path(path: &Path) -> Box<dyn NewsSource> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "xml" | "rss" => Box::new(RssNewsSource::from_path(path)),
        _ => Box::new(JsonNewsSource::from_path(path)),
    }
}

/// Convenience: `ingest_bounded(source_for_path(path), max_items)`.
pub fn ingest_path(path: &Path, max_items: usize) -> Result<NewsBatch, IngestError> {
    let source = source_for_path(path);
    ingest_bounded(source.as_ref(), max_items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_strips_markup_and_collapses_ws() {
        let s = "  <p>Acme&nbsp;&nbsp; <b>beats</b> &ldquo;estimates&rdquo;</p>  ";
        assert_eq!(normalize_text(s), r#"Acme beats "estimates""#);
    }

    #[test]
    fn unreadable_path_is_io_error() {
        let err = read_bounded(Path::new("__no_such_news_file__.json")).unwrap_err();
        assert!(matches!(err, IngestError::Io { .. }));
    }

    #[test]
    fn extension_picks_reader() {
        assert_eq!(source_for_path(Path::new("feed.XML")).name(), "rss");
        assert_eq!(source_for_path(Path::new("news.json")).name(), "json");
        assert_eq!(source_for_path(Path::new("news")).name(), "json");
    }
}
