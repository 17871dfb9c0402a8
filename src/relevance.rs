// src/relevance.rs
//! Relevance gate: keeps the news items that mention a ticker or one of its aliases.
//!
//! Matching is a case-insensitive substring test over the headline and the body
//! (each field on its own, so a match never spans the two). The result is always
//! an ordered subsequence of the input batch; an empty result is a normal outcome.

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use tracing::info;

use crate::aliases::{AliasLookup, NoAliases};
use crate::ingest::types::{NewsBatch, NewsItem};

pub const ENV_DEV_LOG: &str = "ROUTER_DEV_LOG";

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("relevance_kept_total", "Items kept by the relevance gate.");
        describe_counter!(
            "relevance_dropped_total",
            "Items dropped by the relevance gate."
        );
    });
}

// Dev logging gate: ROUTER_DEV_LOG=1 AND dev env (debug or SHUTTLE_ENV in {local,development,dev})
pub(crate) fn dev_logging_enabled() -> bool {
    let on = std::env::var(ENV_DEV_LOG).ok().as_deref() == Some("1");
    if !on {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("SHUTTLE_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

/// Short stable id for a piece of text, so logs never carry raw news content.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Needles for one ticker: the ticker itself plus its aliases.
#[derive(Debug, Clone)]
pub struct RelevanceMatcher {
    // (original spelling, lowercased form)
    needles: Vec<(String, String)>,
}

impl RelevanceMatcher {
    /// Blank tickers and blank aliases are ignored; a matcher without needles matches nothing.
    pub fn new(ticker: &str, aliases: &dyn AliasLookup) -> Self {
        let ticker = ticker.trim();
        let mut needles: Vec<(String, String)> = Vec::new();
        if ticker.is_empty() {
            return Self { needles };
        }

        let candidates = std::iter::once(ticker.to_string()).chain(aliases.aliases_for(ticker));
        for cand in candidates {
            let t = cand.trim();
            if t.is_empty() {
                continue;
            }
            let lower = t.to_lowercase();
            if !needles.iter().any(|(_, l)| *l == lower) {
                needles.push((t.to_string(), lower));
            }
        }
        Self { needles }
    }

    pub fn ticker_only(ticker: &str) -> Self {
        Self::new(ticker, &NoAliases)
    }

    /// Needles in their original spelling; the ticker comes first.
    pub fn needles(&self) -> Vec<&str> {
        self.needles.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// First needle found in the item, if any.
    pub fn match_item(&self, item: &NewsItem) -> Option<&str> {
        if self.needles.is_empty() {
            return None;
        }
        let headline = item.headline().to_lowercase();
        let body = item.body().to_lowercase();
        self.needles
            .iter()
            .find(|(_, lower)| headline.contains(lower.as_str()) || body.contains(lower.as_str()))
            .map(|(orig, _)| orig.as_str())
    }

    /// Ordered subsequence of `batch` holding the relevant items.
    pub fn filter(&self, batch: &NewsBatch) -> NewsBatch {
        ensure_metrics_described();
        let dev_log = dev_logging_enabled();

        let mut kept = Vec::new();
        for item in batch {
            let Some(needle) = self.match_item(item) else {
                continue;
            };
            if dev_log {
                // Never log raw text. Only hashed id + the needle that hit.
                info!(
                    target: "relevance",
                    id = %anon_hash(item.headline()),
                    source = item.source(),
                    needle,
                    "kept"
                );
            }
            kept.push(item.clone());
        }

        let dropped = batch.len() - kept.len();
        counter!("relevance_kept_total").increment(kept.len() as u64);
        counter!("relevance_dropped_total").increment(dropped as u64);
        info!(
            target: "relevance",
            needles = self.needles.len(),
            kept = kept.len(),
            dropped,
            "batch filtered"
        );

        NewsBatch::from_ordered(kept)
    }
}

/// Items mentioning `ticker` (case-insensitive substring). No alias table.
pub fn filter_relevant(batch: &NewsBatch, ticker: &str) -> NewsBatch {
    RelevanceMatcher::ticker_only(ticker).filter(batch)
}

/// Items mentioning `ticker` or any alias `aliases` knows for it.
pub fn filter_relevant_with(
    batch: &NewsBatch,
    ticker: &str,
    aliases: &dyn AliasLookup,
) -> NewsBatch {
    RelevanceMatcher::new(ticker, aliases).filter(batch)
}

/* ----------------------------
Tests
---------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aliases::AliasTable;
    use crate::ingest::types::NewsRecord;

    fn batch(rows: &[(&str, &str, &str)]) -> NewsBatch {
        let recs = rows
            .iter()
            .enumerate()
            .map(|(i, (src, head, body))| {
                NewsRecord::new(src, &format!("2025-10-01T10:{i:02}:00Z"), head, body)
            })
            .collect();
        NewsBatch::from_records(recs).expect("valid rows")
    }

    #[test]
    fn only_mentioning_item_is_kept_in_place() {
        let b = batch(&[
            ("A", "Markets open flat", "Nothing notable."),
            ("B", "Industrials rally", "Shares of ACME climbed 4%."),
            ("C", "Oil slips", "Crude lower on supply."),
        ]);
        let out = filter_relevant(&b, "ACME");
        assert_eq!(out.len(), 1);
        assert_eq!(out.items()[0].source(), "B");
    }

    #[test]
    fn match_is_case_insensitive() {
        let b = batch(&[("A", "acme guidance raised", "")]);
        assert_eq!(filter_relevant(&b, "AcMe").len(), 1);
    }

    #[test]
    fn aliases_widen_the_match() {
        let b = batch(&[
            ("A", "Wile E. Coyote Holdings rises", ""),
            ("B", "WEC flat", ""),
            ("C", "Unrelated", "Nothing here"),
        ]);
        let table = AliasTable::from_entries(vec![("WEC", vec!["Coyote Holdings"])]);

        assert_eq!(filter_relevant(&b, "WEC").len(), 1);
        let out = filter_relevant_with(&b, "WEC", &table);
        let sources: Vec<_> = out.iter().map(|i| i.source()).collect();
        assert_eq!(sources, vec!["A", "B"]);
    }

    #[test]
    fn match_does_not_span_headline_and_body() {
        let b = batch(&[("A", "Headline ends with AC", "ME starts the body")]);
        assert!(filter_relevant(&b, "ACME").is_empty());
    }

    #[test]
    fn blank_ticker_matches_nothing() {
        let b = batch(&[("A", "Anything", "at all")]);
        assert!(filter_relevant(&b, "   ").is_empty());
        assert!(RelevanceMatcher::ticker_only("").needles().is_empty());
    }

    #[test]
    fn filtering_is_idempotent() {
        let b = batch(&[
            ("A", "ACME up", ""),
            ("B", "Other", ""),
            ("C", "Late ACME note", "acme"),
        ]);
        let once = filter_relevant(&b, "acme");
        let twice = filter_relevant(&once, "acme");
        assert_eq!(once, twice);
    }

    #[test]
    fn needles_dedup_case_insensitively() {
        let table = AliasTable::from_entries(vec![("ACME", vec!["acme", "Acme Corp"])]);
        let m = RelevanceMatcher::new("ACME", &table);
        assert_eq!(m.needles(), vec!["ACME", "Acme Corp"]);
    }

    #[test]
    fn anon_hash_is_short_and_stable() {
        let a = anon_hash("ACME beats estimates");
        assert_eq!(a.len(), 12);
        assert_eq!(a, anon_hash("ACME beats estimates"));
    }
}
