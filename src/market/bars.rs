// src/market/bars.rs
//! Intraday bar files in the usual exchange-dump layout:
//!
//! ```text
//! <TICKER>,<PER>,<DATE>,<TIME>,<OPEN>,<HIGH>,<LOW>,<CLOSE>,<VOL>,<OPENINT>
//! ACME.US,5,20251001,093500,101.2,101.9,100.8,101.5,120400,0
//! ```
//!
//! Column order is free; angle brackets around header names are optional.
//! `PER` and `OPENINT` are ignored.

use anyhow::{anyhow, Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Spacing every kept bar must have from the one before it.
pub const BAR_STEP_MINUTES: i64 = 5;

/// Tickers with this many rows or fewer are dropped.
pub const DEFAULT_MIN_BARS_PER_TICKER: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBar {
    pub ticker: String,
    pub at: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

struct Columns {
    ticker: usize,
    date: usize,
    time: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl Columns {
    fn from_header(header: &str) -> Result<Self> {
        let names: Vec<String> = header
            .split(',')
            .map(|h| {
                h.trim()
                    .trim_start_matches('<')
                    .trim_end_matches('>')
                    .to_ascii_uppercase()
            })
            .collect();
        let find = |name: &str| {
            names
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| anyhow!("bar file header lacks `{name}`"))
        };
        Ok(Self {
            ticker: find("TICKER")?,
            date: find("DATE")?,
            time: find("TIME")?,
            open: find("OPEN")?,
            high: find("HIGH")?,
            low: find("LOW")?,
            close: find("CLOSE")?,
            volume: find("VOL")?,
        })
    }
}

fn parse_timestamp(date: &str, time: &str) -> Result<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y%m%d")
        .with_context(|| format!("bad DATE `{date}`"))?;
    // TIME loses its leading zeros in some dumps (93500 == 09:35:00)
    let time_padded = format!("{:0>6}", time.trim());
    let time = NaiveTime::parse_from_str(&time_padded, "%H%M%S")
        .with_context(|| format!("bad TIME `{time}`"))?;
    Ok(date.and_time(time))
}

fn parse_number(field: &str, col: &str) -> Result<f64> {
    field
        .trim()
        .parse::<f64>()
        .with_context(|| format!("bad {col} `{field}`"))
}

/// Parse a whole bar file. Blank lines are skipped; any bad row fails the file.
pub fn parse_bars_csv(content: &str) -> Result<Vec<PriceBar>> {
    let mut lines = content.lines().enumerate();
    let header = lines
        .by_ref()
        .find(|(_, l)| !l.trim().is_empty())
        .map(|(_, l)| l)
        .ok_or_else(|| anyhow!("bar file is empty"))?;
    let cols = Columns::from_header(header)?;

    let mut out = Vec::new();
    for (n, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        let get = |i: usize| {
            fields
                .get(i)
                .copied()
                .ok_or_else(|| anyhow!("line {}: too few columns", n + 1))
        };
        let bar = (|| -> Result<PriceBar> {
            Ok(PriceBar {
                ticker: get(cols.ticker)?.trim().to_string(),
                at: parse_timestamp(get(cols.date)?, get(cols.time)?)?,
                open: parse_number(get(cols.open)?, "OPEN")?,
                high: parse_number(get(cols.high)?, "HIGH")?,
                low: parse_number(get(cols.low)?, "LOW")?,
                close: parse_number(get(cols.close)?, "CLOSE")?,
                volume: parse_number(get(cols.volume)?, "VOL")?,
            })
        })()
        .with_context(|| format!("line {}", n + 1))?;
        out.push(bar);
    }
    Ok(out)
}

/// Bars grouped per ticker, ascending in time, keeping only strict 5-minute steps.
#[derive(Debug, Clone, Default)]
pub struct BarStore {
    by_ticker: HashMap<String, Vec<PriceBar>>,
    // "ACME" -> "ACME.US"
    short_names: HashMap<String, String>,
}

impl BarStore {
    /// Tickers with `min_bars` rows or fewer are dropped before the step check.
    /// A bar survives only when the previous bar of its ticker is exactly
    /// `BAR_STEP_MINUTES` earlier, so each ticker's first bar and every bar after
    /// a gap are discarded.
    pub fn from_bars(bars: Vec<PriceBar>, min_bars: usize) -> Self {
        let mut grouped: HashMap<String, Vec<PriceBar>> = HashMap::new();
        for bar in bars {
            grouped
                .entry(bar.ticker.trim().to_uppercase())
                .or_default()
                .push(bar);
        }

        let step = Duration::minutes(BAR_STEP_MINUTES);
        let mut by_ticker = HashMap::new();
        for (ticker, mut rows) in grouped {
            if rows.len() <= min_bars {
                continue;
            }
            rows.sort_by_key(|b| b.at);
            let kept: Vec<PriceBar> = rows
                .windows(2)
                .filter(|w| w[1].at - w[0].at == step)
                .map(|w| w[1].clone())
                .collect();
            if !kept.is_empty() {
                by_ticker.insert(ticker, kept);
            }
        }

        let mut short_names = HashMap::new();
        for full in by_ticker.keys() {
            if let Some((short, _)) = full.split_once('.') {
                short_names.insert(short.to_string(), full.clone());
            }
        }
        Self {
            by_ticker,
            short_names,
        }
    }

    pub fn load(path: &Path, min_bars: usize) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading price bars from {}", path.display()))?;
        let bars = parse_bars_csv(&content)
            .with_context(|| format!("parsing price bars {}", path.display()))?;
        let store = Self::from_bars(bars, min_bars);
        tracing::info!(
            target: "router",
            tickers = store.len(),
            path = %path.display(),
            "price bars loaded"
        );
        Ok(store)
    }

    /// Bars for `ticker`, case-insensitive; `ACME` also finds `ACME.US`.
    pub fn bars_for(&self, ticker: &str) -> Option<&[PriceBar]> {
        let key = ticker.trim().to_uppercase();
        self.by_ticker
            .get(&key)
            .or_else(|| {
                self.short_names
                    .get(&key)
                    .and_then(|full| self.by_ticker.get(full))
            })
            .map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.by_ticker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_ticker.is_empty()
    }
}
