// src/market/indicators.rs
//! Technical snapshot for one ticker: SMA, EMA, MACD, RSI and Bollinger bands
//! over the closing prices, read at the latest bar.

use anyhow::{anyhow, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use ta::indicators::{
    BollingerBands, ExponentialMovingAverage, MovingAverageConvergenceDivergence,
    RelativeStrengthIndex, SimpleMovingAverage,
};
use ta::errors::TaError;
use ta::Next;

use super::bars::PriceBar;

fn default_sma_window() -> usize {
    20
}
fn default_ema_window() -> usize {
    20
}
fn default_macd_fast() -> usize {
    12
}
fn default_macd_slow() -> usize {
    26
}
fn default_macd_signal() -> usize {
    9
}
fn default_rsi_window() -> usize {
    14
}
fn default_bollinger_window() -> usize {
    20
}
fn default_bollinger_k() -> f64 {
    2.0
}

/// Indicator windows, in bars. `[technicals]` in the router config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSettings {
    #[serde(default = "default_sma_window")]
    pub sma_window: usize,
    #[serde(default = "default_ema_window")]
    pub ema_window: usize,
    #[serde(default = "default_macd_fast")]
    pub macd_fast: usize,
    #[serde(default = "default_macd_slow")]
    pub macd_slow: usize,
    #[serde(default = "default_macd_signal")]
    pub macd_signal: usize,
    #[serde(default = "default_rsi_window")]
    pub rsi_window: usize,
    #[serde(default = "default_bollinger_window")]
    pub bollinger_window: usize,
    #[serde(default = "default_bollinger_k")]
    pub bollinger_k: f64,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            sma_window: default_sma_window(),
            ema_window: default_ema_window(),
            macd_fast: default_macd_fast(),
            macd_slow: default_macd_slow(),
            macd_signal: default_macd_signal(),
            rsi_window: default_rsi_window(),
            bollinger_window: default_bollinger_window(),
            bollinger_k: default_bollinger_k(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacdReading {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandReading {
    pub mid: f64,
    pub upper: f64,
    pub lower: f64,
}

/// Indicator values at the latest bar. Window-based readings are `None`
/// until enough bars exist to fill the window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicalSummary {
    pub ticker: String,
    pub as_of: NaiveDateTime,
    pub bars: usize,
    pub last_close: f64,
    /// Last close vs the previous close, in percent.
    pub change_pct: Option<f64>,
    pub sma: Option<f64>,
    pub ema: f64,
    pub macd: MacdReading,
    pub rsi: Option<f64>,
    pub bollinger: Option<BandReading>,
}

fn invalid(what: &'static str) -> impl Fn(TaError) -> anyhow::Error {
    move |e| anyhow!("invalid {what} settings: {e:?}")
}

/// Validated indicator set; every summary runs on a fresh clone.
#[derive(Debug, Clone)]
pub struct TechnicalCalculator {
    settings: IndicatorSettings,
    sma: SimpleMovingAverage,
    ema: ExponentialMovingAverage,
    macd: MovingAverageConvergenceDivergence,
    rsi: RelativeStrengthIndex,
    bollinger: BollingerBands,
}

impl TechnicalCalculator {
    pub fn new(settings: IndicatorSettings) -> Result<Self> {
        Ok(Self {
            sma: SimpleMovingAverage::new(settings.sma_window).map_err(invalid("SMA"))?,
            ema: ExponentialMovingAverage::new(settings.ema_window).map_err(invalid("EMA"))?,
            macd: MovingAverageConvergenceDivergence::new(
                settings.macd_fast,
                settings.macd_slow,
                settings.macd_signal,
            )
            .map_err(invalid("MACD"))?,
            rsi: RelativeStrengthIndex::new(settings.rsi_window).map_err(invalid("RSI"))?,
            bollinger: BollingerBands::new(settings.bollinger_window, settings.bollinger_k)
                .map_err(invalid("Bollinger"))?,
            settings,
        })
    }

    /// Snapshot at the last of `bars` (ascending in time). `None` for no bars.
    pub fn summarize(&self, ticker: &str, bars: &[PriceBar]) -> Option<TechnicalSummary> {
        let last = bars.last()?;

        let mut sma = self.sma.clone();
        let mut ema = self.ema.clone();
        let mut macd = self.macd.clone();
        let mut rsi = self.rsi.clone();
        let mut bollinger = self.bollinger.clone();

        let (mut sma_v, mut ema_v, mut rsi_v) = (0.0, 0.0, 0.0);
        let mut macd_v = MacdReading {
            macd: 0.0,
            signal: 0.0,
            histogram: 0.0,
        };
        let mut band_v = BandReading {
            mid: 0.0,
            upper: 0.0,
            lower: 0.0,
        };
        for bar in bars {
            let c = bar.close;
            sma_v = sma.next(c);
            ema_v = ema.next(c);
            let m = macd.next(c);
            macd_v = MacdReading {
                macd: m.macd,
                signal: m.signal,
                histogram: m.histogram,
            };
            rsi_v = rsi.next(c);
            let b = bollinger.next(c);
            band_v = BandReading {
                mid: b.average,
                upper: b.upper,
                lower: b.lower,
            };
        }

        let n = bars.len();
        let filled = |window: usize| n >= window;
        let change_pct = bars
            .len()
            .checked_sub(2)
            .map(|i| bars[i].close)
            .filter(|prev| *prev != 0.0)
            .map(|prev| (last.close - prev) / prev * 100.0);

        Some(TechnicalSummary {
            ticker: ticker.trim().to_string(),
            as_of: last.at,
            bars: n,
            last_close: last.close,
            change_pct,
            sma: filled(self.settings.sma_window).then_some(sma_v),
            ema: ema_v,
            macd: macd_v,
            rsi: (n > 1).then_some(rsi_v),
            bollinger: filled(self.settings.bollinger_window).then_some(band_v),
        })
    }
}

impl TechnicalSummary {
    /// Plain-text lines for the agent prompt.
    pub fn prompt_lines(&self) -> Vec<String> {
        let mut out = vec![format!(
            "Last close {:.2} at {} ({} bars)",
            self.last_close,
            self.as_of.format("%Y-%m-%d %H:%M"),
            self.bars
        )];
        if let Some(p) = self.change_pct {
            out.push(format!("Change vs previous bar: {p:+.2}%"));
        }
        if let Some(s) = self.sma {
            out.push(format!("SMA: {s:.2}"));
        }
        out.push(format!("EMA: {:.2}", self.ema));
        out.push(format!(
            "MACD: {:.4} (signal {:.4}, histogram {:.4})",
            self.macd.macd, self.macd.signal, self.macd.histogram
        ));
        if let Some(r) = self.rsi {
            out.push(format!("RSI: {r:.1}"));
        }
        if let Some(b) = &self.bollinger {
            out.push(format!(
                "Bollinger: mid {:.2}, upper {:.2}, lower {:.2}",
                b.mid, b.upper, b.lower
            ));
        }
        out
    }
}
