// src/market/mod.rs
//! Per-ticker price context: 5-minute bars and a technical snapshot computed from them.
//! Optional; the router attaches a snapshot to a context only when bars are configured.

pub mod bars;
pub mod indicators;

pub use bars::{BarStore, PriceBar};
pub use indicators::{IndicatorSettings, TechnicalCalculator, TechnicalSummary};
