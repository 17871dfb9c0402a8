// src/router.rs
//! # News Batch Router
//! One-shot pipeline: `ingest → filter_relevant → build_context`.
//!
//! The router holds configuration and an alias lookup, both read-only; every call
//! works on its own batch, so one router can serve concurrent callers.

use std::path::Path;
use std::sync::Arc;

use crate::aliases::AliasLookup;
use crate::config::RouterConfig;
use crate::context::{build_context, AnalysisContext};
use crate::error::{IngestError, InvalidRequestError, RouteError};
use crate::ingest::types::{NewsBatch, NewsSource};
use crate::ingest::{ingest_bounded, ingest_path};
use crate::market::{BarStore, TechnicalCalculator, TechnicalSummary};
use crate::relevance::RelevanceMatcher;
use crate::request::{parse_command_line, AnalysisRequest, CommandSet};

#[derive(Clone)]
pub struct NewsRouter {
    config: RouterConfig,
    commands: CommandSet,
    aliases: Arc<dyn AliasLookup>,
    market: Option<Arc<(BarStore, TechnicalCalculator)>>,
}

impl NewsRouter {
    pub fn new(config: RouterConfig, aliases: Arc<dyn AliasLookup>) -> Self {
        let commands = config.command_set();
        Self {
            config,
            commands,
            aliases,
            market: None,
        }
    }

    /// Attach price bars; contexts for tickers with bars then carry a technical snapshot.
    pub fn with_market(mut self, bars: BarStore, calculator: TechnicalCalculator) -> Self {
        self.market = Some(Arc::new((bars, calculator)));
        self
    }

    /// Build from config, loading the alias table and price bars it points at.
    pub fn from_config(config: RouterConfig) -> anyhow::Result<Self> {
        let table = config.load_aliases()?;
        tracing::info!(target: "router", tickers = table.len(), "alias table loaded");
        let market = config.load_market()?;
        let router = Self::new(config, Arc::new(table));
        Ok(match market {
            Some((bars, calc)) => router.with_market(bars, calc),
            None => router,
        })
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn commands(&self) -> &CommandSet {
        &self.commands
    }

    pub fn ingest(&self, source: &dyn NewsSource) -> Result<NewsBatch, IngestError> {
        ingest_bounded(source, self.config.max_items)
    }

    pub fn ingest_path(&self, path: &Path) -> Result<NewsBatch, IngestError> {
        ingest_path(path, self.config.max_items)
    }

    /// Read the configured fixture file.
    pub fn ingest_fixture(&self) -> Result<NewsBatch, IngestError> {
        self.ingest_path(&self.config.fixture_path)
    }

    pub fn filter_relevant(&self, batch: &NewsBatch, ticker: &str) -> NewsBatch {
        RelevanceMatcher::new(ticker, self.aliases.as_ref()).filter(batch)
    }

    pub fn build_context(
        &self,
        batch: NewsBatch,
        request: AnalysisRequest,
    ) -> Result<AnalysisContext, InvalidRequestError> {
        build_context(batch, request)
    }

    /// Price snapshot for `ticker`, when bars are loaded and cover it.
    pub fn technicals_for(&self, ticker: &str) -> Option<TechnicalSummary> {
        let market = self.market.as_ref()?;
        let (bars, calc) = market.as_ref();
        calc.summarize(ticker, bars.bars_for(ticker)?)
    }

    pub fn parse_command(&self, line: &str) -> Result<AnalysisRequest, InvalidRequestError> {
        parse_command_line(line, &self.commands)
    }

    /// Filter an already ingested batch for `request` and package the result.
    /// The request is checked first, so a bad request never costs a filter pass.
    pub fn route_batch(
        &self,
        batch: &NewsBatch,
        request: AnalysisRequest,
    ) -> Result<AnalysisContext, InvalidRequestError> {
        request.validate()?;
        let relevant = self.filter_relevant(batch, &request.ticker);
        let technicals = self.technicals_for(&request.ticker);
        let ctx = self.build_context(relevant, request)?;
        Ok(match technicals {
            Some(t) => ctx.with_technicals(t),
            None => ctx,
        })
    }

    /// Full pipeline over one source.
    pub fn route(
        &self,
        source: &dyn NewsSource,
        request: AnalysisRequest,
    ) -> Result<AnalysisContext, RouteError> {
        request.validate()?;
        let batch = self.ingest(source)?;
        Ok(self.route_batch(&batch, request)?)
    }
}
