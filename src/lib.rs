// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aliases;
pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod ingest;
pub mod market;
pub mod metrics;
pub mod relevance;
pub mod request;
pub mod router;

// ---- Re-exports for stable public API ----
pub use crate::aliases::{AliasLookup, AliasTable, NoAliases};
pub use crate::api::{create_router, AppState};
pub use crate::config::RouterConfig;
pub use crate::context::{build_context, AnalysisContext, PromptBundle};
pub use crate::error::{IngestError, InvalidRequestError, RouteError};
pub use crate::ingest::types::{NewsBatch, NewsItem, NewsRecord, NewsSource};
pub use crate::ingest::{ingest, ingest_path};
pub use crate::market::{BarStore, TechnicalCalculator, TechnicalSummary};
pub use crate::relevance::{filter_relevant, filter_relevant_with, RelevanceMatcher};
pub use crate::request::{parse_command_line, AnalysisRequest, CommandSet};
pub use crate::router::NewsRouter;
