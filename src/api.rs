// src/api.rs
//! HTTP surface over the router.
//!
//! - `GET  /health`   → `OK`
//! - `GET  /commands` → configured command names
//! - `POST /context`  → JSON `{ ticker, idea, command?, news? }`
//! - `POST /command`  → plain-text `ticker=.. idea=.. command=..`
//!
//! Without `news` in the body, the configured fixture file is ingested.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::context::{AnalysisContext, PromptBundle};
use crate::error::{IngestError, InvalidRequestError, RouteError};
use crate::ingest::providers::json_file::RecordListSource;
use crate::ingest::types::NewsRecord;
use crate::request::AnalysisRequest;
use crate::router::NewsRouter;

#[derive(Clone)]
pub struct AppState {
    pub router: Arc<NewsRouter>,
}

impl AppState {
    pub fn new(router: NewsRouter) -> Self {
        Self {
            router: Arc::new(router),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/commands", get(list_commands))
        .route("/context", post(post_context))
        .route("/command", post(post_command))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// API-layer error type
#[derive(Debug)]
pub enum ApiError {
    /// 400 - caller sent an invalid request
    BadRequest(String),
    /// 502 - news source unreadable or malformed
    BadSource(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_request", msg),
            ApiError::BadSource(msg) => (StatusCode::BAD_GATEWAY, "ingest_failed", msg),
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

impl From<InvalidRequestError> for ApiError {
    fn from(err: InvalidRequestError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        ApiError::BadSource(err.to_string())
    }
}

impl From<RouteError> for ApiError {
    fn from(err: RouteError) -> Self {
        match err {
            RouteError::Ingest(e) => e.into(),
            RouteError::InvalidRequest(e) => e.into(),
        }
    }
}

#[derive(Deserialize)]
struct ContextReq {
    #[serde(default)]
    ticker: String,
    #[serde(default)]
    idea: String,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    news: Option<Vec<NewsRecord>>,
}

#[derive(Serialize)]
struct ContextResp {
    context: AnalysisContext,
    prompt: PromptBundle,
}

impl From<AnalysisContext> for ContextResp {
    fn from(context: AnalysisContext) -> Self {
        let prompt = context.render_prompt(Utc::now().date_naive());
        Self { context, prompt }
    }
}

async fn list_commands(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.router.commands().names().to_vec())
}

async fn post_context(
    State(state): State<AppState>,
    Json(body): Json<ContextReq>,
) -> Result<Json<ContextResp>, ApiError> {
    let router = &state.router;
    let command = router.commands().resolve(body.command.as_deref())?;
    let request = AnalysisRequest {
        ticker: body.ticker,
        idea: body.idea,
        command,
    };

    let ctx = match body.news {
        Some(records) => router.route(&RecordListSource::new(records), request)?,
        None => {
            request.validate()?;
            let batch = router.ingest_fixture()?;
            router.route_batch(&batch, request)?
        }
    };
    Ok(Json(ctx.into()))
}

async fn post_command(
    State(state): State<AppState>,
    line: String,
) -> Result<Json<ContextResp>, ApiError> {
    let router = &state.router;
    let request = router.parse_command(&line)?;
    request.validate()?;
    let batch = router.ingest_fixture()?;
    let ctx = router.route_batch(&batch, request)?;
    Ok(Json(ctx.into()))
}
