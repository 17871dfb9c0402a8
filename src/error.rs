// src/error.rs
//! Typed failures of the routing pipeline.
//!
//! `IngestError` covers everything that can go wrong while reading a news source;
//! `InvalidRequestError` is a caller mistake and is never recovered locally.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Source could not be opened or read.
    #[error("cannot read news source {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source is larger than the ingest cap.
    #[error("news source {origin} exceeds {limit} bytes")]
    TooLarge { origin: String, limit: u64 },

    /// Source is not valid JSON/XML or has an unexpected shape.
    #[error("malformed news source {origin}: {message}")]
    Parse { origin: String, message: String },

    /// A required record field is absent.
    #[error("record {index}: missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },

    /// A field that must carry text is blank.
    #[error("record {index}: field `{field}` must not be empty")]
    EmptyField { index: usize, field: &'static str },

    #[error("record {index}: invalid timestamp `{value}`")]
    InvalidTimestamp { index: usize, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRequestError {
    #[error("ticker must not be empty")]
    EmptyTicker,

    #[error("idea must not be empty")]
    EmptyIdea,

    /// Command name outside the configured command set.
    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("malformed command line: {0}")]
    MalformedCommandLine(String),
}

/// Either half of a full `ingest → filter → build` run.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    InvalidRequest(#[from] InvalidRequestError),
}
