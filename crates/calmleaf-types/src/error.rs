use thiserror::Error;

use crate::llm::LlmError;

/// Errors from repository operations (used by trait definitions in
/// calmleaf-core). Store failures are fatal to the current request and are
/// never retried automatically.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,
}

/// Errors from a blocking chat turn.
///
/// Streaming turns never surface these to the caller as a `Result`; stream
/// failures are relayed in-band as an `[ERROR]` text fragment instead.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("store error: {0}")]
    Store(#[from] RepositoryError),

    #[error("provider error: {0}")]
    Provider(#[from] LlmError),

    #[error("provider returned no content")]
    EmptyResponse,
}

/// Errors from card regeneration and retrieval.
///
/// Every failure leaves the previously cached entry untouched: a bad
/// regeneration must never clobber a good cache.
#[derive(Debug, Error)]
pub enum CardError {
    #[error("store error: {0}")]
    Store(#[from] RepositoryError),

    #[error("provider error: {0}")]
    Provider(#[from] LlmError),

    #[error("provider returned no content")]
    EmptyResponse,

    #[error("card output is not valid JSON: {detail}")]
    Parse { detail: String },

    #[error("no conversation history to summarize")]
    NoHistory,
}
