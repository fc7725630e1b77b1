//! Application error type mapping to HTTP status codes and a JSON body.
//!
//! Errors surface as `{"error": <code>, "detail": <human-readable>}`.
//! Live chat stream failures never reach this type: they are relayed
//! in-band as an `[ERROR]` text fragment instead.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use calmleaf_types::error::{CardError, ChatError, RepositoryError};
use calmleaf_types::llm::LlmError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Chat turn errors (blocking variant).
    Chat(ChatError),
    /// Card regeneration/retrieval errors.
    Card(CardError),
    /// Store errors outside a service call.
    Store(RepositoryError),
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Chat(e)
    }
}

impl From<CardError> for AppError {
    fn from(e: CardError) -> Self {
        AppError::Card(e)
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Store(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, detail) = match &self {
            AppError::Chat(ChatError::Provider(e)) => provider_mapping(e),
            AppError::Chat(ChatError::EmptyResponse) => (
                StatusCode::BAD_GATEWAY,
                "EMPTY_RESPONSE",
                "provider returned no content".to_string(),
            ),
            AppError::Chat(ChatError::Store(e)) => store_mapping(e),
            AppError::Card(CardError::NoHistory) => (
                StatusCode::BAD_REQUEST,
                "NO_HISTORY",
                "no conversation history found".to_string(),
            ),
            AppError::Card(CardError::Parse { detail }) => (
                StatusCode::BAD_GATEWAY,
                "CARD_PARSE_ERROR",
                format!("card output is not valid JSON: {detail}"),
            ),
            AppError::Card(CardError::EmptyResponse) => (
                StatusCode::BAD_GATEWAY,
                "EMPTY_RESPONSE",
                "provider returned no content".to_string(),
            ),
            AppError::Card(CardError::Provider(e)) => provider_mapping(e),
            AppError::Card(CardError::Store(e)) => store_mapping(e),
            AppError::Store(e) => store_mapping(e),
        };

        let body = json!({
            "error": code,
            "detail": detail,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn provider_mapping(e: &LlmError) -> (StatusCode, &'static str, String) {
    (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", e.to_string())
}

fn store_mapping(e: &RepositoryError) -> (StatusCode, &'static str, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR", e.to_string())
}
