//! Chat endpoints.
//!
//! POST /api/chat -- streams the reply as raw `text/plain` bytes,
//! terminated by connection close. A provider failure mid-stream appears
//! in-band as a literal `[ERROR] <message>` fragment the client must
//! pattern-match; it is not a distinct protocol frame.
//!
//! POST /api/chat/complete -- blocking variant returning the full reply as
//! JSON once generation finishes.

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::StreamExt;
use serde::Deserialize;

use calmleaf_core::chat::service::ChatTurnRequest;
use calmleaf_types::chat::ChatMode;

use crate::http::error::AppError;
use crate::state::AppState;

/// Request body for both chat endpoints.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub content: String,
    /// "standard" (default) or "professional"; anything else falls back.
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub thinking_enabled: bool,
}

impl ChatRequest {
    fn into_turn_request(self) -> ChatTurnRequest {
        ChatTurnRequest {
            user_id: self.user_id,
            content: self.content,
            mode: ChatMode::from_name(self.mode.as_deref()),
            thinking_enabled: self.thinking_enabled,
        }
    }
}

/// POST /api/chat -- streaming chat turn.
pub async fn stream_chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Response, AppError> {
    let fragments = state
        .chat_service
        .clone()
        .stream_turn(body.into_turn_request())
        .await?;

    let byte_stream = fragments.map(|fragment| Ok::<_, Infallible>(fragment.into_bytes()));

    let response = (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(byte_stream),
    )
        .into_response();
    Ok(response)
}

/// POST /api/chat/complete -- blocking chat turn.
pub async fn complete_chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    let content = state
        .chat_service
        .complete_turn(body.into_turn_request())
        .await?;

    Ok(Json(serde_json::json!({ "content": content })))
}
