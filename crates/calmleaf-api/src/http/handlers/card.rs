//! Card endpoint.
//!
//! POST /api/generate_card -- returns the card JSON for a user. A valid
//! cached entry is served directly; a miss or corrupt entry triggers a
//! synchronous regeneration. Failures come back as a structured error
//! object with a human-readable detail field.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::http::error::AppError;
use crate::state::AppState;

/// Request body for the card endpoint.
#[derive(Debug, Deserialize)]
pub struct CardRequest {
    pub user_id: String,
}

/// POST /api/generate_card -- cache-aside card retrieval.
pub async fn generate_card(
    State(state): State<AppState>,
    Json(body): Json<CardRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let card = state.card_service.get_card(&body.user_id).await?;
    Ok(Json(card))
}
