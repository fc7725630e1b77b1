//! Frontend log ingestion.
//!
//! POST /api/log -- the mini-app client reports errors here; they are
//! re-emitted through tracing so client failures land in the same log
//! stream as server events.

use axum::Json;
use serde::Deserialize;
use tracing::{error, info, warn};

/// Request body for the log endpoint.
#[derive(Debug, Deserialize)]
pub struct LogRequest {
    pub level: String,
    pub message: String,
    #[serde(default)]
    pub context: serde_json::Value,
}

/// POST /api/log -- ingest a client-side log line.
pub async fn log_frontend(Json(body): Json<LogRequest>) -> Json<serde_json::Value> {
    match body.level.to_lowercase().as_str() {
        "error" => error!(target: "frontend", context = %body.context, "{}", body.message),
        "warn" | "warning" => {
            warn!(target: "frontend", context = %body.context, "{}", body.message)
        }
        _ => info!(target: "frontend", context = %body.context, "{}", body.message),
    }

    Json(serde_json::json!({ "status": "ok" }))
}
