//! Admin API routes
//!
//! Operator-facing endpoints, separate from the conversational pipeline:
//! a health probe and a bearer-token-guarded broadcast endpoint that
//! injects an outbound message to an arbitrary recipient.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Form, Router,
};
use serde::{Deserialize, Serialize};

use crate::conversation::SenderId;
use crate::transport::Transport;

#[derive(Clone)]
pub struct AdminState {
    pub transport: Arc<dyn Transport>,
    pub broadcast_token: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Deserialize)]
struct BroadcastForm {
    number: String,
    message: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn broadcast(
    State(state): State<AdminState>,
    headers: HeaderMap,
    Form(form): Form<BroadcastForm>,
) -> StatusCode {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", state.broadcast_token))
        .unwrap_or(false);
    if !authorized {
        return StatusCode::UNAUTHORIZED;
    }

    tracing::debug!(number = %form.number, "broadcasting message");

    let recipient = SenderId::normalize(&form.number);
    match state.transport.send(&recipient, &form.message).await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            tracing::error!(error = %err, "failed to send broadcast");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub fn router() -> Router<AdminState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/broadcast", post(broadcast))
}
