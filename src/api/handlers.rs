use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::models::Ticket;
use crate::state::TicketStore;
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Root endpoint
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "ticket-triage is running" }))
}

/// Health check endpoint
pub async fn health_check() -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
pub struct TicketRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub ticket_id: String,
    pub category: String,
    pub priority: String,
    pub confidence: f64,
    pub processed_at: DateTime<Utc>,
}

/// Classify a new incoming support ticket.
///
/// Persists the unlabeled ticket, runs one classification (which records the
/// prediction and applies the event-emission policy), and returns the
/// classification tuple.
pub async fn predict_ticket(
    State(state): State<AppState>,
    Json(request): Json<TicketRequest>,
) -> Result<Json<PredictionResponse>> {
    if request.text.trim().is_empty() {
        return Err(AppError::Validation("Ticket text must not be empty".to_string()));
    }

    let ticket = Ticket::incoming(Ticket::generate_id(), request.text);
    state.orchestrator.store().insert_ticket(&ticket).await?;

    let event = state
        .orchestrator
        .classify(&ticket.ticket_id, &ticket.text)
        .await?;

    match event {
        crate::events::TicketEvent::TicketClassified {
            ticket_id,
            category,
            priority,
            confidence,
            processed_at,
        } => Ok(Json(PredictionResponse {
            ticket_id,
            category,
            priority,
            confidence,
            processed_at,
        })),
    }
}
