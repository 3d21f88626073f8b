//! Event envelope types for the classification pipeline

use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pipeline event envelope.
///
/// A fixed-schema tagged record: each variant carries typed payload fields and
/// is validated at construction time. Events are ephemeral in the bus and
/// become durable only once drained to the event log or persisted explicitly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum TicketEvent {
    /// A ticket was classified as high priority
    #[serde(rename = "TICKET_CLASSIFIED")]
    TicketClassified {
        ticket_id: String,
        category: String,
        priority: String,
        confidence: f64,
        processed_at: DateTime<Utc>,
    },
}

impl TicketEvent {
    /// Build a TICKET_CLASSIFIED envelope.
    ///
    /// Confidence is rounded to 6 decimal digits and must lie in [0, 1].
    pub fn classified(
        ticket_id: impl Into<String>,
        category: impl Into<String>,
        priority: impl Into<String>,
        confidence: f64,
        processed_at: DateTime<Utc>,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&confidence) || !confidence.is_finite() {
            return Err(AppError::Validation(format!(
                "Event confidence {} outside [0, 1]",
                confidence
            )));
        }

        Ok(TicketEvent::TicketClassified {
            ticket_id: ticket_id.into(),
            category: category.into(),
            priority: priority.into(),
            confidence: round6(confidence),
            processed_at,
        })
    }

    /// Get the ticket ID from any event
    pub fn ticket_id(&self) -> &str {
        match self {
            TicketEvent::TicketClassified { ticket_id, .. } => ticket_id,
        }
    }

    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            TicketEvent::TicketClassified { .. } => "TICKET_CLASSIFIED",
        }
    }

    /// Get the predicted priority carried by the event
    pub fn priority(&self) -> &str {
        match self {
            TicketEvent::TicketClassified { priority, .. } => priority,
        }
    }

    /// Get the rounded confidence carried by the event
    pub fn confidence(&self) -> f64 {
        match self {
            TicketEvent::TicketClassified { confidence, .. } => *confidence,
        }
    }

    /// Serialize the envelope as one event-log line
    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Round to 6 decimal digits
fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}
