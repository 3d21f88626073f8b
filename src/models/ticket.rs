use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An incoming support ticket.
///
/// Tickets are created once by ingestion (or the HTTP boundary) and are
/// immutable thereafter. Ground-truth labels are optional: tickets submitted
/// through the API arrive unlabeled and are excluded from evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    /// Unique, opaque ticket identifier
    pub ticket_id: String,

    /// Raw ticket text
    pub text: String,

    /// Ground-truth category, if labeled
    pub true_category: Option<String>,

    /// Ground-truth priority, if labeled
    pub true_priority: Option<String>,

    /// Creation time (UTC)
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    /// Create a labeled ticket
    pub fn new(
        ticket_id: impl Into<String>,
        text: impl Into<String>,
        true_category: impl Into<String>,
        true_priority: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            ticket_id: ticket_id.into(),
            text: text.into(),
            true_category: Some(true_category.into()),
            true_priority: Some(true_priority.into()),
            created_at,
        }
    }

    /// Create an unlabeled ticket arriving through the HTTP boundary
    pub fn incoming(ticket_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            ticket_id: ticket_id.into(),
            text: text.into(),
            true_category: None,
            true_priority: None,
            created_at: Utc::now(),
        }
    }

    /// Generate a short opaque ticket id
    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()[..8].to_string()
    }
}
