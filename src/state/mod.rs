pub mod factory;
pub mod memory_store;
pub mod sled_store;

pub use factory::create_store;
pub use memory_store::InMemoryStore;
pub use sled_store::SledStore;

use crate::error::Result;
use crate::events::TicketEvent;
use crate::models::{MetricsSnapshot, PredictionRecord, Ticket};
use async_trait::async_trait;

/// Trait for pipeline storage operations.
///
/// Each operation is its own commit-or-rollback unit; no operation spans
/// multiple tickets atomically.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Insert a ticket. Idempotent: a duplicate ticket_id is a no-op and
    /// reports `false`; a fresh insert reports `true`.
    async fn insert_ticket(&self, ticket: &Ticket) -> Result<bool>;

    /// List all tickets
    async fn list_tickets(&self) -> Result<Vec<Ticket>>;

    /// List tickets that do not yet have a recorded prediction
    async fn list_unclassified_tickets(&self) -> Result<Vec<Ticket>>;

    /// Append a prediction record (no uniqueness constraint per ticket)
    async fn insert_prediction(&self, prediction: &PredictionRecord) -> Result<()>;

    /// List all prediction records
    async fn list_predictions(&self) -> Result<Vec<PredictionRecord>>;

    /// Append an event (type + payload)
    async fn insert_event(&self, event: &TicketEvent) -> Result<()>;

    /// Append a metrics snapshot
    async fn insert_metrics(&self, snapshot: &MetricsSnapshot) -> Result<()>;
}

/// Durable form of a published event: type plus JSON payload.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct StoredEvent {
    /// Event type tag
    pub event_type: String,

    /// Envelope payload as JSON
    pub payload: String,
}

impl StoredEvent {
    /// Build the durable form of an envelope
    pub fn from_envelope(event: &TicketEvent) -> Result<Self> {
        Ok(Self {
            event_type: event.event_type().to_string(),
            payload: event.to_json_line()?,
        })
    }
}
