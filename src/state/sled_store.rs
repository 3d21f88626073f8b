use crate::error::{AppError, Result};
use crate::events::TicketEvent;
use crate::models::{MetricsSnapshot, PredictionRecord, Ticket};
use crate::state::{StoredEvent, TicketStore};
use async_trait::async_trait;
use sled::Db;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Persistent store using Sled embedded database.
///
/// Tickets are keyed by ticket_id; predictions, events, and metrics are
/// append-only trees keyed by a monotonically generated id so duplicates per
/// ticket are preserved in insertion order.
#[derive(Clone)]
pub struct SledStore {
    db: Arc<Db>,
    tickets_tree: sled::Tree,
    predictions_tree: sled::Tree,
    events_tree: sled::Tree,
    metrics_tree: sled::Tree,
}

impl SledStore {
    /// Create a new Sled store at the specified path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref();
        let db = sled::open(&path)
            .map_err(|e| AppError::Storage(format!("Failed to open Sled database: {}", e)))?;

        let tickets_tree = db
            .open_tree("tickets")
            .map_err(|e| AppError::Storage(format!("Failed to open tickets tree: {}", e)))?;
        let predictions_tree = db
            .open_tree("predictions")
            .map_err(|e| AppError::Storage(format!("Failed to open predictions tree: {}", e)))?;
        let events_tree = db
            .open_tree("events")
            .map_err(|e| AppError::Storage(format!("Failed to open events tree: {}", e)))?;
        let metrics_tree = db
            .open_tree("metrics")
            .map_err(|e| AppError::Storage(format!("Failed to open metrics tree: {}", e)))?;

        tracing::info!("Initialized Sled store at {:?}", path_str);

        Ok(Self {
            db: Arc::new(db),
            tickets_tree,
            predictions_tree,
            events_tree,
            metrics_tree,
        })
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value)
            .map_err(|e| AppError::Storage(format!("Failed to serialize row: {}", e)))
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes)
            .map_err(|e| AppError::Storage(format!("Failed to deserialize row: {}", e)))
    }

    /// Next key for an append-only tree
    fn next_key(&self) -> Result<[u8; 8]> {
        let id = self
            .db
            .generate_id()
            .map_err(|e| AppError::Storage(format!("Failed to generate row id: {}", e)))?;
        Ok(id.to_be_bytes())
    }

    fn append<T: serde::Serialize>(&self, tree: &sled::Tree, value: &T) -> Result<()> {
        let key = self.next_key()?;
        let bytes = Self::serialize(value)?;
        tree.insert(key, bytes)
            .map_err(|e| AppError::Storage(format!("Failed to append row: {}", e)))?;
        tree.flush()
            .map_err(|e| AppError::Storage(format!("Failed to flush tree: {}", e)))?;
        Ok(())
    }

    fn scan<T: serde::de::DeserializeOwned>(tree: &sled::Tree) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        for entry in tree.iter() {
            let (_, bytes) =
                entry.map_err(|e| AppError::Storage(format!("Failed to scan tree: {}", e)))?;
            rows.push(Self::deserialize(&bytes)?);
        }
        Ok(rows)
    }

    /// Stored events, in insertion order (test/inspection helper)
    pub fn stored_events(&self) -> Result<Vec<StoredEvent>> {
        Self::scan(&self.events_tree)
    }

    /// Metrics snapshot history, in insertion order (test/inspection helper)
    pub fn metrics_history(&self) -> Result<Vec<MetricsSnapshot>> {
        Self::scan(&self.metrics_tree)
    }

    /// Flush pending writes to disk
    pub async fn flush(&self) -> Result<()> {
        self.db
            .flush_async()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to flush database: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl TicketStore for SledStore {
    async fn insert_ticket(&self, ticket: &Ticket) -> Result<bool> {
        let key = ticket.ticket_id.as_bytes();
        if self
            .tickets_tree
            .contains_key(key)
            .map_err(|e| AppError::Storage(format!("Failed to check ticket key: {}", e)))?
        {
            tracing::debug!(ticket_id = %ticket.ticket_id, "Duplicate ticket ignored");
            return Ok(false);
        }

        let bytes = Self::serialize(ticket)?;
        self.tickets_tree
            .insert(key, bytes)
            .map_err(|e| AppError::Storage(format!("Failed to save ticket: {}", e)))?;
        self.tickets_tree
            .flush()
            .map_err(|e| AppError::Storage(format!("Failed to flush tickets tree: {}", e)))?;

        tracing::debug!(ticket_id = %ticket.ticket_id, "Ticket saved");
        Ok(true)
    }

    async fn list_tickets(&self) -> Result<Vec<Ticket>> {
        Self::scan(&self.tickets_tree)
    }

    async fn list_unclassified_tickets(&self) -> Result<Vec<Ticket>> {
        let predictions: Vec<PredictionRecord> = Self::scan(&self.predictions_tree)?;
        let classified: HashSet<String> =
            predictions.into_iter().map(|p| p.ticket_id).collect();

        let tickets = Self::scan::<Ticket>(&self.tickets_tree)?;
        Ok(tickets
            .into_iter()
            .filter(|t| !classified.contains(&t.ticket_id))
            .collect())
    }

    async fn insert_prediction(&self, prediction: &PredictionRecord) -> Result<()> {
        self.append(&self.predictions_tree, prediction)?;
        tracing::debug!(ticket_id = %prediction.ticket_id, "Prediction saved");
        Ok(())
    }

    async fn list_predictions(&self) -> Result<Vec<PredictionRecord>> {
        Self::scan(&self.predictions_tree)
    }

    async fn insert_event(&self, event: &TicketEvent) -> Result<()> {
        let stored = StoredEvent::from_envelope(event)?;
        self.append(&self.events_tree, &stored)?;
        tracing::debug!(ticket_id = %event.ticket_id(), "Event saved");
        Ok(())
    }

    async fn insert_metrics(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        self.append(&self.metrics_tree, snapshot)?;
        tracing::debug!("Metrics snapshot saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ticket(id: &str) -> Ticket {
        Ticket::new(id, "text", "IT", "Low", Utc::now())
    }

    #[tokio::test]
    async fn test_ticket_insert_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStore::new(dir.path()).unwrap();

        assert!(store.insert_ticket(&ticket("t1")).await.unwrap());
        assert!(!store.insert_ticket(&ticket("t1")).await.unwrap());

        assert_eq!(store.list_tickets().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_predictions_preserve_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStore::new(dir.path()).unwrap();

        let record = PredictionRecord {
            ticket_id: "t1".to_string(),
            pred_category: "IT".to_string(),
            pred_priority: "High".to_string(),
            confidence: 0.9,
            processed_at: Utc::now(),
        };
        store.insert_prediction(&record).await.unwrap();
        store.insert_prediction(&record).await.unwrap();

        assert_eq!(store.list_predictions().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unclassified_backlog_query() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStore::new(dir.path()).unwrap();

        store.insert_ticket(&ticket("t1")).await.unwrap();
        store.insert_ticket(&ticket("t2")).await.unwrap();

        let record = PredictionRecord {
            ticket_id: "t1".to_string(),
            pred_category: "IT".to_string(),
            pred_priority: "Low".to_string(),
            confidence: 0.4,
            processed_at: Utc::now(),
        };
        store.insert_prediction(&record).await.unwrap();

        let backlog = store.list_unclassified_tickets().await.unwrap();
        assert_eq!(backlog.len(), 1);
        assert_eq!(backlog[0].ticket_id, "t2");
    }

    #[tokio::test]
    async fn test_event_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStore::new(dir.path()).unwrap();

        let event = TicketEvent::classified("t2", "Fees", "High", 0.81, Utc::now()).unwrap();
        store.insert_event(&event).await.unwrap();

        let events = store.stored_events().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "TICKET_CLASSIFIED");
        assert!(events[0].payload.contains("\"ticket_id\":\"t2\""));
    }
}
