use crate::error::Result;
use crate::events::TicketEvent;
use crate::models::{MetricsSnapshot, PredictionRecord, Ticket};
use crate::state::{StoredEvent, TicketStore};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory store (for tests and ephemeral runs)
#[derive(Clone)]
pub struct InMemoryStore {
    tickets: Arc<DashMap<String, Ticket>>,
    predictions: Arc<RwLock<Vec<PredictionRecord>>>,
    events: Arc<RwLock<Vec<StoredEvent>>>,
    metrics: Arc<RwLock<Vec<MetricsSnapshot>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tickets: Arc::new(DashMap::new()),
            predictions: Arc::new(RwLock::new(Vec::new())),
            events: Arc::new(RwLock::new(Vec::new())),
            metrics: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Stored events, in insertion order (test/inspection helper)
    pub async fn stored_events(&self) -> Vec<StoredEvent> {
        self.events.read().await.clone()
    }

    /// Metrics snapshot history, in insertion order (test/inspection helper)
    pub async fn metrics_history(&self) -> Vec<MetricsSnapshot> {
        self.metrics.read().await.clone()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TicketStore for InMemoryStore {
    async fn insert_ticket(&self, ticket: &Ticket) -> Result<bool> {
        if self.tickets.contains_key(&ticket.ticket_id) {
            tracing::debug!(ticket_id = %ticket.ticket_id, "Duplicate ticket ignored");
            return Ok(false);
        }
        self.tickets
            .insert(ticket.ticket_id.clone(), ticket.clone());
        tracing::debug!(ticket_id = %ticket.ticket_id, "Ticket saved");
        Ok(true)
    }

    async fn list_tickets(&self) -> Result<Vec<Ticket>> {
        let mut tickets: Vec<Ticket> = self
            .tickets
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        tickets.sort_by(|a, b| a.ticket_id.cmp(&b.ticket_id));
        Ok(tickets)
    }

    async fn list_unclassified_tickets(&self) -> Result<Vec<Ticket>> {
        let classified: HashSet<String> = self
            .predictions
            .read()
            .await
            .iter()
            .map(|p| p.ticket_id.clone())
            .collect();

        let mut tickets: Vec<Ticket> = self
            .tickets
            .iter()
            .filter(|entry| !classified.contains(entry.key()))
            .map(|entry| entry.value().clone())
            .collect();
        tickets.sort_by(|a, b| a.ticket_id.cmp(&b.ticket_id));
        Ok(tickets)
    }

    async fn insert_prediction(&self, prediction: &PredictionRecord) -> Result<()> {
        self.predictions.write().await.push(prediction.clone());
        tracing::debug!(ticket_id = %prediction.ticket_id, "Prediction saved");
        Ok(())
    }

    async fn list_predictions(&self) -> Result<Vec<PredictionRecord>> {
        Ok(self.predictions.read().await.clone())
    }

    async fn insert_event(&self, event: &TicketEvent) -> Result<()> {
        let stored = StoredEvent::from_envelope(event)?;
        self.events.write().await.push(stored);
        tracing::debug!(ticket_id = %event.ticket_id(), "Event saved");
        Ok(())
    }

    async fn insert_metrics(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        self.metrics.write().await.push(snapshot.clone());
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

    fn prediction(id: &str) -> PredictionRecord {
        PredictionRecord {
            ticket_id: id.to_string(),
            pred_category: "IT".to_string(),
            pred_priority: "Low".to_string(),
            confidence: 0.5,
            processed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_ticket_is_noop() {
        let store = InMemoryStore::new();
        let original = ticket("t1");
        assert!(store.insert_ticket(&original).await.unwrap());

        let mut changed = ticket("t1");
        changed.text = "other text".to_string();
        assert!(!store.insert_ticket(&changed).await.unwrap());

        let tickets = store.list_tickets().await.unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].text, "text");
    }

    #[tokio::test]
    async fn test_unclassified_excludes_predicted() {
        let store = InMemoryStore::new();
        store.insert_ticket(&ticket("t1")).await.unwrap();
        store.insert_ticket(&ticket("t2")).await.unwrap();
        store.insert_prediction(&prediction("t1")).await.unwrap();

        let backlog = store.list_unclassified_tickets().await.unwrap();
        assert_eq!(backlog.len(), 1);
        assert_eq!(backlog[0].ticket_id, "t2");
    }

    #[tokio::test]
    async fn test_predictions_are_append_only() {
        let store = InMemoryStore::new();
        store.insert_prediction(&prediction("t1")).await.unwrap();
        store.insert_prediction(&prediction("t1")).await.unwrap();

        let predictions = store.list_predictions().await.unwrap();
        assert_eq!(predictions.len(), 2);
    }
}
