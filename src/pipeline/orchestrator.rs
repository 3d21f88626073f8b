use crate::error::Result;
use crate::events::{EventBus, TicketEvent};
use crate::ml::PredictionEngine;
use crate::models::PredictionRecord;
use crate::pipeline::HIGH_PRIORITY;
use crate::state::TicketStore;
use chrono::Utc;
use std::sync::Arc;

/// Composes engine, bus, and persistence for one classification call.
pub struct ClassificationOrchestrator {
    engine: PredictionEngine,
    bus: EventBus,
    store: Arc<dyn TicketStore>,
}

impl ClassificationOrchestrator {
    pub fn new(engine: PredictionEngine, bus: EventBus, store: Arc<dyn TicketStore>) -> Self {
        Self { engine, bus, store }
    }

    /// Classify one ticket text.
    ///
    /// Every classification persists a prediction record. The event is
    /// published to the bus and persisted only when the predicted priority is
    /// "High"; lower priorities never surface as events. The envelope is
    /// returned in all cases so callers can read predicted labels,
    /// confidence, and timestamp from one structure.
    pub async fn classify(&self, ticket_id: &str, text: &str) -> Result<TicketEvent> {
        let output = self.engine.predict(text)?;
        let processed_at = Utc::now();

        let event = TicketEvent::classified(
            ticket_id,
            output.pred_category.clone(),
            output.pred_priority.clone(),
            output.confidence,
            processed_at,
        )?;

        let record = PredictionRecord {
            ticket_id: ticket_id.to_string(),
            pred_category: output.pred_category.clone(),
            pred_priority: output.pred_priority.clone(),
            confidence: output.confidence,
            processed_at,
        };
        self.store.insert_prediction(&record).await?;

        if output.pred_priority == HIGH_PRIORITY {
            self.bus.publish(event.clone())?;
            self.store.insert_event(&event).await?;
            tracing::debug!(
                ticket_id = ticket_id,
                confidence = event.confidence(),
                "High-priority classification emitted"
            );
        }

        Ok(event)
    }

    /// Shared bus handle (for the batch drain step)
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Shared store handle
    pub fn store(&self) -> &Arc<dyn TicketStore> {
        &self.store
    }
}
