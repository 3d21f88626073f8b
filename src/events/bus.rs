//! In-memory event bus

use crate::error::{AppError, Result};
use crate::events::TicketEvent;
use crossbeam::channel::{unbounded, Receiver, Sender};
use std::time::Duration;

/// Cloneable publish-only handle onto a bus.
///
/// Hands the send side to concurrent producers without exposing the receiver.
#[derive(Clone)]
pub struct EventPublisher {
    tx: Sender<TicketEvent>,
}

impl EventPublisher {
    /// Append an event without blocking
    pub fn publish(&self, event: TicketEvent) -> Result<()> {
        self.tx
            .send(event)
            .map_err(|e| AppError::Internal(format!("Event bus closed: {}", e)))
    }
}

/// In-memory, best-effort FIFO queue of event envelopes.
///
/// Multi-producer/single-consumer discipline: any number of
/// [`EventPublisher`] handles may publish concurrently; the bus itself is the
/// sole consumer and is deliberately not cloneable. The bus holds no
/// durability guarantee: anything not drained before process exit is lost.
pub struct EventBus {
    tx: Sender<TicketEvent>,
    rx: Receiver<TicketEvent>,
}

impl EventBus {
    /// Create an unbounded bus
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// A publish-only handle for producers
    pub fn publisher(&self) -> EventPublisher {
        EventPublisher {
            tx: self.tx.clone(),
        }
    }

    /// Append an event without blocking
    pub fn publish(&self, event: TicketEvent) -> Result<()> {
        self.tx
            .send(event)
            .map_err(|e| AppError::Internal(format!("Event bus closed: {}", e)))
    }

    /// Remove and return up to `max_events` events in enqueue order.
    ///
    /// Non-blocking calls return immediately with whatever is present,
    /// possibly empty. Blocking calls wait up to `timeout` (indefinitely if
    /// `None`) for each next event.
    pub fn consume(
        &self,
        max_events: usize,
        block: bool,
        timeout: Option<Duration>,
    ) -> Vec<TicketEvent> {
        let mut events = Vec::new();

        for _ in 0..max_events {
            let next = if block {
                match timeout {
                    Some(t) => self.rx.recv_timeout(t).map_err(|_| ()),
                    None => self.rx.recv().map_err(|_| ()),
                }
            } else {
                self.rx.try_recv().map_err(|_| ())
            };

            match next {
                Ok(event) => events.push(event),
                Err(()) => break,
            }
        }

        events
    }

    /// Number of events currently queued
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether the bus is currently empty
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(id: &str) -> TicketEvent {
        TicketEvent::classified(id, "IT", "High", 0.9, Utc::now()).unwrap()
    }

    #[test]
    fn test_fifo_order() {
        let bus = EventBus::new();
        bus.publish(event("e1")).unwrap();
        bus.publish(event("e2")).unwrap();
        bus.publish(event("e3")).unwrap();

        let drained = bus.consume(10_000, false, None);
        let ids: Vec<&str> = drained.iter().map(|e| e.ticket_id()).collect();
        assert_eq!(ids, vec!["e1", "e2", "e3"]);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_non_blocking_consume_on_empty_bus() {
        let bus = EventBus::new();
        let drained = bus.consume(100, false, None);
        assert!(drained.is_empty());
    }

    #[test]
    fn test_consume_respects_max_events() {
        let bus = EventBus::new();
        for i in 0..5 {
            bus.publish(event(&format!("e{}", i))).unwrap();
        }

        let first = bus.consume(3, false, None);
        assert_eq!(first.len(), 3);
        assert_eq!(bus.len(), 2);

        let rest = bus.consume(3, false, None);
        assert_eq!(rest.len(), 2);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_blocking_consume_times_out() {
        let bus = EventBus::new();
        bus.publish(event("e1")).unwrap();

        let drained = bus.consume(5, true, Some(Duration::from_millis(20)));
        assert_eq!(drained.len(), 1);
    }

    #[test]
    fn test_concurrent_publishers() {
        let bus = EventBus::new();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let publisher = bus.publisher();
                std::thread::spawn(move || {
                    for j in 0..25 {
                        publisher.publish(event(&format!("p{}-{}", i, j))).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let drained = bus.consume(10_000, false, None);
        assert_eq!(drained.len(), 100);
    }
}
