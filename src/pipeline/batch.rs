use crate::error::{AppError, Result};
use crate::models::Ticket;
use crate::pipeline::ClassificationOrchestrator;
use crate::state::TicketStore;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// One row of the predictions report
#[derive(Debug, Clone)]
struct BatchRow {
    ticket_id: String,
    text: String,
    true_category: Option<String>,
    true_priority: Option<String>,
    pred_category: String,
    pred_priority: String,
    confidence: f64,
    created_at: DateTime<Utc>,
    processed_at: DateTime<Utc>,
}

/// Batch classification runner.
///
/// Reads the unclassified backlog, samples a bounded reproducible subset,
/// drives the orchestrator over it, then writes the predictions report and
/// drains the bus to the event log. Re-running is idempotent by construction:
/// the backlog query only returns tickets still lacking a prediction.
pub struct BatchRunner {
    orchestrator: Arc<ClassificationOrchestrator>,
    output_dir: PathBuf,
    drain_bound: usize,
}

impl BatchRunner {
    pub fn new(
        orchestrator: Arc<ClassificationOrchestrator>,
        output_dir: impl Into<PathBuf>,
        drain_bound: usize,
    ) -> Self {
        Self {
            orchestrator,
            output_dir: output_dir.into(),
            drain_bound,
        }
    }

    /// Run one batch and return the path of the predictions report
    pub async fn run(&self, limit: usize, seed: u64) -> Result<PathBuf> {
        let backlog = self
            .orchestrator
            .store()
            .list_unclassified_tickets()
            .await?;

        if backlog.is_empty() {
            return Err(AppError::Pipeline(
                "No unclassified tickets found. Run ingestion first.".to_string(),
            ));
        }

        let sampled = sample_backlog(backlog, limit, seed);
        info!(sampled = sampled.len(), seed, "Starting batch classification");

        let mut rows: Vec<BatchRow> = Vec::with_capacity(sampled.len());
        for ticket in &sampled {
            let event = self
                .orchestrator
                .classify(&ticket.ticket_id, &ticket.text)
                .await?;

            match event {
                crate::events::TicketEvent::TicketClassified {
                    category,
                    priority,
                    confidence,
                    processed_at,
                    ..
                } => rows.push(BatchRow {
                    ticket_id: ticket.ticket_id.clone(),
                    text: ticket.text.clone(),
                    true_category: ticket.true_category.clone(),
                    true_priority: ticket.true_priority.clone(),
                    pred_category: category,
                    pred_priority: priority,
                    confidence,
                    created_at: ticket.created_at,
                    processed_at,
                }),
            }
        }

        rows.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.ticket_id.cmp(&b.ticket_id))
        });

        fs::create_dir_all(&self.output_dir).await?;
        let predictions_path = self.output_dir.join("predictions.csv");
        self.write_predictions(&predictions_path, &rows).await?;

        let events_path = self.output_dir.join("events.log");
        let drained = self.drain_events(&events_path).await?;

        info!(
            rows = rows.len(),
            events = drained,
            predictions = %predictions_path.display(),
            "Batch run complete"
        );

        Ok(predictions_path)
    }

    async fn write_predictions(&self, path: &Path, rows: &[BatchRow]) -> Result<()> {
        let mut file = fs::File::create(path).await?;
        file.write_all(
            b"ticket_id,text,true_category,true_priority,pred_category,pred_priority,confidence,created_at,processed_at\n",
        )
        .await?;

        for row in rows {
            let line = format!(
                "{},{},{},{},{},{},{},{},{}\n",
                csv_field(&row.ticket_id),
                csv_field(&row.text),
                csv_field(row.true_category.as_deref().unwrap_or("")),
                csv_field(row.true_priority.as_deref().unwrap_or("")),
                csv_field(&row.pred_category),
                csv_field(&row.pred_priority),
                row.confidence,
                row.created_at.to_rfc3339(),
                row.processed_at.to_rfc3339(),
            );
            file.write_all(line.as_bytes()).await?;
        }

        file.flush().await?;
        Ok(())
    }

    /// Drain the bus fully (up to the configured bound) and write each event
    /// as one log line, preserving enqueue order.
    async fn drain_events(&self, path: &Path) -> Result<usize> {
        let drained = self.orchestrator.bus().consume(self.drain_bound, false, None);

        let mut file = fs::File::create(path).await?;
        for event in &drained {
            let line = event.to_json_line()?;
            file.write_all(line.as_bytes()).await?;
            file.write_all(b"\n").await?;
        }
        file.flush().await?;

        Ok(drained.len())
    }
}

/// Seeded sampling over the backlog.
///
/// The backlog is ordered by (created_at, ticket_id) before index selection,
/// so the same (seed, backlog-state) always yields the same subset. A backlog
/// of `n <= limit` tickets is returned whole.
pub fn sample_backlog(mut backlog: Vec<Ticket>, limit: usize, seed: u64) -> Vec<Ticket> {
    backlog.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.ticket_id.cmp(&b.ticket_id))
    });

    if backlog.len() <= limit {
        return backlog;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..backlog.len()).collect();
    indices.shuffle(&mut rng);
    indices.truncate(limit);
    indices.sort_unstable();

    indices.into_iter().map(|i| backlog[i].clone()).collect()
}

/// Quote a CSV field when it contains separators, quotes, or newlines
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ticket(id: &str, day: u32) -> Ticket {
        Ticket::new(
            id,
            "text",
            "IT",
            "Low",
            Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_small_backlog_is_processed_whole() {
        let backlog = vec![ticket("t1", 1), ticket("t2", 2)];
        let sampled = sample_backlog(backlog, 10, 7);
        assert_eq!(sampled.len(), 2);
    }

    #[test]
    fn test_sampling_is_reproducible() {
        let backlog: Vec<Ticket> = (0..50)
            .map(|i| ticket(&format!("t{:02}", i), 1 + (i % 28) as u32))
            .collect();

        let first = sample_backlog(backlog.clone(), 10, 99);
        let second = sample_backlog(backlog.clone(), 10, 99);
        assert_eq!(first, second);
        assert_eq!(first.len(), 10);

        let other_seed = sample_backlog(backlog, 10, 100);
        assert_ne!(first, other_seed);
    }

    #[test]
    fn test_csv_field_escaping() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
