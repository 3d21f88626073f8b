use crate::error::{AppError, Result};
use crate::models::{MetricsSnapshot, Ticket};
use crate::monitoring::metrics::{classification_report, LabelMetrics};
use crate::pipeline::HIGH_PRIORITY;
use crate::state::TicketStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Paths of the artifacts one monitoring run writes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringArtifacts {
    pub metrics_json: PathBuf,
    pub confusion_matrix_csv: PathBuf,
    pub high_priority_per_day_csv: PathBuf,
    pub drift_csv: PathBuf,
}

/// Full result of one monitoring run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringReport {
    /// Number of retained evaluation rows
    pub n_predictions: usize,

    pub category_accuracy: f64,
    pub precision_macro: f64,
    pub recall_macro: f64,
    pub f1_macro: f64,
    pub avg_confidence: f64,

    /// Label universe (union of true and predicted categories)
    pub labels: Vec<String>,

    /// Per-label precision/recall/F1 breakdown
    pub category_classification_report: BTreeMap<String, LabelMetrics>,

    /// Artifact locations
    pub artifacts: MonitoringArtifacts,
}

/// One retained evaluation row after the hygiene filter
struct EvaluationRow {
    true_category: String,
    pred_category: String,
    pred_priority: String,
    confidence: f64,
    created_at: DateTime<Utc>,
}

/// Joins stored tickets with stored predictions and derives accuracy and
/// temporal drift reports.
pub struct MonitoringEngine {
    store: Arc<dyn TicketStore>,
    output_dir: PathBuf,
}

impl MonitoringEngine {
    pub fn new(store: Arc<dyn TicketStore>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            output_dir: output_dir.into(),
        }
    }

    /// Run one monitoring pass: compute metrics and drift, persist a metrics
    /// snapshot, and write the four artifacts.
    pub async fn compute(&self) -> Result<MonitoringReport> {
        let rows = self.load_joined_rows().await?;
        let n = rows.len();
        if n == 0 {
            return Err(AppError::Pipeline(
                "No evaluation rows survived the hygiene filter".to_string(),
            ));
        }

        let y_true: Vec<String> = rows.iter().map(|r| r.true_category.clone()).collect();
        let y_pred: Vec<String> = rows.iter().map(|r| r.pred_category.clone()).collect();
        let report = classification_report(&y_true, &y_pred);

        let avg_confidence = rows.iter().map(|r| r.confidence).sum::<f64>() / n as f64;

        // Temporal aggregation by UTC calendar day of ticket creation
        let mut high_per_day: BTreeMap<String, usize> = BTreeMap::new();
        let mut confidence_per_day: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for row in &rows {
            let day = row.created_at.date_naive().to_string();
            if row.pred_priority == HIGH_PRIORITY {
                *high_per_day.entry(day.clone()).or_insert(0) += 1;
            }
            let entry = confidence_per_day.entry(day).or_insert((0.0, 0));
            entry.0 += row.confidence;
            entry.1 += 1;
        }

        fs::create_dir_all(&self.output_dir).await?;
        let artifacts = MonitoringArtifacts {
            metrics_json: self.output_dir.join("metrics.json"),
            confusion_matrix_csv: self.output_dir.join("confusion_matrix.csv"),
            high_priority_per_day_csv: self.output_dir.join("high_priority_per_day.csv"),
            drift_csv: self.output_dir.join("drift_confidence_over_time.csv"),
        };

        self.write_confusion_matrix(
            &artifacts.confusion_matrix_csv,
            &report.labels,
            &report.confusion_matrix,
        )
        .await?;
        self.write_high_per_day(&artifacts.high_priority_per_day_csv, &high_per_day)
            .await?;
        self.write_drift(&artifacts.drift_csv, &confidence_per_day)
            .await?;

        let snapshot = MetricsSnapshot {
            category_accuracy: report.accuracy,
            precision_macro: report.precision_macro,
            recall_macro: report.recall_macro,
            f1_macro: report.f1_macro,
            avg_confidence,
            computed_at: Utc::now(),
        };
        self.store.insert_metrics(&snapshot).await?;

        let monitoring_report = MonitoringReport {
            n_predictions: n,
            category_accuracy: report.accuracy,
            precision_macro: report.precision_macro,
            recall_macro: report.recall_macro,
            f1_macro: report.f1_macro,
            avg_confidence,
            labels: report.labels,
            category_classification_report: report.per_label,
            artifacts: artifacts.clone(),
        };

        let json = serde_json::to_string_pretty(&monitoring_report)?;
        fs::write(&artifacts.metrics_json, json).await?;

        info!(
            n_predictions = n,
            category_accuracy = format!("{:.4}", monitoring_report.category_accuracy).as_str(),
            f1_macro = format!("{:.4}", monitoring_report.f1_macro).as_str(),
            avg_confidence = format!("{:.4}", avg_confidence).as_str(),
            "Monitoring run complete"
        );

        Ok(monitoring_report)
    }

    /// Left join predictions to tickets on ticket_id and apply the hygiene
    /// filter: rows missing ground truth, creation time, or a finite
    /// confidence are dropped from statistics, not treated as run failures.
    async fn load_joined_rows(&self) -> Result<Vec<EvaluationRow>> {
        let tickets = self.store.list_tickets().await?;
        let predictions = self.store.list_predictions().await?;

        if tickets.is_empty() {
            return Err(AppError::Pipeline(
                "No tickets found. Run ingestion first.".to_string(),
            ));
        }
        if predictions.is_empty() {
            return Err(AppError::Pipeline(
                "No predictions found. Run batch inference first.".to_string(),
            ));
        }

        let by_id: HashMap<&str, &Ticket> = tickets
            .iter()
            .map(|t| (t.ticket_id.as_str(), t))
            .collect();

        let total = predictions.len();
        let mut rows = Vec::with_capacity(total);
        for prediction in &predictions {
            let ticket = by_id.get(prediction.ticket_id.as_str());
            let true_category = ticket.and_then(|t| t.true_category.clone());

            match (ticket, true_category) {
                (Some(ticket), Some(true_category)) if prediction.confidence.is_finite() => {
                    rows.push(EvaluationRow {
                        true_category,
                        pred_category: prediction.pred_category.clone(),
                        pred_priority: prediction.pred_priority.clone(),
                        confidence: prediction.confidence,
                        created_at: ticket.created_at,
                    });
                }
                _ => {}
            }
        }

        let dropped = total - rows.len();
        if dropped > 0 {
            warn!(dropped, total, "Dropped evaluation rows during hygiene filtering");
        }

        Ok(rows)
    }

    async fn write_confusion_matrix(
        &self,
        path: &Path,
        labels: &[String],
        matrix: &[Vec<usize>],
    ) -> Result<()> {
        let mut file = fs::File::create(path).await?;

        let header: Vec<String> = labels.iter().map(|l| format!("pred_{}", l)).collect();
        file.write_all(format!("label,{}\n", header.join(",")).as_bytes())
            .await?;

        for (i, label) in labels.iter().enumerate() {
            let cells: Vec<String> = matrix[i].iter().map(|c| c.to_string()).collect();
            file.write_all(format!("true_{},{}\n", label, cells.join(",")).as_bytes())
                .await?;
        }

        file.flush().await?;
        Ok(())
    }

    async fn write_high_per_day(
        &self,
        path: &Path,
        high_per_day: &BTreeMap<String, usize>,
    ) -> Result<()> {
        let mut file = fs::File::create(path).await?;
        file.write_all(b"day,high_priority_count\n").await?;
        for (day, count) in high_per_day {
            file.write_all(format!("{},{}\n", day, count).as_bytes())
                .await?;
        }
        file.flush().await?;
        Ok(())
    }

    async fn write_drift(
        &self,
        path: &Path,
        confidence_per_day: &BTreeMap<String, (f64, usize)>,
    ) -> Result<()> {
        let mut file = fs::File::create(path).await?;
        file.write_all(b"day,avg_confidence\n").await?;
        for (day, (sum, count)) in confidence_per_day {
            file.write_all(format!("{},{}\n", day, sum / *count as f64).as_bytes())
                .await?;
        }
        file.flush().await?;
        Ok(())
    }
}
