use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw output of the prediction engine for one ticket text.
///
/// `confidence` is the arithmetic mean of the two per-task confidences: a
/// single explainable scalar, not a joint probability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionOutput {
    /// Predicted category
    pub pred_category: String,

    /// Predicted priority
    pub pred_priority: String,

    /// Combined confidence, in [0, 1]
    pub confidence: f64,

    /// Max posterior probability of the category classifier
    pub category_confidence: f64,

    /// Max posterior probability of the priority classifier
    pub priority_confidence: f64,
}

/// A persisted classification result.
///
/// Append-only; multiple records for the same ticket are permitted and the
/// monitoring join treats the relation as one-to-many.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionRecord {
    /// Logical reference to a ticket (not enforced on write)
    pub ticket_id: String,

    /// Predicted category
    pub pred_category: String,

    /// Predicted priority
    pub pred_priority: String,

    /// Combined confidence, in [0, 1]
    pub confidence: f64,

    /// Classification time (UTC)
    pub processed_at: DateTime<Utc>,
}

/// Headline quality metrics persisted once per monitoring run.
///
/// History is append-only, never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsSnapshot {
    /// Exact-match rate between true and predicted category
    pub category_accuracy: f64,

    /// Unweighted mean of per-label precision across the label universe
    pub precision_macro: f64,

    /// Unweighted mean of per-label recall across the label universe
    pub recall_macro: f64,

    /// Unweighted mean of per-label F1 across the label universe
    pub f1_macro: f64,

    /// Mean confidence across all retained evaluation rows
    pub avg_confidence: f64,

    /// Snapshot time (UTC)
    pub computed_at: DateTime<Utc>,
}
