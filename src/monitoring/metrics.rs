//! Classification quality metrics over the label universe

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Per-label precision/recall/F1
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabelMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of ground-truth occurrences of the label
    pub support: usize,
}

/// Classification report over the union of true and predicted labels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// Label universe: union of observed true and predicted labels, sorted
    pub labels: Vec<String>,

    /// Exact-match rate
    pub accuracy: f64,

    /// Unweighted mean of per-label precision
    pub precision_macro: f64,

    /// Unweighted mean of per-label recall
    pub recall_macro: f64,

    /// Unweighted mean of per-label F1
    pub f1_macro: f64,

    /// Per-label breakdown, keyed by label
    pub per_label: BTreeMap<String, LabelMetrics>,

    /// Confusion matrix indexed by (true label, predicted label) over `labels`
    pub confusion_matrix: Vec<Vec<usize>>,
}

/// Compute accuracy, macro-averaged precision/recall/F1, the per-label
/// breakdown, and the confusion matrix.
///
/// The label universe is the union of true and predicted labels: a label that
/// only ever appears as a wrong prediction still gets a row and column, since
/// excluding it would understate error. Labels absent from one side
/// contribute zero precision or recall for that side, never undefined.
pub fn classification_report(y_true: &[String], y_pred: &[String]) -> ClassificationReport {
    debug_assert_eq!(y_true.len(), y_pred.len());
    let n = y_true.len();

    let universe: BTreeSet<&String> = y_true.iter().chain(y_pred.iter()).collect();
    let labels: Vec<String> = universe.into_iter().cloned().collect();
    let index: HashMap<&String, usize> = labels.iter().enumerate().map(|(i, l)| (l, i)).collect();
    let k = labels.len();

    let mut confusion = vec![vec![0usize; k]; k];
    let mut correct = 0usize;

    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        confusion[index[t]][index[p]] += 1;
        if t == p {
            correct += 1;
        }
    }

    let accuracy = if n > 0 { correct as f64 / n as f64 } else { 0.0 };

    let mut per_label = BTreeMap::new();
    for (i, label) in labels.iter().enumerate() {
        let tp = confusion[i][i];
        let predicted: usize = (0..k).map(|row| confusion[row][i]).sum();
        let actual: usize = confusion[i].iter().sum();

        let precision = if predicted > 0 {
            tp as f64 / predicted as f64
        } else {
            0.0
        };
        let recall = if actual > 0 {
            tp as f64 / actual as f64
        } else {
            0.0
        };
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        per_label.insert(
            label.clone(),
            LabelMetrics {
                precision,
                recall,
                f1,
                support: actual,
            },
        );
    }

    let k_f = k.max(1) as f64;
    let precision_macro = per_label.values().map(|m| m.precision).sum::<f64>() / k_f;
    let recall_macro = per_label.values().map(|m| m.recall).sum::<f64>() / k_f;
    let f1_macro = per_label.values().map(|m| m.f1).sum::<f64>() / k_f;

    ClassificationReport {
        labels,
        accuracy,
        precision_macro,
        recall_macro,
        f1_macro,
        per_label,
        confusion_matrix: confusion,
    }
}
