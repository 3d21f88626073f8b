use crate::error::{AppError, Result};
use crate::ml::vectorizer::{TfidfConfig, TfidfVectorizer};
use linfa::prelude::*;
use linfa_logistic::{MultiFittedLogisticRegression, MultiLogisticRegression};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A probabilistic text classifier: TF-IDF features into a multinomial
/// logistic regression.
///
/// One instance is trained per task (category, priority). The class list is
/// the sorted set of labels seen at fit time; predictions are deterministic
/// for a fixed fitted model.
#[derive(Serialize, Deserialize)]
pub struct TextClassifier {
    /// Fitted vectorizer
    vectorizer: TfidfVectorizer,

    /// Fitted multinomial model over encoded class indices
    model: MultiFittedLogisticRegression<f64, usize>,

    /// Ordered class labels; index i is the encoded label i
    classes: Vec<String>,
}

impl TextClassifier {
    /// Fit a classifier on a labeled corpus
    pub fn fit(
        config: TfidfConfig,
        texts: &[String],
        labels: &[String],
        max_iterations: u64,
    ) -> Result<Self> {
        if texts.is_empty() || texts.len() != labels.len() {
            return Err(AppError::Model(format!(
                "Mismatched training corpus: {} texts, {} labels",
                texts.len(),
                labels.len()
            )));
        }

        let mut classes: Vec<String> = labels.to_vec();
        classes.sort();
        classes.dedup();
        if classes.len() < 2 {
            return Err(AppError::Model(format!(
                "Need at least 2 distinct labels to train, got {}",
                classes.len()
            )));
        }

        let encoded: Vec<usize> = labels
            .iter()
            .map(|label| {
                classes
                    .binary_search(label)
                    .map_err(|_| AppError::Internal(format!("Unencodable label: {}", label)))
            })
            .collect::<Result<_>>()?;

        let mut vectorizer = TfidfVectorizer::new(config);
        vectorizer.fit(texts)?;
        let features = vectorizer.transform_batch(texts)?;
        let targets = Array1::from_vec(encoded);

        let dataset = Dataset::new(features, targets);
        let model = MultiLogisticRegression::default()
            .max_iterations(max_iterations)
            .fit(&dataset)
            .map_err(|e| AppError::Model(format!("Failed to fit logistic regression: {}", e)))?;

        tracing::debug!(
            n_samples = texts.len(),
            n_classes = classes.len(),
            "Fitted text classifier"
        );

        Ok(Self {
            vectorizer,
            model,
            classes,
        })
    }

    /// Ordered list of known class labels
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Class-probability distribution for a text, in the fitted model's
    /// internal class order. Use [`predict_top`](Self::predict_top) for the
    /// argmax label.
    pub fn predict_proba(&self, text: &str) -> Result<Vec<f64>> {
        let features = self.features_for(text)?;
        let probabilities = self.model.predict_probabilities(&features);
        Ok(probabilities.row(0).to_vec())
    }

    /// Predicted label and its posterior probability (the distribution max)
    pub fn predict_top(&self, text: &str) -> Result<(String, f64)> {
        let features = self.features_for(text)?;

        let probabilities = self.model.predict_probabilities(&features);
        let confidence = probabilities
            .row(0)
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max);

        let predicted = self.model.predict(&features);
        let index = predicted[0];
        let label = self
            .classes
            .get(index)
            .ok_or_else(|| AppError::Internal(format!("Predicted unknown class index {}", index)))?
            .clone();

        Ok((label, confidence))
    }

    /// Exact-match accuracy over a labeled evaluation set
    pub fn accuracy(&self, texts: &[String], labels: &[String]) -> Result<f64> {
        if texts.is_empty() {
            return Ok(0.0);
        }

        let mut correct = 0usize;
        for (text, label) in texts.iter().zip(labels.iter()) {
            let (predicted, _) = self.predict_top(text)?;
            if &predicted == label {
                correct += 1;
            }
        }

        Ok(correct as f64 / texts.len() as f64)
    }

    /// Serialize the fitted classifier to a model artifact
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = bincode::serialize(self)
            .map_err(|e| AppError::Model(format!("Failed to serialize model: {}", e)))?;
        std::fs::write(&path, bytes)?;
        tracing::info!(path = ?path.as_ref(), "Saved model artifact");
        Ok(())
    }

    /// Load a fitted classifier from a model artifact
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(&path).map_err(|e| {
            AppError::Model(format!(
                "Failed to read model artifact {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;
        bincode::deserialize(&bytes)
            .map_err(|e| AppError::Model(format!("Failed to deserialize model artifact: {}", e)))
    }

    fn features_for(&self, text: &str) -> Result<Array2<f64>> {
        let vector = self.vectorizer.transform(text)?;
        let n = vector.len();
        vector
            .into_shape((1, n))
            .map_err(|e| AppError::Internal(format!("Failed to shape feature row: {}", e)))
    }
}
