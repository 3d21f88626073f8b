use crate::error::Result;
use crate::ml::ModelRegistry;
use crate::models::PredictionOutput;
use std::sync::Arc;

/// Produces labeled predictions and confidences for ticket text.
///
/// Deterministic: identical text against a fixed model pair always yields
/// identical output.
pub struct PredictionEngine {
    registry: Arc<ModelRegistry>,
}

impl PredictionEngine {
    /// Create an engine over a shared model registry
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    /// Predict category and priority for a single ticket text.
    ///
    /// Each per-task confidence is the maximum posterior probability of that
    /// classifier; the combined confidence is their arithmetic mean. Fails if
    /// either model artifact cannot be loaded.
    pub fn predict(&self, text: &str) -> Result<PredictionOutput> {
        let (pred_category, category_confidence) = self.registry.category()?.predict_top(text)?;
        let (pred_priority, priority_confidence) = self.registry.priority()?.predict_top(text)?;

        let confidence = (category_confidence + priority_confidence) / 2.0;

        Ok(PredictionOutput {
            pred_category,
            pred_priority,
            confidence,
            category_confidence,
            priority_confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::ml::{TextClassifier, TfidfConfig};

    fn trained_registry(dir: &std::path::Path) -> ModelRegistry {
        let texts = vec![
            "cannot access moodle login".to_string(),
            "moodle password reset broken".to_string(),
            "payment failed on fee portal".to_string(),
            "charged twice for tuition fees".to_string(),
            "urgent fee deadline tomorrow".to_string(),
            "urgent moodle outage deadline today".to_string(),
        ];
        let categories = vec![
            "IT".to_string(),
            "IT".to_string(),
            "Fees".to_string(),
            "Fees".to_string(),
            "Fees".to_string(),
            "IT".to_string(),
        ];
        let priorities = vec![
            "Medium".to_string(),
            "Medium".to_string(),
            "Medium".to_string(),
            "Low".to_string(),
            "High".to_string(),
            "High".to_string(),
        ];

        let tfidf = TfidfConfig {
            ngram_max: 2,
            min_doc_freq: 1,
            max_features: 500,
        };

        let config = ModelConfig {
            category_model_path: dir.join("category.bin"),
            priority_model_path: dir.join("priority.bin"),
        };

        TextClassifier::fit(tfidf.clone(), &texts, &categories, 300)
            .unwrap()
            .save(&config.category_model_path)
            .unwrap();
        TextClassifier::fit(tfidf, &texts, &priorities, 300)
            .unwrap()
            .save(&config.priority_model_path)
            .unwrap();

        ModelRegistry::new(&config)
    }

    #[test]
    fn test_confidence_is_mean_of_task_confidences() {
        let dir = tempfile::tempdir().unwrap();
        let engine = PredictionEngine::new(Arc::new(trained_registry(dir.path())));

        let output = engine.predict("urgent fee deadline tomorrow").unwrap();
        let expected = (output.category_confidence + output.priority_confidence) / 2.0;
        assert!((output.confidence - expected).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&output.confidence));
        assert!((0.0..=1.0).contains(&output.category_confidence));
        assert!((0.0..=1.0).contains(&output.priority_confidence));
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let engine = PredictionEngine::new(Arc::new(trained_registry(dir.path())));

        let first = engine.predict("moodle login fails").unwrap();
        let second = engine.predict("moodle login fails").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_models_fail_prediction() {
        let config = ModelConfig {
            category_model_path: "/nonexistent/category.bin".into(),
            priority_model_path: "/nonexistent/priority.bin".into(),
        };
        let engine = PredictionEngine::new(Arc::new(ModelRegistry::new(&config)));
        assert!(engine.predict("anything").is_err());
    }
}
