use crate::config::ModelConfig;
use crate::error::Result;
use crate::ml::TextClassifier;
use once_cell::sync::OnceCell;
use std::path::PathBuf;

/// Registry holding the two task classifiers.
///
/// An explicit value constructed once at process start and shared by `Arc`,
/// not a hidden global. Each classifier is loaded from its artifact on first use
/// and cached for the process lifetime; a missing or corrupt artifact is a
/// fatal error for classification.
pub struct ModelRegistry {
    category_path: PathBuf,
    priority_path: PathBuf,
    category: OnceCell<TextClassifier>,
    priority: OnceCell<TextClassifier>,
}

impl ModelRegistry {
    /// Create a registry pointing at the configured artifacts
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            category_path: config.category_model_path.clone(),
            priority_path: config.priority_model_path.clone(),
            category: OnceCell::new(),
            priority: OnceCell::new(),
        }
    }

    /// The category classifier, loading it on first use
    pub fn category(&self) -> Result<&TextClassifier> {
        self.category.get_or_try_init(|| {
            tracing::info!(path = ?self.category_path, "Loading category classifier");
            TextClassifier::load(&self.category_path)
        })
    }

    /// The priority classifier, loading it on first use
    pub fn priority(&self) -> Result<&TextClassifier> {
        self.priority.get_or_try_init(|| {
            tracing::info!(path = ?self.priority_path, "Loading priority classifier");
            TextClassifier::load(&self.priority_path)
        })
    }
}
