pub mod classifier;
pub mod engine;
pub mod registry;
pub mod training;
pub mod vectorizer;

pub use classifier::TextClassifier;
pub use engine::PredictionEngine;
pub use registry::ModelRegistry;
pub use training::{train_models, TrainingOutcome};
pub use vectorizer::{TfidfConfig, TfidfVectorizer};
