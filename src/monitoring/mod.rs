pub mod engine;
pub mod metrics;

pub use engine::{MonitoringArtifacts, MonitoringEngine, MonitoringReport};
pub use metrics::{classification_report, ClassificationReport, LabelMetrics};
