pub mod batch;
pub mod orchestrator;

pub use batch::BatchRunner;
pub use orchestrator::ClassificationOrchestrator;

/// Predicted priority that triggers event emission
pub const HIGH_PRIORITY: &str = "High";
