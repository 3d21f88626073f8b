pub mod handlers;
pub mod routes;

pub use routes::build_router;

use crate::pipeline::ClassificationOrchestrator;
use std::sync::Arc;

/// Shared application state for the HTTP layer
#[derive(Clone)]
pub struct AppState {
    /// Classification orchestrator
    pub orchestrator: Arc<ClassificationOrchestrator>,
}
