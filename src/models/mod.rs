pub mod prediction;
pub mod ticket;

pub use prediction::{MetricsSnapshot, PredictionOutput, PredictionRecord};
pub use ticket::Ticket;
