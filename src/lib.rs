//! Support ticket classification and model-quality monitoring.
//!
//! The pipeline runs as four idempotent stages over persisted state:
//! ingest (synthetic tickets), train (two probabilistic text classifiers),
//! infer (batch classification with selective event emission), and monitor
//! (accuracy and temporal drift over the full ticket/prediction history).
//! A thin HTTP boundary exposes single-ticket classification.

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod ingest;
pub mod ml;
pub mod models;
pub mod monitoring;
pub mod pipeline;
pub mod state;

pub use error::{AppError, Result};
