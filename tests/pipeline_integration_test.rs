/// Integration tests for the classification pipeline
///
/// These tests drive the real stages end to end over an in-memory store:
/// - ingest -> train -> infer -> monitor
/// - selective event emission (High priority only)
/// - idempotent batch re-runs over the shrinking backlog

use std::sync::Arc;
use ticket_triage::{
    config::ModelConfig,
    events::EventBus,
    ingest::generate_and_store_tickets,
    ml::{train_models, ModelRegistry, PredictionEngine},
    monitoring::MonitoringEngine,
    pipeline::{BatchRunner, ClassificationOrchestrator},
    state::{InMemoryStore, TicketStore},
};

fn model_config(dir: &std::path::Path) -> ModelConfig {
    ModelConfig {
        category_model_path: dir.join("category_model.bin"),
        priority_model_path: dir.join("priority_model.bin"),
    }
}

fn orchestrator(
    store: Arc<InMemoryStore>,
    config: &ModelConfig,
) -> Arc<ClassificationOrchestrator> {
    let registry = Arc::new(ModelRegistry::new(config));
    let engine = PredictionEngine::new(registry);
    Arc::new(ClassificationOrchestrator::new(
        engine,
        EventBus::new(),
        store,
    ))
}

#[tokio::test]
async fn test_full_pipeline_end_to_end() {
    let store = Arc::new(InMemoryStore::new());
    let dir = tempfile::tempdir().unwrap();
    let config = model_config(dir.path());

    // Ingest
    generate_and_store_tickets(store.as_ref(), 150, 7)
        .await
        .unwrap();

    // Train
    let outcome = train_models(store.as_ref(), &config, 0.2, 42).await.unwrap();
    assert!((0.0..=1.0).contains(&outcome.category_accuracy));
    assert!((0.0..=1.0).contains(&outcome.priority_accuracy));

    // Infer
    let orchestrator = orchestrator(store.clone(), &config);
    let runner = BatchRunner::new(orchestrator.clone(), dir.path(), 10_000);
    let predictions_path = runner.run(60, 2).await.unwrap();

    let predictions = store.list_predictions().await.unwrap();
    assert_eq!(predictions.len(), 60);
    assert!(predictions
        .iter()
        .all(|p| (0.0..=1.0).contains(&p.confidence)));

    let report = std::fs::read_to_string(&predictions_path).unwrap();
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines.len(), 61); // header + one row per classified ticket
    assert!(lines[0].starts_with("ticket_id,text,"));

    // Bus fully drained into the event log
    assert!(orchestrator.bus().is_empty());

    // Selective emission: persisted events match High-priority predictions exactly
    let high_count = predictions
        .iter()
        .filter(|p| p.pred_priority == "High")
        .count();
    let events = store.stored_events().await;
    assert_eq!(events.len(), high_count);

    let event_log = std::fs::read_to_string(dir.path().join("events.log")).unwrap();
    assert_eq!(event_log.lines().count(), high_count);
    for line in event_log.lines() {
        assert!(line.contains("\"event\":\"TICKET_CLASSIFIED\""));
        assert!(line.contains("\"priority\":\"High\""));
    }

    // Monitor
    let monitoring = MonitoringEngine::new(store.clone(), dir.path());
    let monitoring_report = monitoring.compute().await.unwrap();
    assert_eq!(monitoring_report.n_predictions, 60);
    assert!(!monitoring_report.labels.is_empty());
    assert!(std::fs::metadata(&monitoring_report.artifacts.metrics_json).is_ok());

    let snapshots = store.metrics_history().await;
    assert_eq!(snapshots.len(), 1);
}

#[tokio::test]
async fn test_batch_fails_on_empty_backlog() {
    let store = Arc::new(InMemoryStore::new());
    let dir = tempfile::tempdir().unwrap();
    let config = model_config(dir.path());

    let orchestrator = orchestrator(store, &config);
    let runner = BatchRunner::new(orchestrator, dir.path(), 10_000);

    let result = runner.run(10, 1).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_batch_reruns_consume_the_backlog() {
    let store = Arc::new(InMemoryStore::new());
    let dir = tempfile::tempdir().unwrap();
    let config = model_config(dir.path());

    generate_and_store_tickets(store.as_ref(), 30, 11)
        .await
        .unwrap();
    train_models(store.as_ref(), &config, 0.2, 42).await.unwrap();

    let orchestrator = orchestrator(store.clone(), &config);
    let runner = BatchRunner::new(orchestrator, dir.path(), 10_000);

    // First run takes a bounded sample, second run the remainder.
    runner.run(10, 5).await.unwrap();
    assert_eq!(store.list_predictions().await.unwrap().len(), 10);
    assert_eq!(store.list_unclassified_tickets().await.unwrap().len(), 20);

    runner.run(30, 5).await.unwrap();
    assert_eq!(store.list_predictions().await.unwrap().len(), 30);
    assert!(store.list_unclassified_tickets().await.unwrap().is_empty());

    // Nothing left to classify: the third run is a pipeline error.
    assert!(runner.run(10, 5).await.is_err());
}

#[tokio::test]
async fn test_low_priority_predictions_produce_no_events() {
    let store = Arc::new(InMemoryStore::new());
    let dir = tempfile::tempdir().unwrap();
    let config = model_config(dir.path());

    generate_and_store_tickets(store.as_ref(), 120, 3)
        .await
        .unwrap();
    train_models(store.as_ref(), &config, 0.2, 42).await.unwrap();

    let orchestrator = orchestrator(store.clone(), &config);
    let runner = BatchRunner::new(orchestrator, dir.path(), 10_000);
    runner.run(120, 9).await.unwrap();

    let predictions = store.list_predictions().await.unwrap();
    let events = store.stored_events().await;

    let high: Vec<&str> = predictions
        .iter()
        .filter(|p| p.pred_priority == "High")
        .map(|p| p.ticket_id.as_str())
        .collect();

    assert_eq!(events.len(), high.len());
    for event in &events {
        assert_eq!(event.event_type, "TICKET_CLASSIFIED");
        assert!(high.iter().any(|id| event.payload.contains(id)));
    }
}
