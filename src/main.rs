use std::sync::Arc;
use ticket_triage::{
    api::{build_router, AppState},
    config::Config,
    events::EventBus,
    ml::{ModelRegistry, PredictionEngine},
    pipeline::ClassificationOrchestrator,
    state::create_store,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ticket_triage=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;

    tracing::info!("Starting ticket-triage v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Storage backend: {:?}", config.state.backend);

    // Initialize storage backend
    let store = create_store(&config.state).await?;

    // Initialize classification components
    let registry = Arc::new(ModelRegistry::new(&config.model));
    let engine = PredictionEngine::new(registry);
    let bus = EventBus::new();
    let orchestrator = Arc::new(ClassificationOrchestrator::new(engine, bus, store));

    let state = AppState { orchestrator };
    let router = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.http_port);
    tracing::info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
