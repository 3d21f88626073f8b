//! Pipeline runner: the four idempotent stages (ingest, train, infer,
//! monitor) as subcommands, each consuming only persisted state.

use clap::{Parser, Subcommand};
use std::sync::Arc;
use ticket_triage::{
    config::Config,
    events::EventBus,
    ingest::generate_and_store_tickets,
    ml::{train_models, ModelRegistry, PredictionEngine},
    monitoring::MonitoringEngine,
    pipeline::{BatchRunner, ClassificationOrchestrator},
    state::create_store,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "triage-pipeline")]
#[command(about = "Ticket classification pipeline stages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and store synthetic tickets
    Ingest {
        #[arg(short, long, default_value = "400")]
        samples: usize,

        #[arg(long, default_value = "7")]
        seed: u64,
    },

    /// Train the category and priority classifiers
    Train {
        #[arg(short, long, default_value = "0.2")]
        test_size: f64,

        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Batch-classify a sample of the unclassified backlog
    Infer {
        #[arg(short, long)]
        limit: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Compute quality metrics and drift reports
    Monitor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ticket_triage=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let store = create_store(&config.state).await?;

    match cli.command {
        Commands::Ingest { samples, seed } => {
            let inserted = generate_and_store_tickets(store.as_ref(), samples, seed).await?;
            println!("Inserted {} synthetic tickets", inserted);
        }

        Commands::Train { test_size, seed } => {
            let outcome = train_models(store.as_ref(), &config.model, test_size, seed).await?;
            println!(
                "Category accuracy: {:.4}, priority accuracy: {:.4} ({} train / {} test)",
                outcome.category_accuracy,
                outcome.priority_accuracy,
                outcome.n_train,
                outcome.n_test
            );
        }

        Commands::Infer { limit, seed } => {
            let registry = Arc::new(ModelRegistry::new(&config.model));
            let engine = PredictionEngine::new(registry);
            let bus = EventBus::new();
            let orchestrator = Arc::new(ClassificationOrchestrator::new(engine, bus, store));
            let runner = BatchRunner::new(
                orchestrator,
                config.pipeline.output_dir.clone(),
                config.pipeline.drain_bound,
            );

            let path = runner
                .run(
                    limit.unwrap_or(config.pipeline.batch_limit),
                    seed.unwrap_or(config.pipeline.batch_seed),
                )
                .await?;
            println!("Wrote predictions report to {}", path.display());
        }

        Commands::Monitor => {
            let engine = MonitoringEngine::new(store, config.pipeline.output_dir.clone());
            let report = engine.compute().await?;
            println!(
                "Category accuracy: {:.4}, F1 (macro): {:.4}, avg confidence: {:.4} over {} predictions",
                report.category_accuracy,
                report.f1_macro,
                report.avg_confidence,
                report.n_predictions
            );
            println!("Metrics report: {}", report.artifacts.metrics_json.display());
        }
    }

    Ok(())
}
