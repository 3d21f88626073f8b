use crate::config::ModelConfig;
use crate::error::{AppError, Result};
use crate::ml::{TextClassifier, TfidfConfig};
use crate::state::TicketStore;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

/// Held-out evaluation results of one training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutcome {
    /// Held-out category accuracy
    pub category_accuracy: f64,

    /// Held-out priority accuracy
    pub priority_accuracy: f64,

    /// Training split size
    pub n_train: usize,

    /// Test split size
    pub n_test: usize,
}

/// Train the category and priority classifiers on stored labeled tickets.
///
/// Splits the labeled corpus with a seeded shuffle, fits one multinomial
/// logistic regression per task over shared TF-IDF features, evaluates
/// held-out accuracy, and writes both model artifacts to the configured
/// paths. Fatal if no labeled tickets exist.
pub async fn train_models(
    store: &dyn TicketStore,
    config: &ModelConfig,
    test_size: f64,
    seed: u64,
) -> Result<TrainingOutcome> {
    if !(0.0..1.0).contains(&test_size) {
        return Err(AppError::Validation(format!(
            "test_size must be in [0, 1), got {}",
            test_size
        )));
    }

    let tickets = store.list_tickets().await?;
    let mut labeled: Vec<(String, String, String)> = tickets
        .into_iter()
        .filter_map(|t| match (t.true_category, t.true_priority) {
            (Some(category), Some(priority)) if !t.text.trim().is_empty() => {
                Some((t.text.trim().to_string(), category, priority))
            }
            _ => None,
        })
        .collect();

    if labeled.is_empty() {
        return Err(AppError::Pipeline(
            "No labeled tickets found. Run ingestion first.".to_string(),
        ));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    labeled.shuffle(&mut rng);

    let n = labeled.len();
    let n_test = ((n as f64) * test_size).round() as usize;
    let n_test = n_test.min(n.saturating_sub(2));
    let n_train = n - n_test;

    let (test, train) = labeled.split_at(n_test);

    let train_texts: Vec<String> = train.iter().map(|r| r.0.clone()).collect();
    let train_categories: Vec<String> = train.iter().map(|r| r.1.clone()).collect();
    let train_priorities: Vec<String> = train.iter().map(|r| r.2.clone()).collect();

    let test_texts: Vec<String> = test.iter().map(|r| r.0.clone()).collect();
    let test_categories: Vec<String> = test.iter().map(|r| r.1.clone()).collect();
    let test_priorities: Vec<String> = test.iter().map(|r| r.2.clone()).collect();

    info!(n_train, n_test, "Training classifiers");

    let category_model =
        TextClassifier::fit(TfidfConfig::default(), &train_texts, &train_categories, 300)?;
    let priority_model =
        TextClassifier::fit(TfidfConfig::default(), &train_texts, &train_priorities, 300)?;

    let category_accuracy = category_model.accuracy(&test_texts, &test_categories)?;
    let priority_accuracy = priority_model.accuracy(&test_texts, &test_priorities)?;

    category_model.save(&config.category_model_path)?;
    priority_model.save(&config.priority_model_path)?;

    info!(
        category_accuracy = format!("{:.4}", category_accuracy).as_str(),
        priority_accuracy = format!("{:.4}", priority_accuracy).as_str(),
        "Training complete"
    );

    Ok(TrainingOutcome {
        category_accuracy,
        priority_accuracy,
        n_train,
        n_test,
    })
}
