//! Synthetic ticket ingestion
//!
//! Seeded fixture producer: generates overlapping ticket texts per category,
//! derives ground-truth priority from urgency cues, injects labeling noise,
//! and inserts tickets idempotently.

use crate::error::Result;
use crate::models::Ticket;
use crate::state::TicketStore;
use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::info;

/// Ticket categories produced by ingestion
pub const CATEGORIES: [&str; 5] = ["IT", "Fees", "Timetable", "Exams", "General"];

/// Ticket priorities
pub const PRIORITIES: [&str; 3] = ["Low", "Medium", "High"];

/// Phrases shared across categories (creates overlap)
const SHARED_PHRASES: [&str; 6] = [
    "The portal is showing an error.",
    "I need help as soon as possible.",
    "This is urgent due to a deadline.",
    "I tried multiple times but it still fails.",
    "It worked yesterday but not today.",
    "I am getting a timeout message.",
];

const IT_TEMPLATES: [&str; 5] = [
    "I can't access Moodle.",
    "My university login is not working.",
    "Password reset is not working.",
    "I get invalid credentials when logging in.",
    "Moodle page is not loading for my course.",
];

const FEES_TEMPLATES: [&str; 5] = [
    "My payment failed on the fee portal.",
    "I was charged twice for tuition.",
    "My transaction was declined.",
    "I need a receipt for my fee payment.",
    "The billing page is not loading when I try to pay.",
];

const TIMETABLE_TEMPLATES: [&str; 5] = [
    "My timetable shows overlapping classes.",
    "I need to change my tutorial group.",
    "My timetable is missing lab sessions.",
    "The timetable page is not loading.",
    "Wrong module is assigned in my timetable.",
];

const EXAMS_TEMPLATES: [&str; 5] = [
    "I need an exam deferral.",
    "My exam venue is not displayed.",
    "My exam timetable seems incorrect.",
    "I missed my exam due to illness.",
    "I need exam accommodation support.",
];

const GENERAL_TEMPLATES: [&str; 5] = [
    "I need help with enrollment.",
    "Who should I contact for student services?",
    "I have an issue with my ID card.",
    "I need guidance about attendance rules.",
    "I submitted a request last week and got no update.",
];

const DEADLINE_CONTEXT: [&str; 4] = [
    "My exam is tomorrow.",
    "Enrollment deadline is today.",
    "Fees deadline is tomorrow.",
    "My class starts today.",
];

fn templates_for(category: &str) -> &'static [&'static str] {
    match category {
        "IT" => &IT_TEMPLATES,
        "Fees" => &FEES_TEMPLATES,
        "Timetable" => &TIMETABLE_TEMPLATES,
        "Exams" => &EXAMS_TEMPLATES,
        _ => &GENERAL_TEMPLATES,
    }
}

/// Priority from urgency cues in the text, not from the category.
pub fn assign_priority(text: &str) -> &'static str {
    let t = text.to_lowercase();

    if ["urgent", "asap", "immediately"].iter().any(|w| t.contains(w))
        || t.contains("deadline")
        || t.contains("tomorrow")
    {
        return "High";
    }

    if ["failed", "error", "declined", "not working", "timeout", "can't access"]
        .iter()
        .any(|w| t.contains(w))
    {
        return "Medium";
    }

    "Low"
}

/// Add shared-phrase overlap and occasional deadline context
fn maybe_add_noise(text: String, rng: &mut StdRng) -> String {
    let mut text = text;
    if rng.gen::<f64>() < 0.7 {
        text = format!("{} {}", text, SHARED_PHRASES.choose(rng).unwrap());
    }
    if rng.gen::<f64>() < 0.35 {
        text = format!("{} {}", text, DEADLINE_CONTEXT.choose(rng).unwrap());
    }
    text
}

/// 8% chance to mislabel into a nearby category (labeling noise)
fn maybe_mislabel(true_category: &'static str, rng: &mut StdRng) -> &'static str {
    if rng.gen::<f64>() > 0.08 {
        return true_category;
    }

    let neighbors: &[&'static str] = match true_category {
        "IT" => &["Fees", "Timetable"],
        "Fees" => &["IT", "General"],
        "Timetable" => &["IT", "General"],
        "Exams" => &["General", "Timetable"],
        _ => &["IT", "Fees"],
    };
    neighbors.choose(rng).unwrap()
}

/// Generate `n_samples` synthetic tickets and insert them.
///
/// Re-runnable: generated ids are random, and duplicate inserts are no-ops.
/// Returns the number of tickets actually inserted, which can be lower than
/// `n_samples` when a generated id collides with an existing ticket.
pub async fn generate_and_store_tickets(
    store: &dyn TicketStore,
    n_samples: usize,
    seed: u64,
) -> Result<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let base_time = Utc::now() - Duration::days(30);
    let mut inserted = 0usize;

    for _ in 0..n_samples {
        let true_category = *CATEGORIES.choose(&mut rng).unwrap();
        let template = *templates_for(true_category).choose(&mut rng).unwrap();

        let text = maybe_add_noise(template.to_string(), &mut rng);
        let true_priority = assign_priority(&text);
        let stored_category = maybe_mislabel(true_category, &mut rng);

        let created_at = base_time
            + Duration::days(rng.gen_range(0..30))
            + Duration::hours(rng.gen_range(0..24))
            + Duration::minutes(rng.gen_range(0..60));

        let ticket = Ticket::new(
            Ticket::generate_id(),
            text,
            stored_category,
            true_priority,
            created_at,
        );
        if store.insert_ticket(&ticket).await? {
            inserted += 1;
        }
    }

    info!(inserted, n_samples, seed, "Inserted synthetic tickets");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{InMemoryStore, TicketStore};

    #[test]
    fn test_priority_from_urgency_cues() {
        assert_eq!(assign_priority("This is urgent due to a deadline."), "High");
        assert_eq!(assign_priority("My exam is tomorrow."), "High");
        assert_eq!(assign_priority("My payment failed on the portal."), "Medium");
        assert_eq!(assign_priority("I need a receipt."), "Low");
    }

    #[tokio::test]
    async fn test_generation_inserts_labeled_tickets() {
        let store = InMemoryStore::new();
        let inserted = generate_and_store_tickets(&store, 50, 7).await.unwrap();
        assert_eq!(inserted, 50);

        let tickets = store.list_tickets().await.unwrap();
        assert_eq!(tickets.len(), 50);
        for ticket in &tickets {
            assert!(ticket.true_category.is_some());
            assert!(PRIORITIES.contains(&ticket.true_priority.as_deref().unwrap()));
            assert!(!ticket.text.is_empty());
        }
    }

    #[tokio::test]
    async fn test_insert_count_matches_store_contents() {
        let store = InMemoryStore::new();
        let first = generate_and_store_tickets(&store, 40, 1).await.unwrap();
        let second = generate_and_store_tickets(&store, 40, 2).await.unwrap();

        // The reported counts reflect actual inserts, not submissions.
        let total = store.list_tickets().await.unwrap().len();
        assert_eq!(first + second, total);
    }

    #[tokio::test]
    async fn test_generation_covers_multiple_categories() {
        let store = InMemoryStore::new();
        generate_and_store_tickets(&store, 100, 7).await.unwrap();

        let tickets = store.list_tickets().await.unwrap();
        let distinct: std::collections::HashSet<_> = tickets
            .iter()
            .filter_map(|t| t.true_category.clone())
            .collect();
        assert!(distinct.len() >= 3);
    }
}
