use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use services::{Clock, PracticeService};
use storage::repository::InMemoryStore;
use study_core::model::{CardId, Flashcard};
use study_core::time::fixed_now;

fn seeded_card(id: &str, mastery: i64) -> Flashcard {
    Flashcard::from_persisted(
        CardId::new(id),
        format!("front-{id}"),
        format!("back-{id}"),
        "Spanish".into(),
        Some(mastery),
        Some(0),
        Some(fixed_now()),
    )
}

#[tokio::test]
async fn two_card_pool_converges_to_five_to_one() {
    let store = InMemoryStore::new();
    store.insert_card(seeded_card("fresh", 1)).unwrap();
    store.insert_card(seeded_card("known", 5)).unwrap();

    let service = PracticeService::new(Clock::fixed(fixed_now()), Arc::new(store));
    let mut rng = StdRng::seed_from_u64(1234);

    let draws = 100_000_u32;
    let mut fresh_hits = 0_u32;
    for _ in 0..draws {
        let card = service.draw_card_with_rng(None, &mut rng).await.unwrap();
        if card.id.as_str() == "fresh" {
            fresh_hits += 1;
        }
    }

    // weight(1) = 1 and weight(5) = 1/5, so the expected share for the
    // mastery-1 card is 5/6. The tolerance is wide enough for any seed.
    let share = f64::from(fresh_hits) / f64::from(draws);
    assert!(
        (share - 5.0 / 6.0).abs() < 0.01,
        "mastery-1 card drawn {share} of the time"
    );
}

#[tokio::test]
async fn promotions_shift_the_draw_distribution() {
    let store = InMemoryStore::new();
    store.insert_card(seeded_card("a", 1)).unwrap();
    store.insert_card(seeded_card("b", 1)).unwrap();

    let service = PracticeService::new(Clock::fixed(fixed_now()), Arc::new(store));

    // Promote card "a" to mastery 5 through four successful reviews.
    for _ in 0..4 {
        service
            .record_review(&CardId::new("a"), true)
            .await
            .unwrap();
    }

    let mut rng = StdRng::seed_from_u64(99);
    let draws = 60_000_u32;
    let mut a_hits = 0_u32;
    for _ in 0..draws {
        let card = service.draw_card_with_rng(None, &mut rng).await.unwrap();
        if card.id.as_str() == "a" {
            a_hits += 1;
        }
    }

    // weights are now 1/5 vs 1, so "a" should take roughly 1/6 of draws.
    let share = f64::from(a_hits) / f64::from(draws);
    assert!(
        (share - 1.0 / 6.0).abs() < 0.015,
        "promoted card drawn {share} of the time"
    );
}
