use std::sync::Arc;

use chrono::Duration;

use services::{Clock, PracticeService, SessionError, SessionService};
use storage::repository::{InMemoryStore, SessionStore};
use study_core::model::SessionStatus;
use study_core::time::fixed_now;

#[tokio::test]
async fn full_study_flow_against_one_store() {
    let store = InMemoryStore::new();
    let now = fixed_now();

    let practice = PracticeService::new(Clock::fixed(now), Arc::new(store.clone()));
    let sessions = SessionService::new(Clock::fixed(now), Arc::new(store.clone()));

    // Start the timer, add a card, study it, stop the timer.
    sessions.start().await.unwrap();

    let card = practice
        .create_card("hola", "hello", "Spanish")
        .await
        .unwrap();
    let drawn = practice.draw_card(Some("Spanish")).await.unwrap();
    assert_eq!(drawn.id, card.id);

    let update = practice.record_review(&card.id, true).await.unwrap();
    assert_eq!(update.mastery.value(), 2);

    let stopped = sessions
        .stop_at(now + Duration::minutes(25) + Duration::seconds(31))
        .await
        .unwrap();
    assert_eq!(stopped.duration_min, 26);

    // The machine is free again and the stored record is closed.
    let err = sessions.stop().await.unwrap_err();
    assert!(matches!(err, SessionError::NotActive));
    assert!(store.find_active().await.unwrap().is_none());
}

#[tokio::test]
async fn session_state_is_rederived_from_the_store() {
    let store = InMemoryStore::new();
    let now = fixed_now();

    // A Started record created by another writer blocks this service's
    // start, because state comes from the store and not from memory.
    store.create_session(now).await.unwrap();

    let sessions = SessionService::new(Clock::fixed(now), Arc::new(store.clone()));
    let err = sessions.start().await.unwrap_err();
    assert!(matches!(err, SessionError::AlreadyActive));

    // And the same foreign record is the one this service stops.
    let stopped = sessions.stop_at(now + Duration::minutes(5)).await.unwrap();
    assert_eq!(stopped.duration_min, 5);

    let active = store.find_active().await.unwrap();
    assert!(active.is_none());

    let all_stopped = sessions.start().await.unwrap();
    assert_eq!(all_stopped.status, SessionStatus::Started);
}
