use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers::{
    AppState, create_card, home, random_card, review_card, start_timer, stop_timer, store_health,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health/store", get(store_health))
        .route("/flashcards/random", get(random_card))
        .route("/flashcards", post(create_card))
        .route("/flashcards/{id}/review", post(review_card))
        .route("/timer/start", post(start_timer))
        .route("/timer/stop", post(stop_timer))
        .with_state(state)
}
