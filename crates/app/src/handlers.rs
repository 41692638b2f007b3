use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use services::{PracticeError, PracticeService, SessionError, SessionService};
use storage::repository::{StorageError, StoreHealth, Stores};
use study_core::model::CardId;
use study_core::time::{Clock, parse_utc};

//
// ─── SHARED STATE ──────────────────────────────────────────────────────────────
//

#[derive(Clone)]
pub struct AppState {
    pub practice: PracticeService,
    pub sessions: SessionService,
    pub health: Arc<dyn StoreHealth>,
}

impl AppState {
    #[must_use]
    pub fn new(stores: Stores) -> Self {
        let clock = Clock::default_clock();
        Self {
            practice: PracticeService::new(clock, stores.cards),
            sessions: SessionService::new(clock, stores.sessions),
            health: stores.health,
        }
    }
}

type ApiError = (StatusCode, Json<Value>);

//
// ─── QUERY / BODY TYPES ────────────────────────────────────────────────────────
//

#[derive(Deserialize)]
pub struct RandomQuery {
    pub language: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateCardBody {
    pub front: String,
    pub back: String,
    pub language: String,
}

#[derive(Deserialize)]
pub struct ReviewBody {
    pub success: bool,
}

/// Optional explicit timestamp for the timer endpoints; the server clock
/// is used when absent.
#[derive(Deserialize)]
pub struct TimerQuery {
    pub at: Option<String>,
}

//
// ─── HANDLERS ──────────────────────────────────────────────────────────────────
//

// GET /
pub async fn home() -> Json<Value> {
    Json(json!({ "ok": true, "msg": "server operational" }))
}

// GET /health/store
pub async fn store_health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let report = state.health.health().await.map_err(storage_error)?;
    Ok(Json(json!({
        "ok": true,
        "backend": report.backend,
        "detail": report.detail,
    })))
}

// GET /flashcards/random?language=...
pub async fn random_card(
    State(state): State<AppState>,
    Query(params): Query<RandomQuery>,
) -> Result<Json<Value>, ApiError> {
    let card = state
        .practice
        .draw_card(params.language.as_deref())
        .await
        .map_err(practice_error)?;

    Ok(Json(json!({
        "id": card.id,
        "front": card.front,
        "back": card.back,
        "language": card.language,
    })))
}

// POST /flashcards
pub async fn create_card(
    State(state): State<AppState>,
    Json(body): Json<CreateCardBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let card = state
        .practice
        .create_card(body.front, body.back, body.language)
        .await
        .map_err(practice_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": card.id,
            "front": card.front,
            "back": card.back,
            "language": card.language,
            "mastery": card.mastery,
            "repetitions": card.repetitions,
        })),
    ))
}

// POST /flashcards/{id}/review
pub async fn review_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ReviewBody>,
) -> Result<Json<Value>, ApiError> {
    let update = state
        .practice
        .record_review(&CardId::new(id), body.success)
        .await
        .map_err(practice_error)?;

    Ok(Json(json!({
        "mastery": update.mastery,
        "repetitions": update.repetitions,
        "last_review": update.last_review,
    })))
}

// POST /timer/start?at=...
pub async fn start_timer(
    State(state): State<AppState>,
    Query(params): Query<TimerQuery>,
) -> Result<Json<Value>, ApiError> {
    let session = match parse_at(params.at.as_deref())? {
        Some(at) => state.sessions.start_at(at).await,
        None => state.sessions.start().await,
    }
    .map_err(session_error)?;

    Ok(Json(json!({
        "status": "started",
        "id": session.id,
        "start_time": session.started_at,
    })))
}

// POST /timer/stop?at=...
pub async fn stop_timer(
    State(state): State<AppState>,
    Query(params): Query<TimerQuery>,
) -> Result<Json<Value>, ApiError> {
    let stopped = match parse_at(params.at.as_deref())? {
        Some(at) => state.sessions.stop_at(at).await,
        None => state.sessions.stop().await,
    }
    .map_err(session_error)?;

    Ok(Json(json!({
        "status": "stopped",
        "id": stopped.id,
        "end_time": stopped.ended_at,
        "duration_min": stopped.duration_min,
    })))
}

fn parse_at(raw: Option<&str>) -> Result<Option<chrono::DateTime<chrono::Utc>>, ApiError> {
    match raw {
        None => Ok(None),
        Some(raw) => parse_utc(raw).map(Some).map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            )
        }),
    }
}

//
// ─── ERROR MAPPING ─────────────────────────────────────────────────────────────
//

fn practice_error(err: PracticeError) -> ApiError {
    let status = match &err {
        PracticeError::NoCards | PracticeError::CardNotFound(_) => StatusCode::NOT_FOUND,
        PracticeError::Card(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PracticeError::Storage(inner) => storage_status(inner),
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, &err.to_string())
}

fn session_error(err: SessionError) -> ApiError {
    let status = match &err {
        SessionError::AlreadyActive | SessionError::NotActive => StatusCode::CONFLICT,
        SessionError::Storage(inner) => storage_status(inner),
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, &err.to_string())
}

fn storage_error(err: StorageError) -> ApiError {
    error_response(storage_status(&err), &err.to_string())
}

fn storage_status(err: &StorageError) -> StatusCode {
    match err {
        StorageError::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(status: StatusCode, message: &str) -> ApiError {
    if status.is_server_error() {
        warn!(%status, message, "request failed");
    }
    (status, Json(json!({ "error": message })))
}
