use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

use study_core::model::{
    CardId, Flashcard, ReviewStats, SessionId, SessionStatus, StudySession, ValidatedCard,
};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Errors surfaced by store adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("store rejected request with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed store payload: {0}")]
    Malformed(String),
}

//
// ─── STORE CONTRACTS ───────────────────────────────────────────────────────────
//

/// Card-side contract against the backing store.
///
/// Every method is a single round trip; no adapter retries or caches, so
/// read-then-write sequences at the service layer are not atomic.
#[async_trait]
pub trait CardStore: Send + Sync {
    /// Fetch the candidate pool, optionally filtered by language tag.
    ///
    /// The result is page-limited by the adapter and its ordering carries
    /// no meaning.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store call fails.
    async fn list_cards(&self, language: Option<&str>) -> Result<Vec<Flashcard>, StorageError>;

    /// Fetch a single card snapshot by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the id does not resolve.
    async fn get_card(&self, id: &CardId) -> Result<Flashcard, StorageError>;

    /// Persist the three post-review fields for a card.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store call fails.
    async fn update_card_stats(&self, id: &CardId, stats: &ReviewStats)
    -> Result<(), StorageError>;

    /// Create a new card; the store assigns the id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store call fails.
    async fn create_card(&self, draft: ValidatedCard) -> Result<Flashcard, StorageError>;
}

/// Session-side contract against the backing store.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the session with status `Started`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store call fails.
    async fn find_active(&self) -> Result<Option<StudySession>, StorageError>;

    /// Create a new session record in the `Started` state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store call fails.
    async fn create_session(&self, started_at: DateTime<Utc>)
    -> Result<StudySession, StorageError>;

    /// Mark a session stopped, recording its end time and duration.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session id is unknown.
    async fn close_session(
        &self,
        id: &SessionId,
        ended_at: DateTime<Utc>,
        duration_min: i64,
    ) -> Result<(), StorageError>;
}

/// Liveness probe for the backing store.
#[async_trait]
pub trait StoreHealth: Send + Sync {
    /// Check that the store is reachable and describe it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the probe fails.
    async fn health(&self) -> Result<HealthReport, StorageError>;
}

/// Result of a successful store health probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub backend: &'static str,
    pub detail: String,
}

//
// ─── IN-MEMORY STORE ───────────────────────────────────────────────────────────
//

/// In-memory store implementation for testing and local development.
///
/// Ids are freshly minted UUIDs, standing in for the page ids a remote
/// store would assign.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    cards: Arc<Mutex<Vec<Flashcard>>>,
    sessions: Arc<Mutex<Vec<StudySession>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_cards(&self) -> Result<std::sync::MutexGuard<'_, Vec<Flashcard>>, StorageError> {
        self.cards
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    fn lock_sessions(&self) -> Result<std::sync::MutexGuard<'_, Vec<StudySession>>, StorageError> {
        self.sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    /// Seed a card directly, bypassing draft validation. Test helper.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the store lock is poisoned.
    pub fn insert_card(&self, card: Flashcard) -> Result<(), StorageError> {
        self.lock_cards()?.push(card);
        Ok(())
    }
}

#[async_trait]
impl CardStore for InMemoryStore {
    async fn list_cards(&self, language: Option<&str>) -> Result<Vec<Flashcard>, StorageError> {
        let cards = self.lock_cards()?;
        Ok(cards
            .iter()
            .filter(|card| language.is_none_or(|lang| card.language == lang))
            .cloned()
            .collect())
    }

    async fn get_card(&self, id: &CardId) -> Result<Flashcard, StorageError> {
        let cards = self.lock_cards()?;
        cards
            .iter()
            .find(|card| &card.id == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn update_card_stats(
        &self,
        id: &CardId,
        stats: &ReviewStats,
    ) -> Result<(), StorageError> {
        let mut cards = self.lock_cards()?;
        let card = cards
            .iter_mut()
            .find(|card| &card.id == id)
            .ok_or(StorageError::NotFound)?;
        card.mastery = stats.mastery;
        card.repetitions = stats.repetitions;
        card.last_review = Some(stats.last_review);
        Ok(())
    }

    async fn create_card(&self, draft: ValidatedCard) -> Result<Flashcard, StorageError> {
        let card = draft.assign_id(CardId::new(Uuid::new_v4().to_string()));
        self.lock_cards()?.push(card.clone());
        Ok(card)
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn find_active(&self) -> Result<Option<StudySession>, StorageError> {
        let sessions = self.lock_sessions()?;
        // Latest started record wins, matching the remote store's
        // descending start-time sort.
        Ok(sessions
            .iter()
            .filter(|session| session.is_active())
            .max_by_key(|session| session.started_at)
            .cloned())
    }

    async fn create_session(
        &self,
        started_at: DateTime<Utc>,
    ) -> Result<StudySession, StorageError> {
        let session =
            StudySession::started(SessionId::new(Uuid::new_v4().to_string()), started_at);
        self.lock_sessions()?.push(session.clone());
        Ok(session)
    }

    async fn close_session(
        &self,
        id: &SessionId,
        ended_at: DateTime<Utc>,
        duration_min: i64,
    ) -> Result<(), StorageError> {
        let mut sessions = self.lock_sessions()?;
        let session = sessions
            .iter_mut()
            .find(|session| &session.id == id)
            .ok_or(StorageError::NotFound)?;
        session.ended_at = Some(ended_at);
        session.duration_min = Some(duration_min);
        session.status = SessionStatus::Stopped;
        Ok(())
    }
}

#[async_trait]
impl StoreHealth for InMemoryStore {
    async fn health(&self) -> Result<HealthReport, StorageError> {
        let count = self.lock_cards()?.len();
        Ok(HealthReport {
            backend: "memory",
            detail: format!("{count} cards"),
        })
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates the store contracts behind trait objects for backend swapping.
#[derive(Clone)]
pub struct Stores {
    pub cards: Arc<dyn CardStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub health: Arc<dyn StoreHealth>,
}

impl Stores {
    #[must_use]
    pub fn in_memory() -> Self {
        let store = InMemoryStore::new();
        Self {
            cards: Arc::new(store.clone()),
            sessions: Arc::new(store.clone()),
            health: Arc::new(store),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::model::CardDraft;
    use study_core::time::fixed_now;

    #[tokio::test]
    async fn created_card_round_trips_with_defaults() {
        let store = InMemoryStore::new();
        let draft = CardDraft::new("hola", "hello", "Spanish")
            .validate(fixed_now())
            .unwrap();

        let created = store.create_card(draft).await.unwrap();
        assert_eq!(created.mastery.value(), 1);
        assert_eq!(created.repetitions, 0);

        let fetched = store.get_card(&created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn language_filter_narrows_pool() {
        let store = InMemoryStore::new();
        for (front, lang) in [("hola", "Spanish"), ("bonjour", "French")] {
            let draft = CardDraft::new(front, "hello", lang)
                .validate(fixed_now())
                .unwrap();
            store.create_card(draft).await.unwrap();
        }

        let all = store.list_cards(None).await.unwrap();
        assert_eq!(all.len(), 2);

        let spanish = store.list_cards(Some("Spanish")).await.unwrap();
        assert_eq!(spanish.len(), 1);
        assert_eq!(spanish[0].front, "hola");
    }

    #[tokio::test]
    async fn stat_update_rewrites_only_review_fields() {
        let store = InMemoryStore::new();
        let draft = CardDraft::new("hola", "hello", "Spanish")
            .validate(fixed_now())
            .unwrap();
        let mut card = store.create_card(draft).await.unwrap();

        let stats = card.apply_review(true, fixed_now());
        store.update_card_stats(&card.id, &stats).await.unwrap();

        let fetched = store.get_card(&card.id).await.unwrap();
        assert_eq!(fetched.mastery.value(), 2);
        assert_eq!(fetched.repetitions, 1);
        assert_eq!(fetched.front, "hola");
    }

    #[tokio::test]
    async fn unknown_card_id_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.get_card(&CardId::new("nope")).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn latest_started_session_is_the_active_one() {
        let store = InMemoryStore::new();
        assert!(store.find_active().await.unwrap().is_none());

        let first = store.create_session(fixed_now()).await.unwrap();
        store
            .close_session(&first.id, fixed_now(), 0)
            .await
            .unwrap();
        assert!(store.find_active().await.unwrap().is_none());

        let second = store
            .create_session(fixed_now() + chrono::Duration::minutes(1))
            .await
            .unwrap();
        let active = store.find_active().await.unwrap().unwrap();
        assert_eq!(active.id, second.id);
    }
}
