use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use serde::Serialize;

use storage::repository::{CardStore, StorageError};
use study_core::model::{CardDraft, CardId, Flashcard, Mastery};
use study_core::scheduler::select_weighted;
use study_core::time::Clock;

use crate::error::PracticeError;

//
// ─── REVIEW UPDATE ─────────────────────────────────────────────────────────────
//

/// The stats returned to the caller after a recorded review.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReviewUpdate {
    pub mastery: Mastery,
    pub repetitions: u32,
    pub last_review: DateTime<Utc>,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Orchestrates flashcard selection, review recording, and creation.
///
/// The card store adapter is injected, so tests substitute the in-memory
/// backend. Each operation is one read followed by at most one write; the
/// pair is not atomic, so concurrent reviews of the same card can lose an
/// update (a limitation of the backing store, not worked around here).
#[derive(Clone)]
pub struct PracticeService {
    clock: Clock,
    cards: Arc<dyn CardStore>,
}

impl PracticeService {
    #[must_use]
    pub fn new(clock: Clock, cards: Arc<dyn CardStore>) -> Self {
        Self { clock, cards }
    }

    /// Current time according to the service's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Draw one card from the candidate pool with a weighted random draw.
    ///
    /// Lower-mastery cards are proportionally more likely; the draw is
    /// independent each call and never mutates stored state.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::NoCards` if the (optionally filtered) pool
    /// is empty, or `PracticeError::Storage` if the fetch fails.
    pub async fn draw_card(&self, language: Option<&str>) -> Result<Flashcard, PracticeError> {
        // `rand::rng()` is `!Send`; a seeded `StdRng` keeps the future `Send`.
        let mut rng = rand::rngs::StdRng::from_os_rng();
        self.draw_card_with_rng(language, &mut rng).await
    }

    /// Like `draw_card` but with a caller-supplied RNG for deterministic
    /// and statistical tests.
    ///
    /// # Errors
    ///
    /// Same as `draw_card`.
    pub async fn draw_card_with_rng<R: Rng + ?Sized>(
        &self,
        language: Option<&str>,
        rng: &mut R,
    ) -> Result<Flashcard, PracticeError> {
        let pool = self.cards.list_cards(language).await?;
        let chosen = select_weighted(&pool, rng)?;
        Ok(chosen.clone())
    }

    /// Record a review outcome for a card and persist the updated stats.
    ///
    /// Success promotes mastery one bucket (capped at 5); failure resets
    /// it to 1. Repetitions increment unconditionally and the review is
    /// stamped with the service clock.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::CardNotFound` if the id does not resolve,
    /// or `PracticeError::Storage` if either store call fails.
    pub async fn record_review(
        &self,
        id: &CardId,
        success: bool,
    ) -> Result<ReviewUpdate, PracticeError> {
        let mut card = match self.cards.get_card(id).await {
            Ok(card) => card,
            Err(StorageError::NotFound) => {
                return Err(PracticeError::CardNotFound(id.to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        let stats = card.apply_review(success, self.clock.now());
        self.cards.update_card_stats(id, &stats).await?;

        Ok(ReviewUpdate {
            mastery: stats.mastery,
            repetitions: stats.repetitions,
            last_review: stats.last_review,
        })
    }

    /// Validate and persist a new card. Duplicates are allowed by design.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Card` for validation failures and
    /// `PracticeError::Storage` if persistence fails.
    pub async fn create_card(
        &self,
        front: impl Into<String>,
        back: impl Into<String>,
        language: impl Into<String>,
    ) -> Result<Flashcard, PracticeError> {
        let draft = CardDraft::new(front, back, language).validate(self.clock.now())?;
        Ok(self.cards.create_card(draft).await?)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
