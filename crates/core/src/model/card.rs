use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::CardId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CardError {
    #[error("front text must not be empty")]
    EmptyFront,

    #[error("back text must not be empty")]
    EmptyBack,

    #[error("mastery level must be between {min} and {max}, got {provided}", min = Mastery::MIN.value(), max = Mastery::MAX.value())]
    MasteryOutOfRange { provided: i64 },
}

//
// ─── MASTERY LEVEL ─────────────────────────────────────────────────────────────
//

/// Leitner bucket for a flashcard, in the inclusive range 1–5.
///
/// Lower mastery means the card is drawn more often; a correct review
/// promotes a card one bucket, an incorrect review drops it back to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mastery(u8);

impl Mastery {
    pub const MIN: Mastery = Mastery(1);
    pub const MAX: Mastery = Mastery(5);

    /// Creates a mastery level, rejecting values outside 1–5.
    ///
    /// # Errors
    ///
    /// Returns `CardError::MasteryOutOfRange` if `level` is not in range.
    pub fn new(level: i64) -> Result<Self, CardError> {
        let min = i64::from(Self::MIN.0);
        let max = i64::from(Self::MAX.0);
        if (min..=max).contains(&level) {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Ok(Self(level as u8))
        } else {
            Err(CardError::MasteryOutOfRange { provided: level })
        }
    }

    /// Recovers a mastery level from a persisted value that may be missing
    /// or malformed.
    ///
    /// Missing values default to 1 and out-of-range values are clamped,
    /// so a damaged store field never fails a fetch.
    #[must_use]
    pub fn recovered(level: Option<i64>) -> Self {
        match level {
            Some(value) => {
                let clamped = value.clamp(i64::from(Self::MIN.0), i64::from(Self::MAX.0));
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                Self(clamped as u8)
            }
            None => Self::MIN,
        }
    }

    /// Mastery after a successful review: one bucket up, capped at 5.
    #[must_use]
    pub fn promoted(self) -> Self {
        Self((self.0 + 1).min(Self::MAX.0))
    }

    /// Mastery after a failed review: full reset to 1.
    ///
    /// A single miss demotes the card to the lowest bucket regardless of
    /// its prior level. This is a steep penalty kept as-is; see DESIGN.md.
    #[must_use]
    pub fn reset() -> Self {
        Self::MIN
    }

    /// Draw weight for the weighted random selection: `1 / max(1, level)`.
    ///
    /// Strictly decreasing in the level, so well-known cards surface less.
    #[must_use]
    pub fn weight(self) -> f64 {
        1.0 / f64::from(self.0.max(1))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Mastery {
    fn default() -> Self {
        Self::MIN
    }
}

//
// ─── CARD TYPES ────────────────────────────────────────────────────────────────
//

/// Unvalidated card input as received from a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardDraft {
    pub front: String,
    pub back: String,
    pub language: String,
}

impl CardDraft {
    #[must_use]
    pub fn new(
        front: impl Into<String>,
        back: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
            language: language.into(),
        }
    }

    /// Validate the draft. Duplicate fronts are allowed by design; the
    /// store is append-only from this core's perspective.
    ///
    /// # Errors
    ///
    /// Returns `CardError::EmptyFront` / `CardError::EmptyBack` if either
    /// side is blank after trimming.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedCard, CardError> {
        if self.front.trim().is_empty() {
            return Err(CardError::EmptyFront);
        }
        if self.back.trim().is_empty() {
            return Err(CardError::EmptyBack);
        }

        Ok(ValidatedCard {
            front: self.front,
            back: self.back,
            language: self.language,
            created_at: now,
        })
    }
}

/// A card draft that passed validation and is ready for persistence.
///
/// The backing store assigns the identifier, so the full `Flashcard` only
/// exists once `assign_id` is called with the store-provided id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCard {
    pub front: String,
    pub back: String,
    pub language: String,
    pub created_at: DateTime<Utc>,
}

impl ValidatedCard {
    #[must_use]
    pub fn assign_id(self, id: CardId) -> Flashcard {
        Flashcard {
            id,
            front: self.front,
            back: self.back,
            language: self.language,
            mastery: Mastery::MIN,
            repetitions: 0,
            last_review: Some(self.created_at),
        }
    }
}

/// Snapshot of a flashcard as held by the backing store.
///
/// The store owns the card; this core only reads a snapshot and writes
/// back the updated mastery/repetition/timestamp fields after a review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: CardId,
    pub front: String,
    pub back: String,
    pub language: String,
    pub mastery: Mastery,
    pub repetitions: u32,
    pub last_review: Option<DateTime<Utc>>,
}

/// The three fields a review writes back to the store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReviewStats {
    pub mastery: Mastery,
    pub repetitions: u32,
    pub last_review: DateTime<Utc>,
}

impl Flashcard {
    /// Rehydrate a flashcard from persisted store fields.
    ///
    /// Missing or malformed mastery/repetition values are recovered with
    /// their documented defaults (mastery 1, repetitions 0) rather than
    /// surfaced as errors.
    #[must_use]
    pub fn from_persisted(
        id: CardId,
        front: String,
        back: String,
        language: String,
        mastery: Option<i64>,
        repetitions: Option<i64>,
        last_review: Option<DateTime<Utc>>,
    ) -> Self {
        let repetitions = repetitions
            .and_then(|count| u32::try_from(count).ok())
            .unwrap_or(0);

        Self {
            id,
            front,
            back,
            language,
            mastery: Mastery::recovered(mastery),
            repetitions,
            last_review,
        }
    }

    /// Apply a review outcome to this snapshot and return the fields to
    /// persist.
    ///
    /// Success promotes mastery (capped at 5), failure resets it to 1;
    /// the repetition count increments unconditionally either way.
    pub fn apply_review(&mut self, success: bool, reviewed_at: DateTime<Utc>) -> ReviewStats {
        self.mastery = if success {
            self.mastery.promoted()
        } else {
            Mastery::reset()
        };
        self.repetitions = self.repetitions.saturating_add(1);
        self.last_review = Some(reviewed_at);

        ReviewStats {
            mastery: self.mastery,
            repetitions: self.repetitions,
            last_review: reviewed_at,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
