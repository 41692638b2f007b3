use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::SessionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("unknown session status: {0}")]
    UnknownStatus(String),

    #[error("stopped session is missing its end time")]
    MissingEndTime,
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle status of a study session as stored remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Started,
    Stopped,
}

impl SessionStatus {
    /// The status label as persisted in the store's select property.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Started => "Started",
            SessionStatus::Stopped => "Stopped",
        }
    }

    /// Parse a persisted status label.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownStatus` for any other label.
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        match raw {
            "Started" => Ok(Self::Started),
            "Stopped" => Ok(Self::Stopped),
            other => Err(SessionError::UnknownStatus(other.to_string())),
        }
    }
}

//
// ─── STUDY SESSION ─────────────────────────────────────────────────────────────
//

/// Snapshot of a study session record.
///
/// At most one session with status `Started` should exist at a time. The
/// invariant is checked against the store before every start, not cached
/// in process memory, so it is best-effort under concurrent callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySession {
    pub id: SessionId,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub duration_min: Option<i64>,
}

impl StudySession {
    /// A freshly started session with no end time yet.
    #[must_use]
    pub fn started(id: SessionId, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            started_at,
            ended_at: None,
            status: SessionStatus::Started,
            duration_min: None,
        }
    }

    /// Rehydrate a session from persisted fields.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::MissingEndTime` if a stopped session has no
    /// end time recorded.
    pub fn from_persisted(
        id: SessionId,
        started_at: DateTime<Utc>,
        ended_at: Option<DateTime<Utc>>,
        status: SessionStatus,
        duration_min: Option<i64>,
    ) -> Result<Self, SessionError> {
        if status == SessionStatus::Stopped && ended_at.is_none() {
            return Err(SessionError::MissingEndTime);
        }

        Ok(Self {
            id,
            started_at,
            ended_at,
            status,
            duration_min,
        })
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Started
    }

    /// Return a stopped copy of this session with the duration filled in.
    #[must_use]
    pub fn stopped(mut self, ended_at: DateTime<Utc>) -> Self {
        self.duration_min = Some(duration_minutes(self.started_at, ended_at));
        self.ended_at = Some(ended_at);
        self.status = SessionStatus::Stopped;
        self
    }
}

//
// ─── DURATION ──────────────────────────────────────────────────────────────────
//

/// Whole-minute session duration, rounded half away from zero.
///
/// Both timestamps are already UTC here; callers normalize offsets before
/// this point. A negative span (end before start) clamps to zero since a
/// duration is non-negative by definition.
#[must_use]
pub fn duration_minutes(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> i64 {
    let seconds = ended_at.signed_duration_since(started_at).num_seconds();

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    let minutes = (seconds as f64 / 60.0).round() as i64;
    minutes.max(0)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
