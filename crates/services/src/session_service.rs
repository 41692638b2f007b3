use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use storage::repository::SessionStore;
use study_core::model::{SessionId, StudySession, duration_minutes};
use study_core::time::Clock;

use crate::error::SessionError;

//
// ─── STOPPED SESSION ───────────────────────────────────────────────────────────
//

/// Result of stopping the active session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoppedSession {
    pub id: SessionId,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_min: i64,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// The start/stop state machine for the single timed study session.
///
/// No session state is held in process memory: every transition re-derives
/// "is a session active?" by querying the store for a Started record. That
/// keeps the machine stateless across calls but leaves a race window — two
/// concurrent starts can both observe no active session and both create
/// one. Closing that window needs coordination from the store itself and
/// is out of scope here.
#[derive(Clone)]
pub struct SessionService {
    clock: Clock,
    sessions: Arc<dyn SessionStore>,
}

impl SessionService {
    #[must_use]
    pub fn new(clock: Clock, sessions: Arc<dyn SessionStore>) -> Self {
        Self { clock, sessions }
    }

    /// Start a session now, per the service clock.
    ///
    /// # Errors
    ///
    /// Same as `start_at`.
    pub async fn start(&self) -> Result<StudySession, SessionError> {
        self.start_at(self.clock.now()).await
    }

    /// Start a session at the given instant.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyActive` if a Started record already
    /// exists, or `SessionError::Storage` if a store call fails.
    pub async fn start_at(
        &self,
        started_at: DateTime<Utc>,
    ) -> Result<StudySession, SessionError> {
        if self.sessions.find_active().await?.is_some() {
            return Err(SessionError::AlreadyActive);
        }

        Ok(self.sessions.create_session(started_at).await?)
    }

    /// Stop the active session now, per the service clock.
    ///
    /// # Errors
    ///
    /// Same as `stop_at`.
    pub async fn stop(&self) -> Result<StoppedSession, SessionError> {
        self.stop_at(self.clock.now()).await
    }

    /// Stop the active session at the given instant.
    ///
    /// The duration is computed in UTC from the stored start time, rounded
    /// to the nearest whole minute (half away from zero).
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` if no Started record exists, or
    /// `SessionError::Storage` if a store call fails.
    pub async fn stop_at(&self, ended_at: DateTime<Utc>) -> Result<StoppedSession, SessionError> {
        let active = self
            .sessions
            .find_active()
            .await?
            .ok_or(SessionError::NotActive)?;

        let duration_min = duration_minutes(active.started_at, ended_at);
        self.sessions
            .close_session(&active.id, ended_at, duration_min)
            .await?;

        Ok(StoppedSession {
            id: active.id,
            started_at: active.started_at,
            ended_at,
            duration_min,
        })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
