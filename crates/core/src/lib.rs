#![forbid(unsafe_code)]

pub mod model;
pub mod scheduler;
pub mod time;

pub use model::{
    CardDraft, CardError, CardId, Flashcard, Mastery, ReviewStats, SessionError, SessionId,
    SessionStatus, StudySession, ValidatedCard,
};
pub use scheduler::{SchedulerError, WeightedPool, select_weighted};
pub use time::{Clock, TimeError, parse_utc};
