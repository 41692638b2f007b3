mod card;
mod ids;
mod session;

pub use card::{CardDraft, CardError, Flashcard, Mastery, ReviewStats, ValidatedCard};
pub use ids::{CardId, SessionId};
pub use session::{SessionError, SessionStatus, StudySession, duration_minutes};
