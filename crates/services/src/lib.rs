#![forbid(unsafe_code)]

pub mod error;
pub mod practice_service;
pub mod session_service;

pub use study_core::time::Clock;

pub use error::{PracticeError, SessionError};
pub use practice_service::{PracticeService, ReviewUpdate};
pub use session_service::{SessionService, StoppedSession};
