pub mod session;
pub mod severity;

pub use session::{ExerciseSession, SessionLog};
pub use severity::SeverityLevel;
