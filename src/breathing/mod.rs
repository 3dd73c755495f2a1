pub mod controller;
pub mod engine;
pub mod phase;

pub use controller::{BreathingController, BreathingEvent};
pub use engine::{BreathingEngine, BreathingSnapshot, TickOutcome};
pub use phase::ExercisePhase;
