pub mod lifecycle;

pub use lifecycle::{ActiveView, ExerciseLifecycle, ExerciseStatus, ScenePhase};
