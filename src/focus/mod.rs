pub mod controller;
pub mod geometry;
pub mod pose;
pub mod stability;
pub mod state;

pub use controller::{FocusController, FocusEvent};
pub use geometry::{MovementArea, Point2, ScreenLayout, Sensitivity};
pub use pose::DevicePose;
pub use state::{FocusSnapshot, RunOutcome, RunSummary};
