use serde::{Deserialize, Serialize};

/// Lifecycle shared by both exercises. Breathing never enters `Calibrating`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ExerciseStatus {
    #[default]
    Idle,
    Calibrating,
    Active,
    Paused,
}

impl ExerciseStatus {
    /// True while a run is in progress, paused or not.
    pub fn is_running(&self) -> bool {
        matches!(self, ExerciseStatus::Active | ExerciseStatus::Paused)
    }
}

/// Which exercise screen the user is looking at.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ActiveView {
    Horizon,
    Breathing,
    Acupressure,
}

/// Foreground state of the host app.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ScenePhase {
    Active,
    Inactive,
    Background,
}

/// The start/pause/resume/stop capability both controllers expose.
///
/// Every method is total: calling one from the wrong state is a no-op, and the
/// returned status is whatever the controller ended up in.
#[allow(async_fn_in_trait)]
pub trait ExerciseLifecycle {
    async fn start_exercise(&self) -> ExerciseStatus;
    async fn pause_exercise(&self) -> ExerciseStatus;
    async fn resume_exercise(&self) -> ExerciseStatus;
    async fn stop_exercise(&self) -> ExerciseStatus;
    async fn status(&self) -> ExerciseStatus;
}
