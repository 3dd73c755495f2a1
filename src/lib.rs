pub mod breathing;
mod demo;
pub mod exercise;
pub mod focus;
pub mod haptics;
pub mod models;
pub mod motion;
pub mod settings;
pub mod utils;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Mutex;

use breathing::{BreathingController, BreathingSnapshot};
use exercise::{ActiveView, ExerciseLifecycle, ExerciseStatus, ScenePhase};
use focus::{FocusController, FocusSnapshot};
use haptics::HapticPulse;
use models::SeverityLevel;
use motion::MotionSource;
use settings::SettingsStore;

/// Owns both exercise controllers and routes host notifications to them.
///
/// Controllers never look at each other; the hub is the only place that knows
/// which screen is showing.
pub struct AppState {
    pub focus: FocusController,
    pub breathing: BreathingController,
    pub settings: SettingsStore,
    active_view: Mutex<ActiveView>,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSnapshot {
    pub active_view: ActiveView,
    pub focus: FocusSnapshot,
    pub breathing: BreathingSnapshot,
}

impl AppState {
    pub fn new(
        settings: SettingsStore,
        source: Arc<dyn MotionSource>,
        haptics: Arc<dyn HapticPulse>,
    ) -> Self {
        let user = settings.get();
        let focus = FocusController::new(&user.focus, &user.haptics, source, haptics.clone());
        let breathing = BreathingController::new(&user.breathing, &user.haptics, haptics);

        Self {
            focus,
            breathing,
            settings,
            active_view: Mutex::new(ActiveView::Horizon),
        }
    }

    pub async fn active_view(&self) -> ActiveView {
        *self.active_view.lock().await
    }

    /// Tab switch. Horizon gaze stops when it loses the screen; breathing
    /// pauses.
    pub async fn set_active_view(&self, view: ActiveView) {
        let previous = std::mem::replace(&mut *self.active_view.lock().await, view);
        if previous != view {
            log::info!("active view {previous:?} -> {view:?}");
        }
        self.focus.on_active_view_changed(view).await;
        self.breathing.on_active_view_changed(view).await;
    }

    pub async fn set_scene_phase(&self, phase: ScenePhase) {
        log::debug!("scene phase -> {phase:?}");
        self.focus.on_scene_phase_changed(phase).await;
        self.breathing.on_scene_phase_changed(phase).await;
    }

    pub async fn set_severity(&self, severity: SeverityLevel) -> BreathingSnapshot {
        self.breathing.set_severity(severity).await
    }

    /// Stops whatever is running. Used on teardown.
    pub async fn stop_all(&self) -> (ExerciseStatus, ExerciseStatus) {
        (
            stop_if_running(&self.focus).await,
            stop_if_running(&self.breathing).await,
        )
    }

    pub async fn snapshot(&self) -> AppSnapshot {
        AppSnapshot {
            active_view: self.active_view().await,
            focus: self.focus.snapshot().await,
            breathing: self.breathing.snapshot().await,
        }
    }
}

async fn stop_if_running<E: ExerciseLifecycle>(exercise: &E) -> ExerciseStatus {
    match exercise.status().await {
        ExerciseStatus::Idle => ExerciseStatus::Idle,
        _ => exercise.stop_exercise().await,
    }
}

/// Entry point for the demo binary: drives both exercises against a
/// simulated motion feed and logs what they report.
pub fn run() -> anyhow::Result<()> {
    utils::init_logging();

    log::info!("MotionEase starting up...");

    let settings = SettingsStore::from_env()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(demo::run_demo(settings))
}
