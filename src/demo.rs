use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::broadcast::error::RecvError;
use tokio::time;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

use crate::breathing::BreathingEvent;
use crate::exercise::{ActiveView, ExerciseLifecycle, ExerciseStatus, ScenePhase};
use crate::focus::FocusEvent;
use crate::haptics::HapticPulse;
use crate::motion::{SimulatedMotionSource, SwayProfile};
use crate::settings::SettingsStore;
use crate::utils::format_clock;
use crate::AppState;

/// Env var: seconds each demo exercise runs for.
const DEMO_SECS_ENV: &str = "MOTIONEASE_DEMO_SECS";
const DEFAULT_DEMO_SECS: u32 = 10;

fn demo_secs() -> u32 {
    std::env::var(DEMO_SECS_ENV)
        .ok()
        .and_then(|value| value.parse().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_DEMO_SECS)
}

#[cfg(feature = "audio-cue")]
fn demo_haptics() -> Arc<dyn HapticPulse> {
    Arc::new(crate::haptics::AudioCuePulse::new())
}

#[cfg(not(feature = "audio-cue"))]
fn demo_haptics() -> Arc<dyn HapticPulse> {
    Arc::new(crate::haptics::LogHaptics)
}

pub(crate) async fn run_demo(settings: SettingsStore) -> Result<()> {
    let secs = demo_secs();
    let source = Arc::new(SimulatedMotionSource::new(SwayProfile::default()));
    let app = AppState::new(settings, source, demo_haptics());

    spawn_event_logger(&app);

    app.set_scene_phase(ScenePhase::Active).await;
    app.set_active_view(ActiveView::Horizon).await;

    log_info!("calibrating...");
    app.focus.start_calibration().await;
    let focus_settings = app.settings.focus();
    let ramp = focus_settings.calibration_tick() * focus_settings.calibration_ticks;
    time::sleep(ramp + Duration::from_millis(200)).await;

    app.focus.set_total_duration(secs).await;
    app.focus.start_exercise().await;
    let mut ticker = time::interval(Duration::from_secs(1));
    loop {
        ticker.tick().await;
        let snapshot = app.focus.snapshot().await;
        log_info!("{}", serde_json::to_string(&snapshot)?);
        if snapshot.status == ExerciseStatus::Idle {
            break;
        }
    }

    app.set_active_view(ActiveView::Breathing).await;
    app.breathing.start_exercise().await;
    for elapsed in 1..=secs {
        ticker.tick().await;
        let snapshot = app.breathing.snapshot().await;
        log_info!(
            "{} {} ({:.1}s left, cycle {}/{})",
            format_clock(elapsed),
            snapshot.instruction,
            snapshot.remaining_secs,
            snapshot.cycle_count,
            snapshot.max_cycles
        );
    }

    app.stop_all().await;
    let sessions = app.breathing.sessions().await;
    log_info!("sessions: {}", serde_json::to_string_pretty(&sessions)?);
    Ok(())
}

fn spawn_event_logger(app: &AppState) {
    let mut focus_events = app.focus.subscribe();
    tokio::spawn(async move {
        loop {
            match focus_events.recv().await {
                Ok(FocusEvent::StateChanged(_)) => {}
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => log_info!("focus event {json}"),
                    Err(err) => log_warn!("failed to encode focus event: {err}"),
                },
                Err(RecvError::Lagged(skipped)) => log_warn!("focus log skipped {skipped} events"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut breathing_events = app.breathing.subscribe();
    tokio::spawn(async move {
        loop {
            match breathing_events.recv().await {
                Ok(BreathingEvent::StateChanged(_)) => {}
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => log_info!("breathing event {json}"),
                    Err(err) => log_warn!("failed to encode breathing event: {err}"),
                },
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    });
}
