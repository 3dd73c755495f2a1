use std::{
    sync::{Arc, Mutex as StdMutex, MutexGuard},
    time::Duration,
};

use serde::Serialize;
use tokio::{
    sync::{broadcast, mpsc, Mutex},
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::exercise::{ActiveView, ExerciseLifecycle, ExerciseStatus, ScenePhase};
use crate::haptics::{fire_pulse, HapticPulse, PulsePattern};
use crate::motion::{DeviceMotion, MotionSource, OrientationSampler};
use crate::settings::{FocusSettings, HapticSettings};
use crate::utils::format_clock;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

use super::state::{CalibrationStep, ClockStep, FocusSnapshot, FocusState, RunOutcome, RunSummary};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "payload")]
pub enum FocusEvent {
    StateChanged(FocusSnapshot),
    CalibrationProgress { progress: f64 },
    CalibrationFinished { captured: bool },
    CalibrationCancelled,
    Completed(RunSummary),
    Stopped(RunSummary),
}

#[derive(Default)]
struct FocusTasks {
    pump: Option<CancellationToken>,
    ticker: Option<CancellationToken>,
}

struct FocusInner {
    state: Mutex<FocusState>,
    tasks: StdMutex<FocusTasks>,
    events: broadcast::Sender<FocusEvent>,
    haptics: Arc<dyn HapticPulse>,
    pulse: PulsePattern,
    haptics_enabled: bool,
    zone_haptics: bool,
    calibration_tick: Duration,
    clock_interval: Duration,
}

/// Drives the horizon-gaze exercise.
///
/// All mutation goes through one async mutex: user commands, the sample pump
/// and the duration/calibration ticker each take it in turn, so a tick and a
/// reading arriving together are applied one after the other. Background
/// tasks hold a cancellation token and re-check it after taking the lock, so
/// nothing from a cancelled run lands in the next one.
#[derive(Clone)]
pub struct FocusController {
    inner: Arc<FocusInner>,
}

impl FocusController {
    pub fn new(
        settings: &FocusSettings,
        haptic_settings: &HapticSettings,
        source: Arc<dyn MotionSource>,
        haptics: Arc<dyn HapticPulse>,
    ) -> Self {
        let sampler = OrientationSampler::new(
            source,
            settings.sample_interval(),
            settings.apply_calibration,
        );
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(FocusInner {
                state: Mutex::new(FocusState::new(settings, sampler)),
                tasks: StdMutex::new(FocusTasks::default()),
                events,
                haptics,
                pulse: PulsePattern::new(haptic_settings.intensity, haptic_settings.sharpness),
                haptics_enabled: haptic_settings.enabled,
                zone_haptics: settings.zone_haptics,
                calibration_tick: settings.calibration_tick(),
                clock_interval: settings.clock_interval(),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FocusEvent> {
        self.inner.events.subscribe()
    }

    pub async fn snapshot(&self) -> FocusSnapshot {
        self.inner.state.lock().await.snapshot()
    }

    /// Changes the run length. Only takes effect while idle.
    pub async fn set_total_duration(&self, total_secs: u32) -> FocusSnapshot {
        let mut state = self.inner.state.lock().await;
        if state.status() == ExerciseStatus::Idle {
            state.set_total_secs(total_secs);
        } else {
            log_debug!("ignoring duration change while {:?}", state.status());
        }
        state.snapshot()
    }

    /// Runs the zero-point ramp. Calling it again mid-ramp restarts the ramp.
    pub async fn start_calibration(&self) -> FocusSnapshot {
        let snapshot = {
            let mut state = self.inner.state.lock().await;
            let restarting = state.status() == ExerciseStatus::Calibrating;
            if !state.begin_calibration() {
                log_debug!("calibration ignored while {:?}", state.status());
                return state.snapshot();
            }

            if let Some(receiver) = state.engage_sensor() {
                self.inner.spawn_pump(receiver);
            }
            self.inner.spawn_calibration_ramp();

            if restarting {
                log_info!("calibration restarted");
            } else {
                log_info!("calibration started");
            }
            state.snapshot()
        };

        self.inner.emit(FocusEvent::StateChanged(snapshot.clone()));
        snapshot
    }

    pub async fn start(&self) -> FocusSnapshot {
        let snapshot = {
            let mut state = self.inner.state.lock().await;
            if !state.begin() {
                log_debug!("start ignored while {:?}", state.status());
                return state.snapshot();
            }

            if let Some(receiver) = state.engage_sensor() {
                self.inner.spawn_pump(receiver);
            }
            self.inner.spawn_clock();

            let snapshot = state.snapshot();
            log_info!(
                "horizon gaze started ({} target)",
                format_clock(snapshot.total_secs)
            );
            snapshot
        };

        self.inner.emit(FocusEvent::StateChanged(snapshot.clone()));
        snapshot
    }

    pub async fn pause(&self) -> FocusSnapshot {
        let snapshot = {
            let mut state = self.inner.state.lock().await;
            if !state.pause() {
                return state.snapshot();
            }
            self.inner.cancel_ticker();
            log_info!("horizon gaze paused at {}", format_clock(state.elapsed_secs()));
            state.snapshot()
        };

        self.inner.emit(FocusEvent::StateChanged(snapshot.clone()));
        snapshot
    }

    pub async fn resume(&self) -> FocusSnapshot {
        let snapshot = {
            let mut state = self.inner.state.lock().await;
            if !state.resume() {
                return state.snapshot();
            }
            self.inner.spawn_clock();
            log_info!("horizon gaze resumed");
            state.snapshot()
        };

        self.inner.emit(FocusEvent::StateChanged(snapshot.clone()));
        snapshot
    }

    /// Returns to idle from any state: ends a run (completed if the duration
    /// was reached, stopped otherwise) or abandons a calibration.
    pub async fn stop(&self) -> FocusSnapshot {
        let (snapshot, event) = {
            let mut state = self.inner.state.lock().await;
            match state.status() {
                ExerciseStatus::Idle => return state.snapshot(),
                ExerciseStatus::Calibrating => {
                    self.inner.cancel_all();
                    state.cancel_calibration();
                    log_info!("calibration cancelled");
                    (state.snapshot(), Some(FocusEvent::CalibrationCancelled))
                }
                ExerciseStatus::Active | ExerciseStatus::Paused => {
                    let event = self.inner.finish_locked(&mut state).map(outcome_event);
                    (state.snapshot(), event)
                }
            }
        };

        self.inner.emit(FocusEvent::StateChanged(snapshot.clone()));
        if let Some(event) = event {
            self.inner.emit(event);
        }
        snapshot
    }

    /// Any screen other than the horizon exercise ends the run.
    pub async fn on_active_view_changed(&self, view: ActiveView) -> FocusSnapshot {
        if view == ActiveView::Horizon {
            return self.snapshot().await;
        }
        self.stop().await
    }

    /// Leaving the foreground ends the run and releases the sensor.
    pub async fn on_scene_phase_changed(&self, phase: ScenePhase) -> FocusSnapshot {
        if phase == ScenePhase::Active {
            return self.snapshot().await;
        }
        self.stop().await
    }
}

impl FocusInner {
    fn tasks(&self) -> MutexGuard<'_, FocusTasks> {
        match self.tasks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn emit(&self, event: FocusEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn pulse(&self) {
        if self.haptics_enabled {
            fire_pulse(self.haptics.as_ref(), self.pulse);
        }
    }

    fn cancel_ticker(&self) {
        if let Some(token) = self.tasks().ticker.take() {
            token.cancel();
        }
    }

    fn cancel_all(&self) {
        let mut tasks = self.tasks();
        for token in [tasks.pump.take(), tasks.ticker.take()].into_iter().flatten() {
            token.cancel();
        }
    }

    /// Ends an active or paused run. Caller holds the state lock.
    fn finish_locked(&self, state: &mut FocusState) -> Option<RunSummary> {
        self.cancel_all();
        let summary = state.finish()?;
        log_info!(
            "horizon gaze {:?} after {} (avg stability {})",
            summary.outcome,
            format_clock(summary.elapsed_secs),
            summary
                .average_stability
                .map(|avg| format!("{avg:.0}%"))
                .unwrap_or_else(|| "n/a".to_string())
        );
        Some(summary)
    }

    fn spawn_pump(self: &Arc<Self>, receiver: mpsc::Receiver<DeviceMotion>) {
        let token = CancellationToken::new();
        if let Some(previous) = self.tasks().pump.replace(token.clone()) {
            previous.cancel();
        }
        tokio::spawn(pump_loop(Arc::clone(self), receiver, token));
    }

    fn spawn_clock(self: &Arc<Self>) {
        let token = self.replace_ticker();
        tokio::spawn(clock_loop(Arc::clone(self), token));
    }

    fn spawn_calibration_ramp(self: &Arc<Self>) {
        let token = self.replace_ticker();
        tokio::spawn(calibration_loop(Arc::clone(self), token));
    }

    fn replace_ticker(&self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some(previous) = self.tasks().ticker.replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    async fn on_reading(&self, reading: DeviceMotion, token: &CancellationToken) {
        let (snapshot, entered_zone) = {
            let mut state = self.state.lock().await;
            if token.is_cancelled() {
                return;
            }
            let Some(update) = state.apply_reading(reading) else {
                return;
            };
            (state.snapshot(), update.entered_target_zone)
        };

        if entered_zone && self.zone_haptics {
            self.pulse();
        }
        self.emit(FocusEvent::StateChanged(snapshot));
    }
}

fn outcome_event(summary: RunSummary) -> FocusEvent {
    match summary.outcome {
        RunOutcome::Completed => FocusEvent::Completed(summary),
        RunOutcome::Stopped => FocusEvent::Stopped(summary),
    }
}

async fn pump_loop(
    inner: Arc<FocusInner>,
    mut receiver: mpsc::Receiver<DeviceMotion>,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            reading = receiver.recv() => match reading {
                Some(reading) => inner.on_reading(reading, &token).await,
                None => {
                    log_debug!("motion feed closed");
                    break;
                }
            },
        }
    }
}

async fn clock_loop(inner: Arc<FocusInner>, token: CancellationToken) {
    let period = inner.clock_interval;
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let (snapshot, finished) = {
                    let mut state = inner.state.lock().await;
                    if token.is_cancelled() {
                        break;
                    }
                    match state.clock_tick() {
                        None => break,
                        Some(ClockStep::Counting(_)) => (state.snapshot(), None),
                        Some(ClockStep::DurationReached) => {
                            let summary = inner.finish_locked(&mut state);
                            (state.snapshot(), summary)
                        }
                    }
                };

                inner.emit(FocusEvent::StateChanged(snapshot));
                if let Some(summary) = finished {
                    inner.emit(outcome_event(summary));
                    break;
                }
            }
        }
    }
}

async fn calibration_loop(inner: Arc<FocusInner>, token: CancellationToken) {
    let period = inner.calibration_tick;
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let step = {
                    let mut state = inner.state.lock().await;
                    if token.is_cancelled() {
                        break;
                    }
                    match state.calibration_tick() {
                        None => break,
                        Some(CalibrationStep::InProgress(progress)) => {
                            CalibrationStep::InProgress(progress)
                        }
                        Some(CalibrationStep::Finished { captured }) => {
                            inner.cancel_all();
                            if !captured {
                                log::warn!("calibration finished without a motion reading");
                            }
                            inner.emit(FocusEvent::StateChanged(state.snapshot()));
                            CalibrationStep::Finished { captured }
                        }
                    }
                };

                match step {
                    CalibrationStep::InProgress(progress) => {
                        inner.emit(FocusEvent::CalibrationProgress { progress });
                    }
                    CalibrationStep::Finished { captured } => {
                        log_info!("calibration finished (reference captured: {captured})");
                        inner.emit(FocusEvent::CalibrationFinished { captured });
                        break;
                    }
                }
            }
        }
    }
}

impl ExerciseLifecycle for FocusController {
    async fn start_exercise(&self) -> ExerciseStatus {
        self.start().await.status
    }

    async fn pause_exercise(&self) -> ExerciseStatus {
        self.pause().await.status
    }

    async fn resume_exercise(&self) -> ExerciseStatus {
        self.resume().await.status
    }

    async fn stop_exercise(&self) -> ExerciseStatus {
        self.stop().await.status
    }

    async fn status(&self) -> ExerciseStatus {
        self.snapshot().await.status
    }
}
