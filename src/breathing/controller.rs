use std::{
    sync::{Arc, Mutex as StdMutex},
    time::Duration,
};

use serde::Serialize;
use tokio::{
    sync::{broadcast, Mutex},
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::exercise::{ActiveView, ExerciseLifecycle, ExerciseStatus, ScenePhase};
use crate::haptics::{fire_pulse, HapticPulse, PulsePattern};
use crate::models::{ExerciseSession, SeverityLevel};
use crate::settings::{BreathingSettings, HapticSettings};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

use super::engine::{BreathingEngine, BreathingSnapshot, TickOutcome};
use super::phase::ExercisePhase;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "payload")]
pub enum BreathingEvent {
    StateChanged(BreathingSnapshot),
    #[serde(rename_all = "camelCase")]
    PhaseChanged {
        phase: ExercisePhase,
        instruction: &'static str,
        cycle_count: u32,
    },
    Completed(ExerciseSession),
}

struct BreathingInner {
    engine: Mutex<BreathingEngine>,
    ticker: StdMutex<Option<CancellationToken>>,
    events: broadcast::Sender<BreathingEvent>,
    haptics: Arc<dyn HapticPulse>,
    pulse: PulsePattern,
    haptics_enabled: bool,
    tick_interval: Duration,
}

/// Runs paced-breathing sessions on a fixed tick and keeps the session log.
#[derive(Clone)]
pub struct BreathingController {
    inner: Arc<BreathingInner>,
}

impl BreathingController {
    pub fn new(
        settings: &BreathingSettings,
        haptic_settings: &HapticSettings,
        haptics: Arc<dyn HapticPulse>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(BreathingInner {
                engine: Mutex::new(BreathingEngine::new(settings.default_severity)),
                ticker: StdMutex::new(None),
                events,
                haptics,
                pulse: PulsePattern::new(haptic_settings.intensity, haptic_settings.sharpness),
                haptics_enabled: haptic_settings.enabled,
                tick_interval: settings.tick_interval(),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BreathingEvent> {
        self.inner.events.subscribe()
    }

    pub async fn snapshot(&self) -> BreathingSnapshot {
        self.inner.engine.lock().await.snapshot()
    }

    /// Completed sessions, oldest first.
    pub async fn sessions(&self) -> Vec<ExerciseSession> {
        self.inner.engine.lock().await.sessions().to_vec()
    }

    pub async fn set_severity(&self, severity: SeverityLevel) -> BreathingSnapshot {
        let snapshot = {
            let mut engine = self.inner.engine.lock().await;
            if !engine.set_severity(severity) {
                log_debug!("severity change ignored while {:?}", engine.status());
                return engine.snapshot();
            }
            engine.snapshot()
        };
        self.inner.emit(BreathingEvent::StateChanged(snapshot.clone()));
        snapshot
    }

    pub async fn start(&self, severity: SeverityLevel) -> BreathingSnapshot {
        let snapshot = {
            let mut engine = self.inner.engine.lock().await;
            if !engine.start(severity) {
                log_debug!("start ignored while {:?}", engine.status());
                return engine.snapshot();
            }
            self.inner.spawn_ticker();
            log_info!(
                "breathing started ({}, {} cycles)",
                severity.label(),
                severity.max_cycles()
            );
            engine.snapshot()
        };
        self.inner.emit(BreathingEvent::StateChanged(snapshot.clone()));
        snapshot
    }

    pub async fn pause(&self) -> BreathingSnapshot {
        let snapshot = {
            let mut engine = self.inner.engine.lock().await;
            if !engine.pause() {
                return engine.snapshot();
            }
            self.inner.cancel_ticker();
            log_info!("breathing paused in {:?}", engine.phase());
            engine.snapshot()
        };
        self.inner.emit(BreathingEvent::StateChanged(snapshot.clone()));
        snapshot
    }

    pub async fn resume(&self) -> BreathingSnapshot {
        let snapshot = {
            let mut engine = self.inner.engine.lock().await;
            if !engine.resume() {
                return engine.snapshot();
            }
            self.inner.spawn_ticker();
            log_info!("breathing resumed");
            engine.snapshot()
        };
        self.inner.emit(BreathingEvent::StateChanged(snapshot.clone()));
        snapshot
    }

    pub async fn stop(&self) -> BreathingSnapshot {
        let (snapshot, session) = {
            let mut engine = self.inner.engine.lock().await;
            if !engine.status().is_running() {
                return engine.snapshot();
            }
            self.inner.cancel_ticker();
            let session = engine.stop();
            match &session {
                Some(session) => log_info!(
                    "breathing stopped after {} cycles, session recorded",
                    session.completed_cycles
                ),
                None => log_info!("breathing stopped before the first cycle"),
            }
            (engine.snapshot(), session)
        };

        self.inner.emit(BreathingEvent::StateChanged(snapshot.clone()));
        if let Some(session) = session {
            self.inner.emit(BreathingEvent::Completed(session));
        }
        snapshot
    }

    /// Switching to another screen pauses the run; coming back does not resume it.
    pub async fn on_active_view_changed(&self, view: ActiveView) -> BreathingSnapshot {
        if view == ActiveView::Breathing {
            return self.snapshot().await;
        }
        self.pause().await
    }

    pub async fn on_scene_phase_changed(&self, phase: ScenePhase) -> BreathingSnapshot {
        if phase == ScenePhase::Active {
            return self.snapshot().await;
        }
        self.pause().await
    }
}

impl BreathingInner {
    fn emit(&self, event: BreathingEvent) {
        let _ = self.events.send(event);
    }

    fn cancel_ticker(&self) {
        let previous = match self.ticker.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(token) = previous {
            token.cancel();
        }
    }

    fn spawn_ticker(self: &Arc<Self>) {
        let token = CancellationToken::new();
        let previous = match self.ticker.lock() {
            Ok(mut slot) => slot.replace(token.clone()),
            Err(poisoned) => poisoned.into_inner().replace(token.clone()),
        };
        if let Some(previous) = previous {
            previous.cancel();
        }
        tokio::spawn(ticker_loop(Arc::clone(self), token));
    }
}

async fn ticker_loop(inner: Arc<BreathingInner>, token: CancellationToken) {
    let period = inner.tick_interval;
    let tick_ms = i64::try_from(period.as_millis()).unwrap_or(i64::MAX);
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let (outcome, snapshot) = {
                    let mut engine = inner.engine.lock().await;
                    if token.is_cancelled() {
                        break;
                    }
                    let outcome = engine.tick(tick_ms);
                    (outcome, engine.snapshot())
                };

                match outcome {
                    TickOutcome::Ignored => break,
                    TickOutcome::Counting => {
                        inner.emit(BreathingEvent::StateChanged(snapshot));
                    }
                    TickOutcome::Advanced(phase) => {
                        log_debug!("breathing phase -> {phase:?}");
                        if inner.haptics_enabled {
                            fire_pulse(inner.haptics.as_ref(), inner.pulse);
                        }
                        inner.emit(BreathingEvent::PhaseChanged {
                            phase,
                            instruction: phase.instruction(),
                            cycle_count: snapshot.cycle_count,
                        });
                        inner.emit(BreathingEvent::StateChanged(snapshot));
                    }
                    TickOutcome::Completed(session) => {
                        log_info!(
                            "breathing complete: {} cycles ({})",
                            session.completed_cycles,
                            session.severity.label()
                        );
                        token.cancel();
                        inner.emit(BreathingEvent::StateChanged(snapshot));
                        inner.emit(BreathingEvent::Completed(session));
                        break;
                    }
                }
            }
        }
    }
}

impl ExerciseLifecycle for BreathingController {
    /// Starts with the currently selected severity.
    async fn start_exercise(&self) -> ExerciseStatus {
        let severity = self.snapshot().await.severity;
        self.start(severity).await.status
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
