//! Pure breathing state machine. Time only moves when the caller ticks it.

use chrono::Utc;
use serde::Serialize;

use crate::exercise::ExerciseStatus;
use crate::models::{ExerciseSession, SessionLog, SeverityLevel};

use super::phase::ExercisePhase;

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Not running, or paused.
    Ignored,
    Counting,
    /// Moved to a new phase; the caller should pulse.
    Advanced(ExercisePhase),
    /// The last cycle finished and the run ended. Carries the recorded session.
    Completed(ExerciseSession),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BreathingSnapshot {
    pub status: ExerciseStatus,
    pub phase: ExercisePhase,
    pub instruction: &'static str,
    pub remaining_ms: i64,
    pub remaining_secs: f64,
    /// 0 at the start of a phase, 1 at its end.
    pub phase_progress: f64,
    pub cycle_count: u32,
    pub max_cycles: u32,
    pub severity: SeverityLevel,
}

#[derive(Debug, Clone)]
pub struct BreathingEngine {
    status: ExerciseStatus,
    severity: SeverityLevel,
    phase: ExercisePhase,
    remaining_ms: i64,
    cycle_count: u32,
    sessions: SessionLog,
}

impl BreathingEngine {
    pub fn new(severity: SeverityLevel) -> Self {
        Self {
            status: ExerciseStatus::Idle,
            severity,
            phase: ExercisePhase::Ready,
            remaining_ms: ExercisePhase::Ready.duration_ms(),
            cycle_count: 0,
            sessions: SessionLog::new(),
        }
    }

    pub fn status(&self) -> ExerciseStatus {
        self.status
    }

    pub fn severity(&self) -> SeverityLevel {
        self.severity
    }

    pub fn phase(&self) -> ExercisePhase {
        self.phase
    }

    pub fn remaining_ms(&self) -> i64 {
        self.remaining_ms
    }

    pub fn cycle_count(&self) -> u32 {
        self.cycle_count
    }

    pub fn sessions(&self) -> &SessionLog {
        &self.sessions
    }

    /// Severity can only change between runs.
    pub fn set_severity(&mut self, severity: SeverityLevel) -> bool {
        if self.status != ExerciseStatus::Idle {
            return false;
        }
        self.severity = severity;
        true
    }

    pub fn start(&mut self, severity: SeverityLevel) -> bool {
        if self.status != ExerciseStatus::Idle {
            return false;
        }
        self.severity = severity;
        self.cycle_count = 0;
        self.phase = ExercisePhase::Ready;
        self.remaining_ms = self.phase.duration_ms();
        self.status = ExerciseStatus::Active;
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.status != ExerciseStatus::Active {
            return false;
        }
        self.status = ExerciseStatus::Paused;
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.status != ExerciseStatus::Paused {
            return false;
        }
        self.status = ExerciseStatus::Active;
        true
    }

    /// Advances the countdown by `elapsed_ms`. Whatever overshoots zero is
    /// dropped: the next phase always starts from its full duration.
    pub fn tick(&mut self, elapsed_ms: i64) -> TickOutcome {
        if self.status != ExerciseStatus::Active {
            return TickOutcome::Ignored;
        }

        self.remaining_ms -= elapsed_ms;
        if self.remaining_ms > 0 {
            return TickOutcome::Counting;
        }

        if self.phase == ExercisePhase::Rest {
            self.cycle_count += 1;
            if self.cycle_count >= self.severity.max_cycles() {
                return match self.stop() {
                    Some(session) => TickOutcome::Completed(session),
                    None => TickOutcome::Ignored,
                };
            }
        }

        self.phase = self.phase.next();
        self.remaining_ms = self.phase.duration_ms();
        TickOutcome::Advanced(self.phase)
    }

    /// Ends the run. Returns the recorded session when at least one cycle
    /// completed; a run with no cycles leaves the log untouched.
    pub fn stop(&mut self) -> Option<ExerciseSession> {
        if !self.status.is_running() {
            return None;
        }
        self.status = ExerciseStatus::Idle;

        if self.cycle_count == 0 {
            return None;
        }
        let session = ExerciseSession::new(self.severity, self.cycle_count, Utc::now());
        self.sessions.append(session.clone());
        Some(session)
    }

    pub fn snapshot(&self) -> BreathingSnapshot {
        let duration = self.phase.duration_ms();
        let remaining = self.remaining_ms.clamp(0, duration);
        BreathingSnapshot {
            status: self.status,
            phase: self.phase,
            instruction: self.phase.instruction(),
            remaining_ms: remaining,
            remaining_secs: remaining as f64 / 1000.0,
            phase_progress: 1.0 - remaining as f64 / duration as f64,
            cycle_count: self.cycle_count,
            max_cycles: self.severity.max_cycles(),
            severity: self.severity,
        }
    }
}

impl Default for BreathingEngine {
    fn default() -> Self {
        Self::new(SeverityLevel::default())
    }
}
