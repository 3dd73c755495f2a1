use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::exercise::ExerciseStatus;
use crate::motion::{DeviceMotion, OrientationSampler, SignalSmoother};
use crate::settings::FocusSettings;

use super::geometry::{MovementArea, Point2, Sensitivity};
use super::pose::DevicePose;
use super::stability::{is_stable, stability_score, StabilityTracker};

/// How a horizon-gaze run ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RunOutcome {
    /// Elapsed time reached the configured duration.
    Completed,
    /// Stopped by the user or an exit path before the duration was reached.
    Stopped,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub elapsed_secs: u32,
    pub total_secs: u32,
    pub average_stability: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FocusSnapshot {
    pub status: ExerciseStatus,
    pub focus_point: Point2,
    pub pose: DevicePose,
    pub pose_optimal: bool,
    pub stability_score: f64,
    pub is_stable: bool,
    pub in_target_zone: bool,
    pub elapsed_secs: u32,
    pub total_secs: u32,
    pub calibration_progress: f64,
    pub calibrated: bool,
    pub sensor_available: bool,
}

/// Result of applying one reading while active.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleUpdate {
    pub focus_point: Point2,
    pub entered_target_zone: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationStep {
    InProgress(f64),
    /// Ramp finished; `captured` says whether a reference was taken.
    Finished { captured: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockStep {
    Counting(u32),
    DurationReached,
}

/// Everything the focus controller mutates, kept behind one lock.
pub struct FocusState {
    status: ExerciseStatus,
    area: MovementArea,
    sensitivity: Sensitivity,
    sampler: OrientationSampler,
    smoother: SignalSmoother<Point2>,
    focus_point: Point2,
    pose: DevicePose,
    stability: f64,
    tracker: StabilityTracker,
    in_zone: bool,
    elapsed_secs: u32,
    total_secs: u32,
    calibration_ticks: u32,
    calibration_ticks_total: u32,
    sensor_available: bool,
}

impl FocusState {
    pub fn new(settings: &FocusSettings, sampler: OrientationSampler) -> Self {
        let area = MovementArea::from_layout(&settings.layout);
        Self {
            status: ExerciseStatus::Idle,
            area,
            sensitivity: settings.sensitivity,
            sampler,
            smoother: SignalSmoother::new(settings.smoothing),
            focus_point: area.center(),
            pose: DevicePose::default(),
            stability: 0.0,
            tracker: StabilityTracker::default(),
            in_zone: true,
            elapsed_secs: 0,
            total_secs: settings.total_duration_secs.max(1),
            calibration_ticks: 0,
            calibration_ticks_total: settings.calibration_ticks.max(1),
            sensor_available: true,
        }
    }

    pub fn status(&self) -> ExerciseStatus {
        self.status
    }

    pub fn area(&self) -> &MovementArea {
        &self.area
    }

    pub fn focus_point(&self) -> Point2 {
        self.focus_point
    }

    pub fn in_target_zone(&self) -> bool {
        self.area.in_target_zone(self.focus_point.y)
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    pub fn sampler(&self) -> &OrientationSampler {
        &self.sampler
    }

    pub fn set_total_secs(&mut self, total_secs: u32) {
        self.total_secs = total_secs.max(1);
    }

    /// Engages the sensor. `None` means there is nothing new to pump: either
    /// the feed already runs or it could not start (run continues without it).
    pub fn engage_sensor(&mut self) -> Option<mpsc::Receiver<DeviceMotion>> {
        match self.sampler.start() {
            Ok(receiver) => {
                self.sensor_available = true;
                receiver
            }
            Err(err) => {
                log::warn!("motion sensor unavailable, continuing without it: {err:#}");
                self.sensor_available = false;
                None
            }
        }
    }

    pub fn release_sensor(&mut self) {
        self.sampler.stop();
    }

    /// Idle or calibrating → calibrating, ramp restarted from zero.
    pub fn begin_calibration(&mut self) -> bool {
        match self.status {
            ExerciseStatus::Idle | ExerciseStatus::Calibrating => {
                self.status = ExerciseStatus::Calibrating;
                self.calibration_ticks = 0;
                self.sampler.reset_latest();
                true
            }
            _ => false,
        }
    }

    pub fn calibration_tick(&mut self) -> Option<CalibrationStep> {
        if self.status != ExerciseStatus::Calibrating {
            return None;
        }

        self.calibration_ticks = (self.calibration_ticks + 1).min(self.calibration_ticks_total);
        if self.calibration_ticks < self.calibration_ticks_total {
            return Some(CalibrationStep::InProgress(self.calibration_progress()));
        }

        let captured = self.sampler.calibrate();
        self.release_sensor();
        self.status = ExerciseStatus::Idle;
        Some(CalibrationStep::Finished { captured })
    }

    pub fn cancel_calibration(&mut self) -> bool {
        if self.status != ExerciseStatus::Calibrating {
            return false;
        }
        self.release_sensor();
        self.calibration_ticks = 0;
        self.status = ExerciseStatus::Idle;
        true
    }

    pub fn calibration_progress(&self) -> f64 {
        self.calibration_ticks as f64 / self.calibration_ticks_total as f64
    }

    /// Idle → active with the point centred and counters cleared.
    pub fn begin(&mut self) -> bool {
        if self.status != ExerciseStatus::Idle {
            return false;
        }
        self.focus_point = self.area.center();
        self.in_zone = true;
        self.elapsed_secs = 0;
        self.stability = 0.0;
        self.tracker.reset();
        self.smoother.clear();
        self.sampler.reset_latest();
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

    /// Feeds one reading. During calibration it only refreshes the sampler;
    /// while active it moves the point and refreshes pose and stability.
    pub fn apply_reading(&mut self, reading: DeviceMotion) -> Option<SampleUpdate> {
        match self.status {
            ExerciseStatus::Calibrating => {
                self.sampler.ingest(reading);
                None
            }
            ExerciseStatus::Active => {
                let sample = self.sampler.ingest(reading)?;
                let smoothed = self.smoother.push(Point2::new(sample.yaw, sample.pitch));

                self.focus_point = self.area.map_signal(smoothed.x, smoothed.y, self.sensitivity);
                let pose = DevicePose::classify(sample.gravity_z);
                if pose != self.pose {
                    log::debug!("device pose {:?}: {}", pose, pose.label());
                    self.pose = pose;
                }
                self.stability = stability_score(&self.area, self.focus_point, sample.roll);
                self.tracker.record(self.stability);

                let now_in_zone = self.in_target_zone();
                let entered_target_zone = now_in_zone && !self.in_zone;
                self.in_zone = now_in_zone;

                Some(SampleUpdate {
                    focus_point: self.focus_point,
                    entered_target_zone,
                })
            }
            ExerciseStatus::Idle | ExerciseStatus::Paused => None,
        }
    }

    /// One duration-clock tick. Only counts while active.
    pub fn clock_tick(&mut self) -> Option<ClockStep> {
        if self.status != ExerciseStatus::Active {
            return None;
        }
        self.elapsed_secs = self.elapsed_secs.saturating_add(1);
        if self.elapsed_secs >= self.total_secs {
            Some(ClockStep::DurationReached)
        } else {
            Some(ClockStep::Counting(self.elapsed_secs))
        }
    }

    /// Active/paused → idle. Releases the sensor and recentres the point.
    pub fn finish(&mut self) -> Option<RunSummary> {
        if !self.status.is_running() {
            return None;
        }

        let outcome = if self.elapsed_secs >= self.total_secs {
            RunOutcome::Completed
        } else {
            RunOutcome::Stopped
        };
        let summary = RunSummary {
            outcome,
            elapsed_secs: self.elapsed_secs,
            total_secs: self.total_secs,
            average_stability: self.tracker.average(),
        };

        self.release_sensor();
        self.focus_point = self.area.center();
        self.in_zone = true;
        self.status = ExerciseStatus::Idle;
        Some(summary)
    }

    pub fn snapshot(&self) -> FocusSnapshot {
        FocusSnapshot {
            status: self.status,
            focus_point: self.focus_point,
            pose: self.pose,
            pose_optimal: self.pose.is_optimal(),
            stability_score: self.stability,
            is_stable: is_stable(self.stability),
            in_target_zone: self.in_target_zone(),
            elapsed_secs: self.elapsed_secs,
            total_secs: self.total_secs,
            calibration_progress: self.calibration_progress(),
            calibrated: self.sampler.reference().is_some(),
            sensor_available: self.sensor_available,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::{MotionSource, PushMotionSource};
    use std::sync::Arc;

    fn state_with(settings: FocusSettings) -> (Arc<PushMotionSource>, FocusState) {
        let source = Arc::new(PushMotionSource::new());
        let sampler = OrientationSampler::new(
            source.clone(),
            settings.sample_interval(),
            settings.apply_calibration,
        );
        (source, FocusState::new(&settings, sampler))
    }

    fn upright(yaw: f64, pitch: f64) -> DeviceMotion {
        DeviceMotion {
            roll: 0.0,
            pitch,
            yaw,
            gravity_x: 0.0,
            gravity_y: -0.95,
            gravity_z: -0.3,
        }
    }

    #[test]
    fn lifecycle_guards_transitions() {
        let (_, mut state) = state_with(FocusSettings::default());
        assert!(!state.pause());
        assert!(!state.resume());
        assert!(state.finish().is_none());

        assert!(state.begin());
        assert!(!state.begin(), "second start is a no-op");
        assert!(!state.begin_calibration(), "cannot calibrate mid-run");
        assert!(state.pause());
        assert!(!state.pause());
        assert!(state.resume());
        assert_eq!(state.status(), ExerciseStatus::Active);

        let summary = state.finish().expect("running");
        assert_eq!(summary.outcome, RunOutcome::Stopped);
        assert_eq!(state.status(), ExerciseStatus::Idle);
    }

    #[test]
    fn readings_move_the_point_only_while_active() {
        let (_, mut state) = state_with(FocusSettings {
            smoothing: crate::motion::SmoothingMode::MovingAverage { window: 1 },
            ..FocusSettings::default()
        });
        let center = state.area().center();

        assert!(state.apply_reading(upright(0.2, 0.0)).is_none());
        assert_eq!(state.focus_point(), center);

        state.begin();
        let update = state.apply_reading(upright(0.2, 0.0)).expect("active");
        assert!((update.focus_point.x - (center.x + 50.0)).abs() < 1e-9);
        assert_eq!(state.snapshot().pose, DevicePose::Vertical);

        state.pause();
        assert!(state.apply_reading(upright(-0.2, 0.0)).is_none());
        assert_eq!(state.focus_point(), update.focus_point);

        state.finish();
        assert_eq!(state.focus_point(), center);
    }

    #[test]
    fn smoothing_damps_a_single_spike() {
        let (_, mut state) = state_with(FocusSettings::default());
        state.begin();
        for _ in 0..4 {
            state.apply_reading(upright(0.0, 0.0));
        }
        let update = state.apply_reading(upright(0.5, 0.0)).expect("active");
        let center_x = state.area().center_x;
        // One spike of 0.5 rad averages to 0.1 rad over a window of five.
        assert!((update.focus_point.x - (center_x + 25.0)).abs() < 1e-9);
    }

    #[test]
    fn entering_target_zone_is_reported_once() {
        let (_, mut state) = state_with(FocusSettings {
            smoothing: crate::motion::SmoothingMode::MovingAverage { window: 1 },
            ..FocusSettings::default()
        });
        state.begin();

        let out = state.apply_reading(upright(0.0, 0.5)).expect("active");
        assert!(!out.entered_target_zone);
        assert!(!state.in_target_zone());

        let back = state.apply_reading(upright(0.0, 0.0)).expect("active");
        assert!(back.entered_target_zone);
        let still = state.apply_reading(upright(0.0, 0.01)).expect("active");
        assert!(!still.entered_target_zone);
    }

    #[test]
    fn clock_counts_to_completion() {
        let (_, mut state) = state_with(FocusSettings {
            total_duration_secs: 3,
            ..FocusSettings::default()
        });
        assert!(state.clock_tick().is_none());

        state.begin();
        assert_eq!(state.clock_tick(), Some(ClockStep::Counting(1)));
        state.pause();
        assert!(state.clock_tick().is_none(), "paused clock does not count");
        state.resume();
        assert_eq!(state.clock_tick(), Some(ClockStep::Counting(2)));
        assert_eq!(state.clock_tick(), Some(ClockStep::DurationReached));

        let summary = state.finish().expect("running");
        assert_eq!(summary.outcome, RunOutcome::Completed);
        assert_eq!(summary.elapsed_secs, 3);
    }

    #[test]
    fn zero_duration_setting_still_tells_stop_from_completion() {
        let (_, mut state) = state_with(FocusSettings {
            total_duration_secs: 0,
            ..FocusSettings::default()
        });
        assert_eq!(state.snapshot().total_secs, 1);

        state.begin();
        let summary = state.finish().expect("running");
        assert_eq!(summary.outcome, RunOutcome::Stopped);

        state.begin();
        assert_eq!(state.clock_tick(), Some(ClockStep::DurationReached));
        assert_eq!(state.finish().map(|s| s.outcome), Some(RunOutcome::Completed));
    }

    #[test]
    fn pose_guidance_follows_the_reading() {
        let (_, mut state) = state_with(FocusSettings::default());
        state.begin();
        state.apply_reading(upright(0.0, 0.0));
        let snapshot = state.snapshot();
        assert_eq!(snapshot.pose, DevicePose::Vertical);
        assert!(snapshot.pose_optimal);

        let mut flat = upright(0.0, 0.0);
        flat.gravity_z = -0.7;
        state.apply_reading(flat);
        let snapshot = state.snapshot();
        assert_eq!(snapshot.pose, DevicePose::Flat);
        assert!(!snapshot.pose_optimal);
    }

    #[test]
    fn calibration_ramp_captures_reference() {
        let (source, mut state) = state_with(FocusSettings::default());
        let center = state.area().center();

        assert!(state.begin_calibration());
        assert!(state.engage_sensor().is_some());
        assert!(source.is_active());

        state.apply_reading(upright(0.3, 0.1));
        assert_eq!(state.focus_point(), center, "calibration never moves the point");

        for tick in 1..10 {
            match state.calibration_tick() {
                Some(CalibrationStep::InProgress(progress)) => {
                    assert!((progress - tick as f64 / 10.0).abs() < 1e-12)
                }
                other => panic!("unexpected step {other:?}"),
            }
        }
        assert_eq!(
            state.calibration_tick(),
            Some(CalibrationStep::Finished { captured: true })
        );
        assert_eq!(state.status(), ExerciseStatus::Idle);
        assert!(!source.is_active(), "sensor released after calibration");
        assert!(state.snapshot().calibrated);
        assert_eq!(state.focus_point(), center);
    }

    #[test]
    fn calibration_without_readings_captures_nothing() {
        let (_, mut state) = state_with(FocusSettings {
            calibration_ticks: 1,
            ..FocusSettings::default()
        });
        state.begin_calibration();
        assert_eq!(
            state.calibration_tick(),
            Some(CalibrationStep::Finished { captured: false })
        );
        assert!(!state.snapshot().calibrated);
    }

    #[test]
    fn unavailable_sensor_is_flagged() {
        let source = Arc::new(PushMotionSource::unavailable());
        let settings = FocusSettings::default();
        let sampler = OrientationSampler::new(source, settings.sample_interval(), true);
        let mut state = FocusState::new(&settings, sampler);

        state.begin();
        assert!(state.engage_sensor().is_none());
        let snapshot = state.snapshot();
        assert!(!snapshot.sensor_available);
        assert_eq!(snapshot.status, ExerciseStatus::Active);
    }
}
