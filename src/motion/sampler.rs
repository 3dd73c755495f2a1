//! Turns raw device-motion readings into orientation samples.
//!
//! The sampler owns the sensor engagement for the focus exercise: `start`
//! engages the feed (idempotently), `stop` releases it. Each reading is
//! normalised into an [`OrientationSample`] whose `roll` slot carries the
//! posture-dependent horizontal signal:
//!
//! - phone held upright (`|gravity_z| < 0.45`): yaw, since the user turns
//!   the phone like a window;
//! - phone held closer to flat: `atan2(gravity_y, gravity_z)`.
//!
//! A calibration reference captured with [`OrientationSampler::calibrate`] is
//! subtracted from later yaw/pitch readings when `apply_reference` is on.

use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::source::{DeviceMotion, MotionSource};

/// Below this `|gravity_z|` the device counts as upright.
pub const UPRIGHT_GRAVITY_Z: f64 = 0.45;

/// Reference cadence of the motion feed (60 Hz).
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_micros(16_667);

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrientationSample {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub gravity_x: f64,
    pub gravity_y: f64,
    pub gravity_z: f64,
}

/// Zero point captured during calibration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationReference {
    pub yaw: f64,
    pub pitch: f64,
}

pub struct OrientationSampler {
    source: Arc<dyn MotionSource>,
    interval: Duration,
    latest: Option<OrientationSample>,
    latest_raw: Option<DeviceMotion>,
    reference: Option<CalibrationReference>,
    apply_reference: bool,
}

impl OrientationSampler {
    pub fn new(source: Arc<dyn MotionSource>, interval: Duration, apply_reference: bool) -> Self {
        Self {
            source,
            interval,
            latest: None,
            latest_raw: None,
            reference: None,
            apply_reference,
        }
    }

    /// Engages the feed. `Ok(None)` means it was already running and the
    /// existing receiver keeps delivering.
    pub fn start(&mut self) -> Result<Option<mpsc::Receiver<DeviceMotion>>> {
        if self.source.is_active() {
            return Ok(None);
        }
        self.source.start_updates(self.interval).map(Some)
    }

    pub fn stop(&mut self) {
        self.source.stop_updates();
    }

    pub fn is_active(&self) -> bool {
        self.source.is_active()
    }

    /// Normalises a reading and stores it as the latest sample. Readings with
    /// non-finite components are rejected.
    pub fn ingest(&mut self, reading: DeviceMotion) -> Option<OrientationSample> {
        if !reading.is_finite() {
            return None;
        }

        let (yaw, pitch) = match (self.apply_reference, self.reference) {
            (true, Some(reference)) => (
                wrap_angle(reading.yaw - reference.yaw),
                reading.pitch - reference.pitch,
            ),
            _ => (reading.yaw, reading.pitch),
        };

        let gravity_x = reading.gravity_x.clamp(-1.0, 1.0);
        let gravity_y = reading.gravity_y.clamp(-1.0, 1.0);
        let gravity_z = reading.gravity_z.clamp(-1.0, 1.0);

        let roll = if gravity_z.abs() < UPRIGHT_GRAVITY_Z {
            yaw
        } else {
            gravity_y.atan2(gravity_z)
        };

        let sample = OrientationSample {
            roll,
            pitch,
            yaw,
            gravity_x,
            gravity_y,
            gravity_z,
        };

        self.latest_raw = Some(reading);
        self.latest = Some(sample);
        Some(sample)
    }

    /// Captures the latest raw yaw/pitch as the zero point. Returns false when
    /// no reading has arrived yet; the previous reference is kept.
    pub fn calibrate(&mut self) -> bool {
        match self.latest_raw {
            Some(raw) => {
                self.reference = Some(CalibrationReference {
                    yaw: raw.yaw,
                    pitch: raw.pitch,
                });
                true
            }
            None => false,
        }
    }

    pub fn clear_calibration(&mut self) {
        self.reference = None;
    }

    pub fn reference(&self) -> Option<CalibrationReference> {
        self.reference
    }

    pub fn latest(&self) -> Option<OrientationSample> {
        self.latest
    }

    /// Forgets the last reading so a fresh run or calibration does not reuse it.
    pub fn reset_latest(&mut self) {
        self.latest = None;
        self.latest_raw = None;
    }
}

fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::PushMotionSource;

    fn sampler(apply_reference: bool) -> (Arc<PushMotionSource>, OrientationSampler) {
        let source = Arc::new(PushMotionSource::new());
        let sampler = OrientationSampler::new(source.clone(), DEFAULT_SAMPLE_INTERVAL, apply_reference);
        (source, sampler)
    }

    fn reading(yaw: f64, pitch: f64, gravity_y: f64, gravity_z: f64) -> DeviceMotion {
        DeviceMotion {
            roll: 0.0,
            pitch,
            yaw,
            gravity_x: 0.0,
            gravity_y,
            gravity_z,
        }
    }

    #[test]
    fn upright_device_uses_yaw_as_roll() {
        let (_, mut sampler) = sampler(true);
        let sample = sampler
            .ingest(reading(0.25, 0.1, -0.95, -0.3))
            .expect("finite reading");
        assert_eq!(sample.roll, 0.25);
    }

    #[test]
    fn flatter_device_uses_gravity_angle_as_roll() {
        let (_, mut sampler) = sampler(true);
        let sample = sampler
            .ingest(reading(0.25, 0.1, -0.5, -0.8))
            .expect("finite reading");
        assert!((sample.roll - (-0.5f64).atan2(-0.8)).abs() < 1e-12);
    }

    #[test]
    fn gravity_is_clamped_to_unit_range() {
        let (_, mut sampler) = sampler(true);
        let sample = sampler
            .ingest(reading(0.0, 0.0, -1.2, 1.05))
            .expect("finite reading");
        assert_eq!(sample.gravity_y, -1.0);
        assert_eq!(sample.gravity_z, 1.0);
    }

    #[test]
    fn non_finite_readings_do_not_replace_latest() {
        let (_, mut sampler) = sampler(true);
        sampler.ingest(reading(0.1, 0.0, 0.0, -0.3));
        assert!(sampler.ingest(reading(f64::NAN, 0.0, 0.0, -0.3)).is_none());
        assert_eq!(sampler.latest().map(|s| s.yaw), Some(0.1));
    }

    #[test]
    fn calibration_offsets_later_readings() {
        let (_, mut sampler) = sampler(true);
        assert!(!sampler.calibrate(), "nothing to capture yet");

        sampler.ingest(reading(0.4, -0.2, 0.0, -0.3));
        assert!(sampler.calibrate());
        assert_eq!(
            sampler.reference(),
            Some(CalibrationReference { yaw: 0.4, pitch: -0.2 })
        );

        let sample = sampler
            .ingest(reading(0.5, -0.1, 0.0, -0.3))
            .expect("finite reading");
        assert!((sample.yaw - 0.1).abs() < 1e-12);
        assert!((sample.pitch - 0.1).abs() < 1e-12);

        // Recalibrating captures the raw reading, not the corrected one.
        assert!(sampler.calibrate());
        assert_eq!(sampler.reference().map(|r| r.yaw), Some(0.5));
    }

    #[test]
    fn reference_is_ignored_when_not_applied() {
        let (_, mut sampler) = sampler(false);
        sampler.ingest(reading(0.4, -0.2, 0.0, -0.3));
        sampler.calibrate();
        let sample = sampler
            .ingest(reading(0.5, -0.1, 0.0, -0.3))
            .expect("finite reading");
        assert_eq!(sample.yaw, 0.5);
        assert_eq!(sample.pitch, -0.1);
    }

    #[test]
    fn yaw_offset_wraps_across_pi() {
        let (_, mut sampler) = sampler(true);
        sampler.ingest(reading(3.0, 0.0, 0.0, -0.3));
        sampler.calibrate();
        let sample = sampler
            .ingest(reading(-3.0, 0.0, 0.0, -0.3))
            .expect("finite reading");
        assert!((sample.yaw - (2.0 * PI - 6.0)).abs() < 1e-9);
    }

    #[test]
    fn start_is_idempotent() {
        let (source, mut sampler) = sampler(true);
        let first = sampler.start().expect("starts");
        assert!(first.is_some());
        assert!(source.is_active());
        assert!(sampler.start().expect("still fine").is_none());

        sampler.stop();
        assert!(!sampler.is_active());
    }
}
