//! Feedback pulse capability.
//!
//! Controllers only ever call [`fire_pulse`]: a failed or unsupported pulse is
//! logged and otherwise ignored, so feedback can never hold up a phase change
//! or a run.

#[cfg(feature = "audio-cue")]
pub mod audio_cue;
#[cfg(feature = "audio-cue")]
mod click;

use anyhow::Result;
use serde::{Deserialize, Serialize};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

#[cfg(feature = "audio-cue")]
pub use audio_cue::AudioCuePulse;

/// Shape of a single transient pulse, both values in `[0, 1]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PulsePattern {
    pub intensity: f32,
    pub sharpness: f32,
}

impl Default for PulsePattern {
    fn default() -> Self {
        Self {
            intensity: 0.5,
            sharpness: 0.5,
        }
    }
}

impl PulsePattern {
    pub fn new(intensity: f32, sharpness: f32) -> Self {
        Self {
            intensity: intensity.clamp(0.0, 1.0),
            sharpness: sharpness.clamp(0.0, 1.0),
        }
    }
}

pub trait HapticPulse: Send + Sync {
    /// Hardware can play pulses at all.
    fn is_supported(&self) -> bool;

    fn pulse(&self, pattern: PulsePattern) -> Result<()>;
}

/// Hosts without haptic hardware.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHaptics;

impl HapticPulse for NoopHaptics {
    fn is_supported(&self) -> bool {
        false
    }

    fn pulse(&self, _pattern: PulsePattern) -> Result<()> {
        Ok(())
    }
}

/// Writes each pulse to the log; handy for the demo binary and headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogHaptics;

impl HapticPulse for LogHaptics {
    fn is_supported(&self) -> bool {
        true
    }

    fn pulse(&self, pattern: PulsePattern) -> Result<()> {
        log::info!(
            "pulse (intensity {:.2}, sharpness {:.2})",
            pattern.intensity,
            pattern.sharpness
        );
        Ok(())
    }
}

/// Plays a pulse if the hardware supports it. Never fails.
pub fn fire_pulse(haptics: &dyn HapticPulse, pattern: PulsePattern) {
    if !haptics.is_supported() {
        log_debug!("haptics unsupported, skipping pulse");
        return;
    }

    if let Err(err) = haptics.pulse(pattern) {
        log_warn!("haptic pulse failed: {err:#}");
    }
}
