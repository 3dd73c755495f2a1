use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

use super::source::{DeviceMotion, MotionSource, READING_BUFFER};

/// Shape of the synthetic hand sway.
#[derive(Debug, Clone)]
pub struct SwayProfile {
    /// Peak yaw/pitch excursion in radians.
    pub amplitude: f64,
    /// Sway frequency in Hz.
    pub frequency_hz: f64,
    /// Uniform jitter added to every axis, radians.
    pub jitter: f64,
    /// Gravity z the device rests at; -0.3 is an upright phone.
    pub gravity_z: f64,
    pub seed: Option<u64>,
}

impl Default for SwayProfile {
    fn default() -> Self {
        Self {
            amplitude: 0.12,
            frequency_hz: 0.2,
            jitter: 0.01,
            gravity_z: -0.3,
            seed: None,
        }
    }
}

/// Generates a slowly swaying, jittery orientation feed on a tokio task.
/// Used by the demo binary and on hosts without a motion sensor.
pub struct SimulatedMotionSource {
    profile: SwayProfile,
    cancel_token: Mutex<Option<CancellationToken>>,
}

impl SimulatedMotionSource {
    pub fn new(profile: SwayProfile) -> Self {
        Self {
            profile,
            cancel_token: Mutex::new(None),
        }
    }

    fn token_slot(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        match self.cancel_token.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl MotionSource for SimulatedMotionSource {
    fn start_updates(&self, interval: Duration) -> Result<mpsc::Receiver<DeviceMotion>> {
        let runtime = Handle::try_current().context("simulated motion needs a tokio runtime")?;

        let mut slot = self.token_slot();
        if let Some(previous) = slot.take() {
            previous.cancel();
        }

        let (tx, rx) = mpsc::channel(READING_BUFFER);
        let token = CancellationToken::new();
        runtime.spawn(sway_loop(self.profile.clone(), interval, tx, token.clone()));
        *slot = Some(token);

        log_info!("simulated motion feed started");
        Ok(rx)
    }

    fn stop_updates(&self) {
        if let Some(token) = self.token_slot().take() {
            token.cancel();
            log_info!("simulated motion feed stopped");
        }
    }

    fn is_active(&self) -> bool {
        self.token_slot()
            .as_ref()
            .map(|token| !token.is_cancelled())
            .unwrap_or(false)
    }
}

async fn sway_loop(
    profile: SwayProfile,
    interval: Duration,
    tx: mpsc::Sender<DeviceMotion>,
    cancel_token: CancellationToken,
) {
    let mut rng = match profile.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut t = 0.0_f64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let reading = sway_reading(&profile, t, &mut rng);
                t += interval.as_secs_f64();
                if tx.send(reading).await.is_err() {
                    log_debug!("simulated motion receiver dropped");
                    break;
                }
            }
            _ = cancel_token.cancelled() => {
                break;
            }
        }
    }
}

fn sway_reading(profile: &SwayProfile, t: f64, rng: &mut StdRng) -> DeviceMotion {
    let phase = std::f64::consts::TAU * profile.frequency_hz * t;
    let mut jitter = || {
        if profile.jitter > 0.0 {
            rng.gen_range(-profile.jitter..profile.jitter)
        } else {
            0.0
        }
    };

    let yaw = profile.amplitude * phase.sin() + jitter();
    let pitch = 0.5 * profile.amplitude * (phase * 0.7).cos() + jitter();
    let roll = jitter();
    let gravity_z = (profile.gravity_z + 0.5 * jitter()).clamp(-1.0, 1.0);
    let gravity_y = -(1.0 - gravity_z * gravity_z).max(0.0).sqrt();

    DeviceMotion {
        roll,
        pitch,
        yaw,
        gravity_x: 0.0,
        gravity_y,
        gravity_z,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn emits_readings_until_stopped() {
        let source = SimulatedMotionSource::new(SwayProfile {
            seed: Some(7),
            ..SwayProfile::default()
        });
        let mut rx = source
            .start_updates(Duration::from_millis(100))
            .expect("simulated feed starts");
        assert!(source.is_active());

        for _ in 0..5 {
            let reading = rx.recv().await.expect("reading");
            assert!(reading.is_finite());
            assert!(reading.gravity_z.abs() <= 1.0);
        }

        source.stop_updates();
        assert!(!source.is_active());
        while rx.recv().await.is_some() {}
    }

    #[test]
    fn sway_stays_within_amplitude() {
        let profile = SwayProfile {
            seed: Some(1),
            ..SwayProfile::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        for step in 0..600 {
            let reading = sway_reading(&profile, step as f64 / 60.0, &mut rng);
            assert!(reading.yaw.abs() <= profile.amplitude + profile.jitter);
        }
    }
}
