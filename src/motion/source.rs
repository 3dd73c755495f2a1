use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Readings buffered between the sensor callback and the sample pump.
pub const READING_BUFFER: usize = 64;

/// One raw device-motion reading: attitude in radians plus the gravity vector
/// in units of g.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceMotion {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub gravity_x: f64,
    pub gravity_y: f64,
    pub gravity_z: f64,
}

impl DeviceMotion {
    pub fn is_finite(&self) -> bool {
        [
            self.roll,
            self.pitch,
            self.yaw,
            self.gravity_x,
            self.gravity_y,
            self.gravity_z,
        ]
        .iter()
        .all(|value| value.is_finite())
    }
}

/// A device-motion feed that pushes readings at a fixed cadence once started.
///
/// `stop_updates` must release the sensor and drop the sending half, which
/// ends the receiver handed out by `start_updates`.
pub trait MotionSource: Send + Sync {
    fn start_updates(&self, interval: Duration) -> Result<mpsc::Receiver<DeviceMotion>>;
    fn stop_updates(&self);
    fn is_active(&self) -> bool;
}

struct PushState {
    sender: Option<mpsc::Sender<DeviceMotion>>,
    available: bool,
    dropped: u64,
}

/// Feed driven from outside: the host's native sensor callback calls
/// [`PushMotionSource::push`] for every reading.
pub struct PushMotionSource {
    state: Mutex<PushState>,
}

impl PushMotionSource {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PushState {
                sender: None,
                available: true,
                dropped: 0,
            }),
        }
    }

    /// A feed whose hardware is missing or whose permission was denied.
    pub fn unavailable() -> Self {
        let source = Self::new();
        source.set_available(false);
        source
    }

    pub fn set_available(&self, available: bool) {
        self.lock().available = available;
    }

    /// Hands a reading to the pump. Returns false when the feed is stopped or
    /// the buffer is full (the reading is dropped).
    pub fn push(&self, reading: DeviceMotion) -> bool {
        let mut state = self.lock();
        let Some(sender) = state.sender.as_ref() else {
            return false;
        };

        match sender.try_send(reading) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                state.dropped += 1;
                log_debug!("motion buffer full, dropped {} readings so far", state.dropped);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                state.sender = None;
                false
            }
        }
    }

    pub fn dropped_readings(&self) -> u64 {
        self.lock().dropped
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PushState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for PushMotionSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionSource for PushMotionSource {
    fn start_updates(&self, interval: Duration) -> Result<mpsc::Receiver<DeviceMotion>> {
        let mut state = self.lock();
        if !state.available {
            bail!("device motion is not available");
        }

        let (tx, rx) = mpsc::channel(READING_BUFFER);
        state.sender = Some(tx);
        log_info!("push motion feed started ({}ms cadence)", interval.as_millis());
        Ok(rx)
    }

    fn stop_updates(&self) {
        if self.lock().sender.take().is_some() {
            log_info!("push motion feed stopped");
        }
    }

    fn is_active(&self) -> bool {
        self.lock().sender.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(yaw: f64) -> DeviceMotion {
        DeviceMotion {
            yaw,
            gravity_z: -0.6,
            ..DeviceMotion::default()
        }
    }

    #[tokio::test]
    async fn push_delivers_while_started() {
        let source = PushMotionSource::new();
        assert!(!source.push(reading(0.1)), "stopped feed accepts nothing");

        let mut rx = source
            .start_updates(Duration::from_millis(16))
            .expect("feed starts");
        assert!(source.is_active());
        assert!(source.push(reading(0.2)));
        assert_eq!(rx.recv().await.map(|r| r.yaw), Some(0.2));

        source.stop_updates();
        assert!(!source.is_active());
        assert!(rx.recv().await.is_none(), "stopping closes the channel");
    }

    #[test]
    fn unavailable_feed_refuses_to_start() {
        let source = PushMotionSource::unavailable();
        assert!(source.start_updates(Duration::from_millis(16)).is_err());
        assert!(!source.is_active());
    }

    #[test]
    fn full_buffer_drops_readings() {
        let source = PushMotionSource::new();
        let _rx = source
            .start_updates(Duration::from_millis(16))
            .expect("feed starts");
        for _ in 0..READING_BUFFER {
            assert!(source.push(reading(0.0)));
        }
        assert!(!source.push(reading(0.0)));
        assert_eq!(source.dropped_readings(), 1);
    }

    #[test]
    fn non_finite_readings_are_detected() {
        assert!(reading(0.3).is_finite());
        assert!(!reading(f64::NAN).is_finite());
    }
}
