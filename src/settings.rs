use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::focus::geometry::{ScreenLayout, Sensitivity};
use crate::models::SeverityLevel;
use crate::motion::SmoothingMode;

/// Env var naming the settings file used by `run()`.
pub const SETTINGS_PATH_ENV: &str = "MOTIONEASE_SETTINGS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FocusSettings {
    pub layout: ScreenLayout,
    pub sensitivity: Sensitivity,
    pub smoothing: SmoothingMode,
    pub sample_interval_us: u64,
    /// Length of a horizon-gaze run.
    pub total_duration_secs: u32,
    /// Subtract the calibration reference from later readings.
    pub apply_calibration: bool,
    /// Pulse when the focus point enters the target band.
    pub zone_haptics: bool,
    pub calibration_ticks: u32,
    pub calibration_tick_ms: u64,
    pub clock_interval_ms: u64,
}

impl Default for FocusSettings {
    fn default() -> Self {
        Self {
            layout: ScreenLayout::default(),
            sensitivity: Sensitivity::default(),
            smoothing: SmoothingMode::default(),
            sample_interval_us: 16_667,
            total_duration_secs: 180,
            apply_calibration: true,
            zone_haptics: true,
            calibration_ticks: 10,
            calibration_tick_ms: 100,
            clock_interval_ms: 1000,
        }
    }
}

impl FocusSettings {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_micros(self.sample_interval_us.max(1))
    }

    pub fn calibration_tick(&self) -> Duration {
        Duration::from_millis(self.calibration_tick_ms.max(1))
    }

    pub fn clock_interval(&self) -> Duration {
        Duration::from_millis(self.clock_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BreathingSettings {
    pub tick_interval_ms: u64,
    pub default_severity: SeverityLevel,
}

impl Default for BreathingSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            default_severity: SeverityLevel::Moderate,
        }
    }
}

impl BreathingSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct HapticSettings {
    pub enabled: bool,
    pub intensity: f32,
    pub sharpness: f32,
}

impl Default for HapticSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            intensity: 0.5,
            sharpness: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub focus: FocusSettings,
    pub breathing: BreathingSettings,
    pub haptics: HapticSettings,
}

pub struct SettingsStore {
    path: Option<PathBuf>,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str(&contents) {
                Ok(data) => data,
                Err(err) => {
                    log::warn!(
                        "Ignoring malformed settings at {}: {err}",
                        path.display()
                    );
                    UserSettings::default()
                }
            }
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    /// Settings that are never written to disk.
    pub fn in_memory(data: UserSettings) -> Self {
        Self {
            path: None,
            data: RwLock::new(data),
        }
    }

    /// Opens the file named by `MOTIONEASE_SETTINGS`, or in-memory defaults.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(SETTINGS_PATH_ENV) {
            Some(path) => Self::new(PathBuf::from(path)),
            None => Ok(Self::in_memory(UserSettings::default())),
        }
    }

    pub fn get(&self) -> UserSettings {
        self.read().clone()
    }

    pub fn focus(&self) -> FocusSettings {
        self.read().focus.clone()
    }

    pub fn breathing(&self) -> BreathingSettings {
        self.read().breathing.clone()
    }

    pub fn haptics(&self) -> HapticSettings {
        self.read().haptics.clone()
    }

    pub fn update(&self, settings: UserSettings) -> Result<()> {
        let mut guard = self.write();
        *guard = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    pub fn reload(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let data: UserSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Malformed settings in {}", path.display()))?;
        *self.write() = data;
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
