use serde::{Deserialize, Serialize};

/// Above this `|gravity_z|` the phone is held at eye level.
pub const EYE_LEVEL_GRAVITY_Z: f64 = 0.85;
/// Below this `|gravity_z|` the phone is upright.
pub const VERTICAL_GRAVITY_Z: f64 = 0.45;
/// Splits the middle band into tilted (below) and flat (at or above).
pub const TILTED_GRAVITY_Z: f64 = 0.65;

/// Coarse device tilt, classified from the gravity vector alone.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DevicePose {
    #[default]
    Flat,
    Tilted,
    Vertical,
    EyeLevel,
}

impl DevicePose {
    pub fn classify(gravity_z: f64) -> Self {
        let z = gravity_z.abs();
        if z > EYE_LEVEL_GRAVITY_Z {
            DevicePose::EyeLevel
        } else if z < VERTICAL_GRAVITY_Z {
            DevicePose::Vertical
        } else if z < TILTED_GRAVITY_Z {
            DevicePose::Tilted
        } else {
            DevicePose::Flat
        }
    }

    /// Short guidance shown next to the pose indicator.
    pub fn label(&self) -> &'static str {
        match self {
            DevicePose::Flat => "Rotate",
            DevicePose::Tilted => "Adjust",
            DevicePose::Vertical | DevicePose::EyeLevel => "Optimal",
        }
    }

    pub fn is_optimal(&self) -> bool {
        matches!(self, DevicePose::Vertical | DevicePose::EyeLevel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_reference_values() {
        assert_eq!(DevicePose::classify(0.9), DevicePose::EyeLevel);
        assert_eq!(DevicePose::classify(-0.9), DevicePose::EyeLevel);
        assert_eq!(DevicePose::classify(0.3), DevicePose::Vertical);
        assert_eq!(DevicePose::classify(-0.3), DevicePose::Vertical);

        let middle = DevicePose::classify(0.6);
        assert!(matches!(middle, DevicePose::Flat | DevicePose::Tilted));
        assert!(!middle.is_optimal());
    }

    #[test]
    fn thresholds_are_exclusive() {
        assert_eq!(DevicePose::classify(0.85), DevicePose::Flat);
        assert_eq!(DevicePose::classify(0.45), DevicePose::Tilted);
        assert_eq!(DevicePose::classify(0.7), DevicePose::Flat);
    }

    #[test]
    fn labels_guide_the_user() {
        assert_eq!(DevicePose::Flat.label(), "Rotate");
        assert_eq!(DevicePose::Tilted.label(), "Adjust");
        assert_eq!(DevicePose::EyeLevel.label(), "Optimal");
        assert!(DevicePose::Vertical.is_optimal());
    }
}
