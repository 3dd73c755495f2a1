use serde::{Deserialize, Serialize};

/// How strong the user's symptoms are; chosen before a breathing run starts.
///
/// Ordering follows intensity, so `Mild < Moderate < Severe`.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "camelCase")]
pub enum SeverityLevel {
    Mild = 1,
    #[default]
    Moderate = 2,
    Severe = 3,
}

impl SeverityLevel {
    pub const ALL: [SeverityLevel; 3] = [
        SeverityLevel::Mild,
        SeverityLevel::Moderate,
        SeverityLevel::Severe,
    ];

    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(SeverityLevel::Mild),
            2 => Some(SeverityLevel::Moderate),
            3 => Some(SeverityLevel::Severe),
            _ => None,
        }
    }

    pub fn level(&self) -> u8 {
        *self as u8
    }

    /// Session length recorded for a breathing run at this severity.
    pub fn recommended_duration_secs(&self) -> u32 {
        match self {
            SeverityLevel::Mild => 180,
            SeverityLevel::Moderate => 300,
            SeverityLevel::Severe => 420,
        }
    }

    /// Breathing cycles after which the run ends on its own.
    pub fn max_cycles(&self) -> u32 {
        match self {
            SeverityLevel::Mild => 7,
            SeverityLevel::Moderate => 12,
            SeverityLevel::Severe => 17,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SeverityLevel::Mild => "Mild",
            SeverityLevel::Moderate => "Moderate",
            SeverityLevel::Severe => "Severe",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SeverityLevel::Mild => "Slight discomfort, can function normally",
            SeverityLevel::Moderate => "Noticeable symptoms, affecting activities",
            SeverityLevel::Severe => "Strong symptoms, difficult to function",
        }
    }
}
