use serde::{Deserialize, Serialize};

/// One segment of the paced-breathing cycle.
///
/// `Ready` only opens a run; after it the cycle is
/// `Inhale → HoldBreath → Exhale → Rest → Inhale …`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum ExercisePhase {
    #[default]
    Ready,
    Inhale,
    HoldBreath,
    Exhale,
    Rest,
}

impl ExercisePhase {
    pub const CYCLE: [ExercisePhase; 4] = [
        ExercisePhase::Inhale,
        ExercisePhase::HoldBreath,
        ExercisePhase::Exhale,
        ExercisePhase::Rest,
    ];

    pub fn duration_ms(&self) -> i64 {
        match self {
            ExercisePhase::Ready => 3_000,
            ExercisePhase::Inhale => 4_000,
            ExercisePhase::HoldBreath => 7_000,
            ExercisePhase::Exhale => 8_000,
            ExercisePhase::Rest => 2_000,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_ms() as f64 / 1000.0
    }

    pub fn instruction(&self) -> &'static str {
        match self {
            ExercisePhase::Ready => "Get ready...",
            ExercisePhase::Inhale => "Inhale slowly through nose",
            ExercisePhase::HoldBreath => "Hold your breath",
            ExercisePhase::Exhale => "Exhale completely",
            ExercisePhase::Rest => "Reset and prepare",
        }
    }

    /// Fixed successor. Whether `Rest → Inhale` actually happens is up to the
    /// engine's cycle limit.
    pub fn next(&self) -> ExercisePhase {
        match self {
            ExercisePhase::Ready => ExercisePhase::Inhale,
            ExercisePhase::Inhale => ExercisePhase::HoldBreath,
            ExercisePhase::HoldBreath => ExercisePhase::Exhale,
            ExercisePhase::Exhale => ExercisePhase::Rest,
            ExercisePhase::Rest => ExercisePhase::Inhale,
        }
    }

    /// Length of one full inhale-to-rest cycle.
    pub fn cycle_duration_ms() -> i64 {
        Self::CYCLE.iter().map(|phase| phase.duration_ms()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successor_table_is_cyclic_after_ready() {
        assert_eq!(ExercisePhase::Ready.next(), ExercisePhase::Inhale);
        assert_eq!(ExercisePhase::Exhale.next(), ExercisePhase::Rest);
        assert_eq!(ExercisePhase::Rest.next(), ExercisePhase::Inhale);

        let mut phase = ExercisePhase::Inhale;
        for expected in ExercisePhase::CYCLE.iter().cycle().skip(1).take(8) {
            phase = phase.next();
            assert_eq!(phase, *expected);
        }
    }

    #[test]
    fn durations_and_text() {
        assert_eq!(ExercisePhase::cycle_duration_ms(), 21_000);
        assert_eq!(ExercisePhase::HoldBreath.duration_secs(), 7.0);
        assert_eq!(ExercisePhase::Ready.instruction(), "Get ready...");
        assert_eq!(ExercisePhase::default(), ExercisePhase::Ready);
    }
}
