use rodio::Source;
use std::time::Duration;

use super::PulsePattern;

const SAMPLE_RATE: u32 = 44100;
const CLICK_MS: u32 = 30;

/// A short decaying sine burst standing in for a transient vibration.
/// Sharpness raises the pitch, intensity the amplitude.
pub struct ClickTone {
    sample_rate: u32,
    frequency: f32,
    amplitude: f32,
    total_samples: u32,
    position: u32,
}

impl ClickTone {
    pub fn new(pattern: PulsePattern) -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            frequency: 200.0 + pattern.sharpness * 800.0,
            amplitude: pattern.intensity * 0.6,
            total_samples: SAMPLE_RATE * CLICK_MS / 1000,
            position: 0,
        }
    }
}

impl Iterator for ClickTone {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.total_samples {
            return None;
        }

        let t = self.position as f32 / self.sample_rate as f32;
        let envelope = 1.0 - self.position as f32 / self.total_samples as f32;
        self.position += 1;

        Some((std::f32::consts::TAU * self.frequency * t).sin() * self.amplitude * envelope)
    }
}

impl Source for ClickTone {
    fn current_frame_len(&self) -> Option<usize> {
        Some((self.total_samples - self.position) as usize)
    }

    fn channels(&self) -> u16 {
        1 // Mono
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_millis(CLICK_MS as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_is_short_and_bounded() {
        let samples: Vec<f32> = ClickTone::new(PulsePattern::default()).collect();
        assert_eq!(samples.len(), (SAMPLE_RATE * CLICK_MS / 1000) as usize);
        assert!(samples.iter().all(|s| s.abs() <= 0.6));
    }
}
