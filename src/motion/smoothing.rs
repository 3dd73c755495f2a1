use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Reference window length for the moving average.
pub const DEFAULT_WINDOW: usize = 5;

/// Reference factor for the exponential average.
pub const DEFAULT_EXPONENTIAL_FACTOR: f64 = 0.2;

/// A value the smoother can average: scalars and screen points.
pub trait Smoothable: Copy {
    fn zero() -> Self;
    fn add(self, other: Self) -> Self;
    fn scale(self, factor: f64) -> Self;
}

impl Smoothable for f64 {
    fn zero() -> Self {
        0.0
    }

    fn add(self, other: Self) -> Self {
        self + other
    }

    fn scale(self, factor: f64) -> Self {
        self * factor
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum SmoothingMode {
    MovingAverage { window: usize },
    Exponential { factor: f64 },
}

impl Default for SmoothingMode {
    fn default() -> Self {
        SmoothingMode::MovingAverage {
            window: DEFAULT_WINDOW,
        }
    }
}

/// Suppresses sensor jitter on a scalar or 2-D signal.
#[derive(Debug, Clone)]
pub struct SignalSmoother<T: Smoothable> {
    mode: SmoothingMode,
    window: VecDeque<T>,
    ema: Option<T>,
}

impl<T: Smoothable> SignalSmoother<T> {
    pub fn new(mode: SmoothingMode) -> Self {
        let mode = match mode {
            SmoothingMode::MovingAverage { window } => SmoothingMode::MovingAverage {
                window: window.max(1),
            },
            SmoothingMode::Exponential { factor } => SmoothingMode::Exponential {
                factor: if factor.is_finite() {
                    factor.clamp(f64::EPSILON, 1.0)
                } else {
                    DEFAULT_EXPONENTIAL_FACTOR
                },
            },
        };

        let capacity = match mode {
            SmoothingMode::MovingAverage { window } => window,
            SmoothingMode::Exponential { .. } => 0,
        };

        Self {
            mode,
            window: VecDeque::with_capacity(capacity),
            ema: None,
        }
    }

    pub fn push(&mut self, value: T) -> T {
        match self.mode {
            SmoothingMode::MovingAverage { window } => {
                if self.window.len() == window {
                    self.window.pop_front();
                }
                self.window.push_back(value);

                let sum = self
                    .window
                    .iter()
                    .fold(T::zero(), |acc, item| acc.add(*item));
                sum.scale(1.0 / self.window.len() as f64)
            }
            SmoothingMode::Exponential { factor } => {
                let next = match self.ema {
                    // The first value seeds the average instead of pulling it from zero.
                    None => value,
                    Some(previous) => value.scale(factor).add(previous.scale(1.0 - factor)),
                };
                self.ema = Some(next);
                next
            }
        }
    }

    pub fn clear(&mut self) {
        self.window.clear();
        self.ema = None;
    }

    pub fn len(&self) -> usize {
        match self.mode {
            SmoothingMode::MovingAverage { .. } => self.window.len(),
            SmoothingMode::Exponential { .. } => usize::from(self.ema.is_some()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn mode(&self) -> SmoothingMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moving_average_uses_last_window_values() {
        let mut smoother = SignalSmoother::<f64>::new(SmoothingMode::default());
        assert_eq!(smoother.push(10.0), 10.0);
        assert_eq!(smoother.push(20.0), 15.0);
        for value in [30.0, 40.0, 50.0] {
            smoother.push(value);
        }
        assert_eq!(smoother.len(), DEFAULT_WINDOW);
        // Window is now 20..60; the 10 fell out.
        assert_eq!(smoother.push(60.0), 40.0);
    }

    #[test]
    fn exponential_average_weights_new_values() {
        let mut smoother = SignalSmoother::<f64>::new(SmoothingMode::Exponential {
            factor: DEFAULT_EXPONENTIAL_FACTOR,
        });
        assert_eq!(smoother.push(10.0), 10.0);
        let next = smoother.push(20.0);
        assert!((next - 12.0).abs() < 1e-12);
    }

    #[test]
    fn clear_forgets_history() {
        let mut smoother = SignalSmoother::<f64>::new(SmoothingMode::default());
        smoother.push(100.0);
        smoother.push(100.0);
        smoother.clear();
        assert!(smoother.is_empty());
        assert_eq!(smoother.push(1.0), 1.0);
    }

    #[test]
    fn degenerate_settings_are_sanitised() {
        let mut zero_window = SignalSmoother::<f64>::new(SmoothingMode::MovingAverage { window: 0 });
        assert_eq!(zero_window.push(3.0), 3.0);
        assert_eq!(zero_window.push(5.0), 5.0);

        let nan_factor = SignalSmoother::<f64>::new(SmoothingMode::Exponential { factor: f64::NAN });
        assert_eq!(
            nan_factor.mode(),
            SmoothingMode::Exponential {
                factor: DEFAULT_EXPONENTIAL_FACTOR
            }
        );
    }
}
