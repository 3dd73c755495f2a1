pub mod sampler;
pub mod simulated;
pub mod smoothing;
pub mod source;

pub use sampler::{CalibrationReference, OrientationSample, OrientationSampler, DEFAULT_SAMPLE_INTERVAL};
pub use simulated::{SimulatedMotionSource, SwayProfile};
pub use smoothing::{SignalSmoother, Smoothable, SmoothingMode};
pub use source::{DeviceMotion, MotionSource, PushMotionSource};
