pub mod clock;
pub mod logging;

pub use clock::format_clock;
pub use logging::init_logging;
