pub mod timer;

#[cfg(any(test, feature = "test-utils"))]
pub mod manual;

#[cfg(any(test, feature = "test-utils"))]
pub use manual::ManualTimer;
pub use timer::{HighPrecisionTimer, Timer};
