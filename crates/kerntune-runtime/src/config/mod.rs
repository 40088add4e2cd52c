/// Compilation config module.
pub mod compilation;
/// Profiling config module.
pub mod profiling;
/// Tuning config module.
pub mod tuning;

mod base;
mod logger;

pub use base::*;
pub use logger::{BinaryLogLevel, LogCapture, LogCrateLevel, LogLevel, Logger, LoggerConfig};
