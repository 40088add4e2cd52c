mod profiling;
mod tune_logger;

pub use profiling::ProfileLevel;
pub(crate) use profiling::LaunchSummary;
pub use tune_logger::TuneLogger;
