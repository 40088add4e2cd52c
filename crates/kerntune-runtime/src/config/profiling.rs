use super::logger::{LogLevel, LoggerConfig};

/// Configuration of the launch profiling logs.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ProfilingConfig {
    /// Logger of launch durations.
    #[serde(default)]
    pub logger: LoggerConfig<ProfilingLogLevel>,
}

/// Verbosity of the profiling logger.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ProfilingLogLevel {
    /// Nothing is logged.
    #[default]
    #[serde(rename = "disabled")]
    Disabled,
    /// Only the summary table is logged.
    #[serde(rename = "basic")]
    Basic,
    /// Every launch is logged along with the summary.
    #[serde(rename = "medium")]
    Medium,
    /// Every launch is logged with its configuration.
    #[serde(rename = "full")]
    Full,
}

impl LogLevel for ProfilingLogLevel {}
