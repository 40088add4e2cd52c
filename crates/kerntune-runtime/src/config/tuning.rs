use super::logger::{LogLevel, LoggerConfig};

/// Configuration of the tuner and its engine.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TuningConfig {
    /// Logger of runs, failures and errors.
    #[serde(default)]
    pub logger: LoggerConfig<TuningLogLevel>,
    /// Number of compiled kernels kept by the engine, zero disables the cache.
    #[serde(default = "kernel_cache_capacity_default")]
    pub kernel_cache_capacity: usize,
    /// Bound of every fence or event wait, in seconds.
    #[serde(default = "fence_timeout_secs_default")]
    pub fence_timeout_secs: u64,
    /// Round global sizes up to a multiple of local sizes instead of rejecting them.
    #[serde(default)]
    pub automatic_global_size_correction: bool,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            logger: LoggerConfig::default(),
            kernel_cache_capacity: kernel_cache_capacity_default(),
            fence_timeout_secs: fence_timeout_secs_default(),
            automatic_global_size_correction: false,
        }
    }
}

fn kernel_cache_capacity_default() -> usize {
    10
}

fn fence_timeout_secs_default() -> u64 {
    3600
}

/// Verbosity of the tuning logger.
#[derive(
    Default, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum TuningLogLevel {
    /// Nothing is logged.
    #[serde(rename = "disabled")]
    Disabled,
    /// Errors and failed runs are logged.
    #[default]
    #[serde(rename = "minimal")]
    Minimal,
    /// Every run is logged.
    #[serde(rename = "full")]
    Full,
}

impl LogLevel for TuningLogLevel {}
