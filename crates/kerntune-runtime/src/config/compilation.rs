use super::logger::{BinaryLogLevel, LoggerConfig};

/// Configuration of the kernel compilation logs.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct CompilationConfig {
    /// Logger of the preprocessed sources being compiled.
    #[serde(default)]
    pub logger: LoggerConfig<CompilationLogLevel>,
}

/// Log level of the compilation logger.
pub type CompilationLogLevel = BinaryLogLevel;
