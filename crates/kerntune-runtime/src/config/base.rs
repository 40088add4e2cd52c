use super::{compilation::CompilationConfig, profiling::ProfilingConfig, tuning::TuningConfig};
use std::sync::Arc;

/// Static mutex holding the global configuration, initialized as `None`.
static KERNTUNE_GLOBAL_CONFIG: spin::Mutex<Option<Arc<GlobalConfig>>> = spin::Mutex::new(None);

/// The global configuration of kerntune, combining compilation, profiling and tuning settings.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GlobalConfig {
    /// Configuration of the compilation logs.
    #[serde(default)]
    pub compilation: CompilationConfig,

    /// Configuration of the profiling logs.
    #[serde(default)]
    pub profiling: ProfilingConfig,

    /// Configuration of the tuner and its engine.
    #[serde(default)]
    pub tuning: TuningConfig,
}

impl GlobalConfig {
    /// Retrieves the current global configuration, loading it from the current directory if not set.
    ///
    /// If no configuration is set, it attempts to load one from `kerntune.toml` or `KernTune.toml`
    /// in the current directory or its parents, then applies the environment overrides. If no file
    /// is found, a default configuration is used.
    ///
    /// # Notes
    ///
    /// Calling this function takes a global lock. Engines and loggers read it once when they are
    /// created and keep what they need.
    pub fn get() -> Arc<Self> {
        let mut state = KERNTUNE_GLOBAL_CONFIG.lock();
        match state.as_ref() {
            Some(config) => config.clone(),
            None => {
                let config = Arc::new(Self::from_current_dir().override_from_env());
                *state = Some(config.clone());
                config
            }
        }
    }

    /// Save the current configuration to the provided file path.
    pub fn save_default<P: AsRef<std::path::Path>>(path: P) -> std::io::Result<()> {
        let config = Self::get();
        let content = toml::to_string_pretty(config.as_ref()).map_err(std::io::Error::other)?;
        std::fs::write(path, content)
    }

    /// Sets the global configuration to the provided value.
    ///
    /// # Panics
    /// Panics if the configuration has already been set or read, as it cannot be overridden.
    ///
    /// # Warning
    /// This method must be called at the start of the program, before any calls to `get`.
    pub fn set(config: Self) {
        let mut state = KERNTUNE_GLOBAL_CONFIG.lock();
        if state.is_some() {
            panic!("Cannot set the global configuration multiple times.");
        }
        *state = Some(Arc::new(config));
    }

    /// Overrides configuration fields based on environment variables.
    ///
    /// - `KERNTUNE_DEBUG_LOG`: `stdout`, `stderr`, `1` (log to `/tmp/kerntune.log`), `0` or a file path.
    /// - `KERNTUNE_DEBUG_OPTION`: `debug`, `debug-full`, `profile`, `profile-medium` or `profile-full`.
    /// - `KERNTUNE_CACHE_CAPACITY`: the kernel cache capacity.
    pub fn override_from_env(mut self) -> Self {
        use super::{
            compilation::CompilationLogLevel, profiling::ProfilingLogLevel,
            tuning::TuningLogLevel,
        };

        if let Ok(val) = std::env::var("KERNTUNE_DEBUG_LOG") {
            self.compilation.logger.level = CompilationLogLevel::Full;
            self.profiling.logger.level = ProfilingLogLevel::Medium;
            self.tuning.logger.level = TuningLogLevel::Full;

            match val.as_str() {
                "stdout" => {
                    self.compilation.logger.stdout = true;
                    self.profiling.logger.stdout = true;
                    self.tuning.logger.stdout = true;
                }
                "stderr" => {
                    self.compilation.logger.stderr = true;
                    self.profiling.logger.stderr = true;
                    self.tuning.logger.stderr = true;
                }
                "1" | "true" => {
                    let file_path = "/tmp/kerntune.log";
                    self.compilation.logger.file = Some(file_path.into());
                    self.profiling.logger.file = Some(file_path.into());
                    self.tuning.logger.file = Some(file_path.into());
                }
                "0" | "false" => {
                    self.compilation.logger.level = CompilationLogLevel::Disabled;
                    self.profiling.logger.level = ProfilingLogLevel::Disabled;
                    self.tuning.logger.level = TuningLogLevel::Disabled;
                }
                file_path => {
                    self.compilation.logger.file = Some(file_path.into());
                    self.profiling.logger.file = Some(file_path.into());
                    self.tuning.logger.file = Some(file_path.into());
                }
            }
        };

        if let Ok(val) = std::env::var("KERNTUNE_DEBUG_OPTION") {
            match val.as_str() {
                "debug" => {
                    self.compilation.logger.level = CompilationLogLevel::Full;
                    self.profiling.logger.level = ProfilingLogLevel::Medium;
                    self.tuning.logger.level = TuningLogLevel::Full;
                }
                "debug-full" => {
                    self.compilation.logger.level = CompilationLogLevel::Full;
                    self.profiling.logger.level = ProfilingLogLevel::Full;
                    self.tuning.logger.level = TuningLogLevel::Full;
                }
                "profile" => {
                    self.profiling.logger.level = ProfilingLogLevel::Basic;
                }
                "profile-medium" => {
                    self.profiling.logger.level = ProfilingLogLevel::Medium;
                }
                "profile-full" => {
                    self.profiling.logger.level = ProfilingLogLevel::Full;
                }
                _ => {}
            }
        };

        if let Ok(val) = std::env::var("KERNTUNE_CACHE_CAPACITY") {
            match val.parse() {
                Ok(capacity) => self.tuning.kernel_cache_capacity = capacity,
                Err(_) => log::warn!("Ignoring invalid KERNTUNE_CACHE_CAPACITY value {val:?}"),
            }
        }

        self
    }

    // Loads configuration from `kerntune.toml` or `KernTune.toml` in the current directory or its
    // parents.
    //
    // Traverses up the directory tree until a valid configuration file is found or the root is
    // reached. Returns a default configuration if no file is found.
    fn from_current_dir() -> Self {
        let Ok(mut dir) = std::env::current_dir() else {
            return Self::default();
        };

        loop {
            if let Ok(content) = Self::from_file_path(dir.join("kerntune.toml")) {
                return content;
            }

            if let Ok(content) = Self::from_file_path(dir.join("KernTune.toml")) {
                return content;
            }

            if !dir.pop() {
                break;
            }
        }

        Self::default()
    }

    /// Loads configuration from a specified file path.
    ///
    /// # Panics
    /// Panics if the file exists but isn't a valid configuration.
    pub fn from_file_path<P: AsRef<std::path::Path>>(path: P) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = match toml::from_str(&content) {
            Ok(val) => val,
            Err(err) => panic!("The file provided doesn't have the right format => {err:?}"),
        };

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{profiling::ProfilingLogLevel, tuning::TuningLogLevel};

    #[test]
    fn defaults_match_documented_values() {
        let config = GlobalConfig::default();

        assert_eq!(config.tuning.kernel_cache_capacity, 10);
        assert_eq!(config.tuning.fence_timeout_secs, 3600);
        assert!(!config.tuning.automatic_global_size_correction);
        assert_eq!(config.tuning.logger.level, TuningLogLevel::Minimal);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: GlobalConfig = toml::from_str(
            r#"
            [profiling.logger]
            level = "basic"
            stdout = true

            [tuning]
            kernel_cache_capacity = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.profiling.logger.level, ProfilingLogLevel::Basic);
        assert!(config.profiling.logger.stdout);
        assert_eq!(config.tuning.kernel_cache_capacity, 0);
        assert_eq!(config.tuning.fence_timeout_secs, 3600);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let content = toml::to_string_pretty(&GlobalConfig::default()).unwrap();
        let config: GlobalConfig = toml::from_str(&content).unwrap();

        assert_eq!(config.tuning.kernel_cache_capacity, 10);
    }
}
