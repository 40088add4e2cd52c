use core::{fmt::Display, time::Duration};
use std::sync::Arc;

use kerntune_common::TuneError;

use crate::config::{
    compilation::CompilationLogLevel, profiling::ProfilingLogLevel, tuning::TuningLogLevel,
    GlobalConfig, LogCapture, Logger,
};

use super::{LaunchSummary, ProfileLevel};

/// Logger of the engine, the runner and the tuner.
///
/// Compilation, profiling and tuning messages are routed to the outputs configured for their
/// category. Errors are also forwarded to the `log` crate, whatever the configuration.
#[derive(Debug, Default)]
pub struct TuneLogger {
    kind: DebugLoggerKind,
    launches: LaunchSummary,
}

#[derive(Debug, Clone, Copy)]
struct TuneLoggerOptions {
    compilation: bool,
    profile: Option<ProfileLevel>,
    tuning: TuningLogLevel,
}

/// Debugging logger.
#[derive(Debug)]
enum DebugLoggerKind {
    /// Activated logger.
    Activated(Logger, TuneLoggerOptions),
    /// Don't log information.
    None,
}

impl Default for DebugLoggerKind {
    fn default() -> Self {
        Self::new(Logger::new())
    }
}

impl TuneLogger {
    /// Create a logger from the global configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a logger from the given configuration.
    pub fn from_config(config: Arc<GlobalConfig>) -> Self {
        Self {
            kind: DebugLoggerKind::new(Logger::from_config(config)),
            launches: LaunchSummary::default(),
        }
    }

    /// Create a logger writing every category, at full verbosity, to the capture.
    pub fn capture(capture: &LogCapture) -> Self {
        let mut config = GlobalConfig::default();
        config.compilation.logger.level = CompilationLogLevel::Full;
        config.profiling.logger.level = ProfilingLogLevel::Full;
        config.tuning.logger.level = TuningLogLevel::Full;

        Self {
            kind: DebugLoggerKind::new(Logger::capture(Arc::new(config), capture)),
            launches: LaunchSummary::default(),
        }
    }

    /// A logger that drops every message, errors excepted.
    pub fn disabled() -> Self {
        Self {
            kind: DebugLoggerKind::None,
            launches: LaunchSummary::default(),
        }
    }

    /// Returns the profile level, none if profiling is deactivated.
    pub fn profile_level(&self) -> Option<ProfileLevel> {
        self.kind.options().and_then(|options| options.profile)
    }

    /// Returns true if compilation info should be logged.
    pub fn compilation_activated(&self) -> bool {
        self.kind
            .options()
            .map(|options| options.compilation)
            .unwrap_or(false)
    }

    /// Returns the tuning log level, [disabled](TuningLogLevel::Disabled) when deactivated.
    pub fn tuning_level(&self) -> TuningLogLevel {
        self.kind
            .options()
            .map(|options| options.tuning)
            .unwrap_or(TuningLogLevel::Disabled)
    }

    /// Register a profiled launch.
    pub fn register_profiled<Name: Display>(&mut self, name: Name, duration: Duration) {
        let name = name.to_string();
        self.launches.update(&name, duration);

        if let DebugLoggerKind::Activated(logger, options) = &mut self.kind {
            match options.profile {
                None | Some(ProfileLevel::Basic) => {}
                Some(_) => logger.log_profiling(&format!("| {duration:<10?} | {name}")),
            }
        }
    }

    /// Log the argument when the compilation logger is activated.
    pub fn log_compilation<I: Display>(&mut self, arg: I) -> I {
        if let DebugLoggerKind::Activated(logger, options) = &mut self.kind {
            if options.compilation {
                logger.log_compilation(&arg);
            }
        }
        arg
    }

    /// Log a tuning message when the tuning logger is at least at the given level.
    pub fn log_tuning<S: Display>(&mut self, level: TuningLogLevel, msg: &S) {
        if let DebugLoggerKind::Activated(logger, options) = &mut self.kind {
            if level != TuningLogLevel::Disabled && options.tuning >= level {
                logger.log_tuning(msg);
            }
        }
    }

    /// Log an error before it is returned or converted.
    pub fn log_error(&mut self, error: &TuneError) {
        log::error!("{error}");
        self.log_tuning(TuningLogLevel::Minimal, &error);
    }

    /// Show the profiling summary if activated and reset its state.
    pub fn profile_summary(&mut self) {
        if self.profile_level().is_some() {
            let summary = core::mem::take(&mut self.launches);

            if let DebugLoggerKind::Activated(logger, _) = &mut self.kind {
                if !summary.is_empty() {
                    logger.log_profiling(&summary);
                }
            }
        }
    }
}

impl DebugLoggerKind {
    fn new(logger: Logger) -> Self {
        let profile = match logger.log_level_profiling() {
            ProfilingLogLevel::Disabled => None,
            ProfilingLogLevel::Basic => Some(ProfileLevel::Basic),
            ProfilingLogLevel::Medium => Some(ProfileLevel::Medium),
            ProfilingLogLevel::Full => Some(ProfileLevel::Full),
        };
        let options = TuneLoggerOptions {
            compilation: logger.log_level_compilation() == CompilationLogLevel::Full,
            profile,
            tuning: logger.log_level_tuning(),
        };

        if !options.compilation
            && options.profile.is_none()
            && options.tuning == TuningLogLevel::Disabled
        {
            return Self::None;
        }

        Self::Activated(logger, options)
    }

    fn options(&self) -> Option<&TuneLoggerOptions> {
        match self {
            DebugLoggerKind::Activated(_, options) => Some(options),
            DebugLoggerKind::None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_receives_every_category() {
        let capture = LogCapture::new();
        let mut logger = TuneLogger::capture(&capture);

        logger.log_compilation("#define TILE 4");
        logger.register_profiled("copy", Duration::from_micros(5));
        logger.log_tuning(TuningLogLevel::Full, &"Running kernel copy");
        logger.log_error(&TuneError::not_found("Invalid kernel id: 7"));
        logger.profile_summary();

        assert!(capture.contains("#define TILE 4"));
        assert!(capture.contains("| copy"));
        assert!(capture.contains("Running kernel copy"));
        assert!(capture.contains("Invalid kernel id: 7"));
        assert!(capture.contains("| Total"));
    }

    #[test]
    fn disabled_logger_drops_messages() {
        let mut logger = TuneLogger::disabled();

        assert_eq!(logger.log_compilation(3), 3);
        assert_eq!(logger.profile_level(), None);
        assert_eq!(logger.tuning_level(), TuningLogLevel::Disabled);
    }
}
