use crate::backtrace::BackTrace;
use core::time::Duration;
use thiserror::Error;

/// Errors returned by every public kerntune operation.
///
/// Validation errors ([NotFound](TuneError::NotFound),
/// [InvalidArgument](TuneError::InvalidArgument) and
/// [InvalidConfiguration](TuneError::InvalidConfiguration)) are raised by the call that detects
/// them. Engine errors and timeouts raised while running a kernel are converted into a failed
/// kernel result by the runner instead of being propagated.
#[derive(Error, Clone)]
pub enum TuneError {
    /// A kernel, argument, buffer, event or file could not be found.
    #[error("Not found: {reason}")]
    NotFound {
        /// What was looked up.
        reason: String,
        /// The captured backtrace.
        backtrace: BackTrace,
    },

    /// An argument given to an operation is invalid.
    #[error("Invalid argument: {reason}")]
    InvalidArgument {
        /// Why the argument was rejected.
        reason: String,
        /// The captured backtrace.
        backtrace: BackTrace,
    },

    /// A configuration can't be launched as is.
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Why the configuration was rejected.
        reason: String,
        /// The captured backtrace.
        backtrace: BackTrace,
    },

    /// The requested feature isn't available in this build or on this backend.
    #[error("Unsupported: {reason}")]
    Unsupported {
        /// What isn't supported.
        reason: String,
        /// The captured backtrace.
        backtrace: BackTrace,
    },

    /// A native backend call failed.
    #[error("{0}")]
    Engine(#[from] EngineError),

    /// Waiting on a device fence or event exceeded its bound.
    #[error("Timeout after {waited:?} while waiting for {operation}")]
    Timeout {
        /// The operation that was waited on.
        operation: String,
        /// How long the wait lasted.
        waited: Duration,
        /// The captured backtrace.
        backtrace: BackTrace,
    },
}

/// Failure of a native backend call, carrying the backend specific code and its name.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub struct EngineError {
    /// The backend that reported the error, e.g. `CUDA`.
    pub backend: String,
    /// The raw status code returned by the native call.
    pub code: i64,
    /// The symbolic name of the status code, e.g. `CUDA_ERROR_LAUNCH_FAILED`.
    pub name: String,
    /// Optional details, usually the failing native call.
    pub info: Option<String>,
}

impl EngineError {
    /// Create a new engine error.
    pub fn new(backend: impl Into<String>, code: i64, name: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            code,
            name: name.into(),
            info: None,
        }
    }

    /// Attach additional information to the error.
    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }
}

impl core::fmt::Display for EngineError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Internal {} error: {} ({})", self.backend, self.name, self.code)?;
        if let Some(info) = &self.info {
            write!(f, "\nAdditional info: {info}")?;
        }
        Ok(())
    }
}

impl TuneError {
    /// Create a [not found](TuneError::NotFound) error.
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::NotFound {
            reason: reason.into(),
            backtrace: BackTrace::capture(),
        }
    }

    /// Create an [invalid argument](TuneError::InvalidArgument) error.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
            backtrace: BackTrace::capture(),
        }
    }

    /// Create an [invalid configuration](TuneError::InvalidConfiguration) error.
    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
            backtrace: BackTrace::capture(),
        }
    }

    /// Create an [unsupported](TuneError::Unsupported) error.
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::Unsupported {
            reason: reason.into(),
            backtrace: BackTrace::capture(),
        }
    }

    /// Create a [timeout](TuneError::Timeout) error.
    pub fn timeout(operation: impl Into<String>, waited: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            waited,
            backtrace: BackTrace::capture(),
        }
    }

    /// The kind of the error, without its payload.
    pub fn kind(&self) -> TuneErrorKind {
        match self {
            TuneError::NotFound { .. } => TuneErrorKind::NotFound,
            TuneError::InvalidArgument { .. } => TuneErrorKind::InvalidArgument,
            TuneError::InvalidConfiguration { .. } => TuneErrorKind::InvalidConfiguration,
            TuneError::Unsupported { .. } => TuneErrorKind::Unsupported,
            TuneError::Engine(_) => TuneErrorKind::Engine,
            TuneError::Timeout { .. } => TuneErrorKind::Timeout,
        }
    }

    /// The backtrace captured when the error was created, if any.
    pub fn backtrace(&self) -> Option<&BackTrace> {
        match self {
            TuneError::NotFound { backtrace, .. }
            | TuneError::InvalidArgument { backtrace, .. }
            | TuneError::InvalidConfiguration { backtrace, .. }
            | TuneError::Unsupported { backtrace, .. }
            | TuneError::Timeout { backtrace, .. } => Some(backtrace),
            TuneError::Engine(_) => None,
        }
    }
}

impl core::fmt::Debug for TuneError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{self}"))?;
        if let Some(backtrace) = self.backtrace() {
            f.write_fmt(format_args!("\nBacktrace:\n{backtrace}"))?;
        }
        Ok(())
    }
}

/// Payload-free discriminant of [TuneError], handy for assertions and dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TuneErrorKind {
    /// See [TuneError::NotFound].
    NotFound,
    /// See [TuneError::InvalidArgument].
    InvalidArgument,
    /// See [TuneError::InvalidConfiguration].
    InvalidConfiguration,
    /// See [TuneError::Unsupported].
    Unsupported,
    /// See [TuneError::Engine].
    Engine,
    /// See [TuneError::Timeout].
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_error_display_contains_code_and_name() {
        let error = TuneError::from(
            EngineError::new("CUDA", 719, "CUDA_ERROR_LAUNCH_FAILED").with_info("cuLaunchKernel"),
        );

        assert_eq!(
            error.to_string(),
            "Internal CUDA error: CUDA_ERROR_LAUNCH_FAILED (719)\nAdditional info: cuLaunchKernel"
        );
        assert_eq!(error.kind(), TuneErrorKind::Engine);
    }

    #[test]
    fn validation_errors_keep_their_kind() {
        assert_eq!(
            TuneError::not_found("Invalid kernel id: 3").kind(),
            TuneErrorKind::NotFound
        );
        assert_eq!(
            TuneError::invalid_argument("empty").to_string(),
            "Invalid argument: empty"
        );
    }
}
