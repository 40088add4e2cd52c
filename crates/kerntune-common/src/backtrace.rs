/// Contains the backtrace information captured when an error was created.
#[derive(Clone)]
pub struct BackTrace {
    inner: String,
}

impl BackTrace {
    /// Creates a new backtrace from the current thread.
    ///
    /// The backtrace is only resolved when `RUST_BACKTRACE` or `RUST_LIB_BACKTRACE` is set, which
    /// keeps validation errors cheap during tuning loops.
    pub fn capture() -> Self {
        Self {
            inner: format!("{}", std::backtrace::Backtrace::capture()),
        }
    }
}

impl core::fmt::Debug for BackTrace {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{}", self.inner))
    }
}

impl core::fmt::Display for BackTrace {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{}", self.inner))
    }
}
