use core::time::Duration;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Unit used when reporting durations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    /// Nanoseconds.
    Nanoseconds,
    /// Microseconds.
    Microseconds,
    /// Milliseconds.
    #[default]
    Milliseconds,
    /// Seconds.
    Seconds,
}

impl TimeUnit {
    /// Express the duration in the current unit.
    pub fn convert(&self, duration: Duration) -> f64 {
        let nanos = duration.as_nanos() as f64;
        match self {
            TimeUnit::Nanoseconds => nanos,
            TimeUnit::Microseconds => nanos / 1_000.0,
            TimeUnit::Milliseconds => nanos / 1_000_000.0,
            TimeUnit::Seconds => nanos / 1_000_000_000.0,
        }
    }

    /// The usual symbol of the unit.
    pub fn symbol(&self) -> &'static str {
        match self {
            TimeUnit::Nanoseconds => "ns",
            TimeUnit::Microseconds => "us",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Seconds => "s",
        }
    }
}

/// Measures host-side wall time, e.g. the launch overhead around a native call.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start measuring.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Time elapsed since the timer was started.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_to_each_unit() {
        let duration = Duration::from_micros(1500);

        assert_eq!(TimeUnit::Nanoseconds.convert(duration), 1_500_000.0);
        assert_eq!(TimeUnit::Microseconds.convert(duration), 1_500.0);
        assert_eq!(TimeUnit::Milliseconds.convert(duration), 1.5);
        assert_eq!(TimeUnit::Seconds.convert(duration), 0.0015);
    }
}
