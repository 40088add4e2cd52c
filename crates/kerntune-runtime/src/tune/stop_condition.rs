use core::{fmt::Debug, time::Duration};

use kerntune_common::Timer;

use crate::result::KernelResult;

/// Ends a tuning loop before the space is exhausted.
pub trait StopCondition: Debug {
    /// Called once before tuning, with the size of the space.
    fn initialize(&mut self, configuration_count: usize);

    /// Account for a finished run.
    fn update(&mut self, result: &KernelResult);

    /// If tuning should stop.
    fn is_fulfilled(&self) -> bool;

    /// Human readable progress.
    fn status(&self) -> String;
}

/// Stops after a number of configurations were tried, failures included.
#[derive(Debug, Clone)]
pub struct ConfigurationCount {
    target: usize,
    count: usize,
}

impl ConfigurationCount {
    /// Stop after `target` configurations.
    pub fn new(target: usize) -> Self {
        Self { target, count: 0 }
    }
}

impl StopCondition for ConfigurationCount {
    fn initialize(&mut self, configuration_count: usize) {
        self.count = 0;
        self.target = self.target.min(configuration_count);
    }

    fn update(&mut self, _result: &KernelResult) {
        self.count += 1;
    }

    fn is_fulfilled(&self) -> bool {
        self.count >= self.target
    }

    fn status(&self) -> String {
        format!("Tried {} out of {} configurations", self.count, self.target)
    }
}

/// Stops once a configuration runs at least as fast as the target.
#[derive(Debug, Clone)]
pub struct ConfigurationDuration {
    target: Duration,
    best: Option<Duration>,
}

impl ConfigurationDuration {
    /// Stop on the first configuration not slower than `target`.
    pub fn new(target: Duration) -> Self {
        Self { target, best: None }
    }
}

impl StopCondition for ConfigurationDuration {
    fn initialize(&mut self, _configuration_count: usize) {
        self.best = None;
    }

    fn update(&mut self, result: &KernelResult) {
        if let Some(duration) = result.duration() {
            self.best = Some(self.best.map_or(duration, |best| best.min(duration)));
        }
    }

    fn is_fulfilled(&self) -> bool {
        self.best.is_some_and(|best| best <= self.target)
    }

    fn status(&self) -> String {
        match self.best {
            Some(best) => format!("Best duration {best:?}, target {:?}", self.target),
            None => format!("No successful configuration yet, target {:?}", self.target),
        }
    }
}

/// Stops after a fraction of the space was tried.
#[derive(Debug, Clone)]
pub struct ConfigurationFraction {
    fraction: f64,
    total: usize,
    count: usize,
}

impl ConfigurationFraction {
    /// Stop after `fraction` of the space, clamped to `[0, 1]`.
    pub fn new(fraction: f64) -> Self {
        Self {
            fraction: fraction.clamp(0.0, 1.0),
            total: 0,
            count: 0,
        }
    }
}

impl StopCondition for ConfigurationFraction {
    fn initialize(&mut self, configuration_count: usize) {
        self.total = configuration_count;
        self.count = 0;
    }

    fn update(&mut self, _result: &KernelResult) {
        self.count += 1;
    }

    fn is_fulfilled(&self) -> bool {
        self.total == 0 || self.count as f64 / self.total as f64 >= self.fraction
    }

    fn status(&self) -> String {
        format!(
            "Tried {} out of {} configurations, target fraction {}",
            self.count, self.total, self.fraction
        )
    }
}

/// Stops once tuning lasted for the given time.
#[derive(Debug, Clone)]
pub struct TuningDuration {
    limit: Duration,
    timer: Option<Timer>,
}

impl TuningDuration {
    /// Stop after `limit` of tuning.
    pub fn new(limit: Duration) -> Self {
        Self { limit, timer: None }
    }

    fn elapsed(&self) -> Duration {
        self.timer.map(|timer| timer.elapsed()).unwrap_or_default()
    }
}

impl StopCondition for TuningDuration {
    fn initialize(&mut self, _configuration_count: usize) {
        self.timer = Some(Timer::start());
    }

    fn update(&mut self, _result: &KernelResult) {}

    fn is_fulfilled(&self) -> bool {
        self.timer.is_some() && self.elapsed() >= self.limit
    }

    fn status(&self) -> String {
        format!("Tuning for {:?} out of {:?}", self.elapsed(), self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kerntune_common::DimensionVector;
    use kerntune_core::KernelConfiguration;

    fn result(duration: Option<u64>) -> KernelResult {
        let configuration = KernelConfiguration::new(
            DimensionVector::new_1d(64),
            DimensionVector::new_1d(64),
            Vec::new(),
            Vec::new(),
        );
        match duration {
            Some(millis) => KernelResult::success(
                "kernel",
                configuration,
                Duration::from_millis(millis),
                Duration::ZERO,
            ),
            None => KernelResult::failure("kernel", configuration, "failed"),
        }
    }

    #[test]
    fn configuration_count_includes_failures() {
        let mut condition = ConfigurationCount::new(2);
        condition.initialize(10);

        condition.update(&result(None));
        assert!(!condition.is_fulfilled());
        condition.update(&result(Some(3)));
        assert!(condition.is_fulfilled());
    }

    #[test]
    fn configuration_count_is_bounded_by_the_space() {
        let mut condition = ConfigurationCount::new(20);
        condition.initialize(1);

        condition.update(&result(Some(3)));

        assert!(condition.is_fulfilled());
    }

    #[test]
    fn configuration_duration_ignores_failures() {
        let mut condition = ConfigurationDuration::new(Duration::from_millis(5));
        condition.initialize(10);

        condition.update(&result(None));
        condition.update(&result(Some(8)));
        assert!(!condition.is_fulfilled());
        condition.update(&result(Some(5)));
        assert!(condition.is_fulfilled());
    }

    #[test]
    fn configuration_fraction() {
        let mut condition = ConfigurationFraction::new(0.5);
        condition.initialize(4);

        condition.update(&result(Some(1)));
        assert!(!condition.is_fulfilled());
        condition.update(&result(Some(1)));
        assert!(condition.is_fulfilled());
    }

    #[test]
    fn tuning_duration_starts_on_initialize() {
        let mut condition = TuningDuration::new(Duration::ZERO);
        assert!(!condition.is_fulfilled());

        condition.initialize(4);

        assert!(condition.is_fulfilled());
    }
}
