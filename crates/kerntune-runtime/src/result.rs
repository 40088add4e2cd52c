use core::time::Duration;

use kerntune_common::TimeUnit;
use kerntune_core::{
    CompositionProfilingData, KernelConfiguration, KernelProfilingData, ParameterPair,
};
use serde::{Deserialize, Serialize};

/// The outcome of a kernel run.
#[derive(Clone, Debug, PartialEq)]
pub enum KernelOutcome {
    /// The kernel ran to completion.
    Success {
        /// Device duration of the launch.
        duration: Duration,
        /// Host time spent around the launch.
        overhead: Duration,
        /// Profiling counters, when the run was profiled.
        profiling: Option<KernelProfilingData>,
        /// Profiling counters per kernel of a composition.
        composition_profiling: CompositionProfilingData,
    },
    /// The run failed, the engine was left in a consistent state.
    Failure {
        /// Text of the error that made the run fail.
        message: String,
    },
}

/// The result of running one configuration of a kernel.
#[derive(Clone, Debug, PartialEq)]
pub struct KernelResult {
    kernel_name: String,
    configuration: KernelConfiguration,
    outcome: KernelOutcome,
}

impl KernelResult {
    /// A successful run.
    pub fn success(
        kernel_name: impl Into<String>,
        configuration: KernelConfiguration,
        duration: Duration,
        overhead: Duration,
    ) -> Self {
        Self {
            kernel_name: kernel_name.into(),
            configuration,
            outcome: KernelOutcome::Success {
                duration,
                overhead,
                profiling: None,
                composition_profiling: CompositionProfilingData::new(),
            },
        }
    }

    /// A failed run.
    pub fn failure(
        kernel_name: impl Into<String>,
        configuration: KernelConfiguration,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kernel_name: kernel_name.into(),
            configuration,
            outcome: KernelOutcome::Failure {
                message: message.into(),
            },
        }
    }

    /// Attach profiling data to a successful run.
    pub fn with_profiling(mut self, data: KernelProfilingData) -> Self {
        if let KernelOutcome::Success { profiling, .. } = &mut self.outcome {
            *profiling = Some(data);
        }
        self
    }

    /// Attach the profiling data of the kernels of a composition to a successful run.
    pub fn with_composition_profiling(mut self, data: CompositionProfilingData) -> Self {
        if let KernelOutcome::Success {
            composition_profiling,
            ..
        } = &mut self.outcome
        {
            *composition_profiling = data;
        }
        self
    }

    /// Name of the kernel entry point.
    pub fn kernel_name(&self) -> &str {
        &self.kernel_name
    }

    /// The configuration that was run.
    pub fn configuration(&self) -> &KernelConfiguration {
        &self.configuration
    }

    /// The outcome of the run.
    pub fn outcome(&self) -> &KernelOutcome {
        &self.outcome
    }

    /// If the run succeeded.
    pub fn is_valid(&self) -> bool {
        matches!(self.outcome, KernelOutcome::Success { .. })
    }

    /// The device duration of a successful run.
    pub fn duration(&self) -> Option<Duration> {
        match &self.outcome {
            KernelOutcome::Success { duration, .. } => Some(*duration),
            KernelOutcome::Failure { .. } => None,
        }
    }

    /// The host overhead of a successful run.
    pub fn overhead(&self) -> Option<Duration> {
        match &self.outcome {
            KernelOutcome::Success { overhead, .. } => Some(*overhead),
            KernelOutcome::Failure { .. } => None,
        }
    }

    /// The profiling data of a successful profiled run.
    pub fn profiling_data(&self) -> Option<&KernelProfilingData> {
        match &self.outcome {
            KernelOutcome::Success { profiling, .. } => profiling.as_ref(),
            KernelOutcome::Failure { .. } => None,
        }
    }

    /// The profiling data per kernel of a composition, empty for single kernels.
    pub fn composition_profiling_data(&self) -> Option<&CompositionProfilingData> {
        match &self.outcome {
            KernelOutcome::Success {
                composition_profiling,
                ..
            } => Some(composition_profiling),
            KernelOutcome::Failure { .. } => None,
        }
    }

    /// The error message of a failed run.
    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            KernelOutcome::Success { .. } => None,
            KernelOutcome::Failure { message } => Some(message),
        }
    }
}

/// The public, serializable shape of a [kernel result](KernelResult).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComputationResult {
    /// Name of the kernel entry point.
    pub kernel_name: String,
    /// The selected parameter values.
    pub configuration: Vec<ParameterPair>,
    /// Duration of a successful run, expressed in [time_unit](Self::time_unit).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Unit of the duration.
    pub time_unit: TimeUnit,
    /// Error message of a failed run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Profiling counters of a profiled run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiling_data: Option<KernelProfilingData>,
    /// Profiling counters per kernel of a composition.
    #[serde(default, skip_serializing_if = "CompositionProfilingData::is_empty")]
    pub composition_profiling_data: CompositionProfilingData,
}

impl ComputationResult {
    /// Convert a kernel result, expressing its duration in the given unit.
    pub fn from_result(result: &KernelResult, time_unit: TimeUnit) -> Self {
        Self {
            kernel_name: result.kernel_name.clone(),
            configuration: result.configuration.parameter_pairs().to_vec(),
            duration: result.duration().map(|duration| time_unit.convert(duration)),
            time_unit,
            error_message: result.error_message().map(str::to_string),
            profiling_data: result.profiling_data().cloned(),
            composition_profiling_data: result
                .composition_profiling_data()
                .cloned()
                .unwrap_or_default(),
        }
    }

    /// If the run succeeded.
    pub fn is_valid(&self) -> bool {
        self.error_message.is_none()
    }
}

impl From<KernelResult> for ComputationResult {
    fn from(result: KernelResult) -> Self {
        Self::from_result(&result, TimeUnit::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kerntune_common::DimensionVector;

    fn configuration() -> KernelConfiguration {
        KernelConfiguration::new(
            DimensionVector::new_1d(256),
            DimensionVector::new_1d(64),
            vec![ParameterPair::new("TILE".to_string(), 4u64.into())],
            Vec::new(),
        )
    }

    #[test]
    fn failure_has_no_timing() {
        let result = KernelResult::failure("copy", configuration(), "launch failed");

        assert!(!result.is_valid());
        assert_eq!(result.duration(), None);
        assert_eq!(result.error_message(), Some("launch failed"));
        assert!(result.profiling_data().is_none());
    }

    #[test]
    fn computation_result_uses_the_time_unit() {
        let result = KernelResult::success(
            "copy",
            configuration(),
            Duration::from_micros(1500),
            Duration::from_micros(10),
        );
        let computation = ComputationResult::from_result(&result, TimeUnit::Microseconds);

        assert!(computation.is_valid());
        assert_eq!(computation.duration, Some(1500.0));
        assert_eq!(computation.configuration.len(), 1);
        assert_eq!(computation.configuration[0].name(), "TILE");
    }
}
