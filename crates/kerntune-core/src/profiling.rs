use std::collections::BTreeMap;

use kerntune_common::{KernelId, TuneError};
use serde::{Deserialize, Serialize};

/// The kind of value held by a profiling counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfilingCounterType {
    /// Signed integer.
    Int,
    /// Unsigned integer.
    UnsignedInt,
    /// Floating point.
    Double,
    /// Percentage in the `[0, 100]` range.
    Percent,
    /// Bytes per second.
    Throughput,
    /// Utilization level in the `[0, 10]` range.
    UtilizationLevel,
}

/// The value of a profiling counter.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ProfilingCounterValue {
    /// Signed integer.
    Int(i64),
    /// Unsigned integer, also used for throughputs.
    UnsignedInt(u64),
    /// Floating point, also used for percentages.
    Double(f64),
    /// Utilization level.
    UtilizationLevel(u32),
}

impl core::fmt::Display for ProfilingCounterValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ProfilingCounterValue::Int(value) => write!(f, "{value}"),
            ProfilingCounterValue::UnsignedInt(value) => write!(f, "{value}"),
            ProfilingCounterValue::Double(value) => write!(f, "{value}"),
            ProfilingCounterValue::UtilizationLevel(value) => write!(f, "{value}"),
        }
    }
}

/// A hardware profiling counter collected for a kernel launch.
#[derive(new, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KernelProfilingCounter {
    /// The name of the counter, as known by the backend.
    pub name: String,
    /// The collected value.
    pub value: ProfilingCounterValue,
    /// The kind of the value.
    pub counter_type: ProfilingCounterType,
}

/// The profiling counters of one kernel launch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KernelProfilingData {
    counters: Vec<KernelProfilingCounter>,
}

impl KernelProfilingData {
    /// Create profiling data from collected counters.
    pub fn new(counters: Vec<KernelProfilingCounter>) -> Self {
        Self { counters }
    }

    /// Get a counter by name.
    pub fn counter(&self, name: &str) -> Result<&KernelProfilingCounter, TuneError> {
        self.counters
            .iter()
            .find(|counter| counter.name == name)
            .ok_or_else(|| TuneError::not_found(format!("Profiling counter {name}")))
    }

    /// If a counter with the given name was collected.
    pub fn has_counter(&self, name: &str) -> bool {
        self.counters.iter().any(|counter| counter.name == name)
    }

    /// Every collected counter.
    pub fn counters(&self) -> &[KernelProfilingCounter] {
        &self.counters
    }
}

/// Profiling data of each kernel of a composition.
pub type CompositionProfilingData = BTreeMap<KernelId, KernelProfilingData>;
