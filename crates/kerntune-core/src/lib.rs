#![warn(missing_docs)]

//! Kernel parameter spaces and configuration derivation.
//!
//! A [Kernel] declares tuning parameters, constraints over them, parameter packs and modifier
//! functions. The [KernelManager] owns kernels and derives a [KernelConfiguration] from a
//! parameter selection, while the [ConfigurationGenerator] enumerates and validates selections.

#[macro_use]
extern crate derive_new;

/// Kernel arguments and their store.
pub mod argument;
/// Launch configurations.
pub mod configuration;
/// Constraints over parameters.
pub mod constraint;
/// Enumeration and validation of selections.
pub mod generator;
/// Kernels and their parameter space.
pub mod kernel;
/// The kernel registry.
pub mod manager;
/// Thread and local memory modifiers.
pub mod modifier;
/// Parameter packs.
pub mod pack;
/// Tuning parameters and selected values.
pub mod parameter;
/// Profiling counters.
pub mod profiling;

pub use argument::{
    ArgumentAccessType, ArgumentDataType, ArgumentElement, ArgumentMemoryLocation,
    ArgumentStore, ArgumentUploadType, KernelArgument,
};
pub use configuration::{source_with_defines, KernelConfiguration};
pub use constraint::{ConstraintFunction, KernelConstraint};
pub use generator::ConfigurationGenerator;
pub use kernel::Kernel;
pub use manager::KernelManager;
pub use modifier::{
    LocalMemoryModifier, ModifierAction, ModifierFunction, ModifierType, ThreadModifier,
};
pub use pack::KernelParameterPack;
pub use parameter::{KernelParameter, ParameterPair, ParameterValue, ParameterValues};
pub use profiling::{
    CompositionProfilingData, KernelProfilingCounter, KernelProfilingData, ProfilingCounterType,
    ProfilingCounterValue,
};
