//! Autotuning of compute kernels.
//!
//! Kernels and their tuning parameters are registered on a [Tuner], which derives a launch
//! configuration for every parameter selection, runs it through a backend
//! [compute engine](engine::ComputeEngine) and records the measured results.

pub use kerntune_common::*;
pub use kerntune_core::*;
pub use kerntune_runtime::*;
