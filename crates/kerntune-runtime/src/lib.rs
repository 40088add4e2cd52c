#![warn(missing_docs)]

//! Kerntune runtime crate: runs and tunes kernel configurations on a compute device.
//!
//! Backends plug in through a [driver](engine::ComputeDriver) wrapped by the
//! [device engine](engine::DeviceEngine), the [runner](runner::KernelRunner) dispatches
//! configurations to it and the [tuner](Tuner) ties kernels, arguments and engine together.

#[macro_use]
extern crate derive_new;

/// Configuration module.
pub mod config;
/// Compute engine module.
pub mod engine;
/// Logging utilities.
pub mod logging;
/// Kernel results.
pub mod result;
/// Kernel runner module.
pub mod runner;
/// Shader compilation boundary of the Vulkan backend.
pub mod shader;
/// Searchers and stop conditions.
pub mod tune;

mod tuner;

pub use result::{ComputationResult, KernelOutcome, KernelResult};
pub use tuner::*;
