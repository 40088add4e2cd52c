#![warn(missing_docs)]

//! Common types shared by the kerntune crates.

/// Backtrace utilities.
pub mod backtrace;
/// Launch extents.
pub mod dim;
/// Error taxonomy.
pub mod error;
/// Identifier types.
pub mod id;
/// Time units and host timers.
pub mod timing;

pub use dim::{DimensionVector, ModifierDimension};
pub use error::{EngineError, TuneError, TuneErrorKind};
pub use id::{ArgumentId, EventId, IdGenerator, KernelId, QueueId};
pub use timing::{TimeUnit, Timer};
