mod base;
mod buffers;
mod cache;
mod device;
mod driver;

pub use base::*;
pub use buffers::{BufferEntry, BufferSet};
pub use cache::{CacheStats, KernelCache};
pub use device::DeviceEngine;
pub use driver::*;
