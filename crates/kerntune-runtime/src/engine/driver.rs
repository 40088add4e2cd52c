use core::{fmt::Debug, time::Duration};

use kerntune_common::{DimensionVector, QueueId, TuneError};
use kerntune_core::{KernelArgument, KernelProfilingCounter};
use serde::{Deserialize, Serialize};

/// The native compute API backing an engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComputeApi {
    /// OpenCL.
    OpenCl,
    /// CUDA driver API.
    Cuda,
    /// Vulkan compute.
    Vulkan,
}

impl core::fmt::Display for ComputeApi {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ComputeApi::OpenCl => f.write_str("OpenCL"),
            ComputeApi::Cuda => f.write_str("CUDA"),
            ComputeApi::Vulkan => f.write_str("Vulkan"),
        }
    }
}

/// How the global size of a launch is interpreted by the native API.
///
/// OpenCL and Vulkan count threads, CUDA counts blocks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GlobalSizeType {
    /// Global size in threads, as in OpenCL.
    #[default]
    OpenCl,
    /// Global size in blocks, as in CUDA.
    Cuda,
    /// Global size in threads, as in Vulkan.
    Vulkan,
}

/// The kind of a compute device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    /// Central processing unit.
    Cpu,
    /// Graphics processing unit.
    #[default]
    Gpu,
    /// Dedicated accelerator.
    Accelerator,
    /// Any other kind of device.
    Custom,
}

/// Information about a compute platform.
#[derive(new, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformInfo {
    /// Index of the platform.
    pub index: usize,
    /// Name of the platform.
    pub name: String,
    /// Vendor of the platform.
    pub vendor: String,
    /// Version string reported by the platform.
    pub version: String,
    /// Supported extensions.
    pub extensions: String,
}

/// Information about a compute device.
#[derive(new, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Index of the device on its platform.
    pub index: usize,
    /// Name of the device.
    pub name: String,
    /// Vendor of the device.
    pub vendor: String,
    /// Kind of the device.
    pub device_type: DeviceType,
    /// Global memory in bytes.
    pub global_memory_size: u64,
    /// Local (shared) memory per work group in bytes.
    pub local_memory_size: u64,
    /// Maximum constant buffer size in bytes.
    pub max_constant_buffer_size: u64,
    /// Maximum number of threads in a work group.
    pub max_work_group_size: u64,
    /// Number of compute units.
    pub compute_unit_count: u32,
    /// Supported extensions.
    pub extensions: String,
}

impl core::fmt::Display for PlatformInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "Platform {}: {} ({}), version {}",
            self.index, self.name, self.vendor, self.version
        )
    }
}

impl core::fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "Device {}: {} ({}), {:?}, global memory {} B, local memory {} B, {} compute units, max work group size {}",
            self.index,
            self.name,
            self.vendor,
            self.device_type,
            self.global_memory_size,
            self.local_memory_size,
            self.compute_unit_count,
            self.max_work_group_size,
        )
    }
}

/// An argument of a launch, in kernel parameter order.
#[derive(Debug)]
pub enum LaunchArgument<'a, B> {
    /// A device buffer.
    Buffer(&'a B),
    /// A scalar passed by value.
    Scalar(&'a [u8]),
    /// Dynamically sized local memory.
    Local {
        /// Size of the allocation in bytes.
        bytes: usize,
    },
}

/// Everything a driver needs to launch a compiled program.
#[derive(Debug)]
pub struct LaunchDescriptor<'a, B> {
    /// Entry point of the program.
    pub name: &'a str,
    /// Global size, already validated against the local size.
    pub global_size: DimensionVector,
    /// Local size.
    pub local_size: DimensionVector,
    /// Arguments in kernel parameter order.
    pub arguments: Vec<LaunchArgument<'a, B>>,
}

/// The narrow boundary to a native compute API.
///
/// A driver only translates calls to the native API, every piece of state shared by the backends
/// (kernel cache, buffers, events and profiling sessions) is held by the
/// [device engine](crate::engine::DeviceEngine).
///
/// Native failures must be reported as [engine errors](kerntune_common::EngineError).
pub trait ComputeDriver: Send + Debug + 'static {
    /// A compiled program.
    type Program: Debug + Send + Sync;
    /// A device buffer.
    type Buffer: Debug + Send;
    /// A pending launch.
    type Event: Debug + Send;

    /// The native API of the driver.
    fn api(&self) -> ComputeApi;

    /// The number of compute queues created by the driver.
    fn queue_count(&self) -> usize;

    /// Compile the preprocessed source of a kernel.
    fn compile(&mut self, name: &str, source: &str) -> Result<Self::Program, TuneError>;

    /// Allocate a buffer for the argument and upload its host data.
    fn allocate(&mut self, argument: &KernelArgument) -> Result<Self::Buffer, TuneError>;

    /// Overwrite the beginning of the buffer with the given data.
    fn upload(&mut self, buffer: &mut Self::Buffer, data: &[u8]) -> Result<(), TuneError>;

    /// Copy the beginning of the buffer into the destination, blocking until done.
    fn download(&mut self, buffer: &Self::Buffer, destination: &mut [u8])
        -> Result<(), TuneError>;

    /// Release the buffer.
    fn release(&mut self, buffer: Self::Buffer) -> Result<(), TuneError> {
        core::mem::drop(buffer);
        Ok(())
    }

    /// Launch a program on a queue.
    fn launch(
        &mut self,
        queue: QueueId,
        program: &Self::Program,
        launch: &LaunchDescriptor<'_, Self::Buffer>,
    ) -> Result<Self::Event, TuneError>;

    /// Wait for the completion of a launch, returning its device duration.
    ///
    /// Waiting longer than the timeout fails with a [timeout](TuneError::Timeout).
    fn wait(&mut self, event: Self::Event, timeout: Duration) -> Result<Duration, TuneError>;

    /// Wait for every queue of the device to be idle.
    fn synchronize(&mut self) -> Result<(), TuneError>;

    /// Options passed to the native compiler.
    fn set_compiler_options(&mut self, options: &str);

    /// How global sizes are interpreted by the following launches.
    fn set_global_size_type(&mut self, global_size_type: GlobalSizeType);

    /// The available platforms.
    fn platform_info(&self) -> Result<Vec<PlatformInfo>, TuneError>;

    /// The devices of a platform.
    fn device_info(&self, platform: usize) -> Result<Vec<DeviceInfo>, TuneError>;

    /// The device used by the driver.
    fn current_device_info(&self) -> Result<DeviceInfo, TuneError>;

    /// Select the hardware counters collected by profiled launches.
    fn set_profiling_counters(&mut self, _names: &[String]) -> Result<(), TuneError> {
        Err(self.profiling_unsupported())
    }

    /// The number of launches needed to collect every selected counter for a program.
    fn profiling_pass_count(&mut self, _program: &Self::Program) -> Result<usize, TuneError> {
        Err(self.profiling_unsupported())
    }

    /// Launch one profiling pass of a program.
    fn launch_profiled(
        &mut self,
        _queue: QueueId,
        _program: &Self::Program,
        _launch: &LaunchDescriptor<'_, Self::Buffer>,
        _pass: usize,
    ) -> Result<Self::Event, TuneError> {
        Err(self.profiling_unsupported())
    }

    /// The counters collected over every profiling pass of a program.
    fn collect_profiling_counters(
        &mut self,
        _program: &Self::Program,
    ) -> Result<Vec<KernelProfilingCounter>, TuneError> {
        Err(self.profiling_unsupported())
    }

    #[doc(hidden)]
    fn profiling_unsupported(&self) -> TuneError {
        TuneError::unsupported(format!(
            "Kernel profiling is not supported by the {} backend",
            self.api()
        ))
    }
}
