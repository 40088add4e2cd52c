use core::fmt::{Debug, Write};

use bytemuck::Pod;
use kerntune_common::{ArgumentId, EventId, KernelId, QueueId, TuneError};
use kerntune_core::{ArgumentAccessType, KernelArgument, KernelConfiguration};

use super::{CacheStats, ComputeApi, DeviceInfo, GlobalSizeType, PlatformInfo};
use crate::result::KernelResult;

/// Everything an engine needs to run one configuration of a kernel.
#[derive(new, Clone, Debug, PartialEq)]
pub struct KernelRuntimeData {
    /// The kernel being run.
    pub id: KernelId,
    /// Entry point of the kernel.
    pub name: String,
    /// Source with the parameter defines prepended.
    pub source: String,
    /// The configuration being run.
    pub configuration: KernelConfiguration,
    /// Bound arguments, in kernel parameter order.
    pub arguments: Vec<ArgumentId>,
}

/// Caller memory receiving the device contents of an argument after a run.
#[derive(new, Debug)]
pub struct OutputDescriptor<'a> {
    /// The argument to download.
    pub argument: ArgumentId,
    /// Destination of the download, at most the size of the buffer.
    pub destination: &'a mut [u8],
}

impl<'a> OutputDescriptor<'a> {
    /// Download into a slice of elements.
    pub fn from_slice<T: Pod>(argument: ArgumentId, destination: &'a mut [T]) -> Self {
        Self {
            argument,
            destination: bytemuck::cast_slice_mut(destination),
        }
    }
}

/// Backend agnostic compute engine.
///
/// An engine compiles, caches and launches kernels, owns their device buffers and waits on their
/// events. Every backend gets the same behavior through the [device engine](super::DeviceEngine).
///
/// Engines are driven by a single thread.
pub trait ComputeEngine: Send + Debug {
    /// Compile (or retrieve from the cache) the kernel, upload missing arguments, launch it on
    /// the first queue, wait for it and download the outputs.
    fn run_kernel(
        &mut self,
        data: &KernelRuntimeData,
        arguments: &[&KernelArgument],
        outputs: &mut [OutputDescriptor<'_>],
    ) -> Result<KernelResult, TuneError> {
        let event = self.run_kernel_async(data, arguments, QueueId::new(0))?;
        self.get_kernel_result(event, outputs)
    }

    /// Launch the kernel without waiting for it.
    fn run_kernel_async(
        &mut self,
        data: &KernelRuntimeData,
        arguments: &[&KernelArgument],
        queue: QueueId,
    ) -> Result<EventId, TuneError>;

    /// Wait for a launch and download the outputs.
    fn get_kernel_result(
        &mut self,
        event: EventId,
        outputs: &mut [OutputDescriptor<'_>],
    ) -> Result<KernelResult, TuneError>;

    /// Start a profiling session for the kernel, resetting any previous one.
    fn initialize_kernel_profiling(&mut self, data: &KernelRuntimeData) -> Result<(), TuneError>;

    /// Launch one profiling pass, starting a session when none exists.
    fn run_kernel_with_profiling(
        &mut self,
        data: &KernelRuntimeData,
        arguments: &[&KernelArgument],
        queue: QueueId,
    ) -> Result<EventId, TuneError>;

    /// Number of profiling passes still needed before the counters are complete.
    fn get_remaining_kernel_profiling_runs(
        &self,
        name: &str,
        source: &str,
    ) -> Result<usize, TuneError>;

    /// Wait for a profiling pass and download the outputs.
    ///
    /// The profiling data is attached once the last pass of the session completed.
    fn get_kernel_result_with_profiling(
        &mut self,
        event: EventId,
        outputs: &mut [OutputDescriptor<'_>],
    ) -> Result<KernelResult, TuneError>;

    /// Release non-persistent buffers, optionally only those with the given access type.
    fn clear_buffers(&mut self, access_type: Option<ArgumentAccessType>) -> Result<(), TuneError>;

    /// Drop every pending launch without waiting for it.
    fn clear_events(&mut self);

    /// Wait for the device to be idle.
    fn synchronize_device(&mut self) -> Result<(), TuneError>;

    /// Keep the buffer of a vector argument alive across runs, or release it.
    fn persist_argument(&mut self, argument: &KernelArgument, flag: bool) -> Result<(), TuneError>;

    /// Upload the host data of an argument into its existing buffers.
    fn upload_argument(&mut self, argument: &KernelArgument) -> Result<(), TuneError>;

    /// Whether launches use persistent buffers.
    fn set_persistent_buffer_usage(&mut self, flag: bool);

    /// Copy the device contents of an argument into caller memory.
    fn download_argument(
        &mut self,
        argument: ArgumentId,
        destination: &mut [u8],
    ) -> Result<(), TuneError>;

    /// A copy of the argument holding its device contents.
    fn download_argument_object(
        &mut self,
        argument: &KernelArgument,
    ) -> Result<KernelArgument, TuneError> {
        let mut data = vec![0u8; argument.size_in_bytes()];
        self.download_argument(argument.id(), &mut data)?;
        Ok(argument.with_data(data))
    }

    /// Whether compiled kernels are cached.
    fn set_kernel_cache_usage(&mut self, flag: bool);

    /// Number of compiled kernels kept, zero disables the cache.
    fn set_kernel_cache_capacity(&mut self, capacity: usize);

    /// Options passed to the native compiler, the cache is cleared.
    fn set_compiler_options(&mut self, options: &str);

    /// How global sizes are interpreted by the native API.
    fn set_global_size_type(&mut self, global_size_type: GlobalSizeType);

    /// Round global sizes up to a multiple of local sizes instead of rejecting them.
    fn set_automatic_global_size_correction(&mut self, flag: bool);

    /// Hardware counters collected by profiled runs.
    fn set_kernel_profiling_counters(&mut self, names: &[String]) -> Result<(), TuneError>;

    /// The available platforms.
    fn get_platform_info(&self) -> Result<Vec<PlatformInfo>, TuneError>;

    /// The devices of a platform.
    fn get_device_info(&self, platform: usize) -> Result<Vec<DeviceInfo>, TuneError>;

    /// The device used by the engine.
    fn get_current_device_info(&self) -> Result<DeviceInfo, TuneError>;

    /// Every platform and device, one per line.
    fn compute_api_info(&self) -> Result<String, TuneError> {
        let mut info = String::new();

        for platform in self.get_platform_info()? {
            let devices = self.get_device_info(platform.index)?;
            // Writing into a string can't fail.
            let _ = writeln!(info, "{platform}");
            for device in devices {
                let _ = writeln!(info, "  {device}");
            }
        }

        Ok(info)
    }

    /// Print every platform and device to the standard output.
    fn print_compute_api_info(&self) -> Result<(), TuneError> {
        print!("{}", self.compute_api_info()?);
        Ok(())
    }

    /// Number of compute queues.
    fn queue_count(&self) -> usize;

    /// The native API of the engine.
    fn api(&self) -> ComputeApi;

    /// Kernel cache counters.
    fn cache_stats(&self) -> CacheStats;

    /// Log the summary of the launches waited on so far and reset it.
    fn profile_summary(&mut self);
}
