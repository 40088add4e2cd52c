use core::time::Duration;
use std::sync::Arc;

use hashbrown::HashMap;
use kerntune_common::{
    ArgumentId, DimensionVector, EventId, IdGenerator, QueueId, Timer, TuneError,
};
use kerntune_core::{
    ArgumentAccessType, ArgumentUploadType, KernelArgument, KernelConfiguration,
    KernelProfilingData,
};

use super::{
    BufferEntry, BufferSet, CacheStats, ComputeApi, ComputeDriver, ComputeEngine, DeviceInfo,
    GlobalSizeType, KernelCache, KernelRuntimeData, LaunchArgument, LaunchDescriptor,
    OutputDescriptor, PlatformInfo,
};
use crate::{config::GlobalConfig, logging::TuneLogger, result::KernelResult};

type ProfilingKey = (String, String);

/// A launch that hasn't been waited on yet.
#[derive(Debug)]
struct PendingLaunch<D: ComputeDriver> {
    event: D::Event,
    // Keeps the program out of cache eviction while the launch is in flight.
    _program: Arc<D::Program>,
    kernel_name: String,
    configuration: KernelConfiguration,
    overhead: Duration,
    profiling: Option<ProfilingKey>,
}

#[derive(Debug)]
struct ProfilingSession<D: ComputeDriver> {
    program: Arc<D::Program>,
    passes: usize,
    remaining: usize,
    // Contents of the writable persistent buffers before the first pass.
    snapshots: Vec<(ArgumentId, Vec<u8>)>,
}

/// The [compute engine](ComputeEngine) of every backend, on top of its native
/// [driver](ComputeDriver).
///
/// The engine holds the state shared by all backends: the kernel cache, the device buffers, the
/// pending launches and the profiling sessions.
#[derive(Debug)]
pub struct DeviceEngine<D: ComputeDriver> {
    driver: D,
    cache: KernelCache<D::Program>,
    cache_usage: bool,
    buffers: BufferSet<D::Buffer>,
    persistent_buffer_usage: bool,
    events: HashMap<EventId, PendingLaunch<D>>,
    event_ids: IdGenerator,
    profiling_sessions: HashMap<ProfilingKey, ProfilingSession<D>>,
    global_size_correction: bool,
    fence_timeout: Duration,
    logger: TuneLogger,
}

impl<D: ComputeDriver> DeviceEngine<D> {
    /// Create an engine configured from the [global configuration](GlobalConfig).
    pub fn new(driver: D) -> Self {
        Self::from_config(driver, &GlobalConfig::get(), TuneLogger::new())
    }

    /// Create an engine from the given configuration and logger.
    pub fn from_config(driver: D, config: &GlobalConfig, logger: TuneLogger) -> Self {
        Self {
            driver,
            cache: KernelCache::new(config.tuning.kernel_cache_capacity),
            cache_usage: true,
            buffers: BufferSet::default(),
            persistent_buffer_usage: true,
            events: HashMap::new(),
            event_ids: IdGenerator::new(),
            profiling_sessions: HashMap::new(),
            global_size_correction: config.tuning.automatic_global_size_correction,
            fence_timeout: Duration::from_secs(config.tuning.fence_timeout_secs),
            logger,
        }
    }

    /// The native driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// The native driver, mutably.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Bound of every wait on a launch.
    pub fn set_fence_timeout(&mut self, timeout: Duration) {
        self.fence_timeout = timeout;
    }

    /// Number of launches that haven't been waited on.
    pub fn pending_launch_count(&self) -> usize {
        self.events.len()
    }

    /// Number of transient and persistent buffers.
    pub fn buffer_count(&self) -> (usize, usize) {
        (self.buffers.transient_len(), self.buffers.persistent_len())
    }

    fn global_size(
        &self,
        configuration: &KernelConfiguration,
    ) -> Result<DimensionVector, TuneError> {
        let global_size = configuration.global_size();
        let local_size = configuration.local_size();

        if global_size.is_divisible_by(&local_size) {
            return Ok(global_size);
        }

        if self.global_size_correction && local_size.total_size() > 0 {
            return Ok(global_size.round_up_to_multiple_of(&local_size));
        }

        Err(TuneError::invalid_configuration(format!(
            "Global size {global_size} is not a multiple of local size {local_size}"
        )))
    }

    fn program(&mut self, name: &str, source: &str) -> Result<Arc<D::Program>, TuneError> {
        if self.cache_usage {
            if let Some(program) = self.cache.get(name, source) {
                return Ok(program);
            }
        }

        if self.logger.compilation_activated() {
            self.logger
                .log_compilation(format!("Compiling kernel {name}:\n{source}"));
        }

        let program = Arc::new(self.driver.compile(name, source)?);
        if self.cache_usage {
            self.cache.insert(name, source, program.clone());
        }

        Ok(program)
    }

    fn upload_arguments(&mut self, arguments: &[&KernelArgument]) -> Result<(), TuneError> {
        let use_persistent = self.persistent_buffer_usage;

        for argument in arguments {
            if argument.upload_type() != ArgumentUploadType::Vector
                || self.buffers.contains(argument.id(), use_persistent)
            {
                continue;
            }

            let buffer = self.driver.allocate(argument)?;
            let entry = BufferEntry::new(buffer, argument.size_in_bytes(), argument.access_type());
            let replaced = if argument.is_persistent() && use_persistent {
                self.buffers.insert_persistent(argument.id(), entry)
            } else {
                self.buffers.insert_transient(argument.id(), entry)
            };

            if let Some(replaced) = replaced {
                self.driver.release(replaced.buffer)?;
            }
        }

        Ok(())
    }

    fn launch(
        &mut self,
        data: &KernelRuntimeData,
        arguments: &[&KernelArgument],
        queue: QueueId,
        profiling: Option<(usize, Arc<D::Program>)>,
    ) -> Result<EventId, TuneError> {
        let timer = Timer::start();

        if queue.value() as usize >= self.driver.queue_count() {
            return Err(TuneError::invalid_argument(format!("Invalid queue id: {queue}")));
        }

        let global_size = self.global_size(&data.configuration)?;
        let (pass, program) = match profiling {
            Some((pass, program)) => (Some(pass), program),
            None => (None, self.program(&data.name, &data.source)?),
        };
        self.upload_arguments(arguments)?;

        let use_persistent = self.persistent_buffer_usage;
        let mut launch_arguments = Vec::with_capacity(arguments.len());
        for argument in arguments {
            let launch_argument = match argument.upload_type() {
                ArgumentUploadType::Vector => {
                    let entry = self
                        .buffers
                        .get(argument.id(), use_persistent)
                        .ok_or_else(|| buffer_not_found(argument.id()))?;
                    LaunchArgument::Buffer(&entry.buffer)
                }
                ArgumentUploadType::Scalar => {
                    LaunchArgument::Scalar(argument.data().unwrap_or_default())
                }
                ArgumentUploadType::Local => {
                    let count = data
                        .configuration
                        .local_memory_size(argument.id())
                        .unwrap_or(argument.count());
                    LaunchArgument::Local {
                        bytes: count * argument.element_size(),
                    }
                }
            };
            launch_arguments.push(launch_argument);
        }

        let descriptor = LaunchDescriptor {
            name: &data.name,
            global_size,
            local_size: data.configuration.local_size(),
            arguments: launch_arguments,
        };
        let event = match pass {
            Some(pass) => {
                self.driver
                    .launch_profiled(queue, &program, &descriptor, pass)?
            }
            None => self.driver.launch(queue, &program, &descriptor)?,
        };

        let id = self.event_ids.generate();
        self.events.insert(
            id,
            PendingLaunch {
                event,
                _program: program,
                kernel_name: data.name.clone(),
                configuration: data.configuration.clone(),
                overhead: timer.elapsed(),
                profiling: pass.map(|_| (data.name.clone(), data.source.clone())),
            },
        );

        Ok(id)
    }

    fn wait(
        &mut self,
        event: EventId,
        outputs: &mut [OutputDescriptor<'_>],
    ) -> Result<(KernelResult, Option<ProfilingKey>), TuneError> {
        let pending = self
            .events
            .remove(&event)
            .ok_or_else(|| TuneError::not_found(format!("Invalid event id: {event}")))?;

        let duration = self.driver.wait(pending.event, self.fence_timeout)?;

        let use_persistent = self.persistent_buffer_usage;
        for output in outputs.iter_mut() {
            self.download(output.argument, output.destination, use_persistent)?;
        }

        self.logger.register_profiled(&pending.kernel_name, duration);

        let result = KernelResult::success(
            pending.kernel_name,
            pending.configuration,
            duration,
            pending.overhead,
        );

        Ok((result, pending.profiling))
    }

    fn snapshot_writable_buffers(
        &mut self,
        arguments: &[ArgumentId],
    ) -> Result<Vec<(ArgumentId, Vec<u8>)>, TuneError> {
        let mut snapshots = Vec::new();
        if !self.persistent_buffer_usage {
            return Ok(snapshots);
        }

        for id in arguments {
            let Some(entry) = self.buffers.persistent(*id) else {
                continue;
            };
            if entry.access_type == ArgumentAccessType::ReadOnly {
                continue;
            }
            let mut contents = vec![0; entry.size];
            self.driver.download(&entry.buffer, &mut contents)?;
            snapshots.push((*id, contents));
        }

        Ok(snapshots)
    }

    fn restore_writable_buffers(&mut self, key: &ProfilingKey) -> Result<(), TuneError> {
        let Some(session) = self.profiling_sessions.get(key) else {
            return Ok(());
        };

        for (id, contents) in session.snapshots.iter() {
            if let Some(entry) = self.buffers.persistent_mut(*id) {
                self.driver.upload(&mut entry.buffer, contents)?;
            }
        }

        Ok(())
    }

    fn download(
        &mut self,
        argument: ArgumentId,
        destination: &mut [u8],
        use_persistent: bool,
    ) -> Result<(), TuneError> {
        let entry = self
            .buffers
            .get(argument, use_persistent)
            .ok_or_else(|| buffer_not_found(argument))?;

        if destination.len() > entry.size {
            return Err(TuneError::invalid_argument(format!(
                "Size of the destination ({} B) exceeds the size of the buffer of argument {argument} ({} B)",
                destination.len(),
                entry.size
            )));
        }

        self.driver.download(&entry.buffer, destination)
    }
}

fn buffer_not_found(argument: ArgumentId) -> TuneError {
    TuneError::not_found(format!("Buffer for argument {argument} was not found"))
}

impl<D: ComputeDriver> ComputeEngine for DeviceEngine<D> {
    fn run_kernel_async(
        &mut self,
        data: &KernelRuntimeData,
        arguments: &[&KernelArgument],
        queue: QueueId,
    ) -> Result<EventId, TuneError> {
        self.launch(data, arguments, queue, None)
    }

    fn get_kernel_result(
        &mut self,
        event: EventId,
        outputs: &mut [OutputDescriptor<'_>],
    ) -> Result<KernelResult, TuneError> {
        self.wait(event, outputs).map(|(result, _)| result)
    }

    fn initialize_kernel_profiling(&mut self, data: &KernelRuntimeData) -> Result<(), TuneError> {
        self.global_size(&data.configuration)?;
        let program = self.program(&data.name, &data.source)?;
        let passes = self.driver.profiling_pass_count(&program)?.max(1);
        let snapshots = self.snapshot_writable_buffers(&data.arguments)?;

        self.profiling_sessions.insert(
            (data.name.clone(), data.source.clone()),
            ProfilingSession {
                program,
                passes,
                remaining: passes,
                snapshots,
            },
        );

        Ok(())
    }

    fn run_kernel_with_profiling(
        &mut self,
        data: &KernelRuntimeData,
        arguments: &[&KernelArgument],
        queue: QueueId,
    ) -> Result<EventId, TuneError> {
        let key = (data.name.clone(), data.source.clone());
        let restart = self
            .profiling_sessions
            .get(&key)
            .map_or(true, |session| session.remaining == 0);
        if restart {
            self.initialize_kernel_profiling(data)?;
        }

        let (pass, program) = match self.profiling_sessions.get(&key) {
            Some(session) => (session.passes - session.remaining, session.program.clone()),
            None => {
                return Err(TuneError::not_found(format!(
                    "No profiling session for kernel {}",
                    data.name
                )))
            }
        };

        if pass > 0 {
            self.restore_writable_buffers(&key)?;
        }

        let event = self.launch(data, arguments, queue, Some((pass, program)))?;
        if let Some(session) = self.profiling_sessions.get_mut(&key) {
            session.remaining -= 1;
        }

        Ok(event)
    }

    fn get_remaining_kernel_profiling_runs(
        &self,
        name: &str,
        source: &str,
    ) -> Result<usize, TuneError> {
        self.profiling_sessions
            .get(&(name.to_string(), source.to_string()))
            .map(|session| session.remaining)
            .ok_or_else(|| TuneError::not_found(format!("No profiling session for kernel {name}")))
    }

    fn get_kernel_result_with_profiling(
        &mut self,
        event: EventId,
        outputs: &mut [OutputDescriptor<'_>],
    ) -> Result<KernelResult, TuneError> {
        let (result, key) = self.wait(event, outputs)?;

        let Some(key) = key else {
            return Ok(result);
        };
        let complete = self
            .profiling_sessions
            .get(&key)
            .is_some_and(|session| session.remaining == 0);
        if !complete {
            return Ok(result);
        }

        match self.profiling_sessions.remove(&key) {
            Some(session) => {
                let counters = self.driver.collect_profiling_counters(&session.program)?;
                Ok(result.with_profiling(KernelProfilingData::new(counters)))
            }
            None => Ok(result),
        }
    }

    fn clear_buffers(&mut self, access_type: Option<ArgumentAccessType>) -> Result<(), TuneError> {
        for entry in self.buffers.clear(access_type) {
            self.driver.release(entry.buffer)?;
        }
        Ok(())
    }

    fn clear_events(&mut self) {
        self.events.clear();
    }

    fn synchronize_device(&mut self) -> Result<(), TuneError> {
        self.driver.synchronize()
    }

    fn persist_argument(&mut self, argument: &KernelArgument, flag: bool) -> Result<(), TuneError> {
        let id = argument.id();

        if !flag {
            if let Some(entry) = self.buffers.take_persistent(id) {
                self.driver.release(entry.buffer)?;
            }
            return Ok(());
        }

        if argument.upload_type() != ArgumentUploadType::Vector {
            return Err(TuneError::invalid_argument(format!(
                "Argument {id} is not a vector argument and can't be persistent"
            )));
        }
        if self.buffers.is_persistent(id) {
            return Ok(());
        }

        let entry = match self.buffers.take_transient(id) {
            Some(entry) => entry,
            None => BufferEntry::new(
                self.driver.allocate(argument)?,
                argument.size_in_bytes(),
                argument.access_type(),
            ),
        };
        self.buffers.insert_persistent(id, entry);

        Ok(())
    }

    fn upload_argument(&mut self, argument: &KernelArgument) -> Result<(), TuneError> {
        let Some(data) = argument.data() else {
            return Ok(());
        };
        let id = argument.id();

        for persistent in [true, false] {
            let entry = match persistent {
                true => self.buffers.take_persistent(id),
                false => self.buffers.take_transient(id),
            };
            let Some(mut entry) = entry else {
                continue;
            };

            if entry.size == data.len() {
                self.driver.upload(&mut entry.buffer, data)?;
            } else {
                self.driver.release(entry.buffer)?;
                entry = BufferEntry::new(
                    self.driver.allocate(argument)?,
                    argument.size_in_bytes(),
                    argument.access_type(),
                );
            }

            match persistent {
                true => self.buffers.insert_persistent(id, entry),
                false => self.buffers.insert_transient(id, entry),
            };
        }

        Ok(())
    }

    fn set_persistent_buffer_usage(&mut self, flag: bool) {
        self.persistent_buffer_usage = flag;
    }

    fn download_argument(
        &mut self,
        argument: ArgumentId,
        destination: &mut [u8],
    ) -> Result<(), TuneError> {
        self.download(argument, destination, true)
    }

    fn set_kernel_cache_usage(&mut self, flag: bool) {
        self.cache_usage = flag;
        if !flag {
            self.cache.clear();
        }
    }

    fn set_kernel_cache_capacity(&mut self, capacity: usize) {
        self.cache.set_capacity(capacity);
    }

    fn set_compiler_options(&mut self, options: &str) {
        self.driver.set_compiler_options(options);
        self.cache.clear();
    }

    fn set_global_size_type(&mut self, global_size_type: GlobalSizeType) {
        self.driver.set_global_size_type(global_size_type);
    }

    fn set_automatic_global_size_correction(&mut self, flag: bool) {
        self.global_size_correction = flag;
    }

    fn set_kernel_profiling_counters(&mut self, names: &[String]) -> Result<(), TuneError> {
        self.driver.set_profiling_counters(names)
    }

    fn get_platform_info(&self) -> Result<Vec<PlatformInfo>, TuneError> {
        self.driver.platform_info()
    }

    fn get_device_info(&self, platform: usize) -> Result<Vec<DeviceInfo>, TuneError> {
        self.driver.device_info(platform)
    }

    fn get_current_device_info(&self) -> Result<DeviceInfo, TuneError> {
        self.driver.current_device_info()
    }

    fn queue_count(&self) -> usize {
        self.driver.queue_count()
    }

    fn api(&self) -> ComputeApi {
        self.driver.api()
    }

    fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn profile_summary(&mut self) {
        self.logger.profile_summary();
    }
}

impl<D: ComputeDriver> Drop for DeviceEngine<D> {
    fn drop(&mut self) {
        self.events.clear();
        for entry in self.buffers.drain_all() {
            if let Err(err) = self.driver.release(entry.buffer) {
                log::warn!("Failed to release a buffer: {err}");
            }
        }
    }
}
