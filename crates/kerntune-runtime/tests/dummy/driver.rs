use core::time::Duration;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use hashbrown::HashMap;
use kerntune_common::{DimensionVector, EngineError, QueueId, TuneError};
use kerntune_core::{
    KernelArgument, KernelProfilingCounter, ProfilingCounterType, ProfilingCounterValue,
};
use kerntune_runtime::engine::{
    ComputeApi, ComputeDriver, DeviceInfo, DeviceType, GlobalSizeType, LaunchArgument,
    LaunchDescriptor, PlatformInfo,
};

/// What a dummy kernel sees of its launch.
#[derive(Debug, Clone)]
pub struct DummyInvocation {
    pub name: String,
    pub source: String,
    pub global_size: DimensionVector,
    pub local_size: DimensionVector,
    pub scalars: Vec<Vec<u8>>,
    pub local_memory: Vec<usize>,
    pub pass: Option<usize>,
}

impl DummyInvocation {
    /// The value of a `#define` of the source.
    pub fn define(&self, name: &str) -> Option<u64> {
        let prefix = format!("#define {name} ");
        self.source
            .lines()
            .find_map(|line| line.strip_prefix(&prefix))
            .and_then(|value| value.trim().parse().ok())
    }
}

/// Host implementation of a kernel, receiving the contents of its buffers.
pub type DummyKernel = Arc<dyn Fn(&DummyInvocation, &mut [Vec<u8>]) + Send + Sync>;

/// State shared between a test and the driver it gave to an engine.
#[derive(Default)]
pub struct DummyState {
    pub compilations: AtomicUsize,
    pub launches: AtomicUsize,
    pub allocations: AtomicUsize,
    pub releases: AtomicUsize,
    pub synchronizations: AtomicUsize,
    pub fail_launches: AtomicBool,
    pub fail_allocations: AtomicBool,
    pub stall: AtomicBool,
    pub last_invocation: spin::Mutex<Option<DummyInvocation>>,
    pub compiler_options: spin::Mutex<String>,
}

impl DummyState {
    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::SeqCst)
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn live_buffers(&self) -> usize {
        self.allocations.load(Ordering::SeqCst) - self.releases.load(Ordering::SeqCst)
    }

    pub fn last_invocation(&self) -> Option<DummyInvocation> {
        self.last_invocation.lock().clone()
    }
}

#[derive(Debug)]
pub struct DummyProgram {
    source: String,
}

#[derive(Debug)]
pub struct DummyBuffer {
    data: spin::Mutex<Vec<u8>>,
}

#[derive(Debug)]
pub struct DummyEvent {
    duration: Duration,
}

/// Driver running kernels on the host, used to test the engine, the runner and the tuner.
pub struct DummyDriver {
    state: Arc<DummyState>,
    kernels: HashMap<String, DummyKernel>,
    duration: Arc<dyn Fn(&DummyInvocation) -> Duration + Send + Sync>,
    queue_count: usize,
    profiling_passes: Option<usize>,
    profiled_launches: usize,
    counters: Vec<String>,
}

impl core::fmt::Debug for DummyDriver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DummyDriver")
            .field("queue_count", &self.queue_count)
            .field("profiling_passes", &self.profiling_passes)
            .finish()
    }
}

impl DummyDriver {
    pub fn new(state: Arc<DummyState>, queue_count: usize) -> Self {
        Self {
            state,
            kernels: HashMap::new(),
            duration: Arc::new(|_| Duration::from_millis(1)),
            queue_count,
            profiling_passes: None,
            profiled_launches: 0,
            counters: Vec::new(),
        }
    }

    pub fn with_kernel<F>(mut self, name: &str, kernel: F) -> Self
    where
        F: Fn(&DummyInvocation, &mut [Vec<u8>]) + Send + Sync + 'static,
    {
        self.kernels.insert(name.to_string(), Arc::new(kernel));
        self
    }

    pub fn with_duration<F>(mut self, duration: F) -> Self
    where
        F: Fn(&DummyInvocation) -> Duration + Send + Sync + 'static,
    {
        self.duration = Arc::new(duration);
        self
    }

    pub fn with_profiling(mut self, passes: usize) -> Self {
        self.profiling_passes = Some(passes);
        self
    }

    fn error(name: &str) -> TuneError {
        TuneError::from(EngineError::new("Dummy", -1, name))
    }

    fn execute(
        &mut self,
        launch: &LaunchDescriptor<'_, DummyBuffer>,
        source: &str,
        pass: Option<usize>,
    ) -> Result<DummyEvent, TuneError> {
        if self.state.fail_launches.load(Ordering::SeqCst) {
            return Err(Self::error("DUMMY_LAUNCH_FAILED"));
        }
        let kernel = self
            .kernels
            .get(launch.name)
            .cloned()
            .ok_or_else(|| Self::error("DUMMY_KERNEL_NOT_FOUND"))?;

        let mut buffers = Vec::new();
        let mut scalars = Vec::new();
        let mut local_memory = Vec::new();
        for argument in launch.arguments.iter() {
            match argument {
                LaunchArgument::Buffer(buffer) => buffers.push(buffer.data.lock().clone()),
                LaunchArgument::Scalar(value) => scalars.push(value.to_vec()),
                LaunchArgument::Local { bytes } => local_memory.push(*bytes),
            }
        }

        let invocation = DummyInvocation {
            name: launch.name.to_string(),
            source: source.to_string(),
            global_size: launch.global_size,
            local_size: launch.local_size,
            scalars,
            local_memory,
            pass,
        };
        kernel(&invocation, &mut buffers);

        let mut updated = buffers.into_iter();
        for argument in launch.arguments.iter() {
            if let (LaunchArgument::Buffer(buffer), Some(data)) = (argument, updated.next()) {
                *buffer.data.lock() = data;
            }
        }

        self.state.launches.fetch_add(1, Ordering::SeqCst);
        let duration = (self.duration)(&invocation);
        *self.state.last_invocation.lock() = Some(invocation);

        Ok(DummyEvent { duration })
    }
}

impl ComputeDriver for DummyDriver {
    type Program = DummyProgram;
    type Buffer = DummyBuffer;
    type Event = DummyEvent;

    fn api(&self) -> ComputeApi {
        ComputeApi::OpenCl
    }

    fn queue_count(&self) -> usize {
        self.queue_count
    }

    fn compile(&mut self, name: &str, source: &str) -> Result<Self::Program, TuneError> {
        if source.contains("#error") {
            return Err(Self::error("DUMMY_COMPILATION_FAILED"));
        }
        self.state.compilations.fetch_add(1, Ordering::SeqCst);
        log::debug!("Compiling dummy kernel {name}");
        Ok(DummyProgram {
            source: source.to_string(),
        })
    }

    fn allocate(&mut self, argument: &KernelArgument) -> Result<Self::Buffer, TuneError> {
        if self.state.fail_allocations.load(Ordering::SeqCst) {
            return Err(Self::error("DUMMY_ALLOCATION_FAILED"));
        }
        self.state.allocations.fetch_add(1, Ordering::SeqCst);
        let data = argument
            .data()
            .map(<[u8]>::to_vec)
            .unwrap_or_else(|| vec![0; argument.size_in_bytes()]);
        Ok(DummyBuffer {
            data: spin::Mutex::new(data),
        })
    }

    fn upload(&mut self, buffer: &mut Self::Buffer, data: &[u8]) -> Result<(), TuneError> {
        let mut contents = buffer.data.lock();
        contents[..data.len()].copy_from_slice(data);
        Ok(())
    }

    fn download(
        &mut self,
        buffer: &Self::Buffer,
        destination: &mut [u8],
    ) -> Result<(), TuneError> {
        let contents = buffer.data.lock();
        destination.copy_from_slice(&contents[..destination.len()]);
        Ok(())
    }

    fn release(&mut self, _buffer: Self::Buffer) -> Result<(), TuneError> {
        self.state.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn launch(
        &mut self,
        _queue: QueueId,
        program: &Self::Program,
        launch: &LaunchDescriptor<'_, Self::Buffer>,
    ) -> Result<Self::Event, TuneError> {
        self.execute(launch, &program.source, None)
    }

    fn wait(&mut self, event: Self::Event, timeout: Duration) -> Result<Duration, TuneError> {
        if self.state.stall.load(Ordering::SeqCst) {
            return Err(TuneError::timeout("dummy event", timeout));
        }
        Ok(event.duration)
    }

    fn synchronize(&mut self) -> Result<(), TuneError> {
        self.state.synchronizations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn set_compiler_options(&mut self, options: &str) {
        *self.state.compiler_options.lock() = options.to_string();
    }

    fn set_global_size_type(&mut self, _global_size_type: GlobalSizeType) {}

    fn platform_info(&self) -> Result<Vec<PlatformInfo>, TuneError> {
        Ok(vec![PlatformInfo::new(
            0,
            "Dummy platform".to_string(),
            "kerntune".to_string(),
            "1.0".to_string(),
            String::new(),
        )])
    }

    fn device_info(&self, platform: usize) -> Result<Vec<DeviceInfo>, TuneError> {
        if platform != 0 {
            return Err(TuneError::not_found(format!("Invalid platform index: {platform}")));
        }
        Ok(vec![self.current_device_info()?])
    }

    fn current_device_info(&self) -> Result<DeviceInfo, TuneError> {
        Ok(DeviceInfo::new(
            0,
            "Dummy device".to_string(),
            "kerntune".to_string(),
            DeviceType::Cpu,
            1 << 30,
            48 * 1024,
            64 * 1024,
            1024,
            8,
            String::new(),
        ))
    }

    fn set_profiling_counters(&mut self, names: &[String]) -> Result<(), TuneError> {
        if self.profiling_passes.is_none() {
            return Err(self.profiling_unsupported());
        }
        self.counters = names.to_vec();
        Ok(())
    }

    fn profiling_pass_count(&mut self, _program: &Self::Program) -> Result<usize, TuneError> {
        self.profiled_launches = 0;
        self.profiling_passes
            .ok_or_else(|| self.profiling_unsupported())
    }

    fn launch_profiled(
        &mut self,
        _queue: QueueId,
        program: &Self::Program,
        launch: &LaunchDescriptor<'_, Self::Buffer>,
        pass: usize,
    ) -> Result<Self::Event, TuneError> {
        if self.profiling_passes.is_none() {
            return Err(self.profiling_unsupported());
        }
        let event = self.execute(launch, &program.source, Some(pass))?;
        self.profiled_launches += 1;
        Ok(event)
    }

    fn collect_profiling_counters(
        &mut self,
        _program: &Self::Program,
    ) -> Result<Vec<KernelProfilingCounter>, TuneError> {
        let mut counters = vec![KernelProfilingCounter::new(
            "profiled_launches".to_string(),
            ProfilingCounterValue::UnsignedInt(self.profiled_launches as u64),
            ProfilingCounterType::UnsignedInt,
        )];
        counters.extend(self.counters.iter().map(|name| {
            KernelProfilingCounter::new(
                name.clone(),
                ProfilingCounterValue::Double(0.0),
                ProfilingCounterType::Double,
            )
        }));
        Ok(counters)
    }
}
