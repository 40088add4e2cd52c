mod driver;

pub use driver::*;

use std::sync::Arc;

use kerntune_core::{
    CompositionProfilingData, KernelConfiguration, KernelProfilingData, ParameterPair,
};
use kerntune_runtime::{
    config::{GlobalConfig, LogCapture},
    engine::{ComputeApi, ComputeEngine, DeviceEngine},
    logging::TuneLogger,
    tune::Searcher,
    Backends, Tuner,
};

/// Kernel copying its first buffer into its second one.
pub fn copy_kernel(_invocation: &DummyInvocation, buffers: &mut [Vec<u8>]) {
    let input = buffers[0].clone();
    buffers[1].copy_from_slice(&input);
}

/// Kernel incrementing every `u32` of its first buffer.
pub fn increment_kernel(_invocation: &DummyInvocation, buffers: &mut [Vec<u8>]) {
    let mut values: Vec<u32> = bytemuck::pod_collect_to_vec(buffers[0].as_slice());
    for value in values.iter_mut() {
        *value += 1;
    }
    buffers[0] = bytemuck::cast_slice::<u32, u8>(&values).to_vec();
}

/// A driver knowing the `copy` and `increment` kernels, faster for larger `TILE` values.
pub fn dummy_driver(state: &Arc<DummyState>) -> DummyDriver {
    DummyDriver::new(state.clone(), 2)
        .with_kernel("copy", copy_kernel)
        .with_kernel("increment", increment_kernel)
        .with_duration(|invocation| {
            let tile = invocation.define("TILE").unwrap_or(1);
            core::time::Duration::from_millis(100 / tile)
        })
}

/// A tuner over the driver, logging nothing.
pub fn dummy_tuner(driver: DummyDriver) -> Tuner {
    dummy_tuner_with_config(driver, GlobalConfig::default())
}

/// A tuner over the driver with the given configuration, logging nothing.
pub fn dummy_tuner_with_config(driver: DummyDriver, config: GlobalConfig) -> Tuner {
    let engine = DeviceEngine::from_config(driver, &config, TuneLogger::disabled());
    Tuner::with_engine(Box::new(engine), TuneLogger::disabled())
}

/// A tuner over the driver, logging everything to the capture.
pub fn captured_tuner(driver: DummyDriver, capture: &LogCapture) -> Tuner {
    let engine = DeviceEngine::from_config(
        driver,
        &GlobalConfig::default(),
        TuneLogger::capture(capture),
    );
    Tuner::with_engine(Box::new(engine), TuneLogger::capture(capture))
}

/// Backends with the dummy driver registered for OpenCL.
pub fn dummy_backends(state: &Arc<DummyState>) -> Backends {
    let state = state.clone();
    let mut backends = Backends::new();
    backends.register(ComputeApi::OpenCl, move |selection, config| {
        let driver = DummyDriver::new(state.clone(), selection.queue_count)
            .with_kernel("copy", copy_kernel);
        let logger = TuneLogger::from_config(config.clone());
        let engine: Box<dyn ComputeEngine> =
            Box::new(DeviceEngine::from_config(driver, &config, logger));
        Ok(engine)
    });
    backends
}

/// Searcher trying every configuration in enumeration order.
#[derive(Debug, Default)]
pub struct SequentialSearcher {
    configurations: Vec<Vec<ParameterPair>>,
    index: usize,
    successes: usize,
}

impl SequentialSearcher {
    pub fn successes(&self) -> usize {
        self.successes
    }
}

impl Searcher for SequentialSearcher {
    fn initialize(&mut self, configurations: Vec<Vec<ParameterPair>>) {
        self.configurations = configurations;
        self.index = 0;
    }

    fn calculate_next_configuration(
        &mut self,
        success: bool,
        _previous: &KernelConfiguration,
        _duration: Option<core::time::Duration>,
        _profiling: Option<&KernelProfilingData>,
        _composition_profiling: &CompositionProfilingData,
    ) {
        if success {
            self.successes += 1;
        }
        self.index += 1;
    }

    fn next_configuration(&self) -> Option<Vec<ParameterPair>> {
        self.configurations.get(self.index).cloned()
    }

    fn unexplored_configuration_count(&self) -> usize {
        self.configurations.len() - self.index
    }
}

/// Searcher proposing a fixed list of selections, whatever the space of the kernel.
#[derive(Debug)]
pub struct ScriptedSearcher {
    selections: Vec<Vec<ParameterPair>>,
    index: usize,
}

impl ScriptedSearcher {
    pub fn new(selections: Vec<Vec<ParameterPair>>) -> Self {
        Self {
            selections,
            index: 0,
        }
    }
}

impl Searcher for ScriptedSearcher {
    fn calculate_next_configuration(
        &mut self,
        _success: bool,
        _previous: &KernelConfiguration,
        _duration: Option<core::time::Duration>,
        _profiling: Option<&KernelProfilingData>,
        _composition_profiling: &CompositionProfilingData,
    ) {
        self.index += 1;
    }

    fn next_configuration(&self) -> Option<Vec<ParameterPair>> {
        self.selections.get(self.index).cloned()
    }

    fn unexplored_configuration_count(&self) -> usize {
        self.selections.len() - self.index
    }
}
