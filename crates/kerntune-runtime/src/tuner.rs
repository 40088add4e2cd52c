use core::fmt::Debug;
use std::{path::Path, sync::Arc};

use bytemuck::Pod;
use hashbrown::HashMap;
use kerntune_common::{
    ArgumentId, DimensionVector, KernelId, ModifierDimension, TimeUnit, TuneError,
};
use kerntune_core::{
    ArgumentAccessType, ArgumentElement, ArgumentMemoryLocation, ArgumentStore,
    CompositionProfilingData, KernelArgument, KernelManager, ModifierAction, ModifierType,
    ParameterPair,
};

use crate::{
    config::{tuning::TuningLogLevel, GlobalConfig},
    engine::{
        ComputeApi, ComputeEngine, DeviceInfo, GlobalSizeType, OutputDescriptor, PlatformInfo,
    },
    logging::TuneLogger,
    result::{ComputationResult, KernelResult},
    runner::KernelRunner,
    tune::{Searcher, StopCondition},
};

/// The device an engine is created for.
#[derive(new, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceSelection {
    /// Index of the platform.
    pub platform: usize,
    /// Index of the device on the platform.
    pub device: usize,
    /// Number of compute queues to create.
    pub queue_count: usize,
}

/// Creates the engine of a backend.
pub type EngineFactory = Box<
    dyn Fn(DeviceSelection, Arc<GlobalConfig>) -> Result<Box<dyn ComputeEngine>, TuneError>
        + Send
        + Sync,
>;

/// The backends available in a build, by compute API.
#[derive(Default)]
pub struct Backends {
    factories: HashMap<ComputeApi, EngineFactory>,
}

impl Backends {
    /// No backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the engine factory of an API, replacing the previous one.
    pub fn register<F>(&mut self, api: ComputeApi, factory: F) -> &mut Self
    where
        F: Fn(DeviceSelection, Arc<GlobalConfig>) -> Result<Box<dyn ComputeEngine>, TuneError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(api, Box::new(factory));
        self
    }

    /// If an engine can be created for the API.
    pub fn is_supported(&self, api: ComputeApi) -> bool {
        self.factories.contains_key(&api)
    }

    /// Create the engine of an API.
    pub fn create(
        &self,
        api: ComputeApi,
        selection: DeviceSelection,
        config: Arc<GlobalConfig>,
    ) -> Result<Box<dyn ComputeEngine>, TuneError> {
        match self.factories.get(&api) {
            Some(factory) => factory(selection, config),
            None => Err(TuneError::unsupported(format!(
                "Support for {api} is not included in this build"
            ))),
        }
    }
}

impl Debug for Backends {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

/// Entry point of kerntune.
///
/// A tuner owns the kernels, their arguments and the engine of one device. Every error it returns
/// is logged first, and non-persistent buffers are released after every run.
#[derive(Debug)]
pub struct Tuner {
    manager: KernelManager,
    store: ArgumentStore,
    runner: KernelRunner,
    results: HashMap<KernelId, Vec<KernelResult>>,
}

impl Tuner {
    /// Create a tuner for a device, configured from the [global configuration](GlobalConfig).
    pub fn new(
        api: ComputeApi,
        selection: DeviceSelection,
        backends: &Backends,
    ) -> Result<Self, TuneError> {
        Self::from_config(api, selection, backends, GlobalConfig::get())
    }

    /// Create a tuner for a device with the given configuration.
    pub fn from_config(
        api: ComputeApi,
        selection: DeviceSelection,
        backends: &Backends,
        config: Arc<GlobalConfig>,
    ) -> Result<Self, TuneError> {
        let mut logger = TuneLogger::from_config(config.clone());

        if selection.queue_count == 0 {
            let error =
                TuneError::invalid_argument("Number of compute queues must be greater than zero");
            logger.log_error(&error);
            return Err(error);
        }

        match backends.create(api, selection, config) {
            Ok(engine) => {
                logger.log_tuning(
                    TuningLogLevel::Full,
                    &format!(
                        "Initialized {api} engine on platform {} device {} with {} queues",
                        selection.platform, selection.device, selection.queue_count
                    ),
                );
                Ok(Self::with_engine(engine, logger))
            }
            Err(error) => {
                logger.log_error(&error);
                Err(error)
            }
        }
    }

    /// Create a tuner driving an existing engine.
    pub fn with_engine(engine: Box<dyn ComputeEngine>, logger: TuneLogger) -> Self {
        Self {
            manager: KernelManager::new(),
            store: ArgumentStore::new(),
            runner: KernelRunner::new(engine, logger),
            results: HashMap::new(),
        }
    }

    fn logged<T>(&mut self, result: Result<T, TuneError>) -> Result<T, TuneError> {
        if let Err(error) = &result {
            self.runner.logger_mut().log_error(error);
        }
        result
    }

    /// Register a kernel from its source.
    pub fn add_kernel(
        &mut self,
        source: impl Into<String>,
        name: impl Into<String>,
        global_size: DimensionVector,
        local_size: DimensionVector,
    ) -> KernelId {
        self.manager.add_kernel(source, name, global_size, local_size)
    }

    /// Register a kernel from a source file.
    pub fn add_kernel_from_file(
        &mut self,
        path: impl AsRef<Path>,
        name: impl Into<String>,
        global_size: DimensionVector,
        local_size: DimensionVector,
    ) -> Result<KernelId, TuneError> {
        let result = self
            .manager
            .add_kernel_from_file(path, name, global_size, local_size);
        self.logged(result)
    }

    /// Add an integral tuning parameter.
    pub fn add_parameter(
        &mut self,
        id: KernelId,
        name: &str,
        values: Vec<u64>,
    ) -> Result<(), TuneError> {
        let result = self.manager.add_parameter(id, name, values);
        self.logged(result)
    }

    /// Add a floating point tuning parameter.
    pub fn add_parameter_double(
        &mut self,
        id: KernelId,
        name: &str,
        values: Vec<f64>,
    ) -> Result<(), TuneError> {
        let result = self.manager.add_parameter_double(id, name, values);
        self.logged(result)
    }

    /// Add a constraint over parameters, the function receives their values in the given order.
    pub fn add_constraint<F>(
        &mut self,
        id: KernelId,
        names: &[&str],
        function: F,
    ) -> Result<(), TuneError>
    where
        F: Fn(&[u64]) -> bool + Send + Sync + 'static,
    {
        let result = self.manager.add_constraint(id, owned(names), Arc::new(function));
        self.logged(result)
    }

    /// Group parameters into a named pack.
    pub fn add_parameter_pack(
        &mut self,
        id: KernelId,
        name: &str,
        names: &[&str],
    ) -> Result<(), TuneError> {
        let result = self.manager.add_parameter_pack(id, name, owned(names));
        self.logged(result)
    }

    /// Modify a dimension of the global or local size with the values of parameters.
    pub fn set_thread_modifier<F>(
        &mut self,
        id: KernelId,
        modifier_type: ModifierType,
        dimension: ModifierDimension,
        names: &[&str],
        function: F,
    ) -> Result<(), TuneError>
    where
        F: Fn(usize, &[u64]) -> usize + Send + Sync + 'static,
    {
        let result = self.manager.set_thread_modifier(
            id,
            modifier_type,
            dimension,
            owned(names),
            Arc::new(function),
        );
        self.logged(result)
    }

    /// Modify a dimension of the global or local size with the value of one parameter.
    pub fn set_thread_modifier_action(
        &mut self,
        id: KernelId,
        modifier_type: ModifierType,
        dimension: ModifierDimension,
        name: &str,
        action: ModifierAction,
    ) -> Result<(), TuneError> {
        let result = self.manager.set_thread_modifier(
            id,
            modifier_type,
            dimension,
            vec![name.to_string()],
            action.function(),
        );
        self.logged(result)
    }

    /// Modify the element count of a local memory argument with the values of parameters.
    pub fn set_local_memory_modifier<F>(
        &mut self,
        id: KernelId,
        argument: ArgumentId,
        names: &[&str],
        function: F,
    ) -> Result<(), TuneError>
    where
        F: Fn(usize, &[u64]) -> usize + Send + Sync + 'static,
    {
        let result = self.manager.set_local_memory_modifier(
            id,
            argument,
            owned(names),
            Arc::new(function),
            &self.store,
        );
        self.logged(result)
    }

    /// Add a buffer argument.
    pub fn add_argument_vector<T: ArgumentElement>(
        &mut self,
        data: &[T],
        access_type: ArgumentAccessType,
    ) -> ArgumentId {
        self.store.add_vector(data, access_type)
    }

    /// Add a buffer argument in the given memory location.
    pub fn add_argument_vector_with_location<T: ArgumentElement>(
        &mut self,
        data: &[T],
        access_type: ArgumentAccessType,
        memory_location: ArgumentMemoryLocation,
    ) -> ArgumentId {
        self.store
            .add_vector_with_location(data, access_type, memory_location)
    }

    /// Add a buffer of a plain old data type.
    pub fn add_argument_custom<T: Pod>(
        &mut self,
        data: &[T],
        access_type: ArgumentAccessType,
    ) -> ArgumentId {
        self.store.add_custom(data, access_type)
    }

    /// Add a scalar argument.
    pub fn add_argument_scalar<T: ArgumentElement>(&mut self, value: T) -> ArgumentId {
        self.store.add_scalar(value)
    }

    /// Add a local memory argument of `count` elements.
    pub fn add_argument_local<T: ArgumentElement>(&mut self, count: usize) -> ArgumentId {
        self.store.add_local::<T>(count)
    }

    /// Replace the host data of an argument.
    ///
    /// The buffers of the argument still alive on the device are updated as well.
    pub fn update_argument<T: Pod>(
        &mut self,
        id: ArgumentId,
        data: &[T],
    ) -> Result<(), TuneError> {
        let result = self.update_argument_inner(id, bytemuck::cast_slice::<T, u8>(data).to_vec());
        self.logged(result)
    }

    fn update_argument_inner(&mut self, id: ArgumentId, data: Vec<u8>) -> Result<(), TuneError> {
        self.store.update(id, data)?;
        let argument = self.store.get(id)?;
        self.runner.engine_mut().upload_argument(argument)
    }

    /// Bind arguments to a kernel, in kernel parameter order.
    pub fn set_arguments(
        &mut self,
        id: KernelId,
        arguments: &[ArgumentId],
    ) -> Result<(), TuneError> {
        let result = self
            .manager
            .set_arguments(id, arguments.to_vec(), &self.store);
        self.logged(result)
    }

    /// Keep the device buffer of a vector argument alive across runs, or release it.
    pub fn persist_argument(&mut self, id: ArgumentId, flag: bool) -> Result<(), TuneError> {
        let result = self.persist_argument_inner(id, flag);
        self.logged(result)
    }

    fn persist_argument_inner(&mut self, id: ArgumentId, flag: bool) -> Result<(), TuneError> {
        let argument = self.store.get(id)?;
        self.runner.engine_mut().persist_argument(argument, flag)?;
        self.store.set_persistent(id, flag)
    }

    /// Whether runs use persistent buffers.
    pub fn set_persistent_buffer_usage(&mut self, flag: bool) {
        self.runner.engine_mut().set_persistent_buffer_usage(flag);
    }

    /// Copy the device contents of an argument into caller memory.
    pub fn download_argument<T: Pod>(
        &mut self,
        id: ArgumentId,
        destination: &mut [T],
    ) -> Result<(), TuneError> {
        let result = self
            .runner
            .engine_mut()
            .download_argument(id, bytemuck::cast_slice_mut(destination));
        self.logged(result)
    }

    /// A copy of an argument holding its device contents.
    pub fn download_argument_object(
        &mut self,
        id: ArgumentId,
    ) -> Result<KernelArgument, TuneError> {
        let result = match self.store.get(id) {
            Ok(argument) => self.runner.engine_mut().download_argument_object(argument),
            Err(error) => Err(error),
        };
        self.logged(result)
    }

    /// Run a configuration of a kernel, downloading the outputs into caller memory.
    ///
    /// Resolution errors are returned, failures of the run itself give a failed result.
    pub fn run_kernel(
        &mut self,
        id: KernelId,
        selection: &[ParameterPair],
        outputs: &mut [OutputDescriptor<'_>],
    ) -> Result<KernelResult, TuneError> {
        let result = self
            .runner
            .run_kernel(&self.manager, &self.store, id, selection, outputs);

        if let Err(error) = self.runner.engine_mut().clear_buffers(None) {
            self.runner.logger_mut().log_error(&error);
        }

        let result = self.logged(result)?;
        self.results.entry(id).or_default().push(result.clone());
        Ok(result)
    }

    /// Tune a kernel, running the configurations proposed by the searcher until the space is
    /// exhausted or the stop condition is fulfilled.
    pub fn tune_kernel(
        &mut self,
        id: KernelId,
        searcher: &mut dyn Searcher,
        mut stop_condition: Option<&mut dyn StopCondition>,
    ) -> Result<Vec<KernelResult>, TuneError> {
        let configurations = self.configurations(id)?;
        let count = configurations.len();
        searcher.initialize(configurations);
        if let Some(condition) = stop_condition.as_deref_mut() {
            condition.initialize(count);
        }

        let empty = CompositionProfilingData::new();
        let mut results = Vec::new();

        while searcher.unexplored_configuration_count() > 0 {
            if let Some(condition) = stop_condition.as_deref_mut() {
                if condition.is_fulfilled() {
                    let status = condition.status();
                    self.runner.logger_mut().log_tuning(
                        TuningLogLevel::Minimal,
                        &format!("Tuning stopped: {status}"),
                    );
                    break;
                }
            }

            let Some(selection) = searcher.next_configuration() else {
                break;
            };
            let result = match self.run_kernel(id, &selection, &mut []) {
                Ok(result) => result,
                Err(error) => {
                    self.runner.engine_mut().profile_summary();
                    return Err(error);
                }
            };

            if let Some(condition) = stop_condition.as_deref_mut() {
                condition.update(&result);
            }
            searcher.calculate_next_configuration(
                result.is_valid(),
                result.configuration(),
                result.duration(),
                result.profiling_data(),
                result.composition_profiling_data().unwrap_or(&empty),
            );
            results.push(result);
        }

        self.runner.engine_mut().profile_summary();
        Ok(results)
    }

    /// Every valid selection of a kernel.
    pub fn configurations(&mut self, id: KernelId) -> Result<Vec<Vec<ParameterPair>>, TuneError> {
        let result = self.manager.generator(id).map(|generator| generator.enumerate());
        self.logged(result)
    }

    /// Number of valid selections of a kernel.
    pub fn configuration_count(&mut self, id: KernelId) -> Result<usize, TuneError> {
        let result = self
            .manager
            .generator(id)
            .map(|generator| generator.configuration_count());
        self.logged(result)
    }

    /// The fastest successful run recorded for a kernel.
    pub fn best_configuration(&mut self, id: KernelId) -> Result<KernelResult, TuneError> {
        let best = self
            .results
            .get(&id)
            .and_then(|results| {
                results
                    .iter()
                    .filter_map(|result| result.duration().map(|duration| (duration, result)))
                    .min_by_key(|(duration, _)| *duration)
                    .map(|(_, result)| result.clone())
            })
            .ok_or_else(|| {
                TuneError::not_found(format!(
                    "No successful configuration recorded for kernel {id}"
                ))
            });
        self.logged(best)
    }

    /// Every run recorded for a kernel.
    pub fn results(&self, id: KernelId) -> &[KernelResult] {
        self.results.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every run recorded for a kernel, in their public shape.
    pub fn computation_results(&self, id: KernelId) -> Vec<ComputationResult> {
        let time_unit = self.runner.time_unit();
        self.results(id)
            .iter()
            .map(|result| ComputationResult::from_result(result, time_unit))
            .collect()
    }

    /// Whether runs collect profiling counters.
    pub fn set_profiling(&mut self, flag: bool) {
        self.runner.set_profiling(flag);
    }

    /// Hardware counters collected by profiled runs.
    pub fn set_profiling_counters(&mut self, names: &[&str]) -> Result<(), TuneError> {
        let result = self
            .runner
            .engine_mut()
            .set_kernel_profiling_counters(&owned(names));
        self.logged(result)
    }

    /// Unit of reported durations.
    pub fn set_time_unit(&mut self, time_unit: TimeUnit) {
        self.runner.set_time_unit(time_unit);
    }

    /// Number of compiled kernels kept by the engine, zero disables the cache.
    pub fn set_kernel_cache_capacity(&mut self, capacity: usize) {
        self.runner.engine_mut().set_kernel_cache_capacity(capacity);
    }

    /// Whether compiled kernels are cached.
    pub fn set_kernel_cache_usage(&mut self, flag: bool) {
        self.runner.engine_mut().set_kernel_cache_usage(flag);
    }

    /// Options passed to the native compiler.
    pub fn set_compiler_options(&mut self, options: &str) {
        self.runner.engine_mut().set_compiler_options(options);
    }

    /// How global sizes are interpreted by the native API.
    pub fn set_global_size_type(&mut self, global_size_type: GlobalSizeType) {
        self.runner.engine_mut().set_global_size_type(global_size_type);
    }

    /// Round global sizes up to a multiple of local sizes instead of rejecting them.
    pub fn set_automatic_global_size_correction(&mut self, flag: bool) {
        self.runner
            .engine_mut()
            .set_automatic_global_size_correction(flag);
    }

    /// The available platforms.
    pub fn platform_info(&mut self) -> Result<Vec<PlatformInfo>, TuneError> {
        let result = self.runner.engine().get_platform_info();
        self.logged(result)
    }

    /// The devices of a platform.
    pub fn device_info(&mut self, platform: usize) -> Result<Vec<DeviceInfo>, TuneError> {
        let result = self.runner.engine().get_device_info(platform);
        self.logged(result)
    }

    /// The device used by the tuner.
    pub fn current_device_info(&mut self) -> Result<DeviceInfo, TuneError> {
        let result = self.runner.engine().get_current_device_info();
        self.logged(result)
    }

    /// Print every platform and device to the standard output.
    pub fn print_compute_api_info(&mut self) -> Result<(), TuneError> {
        let result = self.runner.engine().print_compute_api_info();
        self.logged(result)
    }

    /// The kernels of the tuner.
    pub fn kernels(&self) -> &KernelManager {
        &self.manager
    }

    /// The arguments of the tuner.
    pub fn arguments(&self) -> &ArgumentStore {
        &self.store
    }

    /// The engine.
    pub fn engine(&self) -> &dyn ComputeEngine {
        self.runner.engine()
    }

    /// The engine, mutably.
    pub fn engine_mut(&mut self) -> &mut dyn ComputeEngine {
        self.runner.engine_mut()
    }
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}
