use kerntune_common::{KernelId, QueueId, TimeUnit, TuneError};
use kerntune_core::{
    ArgumentAccessType, ArgumentStore, KernelArgument, KernelManager, ParameterPair,
};

use crate::{
    config::tuning::TuningLogLevel,
    engine::{ComputeEngine, KernelRuntimeData, OutputDescriptor},
    logging::TuneLogger,
    result::KernelResult,
};

/// Runs configurations of kernels on a [compute engine](ComputeEngine).
///
/// A run resolves the configuration of the selection, builds the source with its defines,
/// resolves the bound arguments and dispatches the launch to the engine. Resolution errors are
/// returned to the caller. An error raised by the engine during dispatch synchronizes the device,
/// clears its pending events and becomes a failed [kernel result](KernelResult).
#[derive(Debug)]
pub struct KernelRunner {
    engine: Box<dyn ComputeEngine>,
    logger: TuneLogger,
    profiling: bool,
    time_unit: TimeUnit,
}

impl KernelRunner {
    /// Create a runner driving the engine.
    pub fn new(engine: Box<dyn ComputeEngine>, logger: TuneLogger) -> Self {
        Self {
            engine,
            logger,
            profiling: false,
            time_unit: TimeUnit::default(),
        }
    }

    /// Run a configuration of a kernel, downloading the outputs into caller memory.
    pub fn run_kernel(
        &mut self,
        manager: &KernelManager,
        store: &ArgumentStore,
        id: KernelId,
        selection: &[ParameterPair],
        outputs: &mut [OutputDescriptor<'_>],
    ) -> Result<KernelResult, TuneError> {
        let kernel = manager.kernel(id)?;
        let pairs = manager.generator(id)?.validate(selection)?;
        let configuration = manager.configuration(id, &pairs, store)?;
        let source = manager.source_with_defines(id, &pairs)?;
        let arguments = store.arguments(kernel.arguments())?;
        let data = KernelRuntimeData::new(
            id,
            kernel.name().to_string(),
            source,
            configuration,
            kernel.arguments().to_vec(),
        );

        self.logger.log_tuning(
            TuningLogLevel::Full,
            &format!(
                "Running kernel {} with configuration: {}",
                data.name, data.configuration
            ),
        );

        let dispatched = if self.profiling {
            self.dispatch_with_profiling(&data, &arguments, outputs)
        } else {
            self.engine.run_kernel(&data, &arguments, outputs)
        };

        match dispatched {
            Ok(result) => {
                if let Some(duration) = result.duration() {
                    self.logger.log_tuning(
                        TuningLogLevel::Full,
                        &format!(
                            "Kernel {} finished in {:.3} {}",
                            data.name,
                            self.time_unit.convert(duration),
                            self.time_unit.symbol()
                        ),
                    );
                }
                Ok(result)
            }
            Err(error) => Ok(self.failure(data, error)),
        }
    }

    fn dispatch_with_profiling(
        &mut self,
        data: &KernelRuntimeData,
        arguments: &[&KernelArgument],
        outputs: &mut [OutputDescriptor<'_>],
    ) -> Result<KernelResult, TuneError> {
        let queue = QueueId::new(0);
        self.engine.initialize_kernel_profiling(data)?;
        let mut first_pass = true;

        loop {
            if !first_pass {
                self.engine.clear_buffers(Some(ArgumentAccessType::WriteOnly))?;
                self.engine.clear_buffers(Some(ArgumentAccessType::ReadWrite))?;
            }
            first_pass = false;

            let event = self.engine.run_kernel_with_profiling(data, arguments, queue)?;
            let remaining = self
                .engine
                .get_remaining_kernel_profiling_runs(&data.name, &data.source)?;

            if remaining == 0 {
                return self.engine.get_kernel_result_with_profiling(event, outputs);
            }

            self.logger.log_tuning(
                TuningLogLevel::Full,
                &format!("Kernel {} needs {remaining} more profiling runs", data.name),
            );
            self.engine.get_kernel_result_with_profiling(event, &mut [])?;
        }
    }

    fn failure(&mut self, data: KernelRuntimeData, error: TuneError) -> KernelResult {
        let message = format!("Kernel run failed, reason: {error}");
        log::warn!("{message}");
        self.logger.log_tuning(TuningLogLevel::Minimal, &message);

        if let Err(sync_error) = self.engine.synchronize_device() {
            log::warn!("Failed to synchronize the device after a failed run: {sync_error}");
        }
        self.engine.clear_events();

        KernelResult::failure(data.name, data.configuration, error.to_string())
    }

    /// Whether runs collect profiling counters.
    pub fn set_profiling(&mut self, flag: bool) {
        self.profiling = flag;
    }

    /// If runs collect profiling counters.
    pub fn is_profiling(&self) -> bool {
        self.profiling
    }

    /// Unit of the durations reported by the runner.
    pub fn set_time_unit(&mut self, time_unit: TimeUnit) {
        self.time_unit = time_unit;
    }

    /// Unit of the durations reported by the runner.
    pub fn time_unit(&self) -> TimeUnit {
        self.time_unit
    }

    pub(crate) fn logger_mut(&mut self) -> &mut TuneLogger {
        &mut self.logger
    }

    /// The engine.
    pub fn engine(&self) -> &dyn ComputeEngine {
        self.engine.as_ref()
    }

    /// The engine, mutably.
    pub fn engine_mut(&mut self) -> &mut dyn ComputeEngine {
        self.engine.as_mut()
    }
}
