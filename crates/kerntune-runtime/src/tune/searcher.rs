use core::{fmt::Debug, time::Duration};

use kerntune_core::{
    CompositionProfilingData, KernelConfiguration, KernelProfilingData, ParameterPair,
};

/// Decides which configuration of a kernel is tried next during tuning.
///
/// Strategies live outside of kerntune, the tuner only drives them: it asks for the
/// [next configuration](Searcher::next_configuration), runs it and feeds the outcome back through
/// [calculate_next_configuration](Searcher::calculate_next_configuration).
pub trait Searcher: Debug {
    /// Receive the valid selections of the kernel before tuning starts.
    fn initialize(&mut self, _configurations: Vec<Vec<ParameterPair>>) {}

    /// Update the search state with the outcome of the previous configuration.
    ///
    /// The duration and the profiling data are only present for successful runs.
    fn calculate_next_configuration(
        &mut self,
        success: bool,
        previous: &KernelConfiguration,
        duration: Option<Duration>,
        profiling: Option<&KernelProfilingData>,
        composition_profiling: &CompositionProfilingData,
    );

    /// The next selection to try, none when the space is exhausted.
    fn next_configuration(&self) -> Option<Vec<ParameterPair>>;

    /// Number of selections not tried yet.
    fn unexplored_configuration_count(&self) -> usize;
}
