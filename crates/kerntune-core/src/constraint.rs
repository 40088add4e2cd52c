use std::sync::Arc;

use crate::parameter::{values_for, ParameterPair};

/// Predicate over the values selected for the parameters of a constraint, order matched to the
/// names of the constraint.
pub type ConstraintFunction = Arc<dyn Fn(&[u64]) -> bool + Send + Sync>;

/// A predicate over a named subset of the parameters of a kernel.
#[derive(Clone)]
pub struct KernelConstraint {
    names: Vec<String>,
    function: ConstraintFunction,
}

impl KernelConstraint {
    /// Create a new constraint.
    pub fn new(names: Vec<String>, function: ConstraintFunction) -> Self {
        Self { names, function }
    }

    /// The parameter names the predicate reads, in the order the values are given to it.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Evaluate the predicate on values already ordered like [names](Self::names).
    pub fn is_fulfilled(&self, values: &[u64]) -> bool {
        (self.function)(values)
    }

    /// Evaluate the predicate on a selection.
    ///
    /// Returns `None` when the selection doesn't bind every name of the constraint yet.
    pub fn check(&self, pairs: &[ParameterPair]) -> Option<bool> {
        values_for(pairs, &self.names).map(|values| self.is_fulfilled(&values))
    }
}

impl core::fmt::Debug for KernelConstraint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KernelConstraint")
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}
