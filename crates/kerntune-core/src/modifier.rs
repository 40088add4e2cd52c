use std::sync::Arc;
use kerntune_common::{ArgumentId, DimensionVector, ModifierDimension};
use serde::{Deserialize, Serialize};

use crate::parameter::{values_for, ParameterPair};

/// Function computing a new extent from the running one and the values selected for the
/// parameters of the modifier.
pub type ModifierFunction = Arc<dyn Fn(usize, &[u64]) -> usize + Send + Sync>;

/// The launch extent a [ThreadModifier] applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifierType {
    /// The global size.
    Global,
    /// The local size.
    Local,
}

/// Common modifier functions over a single parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModifierAction {
    /// Add the parameter value.
    Add,
    /// Subtract the parameter value, saturating at zero.
    Subtract,
    /// Multiply by the parameter value.
    Multiply,
    /// Divide by the parameter value. A zero value leaves the extent unchanged.
    Divide,
}

impl ModifierAction {
    /// The modifier function performing the action with the first selected value.
    ///
    /// Without a selected value the extent is left unchanged. Results saturate at the bounds of
    /// `usize`.
    pub fn function(self) -> ModifierFunction {
        Arc::new(move |size: usize, values: &[u64]| match values.first() {
            Some(value) => self.apply(size, usize::try_from(*value).unwrap_or(usize::MAX)),
            None => size,
        })
    }

    fn apply(self, size: usize, value: usize) -> usize {
        match self {
            ModifierAction::Add => size.saturating_add(value),
            ModifierAction::Subtract => size.saturating_sub(value),
            ModifierAction::Multiply => size.saturating_mul(value),
            ModifierAction::Divide => match value {
                0 => size,
                divisor => size / divisor,
            },
        }
    }
}

/// Adjusts one dimension of a launch extent based on selected parameter values.
#[derive(Clone)]
pub struct ThreadModifier {
    modifier_type: ModifierType,
    dimension: ModifierDimension,
    names: Vec<String>,
    function: ModifierFunction,
}

impl ThreadModifier {
    /// Create a new thread modifier.
    pub fn new(
        modifier_type: ModifierType,
        dimension: ModifierDimension,
        names: Vec<String>,
        function: ModifierFunction,
    ) -> Self {
        Self {
            modifier_type,
            dimension,
            names,
            function,
        }
    }

    /// The extent the modifier applies to.
    pub fn modifier_type(&self) -> ModifierType {
        self.modifier_type
    }

    /// The dimension the modifier applies to.
    pub fn dimension(&self) -> ModifierDimension {
        self.dimension
    }

    /// The parameter names whose values are given to the function.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Apply the modifier to the running extent.
    ///
    /// The extent is returned unchanged when the selection doesn't bind every name.
    pub fn apply(&self, extent: &mut DimensionVector, pairs: &[ParameterPair]) {
        if let Some(values) = values_for(pairs, &self.names) {
            let size = (self.function)(extent.get(self.dimension), &values);
            extent.set(self.dimension, size);
        }
    }
}

impl core::fmt::Debug for ThreadModifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ThreadModifier")
            .field("modifier_type", &self.modifier_type)
            .field("dimension", &self.dimension)
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

/// Adjusts the element count of a local memory argument based on selected parameter values.
#[derive(Clone)]
pub struct LocalMemoryModifier {
    argument: ArgumentId,
    names: Vec<String>,
    function: ModifierFunction,
}

impl LocalMemoryModifier {
    /// Create a new local memory modifier.
    pub fn new(argument: ArgumentId, names: Vec<String>, function: ModifierFunction) -> Self {
        Self {
            argument,
            names,
            function,
        }
    }

    /// The local memory argument the modifier resizes.
    pub fn argument(&self) -> ArgumentId {
        self.argument
    }

    /// The parameter names whose values are given to the function.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Apply the modifier to the running element count.
    pub fn apply(&self, count: usize, pairs: &[ParameterPair]) -> usize {
        match values_for(pairs, &self.names) {
            Some(values) => (self.function)(count, &values),
            None => count,
        }
    }
}

impl core::fmt::Debug for LocalMemoryModifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LocalMemoryModifier")
            .field("argument", &self.argument)
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ModifierAction::Add, 64, 4, 68)]
    #[case(ModifierAction::Subtract, 64, 4, 60)]
    #[case(ModifierAction::Subtract, 2, 4, 0)]
    #[case(ModifierAction::Multiply, 64, 4, 256)]
    #[case(ModifierAction::Divide, 64, 4, 16)]
    #[case(ModifierAction::Divide, 64, 0, 64)]
    #[case(ModifierAction::Add, usize::MAX - 1, 4, usize::MAX)]
    #[case(ModifierAction::Multiply, usize::MAX / 2, 4, usize::MAX)]
    fn actions(
        #[case] action: ModifierAction,
        #[case] size: usize,
        #[case] value: u64,
        #[case] expected: usize,
    ) {
        assert_eq!(action.function()(size, &[value]), expected);
    }

    #[rstest]
    #[case(ModifierAction::Add)]
    #[case(ModifierAction::Subtract)]
    #[case(ModifierAction::Multiply)]
    #[case(ModifierAction::Divide)]
    fn actions_without_value_keep_the_extent(#[case] action: ModifierAction) {
        assert_eq!(action.function()(48, &[]), 48);
    }

    #[test]
    fn thread_modifier_skips_partial_selection() {
        let modifier = ThreadModifier::new(
            ModifierType::Global,
            ModifierDimension::Y,
            vec!["ROWS".into()],
            ModifierAction::Divide.function(),
        );
        let mut extent = DimensionVector::new_2d(32, 32);

        modifier.apply(&mut extent, &[]);
        assert_eq!(extent, DimensionVector::new_2d(32, 32));

        modifier.apply(&mut extent, &[ParameterPair::new("ROWS".into(), 8u64.into())]);
        assert_eq!(extent, DimensionVector::new_2d(32, 4));
    }
}
