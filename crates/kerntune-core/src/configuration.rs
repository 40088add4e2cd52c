use kerntune_common::{ArgumentId, DimensionVector};
use serde::{Deserialize, Serialize};

use crate::parameter::ParameterPair;

/// A launch configuration derived from a parameter selection.
#[derive(new, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KernelConfiguration {
    global_size: DimensionVector,
    local_size: DimensionVector,
    parameter_pairs: Vec<ParameterPair>,
    local_memory_sizes: Vec<(ArgumentId, usize)>,
}

impl KernelConfiguration {
    /// The global size, before any automatic correction by the engine.
    pub fn global_size(&self) -> DimensionVector {
        self.global_size
    }

    /// The local size.
    pub fn local_size(&self) -> DimensionVector {
        self.local_size
    }

    /// The selected values, in parameter declaration order.
    pub fn parameter_pairs(&self) -> &[ParameterPair] {
        &self.parameter_pairs
    }

    /// The resolved element counts of local memory arguments with modifiers.
    pub fn local_memory_sizes(&self) -> &[(ArgumentId, usize)] {
        &self.local_memory_sizes
    }

    /// The resolved element count of a local memory argument, if it has modifiers.
    pub fn local_memory_size(&self, argument: ArgumentId) -> Option<usize> {
        self.local_memory_sizes
            .iter()
            .find(|(id, _)| *id == argument)
            .map(|(_, size)| *size)
    }
}

impl core::fmt::Display for KernelConfiguration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "global {}, local {}", self.global_size, self.local_size)?;
        for pair in self.parameter_pairs.iter() {
            write!(f, ", {pair}")?;
        }
        Ok(())
    }
}

/// Prepend one `#define NAME VALUE` line per pair to the source, in the order of the pairs.
pub fn source_with_defines(source: &str, pairs: &[ParameterPair]) -> String {
    let mut result = String::with_capacity(source.len() + pairs.len() * 24);
    for pair in pairs {
        result.push_str(&pair.define());
        result.push('\n');
    }
    result.push_str(source);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::ParameterValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn defines_are_prepended_in_order() {
        let pairs = vec![
            ParameterPair::new("TILE".into(), ParameterValue::Integer(4)),
            ParameterPair::new("ALPHA".into(), ParameterValue::Double(0.25)),
        ];

        assert_eq!(
            source_with_defines("kernel body", &pairs),
            "#define TILE 4\n#define ALPHA 0.25\nkernel body"
        );
    }

    #[test]
    fn display_lists_extents_and_pairs() {
        let configuration = KernelConfiguration::new(
            DimensionVector::new_1d(256),
            DimensionVector::new_1d(64),
            vec![ParameterPair::new("TILE".into(), 4u64.into())],
            vec![],
        );

        assert_eq!(
            configuration.to_string(),
            "global (256, 1, 1), local (64, 1, 1), TILE: 4"
        );
    }
}
