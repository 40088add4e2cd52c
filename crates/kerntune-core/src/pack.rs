use serde::{Deserialize, Serialize};

/// A named group of parameters, tuned together when searching in stages.
///
/// The pack only records the grouping, the staging policy belongs to the searcher.
#[derive(new, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelParameterPack {
    name: String,
    names: Vec<String>,
}

impl KernelParameterPack {
    /// The name of the pack.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parameters grouped by the pack.
    pub fn parameter_names(&self) -> &[String] {
        &self.names
    }

    /// If the pack groups the given parameter.
    pub fn contains(&self, parameter: &str) -> bool {
        self.names.iter().any(|name| name == parameter)
    }
}
