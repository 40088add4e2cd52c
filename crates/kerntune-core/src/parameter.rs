use serde::{Deserialize, Serialize};

/// The allowed values of a tuning parameter.
///
/// A parameter is either integral or floating point, never both.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ParameterValues {
    /// Integral values.
    Integer(Vec<u64>),
    /// Floating point values.
    Double(Vec<f64>),
}

impl ParameterValues {
    /// The number of allowed values.
    pub fn len(&self) -> usize {
        match self {
            ParameterValues::Integer(values) => values.len(),
            ParameterValues::Double(values) => values.len(),
        }
    }

    /// If no value is allowed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The value at the given position.
    pub fn get(&self, index: usize) -> Option<ParameterValue> {
        match self {
            ParameterValues::Integer(values) => values.get(index).copied().map(ParameterValue::Integer),
            ParameterValues::Double(values) => values.get(index).copied().map(ParameterValue::Double),
        }
    }

    /// Iterate over the allowed values in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = ParameterValue> + '_ {
        (0..self.len()).filter_map(|index| self.get(index))
    }

    /// If the given value is one of the allowed values.
    pub fn contains(&self, value: &ParameterValue) -> bool {
        self.iter().any(|allowed| allowed == *value)
    }
}

/// A single value selected for a parameter.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum ParameterValue {
    /// An integral value.
    Integer(u64),
    /// A floating point value.
    Double(f64),
}

impl ParameterValue {
    /// The integral view of the value, used by constraint and modifier functions.
    ///
    /// Floating point values are truncated toward zero.
    pub fn as_u64(&self) -> u64 {
        match self {
            ParameterValue::Integer(value) => *value,
            ParameterValue::Double(value) => *value as u64,
        }
    }

    /// The floating point view of the value.
    pub fn as_f64(&self) -> f64 {
        match self {
            ParameterValue::Integer(value) => *value as f64,
            ParameterValue::Double(value) => *value,
        }
    }

    /// If the value comes from a floating point parameter.
    pub fn is_double(&self) -> bool {
        matches!(self, ParameterValue::Double(_))
    }
}

impl PartialEq for ParameterValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ParameterValue::Integer(lhs), ParameterValue::Integer(rhs)) => lhs == rhs,
            // Bitwise so that the comparison stays reflexive for every value, NaN included.
            (ParameterValue::Double(lhs), ParameterValue::Double(rhs)) => {
                lhs.to_bits() == rhs.to_bits()
            }
            _ => false,
        }
    }
}

impl From<u64> for ParameterValue {
    fn from(value: u64) -> Self {
        ParameterValue::Integer(value)
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Double(value)
    }
}

impl core::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ParameterValue::Integer(value) => write!(f, "{value}"),
            ParameterValue::Double(value) => write!(f, "{value}"),
        }
    }
}

/// A tuning parameter of a kernel.
#[derive(new, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KernelParameter {
    name: String,
    values: ParameterValues,
}

impl KernelParameter {
    /// The name of the parameter, unique within its kernel.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The allowed values of the parameter.
    pub fn values(&self) -> &ParameterValues {
        &self.values
    }

    /// If the parameter is floating point.
    pub fn has_values_double(&self) -> bool {
        matches!(self.values, ParameterValues::Double(_))
    }
}

/// The value selected for one parameter.
#[derive(new, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterPair {
    name: String,
    value: ParameterValue,
}

impl ParameterPair {
    /// The name of the parameter.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The selected value.
    pub fn value(&self) -> ParameterValue {
        self.value
    }

    /// Format the pair as a preprocessor definition.
    pub fn define(&self) -> String {
        format!("#define {} {}", self.name, self.value)
    }
}

impl core::fmt::Display for ParameterPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

/// Find the value selected for the given parameter name.
pub fn find_value(pairs: &[ParameterPair], name: &str) -> Option<ParameterValue> {
    pairs
        .iter()
        .find(|pair| pair.name() == name)
        .map(|pair| pair.value())
}

/// Collect the integral values selected for the given names, in the order of the names.
///
/// Returns `None` when any name is missing from the selection.
pub fn values_for(pairs: &[ParameterPair], names: &[String]) -> Option<Vec<u64>> {
    names
        .iter()
        .map(|name| find_value(pairs, name).map(|value| value.as_u64()))
        .collect()
}
