use kerntune_common::TuneError;

use crate::{
    kernel::Kernel,
    parameter::{ParameterPair, ParameterValue},
};

/// Enumerates and validates parameter selections of a kernel.
///
/// Enumeration assigns parameters in declaration order and backtracks as soon as a constraint
/// whose parameters are all assigned fails, the output is ordered lexicographically over the
/// declaration order of the parameters and the order of their values.
#[derive(new, Clone, Copy, Debug)]
pub struct ConfigurationGenerator<'a> {
    kernel: &'a Kernel,
}

/// A constraint rewritten over parameter positions.
struct BoundConstraint {
    constraint: usize,
    indices: Vec<usize>,
    /// The number of assigned parameters needed to evaluate the constraint.
    level: usize,
}

impl<'a> ConfigurationGenerator<'a> {
    /// Every valid selection of the kernel.
    pub fn enumerate(&self) -> Vec<Vec<ParameterPair>> {
        let domains = self.full_domains();
        let mut selections = Vec::new();
        self.search(&domains, &mut |values| selections.push(self.pairs(values)));
        selections
    }

    /// The number of valid selections of the kernel.
    pub fn configuration_count(&self) -> usize {
        let domains = self.full_domains();
        let mut count = 0;
        self.search(&domains, &mut |_| count += 1);
        count
    }

    /// Every valid selection varying only the parameters of a pack.
    ///
    /// The other parameters are pinned to their value in `fixed`, or to their first value when
    /// `fixed` doesn't select them.
    pub fn enumerate_pack(
        &self,
        pack: &str,
        fixed: &[ParameterPair],
    ) -> Result<Vec<Vec<ParameterPair>>, TuneError> {
        let pack = self.kernel.parameter_pack(pack).ok_or_else(|| {
            TuneError::invalid_argument(format!("Unknown parameter pack: {pack}"))
        })?;
        for pair in fixed {
            let index = self.index_of(pair.name())?;
            self.check_allowed(index, pair)?;
        }

        let domains = self
            .kernel
            .parameters()
            .iter()
            .map(|parameter| -> Vec<ParameterValue> {
                if pack.contains(parameter.name()) {
                    return parameter.values().iter().collect();
                }
                let pinned = fixed
                    .iter()
                    .find(|pair| pair.name() == parameter.name())
                    .map(|pair| pair.value())
                    .or_else(|| parameter.values().get(0));
                pinned.into_iter().collect()
            })
            .collect::<Vec<_>>();

        let mut selections = Vec::new();
        self.search(&domains, &mut |values| selections.push(self.pairs(values)));
        Ok(selections)
    }

    /// Normalize an arbitrary selection.
    ///
    /// The selection must name every parameter exactly once with one of its allowed values and
    /// fulfill every constraint. The returned pairs follow the declaration order.
    pub fn validate(&self, selection: &[ParameterPair]) -> Result<Vec<ParameterPair>, TuneError> {
        let parameters = self.kernel.parameters();
        let mut values: Vec<Option<ParameterValue>> = vec![None; parameters.len()];

        for pair in selection {
            let index = self.index_of(pair.name())?;
            if values[index].is_some() {
                return Err(TuneError::invalid_argument(format!(
                    "Parameter {} is selected more than once",
                    pair.name()
                )));
            }
            self.check_allowed(index, pair)?;
            values[index] = Some(pair.value());
        }

        let values = values
            .into_iter()
            .zip(parameters)
            .map(|(value, parameter)| {
                value.ok_or_else(|| {
                    TuneError::invalid_argument(format!(
                        "Missing value for parameter {}",
                        parameter.name()
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let integers = values.iter().map(ParameterValue::as_u64).collect::<Vec<_>>();
        for bound in self.bound_constraints() {
            if !self.is_fulfilled(&bound, &integers) {
                let constraint = &self.kernel.constraints()[bound.constraint];
                return Err(TuneError::invalid_configuration(format!(
                    "Constraint over {:?} isn't fulfilled by {}",
                    constraint.names(),
                    display_selection(&self.pairs(&values))
                )));
            }
        }

        Ok(self.pairs(&values))
    }

    fn full_domains(&self) -> Vec<Vec<ParameterValue>> {
        self.kernel
            .parameters()
            .iter()
            .map(|parameter| parameter.values().iter().collect())
            .collect()
    }

    fn bound_constraints(&self) -> Vec<BoundConstraint> {
        self.kernel
            .constraints()
            .iter()
            .enumerate()
            .map(|(constraint, kernel_constraint)| {
                // Names were checked when the constraint was added.
                let indices = kernel_constraint
                    .names()
                    .iter()
                    .filter_map(|name| self.kernel.parameter_index(name))
                    .collect::<Vec<_>>();
                let level = indices.iter().map(|index| index + 1).max().unwrap_or(0);
                BoundConstraint {
                    constraint,
                    indices,
                    level,
                }
            })
            .collect()
    }

    fn is_fulfilled(&self, bound: &BoundConstraint, assigned: &[u64]) -> bool {
        let values = bound
            .indices
            .iter()
            .map(|index| assigned[*index])
            .collect::<Vec<_>>();
        self.kernel.constraints()[bound.constraint].is_fulfilled(&values)
    }

    fn search<F: FnMut(&[ParameterValue])>(&self, domains: &[Vec<ParameterValue>], visit: &mut F) {
        let constraints = self.bound_constraints();
        let mut by_level: Vec<Vec<&BoundConstraint>> = vec![Vec::new(); domains.len() + 1];
        for bound in constraints.iter() {
            by_level[bound.level].push(bound);
        }

        if by_level[0].iter().any(|bound| !self.is_fulfilled(bound, &[])) {
            return;
        }

        let mut values = Vec::with_capacity(domains.len());
        let mut integers = Vec::with_capacity(domains.len());
        self.backtrack(domains, &by_level, &mut values, &mut integers, visit);
    }

    fn backtrack<F: FnMut(&[ParameterValue])>(
        &self,
        domains: &[Vec<ParameterValue>],
        by_level: &[Vec<&BoundConstraint>],
        values: &mut Vec<ParameterValue>,
        integers: &mut Vec<u64>,
        visit: &mut F,
    ) {
        let depth = values.len();
        if depth == domains.len() {
            visit(values);
            return;
        }

        for value in domains[depth].iter() {
            values.push(*value);
            integers.push(value.as_u64());

            if by_level[depth + 1]
                .iter()
                .all(|bound| self.is_fulfilled(bound, integers))
            {
                self.backtrack(domains, by_level, values, integers, visit);
            }

            values.pop();
            integers.pop();
        }
    }

    fn pairs(&self, values: &[ParameterValue]) -> Vec<ParameterPair> {
        self.kernel
            .parameters()
            .iter()
            .zip(values)
            .map(|(parameter, value)| ParameterPair::new(parameter.name().to_string(), *value))
            .collect()
    }

    fn index_of(&self, name: &str) -> Result<usize, TuneError> {
        self.kernel
            .parameter_index(name)
            .ok_or_else(|| TuneError::invalid_argument(format!("Unknown parameter: {name}")))
    }

    fn check_allowed(&self, index: usize, pair: &ParameterPair) -> Result<(), TuneError> {
        let parameter = &self.kernel.parameters()[index];
        match parameter.values().contains(&pair.value()) {
            true => Ok(()),
            false => Err(TuneError::invalid_argument(format!(
                "Value {} isn't allowed for parameter {}",
                pair.value(),
                parameter.name()
            ))),
        }
    }
}

fn display_selection(pairs: &[ParameterPair]) -> String {
    pairs
        .iter()
        .map(|pair| pair.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constraint::KernelConstraint,
        pack::KernelParameterPack,
        parameter::{KernelParameter, ParameterValues},
    };
    use kerntune_common::{DimensionVector, KernelId, TuneErrorKind};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn kernel(parameters: &[(&str, &[u64])]) -> Kernel {
        let mut kernel = Kernel::new(
            KernelId::new(0),
            String::new(),
            "main".into(),
            DimensionVector::new_1d(64),
            DimensionVector::new_1d(8),
        );
        for (name, values) in parameters {
            kernel
                .add_parameter(KernelParameter::new(
                    name.to_string(),
                    ParameterValues::Integer(values.to_vec()),
                ))
                .unwrap();
        }
        kernel
    }

    fn constrain(kernel: &mut Kernel, names: &[&str], function: fn(&[u64]) -> bool) {
        kernel
            .add_constraint(KernelConstraint::new(
                names.iter().map(|name| name.to_string()).collect(),
                Arc::new(function),
            ))
            .unwrap();
    }

    fn selection(pairs: &[(&str, u64)]) -> Vec<ParameterPair> {
        pairs
            .iter()
            .map(|(name, value)| ParameterPair::new(name.to_string(), (*value).into()))
            .collect()
    }

    fn as_tuples(selections: &[Vec<ParameterPair>]) -> Vec<Vec<u64>> {
        selections
            .iter()
            .map(|pairs| pairs.iter().map(|pair| pair.value().as_u64()).collect())
            .collect()
    }

    #[test]
    fn constraint_filters_enumeration() {
        let mut kernel = kernel(&[("A", &[1, 2]), ("B", &[1, 2])]);
        constrain(&mut kernel, &["A", "B"], |values| values[0] != values[1]);

        let generator = ConfigurationGenerator::new(&kernel);

        assert_eq!(as_tuples(&generator.enumerate()), vec![vec![1, 2], vec![2, 1]]);
        assert_eq!(generator.configuration_count(), 2);
    }

    #[test]
    fn pruning_matches_cross_product_filter() {
        let mut kernel = kernel(&[
            ("X", &[1, 2, 4, 8]),
            ("Y", &[1, 2, 4, 8]),
            ("Z", &[0, 1, 2]),
        ]);
        constrain(&mut kernel, &["Y", "X"], |values| values[0] <= values[1]);
        constrain(&mut kernel, &["Z", "X"], |values| values[0] * 4 < values[1] + 4);

        let mut expected = Vec::new();
        for x in [1, 2, 4, 8] {
            for y in [1, 2, 4, 8] {
                for z in [0, 1, 2] {
                    if y <= x && z * 4 < x + 4 {
                        expected.push(vec![x, y, z]);
                    }
                }
            }
        }

        let enumerated = as_tuples(&ConfigurationGenerator::new(&kernel).enumerate());
        assert_eq!(enumerated, expected);
    }

    #[test]
    fn constraint_order_does_not_change_the_result() {
        let mut first = kernel(&[("A", &[1, 2, 3]), ("B", &[1, 2, 3])]);
        constrain(&mut first, &["A"], |values| values[0] != 2);
        constrain(&mut first, &["A", "B"], |values| values[0] <= values[1]);

        let mut second = kernel(&[("A", &[1, 2, 3]), ("B", &[1, 2, 3])]);
        constrain(&mut second, &["A", "B"], |values| values[0] <= values[1]);
        constrain(&mut second, &["A"], |values| values[0] != 2);

        assert_eq!(
            ConfigurationGenerator::new(&first).enumerate(),
            ConfigurationGenerator::new(&second).enumerate()
        );
    }

    #[test]
    fn kernel_without_parameters_has_one_empty_selection() {
        let kernel = kernel(&[]);

        assert_eq!(
            ConfigurationGenerator::new(&kernel).enumerate(),
            vec![Vec::<ParameterPair>::new()]
        );
    }

    #[test]
    fn validate_reorders_and_checks() {
        let mut kernel = kernel(&[("A", &[1, 2]), ("B", &[1, 2])]);
        constrain(&mut kernel, &["A", "B"], |values| values[0] != values[1]);
        let generator = ConfigurationGenerator::new(&kernel);

        let valid = generator.validate(&selection(&[("B", 2), ("A", 1)])).unwrap();
        assert_eq!(valid, selection(&[("A", 1), ("B", 2)]));

        let cases = [
            (selection(&[("A", 1), ("B", 1)]), TuneErrorKind::InvalidConfiguration),
            (selection(&[("A", 1)]), TuneErrorKind::InvalidArgument),
            (selection(&[("A", 1), ("B", 2), ("C", 1)]), TuneErrorKind::InvalidArgument),
            (selection(&[("A", 1), ("A", 2), ("B", 2)]), TuneErrorKind::InvalidArgument),
            (selection(&[("A", 3), ("B", 2)]), TuneErrorKind::InvalidArgument),
        ];
        for (selection, kind) in cases {
            assert_eq!(generator.validate(&selection).unwrap_err().kind(), kind);
        }
    }

    #[test]
    fn double_parameters_are_truncated_for_constraints() {
        let mut kernel = kernel(&[("N", &[1, 2])]);
        kernel
            .add_parameter(KernelParameter::new(
                "SCALE".into(),
                ParameterValues::Double(vec![0.5, 1.5, 2.5]),
            ))
            .unwrap();
        constrain(&mut kernel, &["SCALE", "N"], |values| values[0] < values[1]);

        let selections = ConfigurationGenerator::new(&kernel).enumerate();
        let rendered: Vec<_> = selections.iter().map(|pairs| display_selection(pairs)).collect();

        assert_eq!(
            rendered,
            vec!["N: 1, SCALE: 0.5", "N: 2, SCALE: 0.5", "N: 2, SCALE: 1.5"]
        );
    }

    #[test]
    fn pack_enumeration_pins_other_parameters() {
        let mut kernel = kernel(&[("A", &[1, 2]), ("B", &[1, 2, 3]), ("C", &[5, 6])]);
        kernel
            .add_parameter_pack(KernelParameterPack::new(
                "inner".into(),
                vec!["B".into()],
            ))
            .unwrap();
        let generator = ConfigurationGenerator::new(&kernel);

        let selections = generator
            .enumerate_pack("inner", &selection(&[("C", 6)]))
            .unwrap();
        assert_eq!(
            as_tuples(&selections),
            vec![vec![1, 1, 6], vec![1, 2, 6], vec![1, 3, 6]]
        );

        let error = generator.enumerate_pack("outer", &[]).unwrap_err();
        assert_eq!(error.kind(), TuneErrorKind::InvalidArgument);
        let error = generator
            .enumerate_pack("inner", &selection(&[("C", 7)]))
            .unwrap_err();
        assert_eq!(error.kind(), TuneErrorKind::InvalidArgument);
    }
}
