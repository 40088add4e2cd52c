use kerntune_common::{ArgumentId, DimensionVector, KernelId, TuneError};

use crate::{
    constraint::KernelConstraint,
    modifier::{LocalMemoryModifier, ModifierType, ThreadModifier},
    pack::KernelParameterPack,
    parameter::{KernelParameter, ParameterPair},
};

/// A kernel registered for tuning, with its parameter space.
///
/// Every mutation is validated before anything is stored, a failed call leaves the kernel
/// untouched.
#[derive(Clone, Debug)]
pub struct Kernel {
    id: KernelId,
    name: String,
    source: String,
    global_size: DimensionVector,
    local_size: DimensionVector,
    parameters: Vec<KernelParameter>,
    constraints: Vec<KernelConstraint>,
    packs: Vec<KernelParameterPack>,
    thread_modifiers: Vec<ThreadModifier>,
    local_memory_modifiers: Vec<LocalMemoryModifier>,
    arguments: Vec<ArgumentId>,
}

impl Kernel {
    /// Create a kernel without parameters.
    pub fn new(
        id: KernelId,
        source: String,
        name: String,
        global_size: DimensionVector,
        local_size: DimensionVector,
    ) -> Self {
        Self {
            id,
            name,
            source,
            global_size,
            local_size,
            parameters: Vec::new(),
            constraints: Vec::new(),
            packs: Vec::new(),
            thread_modifiers: Vec::new(),
            local_memory_modifiers: Vec::new(),
            arguments: Vec::new(),
        }
    }

    /// Add a tuning parameter.
    pub fn add_parameter(&mut self, parameter: KernelParameter) -> Result<(), TuneError> {
        if parameter.values().is_empty() {
            return Err(TuneError::invalid_argument(
                "Tuning parameter must have at least one valid value",
            ));
        }
        if self.has_parameter(parameter.name()) {
            return Err(TuneError::invalid_argument(format!(
                "Parameter with name {} already exists",
                parameter.name()
            )));
        }

        self.parameters.push(parameter);
        Ok(())
    }

    /// Add a constraint over existing parameters.
    pub fn add_constraint(&mut self, constraint: KernelConstraint) -> Result<(), TuneError> {
        self.check_names(constraint.names(), "Constraint")?;
        self.constraints.push(constraint);
        Ok(())
    }

    /// Add a pack over existing parameters.
    pub fn add_parameter_pack(&mut self, pack: KernelParameterPack) -> Result<(), TuneError> {
        if self.packs.iter().any(|other| other.name() == pack.name()) {
            return Err(TuneError::invalid_argument(format!(
                "Parameter pack with name {} already exists",
                pack.name()
            )));
        }
        self.check_names(pack.parameter_names(), "Parameter pack")?;
        self.packs.push(pack);
        Ok(())
    }

    /// Add a thread modifier, applied after the ones already registered.
    pub fn add_thread_modifier(&mut self, modifier: ThreadModifier) -> Result<(), TuneError> {
        self.check_names(modifier.names(), "Thread modifier")?;
        self.thread_modifiers.push(modifier);
        Ok(())
    }

    /// Add a local memory modifier, applied after the ones already registered for the same
    /// argument.
    pub fn add_local_memory_modifier(
        &mut self,
        modifier: LocalMemoryModifier,
    ) -> Result<(), TuneError> {
        self.check_names(modifier.names(), "Local memory modifier")?;
        self.local_memory_modifiers.push(modifier);
        Ok(())
    }

    /// Bind the arguments of the kernel, in the order of the kernel function signature.
    pub fn set_arguments(&mut self, arguments: Vec<ArgumentId>) {
        self.arguments = arguments;
    }

    fn check_names(&self, names: &[String], owner: &str) -> Result<(), TuneError> {
        match names.iter().find(|name| !self.has_parameter(name)) {
            Some(name) => Err(TuneError::invalid_argument(format!(
                "{owner} references unknown parameter {name}"
            ))),
            None => Ok(()),
        }
    }

    /// The global size after applying the global thread modifiers to the selection.
    pub fn modified_global_size(&self, pairs: &[ParameterPair]) -> DimensionVector {
        self.modified_size(self.global_size, ModifierType::Global, pairs)
    }

    /// The local size after applying the local thread modifiers to the selection.
    pub fn modified_local_size(&self, pairs: &[ParameterPair]) -> DimensionVector {
        self.modified_size(self.local_size, ModifierType::Local, pairs)
    }

    fn modified_size(
        &self,
        base: DimensionVector,
        modifier_type: ModifierType,
        pairs: &[ParameterPair],
    ) -> DimensionVector {
        let mut size = base;
        self.thread_modifiers
            .iter()
            .filter(|modifier| modifier.modifier_type() == modifier_type)
            .for_each(|modifier| modifier.apply(&mut size, pairs));
        size
    }

    /// Reorder a selection to follow the declaration order of the parameters.
    ///
    /// Pairs naming unknown parameters keep their relative order after the known ones.
    pub fn ordered_pairs(&self, pairs: &[ParameterPair]) -> Vec<ParameterPair> {
        let mut ordered = pairs.to_vec();
        ordered.sort_by_key(|pair| {
            self.parameter_index(pair.name())
                .unwrap_or(self.parameters.len())
        });
        ordered
    }

    /// The position of a parameter in declaration order.
    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        self.parameters
            .iter()
            .position(|parameter| parameter.name() == name)
    }

    /// If a parameter with the given name is declared.
    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameter_index(name).is_some()
    }

    /// Get a parameter pack by name.
    pub fn parameter_pack(&self, name: &str) -> Option<&KernelParameterPack> {
        self.packs.iter().find(|pack| pack.name() == name)
    }

    /// The identifier of the kernel.
    pub fn id(&self) -> KernelId {
        self.id
    }

    /// The entry point name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The base global size.
    pub fn global_size(&self) -> DimensionVector {
        self.global_size
    }

    /// The base local size.
    pub fn local_size(&self) -> DimensionVector {
        self.local_size
    }

    /// The parameters, in declaration order.
    pub fn parameters(&self) -> &[KernelParameter] {
        &self.parameters
    }

    /// The constraints.
    pub fn constraints(&self) -> &[KernelConstraint] {
        &self.constraints
    }

    /// The parameter packs.
    pub fn parameter_packs(&self) -> &[KernelParameterPack] {
        &self.packs
    }

    /// The thread modifiers, in registration order.
    pub fn thread_modifiers(&self) -> &[ThreadModifier] {
        &self.thread_modifiers
    }

    /// The local memory modifiers, in registration order.
    pub fn local_memory_modifiers(&self) -> &[LocalMemoryModifier] {
        &self.local_memory_modifiers
    }

    /// The bound arguments, in signature order.
    pub fn arguments(&self) -> &[ArgumentId] {
        &self.arguments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{modifier::ModifierAction, parameter::ParameterValues};
    use kerntune_common::{ModifierDimension, TuneErrorKind};
    use std::sync::Arc;

    fn kernel() -> Kernel {
        Kernel::new(
            KernelId::new(0),
            "__kernel void scale() {}".into(),
            "scale".into(),
            DimensionVector::new_1d(1024),
            DimensionVector::new_1d(64),
        )
    }

    fn integer(name: &str, values: &[u64]) -> KernelParameter {
        KernelParameter::new(name.into(), ParameterValues::Integer(values.to_vec()))
    }

    #[test]
    fn empty_and_duplicate_parameters_are_rejected() {
        let mut kernel = kernel();

        let error = kernel.add_parameter(integer("TILE", &[])).unwrap_err();
        assert_eq!(error.kind(), TuneErrorKind::InvalidArgument);

        kernel.add_parameter(integer("TILE", &[1, 2])).unwrap();
        let error = kernel.add_parameter(integer("TILE", &[4])).unwrap_err();
        assert_eq!(error.kind(), TuneErrorKind::InvalidArgument);
        assert_eq!(kernel.parameters().len(), 1);
    }

    #[test]
    fn references_to_unknown_parameters_are_rejected() {
        let mut kernel = kernel();
        kernel.add_parameter(integer("A", &[1, 2])).unwrap();

        let constraint =
            KernelConstraint::new(vec!["A".into(), "B".into()], Arc::new(|_: &[u64]| true));
        assert_eq!(
            kernel.add_constraint(constraint).unwrap_err().kind(),
            TuneErrorKind::InvalidArgument
        );

        let pack = KernelParameterPack::new("pack".into(), vec!["C".into()]);
        assert_eq!(
            kernel.add_parameter_pack(pack).unwrap_err().kind(),
            TuneErrorKind::InvalidArgument
        );

        let modifier = ThreadModifier::new(
            ModifierType::Local,
            ModifierDimension::X,
            vec!["D".into()],
            ModifierAction::Multiply.function(),
        );
        assert_eq!(
            kernel.add_thread_modifier(modifier).unwrap_err().kind(),
            TuneErrorKind::InvalidArgument
        );
        assert!(kernel.constraints().is_empty());
        assert!(kernel.parameter_packs().is_empty());
        assert!(kernel.thread_modifiers().is_empty());
    }

    #[test]
    fn duplicate_pack_names_are_rejected() {
        let mut kernel = kernel();
        kernel.add_parameter(integer("A", &[1])).unwrap();

        kernel
            .add_parameter_pack(KernelParameterPack::new("pack".into(), vec!["A".into()]))
            .unwrap();
        let error = kernel
            .add_parameter_pack(KernelParameterPack::new("pack".into(), vec![]))
            .unwrap_err();

        assert_eq!(error.kind(), TuneErrorKind::InvalidArgument);
    }

    #[test]
    fn thread_modifiers_thread_the_running_extent() {
        let mut kernel = kernel();
        kernel.add_parameter(integer("TILE", &[1, 2, 4])).unwrap();
        kernel.add_parameter(integer("EXTRA", &[0, 64])).unwrap();
        for (action, name) in [(ModifierAction::Divide, "TILE"), (ModifierAction::Add, "EXTRA")] {
            kernel
                .add_thread_modifier(ThreadModifier::new(
                    ModifierType::Global,
                    ModifierDimension::X,
                    vec![name.into()],
                    action.function(),
                ))
                .unwrap();
        }

        let pairs = vec![
            ParameterPair::new("TILE".into(), 4u64.into()),
            ParameterPair::new("EXTRA".into(), 64u64.into()),
        ];

        assert_eq!(kernel.modified_global_size(&pairs), DimensionVector::new_1d(320));
        assert_eq!(kernel.modified_local_size(&pairs), DimensionVector::new_1d(64));
    }

    #[test]
    fn ordered_pairs_follow_declaration() {
        let mut kernel = kernel();
        kernel.add_parameter(integer("A", &[1])).unwrap();
        kernel.add_parameter(integer("B", &[1])).unwrap();

        let ordered = kernel.ordered_pairs(&[
            ParameterPair::new("X".into(), 1u64.into()),
            ParameterPair::new("B".into(), 1u64.into()),
            ParameterPair::new("A".into(), 1u64.into()),
        ]);
        let names: Vec<_> = ordered.iter().map(|pair| pair.name()).collect();

        assert_eq!(names, vec!["A", "B", "X"]);
    }
}
