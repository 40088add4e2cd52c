use std::path::Path;

use kerntune_common::{
    ArgumentId, DimensionVector, IdGenerator, KernelId, ModifierDimension, TuneError,
};

use crate::{
    argument::{ArgumentStore, ArgumentUploadType},
    configuration::{source_with_defines, KernelConfiguration},
    constraint::{ConstraintFunction, KernelConstraint},
    generator::ConfigurationGenerator,
    kernel::Kernel,
    modifier::{LocalMemoryModifier, ModifierFunction, ModifierType, ThreadModifier},
    pack::KernelParameterPack,
    parameter::{KernelParameter, ParameterPair, ParameterValues},
};

/// Registry owning every kernel of a tuner.
#[derive(Default, Debug)]
pub struct KernelManager {
    kernels: Vec<Kernel>,
    ids: IdGenerator,
}

impl KernelManager {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kernel from its source.
    pub fn add_kernel(
        &mut self,
        source: impl Into<String>,
        name: impl Into<String>,
        global_size: DimensionVector,
        local_size: DimensionVector,
    ) -> KernelId {
        let id = self.ids.generate();
        let kernel = Kernel::new(id, source.into(), name.into(), global_size, local_size);
        log::debug!("Registering kernel {} with id {id}", kernel.name());
        self.kernels.push(kernel);
        id
    }

    /// Register a kernel from a source file.
    pub fn add_kernel_from_file(
        &mut self,
        path: impl AsRef<Path>,
        name: impl Into<String>,
        global_size: DimensionVector,
        local_size: DimensionVector,
    ) -> Result<KernelId, TuneError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|_| {
            TuneError::not_found(format!("Unable to open file: {}", path.display()))
        })?;
        Ok(self.add_kernel(source, name, global_size, local_size))
    }

    /// Add an integral tuning parameter to a kernel.
    pub fn add_parameter(
        &mut self,
        id: KernelId,
        name: impl Into<String>,
        values: Vec<u64>,
    ) -> Result<(), TuneError> {
        self.kernel_mut(id)?
            .add_parameter(KernelParameter::new(name.into(), ParameterValues::Integer(values)))
    }

    /// Add a floating point tuning parameter to a kernel.
    pub fn add_parameter_double(
        &mut self,
        id: KernelId,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), TuneError> {
        self.kernel_mut(id)?
            .add_parameter(KernelParameter::new(name.into(), ParameterValues::Double(values)))
    }

    /// Add a constraint to a kernel.
    pub fn add_constraint(
        &mut self,
        id: KernelId,
        names: Vec<String>,
        function: ConstraintFunction,
    ) -> Result<(), TuneError> {
        self.kernel_mut(id)?
            .add_constraint(KernelConstraint::new(names, function))
    }

    /// Add a parameter pack to a kernel.
    pub fn add_parameter_pack(
        &mut self,
        id: KernelId,
        name: impl Into<String>,
        names: Vec<String>,
    ) -> Result<(), TuneError> {
        self.kernel_mut(id)?
            .add_parameter_pack(KernelParameterPack::new(name.into(), names))
    }

    /// Add a thread modifier to a kernel.
    pub fn set_thread_modifier(
        &mut self,
        id: KernelId,
        modifier_type: ModifierType,
        dimension: ModifierDimension,
        names: Vec<String>,
        function: ModifierFunction,
    ) -> Result<(), TuneError> {
        self.kernel_mut(id)?.add_thread_modifier(ThreadModifier::new(
            modifier_type,
            dimension,
            names,
            function,
        ))
    }

    /// Add a local memory modifier to a kernel.
    ///
    /// The target must be a local memory argument of the store.
    pub fn set_local_memory_modifier(
        &mut self,
        id: KernelId,
        argument: ArgumentId,
        names: Vec<String>,
        function: ModifierFunction,
        store: &ArgumentStore,
    ) -> Result<(), TuneError> {
        let kernel = self.kernel_mut(id)?;
        if store.get(argument)?.upload_type() != ArgumentUploadType::Local {
            return Err(TuneError::invalid_argument(format!(
                "Argument {argument} isn't a local memory argument"
            )));
        }
        kernel.add_local_memory_modifier(LocalMemoryModifier::new(argument, names, function))
    }

    /// Bind arguments to a kernel. Either every argument is bound or none is.
    pub fn set_arguments(
        &mut self,
        id: KernelId,
        arguments: Vec<ArgumentId>,
        store: &ArgumentStore,
    ) -> Result<(), TuneError> {
        let kernel = self.kernel_mut(id)?;
        store.arguments(&arguments)?;
        kernel.set_arguments(arguments);
        Ok(())
    }

    /// The source of a kernel with the defines of a selection prepended, in declaration order.
    pub fn source_with_defines(
        &self,
        id: KernelId,
        pairs: &[ParameterPair],
    ) -> Result<String, TuneError> {
        let kernel = self.kernel(id)?;
        Ok(source_with_defines(kernel.source(), &kernel.ordered_pairs(pairs)))
    }

    /// Derive the launch configuration of a selection.
    ///
    /// Thread modifiers whose parameters are all selected are applied in registration order.
    /// Local memory sizes start from the element count of the argument in the store and thread
    /// through every modifier registered for it.
    pub fn configuration(
        &self,
        id: KernelId,
        pairs: &[ParameterPair],
        store: &ArgumentStore,
    ) -> Result<KernelConfiguration, TuneError> {
        let kernel = self.kernel(id)?;
        let pairs = kernel.ordered_pairs(pairs);
        let global_size = kernel.modified_global_size(&pairs);
        let local_size = kernel.modified_local_size(&pairs);

        let mut local_memory_sizes: Vec<(ArgumentId, usize)> = Vec::new();
        for modifier in kernel.local_memory_modifiers() {
            let argument = modifier.argument();
            match local_memory_sizes.iter_mut().find(|(id, _)| *id == argument) {
                Some((_, size)) => *size = modifier.apply(*size, &pairs),
                None => {
                    let base = store.get(argument)?.count();
                    local_memory_sizes.push((argument, modifier.apply(base, &pairs)));
                }
            }
        }

        Ok(KernelConfiguration::new(
            global_size,
            local_size,
            pairs,
            local_memory_sizes,
        ))
    }

    /// A generator over the parameter space of a kernel.
    pub fn generator(&self, id: KernelId) -> Result<ConfigurationGenerator<'_>, TuneError> {
        self.kernel(id).map(ConfigurationGenerator::new)
    }

    /// Get a kernel.
    pub fn kernel(&self, id: KernelId) -> Result<&Kernel, TuneError> {
        self.kernels
            .iter()
            .find(|kernel| kernel.id() == id)
            .ok_or_else(|| TuneError::not_found(format!("Invalid kernel id: {id}")))
    }

    /// If a kernel with the given id is registered.
    pub fn is_kernel(&self, id: KernelId) -> bool {
        self.kernels.iter().any(|kernel| kernel.id() == id)
    }

    fn kernel_mut(&mut self, id: KernelId) -> Result<&mut Kernel, TuneError> {
        self.kernels
            .iter_mut()
            .find(|kernel| kernel.id() == id)
            .ok_or_else(|| TuneError::not_found(format!("Invalid kernel id: {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{argument::ArgumentAccessType, modifier::ModifierAction};
    use kerntune_common::TuneErrorKind;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn tile_kernel(manager: &mut KernelManager) -> KernelId {
        let id = manager.add_kernel(
            "__kernel void copy(__global float* a) {}",
            "copy",
            DimensionVector::new_1d(1024),
            DimensionVector::new_1d(64),
        );
        manager.add_parameter(id, "TILE", vec![1, 2, 4]).unwrap();
        manager
            .set_thread_modifier(
                id,
                ModifierType::Global,
                ModifierDimension::X,
                vec!["TILE".into()],
                ModifierAction::Divide.function(),
            )
            .unwrap();
        id
    }

    #[test]
    fn tile_selection_divides_global_size() {
        let mut manager = KernelManager::new();
        let store = ArgumentStore::new();
        let id = tile_kernel(&mut manager);
        let pairs = vec![ParameterPair::new("TILE".into(), 4u64.into())];

        let configuration = manager.configuration(id, &pairs, &store).unwrap();
        let source = manager.source_with_defines(id, &pairs).unwrap();

        assert_eq!(configuration.global_size(), DimensionVector::new_1d(256));
        assert_eq!(configuration.local_size(), DimensionVector::new_1d(64));
        assert!(source.starts_with("#define TILE 4\n"));
    }

    #[test]
    fn derivation_is_deterministic() {
        let mut manager = KernelManager::new();
        let mut store = ArgumentStore::new();
        let id = tile_kernel(&mut manager);
        manager.add_parameter_double(id, "ALPHA", vec![0.5, 2.0]).unwrap();
        let local = store.add_local::<f32>(64);
        manager
            .set_local_memory_modifier(
                id,
                local,
                vec!["TILE".into()],
                ModifierAction::Multiply.function(),
                &store,
            )
            .unwrap();
        let pairs = vec![
            ParameterPair::new("ALPHA".into(), 0.5f64.into()),
            ParameterPair::new("TILE".into(), 2u64.into()),
        ];

        let first = manager.configuration(id, &pairs, &store).unwrap();
        let second = manager.configuration(id, &pairs, &store).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.local_memory_size(local), Some(128));
        assert_eq!(
            manager.source_with_defines(id, &pairs).unwrap(),
            manager.source_with_defines(id, &pairs).unwrap()
        );
    }

    #[test]
    fn local_memory_modifiers_thread_per_argument() {
        let mut manager = KernelManager::new();
        let mut store = ArgumentStore::new();
        let id = tile_kernel(&mut manager);
        let local = store.add_local::<f32>(16);
        for action in [ModifierAction::Multiply, ModifierAction::Add] {
            manager
                .set_local_memory_modifier(id, local, vec!["TILE".into()], action.function(), &store)
                .unwrap();
        }
        let pairs = vec![ParameterPair::new("TILE".into(), 4u64.into())];

        let configuration = manager.configuration(id, &pairs, &store).unwrap();

        assert_eq!(configuration.local_memory_sizes(), &[(local, 68)]);
    }

    #[test]
    fn modifier_actions_saturate_and_tolerate_missing_values() {
        let mut manager = KernelManager::new();
        let store = ArgumentStore::new();
        let id = manager.add_kernel(
            "__kernel void fill() {}",
            "fill",
            DimensionVector::new_2d(usize::MAX - 1, 8),
            DimensionVector::new_1d(1),
        );
        manager.add_parameter(id, "TILE", vec![4]).unwrap();
        manager
            .set_thread_modifier(
                id,
                ModifierType::Global,
                ModifierDimension::X,
                vec!["TILE".into()],
                ModifierAction::Add.function(),
            )
            .unwrap();
        manager
            .set_thread_modifier(
                id,
                ModifierType::Global,
                ModifierDimension::Y,
                Vec::new(),
                ModifierAction::Multiply.function(),
            )
            .unwrap();
        let pairs = vec![ParameterPair::new("TILE".into(), 4u64.into())];

        let configuration = manager.configuration(id, &pairs, &store).unwrap();

        assert_eq!(
            configuration.global_size(),
            DimensionVector::new_2d(usize::MAX, 8)
        );
    }

    #[test]
    fn local_memory_modifier_requires_local_argument() {
        let mut manager = KernelManager::new();
        let mut store = ArgumentStore::new();
        let id = tile_kernel(&mut manager);
        let vector = store.add_vector(&[0f32; 4], ArgumentAccessType::ReadOnly);

        let error = manager
            .set_local_memory_modifier(
                id,
                vector,
                vec!["TILE".into()],
                Arc::new(|size: usize, _: &[u64]| size),
                &store,
            )
            .unwrap_err();

        assert_eq!(error.kind(), TuneErrorKind::InvalidArgument);
    }

    #[test]
    fn unknown_kernel_and_missing_file() {
        let mut manager = KernelManager::new();
        let store = ArgumentStore::new();

        let error = manager.add_parameter(KernelId::new(3), "A", vec![1]).unwrap_err();
        assert_eq!(error.kind(), TuneErrorKind::NotFound);
        assert_eq!(error.to_string(), "Not found: Invalid kernel id: 3");

        let error = manager.configuration(KernelId::new(0), &[], &store).unwrap_err();
        assert_eq!(error.kind(), TuneErrorKind::NotFound);

        let error = manager
            .add_kernel_from_file(
                "/nonexistent/kernel.cl",
                "main",
                DimensionVector::new_1d(1),
                DimensionVector::new_1d(1),
            )
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "Not found: Unable to open file: /nonexistent/kernel.cl"
        );
    }

    #[test]
    fn arguments_are_bound_atomically() {
        let mut manager = KernelManager::new();
        let mut store = ArgumentStore::new();
        let id = tile_kernel(&mut manager);
        let a = store.add_vector(&[0u32; 4], ArgumentAccessType::ReadOnly);
        let b = store.add_vector(&[0u32; 4], ArgumentAccessType::WriteOnly);

        manager.set_arguments(id, vec![a, b], &store).unwrap();
        let error = manager.set_arguments(id, vec![b, b], &store).unwrap_err();

        assert_eq!(error.kind(), TuneErrorKind::InvalidArgument);
        assert_eq!(manager.kernel(id).unwrap().arguments(), &[a, b]);
    }
}
