use bytemuck::Pod;
use kerntune_common::{ArgumentId, IdGenerator, TuneError};
use serde::{Deserialize, Serialize};

/// The element type of a kernel argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgumentDataType {
    /// Signed 8-bit integer.
    Char,
    /// Unsigned 8-bit integer.
    UnsignedChar,
    /// Signed 16-bit integer.
    Short,
    /// Unsigned 16-bit integer.
    UnsignedShort,
    /// Signed 32-bit integer.
    Int,
    /// Unsigned 32-bit integer.
    UnsignedInt,
    /// Signed 64-bit integer.
    Long,
    /// Unsigned 64-bit integer.
    UnsignedLong,
    /// 32-bit floating point.
    Float,
    /// 64-bit floating point.
    Double,
    /// Any other plain old data type.
    Custom,
}

impl ArgumentDataType {
    /// The size of one element in bytes, `None` for [custom](ArgumentDataType::Custom) types.
    pub fn size(&self) -> Option<usize> {
        match self {
            ArgumentDataType::Char | ArgumentDataType::UnsignedChar => Some(1),
            ArgumentDataType::Short | ArgumentDataType::UnsignedShort => Some(2),
            ArgumentDataType::Int | ArgumentDataType::UnsignedInt | ArgumentDataType::Float => {
                Some(4)
            }
            ArgumentDataType::Long
            | ArgumentDataType::UnsignedLong
            | ArgumentDataType::Double => Some(8),
            ArgumentDataType::Custom => None,
        }
    }
}

/// Where the memory of an argument lives while a kernel accesses it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgumentMemoryLocation {
    /// Device memory.
    #[default]
    Device,
    /// Host memory, mapped for the device.
    Host,
}

/// How a kernel accesses an argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgumentAccessType {
    /// Input only.
    ReadOnly,
    /// Output only.
    WriteOnly,
    /// Input and output.
    ReadWrite,
}

impl ArgumentAccessType {
    /// If kernels may write to the argument.
    pub fn is_writable(&self) -> bool {
        !matches!(self, ArgumentAccessType::ReadOnly)
    }
}

/// How an argument is handed to a kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgumentUploadType {
    /// A buffer.
    Vector,
    /// A value passed directly.
    Scalar,
    /// A local memory placeholder, only its size is given to the kernel.
    Local,
}

/// Element types accepted as kernel argument data.
pub trait ArgumentElement: Pod {
    /// The data type tag of the element.
    const DATA_TYPE: ArgumentDataType;
}

macro_rules! argument_element {
    ($($ty:ty => $data_type:ident),* $(,)?) => {
        $(
            impl ArgumentElement for $ty {
                const DATA_TYPE: ArgumentDataType = ArgumentDataType::$data_type;
            }
        )*
    };
}

argument_element!(
    i8 => Char,
    u8 => UnsignedChar,
    i16 => Short,
    u16 => UnsignedShort,
    i32 => Int,
    u32 => UnsignedInt,
    i64 => Long,
    u64 => UnsignedLong,
    f32 => Float,
    f64 => Double,
);

/// A kernel argument and its host copy.
#[derive(Clone, Debug, PartialEq)]
pub struct KernelArgument {
    id: ArgumentId,
    count: usize,
    element_size: usize,
    data_type: ArgumentDataType,
    memory_location: ArgumentMemoryLocation,
    access_type: ArgumentAccessType,
    upload_type: ArgumentUploadType,
    data: Option<Vec<u8>>,
    persistent: bool,
}

impl KernelArgument {
    /// The identifier of the argument.
    pub fn id(&self) -> ArgumentId {
        self.id
    }

    /// The number of elements.
    pub fn count(&self) -> usize {
        self.count
    }

    /// The size of one element in bytes.
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// The total size in bytes.
    pub fn size_in_bytes(&self) -> usize {
        self.count * self.element_size
    }

    /// The element type.
    pub fn data_type(&self) -> ArgumentDataType {
        self.data_type
    }

    /// The memory location.
    pub fn memory_location(&self) -> ArgumentMemoryLocation {
        self.memory_location
    }

    /// The access type.
    pub fn access_type(&self) -> ArgumentAccessType {
        self.access_type
    }

    /// The upload type.
    pub fn upload_type(&self) -> ArgumentUploadType {
        self.upload_type
    }

    /// The host data, absent for local memory placeholders.
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Copy the host data into a vector of elements.
    pub fn data_to_vec<T: Pod>(&self) -> Option<Vec<T>> {
        let data = self.data.as_ref()?;
        if core::mem::size_of::<T>() == 0 || data.len() % core::mem::size_of::<T>() != 0 {
            return None;
        }
        Some(bytemuck::pod_collect_to_vec(data.as_slice()))
    }

    /// If the device buffer of the argument outlives single runs.
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// A copy of the argument holding the given data, e.g. contents downloaded from the device.
    pub fn with_data(&self, data: Vec<u8>) -> Self {
        Self {
            count: data.len() / self.element_size.max(1),
            data: Some(data),
            ..self.clone()
        }
    }
}

/// Owns every kernel argument of a tuner, independently of any backend.
#[derive(Default, Debug)]
pub struct ArgumentStore {
    arguments: Vec<KernelArgument>,
    ids: IdGenerator,
}

impl ArgumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a buffer argument living in device memory.
    pub fn add_vector<T: ArgumentElement>(
        &mut self,
        data: &[T],
        access_type: ArgumentAccessType,
    ) -> ArgumentId {
        self.add_vector_with_location(data, access_type, ArgumentMemoryLocation::Device)
    }

    /// Add a buffer argument living in the given memory location.
    pub fn add_vector_with_location<T: ArgumentElement>(
        &mut self,
        data: &[T],
        access_type: ArgumentAccessType,
        memory_location: ArgumentMemoryLocation,
    ) -> ArgumentId {
        self.insert(
            data.len(),
            core::mem::size_of::<T>(),
            T::DATA_TYPE,
            memory_location,
            access_type,
            ArgumentUploadType::Vector,
            Some(bytemuck::cast_slice::<T, u8>(data).to_vec()),
        )
    }

    /// Add a scalar argument. Scalars are always read only.
    pub fn add_scalar<T: ArgumentElement>(&mut self, value: T) -> ArgumentId {
        self.insert(
            1,
            core::mem::size_of::<T>(),
            T::DATA_TYPE,
            ArgumentMemoryLocation::Device,
            ArgumentAccessType::ReadOnly,
            ArgumentUploadType::Scalar,
            Some(bytemuck::bytes_of(&value).to_vec()),
        )
    }

    /// Add a local memory placeholder of `count` elements.
    pub fn add_local<T: ArgumentElement>(&mut self, count: usize) -> ArgumentId {
        self.insert(
            count,
            core::mem::size_of::<T>(),
            T::DATA_TYPE,
            ArgumentMemoryLocation::Device,
            ArgumentAccessType::ReadOnly,
            ArgumentUploadType::Local,
            None,
        )
    }

    /// Add a buffer of a plain old data type without a dedicated tag.
    pub fn add_custom<T: Pod>(&mut self, data: &[T], access_type: ArgumentAccessType) -> ArgumentId {
        self.insert(
            data.len(),
            core::mem::size_of::<T>(),
            ArgumentDataType::Custom,
            ArgumentMemoryLocation::Device,
            access_type,
            ArgumentUploadType::Vector,
            Some(bytemuck::cast_slice::<T, u8>(data).to_vec()),
        )
    }

    /// Add an argument from raw bytes.
    ///
    /// The byte count must be a multiple of the element size, which must match the size of the
    /// data type when it has one.
    pub fn add_raw(
        &mut self,
        data: Vec<u8>,
        element_size: usize,
        data_type: ArgumentDataType,
        memory_location: ArgumentMemoryLocation,
        access_type: ArgumentAccessType,
        upload_type: ArgumentUploadType,
    ) -> Result<ArgumentId, TuneError> {
        if element_size == 0 {
            return Err(TuneError::invalid_argument(
                "Argument element size must be greater than zero",
            ));
        }
        if upload_type == ArgumentUploadType::Local {
            return Err(TuneError::invalid_argument(
                "Local memory arguments can't be initialized from host data",
            ));
        }
        if let Some(size) = data_type.size() {
            if size != element_size {
                return Err(TuneError::invalid_argument(format!(
                    "Element size {element_size} doesn't match data type {data_type:?}"
                )));
            }
        }
        if data.len() % element_size != 0 {
            return Err(TuneError::invalid_argument(format!(
                "Argument of {} bytes isn't a whole number of {element_size} byte elements",
                data.len()
            )));
        }

        Ok(self.insert(
            data.len() / element_size,
            element_size,
            data_type,
            memory_location,
            access_type,
            upload_type,
            Some(data),
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn insert(
        &mut self,
        count: usize,
        element_size: usize,
        data_type: ArgumentDataType,
        memory_location: ArgumentMemoryLocation,
        access_type: ArgumentAccessType,
        upload_type: ArgumentUploadType,
        data: Option<Vec<u8>>,
    ) -> ArgumentId {
        let id = self.ids.generate();
        log::debug!("Adding argument {id} with {count} elements of type {data_type:?}");
        self.arguments.push(KernelArgument {
            id,
            count,
            element_size,
            data_type,
            memory_location,
            access_type,
            upload_type,
            data,
            persistent: false,
        });
        id
    }

    /// Get an argument.
    pub fn get(&self, id: ArgumentId) -> Result<&KernelArgument, TuneError> {
        self.arguments
            .get(id.value() as usize)
            .ok_or_else(|| TuneError::not_found(format!("Invalid argument id: {id}")))
    }

    /// Replace the host data of a buffer or scalar argument.
    ///
    /// The new data may change the element count but not the element size.
    pub fn update(&mut self, id: ArgumentId, data: Vec<u8>) -> Result<(), TuneError> {
        let argument = self.get_mut(id)?;
        if argument.upload_type == ArgumentUploadType::Local {
            return Err(TuneError::invalid_argument(format!(
                "Argument {id} is a local memory placeholder"
            )));
        }
        if data.len() % argument.element_size != 0 {
            return Err(TuneError::invalid_argument(format!(
                "Argument of {} bytes isn't a whole number of {} byte elements",
                data.len(),
                argument.element_size
            )));
        }
        argument.count = data.len() / argument.element_size;
        argument.data = Some(data);
        Ok(())
    }

    /// Toggle the persistence flag of a buffer argument.
    pub fn set_persistent(&mut self, id: ArgumentId, flag: bool) -> Result<(), TuneError> {
        let argument = self.get_mut(id)?;
        if flag && argument.upload_type != ArgumentUploadType::Vector {
            return Err(TuneError::invalid_argument(format!(
                "Only vector arguments can be persisted, argument {id} is {:?}",
                argument.upload_type
            )));
        }
        argument.persistent = flag;
        Ok(())
    }

    /// Resolve a list of argument ids, in order.
    ///
    /// The ids must be unique and registered in the store.
    pub fn arguments(&self, ids: &[ArgumentId]) -> Result<Vec<&KernelArgument>, TuneError> {
        for (index, id) in ids.iter().enumerate() {
            if ids[..index].contains(id) {
                return Err(TuneError::invalid_argument(
                    "Kernel argument ids assigned to single kernel must be unique",
                ));
            }
        }
        ids.iter().map(|id| self.get(*id)).collect()
    }

    /// The number of registered arguments.
    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    /// If no argument is registered.
    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    fn get_mut(&mut self, id: ArgumentId) -> Result<&mut KernelArgument, TuneError> {
        self.arguments
            .get_mut(id.value() as usize)
            .ok_or_else(|| TuneError::not_found(format!("Invalid argument id: {id}")))
    }
}
