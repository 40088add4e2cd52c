/// Create a new identifier type wrapping a `u64`.
///
/// Identifiers are issued sequentially by their owner through an [IdGenerator], they are never
/// reused during the lifetime of the owner.
#[macro_export]
macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Copy,
            Clone,
            Hash,
            PartialEq,
            Eq,
            Debug,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
            derive_more::Display,
            derive_more::From,
        )]
        #[display("{_0}")]
        pub struct $name(u64);

        impl $name {
            /// Create an identifier from its raw value.
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// The raw value of the identifier.
            pub const fn value(&self) -> u64 {
                self.0
            }
        }
    };
}

id_type!(
    /// Identifies a kernel registered in a tuner.
    KernelId
);
id_type!(
    /// Identifies a kernel argument registered in a tuner.
    ArgumentId
);
id_type!(
    /// Identifies a launch submitted to a compute queue.
    EventId
);
id_type!(
    /// Identifies a compute queue.
    QueueId
);

/// Issues sequential identifiers.
#[derive(Debug, Default, Clone)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    /// Create a generator starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next identifier.
    pub fn generate<Id: From<u64>>(&mut self) -> Id {
        let value = self.next;
        self.next += 1;
        Id::from(value)
    }

    /// The number of identifiers issued so far.
    pub fn issued(&self) -> u64 {
        self.next
    }
}
