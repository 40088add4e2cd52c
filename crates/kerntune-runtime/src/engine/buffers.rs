use hashbrown::HashMap;
use kerntune_common::ArgumentId;
use kerntune_core::ArgumentAccessType;

/// A device buffer along with what the engine needs to know about it.
#[derive(new, Debug)]
pub struct BufferEntry<B> {
    /// The native buffer.
    pub buffer: B,
    /// Size in bytes.
    pub size: usize,
    /// How kernels access the buffer.
    pub access_type: ArgumentAccessType,
}

/// Device buffers of an engine, split between persistent and transient ones.
///
/// Transient buffers live until the next [clear](BufferSet::clear), persistent buffers until
/// they are explicitly released.
#[derive(Debug)]
pub struct BufferSet<B> {
    persistent: HashMap<ArgumentId, BufferEntry<B>>,
    transient: HashMap<ArgumentId, BufferEntry<B>>,
}

impl<B> Default for BufferSet<B> {
    fn default() -> Self {
        Self {
            persistent: HashMap::new(),
            transient: HashMap::new(),
        }
    }
}

impl<B> BufferSet<B> {
    /// Lookup the buffer used by a launch, persistent buffers first when they are in use.
    pub fn get(&self, id: ArgumentId, use_persistent: bool) -> Option<&BufferEntry<B>> {
        if use_persistent {
            if let Some(entry) = self.persistent.get(&id) {
                return Some(entry);
            }
        }
        self.transient.get(&id)
    }

    /// Lookup any buffer of the argument, persistent first.
    pub fn find(&self, id: ArgumentId) -> Option<&BufferEntry<B>> {
        self.get(id, true)
    }

    /// If a buffer would be found for a launch.
    pub fn contains(&self, id: ArgumentId, use_persistent: bool) -> bool {
        self.get(id, use_persistent).is_some()
    }

    /// The persistent buffer of an argument.
    pub fn persistent(&self, id: ArgumentId) -> Option<&BufferEntry<B>> {
        self.persistent.get(&id)
    }

    /// The persistent buffer of an argument, mutably.
    pub fn persistent_mut(&mut self, id: ArgumentId) -> Option<&mut BufferEntry<B>> {
        self.persistent.get_mut(&id)
    }

    /// If the argument has a persistent buffer.
    pub fn is_persistent(&self, id: ArgumentId) -> bool {
        self.persistent.contains_key(&id)
    }

    /// Insert a transient buffer, returning the one it replaces.
    pub fn insert_transient(
        &mut self,
        id: ArgumentId,
        entry: BufferEntry<B>,
    ) -> Option<BufferEntry<B>> {
        self.transient.insert(id, entry)
    }

    /// Insert a persistent buffer, returning the one it replaces.
    pub fn insert_persistent(
        &mut self,
        id: ArgumentId,
        entry: BufferEntry<B>,
    ) -> Option<BufferEntry<B>> {
        self.persistent.insert(id, entry)
    }

    /// Remove the transient buffer of an argument.
    pub fn take_transient(&mut self, id: ArgumentId) -> Option<BufferEntry<B>> {
        self.transient.remove(&id)
    }

    /// Remove the persistent buffer of an argument.
    pub fn take_persistent(&mut self, id: ArgumentId) -> Option<BufferEntry<B>> {
        self.persistent.remove(&id)
    }

    /// Remove transient buffers, optionally only those with the given access type.
    pub fn clear(&mut self, access_type: Option<ArgumentAccessType>) -> Vec<BufferEntry<B>> {
        let ids: Vec<ArgumentId> = self
            .transient
            .iter()
            .filter(|(_, entry)| access_type.map_or(true, |access| entry.access_type == access))
            .map(|(id, _)| *id)
            .collect();

        ids.into_iter()
            .filter_map(|id| self.transient.remove(&id))
            .collect()
    }

    /// Remove every buffer, persistent ones included.
    pub fn drain_all(&mut self) -> Vec<BufferEntry<B>> {
        self.transient
            .drain()
            .chain(self.persistent.drain())
            .map(|(_, entry)| entry)
            .collect()
    }

    /// Number of transient buffers.
    pub fn transient_len(&self) -> usize {
        self.transient.len()
    }

    /// Number of persistent buffers.
    pub fn persistent_len(&self) -> usize {
        self.persistent.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(access_type: ArgumentAccessType) -> BufferEntry<u8> {
        BufferEntry::new(0, 4, access_type)
    }

    #[test]
    fn clear_keeps_persistent_buffers() {
        let mut buffers = BufferSet::default();
        buffers.insert_transient(ArgumentId::new(0), entry(ArgumentAccessType::ReadOnly));
        buffers.insert_persistent(ArgumentId::new(1), entry(ArgumentAccessType::ReadWrite));

        let removed = buffers.clear(None);

        assert_eq!(removed.len(), 1);
        assert!(buffers.find(ArgumentId::new(1)).is_some());
        assert!(buffers.find(ArgumentId::new(0)).is_none());
    }

    #[test]
    fn clear_filters_by_access_type() {
        let mut buffers = BufferSet::default();
        buffers.insert_transient(ArgumentId::new(0), entry(ArgumentAccessType::ReadOnly));
        buffers.insert_transient(ArgumentId::new(1), entry(ArgumentAccessType::WriteOnly));

        let removed = buffers.clear(Some(ArgumentAccessType::WriteOnly));

        assert_eq!(removed.len(), 1);
        assert!(buffers.contains(ArgumentId::new(0), true));
        assert!(!buffers.contains(ArgumentId::new(1), true));
    }

    #[test]
    fn persistent_buffers_are_skipped_when_unused() {
        let mut buffers = BufferSet::default();
        buffers.insert_persistent(ArgumentId::new(0), entry(ArgumentAccessType::ReadOnly));

        assert!(!buffers.contains(ArgumentId::new(0), false));
        assert!(buffers.is_persistent(ArgumentId::new(0)));
    }
}
