use hashbrown::HashMap;
use std::sync::Arc;

type CacheKey = (String, String);

#[derive(Debug)]
struct CacheEntry<P> {
    program: Arc<P>,
    last_used: u64,
}

/// Compiled programs keyed by entry name and exact preprocessed source.
///
/// Least recently used entries are evicted first. An entry whose program is still referenced
/// elsewhere, by an in-flight launch or a profiling session, is never evicted.
#[derive(Debug)]
pub struct KernelCache<P> {
    entries: HashMap<CacheKey, CacheEntry<P>>,
    capacity: usize,
    clock: u64,
    hits: u64,
    misses: u64,
}

/// Counters of a [kernel cache](KernelCache).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of lookups that found a program.
    pub hits: u64,
    /// Number of lookups that didn't.
    pub misses: u64,
    /// Number of cached programs.
    pub len: usize,
}

impl<P> KernelCache<P> {
    /// Create a cache holding at most `capacity` programs.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
            clock: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Lookup a program, marking it as the most recently used on a hit.
    pub fn get(&mut self, name: &str, source: &str) -> Option<Arc<P>> {
        self.clock += 1;
        let key = (name.to_string(), source.to_string());

        match self.entries.get_mut(&key) {
            Some(entry) => {
                entry.last_used = self.clock;
                self.hits += 1;
                Some(entry.program.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert a program, evicting the least recently used entry not in flight when full.
    ///
    /// The program isn't cached when the capacity is zero or every entry is in flight.
    pub fn insert(&mut self, name: &str, source: &str, program: Arc<P>) {
        if self.capacity == 0 {
            return;
        }

        if self.entries.len() >= self.capacity && !self.evict() {
            log::debug!("Every cached kernel is in flight, {name} is not cached");
            return;
        }

        self.clock += 1;
        self.entries.insert(
            (name.to_string(), source.to_string()),
            CacheEntry {
                program,
                last_used: self.clock,
            },
        );
    }

    /// Change the capacity, evicting entries until the cache fits.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.entries.len() > self.capacity {
            if !self.evict() {
                break;
            }
        }
    }

    /// The capacity of the cache.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The number of cached programs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// If the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hit and miss counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            len: self.entries.len(),
        }
    }

    fn evict(&mut self) -> bool {
        let candidate = self
            .entries
            .iter()
            .filter(|(_, entry)| Arc::strong_count(&entry.program) == 1)
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone());

        match candidate {
            Some(key) => {
                self.entries.remove(&key);
                true
            }
            None => false,
        }
    }
}
