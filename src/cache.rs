use crate::NodeId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Bounded, least-recently-used store of file payloads keyed by node.
///
/// Entries share the node's buffer (`Arc`), so the cache never holds the
/// only copy of anything.
#[derive(Debug)]
pub struct ContentCache {
    entries: HashMap<NodeId, CacheEntry>,
    max_entries: usize,
    clock: u64,
    hits: u64,
    misses: u64,
}

#[derive(Debug)]
struct CacheEntry {
    data: Arc<[u8]>,
    last_access: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl ContentCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            max_entries,
            clock: 0,
            hits: 0,
            misses: 0,
        }
    }

    pub fn get(&mut self, id: NodeId) -> Option<Arc<[u8]>> {
        let now = self.tick();

        match self.entries.get_mut(&id) {
            Some(entry) => {
                self.hits += 1;
                entry.last_access = now;

                Some(entry.data.clone())
            }

            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, id: NodeId, data: Arc<[u8]>) {
        if self.max_entries == 0 {
            return;
        }

        if !self.entries.contains_key(&id) && self.entries.len() >= self.max_entries {
            self.evict_lru();
        }

        let last_access = self.tick();

        self.entries.insert(id, CacheEntry { data, last_access });
    }

    pub fn invalidate(&mut self, id: NodeId) {
        self.entries.remove(&id);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict_lru(&mut self) {
        let lru = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(id, _)| *id);

        if let Some(id) = lru {
            trace!("evicting {:?}", id);
            self.entries.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(s: &str) -> Arc<[u8]> {
        Arc::from(s.as_bytes())
    }

    #[test]
    fn hit_and_miss_are_counted() {
        let mut cache = ContentCache::new(4);

        assert_eq!(cache.get(NodeId::new(2)), None);
        cache.insert(NodeId::new(2), data("hello"));
        assert_eq!(cache.get(NodeId::new(2)).as_deref(), Some(&b"hello"[..]));

        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                entries: 1,
            }
        );
    }

    #[test]
    fn least_recently_used_entry_is_evicted() {
        let mut cache = ContentCache::new(2);

        cache.insert(NodeId::new(2), data("a"));
        cache.insert(NodeId::new(3), data("b"));

        // touch 2, so 3 becomes the eviction candidate
        cache.get(NodeId::new(2));
        cache.insert(NodeId::new(4), data("c"));

        assert!(cache.get(NodeId::new(2)).is_some());
        assert!(cache.get(NodeId::new(3)).is_none());
        assert!(cache.get(NodeId::new(4)).is_some());
    }

    #[test]
    fn overwrite_doesnt_evict() {
        let mut cache = ContentCache::new(1);

        cache.insert(NodeId::new(2), data("a"));
        cache.insert(NodeId::new(2), data("b"));

        assert_eq!(cache.get(NodeId::new(2)).as_deref(), Some(&b"b"[..]));
    }

    #[test]
    fn zero_sized_cache_stores_nothing() {
        let mut cache = ContentCache::new(0);

        cache.insert(NodeId::new(2), data("a"));

        assert_eq!(cache.stats().entries, 0);
    }
}
