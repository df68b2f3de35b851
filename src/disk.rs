use crate::{CacheStats, ContentCache, FsError, FsResult, NodeId};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{instrument, trace};

/// Single accounting authority for content bytes.
///
/// `used` is only ever changed here; every change is made under one lock so
/// that concurrent reservations can't overcommit `capacity`.
#[derive(Debug)]
pub struct DiskManager {
    capacity: u64,
    used: Mutex<u64>,
    cache: Mutex<ContentCache>,
}

impl DiskManager {
    pub fn new(capacity: u64, cache_entries: usize) -> Self {
        Self {
            capacity,
            used: Mutex::new(0),
            cache: Mutex::new(ContentCache::new(cache_entries)),
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn used(&self) -> u64 {
        *self.used.lock()
    }

    /// Claims `additional` bytes, failing without side effects when they
    /// don't fit.
    #[instrument(skip(self))]
    pub fn reserve(&self, additional: u64) -> FsResult<()> {
        let mut used = self.used.lock();

        match used.checked_add(additional) {
            Some(total) if total <= self.capacity => {
                *used = total;
                trace!(used = *used, "reserved");

                Ok(())
            }

            _ => Err(FsError::OutOfSpace {
                requested: additional,
                available: self.capacity - *used,
            }),
        }
    }

    /// Gives back `bytes` claimed earlier.
    #[instrument(skip(self))]
    pub fn release(&self, bytes: u64) {
        let mut used = self.used.lock();

        *used = used.saturating_sub(bytes);
        trace!(used = *used, "released");
    }

    /// Drops the cached payload of a removed node.
    pub fn forget(&self, id: NodeId) {
        self.cache.lock().invalidate(id);
    }

    /// Write-through: records `content` as the latest payload of `id`.
    pub fn commit(&self, id: NodeId, content: &Arc<[u8]>) {
        self.cache.lock().insert(id, content.clone());
    }

    /// Read-through: serves `id` from the cache, falling back to `load` (the
    /// node itself) on a miss.
    ///
    /// `load` runs without the cache locked; the caller keeps writers of `id`
    /// out meanwhile, so what it returns can't be stale.
    pub fn read(&self, id: NodeId, load: impl FnOnce() -> Arc<[u8]>) -> Arc<[u8]> {
        if let Some(data) = self.cache.lock().get(id) {
            return data;
        }

        let data = load();
        self.cache.lock().insert(id, data.clone());

        data
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }
}
