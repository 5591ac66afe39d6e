//! In-memory key-value store with failure injection.
//!
//! Clones share one map, so a handle kept outside the relay observes every
//! write the relay makes.

use super::{KeyValueStore, StoreError, StoreResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Shared {
    entries: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryKvStore {
    shared: Arc<Shared>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent reads fail until switched back.
    pub fn set_fail_reads(&self, fail: bool) {
        self.shared.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent writes fail until switched back.
    pub fn set_fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes across all keys.
    pub fn write_count(&self) -> usize {
        self.shared.writes.load(Ordering::SeqCst)
    }

    /// Raw stored value, bypassing failure injection.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map still holds the last complete write.
        self.shared
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryKvStore {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        if self.shared.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("read of `{key}` refused")));
        }
        Ok(self.lock().get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> StoreResult<()> {
        if self.shared.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("write of `{key}` refused")));
        }
        self.lock().insert(key.to_string(), value.to_string());
        self.shared.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
