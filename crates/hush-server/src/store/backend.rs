use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;

use super::model::StoredRecord;

/// The key-value interface the share protocol consumes.
///
/// `get_and_delete` must be a single atomic operation: of N racing calls for
/// one key, exactly one observes the value and the rest see a miss. All
/// single-use correctness is delegated here — the application layer takes no
/// locks of its own.
#[async_trait]
pub trait KvBackend: Send + Sync {
    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<()>;
    async fn get_and_delete(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// In-memory backend used by the test suite.
///
/// A single mutex around the map makes `get_and_delete` trivially atomic.
/// The clock can be shifted forward with [`MemoryBackend::advance`] so
/// expiry paths run without sleeping.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, StoredRecord>>,
    clock_offset: AtomicI64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn now(&self) -> i64 {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;
        wall + self.clock_offset.load(Ordering::Relaxed)
    }

    /// Shift this backend's clock forward, simulating TTL passage.
    pub fn advance(&self, seconds: i64) {
        self.clock_offset.fetch_add(seconds, Ordering::Relaxed);
    }

    /// Plant raw bytes under a key, bypassing the record framing used by
    /// `set_with_ttl` callers. Lets tests simulate corrupted stored data.
    pub fn inject(&self, key: &str, payload: Vec<u8>, ttl_seconds: u64) {
        let now = self.now();
        self.entries
            .lock()
            .insert(key.to_owned(), StoredRecord::new(payload, now, ttl_seconds));
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<()> {
        let now = self.now();
        self.entries
            .lock()
            .insert(key.to_owned(), StoredRecord::new(value.to_vec(), now, ttl_seconds));
        Ok(())
    }

    async fn get_and_delete(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = self.now();
        // Remove-then-inspect keeps the take atomic under the lock; an
        // expired record is evicted either way and reported as a miss.
        match self.entries.lock().remove(key) {
            Some(record) if !record.is_expired(now) => Ok(Some(record.payload)),
            _ => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
