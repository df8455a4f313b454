use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use tokio::sync::OnceCell;
use tokio::time;
use tracing::{debug, info, warn};

use super::backend::KvBackend;
use super::model::StoredRecord;

const SECRETS: TableDefinition<&str, &[u8]> = TableDefinition::new("secrets");

static SHARED: OnceCell<Arc<RedbBackend>> = OnceCell::const_new();

/// Thread-safe handle to the redb-backed store.
///
/// redb has no native TTL, so every read checks the record's deadline
/// against the wall clock and a background sweep reclaims expired records.
/// A record can therefore never be read past its deadline, swept or not.
#[derive(Clone)]
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    /// Open (or create) the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path).context("open redb database")?;

        let write_txn = db.begin_write()?;
        write_txn.open_table(SECRETS)?;
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Process-wide handle, opened lazily on first use.
    ///
    /// redb takes an exclusive file lock, so all callers must share one
    /// `Database`. Concurrent first calls race safely into a single open;
    /// the handle is reused for the process lifetime.
    pub async fn shared(path: &Path) -> Result<Arc<Self>> {
        let path = path.to_owned();
        SHARED
            .get_or_try_init(|| async move { Ok(Arc::new(Self::open(&path)?)) })
            .await
            .cloned()
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    fn put(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<()> {
        let record = StoredRecord::new(value.to_vec(), Self::now(), ttl_seconds);
        let bytes = encode(&record)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SECRETS)?;
            table.insert(key, bytes.as_slice())?;
        }
        write_txn.commit()?;

        debug!(key = %key, ttl_seconds, "stored record");
        Ok(())
    }

    /// Remove the record and return its payload if it was still live.
    ///
    /// The remove *is* the read — both happen inside one write transaction,
    /// so of two racing takes only one can observe the value. Expired
    /// records are evicted on touch and reported as a miss.
    fn take_at(&self, key: &str, now: i64) -> Result<Option<Vec<u8>>> {
        let write_txn = self.db.begin_write()?;
        let taken = {
            let mut table = write_txn.open_table(SECRETS)?;
            let raw: Option<Vec<u8>> = table.remove(key)?.map(|guard| guard.value().to_vec());
            match raw {
                None => None,
                Some(bytes) => {
                    let record = decode(&bytes)?;
                    if record.is_expired(now) {
                        debug!(key = %key, "evicted expired record on take");
                        None
                    } else {
                        Some(record.payload)
                    }
                }
            }
        };
        write_txn.commit()?;
        Ok(taken)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SECRETS)?;
            table.remove(key)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Remove all expired records. Returns the number removed.
    pub fn prune(&self) -> Result<usize> {
        let now = Self::now();

        // Collect expired keys in a read pass first.
        let expired_keys: Vec<String> = {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(SECRETS)?;
            let mut keys = Vec::new();
            for item in table.iter()? {
                let (k, v) = item?;
                let record = decode(v.value())?;
                if record.is_expired(now) {
                    keys.push(k.value().to_owned());
                }
            }
            keys
        };

        if expired_keys.is_empty() {
            return Ok(0);
        }

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SECRETS)?;
            for key in &expired_keys {
                table.remove(key.as_str())?;
            }
        }
        write_txn.commit()?;

        let removed = expired_keys.len();
        info!(removed, "pruned expired records");
        Ok(removed)
    }

    /// Spawn a background Tokio task that calls `prune()` every `interval`.
    pub fn spawn_sweep(self, interval: Duration) {
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.tick().await; // skip first immediate tick
            loop {
                ticker.tick().await;
                if let Err(e) = self.prune() {
                    warn!(error = %e, "background sweep error");
                }
            }
        });
    }
}

#[async_trait]
impl KvBackend for RedbBackend {
    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<()> {
        self.put(key, value, ttl_seconds)
    }

    async fn get_and_delete(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.take_at(key, Self::now())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.remove(key)
    }
}

fn encode(record: &StoredRecord) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(record, bincode::config::standard()).context("bincode encode")
}

fn decode(bytes: &[u8]) -> Result<StoredRecord> {
    let (record, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .context("bincode decode")?;
    Ok(record)
}
