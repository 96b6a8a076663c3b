//! # Durable Fund Storage
//!
//! The persistence layer for the fund's durable ledger, built on sled's
//! embedded key-value store.
//!
//! ## Tree Layout
//!
//! | Tree      | Key                  | Value                      |
//! |-----------|----------------------|----------------------------|
//! | `batches` | batch id (8B BE)     | `bincode(Batch)`           |
//! | `meta`    | key (UTF-8)          | value (bytes / bincode)    |
//!
//! Batch ids are stored as big-endian u64 so sled's lexicographic ordering
//! matches numeric ordering — loading the batch array is a single ordered
//! scan.
//!
//! ## Atomicity
//!
//! A [`FundSnapshot`] is written as one `sled::Batch` per tree followed by
//! an explicit flush: either the whole snapshot lands on disk or none of
//! it does. Batches are never deleted, so overwriting by id is always
//! correct.

use sled::{Batch as SledBatch, Db, Tree};
use std::path::Path;

use crate::nav::TokenValuation;
use crate::queue::Batch;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupt store: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Well-known keys in the `meta` tree.
const META_HEAD: &[u8] = b"queue_head";
const META_VALUATION: &[u8] = b"token_valuation";
const META_FUND_ID: &[u8] = b"fund_id";

/// The durable image of a fund: everything that must survive a restart.
#[derive(Clone, Debug)]
pub struct FundSnapshot {
    /// Queue head (tail is implied by the batch count).
    pub head: u64,
    /// Every batch ever created, in id order.
    pub batches: Vec<Batch>,
    /// The NAV record.
    pub valuation: TokenValuation,
}

/// Persistent storage for a single fund instance.
///
/// Wraps a sled `Db` and exposes typed save/load for the fund snapshot.
/// All serialization uses bincode.
#[derive(Debug, Clone)]
pub struct FundStore {
    db: Db,
    batches: Tree,
    meta: Tree,
}

impl FundStore {
    /// Opens or creates a store at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Creates a temporary store that lives in memory and is cleaned up
    /// when dropped. Ideal for tests.
    pub fn open_temporary() -> StoreResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let batches = db.open_tree("batches")?;
        let meta = db.open_tree("meta")?;
        Ok(Self { db, batches, meta })
    }

    /// Persists a snapshot: all batches, the queue head, and the NAV
    /// record, in one atomic batch per tree, flushed before returning.
    pub fn save(&self, fund_id: &str, snapshot: &FundSnapshot) -> StoreResult<()> {
        let mut batch_writes = SledBatch::default();
        for batch in &snapshot.batches {
            let bytes = bincode::serialize(batch)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            batch_writes.insert(&batch.id.to_be_bytes(), bytes);
        }
        self.batches.apply_batch(batch_writes)?;

        let valuation_bytes = bincode::serialize(&snapshot.valuation)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut meta_writes = SledBatch::default();
        meta_writes.insert(META_HEAD, &snapshot.head.to_be_bytes());
        meta_writes.insert(META_VALUATION, valuation_bytes);
        meta_writes.insert(META_FUND_ID, fund_id.as_bytes());
        self.meta.apply_batch(meta_writes)?;

        self.db.flush()?;
        Ok(())
    }

    /// Loads the persisted snapshot, or `None` if the store has never
    /// been written.
    pub fn load(&self) -> StoreResult<Option<FundSnapshot>> {
        let head = match self.meta.get(META_HEAD)? {
            Some(bytes) => u64::from_be_bytes(
                bytes
                    .as_ref()
                    .try_into()
                    .map_err(|_| StoreError::Corrupt("invalid head bytes".into()))?,
            ),
            None => return Ok(None),
        };

        let valuation_bytes = self
            .meta
            .get(META_VALUATION)?
            .ok_or_else(|| StoreError::Corrupt("missing valuation record".into()))?;
        let valuation: TokenValuation = bincode::deserialize(&valuation_bytes)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut batches = Vec::with_capacity(self.batches.len());
        for entry in self.batches.iter() {
            let (_key, value) = entry?;
            let batch: Batch = bincode::deserialize(&value)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            batches.push(batch);
        }
        // The BE keys guarantee ascending order; verify the ids form the
        // contiguous array the queue expects.
        for (index, batch) in batches.iter().enumerate() {
            if batch.id != index as u64 {
                return Err(StoreError::Corrupt(format!(
                    "batch id {} at position {index}",
                    batch.id
                )));
            }
        }
        if head > batches.len() as u64 {
            return Err(StoreError::Corrupt(format!(
                "head {head} beyond tail {}",
                batches.len()
            )));
        }

        Ok(Some(FundSnapshot {
            head,
            batches,
            valuation,
        }))
    }

    /// The fund id this store was last saved for, if any.
    pub fn fund_id(&self) -> StoreResult<Option<String>> {
        Ok(self
            .meta
            .get(META_FUND_ID)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Number of persisted batches.
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Forces a flush of pending writes to disk.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::INITIAL_NAV;
    use crate::nav::NavAccount;
    use crate::queue::BatchQueue;
    use chrono::NaiveDate;

    fn sample_snapshot() -> FundSnapshot {
        let mut queue = BatchQueue::new();
        queue.create_batch();
        queue.create_batch();
        queue.add_request("alice", 700).unwrap();
        queue.add_request("bob", 300).unwrap();

        let nav = NavAccount::new(INITIAL_NAV, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        FundSnapshot {
            head: 0,
            batches: queue.batches().to_vec(),
            valuation: nav.valuation().clone(),
        }
    }

    #[test]
    fn empty_store_loads_none() {
        let store = FundStore::open_temporary().unwrap();
        assert!(store.load().unwrap().is_none());
        assert!(store.fund_id().unwrap().is_none());
        assert_eq!(store.batch_count(), 0);
    }

    #[test]
    fn save_load_roundtrip() {
        let store = FundStore::open_temporary().unwrap();
        let snapshot = sample_snapshot();
        store.save("fund-1", &snapshot).unwrap();

        let loaded = store.load().unwrap().expect("snapshot persisted");
        assert_eq!(loaded.head, 0);
        assert_eq!(loaded.batches.len(), 2);
        assert_eq!(loaded.batches[1].tokens_pending(), 1_000);
        assert_eq!(loaded.batches[1].pending_for("alice"), 700);
        assert_eq!(loaded.batches[1].users(), ["alice", "bob"]);
        assert_eq!(loaded.valuation.nav, INITIAL_NAV);
        assert_eq!(store.fund_id().unwrap().as_deref(), Some("fund-1"));
    }

    #[test]
    fn save_overwrites_by_id() {
        let store = FundStore::open_temporary().unwrap();
        let mut snapshot = sample_snapshot();
        store.save("fund-1", &snapshot).unwrap();

        // Settle bob and advance head; save again.
        snapshot.batches[1].settle("bob", 300).unwrap();
        snapshot.batches[1].settle("alice", 700).unwrap();
        snapshot.head = 2;
        store.save("fund-1", &snapshot).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.head, 2);
        assert_eq!(loaded.batches.len(), 2);
        assert!(loaded.batches[1].is_exhausted());
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let store = FundStore::open(dir.path()).unwrap();
            store.save("fund-1", &sample_snapshot()).unwrap();
        }
        let store = FundStore::open(dir.path()).unwrap();
        let loaded = store.load().unwrap().expect("snapshot survived reopen");
        assert_eq!(loaded.batches.len(), 2);
        assert_eq!(loaded.batches[1].tokens_pending(), 1_000);
    }

    #[test]
    fn corrupt_head_detected() {
        let store = FundStore::open_temporary().unwrap();
        store.save("fund-1", &sample_snapshot()).unwrap();
        // Head pointing past the tail must be rejected on load.
        store.meta.insert(META_HEAD, &9u64.to_be_bytes()).unwrap();
        assert!(matches!(store.load(), Err(StoreError::Corrupt(_))));
    }
}
