// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ordered key-value record store backed by redb (pure Rust, ACID).
//!
//! Every profile, wallet, account and device record lives in one ordered
//! table keyed by namespaced strings (see [`super::keys`]). Prefix-scoped
//! enumeration is a range scan that stops at the first key outside the
//! prefix.
//!
//! ## Table Layout
//!
//! - `records`: namespaced key → value bytes (JSON for entities, raw key
//!   bytes for index entries)
//! - `checkpoints`: name → u64 big-endian (chain listener progress)
//!
//! ## Atomicity
//!
//! [`WriteBatch`] is the only atomicity primitive. A batch is applied in a
//! single redb write transaction; `commit()` is the durability point.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{de::DeserializeOwned, Serialize};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: namespaced key → value bytes.
const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

/// Listener state: checkpoint name → u64 big-endian.
const CHECKPOINTS: TableDefinition<&str, &[u8]> = TableDefinition::new("checkpoints");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

pub type KvResult<T> = Result<T, KvError>;

// =============================================================================
// Write Batch
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Set(String, Vec<u8>),
    Delete(String),
}

/// Accumulated set/delete operations applied atomically by
/// [`RecordStore::write`].
#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(BatchOp::Set(key.into(), value.into()));
        self
    }

    pub fn set_json<T: Serialize>(&mut self, key: impl Into<String>, value: &T) -> KvResult<&mut Self> {
        let bytes = serde_json::to_vec(value)?;
        Ok(self.set(key, bytes))
    }

    pub fn delete(&mut self, key: impl Into<String>) -> &mut Self {
        self.ops.push(BatchOp::Delete(key.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }
}

// =============================================================================
// RecordStore trait
// =============================================================================

/// Ordered key-value store with prefix iteration and atomic batches.
///
/// Calls may block on local disk I/O.
pub trait RecordStore: Send + Sync {
    fn get(&self, key: &str) -> KvResult<Option<Vec<u8>>>;

    fn has(&self, key: &str) -> KvResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// All `(key, value)` pairs whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &str) -> KvResult<Vec<(String, Vec<u8>)>>;

    /// Apply every operation of `batch` in one transaction.
    fn write(&self, batch: WriteBatch) -> KvResult<()>;

    fn checkpoint(&self, name: &str) -> KvResult<u64>;

    fn set_checkpoint(&self, name: &str, value: u64) -> KvResult<()>;
}

impl dyn RecordStore + '_ {
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> KvResult<Option<T>> {
        match self.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Single-key write, for records that need no companion entries.
    pub fn put_json<T: Serialize>(&self, key: &str, value: &T) -> KvResult<()> {
        let mut batch = WriteBatch::new();
        batch.set_json(key, value)?;
        self.write(batch)
    }
}

// =============================================================================
// RedbRecordStore
// =============================================================================

/// Embedded ACID record store.
pub struct RedbRecordStore {
    db: Database,
}

impl RedbRecordStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> KvResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(RECORDS)?;
            let _ = write_txn.open_table(CHECKPOINTS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }
}

impl RecordStore for RedbRecordStore {
    fn get(&self, key: &str) -> KvResult<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECORDS)?;
        Ok(table.get(key)?.map(|v| v.value().to_vec()))
    }

    fn scan_prefix(&self, prefix: &str) -> KvResult<Vec<(String, Vec<u8>)>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECORDS)?;

        let mut out = Vec::new();
        for entry in table.range(prefix..)? {
            let (key, value) = entry?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            out.push((key.to_string(), value.value().to_vec()));
        }
        Ok(out)
    }

    fn write(&self, batch: WriteBatch) -> KvResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(RECORDS)?;
            for op in &batch.ops {
                match op {
                    BatchOp::Set(key, value) => {
                        table.insert(key.as_str(), value.as_slice())?;
                    }
                    BatchOp::Delete(key) => {
                        table.remove(key.as_str())?;
                    }
                }
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn checkpoint(&self, name: &str) -> KvResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CHECKPOINTS)?;
        match table.get(name)? {
            Some(v) => {
                let bytes = v.value();
                Ok(match <[u8; 8]>::try_from(bytes) {
                    Ok(be) => u64::from_be_bytes(be),
                    Err(_) => 0,
                })
            }
            None => Ok(0),
        }
    }

    fn set_checkpoint(&self, name: &str, value: u64) -> KvResult<()> {
        let bytes = value.to_be_bytes();
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CHECKPOINTS)?;
            table.insert(name, bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (RedbRecordStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbRecordStore::open(&dir.path().join("records.redb")).unwrap();
        (store, dir)
    }

    #[test]
    fn batch_sets_and_deletes_atomically() {
        let (store, _dir) = temp_store();

        let mut batch = WriteBatch::new();
        batch.set("profiles:1", b"a".to_vec()).set("profiles:1:wallet", b"b".to_vec());
        store.write(batch).unwrap();

        assert_eq!(store.get("profiles:1").unwrap(), Some(b"a".to_vec()));
        assert!(store.has("profiles:1:wallet").unwrap());

        let mut batch = WriteBatch::new();
        batch.delete("profiles:1:wallet").set("profiles:1", b"c".to_vec());
        store.write(batch).unwrap();

        assert!(!store.has("profiles:1:wallet").unwrap());
        assert_eq!(store.get("profiles:1").unwrap(), Some(b"c".to_vec()));
    }

    #[test]
    fn scan_prefix_stays_inside_namespace() {
        let (store, _dir) = temp_store();

        let mut batch = WriteBatch::new();
        batch
            .set("profiles:1:hd-accounts:0xaa", b"1".to_vec())
            .set("profiles:1:hd-accounts:0xbb", b"2".to_vec())
            .set("profiles:1:imported-accounts:0xcc", b"3".to_vec())
            .set("profiles:10:hd-accounts:0xdd", b"4".to_vec());
        store.write(batch).unwrap();

        let hd = store.scan_prefix("profiles:1:hd-accounts:").unwrap();
        let keys: Vec<_> = hd.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec!["profiles:1:hd-accounts:0xaa", "profiles:1:hd-accounts:0xbb"]
        );

        assert!(store.scan_prefix("profiles:2:").unwrap().is_empty());
    }

    #[test]
    fn json_helpers_round_trip_through_dyn() {
        let (store, _dir) = temp_store();
        let store: &dyn RecordStore = &store;

        store.put_json("profiles:7", &serde_json::json!({"id": "7"})).unwrap();
        let value: Option<serde_json::Value> = store.get_json("profiles:7").unwrap();
        assert_eq!(value.unwrap()["id"], "7");

        let missing: Option<serde_json::Value> = store.get_json("profiles:8").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn checkpoints_default_to_zero() {
        let (store, _dir) = temp_store();
        assert_eq!(store.checkpoint("asset_events").unwrap(), 0);

        store.set_checkpoint("asset_events", 99_999).unwrap();
        assert_eq!(store.checkpoint("asset_events").unwrap(), 99_999);
    }
}
