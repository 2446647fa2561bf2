//! # In-Memory Reference Backend
//!
//! [`MemStore`] implements the [`KvTx`] contract entirely in memory. It is
//! the backend the test suites and benchmarks run against, and a usable
//! store in its own right for index workloads that fit in RAM.
//!
//! ## Isolation Model
//!
//! Every transaction clones the full bucket table at begin time and works
//! on its private copy. A write transaction additionally holds the store's
//! writer gate (an owned mutex guard) for its whole lifetime, so at most
//! one write transaction exists at a time while readers proceed freely:
//!
//! - readers see the table as of their begin, unaffected by later commits
//! - a writer mutates only its copy; `commit` swaps the copy into the
//!   shared table under a short write lock
//! - `rollback` (or drop) simply discards the copy
//!
//! Cloning the table per transaction is a deliberate simplicity trade:
//! this backend optimizes for being obviously correct, not for large data.
//!
//! ## Ordering
//!
//! Bucket keyspaces are `BTreeMap<Vec<u8>, Vec<u8>>`, whose `Ord` on
//! `Vec<u8>` is exactly the unsigned byte lexicographic order the contract
//! requires. The bucket directory itself is a `hashbrown::HashMap`; bucket
//! names have no ordering obligations.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use eyre::{ensure, Result};
use hashbrown::HashMap;
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex, RwLock};

use crate::error::Error;
use crate::store::{Entry, KvTx};

type Keyspace = BTreeMap<Vec<u8>, Vec<u8>>;
type BucketTable = HashMap<Vec<u8>, Keyspace>;

/// A shared in-memory bucket store. Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    buckets: Arc<RwLock<BucketTable>>,
    writer: Arc<Mutex<()>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins a read-only transaction over a snapshot of the store.
    pub fn begin_read(&self) -> MemTx {
        MemTx {
            buckets: Arc::clone(&self.buckets),
            snapshot: self.buckets.read().clone(),
            write_guard: None,
            finalized: false,
        }
    }

    /// Begins a write transaction, blocking until the current writer (if
    /// any) finalizes.
    pub fn begin_write(&self) -> MemTx {
        let guard = self.writer.lock_arc();
        // Snapshot after the gate is held so the writer starts from the
        // latest committed state.
        MemTx {
            snapshot: self.buckets.read().clone(),
            buckets: Arc::clone(&self.buckets),
            write_guard: Some(guard),
            finalized: false,
        }
    }
}

/// A transaction over a [`MemStore`].
///
/// Dropping an unfinalized transaction rolls it back.
pub struct MemTx {
    buckets: Arc<RwLock<BucketTable>>,
    snapshot: BucketTable,
    write_guard: Option<ArcMutexGuard<RawMutex, ()>>,
    finalized: bool,
}

impl MemTx {
    /// Names of all buckets visible to this transaction, sorted.
    ///
    /// Intended for diagnostics and invariant checks (e.g. asserting that
    /// pruning left no orphan sub-buckets behind).
    pub fn bucket_names(&self) -> Vec<Vec<u8>> {
        let mut names: Vec<Vec<u8>> = self.snapshot.keys().cloned().collect();
        names.sort();
        names
    }

    fn ensure_open(&self) -> Result<()> {
        ensure!(!self.finalized, Error::AlreadyFinalized);
        Ok(())
    }

    fn ensure_writable(&self) -> Result<()> {
        self.ensure_open()?;
        ensure!(self.write_guard.is_some(), Error::ReadOnly);
        Ok(())
    }

    fn keyspace(&self, bucket: &[u8]) -> Result<&Keyspace> {
        self.ensure_open()?;
        match self.snapshot.get(bucket) {
            Some(ks) => Ok(ks),
            None => Err(Error::BucketMissing {
                bucket: bucket.to_vec(),
            }
            .into()),
        }
    }

    fn keyspace_mut(&mut self, bucket: &[u8]) -> Result<&mut Keyspace> {
        self.ensure_writable()?;
        match self.snapshot.get_mut(bucket) {
            Some(ks) => Ok(ks),
            None => Err(Error::BucketMissing {
                bucket: bucket.to_vec(),
            }
            .into()),
        }
    }
}

impl KvTx for MemTx {
    fn writable(&self) -> bool {
        self.write_guard.is_some()
    }

    fn commit(&mut self) -> Result<()> {
        self.ensure_writable()?;
        {
            let mut shared = self.buckets.write();
            *shared = std::mem::take(&mut self.snapshot);
        }
        self.finalized = true;
        self.write_guard = None;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.finalized = true;
        self.write_guard = None;
        Ok(())
    }

    fn bucket_exists(&self, bucket: &[u8]) -> bool {
        !self.finalized && self.snapshot.contains_key(bucket)
    }

    fn create_bucket(&mut self, bucket: &[u8]) -> Result<()> {
        self.ensure_writable()?;
        ensure!(
            !self.snapshot.contains_key(bucket),
            Error::BucketExists {
                bucket: bucket.to_vec(),
            }
        );
        self.snapshot.insert(bucket.to_vec(), Keyspace::new());
        Ok(())
    }

    fn create_bucket_if_not_exists(&mut self, bucket: &[u8]) -> Result<()> {
        self.ensure_writable()?;
        self.snapshot
            .entry(bucket.to_vec())
            .or_insert_with(Keyspace::new);
        Ok(())
    }

    fn delete_bucket(&mut self, bucket: &[u8]) -> Result<()> {
        self.ensure_writable()?;
        ensure!(
            self.snapshot.remove(bucket).is_some(),
            Error::BucketMissing {
                bucket: bucket.to_vec(),
            }
        );
        Ok(())
    }

    fn key_count(&self, bucket: &[u8]) -> Result<u64> {
        Ok(self.keyspace(bucket)?.len() as u64)
    }

    fn get(&self, bucket: &[u8], key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.keyspace(bucket)?.get(key).cloned())
    }

    fn put(&mut self, bucket: &[u8], key: &[u8], value: &[u8]) -> Result<()> {
        self.keyspace_mut(bucket)?
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, bucket: &[u8], key: &[u8]) -> Result<()> {
        self.keyspace_mut(bucket)?.remove(key);
        Ok(())
    }

    fn first_entry(&self, bucket: &[u8]) -> Result<Option<Entry>> {
        Ok(self
            .keyspace(bucket)?
            .iter()
            .next()
            .map(|(k, v)| (k.clone(), v.clone())))
    }

    fn last_entry(&self, bucket: &[u8]) -> Result<Option<Entry>> {
        Ok(self
            .keyspace(bucket)?
            .iter()
            .next_back()
            .map(|(k, v)| (k.clone(), v.clone())))
    }

    fn next_entry(&self, bucket: &[u8], after: &[u8]) -> Result<Option<Entry>> {
        Ok(self
            .keyspace(bucket)?
            .range::<[u8], _>((Bound::Excluded(after), Bound::Unbounded))
            .next()
            .map(|(k, v)| (k.clone(), v.clone())))
    }

    fn prev_entry(&self, bucket: &[u8], before: &[u8]) -> Result<Option<Entry>> {
        Ok(self
            .keyspace(bucket)?
            .range::<[u8], _>((Bound::Unbounded, Bound::Excluded(before)))
            .next_back()
            .map(|(k, v)| (k.clone(), v.clone())))
    }

    fn seek_entry(&self, bucket: &[u8], from: &[u8]) -> Result<Option<Entry>> {
        Ok(self
            .keyspace(bucket)?
            .range::<[u8], _>((Bound::Included(from), Bound::Unbounded))
            .next()
            .map(|(k, v)| (k.clone(), v.clone())))
    }
}

impl Drop for MemTx {
    fn drop(&mut self) {
        // An unfinalized transaction is discarded: the snapshot dies with
        // us and the writer gate (if held) is released by the guard drop.
    }
}
