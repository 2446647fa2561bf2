//! # Store Layer
//!
//! This module defines the key/value transaction contract the index engine
//! is built on, plus the bundled in-memory reference backend.
//!
//! ## The Contract
//!
//! The engine never talks to a database directly; it goes through [`KvTx`],
//! a transaction over named buckets of byte keys and byte values. Two
//! properties of the contract are load-bearing and every implementation
//! must preserve them:
//!
//! 1. **Ordering**: within a bucket, keys sort by unsigned byte
//!    lexicographic order. The navigation primitives (`first_entry`,
//!    `next_entry`, `seek_entry`, ...) all speak that order. The induced
//!    total order over composite keys is what makes multi-level traversal
//!    coherent.
//!
//! 2. **Re-seekable positions**: navigation is expressed relative to a key
//!    (`next_entry(bucket, after)` is "least key strictly greater than
//!    `after`"), not relative to hidden iterator state. This lets
//!    [`BucketCursor`] represent a cursor position as a small plain value
//!    that can be cloned for snapshot/restore and re-seeked to reproduce
//!    the position, even after the underlying entry was deleted.
//!
//! ## Transactions
//!
//! Transactions follow the usual embedded-store discipline: many concurrent
//! readers, one writer, each reader seeing a consistent snapshot. A
//! transaction is finalized exactly once, by `commit` or `rollback`;
//! committing a read-only transaction is an error at this layer (the index
//! cursor maps it to a rollback, see [`crate::index::Cursor::commit`]).
//!
//! ## Module Organization
//!
//! - `mod.rs`: the [`KvTx`] trait
//! - `mem`: [`MemStore`]/[`MemTx`], the in-memory reference backend
//! - `cursor`: [`BucketCursor`], the per-bucket positional cursor

use eyre::Result;

mod cursor;
mod mem;

pub use cursor::BucketCursor;
pub use mem::{MemStore, MemTx};

/// A key/value pair read out of a bucket.
pub type Entry = (Vec<u8>, Vec<u8>);

/// A transaction over an ordered, bucketed key/value store.
///
/// Key ops and navigation primitives on a bucket that does not exist fail
/// with [`crate::Error::BucketMissing`]. Mutating methods on a read-only
/// transaction fail with [`crate::Error::ReadOnly`].
pub trait KvTx {
    /// Whether this transaction accepts writes.
    fn writable(&self) -> bool;

    /// Publishes the transaction's changes and finalizes it.
    fn commit(&mut self) -> Result<()>;

    /// Discards the transaction's changes and finalizes it.
    fn rollback(&mut self) -> Result<()>;

    fn bucket_exists(&self, bucket: &[u8]) -> bool;

    /// Creates a bucket, failing with [`crate::Error::BucketExists`] if a
    /// bucket with this name is already present.
    fn create_bucket(&mut self, bucket: &[u8]) -> Result<()>;

    fn create_bucket_if_not_exists(&mut self, bucket: &[u8]) -> Result<()>;

    /// Removes a bucket and everything in it.
    fn delete_bucket(&mut self, bucket: &[u8]) -> Result<()>;

    /// Number of keys currently stored in the bucket.
    fn key_count(&self, bucket: &[u8]) -> Result<u64>;

    fn get(&self, bucket: &[u8], key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn put(&mut self, bucket: &[u8], key: &[u8], value: &[u8]) -> Result<()>;

    /// Deletes a key. Deleting an absent key is a no-op.
    fn delete(&mut self, bucket: &[u8], key: &[u8]) -> Result<()>;

    /// The smallest entry in the bucket.
    fn first_entry(&self, bucket: &[u8]) -> Result<Option<Entry>>;

    /// The greatest entry in the bucket.
    fn last_entry(&self, bucket: &[u8]) -> Result<Option<Entry>>;

    /// The smallest entry with key strictly greater than `after`.
    fn next_entry(&self, bucket: &[u8], after: &[u8]) -> Result<Option<Entry>>;

    /// The greatest entry with key strictly less than `before`.
    fn prev_entry(&self, bucket: &[u8], before: &[u8]) -> Result<Option<Entry>>;

    /// The smallest entry with key greater than or equal to `from`.
    fn seek_entry(&self, bucket: &[u8], from: &[u8]) -> Result<Option<Entry>>;
}

impl<T: KvTx + ?Sized> KvTx for &mut T {
    fn writable(&self) -> bool {
        (**self).writable()
    }

    fn commit(&mut self) -> Result<()> {
        (**self).commit()
    }

    fn rollback(&mut self) -> Result<()> {
        (**self).rollback()
    }

    fn bucket_exists(&self, bucket: &[u8]) -> bool {
        (**self).bucket_exists(bucket)
    }

    fn create_bucket(&mut self, bucket: &[u8]) -> Result<()> {
        (**self).create_bucket(bucket)
    }

    fn create_bucket_if_not_exists(&mut self, bucket: &[u8]) -> Result<()> {
        (**self).create_bucket_if_not_exists(bucket)
    }

    fn delete_bucket(&mut self, bucket: &[u8]) -> Result<()> {
        (**self).delete_bucket(bucket)
    }

    fn key_count(&self, bucket: &[u8]) -> Result<u64> {
        (**self).key_count(bucket)
    }

    fn get(&self, bucket: &[u8], key: &[u8]) -> Result<Option<Vec<u8>>> {
        (**self).get(bucket, key)
    }

    fn put(&mut self, bucket: &[u8], key: &[u8], value: &[u8]) -> Result<()> {
        (**self).put(bucket, key, value)
    }

    fn delete(&mut self, bucket: &[u8], key: &[u8]) -> Result<()> {
        (**self).delete(bucket, key)
    }

    fn first_entry(&self, bucket: &[u8]) -> Result<Option<Entry>> {
        (**self).first_entry(bucket)
    }

    fn last_entry(&self, bucket: &[u8]) -> Result<Option<Entry>> {
        (**self).last_entry(bucket)
    }

    fn next_entry(&self, bucket: &[u8], after: &[u8]) -> Result<Option<Entry>> {
        (**self).next_entry(bucket, after)
    }

    fn prev_entry(&self, bucket: &[u8], before: &[u8]) -> Result<Option<Entry>> {
        (**self).prev_entry(bucket, before)
    }

    fn seek_entry(&self, bucket: &[u8], from: &[u8]) -> Result<Option<Entry>> {
        (**self).seek_entry(bucket, from)
    }
}
