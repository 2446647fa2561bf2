//! # Composite-Key Mutation
//!
//! Put/get/delete over an N-level composite key, maintaining the
//! nested-bucket encoding and its invariants:
//!
//! - every interior entry links to a sub-bucket that exists and is
//!   non-empty
//! - no sub-bucket at any level is empty
//! - one handle per interior key (links are reused, never duplicated)
//!
//! [`put`] grows the chain lazily, allocating a fresh handle per missing
//! interior level. [`del`] is the other half of the bargain: after removing
//! the leaf entry it prunes emptied sub-buckets bottom-up, unlinking each
//! from its parent, so that no traversal can ever descend into a hollow
//! branch. The outer named bucket is never deleted, only its contents.

use eyre::{bail, ensure, Result};
use tracing::{debug, trace};

use crate::error::Error;
use crate::index::path;
use crate::store::KvTx;

/// Stores `payload` under the composite key `keys`, creating any missing
/// levels of the chain.
///
/// Overwrites an existing payload at the same composite key. Fails with
/// [`Error::MissingKeys`] when `keys` is empty.
pub fn put<T: KvTx>(tx: &mut T, bucket: &[u8], keys: &[&[u8]], payload: &[u8]) -> Result<()> {
    ensure!(!keys.is_empty(), Error::MissingKeys);
    trace!(
        bucket = %String::from_utf8_lossy(bucket),
        depth = keys.len(),
        "index put"
    );

    tx.create_bucket_if_not_exists(bucket)?;
    let mut current = bucket.to_vec();
    for key in &keys[..keys.len() - 1] {
        let handle = match path::descend(tx, &current, key)? {
            Some(handle) => handle,
            None => {
                let handle = path::alloc_handle();
                tx.put(&current, key, &handle)?;
                handle
            }
        };
        // The link may exist without its bucket when a retried put replays
        // over a partially applied chain; adopt whatever is there.
        tx.create_bucket_if_not_exists(&handle)?;
        current = handle;
    }
    tx.put(&current, keys[keys.len() - 1], payload)
}

/// Fetches the payload stored under the composite key `keys`.
///
/// Fails with [`Error::KeyNotFound`] when any level of the path is absent,
/// and [`Error::MissingKeys`] when `keys` is empty.
pub fn get<T: KvTx>(tx: &T, bucket: &[u8], keys: &[&[u8]]) -> Result<Vec<u8>> {
    ensure!(!keys.is_empty(), Error::MissingKeys);
    ensure!(tx.bucket_exists(bucket), Error::KeyNotFound);

    let mut current = bucket.to_vec();
    for key in &keys[..keys.len() - 1] {
        match path::descend(tx, &current, key)? {
            Some(handle) => current = handle,
            None => bail!(Error::KeyNotFound),
        }
    }
    match tx.get(&current, keys[keys.len() - 1])? {
        Some(payload) => Ok(payload),
        None => bail!(Error::KeyNotFound),
    }
}

/// Deletes the composite key `keys`, pruning emptied sub-buckets up the
/// chain.
///
/// Fails with [`Error::KeyNotFound`] when the path is absent at any level,
/// and [`Error::MissingKeys`] when `keys` is empty.
pub fn del<T: KvTx>(tx: &mut T, bucket: &[u8], keys: &[&[u8]]) -> Result<()> {
    ensure!(!keys.is_empty(), Error::MissingKeys);
    ensure!(tx.bucket_exists(bucket), Error::KeyNotFound);
    trace!(
        bucket = %String::from_utf8_lossy(bucket),
        depth = keys.len(),
        "index del"
    );

    // Record the bucket-name chain before touching anything.
    let depth = keys.len();
    let mut names: Vec<Vec<u8>> = Vec::with_capacity(depth);
    names.push(bucket.to_vec());
    for i in 0..depth - 1 {
        match path::descend(tx, &names[i], keys[i])? {
            Some(handle) => names.push(handle),
            None => bail!(Error::KeyNotFound),
        }
    }
    ensure!(
        tx.get(&names[depth - 1], keys[depth - 1])?.is_some(),
        Error::KeyNotFound
    );

    // Bottom-up: drop the entry, then reclaim the bucket if that emptied
    // it, which in turn unlinks it from the level above.
    for level in (0..depth).rev() {
        tx.delete(&names[level], keys[level])?;
        if tx.key_count(&names[level])? > 0 || level == 0 {
            break;
        }
        tx.delete_bucket(&names[level])?;
        debug!(level, "pruned empty sub-bucket");
    }
    Ok(())
}
