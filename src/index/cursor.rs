//! # Composite Cursor
//!
//! This module implements the flat traversal surface over an N-level
//! nested-bucket index: First/Last/Next/Prev/Seek/Skip, forward or
//! reverse, with optional prefix pinning.
//!
//! ## Cursor Anatomy
//!
//! A [`Cursor`] owns the transaction and a per-level vector of
//! [`BucketCursor`]s: slot 0 walks the outer bucket, slot `i+1` walks the
//! sub-bucket linked from slot `i`'s current entry. A parallel vector
//! caches the key under each level, so emitting a result is a matter of
//! collecting the cached keys top-to-bottom plus the leaf value.
//!
//! ```text
//! levels[0]  outer bucket      k0 -> handle ----+
//! levels[1]  bucket(handle)    k1 -> handle'    |  opened on descend
//! levels[2]  bucket(handle')   k2 -> payload <--+
//! ```
//!
//! ## Orientation
//!
//! A reverse cursor runs the same machinery with the physical primitives
//! swapped: logical "next" maps to the store's `prev`, logical "first" to
//! the store's `last`, and so on. Every traversal routine below is written
//! against the logical direction ([`Dir`]); `level_step`/`level_edge` are
//! the only two places the `reverse` flag is consulted.
//!
//! ## Pinning
//!
//! `init` may freeze the first p dimensions. Pinned levels are seeked once
//! at init and never moved again; traversal treats level p as the topmost
//! free level and stops backtracking there. Seek overrides the caller's
//! first p key components with the pinned values, so no argument can
//! escape the pin.
//!
//! ## Speculative Moves
//!
//! Every public traversal call snapshots the level cursors and cached keys
//! first, and restores them whenever the call comes back empty (or faults).
//! A failed seek or an exhausted next therefore leaves the cursor exactly
//! where it was, which is what makes `for kv = c.first(); ...; kv = c.next()`
//! loops safe to resume after probing.
//!
//! ## Faults
//!
//! Exhaustion is not an error: traversal calls return `Option` and `None`
//! just means "nothing there". Structural faults discovered mid-walk (an
//! interior link whose sub-bucket is missing or empty, a malformed link, a
//! wrong-arity seek) are latched on the cursor and handed out by
//! [`Cursor::err`], which clears the latch.

use eyre::{bail, ensure, Report, Result};
use smallvec::SmallVec;
use tracing::debug;

use crate::error::Error;
use crate::index::path;
use crate::store::{BucketCursor, Entry, KvTx};

/// A materialized composite key, one byte string per level.
pub type KeyPath = SmallVec<[Vec<u8>; 8]>;

/// Logical traversal direction, before orientation is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dir {
    Next,
    Prev,
}

/// A stateful cursor over an N-level composite index.
///
/// Bound to exactly one transaction: created with [`Cursor::new`], armed
/// with [`Cursor::init`], finalized by [`Cursor::commit`] or
/// [`Cursor::rollback`]. All traversal calls take `&mut self`; exclusive
/// access is the borrow checker's problem, not a lock's.
pub struct Cursor<T: KvTx> {
    tx: T,
    bucket: Vec<u8>,
    depth: usize,
    reverse: bool,
    levels: Vec<Option<BucketCursor>>,
    keys: Vec<Option<Vec<u8>>>,
    saved_levels: Vec<Option<BucketCursor>>,
    saved_keys: Vec<Option<Vec<u8>>>,
    pin: Vec<Vec<u8>>,
    deferred: Option<Report>,
    finalized: bool,
}

impl<T: KvTx> Cursor<T> {
    /// Creates a cursor over `bucket` with `depth` key dimensions.
    ///
    /// With `reverse` set, first/next walk from the greatest composite key
    /// downwards and last/prev from the smallest upwards.
    pub fn new(tx: T, bucket: impl Into<Vec<u8>>, depth: usize, reverse: bool) -> Self {
        Self {
            tx,
            bucket: bucket.into(),
            depth,
            reverse,
            levels: Vec::new(),
            keys: Vec::new(),
            saved_levels: Vec::new(),
            saved_keys: Vec::new(),
            pin: Vec::new(),
            deferred: None,
            finalized: false,
        }
    }

    /// Opens the outer bucket and optionally pins a key prefix.
    ///
    /// Each prefix key must match an existing entry exactly
    /// ([`Error::KeyNotFound`] otherwise); at most `depth - 1` dimensions
    /// can be pinned ([`Error::InvalidKeyCount`]). A missing outer bucket
    /// is [`Error::InvalidBucket`].
    pub fn init(&mut self, prefix: &[&[u8]]) -> Result<()> {
        ensure!(!self.finalized, Error::AlreadyFinalized);
        ensure!(self.depth >= 1, "cursor depth must be at least 1");
        ensure!(
            self.tx.bucket_exists(&self.bucket),
            Error::InvalidBucket {
                bucket: self.bucket.clone(),
            }
        );
        ensure!(
            prefix.len() < self.depth,
            Error::InvalidKeyCount {
                limit: self.depth - 1,
                got: prefix.len(),
            }
        );

        self.levels = vec![None; self.depth];
        self.keys = vec![None; self.depth];
        self.saved_levels = vec![None; self.depth];
        self.saved_keys = vec![None; self.depth];
        self.levels[0] = Some(BucketCursor::new(self.bucket.clone()));
        self.pin.clear();

        for (i, key) in prefix.iter().enumerate() {
            let hit = match self.levels[i].as_mut() {
                Some(cur) => cur.seek(&self.tx, key)?,
                None => None,
            };
            let Some((found, link)) = hit else {
                bail!(Error::KeyNotFound);
            };
            ensure!(found == *key, Error::KeyNotFound);
            self.keys[i] = Some(found);
            self.open_child(i + 1, &link)?;
        }
        self.pin = prefix.iter().map(|key| key.to_vec()).collect();

        debug!(
            bucket = %String::from_utf8_lossy(&self.bucket),
            depth = self.depth,
            pinned = self.pin.len(),
            reverse = self.reverse,
            "cursor initialized"
        );
        Ok(())
    }

    /// The transaction this cursor traverses.
    pub fn tx(&self) -> &T {
        &self.tx
    }

    /// Mutable access to the transaction, e.g. to interleave writes with
    /// traversal inside one writable transaction.
    pub fn tx_mut(&mut self) -> &mut T {
        &mut self.tx
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn reverse(&self) -> bool {
        self.reverse
    }

    /// Moves to the oriented first record within the pin.
    pub fn first(&mut self) -> Option<(KeyPath, Vec<u8>)> {
        self.guarded(|c| c.edge_inner(Dir::Next))
    }

    /// Moves to the oriented last record within the pin.
    pub fn last(&mut self) -> Option<(KeyPath, Vec<u8>)> {
        self.guarded(|c| c.edge_inner(Dir::Prev))
    }

    /// Advances to the strictly following composite key.
    pub fn next(&mut self) -> Option<(KeyPath, Vec<u8>)> {
        self.guarded(|c| c.advance_inner(Dir::Next))
    }

    /// Advances to the strictly preceding composite key.
    pub fn prev(&mut self) -> Option<(KeyPath, Vec<u8>)> {
        self.guarded(|c| c.advance_inner(Dir::Prev))
    }

    /// Positions at the smallest (greatest, when reversed) composite key
    /// at or beyond `keys` along the free dimensions.
    ///
    /// Pinned dimensions in `keys` are ignored: the pin is authoritative.
    /// Expects exactly `depth` keys; a wrong count latches
    /// [`Error::InvalidKeyCount`].
    pub fn seek(&mut self, keys: &[&[u8]]) -> Option<(KeyPath, Vec<u8>)> {
        self.guarded(|c| c.seek_inner(keys))
    }

    /// Returns the record at offset `count` from the oriented start of the
    /// pinned slice, or `None` when the slice has fewer records.
    pub fn skip(&mut self, count: u64) -> Option<(KeyPath, Vec<u8>)> {
        self.guarded(|c| c.skip_inner(count))
    }

    /// Takes the deferred traversal fault, if any, clearing the latch.
    pub fn err(&mut self) -> Option<Report> {
        self.deferred.take()
    }

    /// Finalizes the transaction: commits it when writable, rolls it back
    /// otherwise. Fails with [`Error::AlreadyFinalized`] on reuse.
    pub fn commit(&mut self) -> Result<()> {
        ensure!(!self.finalized, Error::AlreadyFinalized);
        if self.tx.writable() {
            self.tx.commit()?;
        } else {
            self.tx.rollback()?;
        }
        self.finalized = true;
        Ok(())
    }

    /// Rolls the transaction back. Fails with [`Error::AlreadyFinalized`]
    /// on reuse.
    pub fn rollback(&mut self) -> Result<()> {
        ensure!(!self.finalized, Error::AlreadyFinalized);
        self.tx.rollback()?;
        self.finalized = true;
        Ok(())
    }

    // ---- traversal internals -------------------------------------------

    fn pinned(&self) -> usize {
        self.pin.len()
    }

    /// Runs one speculative operation: snapshot, try, restore on miss.
    fn guarded<F>(&mut self, op: F) -> Option<(KeyPath, Vec<u8>)>
    where
        F: FnOnce(&mut Self) -> Result<Option<Vec<u8>>>,
    {
        if self.finalized {
            self.deferred = Some(Report::new(Error::AlreadyFinalized));
            return None;
        }
        if self.levels.is_empty() || self.levels[0].is_none() {
            self.deferred = Some(eyre::eyre!("cursor used before init"));
            return None;
        }

        self.save_state();
        match op(self) {
            Ok(Some(payload)) => match self.collect_path() {
                Ok(path) => Some((path, payload)),
                Err(err) => {
                    self.deferred = Some(err);
                    self.restore_state();
                    None
                }
            },
            Ok(None) => {
                self.restore_state();
                None
            }
            Err(err) => {
                self.deferred = Some(err);
                self.restore_state();
                None
            }
        }
    }

    fn save_state(&mut self) {
        self.saved_levels.clone_from(&self.levels);
        self.saved_keys.clone_from(&self.keys);
    }

    fn restore_state(&mut self) {
        self.levels.clone_from(&self.saved_levels);
        self.keys.clone_from(&self.saved_keys);
    }

    fn collect_path(&self) -> Result<KeyPath> {
        let mut keypath = KeyPath::with_capacity(self.depth);
        for (i, key) in self.keys.iter().enumerate() {
            match key {
                Some(key) => keypath.push(key.clone()),
                None => bail!("cursor level {i} has no cached key"),
            }
        }
        Ok(keypath)
    }

    /// Installs the level-`level` cursor over the sub-bucket named by an
    /// interior link, verifying the chain on the way down.
    fn open_child(&mut self, level: usize, link: &[u8]) -> Result<()> {
        let name = path::link_handle(link)?;
        ensure!(
            self.tx.bucket_exists(name),
            Error::BrokenChain {
                link: name.to_vec(),
            }
        );
        self.levels[level] = Some(BucketCursor::new(name.to_vec()));
        Ok(())
    }

    /// One oriented step of the level-`i` cursor.
    fn level_step(&mut self, i: usize, dir: Dir) -> Result<Option<Entry>> {
        let forward = (dir == Dir::Next) != self.reverse;
        let Some(cur) = self.levels[i].as_mut() else {
            bail!("cursor level {i} is not open");
        };
        if forward {
            cur.next(&self.tx)
        } else {
            cur.prev(&self.tx)
        }
    }

    /// Oriented start (`Dir::Next`) or end (`Dir::Prev`) of level `i`.
    fn level_edge(&mut self, i: usize, dir: Dir) -> Result<Option<Entry>> {
        let forward = (dir == Dir::Next) != self.reverse;
        let Some(cur) = self.levels[i].as_mut() else {
            bail!("cursor level {i} is not open");
        };
        if forward {
            cur.first(&self.tx)
        } else {
            cur.last(&self.tx)
        }
    }

    /// Orientation-free >= seek of the level-`i` cursor.
    fn level_seek(&mut self, i: usize, key: &[u8]) -> Result<Option<Entry>> {
        let Some(cur) = self.levels[i].as_mut() else {
            bail!("cursor level {i} is not open");
        };
        cur.seek(&self.tx, key)
    }

    /// Physical greatest entry of level `i`, regardless of orientation.
    fn level_raw_last(&mut self, i: usize) -> Result<Option<Entry>> {
        let Some(cur) = self.levels[i].as_mut() else {
            bail!("cursor level {i} is not open");
        };
        cur.last(&self.tx)
    }

    fn level_name(&self, i: usize) -> Vec<u8> {
        self.levels[i]
            .as_ref()
            .map(|cur| cur.bucket().to_vec())
            .unwrap_or_default()
    }

    /// First/Last: positions every free level at its oriented edge.
    ///
    /// An empty level means the pinned slice holds no records; that is a
    /// plain miss, not a fault.
    fn edge_inner(&mut self, dir: Dir) -> Result<Option<Vec<u8>>> {
        let mut payload = None;
        for i in self.pinned()..self.depth {
            match self.level_edge(i, dir)? {
                None => return Ok(None),
                Some((key, value)) => {
                    self.keys[i] = Some(key);
                    if i + 1 < self.depth {
                        self.open_child(i + 1, &value)?;
                    } else {
                        payload = Some(value);
                    }
                }
            }
        }
        Ok(payload)
    }

    /// Next/Prev: one oriented step in the composite order.
    fn advance_inner(&mut self, dir: Dir) -> Result<Option<Vec<u8>>> {
        let leaf = self.depth - 1;

        // Levels below the deepest opened one have never been positioned
        // (init with no first/last yet); advancing the deepest open level
        // starts them from the oriented edge.
        let mut top = leaf;
        while self.levels[top].is_none() {
            top -= 1;
        }
        if top < leaf {
            return self.back_step(top, dir);
        }

        match self.level_step(leaf, dir)? {
            Some((key, value)) => {
                self.keys[leaf] = Some(key);
                Ok(Some(value))
            }
            None => {
                if leaf > self.pinned() {
                    self.back_step(leaf - 1, dir)
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// Backtracking walk: advances level `start`, climbing toward the pin
    /// while levels are exhausted, then descends back to the leaf.
    fn back_step(&mut self, start: usize, dir: Dir) -> Result<Option<Vec<u8>>> {
        if start < self.pinned() {
            return Ok(None);
        }
        let mut i = start;
        loop {
            match self.level_step(i, dir)? {
                None => {
                    if i <= self.pinned() {
                        return Ok(None);
                    }
                    i -= 1;
                }
                Some((key, value)) => {
                    self.keys[i] = Some(key);
                    if i + 1 == self.depth {
                        return Ok(Some(value));
                    }
                    self.open_child(i + 1, &value)?;
                    return self.reset_descend(i + 1, dir);
                }
            }
        }
    }

    /// After a level advanced, repositions every deeper level at its
    /// oriented edge down to the leaf.
    ///
    /// An empty sub-bucket here is a violated invariant, not exhaustion:
    /// put/del never leave a linked bucket hollow.
    fn reset_descend(&mut self, start: usize, dir: Dir) -> Result<Option<Vec<u8>>> {
        let mut i = start;
        loop {
            match self.level_edge(i, dir)? {
                None => bail!(Error::BrokenChain {
                    link: self.level_name(i),
                }),
                Some((key, value)) => {
                    self.keys[i] = Some(key);
                    if i + 1 == self.depth {
                        return Ok(Some(value));
                    }
                    self.open_child(i + 1, &value)?;
                    i += 1;
                }
            }
        }
    }

    fn seek_inner(&mut self, keys: &[&[u8]]) -> Result<Option<Vec<u8>>> {
        ensure!(
            keys.len() == self.depth,
            Error::InvalidKeyCount {
                limit: self.depth,
                got: keys.len(),
            }
        );

        let pinned = self.pinned();
        let mut want: Vec<Vec<u8>> = keys.iter().map(|key| key.to_vec()).collect();
        for (w, p) in want.iter_mut().zip(self.pin.iter()) {
            // the pin is authoritative over caller-supplied dimensions
            w.clone_from(p);
        }

        let leaf = self.depth - 1;
        let mut payload = None;
        for i in pinned..self.depth {
            match self.level_seek(i, &want[i])? {
                Some((key, value)) => {
                    self.keys[i] = Some(key);
                    if i < leaf {
                        self.open_child(i + 1, &value)?;
                    } else {
                        payload = Some(value);
                    }
                }
                None => {
                    if i == 0 {
                        return Ok(None);
                    }
                    // Compared against the stale cached key, like the rest
                    // of the pin-escape rule: with a pin, overshooting the
                    // current branch wraps instead of walking out of it.
                    let overshoot = pinned > 0
                        && want[i].as_slice() > self.keys[i].as_deref().unwrap_or(&[]);
                    if self.reverse {
                        if overshoot {
                            return self.advance_inner(Dir::Next);
                        }
                        return match self.level_raw_last(i)? {
                            None => Ok(None),
                            Some((key, value)) => {
                                self.keys[i] = Some(key);
                                if i < leaf {
                                    self.open_child(i + 1, &value)?;
                                    self.reset_descend(i + 1, Dir::Next)
                                } else {
                                    Ok(Some(value))
                                }
                            }
                        };
                    }
                    if overshoot {
                        return self.edge_inner(Dir::Prev);
                    }
                    return self.back_step(i - 1, Dir::Next);
                }
            }
        }
        Ok(payload)
    }

    fn skip_inner(&mut self, count: u64) -> Result<Option<Vec<u8>>> {
        let pinned = self.pinned();
        let leaf = self.depth - 1;

        // Line up every free level above the leaf at its oriented start.
        for i in pinned..leaf {
            match self.level_edge(i, Dir::Next)? {
                None => return Ok(None),
                Some((key, value)) => {
                    self.keys[i] = Some(key);
                    self.open_child(i + 1, &value)?;
                }
            }
        }

        let mut remaining = count;
        loop {
            // Count through the current leaf bucket.
            let mut entry = self.level_edge(leaf, Dir::Next)?;
            while let Some((key, value)) = entry {
                if remaining == 0 {
                    self.keys[leaf] = Some(key);
                    return Ok(Some(value));
                }
                remaining -= 1;
                entry = self.level_step(leaf, Dir::Next)?;
            }

            // Leaf exhausted: advance the nearest ancestor with entries
            // left and re-line the levels beneath it.
            let mut advanced = false;
            for i in (pinned..leaf).rev() {
                if let Some((key, value)) = self.level_step(i, Dir::Next)? {
                    self.keys[i] = Some(key);
                    self.open_child(i + 1, &value)?;
                    for j in i + 1..leaf {
                        match self.level_edge(j, Dir::Next)? {
                            None => bail!(Error::BrokenChain {
                                link: self.level_name(j),
                            }),
                            Some((kj, vj)) => {
                                self.keys[j] = Some(kj);
                                self.open_child(j + 1, &vj)?;
                            }
                        }
                    }
                    advanced = true;
                    break;
                }
            }
            if !advanced {
                return Ok(None);
            }
        }
    }
}
