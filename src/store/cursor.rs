//! Per-bucket positional cursor.
//!
//! A [`BucketCursor`] is an explicit position record: the bucket name plus
//! where in its keyspace the cursor currently stands. Every movement is
//! re-expressed as a seek against the transaction, so the whole cursor is a
//! small plain value: `Clone` is a faithful snapshot of the position, which
//! is what the composite cursor's save/restore machinery relies on.

use eyre::Result;

use crate::store::{Entry, KvTx};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Position {
    /// Fresh cursor, never positioned.
    Unpositioned,
    /// Standing on (or at the site of) this key.
    On(Vec<u8>),
    /// Walked past the smallest key.
    BeforeFirst,
    /// Walked past the greatest key.
    AfterLast,
}

/// A stateful cursor over one bucket's ordered keyspace.
///
/// Movement from `Unpositioned` is defined: `next` starts at the first
/// entry, `prev` at the last. Once exhausted in a direction the cursor
/// stays exhausted until repositioned by `first`/`last`/`seek`.
#[derive(Debug, Clone)]
pub struct BucketCursor {
    bucket: Vec<u8>,
    pos: Position,
}

impl BucketCursor {
    pub fn new(bucket: Vec<u8>) -> Self {
        Self {
            bucket,
            pos: Position::Unpositioned,
        }
    }

    /// Name of the bucket this cursor walks.
    pub fn bucket(&self) -> &[u8] {
        &self.bucket
    }

    /// Positions on the smallest entry.
    pub fn first<T: KvTx>(&mut self, tx: &T) -> Result<Option<Entry>> {
        self.settle(tx.first_entry(&self.bucket)?, Position::AfterLast)
    }

    /// Positions on the greatest entry.
    pub fn last<T: KvTx>(&mut self, tx: &T) -> Result<Option<Entry>> {
        self.settle(tx.last_entry(&self.bucket)?, Position::BeforeFirst)
    }

    /// Moves to the next entry in byte order.
    ///
    /// The step is anchored on the current key, not on live iterator
    /// state, so it remains correct if that key was deleted meanwhile.
    pub fn next<T: KvTx>(&mut self, tx: &T) -> Result<Option<Entry>> {
        match std::mem::replace(&mut self.pos, Position::Unpositioned) {
            Position::Unpositioned | Position::BeforeFirst => self.first(tx),
            Position::On(key) => {
                self.settle(tx.next_entry(&self.bucket, &key)?, Position::AfterLast)
            }
            Position::AfterLast => {
                self.pos = Position::AfterLast;
                Ok(None)
            }
        }
    }

    /// Moves to the previous entry in byte order.
    pub fn prev<T: KvTx>(&mut self, tx: &T) -> Result<Option<Entry>> {
        match std::mem::replace(&mut self.pos, Position::Unpositioned) {
            Position::Unpositioned | Position::AfterLast => self.last(tx),
            Position::On(key) => {
                self.settle(tx.prev_entry(&self.bucket, &key)?, Position::BeforeFirst)
            }
            Position::BeforeFirst => {
                self.pos = Position::BeforeFirst;
                Ok(None)
            }
        }
    }

    /// Positions on the smallest entry with key >= `from`.
    pub fn seek<T: KvTx>(&mut self, tx: &T, from: &[u8]) -> Result<Option<Entry>> {
        self.settle(tx.seek_entry(&self.bucket, from)?, Position::AfterLast)
    }

    fn settle(&mut self, entry: Option<Entry>, exhausted: Position) -> Result<Option<Entry>> {
        match entry {
            Some((key, value)) => {
                self.pos = Position::On(key.clone());
                Ok(Some((key, value)))
            }
            None => {
                self.pos = exhausted;
                Ok(None)
            }
        }
    }
}
