//! # Error Types
//!
//! Typed failures for the index engine and the bundled store backend.
//!
//! All fallible operations in this crate return `eyre::Result`. The variants
//! below are the conditions callers are expected to branch on; recover them
//! from a report with `report.downcast_ref::<Error>()`. Everything else
//! (wrapped store faults, internal inconsistencies) stays an opaque report.

use std::fmt;

/// Error conditions surfaced by index and store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The named outer bucket does not exist at cursor init time.
    InvalidBucket { bucket: Vec<u8> },
    /// Exact-match lookup failed: a get, a delete path, or a cursor
    /// init prefix named a key that is not present.
    KeyNotFound,
    /// An operation was given an empty composite-key vector.
    MissingKeys,
    /// The number of keys does not fit the cursor's depth.
    InvalidKeyCount { limit: usize, got: usize },
    /// An interior link names a sub-bucket that is missing, empty, or
    /// malformed. This means the index invariants were violated.
    BrokenChain { link: Vec<u8> },
    /// The transaction behind this cursor was already committed or
    /// rolled back.
    AlreadyFinalized,
    /// A bucket with this name already exists.
    BucketExists { bucket: Vec<u8> },
    /// The named bucket does not exist.
    BucketMissing { bucket: Vec<u8> },
    /// A write was attempted through a read-only transaction.
    ReadOnly,
}

fn name(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidBucket { bucket } => {
                write!(f, "invalid bucket '{}'", name(bucket))
            }
            Error::KeyNotFound => write!(f, "key not found"),
            Error::MissingKeys => write!(f, "no keys"),
            Error::InvalidKeyCount { limit, got } => {
                write!(f, "invalid number of keys: got {got}, limit {limit}")
            }
            Error::BrokenChain { link } => {
                write!(f, "broken index chain at link '{}'", name(link))
            }
            Error::AlreadyFinalized => {
                write!(f, "transaction already committed or rolled back")
            }
            Error::BucketExists { bucket } => {
                write!(f, "bucket '{}' already exists", name(bucket))
            }
            Error::BucketMissing { bucket } => {
                write!(f, "bucket '{}' not found", name(bucket))
            }
            Error::ReadOnly => write!(f, "transaction is read-only"),
        }
    }
}

impl std::error::Error for Error {}
