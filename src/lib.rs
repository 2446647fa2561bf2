//! # NestDB - Composite-Index Traversal Engine
//!
//! NestDB stores a logical N-dimensional index as a tree of nested buckets
//! inside an ordered key/value store, and gives you a flat cursor over it:
//! first/last/next/prev/seek/skip across all N dimensions, forward or
//! reverse, with optional prefix pinning.
//!
//! ## Quick Start
//!
//! ```
//! use nestdb::{put, Cursor, MemStore};
//!
//! let store = MemStore::new();
//! let mut tx = store.begin_write();
//!
//! put(&mut tx, b"posts", &[b"2024".as_slice(), b"03", b"14"], b"pi day").unwrap();
//! put(&mut tx, b"posts", &[b"2024".as_slice(), b"12", b"25"], b"xmas").unwrap();
//!
//! let mut cur = Cursor::new(tx, b"posts".as_slice(), 3, false);
//! cur.init(&[b"2024".as_slice()]).unwrap();
//!
//! let mut titles = Vec::new();
//! let mut hit = cur.first();
//! while let Some((_keys, payload)) = hit {
//!     titles.push(payload);
//!     hit = cur.next();
//! }
//! assert_eq!(titles, vec![b"pi day".to_vec(), b"xmas".to_vec()]);
//! cur.commit().unwrap();
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │   index::Cursor   (N-level traversal)     │
//! │   index::put/get/del  (chain mutation)    │
//! ├───────────────────────────────────────────┤
//! │   index::path   (handles, link checks)    │
//! ├───────────────────────────────────────────┤
//! │   store::BucketCursor (per-bucket walk)   │
//! ├───────────────────────────────────────────┤
//! │   store::KvTx   (transaction contract)    │
//! │   store::MemStore  (reference backend)    │
//! └───────────────────────────────────────────┘
//! ```
//!
//! The engine is generic over [`store::KvTx`]; any transactional bucket
//! store with byte-ordered keys can host an index. [`store::MemStore`] is
//! the bundled in-memory implementation.
//!
//! ## Semantics In Brief
//!
//! - Composite keys compare dimension by dimension, byte-lexicographically.
//! - Interior levels link to sub-buckets through fresh 128-bit handles;
//!   [`del`] garbage-collects emptied sub-buckets bottom-up so the chain
//!   never dangles.
//! - Cursor misses (`None`) roll the in-memory cursor state back to the
//!   pre-call position; structural faults are latched and read via
//!   [`Cursor::err`].
//! - A pinned prefix (set at [`Cursor::init`]) confines every subsequent
//!   operation, including seeks, to that slice of the index.

pub mod error;
pub mod index;
pub mod store;

pub use error::Error;
pub use index::{del, get, put, Cursor, KeyPath};
pub use store::{BucketCursor, Entry, KvTx, MemStore, MemTx};
