//! # Index Engine
//!
//! A logical N-dimensional index stored as a tree of nested buckets of
//! depth N. The outer bucket keys the first dimension; each interior entry
//! holds a freshly allocated handle naming the sub-bucket for the next
//! dimension; the deepest level holds the user payloads. Because every
//! bucket keeps its keys in byte order, the induced order over composite
//! keys is the N-tuple lexicographic order, which is what the cursor
//! walks.
//!
//! ```text
//! outer "posts"        2024 -> h1
//!                      2025 -> h2
//! bucket h1            01 -> h3        (months of 2024)
//! bucket h3            05 -> payload   (days of 2024-01)
//! ```
//!
//! ## Module Organization
//!
//! - `path`: handle allocation and interior-link validation
//! - `mutation`: [`put`]/[`get`]/[`del`] over composite keys
//! - `cursor`: [`Cursor`], the flat traversal surface
//!
//! Mutation and traversal share one transaction; mutations become visible
//! to a cursor on the same transaction in its subsequent operations.

mod cursor;
mod mutation;
mod path;

pub use cursor::{Cursor, KeyPath};
pub use mutation::{del, get, put};
