//! Cursormap - two associative containers with bidirectional cursors.
//!
//! * [ChainedHashMap] - a hash map with a fixed number of buckets, each a
//!   doubly linked chain of entries. No rehashing ever occurs.
//! * [TreeMap] - an ordered map over an unbalanced binary search tree with
//!   parent links. No rebalancing ever occurs.
//!
//! Both offer the same contract through the [CursorMap] trait: indexed
//! access that inserts a default value, lookup-only access that fails with
//! [MapError::NotFound], keyed and cursor based removal, and cursors that
//! can be advanced and retreated over the entries. They also provide the
//! usual Rust iterators, which walk the same order as the cursors.
//!
//! Nodes of both maps live in a slot arena and are addressed by handles
//! carrying a generation, so a cursor to a removed entry is reported as an
//! error rather than aliasing whatever reuses its slot.
//!
//! # Features
//!
//! * `foldhash` - use `foldhash` as the default hasher for [ChainedHashMap]
//! * `ahash` - use the cpu accelerated `ahash` as the default hasher
//! * `serde` - serialise and deserialise both maps as maps
//!
//! `foldhash` is enabled by default. With neither hasher feature, the
//! standard library `RandomState` is used.

#![warn(unused_extern_crates)]
#![warn(missing_docs)]

mod arena;
pub mod cursor;
pub mod error;
pub mod hashmap;
pub mod treemap;

#[cfg(feature = "serde")]
mod utils;

pub use cursor::CursorMap;
pub use error::{MapError, MapResult};
pub use hashmap::ChainedHashMap;
pub use treemap::TreeMap;
