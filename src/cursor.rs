//! The cursor contract shared by [ChainedHashMap](crate::hashmap::ChainedHashMap)
//! and [TreeMap](crate::treemap::TreeMap).
//!
//! A cursor is a small `Copy` value naming one position in one container:
//! either an entry, or the end position one past the last entry. Cursors do
//! not borrow the container, all movement and access goes through the
//! container's methods, which check that the cursor was issued by that very
//! container and that its entry still exists.
//!
//! # Validity
//!
//! A cursor is valid until the next structural mutation (insert of a new key,
//! removal, clear) of its container. The one exception is the cursor passed
//! to `remove_at`: its position is consumed by the call. Updating a value in
//! place is not a structural mutation.
//!
//! Using a cursor after its entry was removed is not supported. It is always
//! detected and reported as an error instead of reading another entry, but
//! cursors to other, still present entries may have shifted position
//! relative to `begin()` and `end()`.
//!
//! Advancing the end cursor, or retreating from the first entry, is an error
//! rather than a wrap-around.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::MapResult;

static NEXT_MAP_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one container instance, used to reject cursors handed to a
/// container that did not issue them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MapId(u64);

impl MapId {
    pub(crate) fn next() -> Self {
        MapId(NEXT_MAP_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// The operations both maps provide, so callers can drive either container
/// through the same code.
pub trait CursorMap<K, V> {
    /// Position type for this container.
    type Cursor: Copy + Eq + std::fmt::Debug;

    /// Number of entries.
    fn len(&self) -> usize;

    /// `true` if the map holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Indexed access: the value for `key`, inserting `V::default()` first
    /// if the key is absent.
    fn get_or_default(&mut self, key: K) -> &mut V
    where
        V: Default;

    /// The value for an existing key, or [MapError::NotFound](crate::MapError::NotFound).
    fn value_of(&self, key: &K) -> MapResult<&V>;

    /// Mutable variant of [value_of](CursorMap::value_of).
    fn value_of_mut(&mut self, key: &K) -> MapResult<&mut V>;

    /// Cursor at `key`, or the end cursor if absent.
    fn find(&self, key: &K) -> Self::Cursor;

    /// Remove `key`, returning its value.
    fn remove(&mut self, key: &K) -> MapResult<V>;

    /// Remove the entry under `cursor`, consuming its position.
    fn remove_at(&mut self, cursor: Self::Cursor) -> MapResult<(K, V)>;

    /// Cursor at the first entry, equal to `end()` if the map is empty.
    fn begin(&self) -> Self::Cursor;

    /// The end cursor.
    fn end(&self) -> Self::Cursor;

    /// Move to the following position.
    fn advance(&self, cursor: Self::Cursor) -> MapResult<Self::Cursor>;

    /// Move to the preceding position.
    fn retreat(&self, cursor: Self::Cursor) -> MapResult<Self::Cursor>;

    /// Read the entry under `cursor`.
    fn entry_at(&self, cursor: Self::Cursor) -> MapResult<(&K, &V)>;

    /// Read the entry under `cursor` with a mutable value.
    fn entry_at_mut(&mut self, cursor: Self::Cursor) -> MapResult<(&K, &mut V)>;
}
