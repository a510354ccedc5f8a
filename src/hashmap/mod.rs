//! ChainedHashMap - a fixed bucket hash map with separate chaining.
//!
//! The map owns an array of `B` buckets, chosen when the map is built. A key
//! lands in bucket `hash(key) % B`, and every bucket is a doubly linked chain
//! of the entries that landed there, in the order they were inserted. The
//! bucket array is never resized: lookups cost the length of one chain, which
//! grows with the load factor. Growth and rehashing are not provided.
//!
//! Iteration (and cursor movement) walks bucket 0 to `B - 1`, following each
//! chain front to back. That order depends on the hasher and on insertion
//! order, so it is not meaningful to callers beyond being stable while the
//! map is not structurally modified.
//!
//! ```
//! use cursormap::ChainedHashMap;
//!
//! let mut map: ChainedHashMap<u32, char> = ChainedHashMap::new();
//! *map.get_or_default(7) = 'x';
//! assert_eq!(map.value_of(&7), Ok(&'x'));
//!
//! let cursor = map.find(&7);
//! assert_eq!(map.entry_at(cursor), Ok((&7, &'x')));
//! assert_eq!(map.advance(cursor), Ok(map.end()));
//! ```

mod iter;

pub use self::iter::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};

use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::iter::FromIterator;
use std::mem;

#[cfg(feature = "serde")]
use serde::{
    de::{Deserialize, Deserializer},
    ser::{Serialize, SerializeMap, Serializer},
};

use tracing::{debug, trace};

use crate::arena::{Arena, Handle};
use crate::cursor::{CursorMap, MapId};
use crate::error::{MapError, MapResult};
#[cfg(feature = "serde")]
use crate::utils::MapCollector;

#[cfg(feature = "ahash")]
pub use ahash::RandomState as DefaultHashBuilder;

#[cfg(all(feature = "foldhash", not(feature = "ahash")))]
pub use foldhash::fast::RandomState as DefaultHashBuilder;

#[cfg(all(not(feature = "ahash"), not(feature = "foldhash")))]
pub use std::collections::hash_map::RandomState as DefaultHashBuilder;

/// Bucket count used by [ChainedHashMap::new].
pub const DEFAULT_BUCKETS: usize = 1000;

pub(crate) struct ChainNode<K, V> {
    key: K,
    value: V,
    /// The bucket whose chain this node is linked into.
    bucket: usize,
    prev: Option<Handle>,
    next: Option<Handle>,
}

/// A position in a [ChainedHashMap]. See [CursorMap] for the rules on how
/// long a cursor stays usable.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HashCursor {
    map: MapId,
    node: Option<Handle>,
    /// Bucket of `node`, or the bucket count for the end cursor.
    bucket: usize,
}

impl HashCursor {
    /// `true` if this is an end cursor.
    pub fn is_end(&self) -> bool {
        self.node.is_none()
    }
}

/// A hash map with a fixed number of buckets, each holding a doubly linked
/// chain of entries.
///
/// Keys are placed by the map's [BuildHasher] `S`. The default hasher is
/// selected by cargo feature: `ahash`, `foldhash`, otherwise the standard
/// library's `RandomState`.
pub struct ChainedHashMap<K, V, S = DefaultHashBuilder> {
    id: MapId,
    buckets: Box<[Option<Handle>]>,
    nodes: Arena<ChainNode<K, V>>,
    hash_builder: S,
}

impl<K, V> ChainedHashMap<K, V, DefaultHashBuilder> {
    /// Construct an empty map with [DEFAULT_BUCKETS] buckets.
    pub fn new() -> Self {
        Self::with_buckets(DEFAULT_BUCKETS)
    }

    /// Construct an empty map with `buckets` buckets. A count of zero is
    /// treated as one.
    pub fn with_buckets(buckets: usize) -> Self {
        Self::with_buckets_and_hasher(buckets, DefaultHashBuilder::default())
    }
}

impl<K, V, S> ChainedHashMap<K, V, S> {
    /// Construct an empty map with `buckets` buckets, placing keys with
    /// `hash_builder`. A count of zero is treated as one.
    pub fn with_buckets_and_hasher(buckets: usize, hash_builder: S) -> Self {
        let buckets = buckets.max(1);
        ChainedHashMap {
            id: MapId::next(),
            buckets: vec![None; buckets].into_boxed_slice(),
            nodes: Arena::new(),
            hash_builder,
        }
    }

    /// The number of entries in the map.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The fixed number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// The number of entries chained in `bucket`. Out of range buckets are
    /// empty.
    pub fn chain_len(&self, bucket: usize) -> usize {
        let mut count = 0;
        let mut cur = self.buckets.get(bucket).copied().flatten();
        while let Some(h) = cur {
            count += 1;
            cur = self.nodes[h].next;
        }
        count
    }

    /// The map's hasher.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Remove every entry. All outstanding cursors become invalid.
    pub fn clear(&mut self) {
        debug!(len = self.len(), "clear");
        self.buckets.iter_mut().for_each(|head| *head = None);
        self.nodes.clear();
    }

    /// Iterate over the entries in bucket order.
    pub fn iter(&self) -> Iter<'_, K, V, S> {
        Iter::new(self)
    }

    /// Iterate over the entries in bucket order with mutable values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let order: Vec<usize> = self.handles().map(Handle::index).collect();
        IterMut::new(order, self.nodes.slots_mut())
    }

    /// Iterate over the keys in bucket order.
    pub fn keys(&self) -> Keys<'_, K, V, S> {
        Keys::new(self.iter())
    }

    /// Iterate over the values in bucket order.
    pub fn values(&self) -> Values<'_, K, V, S> {
        Values::new(self.iter())
    }

    /// Iterate over mutable values in bucket order.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut::new(self.iter_mut())
    }

    /// Cursor at the head of the first non-empty bucket, or the end cursor.
    pub fn begin(&self) -> HashCursor {
        self.cursor_from(self.first_from(0))
    }

    /// The end cursor.
    pub fn end(&self) -> HashCursor {
        HashCursor {
            map: self.id,
            node: None,
            bucket: self.buckets.len(),
        }
    }

    /// Move `cursor` to the next entry: along its chain, then to the head of
    /// the next non-empty bucket, then to the end.
    pub fn advance(&self, cursor: HashCursor) -> MapResult<HashCursor> {
        match self.check_cursor(cursor)? {
            Some(h) => Ok(self.cursor_from(self.successor(h))),
            None => Err(MapError::InvalidOperation("cannot advance the end cursor")),
        }
    }

    /// Move `cursor` to the previous entry: back along its chain, then to
    /// the tail of the previous non-empty bucket. Retreating from the first
    /// entry is an error.
    pub fn retreat(&self, cursor: HashCursor) -> MapResult<HashCursor> {
        let prev = match self.check_cursor(cursor)? {
            Some(h) => self.predecessor(h),
            None => self.last_before(self.buckets.len()),
        };
        match prev {
            Some(_) => Ok(self.cursor_from(prev)),
            None => Err(MapError::InvalidOperation(
                "cannot retreat before the first entry",
            )),
        }
    }

    /// The entry under `cursor`.
    pub fn entry_at(&self, cursor: HashCursor) -> MapResult<(&K, &V)> {
        let h = self.deref_cursor(cursor)?;
        let node = &self.nodes[h];
        Ok((&node.key, &node.value))
    }

    /// The entry under `cursor`, with its value mutable in place.
    pub fn entry_at_mut(&mut self, cursor: HashCursor) -> MapResult<(&K, &mut V)> {
        let h = self.deref_cursor(cursor)?;
        let node = &mut self.nodes[h];
        Ok((&node.key, &mut node.value))
    }

    /// Remove the entry under `cursor`, returning it.
    pub fn remove_at(&mut self, cursor: HashCursor) -> MapResult<(K, V)> {
        if cursor.map != self.id {
            return Err(MapError::InvalidOperation("cursor belongs to another map"));
        }
        let h = cursor
            .node
            .ok_or(MapError::InvalidOperation("cannot remove the end cursor"))?;
        let node = self
            .unlink(h)
            .ok_or(MapError::InvalidOperation("cursor refers to a removed entry"))?;
        Ok((node.key, node.value))
    }

    fn check_cursor(&self, cursor: HashCursor) -> MapResult<Option<Handle>> {
        if cursor.map != self.id {
            return Err(MapError::InvalidOperation("cursor belongs to another map"));
        }
        match cursor.node {
            Some(h) if !self.nodes.contains(h) => Err(MapError::InvalidOperation(
                "cursor refers to a removed entry",
            )),
            node => Ok(node),
        }
    }

    fn deref_cursor(&self, cursor: HashCursor) -> MapResult<Handle> {
        if cursor.map != self.id {
            return Err(MapError::InvalidOperation("cursor belongs to another map"));
        }
        match cursor.node {
            Some(h) if self.nodes.contains(h) => Ok(h),
            Some(_) => Err(MapError::InvalidDereference("removed entry")),
            None => Err(MapError::InvalidDereference("end cursor")),
        }
    }

    fn cursor_from(&self, pos: Option<(Handle, usize)>) -> HashCursor {
        match pos {
            Some((h, bucket)) => HashCursor {
                map: self.id,
                node: Some(h),
                bucket,
            },
            None => self.end(),
        }
    }

    /// Head of the first non-empty bucket at or after `start`.
    fn first_from(&self, start: usize) -> Option<(Handle, usize)> {
        self.buckets
            .iter()
            .enumerate()
            .skip(start)
            .find_map(|(bucket, head)| head.map(|h| (h, bucket)))
    }

    /// Tail of the last non-empty bucket strictly before `end`.
    fn last_before(&self, end: usize) -> Option<(Handle, usize)> {
        self.buckets[..end]
            .iter()
            .enumerate()
            .rev()
            .find_map(|(bucket, head)| head.map(|h| (self.chain_tail(h), bucket)))
    }

    fn chain_tail(&self, mut h: Handle) -> Handle {
        while let Some(next) = self.nodes[h].next {
            h = next;
        }
        h
    }

    pub(crate) fn successor(&self, h: Handle) -> Option<(Handle, usize)> {
        let node = &self.nodes[h];
        match node.next {
            Some(next) => Some((next, node.bucket)),
            None => self.first_from(node.bucket + 1),
        }
    }

    pub(crate) fn predecessor(&self, h: Handle) -> Option<(Handle, usize)> {
        let node = &self.nodes[h];
        match node.prev {
            Some(prev) => Some((prev, node.bucket)),
            None => self.last_before(node.bucket),
        }
    }

    pub(crate) fn first(&self) -> Option<(Handle, usize)> {
        self.first_from(0)
    }

    pub(crate) fn last(&self) -> Option<(Handle, usize)> {
        self.last_before(self.buckets.len())
    }

    pub(crate) fn node(&self, h: Handle) -> &ChainNode<K, V> {
        &self.nodes[h]
    }

    fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        std::iter::successors(self.first(), move |(h, _)| self.successor(*h)).map(|(h, _)| h)
    }

    /// Detach `h` from its chain and release it. The bucket head is rewired
    /// when `h` was first in its chain, otherwise the neighbour links are.
    fn unlink(&mut self, h: Handle) -> Option<ChainNode<K, V>> {
        let node = self.nodes.remove(h)?;
        match node.prev {
            Some(prev) => self.nodes[prev].next = node.next,
            None => self.buckets[node.bucket] = node.next,
        }
        if let Some(next) = node.next {
            self.nodes[next].prev = node.prev;
        }
        trace!(bucket = node.bucket, len = self.nodes.len(), "chain remove");
        Some(node)
    }

    fn link_tail(&mut self, bucket: usize, tail: Option<Handle>, key: K, value: V) -> Handle {
        let h = self.nodes.insert(ChainNode {
            key,
            value,
            bucket,
            prev: tail,
            next: None,
        });
        match tail {
            Some(t) => self.nodes[t].next = Some(h),
            None => self.buckets[bucket] = Some(h),
        }
        trace!(bucket, len = self.nodes.len(), "chain insert");
        h
    }
}

impl<K, V, S> ChainedHashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn bucket_of<Q>(&self, k: &Q) -> usize
    where
        Q: Hash + ?Sized,
    {
        (self.hash_builder.hash_one(k) % self.buckets.len() as u64) as usize
    }

    /// Walk the chain of `bucket` looking for `k`. On a miss, yields the
    /// chain's tail so a new node can be appended.
    fn locate<Q>(&self, bucket: usize, k: &Q) -> Result<Handle, Option<Handle>>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let mut tail = None;
        let mut cur = self.buckets[bucket];
        while let Some(h) = cur {
            let node = &self.nodes[h];
            if node.key.borrow() == k {
                return Ok(h);
            }
            tail = Some(h);
            cur = node.next;
        }
        Err(tail)
    }

    fn find_node<Q>(&self, k: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.locate(self.bucket_of(k), k).ok()
    }

    /// Indexed access: the value for `key`, appending a new entry holding
    /// `V::default()` to the tail of its bucket's chain if absent.
    pub fn get_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        let bucket = self.bucket_of(&key);
        let h = match self.locate(bucket, &key) {
            Ok(h) => h,
            Err(tail) => self.link_tail(bucket, tail, key, V::default()),
        };
        &mut self.nodes[h].value
    }

    /// Insert `value` under `key`, returning the previous value if the key
    /// was present. The key already stored is kept.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let bucket = self.bucket_of(&key);
        match self.locate(bucket, &key) {
            Ok(h) => Some(mem::replace(&mut self.nodes[h].value, value)),
            Err(tail) => {
                self.link_tail(bucket, tail, key, value);
                None
            }
        }
    }

    /// The value for `k`, if present.
    pub fn get<Q>(&self, k: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find_node(k).map(|h| &self.nodes[h].value)
    }

    /// The mutable value for `k`, if present.
    pub fn get_mut<Q>(&mut self, k: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.find_node(k) {
            Some(h) => Some(&mut self.nodes[h].value),
            None => None,
        }
    }

    /// `true` if `k` is present.
    pub fn contains_key<Q>(&self, k: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find_node(k).is_some()
    }

    /// The value for an existing key. Never inserts.
    pub fn value_of<Q>(&self, k: &Q) -> MapResult<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(k).ok_or(MapError::NotFound)
    }

    /// The mutable value for an existing key. Never inserts.
    pub fn value_of_mut<Q>(&mut self, k: &Q) -> MapResult<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_mut(k).ok_or(MapError::NotFound)
    }

    /// Cursor at `k`, or the end cursor.
    pub fn find<Q>(&self, k: &Q) -> HashCursor
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let bucket = self.bucket_of(k);
        match self.locate(bucket, k) {
            Ok(h) => HashCursor {
                map: self.id,
                node: Some(h),
                bucket,
            },
            Err(_) => self.end(),
        }
    }

    /// Remove `k`, returning its value. Removing an absent key is an
    /// invalid operation, just as removing at the end cursor is.
    pub fn remove<Q>(&mut self, k: &Q) -> MapResult<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find_node(k)
            .and_then(|h| self.unlink(h))
            .map(|node| node.value)
            .ok_or(MapError::InvalidOperation("cannot remove an absent key"))
    }

    /// Check the structure: every chain is doubly linked consistently, every
    /// node sits in the bucket its key hashes to, and the entry count
    /// matches the chains.
    pub fn verify(&self) -> bool {
        let mut seen = 0;
        for (bucket, head) in self.buckets.iter().enumerate() {
            let mut prev = None;
            let mut cur = *head;
            while let Some(h) = cur {
                let node = match self.nodes.get(h) {
                    Some(node) => node,
                    None => return false,
                };
                if node.bucket != bucket || node.prev != prev || self.bucket_of(&node.key) != bucket
                {
                    return false;
                }
                seen += 1;
                if seen > self.nodes.len() {
                    return false;
                }
                prev = Some(h);
                cur = node.next;
            }
        }
        seen == self.nodes.len()
    }
}

impl<K, V, S> CursorMap<K, V> for ChainedHashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    type Cursor = HashCursor;

    fn len(&self) -> usize {
        ChainedHashMap::len(self)
    }

    fn get_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        ChainedHashMap::get_or_default(self, key)
    }

    fn value_of(&self, key: &K) -> MapResult<&V> {
        ChainedHashMap::value_of(self, key)
    }

    fn value_of_mut(&mut self, key: &K) -> MapResult<&mut V> {
        ChainedHashMap::value_of_mut(self, key)
    }

    fn find(&self, key: &K) -> HashCursor {
        ChainedHashMap::find(self, key)
    }

    fn remove(&mut self, key: &K) -> MapResult<V> {
        ChainedHashMap::remove(self, key)
    }

    fn remove_at(&mut self, cursor: HashCursor) -> MapResult<(K, V)> {
        ChainedHashMap::remove_at(self, cursor)
    }

    fn begin(&self) -> HashCursor {
        ChainedHashMap::begin(self)
    }

    fn end(&self) -> HashCursor {
        ChainedHashMap::end(self)
    }

    fn advance(&self, cursor: HashCursor) -> MapResult<HashCursor> {
        ChainedHashMap::advance(self, cursor)
    }

    fn retreat(&self, cursor: HashCursor) -> MapResult<HashCursor> {
        ChainedHashMap::retreat(self, cursor)
    }

    fn entry_at(&self, cursor: HashCursor) -> MapResult<(&K, &V)> {
        ChainedHashMap::entry_at(self, cursor)
    }

    fn entry_at_mut(&mut self, cursor: HashCursor) -> MapResult<(&K, &mut V)> {
        ChainedHashMap::entry_at_mut(self, cursor)
    }
}

impl<K, V, S: Default> Default for ChainedHashMap<K, V, S> {
    fn default() -> Self {
        Self::with_buckets_and_hasher(DEFAULT_BUCKETS, S::default())
    }
}

impl<K, V, S> Clone for ChainedHashMap<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    /// Re-insert every entry, bucket by bucket, into a fresh map sharing
    /// this map's bucket count and hasher. Chain order is preserved.
    fn clone(&self) -> Self {
        debug!(len = self.len(), "clone");
        let mut map = Self::with_buckets_and_hasher(self.bucket_count(), self.hash_builder.clone());
        map.nodes = Arena::with_capacity(self.len());
        for (k, v) in self.iter() {
            map.insert(k.clone(), v.clone());
        }
        map
    }
}

/// Two maps are equal when they hold the same keys mapped to equal values.
/// Bucket count, hasher and iteration order play no part.
impl<K, V, S> PartialEq for ChainedHashMap<K, V, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K, V, S> Eq for ChainedHashMap<K, V, S>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
{
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for ChainedHashMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> FromIterator<(K, V)> for ChainedHashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        map.extend(iter);
        map
    }
}

impl<K, V, S> Extend<(K, V)> for ChainedHashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        iter.into_iter().for_each(|(k, v)| {
            let _ = self.insert(k, v);
        });
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for ChainedHashMap<K, V, DefaultHashBuilder>
where
    K: Hash + Eq,
{
    fn from(arr: [(K, V); N]) -> Self {
        Self::from_iter(arr)
    }
}

impl<K, V, S> IntoIterator for ChainedHashMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> IntoIter<K, V> {
        let order: Vec<usize> = self.handles().map(Handle::index).collect();
        IntoIter::new(order, self.nodes.into_slots())
    }
}

impl<'a, K, V, S> IntoIterator for &'a ChainedHashMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, S>;

    fn into_iter(self) -> Iter<'a, K, V, S> {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut ChainedHashMap<K, V, S> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}

#[cfg(feature = "serde")]
impl<K, V, S> Serialize for ChainedHashMap<K, V, S>
where
    K: Serialize,
    V: Serialize,
{
    fn serialize<Ser>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error>
    where
        Ser: Serializer,
    {
        let mut state = serializer.serialize_map(Some(self.len()))?;

        for (key, val) in self.iter() {
            state.serialize_entry(key, val)?;
        }

        state.end()
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V, S> Deserialize<'de> for ChainedHashMap<K, V, S>
where
    K: Deserialize<'de> + Hash + Eq,
    V: Deserialize<'de>,
    S: BuildHasher + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(MapCollector::new())
    }
}

#[cfg(test)]
mod tests {
    use super::{ChainedHashMap, DEFAULT_BUCKETS};
    use crate::cursor::CursorMap;
    use crate::error::MapError;
    use std::hash::BuildHasherDefault;
    use std::hash::Hasher;

    /// Hashes integers to themselves, so bucket placement is predictable.
    #[derive(Default)]
    struct IdentityHasher(u64);

    impl Hasher for IdentityHasher {
        fn finish(&self) -> u64 {
            self.0
        }

        fn write(&mut self, bytes: &[u8]) {
            for b in bytes {
                self.0 = (self.0 << 8) | u64::from(*b);
            }
        }

        fn write_u64(&mut self, i: u64) {
            self.0 = i;
        }

        fn write_usize(&mut self, i: usize) {
            self.0 = i as u64;
        }

        fn write_u32(&mut self, i: u32) {
            self.0 = u64::from(i);
        }
    }

    type IdMap<V> = ChainedHashMap<u64, V, BuildHasherDefault<IdentityHasher>>;

    fn id_map<V>(buckets: usize) -> IdMap<V> {
        ChainedHashMap::with_buckets_and_hasher(buckets, BuildHasherDefault::default())
    }

    #[test]
    fn test_hashmap_basic_write() {
        let _ = tracing_subscriber::fmt::try_init();
        let mut map: ChainedHashMap<usize, usize> = ChainedHashMap::new();
        assert!(map.is_empty());
        assert!(map.bucket_count() == DEFAULT_BUCKETS);

        *map.get_or_default(10) = 10;
        *map.get_or_default(15) = 15;
        assert!(map.len() == 2);

        assert!(map.contains_key(&10));
        assert!(map.contains_key(&15));
        assert!(!map.contains_key(&20));

        assert!(map.value_of(&10) == Ok(&10));
        {
            let v = map.value_of_mut(&10).unwrap();
            *v = 11;
        }
        assert!(map.value_of(&10) == Ok(&11));
        assert!(map.len() == 2);

        assert!(map.remove(&10) == Ok(11));
        assert!(!map.contains_key(&10));
        assert!(map.contains_key(&15));
        assert!(map.find(&10) == map.end());

        assert!(map.remove(&30).is_err());

        map.clear();
        assert!(map.is_empty());
        assert!(!map.contains_key(&15));
        assert!(map.verify());
    }

    #[test]
    fn test_hashmap_default_value_on_index() {
        let mut map: ChainedHashMap<&str, String> = ChainedHashMap::new();
        assert!(map.get_or_default("a").is_empty());
        map.get_or_default("a").push_str("xyz");
        map.get_or_default("a").push('!');
        assert!(map.value_of("a").map(String::as_str) == Ok("xyz!"));
        assert!(map.len() == 1);
    }

    #[test]
    fn test_hashmap_value_of_empty() {
        let mut map: ChainedHashMap<u32, u32> = ChainedHashMap::new();
        assert!(map.value_of(&0) == Err(MapError::NotFound));
        assert!(map.value_of_mut(&0) == Err(MapError::NotFound));
        // Lookup never inserts.
        assert!(map.is_empty());
    }

    #[test]
    fn test_hashmap_insert_overwrite() {
        let mut map: ChainedHashMap<u32, char> = ChainedHashMap::new();
        assert!(map.insert(1, 'a').is_none());
        assert!(map.insert(1, 'b') == Some('a'));
        assert!(map.len() == 1);
        assert!(map.get(&1) == Some(&'b'));
    }

    #[test]
    fn test_hashmap_find_roundtrip() {
        let mut map: ChainedHashMap<u32, u32> = (0..50).map(|v| (v, v * 2)).collect();
        for k in 0..50 {
            let c = map.find(&k);
            assert!(!c.is_end());
            let (fk, fv) = map.entry_at(c).unwrap();
            assert!(*fk == k);
            assert!(*fv == k * 2);
        }
        let c = map.find(&3);
        *map.entry_at_mut(c).unwrap().1 = 0;
        assert!(map.get(&3) == Some(&0));
    }

    #[test]
    fn test_hashmap_pigeonhole() {
        // B + 1 keys into B buckets must share a bucket.
        let buckets = 16;
        let mut map: ChainedHashMap<usize, usize> = ChainedHashMap::with_buckets(buckets);
        for k in 0..=buckets {
            *map.get_or_default(k) = k;
        }
        assert!(map.len() == buckets + 1);
        assert!((0..buckets).any(|b| map.chain_len(b) >= 2));
        assert!((0..buckets).map(|b| map.chain_len(b)).sum::<usize>() == buckets + 1);
        assert!(map.verify());
    }

    #[test]
    fn test_hashmap_chain_remove_middle() {
        let mut map: IdMap<char> = id_map(10);
        // 3, 13 and 23 all chain in bucket 3, in this order.
        map.insert(3, 'a');
        map.insert(13, 'b');
        map.insert(23, 'c');
        assert!(map.chain_len(3) == 3);

        assert!(map.remove(&13) == Ok('b'));
        assert!(map.chain_len(3) == 2);
        assert!(map.verify());

        // Both ends are still reachable, and linked to each other.
        let c = map.begin();
        assert!(map.entry_at(c) == Ok((&3, &'a')));
        let c = map.advance(c).unwrap();
        assert!(map.entry_at(c) == Ok((&23, &'c')));
        let c = map.retreat(c).unwrap();
        assert!(map.entry_at(c) == Ok((&3, &'a')));
        assert!(map.find(&13).is_end());
    }

    #[test]
    fn test_hashmap_chain_remove_head_and_tail() {
        let mut map: IdMap<u64> = id_map(4);
        for k in [1, 5, 9, 13] {
            map.insert(k, k);
        }
        assert!(map.chain_len(1) == 4);

        let head = map.find(&1);
        assert!(map.remove_at(head) == Ok((1, 1)));
        assert!(map.entry_at(map.begin()) == Ok((&5, &5)));

        let tail = map.find(&13);
        assert!(map.remove_at(tail) == Ok((13, 13)));
        assert!(map.verify());
        assert!(map.keys().copied().collect::<Vec<_>>() == vec![5, 9]);
    }

    #[test]
    fn test_hashmap_cursor_walk() {
        let mut map: IdMap<u64> = id_map(8);
        // Buckets 1 and 6 are populated, with a chain of two in bucket 6.
        for k in [6, 1, 14] {
            map.insert(k, k * 10);
        }

        let mut forward = Vec::new();
        let mut c = map.begin();
        while c != map.end() {
            forward.push(*map.entry_at(c).unwrap().0);
            c = map.advance(c).unwrap();
        }
        assert!(forward == vec![1, 6, 14]);

        let mut backward = Vec::new();
        let mut c = map.end();
        while c != map.begin() {
            c = map.retreat(c).unwrap();
            backward.push(*map.entry_at(c).unwrap().0);
        }
        assert!(backward == vec![14, 6, 1]);

        assert!(map.iter().map(|(k, _)| *k).collect::<Vec<_>>() == forward);
        assert!(map.iter().rev().map(|(k, _)| *k).collect::<Vec<_>>() == backward);
    }

    #[test]
    fn test_hashmap_cursor_errors() {
        let mut map: ChainedHashMap<u32, u32> = ChainedHashMap::new();
        let other: ChainedHashMap<u32, u32> = ChainedHashMap::new();

        // Empty map: begin is end, and neither may move.
        assert!(map.begin() == map.end());
        assert!(matches!(map.advance(map.end()), Err(MapError::InvalidOperation(_))));
        assert!(matches!(map.retreat(map.end()), Err(MapError::InvalidOperation(_))));
        assert!(matches!(map.entry_at(map.end()), Err(MapError::InvalidDereference(_))));
        assert!(matches!(map.remove_at(map.end()), Err(MapError::InvalidOperation(_))));

        map.insert(1, 1);
        assert!(matches!(map.retreat(map.begin()), Err(MapError::InvalidOperation(_))));

        // Cursors from another map are refused.
        assert!(matches!(map.remove_at(other.end()), Err(MapError::InvalidOperation(_))));
        assert!(matches!(map.retreat(other.end()), Err(MapError::InvalidOperation(_))));
        assert!(matches!(map.entry_at(other.end()), Err(MapError::InvalidOperation(_))));
        assert!(map.len() == 1);
    }

    #[test]
    fn test_hashmap_stale_cursor() {
        let mut map: ChainedHashMap<u32, u32> = ChainedHashMap::new();
        map.insert(1, 1);
        let c = map.find(&1);
        assert!(map.remove_at(c).is_ok());
        // The consumed position is dead, even after the slot is reused.
        map.insert(2, 2);
        assert!(matches!(map.remove_at(c), Err(MapError::InvalidOperation(_))));
        assert!(matches!(map.entry_at(c), Err(MapError::InvalidDereference(_))));
        assert!(matches!(map.advance(c), Err(MapError::InvalidOperation(_))));
        assert!(map.len() == 1);
    }

    #[test]
    fn test_hashmap_eq_ignores_order() {
        let mut a: IdMap<u64> = id_map(4);
        let mut b: IdMap<u64> = id_map(4);
        // Same chain, opposite insertion order.
        for k in [0, 4, 8] {
            a.insert(k, k);
        }
        for k in [8, 4, 0] {
            b.insert(k, k);
        }
        assert!(a.iter().ne(b.iter()));
        assert!(a == b);

        // Different bucket counts don't matter either.
        let c: IdMap<u64> = {
            let mut c = id_map(100);
            c.extend([(0, 0), (4, 4), (8, 8)]);
            c
        };
        assert!(a == c);

        b.insert(8, 9);
        assert!(a != b);
        b.insert(8, 8);
        b.insert(12, 12);
        assert!(a != b);
    }

    #[test]
    fn test_hashmap_clone_and_take() {
        let mut map: IdMap<u64> = id_map(4);
        map.extend([(1, 1), (5, 5), (2, 2)]);
        let copy = map.clone();
        assert!(copy == map);
        assert!(copy.iter().eq(map.iter()));
        assert!(copy.verify());

        // Cursors don't cross between a map and its copy.
        assert!(copy.entry_at(map.begin()).is_err());

        let moved = std::mem::take(&mut map);
        assert!(map.is_empty());
        assert!(map.verify());
        assert!(moved == copy);
        *map.get_or_default(1) = 7;
        assert!(map.get(&1) == Some(&7));
    }

    #[test]
    fn test_hashmap_iterators() {
        let mut map: ChainedHashMap<u32, u32> = (0..100).map(|v| (v, v)).collect();
        assert!(map.iter().len() == 100);
        assert!(map.iter().count() == 100);

        for (k, v) in map.iter_mut() {
            *v = *k + 1;
        }
        for v in map.values_mut() {
            *v *= 2;
        }
        assert!(map.iter().all(|(k, v)| *v == (*k + 1) * 2));

        let mut keys: Vec<u32> = map.keys().copied().collect();
        keys.sort_unstable();
        assert!(keys == (0..100).collect::<Vec<_>>());
        assert!(map.values().sum::<u32>() == (1..=100).map(|v| v * 2).sum::<u32>());

        let order: Vec<u32> = map.keys().copied().collect();
        let owned: Vec<(u32, u32)> = map.into_iter().collect();
        assert!(owned.iter().map(|(k, _)| *k).eq(order.into_iter()));
    }

    #[test]
    fn test_hashmap_iter_meets_in_middle() {
        let map: ChainedHashMap<u32, u32> = (0..5).map(|v| (v, v)).collect();
        let mut it = map.iter();
        let a = it.next().unwrap();
        let e = it.next_back().unwrap();
        assert!(a != e);
        assert!(it.len() == 3);
        assert!(it.by_ref().count() == 3);
        assert!(it.next().is_none());
        assert!(it.next_back().is_none());
    }

    #[test]
    fn test_hashmap_cursor_map_trait() {
        fn fill<M: CursorMap<u32, u32>>(m: &mut M) {
            for i in 0..10 {
                *m.get_or_default(i) = i;
            }
        }
        let mut map: ChainedHashMap<u32, u32> = ChainedHashMap::with_buckets(0);
        assert!(map.bucket_count() == 1);
        fill(&mut map);
        assert!(CursorMap::len(&map) == 10);
        assert!(map.chain_len(0) == 10);
        assert!(map.verify());
    }

    #[test]
    fn test_hashmap_debug() {
        let map: ChainedHashMap<u32, char> = ChainedHashMap::from([(1, 'a')]);
        assert!(format!("{:?}", map) == "{1: 'a'}");
    }

    #[test]
    fn test_hashmap_drop_empty() {
        let map: ChainedHashMap<String, String> = ChainedHashMap::new();
        std::mem::drop(map);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_hashmap_serialize_deserialize() {
        let map: ChainedHashMap<String, u32> =
            [("a".to_string(), 1), ("b".to_string(), 2)].into_iter().collect();

        let value = serde_json::to_value(&map).unwrap();
        assert_eq!(value, serde_json::json!({ "a": 1, "b": 2 }));

        let map2: ChainedHashMap<String, u32> = serde_json::from_value(value).unwrap();
        assert!(map == map2);
    }
}
