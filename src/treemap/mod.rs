//! TreeMap - an ordered map over an unbalanced binary search tree.
//!
//! Every node owns its left and right children and keeps a non-owning link
//! to its parent, which is what lets a cursor step to the in-order successor
//! or predecessor without a stack. Keys in a left subtree compare less than
//! the node's key, keys in a right subtree compare greater or equal.
//!
//! The tree is never rebalanced. Its shape is decided purely by insertion
//! order, so sorted input degrades it into a list and every operation becomes
//! linear in the number of entries.
//!
//! ```
//! use cursormap::TreeMap;
//!
//! let mut map: TreeMap<u32, char> = TreeMap::new();
//! for (k, v) in [(5, 'e'), (3, 'c'), (8, 'h'), (1, 'a'), (4, 'd')] {
//!     *map.get_or_default(k) = v;
//! }
//! let keys: Vec<u32> = map.keys().copied().collect();
//! assert_eq!(keys, vec![1, 3, 4, 5, 8]);
//!
//! // There is nothing before the first entry.
//! assert!(map.retreat(map.begin()).is_err());
//! ```

mod iter;

pub use self::iter::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::iter::FromIterator;
use std::mem;

#[cfg(feature = "serde")]
use serde::{
    de::{Deserialize, Deserializer},
    ser::{Serialize, SerializeMap, Serializer},
};

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::arena::{Arena, Handle};
use crate::cursor::{CursorMap, MapId};
use crate::error::{MapError, MapResult};
#[cfg(feature = "serde")]
use crate::utils::MapCollector;

// Traversal stacks stay inline until the tree gets this deep.
const STACK_INLINE: usize = 32;

pub(crate) struct TreeNode<K, V> {
    key: K,
    value: V,
    parent: Option<Handle>,
    left: Option<Handle>,
    right: Option<Handle>,
}

/// A position in a [TreeMap]. See [CursorMap] for the rules on how long a
/// cursor stays usable.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TreeCursor {
    map: MapId,
    node: Option<Handle>,
}

impl TreeCursor {
    /// `true` if this is an end cursor.
    pub fn is_end(&self) -> bool {
        self.node.is_none()
    }
}

/// An ordered map backed by an unbalanced binary search tree.
pub struct TreeMap<K, V> {
    id: MapId,
    root: Option<Handle>,
    nodes: Arena<TreeNode<K, V>>,
}

impl<K, V> TreeMap<K, V> {
    /// Construct an empty tree.
    pub fn new() -> Self {
        TreeMap {
            id: MapId::next(),
            root: None,
            nodes: Arena::new(),
        }
    }

    /// The number of entries, which is the number of nodes reachable from
    /// the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` if the tree has no root.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of nodes on the longest root to leaf path. Zero when empty.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack: SmallVec<[(Handle, usize); STACK_INLINE]> = SmallVec::new();
        if let Some(root) = self.root {
            stack.push((root, 1));
        }
        while let Some((h, d)) = stack.pop() {
            deepest = deepest.max(d);
            let node = &self.nodes[h];
            stack.extend(node.left.iter().chain(node.right.iter()).map(|c| (*c, d + 1)));
        }
        deepest
    }

    /// Remove every entry. All outstanding cursors become invalid.
    pub fn clear(&mut self) {
        debug!(len = self.len(), "clear");
        self.root = None;
        self.nodes.clear();
    }

    /// Iterate over the entries in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self)
    }

    /// Iterate over the entries in ascending key order with mutable values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let order: Vec<usize> = self.handles().map(Handle::index).collect();
        IterMut::new(order, self.nodes.slots_mut())
    }

    /// Iterate over the keys in ascending order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    /// Iterate over the values in ascending key order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self.iter())
    }

    /// Iterate over mutable values in ascending key order.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut::new(self.iter_mut())
    }

    /// Cursor at the smallest key, or the end cursor if empty.
    pub fn begin(&self) -> TreeCursor {
        self.cursor_at(self.first())
    }

    /// The end cursor.
    pub fn end(&self) -> TreeCursor {
        self.cursor_at(None)
    }

    /// Move `cursor` to the in-order successor, or to the end.
    pub fn advance(&self, cursor: TreeCursor) -> MapResult<TreeCursor> {
        match self.check_cursor(cursor)? {
            Some(h) => Ok(self.cursor_at(self.successor(h))),
            None => Err(MapError::InvalidOperation("cannot advance the end cursor")),
        }
    }

    /// Move `cursor` to the in-order predecessor. The end cursor retreats to
    /// the largest key. Retreating from the smallest key is an error.
    pub fn retreat(&self, cursor: TreeCursor) -> MapResult<TreeCursor> {
        let node = self.check_cursor(cursor)?;
        let root = self
            .root
            .ok_or(MapError::InvalidOperation("cannot retreat in an empty tree"))?;
        match node {
            Some(h) if Some(h) == self.first() => Err(MapError::InvalidOperation(
                "cannot retreat before the first entry",
            )),
            Some(h) => Ok(self.cursor_at(self.predecessor(h))),
            None => Ok(self.cursor_at(Some(self.maximum(root)))),
        }
    }

    /// The entry under `cursor`.
    pub fn entry_at(&self, cursor: TreeCursor) -> MapResult<(&K, &V)> {
        let h = self.deref_cursor(cursor)?;
        let node = &self.nodes[h];
        Ok((&node.key, &node.value))
    }

    /// The entry under `cursor`, with its value mutable in place.
    pub fn entry_at_mut(&mut self, cursor: TreeCursor) -> MapResult<(&K, &mut V)> {
        let h = self.deref_cursor(cursor)?;
        let node = &mut self.nodes[h];
        Ok((&node.key, &mut node.value))
    }

    /// Remove the entry under `cursor`, returning it.
    pub fn remove_at(&mut self, cursor: TreeCursor) -> MapResult<(K, V)> {
        match self.check_cursor(cursor)? {
            Some(h) => {
                let node = self.unlink(h);
                Ok((node.key, node.value))
            }
            None => Err(MapError::InvalidOperation("cannot remove the end cursor")),
        }
    }

    fn check_cursor(&self, cursor: TreeCursor) -> MapResult<Option<Handle>> {
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

    fn deref_cursor(&self, cursor: TreeCursor) -> MapResult<Handle> {
        if cursor.map != self.id {
            return Err(MapError::InvalidOperation("cursor belongs to another map"));
        }
        match cursor.node {
            Some(h) if self.nodes.contains(h) => Ok(h),
            Some(_) => Err(MapError::InvalidDereference("removed entry")),
            None => Err(MapError::InvalidDereference("end cursor")),
        }
    }

    fn cursor_at(&self, node: Option<Handle>) -> TreeCursor {
        TreeCursor { map: self.id, node }
    }

    pub(crate) fn node(&self, h: Handle) -> &TreeNode<K, V> {
        &self.nodes[h]
    }

    pub(crate) fn first(&self) -> Option<Handle> {
        self.root.map(|r| self.minimum(r))
    }

    pub(crate) fn last(&self) -> Option<Handle> {
        self.root.map(|r| self.maximum(r))
    }

    fn minimum(&self, mut h: Handle) -> Handle {
        while let Some(left) = self.nodes[h].left {
            h = left;
        }
        h
    }

    fn maximum(&self, mut h: Handle) -> Handle {
        while let Some(right) = self.nodes[h].right {
            h = right;
        }
        h
    }

    /// The minimum of the right subtree, else the first ancestor reached
    /// through a left child edge. `None` past the largest key.
    pub(crate) fn successor(&self, mut h: Handle) -> Option<Handle> {
        if let Some(right) = self.nodes[h].right {
            return Some(self.minimum(right));
        }
        let mut parent = self.nodes[h].parent;
        while let Some(p) = parent {
            if self.nodes[p].right != Some(h) {
                break;
            }
            h = p;
            parent = self.nodes[p].parent;
        }
        parent
    }

    /// Mirror of [successor](Self::successor).
    pub(crate) fn predecessor(&self, mut h: Handle) -> Option<Handle> {
        if let Some(left) = self.nodes[h].left {
            return Some(self.maximum(left));
        }
        let mut parent = self.nodes[h].parent;
        while let Some(p) = parent {
            if self.nodes[p].left != Some(h) {
                break;
            }
            h = p;
            parent = self.nodes[p].parent;
        }
        parent
    }

    fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        std::iter::successors(self.first(), move |h| self.successor(*h))
    }

    /// Put the subtree at `v` in the place `u` holds under its parent.
    fn transplant(&mut self, u: Handle, v: Option<Handle>) {
        let parent = self.nodes[u].parent;
        match parent {
            None => self.root = v,
            Some(p) => {
                let pnode = &mut self.nodes[p];
                if pnode.left == Some(u) {
                    pnode.left = v;
                } else {
                    pnode.right = v;
                }
            }
        }
        if let Some(v) = v {
            self.nodes[v].parent = parent;
        }
    }

    /// Detach `z` from the tree and release it. With two children, the
    /// in-order successor is relinked into `z`'s position rather than having
    /// its payload moved, so every other node keeps its handle.
    fn unlink(&mut self, z: Handle) -> TreeNode<K, V> {
        let (left, right) = {
            let node = &self.nodes[z];
            (node.left, node.right)
        };
        match (left, right) {
            (None, child) | (child, None) => self.transplant(z, child),
            (Some(l), Some(r)) => {
                let y = self.minimum(r);
                if y != r {
                    // y has no left child, its right child takes its slot.
                    let y_right = self.nodes[y].right;
                    self.transplant(y, y_right);
                    self.nodes[y].right = Some(r);
                    self.nodes[r].parent = Some(y);
                }
                self.transplant(z, Some(y));
                self.nodes[y].left = Some(l);
                self.nodes[l].parent = Some(y);
            }
        }
        let node = match self.nodes.remove(z) {
            Some(node) => node,
            None => panic!("tree link to released slot {}", z.index()),
        };
        trace!(len = self.nodes.len(), "tree remove");
        node
    }
}

impl<K: Ord, V> TreeMap<K, V> {
    fn find_node<Q>(&self, k: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut cur = self.root;
        while let Some(h) = cur {
            let node = &self.nodes[h];
            cur = match k.cmp(node.key.borrow()) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(h),
            };
        }
        None
    }

    /// Link a new leaf: walk down from the root, left while `key` is less
    /// than the current key and right otherwise.
    fn insert_node(&mut self, key: K, value: V) -> Handle {
        let mut parent = None;
        let mut go_left = false;
        let mut cur = self.root;
        let mut depth = 1;
        while let Some(h) = cur {
            let node = &self.nodes[h];
            parent = Some(h);
            go_left = key < node.key;
            cur = if go_left { node.left } else { node.right };
            depth += 1;
        }

        let h = self.nodes.insert(TreeNode {
            key,
            value,
            parent,
            left: None,
            right: None,
        });
        match parent {
            None => self.root = Some(h),
            Some(p) if go_left => self.nodes[p].left = Some(h),
            Some(p) => self.nodes[p].right = Some(h),
        }
        trace!(depth, len = self.nodes.len(), "tree insert");
        h
    }

    /// Indexed access: the value for `key`, inserting a new leaf holding
    /// `V::default()` if absent.
    pub fn get_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        let h = match self.find_node(&key) {
            Some(h) => h,
            None => self.insert_node(key, V::default()),
        };
        &mut self.nodes[h].value
    }

    /// Insert `value` under `key`, returning the previous value if the key
    /// was present. The key already stored is kept.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.find_node(&key) {
            Some(h) => Some(mem::replace(&mut self.nodes[h].value, value)),
            None => {
                self.insert_node(key, value);
                None
            }
        }
    }

    /// The value for `k`, if present.
    pub fn get<Q>(&self, k: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_node(k).map(|h| &self.nodes[h].value)
    }

    /// The mutable value for `k`, if present.
    pub fn get_mut<Q>(&mut self, k: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
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
        Q: Ord + ?Sized,
    {
        self.find_node(k).is_some()
    }

    /// The value for an existing key. Never inserts.
    pub fn value_of<Q>(&self, k: &Q) -> MapResult<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(k).ok_or(MapError::NotFound)
    }

    /// The mutable value for an existing key. Never inserts.
    pub fn value_of_mut<Q>(&mut self, k: &Q) -> MapResult<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get_mut(k).ok_or(MapError::NotFound)
    }

    /// Cursor at `k`, or the end cursor.
    pub fn find<Q>(&self, k: &Q) -> TreeCursor
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.cursor_at(self.find_node(k))
    }

    /// Remove `k`, returning its value. Removing an absent key is an
    /// invalid operation, just as removing at the end cursor is.
    pub fn remove<Q>(&mut self, k: &Q) -> MapResult<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.find_node(k) {
            Some(h) => Ok(self.unlink(h).value),
            None => Err(MapError::InvalidOperation("cannot remove an absent key")),
        }
    }

    /// Check the structure: parent and child links agree, in-order keys are
    /// strictly ascending, and every node is reachable from the root.
    pub fn verify(&self) -> bool {
        if let Some(root) = self.root {
            if self.nodes.get(root).map(|n| n.parent.is_some()) != Some(false) {
                return false;
            }
        }

        let mut reachable = 0;
        let mut stack: SmallVec<[Handle; STACK_INLINE]> = SmallVec::new();
        stack.extend(self.root);
        while let Some(h) = stack.pop() {
            reachable += 1;
            if reachable > self.nodes.len() {
                return false;
            }
            let node = match self.nodes.get(h) {
                Some(node) => node,
                None => return false,
            };
            for child in node.left.iter().chain(node.right.iter()) {
                match self.nodes.get(*child) {
                    Some(c) if c.parent == Some(h) => stack.push(*child),
                    _ => return false,
                }
            }
        }
        if reachable != self.nodes.len() {
            return false;
        }

        let mut keys = self.keys();
        match keys.next() {
            Some(mut prev) => keys.all(|k| {
                let ascending = prev < k;
                prev = k;
                ascending
            }),
            None => true,
        }
    }
}

impl<K: Ord, V> CursorMap<K, V> for TreeMap<K, V> {
    type Cursor = TreeCursor;

    fn len(&self) -> usize {
        TreeMap::len(self)
    }

    fn is_empty(&self) -> bool {
        TreeMap::is_empty(self)
    }

    fn get_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        TreeMap::get_or_default(self, key)
    }

    fn value_of(&self, key: &K) -> MapResult<&V> {
        TreeMap::value_of(self, key)
    }

    fn value_of_mut(&mut self, key: &K) -> MapResult<&mut V> {
        TreeMap::value_of_mut(self, key)
    }

    fn find(&self, key: &K) -> TreeCursor {
        TreeMap::find(self, key)
    }

    fn remove(&mut self, key: &K) -> MapResult<V> {
        TreeMap::remove(self, key)
    }

    fn remove_at(&mut self, cursor: TreeCursor) -> MapResult<(K, V)> {
        TreeMap::remove_at(self, cursor)
    }

    fn begin(&self) -> TreeCursor {
        TreeMap::begin(self)
    }

    fn end(&self) -> TreeCursor {
        TreeMap::end(self)
    }

    fn advance(&self, cursor: TreeCursor) -> MapResult<TreeCursor> {
        TreeMap::advance(self, cursor)
    }

    fn retreat(&self, cursor: TreeCursor) -> MapResult<TreeCursor> {
        TreeMap::retreat(self, cursor)
    }

    fn entry_at(&self, cursor: TreeCursor) -> MapResult<(&K, &V)> {
        TreeMap::entry_at(self, cursor)
    }

    fn entry_at_mut(&mut self, cursor: TreeCursor) -> MapResult<(&K, &mut V)> {
        TreeMap::entry_at_mut(self, cursor)
    }
}

impl<K, V> Default for TreeMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, V: Clone> Clone for TreeMap<K, V> {
    /// Re-insert every entry in pre-order, which rebuilds the same shape.
    fn clone(&self) -> Self {
        debug!(len = self.len(), "clone");
        let mut map = TreeMap {
            id: MapId::next(),
            root: None,
            nodes: Arena::with_capacity(self.len()),
        };
        let mut stack: SmallVec<[Handle; STACK_INLINE]> = SmallVec::new();
        stack.extend(self.root);
        while let Some(h) = stack.pop() {
            let node = &self.nodes[h];
            map.insert_node(node.key.clone(), node.value.clone());
            // Right first so the left subtree is visited next.
            stack.extend(node.right);
            stack.extend(node.left);
        }
        map
    }
}

/// Two maps are equal when they hold the same keys mapped to equal values.
/// Tree shape plays no part.
impl<K: Ord, V: PartialEq> PartialEq for TreeMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K: Ord, V: Eq> Eq for TreeMap<K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for TreeMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for TreeMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = TreeMap::new();
        map.extend(iter);
        map
    }
}

impl<K: Ord, V> Extend<(K, V)> for TreeMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        iter.into_iter().for_each(|(k, v)| {
            let _ = self.insert(k, v);
        });
    }
}

impl<K: Ord, V, const N: usize> From<[(K, V); N]> for TreeMap<K, V> {
    fn from(arr: [(K, V); N]) -> Self {
        Self::from_iter(arr)
    }
}

impl<K, V> IntoIterator for TreeMap<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> IntoIter<K, V> {
        let order: Vec<usize> = self.handles().map(Handle::index).collect();
        IntoIter::new(order, self.nodes.into_slots())
    }
}

impl<'a, K, V> IntoIterator for &'a TreeMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V> IntoIterator for &'a mut TreeMap<K, V> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}

#[cfg(feature = "serde")]
impl<K, V> Serialize for TreeMap<K, V>
where
    K: Serialize,
    V: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_map(Some(self.len()))?;

        for (key, val) in self.iter() {
            state.serialize_entry(key, val)?;
        }

        state.end()
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V> Deserialize<'de> for TreeMap<K, V>
where
    K: Deserialize<'de> + Ord,
    V: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(MapCollector::new())
    }
}
