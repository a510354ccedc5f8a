//! Iterators for the ChainedHashMap. All of them yield entries in the same
//! bucket order the cursors walk.

use super::{ChainNode, ChainedHashMap};
use crate::arena::Handle;

/// Iterator over references to Key Value pairs stored in the map.
pub struct Iter<'a, K, V, S> {
    map: &'a ChainedHashMap<K, V, S>,
    front: Option<(Handle, usize)>,
    back: Option<(Handle, usize)>,
    length: usize,
}

impl<'a, K, V, S> Iter<'a, K, V, S> {
    pub(crate) fn new(map: &'a ChainedHashMap<K, V, S>) -> Self {
        Iter {
            map,
            front: map.first(),
            back: map.last(),
            length: map.len(),
        }
    }
}

impl<'a, K, V, S> Iterator for Iter<'a, K, V, S> {
    type Item = (&'a K, &'a V);

    /// Yield the next key value reference, or `None` if exhausted.
    fn next(&mut self) -> Option<Self::Item> {
        if self.length == 0 {
            return None;
        }
        let (h, _) = self.front?;
        let map = self.map;
        self.length -= 1;
        self.front = map.successor(h);
        let node = map.node(h);
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.length, Some(self.length))
    }
}

impl<K, V, S> DoubleEndedIterator for Iter<'_, K, V, S> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.length == 0 {
            return None;
        }
        let (h, _) = self.back?;
        let map = self.map;
        self.length -= 1;
        self.back = map.predecessor(h);
        let node = map.node(h);
        Some((&node.key, &node.value))
    }
}

impl<K, V, S> ExactSizeIterator for Iter<'_, K, V, S> {}

/// Iterator over Key and mutable Value references stored in the map.
pub struct IterMut<'a, K, V> {
    order: std::vec::IntoIter<usize>,
    slots: Vec<Option<&'a mut ChainNode<K, V>>>,
}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(crate) fn new(order: Vec<usize>, slots: Vec<Option<&'a mut ChainNode<K, V>>>) -> Self {
        IterMut {
            order: order.into_iter(),
            slots,
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.order.next()?;
        let node = self.slots[idx].take()?;
        Some((&node.key, &mut node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.order.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IterMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let idx = self.order.next_back()?;
        let node = self.slots[idx].take()?;
        Some((&node.key, &mut node.value))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

/// Owning iterator over the Key Value pairs of the map.
pub struct IntoIter<K, V> {
    order: std::vec::IntoIter<usize>,
    slots: Vec<Option<ChainNode<K, V>>>,
}

impl<K, V> IntoIter<K, V> {
    pub(crate) fn new(order: Vec<usize>, slots: Vec<Option<ChainNode<K, V>>>) -> Self {
        IntoIter {
            order: order.into_iter(),
            slots,
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.order.next()?;
        self.slots[idx].take().map(|node| (node.key, node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.order.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let idx = self.order.next_back()?;
        self.slots[idx].take().map(|node| (node.key, node.value))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

/// Iterator over references to Keys stored in the map.
pub struct Keys<'a, K, V, S> {
    iter: Iter<'a, K, V, S>,
}

impl<'a, K, V, S> Keys<'a, K, V, S> {
    pub(crate) fn new(iter: Iter<'a, K, V, S>) -> Self {
        Keys { iter }
    }
}

impl<'a, K, V, S> Iterator for Keys<'a, K, V, S> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<K, V, S> DoubleEndedIterator for Keys<'_, K, V, S> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.iter.next_back().map(|(k, _)| k)
    }
}

impl<K, V, S> ExactSizeIterator for Keys<'_, K, V, S> {}

/// Iterator over references to Values stored in the map.
pub struct Values<'a, K, V, S> {
    iter: Iter<'a, K, V, S>,
}

impl<'a, K, V, S> Values<'a, K, V, S> {
    pub(crate) fn new(iter: Iter<'a, K, V, S>) -> Self {
        Values { iter }
    }
}

impl<'a, K, V, S> Iterator for Values<'a, K, V, S> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<K, V, S> DoubleEndedIterator for Values<'_, K, V, S> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.iter.next_back().map(|(_, v)| v)
    }
}

impl<K, V, S> ExactSizeIterator for Values<'_, K, V, S> {}

/// Iterator over mutable references to Values stored in the map.
pub struct ValuesMut<'a, K, V> {
    iter: IterMut<'a, K, V>,
}

impl<'a, K, V> ValuesMut<'a, K, V> {
    pub(crate) fn new(iter: IterMut<'a, K, V>) -> Self {
        ValuesMut { iter }
    }
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for ValuesMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.iter.next_back().map(|(_, v)| v)
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}
