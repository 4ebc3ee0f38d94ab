//! In-order iterators over a tree.
//!
//! All iterators walk the parent links between neighbouring nodes, so they
//! need no stack and can be restarted by simply asking the tree for a new one.

use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;

use crate::bst::BinarySearchTree;
use crate::node::{self, Link, Node, NodePtr};

/// Two cursors closing in on each other from both ends of the tree.
struct Cursors<K, V, M> {
    front: Link<K, V, M>,
    back: Link<K, V, M>,
    len: usize,
}

impl<K, V, M> Cursors<K, V, M> {
    fn new(root: Link<K, V, M>, len: usize) -> Self {
        Self {
            front: root.map(|root_ptr| unsafe { node::min_node(root_ptr) }),
            back: root.map(|root_ptr| unsafe { node::max_node(root_ptr) }),
            len,
        }
    }

    fn next(&mut self) -> Option<NodePtr<K, V, M>> {
        if self.len == 0 {
            return None;
        }
        let node_ptr = self.front?;
        self.len -= 1;
        self.front = unsafe { node::successor(node_ptr) };
        Some(node_ptr)
    }

    fn next_back(&mut self) -> Option<NodePtr<K, V, M>> {
        if self.len == 0 {
            return None;
        }
        let node_ptr = self.back?;
        self.len -= 1;
        self.back = unsafe { node::predecessor(node_ptr) };
        Some(node_ptr)
    }
}

// Auto derived clone seems to have an invalid type bound of K: Clone
impl<K, V, M> Clone for Cursors<K, V, M> {
    fn clone(&self) -> Self {
        Self {
            front: self.front,
            back: self.back,
            len: self.len,
        }
    }
}

/// An iterator over the entries of a tree, sorted by key.
pub struct Iter<'a, K, V, M = ()> {
    cursors: Cursors<K, V, M>,
    marker: PhantomData<&'a Node<K, V, M>>,
}

/// A mutable iterator over the entries of a tree, sorted by key.
pub struct IterMut<'a, K, V, M = ()> {
    cursors: Cursors<K, V, M>,
    marker: PhantomData<&'a mut Node<K, V, M>>,
}

/// An iterator over the keys of a tree.
pub struct Keys<'a, K, V, M = ()> {
    iter: Iter<'a, K, V, M>,
}

/// An iterator over the values of a tree.
pub struct Values<'a, K, V, M = ()> {
    iter: Iter<'a, K, V, M>,
}

/// A mutable iterator over the values of a tree.
pub struct ValuesMut<'a, K, V, M = ()> {
    iter: IterMut<'a, K, V, M>,
}

/// An owning iterator over the entries of a tree, sorted by key.
pub struct IntoIter<K, V, M = ()> {
    tree: BinarySearchTree<K, V, M>,
    cursors: Cursors<K, V, M>,
}

impl<'a, K, V, M> Iter<'a, K, V, M> {
    pub(crate) fn new(root: Link<K, V, M>, len: usize) -> Self {
        Self {
            cursors: Cursors::new(root, len),
            marker: PhantomData,
        }
    }
}

impl<'a, K, V, M> IterMut<'a, K, V, M> {
    pub(crate) fn new(root: Link<K, V, M>, len: usize) -> Self {
        Self {
            cursors: Cursors::new(root, len),
            marker: PhantomData,
        }
    }
}

impl<'a, K, V, M> Keys<'a, K, V, M> {
    pub(crate) fn new(iter: Iter<'a, K, V, M>) -> Self {
        Self { iter }
    }
}

impl<'a, K, V, M> Values<'a, K, V, M> {
    pub(crate) fn new(iter: Iter<'a, K, V, M>) -> Self {
        Self { iter }
    }
}

impl<'a, K, V, M> ValuesMut<'a, K, V, M> {
    pub(crate) fn new(iter: IterMut<'a, K, V, M>) -> Self {
        Self { iter }
    }
}

impl<K, V, M> IntoIter<K, V, M> {
    pub(crate) fn new(tree: BinarySearchTree<K, V, M>) -> Self {
        let cursors = Cursors::new(tree.root, tree.num_nodes);
        Self { tree, cursors }
    }
}

impl<'a, K, V, M> Iterator for Iter<'a, K, V, M> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.cursors.next().map(|node_ptr| {
            let node = unsafe { &*node_ptr.as_ptr() };
            (&node.key, &node.value)
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.cursors.len, Some(self.cursors.len))
    }
}

impl<'a, K, V, M> DoubleEndedIterator for Iter<'a, K, V, M> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.cursors.next_back().map(|node_ptr| {
            let node = unsafe { &*node_ptr.as_ptr() };
            (&node.key, &node.value)
        })
    }
}

impl<K, V, M> ExactSizeIterator for Iter<'_, K, V, M> {}

impl<K, V, M> FusedIterator for Iter<'_, K, V, M> {}

impl<K, V, M> Clone for Iter<'_, K, V, M> {
    fn clone(&self) -> Self {
        Self {
            cursors: self.cursors.clone(),
            marker: PhantomData,
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, M> fmt::Debug for Iter<'_, K, V, M> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, K, V, M> Iterator for IterMut<'a, K, V, M> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.cursors.next().map(|node_ptr| {
            let node = unsafe { &mut *node_ptr.as_ptr() };
            (&node.key, &mut node.value)
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.cursors.len, Some(self.cursors.len))
    }
}

impl<'a, K, V, M> DoubleEndedIterator for IterMut<'a, K, V, M> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.cursors.next_back().map(|node_ptr| {
            let node = unsafe { &mut *node_ptr.as_ptr() };
            (&node.key, &mut node.value)
        })
    }
}

impl<K, V, M> ExactSizeIterator for IterMut<'_, K, V, M> {}

impl<K, V, M> FusedIterator for IterMut<'_, K, V, M> {}

impl<'a, K, V, M> Iterator for Keys<'a, K, V, M> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<'a, K, V, M> DoubleEndedIterator for Keys<'a, K, V, M> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.iter.next_back().map(|(key, _)| key)
    }
}

impl<K, V, M> ExactSizeIterator for Keys<'_, K, V, M> {}

impl<K, V, M> FusedIterator for Keys<'_, K, V, M> {}

impl<K, V, M> Clone for Keys<'_, K, V, M> {
    fn clone(&self) -> Self {
        Self {
            iter: self.iter.clone(),
        }
    }
}

impl<'a, K, V, M> Iterator for Values<'a, K, V, M> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<'a, K, V, M> DoubleEndedIterator for Values<'a, K, V, M> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.iter.next_back().map(|(_, value)| value)
    }
}

impl<K, V, M> ExactSizeIterator for Values<'_, K, V, M> {}

impl<K, V, M> FusedIterator for Values<'_, K, V, M> {}

impl<K, V, M> Clone for Values<'_, K, V, M> {
    fn clone(&self) -> Self {
        Self {
            iter: self.iter.clone(),
        }
    }
}

impl<'a, K, V, M> Iterator for ValuesMut<'a, K, V, M> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<'a, K, V, M> DoubleEndedIterator for ValuesMut<'a, K, V, M> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.iter.next_back().map(|(_, value)| value)
    }
}

impl<K, V, M> ExactSizeIterator for ValuesMut<'_, K, V, M> {}

impl<K, V, M> FusedIterator for ValuesMut<'_, K, V, M> {}

impl<K, V, M> IntoIter<K, V, M> {
    /// Unlinks and frees a node that is currently the minimum or maximum of
    /// the remaining tree.
    fn take(&mut self, node_ptr: NodePtr<K, V, M>) -> (K, V) {
        unsafe {
            self.tree.splice_out(node_ptr);
            self.tree.take_node(node_ptr)
        }
    }
}

impl<K, V, M> Iterator for IntoIter<K, V, M> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        // The successor is computed before the node is unlinked and no other
        // node moves, so the front cursor stays valid.
        let node_ptr = self.cursors.next()?;
        Some(self.take(node_ptr))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.cursors.len, Some(self.cursors.len))
    }
}

impl<K, V, M> DoubleEndedIterator for IntoIter<K, V, M> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let node_ptr = self.cursors.next_back()?;
        Some(self.take(node_ptr))
    }
}

impl<K, V, M> ExactSizeIterator for IntoIter<K, V, M> {}

impl<K, V, M> FusedIterator for IntoIter<K, V, M> {}

#[cfg(test)]
mod tests {
    use crate::BinarySearchTree;

    fn sample() -> BinarySearchTree<i32, &'static str> {
        //     4
        //    / \
        //   2   6
        //  / \   \
        // 1   3   7
        [(4, "four"), (2, "two"), (6, "six"), (1, "one"), (3, "three"), (7, "seven")]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_iter_in_order() {
        let tree = sample();
        let keys: Vec<i32> = tree.keys().copied().collect();
        assert_eq!(keys, vec![1, 2, 3, 4, 6, 7]);
        let values: Vec<&str> = tree.values().copied().collect();
        assert_eq!(values, vec!["one", "two", "three", "four", "six", "seven"]);
        assert_eq!(tree.iter().len(), 6);
    }

    #[test]
    fn test_iter_restartable() {
        let tree = sample();
        let first: Vec<_> = tree.iter().collect();
        let second: Vec<_> = tree.iter().collect();
        assert_eq!(first, second);

        let mut iter = tree.iter();
        iter.next();
        let resumed = iter.clone();
        assert_eq!(iter.collect::<Vec<_>>(), resumed.collect::<Vec<_>>());
    }

    #[test]
    fn test_iter_both_ends() {
        let tree = sample();
        let mut iter = tree.keys();
        assert_eq!(iter.next(), Some(&1));
        assert_eq!(iter.next_back(), Some(&7));
        assert_eq!(iter.next_back(), Some(&6));
        assert_eq!(iter.next(), Some(&2));
        assert_eq!(iter.len(), 2);
        assert_eq!(iter.next(), Some(&3));
        assert_eq!(iter.next_back(), Some(&4));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);
        assert_eq!(tree.keys().rev().copied().collect::<Vec<_>>(), vec![7, 6, 4, 3, 2, 1]);
    }

    #[test]
    fn test_iter_mut() {
        let mut tree: BinarySearchTree<i32, i32> = (0..10).map(|key| (key, key)).collect();
        for (key, value) in tree.iter_mut() {
            *value = key * 2;
        }
        for value in tree.values_mut() {
            *value += 1;
        }
        for (&key, value) in &mut tree {
            assert_eq!(*value, key * 2 + 1);
        }
    }

    #[test]
    fn test_into_iter() {
        let tree = sample();
        let entries: Vec<(i32, &str)> = tree.into_iter().collect();
        assert_eq!(entries.first(), Some(&(1, "one")));
        assert_eq!(entries.last(), Some(&(7, "seven")));
        assert_eq!(entries.len(), 6);

        let mut iter = sample().into_iter();
        assert_eq!(iter.next_back(), Some((7, "seven")));
        assert_eq!(iter.next(), Some((1, "one")));
        assert_eq!(iter.len(), 4);
        // Remaining entries are freed on drop.
        drop(iter);
    }

    #[test]
    fn test_into_iter_degenerate() {
        let tree: BinarySearchTree<i32, ()> = (0..100).rev().map(|key| (key, ())).collect();
        assert_eq!(tree.height(), 100);
        let keys: Vec<i32> = tree.into_iter().map(|(key, _)| key).collect();
        assert_eq!(keys, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty() {
        let tree: BinarySearchTree<i32, i32> = BinarySearchTree::new();
        assert!(tree.iter().next().is_none());
        assert!(tree.iter().next_back().is_none());
        assert!(tree.into_iter().next().is_none());
    }
}
