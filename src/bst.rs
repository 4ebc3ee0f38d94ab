//! An unbalanced binary search tree with parent links.
//!
//! This is the structural base of [`AvlTree`](crate::AvlTree): lookup,
//! in-order iteration, node splicing and node swapping live here, balancing
//! does not.

use std::borrow::Borrow;
use std::cmp::{self, Ordering};
use std::fmt;
use std::iter::FromIterator;
use std::marker::PhantomData;
use std::mem;
use std::ops::Index;

use log::debug;

use crate::error::{KeyError, Result};
use crate::iter::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
use crate::node::{self, Dir, Link, Node, NodePtr, NodeRef};

/// A map backed by an unbalanced binary search tree.
///
/// `M` is the per-node bookkeeping of a balancing scheme layered on top; a
/// plain search tree uses `()`.
///
/// ```
/// use avlbst::BinarySearchTree;
/// let mut tree = BinarySearchTree::new();
/// tree.insert(2, "two");
/// tree.insert(1, "one");
/// assert_eq!(tree.get(&1), Some(&"one"));
/// tree.remove(&1);
/// assert!(tree.get(&1).is_none());
/// ```
pub struct BinarySearchTree<K, V, M = ()> {
    pub(crate) root: Link<K, V, M>,
    pub(crate) num_nodes: usize,
    marker: PhantomData<Box<Node<K, V, M>>>,
}

/// Where a key lives, or would live, in the tree.
pub(crate) enum InsertPos<K, V, M> {
    /// A node with an equal key already exists.
    Occupied(NodePtr<K, V, M>),
    /// The node whose empty child link the key belongs in, and the side of
    /// that link. A `None` parent stands for the root slot.
    Vacant(Link<K, V, M>, Dir),
}

#[allow(clippy::enum_variant_names)]
enum Direction {
    FromParent,
    FromLeft,
    FromRight,
}

impl<K, V> BinarySearchTree<K, V> {
    /// Creates an empty tree.
    /// No memory is allocated until the first item is inserted.
    pub fn new() -> Self {
        Self::empty()
    }
}

impl<K, V, M> BinarySearchTree<K, V, M> {
    pub(crate) const fn empty() -> Self {
        Self {
            root: None,
            num_nodes: 0,
            marker: PhantomData,
        }
    }

    /// Returns true if the tree contains no elements.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the number of elements in the tree.
    pub fn len(&self) -> usize {
        self.num_nodes
    }

    /// Clears the tree, deallocating all memory.
    pub fn clear(&mut self) {
        if self.root.is_some() {
            debug!("clearing tree of {} nodes", self.num_nodes);
        }
        self.postorder(|node_ptr| unsafe {
            Node::destroy(node_ptr);
        });
        self.root = None;
        self.num_nodes = 0;
    }

    /// Returns the root node, if any.
    pub fn root(&self) -> Option<NodeRef<'_, K, V, M>> {
        self.root.map(NodeRef::new)
    }

    /// Returns the number of levels in the tree; zero for an empty tree.
    pub fn height(&self) -> usize {
        self.fold_heights(|_, _, _| {})
    }

    /// Returns true if the subtrees of every node differ in height by at most one.
    pub fn is_balanced(&self) -> bool {
        let mut balanced = true;
        self.fold_heights(|_, left_height, right_height| {
            balanced &= left_height <= right_height + 1 && right_height <= left_height + 1;
        });
        balanced
    }

    /// Returns true if every leaf is at the same depth.
    ///
    /// An empty tree trivially satisfies this, as does a chain of nodes
    /// with a single leaf at its end.
    pub fn has_equal_paths(&self) -> bool {
        let mut leaf_depth = None;
        let mut stack: Vec<(NodePtr<K, V, M>, usize)> =
            self.root.map(|root_ptr| (root_ptr, 0)).into_iter().collect();
        while let Some((node_ptr, depth)) = stack.pop() {
            let node = unsafe { node_ptr.as_ref() };
            if node.is_leaf() {
                match leaf_depth {
                    None => leaf_depth = Some(depth),
                    Some(expected) if expected != depth => return false,
                    Some(_) => {}
                }
            }
            stack.extend(
                [node.left, node.right]
                    .into_iter()
                    .flatten()
                    .map(|child_ptr| (child_ptr, depth + 1)),
            );
        }
        true
    }

    /// Returns the first key-value pair in the tree.
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.root.map(|root_ptr| unsafe {
            let node = &*node::min_node(root_ptr).as_ptr();
            (&node.key, &node.value)
        })
    }

    /// Returns the last key-value pair in the tree.
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.root.map(|root_ptr| unsafe {
            let node = &*node::max_node(root_ptr).as_ptr();
            (&node.key, &node.value)
        })
    }

    /// Gets an iterator over the entries of the tree, sorted by key.
    pub fn iter(&self) -> Iter<'_, K, V, M> {
        Iter::new(self.root, self.num_nodes)
    }

    /// Gets a mutable iterator over the entries of the tree, sorted by key.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V, M> {
        IterMut::new(self.root, self.num_nodes)
    }

    /// Gets an iterator over the keys of the tree, in sorted order.
    pub fn keys(&self) -> Keys<'_, K, V, M> {
        Keys::new(self.iter())
    }

    /// Gets an iterator over the values of the tree, in order by key.
    pub fn values(&self) -> Values<'_, K, V, M> {
        Values::new(self.iter())
    }

    /// Gets a mutable iterator over the values of the tree, in order by key.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V, M> {
        ValuesMut::new(self.iter_mut())
    }

    /// Replaces the link pointing at `old_ptr` from `parent` (or from the root
    /// slot if `parent` is `None`) by `new`.
    pub(crate) unsafe fn replace_child(
        &mut self,
        parent: Link<K, V, M>,
        old_ptr: NodePtr<K, V, M>,
        new: Link<K, V, M>,
    ) {
        match parent {
            None => self.root = new,
            Some(mut parent_ptr) => {
                let dir = parent_ptr.as_ref().side_of(old_ptr);
                *parent_ptr.as_mut().child_mut(dir) = new;
            }
        }
    }

    /// Unlinks a node with at most one child, moving that child into its place.
    /// The node itself is left allocated.
    pub(crate) unsafe fn splice_out(&mut self, node_ptr: NodePtr<K, V, M>) {
        let (parent, left, right) = {
            let node = node_ptr.as_ref();
            (node.parent, node.left, node.right)
        };
        debug_assert!(left.is_none() || right.is_none());
        let child = left.or(right);
        if let Some(mut child_ptr) = child {
            child_ptr.as_mut().parent = parent;
        }
        self.replace_child(parent, node_ptr, child);
    }

    /// Exchanges the positions of two nodes in the tree.
    ///
    /// Keys and values stay attached to their nodes; every link into and out of
    /// both nodes is rewritten, including when one is the parent of the other
    /// or both share a parent. Per-node metadata is not touched.
    pub(crate) unsafe fn node_swap(
        &mut self,
        mut a_ptr: NodePtr<K, V, M>,
        mut b_ptr: NodePtr<K, V, M>,
    ) {
        if a_ptr == b_ptr {
            return;
        }
        let (a_parent, a_left, a_right) = {
            let a = a_ptr.as_ref();
            (a.parent, a.left, a.right)
        };
        let (b_parent, b_left, b_right) = {
            let b = b_ptr.as_ref();
            (b.parent, b.left, b.right)
        };
        let swapped = move |link: Link<K, V, M>| {
            if link == Some(a_ptr) {
                Some(b_ptr)
            } else if link == Some(b_ptr) {
                Some(a_ptr)
            } else {
                link
            }
        };

        // Links from the parents down into the pair
        match (a_parent, b_parent) {
            (Some(mut parent_ptr), Some(other_ptr)) if parent_ptr == other_ptr => {
                let parent = parent_ptr.as_mut();
                mem::swap(&mut parent.left, &mut parent.right);
            }
            _ => {
                if a_parent != Some(b_ptr) {
                    self.replace_child(a_parent, a_ptr, Some(b_ptr));
                }
                if b_parent != Some(a_ptr) {
                    self.replace_child(b_parent, b_ptr, Some(a_ptr));
                }
            }
        }

        {
            let a = a_ptr.as_mut();
            a.parent = swapped(b_parent);
            a.left = swapped(b_left);
            a.right = swapped(b_right);
        }
        {
            let b = b_ptr.as_mut();
            b.parent = swapped(a_parent);
            b.left = swapped(a_left);
            b.right = swapped(a_right);
        }

        // Links from the children back up into the pair
        for node_ptr in [a_ptr, b_ptr] {
            let (left, right) = (node_ptr.as_ref().left, node_ptr.as_ref().right);
            for mut child_ptr in [left, right].into_iter().flatten() {
                child_ptr.as_mut().parent = Some(node_ptr);
            }
        }
    }

    /// Unlinks `node_ptr` from the tree structure.
    /// A node with two children first trades places with its in-order predecessor.
    unsafe fn unlink_node(&mut self, node_ptr: NodePtr<K, V, M>) {
        let (left, right) = (node_ptr.as_ref().left, node_ptr.as_ref().right);
        if let (Some(left_ptr), Some(_)) = (left, right) {
            self.node_swap(node_ptr, node::max_node(left_ptr));
        }
        self.splice_out(node_ptr);
    }

    /// Frees an already unlinked node and returns its entry.
    pub(crate) unsafe fn take_node(&mut self, node_ptr: NodePtr<K, V, M>) -> (K, V) {
        debug_assert!(self.num_nodes >= 1);
        self.num_nodes -= 1;
        Node::destroy(node_ptr)
    }

    /// Walks the tree bottom-up, calling `f` with each node and the heights of
    /// its left and right subtrees. Returns the height of the whole tree.
    pub(crate) fn fold_heights<F>(&self, mut f: F) -> usize
    where
        F: FnMut(NodePtr<K, V, M>, usize, usize),
    {
        let mut heights: Vec<usize> = Vec::new();
        self.postorder(|node_ptr| {
            let (left, right) = unsafe { (node_ptr.as_ref().left, node_ptr.as_ref().right) };
            // Subtrees push their heights left first, so pop right first.
            let right_height = match right {
                None => 0,
                Some(_) => heights.pop().unwrap_or(0),
            };
            let left_height = match left {
                None => 0,
                Some(_) => heights.pop().unwrap_or(0),
            };
            f(node_ptr, left_height, right_height);
            heights.push(cmp::max(left_height, right_height) + 1);
        });
        heights.pop().unwrap_or(0)
    }

    #[cfg(any(test, feature = "consistency_check"))]
    pub(crate) fn preorder<F: FnMut(NodePtr<K, V, M>)>(&self, f: F) {
        self.traverse(f, |_| {}, |_| {});
    }

    fn postorder<F: FnMut(NodePtr<K, V, M>)>(&self, f: F) {
        self.traverse(|_| {}, |_| {}, f);
    }

    fn traverse<Pre, In, Post>(&self, mut preorder: Pre, mut inorder: In, mut postorder: Post)
    where
        Pre: FnMut(NodePtr<K, V, M>),
        In: FnMut(NodePtr<K, V, M>),
        Post: FnMut(NodePtr<K, V, M>),
    {
        if let Some(mut node_ptr) = self.root {
            let mut dir = Direction::FromParent;
            loop {
                match dir {
                    Direction::FromParent => {
                        preorder(node_ptr);
                        if let Some(left_ptr) = unsafe { node_ptr.as_ref().left } {
                            node_ptr = left_ptr;
                        } else {
                            dir = Direction::FromLeft;
                        }
                    }
                    Direction::FromLeft => {
                        inorder(node_ptr);
                        if let Some(right_ptr) = unsafe { node_ptr.as_ref().right } {
                            node_ptr = right_ptr;
                            dir = Direction::FromParent;
                        } else {
                            dir = Direction::FromRight;
                        }
                    }
                    Direction::FromRight => {
                        // Post order traversal is used for node deletion,
                        // so make sure not to use node pointer after postorder call.
                        if let Some(parent_ptr) = unsafe { node_ptr.as_ref().parent } {
                            if Some(node_ptr) == unsafe { parent_ptr.as_ref().left } {
                                dir = Direction::FromLeft;
                            } else {
                                dir = Direction::FromRight;
                            }
                            postorder(node_ptr);
                            node_ptr = parent_ptr;
                        } else {
                            postorder(node_ptr);
                            break;
                        }
                    }
                }
            }
        }
    }
}

impl<K: Ord, V, M> BinarySearchTree<K, V, M> {
    /// Returns the node holding `key`.
    ///
    /// The key may be any borrowed form of the tree's key type, but the ordering
    /// on the borrowed form *must* match the ordering on the key type.
    pub fn find<Q>(&self, key: &Q) -> Option<NodeRef<'_, K, V, M>>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_node(key).map(NodeRef::new)
    }

    /// Returns a reference to the value corresponding to the key.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_node(key)
            .map(|node_ptr| &unsafe { &*node_ptr.as_ptr() }.value)
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_node(key)
            .map(|node_ptr| &mut unsafe { &mut *node_ptr.as_ptr() }.value)
    }

    /// Returns references to the key-value pair corresponding to the key.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_node(key).map(|node_ptr| {
            let node = unsafe { &*node_ptr.as_ptr() };
            (&node.key, &node.value)
        })
    }

    /// Returns true if the tree contains a value for the key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_node(key).is_some()
    }

    /// Returns a reference to the value corresponding to the key,
    /// or [`KeyError`] if there is none.
    pub fn at<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(key).ok_or(KeyError)
    }

    /// Returns a mutable reference to the value corresponding to the key,
    /// or [`KeyError`] if there is none.
    pub fn at_mut<Q>(&mut self, key: &Q) -> Result<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get_mut(key).ok_or(KeyError)
    }

    /// Removes a key from the tree.
    /// Returns the value at the key if the key was previously in the tree.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes a key from the tree.
    /// Returns the stored key and value if the key was previously in the tree.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node_ptr = self.find_node(key)?;
        unsafe {
            self.unlink_node(node_ptr);
            Some(self.take_node(node_ptr))
        }
    }

    /// Asserts that the internal tree structure is consistent.
    #[cfg(any(test, feature = "consistency_check"))]
    pub fn check_consistency(&self) {
        unsafe {
            // Check root link
            if let Some(root_node_ptr) = self.root {
                assert!(root_node_ptr.as_ref().parent.is_none());
            }

            // Check tree nodes
            let mut num_nodes = 0;
            self.preorder(|node_ptr| {
                // Check link for left child node
                if let Some(left_ptr) = node_ptr.as_ref().left {
                    assert!(left_ptr.as_ref().parent == Some(node_ptr));
                    assert!(node::max_node(left_ptr).as_ref().key < node_ptr.as_ref().key);
                }

                // Check link for right child node
                if let Some(right_ptr) = node_ptr.as_ref().right {
                    assert!(right_ptr.as_ref().parent == Some(node_ptr));
                    assert!(node::min_node(right_ptr).as_ref().key > node_ptr.as_ref().key);
                }

                num_nodes += 1;
            });

            // Check number of nodes
            assert_eq!(num_nodes, self.num_nodes);
        }
    }

    pub(crate) fn find_node<Q>(&self, key: &Q) -> Link<K, V, M>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut current = self.root;
        while let Some(node_ptr) = current {
            current = unsafe {
                match key.cmp(node_ptr.as_ref().key.borrow()) {
                    Ordering::Equal => break,
                    Ordering::Less => node_ptr.as_ref().left,
                    Ordering::Greater => node_ptr.as_ref().right,
                }
            }
        }
        current
    }

    pub(crate) fn find_insert_pos(&self, key: &K) -> InsertPos<K, V, M> {
        let mut parent: Link<K, V, M> = None;
        let mut dir = Dir::Left;
        let mut current = self.root;
        while let Some(node_ptr) = current {
            let node = unsafe { node_ptr.as_ref() };
            dir = match key.cmp(&node.key) {
                Ordering::Equal => return InsertPos::Occupied(node_ptr),
                Ordering::Less => Dir::Left,
                Ordering::Greater => Dir::Right,
            };
            parent = Some(node_ptr);
            current = node.child(dir);
        }
        InsertPos::Vacant(parent, dir)
    }
}

impl<K: Ord, V, M: Default> BinarySearchTree<K, V, M> {
    /// Inserts a key-value pair into the tree without rebalancing.
    ///
    /// If the key is already present its value is overwritten in place and the
    /// old value is returned.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.find_insert_pos(&key) {
            InsertPos::Occupied(node_ptr) => {
                Some(mem::replace(unsafe { &mut (*node_ptr.as_ptr()).value }, value))
            }
            InsertPos::Vacant(parent, dir) => {
                unsafe { self.attach(parent, dir, key, value) };
                None
            }
        }
    }

    /// Allocates a leaf for the entry and stores it as the `dir` child of
    /// `parent`, or as the root when there is no parent.
    ///
    /// The target link must be empty.
    pub(crate) unsafe fn attach(
        &mut self,
        parent: Link<K, V, M>,
        dir: Dir,
        key: K,
        value: V,
    ) -> NodePtr<K, V, M> {
        let node_ptr = Node::create(parent, key, value);
        match parent {
            None => self.root = Some(node_ptr),
            Some(mut parent_ptr) => {
                let link = parent_ptr.as_mut().child_mut(dir);
                debug_assert!(link.is_none());
                *link = Some(node_ptr);
            }
        }
        self.num_nodes += 1;
        node_ptr
    }
}

impl<K, V, M> Drop for BinarySearchTree<K, V, M> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K, V, M> Default for BinarySearchTree<K, V, M> {
    /// Creates an empty tree.
    fn default() -> Self {
        Self::empty()
    }
}

impl<K: Clone, V: Clone, M: Clone> Clone for BinarySearchTree<K, V, M> {
    /// Copies the tree node by node, keeping its shape.
    fn clone(&self) -> Self {
        let mut tree = Self::empty();
        if let Some(root_ptr) = self.root {
            unsafe {
                let new_root_ptr = Node::duplicate(root_ptr, None);
                tree.root = Some(new_root_ptr);
                let mut stack = vec![(root_ptr, new_root_ptr)];
                while let Some((src_ptr, mut dst_ptr)) = stack.pop() {
                    for dir in [Dir::Left, Dir::Right] {
                        if let Some(src_child_ptr) = src_ptr.as_ref().child(dir) {
                            let dst_child_ptr = Node::duplicate(src_child_ptr, Some(dst_ptr));
                            *dst_ptr.as_mut().child_mut(dir) = Some(dst_child_ptr);
                            stack.push((src_child_ptr, dst_child_ptr));
                        }
                    }
                }
            }
            tree.num_nodes = self.num_nodes;
        }
        tree
    }
}

impl<K: PartialEq, V: PartialEq, M> PartialEq for BinarySearchTree<K, V, M> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq, M> Eq for BinarySearchTree<K, V, M> {}

impl<K: fmt::Debug, V: fmt::Debug, M> fmt::Debug for BinarySearchTree<K, V, M> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, Q, V, M> Index<&Q> for BinarySearchTree<K, V, M>
where
    K: Ord + Borrow<Q>,
    Q: Ord + ?Sized,
{
    type Output = V;

    /// Returns a reference to the value corresponding to the key.
    ///
    /// # Panics
    ///
    /// Panics if the key is not present in the tree.
    fn index(&self, key: &Q) -> &V {
        match self.at(key) {
            Ok(value) => value,
            Err(err) => panic!("{}", err),
        }
    }
}

impl<K: Ord, V, M: Default> FromIterator<(K, V)> for BinarySearchTree<K, V, M> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = Self::empty();
        tree.extend(iter);
        tree
    }
}

impl<K: Ord, V, M: Default> Extend<(K, V)> for BinarySearchTree<K, V, M> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        iter.into_iter().for_each(move |(key, value)| {
            self.insert(key, value);
        });
    }
}

impl<'a, K, V, M> IntoIterator for &'a BinarySearchTree<K, V, M> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, M>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, M> IntoIterator for &'a mut BinarySearchTree<K, V, M> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V, M>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, M> IntoIterator for BinarySearchTree<K, V, M> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, M>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_from(keys: &[i32]) -> BinarySearchTree<i32, i32> {
        let mut tree = BinarySearchTree::new();
        for &key in keys {
            tree.insert(key, key * 10);
        }
        tree.check_consistency();
        tree
    }

    fn preorder_keys<M>(tree: &BinarySearchTree<i32, i32, M>) -> Vec<i32> {
        let mut keys = Vec::new();
        tree.preorder(|node_ptr| keys.push(unsafe { node_ptr.as_ref().key }));
        keys
    }

    #[test]
    fn test_insert_keeps_shape() {
        // Sorted input degenerates into a chain.
        let tree = tree_from(&[1, 2, 3, 4]);
        assert_eq!(tree.height(), 4);
        assert!(!tree.is_balanced());
        assert_eq!(preorder_keys(&tree), vec![1, 2, 3, 4]);

        let tree = tree_from(&[2, 1, 3]);
        assert_eq!(tree.height(), 2);
        assert!(tree.is_balanced());
    }

    #[test]
    fn test_insert_position() {
        let mut tree = BinarySearchTree::<i32, i32>::new();
        assert!(matches!(tree.find_insert_pos(&5), InsertPos::Vacant(None, _)));

        // The first entry lands in the root slot
        assert_eq!(tree.insert(5, 50), None);
        let root_ptr = tree.root.unwrap();
        assert!(matches!(tree.find_insert_pos(&5), InsertPos::Occupied(ptr) if ptr == root_ptr));
        assert!(matches!(
            tree.find_insert_pos(&3),
            InsertPos::Vacant(Some(ptr), Dir::Left) if ptr == root_ptr
        ));
        assert!(matches!(
            tree.find_insert_pos(&8),
            InsertPos::Vacant(Some(ptr), Dir::Right) if ptr == root_ptr
        ));

        tree.insert(3, 30);
        tree.insert(8, 80);
        tree.check_consistency();
        assert_eq!(preorder_keys(&tree), vec![5, 3, 8]);

        // Emptied trees take a new root again
        tree.clear();
        tree.insert(1, 10);
        tree.insert(2, 20);
        tree.check_consistency();
        assert_eq!(preorder_keys(&tree), vec![1, 2]);
    }

    #[test]
    fn test_insert_overwrites() {
        let mut tree = tree_from(&[5, 3, 8]);
        assert_eq!(tree.insert(3, 33), Some(30));
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.get(&3), Some(&33));
        tree.check_consistency();
    }

    #[test]
    fn test_remove_leaf_and_stem() {
        let mut tree = tree_from(&[5, 3, 8, 9]);
        assert_eq!(tree.remove(&3), Some(30));
        tree.check_consistency();
        assert_eq!(tree.remove(&8), Some(80));
        tree.check_consistency();
        assert_eq!(preorder_keys(&tree), vec![5, 9]);
        assert_eq!(tree.remove(&5), Some(50));
        tree.check_consistency();
        assert_eq!(tree.root().map(|n| *n.key()), Some(9));
        assert_eq!(tree.remove(&9), Some(90));
        assert!(tree.is_empty());
        tree.check_consistency();
    }

    #[test]
    fn test_remove_two_children_uses_predecessor() {
        //     5            4
        //    / \          / \
        //   3   8   ->   3   8
        //  / \          /
        // 1   4        1
        let mut tree = tree_from(&[5, 3, 8, 1, 4]);
        assert_eq!(tree.remove(&5), Some(50));
        tree.check_consistency();
        assert_eq!(preorder_keys(&tree), vec![4, 3, 1, 8]);

        // Predecessor is the direct left child
        //   3        1
        //  / \   ->   \
        // 1   8        8
        let mut tree = tree_from(&[3, 1, 8]);
        assert_eq!(tree.remove(&3), Some(30));
        tree.check_consistency();
        assert_eq!(preorder_keys(&tree), vec![1, 8]);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut tree = tree_from(&[5, 3, 8]);
        let before = preorder_keys(&tree);
        assert_eq!(tree.remove(&42), None);
        assert_eq!(preorder_keys(&tree), before);
        assert_eq!(tree.len(), 3);

        let mut empty: BinarySearchTree<i32, i32> = BinarySearchTree::new();
        assert_eq!(empty.remove(&1), None);
    }

    #[test]
    fn test_node_swap() {
        // Parent and child
        let mut tree = tree_from(&[5, 3, 8, 1, 4]);
        let five = tree.find_node(&5).unwrap();
        let three = tree.find_node(&3).unwrap();
        unsafe { tree.node_swap(five, three) };
        assert_eq!(tree.root().map(|n| *n.key()), Some(3));
        assert_eq!(preorder_keys(&tree), vec![3, 5, 1, 4, 8]);
        assert_eq!(unsafe { five.as_ref().parent }, Some(three));

        // Siblings
        let mut tree = tree_from(&[5, 3, 8]);
        let three = tree.find_node(&3).unwrap();
        let eight = tree.find_node(&8).unwrap();
        unsafe { tree.node_swap(three, eight) };
        assert_eq!(preorder_keys(&tree), vec![5, 8, 3]);

        // Unrelated nodes, swapped back restores the tree
        let mut tree = tree_from(&[5, 3, 8, 1, 9]);
        let one = tree.find_node(&1).unwrap();
        let nine = tree.find_node(&9).unwrap();
        unsafe { tree.node_swap(one, nine) };
        assert_eq!(preorder_keys(&tree), vec![5, 3, 9, 8, 1]);
        unsafe { tree.node_swap(nine, one) };
        assert_eq!(preorder_keys(&tree), vec![5, 3, 1, 8, 9]);
        tree.check_consistency();
    }

    #[test]
    fn test_at_and_index() {
        let mut tree = tree_from(&[2, 1, 3]);
        assert_eq!(tree.at(&2), Ok(&20));
        assert_eq!(tree.at(&7), Err(KeyError));
        *tree.at_mut(&1).unwrap() = 11;
        assert_eq!(tree[&1], 11);
        assert_eq!(tree.at_mut(&7), Err(KeyError));
    }

    #[test]
    #[should_panic(expected = "key not found")]
    fn test_index_missing_panics() {
        let tree = tree_from(&[2, 1, 3]);
        let _ = tree[&4];
    }

    #[test]
    fn test_equal_paths() {
        assert!(tree_from(&[]).has_equal_paths());
        assert!(tree_from(&[1]).has_equal_paths());
        // A chain has a single leaf
        assert!(tree_from(&[1, 2, 3]).has_equal_paths());
        assert!(tree_from(&[2, 1, 3]).has_equal_paths());
        assert!(tree_from(&[4, 2, 6, 1, 3, 5, 7]).has_equal_paths());
        assert!(!tree_from(&[2, 1, 3, 4]).has_equal_paths());
        assert!(tree_from(&[4, 2, 6, 1, 3, 5]).has_equal_paths());
        assert!(!tree_from(&[4, 2, 6, 1, 3]).has_equal_paths());
    }

    #[test]
    fn test_first_last() {
        let tree = tree_from(&[5, 3, 8, 1, 9]);
        assert_eq!(tree.first_key_value(), Some((&1, &10)));
        assert_eq!(tree.last_key_value(), Some((&9, &90)));
        let empty: BinarySearchTree<i32, i32> = BinarySearchTree::new();
        assert!(empty.first_key_value().is_none());
        assert!(empty.last_key_value().is_none());
    }

    #[test]
    fn test_clone_keeps_shape() {
        let tree = tree_from(&[5, 3, 8, 1, 4, 9]);
        let copy = tree.clone();
        copy.check_consistency();
        assert_eq!(preorder_keys(&copy), preorder_keys(&tree));
        assert_eq!(copy, tree);
    }

    #[test]
    fn test_debug() {
        let tree = tree_from(&[2, 1]);
        assert_eq!(format!("{:?}", tree), "{1: 10, 2: 20}");
    }

    #[test]
    fn test_borrowed_lookup() {
        let mut tree = BinarySearchTree::new();
        tree.insert(String::from("b"), 2);
        tree.insert(String::from("a"), 1);
        assert_eq!(tree.get("a"), Some(&1));
        assert!(tree.contains_key("b"));
        assert_eq!(tree.remove("a"), Some(1));
        assert!(!tree.contains_key("a"));
    }
}
