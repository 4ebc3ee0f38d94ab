//! A height balanced map built on [`BinarySearchTree`].
//!
//! Every node carries its balance factor (right height minus left height).
//! After an insertion or removal the factors are corrected walking upwards
//! from the point of change, rotating where a factor reaches ±2.

use std::borrow::Borrow;
use std::fmt;
use std::iter::FromIterator;
use std::mem;
use std::ops::Index;

use log::trace;

use crate::bst::{BinarySearchTree, InsertPos};
use crate::error::Result;
use crate::iter::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
use crate::node::{self, Balance, Dir, Link, NodePtr, NodeRef};

type AvlPtr<K, V> = NodePtr<K, V, Balance>;
type AvlLink<K, V> = Link<K, V, Balance>;

/// An ordered map implemented with an AVL tree.
///
/// ```
/// use avlbst::AvlTree;
/// let mut tree = AvlTree::new();
/// tree.insert(1, "one");
/// tree.insert(2, "two");
/// tree.insert(3, "three");
/// assert_eq!(tree.root().map(|node| *node.key()), Some(2));
/// assert_eq!(tree.get(&3), Some(&"three"));
/// tree.remove(&3);
/// assert!(tree.get(&3).is_none());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct AvlTree<K, V> {
    tree: BinarySearchTree<K, V, Balance>,
}

impl<K, V> AvlTree<K, V> {
    /// Creates an empty map.
    /// No memory is allocated until the first item is inserted.
    pub fn new() -> Self {
        Self {
            tree: BinarySearchTree::empty(),
        }
    }

    /// Returns true if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns the number of elements in the map.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Clears the map, deallocating all memory.
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Returns the root node, if any.
    pub fn root(&self) -> Option<NodeRef<'_, K, V, Balance>> {
        self.tree.root()
    }

    /// Returns the number of levels in the tree; zero for an empty tree.
    ///
    /// Follows the taller side of each node, so this takes logarithmic time.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut current = self.tree.root;
        while let Some(node_ptr) = current {
            height += 1;
            let node = unsafe { node_ptr.as_ref() };
            current = if node.balance() > 0 {
                node.right()
            } else {
                node.left()
            };
        }
        height
    }

    /// Returns true if the subtrees of every node differ in height by at most one.
    ///
    /// Recomputes the heights instead of trusting the stored balances.
    pub fn is_balanced(&self) -> bool {
        self.tree.is_balanced()
    }

    /// Returns true if every leaf is at the same depth.
    pub fn has_equal_paths(&self) -> bool {
        self.tree.has_equal_paths()
    }

    /// Returns the first key-value pair in the map.
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.tree.first_key_value()
    }

    /// Returns the last key-value pair in the map.
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.tree.last_key_value()
    }

    /// Gets an iterator over the entries of the map, sorted by key.
    pub fn iter(&self) -> Iter<'_, K, V, Balance> {
        self.tree.iter()
    }

    /// Gets a mutable iterator over the entries of the map, sorted by key.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V, Balance> {
        self.tree.iter_mut()
    }

    /// Gets an iterator over the keys of the map, in sorted order.
    pub fn keys(&self) -> Keys<'_, K, V, Balance> {
        self.tree.keys()
    }

    /// Gets an iterator over the values of the map, in order by key.
    pub fn values(&self) -> Values<'_, K, V, Balance> {
        self.tree.values()
    }

    /// Gets a mutable iterator over the values of the map, in order by key.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V, Balance> {
        self.tree.values_mut()
    }

    /// Lifts the right child of `node_ptr` into its place.
    /// Does nothing if there is no right child. Balance factors are left as they are.
    fn rotate_left(&mut self, mut node_ptr: AvlPtr<K, V>) {
        unsafe {
            if let Some(mut right_ptr) = node_ptr.as_ref().right {
                trace!("rotate left");
                node_ptr.as_mut().right = right_ptr.as_ref().left;
                if let Some(mut right_left_ptr) = right_ptr.as_ref().left {
                    right_left_ptr.as_mut().parent = Some(node_ptr);
                }

                let parent = node_ptr.as_ref().parent;
                right_ptr.as_mut().parent = parent;
                self.tree.replace_child(parent, node_ptr, Some(right_ptr));

                right_ptr.as_mut().left = Some(node_ptr);
                node_ptr.as_mut().parent = Some(right_ptr);
            }
        }
    }

    /// Lifts the left child of `node_ptr` into its place.
    /// Does nothing if there is no left child. Balance factors are left as they are.
    fn rotate_right(&mut self, mut node_ptr: AvlPtr<K, V>) {
        unsafe {
            if let Some(mut left_ptr) = node_ptr.as_ref().left {
                trace!("rotate right");
                node_ptr.as_mut().left = left_ptr.as_ref().right;
                if let Some(mut left_right_ptr) = left_ptr.as_ref().right {
                    left_right_ptr.as_mut().parent = Some(node_ptr);
                }

                let parent = node_ptr.as_ref().parent;
                left_ptr.as_mut().parent = parent;
                self.tree.replace_child(parent, node_ptr, Some(left_ptr));

                left_ptr.as_mut().right = Some(node_ptr);
                node_ptr.as_mut().parent = Some(left_ptr);
            }
        }
    }

    fn rotate(&mut self, node_ptr: AvlPtr<K, V>, dir: Dir) {
        match dir {
            Dir::Left => self.rotate_left(node_ptr),
            Dir::Right => self.rotate_right(node_ptr),
        }
    }

    /// Swaps the tree positions of two nodes together with their balance
    /// factors, so each position keeps the factor that describes it.
    unsafe fn node_swap(&mut self, mut a_ptr: AvlPtr<K, V>, mut b_ptr: AvlPtr<K, V>) {
        self.tree.node_swap(a_ptr, b_ptr);
        let a_balance = a_ptr.as_ref().balance();
        a_ptr.as_mut().set_balance(b_ptr.as_ref().balance());
        b_ptr.as_mut().set_balance(a_balance);
    }

    /// Restores balance after the subtree at `parent_ptr` grew one level
    /// because `node_ptr` below it grew.
    ///
    /// The balance of `parent_ptr` must already account for the growth.
    unsafe fn insert_fix(&mut self, mut parent_ptr: AvlPtr<K, V>, mut node_ptr: AvlPtr<K, V>) {
        while let Some(mut grand_ptr) = parent_ptr.as_ref().parent {
            let dir = grand_ptr.as_ref().side_of(parent_ptr);
            grand_ptr.as_mut().update_balance(dir.sign());
            let grand_balance = grand_ptr.as_ref().balance();

            if grand_balance == 0 {
                trace!("insert fixup: height absorbed");
                return;
            }
            if grand_balance == dir.sign() {
                node_ptr = parent_ptr;
                parent_ptr = grand_ptr;
                continue;
            }

            debug_assert_eq!(grand_balance, 2 * dir.sign());
            if parent_ptr.as_ref().side_of(node_ptr) == dir {
                trace!("insert fixup: single rotation");
                self.rotate(grand_ptr, !dir);
                parent_ptr.as_mut().set_balance(0);
                grand_ptr.as_mut().set_balance(0);
            } else {
                trace!("insert fixup: double rotation");
                let node_balance = node_ptr.as_ref().balance();
                self.rotate(parent_ptr, dir);
                self.rotate(grand_ptr, !dir);
                let (parent_balance, grand_balance) = if node_balance == dir.sign() {
                    (0, -dir.sign())
                } else if node_balance == 0 {
                    (0, 0)
                } else {
                    (dir.sign(), 0)
                };
                parent_ptr.as_mut().set_balance(parent_balance);
                grand_ptr.as_mut().set_balance(grand_balance);
                node_ptr.as_mut().set_balance(0);
            }
            return;
        }
    }

    /// Restores balance after the subtree on one side of `start` lost a level.
    ///
    /// `diff` is the resulting change of the balance of `start`: `+1` when its
    /// left side shrank, `-1` when its right side shrank.
    unsafe fn remove_fix(&mut self, start: AvlLink<K, V>, mut diff: i8) {
        let mut current = start;
        while let Some(mut node_ptr) = current {
            debug_assert!(diff == 1 || diff == -1);
            let parent = node_ptr.as_ref().parent;
            let next_diff = match parent {
                Some(parent_ptr) => -parent_ptr.as_ref().side_of(node_ptr).sign(),
                None => 0,
            };
            let heavy = if diff > 0 { Dir::Right } else { Dir::Left };
            let balance = node_ptr.as_ref().balance() + diff;

            if balance == 2 * diff {
                let mut child_ptr = match node_ptr.as_ref().child(heavy) {
                    Some(child_ptr) => child_ptr,
                    None => unreachable!("doubly heavy side is empty"),
                };
                let child_balance = child_ptr.as_ref().balance();
                if child_balance == diff {
                    trace!("remove fixup: single rotation");
                    self.rotate(node_ptr, !heavy);
                    node_ptr.as_mut().set_balance(0);
                    child_ptr.as_mut().set_balance(0);
                } else if child_balance == 0 {
                    trace!("remove fixup: single rotation, height kept");
                    self.rotate(node_ptr, !heavy);
                    node_ptr.as_mut().set_balance(diff);
                    child_ptr.as_mut().set_balance(-diff);
                    return;
                } else {
                    trace!("remove fixup: double rotation");
                    let mut grand_ptr = match child_ptr.as_ref().child(!heavy) {
                        Some(grand_ptr) => grand_ptr,
                        None => unreachable!("inner grandchild of a leaning child is empty"),
                    };
                    let grand_balance = grand_ptr.as_ref().balance();
                    self.rotate(child_ptr, heavy);
                    self.rotate(node_ptr, !heavy);
                    let (node_balance, child_balance) = if grand_balance == -diff {
                        (0, diff)
                    } else if grand_balance == 0 {
                        (0, 0)
                    } else {
                        (-diff, 0)
                    };
                    node_ptr.as_mut().set_balance(node_balance);
                    child_ptr.as_mut().set_balance(child_balance);
                    grand_ptr.as_mut().set_balance(0);
                }
            } else if balance == diff {
                // Was level, so the height is unchanged
                node_ptr.as_mut().set_balance(diff);
                return;
            } else {
                node_ptr.as_mut().set_balance(0);
            }

            current = parent;
            diff = next_diff;
        }
    }
}

impl<K: Ord, V> AvlTree<K, V> {
    /// Returns the node holding `key`.
    ///
    /// The key may be any borrowed form of the map's key type, but the ordering
    /// on the borrowed form *must* match the ordering on the key type.
    pub fn find<Q>(&self, key: &Q) -> Option<NodeRef<'_, K, V, Balance>>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.find(key)
    }

    /// Returns a reference to the value corresponding to the key.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.get(key)
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.get_mut(key)
    }

    /// Returns references to the key-value pair corresponding to the key.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.get_key_value(key)
    }

    /// Returns true if the map contains a value for the key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.contains_key(key)
    }

    /// Returns a reference to the value corresponding to the key,
    /// or [`KeyError`](crate::KeyError) if there is none.
    pub fn at<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.at(key)
    }

    /// Returns a mutable reference to the value corresponding to the key,
    /// or [`KeyError`](crate::KeyError) if there is none.
    pub fn at_mut<Q>(&mut self, key: &Q) -> Result<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.at_mut(key)
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the key is already present its value is overwritten in place and the
    /// old value is returned; the tree structure does not change.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let (parent, dir) = match self.tree.find_insert_pos(&key) {
            InsertPos::Occupied(node_ptr) => {
                return Some(mem::replace(unsafe { &mut (*node_ptr.as_ptr()).value }, value));
            }
            InsertPos::Vacant(parent, dir) => (parent, dir),
        };

        unsafe {
            let node_ptr = self.tree.attach(parent, dir, key, value);
            if let Some(mut parent_ptr) = parent {
                if parent_ptr.as_ref().balance() != 0 {
                    // A leaning parent had its only child on the other side,
                    // so the new leaf evens it out without changing its height.
                    debug_assert_eq!(parent_ptr.as_ref().balance(), -dir.sign());
                    parent_ptr.as_mut().set_balance(0);
                } else {
                    parent_ptr.as_mut().update_balance(dir.sign());
                    self.insert_fix(parent_ptr, node_ptr);
                }
            }
        }
        None
    }

    /// Removes a key from the map.
    /// Returns the value at the key if the key was previously in the map.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes a key from the map.
    /// Returns the stored key and value if the key was previously in the map.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node_ptr = self.tree.find_node(key)?;
        unsafe {
            let (left, right) = (node_ptr.as_ref().left, node_ptr.as_ref().right);
            if let (Some(left_ptr), Some(_)) = (left, right) {
                // Trade places with the in-order predecessor, which has no right child
                self.node_swap(node_ptr, node::max_node(left_ptr));
            }

            let parent = node_ptr.as_ref().parent;
            let diff = match parent {
                Some(parent_ptr) => -parent_ptr.as_ref().side_of(node_ptr).sign(),
                None => 0,
            };
            self.tree.splice_out(node_ptr);
            let entry = self.tree.take_node(node_ptr);
            self.remove_fix(parent, diff);
            Some(entry)
        }
    }

    /// Asserts that the internal tree structure is consistent.
    ///
    /// Besides the search tree links and ordering, every balance factor must
    /// equal the actual height difference of its subtrees and lie in `-1..=1`.
    #[cfg(any(test, feature = "consistency_check"))]
    pub fn check_consistency(&self) {
        self.tree.check_consistency();

        let height = self.tree.fold_heights(|node_ptr, left_height, right_height| {
            let balance = unsafe { node_ptr.as_ref().balance() };
            assert_eq!(balance as isize, right_height as isize - left_height as isize);
            assert!((-1..=1).contains(&balance));
        });
        assert_eq!(height, self.height());
    }
}

impl<K, V> Default for AvlTree<K, V> {
    /// Creates an empty map.
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for AvlTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, Q, V> Index<&Q> for AvlTree<K, V>
where
    K: Ord + Borrow<Q>,
    Q: Ord + ?Sized,
{
    type Output = V;

    /// Returns a reference to the value corresponding to the key.
    ///
    /// # Panics
    ///
    /// Panics if the key is not present in the map.
    fn index(&self, key: &Q) -> &V {
        &self.tree[key]
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for AvlTree<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

impl<K: Ord, V> Extend<(K, V)> for AvlTree<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        iter.into_iter().for_each(move |(key, value)| {
            self.insert(key, value);
        });
    }
}

impl<'a, K, V> IntoIterator for &'a AvlTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, Balance>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V> IntoIterator for &'a mut AvlTree<K, V> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V, Balance>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V> IntoIterator for AvlTree<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, Balance>;

    fn into_iter(self) -> Self::IntoIter {
        self.tree.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_without_child_is_noop() {
        let mut tree = AvlTree::new();
        tree.insert(1, ());
        let root_ptr = tree.tree.root.unwrap();
        tree.rotate_left(root_ptr);
        tree.rotate_right(root_ptr);
        assert_eq!(tree.tree.root, Some(root_ptr));
        tree.check_consistency();
    }

    #[test]
    fn test_rotations_keep_order() {
        //   2          3
        //  / \        /
        // 1   3  ->  2
        //           /
        //          1
        let mut tree: AvlTree<i32, ()> = [(2, ()), (1, ()), (3, ())].into_iter().collect();
        let root_ptr = tree.tree.root.unwrap();
        tree.rotate_left(root_ptr);
        tree.tree.check_consistency();
        assert_eq!(tree.root().map(|node| *node.key()), Some(3));
        assert_eq!(tree.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);

        let new_root_ptr = tree.tree.root.unwrap();
        tree.rotate_right(new_root_ptr);
        tree.tree.check_consistency();
        assert_eq!(tree.root().map(|node| *node.key()), Some(2));
    }

    #[test]
    fn test_node_swap_exchanges_balances() {
        //   2
        //  /
        // 1
        let mut tree: AvlTree<i32, ()> = [(2, ()), (1, ())].into_iter().collect();
        let two = tree.tree.find_node(&2).unwrap();
        let one = tree.tree.find_node(&1).unwrap();
        unsafe {
            assert_eq!(two.as_ref().balance(), -1);
            assert_eq!(one.as_ref().balance(), 0);
            tree.node_swap(two, one);
            assert_eq!(tree.tree.root, Some(one));
            assert_eq!(one.as_ref().balance(), -1);
            assert_eq!(two.as_ref().balance(), 0);
        }
    }
}
