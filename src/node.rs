//! Tree nodes and the links between them.

use std::fmt;
use std::marker::PhantomData;
use std::ops::Not;
use std::ptr::NonNull;

pub(crate) type NodePtr<K, V, M> = NonNull<Node<K, V, M>>;
pub(crate) type Link<K, V, M> = Option<NodePtr<K, V, M>>;

/// A heap allocated tree node.
///
/// Child links own the nodes they point to, the parent link is a plain
/// back-reference used for walking upwards and is never used to free memory.
/// `M` is per-node bookkeeping of the balancing scheme: `()` for a plain
/// search tree, [`Balance`] for an AVL tree.
pub(crate) struct Node<K, V, M> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) left: Link<K, V, M>,
    pub(crate) right: Link<K, V, M>,
    pub(crate) parent: Link<K, V, M>,
    pub(crate) meta: M,
}

/// Balance factor of an AVL node: height of the right subtree minus height of
/// the left subtree.
///
/// Always in `-1..=1` between public operations. Rebalancing may briefly push
/// it to `±2`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Balance(i8);

/// Side of a child relative to its parent.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Dir {
    Left,
    Right,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

impl Dir {
    /// Balance change caused by growing the subtree on this side.
    pub(crate) fn sign(self) -> i8 {
        match self {
            Dir::Left => -1,
            Dir::Right => 1,
        }
    }
}

impl<K, V, M: Default> Node<K, V, M> {
    pub(crate) fn create(parent: Link<K, V, M>, key: K, value: V) -> NodePtr<K, V, M> {
        let boxed = Box::new(Node {
            key,
            value,
            parent,
            left: None,
            right: None,
            meta: M::default(),
        });
        unsafe { NodePtr::new_unchecked(Box::into_raw(boxed)) }
    }
}

impl<K: Clone, V: Clone, M: Clone> Node<K, V, M> {
    /// Allocates a childless copy of `src_ptr` hanging below `parent`.
    pub(crate) unsafe fn duplicate(
        src_ptr: NodePtr<K, V, M>,
        parent: Link<K, V, M>,
    ) -> NodePtr<K, V, M> {
        let src = src_ptr.as_ref();
        let boxed = Box::new(Node {
            key: src.key.clone(),
            value: src.value.clone(),
            parent,
            left: None,
            right: None,
            meta: src.meta.clone(),
        });
        NodePtr::new_unchecked(Box::into_raw(boxed))
    }
}

impl<K, V, M> Node<K, V, M> {
    /// Frees a node previously returned by `create` and hands back its entry.
    ///
    /// The node must already be unlinked from every other node.
    pub(crate) unsafe fn destroy(node_ptr: NodePtr<K, V, M>) -> (K, V) {
        let node = Box::from_raw(node_ptr.as_ptr());
        (node.key, node.value)
    }

    pub(crate) fn parent(&self) -> Link<K, V, M> {
        self.parent
    }

    pub(crate) fn left(&self) -> Link<K, V, M> {
        self.left
    }

    pub(crate) fn right(&self) -> Link<K, V, M> {
        self.right
    }

    pub(crate) fn child(&self, dir: Dir) -> Link<K, V, M> {
        match dir {
            Dir::Left => self.left,
            Dir::Right => self.right,
        }
    }

    pub(crate) fn child_mut(&mut self, dir: Dir) -> &mut Link<K, V, M> {
        match dir {
            Dir::Left => &mut self.left,
            Dir::Right => &mut self.right,
        }
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    /// Side on which `child_ptr` hangs below this node.
    pub(crate) fn side_of(&self, child_ptr: NodePtr<K, V, M>) -> Dir {
        if self.left == Some(child_ptr) {
            Dir::Left
        } else {
            debug_assert!(self.right == Some(child_ptr));
            Dir::Right
        }
    }
}

impl<K, V> Node<K, V, Balance> {
    pub(crate) fn balance(&self) -> i8 {
        self.meta.0
    }

    pub(crate) fn set_balance(&mut self, balance: i8) {
        self.meta.0 = balance;
    }

    pub(crate) fn update_balance(&mut self, diff: i8) {
        self.meta.0 += diff;
    }
}

/// Leftmost node of the subtree rooted at `node_ptr`.
pub(crate) unsafe fn min_node<K, V, M>(mut node_ptr: NodePtr<K, V, M>) -> NodePtr<K, V, M> {
    while let Some(left_ptr) = node_ptr.as_ref().left {
        node_ptr = left_ptr;
    }
    node_ptr
}

/// Rightmost node of the subtree rooted at `node_ptr`.
pub(crate) unsafe fn max_node<K, V, M>(mut node_ptr: NodePtr<K, V, M>) -> NodePtr<K, V, M> {
    while let Some(right_ptr) = node_ptr.as_ref().right {
        node_ptr = right_ptr;
    }
    node_ptr
}

/// In-order successor of `node_ptr`.
pub(crate) unsafe fn successor<K, V, M>(node_ptr: NodePtr<K, V, M>) -> Link<K, V, M> {
    if let Some(right_ptr) = node_ptr.as_ref().right {
        return Some(min_node(right_ptr));
    }
    let mut current = node_ptr;
    while let Some(parent_ptr) = current.as_ref().parent {
        if parent_ptr.as_ref().left == Some(current) {
            return Some(parent_ptr);
        }
        current = parent_ptr;
    }
    None
}

/// In-order predecessor of `node_ptr`.
pub(crate) unsafe fn predecessor<K, V, M>(node_ptr: NodePtr<K, V, M>) -> Link<K, V, M> {
    if let Some(left_ptr) = node_ptr.as_ref().left {
        return Some(max_node(left_ptr));
    }
    let mut current = node_ptr;
    while let Some(parent_ptr) = current.as_ref().parent {
        if parent_ptr.as_ref().right == Some(current) {
            return Some(parent_ptr);
        }
        current = parent_ptr;
    }
    None
}

/// A shared view of a node inside a tree.
///
/// Obtained from `find` or `root`; allows walking the tree structure without
/// giving out mutable access.
pub struct NodeRef<'a, K, V, M = ()> {
    node_ptr: NodePtr<K, V, M>,
    marker: PhantomData<&'a Node<K, V, M>>,
}

impl<'a, K, V, M> NodeRef<'a, K, V, M> {
    pub(crate) fn new(node_ptr: NodePtr<K, V, M>) -> Self {
        Self {
            node_ptr,
            marker: PhantomData,
        }
    }

    fn node(&self) -> &'a Node<K, V, M> {
        unsafe { &*self.node_ptr.as_ptr() }
    }

    fn wrap(link: Link<K, V, M>) -> Option<Self> {
        link.map(Self::new)
    }

    /// Returns the key stored in this node.
    pub fn key(&self) -> &'a K {
        &self.node().key
    }

    /// Returns the value stored in this node.
    pub fn value(&self) -> &'a V {
        &self.node().value
    }

    /// Returns the parent node, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        Self::wrap(self.node().parent())
    }

    /// Returns the left child.
    pub fn left(&self) -> Option<Self> {
        Self::wrap(self.node().left())
    }

    /// Returns the right child.
    pub fn right(&self) -> Option<Self> {
        Self::wrap(self.node().right())
    }

    /// Returns true if the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.node().is_leaf()
    }
}

impl<'a, K, V> NodeRef<'a, K, V, Balance> {
    /// Returns the balance factor: right subtree height minus left subtree height.
    pub fn balance(&self) -> i8 {
        self.node().balance()
    }
}

impl<K, V, M> Clone for NodeRef<'_, K, V, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V, M> Copy for NodeRef<'_, K, V, M> {}

impl<K, V, M> PartialEq for NodeRef<'_, K, V, M> {
    fn eq(&self, other: &Self) -> bool {
        self.node_ptr == other.node_ptr
    }
}

impl<K, V, M> Eq for NodeRef<'_, K, V, M> {}

impl<K: fmt::Debug, V: fmt::Debug, M: fmt::Debug> fmt::Debug for NodeRef<'_, K, V, M> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("key", self.key())
            .field("value", self.value())
            .field("meta", &self.node().meta)
            .finish()
    }
}
