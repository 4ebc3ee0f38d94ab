//! An AVL tree map layered on a parent-linked binary search tree.
//!
//! [`BinarySearchTree`] provides the unbalanced base: lookup, in-order
//! iteration and the node plumbing used when removing. [`AvlTree`] keeps a
//! balance factor in every node and restores the AVL property after each
//! insertion and removal, so the height stays logarithmic in the number of
//! entries.
//!
//! ```
//! use avlbst::AvlTree;
//!
//! let mut tree = AvlTree::new();
//! for key in 1..=7 {
//!     tree.insert(key, key * 10);
//! }
//! assert_eq!(tree.height(), 3);
//! assert_eq!(tree.at(&4), Ok(&40));
//! assert!(tree.at(&8).is_err());
//! ```

mod avl;
mod bst;
mod error;
mod iter;
mod node;

pub use avl::AvlTree;
pub use bst::BinarySearchTree;
pub use error::{KeyError, Result};
pub use iter::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
pub use node::{Balance, NodeRef};
