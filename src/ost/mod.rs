//! Order statistic trees.
//!
//! There's only one tree in here at the moment: a persistent AVL tree over a set of integers which
//! stores each key relative to the ancestor it hangs right of. That encoding is what lets us bump
//! "every key >= k" by one in O(log n), which is the operation everything else leans on when a new
//! character claims an absolute slot.
//!
//! Nodes are reference counted and never modified after construction. Every update hands back a
//! new root, and any old root you're still holding stays valid.

mod transform_tree;

pub use transform_tree::{IndexTransformTree, Iter};
