//! Host - Output primitives the reconciler drives.
//!
//! The reconciler and branch selector never build output themselves. They call
//! these primitives on whatever output layer implements [`Host`]: a DOM
//! binding, a terminal tree, or the in-memory [`NodeTree`](super::NodeTree).

use std::fmt::Debug;
use std::hash::Hash;

use crate::types::Cleanup;

/// Node creation, placement and removal.
///
/// `insert_before` and `append_child` move a node that is already attached,
/// exactly like the DOM methods of the same name.
pub trait Host: Clone + 'static {
    /// Node handle. Equality means "same node".
    type Node: Clone + Eq + Hash + Debug + 'static;

    /// Create a detached container element.
    fn create_container(&self, tag: &str) -> Self::Node;

    /// Create a detached region anchor.
    fn create_marker(&self, label: &'static str) -> Self::Node;

    /// Attach `child` as the last child of `parent`.
    fn append_child(&self, parent: &Self::Node, child: &Self::Node);

    /// Attach `node` immediately before `reference`, a child of `parent`.
    fn insert_before(&self, parent: &Self::Node, node: &Self::Node, reference: &Self::Node);

    /// Following sibling, if any.
    fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Detach `node` and dispose it with its subtree. No-op for dead nodes.
    fn remove(&self, node: &Self::Node);

    /// Run `cleanup` when `node` is removed.
    fn on_remove(&self, node: &Self::Node, cleanup: Cleanup);
}
