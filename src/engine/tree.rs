//! NodeTree - In-memory output tree.
//!
//! An arena of nodes addressed by [`NodeId`]:
//! - Free slot pool for O(1) reuse, with generations against stale handles
//! - Parent/children links with DOM-style `insert_before` semantics
//! - Destroy callbacks per node, run when the node is removed
//! - Operation counters ([`OpStats`]) for measuring reconciliation cost
//!
//! Removing a node releases its whole subtree: the node's own destroy
//! callbacks run first, then children are released recursively.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::host::Host;
use crate::types::{Cleanup, NodeFlags, NodeId, NodeKind};

// =============================================================================
// Tree State
// =============================================================================

/// Structural operation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpStats {
    /// Nodes allocated.
    pub created: usize,
    /// Detached nodes attached to a parent.
    pub inserted: usize,
    /// Attached nodes repositioned.
    pub moved: usize,
    /// `remove` calls on live nodes.
    pub removed: usize,
}

struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    flags: NodeFlags,
}

#[derive(Default)]
struct Slot {
    generation: u32,
    node: Option<NodeData>,
}

#[derive(Default)]
struct TreeState {
    slots: Vec<Slot>,
    free: Vec<u32>,
    destroy_callbacks: HashMap<NodeId, Vec<Cleanup>>,
    stats: OpStats,
    live: usize,
}

impl TreeState {
    fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    fn allocate(&mut self, kind: NodeKind) -> NodeId {
        let mut flags = NodeFlags::FRESH;
        if kind.is_marker() {
            flags |= NodeFlags::MARKER;
        }
        let data = NodeData {
            kind,
            parent: None,
            children: Vec::new(),
            flags,
        };

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.node = Some(data);

        self.stats.created += 1;
        self.live += 1;
        NodeId {
            index,
            generation: slot.generation,
        }
    }

    /// Unlink `id` from its parent. Returns whether it was attached.
    fn detach(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.node(id).and_then(|node| node.parent) else {
            return false;
        };
        if let Some(parent) = self.node_mut(parent) {
            parent.children.retain(|child| *child != id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
            node.flags.remove(NodeFlags::ATTACHED);
        }
        true
    }

    fn is_ancestor(&self, ancestor: NodeId, mut id: NodeId) -> bool {
        while let Some(parent) = self.node(id).and_then(|node| node.parent) {
            if parent == ancestor {
                return true;
            }
            id = parent;
        }
        false
    }

    /// Attach `node` under `parent`, before `reference` or at the end.
    fn attach(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>) {
        if self.node(parent).is_none() || self.node(node).is_none() {
            tracing::warn!(?parent, ?node, "attach on a dead node ignored");
            return;
        }
        if parent == node || self.is_ancestor(node, parent) {
            tracing::warn!(?parent, ?node, "attach would create a cycle; ignored");
            return;
        }
        if reference == Some(node) {
            return;
        }

        let was_attached = self.detach(node);

        let Some(parent_data) = self.node_mut(parent) else {
            return;
        };
        let position = match reference {
            Some(reference) => match parent_data.children.iter().position(|c| *c == reference) {
                Some(position) => position,
                None => {
                    tracing::warn!(?parent, ?reference, "reference is not a child; appending");
                    parent_data.children.len()
                }
            },
            None => parent_data.children.len(),
        };
        parent_data.children.insert(position, node);

        if let Some(node_data) = self.node_mut(node) {
            node_data.parent = Some(parent);
            node_data.flags.insert(NodeFlags::ATTACHED);
            if was_attached {
                node_data.flags.insert(NodeFlags::MOVED);
            }
        }

        if was_attached {
            self.stats.moved += 1;
        } else {
            self.stats.inserted += 1;
        }
    }

    fn free(&mut self, id: NodeId) {
        let Some(slot) = self.slots.get_mut(id.index as usize) else {
            return;
        };
        if slot.generation != id.generation || slot.node.is_none() {
            return;
        }
        slot.node = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
    }
}

// =============================================================================
// NodeTree
// =============================================================================

/// Shared handle to an output tree.
///
/// Cloning yields another handle to the same tree.
#[derive(Clone, Default)]
pub struct NodeTree {
    state: Rc<RefCell<TreeState>>,
}

impl NodeTree {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    /// Create a detached element.
    pub fn element(&self, tag: impl Into<String>) -> NodeId {
        self.state
            .borrow_mut()
            .allocate(NodeKind::Element { tag: tag.into() })
    }

    /// Create a detached text node.
    pub fn text(&self, content: impl Into<String>) -> NodeId {
        self.state.borrow_mut().allocate(NodeKind::Text {
            content: content.into(),
        })
    }

    /// Create a detached region anchor.
    pub fn marker(&self, label: &'static str) -> NodeId {
        self.state
            .borrow_mut()
            .allocate(NodeKind::Marker { label })
    }

    // -------------------------------------------------------------------------
    // Structure
    // -------------------------------------------------------------------------

    pub fn append_child(&self, parent: NodeId, child: NodeId) {
        self.state.borrow_mut().attach(parent, child, None);
    }

    pub fn insert_before(&self, parent: NodeId, node: NodeId, reference: NodeId) {
        self.state.borrow_mut().attach(parent, node, Some(reference));
    }

    /// Detach `id` and release it with its subtree.
    pub fn remove(&self, id: NodeId) {
        {
            let mut state = self.state.borrow_mut();
            if state.node(id).is_none() {
                return;
            }
            state.detach(id);
            state.stats.removed += 1;
        }
        self.release(id);
    }

    fn release(&self, id: NodeId) {
        if !self.is_alive(id) {
            return;
        }

        // Callbacks may touch the tree; nothing is borrowed while they run.
        let callbacks = self.state.borrow_mut().destroy_callbacks.remove(&id);
        if let Some(callbacks) = callbacks {
            for callback in callbacks {
                callback();
            }
        }

        for child in self.children(id) {
            self.release(child);
        }

        self.state.borrow_mut().free(id);
    }

    /// Register a callback to run when `id` is removed.
    ///
    /// Runs immediately when `id` is already dead.
    pub fn on_destroy(&self, id: NodeId, callback: impl FnOnce() + 'static) {
        if !self.is_alive(id) {
            callback();
            return;
        }
        self.state
            .borrow_mut()
            .destroy_callbacks
            .entry(id)
            .or_default()
            .push(Box::new(callback));
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    pub fn is_alive(&self, id: NodeId) -> bool {
        self.state.borrow().node(id).is_some()
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.state.borrow().node(id).map(|node| node.kind.clone())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.state.borrow().node(id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.state
            .borrow()
            .node(id)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    /// Children that are not region markers.
    pub fn content_children(&self, id: NodeId) -> Vec<NodeId> {
        let state = self.state.borrow();
        let Some(node) = state.node(id) else {
            return Vec::new();
        };
        node.children
            .iter()
            .copied()
            .filter(|child| {
                state
                    .node(*child)
                    .is_some_and(|data| !data.flags.contains(NodeFlags::MARKER))
            })
            .collect()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let state = self.state.borrow();
        let parent = state.node(id)?.parent?;
        let siblings = &state.node(parent)?.children;
        let position = siblings.iter().position(|child| *child == id)?;
        siblings.get(position + 1).copied()
    }

    /// Flags of a live node; empty for dead ones.
    pub fn flags(&self, id: NodeId) -> NodeFlags {
        self.state
            .borrow()
            .node(id)
            .map(|node| node.flags)
            .unwrap_or_default()
    }

    /// Text content of a text node.
    pub fn text_content(&self, id: NodeId) -> Option<String> {
        match self.state.borrow().node(id)?.kind {
            NodeKind::Text { ref content } => Some(content.clone()),
            _ => None,
        }
    }

    /// Replace the content of a text node. Returns `false` for other nodes.
    pub fn set_text(&self, id: NodeId, content: impl Into<String>) -> bool {
        let mut state = self.state.borrow_mut();
        match state.node_mut(id).map(|node| &mut node.kind) {
            Some(NodeKind::Text { content: current }) => {
                *current = content.into();
                true
            }
            _ => false,
        }
    }

    /// Concatenated text of a subtree, in document order.
    pub fn text_of(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        if let Some(text) = self.text_content(id) {
            out.push_str(&text);
        }
        for child in self.children(id) {
            self.collect_text(child, out);
        }
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.state.borrow().live
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -------------------------------------------------------------------------
    // Stats
    // -------------------------------------------------------------------------

    pub fn stats(&self) -> OpStats {
        self.state.borrow().stats
    }

    /// Zero the counters and clear `MOVED`/`FRESH` flags.
    pub fn reset_stats(&self) {
        let mut state = self.state.borrow_mut();
        state.stats = OpStats::default();
        for slot in &mut state.slots {
            if let Some(node) = slot.node.as_mut() {
                node.flags.remove(NodeFlags::MOVED | NodeFlags::FRESH);
            }
        }
    }
}

impl fmt::Debug for NodeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("NodeTree")
            .field("live", &state.live)
            .field("capacity", &state.slots.len())
            .field("stats", &state.stats)
            .finish()
    }
}

impl Host for NodeTree {
    type Node = NodeId;

    fn create_container(&self, tag: &str) -> NodeId {
        self.element(tag)
    }

    fn create_marker(&self, label: &'static str) -> NodeId {
        self.marker(label)
    }

    fn append_child(&self, parent: &NodeId, child: &NodeId) {
        NodeTree::append_child(self, *parent, *child);
    }

    fn insert_before(&self, parent: &NodeId, node: &NodeId, reference: &NodeId) {
        NodeTree::insert_before(self, *parent, *node, *reference);
    }

    fn next_sibling(&self, node: &NodeId) -> Option<NodeId> {
        NodeTree::next_sibling(self, *node)
    }

    fn remove(&self, node: &NodeId) {
        NodeTree::remove(self, *node);
    }

    fn on_remove(&self, node: &NodeId, cleanup: Cleanup) {
        self.on_destroy(*node, cleanup);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_allocate_and_reuse_slot() {
        let tree = NodeTree::new();

        let a = tree.element("a");
        let b = tree.element("b");
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);

        tree.remove(a);
        assert!(!tree.is_alive(a));

        // Slot reused, handle is not.
        let c = tree.text("c");
        assert_eq!(c.index(), a.index());
        assert_ne!(c, a);
        assert!(!tree.is_alive(a));
        assert!(tree.is_alive(c));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_insert_before_and_siblings() {
        let tree = NodeTree::new();
        let root = tree.element("ul");
        let a = tree.text("a");
        let b = tree.text("b");
        let c = tree.text("c");

        tree.append_child(root, a);
        tree.append_child(root, c);
        tree.insert_before(root, b, c);

        assert_eq!(tree.children(root), vec![a, b, c]);
        assert_eq!(tree.next_sibling(a), Some(b));
        assert_eq!(tree.next_sibling(c), None);
        assert_eq!(tree.parent(b), Some(root));
        assert_eq!(tree.text_of(root), "abc");
    }

    #[test]
    fn test_move_counts_separately_from_insert() {
        let tree = NodeTree::new();
        let root = tree.element("ul");
        let a = tree.text("a");
        let b = tree.text("b");
        tree.append_child(root, a);
        tree.append_child(root, b);

        tree.reset_stats();
        tree.insert_before(root, b, a);

        assert_eq!(tree.children(root), vec![b, a]);
        let stats = tree.stats();
        assert_eq!(stats.moved, 1);
        assert_eq!(stats.inserted, 0);
        assert!(tree.flags(b).contains(NodeFlags::MOVED));
        assert!(!tree.flags(a).contains(NodeFlags::MOVED));
    }

    #[test]
    fn test_remove_releases_subtree_and_runs_callbacks() {
        let tree = NodeTree::new();
        let root = tree.element("div");
        let child = tree.element("span");
        let leaf = tree.text("x");
        tree.append_child(root, child);
        tree.append_child(child, leaf);

        let fired = Rc::new(Cell::new(0));
        for id in [root, child, leaf] {
            let fired = fired.clone();
            tree.on_destroy(id, move || fired.set(fired.get() + 1));
        }

        tree.remove(root);
        assert_eq!(fired.get(), 3);
        assert!(tree.is_empty());
        assert_eq!(tree.stats().removed, 1);
    }

    #[test]
    fn test_destroy_callback_may_touch_tree() {
        let tree = NodeTree::new();
        let root = tree.element("div");
        let child = tree.text("x");
        tree.append_child(root, child);

        let handle = tree.clone();
        tree.on_destroy(root, move || handle.remove(child));

        tree.remove(root);
        assert!(!tree.is_alive(child));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_cycle_is_rejected() {
        let tree = NodeTree::new();
        let outer = tree.element("outer");
        let inner = tree.element("inner");
        tree.append_child(outer, inner);

        tree.append_child(inner, outer);
        assert_eq!(tree.parent(outer), None);
        assert_eq!(tree.children(inner), Vec::<NodeId>::new());
    }

    #[test]
    fn test_set_text_only_on_text_nodes() {
        let tree = NodeTree::new();
        let text = tree.text("old");
        let element = tree.element("p");

        assert!(tree.set_text(text, "new"));
        assert_eq!(tree.text_content(text).as_deref(), Some("new"));
        assert!(!tree.set_text(element, "nope"));
    }

    #[test]
    fn test_late_on_destroy_runs_immediately() {
        let tree = NodeTree::new();
        let node = tree.text("gone");
        tree.remove(node);

        let ran = Rc::new(Cell::new(false));
        let ran_clone = ran.clone();
        tree.on_destroy(node, move || ran_clone.set(true));
        assert!(ran.get());
    }
}
