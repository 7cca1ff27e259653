//! Core types shared across modules.

use std::fmt;

// =============================================================================
// Cleanup
// =============================================================================

/// Teardown callback returned or registered by constructs that hold resources.
pub type Cleanup = Box<dyn FnOnce()>;

// =============================================================================
// Node identity
// =============================================================================

/// Handle to a node in a [`NodeTree`](crate::engine::NodeTree).
///
/// Slots are reused after a node is removed; the generation keeps a stale
/// handle from aliasing the new occupant.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// What a node represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Element with a tag name (`"li"`, `"each"`, ...).
    Element { tag: String },
    /// Text leaf.
    Text { content: String },
    /// Invisible anchor bounding a managed region.
    Marker { label: &'static str },
}

impl NodeKind {
    pub fn is_marker(&self) -> bool {
        matches!(self, NodeKind::Marker { .. })
    }
}

// =============================================================================
// Node flags (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// Per-node state bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeFlags: u8 {
        /// Has a parent.
        const ATTACHED = 0b0000_0001;
        /// Region anchor; never rendered.
        const MARKER   = 0b0000_0010;
        /// Repositioned since the last `reset_stats`.
        const MOVED    = 0b0000_0100;
        /// Created since the last `reset_stats`.
        const FRESH    = 0b0000_1000;
    }
}
