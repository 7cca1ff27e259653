//! Renderer - Terminal output for a [`NodeTree`](crate::engine::NodeTree).
//!
//! Writes an indented outline of a subtree. Nodes repositioned since the last
//! [`reset_stats`](crate::engine::NodeTree::reset_stats) are highlighted, which
//! makes reconciliation passes visible when stepping through a demo.

mod outline;

pub use outline::{outline_text, render_outline};
