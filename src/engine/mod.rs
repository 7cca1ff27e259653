//! Output engine - The host boundary and the built-in node tree.
//!
//! - [`Host`]: primitives the reconciler invokes without knowing the output
//! - [`NodeTree`]: arena-backed host with destroy callbacks and op counters
//!
//! # Architecture
//!
//! Nodes are NOT objects. They are generation-checked indices into an arena:
//!
//! ```text
//! #0v0: Element "ul"    children=[#1v0, #3v0, #2v0]
//! #1v0: Marker  "start"
//! #3v0: Text    "Alice"
//! #2v0: Marker  "end"
//! ```
//!
//! Removing a node releases its subtree and runs its destroy callbacks. That
//! is how reconcilers and branch selectors learn that their host node is gone.

mod host;
mod tree;

pub use host::Host;
pub use tree::{NodeTree, OpStats};
