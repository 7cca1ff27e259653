//! Output Primitives - Dynamic regions of the output tree.
//!
//! - [`reconcile`] - Keyed list rendering with minimal moves
//! - [`select_branch`] / [`show`] - First-true-wins conditional rendering
//! - [`Region`] - The anchor pair both of them manage
//!
//! # Ownership
//!
//! Every primitive creates its own host node and hangs its teardown on it.
//! Mount that node wherever it belongs; removing it from the tree disposes
//! everything the primitive rendered and unsubscribes it from its sources.
//!
//! ```text
//! container ("each" | "branch")
//! ├── ◆ region-start
//! ├── rendered node
//! ├── rendered node
//! └── ◆ region-end
//! ```

mod control_flow;
mod lis;
mod reconcile;
mod region;
mod types;

pub use control_flow::{select_branch, show, Branch, Selected};
pub use lis::lis;
pub use reconcile::{reconcile, PassReport, Placement, Reconciled};
pub use region::Region;
pub use types::{KeyFn, Thunk};
