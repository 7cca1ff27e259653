//! # spark-dom
//!
//! Fine-grained reactive cells and keyed output reconciliation.
//!
//! ## Architecture
//!
//! Writes never touch the output directly. A write marks a cell pending; the
//! scheduler coalesces pending cells and delivers one notification per cell
//! per drain. Derived views recompute against the coalesced snapshot, and the
//! output primitives apply the smallest set of structural edits to the tree:
//!
//! ```text
//! Cell::set → scheduler → subscribers → derived views → reconcile / select_branch → Host
//! ```
//!
//! ## Modules
//!
//! - [`reactive`] - Cells, the write-coalescing scheduler, derived views, scopes
//! - [`engine`] - The [`Host`] boundary and [`NodeTree`], the built-in host
//! - [`primitives`] - Keyed reconciler, branch selector, region anchors
//! - [`renderer`] - Terminal outline of a [`NodeTree`]
//! - [`config`] - Per-thread runtime settings
//! - [`types`] - Node handles, kinds, and flags
//!
//! ## Example
//!
//! ```
//! use spark_dom::{cell, derive, flush_sync};
//!
//! let a = cell(0);
//! let doubled = derive(a.clone(), |v: &i32| v * 2);
//! assert_eq!(doubled.get(), 0);
//!
//! a.set(5);
//! assert_eq!(doubled.get(), 0); // not drained yet
//!
//! flush_sync().unwrap();
//! assert_eq!(doubled.get(), 10);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod primitives;
pub mod reactive;
pub mod renderer;
pub mod types;

pub use config::{config, configure, RuntimeConfig};
pub use error::{Error, Result};
pub use types::*;

pub use engine::{Host, NodeTree, OpStats};

pub use reactive::{
    // Cells
    cell, Cell, Same, Subscription, Value,
    // Derived views
    derive, effect, Derived, Effect, Sources,
    // Scheduler
    batch, flush, flush_sync, has_pending, reset_scheduler, Flush,
    // Lifetime
    Disposable, Scope,
};

pub use primitives::{
    lis, reconcile, select_branch, show, Branch, KeyFn, PassReport, Placement, Reconciled,
    Region, Selected, Thunk,
};

pub use renderer::{outline_text, render_outline};
