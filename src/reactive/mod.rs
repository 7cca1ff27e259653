//! Reactive core - Cells, scheduler, derived views, scopes.
//!
//! ```text
//! Cell::set ──▶ scheduler (pending set) ──flush──▶ subscribers ──▶ derived recompute
//! ```
//!
//! Everything here is single-threaded. Runtime state lives in thread-locals,
//! so each thread is an independent runtime and handles are `!Send`.

mod cell;
mod derived;
mod same;
pub mod scheduler;
mod scope;
mod value;

pub use cell::{cell, Cell, Subscription};
pub use derived::{derive, effect, Derived, Effect, Sources};
pub(crate) use derived::watch_from;
pub use same::Same;
pub use scheduler::{batch, flush, flush_sync, has_pending, reset_scheduler, Flush};
pub use scope::{Disposable, Scope};
pub use value::Value;
