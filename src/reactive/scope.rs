//! Disposal scopes.
//!
//! A [`Scope`] collects teardown for everything created on its behalf. It is
//! passed explicitly: constructors return handles, and the caller decides
//! which scope owns them.
//!
//! ```
//! use spark_dom::{cell, derive, Scope};
//!
//! let scope = Scope::new();
//! let count = cell(1);
//! let doubled = scope.own(derive(count.clone(), |v: &i32| v * 2));
//!
//! scope.dispose();
//! assert!(doubled.is_disposed());
//! ```

use std::cell::{Cell as StdCell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::types::Cleanup;

/// Anything that can be torn down explicitly.
pub trait Disposable {
    /// Release subscriptions and owned resources. Must be idempotent.
    fn dispose(&self);
}

#[derive(Default)]
struct ScopeInner {
    cleanups: RefCell<Vec<Cleanup>>,
    children: RefCell<Vec<Scope>>,
    disposed: StdCell<bool>,
}

/// Owner of cleanup callbacks and child scopes.
///
/// Cloning yields another handle to the same scope.
#[derive(Clone, Default)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scope disposed together with this one.
    ///
    /// A child of an already-disposed scope starts disposed.
    pub fn child(&self) -> Scope {
        let child = Scope::new();
        if self.is_disposed() {
            child.dispose();
        } else {
            self.inner.children.borrow_mut().push(child.clone());
        }
        child
    }

    /// Run `cleanup` when this scope is disposed.
    ///
    /// Runs immediately if the scope is already disposed.
    pub fn on_dispose(&self, cleanup: impl FnOnce() + 'static) {
        if self.is_disposed() {
            cleanup();
            return;
        }
        self.inner.cleanups.borrow_mut().push(Box::new(cleanup));
    }

    /// Dispose `handle` together with this scope and hand it back.
    pub fn own<D: Disposable + Clone + 'static>(&self, handle: D) -> D {
        let owned = handle.clone();
        self.on_dispose(move || owned.dispose());
        handle
    }

    /// Dispose children first, then run cleanups in reverse registration order.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }

        let children = std::mem::take(&mut *self.inner.children.borrow_mut());
        for child in children {
            child.dispose();
        }

        let cleanups = std::mem::take(&mut *self.inner.cleanups.borrow_mut());
        let count = cleanups.len();
        for cleanup in cleanups.into_iter().rev() {
            cleanup();
        }
        tracing::debug!(cleanups = count, "scope disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

impl Disposable for Scope {
    fn dispose(&self) {
        Scope::dispose(self);
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("cleanups", &self.inner.cleanups.borrow().len())
            .field("children", &self.inner.children.borrow().len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanups_run_in_reverse_order() {
        let scope = Scope::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for n in 0..3 {
            let order = order.clone();
            scope.on_dispose(move || order.borrow_mut().push(n));
        }

        scope.dispose();
        assert_eq!(*order.borrow(), vec![2, 1, 0]);
    }

    #[test]
    fn test_children_dispose_first() {
        let parent = Scope::new();
        let child = parent.child();
        let order = Rc::new(RefCell::new(Vec::new()));

        let order_parent = order.clone();
        parent.on_dispose(move || order_parent.borrow_mut().push("parent"));
        let order_child = order.clone();
        child.on_dispose(move || order_child.borrow_mut().push("child"));

        parent.dispose();
        assert_eq!(*order.borrow(), vec!["child", "parent"]);
        assert!(child.is_disposed());
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let scope = Scope::new();
        let calls = Rc::new(StdCell::new(0));
        let calls_clone = calls.clone();
        scope.on_dispose(move || calls_clone.set(calls_clone.get() + 1));

        scope.dispose();
        scope.dispose();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_late_registration_runs_immediately() {
        let scope = Scope::new();
        scope.dispose();

        let ran = Rc::new(StdCell::new(false));
        let ran_clone = ran.clone();
        scope.on_dispose(move || ran_clone.set(true));
        assert!(ran.get());
        assert!(scope.child().is_disposed());
    }
}
