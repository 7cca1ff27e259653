//! Reactive cells.
//!
//! A [`Cell`] is a shared, mutable slot with an ordered subscriber list.
//! Reads and writes are synchronous; subscriber notification goes through the
//! [scheduler](super::scheduler) and happens on the next drain.

use std::cell::{Cell as StdCell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::same::Same;
use super::scheduler::{self, Notify};
use super::scope::Disposable;

// =============================================================================
// Cell
// =============================================================================

struct Subscriber<T> {
    id: usize,
    active: Rc<StdCell<bool>>,
    callback: Box<dyn Fn(&T)>,
}

struct CellInner<T> {
    id: usize,
    /// 0 for source cells; the writer's depth for a derived view's backing cell.
    depth: StdCell<usize>,
    value: RefCell<T>,
    subscribers: RefCell<Vec<Rc<Subscriber<T>>>>,
}

/// Atomic reactive storage.
///
/// Cloning a `Cell` yields another handle to the same storage.
///
/// # Example
///
/// ```
/// use spark_dom::{cell, flush_sync};
///
/// let name = cell(String::from("Alice"));
/// let _sub = name.subscribe(|v| println!("name is now {v}"));
///
/// name.set("Bob".into());
/// assert_eq!(name.get(), "Bob"); // visible immediately
/// flush_sync().unwrap();         // subscribers run here
/// ```
pub struct Cell<T> {
    inner: Rc<CellInner<T>>,
}

impl<T> Clone for Cell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Cell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.borrow())
            .field("subscribers", &self.inner.subscribers.borrow().len())
            .finish()
    }
}

/// Create a cell holding `initial`.
pub fn cell<T: Clone + Same + 'static>(initial: T) -> Cell<T> {
    Cell::new(initial)
}

impl<T: Clone + Same + 'static> Cell<T> {
    /// Create a cell holding `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            inner: Rc::new(CellInner {
                id: scheduler::next_id(),
                depth: StdCell::new(0),
                value: RefCell::new(initial),
                subscribers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Identity of this cell, fixed at creation.
    pub fn id(&self) -> usize {
        self.inner.id
    }

    /// Position in the dependency graph: 0 unless a derived view writes it.
    pub(crate) fn depth(&self) -> usize {
        self.inner.depth.get()
    }

    pub(crate) fn set_depth(&self, depth: usize) {
        self.inner.depth.set(depth);
    }

    /// Whether both handles point at the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Store `next` and schedule notification.
    ///
    /// No-op when `next` is [`Same`] as the current value.
    pub fn set(&self, next: T) {
        let changed = {
            let mut current = self.inner.value.borrow_mut();
            if current.same(&next) {
                false
            } else {
                *current = next;
                true
            }
        };
        if changed {
            scheduler::enqueue_cell(self.inner.clone());
        }
    }

    /// Mutate the value in place, then apply the same rule as [`set`](Self::set).
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut next = self.get();
        f(&mut next);
        self.set(next);
    }

    /// Register `callback` for change notifications.
    ///
    /// Callbacks run in subscription order, once per drain in which the cell
    /// changed, with the value the cell holds at that moment.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let active = Rc::new(StdCell::new(true));
        let subscriber = Rc::new(Subscriber {
            id: scheduler::next_id(),
            active: active.clone(),
            callback: Box::new(callback),
        });
        let subscriber_id = subscriber.id;
        self.inner.subscribers.borrow_mut().push(subscriber);

        let weak: Weak<CellInner<T>> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            active.set(false);
            if let Some(inner) = weak.upgrade() {
                inner
                    .subscribers
                    .borrow_mut()
                    .retain(|s| s.id != subscriber_id);
            }
        })
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }
}

impl<T: Clone + 'static> Notify for CellInner<T> {
    fn id(&self) -> usize {
        self.id
    }

    fn notify(&self) {
        let value = self.value.borrow().clone();
        let subscribers = self.subscribers.borrow().clone();
        for subscriber in subscribers {
            // Unsubscribed earlier in this pass.
            if !subscriber.active.get() {
                continue;
            }
            scheduler::isolate("subscriber", subscriber.id, || (subscriber.callback)(&value));
        }
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// Handle returned by [`Cell::subscribe`].
///
/// Dropping it does not unsubscribe; call [`unsubscribe`](Self::unsubscribe)
/// or hand it to a [`Scope`](super::Scope).
pub struct Subscription {
    cancel: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: RefCell::new(Some(Box::new(cancel))),
        }
    }

    /// Stop receiving notifications. Idempotent.
    pub fn unsubscribe(&self) {
        let cancel = self.cancel.borrow_mut().take();
        if let Some(cancel) = cancel {
            cancel();
        }
    }

    /// Whether [`unsubscribe`](Self::unsubscribe) has not been called yet.
    pub fn is_active(&self) -> bool {
        self.cancel.borrow().is_some()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

impl Disposable for Subscription {
    fn dispose(&self) {
        self.unsubscribe();
    }
}
