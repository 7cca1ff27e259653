//! Derived views and effects.
//!
//! [`derive`] computes a value from one or more sources and keeps it in a
//! backing [`Cell`]. [`effect`] runs a side effect instead and keeps nothing.
//!
//! Both subscribe to every source. A source notification only *queues* a
//! recompute; the scheduler runs it after all cells of the pass have been
//! notified, so several sources changing in one tick cost one recompute.
//!
//! A recompute whose snapshot is [`Same`] as the previous one is skipped.
//! Diamond-shaped graphs settle without redundant work because of this.
//!
//! # Hazard
//!
//! A compute function that writes into one of its own sources recomputes on
//! every drain pass and never settles. See
//! [`RuntimeConfig::max_flush_passes`](crate::RuntimeConfig::max_flush_passes).

use std::cell::{Cell as StdCell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::cell::{Cell, Subscription};
use super::same::Same;
use super::scheduler::{self, Job};
use super::scope::Disposable;
use super::value::Value;
use crate::error::Result;

// =============================================================================
// Sources
// =============================================================================

/// A set of reactive inputs that can be read together.
pub trait Sources: 'static {
    /// Values of all sources, read at one point in time.
    type Snapshot: Same + 'static;

    fn snapshot(&self) -> Self::Snapshot;

    /// Subscribe `on_change` to every reactive member.
    fn watch(&self, on_change: Rc<dyn Fn()>) -> Vec<Subscription>;

    /// Deepest member: 0 for plain cells, the writer's depth for a view.
    fn depth(&self) -> usize;
}

impl<A: Clone + Same + 'static> Sources for Cell<A> {
    type Snapshot = A;

    fn snapshot(&self) -> A {
        self.get()
    }

    fn watch(&self, on_change: Rc<dyn Fn()>) -> Vec<Subscription> {
        vec![self.subscribe(move |_| on_change())]
    }

    fn depth(&self) -> usize {
        Cell::depth(self)
    }
}

impl<A: Clone + Same + 'static> Sources for Value<A> {
    type Snapshot = A;

    fn snapshot(&self) -> A {
        self.get()
    }

    fn watch(&self, on_change: Rc<dyn Fn()>) -> Vec<Subscription> {
        self.subscribe(move |_| on_change()).into_iter().collect()
    }

    fn depth(&self) -> usize {
        match self {
            Value::Reactive(cell) => cell.depth(),
            Value::Plain(_) => 0,
        }
    }
}

impl<A: Clone + Same + 'static> Sources for Derived<A> {
    type Snapshot = A;

    fn snapshot(&self) -> A {
        self.get()
    }

    fn watch(&self, on_change: Rc<dyn Fn()>) -> Vec<Subscription> {
        self.cell.watch(on_change)
    }

    fn depth(&self) -> usize {
        self.cell.depth()
    }
}

impl<S: Sources> Sources for Vec<S> {
    type Snapshot = Vec<S::Snapshot>;

    fn snapshot(&self) -> Self::Snapshot {
        self.iter().map(Sources::snapshot).collect()
    }

    fn watch(&self, on_change: Rc<dyn Fn()>) -> Vec<Subscription> {
        self.iter()
            .flat_map(|source| source.watch(on_change.clone()))
            .collect()
    }

    fn depth(&self) -> usize {
        self.iter().map(Sources::depth).max().unwrap_or(0)
    }
}

macro_rules! sources_for_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Sources),+> Sources for ($($name,)+) {
            type Snapshot = ($($name::Snapshot,)+);

            fn snapshot(&self) -> Self::Snapshot {
                ($(self.$idx.snapshot(),)+)
            }

            fn watch(&self, on_change: Rc<dyn Fn()>) -> Vec<Subscription> {
                let mut subscriptions = Vec::new();
                $(subscriptions.extend(self.$idx.watch(on_change.clone()));)+
                subscriptions
            }

            fn depth(&self) -> usize {
                0usize $(.max(self.$idx.depth()))+
            }
        }
    };
}

sources_for_tuple!(A: 0, B: 1);
sources_for_tuple!(A: 0, B: 1, C: 2);
sources_for_tuple!(A: 0, B: 1, C: 2, D: 3);

// =============================================================================
// Derivation - the scheduled recompute shared by derive/effect
// =============================================================================

type Step<S> = Box<dyn Fn(&S) -> Result<()>>;

struct Derivation<S: Sources> {
    id: usize,
    depth: usize,
    sources: S,
    last: RefCell<Option<S::Snapshot>>,
    step: Step<S::Snapshot>,
    subscriptions: RefCell<Vec<Subscription>>,
    disposed: StdCell<bool>,
}

/// Type-erased control over a running derivation.
trait Link {
    fn depth(&self) -> usize;
    fn dispose(&self);
    fn is_disposed(&self) -> bool;
}

impl<S: Sources> Job for Derivation<S> {
    fn id(&self) -> usize {
        self.id
    }

    fn depth(&self) -> usize {
        self.depth
    }

    fn run(&self) -> Result<()> {
        if self.disposed.get() {
            return Ok(());
        }

        let snapshot = self.sources.snapshot();
        let unchanged = self
            .last
            .borrow()
            .as_ref()
            .is_some_and(|last| last.same(&snapshot));
        if unchanged {
            tracing::trace!(derivation = self.id, "snapshot unchanged; recompute skipped");
            return Ok(());
        }

        (self.step)(&snapshot)?;
        *self.last.borrow_mut() = Some(snapshot);
        Ok(())
    }
}

impl<S: Sources> Link for Derivation<S> {
    fn depth(&self) -> usize {
        self.depth
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        let subscriptions = std::mem::take(&mut *self.subscriptions.borrow_mut());
        for subscription in subscriptions {
            subscription.unsubscribe();
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.get()
    }
}

/// Subscribe `step` to `sources` without running it now.
///
/// `seen` is the snapshot the caller already handled; an identical snapshot on
/// the first notification is skipped.
pub(crate) fn watch_from<S: Sources>(
    sources: S,
    seen: Option<S::Snapshot>,
    step: impl Fn(&S::Snapshot) -> Result<()> + 'static,
) -> Effect {
    let derivation = Rc::new(Derivation {
        id: scheduler::next_id(),
        depth: sources.depth() + 1,
        sources,
        last: RefCell::new(seen),
        step: Box::new(step),
        subscriptions: RefCell::new(Vec::new()),
        disposed: StdCell::new(false),
    });

    let job: Rc<dyn Job> = derivation.clone();
    let subscriptions = derivation
        .sources
        .watch(Rc::new(move || scheduler::enqueue_job(job.clone())));
    *derivation.subscriptions.borrow_mut() = subscriptions;

    Effect { link: derivation }
}

// =============================================================================
// Derived / Effect handles
// =============================================================================

/// A computed value kept current by the scheduler.
///
/// Cloning yields another handle to the same view.
pub struct Derived<R> {
    cell: Cell<R>,
    link: Rc<dyn Link>,
}

impl<R> Clone for Derived<R> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            link: Rc::clone(&self.link),
        }
    }
}

impl<R: fmt::Debug> fmt::Debug for Derived<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derived")
            .field("cell", &self.cell)
            .field("disposed", &self.link.is_disposed())
            .finish()
    }
}

impl<R: Clone + Same + 'static> Derived<R> {
    /// Current value.
    pub fn get(&self) -> R {
        self.cell.get()
    }

    pub fn with<T>(&self, f: impl FnOnce(&R) -> T) -> T {
        self.cell.with(f)
    }

    /// Subscribe to changes of the computed value.
    pub fn subscribe(&self, callback: impl Fn(&R) + 'static) -> Subscription {
        self.cell.subscribe(callback)
    }

    /// The backing cell, e.g. to feed a reconciler.
    pub fn cell(&self) -> &Cell<R> {
        &self.cell
    }
}

impl<R> Derived<R> {
    /// Stop recomputing. The last value stays readable.
    pub fn dispose(&self) {
        self.link.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.link.is_disposed()
    }
}

impl<R> Disposable for Derived<R> {
    fn dispose(&self) {
        self.link.dispose();
    }
}

/// Handle to a running side effect. It is the effect's disposer.
#[derive(Clone)]
pub struct Effect {
    link: Rc<dyn Link>,
}

impl Effect {
    pub fn dispose(&self) {
        self.link.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.link.is_disposed()
    }
}

impl Disposable for Effect {
    fn dispose(&self) {
        self.link.dispose();
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("disposed", &self.link.is_disposed())
            .finish()
    }
}

// =============================================================================
// Constructors
// =============================================================================

/// Compute a value from `sources`, now and after every change.
///
/// `compute` runs synchronously once to produce the initial value. Later
/// recomputes write into the backing cell under the usual no-op rule, so
/// dependants only hear about actual changes.
///
/// # Example
///
/// ```
/// use spark_dom::{cell, derive, flush_sync};
///
/// let a = cell(0);
/// let doubled = derive(a.clone(), |v: &i32| v * 2);
/// assert_eq!(doubled.get(), 0);
///
/// a.set(5);
/// assert_eq!(doubled.get(), 0); // not flushed yet
/// flush_sync().unwrap();
/// assert_eq!(doubled.get(), 10);
/// ```
///
/// Several sources are passed as a tuple or a `Vec`:
///
/// ```
/// use spark_dom::{cell, derive, flush_sync};
///
/// let first = cell(String::from("Ada"));
/// let last = cell(String::from("Lovelace"));
/// let full = derive((first.clone(), last.clone()), |(f, l): &(String, String)| {
///     format!("{f} {l}")
/// });
/// assert_eq!(full.get(), "Ada Lovelace");
/// ```
pub fn derive<S, R>(sources: S, compute: impl Fn(&S::Snapshot) -> R + 'static) -> Derived<R>
where
    S: Sources,
    R: Clone + Same + 'static,
{
    let snapshot = sources.snapshot();
    let cell = Cell::new(compute(&snapshot));

    let backing = cell.clone();
    let effect = watch_from(sources, Some(snapshot), move |snapshot| {
        backing.set(compute(snapshot));
        Ok(())
    });
    cell.set_depth(effect.link.depth());

    Derived {
        cell,
        link: effect.link,
    }
}

/// Run `run` with the snapshot of `sources`, now and after every change.
///
/// The returned [`Effect`] is the disposer.
pub fn effect<S: Sources>(sources: S, run: impl Fn(&S::Snapshot) + 'static) -> Effect {
    let snapshot = sources.snapshot();
    run(&snapshot);
    watch_from(sources, Some(snapshot), move |snapshot| {
        run(snapshot);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::cell;
    use crate::reactive::scheduler::{batch, flush_sync, reset_scheduler};

    fn counter() -> (Rc<StdCell<usize>>, impl Fn()) {
        let count = Rc::new(StdCell::new(0));
        let bump = {
            let count = count.clone();
            move || count.set(count.get() + 1)
        };
        (count, bump)
    }

    #[test]
    fn test_initial_value_is_computed_immediately() {
        reset_scheduler();

        let a = cell(3);
        let b = cell(4);
        let sum = derive((a, b), |(a, b): &(i32, i32)| a + b);
        assert_eq!(sum.get(), 7);
    }

    #[test]
    fn test_recompute_waits_for_flush() {
        reset_scheduler();

        let a = cell(0);
        let doubled = derive(a.clone(), |v: &i32| v * 2);
        a.set(5);
        assert_eq!(doubled.get(), 0);
        flush_sync().unwrap();
        assert_eq!(doubled.get(), 10);
    }

    #[test]
    fn test_multi_source_recomputes_once_per_flush() {
        reset_scheduler();

        let a = cell(1);
        let b = cell(2);
        let c = cell(3);
        let (calls, bump) = counter();

        let total = derive((a.clone(), b.clone(), c.clone()), move |(a, b, c): &(i32, i32, i32)| {
            bump();
            a + b + c
        });
        assert_eq!(calls.get(), 1);

        a.set(10);
        b.set(20);
        c.set(30);
        flush_sync().unwrap();

        assert_eq!(total.get(), 60);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_diamond_settles_with_one_recompute() {
        reset_scheduler();

        let a = cell(1);
        let b = derive(a.clone(), |v: &i32| v + 1);
        let (calls, bump) = counter();
        let c = derive((a.clone(), b.clone()), move |(a, b): &(i32, i32)| {
            bump();
            a * b
        });

        a.set(2);
        flush_sync().unwrap();

        assert_eq!(c.get(), 6);
        // initial + one recompute that saw a and b together
        assert_eq!(calls.get(), 2);
        assert_eq!(c.get(), 2 * b.get());
    }

    #[test]
    fn test_view_never_pairs_new_cell_with_stale_view() {
        reset_scheduler();

        let a = cell(1);
        let x = cell(1);
        let b = derive(x.clone(), |v: &i32| *v);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        // `a` is subscribed before `b` changes, so its job is queued first.
        let _c = derive((a.clone(), b.clone()), move |(a, b): &(i32, i32)| {
            seen_clone.borrow_mut().push((*a, *b));
            a + b
        });

        batch(|| {
            a.set(2);
            x.set(2);
        })
        .unwrap();

        assert_eq!(*seen.borrow(), vec![(1, 1), (2, 2)]);
    }

    #[test]
    fn test_depth_follows_the_graph() {
        reset_scheduler();

        let a = cell(1);
        let b = derive(a.clone(), |v: &i32| v + 1);
        let c = derive((a.clone(), b.clone()), |(a, b): &(i32, i32)| a + b);
        let d = derive(vec![Value::Plain(0), Value::from(c.cell())], |v: &Vec<i32>| v[1]);

        assert_eq!(Sources::depth(&a), 0);
        assert_eq!(Sources::depth(&b), 1);
        assert_eq!(Sources::depth(&c), 2);
        assert_eq!(Sources::depth(&d), 3);
    }

    #[test]
    fn test_unchanged_result_does_not_notify_dependants() {
        reset_scheduler();

        let a = cell(1);
        let parity = derive(a.clone(), |v: &i32| v % 2);
        let (notified, bump) = counter();
        let _sub = parity.subscribe(move |_| bump());

        a.set(3);
        flush_sync().unwrap();
        assert_eq!(notified.get(), 0);

        a.set(4);
        flush_sync().unwrap();
        assert_eq!(notified.get(), 1);
    }

    #[test]
    fn test_effect_runs_now_and_on_change() {
        reset_scheduler();

        let a = cell(1);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let handle = effect(a.clone(), move |v: &i32| seen_clone.borrow_mut().push(*v));

        batch(|| {
            a.set(2);
            a.set(3);
        })
        .unwrap();
        assert_eq!(*seen.borrow(), vec![1, 3]);

        handle.dispose();
        assert!(handle.is_disposed());
        a.set(4);
        flush_sync().unwrap();
        assert_eq!(*seen.borrow(), vec![1, 3]);
        assert_eq!(a.subscriber_count(), 0);
    }

    #[test]
    fn test_dispose_keeps_last_value() {
        reset_scheduler();

        let a = cell(1);
        let doubled = derive(a.clone(), |v: &i32| v * 2);
        doubled.dispose();

        a.set(9);
        flush_sync().unwrap();
        assert_eq!(doubled.get(), 2);
    }

    #[test]
    fn test_vec_of_values_only_watches_reactive_members() {
        reset_scheduler();

        let flag = cell(false);
        let sources: Vec<Value<bool>> = vec![Value::Plain(true), Value::Reactive(flag.clone())];
        let all = derive(sources, |flags: &Vec<bool>| flags.iter().all(|f| *f));
        assert!(!all.get());
        assert_eq!(flag.subscriber_count(), 1);

        flag.set(true);
        flush_sync().unwrap();
        assert!(all.get());
    }

    #[test]
    fn test_chained_derived_sources() {
        reset_scheduler();

        let a = cell(2);
        let squared = derive(a.clone(), |v: &i32| v * v);
        let plus_one = derive(squared.clone(), |v: &i32| v + 1);

        a.set(3);
        flush_sync().unwrap();
        assert_eq!(plus_one.get(), 10);
    }

    #[test]
    fn test_panicking_compute_does_not_block_other_views() {
        reset_scheduler();

        let a = cell(0);
        let _fragile = effect(a.clone(), |v: &i32| {
            if *v > 0 {
                panic!("compute failure");
            }
        });
        let doubled = derive(a.clone(), |v: &i32| v * 2);

        a.set(4);
        flush_sync().unwrap();
        assert_eq!(doubled.get(), 8);
    }
}
