//! Scheduler - Write coalescing and notification drains.
//!
//! Cell writes are synchronous, notifications are not. A write stores the new
//! value and enqueues the cell; the next drain notifies each enqueued cell
//! once, with whatever value it holds at that point.
//!
//! # Drain passes
//!
//! ```text
//! pass:  pending cells ──notify──▶ subscribers ──queue──▶ recompute jobs ──run──▶ writes
//!          ▲                                                                       │
//!          └───────────────────────────── next pass ◀──────────────────────────────┘
//! ```
//!
//! Every job queued during a pass runs once, after all cells of that pass have
//! been notified. A view over several cells written in the same tick therefore
//! recomputes once, against a consistent snapshot.
//!
//! Jobs run in ascending depth (a view over plain cells is depth 1, a view
//! over that view depth 2, ...). A view reading both a cell and another view
//! sees the other view already recomputed, never its value from before the
//! tick.
//!
//! Panics inside subscribers and jobs are caught and logged; the rest of the
//! pass still runs.

use std::cell::{Cell as StdCell, RefCell};
use std::collections::HashSet;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use crate::config::config;
use crate::error::{Error, Result};

// =============================================================================
// Scheduled work
// =============================================================================

/// A cell with queued subscriber notifications.
pub(crate) trait Notify {
    fn id(&self) -> usize;

    /// Deliver the current value to every live subscriber, in order.
    fn notify(&self);
}

/// A recompute queued by a subscriber (derived views, effects, reconcilers).
pub(crate) trait Job {
    fn id(&self) -> usize;

    /// One more than the deepest source. Jobs of a pass run shallowest first.
    fn depth(&self) -> usize;

    fn run(&self) -> Result<()>;
}

#[derive(Default)]
struct SchedulerState {
    pending: Vec<Rc<dyn Notify>>,
    pending_ids: HashSet<usize>,
    jobs: Vec<Rc<dyn Job>>,
    job_ids: HashSet<usize>,
    batch_depth: usize,
    flushing: bool,
}

thread_local! {
    static SCHEDULER: RefCell<SchedulerState> = RefCell::new(SchedulerState::default());

    /// Ids shared by cells, subscribers and jobs.
    static NEXT_ID: StdCell<usize> = const { StdCell::new(1) };
}

/// Allocate a thread-unique id.
pub(crate) fn next_id() -> usize {
    NEXT_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    })
}

/// Queue `cell` for notification. Re-queuing a pending cell is a no-op.
pub(crate) fn enqueue_cell(cell: Rc<dyn Notify>) {
    SCHEDULER.with(|state| {
        let mut state = state.borrow_mut();
        if state.pending_ids.insert(cell.id()) {
            state.pending.push(cell);
        }
    });
}

/// Queue `job` for the current pass. Re-queuing a queued job is a no-op.
pub(crate) fn enqueue_job(job: Rc<dyn Job>) {
    SCHEDULER.with(|state| {
        let mut state = state.borrow_mut();
        if state.job_ids.insert(job.id()) {
            state.jobs.push(job);
        }
    });
}

/// Run `f`, containing a panic unless [`RuntimeConfig::catch_panics`] is off.
///
/// Returns `false` when `f` panicked.
///
/// [`RuntimeConfig::catch_panics`]: crate::config::RuntimeConfig::catch_panics
pub(crate) fn isolate(kind: &'static str, id: usize, f: impl FnOnce()) -> bool {
    if !config().catch_panics {
        f();
        return true;
    }

    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            tracing::error!(
                kind,
                id,
                panic = %message,
                error = %Error::JobPanicked { job: id },
                "isolated panic during flush"
            );
            false
        }
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Run `f` with notifications deferred, then flush once.
///
/// Nested batches flush when the outermost one ends. The flush covers every
/// cell written inside `f`.
///
/// # Example
///
/// ```
/// use spark_dom::{batch, cell};
///
/// let count = cell(0);
/// let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
/// let seen_in_callback = seen.clone();
/// let _sub = count.subscribe(move |v| seen_in_callback.borrow_mut().push(*v));
///
/// batch(|| {
///     count.set(1);
///     count.set(2);
///     count.set(3);
/// })
/// .unwrap();
///
/// assert_eq!(*seen.borrow(), vec![3]);
/// ```
pub fn batch<R>(f: impl FnOnce() -> R) -> Result<R> {
    struct Depth;

    impl Drop for Depth {
        fn drop(&mut self) {
            SCHEDULER.with(|state| state.borrow_mut().batch_depth -= 1);
        }
    }

    SCHEDULER.with(|state| state.borrow_mut().batch_depth += 1);
    let result = {
        let _depth = Depth;
        f()
    };

    if in_batch() {
        return Ok(result);
    }
    flush_sync()?;
    Ok(result)
}

/// Drain all pending notifications now.
///
/// Inside a [`batch`] this defers to the end of the outermost batch. Inside a
/// running drain (from a subscriber or job) it returns immediately; the
/// running drain picks up anything new.
///
/// Returns the first configuration error raised by a job during the drain.
/// The drain itself always completes; later errors are logged.
pub fn flush_sync() -> Result<()> {
    let busy = SCHEDULER.with(|state| {
        let state = state.borrow();
        state.flushing || state.batch_depth > 0
    });
    if busy {
        return Ok(());
    }

    struct Flushing;

    impl Drop for Flushing {
        fn drop(&mut self) {
            SCHEDULER.with(|state| state.borrow_mut().flushing = false);
        }
    }

    SCHEDULER.with(|state| state.borrow_mut().flushing = true);
    let _flushing = Flushing;

    let max_passes = config().max_flush_passes;
    let mut errors: Vec<Error> = Vec::new();
    let mut passes = 0usize;

    loop {
        let cells = SCHEDULER.with(|state| {
            let mut state = state.borrow_mut();
            state.pending_ids.clear();
            std::mem::take(&mut state.pending)
        });
        let has_jobs = SCHEDULER.with(|state| !state.borrow().jobs.is_empty());
        if cells.is_empty() && !has_jobs {
            break;
        }

        if let Some(max) = max_passes {
            if passes >= max {
                // Put the cells back so a later flush can still deliver them.
                for cell in cells {
                    enqueue_cell(cell);
                }
                tracing::error!(
                    passes,
                    "flush pass limit reached; a compute function is probably writing to its own source"
                );
                break;
            }
        }
        passes += 1;

        for cell in &cells {
            cell.notify();
        }

        let mut jobs = SCHEDULER.with(|state| {
            let mut state = state.borrow_mut();
            state.job_ids.clear();
            std::mem::take(&mut state.jobs)
        });
        // Upstream views write before downstream views read. Stable, so equal
        // depths keep queue order.
        jobs.sort_by_key(|job| job.depth());
        for job in jobs {
            let mut outcome = Ok(());
            isolate("job", job.id(), || outcome = job.run());
            if let Err(error) = outcome {
                errors.push(error);
            }
        }
    }

    if passes > 0 {
        tracing::debug!(passes, errors = errors.len(), "flush drained");
    }

    let mut errors = errors.into_iter();
    match errors.next() {
        None => Ok(()),
        Some(first) => {
            for rest in errors {
                tracing::error!(error = %rest, "additional error during flush");
            }
            Err(first)
        }
    }
}

/// Awaitable drain.
///
/// The returned future yields to the executor once before draining, giving
/// the host a chance to paint a frame first.
///
/// ```
/// use spark_dom::{cell, derive, flush};
///
/// let a = cell(2);
/// let squared = derive(a.clone(), |v: &i32| v * v);
/// a.set(3);
/// futures::executor::block_on(flush()).unwrap();
/// assert_eq!(squared.get(), 9);
/// ```
pub fn flush() -> Flush {
    Flush { yielded: false }
}

/// Future returned by [`flush`].
#[derive(Debug)]
#[must_use = "futures do nothing unless awaited"]
pub struct Flush {
    yielded: bool,
}

impl Future for Flush {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if !self.yielded {
            self.yielded = true;
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }
        Poll::Ready(flush_sync())
    }
}

/// Whether any notification or job is waiting for a drain.
pub fn has_pending() -> bool {
    SCHEDULER.with(|state| {
        let state = state.borrow();
        !state.pending.is_empty() || !state.jobs.is_empty()
    })
}

fn in_batch() -> bool {
    SCHEDULER.with(|state| state.borrow().batch_depth > 0)
}

/// Drop all queued work (for testing).
pub fn reset_scheduler() {
    SCHEDULER.with(|state| {
        let mut state = state.borrow_mut();
        state.pending.clear();
        state.pending_ids.clear();
        state.jobs.clear();
        state.job_ids.clear();
        state.batch_depth = 0;
        state.flushing = false;
    });
}
