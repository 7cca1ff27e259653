//! Control Flow Primitives - Conditional rendering.
//!
//! - [`select_branch`] - First-true-wins over a list of conditions
//! - [`show`] - One condition with an optional fallback
//!
//! # Lifecycle
//!
//! - The initial branch renders synchronously.
//! - When any condition changes, the region is cleared (disposing the old
//!   branch's nodes) and the now-first-true branch, or the fallback, is
//!   rendered. A change that leaves every condition's value as it was does
//!   not rebuild.
//! - Removing the selector's host node disposes the active branch and stops
//!   tracking the conditions.
//!
//! Rebuilding is unconditional on change, even if the same branch index stays
//! selected. Branch content that must survive should read cells of its own.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::region::Region;
use super::types::Thunk;
use crate::engine::Host;
use crate::error::{Error, Result};
use crate::reactive::{watch_from, Disposable, Effect, Sources, Value};

/// What a selector is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selected {
    /// The branch at this index.
    Branch(usize),
    /// The fallback.
    Fallback,
    /// No condition holds and there is no fallback.
    Nothing,
}

struct SelectorState<H: Host> {
    region: Region<H>,
    branches: Vec<Thunk<H::Node>>,
    fallback: Option<Thunk<H::Node>>,
    selected: Selected,
    builds: usize,
    disposed: bool,
}

impl<H: Host> SelectorState<H> {
    fn rebuild(&mut self, flags: &[bool]) {
        if self.disposed {
            return;
        }
        let cleared = self.region.clear();

        let (selected, node) = match flags.iter().position(|flag| *flag) {
            Some(index) => (Selected::Branch(index), Some((self.branches[index])())),
            None => match &self.fallback {
                Some(fallback) => (Selected::Fallback, Some(fallback())),
                None => (Selected::Nothing, None),
            },
        };
        if let Some(node) = node {
            self.region.insert_before(&node, None);
        }

        self.selected = selected;
        self.builds += 1;
        tracing::trace!(?selected, cleared, "branch rebuilt");
    }

    fn teardown(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.region.dispose();
    }
}

struct Selector<H: Host> {
    host: H,
    container: H::Node,
    state: RefCell<SelectorState<H>>,
    effect: RefCell<Option<Effect>>,
}

impl<H: Host> Selector<H> {
    fn dispose(&self) {
        let effect = self.effect.borrow_mut().take();
        if let Some(effect) = effect {
            effect.dispose();
        }
        self.state.borrow_mut().teardown();
    }
}

/// Handle to a running selector.
pub struct Branch<H: Host> {
    selector: Rc<Selector<H>>,
}

impl<H: Host> Clone for Branch<H> {
    fn clone(&self) -> Self {
        Self {
            selector: Rc::clone(&self.selector),
        }
    }
}

impl<H: Host> fmt::Debug for Branch<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.selector.state.borrow();
        f.debug_struct("Branch")
            .field("node", &self.selector.container)
            .field("selected", &state.selected)
            .field("builds", &state.builds)
            .finish()
    }
}

impl<H: Host> Branch<H> {
    /// The host node holding the active branch.
    pub fn node(&self) -> H::Node {
        self.selector.container.clone()
    }

    pub fn selected(&self) -> Selected {
        self.selector.state.borrow().selected
    }

    /// Index of the active branch, `None` for fallback or nothing.
    pub fn active(&self) -> Option<usize> {
        match self.selected() {
            Selected::Branch(index) => Some(index),
            Selected::Fallback | Selected::Nothing => None,
        }
    }

    /// Number of times the region was built, the initial render included.
    pub fn builds(&self) -> usize {
        self.selector.state.borrow().builds
    }

    pub fn is_disposed(&self) -> bool {
        self.selector.state.borrow().disposed
    }

    /// Remove the host node, which tears the selector down.
    pub fn dispose(&self) {
        self.selector.host.remove(&self.selector.container);
        self.selector.dispose();
    }
}

impl<H: Host> Disposable for Branch<H> {
    fn dispose(&self) {
        Branch::dispose(self);
    }
}

/// Render the branch of the first true condition, or `fallback`.
///
/// `conditions[i]` guards `branches[i]`. Conditions may be reactive cells or
/// plain booleans.
///
/// # Errors
///
/// [`Error::BranchArity`] when the two lists differ in length. Nothing is
/// created in that case.
///
/// # Example
///
/// ```
/// use spark_dom::{cell, flush_sync, select_branch, NodeTree, Value};
///
/// let tree = NodeTree::new();
/// let loading = cell(true);
/// let failed = cell(false);
///
/// let (t1, t2, t3) = (tree.clone(), tree.clone(), tree.clone());
/// let view = select_branch(
///     &tree,
///     vec![Value::from(&loading), Value::from(&failed)],
///     vec![
///         Box::new(move || t1.text("loading")),
///         Box::new(move || t2.text("failed")),
///     ],
///     Some(Box::new(move || t3.text("ready"))),
/// )
/// .unwrap();
/// assert_eq!(tree.text_of(view.node()), "loading");
///
/// loading.set(false);
/// flush_sync().unwrap();
/// assert_eq!(tree.text_of(view.node()), "ready");
/// ```
pub fn select_branch<H: Host>(
    host: &H,
    conditions: Vec<Value<bool>>,
    branches: Vec<Thunk<H::Node>>,
    fallback: Option<Thunk<H::Node>>,
) -> Result<Branch<H>> {
    if conditions.len() != branches.len() {
        return Err(Error::BranchArity {
            conditions: conditions.len(),
            branches: branches.len(),
        });
    }
    Ok(build(host, conditions, branches, fallback))
}

/// Render `then` while `condition` holds, `otherwise` (if any) when it does not.
pub fn show<H: Host>(
    host: &H,
    condition: impl Into<Value<bool>>,
    then: Thunk<H::Node>,
    otherwise: Option<Thunk<H::Node>>,
) -> Branch<H> {
    build(host, vec![condition.into()], vec![then], otherwise)
}

fn build<H: Host>(
    host: &H,
    conditions: Vec<Value<bool>>,
    branches: Vec<Thunk<H::Node>>,
    fallback: Option<Thunk<H::Node>>,
) -> Branch<H> {
    let container = host.create_container("branch");
    let region = Region::attach(host, &container);

    let selector = Rc::new(Selector {
        host: host.clone(),
        container: container.clone(),
        state: RefCell::new(SelectorState {
            region,
            branches,
            fallback,
            selected: Selected::Nothing,
            builds: 0,
            disposed: false,
        }),
        effect: RefCell::new(None),
    });

    let flags = conditions.snapshot();
    selector.state.borrow_mut().rebuild(&flags);

    let weak = Rc::downgrade(&selector);
    let effect = watch_from(conditions, Some(flags), move |flags: &Vec<bool>| {
        if let Some(selector) = weak.upgrade() {
            selector.state.borrow_mut().rebuild(flags);
        }
        Ok(())
    });
    *selector.effect.borrow_mut() = Some(effect);

    let owner = Rc::clone(&selector);
    host.on_remove(&container, Box::new(move || owner.dispose()));

    Branch { selector }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NodeTree;
    use crate::reactive::{batch, cell, flush_sync, reset_scheduler, Cell};
    use std::cell::Cell as StdCell;

    fn counted(tree: &NodeTree, label: &'static str, count: &Rc<StdCell<usize>>) -> Thunk<crate::types::NodeId> {
        let tree = tree.clone();
        let count = count.clone();
        Box::new(move || {
            count.set(count.get() + 1);
            tree.text(label)
        })
    }

    struct Fixture {
        tree: NodeTree,
        first: Cell<bool>,
        second: Cell<bool>,
        renders: Rc<StdCell<usize>>,
        view: Branch<NodeTree>,
    }

    fn fixture(first: bool, second: bool) -> Fixture {
        reset_scheduler();
        let tree = NodeTree::new();
        let first = cell(first);
        let second = cell(second);
        let renders = Rc::new(StdCell::new(0));

        let view = select_branch(
            &tree,
            vec![Value::from(&first), Value::from(&second)],
            vec![counted(&tree, "one", &renders), counted(&tree, "two", &renders)],
            Some(counted(&tree, "none", &renders)),
        )
        .unwrap();

        Fixture {
            tree,
            first,
            second,
            renders,
            view,
        }
    }

    #[test]
    fn test_first_true_wins() {
        let f = fixture(true, true);
        assert_eq!(f.view.active(), Some(0));
        assert_eq!(f.tree.text_of(f.view.node()), "one");
        assert_eq!(f.renders.get(), 1);
    }

    #[test]
    fn test_fallback_when_nothing_holds() {
        let f = fixture(false, false);
        assert_eq!(f.view.selected(), Selected::Fallback);
        assert_eq!(f.view.active(), None);
        assert_eq!(f.tree.text_of(f.view.node()), "none");
    }

    #[test]
    fn test_switch_disposes_previous_branch() {
        let f = fixture(true, false);
        let old = f.tree.content_children(f.view.node())[0];

        f.first.set(false);
        f.second.set(true);
        flush_sync().unwrap();

        assert_eq!(f.view.active(), Some(1));
        assert_eq!(f.tree.text_of(f.view.node()), "two");
        assert!(!f.tree.is_alive(old));
        assert_eq!(f.tree.content_children(f.view.node()).len(), 1);
    }

    #[test]
    fn test_any_condition_change_rebuilds() {
        let f = fixture(true, false);

        // Branch 0 stays selected, but a condition changed.
        f.second.set(true);
        flush_sync().unwrap();

        assert_eq!(f.view.active(), Some(0));
        assert_eq!(f.view.builds(), 2);
        assert_eq!(f.renders.get(), 2);
    }

    #[test]
    fn test_net_unchanged_conditions_do_not_rebuild() {
        let f = fixture(true, false);

        batch(|| {
            f.second.set(true);
            f.second.set(false);
        })
        .unwrap();

        assert_eq!(f.view.builds(), 1);
        assert_eq!(f.renders.get(), 1);
    }

    #[test]
    fn test_arity_mismatch() {
        reset_scheduler();
        let tree = NodeTree::new();
        let result = select_branch(
            &tree,
            vec![Value::Plain(true), Value::Plain(false)],
            vec![counted(&tree, "only", &Rc::new(StdCell::new(0)))],
            None,
        );

        assert_eq!(
            result.err(),
            Some(Error::BranchArity {
                conditions: 2,
                branches: 1,
            })
        );
        assert!(tree.is_empty());
    }

    #[test]
    fn test_nothing_without_fallback() {
        reset_scheduler();
        let tree = NodeTree::new();
        let visible = cell(false);
        let renders = Rc::new(StdCell::new(0));
        let view = show(&tree, &visible, counted(&tree, "shown", &renders), None);

        assert_eq!(view.selected(), Selected::Nothing);
        assert!(tree.content_children(view.node()).is_empty());

        visible.set(true);
        flush_sync().unwrap();
        assert_eq!(tree.text_of(view.node()), "shown");
    }

    #[test]
    fn test_plain_conditions_never_rebuild() {
        reset_scheduler();
        let tree = NodeTree::new();
        let renders = Rc::new(StdCell::new(0));
        let view = show(&tree, false, counted(&tree, "a", &renders), Some(counted(&tree, "b", &renders)));

        flush_sync().unwrap();
        assert_eq!(tree.text_of(view.node()), "b");
        assert_eq!(view.builds(), 1);
    }

    #[test]
    fn test_removing_host_node_tears_down() {
        let f = fixture(true, false);
        let content = f.tree.content_children(f.view.node())[0];

        f.tree.remove(f.view.node());
        assert!(f.view.is_disposed());
        assert!(!f.tree.is_alive(content));
        assert!(f.tree.is_empty());
        assert_eq!(f.first.subscriber_count(), 0);

        f.first.set(false);
        flush_sync().unwrap();
        assert_eq!(f.renders.get(), 1);
    }
}
