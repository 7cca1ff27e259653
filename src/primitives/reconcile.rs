//! Reconcile - Keyed list rendering with minimal structural edits.
//!
//! [`reconcile`] keeps the children of a host node in sync with a
//! `Cell<Vec<T>>`. Every item is keyed; a node is reused for as long as its key
//! maps to a [`Same`] item, and `render` is only called for new or changed
//! items.
//!
//! # Pass
//!
//! 1. Key every item. A missing key aborts the pass before anything is touched.
//! 2. Reuse or render a node per (key, item). Duplicate keys warn; the last
//!    item for a key wins and the key keeps its first position.
//! 3. Remove nodes whose key disappeared, and nodes replaced by a re-render.
//! 4. Place nodes, picking the cheapest applicable strategy:
//!
//! ```text
//! Unchanged  same keys, same items, same order     → no host operations
//! Reorder    same keys, same items, new order      → right-to-left, skip nodes already in place
//! General    anything structural                   → LIS of old positions stays put,
//!                                                    everything else moves (≤ n − |LIS| ops)
//! ```
//!
//! # Teardown
//!
//! The reconciler registers its teardown on its host node. Removing that node
//! from the tree disposes every cached node and unsubscribes from the source.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::rc::Rc;

use super::lis::lis;
use super::region::Region;
use super::types::KeyFn;
use crate::config::config;
use crate::engine::Host;
use crate::error::{Error, Result};
use crate::reactive::{watch_from, Cell, Disposable, Effect, Same};

// =============================================================================
// Pass Report
// =============================================================================

/// Placement strategy taken by a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Nothing structural changed; no host operations.
    Unchanged,
    /// Same nodes in a new order; placed without LIS analysis.
    Reorder,
    /// Nodes were added, removed or re-rendered; LIS-guided placement.
    General,
}

/// What one reconciliation pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    pub placement: Placement,
    /// `render` calls.
    pub rendered: usize,
    /// Nodes kept from the previous pass.
    pub reused: usize,
    /// Nodes dropped because their key disappeared.
    pub removed: usize,
    /// Nodes dropped because their key now maps to a different item.
    pub replaced: usize,
    /// Insert/move operations issued to the host.
    pub placed: usize,
    /// Nodes left in place as members of the LIS (general path only).
    pub kept: usize,
    /// Repeated keys seen in the sequence.
    pub duplicates: usize,
}

impl PassReport {
    fn new() -> Self {
        Self {
            placement: Placement::General,
            rendered: 0,
            reused: 0,
            removed: 0,
            replaced: 0,
            placed: 0,
            kept: 0,
            duplicates: 0,
        }
    }
}

// =============================================================================
// Reconciler State
// =============================================================================

struct Entry<T, N> {
    item: T,
    node: N,
}

struct Slot<T, N> {
    item: T,
    node: N,
    /// Rendered during this pass.
    fresh: bool,
}

/// Nodes rendered by a pass that has not finished yet.
///
/// Dropped without [`commit`](Self::commit) (a panicking `render`), it removes
/// them again.
struct Uncommitted<H: Host> {
    host: H,
    nodes: Vec<H::Node>,
}

impl<H: Host> Uncommitted<H> {
    fn new(host: &H) -> Self {
        Self {
            host: host.clone(),
            nodes: Vec::new(),
        }
    }

    fn track(&mut self, node: H::Node) -> H::Node {
        self.nodes.push(node.clone());
        node
    }

    fn commit(mut self) {
        self.nodes.clear();
    }
}

impl<H: Host> Drop for Uncommitted<H> {
    fn drop(&mut self) {
        for node in self.nodes.drain(..) {
            self.host.remove(&node);
        }
    }
}

struct KeyedState<H: Host, T, K> {
    host: H,
    region: Region<H>,
    key: KeyFn<T, K>,
    render: Box<dyn Fn(&T) -> H::Node>,
    cache: HashMap<K, Entry<T, H::Node>>,
    order: Vec<K>,
    last_pass: Option<PassReport>,
    disposed: bool,
}

impl<H, T, K> KeyedState<H, T, K>
where
    H: Host,
    T: Clone + Same + 'static,
    K: Clone + Eq + Hash + Debug + 'static,
{
    fn pass(&mut self, items: &[T]) -> Result<PassReport> {
        // Keys first: a configuration error must leave the output untouched.
        let mut keys = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match self.key.key(item, index) {
                Some(key) => keys.push(key),
                None => return Err(Error::MissingKey { index }),
            }
        }

        let warn_duplicates = config().warn_on_duplicate_keys;
        let mut report = PassReport::new();
        let mut next: HashMap<K, Slot<T, H::Node>> = HashMap::with_capacity(keys.len());
        let mut order: Vec<K> = Vec::with_capacity(keys.len());
        // Rendered but never placed: losers of a duplicate key.
        let mut discarded: Vec<H::Node> = Vec::new();

        // The cache is only read here. If `render` panics, the guard removes
        // what this pass rendered and the previous pass stays authoritative.
        let mut rendered = Uncommitted::new(&self.host);
        for (key, item) in keys.into_iter().zip(items) {
            if let Some(slot) = next.get_mut(&key) {
                report.duplicates += 1;
                if warn_duplicates {
                    tracing::warn!(?key, "duplicate key in keyed sequence; the last item wins");
                }
                if slot.item.same(item) {
                    continue;
                }
                let node = rendered.track((self.render)(item));
                report.rendered += 1;
                let previous = std::mem::replace(
                    slot,
                    Slot {
                        item: item.clone(),
                        node,
                        fresh: true,
                    },
                );
                if previous.fresh {
                    discarded.push(previous.node);
                }
                continue;
            }

            let slot = match self.cache.get(&key) {
                Some(entry) if entry.item.same(item) => Slot {
                    item: entry.item.clone(),
                    node: entry.node.clone(),
                    fresh: false,
                },
                _ => {
                    report.rendered += 1;
                    Slot {
                        item: item.clone(),
                        node: rendered.track((self.render)(item)),
                        fresh: true,
                    }
                }
            };
            order.push(key.clone());
            next.insert(key, slot);
        }
        rendered.commit();

        // Old entries not carried over: re-rendered keys and vanished keys.
        let mut stale = discarded;
        for (key, entry) in self.cache.drain() {
            match next.get(&key) {
                Some(slot) if !slot.fresh => {}
                Some(_) => {
                    report.replaced += 1;
                    stale.push(entry.node);
                }
                None => {
                    report.removed += 1;
                    stale.push(entry.node);
                }
            }
        }
        for node in &stale {
            self.host.remove(node);
        }

        let mut nodes = Vec::with_capacity(order.len());
        let mut positions = Vec::with_capacity(order.len());
        {
            let previous: HashMap<&K, usize> = self
                .order
                .iter()
                .enumerate()
                .map(|(position, key)| (key, position))
                .collect();
            for key in &order {
                let Some(slot) = next.get(key) else { continue };
                nodes.push(slot.node.clone());
                positions.push(if slot.fresh {
                    None
                } else {
                    previous.get(key).copied()
                });
            }
        }

        report.reused = next.values().filter(|slot| !slot.fresh).count();
        let same_keys = report.reused == next.len() && order.len() == self.order.len();
        report.placement = if same_keys && order == self.order {
            Placement::Unchanged
        } else if same_keys {
            Placement::Reorder
        } else {
            Placement::General
        };

        match report.placement {
            Placement::Unchanged => {}
            Placement::Reorder => report.placed = self.place_adjacent(&nodes),
            Placement::General => {
                let stable = lis(&positions);
                report.kept = stable.len();
                let mut keep = vec![false; nodes.len()];
                for index in stable {
                    keep[index] = true;
                }
                for index in (0..nodes.len()).rev() {
                    if keep[index] {
                        continue;
                    }
                    self.region.insert_before(&nodes[index], nodes.get(index + 1));
                    report.placed += 1;
                }
            }
        }

        self.cache = next
            .into_iter()
            .map(|(key, slot)| {
                (
                    key,
                    Entry {
                        item: slot.item,
                        node: slot.node,
                    },
                )
            })
            .collect();
        self.order = order;

        tracing::trace!(?report, "reconciled");
        self.last_pass = Some(report);
        Ok(report)
    }

    /// Walk right to left, moving only nodes not already before their successor.
    fn place_adjacent(&self, nodes: &[H::Node]) -> usize {
        let mut placed = 0;
        for index in (0..nodes.len()).rev() {
            let reference = nodes.get(index + 1).unwrap_or(self.region.end());
            if self.host.next_sibling(&nodes[index]).as_ref() != Some(reference) {
                self.region.insert_before(&nodes[index], Some(reference));
                placed += 1;
            }
        }
        placed
    }

    fn teardown(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        for (_, entry) in self.cache.drain() {
            self.host.remove(&entry.node);
        }
        self.order.clear();
        self.region.dispose();
    }
}

struct Keyed<H: Host, T, K> {
    host: H,
    container: H::Node,
    state: RefCell<KeyedState<H, T, K>>,
    effect: RefCell<Option<Effect>>,
}

impl<H, T, K> Keyed<H, T, K>
where
    H: Host,
    T: Clone + Same + 'static,
    K: Clone + Eq + Hash + Debug + 'static,
{
    fn update(&self, items: &[T]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.disposed {
            return Ok(());
        }
        state.pass(items).map(|_| ())
    }

    fn dispose(&self) {
        let effect = self.effect.borrow_mut().take();
        if let Some(effect) = effect {
            effect.dispose();
        }
        self.state.borrow_mut().teardown();
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Handle to a running reconciler.
pub struct Reconciled<H: Host, T, K> {
    keyed: Rc<Keyed<H, T, K>>,
}

impl<H: Host, T, K> Clone for Reconciled<H, T, K> {
    fn clone(&self) -> Self {
        Self {
            keyed: Rc::clone(&self.keyed),
        }
    }
}

impl<H: Host, T, K> Debug for Reconciled<H, T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.keyed.state.borrow();
        f.debug_struct("Reconciled")
            .field("node", &self.keyed.container)
            .field("entries", &state.cache.len())
            .field("last_pass", &state.last_pass)
            .field("disposed", &state.disposed)
            .finish()
    }
}

impl<H, T, K> Reconciled<H, T, K>
where
    H: Host,
    T: Clone + Same + 'static,
    K: Clone + Eq + Hash + Debug + 'static,
{
    /// The host node whose children track the source.
    pub fn node(&self) -> H::Node {
        self.keyed.container.clone()
    }

    /// Report of the most recent pass.
    pub fn last_pass(&self) -> Option<PassReport> {
        self.keyed.state.borrow().last_pass
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.keyed.state.borrow().cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys in current output order.
    pub fn keys(&self) -> Vec<K> {
        self.keyed.state.borrow().order.clone()
    }

    /// Node currently rendered for `key`.
    pub fn node_for(&self, key: &K) -> Option<H::Node> {
        self.keyed
            .state
            .borrow()
            .cache
            .get(key)
            .map(|entry| entry.node.clone())
    }

    /// Managed nodes in output order, read back from the host.
    pub fn nodes(&self) -> Vec<H::Node> {
        self.keyed.state.borrow().region.nodes()
    }

    pub fn is_disposed(&self) -> bool {
        self.keyed.state.borrow().disposed
    }

    /// Remove the host node, which tears the reconciler down.
    pub fn dispose(&self) {
        self.keyed.host.remove(&self.keyed.container);
        self.keyed.dispose();
    }
}

impl<H, T, K> Disposable for Reconciled<H, T, K>
where
    H: Host,
    T: Clone + Same + 'static,
    K: Clone + Eq + Hash + Debug + 'static,
{
    fn dispose(&self) {
        Reconciled::dispose(self);
    }
}

/// Render `source` as children of a new host node, keyed by `key`.
///
/// The first pass runs synchronously; later passes run when the scheduler
/// drains a change of `source`. Errors from later passes are returned by the
/// drain ([`flush_sync`](crate::flush_sync)).
///
/// # Errors
///
/// [`Error::MissingKey`] when `key` yields nothing for an item. On the first
/// pass the host node is discarded; on later passes the previous output stays
/// as it was.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
/// use spark_dom::{cell, flush_sync, reconcile, KeyFn, NodeTree};
///
/// struct Person { id: u32, name: &'static str }
///
/// let tree = NodeTree::new();
/// let people = cell(vec![
///     Rc::new(Person { id: 1, name: "Alice" }),
///     Rc::new(Person { id: 2, name: "Bob" }),
/// ]);
///
/// let render_tree = tree.clone();
/// let list = reconcile(
///     &tree,
///     &people,
///     KeyFn::by(|p: &Rc<Person>| p.id),
///     move |p| render_tree.text(p.name),
/// )
/// .unwrap();
/// assert_eq!(tree.text_of(list.node()), "AliceBob");
///
/// people.update(|list| list.reverse());
/// flush_sync().unwrap();
/// assert_eq!(tree.text_of(list.node()), "BobAlice");
/// assert_eq!(list.last_pass().unwrap().rendered, 0);
/// ```
pub fn reconcile<H, T, K>(
    host: &H,
    source: &Cell<Vec<T>>,
    key: KeyFn<T, K>,
    render: impl Fn(&T) -> H::Node + 'static,
) -> Result<Reconciled<H, T, K>>
where
    H: Host,
    T: Clone + Same + 'static,
    K: Clone + Eq + Hash + Debug + 'static,
{
    let container = host.create_container("each");
    let region = Region::attach(host, &container);

    let keyed = Rc::new(Keyed {
        host: host.clone(),
        container: container.clone(),
        state: RefCell::new(KeyedState {
            host: host.clone(),
            region,
            key,
            render: Box::new(render),
            cache: HashMap::new(),
            order: Vec::new(),
            last_pass: None,
            disposed: false,
        }),
        effect: RefCell::new(None),
    });

    let items = source.get();
    let first = keyed.state.borrow_mut().pass(&items);
    if let Err(error) = first {
        host.remove(&container);
        return Err(error);
    }

    let weak = Rc::downgrade(&keyed);
    let effect = watch_from(source.clone(), Some(items), move |items: &Vec<T>| {
        match weak.upgrade() {
            Some(keyed) => keyed.update(items),
            None => Ok(()),
        }
    });
    *keyed.effect.borrow_mut() = Some(effect);

    let owner = Rc::clone(&keyed);
    host.on_remove(&container, Box::new(move || owner.dispose()));

    Ok(Reconciled { keyed })
}
