//! Reconciliation Invariant Property Tests
//!
//! Random (old, new) keyed sequences checked against:
//!
//! - LIS: strictly increasing, skips `None`, maximal length
//! - Final output order equals a full rebuild of the new sequence
//! - Render calls equal the number of new or changed (key, item) pairs
//! - Host operations stay within the bound of the placement path taken
//! - Unchanged items keep their node

use std::cell::Cell as StdCell;
use std::collections::HashMap;
use std::rc::Rc;

use proptest::prelude::*;
use spark_dom::{cell, flush_sync, lis, reconcile, reset_scheduler, KeyFn, NodeTree, Placement};

/// (key, version): a version bump makes the item "changed" under `Same`.
type Item = (u32, u32);

/// Reference LIS length, O(n²).
fn lis_len_quadratic(positions: &[Option<usize>]) -> usize {
    let values: Vec<usize> = positions.iter().filter_map(|p| *p).collect();
    let mut best = vec![1usize; values.len()];
    for i in 0..values.len() {
        for j in 0..i {
            if values[j] < values[i] {
                best[i] = best[i].max(best[j] + 1);
            }
        }
    }
    best.into_iter().max().unwrap_or(0)
}

fn arb_positions() -> impl Strategy<Value = Vec<Option<usize>>> {
    prop::collection::vec(prop::option::weighted(0.8, 0usize..40), 0..40)
}

fn arb_keys() -> impl Strategy<Value = Vec<u32>> {
    prop::sample::subsequence((0u32..16).collect::<Vec<_>>(), 0..=16).prop_shuffle()
}

/// Old keys, new keys, and which surviving items get a new version.
fn arb_transition() -> impl Strategy<Value = (Vec<u32>, Vec<u32>, Vec<bool>)> {
    (arb_keys(), arb_keys(), prop::collection::vec(any::<bool>(), 16))
}

fn label(item: &Item) -> String {
    format!("{}:{}", item.0, item.1)
}

proptest! {
    /// Property: the result indexes a strictly increasing run of `Some`
    /// values, and no longer run exists.
    #[test]
    fn prop_lis_is_valid_and_maximal(positions in arb_positions()) {
        let run = lis(&positions);

        prop_assert!(run.windows(2).all(|w| w[0] < w[1]));
        let values: Vec<usize> = run.iter().map(|&i| positions[i]).collect::<Option<Vec<_>>>()
            .unwrap_or_default();
        prop_assert_eq!(values.len(), run.len(), "LIS picked a None entry");
        prop_assert!(values.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(run.len(), lis_len_quadratic(&positions));
    }

    /// Property: one pass turns any old output into the new sequence with
    /// the minimum render calls and bounded host operations.
    #[test]
    fn prop_reconcile_matches_rebuild((old_keys, new_keys, changed) in arb_transition()) {
        reset_scheduler();
        let tree = NodeTree::new();
        let old: Vec<Item> = old_keys.iter().map(|&k| (k, 0)).collect();
        let new: Vec<Item> = new_keys
            .iter()
            .map(|&k| (k, u32::from(changed[k as usize])))
            .collect();

        let source = cell(old.clone());
        let renders = Rc::new(StdCell::new(0usize));
        let render_tree = tree.clone();
        let counter = renders.clone();
        let list = reconcile(&tree, &source, KeyFn::by(|item: &Item| item.0), move |item| {
            counter.set(counter.get() + 1);
            render_tree.text(label(item))
        })
        .unwrap();

        let before: HashMap<u32, _> = old_keys
            .iter()
            .filter_map(|k| list.node_for(k).map(|node| (*k, node)))
            .collect();
        let old_position: HashMap<u32, usize> =
            old_keys.iter().enumerate().map(|(i, k)| (*k, i)).collect();
        renders.set(0);
        tree.reset_stats();

        source.set(new.clone());
        flush_sync().unwrap();

        // Same output as rendering `new` from scratch.
        let output: Vec<String> = tree
            .content_children(list.node())
            .into_iter()
            .filter_map(|node| tree.text_content(node))
            .collect();
        let rebuilt: Vec<String> = new.iter().map(label).collect();
        prop_assert_eq!(output, rebuilt);

        // Render only what is new or changed.
        let expected_renders = new
            .iter()
            .filter(|item| !old.contains(item))
            .count();
        prop_assert_eq!(renders.get(), expected_renders);

        // Unchanged items keep their node.
        for item in new.iter().filter(|item| old.contains(item)) {
            prop_assert_eq!(list.node_for(&item.0), before.get(&item.0).copied());
        }

        let stats = tree.stats();
        if old == new {
            // Identical sequences never schedule a pass.
            prop_assert_eq!(stats.moved + stats.inserted + stats.removed, 0);
            return Ok(());
        }
        let pass = list.last_pass().unwrap();
        prop_assert_eq!(stats.moved + stats.inserted, pass.placed);

        let n = new.len();
        match pass.placement {
            Placement::Unchanged => prop_assert_eq!(pass.placed, 0),
            Placement::Reorder => {
                prop_assert_eq!(renders.get(), 0);
                prop_assert!(pass.placed < n.max(1));
            }
            Placement::General => {
                let positions: Vec<Option<usize>> = new
                    .iter()
                    .map(|item| {
                        if old.contains(item) {
                            old_position.get(&item.0).copied()
                        } else {
                            None
                        }
                    })
                    .collect();
                prop_assert_eq!(pass.kept, lis_len_quadratic(&positions));
                prop_assert_eq!(pass.placed, n - pass.kept);
            }
        }
    }
}
