//! Branches Example - First-true-wins conditional rendering
//!
//! A status panel switching between loading, error and ready views as the
//! conditions change. Writes inside one batch coalesce into one rebuild.
//!
//! Run with: cargo run --example branches

use spark_dom::{batch, cell, flush_sync, outline_text, select_branch, NodeTree, Value};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let tree = NodeTree::new();
    let loading = cell(true);
    let failed = cell(false);

    let (t1, t2, t3) = (tree.clone(), tree.clone(), tree.clone());
    let panel = select_branch(
        &tree,
        vec![Value::from(&loading), Value::from(&failed)],
        vec![
            Box::new(move || t1.text("loading...")),
            Box::new(move || t2.text("something went wrong")),
        ],
        Some(Box::new(move || t3.text("ready"))),
    )?;

    let show = |title: &str| {
        println!("=== {title} (branch {:?}, builds {}) ===", panel.active(), panel.builds());
        print!("{}", outline_text(&tree, panel.node()));
        println!();
    };

    show("initial");

    batch(|| {
        loading.set(false);
        failed.set(true);
    })?;
    show("failed");

    failed.set(false);
    flush_sync()?;
    show("ready");

    // Toggled and restored inside one batch: nothing to rebuild.
    batch(|| {
        loading.set(true);
        loading.set(false);
    })?;
    show("unchanged");

    Ok(())
}
