//! Todo List Example - Keyed reconciliation
//!
//! Walks a todo list through an append, an edit, a removal and a reorder,
//! printing the output tree and the pass report after each step. Moved nodes
//! are highlighted.
//!
//! Run with: cargo run --example todo_list
//! Trace each pass with: RUST_LOG=spark_dom=trace cargo run --example todo_list

use std::io::{self, Write};
use std::rc::Rc;

use spark_dom::{cell, flush_sync, reconcile, render_outline, KeyFn, NodeTree, RuntimeConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Todo {
    id: u32,
    title: &'static str,
    done: bool,
}

fn todo(id: u32, title: &'static str, done: bool) -> Rc<Todo> {
    Rc::new(Todo { id, title, done })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    spark_dom::configure(RuntimeConfig::from_env());

    let tree = NodeTree::new();
    let todos = cell(vec![
        todo(1, "write the parser", true),
        todo(2, "write the reconciler", false),
        todo(3, "write the docs", false),
    ]);

    let render_tree = tree.clone();
    let list = reconcile(&tree, &todos, KeyFn::by(|t: &Rc<Todo>| t.id), move |t| {
        let mark = if t.done { "[x]" } else { "[ ]" };
        render_tree.text(format!("{mark} {}", t.title))
    })?;

    let mut out = io::stdout();
    let mut step = |title: &str| -> Result<(), Box<dyn std::error::Error>> {
        flush_sync()?;
        println!("=== {title} ===");
        render_outline(&tree, list.node(), &mut out)?;
        out.flush()?;
        println!("{:?}", list.last_pass());
        println!("tree ops: {:?}\n", tree.stats());
        tree.reset_stats();
        Ok(())
    };

    step("initial")?;

    todos.update(|list| list.push(todo(4, "ship it", false)));
    step("append")?;

    todos.update(|list| list[1] = todo(2, "write the reconciler", true));
    step("complete #2")?;

    todos.update(|list| {
        list.retain(|t| t.id != 1);
    });
    step("remove #1")?;

    todos.update(|list| list.reverse());
    step("reverse")?;

    Ok(())
}
