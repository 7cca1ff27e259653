//! Outline rendering.
//!
//! ```text
//! <list>
//!   ◆ region-start
//!   "Alice"
//!   "Bob"   (moved)
//!   ◆ region-end
//! ```

use std::io::{self, Write};

use crossterm::queue;
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};

use crate::engine::NodeTree;
use crate::types::{NodeFlags, NodeId, NodeKind};

const INDENT: &str = "  ";

fn label(kind: &NodeKind) -> String {
    match kind {
        NodeKind::Element { tag } => format!("<{tag}>"),
        NodeKind::Text { content } => format!("{content:?}"),
        NodeKind::Marker { label } => format!("◆ {label}"),
    }
}

fn color(kind: &NodeKind, flags: NodeFlags) -> Color {
    if flags.contains(NodeFlags::MOVED) {
        return Color::Yellow;
    }
    if flags.contains(NodeFlags::FRESH) {
        return Color::Green;
    }
    match kind {
        NodeKind::Element { .. } => Color::Cyan,
        NodeKind::Text { .. } => Color::White,
        NodeKind::Marker { .. } => Color::DarkGrey,
    }
}

/// Plain-text outline of the subtree at `root`, one node per line.
///
/// Dead nodes produce an empty string.
pub fn outline_text(tree: &NodeTree, root: NodeId) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = walk(tree, root, 0, &mut |depth, kind, flags| {
        out.push_str(&INDENT.repeat(depth));
        out.push_str(&label(kind));
        if flags.contains(NodeFlags::MOVED) {
            out.push_str("  (moved)");
        }
        out.push('\n');
        Ok(())
    });
    out
}

/// Write a colored outline of the subtree at `root` to `out`.
///
/// Commands are queued; the caller decides when to flush.
pub fn render_outline(tree: &NodeTree, root: NodeId, out: &mut impl Write) -> io::Result<()> {
    walk(tree, root, 0, &mut |depth, kind, flags| {
        queue!(
            out,
            Print(INDENT.repeat(depth)),
            SetForegroundColor(color(kind, flags))
        )?;
        if flags.contains(NodeFlags::MOVED) {
            queue!(out, SetAttribute(Attribute::Bold))?;
        }
        queue!(
            out,
            Print(label(kind)),
            SetAttribute(Attribute::Reset),
            ResetColor,
            Print("\r\n")
        )
    })
}

fn walk(
    tree: &NodeTree,
    id: NodeId,
    depth: usize,
    visit: &mut dyn FnMut(usize, &NodeKind, NodeFlags) -> io::Result<()>,
) -> io::Result<()> {
    let Some(kind) = tree.kind(id) else {
        return Ok(());
    };
    visit(depth, &kind, tree.flags(id))?;
    for child in tree.children(id) {
        walk(tree, child, depth + 1, visit)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (NodeTree, NodeId, NodeId) {
        let tree = NodeTree::new();
        let root = tree.element("list");
        let start = tree.marker("region-start");
        let a = tree.text("a");
        let b = tree.text("b");
        tree.append_child(root, start);
        tree.append_child(root, a);
        tree.append_child(root, b);
        (tree, root, a)
    }

    #[test]
    fn test_outline_text() {
        let (tree, root, a) = sample();
        tree.reset_stats();
        tree.append_child(root, a);

        assert_eq!(
            outline_text(&tree, root),
            "<list>\n  ◆ region-start\n  \"b\"\n  \"a\"  (moved)\n"
        );
    }

    #[test]
    fn test_outline_of_dead_node_is_empty() {
        let (tree, root, _) = sample();
        tree.remove(root);
        assert_eq!(outline_text(&tree, root), "");
    }

    #[test]
    fn test_render_outline_writes_labels() {
        let (tree, root, _) = sample();
        let mut out: Vec<u8> = Vec::new();
        render_outline(&tree, root, &mut out).unwrap();

        let written = String::from_utf8(out).unwrap();
        assert!(written.contains("<list>"));
        assert!(written.contains("\"a\""));
        assert!(written.contains("◆ region-start"));
        assert!(written.contains("\x1b["));
        assert_eq!(written.matches("\r\n").count(), 4);
    }
}
