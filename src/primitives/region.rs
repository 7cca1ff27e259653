//! Region - A managed range bounded by two anchors.
//!
//! ```text
//! parent
//! ├── (static siblings)
//! ├── ◆ start
//! ├── managed node
//! ├── managed node
//! ├── ◆ end
//! └── (static siblings)
//! ```
//!
//! Everything strictly between the anchors belongs to the region's owner.
//! Static siblings on either side are never touched.

use crate::engine::Host;

/// A pair of stable anchors inside a parent node.
pub struct Region<H: Host> {
    host: H,
    parent: H::Node,
    start: H::Node,
    end: H::Node,
}

impl<H: Host> Region<H> {
    /// Append a start and an end anchor to `parent`.
    pub fn attach(host: &H, parent: &H::Node) -> Self {
        let start = host.create_marker("region-start");
        let end = host.create_marker("region-end");
        host.append_child(parent, &start);
        host.append_child(parent, &end);
        Self {
            host: host.clone(),
            parent: parent.clone(),
            start,
            end,
        }
    }

    pub fn parent(&self) -> &H::Node {
        &self.parent
    }

    pub fn start(&self) -> &H::Node {
        &self.start
    }

    pub fn end(&self) -> &H::Node {
        &self.end
    }

    /// Place `node` before `reference`, or before the end anchor when `None`.
    pub fn insert_before(&self, node: &H::Node, reference: Option<&H::Node>) {
        let reference = reference.unwrap_or(&self.end);
        self.host.insert_before(&self.parent, node, reference);
    }

    /// Nodes strictly between the anchors, in order.
    pub fn nodes(&self) -> Vec<H::Node> {
        let mut nodes = Vec::new();
        let mut cursor = self.host.next_sibling(&self.start);
        while let Some(node) = cursor {
            if node == self.end {
                break;
            }
            cursor = self.host.next_sibling(&node);
            nodes.push(node);
        }
        nodes
    }

    /// Remove every managed node. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let nodes = self.nodes();
        for node in &nodes {
            self.host.remove(node);
        }
        nodes.len()
    }

    /// Clear, then remove the anchors themselves.
    pub fn dispose(&self) {
        self.clear();
        self.host.remove(&self.start);
        self.host.remove(&self.end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NodeTree;

    #[test]
    fn test_region_keeps_static_siblings() {
        let tree = NodeTree::new();
        let parent = tree.element("div");
        let before = tree.text("header");
        tree.append_child(parent, before);

        let region = Region::attach(&tree, &parent);

        let after = tree.text("footer");
        tree.append_child(parent, after);

        let a = tree.text("a");
        let b = tree.text("b");
        region.insert_before(&a, None);
        region.insert_before(&b, None);
        assert_eq!(region.nodes(), vec![a, b]);
        assert_eq!(tree.text_of(parent), "headerabfooter");

        assert_eq!(region.clear(), 2);
        assert!(region.nodes().is_empty());
        assert_eq!(tree.text_of(parent), "headerfooter");
        assert!(!tree.is_alive(a));

        region.dispose();
        assert_eq!(tree.children(parent), vec![before, after]);
    }

    #[test]
    fn test_insert_before_reference() {
        let tree = NodeTree::new();
        let parent = tree.element("ul");
        let region = Region::attach(&tree, &parent);

        let b = tree.text("b");
        let a = tree.text("a");
        region.insert_before(&b, None);
        region.insert_before(&a, Some(&b));
        assert_eq!(region.nodes(), vec![a, b]);
    }
}
