//! Terminal rendering of a mind map as an indented tree.

use termtree::Tree;

use crate::application::editor::MindMap;
use crate::domain::NodeId;

impl MindMap {
    /// Build a printable tree: each line shows the node text, its side and
    /// level, and its current center.
    pub fn to_tree_view(&self) -> Tree<String> {
        match self.root() {
            Some(root) => self.tree_view_node(root),
            None => Tree::new("(empty map)".to_string()),
        }
    }

    fn tree_view_node(&self, id: &NodeId) -> Tree<String> {
        let leaves: Vec<_> = self
            .children(id)
            .iter()
            .map(|child| self.tree_view_node(child))
            .collect();
        Tree::new(self.node_label(id)).with_leaves(leaves)
    }

    fn node_label(&self, id: &NodeId) -> String {
        let text = self
            .node(id)
            .map(|n| n.to_string())
            .unwrap_or_else(|| id.to_string());
        match (self.position(id), self.parent(id)) {
            (Some(p), None) => format!("{} ({:.1}, {:.1})", text, p.x, p.y),
            (Some(p), Some(_)) => format!("{} [{} {}] ({:.1}, {:.1})", text, p.side, p.level, p.x, p.y),
            (None, _) => text,
        }
    }
}
