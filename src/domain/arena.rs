use std::collections::{BTreeMap, HashMap};
use std::fmt;

use generational_arena::{Arena, Index};
use serde_json::Value;
use tracing::instrument;

use crate::domain::entities::NodeId;

/// Content payload of a mind-map node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    pub id: NodeId,
    /// Label shown on the node
    pub text: String,
    /// Free-form node type tag, exported as `type`
    pub kind: String,
    /// Opaque key/value payload carried through export
    pub data: Option<BTreeMap<String, Value>>,
    pub selected: bool,
}

impl NodeData {
    pub fn new(id: NodeId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            kind: DEFAULT_KIND.to_string(),
            data: None,
            selected: false,
        }
    }
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.text.is_empty() {
            write!(f, "({})", self.id)
        } else {
            write!(f, "{}", self.text)
        }
    }
}

pub const DEFAULT_KIND: &str = "topic";

/// Node record in the arena. Child order is owned by the positioner.
#[derive(Debug)]
pub struct TreeNode {
    pub data: NodeData,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
}

/// Arena-based node store keyed by [`NodeId`].
///
/// Uses generational indices so a removed node's stale index never aliases a
/// node inserted later.
#[derive(Debug, Default)]
pub struct TreeArena {
    arena: Arena<TreeNode>,
    ids: HashMap<NodeId, Index>,
    root: Option<Index>,
}

impl TreeArena {
    pub fn new() -> Self {
        Self::default()
    }

    #[instrument(level = "trace", skip(self, data), fields(id = %data.id))]
    pub fn insert_node(&mut self, data: NodeData, parent: Option<&NodeId>) -> Index {
        let parent_idx = parent.and_then(|p| self.ids.get(p).copied());
        let id = data.id.clone();
        let node_idx = self.arena.insert(TreeNode {
            data,
            parent: parent_idx,
        });
        self.ids.insert(id, node_idx);
        if parent.is_none() {
            self.root = Some(node_idx);
        }
        node_idx
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.ids.contains_key(id)
    }

    pub fn get_node(&self, id: &NodeId) -> Option<&TreeNode> {
        self.ids.get(id).and_then(|&idx| self.arena.get(idx))
    }

    pub fn get_node_mut(&mut self, id: &NodeId) -> Option<&mut TreeNode> {
        match self.ids.get(id) {
            Some(&idx) => self.arena.get_mut(idx),
            None => None,
        }
    }

    pub fn root(&self) -> Option<&NodeId> {
        self.root
            .and_then(|idx| self.arena.get(idx))
            .map(|node| &node.data.id)
    }

    pub fn parent(&self, id: &NodeId) -> Option<&NodeId> {
        self.get_node(id)
            .and_then(|node| node.parent)
            .and_then(|idx| self.arena.get(idx))
            .map(|node| &node.data.id)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn set_parent(&mut self, id: &NodeId, parent: &NodeId) {
        let parent_idx = self.ids.get(parent).copied();
        if let Some(node) = self.get_node_mut(id) {
            node.parent = parent_idx;
        }
    }

    /// Remove a single node record. Children are not touched.
    #[instrument(level = "trace", skip(self))]
    pub fn remove_node(&mut self, id: &NodeId) -> Option<NodeData> {
        let idx = self.ids.remove(id)?;
        if self.root == Some(idx) {
            self.root = None;
        }
        self.arena.remove(idx).map(|node| node.data)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Walk from `id`'s parent up to the root.
    pub fn ancestors(&self, id: &NodeId) -> AncestorIterator<'_> {
        AncestorIterator::new(self, id)
    }

    /// True when `ancestor` lies on the parent chain of `id`.
    pub fn is_ancestor(&self, ancestor: &NodeId, id: &NodeId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }
}

pub struct AncestorIterator<'a> {
    arena: &'a TreeArena,
    current: Option<Index>,
}

impl<'a> AncestorIterator<'a> {
    fn new(arena: &'a TreeArena, id: &NodeId) -> Self {
        let current = arena.get_node(id).and_then(|node| node.parent);
        Self { arena, current }
    }
}

impl<'a> Iterator for AncestorIterator<'a> {
    type Item = &'a NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.arena.arena.get(self.current?)?;
        self.current = node.parent;
        Some(&node.data.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena_with_chain() -> TreeArena {
        let mut arena = TreeArena::new();
        arena.insert_node(NodeData::new("root".into(), "Root"), None);
        arena.insert_node(NodeData::new("a".into(), "A"), Some(&"root".into()));
        arena.insert_node(NodeData::new("b".into(), "B"), Some(&"a".into()));
        arena
    }

    #[test]
    fn ancestors_walk_up_to_root() {
        let arena = arena_with_chain();
        let chain: Vec<&str> = arena.ancestors(&"b".into()).map(|id| id.as_str()).collect();
        assert_eq!(chain, vec!["a", "root"]);
        assert!(arena.is_ancestor(&"root".into(), &"b".into()));
        assert!(!arena.is_ancestor(&"b".into(), &"a".into()));
    }

    #[test]
    fn removed_ids_are_forgotten() {
        let mut arena = arena_with_chain();
        let removed = arena.remove_node(&"b".into()).unwrap();
        assert_eq!(removed.text, "B");
        assert!(!arena.contains(&"b".into()));
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.parent(&"a".into()).map(|p| p.as_str()), Some("root"));
    }

    #[test]
    fn removing_root_clears_root() {
        let mut arena = arena_with_chain();
        arena.remove_node(&"root".into());
        assert!(arena.root().is_none());
    }
}
