//! Mind-map editing operations
//!
//! [`MindMap`] ties node content (arena) to layout state (positioner) and
//! guards the structural invariants: one root, side inheritance below the
//! root's children, consistent levels and an acyclic parent chain. Every
//! check runs before the first write, so a rejected operation leaves the map
//! untouched.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::application::render::{Edge, LayoutUpdate, MapEvent, PendingEvents, RenderTarget};
use crate::config::Settings;
use crate::domain::{
    Dimensions, DomainError, DomainResult, HierarchicalPositioner, NodeData, NodeId, Position,
    Side, StructuralError, TreeArena,
};

/// Renderer feedback rounds allowed after one structural change.
const MAX_EVENT_ROUNDS: usize = 8;

pub struct MindMap {
    pub(crate) nodes: TreeArena,
    pub(crate) positioner: HierarchicalPositioner,
    settings: Settings,
    auto_layout: bool,
    batch_depth: usize,
    layout_pending: bool,
    renderer: Option<Box<dyn RenderTarget>>,
    pending: PendingEvents,
}

impl fmt::Debug for MindMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MindMap")
            .field("nodes", &self.nodes.len())
            .field("root", &self.root())
            .field("auto_layout", &self.auto_layout)
            .field("layout_pending", &self.layout_pending)
            .finish_non_exhaustive()
    }
}

impl Default for MindMap {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl MindMap {
    pub fn new(settings: Settings) -> Self {
        Self {
            nodes: TreeArena::new(),
            positioner: HierarchicalPositioner::new(
                settings.layout_params(),
                settings.node_dimensions(),
            ),
            settings,
            auto_layout: true,
            batch_depth: 0,
            layout_pending: false,
            renderer: None,
            pending: PendingEvents::default(),
        }
    }

    pub fn with_renderer(mut self, renderer: Box<dyn RenderTarget>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn set_renderer(&mut self, renderer: Option<Box<dyn RenderTarget>>) {
        self.renderer = renderer;
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn anchor(&self) -> (f64, f64) {
        (self.settings.root_x, self.settings.root_y)
    }

    /// Move the root anchor and re-place everything around it.
    pub fn set_anchor(&mut self, x: f64, y: f64) {
        self.settings.root_x = x;
        self.settings.root_y = y;
        if let Some(root) = self.root().cloned() {
            self.relayout(&root);
        }
    }

    // ============================================================
    // Structural mutations
    // ============================================================

    /// Create the root node. Only one root may ever exist.
    #[instrument(level = "debug", skip(self))]
    pub fn create_root(&mut self, text: &str) -> DomainResult<NodeId> {
        self.insert(NodeData::new(NodeId::generate(), text), None, None)
    }

    /// Append a new child under `parent`.
    ///
    /// `side` is only honoured directly under the root; without it the new
    /// branch goes to whichever side currently has fewer branches.
    #[instrument(level = "debug", skip(self))]
    pub fn add_node(&mut self, parent: &NodeId, text: &str, side: Option<Side>) -> DomainResult<NodeId> {
        self.insert(NodeData::new(NodeId::generate(), text), Some(parent), side)
    }

    /// Like [`MindMap::add_node`] with caller-supplied content and id.
    pub fn add_node_data(
        &mut self,
        parent: Option<&NodeId>,
        data: NodeData,
        side: Option<Side>,
    ) -> DomainResult<NodeId> {
        self.insert(data, parent, side)
    }

    fn insert(&mut self, data: NodeData, parent: Option<&NodeId>, side: Option<Side>) -> DomainResult<NodeId> {
        let id = data.id.clone();
        if self.nodes.contains(&id) {
            return Err(DomainError::validation(id.to_string(), "duplicate node id"));
        }
        let (root_x, root_y) = self.anchor();

        let side = match (parent, self.positioner.root()) {
            (Some(p), Some(root)) if p == root => Some(side.unwrap_or_else(|| self.balanced_side())),
            _ => None,
        };
        self.positioner
            .calculate_node_position(&id, parent, side, root_x, root_y)?;

        if let Some(p) = parent {
            self.positioner.add_child_at_end(p, &id);
        }
        self.nodes.insert_node(data, parent);
        debug!("insert: {} under {:?}", id, parent);

        let trigger = parent.cloned().unwrap_or_else(|| id.clone());
        self.relayout(&trigger);
        Ok(id)
    }

    fn balanced_side(&self) -> Side {
        let Some(root) = self.positioner.root() else {
            return Side::Right;
        };
        let left = self
            .positioner
            .children(root)
            .iter()
            .filter(|c| self.positioner.side(c) == Some(Side::Left))
            .count();
        let right = self.positioner.children(root).len() - left;
        if left < right {
            Side::Left
        } else {
            Side::Right
        }
    }

    /// Delete `id` and its whole subtree. Returns the number of nodes removed;
    /// unknown ids remove nothing.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_node(&mut self, id: &NodeId) -> DomainResult<usize> {
        if !self.nodes.contains(id) {
            return Ok(0);
        }
        let Some(parent) = self.nodes.parent(id).cloned() else {
            return Err(StructuralError::RootRemoval(id.clone()).into());
        };

        let descendants = self.positioner.descendants(id);
        for doomed in descendants.iter().rev() {
            self.positioner.remove_node(doomed);
            self.nodes.remove_node(doomed);
        }
        self.positioner.remove_from_children_map(&parent, id);
        self.positioner.remove_node(id);
        self.nodes.remove_node(id);
        debug!("remove_node: {} and {} descendants", id, descendants.len());

        self.relayout(&parent);
        Ok(descendants.len() + 1)
    }

    /// Move `id` to `new_index` among its siblings (clamped to the end).
    /// Returns false for unknown ids and for the root.
    #[instrument(level = "debug", skip(self))]
    pub fn reorder(&mut self, id: &NodeId, new_index: usize) -> bool {
        let Some(parent) = self.nodes.parent(id).cloned() else {
            return false;
        };
        self.positioner.remove_from_children_map(&parent, id);
        self.positioner
            .add_to_children_map(&parent, id, Some(new_index));
        self.relayout(&parent);
        true
    }

    /// Sibling index a node dropped at vertical position `y` should take
    /// under `parent`. `moving` is excluded from the count.
    pub fn drop_index(&self, parent: &NodeId, y: f64, moving: &NodeId) -> usize {
        self.positioner
            .children(parent)
            .iter()
            .filter(|c| *c != moving)
            .filter(|c| self.positioner.position(c).is_some_and(|p| p.y < y))
            .count()
    }

    /// Move `id` with its subtree under `new_parent`.
    ///
    /// Fails with a cycle error when `new_parent` is `id` or one of its
    /// descendants. Under the root the subtree keeps its current side unless
    /// `side` is given; elsewhere it takes the new parent's side.
    #[instrument(level = "debug", skip(self))]
    pub fn reparent(&mut self, id: &NodeId, new_parent: &NodeId, side: Option<Side>) -> DomainResult<()> {
        if !self.nodes.contains(id) || !self.nodes.contains(new_parent) {
            return Ok(());
        }
        if id == new_parent || self.nodes.is_ancestor(id, new_parent) {
            return Err(DomainError::Cycle {
                node: id.clone(),
                target: new_parent.clone(),
            });
        }
        let Some(old_parent) = self.nodes.parent(id).cloned() else {
            return Ok(());
        };
        let Some(root) = self.root().cloned() else {
            return Err(StructuralError::NoRoot.into());
        };

        let current_side = self.positioner.side(id).unwrap_or_default();
        let new_side = if *new_parent == root {
            side.unwrap_or(current_side)
        } else {
            self.positioner.side(new_parent).unwrap_or_default()
        };
        let new_level = self.positioner.level(new_parent).unwrap_or(0) + 1;

        self.positioner.remove_from_children_map(&old_parent, id);
        self.positioner.add_child_at_end(new_parent, id);
        self.nodes.set_parent(id, new_parent);
        self.positioner.propagate_subtree(id, new_side, new_level);
        debug!("reparent: {} from {} to {} ({})", id, old_parent, new_parent, new_side);

        self.relayout(&root);
        Ok(())
    }

    /// Flip a root branch, with its whole subtree, to `side`.
    #[instrument(level = "debug", skip(self))]
    pub fn move_to_side(&mut self, id: &NodeId, side: Side) -> DomainResult<()> {
        if !self.nodes.contains(id) {
            return Ok(());
        }
        let is_root_child = match (self.nodes.parent(id), self.root()) {
            (Some(parent), Some(root)) => parent == root,
            _ => false,
        };
        if !is_root_child {
            return Err(StructuralError::NotRootChild(id.clone()).into());
        }
        self.positioner.propagate_subtree(id, side, 1);
        if let Some(root) = self.root().cloned() {
            self.relayout(&root);
        }
        Ok(())
    }

    /// Report a new rendered size for `id`. Unknown ids are ignored.
    /// Report a node's measured size. Sizes that are not positive and
    /// finite are rejected; unknown nodes are ignored.
    pub fn resize_node(&mut self, id: &NodeId, width: f64, height: f64) -> DomainResult<()> {
        if !Dimensions::new(width, height).is_measurable() {
            return Err(DomainError::InvalidSize {
                id: id.clone(),
                width,
                height,
            });
        }
        self.handle_event(MapEvent::Resized {
            id: id.clone(),
            width,
            height,
        });
        Ok(())
    }

    pub fn handle_event(&mut self, event: MapEvent) {
        if let Some(trigger) = self.apply_event(event) {
            self.relayout(&trigger);
        }
    }

    /// Apply an event's state change; returns the node whose parent subtree
    /// needs a new layout, if any.
    fn apply_event(&mut self, event: MapEvent) -> Option<NodeId> {
        match event {
            MapEvent::Resized { id, width, height } => {
                let dims = Dimensions::new(width, height);
                if !dims.is_measurable() {
                    warn!("apply_event: ignoring size {}x{} for {}", width, height, id);
                    return None;
                }
                if self.positioner.state().node_data.get(&id) == Some(&dims) {
                    return None;
                }
                if !self.positioner.update_node_dimensions(&id, dims) {
                    return None;
                }
                Some(self.nodes.parent(&id).cloned().unwrap_or(id))
            }
            MapEvent::TextChanged { id, text } => {
                self.set_text(&id, &text);
                None
            }
            MapEvent::SelectionChanged { id, selected } => {
                self.set_selected(&id, selected);
                None
            }
        }
    }

    // ============================================================
    // Content edits (no layout impact until the renderer re-measures)
    // ============================================================

    pub fn set_text(&mut self, id: &NodeId, text: &str) -> bool {
        match self.nodes.get_node_mut(id) {
            Some(node) => {
                node.data.text = text.to_string();
                true
            }
            None => false,
        }
    }

    pub fn set_kind(&mut self, id: &NodeId, kind: &str) -> bool {
        match self.nodes.get_node_mut(id) {
            Some(node) => {
                node.data.kind = kind.to_string();
                true
            }
            None => false,
        }
    }

    pub fn set_selected(&mut self, id: &NodeId, selected: bool) -> bool {
        match self.nodes.get_node_mut(id) {
            Some(node) => {
                node.data.selected = selected;
                true
            }
            None => false,
        }
    }

    pub fn set_data(&mut self, id: &NodeId, data: Option<BTreeMap<String, Value>>) -> bool {
        match self.nodes.get_node_mut(id) {
            Some(node) => {
                node.data.data = data;
                true
            }
            None => false,
        }
    }

    // ============================================================
    // Layout scheduling
    // ============================================================

    /// Run `f` with layout suspended; a single pass runs afterwards if
    /// anything inside changed the tree.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.batch_depth += 1;
        let result = f(self);
        self.batch_depth -= 1;
        if self.batch_depth == 0 && self.auto_layout {
            self.flush();
        }
        result
    }

    /// With auto layout off, mutations only mark the layout as stale until
    /// [`MindMap::flush`] is called.
    pub fn set_auto_layout(&mut self, enabled: bool) {
        self.auto_layout = enabled;
        if enabled && self.batch_depth == 0 {
            self.flush();
        }
    }

    pub fn is_layout_pending(&self) -> bool {
        self.layout_pending
    }

    /// Run the deferred layout pass, if one is pending.
    pub fn flush(&mut self) -> bool {
        if !self.layout_pending {
            return false;
        }
        match self.root().cloned() {
            Some(root) => self.run_layout(&root),
            None => self.layout_pending = false,
        }
        true
    }

    fn relayout(&mut self, trigger: &NodeId) {
        if self.batch_depth > 0 || !self.auto_layout {
            self.layout_pending = true;
            return;
        }
        self.run_layout(trigger);
    }

    fn run_layout(&mut self, trigger: &NodeId) {
        let (root_x, root_y) = self.anchor();
        let mut trigger = trigger.clone();

        for round in 0..=MAX_EVENT_ROUNDS {
            let positions = self
                .positioner
                .reposition_siblings(&trigger, root_x, root_y);
            self.layout_pending = false;

            let Some(renderer) = self.renderer.as_mut() else {
                return;
            };
            let update = LayoutUpdate {
                positions,
                edges: edges(&self.positioner),
            };
            renderer.layout_changed(&update, &mut self.pending);
            if self.pending.is_empty() {
                return;
            }
            if round == MAX_EVENT_ROUNDS {
                warn!(
                    "dropping {} renderer events after {} layout rounds",
                    self.pending.len(),
                    MAX_EVENT_ROUNDS
                );
                self.pending.clear();
                return;
            }

            let mut next = None;
            for event in self.pending.take() {
                if let Some(id) = self.apply_event(event) {
                    next = Some(id);
                }
            }
            match next {
                Some(id) => trigger = id,
                None => return,
            }
        }
    }

    /// Take over the tree of `other`, keeping this map's renderer and
    /// settings, and lay it out.
    pub(crate) fn replace_tree(&mut self, other: MindMap) {
        self.nodes = other.nodes;
        self.positioner = other.positioner;
        self.pending.clear();
        match self.root().cloned() {
            Some(root) => self.relayout(&root),
            None => self.layout_pending = false,
        }
    }

    /// Current positions and edges, as they would be sent to a renderer.
    pub fn layout_update(&self) -> LayoutUpdate {
        LayoutUpdate {
            positions: self.positioner.positions().into_iter().cloned().collect(),
            edges: edges(&self.positioner),
        }
    }

    // ============================================================
    // Queries
    // ============================================================

    pub fn root(&self) -> Option<&NodeId> {
        self.positioner.root()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: &NodeId) -> Option<&NodeData> {
        self.nodes.get_node(id).map(|n| &n.data)
    }

    pub fn parent(&self, id: &NodeId) -> Option<&NodeId> {
        self.nodes.parent(id)
    }

    pub fn children(&self, id: &NodeId) -> &[NodeId] {
        self.positioner.children(id)
    }

    pub fn side(&self, id: &NodeId) -> Option<Side> {
        self.positioner.side(id)
    }

    pub fn level(&self, id: &NodeId) -> Option<usize> {
        self.positioner.level(id)
    }

    pub fn dimensions(&self, id: &NodeId) -> Option<Dimensions> {
        self.positioner.state().node_data.get(id).copied()
    }

    /// Last computed position; `None` for unknown ids.
    pub fn position(&self, id: &NodeId) -> Option<&Position> {
        self.positioner.position(id)
    }

    pub fn positions(&self) -> Vec<&Position> {
        self.positioner.positions()
    }

    pub fn descendants(&self, id: &NodeId) -> Vec<NodeId> {
        self.positioner.descendants(id)
    }

    pub fn find_overlaps(&self) -> Vec<(NodeId, NodeId)> {
        self.positioner.find_overlaps()
    }
}

fn edges(positioner: &HierarchicalPositioner) -> Vec<Edge> {
    let Some(root) = positioner.root() else {
        return Vec::new();
    };
    std::iter::once(root.clone())
        .chain(positioner.descendants(root))
        .flat_map(|parent| {
            positioner
                .children(&parent)
                .iter()
                .map(|child| Edge {
                    parent: parent.clone(),
                    child: child.clone(),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_side_alternates_root_branches() {
        let mut map = MindMap::default();
        let root = map.create_root("root").unwrap();
        let a = map.add_node(&root, "a", None).unwrap();
        let b = map.add_node(&root, "b", None).unwrap();
        let c = map.add_node(&root, "c", None).unwrap();
        assert_eq!(map.side(&a), Some(Side::Right));
        assert_eq!(map.side(&b), Some(Side::Left));
        assert_eq!(map.side(&c), Some(Side::Right));
    }

    #[test]
    fn edges_cover_every_parent_child_pair() {
        let mut map = MindMap::default();
        let root = map.create_root("root").unwrap();
        let a = map.add_node(&root, "a", None).unwrap();
        map.add_node(&a, "a1", None).unwrap();
        assert_eq!(map.layout_update().edges.len(), 2);
    }
}
