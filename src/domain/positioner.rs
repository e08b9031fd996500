//! Per-node layout state and full-tree repositioning.

use std::collections::HashMap;

use itertools::Itertools;
use tracing::{debug, instrument, trace};

use crate::domain::calculator::{LayoutParams, SizedNode, TreeLayoutCalculator};
use crate::domain::entities::{Dimensions, NodeId, Position, Rect, Side};
use crate::domain::error::{DomainError, DomainResult, StructuralError};

/// Layout records for every node of one mind map.
#[derive(Debug, Clone, Default)]
pub struct LayoutState {
    pub(crate) root: Option<NodeId>,
    pub(crate) node_positions: HashMap<NodeId, Position>,
    pub(crate) children_map: HashMap<NodeId, Vec<NodeId>>,
    pub(crate) node_sides: HashMap<NodeId, Side>,
    pub(crate) node_levels: HashMap<NodeId, usize>,
    pub(crate) node_data: HashMap<NodeId, Dimensions>,
}

/// Owns [`LayoutState`] and recomputes absolute positions after each
/// structural change.
#[derive(Debug, Clone)]
pub struct HierarchicalPositioner {
    state: LayoutState,
    calculator: TreeLayoutCalculator,
    default_dimensions: Dimensions,
}

impl HierarchicalPositioner {
    pub fn new(params: LayoutParams, default_dimensions: Dimensions) -> Self {
        Self {
            state: LayoutState::default(),
            calculator: TreeLayoutCalculator::new(params),
            default_dimensions,
        }
    }

    pub fn state(&self) -> &LayoutState {
        &self.state
    }

    pub fn params(&self) -> &LayoutParams {
        self.calculator.params()
    }

    pub fn root(&self) -> Option<&NodeId> {
        self.state.root.as_ref()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.state.node_levels.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.state.node_levels.len()
    }

    /// Register a node and return a provisional position.
    ///
    /// The root is pinned to the anchor on the right side at level 0. Other
    /// nodes take `side` when their parent is the root (right if omitted) and
    /// inherit the parent's side otherwise.
    #[instrument(level = "debug", skip(self))]
    pub fn calculate_node_position(
        &mut self,
        id: &NodeId,
        parent: Option<&NodeId>,
        side: Option<Side>,
        root_x: f64,
        root_y: f64,
    ) -> DomainResult<Position> {
        let Some(parent) = parent else {
            if let Some(existing) = &self.state.root {
                if existing != id {
                    return Err(StructuralError::RootExists(existing.clone()).into());
                }
            }
            let position = Position {
                id: id.clone(),
                x: root_x,
                y: root_y,
                level: 0,
                side: Side::Right,
                stack_index: 0,
            };
            self.state.root = Some(id.clone());
            self.register(id, Side::Right, 0, position.clone());
            return Ok(position);
        };

        let root = self.state.root.clone().ok_or(StructuralError::NoRoot)?;
        let parent_level = *self
            .state
            .node_levels
            .get(parent)
            .ok_or_else(|| StructuralError::UnknownNode(parent.clone()))?;

        let node_side = if *parent == root {
            side.unwrap_or(Side::Right)
        } else {
            self.side(parent).unwrap_or_default()
        };

        let parent_pos = self.state.node_positions.get(parent);
        let parent_dims = self.dimensions(parent);
        let dims = self.dimensions(id);
        let (px, py) = parent_pos.map_or((root_x, root_y), |p| (p.x, p.y));
        let siblings = self.children(parent);
        let stack_index = siblings
            .iter()
            .position(|c| c == id)
            .unwrap_or(siblings.len());

        let position = Position {
            id: id.clone(),
            x: px
                + node_side.sign()
                    * (parent_dims.width / 2.0
                        + self.params().horizontal_spacing
                        + dims.width / 2.0),
            y: py,
            level: parent_level + 1,
            side: node_side,
            stack_index,
        };
        self.register(id, node_side, parent_level + 1, position.clone());
        Ok(position)
    }

    fn register(&mut self, id: &NodeId, side: Side, level: usize, position: Position) {
        self.state.node_sides.insert(id.clone(), side);
        self.state.node_levels.insert(id.clone(), level);
        self.state
            .node_data
            .entry(id.clone())
            .or_insert(self.default_dimensions);
        self.state.children_map.entry(id.clone()).or_default();
        self.state.node_positions.insert(id.clone(), position);
    }

    /// Recompute the whole tree from the root and write every position back.
    ///
    /// `parent` names the subtree whose change triggered the pass; layout is
    /// always global so that sibling subtrees elsewhere stay clear of it.
    #[instrument(level = "debug", skip(self))]
    pub fn reposition_siblings(&mut self, parent: &NodeId, root_x: f64, root_y: f64) -> Vec<Position> {
        let Some(root) = self.state.root.clone() else {
            return Vec::new();
        };

        let mut left = Vec::new();
        let mut right = Vec::new();
        for child in self.children(&root) {
            let sized = self.build_sized(child);
            match self.side(child).unwrap_or_default() {
                Side::Left => left.push(sized),
                Side::Right => right.push(sized),
            }
        }
        let root_node = SizedNode {
            id: root.clone(),
            dimensions: self.dimensions(&root),
            children: Vec::new(),
        };

        let results = self
            .calculator
            .calculate_layout(&left, &right, &root_node, root_x, root_y);

        let stack_indices: HashMap<&NodeId, usize> = self
            .state
            .children_map
            .values()
            .flat_map(|children| children.iter().enumerate().map(|(i, c)| (c, i)))
            .collect();

        let positions: Vec<Position> = results
            .into_iter()
            .map(|r| Position {
                level: self.level(&r.id).unwrap_or(0),
                side: self.side(&r.id).unwrap_or_default(),
                stack_index: stack_indices.get(&r.id).copied().unwrap_or(0),
                x: r.x,
                y: r.y,
                id: r.id,
            })
            .collect();

        for position in &positions {
            self.state
                .node_positions
                .insert(position.id.clone(), position.clone());
        }
        debug!("reposition_siblings: {} positions updated", positions.len());
        positions
    }

    fn build_sized(&self, id: &NodeId) -> SizedNode {
        SizedNode {
            id: id.clone(),
            dimensions: self.dimensions(id),
            children: self
                .children(id)
                .iter()
                .map(|child| self.build_sized(child))
                .collect(),
        }
    }

    /// Insert `child` into `parent`'s children at `index` (end if `None`).
    /// An existing occurrence is moved rather than duplicated.
    pub fn add_to_children_map(&mut self, parent: &NodeId, child: &NodeId, index: Option<usize>) {
        let children = self.state.children_map.entry(parent.clone()).or_default();
        children.retain(|c| c != child);
        let at = index.map_or(children.len(), |i| i.min(children.len()));
        children.insert(at, child.clone());
        trace!("add_to_children_map: {} -> {} at {}", parent, child, at);
    }

    pub fn add_child_at_end(&mut self, parent: &NodeId, child: &NodeId) {
        self.add_to_children_map(parent, child, None);
    }

    /// Returns the index `child` had, if it was present.
    pub fn remove_from_children_map(&mut self, parent: &NodeId, child: &NodeId) -> Option<usize> {
        let children = self.state.children_map.get_mut(parent)?;
        let index = children.iter().position(|c| c == child)?;
        children.remove(index);
        Some(index)
    }

    /// Replace `parent`'s child order. The new order must be a permutation
    /// of the current children.
    pub fn set_children_array(&mut self, parent: &NodeId, children: Vec<NodeId>) -> DomainResult<()> {
        let current = self.children(parent);
        let same_set = current.len() == children.len()
            && current.iter().sorted().eq(children.iter().sorted());
        if !same_set {
            return Err(DomainError::validation(
                parent.to_string(),
                "new child order must be a permutation of the current children",
            ));
        }
        self.state.children_map.insert(parent.clone(), children);
        Ok(())
    }

    /// Returns false for unknown nodes and for sizes that are not measurable.
    pub fn update_node_dimensions(&mut self, id: &NodeId, dimensions: Dimensions) -> bool {
        if !dimensions.is_measurable() {
            return false;
        }
        match self.state.node_data.get_mut(id) {
            Some(dims) => {
                *dims = dimensions;
                true
            }
            None => false,
        }
    }

    pub fn update_node_side(&mut self, id: &NodeId, side: Side) {
        if let Some(s) = self.state.node_sides.get_mut(id) {
            *s = side;
        }
    }

    pub fn update_node_level(&mut self, id: &NodeId, level: usize) {
        if let Some(l) = self.state.node_levels.get_mut(id) {
            *l = level;
        }
    }

    pub fn update_node_position(&mut self, id: &NodeId, x: f64, y: f64) {
        if let Some(p) = self.state.node_positions.get_mut(id) {
            p.x = x;
            p.y = y;
        }
    }

    /// Set `side` and `level` on `id` and re-derive both for its descendants.
    pub fn propagate_subtree(&mut self, id: &NodeId, side: Side, level: usize) {
        self.update_node_side(id, side);
        self.update_node_level(id, level);
        for child in self.children(id).to_vec() {
            self.propagate_subtree(&child, side, level + 1);
        }
    }

    /// Drop every record of `id`. Descendants are left to the caller.
    #[instrument(level = "trace", skip(self))]
    pub fn remove_node(&mut self, id: &NodeId) {
        self.state.node_positions.remove(id);
        self.state.children_map.remove(id);
        self.state.node_sides.remove(id);
        self.state.node_levels.remove(id);
        self.state.node_data.remove(id);
        if self.state.root.as_ref() == Some(id) {
            self.state.root = None;
        }
    }

    pub fn position(&self, id: &NodeId) -> Option<&Position> {
        self.state.node_positions.get(id)
    }

    pub fn children(&self, id: &NodeId) -> &[NodeId] {
        self.state
            .children_map
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn side(&self, id: &NodeId) -> Option<Side> {
        self.state.node_sides.get(id).copied()
    }

    pub fn level(&self, id: &NodeId) -> Option<usize> {
        self.state.node_levels.get(id).copied()
    }

    /// Current size of `id`, or the default size for unknown nodes.
    pub fn dimensions(&self, id: &NodeId) -> Dimensions {
        self.state
            .node_data
            .get(id)
            .copied()
            .unwrap_or(self.default_dimensions)
    }

    /// All descendants of `id` in pre-order, excluding `id`.
    pub fn descendants(&self, id: &NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<&NodeId> = self.children(id).iter().rev().collect();
        while let Some(current) = stack.pop() {
            out.push(current.clone());
            stack.extend(self.children(current).iter().rev());
        }
        out
    }

    /// Positions of all nodes in pre-order from the root.
    pub fn positions(&self) -> Vec<&Position> {
        let Some(root) = &self.state.root else {
            return Vec::new();
        };
        std::iter::once(root.clone())
            .chain(self.descendants(root))
            .filter_map(|id| self.state.node_positions.get(&id))
            .collect()
    }

    /// Pairs of nodes whose rendered rectangles intersect.
    pub fn find_overlaps(&self) -> Vec<(NodeId, NodeId)> {
        self.positions()
            .into_iter()
            .map(|p| (&p.id, Rect::from_center(p.x, p.y, self.dimensions(&p.id))))
            .tuple_combinations()
            .filter(|((_, a), (_, b))| a.intersects(b))
            .map(|((a, _), (b, _))| (a.clone(), b.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positioner() -> HierarchicalPositioner {
        HierarchicalPositioner::new(LayoutParams::default(), Dimensions::new(100.0, 40.0))
    }

    #[test]
    fn root_is_pinned_to_anchor() {
        let mut p = positioner();
        let pos = p
            .calculate_node_position(&"r".into(), None, None, 10.0, 20.0)
            .unwrap();
        assert_eq!((pos.x, pos.y, pos.level, pos.side), (10.0, 20.0, 0, Side::Right));
    }

    #[test]
    fn second_root_is_rejected() {
        let mut p = positioner();
        p.calculate_node_position(&"r".into(), None, None, 0.0, 0.0).unwrap();
        let err = p
            .calculate_node_position(&"q".into(), None, None, 0.0, 0.0)
            .unwrap_err();
        assert_eq!(err, DomainError::from(StructuralError::RootExists("r".into())));
    }

    #[test]
    fn child_before_root_is_a_structural_error() {
        let mut p = positioner();
        let err = p
            .calculate_node_position(&"a".into(), Some(&"r".into()), None, 0.0, 0.0)
            .unwrap_err();
        assert_eq!(err, DomainError::from(StructuralError::NoRoot));
    }

    #[test]
    fn grandchildren_inherit_side() {
        let mut p = positioner();
        p.calculate_node_position(&"r".into(), None, None, 0.0, 0.0).unwrap();
        let a = p
            .calculate_node_position(&"a".into(), Some(&"r".into()), Some(Side::Left), 0.0, 0.0)
            .unwrap();
        p.add_child_at_end(&"r".into(), &"a".into());
        let b = p
            .calculate_node_position(&"b".into(), Some(&"a".into()), Some(Side::Right), 0.0, 0.0)
            .unwrap();
        assert_eq!(a.side, Side::Left);
        assert_eq!(b.side, Side::Left);
        assert_eq!(b.level, 2);
        assert!(a.x < 0.0);
    }

    #[test]
    fn add_child_at_end_does_not_duplicate() {
        let mut p = positioner();
        p.add_child_at_end(&"r".into(), &"a".into());
        p.add_child_at_end(&"r".into(), &"b".into());
        p.add_child_at_end(&"r".into(), &"a".into());
        let ids: Vec<&str> = p.children(&"r".into()).iter().map(|c| c.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn set_children_array_rejects_foreign_ids() {
        let mut p = positioner();
        p.add_child_at_end(&"r".into(), &"a".into());
        p.add_child_at_end(&"r".into(), &"b".into());
        assert!(p
            .set_children_array(&"r".into(), vec!["a".into(), "x".into()])
            .is_err());
        p.set_children_array(&"r".into(), vec!["b".into(), "a".into()])
            .unwrap();
        assert_eq!(p.children(&"r".into())[0].as_str(), "b");
    }

    #[test]
    fn unmeasurable_dimensions_are_not_stored() {
        let mut p = positioner();
        p.calculate_node_position(&"r".into(), None, None, 0.0, 0.0).unwrap();
        assert!(!p.update_node_dimensions(&"r".into(), Dimensions::new(0.0, 300.0)));
        assert!(!p.update_node_dimensions(&"r".into(), Dimensions::new(f64::NAN, 10.0)));
        assert!(p.update_node_dimensions(&"r".into(), Dimensions::new(1.0, 300.0)));
        assert_eq!(p.dimensions(&"r".into()), Dimensions::new(1.0, 300.0));
    }
}
