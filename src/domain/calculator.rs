//! Recursive subtree layout for the two branches of a mind map.
//!
//! Every subtree is laid out relative to its root's center. Children share a
//! single column offset from their parent and are stacked vertically in
//! sibling order; the resulting [`Outline`] travels upward so the
//! grandparent can stack whole subtrees without overlap.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::entities::{Dimensions, NodeId, Side};
use crate::domain::outline::Outline;

/// How sibling subtrees are stacked within a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StackingMode {
    /// Each sibling is placed against the merged contour of all siblings
    /// above it.
    #[default]
    Contour,
    /// Each sibling is placed below the bounding box of the previous one.
    BoundingBox,
}

impl fmt::Display for StackingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackingMode::Contour => f.write_str("contour"),
            StackingMode::BoundingBox => f.write_str("bounding-box"),
        }
    }
}

impl FromStr for StackingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contour" => Ok(StackingMode::Contour),
            "bounding-box" => Ok(StackingMode::BoundingBox),
            other => Err(format!(
                "unknown stacking mode {:?} (expected contour or bounding-box)",
                other
            )),
        }
    }
}

/// Spacing parameters of a layout pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    /// Horizontal gap between a parent's far edge and its widest child.
    pub horizontal_spacing: f64,
    /// Minimum vertical clearance between sibling subtrees.
    pub vertical_margin: f64,
    pub stacking: StackingMode,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            horizontal_spacing: 80.0,
            vertical_margin: 20.0,
            stacking: StackingMode::Contour,
        }
    }
}

/// Input to a layout pass: a node with its size and ordered children.
#[derive(Debug, Clone, PartialEq)]
pub struct SizedNode {
    pub id: NodeId,
    pub dimensions: Dimensions,
    pub children: Vec<SizedNode>,
}

impl SizedNode {
    pub fn leaf(id: impl Into<NodeId>, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            dimensions: Dimensions::new(width, height),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<SizedNode>) -> Self {
        self.children = children;
        self
    }
}

/// Relative layout of one subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtreeLayout {
    pub id: NodeId,
    pub width: f64,
    pub height: f64,
    /// Combined contour of the node and all of its descendants.
    pub outline: Outline,
    /// Center offset from the parent's center (or the branch anchor).
    pub delta_x: f64,
    pub delta_y: f64,
    pub children: Vec<SubtreeLayout>,
}

/// Absolute placement of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutResult {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Default)]
pub struct TreeLayoutCalculator {
    params: LayoutParams,
}

impl TreeLayoutCalculator {
    pub fn new(params: LayoutParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &LayoutParams {
        &self.params
    }

    /// Lay out `node` and its descendants relative to `node`'s center.
    pub fn calculate_tree(&self, node: &SizedNode, margin: f64, side: Side) -> SubtreeLayout {
        let Dimensions { width, height } = node.dimensions;
        if node.children.is_empty() {
            return SubtreeLayout {
                id: node.id.clone(),
                width,
                height,
                outline: Outline::for_rectangle(width, height),
                delta_x: 0.0,
                delta_y: 0.0,
                children: Vec::new(),
            };
        }

        let children: Vec<SubtreeLayout> = node
            .children
            .iter()
            .map(|child| self.calculate_tree(child, margin, side))
            .collect();
        let (children, outline) = self.append_subtrees(node.dimensions, children, margin, side);

        SubtreeLayout {
            id: node.id.clone(),
            width,
            height,
            outline,
            delta_x: 0.0,
            delta_y: 0.0,
            children,
        }
    }

    /// Assign each child subtree its offset from a parent of size `parent`
    /// and return the children together with the parent's combined outline.
    pub fn append_subtrees(
        &self,
        parent: Dimensions,
        mut children: Vec<SubtreeLayout>,
        margin: f64,
        side: Side,
    ) -> (Vec<SubtreeLayout>, Outline) {
        let mut outline = Outline::for_rectangle(parent.width, parent.height);
        if children.is_empty() {
            return (children, outline);
        }

        let max_half_width = children
            .iter()
            .map(|c| c.width / 2.0)
            .fold(0.0, f64::max);

        // Align every child outline on the shared column origin.
        let column: Vec<Outline> = children
            .iter()
            .map(|c| {
                let mut o = c.outline.clone();
                o.indent(max_half_width - c.width / 2.0, 0.0);
                o
            })
            .collect();

        let (offsets, mut block) = match self.params.stacking {
            StackingMode::Contour => stack_contours(column, margin),
            StackingMode::BoundingBox => stack_bounding_boxes(column, margin),
        };

        let bounds = block.bounds();
        let center_shift = -(bounds.min_y + bounds.max_y) / 2.0;
        block.translate(0.0, center_shift);

        let delta_x = side.sign() * (parent.width / 2.0 + self.params.horizontal_spacing + max_half_width);
        for (child, dy) in children.iter_mut().zip(offsets) {
            child.delta_x = delta_x;
            child.delta_y = dy + center_shift;
        }

        outline.combine_horizontally(&Outline::gap(self.params.horizontal_spacing));
        outline.combine_horizontally(&block);
        (children, outline)
    }

    /// Lay out both branches around `root` and resolve absolute positions.
    ///
    /// Each branch hangs off a zero-size container sitting on the root's
    /// left or right edge. The root itself is always placed at the anchor.
    #[instrument(level = "debug", skip(self, left, right, root), fields(root = %root.id))]
    pub fn calculate_layout(
        &self,
        left: &[SizedNode],
        right: &[SizedNode],
        root: &SizedNode,
        root_x: f64,
        root_y: f64,
    ) -> Vec<LayoutResult> {
        let mut results = Vec::new();
        results.push(LayoutResult {
            id: root.id.clone(),
            x: root_x,
            y: root_y,
            width: root.dimensions.width,
            height: root.dimensions.height,
        });

        for (side, forest) in [(Side::Left, left), (Side::Right, right)] {
            if forest.is_empty() {
                continue;
            }
            let margin = self.params.vertical_margin;
            let subtrees: Vec<SubtreeLayout> = forest
                .iter()
                .map(|child| self.calculate_tree(child, margin, side))
                .collect();
            let (subtrees, _) =
                self.append_subtrees(Dimensions::new(0.0, 0.0), subtrees, margin, side);

            let anchor_x = root_x + side.sign() * root.dimensions.width / 2.0;
            for subtree in &subtrees {
                flatten(subtree, anchor_x, root_y, &mut results);
            }
        }

        debug!("calculate_layout: {} nodes placed", results.len());
        results
    }
}

/// Stack outlines top to bottom, each against the envelope of those above.
fn stack_contours(column: Vec<Outline>, margin: f64) -> (Vec<f64>, Outline) {
    let mut offsets = Vec::with_capacity(column.len());
    let mut block: Option<Outline> = None;

    for mut outline in column {
        match block.as_mut() {
            None => {
                offsets.push(0.0);
                block = Some(outline);
            }
            Some(envelope) => {
                let shift = outline.stack_below(envelope, margin);
                offsets.push(shift);
                *envelope = envelope.merge(&outline);
            }
        }
    }
    (offsets, block.unwrap_or_default())
}

/// Stack outlines by their vertical bounds alone.
fn stack_bounding_boxes(column: Vec<Outline>, margin: f64) -> (Vec<f64>, Outline) {
    let mut offsets = Vec::with_capacity(column.len());
    let mut block: Option<Outline> = None;
    let mut cursor = 0.0;

    for mut outline in column {
        let bounds = outline.bounds();
        let shift = match block {
            None => 0.0,
            Some(_) => cursor + margin - bounds.min_y,
        };
        cursor = shift + bounds.max_y;
        outline.translate(0.0, shift);
        offsets.push(shift);
        block = Some(match block {
            None => outline,
            Some(envelope) => envelope.merge(&outline),
        });
    }
    (offsets, block.unwrap_or_default())
}

fn flatten(layout: &SubtreeLayout, parent_x: f64, parent_y: f64, out: &mut Vec<LayoutResult>) {
    let x = parent_x + layout.delta_x;
    let y = parent_y + layout.delta_y;
    out.push(LayoutResult {
        id: layout.id.clone(),
        x,
        y,
        width: layout.width,
        height: layout.height,
    });
    for child in &layout.children {
        flatten(child, x, y, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calculator() -> TreeLayoutCalculator {
        TreeLayoutCalculator::new(LayoutParams {
            horizontal_spacing: 50.0,
            vertical_margin: 10.0,
            stacking: StackingMode::Contour,
        })
    }

    #[test]
    fn leaf_layout_is_a_plain_rectangle() {
        let layout = calculator().calculate_tree(&SizedNode::leaf("a", 100.0, 40.0), 10.0, Side::Right);
        assert_eq!(layout.delta_x, 0.0);
        assert!(layout.children.is_empty());
        assert_eq!(layout.outline, Outline::for_rectangle(100.0, 40.0));
    }

    #[test]
    fn children_share_column_and_are_centered() {
        let node = SizedNode::leaf("p", 100.0, 40.0).with_children(vec![
            SizedNode::leaf("a", 60.0, 20.0),
            SizedNode::leaf("b", 80.0, 20.0),
        ]);
        let layout = calculator().calculate_tree(&node, 10.0, Side::Right);

        let a = &layout.children[0];
        let b = &layout.children[1];
        assert_eq!(a.delta_x, 50.0 + 50.0 + 40.0);
        assert_eq!(b.delta_x, a.delta_x);
        assert_eq!(b.delta_y - a.delta_y, 30.0);
        assert_eq!(a.delta_y, -15.0);
        assert_eq!(b.delta_y, 15.0);
    }

    #[test]
    fn left_side_mirrors_horizontal_offset() {
        let node = SizedNode::leaf("p", 100.0, 40.0).with_children(vec![SizedNode::leaf("a", 60.0, 20.0)]);
        let right = calculator().calculate_tree(&node, 10.0, Side::Right);
        let left = calculator().calculate_tree(&node, 10.0, Side::Left);
        assert_eq!(left.children[0].delta_x, -right.children[0].delta_x);
        assert_eq!(left.outline, right.outline);
    }

    #[test]
    fn contour_stacking_tucks_subtrees_closer_than_bounding_boxes() {
        // "a" has a tall child far out; "b" is a lone leaf that can slide
        // under a's narrow node band.
        let tall = SizedNode::leaf("a", 40.0, 20.0)
            .with_children(vec![SizedNode::leaf("a1", 40.0, 200.0)]);
        let node = SizedNode::leaf("p", 40.0, 20.0)
            .with_children(vec![tall, SizedNode::leaf("b", 40.0, 20.0)]);

        let contour = calculator().calculate_tree(&node, 10.0, Side::Right);
        let boxes = TreeLayoutCalculator::new(LayoutParams {
            stacking: StackingMode::BoundingBox,
            ..*calculator().params()
        })
        .calculate_tree(&node, 10.0, Side::Right);

        let gap = |l: &SubtreeLayout| l.children[1].delta_y - l.children[0].delta_y;
        assert_eq!(gap(&contour), 30.0);
        assert_eq!(gap(&boxes), 100.0 + 10.0 + 10.0);
    }

    #[test]
    fn root_stays_at_anchor_and_branches_split() {
        let root = SizedNode::leaf("r", 100.0, 40.0);
        let results = calculator().calculate_layout(
            &[SizedNode::leaf("l", 60.0, 20.0)],
            &[SizedNode::leaf("x", 60.0, 20.0)],
            &root,
            500.0,
            300.0,
        );
        let find = |id: &str| results.iter().find(|r| r.id.as_str() == id).unwrap();
        assert_eq!((find("r").x, find("r").y), (500.0, 300.0));
        assert_eq!(find("x").x, 500.0 + 50.0 + 50.0 + 30.0);
        assert_eq!(find("l").x, 500.0 - 50.0 - 50.0 - 30.0);
        assert_eq!(find("x").y, 300.0);
    }

    #[test]
    fn stacking_mode_parses_from_kebab_case() {
        assert_eq!("bounding-box".parse::<StackingMode>().unwrap(), StackingMode::BoundingBox);
        assert_eq!(StackingMode::Contour.to_string(), "contour");
    }
}
