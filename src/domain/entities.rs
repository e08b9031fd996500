//! Domain entities: core data structures

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, unique node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Branch of the mind map a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    #[default]
    Right,
}

impl Side {
    /// Horizontal direction of growth: -1 for left, +1 for right.
    pub fn sign(self) -> f64 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Side::Left),
            "right" => Ok(Side::Right),
            other => Err(format!("expected \"left\" or \"right\", got {:?}", other)),
        }
    }
}

/// Rendered size of a node, supplied by the rendering collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Both extents finite and strictly positive. A zero-width node has an
    /// empty outline and would not take part in contour stacking.
    pub fn is_measurable(&self) -> bool {
        [self.width, self.height]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
    }
}

/// Resolved center position of a node. Derived from tree and dimensions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    pub level: usize,
    pub side: Side,
    /// Index among the parent's ordered children; 0 for the root.
    pub stack_index: usize,
}

/// Axis-aligned rectangle centered on a node position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub fn from_center(x: f64, y: f64, dims: Dimensions) -> Self {
        Self {
            x0: x - dims.width / 2.0,
            y0: y - dims.height / 2.0,
            x1: x + dims.width / 2.0,
            y1: y + dims.height / 2.0,
        }
    }

    /// Strict intersection; touching edges do not count.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_round_trips_through_str() {
        assert_eq!("left".parse::<Side>().unwrap(), Side::Left);
        assert_eq!(Side::Right.to_string(), "right");
        assert!("up".parse::<Side>().is_err());
    }

    #[test]
    fn touching_rects_do_not_intersect() {
        let a = Rect::from_center(0.0, 0.0, Dimensions::new(10.0, 10.0));
        let b = Rect::from_center(10.0, 0.0, Dimensions::new(10.0, 10.0));
        let c = Rect::from_center(9.0, 9.0, Dimensions::new(10.0, 10.0));
        assert!(!a.intersects(&b));
        assert!(a.intersects(&c));
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(NodeId::generate(), NodeId::generate());
    }
}
