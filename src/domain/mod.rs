//! Domain layer: tree geometry and layout state
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod calculator;
pub mod entities;
pub mod error;
pub mod outline;
pub mod positioner;

pub use arena::{NodeData, TreeArena, TreeNode, DEFAULT_KIND};
pub use calculator::{
    LayoutParams, LayoutResult, SizedNode, StackingMode, SubtreeLayout, TreeLayoutCalculator,
};
pub use entities::*;
pub use error::{DomainError, DomainResult, StructuralError};
pub use outline::{Outline, OutlineBounds, Segment};
pub use positioner::{HierarchicalPositioner, LayoutState};
