//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::entities::NodeId;

/// Structural violations: the operation needs tree state that is not there.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("no root node exists yet")]
    NoRoot,

    #[error("root node already exists: {0}")]
    RootExists(NodeId),

    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("the root node cannot be removed: {0}")]
    RootRemoval(NodeId),

    #[error("node is not a child of the root: {0}")]
    NotRootChild(NodeId),
}

/// Domain errors represent tree invariant violations.
/// Every check that can produce one runs before any state is written.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error("cannot move {node} under {target}: target is the node itself or one of its descendants")]
    Cycle { node: NodeId, target: NodeId },

    #[error("invalid size for {id}: {width}x{height} (width and height must be positive)")]
    InvalidSize { id: NodeId, width: f64, height: f64 },

    #[error("invalid tree data at {path}: {message}")]
    Validation { path: String, message: String },
}

impl DomainError {
    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
