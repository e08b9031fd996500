//! Application layer: map editing, export and persistence
//!
//! This layer orchestrates domain logic and depends on I/O boundary traits.

pub mod display;
pub mod editor;
pub mod error;
pub mod error_ext;
pub mod export;
pub mod render;
pub mod services;

pub use editor::MindMap;
pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::IoResultExt;
pub use export::{validate_tree, ExportNode};
pub use render::{Edge, LayoutUpdate, MapEvent, PendingEvents, RenderTarget};
