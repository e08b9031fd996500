//! Boundary with the rendering collaborator
//!
//! After every layout pass the renderer receives the target position of each
//! node plus every parent/child edge to redraw. Anything the renderer wants to
//! change in response (typically a new measured size) goes into
//! [`PendingEvents`] and is applied by the editor once the notification has
//! returned, never while layout state is being walked.

use std::collections::VecDeque;

use crate::domain::{NodeId, Position};

/// A parent/child pair whose connector must be redrawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub parent: NodeId,
    pub child: NodeId,
}

/// Result of one layout pass as seen by the renderer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutUpdate {
    /// Target center for every node, root first, in pre-order.
    pub positions: Vec<Position>,
    pub edges: Vec<Edge>,
}

impl LayoutUpdate {
    pub fn position(&self, id: &NodeId) -> Option<&Position> {
        self.positions.iter().find(|p| &p.id == id)
    }
}

/// Changes reported back by the renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// The node's content was re-measured.
    Resized { id: NodeId, width: f64, height: f64 },
    TextChanged { id: NodeId, text: String },
    SelectionChanged { id: NodeId, selected: bool },
}

/// Queue of events deferred until the current notification completes.
#[derive(Debug, Default)]
pub struct PendingEvents {
    queue: VecDeque<MapEvent>,
}

impl PendingEvents {
    pub fn push(&mut self, event: MapEvent) {
        self.queue.push_back(event);
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Take all queued events in arrival order.
    pub fn take(&mut self) -> Vec<MapEvent> {
        self.queue.drain(..).collect()
    }
}

/// Receives layout results; implemented by the rendering collaborator.
pub trait RenderTarget {
    fn layout_changed(&mut self, update: &LayoutUpdate, pending: &mut PendingEvents);
}
