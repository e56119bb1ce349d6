//! Graph nodes as the preview subsystem sees them.
//!
//! The host editor owns far richer node state; this model keeps only the
//! contact points the player reads or writes: the segment id, the optional
//! nested subgraph, the progress indicator the producer drives, the node
//! body width, and the preview widget slot.

use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::config::DEFAULT_NODE_WIDTH;
use crate::entities::frame::PreviewFrame;
use crate::widgets::preview::{InputSink, PreviewWidget};

use super::graph::GraphContext;

/// One node in a graph context.
pub struct GraphNode {
    id: String,
    root_uuid: Uuid,
    subgraph: Option<Arc<GraphContext>>,
    width: Mutex<f32>,
    progress: Mutex<Option<f32>>,
    widget: Mutex<Option<PreviewWidget>>,
}

impl GraphNode {
    pub(super) fn new(id: &str, root_uuid: Uuid, subgraph: Option<Arc<GraphContext>>) -> Self {
        Self {
            id: id.to_string(),
            root_uuid,
            subgraph,
            width: Mutex::new(DEFAULT_NODE_WIDTH),
            progress: Mutex::new(None),
            widget: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Uuid of the outermost graph this node lives under. Compared against
    /// the canvas graph to detect navigation away from the node.
    pub fn root_uuid(&self) -> Uuid {
        self.root_uuid
    }

    /// Nested subgraph context, if this node embeds one.
    pub fn subgraph(&self) -> Option<Arc<GraphContext>> {
        self.subgraph.clone()
    }

    // --- progress indicator ---

    /// Progress is set by the host while the producer executes and cleared on
    /// completion. `None` tells a playback target its stream is over.
    pub fn progress(&self) -> Option<f32> {
        *self.progress.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_progress(&self, value: f32) {
        *self.progress.lock().unwrap_or_else(|e| e.into_inner()) = Some(value);
    }

    pub fn clear_progress(&self) {
        *self.progress.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    // --- layout ---

    pub fn width(&self) -> f32 {
        *self.width.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_width(&self, width: f32) {
        *self.width.lock().unwrap_or_else(|e| e.into_inner()) = width;
    }

    // --- preview widget ---

    /// Draw a frame into this node's preview widget, creating the widget on
    /// first use with input wired to `input`.
    pub fn draw_preview(&self, frame: &PreviewFrame, input: &Arc<dyn InputSink>) {
        let width = self.width();
        let mut guard = self.widget.lock().unwrap_or_else(|e| e.into_inner());
        let widget = guard.get_or_insert_with(|| PreviewWidget::new(Arc::clone(input)));
        widget.draw(frame, width);
    }

    pub fn has_preview(&self) -> bool {
        self.widget
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Drop the preview widget and its surface. Returns whether one existed.
    pub fn remove_preview(&self) -> bool {
        self.widget
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .is_some()
    }

    /// Run `f` against the preview widget, if any. Used by the host layout
    /// pass and by tests inspecting drawn pixels.
    pub fn with_preview<R>(&self, f: impl FnOnce(&PreviewWidget) -> R) -> Option<R> {
        self.widget
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(f)
    }
}

impl std::fmt::Debug for GraphNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphNode")
            .field("id", &self.id)
            .field("subgraph", &self.subgraph.is_some())
            .field("progress", &self.progress())
            .field("has_preview", &self.has_preview())
            .finish()
    }
}
