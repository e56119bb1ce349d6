//! Workspace and graph contexts.
//!
//! `Workspace` tracks the graph currently shown on the editor canvas and
//! resolves composite node paths against it. Resolution happens on every use
//! and is never cached: undo/redo, deletion and copy/paste mutate the graph
//! continuously, so a path that resolved one tick ago may be gone the next.

use std::sync::{Arc, Mutex, RwLock};

use indexmap::IndexMap;
use log::debug;
use uuid::Uuid;

use super::node::GraphNode;
use super::path::StreamPath;

/// Path resolution failure. Deliberately explicit: a missing segment is a
/// definite outcome, not a silently propagated absence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    MissingSegment { segment: String, path: String },
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::MissingSegment { segment, path } => {
                write!(f, "segment '{}' not found resolving '{}'", segment, path)
            }
        }
    }
}

impl std::error::Error for ResolveError {}

/// One graph scope: the root graph or a subgraph nested inside a node.
pub struct GraphContext {
    uuid: Uuid,
    root_uuid: Uuid,
    nodes: RwLock<IndexMap<String, Arc<GraphNode>>>,
}

impl GraphContext {
    /// Create a fresh root graph.
    pub fn new_root() -> Arc<Self> {
        let uuid = Uuid::new_v4();
        Arc::new(Self {
            uuid,
            root_uuid: uuid,
            nodes: RwLock::new(IndexMap::new()),
        })
    }

    fn new_nested(root_uuid: Uuid) -> Arc<Self> {
        Arc::new(Self {
            uuid: Uuid::new_v4(),
            root_uuid,
            nodes: RwLock::new(IndexMap::new()),
        })
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Uuid of the outermost root this context belongs to.
    pub fn root_uuid(&self) -> Uuid {
        self.root_uuid
    }

    /// Add a plain node, replacing any existing node with the same id.
    pub fn add_node(&self, id: &str) -> Arc<GraphNode> {
        let node = Arc::new(GraphNode::new(id, self.root_uuid, None));
        self.nodes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.to_string(), Arc::clone(&node));
        node
    }

    /// Add a node embedding a nested subgraph; returns the nested context.
    pub fn add_subgraph(&self, id: &str) -> Arc<GraphContext> {
        let nested = GraphContext::new_nested(self.root_uuid);
        let node = Arc::new(GraphNode::new(id, self.root_uuid, Some(Arc::clone(&nested))));
        self.nodes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.to_string(), node);
        nested
    }

    pub fn node(&self, id: &str) -> Option<Arc<GraphNode>> {
        self.nodes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    pub fn remove_node(&self, id: &str) -> bool {
        let removed = self
            .nodes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .shift_remove(id)
            .is_some();
        if removed {
            debug!("Node '{}' removed from graph {}", id, self.uuid);
        }
        removed
    }

    pub fn node_count(&self) -> usize {
        self.nodes.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl std::fmt::Debug for GraphContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphContext")
            .field("uuid", &self.uuid)
            .field("root_uuid", &self.root_uuid)
            .field("nodes", &self.node_count())
            .finish()
    }
}

/// The editor workspace: which graph the canvas currently shows.
pub struct Workspace {
    current: Mutex<Arc<GraphContext>>,
}

impl Workspace {
    /// Workspace with a fresh empty root graph on the canvas.
    pub fn new() -> Self {
        Self {
            current: Mutex::new(GraphContext::new_root()),
        }
    }

    /// Graph currently on the canvas; resolution starts here.
    pub fn current(&self) -> Arc<GraphContext> {
        Arc::clone(&self.current.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Navigate the canvas to another graph (subgraph or different root).
    pub fn set_current(&self, graph: Arc<GraphContext>) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = graph;
    }

    /// Resolve a composite path by descending nested subgraph contexts,
    /// starting from the canvas graph. Returns the deepest node.
    pub fn resolve(&self, path: &StreamPath) -> Result<Arc<GraphNode>, ResolveError> {
        let segments = path.segments();
        let mut ctx = self.current();
        let mut found: Option<Arc<GraphNode>> = None;

        for (i, segment) in segments.iter().enumerate() {
            let node = ctx.node(segment).ok_or_else(|| ResolveError::MissingSegment {
                segment: segment.clone(),
                path: path.to_string(),
            })?;
            if i + 1 < segments.len() {
                // Descent is only required when another segment follows.
                ctx = node.subgraph().ok_or_else(|| ResolveError::MissingSegment {
                    segment: segments[i + 1].clone(),
                    path: path.to_string(),
                })?;
            }
            found = Some(node);
        }

        found.ok_or_else(|| ResolveError::MissingSegment {
            segment: String::new(),
            path: path.to_string(),
        })
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}
