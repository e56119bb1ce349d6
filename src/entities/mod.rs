//! Entities module - the data model the player operates on.
//!
//! Host-side state (workspace, graphs, nodes) plus the stream-side types
//! (paths, frames) they are keyed and fed by.

pub mod frame;
pub mod graph;
pub mod node;
pub mod path;

pub use frame::{FrameError, PreviewFrame};
pub use graph::{GraphContext, ResolveError, Workspace};
pub use node::GraphNode;
pub use path::StreamPath;
