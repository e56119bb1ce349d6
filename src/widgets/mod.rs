//! Widget layer: the drawing surface previews render into.

pub mod preview;

pub use preview::{DrawSurface, InputSink, NullInput, PreviewWidget};
