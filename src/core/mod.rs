//! Core engine modules - bus, wire, registry, scheduler, player, workers
//!
//! These modules form the preview playback engine, independent of any host
//! GUI toolkit.

pub mod event_bus;
pub mod player;
pub mod registry;
pub mod scheduler;
pub mod wire;
pub mod workers;

// Re-exports for convenience
pub use event_bus::{EventBus, Handled, Subscription};
pub use player::PreviewPlayer;
pub use registry::{FrameRegistry, StreamBuffer};
pub use scheduler::PlaybackScheduler;
pub use workers::DecodePool;
