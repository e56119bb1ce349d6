//! Frame buffer registry: stream id → out-of-order-filled frame slots.
//!
//! Each announcement creates a fresh `StreamBuffer` with the declared number
//! of empty slots. Slots are filled as decodes finish, in whatever order
//! frames arrive, and may stay empty forever. A re-announcement for the same
//! id swaps in a new buffer; targets still holding the old `Arc` keep
//! cycling it untouched until they stop on their own (buffers are fill-only,
//! never truncated or reallocated).
//!
//! Frames for superseded or unknown ids, and out-of-range indices, are
//! silently counted and dropped: the producer pushes blindly and nothing is
//! ever retried.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use log::debug;

use crate::entities::frame::PreviewFrame;

/// Fixed-length slot sequence for one stream.
#[derive(Debug)]
pub struct StreamBuffer {
    slots: Vec<Mutex<Option<PreviewFrame>>>,
}

impl StreamBuffer {
    fn new(frame_count: usize) -> Self {
        Self {
            slots: (0..frame_count).map(|_| Mutex::new(None)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Fill one slot. False when the index is out of range.
    pub fn put(&self, index: usize, frame: PreviewFrame) -> bool {
        match self.slots.get(index) {
            Some(slot) => {
                *slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(frame);
                true
            }
            None => false,
        }
    }

    /// Possibly-empty slot contents.
    pub fn get(&self, index: usize) -> Option<PreviewFrame> {
        self.slots
            .get(index)?
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of slots already holding a frame.
    pub fn filled(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.lock().unwrap_or_else(|e| e.into_inner()).is_some())
            .count()
    }
}

/// Registry of live stream buffers, insertion-ordered by announcement.
#[derive(Debug, Default)]
pub struct FrameRegistry {
    streams: Mutex<IndexMap<String, Arc<StreamBuffer>>>,
    /// Frames dropped because their stream was unknown/superseded or the
    /// index was out of range.
    ignored: AtomicU64,
}

impl FrameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or replace) the buffer for a stream. The returned `Arc` is
    /// shared between the decoder and every playback target of the stream.
    pub fn start_stream(&self, id: &str, frame_count: usize) -> Arc<StreamBuffer> {
        let buffer = Arc::new(StreamBuffer::new(frame_count));
        let prior = self
            .streams
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.to_string(), Arc::clone(&buffer));
        if prior.is_some() {
            debug!("Stream '{}' superseded ({} slots)", id, frame_count);
        }
        buffer
    }

    /// Write a decoded frame into its slot. Unknown ids and out-of-range
    /// indices are no-ops.
    pub fn put_frame(&self, id: &str, index: usize, frame: PreviewFrame) {
        let buffer = {
            let streams = self.streams.lock().unwrap_or_else(|e| e.into_inner());
            streams.get(id).cloned()
        };
        let stored = match buffer {
            Some(buffer) => buffer.put(index, frame),
            None => false,
        };
        if !stored {
            self.ignored.fetch_add(1, Ordering::Relaxed);
            debug!("Dropped frame {} for stale/unknown stream '{}'", index, id);
        }
    }

    pub fn get_frame(&self, id: &str, index: usize) -> Option<PreviewFrame> {
        self.buffer(id)?.get(index)
    }

    /// Current buffer for a stream id, if announced.
    pub fn buffer(&self, id: &str) -> Option<Arc<StreamBuffer>> {
        self.streams
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    pub fn stream_count(&self) -> usize {
        self.streams.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Frames dropped as stale/out-of-range so far.
    pub fn ignored_frames(&self) -> u64 {
        self.ignored.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.streams
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_has_declared_slots_all_empty() {
        let reg = FrameRegistry::new();
        let buffer = reg.start_stream("n1", 4);
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.filled(), 0);
        for i in 0..4 {
            assert!(buffer.get(i).is_none());
        }
    }

    #[test]
    fn put_fills_only_in_range_slots() {
        let reg = FrameRegistry::new();
        reg.start_stream("n1", 3);
        reg.put_frame("n1", 1, PreviewFrame::solid(2, 2, 1));
        reg.put_frame("n1", 3, PreviewFrame::solid(2, 2, 2)); // out of range

        assert!(reg.get_frame("n1", 0).is_none());
        assert!(reg.get_frame("n1", 1).is_some());
        assert!(reg.get_frame("n1", 3).is_none());
        assert_eq!(reg.ignored_frames(), 1);
    }

    #[test]
    fn unknown_stream_is_silent_noop() {
        let reg = FrameRegistry::new();
        reg.put_frame("ghost", 0, PreviewFrame::solid(2, 2, 1));
        assert_eq!(reg.stream_count(), 0);
        assert_eq!(reg.ignored_frames(), 1);
    }

    #[test]
    fn out_of_order_fill_matches_in_order() {
        let reg = FrameRegistry::new();
        let buffer = reg.start_stream("n1", 3);
        for &i in &[2usize, 0, 1] {
            reg.put_frame("n1", i, PreviewFrame::solid(2, 2, i as u8));
        }
        for i in 0..3 {
            let frame = buffer.get(i).unwrap();
            assert_eq!(frame.raw()[0], i as u8);
        }
    }

    #[test]
    fn reannounce_replaces_but_old_buffer_survives() {
        let reg = FrameRegistry::new();
        let old = reg.start_stream("n1", 2);
        reg.put_frame("n1", 0, PreviewFrame::solid(2, 2, 1));

        let new = reg.start_stream("n1", 2);
        assert!(!Arc::ptr_eq(&old, &new));

        // Late frame lands in the new buffer only; the captured old buffer
        // keeps its contents for draining targets.
        reg.put_frame("n1", 1, PreviewFrame::solid(2, 2, 9));
        assert!(old.get(0).is_some());
        assert!(old.get(1).is_none());
        assert!(new.get(0).is_none());
        assert_eq!(new.get(1).unwrap().raw()[0], 9);
        assert_eq!(reg.stream_count(), 1);
    }

    #[test]
    fn zero_length_stream_is_legal() {
        let reg = FrameRegistry::new();
        let buffer = reg.start_stream("n1", 0);
        assert!(buffer.is_empty());
        reg.put_frame("n1", 0, PreviewFrame::solid(2, 2, 1));
        assert_eq!(reg.ignored_frames(), 1);
    }
}
