//! Preview widget and draw surface.
//!
//! Each playback target owns (at most) one `PreviewWidget` hanging off its
//! node. The widget carries an RGBA8 `DrawSurface` sized to the last drawn
//! frame, plus the aspect ratio the host layout uses to derive the widget
//! height from the node body width.
//!
//! Pointer and wheel input landing on the surface is captured and forwarded
//! to the host's own canvas input pipeline through [`InputSink`]; the widget
//! reports the event as consumed so the host's pan/zoom is not triggered a
//! second time by the surface's default handling.

use std::fmt;
use std::sync::Arc;

use log::trace;

use crate::config::{WIDGET_H_INSET, WIDGET_V_PAD};
use crate::entities::frame::PreviewFrame;

/// Pointer event classes the surface intercepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Up,
    Move,
    ContextMenu,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelEvent {
    pub dx: f32,
    pub dy: f32,
}

/// Host-side input pipeline. The editor routes forwarded events into its own
/// canvas handlers (drag, selection, zoom).
pub trait InputSink: Send + Sync {
    fn pointer(&self, ev: &PointerEvent);
    fn wheel(&self, ev: &WheelEvent);
}

/// Sink that swallows everything. Demo and test default.
pub struct NullInput;

impl InputSink for NullInput {
    fn pointer(&self, _ev: &PointerEvent) {}
    fn wheel(&self, _ev: &WheelEvent) {}
}

/// RGBA8 backing buffer for one preview widget.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawSurface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl DrawSurface {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA of one pixel, row-major. None when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let at = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels[at..at + 4].try_into().ok()
    }

    fn blit(&mut self, frame: &PreviewFrame) {
        // ensure_surface matched dimensions before handing the surface out.
        self.pixels.copy_from_slice(frame.raw());
    }
}

/// Animated preview widget attached to a node body.
pub struct PreviewWidget {
    surface: Option<DrawSurface>,
    aspect: Option<f32>,
    computed_height: Option<f32>,
    input: Arc<dyn InputSink>,
}

impl PreviewWidget {
    /// New widget with no surface yet: degenerate, hidden by layout.
    pub fn new(input: Arc<dyn InputSink>) -> Self {
        Self {
            surface: None,
            aspect: None,
            computed_height: None,
            input,
        }
    }

    /// Create the surface on first use, or resize it when the requested
    /// dimensions differ from the current ones. Recomputes the aspect ratio
    /// and the layout height on both transitions.
    pub fn ensure_surface(&mut self, width: u32, height: u32, node_width: f32) -> &mut DrawSurface {
        let needs_rebuild = self
            .surface
            .as_ref()
            .map(|s| s.width != width || s.height != height)
            .unwrap_or(true);

        if needs_rebuild {
            trace!("Preview surface sized to {}x{}", width, height);
            self.surface = Some(DrawSurface::new(width, height));
            self.aspect = (height > 0).then(|| width as f32 / height as f32);
            self.computed_height = self.desired_size(node_width).map(|(_, h)| h);
        }

        // Surface was just ensured above.
        self.surface
            .get_or_insert_with(|| DrawSurface::new(width, height))
    }

    /// Blit a frame, growing/shrinking the surface first if its dimensions
    /// changed mid-stream.
    pub fn draw(&mut self, frame: &PreviewFrame, node_width: f32) {
        self.ensure_surface(frame.width(), frame.height(), node_width)
            .blit(frame);
    }

    /// Widget size for the host layout pass: height follows from the aspect
    /// ratio and the node body width. None while no frame has been drawn:
    /// the widget takes no space.
    pub fn desired_size(&self, node_width: f32) -> Option<(f32, f32)> {
        let aspect = self.aspect?;
        let mut height = (node_width - WIDGET_H_INSET) / aspect + WIDGET_V_PAD;
        if !(height > 0.0) {
            height = 0.0;
        }
        Some((node_width, height))
    }

    pub fn surface(&self) -> Option<&DrawSurface> {
        self.surface.as_ref()
    }

    pub fn aspect(&self) -> Option<f32> {
        self.aspect
    }

    /// Height cached by the last layout recomputation.
    pub fn computed_height(&self) -> Option<f32> {
        self.computed_height
    }

    // --- input capture ---

    /// Forward a pointer event to the host pipeline. Always returns true:
    /// the surface consumes the event so default handling stays suppressed.
    pub fn handle_pointer(&self, ev: &PointerEvent) -> bool {
        self.input.pointer(ev);
        true
    }

    pub fn handle_wheel(&self, ev: &WheelEvent) -> bool {
        self.input.wheel(ev);
        true
    }
}

impl fmt::Debug for PreviewWidget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewWidget")
            .field(
                "surface",
                &self.surface.as_ref().map(|s| (s.width, s.height)),
            )
            .field("aspect", &self.aspect)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingSink {
        pointers: Mutex<Vec<PointerEvent>>,
        wheels: Mutex<Vec<WheelEvent>>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                pointers: Mutex::new(Vec::new()),
                wheels: Mutex::new(Vec::new()),
            })
        }
    }

    impl InputSink for RecordingSink {
        fn pointer(&self, ev: &PointerEvent) {
            self.pointers.lock().unwrap().push(*ev);
        }
        fn wheel(&self, ev: &WheelEvent) {
            self.wheels.lock().unwrap().push(*ev);
        }
    }

    #[test]
    fn fresh_widget_is_hidden() {
        let w = PreviewWidget::new(Arc::new(NullInput));
        assert!(w.surface().is_none());
        assert!(w.desired_size(140.0).is_none());
    }

    #[test]
    fn draw_creates_and_fills_surface() {
        let mut w = PreviewWidget::new(Arc::new(NullInput));
        w.draw(&PreviewFrame::solid(2, 2, 42), 140.0);
        let surface = w.surface().unwrap();
        assert_eq!((surface.width(), surface.height()), (2, 2));
        assert_eq!(surface.pixel(0, 0), Some([42, 0, 0, 255]));
    }

    #[test]
    fn resize_on_dimension_change() {
        let mut w = PreviewWidget::new(Arc::new(NullInput));
        w.draw(&PreviewFrame::solid(2, 2, 1), 140.0);
        w.draw(&PreviewFrame::solid(4, 2, 2), 140.0);
        let surface = w.surface().unwrap();
        assert_eq!((surface.width(), surface.height()), (4, 2));
        assert_eq!(w.aspect(), Some(2.0));
    }

    #[test]
    fn layout_height_from_aspect() {
        let mut w = PreviewWidget::new(Arc::new(NullInput));
        w.draw(&PreviewFrame::solid(4, 2, 1), 140.0);
        // (140 - 20) / 2 + 10
        let (width, height) = w.desired_size(140.0).unwrap();
        assert_eq!(width, 140.0);
        assert_eq!(height, 70.0);
        assert_eq!(w.computed_height(), Some(70.0));
    }

    #[test]
    fn degenerate_node_width_clamps_to_zero() {
        let mut w = PreviewWidget::new(Arc::new(NullInput));
        w.draw(&PreviewFrame::solid(4, 2, 1), 0.0);
        let (_, height) = w.desired_size(0.0).unwrap();
        assert_eq!(height, 0.0);
    }

    #[test]
    fn input_is_forwarded_and_consumed() {
        let sink = RecordingSink::new();
        let w = PreviewWidget::new(sink.clone());
        let ev = PointerEvent {
            kind: PointerKind::Down,
            x: 3.0,
            y: 4.0,
        };
        assert!(w.handle_pointer(&ev));
        assert!(w.handle_wheel(&WheelEvent { dx: 0.0, dy: -1.0 }));
        assert_eq!(sink.pointers.lock().unwrap().as_slice(), &[ev]);
        assert_eq!(sink.wheels.lock().unwrap().len(), 1);
    }
}
