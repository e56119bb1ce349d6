//! Decoded preview frames.
//!
//! A `PreviewFrame` is one partial-result bitmap pushed by the sampling
//! producer. Pixel data lives behind an `Arc` so frames clone cheaply:
//! the registry, every playback target of the stream and the draw surface
//! all share one buffer.
//!
//! Decode is delegated to the `image` crate (producers send JPEG, the demo
//! sends PNG; the loader sniffs the container). A failed decode leaves the
//! frame slot empty and the stream keeps playing.

use image::RgbaImage;
use std::sync::Arc;

/// Frame decode errors
#[derive(Debug)]
pub enum FrameError {
    Decode(String),
    EmptyImage,
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::Decode(e) => write!(f, "image decode error: {}", e),
            FrameError::EmptyImage => write!(f, "decoded image has zero dimension"),
        }
    }
}

impl std::error::Error for FrameError {}

/// One decoded preview bitmap (RGBA8, shared pixel data)
#[derive(Debug, Clone)]
pub struct PreviewFrame {
    pixels: Arc<RgbaImage>,
}

impl PreviewFrame {
    /// Decode from encoded image bytes (format sniffed from the container).
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| FrameError::Decode(e.to_string()))?
            .to_rgba8();
        Self::from_image(img)
    }

    /// Wrap an already-decoded bitmap.
    pub fn from_image(img: RgbaImage) -> Result<Self, FrameError> {
        if img.width() == 0 || img.height() == 0 {
            return Err(FrameError::EmptyImage);
        }
        Ok(Self {
            pixels: Arc::new(img),
        })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Width / height, for widget layout.
    pub fn aspect(&self) -> f32 {
        self.pixels.width() as f32 / self.pixels.height() as f32
    }

    /// Raw RGBA8 bytes, row-major, `width * height * 4` long.
    pub fn raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// Solid-color frame, distinct per `tag`. Test fixture.
    #[cfg(test)]
    pub(crate) fn solid(width: u32, height: u32, tag: u8) -> PreviewFrame {
        let img = RgbaImage::from_pixel(width, height, image::Rgba([tag, 0, 0, 255]));
        PreviewFrame::from_image(img).unwrap()
    }
}
