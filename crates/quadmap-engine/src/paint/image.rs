use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// A decoded RGBA8 frame (straight alpha, sRGB-encoded, rows top to bottom).
///
/// Cloning is cheap: pixels are shared. Every frame created through
/// [`ImageFrame::new`] gets a process-unique `generation`, so a renderer can
/// compare generations to decide whether a texture upload is needed.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFrame {
    width: u32,
    height: u32,
    generation: u64,
    pixels: Arc<[u8]>,
}

impl ImageFrame {
    /// Wraps tightly packed RGBA8 pixels.
    ///
    /// Returns `None` when the buffer length does not match `width * height * 4`
    /// or either dimension is zero.
    pub fn new(width: u32, height: u32, pixels: impl Into<Arc<[u8]>>) -> Option<Self> {
        let pixels = pixels.into();
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        if width == 0 || height == 0 || pixels.len() != expected {
            return None;
        }

        Some(Self {
            width,
            height,
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            pixels,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}
