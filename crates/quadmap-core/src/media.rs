//! Media sources a surface can display.
//!
//! The core never decodes anything itself: still images arrive as a decoded
//! [`ImageFrame`], videos as a [`VideoPlayback`] handle whose worker lives in
//! the media crate.

use std::fmt;

use quadmap_engine::coords::Vec2;

pub use quadmap_engine::paint::ImageFrame;

/// Playback volume a video starts with.
pub const INITIAL_VOLUME: f32 = 1.0;
/// Volume restored when a video is unmuted.
pub const UNMUTED_VOLUME: f32 = 0.5;

/// Handle to a running video decoder.
///
/// Implementations publish frames from their own worker; every method here
/// must return promptly and never block on decoding. Dropping the handle
/// stops the worker.
pub trait VideoPlayback: Send {
    /// Intrinsic frame size in pixels.
    fn size(&self) -> (u32, u32);

    /// Most recently decoded frame, if any has arrived yet.
    fn current_frame(&self) -> Option<ImageFrame>;

    fn set_playing(&mut self, playing: bool);

    fn is_playing(&self) -> bool;

    /// Gain in `0.0..=1.0`.
    fn set_volume(&mut self, volume: f32);

    fn volume(&self) -> f32;
}

/// A decoded still image.
#[derive(Debug, Clone, PartialEq)]
pub struct StillImage {
    frame: ImageFrame,
}

impl StillImage {
    pub fn new(frame: ImageFrame) -> Self {
        Self { frame }
    }

    #[inline]
    pub fn frame(&self) -> &ImageFrame {
        &self.frame
    }
}

/// What a surface shows.
pub enum MediaSource {
    Video(Box<dyn VideoPlayback>),
    Image(StillImage),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MediaKind {
    Video,
    Image,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Video => f.write_str("video"),
            MediaKind::Image => f.write_str("image"),
        }
    }
}

impl MediaSource {
    pub fn kind(&self) -> MediaKind {
        match self {
            MediaSource::Video(_) => MediaKind::Video,
            MediaSource::Image(_) => MediaKind::Image,
        }
    }

    #[inline]
    pub fn is_video(&self) -> bool {
        matches!(self, MediaSource::Video(_))
    }

    /// Intrinsic size in pixels; `None` when the source reports a zero or
    /// unknown dimension.
    pub fn intrinsic_size(&self) -> Option<Vec2> {
        let (w, h) = match self {
            MediaSource::Video(v) => v.size(),
            MediaSource::Image(img) => (img.frame().width(), img.frame().height()),
        };
        (w > 0 && h > 0).then(|| Vec2::new(w as f32, h as f32))
    }

    pub fn current_frame(&self) -> Option<ImageFrame> {
        match self {
            MediaSource::Video(v) => v.current_frame(),
            MediaSource::Image(img) => Some(img.frame().clone()),
        }
    }

    pub(crate) fn video_mut(&mut self) -> Option<&mut dyn VideoPlayback> {
        match self {
            MediaSource::Video(v) => Some(v.as_mut()),
            MediaSource::Image(_) => None,
        }
    }

    pub(crate) fn video(&self) -> Option<&dyn VideoPlayback> {
        match self {
            MediaSource::Video(v) => Some(v.as_ref()),
            MediaSource::Image(_) => None,
        }
    }
}

impl fmt::Debug for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaSource::Video(v) => f
                .debug_struct("Video")
                .field("size", &v.size())
                .field("playing", &v.is_playing())
                .finish(),
            MediaSource::Image(img) => f
                .debug_struct("Image")
                .field("width", &img.frame().width())
                .field("height", &img.frame().height())
                .finish(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fake::*;
    use super::*;

    #[test]
    fn intrinsic_size_reports_pixels() {
        assert_eq!(image(4, 2).intrinsic_size(), Some(Vec2::new(4.0, 2.0)));
        assert_eq!(video(1920, 1080).intrinsic_size(), Some(Vec2::new(1920.0, 1080.0)));
    }

    #[test]
    fn unknown_video_size_has_no_intrinsics() {
        assert_eq!(video(0, 1080).intrinsic_size(), None);
    }

    #[test]
    fn image_always_has_a_frame() {
        let src = image(2, 2);
        let a = src.current_frame().unwrap();
        let b = src.current_frame().unwrap();
        assert_eq!(a.generation(), b.generation());
        assert_eq!(src.kind(), MediaKind::Image);
        assert!(!src.is_video());
    }

    #[test]
    fn video_without_frames_yields_none() {
        let mut v = FakeVideo::new(10, 10);
        v.frame = None;
        let src = MediaSource::Video(Box::new(v));
        assert!(src.current_frame().is_none());
        assert_eq!(src.kind().to_string(), "video");
    }
}
