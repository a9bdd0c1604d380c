//! Media loading for quadmap.
//!
//! Still images decode through `image`; videos are probed with `ffprobe`
//! and streamed from an `ffmpeg` child as raw RGBA frames, with their
//! soundtrack decoded by a second child and played through an
//! [`AudioBackend`]. Loads run on background threads and report back through
//! [`MediaLoader::poll`].

mod error;
mod kind;
mod loader;
mod still;
mod video;

pub use error::{MediaError, MediaResult};
pub use kind::{MediaFileKind, classify};
pub use loader::{LoadOutcome, LoadedMedia, MediaLoader};
pub use still::{decode_image_bytes, load_image};
pub use video::{AudioBackend, FfmpegVideo, VideoConfig, VideoInfo, probe_video};
