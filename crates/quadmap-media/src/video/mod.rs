//! Video playback through external `ffprobe` / `ffmpeg` processes.

mod audio;
mod ffmpeg;
mod probe;

use std::path::PathBuf;

pub use ffmpeg::FfmpegVideo;
pub use probe::{VideoInfo, probe_video};

/// Where decoded soundtracks are played.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum AudioBackend {
    /// Videos play silently.
    Off,
    /// Raw PCM piped into an `ffplay` child.
    #[default]
    Player,
    /// The default output device, through cpal. Needs the `device-audio`
    /// feature.
    Device,
}

/// Where to find the ffmpeg tools and how to play sound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub ffplay: PathBuf,
    pub audio: AudioBackend,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            ffplay: PathBuf::from("ffplay"),
            audio: AudioBackend::default(),
        }
    }
}
