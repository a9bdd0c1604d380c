use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use winit::dpi::LogicalSize;

use quadmap_core::CompositionConfig;
use quadmap_engine::coords::Vec2;
use quadmap_engine::logging::LoggingConfig;
use quadmap_engine::window::RuntimeConfig;
use quadmap_media::{AudioBackend, VideoConfig};

use crate::studio::StudioConfig;

/// Quad-warping projection mapper.
#[derive(Parser, Debug)]
#[command(name = "quadmap", version)]
pub struct Args {
    /// Images or videos to load at startup, front-most first.
    pub files: Vec<PathBuf>,

    /// Initial window width in logical pixels.
    #[arg(long, default_value_t = 1280.0)]
    pub width: f64,

    /// Initial window height in logical pixels.
    #[arg(long, default_value_t = 720.0)]
    pub height: f64,

    #[arg(long, default_value = "quadmap")]
    pub title: String,

    /// Start borderless fullscreen.
    #[arg(long, default_value_t = false)]
    pub fullscreen: bool,

    /// Start with the surface panel and cursor hidden.
    #[arg(long, default_value_t = false)]
    pub kiosk: bool,

    /// Log filter in env_logger syntax (overrides RUST_LOG).
    #[arg(long)]
    pub log: Option<String>,

    /// ffmpeg executable used to decode video.
    #[arg(long, default_value = "ffmpeg")]
    pub ffmpeg: PathBuf,

    /// ffprobe executable used to inspect video.
    #[arg(long, default_value = "ffprobe")]
    pub ffprobe: PathBuf,

    /// ffplay executable used by the `player` audio output.
    #[arg(long, default_value = "ffplay")]
    pub ffplay: PathBuf,

    /// Where video soundtracks play.
    #[arg(long, value_enum, default_value_t = AudioArg::Player)]
    pub audio: AudioArg,

    /// Fixed canvas size as WxH; the window shows its top-left part and new
    /// surfaces are centered on the window. Defaults to the window size.
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    pub canvas: Option<Vec2>,

    /// TrueType/OpenType font for panel and notice text. Defaults to the
    /// first DejaVu Sans or Noto Sans found in the usual system paths.
    #[arg(long, value_name = "PATH")]
    pub font: Option<PathBuf>,

    /// Warp grid subdivisions per side.
    #[arg(long, default_value_t = 8, value_parser = clap::value_parser!(u32).range(1..=128))]
    pub mesh_resolution: u32,
}

#[derive(ValueEnum, Debug, Copy, Clone, Eq, PartialEq)]
pub enum AudioArg {
    /// Silent playback.
    Off,
    /// Pipe sound through ffplay.
    Player,
    /// Default output device (needs the `device-audio` build feature).
    Device,
}

impl From<AudioArg> for AudioBackend {
    fn from(arg: AudioArg) -> Self {
        match arg {
            AudioArg::Off => AudioBackend::Off,
            AudioArg::Player => AudioBackend::Player,
            AudioArg::Device => AudioBackend::Device,
        }
    }
}

fn parse_size(s: &str) -> Result<Vec2, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{s}'"))?;
    let dim = |v: &str| match v.trim().parse::<f32>() {
        Ok(n) if n.is_finite() && n >= 1.0 => Ok(n),
        _ => Err(format!("invalid canvas dimension '{v}'")),
    };
    Ok(Vec2::new(dim(w)?, dim(h)?))
}

impl Args {
    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            env_filter: self.log.clone(),
            ..LoggingConfig::default()
        }
    }

    pub fn runtime(&self) -> RuntimeConfig {
        RuntimeConfig {
            title: self.title.clone(),
            initial_size: LogicalSize::new(self.width.max(1.0), self.height.max(1.0)),
            fullscreen: self.fullscreen,
        }
    }

    pub fn video(&self) -> VideoConfig {
        VideoConfig {
            ffmpeg: self.ffmpeg.clone(),
            ffprobe: self.ffprobe.clone(),
            ffplay: self.ffplay.clone(),
            audio: self.audio.into(),
        }
    }

    pub fn studio(&self) -> StudioConfig {
        StudioConfig {
            title: self.title.clone(),
            kiosk: self.kiosk,
            canvas: self.canvas,
            font: self.font.clone(),
        }
    }

    pub fn composition(&self) -> CompositionConfig {
        CompositionConfig {
            mesh_resolution: self.mesh_resolution,
            ..CompositionConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::parse_from(["quadmap"]);
        assert!(args.files.is_empty());
        assert_eq!(args.runtime().initial_size, LogicalSize::new(1280.0, 720.0));
        assert_eq!(args.composition().mesh_resolution, 8);
        assert_eq!(args.video(), VideoConfig::default());
        assert!(args.logging().env_filter.is_none());
        assert_eq!(args.studio(), StudioConfig::default());
    }

    #[test]
    fn flags_feed_configs() {
        let args = Args::parse_from([
            "quadmap",
            "wall.mp4",
            "logo.png",
            "--fullscreen",
            "--kiosk",
            "--mesh-resolution",
            "16",
            "--ffmpeg",
            "/opt/ff/ffmpeg",
            "--log",
            "quadmap_core=debug",
            "--audio",
            "off",
        ]);
        assert_eq!(args.files, [PathBuf::from("wall.mp4"), PathBuf::from("logo.png")]);
        assert!(args.runtime().fullscreen);
        assert!(args.studio().kiosk);
        assert_eq!(args.composition().mesh_resolution, 16);
        assert_eq!(args.video().ffmpeg, PathBuf::from("/opt/ff/ffmpeg"));
        assert_eq!(args.logging().env_filter.as_deref(), Some("quadmap_core=debug"));
        assert_eq!(args.video().audio, AudioBackend::Off);
    }

    #[test]
    fn canvas_size_parses_wxh() {
        let args = Args::parse_from(["quadmap", "--canvas", "3840x2160"]);
        assert_eq!(args.studio().canvas, Some(Vec2::new(3840.0, 2160.0)));
        assert_eq!(Args::parse_from(["quadmap"]).canvas, None);
        assert!(Args::try_parse_from(["quadmap", "--canvas", "3840"]).is_err());
        assert!(Args::try_parse_from(["quadmap", "--canvas", "0x100"]).is_err());
    }

    #[test]
    fn mesh_resolution_is_bounded() {
        assert!(Args::try_parse_from(["quadmap", "--mesh-resolution", "0"]).is_err());
        assert!(Args::try_parse_from(["quadmap", "--mesh-resolution", "500"]).is_err());
    }
}
