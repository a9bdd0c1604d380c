use std::path::Path;
use std::process::{Command, Stdio};

use serde::Deserialize;

use super::VideoConfig;
use crate::error::{MediaError, MediaResult};

/// Frame rate used when the container reports none.
const FALLBACK_FPS: f64 = 30.0;

/// What the decoder needs to know about a video stream.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub has_audio: bool,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

#[derive(Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

/// Runs `ffprobe` on `path`.
pub fn probe_video(path: &Path, config: &VideoConfig) -> MediaResult<VideoInfo> {
    let out = Command::new(&config.ffprobe)
        .args(["-v", "error", "-print_format", "json", "-show_streams"])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| MediaError::Spawn {
            program: config.ffprobe.display().to_string(),
            source,
        })?;
    if !out.status.success() {
        return Err(MediaError::probe(
            path,
            String::from_utf8_lossy(&out.stderr).trim().to_string(),
        ));
    }
    parse_probe_json(&out.stdout).map_err(|msg| MediaError::probe(path, msg))
}

pub(crate) fn parse_probe_json(json: &[u8]) -> Result<VideoInfo, String> {
    let parsed: ProbeOut =
        serde_json::from_slice(json).map_err(|e| format!("ffprobe json parse failed: {e}"))?;

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or("no video stream found")?;
    let width = video.width.filter(|&w| w > 0).ok_or("missing video width")?;
    let height = video.height.filter(|&h| h > 0).ok_or("missing video height")?;

    // r_frame_rate may be the container timebase on variable-rate files.
    let fps = [video.avg_frame_rate.as_deref(), video.r_frame_rate.as_deref()]
        .into_iter()
        .flatten()
        .find_map(parse_ff_ratio)
        .unwrap_or(FALLBACK_FPS);

    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(VideoInfo { width, height, fps, has_audio })
}

/// Parses `num/den` into a positive rate.
fn parse_ff_ratio(s: &str) -> Option<f64> {
    let (num, den) = s.split_once('/')?;
    let num = num.trim().parse::<f64>().ok()?;
    let den = den.trim().parse::<f64>().ok()?;
    let fps = num / den;
    (den > 0.0 && fps.is_finite() && fps > 0.0).then_some(fps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_video_stream() {
        let json = br#"{
            "streams": [
                {"codec_type": "audio", "r_frame_rate": "0/0"},
                {"codec_type": "video", "width": 1920, "height": 1080,
                 "r_frame_rate": "30000/1001", "avg_frame_rate": "30000/1001"}
            ]
        }"#;
        let info = parse_probe_json(json).unwrap();
        assert_eq!((info.width, info.height), (1920, 1080));
        assert!((info.fps - 29.97).abs() < 0.01);
        assert!(info.has_audio);
    }

    #[test]
    fn falls_back_when_rates_are_unusable() {
        let json = br#"{"streams": [{"codec_type": "video", "width": 640, "height": 480,
                        "avg_frame_rate": "0/0", "r_frame_rate": "25/1"}]}"#;
        assert_eq!(parse_probe_json(json).unwrap().fps, 25.0);

        let json = br#"{"streams": [{"codec_type": "video", "width": 640, "height": 480}]}"#;
        let info = parse_probe_json(json).unwrap();
        assert_eq!(info.fps, FALLBACK_FPS);
        assert!(!info.has_audio);
    }

    #[test]
    fn rejects_missing_stream_or_size() {
        assert!(parse_probe_json(br#"{"streams": []}"#).is_err());
        assert!(parse_probe_json(br#"{"streams": [{"codec_type": "video", "width": 0, "height": 480}]}"#).is_err());
        assert!(parse_probe_json(b"not json").is_err());
    }

    #[test]
    fn ratio_parsing() {
        assert_eq!(parse_ff_ratio("24/1"), Some(24.0));
        assert_eq!(parse_ff_ratio("0/0"), None);
        assert_eq!(parse_ff_ratio("24"), None);
    }
}
