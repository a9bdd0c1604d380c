use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use log::{debug, error, info};
use quadmap_core::{MediaSource, StillImage};

use crate::error::{MediaError, MediaResult};
use crate::kind::{MediaFileKind, classify};
use crate::still::load_image;
use crate::video::{FfmpegVideo, VideoConfig};

/// A decoded source, ready to become a surface.
#[derive(Debug)]
pub struct LoadedMedia {
    pub path: PathBuf,
    /// File name shown in the surface list.
    pub name: String,
    pub source: MediaSource,
}

/// Completion of one [`MediaLoader::request`].
#[derive(Debug)]
pub struct LoadOutcome {
    pub path: PathBuf,
    pub result: MediaResult<LoadedMedia>,
}

/// Runs loads on background threads and hands results back to the frame loop.
///
/// There is no cancellation: every accepted request eventually yields exactly
/// one [`LoadOutcome`] from [`poll`](Self::poll).
pub struct MediaLoader {
    config: VideoConfig,
    tx: Sender<LoadOutcome>,
    rx: Receiver<LoadOutcome>,
    pending: usize,
}

impl MediaLoader {
    pub fn new(config: VideoConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        Self { config, tx, rx, pending: 0 }
    }

    /// Loads in flight.
    #[inline]
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Starts loading `path`. Unsupported file types are rejected here,
    /// before any thread is spawned.
    pub fn request(&mut self, path: impl Into<PathBuf>) -> MediaResult<()> {
        let path = path.into();
        let kind = classify(&path)?;

        let tx = self.tx.clone();
        let config = self.config.clone();
        let job_path = path.clone();
        thread::Builder::new()
            .name("quadmap-load".into())
            .spawn(move || {
                let result = load(&job_path, kind, &config);
                // The receiver only disappears when the loader is dropped.
                let _ = tx.send(LoadOutcome { path: job_path, result });
            })
            .map_err(|e| MediaError::io(&path, e))?;

        self.pending += 1;
        info!("media: loading {:?} '{}'", kind, path.display());
        Ok(())
    }

    /// Drains completed loads without blocking.
    pub fn poll(&mut self) -> Vec<LoadOutcome> {
        let done: Vec<LoadOutcome> = self.rx.try_iter().collect();
        self.pending = self.pending.saturating_sub(done.len());
        for outcome in &done {
            match &outcome.result {
                Ok(media) => debug!("media: '{}' ready", media.name),
                Err(e) => error!("media: {e}"),
            }
        }
        done
    }
}

impl Default for MediaLoader {
    fn default() -> Self {
        Self::new(VideoConfig::default())
    }
}

fn load(path: &Path, kind: MediaFileKind, config: &VideoConfig) -> MediaResult<LoadedMedia> {
    let source = match kind {
        MediaFileKind::Image => MediaSource::Image(StillImage::new(load_image(path)?)),
        MediaFileKind::Video => MediaSource::Video(Box::new(FfmpegVideo::open(path, config)?)),
    };
    Ok(LoadedMedia {
        path: path.to_path_buf(),
        name: display_name(path),
        source,
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn wait_for(loader: &mut MediaLoader) -> LoadOutcome {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(outcome) = loader.poll().pop() {
                return outcome;
            }
            assert!(Instant::now() < deadline, "load never completed");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn unsupported_type_is_rejected_synchronously() {
        let mut loader = MediaLoader::default();
        let err = loader.request("slides.pdf").unwrap_err();
        assert!(matches!(err, MediaError::UnsupportedFileType(_)));
        assert_eq!(loader.pending(), 0);
        assert!(loader.poll().is_empty());
    }

    #[test]
    fn failed_image_load_reports_once() {
        let mut loader = MediaLoader::default();
        loader.request("/nonexistent/quadmap/missing.png").unwrap();
        assert_eq!(loader.pending(), 1);

        let outcome = wait_for(&mut loader);
        assert!(matches!(outcome.result, Err(MediaError::Io { .. })));
        assert_eq!(loader.pending(), 0);
    }

    #[test]
    fn missing_ffprobe_is_a_spawn_error() {
        let mut loader = MediaLoader::new(VideoConfig {
            ffmpeg: PathBuf::from("/nonexistent/ffmpeg"),
            ffprobe: PathBuf::from("/nonexistent/ffprobe"),
            ..VideoConfig::default()
        });
        loader.request("clip.mp4").unwrap();
        let outcome = wait_for(&mut loader);
        assert!(matches!(outcome.result, Err(MediaError::Spawn { .. })));
    }

    #[test]
    fn image_load_produces_named_source() {
        let dir = std::env::temp_dir().join(format!("quadmap-loader-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("poster.png");
        image::RgbaImage::from_raw(2, 3, vec![200u8; 2 * 3 * 4])
            .unwrap()
            .save(&path)
            .unwrap();

        let mut loader = MediaLoader::default();
        loader.request(path.clone()).unwrap();
        let media = wait_for(&mut loader).result.unwrap();
        assert_eq!(media.name, "poster.png");
        assert_eq!(media.source.intrinsic_size().map(|s| (s.x, s.y)), Some((2.0, 3.0)));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
