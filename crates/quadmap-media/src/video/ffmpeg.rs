use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use quadmap_core::ImageFrame;
use quadmap_core::VideoPlayback;
use quadmap_core::media::INITIAL_VOLUME;

use super::audio::AudioTrack;
use super::probe::{VideoInfo, probe_video};
use super::{AudioBackend, VideoConfig};
use crate::error::{MediaError, MediaResult};

/// Poll interval while paused.
const PAUSE_POLL: Duration = Duration::from_millis(15);

/// State shared between the handle and its decode worker.
struct Shared {
    frame: Mutex<Option<ImageFrame>>,
    child: Mutex<Option<Child>>,
    playing: AtomicBool,
    stop: AtomicBool,
    volume_bits: AtomicU32,
}

impl Shared {
    fn publish(&self, frame: ImageFrame) {
        if let Ok(mut slot) = self.frame.lock() {
            *slot = Some(frame);
        }
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Kills and reaps the decoder process, if it is still around.
    fn reap_child(&self) {
        let Ok(mut guard) = self.child.lock() else { return };
        if let Some(mut child) = guard.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Looping video decoded by an `ffmpeg` child process.
///
/// One worker thread reads raw RGBA frames from ffmpeg's stdout at the probed
/// frame rate and publishes the latest one. The first frame is decoded even
/// while paused so the surface has something to show. The soundtrack, if
/// any, plays through an [`AudioTrack`] that follows play/pause and volume.
/// Dropping the handle stops both, kills every ffmpeg child and joins.
pub struct FfmpegVideo {
    info: VideoInfo,
    path: PathBuf,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
    audio: Option<AudioTrack>,
}

impl FfmpegVideo {
    /// Probes `path` and starts decoding it, paused.
    pub fn open(path: &Path, config: &VideoConfig) -> MediaResult<FfmpegVideo> {
        let info = probe_video(path, config)?;
        info!(
            "media: probed video '{}' ({}x{} @ {:.2} fps{})",
            path.display(),
            info.width,
            info.height,
            info.fps,
            if info.has_audio { ", with audio" } else { "" }
        );

        let mut child = Command::new(&config.ffmpeg)
            .args(["-v", "error", "-nostdin", "-stream_loop", "-1", "-i"])
            .arg(path)
            .args(["-an", "-f", "rawvideo", "-pix_fmt", "rgba", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| MediaError::Spawn {
                program: config.ffmpeg.display().to_string(),
                source,
            })?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(MediaError::decode(path, "ffmpeg stdout was not captured"));
        };

        let shared = Arc::new(Shared {
            frame: Mutex::new(None),
            child: Mutex::new(Some(child)),
            playing: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            volume_bits: AtomicU32::new(INITIAL_VOLUME.to_bits()),
        });

        let worker = {
            let shared = Arc::clone(&shared);
            let path = path.to_path_buf();
            thread::Builder::new()
                .name("quadmap-video".into())
                .spawn(move || decode_loop(&path, info, stdout, &shared))
        };
        let worker = match worker {
            Ok(handle) => handle,
            Err(e) => {
                shared.reap_child();
                return Err(MediaError::io(path, e));
            }
        };

        let audio = if info.has_audio && config.audio != AudioBackend::Off {
            match AudioTrack::open(path, config, false, INITIAL_VOLUME) {
                Ok(track) => Some(track),
                Err(e) => {
                    warn!("media: '{}' plays without sound: {e}", path.display());
                    None
                }
            }
        } else {
            None
        };

        Ok(FfmpegVideo {
            info,
            path: path.to_path_buf(),
            shared,
            worker: Some(worker),
            audio,
        })
    }

    #[inline]
    pub fn info(&self) -> &VideoInfo {
        &self.info
    }
}

impl VideoPlayback for FfmpegVideo {
    fn size(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn current_frame(&self) -> Option<ImageFrame> {
        self.shared.frame.lock().ok().and_then(|f| f.clone())
    }

    fn set_playing(&mut self, playing: bool) {
        self.shared.playing.store(playing, Ordering::Release);
        if let Some(audio) = &self.audio {
            audio.set_playing(playing);
        }
    }

    fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::Acquire)
    }

    fn set_volume(&mut self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        self.shared.volume_bits.store(volume.to_bits(), Ordering::Relaxed);
        if let Some(audio) = &self.audio {
            audio.set_volume(volume);
        }
        debug!("media: '{}' volume {volume}", self.path.display());
    }

    fn volume(&self) -> f32 {
        f32::from_bits(self.shared.volume_bits.load(Ordering::Relaxed))
    }
}

impl Drop for FfmpegVideo {
    fn drop(&mut self) {
        drop(self.audio.take());
        self.shared.stop.store(true, Ordering::Release);
        // Unblocks a worker waiting on a pipe read.
        self.shared.reap_child();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("media: video worker for '{}' panicked", self.path.display());
            }
        }
        debug!("media: closed '{}'", self.path.display());
    }
}

fn decode_loop(path: &Path, info: VideoInfo, mut stdout: ChildStdout, shared: &Shared) {
    let frame_len = info.width as usize * info.height as usize * 4;
    let interval = Duration::from_secs_f64(1.0 / info.fps);
    let mut buf = vec![0u8; frame_len];
    let mut due = Instant::now();

    loop {
        if shared.stopped() {
            break;
        }

        match stdout.read_exact(&mut buf) {
            Ok(()) => {}
            Err(e) if shared.stopped() => {
                debug!("media: '{}' read ended on shutdown: {e}", path.display());
                break;
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                warn!("media: ffmpeg stream for '{}' ended", path.display());
                break;
            }
            Err(e) => {
                error!("media: reading frames of '{}' failed: {e}", path.display());
                break;
            }
        }

        match ImageFrame::new(info.width, info.height, buf.as_slice()) {
            Some(frame) => shared.publish(frame),
            None => {
                error!("media: '{}' produced a malformed frame", path.display());
                break;
            }
        }

        let mut paused = false;
        while !shared.playing.load(Ordering::Acquire) && !shared.stopped() {
            paused = true;
            thread::sleep(PAUSE_POLL);
        }
        if paused {
            due = Instant::now();
        }

        due += interval;
        let now = Instant::now();
        if due > now {
            thread::sleep(due - now);
        } else if now - due > interval {
            // Fell behind; drop the backlog instead of racing to catch up.
            due = now;
        }
    }

    shared.reap_child();
}
