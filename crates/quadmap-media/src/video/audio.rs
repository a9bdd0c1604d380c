//! Audio of a looping video: a second `ffmpeg` decodes the soundtrack to
//! interleaved `f32` PCM, gain is applied here, and the samples go to an
//! output sink.

use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, warn};

use super::{AudioBackend, VideoConfig};
use crate::error::{MediaError, MediaResult};

/// Sample rate and channel layout used when the sink does not dictate one.
const PLAYER_SAMPLE_RATE: u32 = 48_000;
const PLAYER_CHANNELS: u16 = 2;

const READ_CHUNK: usize = 16 * 1024;
const PAUSE_POLL: Duration = Duration::from_millis(15);
/// How long queued device samples last before the decoder is throttled.
const QUEUE_SECONDS: f32 = 0.25;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmFormat {
    const PLAYER: PcmFormat = PcmFormat {
        sample_rate: PLAYER_SAMPLE_RATE,
        channels: PLAYER_CHANNELS,
    };
}

/// Where gained PCM goes. `write` blocks until the sink accepts the samples,
/// which paces the decoder.
pub(crate) trait PcmSink: Send {
    fn write(&mut self, samples: &[f32]) -> io::Result<()>;
}

/// Playback state the video handle shares with the audio pump.
pub(crate) struct AudioControl {
    playing: AtomicBool,
    stop: AtomicBool,
    volume_bits: AtomicU32,
    children: Mutex<Vec<Child>>,
}

impl AudioControl {
    pub fn new(playing: bool, volume: f32) -> Self {
        Self {
            playing: AtomicBool::new(playing),
            stop: AtomicBool::new(false),
            volume_bits: AtomicU32::new(volume.clamp(0.0, 1.0).to_bits()),
            children: Mutex::new(Vec::new()),
        }
    }

    fn playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    fn volume(&self) -> f32 {
        f32::from_bits(self.volume_bits.load(Ordering::Relaxed))
    }

    fn adopt(&self, child: Child) {
        match self.children.lock() {
            Ok(mut children) => children.push(child),
            Err(_) => reap(child),
        }
    }

    /// Kills and reaps every child process; unblocks pipe reads and writes.
    fn reap_children(&self) {
        let Ok(mut children) = self.children.lock() else { return };
        for child in children.drain(..) {
            reap(child);
        }
    }
}

fn reap(mut child: Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Little-endian `f32` bytes to samples, carrying a split sample over to the
/// next call.
#[derive(Debug, Default)]
pub(crate) struct PcmDecoder {
    partial: Vec<u8>,
}

impl PcmDecoder {
    pub fn decode(&mut self, bytes: &[u8], gain: f32, out: &mut Vec<f32>) {
        self.partial.extend_from_slice(bytes);
        let whole = self.partial.len() / 4 * 4;
        out.extend(
            self.partial[..whole]
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) * gain),
        );
        self.partial.drain(..whole);
    }
}

/// Reads PCM from `source` and forwards it to `sink` while playing.
///
/// Returns when the source ends, the sink fails, or playback is stopped.
pub(crate) fn pump(path: &Path, mut source: impl Read, sink: &mut dyn PcmSink, control: &AudioControl) {
    let mut buf = vec![0u8; READ_CHUNK];
    let mut decoder = PcmDecoder::default();
    let mut samples = Vec::with_capacity(READ_CHUNK / 4);

    loop {
        while !control.playing() && !control.stopped() {
            thread::sleep(PAUSE_POLL);
        }
        if control.stopped() {
            break;
        }

        let n = match source.read(&mut buf) {
            Ok(0) => {
                debug!("media: audio of '{}' ended", path.display());
                break;
            }
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                if !control.stopped() {
                    error!("media: reading audio of '{}' failed: {e}", path.display());
                }
                break;
            }
        };

        samples.clear();
        decoder.decode(&buf[..n], control.volume(), &mut samples);
        if let Err(e) = sink.write(&samples) {
            if !control.stopped() {
                warn!("media: audio output for '{}' closed: {e}", path.display());
            }
            break;
        }
    }
}

/// Bounded sample FIFO between the pump and a pull-based device callback.
#[cfg_attr(not(feature = "device-audio"), allow(dead_code))]
pub(crate) struct SampleQueue {
    samples: Mutex<VecDeque<f32>>,
    space: Condvar,
    capacity: usize,
    closed: AtomicBool,
}

#[cfg_attr(not(feature = "device-audio"), allow(dead_code))]
impl SampleQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
            space: Condvar::new(),
            capacity: capacity.max(1),
            closed: AtomicBool::new(false),
        }
    }

    pub fn for_format(format: PcmFormat) -> Self {
        let per_second = format.sample_rate as f32 * f32::from(format.channels);
        Self::new((per_second * QUEUE_SECONDS) as usize)
    }

    /// Appends `samples`, waiting for room. Returns false once closed.
    pub fn push(&self, mut samples: &[f32]) -> bool {
        let Ok(mut queue) = self.samples.lock() else { return false };
        while !samples.is_empty() {
            while queue.len() >= self.capacity && !self.is_closed() {
                queue = match self.space.wait_timeout(queue, PAUSE_POLL) {
                    Ok((guard, _)) => guard,
                    Err(_) => return false,
                };
            }
            if self.is_closed() {
                return false;
            }
            let n = (self.capacity - queue.len()).min(samples.len());
            queue.extend(&samples[..n]);
            samples = &samples[n..];
        }
        true
    }

    /// Fills `out` from the front of the queue; missing samples are silence.
    pub fn drain_into(&self, out: &mut [f32]) {
        let Ok(mut queue) = self.samples.lock() else {
            out.fill(0.0);
            return;
        };
        for slot in out.iter_mut() {
            *slot = queue.pop_front().unwrap_or(0.0);
        }
        drop(queue);
        self.space.notify_one();
    }

    pub fn len(&self) -> usize {
        self.samples.lock().map(|q| q.len()).unwrap_or(0)
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.space.notify_all();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg_attr(not(feature = "device-audio"), allow(dead_code))]
struct QueueSink(Arc<SampleQueue>);

impl PcmSink for QueueSink {
    fn write(&mut self, samples: &[f32]) -> io::Result<()> {
        if self.0.push(samples) {
            Ok(())
        } else {
            Err(io::Error::new(ErrorKind::BrokenPipe, "audio device queue closed"))
        }
    }
}

/// Raw PCM piped into an `ffplay` child.
struct PlayerSink {
    stdin: ChildStdin,
    bytes: Vec<u8>,
}

impl PcmSink for PlayerSink {
    fn write(&mut self, samples: &[f32]) -> io::Result<()> {
        self.bytes.clear();
        for s in samples {
            self.bytes.extend_from_slice(&s.to_le_bytes());
        }
        self.stdin.write_all(&self.bytes)
    }
}

/// Soundtrack playback for one video. Dropping it stops the pump, kills the
/// decoder and player processes, and joins every thread it started.
pub(crate) struct AudioTrack {
    path: PathBuf,
    control: Arc<AudioControl>,
    queue: Option<Arc<SampleQueue>>,
    pump: Option<JoinHandle<()>>,
    output: Option<JoinHandle<()>>,
}

impl AudioTrack {
    pub fn open(path: &Path, config: &VideoConfig, playing: bool, volume: f32) -> MediaResult<AudioTrack> {
        let mut track = AudioTrack {
            path: path.to_path_buf(),
            control: Arc::new(AudioControl::new(playing, volume)),
            queue: None,
            pump: None,
            output: None,
        };

        let (format, mut sink): (PcmFormat, Box<dyn PcmSink>) = match config.audio {
            AudioBackend::Off => return Err(MediaError::audio("audio output is off")),
            AudioBackend::Player => track.open_player(config)?,
            AudioBackend::Device => track.open_device()?,
        };

        let mut decoder = Command::new(&config.ffmpeg)
            .args(["-v", "error", "-nostdin", "-stream_loop", "-1", "-i"])
            .arg(path)
            .args(["-vn", "-f", "f32le", "-acodec", "pcm_f32le", "-ac"])
            .arg(format.channels.to_string())
            .arg("-ar")
            .arg(format.sample_rate.to_string())
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| MediaError::Spawn {
                program: config.ffmpeg.display().to_string(),
                source,
            })?;
        let stdout = decoder.stdout.take();
        track.control.adopt(decoder);
        let Some(stdout) = stdout else {
            return Err(MediaError::decode(path, "ffmpeg audio stdout was not captured"));
        };

        let control = Arc::clone(&track.control);
        let pump_path = path.to_path_buf();
        let handle = thread::Builder::new()
            .name("quadmap-audio".into())
            .spawn(move || pump(&pump_path, stdout, sink.as_mut(), &control))
            .map_err(|e| MediaError::io(path, e))?;
        track.pump = Some(handle);

        debug!(
            "media: audio of '{}' at {} Hz x{} via {:?}",
            path.display(),
            format.sample_rate,
            format.channels,
            config.audio
        );
        Ok(track)
    }

    fn open_player(&mut self, config: &VideoConfig) -> MediaResult<(PcmFormat, Box<dyn PcmSink>)> {
        let format = PcmFormat::PLAYER;
        let mut player = Command::new(&config.ffplay)
            .args(["-v", "error", "-nodisp", "-autoexit", "-f", "f32le", "-sample_rate"])
            .arg(format.sample_rate.to_string())
            .args(["-ch_layout", "stereo", "-i", "pipe:0"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| MediaError::Spawn {
                program: config.ffplay.display().to_string(),
                source,
            })?;
        let stdin = player.stdin.take();
        self.control.adopt(player);
        let Some(stdin) = stdin else {
            return Err(MediaError::audio("ffplay stdin was not captured"));
        };
        Ok((format, Box::new(PlayerSink { stdin, bytes: Vec::new() })))
    }

    #[cfg(feature = "device-audio")]
    fn open_device(&mut self) -> MediaResult<(PcmFormat, Box<dyn PcmSink>)> {
        let (format, queue, output) = device::open(Arc::clone(&self.control))?;
        self.queue = Some(Arc::clone(&queue));
        self.output = Some(output);
        Ok((format, Box::new(QueueSink(queue))))
    }

    #[cfg(not(feature = "device-audio"))]
    fn open_device(&mut self) -> MediaResult<(PcmFormat, Box<dyn PcmSink>)> {
        Err(MediaError::audio(
            "built without the `device-audio` feature; use the ffplay backend",
        ))
    }

    pub fn set_playing(&self, playing: bool) {
        self.control.playing.store(playing, Ordering::Release);
    }

    pub fn set_volume(&self, volume: f32) {
        self.control
            .volume_bits
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }
}

impl Drop for AudioTrack {
    fn drop(&mut self) {
        self.control.stop.store(true, Ordering::Release);
        if let Some(queue) = &self.queue {
            queue.close();
        }
        self.control.reap_children();
        if let Some(pump) = self.pump.take() {
            if pump.join().is_err() {
                error!("media: audio pump for '{}' panicked", self.path.display());
            }
        }
        if let Some(output) = self.output.take() {
            output.thread().unpark();
            if output.join().is_err() {
                error!("media: audio output for '{}' panicked", self.path.display());
            }
        }
        debug!("media: audio of '{}' closed", self.path.display());
    }
}

/// The system's default output device through cpal.
///
/// cpal streams are not `Send`, so the stream lives on its own thread that
/// parks until the track stops.
#[cfg(feature = "device-audio")]
mod device {
    use std::sync::mpsc;

    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{FromSample, Sample, SizedSample};

    use super::*;

    type Opened = (PcmFormat, Arc<SampleQueue>, JoinHandle<()>);

    pub(super) fn open(control: Arc<AudioControl>) -> MediaResult<Opened> {
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let output = thread::Builder::new()
            .name("quadmap-audio-out".into())
            .spawn(move || {
                let (stream, format, queue) = match build_stream() {
                    Ok(opened) => opened,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if ready_tx.send(Ok((format, queue))).is_err() {
                    return;
                }
                while !control.stopped() {
                    thread::park_timeout(Duration::from_millis(100));
                }
                drop(stream);
            })
            .map_err(|e| MediaError::audio(format!("failed to start audio thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok((format, queue))) => Ok((format, queue, output)),
            Ok(Err(message)) => {
                let _ = output.join();
                Err(MediaError::audio(message))
            }
            Err(_) => {
                let _ = output.join();
                Err(MediaError::audio("audio thread exited during setup"))
            }
        }
    }

    fn build_stream() -> Result<(cpal::Stream, PcmFormat, Arc<SampleQueue>), String> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| "no default audio output device".to_string())?;
        let supported = device.default_output_config().map_err(|e| e.to_string())?;
        let config: cpal::StreamConfig = supported.config();
        let format = PcmFormat {
            sample_rate: config.sample_rate.0,
            channels: config.channels,
        };
        let queue = Arc::new(SampleQueue::for_format(format));

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => build::<f32>(&device, &config, Arc::clone(&queue)),
            cpal::SampleFormat::I16 => build::<i16>(&device, &config, Arc::clone(&queue)),
            cpal::SampleFormat::U16 => build::<u16>(&device, &config, Arc::clone(&queue)),
            other => Err(format!("unsupported device sample format {other:?}")),
        }?;
        stream.play().map_err(|e| e.to_string())?;
        Ok((stream, format, queue))
    }

    fn build<T>(device: &cpal::Device, config: &cpal::StreamConfig, queue: Arc<SampleQueue>) -> Result<cpal::Stream, String>
    where
        T: SizedSample + FromSample<f32>,
    {
        let mut scratch: Vec<f32> = Vec::new();
        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    scratch.resize(data.len(), 0.0);
                    queue.drain_into(&mut scratch);
                    for (out, s) in data.iter_mut().zip(&scratch) {
                        *out = T::from_sample(*s);
                    }
                },
                |e| warn!("media: audio stream error: {e}"),
                None,
            )
            .map_err(|e| e.to_string())
    }
}
