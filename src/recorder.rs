//! Recording session: a two-state start/stop toggle that collects
//! rendered frames on a worker thread and muxes them with the played
//! audio span into a single AVI on stop.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::avi::{self, AviConfig};
use crate::config::RECORD_FPS;
use crate::playback::Track;

const JPEG_QUALITY: u8 = 85;

/// One captured framebuffer, rows bottom-up as read back from the GPU.
#[derive(Clone)]
pub struct FramePixels {
    pub width: u16,
    pub height: u16,
    pub rgba: Vec<u8>,
}

/// Paces capture to the nominal frame rate regardless of how fast the
/// render loop ticks: a 120 Hz display drops every other frame, a loop
/// running below the rate duplicates frames to fill the gap.
struct FramePacer {
    interval: f32,
    accum: f32,
}

impl FramePacer {
    fn new(fps: u32) -> Self {
        Self {
            interval: 1.0 / fps.max(1) as f32,
            accum: 0.0,
        }
    }

    /// Number of frames due after `dt` more seconds of wall time.
    fn advance(&mut self, dt: f32) -> usize {
        self.accum += dt.max(0.0);
        let mut due = 0;
        while self.accum >= self.interval {
            self.accum -= self.interval;
            due += 1;
        }
        due
    }
}

struct EncodedVideo {
    width: u32,
    height: u32,
    frames: Vec<Vec<u8>>,
}

struct Session {
    tx: Option<mpsc::Sender<FramePixels>>,
    worker: thread::JoinHandle<EncodedVideo>,
    pacer: FramePacer,
    /// Playback position (track frames) when the session started.
    start_frame: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("encoder worker panicked")]
    Worker,
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub struct Recorder {
    session: Option<Session>,
}

impl Recorder {
    pub fn new() -> Self {
        Self { session: None }
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Begin a session at the given playback position. Starting while a
    /// session is active is a no-op.
    pub fn start(&mut self, start_frame: usize) {
        if self.session.is_some() {
            log::debug!("recording already active, start ignored");
            return;
        }
        let (tx, rx) = mpsc::channel();
        let worker = thread::spawn(move || encode_frames(rx));
        self.session = Some(Session {
            tx: Some(tx),
            worker,
            pacer: FramePacer::new(RECORD_FPS),
            start_frame,
        });
        log::info!("recording started");
    }

    /// Offer the current framebuffer to the encoder, `dt` seconds after
    /// the previous offer. The pacer decides how many copies (possibly
    /// zero) enter the stream. Ignored while idle.
    pub fn capture(&mut self, dt: f32, frame: FramePixels) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let due = session.pacer.advance(dt);
        if due == 0 {
            return;
        }
        if let Some(tx) = &session.tx {
            for _ in 1..due {
                let _ = tx.send(frame.clone());
            }
            let _ = tx.send(frame);
        }
    }

    /// Finalize: drain the encoder, mux video plus the audio span played
    /// since start, and write the file. Stopping while idle is a no-op.
    pub fn stop(
        &mut self,
        track: &Track,
        end_frame: usize,
        path: &Path,
    ) -> Result<Option<PathBuf>, RecordError> {
        let Some(mut session) = self.session.take() else {
            log::debug!("no recording active, stop ignored");
            return Ok(None);
        };
        session.tx.take(); // disconnect so the worker drains and exits
        let video = session.worker.join().map_err(|_| RecordError::Worker)?;

        let start = session.start_frame.min(track.frames());
        let end = end_frame.clamp(start, track.frames());
        let audio: Vec<i16> = track.mono[start..end]
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .collect();

        let cfg = AviConfig {
            width: video.width,
            height: video.height,
            fps: RECORD_FPS,
            audio_rate: track.sample_rate,
        };
        let bytes = avi::mux(&cfg, &video.frames, &audio);
        std::fs::write(path, &bytes).map_err(|source| RecordError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!(
            "recording saved: {} ({} frames, {:.1}s audio)",
            path.display(),
            video.frames.len(),
            audio.len() as f32 / track.sample_rate as f32
        );
        Ok(Some(path.to_path_buf()))
    }

    #[cfg(test)]
    fn start_position(&self) -> Option<usize> {
        self.session.as_ref().map(|s| s.start_frame)
    }
}

fn encode_frames(rx: mpsc::Receiver<FramePixels>) -> EncodedVideo {
    let mut video = EncodedVideo {
        width: 0,
        height: 0,
        frames: Vec::new(),
    };
    while let Ok(frame) = rx.recv() {
        let (w, h) = (frame.width as u32, frame.height as u32);
        if video.frames.is_empty() {
            video.width = w;
            video.height = h;
        } else if w != video.width || h != video.height {
            // Window resized mid-recording; keep the original geometry.
            continue;
        }
        let rgb = flip_and_strip_alpha(&frame);
        let mut jpeg = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY);
        match encoder.encode(&rgb, w, h, ExtendedColorType::Rgb8) {
            Ok(()) => video.frames.push(jpeg),
            Err(e) => log::warn!("frame encode failed: {}", e),
        }
    }
    video
}

/// Framebuffer rows come back bottom-up; flip while dropping alpha.
fn flip_and_strip_alpha(frame: &FramePixels) -> Vec<u8> {
    let w = frame.width as usize;
    let h = frame.height as usize;
    let mut rgb = Vec::with_capacity(w * h * 3);
    for row in (0..h).rev() {
        let line = &frame.rgba[row * w * 4..(row + 1) * w * 4];
        for px in line.chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
        }
    }
    rgb
}
