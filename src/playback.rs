//! Track decoding and pass-through playback.
//!
//! The decoded samples are played unmodified through the default output
//! device; the audio callback only advances a cursor over the immutable
//! sample data, so the analyser and recorder can tap exactly what is
//! being heard without touching the signal path.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use rodio::Source;

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: String,
        source: rodio::decoder::DecoderError,
    },
    #[error("audio file contains no samples")]
    Empty,
    #[error("no audio output device available")]
    NoDevice,
    #[error("failed to query output config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),
    #[error("unsupported output sample format {0:?}")]
    Format(cpal::SampleFormat),
    #[error("failed to build output stream: {0}")]
    Build(#[from] cpal::BuildStreamError),
    #[error("failed to start output stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
}

/// A fully decoded audio file.
#[derive(Debug)]
pub struct Track {
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved samples as decoded.
    pub interleaved: Vec<f32>,
    /// Per-frame mono fold-down, used for analysis and recording.
    pub mono: Vec<f32>,
}

impl Track {
    /// Decode any container rodio understands (wav, mp3, flac, ogg).
    pub fn decode(path: &Path) -> Result<Self, PlaybackError> {
        let display = path.display().to_string();
        let file = File::open(path).map_err(|source| PlaybackError::Open {
            path: display.clone(),
            source,
        })?;
        let decoder =
            rodio::Decoder::new(BufReader::new(file)).map_err(|source| PlaybackError::Decode {
                path: display,
                source,
            })?;
        let sample_rate = decoder.sample_rate();
        let channels = decoder.channels().max(1);
        let interleaved: Vec<f32> = decoder.convert_samples().collect();
        if interleaved.is_empty() {
            return Err(PlaybackError::Empty);
        }
        let mono = interleaved
            .chunks(channels as usize)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();
        Ok(Self {
            sample_rate,
            channels,
            interleaved,
            mono,
        })
    }

    pub fn frames(&self) -> usize {
        self.mono.len()
    }

    pub fn duration_secs(&self) -> f32 {
        self.frames() as f32 / self.sample_rate as f32
    }
}

/// Fractional read position into the track, stepped at the ratio of
/// track rate to device rate (linear resampling).
struct Cursor {
    pos: f64,
    step: f64,
}

pub struct Player {
    track: Arc<Track>,
    frame_pos: Arc<AtomicUsize>,
    finished: Arc<AtomicBool>,
    // Must keep the stream alive or playback stops
    _stream: cpal::Stream,
}

impl Player {
    pub fn start(track: Arc<Track>) -> Result<Self, PlaybackError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(PlaybackError::NoDevice)?;
        let config = device.default_output_config()?;
        let sample_format = config.sample_format();
        let channels = config.channels() as usize;
        let stream_config: cpal::StreamConfig = config.into();
        let device_rate = stream_config.sample_rate.0;
        log::info!(
            "audio output: {} @ {} Hz",
            device.name().unwrap_or_else(|_| "unknown".into()),
            device_rate
        );

        let cursor = Arc::new(Mutex::new(Cursor {
            pos: 0.0,
            step: track.sample_rate as f64 / device_rate as f64,
        }));
        let frame_pos = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicBool::new(false));
        let err_fn = |err| eprintln!("Audio error: {}", err);

        macro_rules! build_stream {
            ($fmt:ty) => {{
                let track = Arc::clone(&track);
                let cursor = Arc::clone(&cursor);
                let frame_pos = Arc::clone(&frame_pos);
                let finished = Arc::clone(&finished);
                device.build_output_stream(
                    &stream_config,
                    move |data: &mut [$fmt], _: &cpal::OutputCallbackInfo| {
                        let mut cursor = cursor.lock().unwrap();
                        fill_output(&track, &mut cursor, channels, data, &finished);
                        frame_pos.store(cursor.pos as usize, Ordering::Relaxed);
                    },
                    err_fn,
                    None,
                )?
            }};
        }

        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream!(f32),
            cpal::SampleFormat::I16 => build_stream!(i16),
            cpal::SampleFormat::U16 => build_stream!(u16),
            fmt => return Err(PlaybackError::Format(fmt)),
        };
        stream.play()?;

        Ok(Self {
            track,
            frame_pos,
            finished,
            _stream: stream,
        })
    }

    pub fn track(&self) -> &Arc<Track> {
        &self.track
    }

    /// Current playback position in track frames.
    pub fn position_frames(&self) -> usize {
        self.frame_pos.load(Ordering::Relaxed).min(self.track.frames())
    }

    /// True once the cursor has passed the last frame.
    pub fn finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }

    /// The last `n` mono samples ending at the playback cursor,
    /// silence-padded at the front near the start of the track.
    pub fn mono_window(&self, n: usize) -> Vec<f32> {
        window_ending_at(&self.track.mono, self.position_frames(), n)
    }
}

fn window_ending_at(mono: &[f32], end: usize, n: usize) -> Vec<f32> {
    let end = end.min(mono.len());
    let start = end.saturating_sub(n);
    let mut window = vec![0.0; n - (end - start)];
    window.extend_from_slice(&mono[start..end]);
    window
}

/// Fill one output buffer from the track, lerping between frames when the
/// device rate differs from the track rate. Emits silence and latches the
/// finished flag once the cursor runs off the end.
fn fill_output<T: SizedSample + FromSample<f32>>(
    track: &Track,
    cursor: &mut Cursor,
    channels: usize,
    data: &mut [T],
    finished: &AtomicBool,
) {
    let frames = track.frames();
    let track_channels = track.channels as usize;
    for out_frame in data.chunks_mut(channels.max(1)) {
        let i = cursor.pos as usize;
        if i + 1 >= frames {
            finished.store(true, Ordering::Relaxed);
            for slot in out_frame.iter_mut() {
                *slot = T::from_sample(0.0f32);
            }
            continue;
        }
        let frac = (cursor.pos - i as f64) as f32;
        if track_channels == channels {
            for (ch, slot) in out_frame.iter_mut().enumerate() {
                let a = track.interleaved[i * track_channels + ch];
                let b = track.interleaved[(i + 1) * track_channels + ch];
                *slot = T::from_sample(a + (b - a) * frac);
            }
        } else {
            // Channel layouts differ; fold to mono and replicate.
            let a = track.mono[i];
            let b = track.mono[i + 1];
            let v = a + (b - a) * frac;
            for slot in out_frame.iter_mut() {
                *slot = T::from_sample(v);
            }
        }
        cursor.pos += cursor.step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::atomic::AtomicBool;

    fn write_wav(path: &Path, channels: u16, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn decodes_silent_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silence.wav");
        write_wav(&path, 1, &vec![0i16; 44_100 * 5]);

        let track = Track::decode(&path).unwrap();
        assert_eq!(track.sample_rate, 44_100);
        assert_eq!(track.channels, 1);
        assert_eq!(track.frames(), 44_100 * 5);
        assert_relative_eq!(track.duration_secs(), 5.0, epsilon = 1e-3);
        assert!(track.mono.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn stereo_folds_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        // Opposite-phase channels cancel in the fold-down.
        let mut samples = Vec::new();
        for _ in 0..1000 {
            samples.push(i16::MAX / 2);
            samples.push(-(i16::MAX / 2));
        }
        write_wav(&path, 2, &samples);

        let track = Track::decode(&path).unwrap();
        assert_eq!(track.channels, 2);
        assert_eq!(track.frames(), 1000);
        assert!(track.mono.iter().all(|&s| s.abs() < 1e-3));
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let err = Track::decode(Path::new("/definitely/not/here.wav")).unwrap_err();
        assert!(matches!(err, PlaybackError::Open { .. }));
    }

    #[test]
    fn window_pads_with_silence_at_track_start() {
        let mono = vec![0.5; 10];
        let window = window_ending_at(&mono, 4, 8);
        assert_eq!(window.len(), 8);
        assert!(window[..4].iter().all(|&s| s == 0.0));
        assert!(window[4..].iter().all(|&s| s == 0.5));

        let full = window_ending_at(&mono, 10, 8);
        assert!(full.iter().all(|&s| s == 0.5));

        let clamped = window_ending_at(&mono, 99, 4);
        assert_eq!(clamped.len(), 4);
    }

    #[test]
    fn fill_output_latches_finished_and_goes_silent() {
        let track = Track {
            sample_rate: 100,
            channels: 1,
            interleaved: vec![0.25; 10],
            mono: vec![0.25; 10],
        };
        let mut cursor = Cursor { pos: 0.0, step: 1.0 };
        let finished = AtomicBool::new(false);
        let mut data = [0.0f32; 32]; // 16 stereo frames, track has 10
        fill_output(&track, &mut cursor, 2, &mut data, &finished);
        assert!(finished.load(Ordering::Relaxed));
        assert_eq!(data[0], 0.25);
        assert_eq!(data[1], 0.25); // mono replicated to both channels
        assert_eq!(data[30], 0.0);
        assert_eq!(data[31], 0.0);
    }

    #[test]
    fn fill_output_resamples_linearly() {
        let track = Track {
            sample_rate: 100,
            channels: 1,
            interleaved: vec![0.0, 1.0, 0.0, 1.0],
            mono: vec![0.0, 1.0, 0.0, 1.0],
        };
        let mut cursor = Cursor { pos: 0.0, step: 0.5 };
        let finished = AtomicBool::new(false);
        let mut data = [0.0f32; 4];
        fill_output(&track, &mut cursor, 1, &mut data, &finished);
        assert_relative_eq!(data[0], 0.0);
        assert_relative_eq!(data[1], 0.5); // halfway between frames 0 and 1
        assert_relative_eq!(data[2], 1.0);
        assert_relative_eq!(data[3], 0.5);
    }
}
