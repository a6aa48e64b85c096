//! Signal sampler: turns the samples currently being played into the
//! 0-255 magnitude buffer the renderer reads once per frame.

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::config::{Mode, BIN_COUNT, FFT_SIZE};

/// Frame-over-frame smoothing applied to spectrum magnitudes.
const SMOOTHING: f32 = 0.8;
/// dB range mapped onto the 0-255 byte scale.
const MIN_DB: f32 = -100.0;
const MAX_DB: f32 = -30.0;

pub struct Analyser {
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    hann: Vec<f32>,
    smoothed: Vec<f32>,
    data: Vec<u8>,
}

impl Analyser {
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);
        let hann = (0..FFT_SIZE).map(|i| hann_window(i, FFT_SIZE)).collect();
        Self {
            fft,
            scratch: vec![Complex::new(0.0, 0.0); FFT_SIZE],
            hann,
            smoothed: vec![0.0; BIN_COUNT],
            data: vec![0; BIN_COUNT],
        }
    }

    /// Refresh the byte buffer from the latest playback window.
    ///
    /// `window` holds the most recent mono samples ending at the playback
    /// cursor, ideally `FFT_SIZE` of them; shorter windows are treated as
    /// silence-padded at the front. Waveform mode fills time-domain values
    /// centered at 128, everything else dB-scaled spectrum magnitudes.
    pub fn refresh(&mut self, window: &[f32], mode: Mode) {
        if mode.uses_time_domain() {
            self.fill_time_domain(window);
        } else {
            self.fill_frequency(window);
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn fill_time_domain(&mut self, window: &[f32]) {
        let tail_len = window.len().min(BIN_COUNT);
        let tail = &window[window.len() - tail_len..];
        let pad = BIN_COUNT - tail_len;
        self.data[..pad].fill(128);
        for (slot, &s) in self.data[pad..].iter_mut().zip(tail) {
            *slot = (s.clamp(-1.0, 1.0) * 128.0 + 128.0).clamp(0.0, 255.0) as u8;
        }
    }

    fn fill_frequency(&mut self, window: &[f32]) {
        let tail_len = window.len().min(FFT_SIZE);
        let tail = &window[window.len() - tail_len..];
        let pad = FFT_SIZE - tail_len;
        for slot in &mut self.scratch[..pad] {
            *slot = Complex::new(0.0, 0.0);
        }
        for (i, &s) in tail.iter().enumerate() {
            let j = pad + i;
            self.scratch[j] = Complex::new(s * self.hann[j], 0.0);
        }

        self.fft.process(&mut self.scratch);

        let norm = 1.0 / FFT_SIZE as f32;
        for k in 0..BIN_COUNT {
            let mag = self.scratch[k].norm() * norm;
            self.smoothed[k] = SMOOTHING * self.smoothed[k] + (1.0 - SMOOTHING) * mag;
            self.data[k] = db_to_byte(20.0 * self.smoothed[k].log10());
        }
    }
}

/// Mean magnitude across the buffer; the loudness proxy that drives
/// rotation speed, ring thickness, particle size, and label size.
pub fn energy(buffer: &[u8]) -> f32 {
    if buffer.is_empty() {
        return 0.0;
    }
    buffer.iter().map(|&v| v as f32).sum::<f32>() / buffer.len() as f32
}

/// Mean magnitude across the lowest 10% of bins (low-frequency proxy).
pub fn bass_energy(buffer: &[u8]) -> f32 {
    let n = (buffer.len() / 10).max(1).min(buffer.len());
    energy(&buffer[..n])
}

fn db_to_byte(db: f32) -> u8 {
    let t = (db - MIN_DB) / (MAX_DB - MIN_DB);
    (t.clamp(0.0, 1.0) * 255.0) as u8
}

fn hann_window(index: usize, size: usize) -> f32 {
    0.5 * (1.0 - (2.0 * PI * index as f32 / (size - 1) as f32).cos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energy_of_extremes() {
        assert_eq!(energy(&[0; BIN_COUNT]), 0.0);
        assert_eq!(energy(&[255; BIN_COUNT]), 255.0);
        assert_eq!(energy(&[]), 0.0);
    }

    #[test]
    fn bass_energy_reads_lowest_bins() {
        let mut buf = vec![0u8; 1000];
        for slot in &mut buf[..100] {
            *slot = 200;
        }
        assert_eq!(bass_energy(&buf), 200.0);
        assert_eq!(energy(&buf), 20.0);
        assert_eq!(bass_energy(&[]), 0.0);
    }

    #[test]
    fn time_domain_silence_centers_at_128() {
        let mut analyser = Analyser::new();
        analyser.refresh(&vec![0.0; FFT_SIZE], Mode::Waveform);
        assert!(analyser.data().iter().all(|&v| v == 128));
    }

    #[test]
    fn time_domain_clamps_full_scale() {
        let mut analyser = Analyser::new();
        analyser.refresh(&vec![1.0; FFT_SIZE], Mode::Waveform);
        assert!(analyser.data().iter().all(|&v| v == 255));
        analyser.refresh(&vec![-1.0; FFT_SIZE], Mode::Waveform);
        assert!(analyser.data().iter().all(|&v| v == 0));
    }

    #[test]
    fn short_window_is_padded_with_silence() {
        let mut analyser = Analyser::new();
        analyser.refresh(&[0.5; 4], Mode::Waveform);
        let data = analyser.data();
        assert!(data[..BIN_COUNT - 4].iter().all(|&v| v == 128));
        assert!(data[BIN_COUNT - 4..].iter().all(|&v| v == 192));
    }

    #[test]
    fn frequency_silence_maps_to_zero() {
        let mut analyser = Analyser::new();
        analyser.refresh(&vec![0.0; FFT_SIZE], Mode::Circular);
        assert!(analyser.data().iter().all(|&v| v == 0));
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let mut analyser = Analyser::new();
        let bin = 64;
        let window: Vec<f32> = (0..FFT_SIZE)
            .map(|i| (2.0 * PI * bin as f32 * i as f32 / FFT_SIZE as f32).sin())
            .collect();
        analyser.refresh(&window, Mode::Circular);
        let data = analyser.data();
        let peak = data.iter().copied().max().unwrap();
        assert!(data[bin] >= peak.saturating_sub(1), "peak should sit at bin {bin}");
        assert!(data[bin] > 200);
        assert!(data[bin + 200] < 50, "far bins should stay near silence");
    }

    #[test]
    fn spectrum_is_smoothed_across_refreshes() {
        let mut analyser = Analyser::new();
        let bin = 32;
        // Quiet tone so the dB mapping stays off the 255 ceiling.
        let window: Vec<f32> = (0..FFT_SIZE)
            .map(|i| 0.2 * (2.0 * PI * bin as f32 * i as f32 / FFT_SIZE as f32).sin())
            .collect();
        analyser.refresh(&window, Mode::Circular);
        let first = analyser.data()[bin];
        for _ in 0..5 {
            analyser.refresh(&vec![0.0; FFT_SIZE], Mode::Circular);
        }
        let decayed = analyser.data()[bin];
        assert!(decayed > 0, "smoothing should keep a trace of the tone");
        assert!(decayed < first);
    }
}
