//! Power mel spectrogram and decibel scaling.
//!
//! Framing follows the centred STFT convention: the waveform is padded
//! with `n_fft / 2` zeros on both sides, so a clip of `n` samples yields
//! `1 + n / hop_length` frames. The filterbank uses the Slaney mel scale
//! (linear below 1 kHz, logarithmic above) with area normalisation.

use std::{f32::consts::PI, sync::Arc};

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Smallest power value considered before taking a logarithm
const AMIN: f32 = 1e-10;

/// Precomputed window, FFT plan and mel filterbank. Read-only after
/// construction, so one instance is shared by every extraction thread.
pub struct MelSpectrogram {
    n_fft:      usize,
    hop_length: usize,
    window:     Vec<f32>,
    fft:        Arc<dyn Fft<f32>>,
    /// Sparse triangular filters: (fft bin, weight)
    filters:    Vec<Vec<(usize, f32)>>,
}

impl MelSpectrogram {
    pub fn new(sample_rate: u32, n_fft: usize, hop_length: usize, n_mels: usize) -> Self {
        let fft = FftPlanner::new().plan_fft_forward(n_fft);
        Self {
            n_fft,
            hop_length,
            window: hann_window(n_fft),
            fft,
            filters: slaney_filterbank(sample_rate, n_fft, n_mels, 0.0, sample_rate as f32 / 2.0),
        }
    }

    pub fn n_mels(&self) -> usize {
        self.filters.len()
    }

    /// Number of frames produced for a clip of `num_samples`
    pub fn num_frames(&self, num_samples: usize) -> usize {
        1 + num_samples / self.hop_length
    }

    /// Power mel spectrogram laid out mel-major: `out[m * frames + t]`.
    pub fn power_mel(&self, audio: &[f32]) -> Vec<f32> {
        let frames = self.num_frames(audio.len());
        let pad    = self.n_fft / 2;
        let n_mels = self.n_mels();
        let mut out    = vec![0.0f32; n_mels * frames];
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.n_fft];
        let mut power  = vec![0.0f32; self.n_fft / 2 + 1];

        for t in 0..frames {
            // Frame t covers padded[t*hop .. t*hop + n_fft]; padded[i] = audio[i - pad]
            let start = t * self.hop_length;
            for (j, slot) in buffer.iter_mut().enumerate() {
                let sample = (start + j)
                    .checked_sub(pad)
                    .and_then(|i| audio.get(i))
                    .copied()
                    .unwrap_or(0.0);
                *slot = Complex::new(sample * self.window[j], 0.0);
            }
            self.fft.process(&mut buffer);
            for (p, c) in power.iter_mut().zip(&buffer) {
                *p = c.norm_sqr();
            }
            for (m, filter) in self.filters.iter().enumerate() {
                out[m * frames + t] = filter.iter().map(|&(bin, w)| power[bin] * w).sum();
            }
        }
        out
    }
}

/// Convert power to decibels referenced to the clip's own maximum,
/// then clamp to `top_db` below that maximum.
pub fn power_to_db(power: &[f32], top_db: Option<f32>) -> Vec<f32> {
    let reference = power.iter().copied().fold(0.0f32, f32::max).max(AMIN);
    let ref_db    = 10.0 * reference.log10();
    let mut db: Vec<f32> = power
        .iter()
        .map(|&p| 10.0 * p.max(AMIN).log10() - ref_db)
        .collect();
    if let Some(top_db) = top_db {
        let floor = db.iter().copied().fold(f32::NEG_INFINITY, f32::max) - top_db;
        for v in &mut db {
            *v = v.max(floor);
        }
    }
    db
}

/// Periodic Hann window
fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / size as f32).cos())
        .collect()
}

const F_SP: f32 = 200.0 / 3.0;
const MIN_LOG_HZ: f32 = 1000.0;
const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;

fn log_step() -> f32 {
    6.4f32.ln() / 27.0
}

fn hz_to_mel(hz: f32) -> f32 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

fn mel_to_hz(mel: f32) -> f32 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        mel * F_SP
    }
}

fn slaney_filterbank(
    sample_rate: u32,
    n_fft: usize,
    n_mels: usize,
    f_min: f32,
    f_max: f32,
) -> Vec<Vec<(usize, f32)>> {
    let n_freqs = n_fft / 2 + 1;
    let fft_freqs: Vec<f32> = (0..n_freqs)
        .map(|k| k as f32 * sample_rate as f32 / n_fft as f32)
        .collect();

    let mel_min = hz_to_mel(f_min);
    let mel_max = hz_to_mel(f_max);
    let mel_hz: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f32 / (n_mels + 1) as f32))
        .collect();

    (0..n_mels)
        .map(|m| {
            let (left, center, right) = (mel_hz[m], mel_hz[m + 1], mel_hz[m + 2]);
            let norm = 2.0 / (right - left);
            fft_freqs
                .iter()
                .enumerate()
                .filter_map(|(bin, &f)| {
                    let lower  = (f - left) / (center - left);
                    let upper  = (right - f) / (right - center);
                    let weight = lower.min(upper).max(0.0) * norm;
                    (weight > 0.0).then_some((bin, weight))
                })
                .collect()
        })
        .collect()
}
