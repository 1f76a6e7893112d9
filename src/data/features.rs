// ============================================================
// Layer 4: Feature Extractor
// ============================================================
// Turns one audio file into a fixed-shape, per-sample normalised
// log-mel spectrogram:
//
//   .wav ─► decode (mono) ─► resample ─► pad / truncate
//        ─► power mel spectrogram ─► dB (ref = clip max)
//        ─► z-score with the clip's own mean / std
//
// Output shape is always [1, n_mels, frames], whatever the length
// of the original recording.

use std::{path::Path, thread};

use serde::{Deserialize, Serialize};

use crate::data::audio::{decode_wav, fit_length, resample};
use crate::data::mel::{power_to_db, MelSpectrogram};
use crate::domain::error::TrainError;
use crate::domain::sample::SampleRecord;

/// Standard deviations below this are treated as a silent clip
const MIN_STD: f32 = 1e-8;

// ─── Feature Configuration ───────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub sample_rate:   u32,
    pub duration_secs: f32,
    pub n_fft:         usize,
    pub hop_length:    usize,
    pub n_mels:        usize,
    /// Dynamic range kept below the loudest bin, in dB
    pub top_db:        Option<f32>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sample_rate:   22050,
            duration_secs: 1.0,
            n_fft:         2048,
            hop_length:    512,
            n_mels:        128,
            top_db:        Some(80.0),
        }
    }
}

impl FeatureConfig {
    /// Raw waveform length every clip is padded or truncated to
    pub fn num_samples(&self) -> usize {
        (self.sample_rate as f64 * self.duration_secs as f64).round() as usize
    }

    pub fn num_frames(&self) -> usize {
        1 + self.num_samples() / self.hop_length.max(1)
    }

    /// Tensor shape of one sample: [channels, mel bins, frames]
    pub fn shape(&self) -> [usize; 3] {
        [1, self.n_mels, self.num_frames()]
    }

    pub fn validate(&self) -> Result<(), TrainError> {
        let fail = |msg: &str| Err(TrainError::InvalidConfig(msg.to_string()));
        if self.sample_rate == 0 {
            return fail("sample rate must be positive");
        }
        if !(self.duration_secs > 0.0) {
            return fail("duration must be positive");
        }
        if self.n_fft < 2 {
            return fail("n_fft must be at least 2");
        }
        if self.hop_length == 0 {
            return fail("hop length must be positive");
        }
        if self.n_mels == 0 {
            return fail("n_mels must be positive");
        }
        if self.num_samples() == 0 {
            return fail("duration is shorter than one sample");
        }
        Ok(())
    }
}

/// Normalised spectrogram of one clip plus its label.
/// `values` is laid out mel-major: values[m * frames + t].
#[derive(Debug, Clone)]
pub struct FeatureSample {
    pub values: Vec<f32>,
    pub label:  usize,
}

// ─── Feature Extractor ───────────────────────────────────────────────────────
/// Holds only read-only state, so `extract` can run on many
/// threads at once.
pub struct FeatureExtractor {
    config: FeatureConfig,
    mel:    MelSpectrogram,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> Result<Self, TrainError> {
        config.validate()?;
        let mel = MelSpectrogram::new(
            config.sample_rate,
            config.n_fft,
            config.hop_length,
            config.n_mels,
        );
        Ok(Self { config, mel })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn shape(&self) -> [usize; 3] {
        self.config.shape()
    }

    /// Extract the features of one labelled record
    pub fn extract(&self, record: &SampleRecord) -> Result<FeatureSample, TrainError> {
        let values = self.extract_file(&record.path)?;
        Ok(FeatureSample { values, label: record.label })
    }

    /// Extract the normalised spectrogram of a single file
    pub fn extract_file(&self, path: &Path) -> Result<Vec<f32>, TrainError> {
        let cfg   = &self.config;
        let audio = decode_wav(path, Some(cfg.duration_secs))?;
        let samples = resample(&audio.samples, audio.sample_rate, cfg.sample_rate)
            .map_err(|reason| TrainError::CorruptAudioFile {
                path: path.to_path_buf(),
                reason: format!("resampling failed: {reason}"),
            })?;
        self.extract_waveform(path, fit_length(samples, cfg.num_samples()))
    }

    /// Spectrogram of an already decoded waveform at the target rate.
    /// `origin` is only used in error messages.
    pub fn extract_waveform(&self, origin: &Path, waveform: Vec<f32>) -> Result<Vec<f32>, TrainError> {
        if let Some(bad) = waveform.iter().position(|s| !s.is_finite()) {
            return Err(TrainError::DegenerateSpectrogram {
                path:   origin.to_path_buf(),
                reason: format!("non-finite sample at index {bad}"),
            });
        }
        let waveform = fit_length(waveform, self.config.num_samples());

        let power = self.mel.power_mel(&waveform);
        let mut db = power_to_db(&power, self.config.top_db);
        if db.iter().any(|v| !v.is_finite()) {
            return Err(TrainError::DegenerateSpectrogram {
                path:   origin.to_path_buf(),
                reason: "non-finite value after dB scaling".to_string(),
            });
        }

        if !normalize_in_place(&mut db) {
            tracing::debug!("Zero-variance spectrogram for '{}'; using zeros", origin.display());
        }
        tracing::trace!(path = %origin.display(), shape = ?self.shape(), "features extracted");
        Ok(db)
    }

    /// Extract many records on up to `workers` scoped threads.
    /// Results come back in the same order as `records`.
    pub fn extract_many(
        &self,
        records: &[SampleRecord],
        workers: usize,
    ) -> Vec<Result<FeatureSample, TrainError>> {
        let workers = workers.clamp(1, records.len().max(1));
        if workers == 1 {
            return records.iter().map(|r| self.extract(r)).collect();
        }

        let chunk_size = records.len().div_ceil(workers);
        thread::scope(|scope| {
            let handles: Vec<_> = records
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || chunk.iter().map(|r| self.extract(r)).collect::<Vec<_>>())
                })
                .collect();
            handles
                .into_iter()
                .zip(records.chunks(chunk_size))
                .flat_map(|(handle, chunk)| match handle.join() {
                    Ok(results) => results,
                    Err(_) => chunk
                        .iter()
                        .map(|r| {
                            Err(TrainError::CorruptAudioFile {
                                path:   r.path.clone(),
                                reason: "feature extraction thread panicked".to_string(),
                            })
                        })
                        .collect(),
                })
                .collect()
        })
    }
}

/// Subtract the mean and divide by the population std.
/// Returns false (and writes zeros) when the std is ~0.
fn normalize_in_place(values: &mut [f32]) -> bool {
    if values.is_empty() {
        return false;
    }
    let n    = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var  = values.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
    let std  = var.sqrt() as f32;

    if !(std > MIN_STD) {
        values.iter_mut().for_each(|v| *v = 0.0);
        return false;
    }
    let mean = mean as f32;
    values.iter_mut().for_each(|v| *v = (*v - mean) / std);
    true
}
