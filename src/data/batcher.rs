// ============================================================
// Layer 4: Audio Batcher
// ============================================================
// Implements Burn's Batcher trait: receives the shuffled sample
// records of one mini-batch, extracts their spectrograms in
// parallel, and stacks them into tensors.
//
//   Input:  Vec of N SampleRecords
//   Output: AudioBatch with features [N, 1, n_mels, frames]
//                          and labels   [N]
//
// Samples that fail to decode are skipped with a warning, so a
// batch may hold fewer than N rows. When nothing decodes the
// batcher yields None and the trainer moves on.

use std::sync::Arc;

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::features::FeatureExtractor;
use crate::domain::sample::SampleRecord;

// ─── AudioBatch ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct AudioBatch<B: Backend> {
    /// Normalised spectrograms, shape [batch, 1, n_mels, frames]
    pub features: Tensor<B, 4>,

    /// Class indices, shape [batch]
    pub labels: Tensor<B, 1, Int>,

    /// Records dropped because extraction failed
    pub skipped: usize,
}

impl<B: Backend> AudioBatch<B> {
    pub fn size(&self) -> usize {
        self.labels.dims()[0]
    }
}

// ─── AudioBatcher ─────────────────────────────────────────────────────────────
#[derive(Clone)]
pub struct AudioBatcher<B: Backend> {
    extractor: Arc<FeatureExtractor>,
    workers:   usize,
    device:    B::Device,
}

impl<B: Backend> AudioBatcher<B> {
    pub fn new(extractor: Arc<FeatureExtractor>, workers: usize, device: B::Device) -> Self {
        Self { extractor, workers: workers.max(1), device }
    }
}

impl<B: Backend> Batcher<SampleRecord, Option<AudioBatch<B>>> for AudioBatcher<B> {
    fn batch(&self, items: Vec<SampleRecord>) -> Option<AudioBatch<B>> {
        let [channels, mels, frames] = self.extractor.shape();

        let mut values  = Vec::with_capacity(items.len() * mels * frames);
        let mut labels  = Vec::with_capacity(items.len());
        let mut skipped = 0usize;

        for result in self.extractor.extract_many(&items, self.workers) {
            match result {
                Ok(sample) => {
                    values.extend_from_slice(&sample.values);
                    labels.push(sample.label as i32);
                }
                Err(e) => {
                    tracing::warn!("Skipping sample: {}", e);
                    skipped += 1;
                }
            }
        }

        let size = labels.len();
        if size == 0 {
            tracing::warn!("Dropping batch: none of its {} samples decoded", skipped);
            return None;
        }
        let features = Tensor::<B, 4>::from_floats(
            TensorData::new(values, [size, channels, mels, frames]),
            &self.device,
        );
        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        tracing::trace!(shape = ?features.dims(), skipped, "batch assembled");
        Some(AudioBatch { features, labels, skipped })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::features::FeatureConfig;
    use burn::backend::NdArray;
    use std::path::Path;

    type TestBackend = NdArray;

    fn extractor() -> Arc<FeatureExtractor> {
        let cfg = FeatureConfig {
            sample_rate:   8000,
            duration_secs: 0.25,
            n_fft:         256,
            hop_length:    128,
            n_mels:        16,
            top_db:        Some(80.0),
        };
        Arc::new(FeatureExtractor::new(cfg).unwrap())
    }

    fn write_tone(path: &Path, freq: f32) {
        let spec = hound::WavSpec {
            channels:        1,
            sample_rate:     8000,
            bits_per_sample: 16,
            sample_format:   hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..2000 {
            let t = i as f32 / 8000.0;
            let s = (2.0 * std::f32::consts::PI * freq * t).sin() * 12000.0;
            writer.write_sample(s as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_batch_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<SampleRecord> = (0..3)
            .map(|i| {
                let path = dir.path().join(format!("{i}.wav"));
                write_tone(&path, 300.0 + 200.0 * i as f32);
                SampleRecord::new(path, i)
            })
            .collect();

        let batcher = AudioBatcher::<TestBackend>::new(extractor(), 2, Default::default());
        let batch   = batcher.batch(records).unwrap();
        assert_eq!(batch.features.dims(), [3, 1, 16, 16]);
        assert_eq!(batch.size(), 3);
        assert_eq!(batch.skipped, 0);

        let labels = batch.labels.into_data().convert::<i64>().to_vec::<i64>().unwrap();
        assert_eq!(labels, vec![0, 1, 2]);
    }

    #[test]
    fn test_corrupt_samples_are_skipped() {
        let dir  = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.wav");
        let bad  = dir.path().join("bad.wav");
        write_tone(&good, 440.0);
        std::fs::write(&bad, b"not audio").unwrap();

        let batcher = AudioBatcher::<TestBackend>::new(extractor(), 1, Default::default());
        let batch   = batcher
            .batch(vec![SampleRecord::new(&bad, 0), SampleRecord::new(&good, 1)])
            .unwrap();
        assert_eq!(batch.size(), 1);
        assert_eq!(batch.skipped, 1);
        assert_eq!(batch.features.dims()[0], 1);
    }

    #[test]
    fn test_undecodable_and_non_finite_clips_are_both_skipped() {
        let dir  = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.wav");
        let nan  = dir.path().join("nan.wav");
        write_tone(&good, 440.0);

        let spec = hound::WavSpec {
            channels:        1,
            sample_rate:     8000,
            bits_per_sample: 32,
            sample_format:   hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&nan, spec).unwrap();
        for _ in 0..2000 {
            writer.write_sample(f32::NAN).unwrap();
        }
        writer.finalize().unwrap();

        let batcher = AudioBatcher::<TestBackend>::new(extractor(), 2, Default::default());
        let batch   = batcher
            .batch(vec![
                SampleRecord::new(&nan, 0),
                SampleRecord::new("missing.wav", 1),
                SampleRecord::new(&good, 2),
            ])
            .unwrap();
        assert_eq!(batch.size(), 1);
        assert_eq!(batch.skipped, 2);
        let labels = batch.labels.into_data().convert::<i64>().to_vec::<i64>().unwrap();
        assert_eq!(labels, vec![2]);
    }

    #[test]
    fn test_all_corrupt_gives_no_batch() {
        let batcher = AudioBatcher::<TestBackend>::new(extractor(), 1, Default::default());
        assert!(batcher.batch(vec![SampleRecord::new("missing.wav", 0)]).is_none());
    }
}
