// ============================================================
// Layer 5: Inferencer
// ============================================================
// Loads pronunciation_model.json + weights and names the letter
// spoken in a single clip. Runs on InferBackend, so dropout is off.

use std::path::Path;

use anyhow::{Context, Result};
use burn::{prelude::*, tensor::activation::softmax};

use crate::data::features::FeatureExtractor;
use crate::domain::{sample::LabelVocabulary, traits::LabelScore};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{model::SpeechClassifier, InferBackend};

pub struct Inferencer {
    model:     SpeechClassifier<InferBackend>,
    labels:    LabelVocabulary,
    extractor: FeatureExtractor,
    device:    <InferBackend as Backend>::Device,
}

impl Inferencer {
    pub fn from_model_dir(dir: &Path) -> Result<Self> {
        let device   = <InferBackend as Backend>::Device::default();
        let artifact = CheckpointManager::load_artifact(dir)?;
        let model    = CheckpointManager::load_model::<InferBackend>(dir, &artifact, &device)?;

        if artifact.classifier.num_classes != artifact.labels.len() {
            anyhow::bail!(
                "Model has {} outputs but {} labels",
                artifact.classifier.num_classes,
                artifact.labels.len()
            );
        }
        let extractor = FeatureExtractor::new(artifact.features)?;

        tracing::info!(
            "Model loaded from '{}' ({} classes)",
            dir.display(),
            artifact.labels.len()
        );
        Ok(Self { model, labels: artifact.labels, extractor, device })
    }

    /// Class probabilities for one clip, in vocabulary order.
    pub fn probabilities(&self, audio: &Path) -> Result<Vec<f32>> {
        let values = self.extractor.extract_file(audio)?;
        let [channels, mels, frames] = self.extractor.shape();

        let input = Tensor::<InferBackend, 4>::from_floats(
            TensorData::new(values, [1, channels, mels, frames]),
            &self.device,
        );
        let scores = self.model.forward(input);
        let probs  = softmax(scores, 1)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Reading probabilities: {e:?}"))?;
        Ok(probs)
    }

    /// The `top_k` most likely labels, most likely first.
    pub fn predict(&self, audio: &Path, top_k: usize) -> Result<Vec<LabelScore>> {
        let probs = self
            .probabilities(audio)
            .with_context(|| format!("Predicting '{}'", audio.display()))?;

        let mut ranked: Vec<(usize, f32)> = probs.into_iter().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let scores: Vec<LabelScore> = ranked
            .into_iter()
            .take(top_k.max(1))
            .filter_map(|(i, probability)| {
                self.labels
                    .name_of(i)
                    .map(|label| LabelScore { label: label.to_string(), probability })
            })
            .collect();

        if let Some(best) = scores.first() {
            tracing::debug!("Best label '{}' p={:.4}", best.label, best.probability);
        }
        Ok(scores)
    }
}
