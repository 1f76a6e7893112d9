// ============================================================
// Layer 2: PredictUseCase
// ============================================================
// Offline, single-file prediction from a trained model directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::traits::{LabelPredictor, LabelScore};
use crate::ml::inferencer::Inferencer;

pub struct PredictUseCase {
    model_dir:  PathBuf,
    inferencer: Inferencer,
}

impl PredictUseCase {
    pub fn new(model_dir: impl Into<PathBuf>) -> Result<Self> {
        let model_dir  = model_dir.into();
        let inferencer = Inferencer::from_model_dir(&model_dir)
            .with_context(|| format!("Loading model from '{}'", model_dir.display()))?;
        Ok(Self { model_dir, inferencer })
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }
}

impl LabelPredictor for PredictUseCase {
    fn predict(&self, audio: &Path, top_k: usize) -> Result<Vec<LabelScore>> {
        if !audio.is_file() {
            anyhow::bail!("Audio file '{}' does not exist", audio.display());
        }
        self.inferencer.predict(audio, top_k)
    }
}
