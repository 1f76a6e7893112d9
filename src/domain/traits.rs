// ============================================================
// Layer 3: Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits:
//   - DirectoryIndexer implements SampleSource
//   - PredictUseCase   implements LabelPredictor

use std::path::Path;

use crate::domain::error::TrainError;
use crate::domain::sample::SampleIndex;

// ─── SampleSource ─────────────────────────────────────────────────────────────
/// Anything that can enumerate labelled audio samples.
pub trait SampleSource {
    /// Build the label vocabulary and the ordered sample list.
    fn index(&self) -> Result<SampleIndex, TrainError>;
}

// ─── LabelPredictor ───────────────────────────────────────────────────────────
/// One scored class for a clip.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    pub label:       String,
    pub probability: f32,
}

/// Anything that can name the letter pronounced in an audio file.
pub trait LabelPredictor {
    /// Return the `top_k` most likely labels, most likely first.
    fn predict(&self, audio: &Path, top_k: usize) -> anyhow::Result<Vec<LabelScore>>;
}
