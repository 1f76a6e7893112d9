// ============================================================
// Layer 3: Error Taxonomy
// ============================================================
// Structural errors (missing dataset, bad checkpoint, bad config)
// abort a run. The feature extractor only produces per-sample errors
// (CorruptAudioFile, DegenerateSpectrogram); the batcher logs and
// skips those samples.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrainError {
    /// Dataset root is missing, not a directory, or has no classes/files
    #[error("dataset not found at '{path}': {reason}")]
    DatasetNotFound { path: PathBuf, reason: String },

    /// One audio file could not be opened or decoded
    #[error("corrupt audio file '{path}': {reason}")]
    CorruptAudioFile { path: PathBuf, reason: String },

    /// The spectrogram of one sample contains non-finite values
    #[error("degenerate spectrogram for '{path}': {reason}")]
    DegenerateSpectrogram { path: PathBuf, reason: String },

    /// A checkpoint exists but cannot be read, parsed, or does not match
    #[error("cannot load checkpoint '{path}': {reason}")]
    CheckpointLoad { path: PathBuf, reason: String },

    /// Checkpoints are immutable; a second write to the same name is refused
    #[error("checkpoint '{0}' already exists; use a fresh output directory or --resume")]
    CheckpointExists(PathBuf),

    /// The training loss became NaN or infinite
    #[error(
        "loss diverged to {loss} at part {}, epoch {}, batch {}",
        .partition + 1, .epoch + 1, .batch + 1
    )]
    OptimizerDivergence { partition: usize, epoch: usize, batch: usize, loss: f64 },

    /// Every sample of a partition failed feature extraction
    #[error("no usable samples in part {}", .partition + 1)]
    NoUsableSamples { partition: usize },

    #[error("invalid training configuration: {0}")]
    InvalidConfig(String),

    /// Writing a model/optimizer record or artifact failed
    #[error("cannot persist '{path}': {reason}")]
    Persist { path: PathBuf, reason: String },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TrainError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divergence_message_is_one_based() {
        let err = TrainError::OptimizerDivergence {
            partition: 0,
            epoch:     2,
            batch:     4,
            loss:      f64::NAN,
        };
        assert_eq!(err.to_string(), "loss diverged to NaN at part 1, epoch 3, batch 5");
    }
}
