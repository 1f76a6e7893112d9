// ============================================================
// Layer 2: TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the configuration      (Layer 2)
//   Step 2: Index the dataset directory     (Layer 4 - data)
//   Step 3: Save the config snapshot        (Layer 6 - infra)
//   Step 4: Run the partitioned training    (Layer 5 - ml)
//   Step 5: Save the metrics summary        (Layer 6 - infra)
//
// Reference: Burn Book §5 (Training)

use std::{path::PathBuf, thread};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::{features::FeatureConfig, indexer::DirectoryIndexer};
use crate::domain::{error::TrainError, traits::SampleSource};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::trainer::{run_training, TrainingReport};

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings for a training run. Saved to train_config.json so a run
// can be reproduced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub dataset_dir: PathBuf,
    /// Checkpoints, metrics and the final model are written here
    pub output_dir:  PathBuf,
    pub epochs:      usize,
    pub batch_size:  usize,
    pub lr:          f64,
    /// Number of contiguous dataset partitions trained in sequence
    pub parts:       usize,
    /// Manifest of the checkpoint to continue from
    pub resume_from: Option<PathBuf>,
    pub seed:        u64,
    /// Feature extraction threads per batch
    pub workers:     usize,
    pub hidden_size: usize,
    pub dropout:     f64,
    #[serde(default)]
    pub no_progress: bool,
    pub features:    FeatureConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            dataset_dir: PathBuf::from("dataset"),
            output_dir:  PathBuf::from("models"),
            epochs:      50,
            batch_size:  32,
            lr:          1e-3,
            parts:       5,
            resume_from: None,
            seed:        42,
            workers:     default_workers(),
            hidden_size: 512,
            dropout:     0.5,
            no_progress: false,
            features:    FeatureConfig::default(),
        }
    }
}

/// One extraction thread per available core
pub fn default_workers() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

impl TrainConfig {
    /// Checks that don't need the dataset. Partition count against
    /// the number of samples is checked once the dataset is indexed.
    pub fn validate(&self) -> Result<(), TrainError> {
        let invalid = |msg: &str| Err(TrainError::InvalidConfig(msg.to_string()));

        if self.epochs == 0 {
            return invalid("epochs must be at least 1");
        }
        if self.batch_size == 0 {
            return invalid("batch size must be at least 1");
        }
        if self.parts == 0 {
            return invalid("parts must be at least 1");
        }
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return invalid("learning rate must be a positive number");
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return invalid("dropout must be in [0, 1)");
        }
        if self.hidden_size == 0 {
            return invalid("hidden size must be at least 1");
        }
        self.features.validate()
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the config and runs the full training pipeline.
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainingReport> {
        let cfg = &self.config;

        // ── Step 1: Validate ──────────────────────────────────────────────────
        cfg.validate()?;

        // ── Step 2: Index dataset ─────────────────────────────────────────────
        tracing::info!("Indexing dataset '{}'", cfg.dataset_dir.display());
        let index = DirectoryIndexer::new(&cfg.dataset_dir).index()?;
        tracing::info!(
            "Found {} samples in {} classes",
            index.len(),
            index.vocabulary.len()
        );
        for (name, count) in index.class_counts() {
            tracing::debug!("  {:<12} {} files", name, count);
        }

        // ── Step 3: Save config ───────────────────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.output_dir)?;
        ckpt_manager.save_config(cfg)?;

        // ── Step 4: Train (Layer 5) ───────────────────────────────────────────
        let report = run_training(cfg, &index, &ckpt_manager)?;

        // ── Step 5: Metrics summary ───────────────────────────────────────────
        let metrics_path = ckpt_manager
            .save_metrics(&report.metrics)
            .context("Saving training metrics")?;

        tracing::info!(
            "Best accuracy {:.2}% | final {:.2}% | average {:.2}%",
            report.metrics.best_accuracy,
            report.metrics.final_accuracy,
            report.metrics.average_accuracy,
        );
        tracing::info!("Model saved to '{}'", report.artifact.display());
        tracing::info!("Metrics saved to '{}'", metrics_path.display());

        Ok(report)
    }
}
