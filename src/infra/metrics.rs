// ============================================================
// Layer 6: Training Metrics
// ============================================================
// Two records are kept:
//
//   metrics.csv            one row per completed epoch
//     part,epoch,loss,accuracy,best_accuracy
//     1,1,3.291200,4.687500,4.687500
//
//   training_metrics.json  written once at the end of the run
//     { "best_accuracy": .., "final_accuracy": .., "average_accuracy": .. }
//
// Accuracies are percentages in [0, 100].

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// 1-based part number
    pub partition: usize,

    /// 1-based epoch number within the part
    pub epoch: usize,

    /// Mean cross-entropy over the epoch's batches
    pub loss: f64,

    /// Mean batch accuracy in percent
    pub accuracy: f64,

    /// Best epoch accuracy of the run so far
    pub best_accuracy: f64,
}

/// Run-level summary
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub best_accuracy:    f64,
    pub final_accuracy:   f64,
    pub average_accuracy: f64,
}

/// Accumulates epoch accuracies over the lifetime of a run,
/// including epochs completed before a resume.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccuracyTracker {
    best:    f64,
    history: Vec<f64>,
}

impl AccuracyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue from a checkpoint's best accuracy and history
    pub fn resume(best: f64, history: Vec<f64>) -> Self {
        let best = history.iter().copied().fold(best, f64::max);
        Self { best, history }
    }

    /// Record one epoch; returns the running best
    pub fn record(&mut self, accuracy: f64) -> f64 {
        self.history.push(accuracy);
        if accuracy > self.best {
            self.best = accuracy;
        }
        self.best
    }

    pub fn best(&self) -> f64 {
        self.best
    }

    pub fn history(&self) -> &[f64] {
        &self.history
    }

    pub fn summary(&self) -> TrainingMetrics {
        let final_accuracy = self.history.last().copied().unwrap_or(0.0);
        let average_accuracy = if self.history.is_empty() {
            0.0
        } else {
            self.history.iter().sum::<f64>() / self.history.len() as f64
        };
        TrainingMetrics { best_accuracy: self.best, final_accuracy, average_accuracy }
    }
}

/// Appends epoch metrics to a CSV file
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger.
    /// Writes the CSV header if the file doesn't exist yet, so a
    /// resumed run keeps appending to the same log.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "part,epoch,loss,accuracy,best_accuracy")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{},{:.6},{:.6},{:.6}",
            m.partition, m.epoch, m.loss, m.accuracy, m.best_accuracy,
        )?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
