// ============================================================
// Layer 5: Partitioned Training Loop
// ============================================================
// The dataset is cut into `parts` contiguous partitions. Each
// partition is trained for `epochs` epochs before the next one
// starts, and every completed epoch is checkpointed:
//
//   part 1: epoch 1 → ckpt, epoch 2 → ckpt, ... epoch E → ckpt
//   part 2: epoch 1 → ckpt, ...
//
// A resumed run restores model + optimizer state from a
// checkpoint and continues at the position after it.
//
// Training uses TrainBackend (autodiff). The final model is saved
// from model.valid(), i.e. on the inner backend with dropout off.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use indicatif::{ProgressBar, ProgressStyle};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::AudioBatcher,
    dataset::AudioDataset,
    features::FeatureExtractor,
    partition::{epoch_shuffle_seed, partition_range, validate_partitioning},
};
use crate::domain::{error::TrainError, sample::SampleIndex};
use crate::infra::{
    checkpoint::{CheckpointManager, CheckpointState, ModelArtifact, TrainingParams, ARTIFACT_STEM},
    metrics::{AccuracyTracker, EpochMetrics, MetricsLogger, TrainingMetrics},
};
use crate::ml::{
    model::{correct_predictions, ClassifierConfig, SpeechClassifier},
    schedule::{positions_from, resume_position, TrainPosition},
    TrainBackend,
};

/// What a finished run hands back to the application layer
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub metrics:     TrainingMetrics,
    /// Manifests written by this run, in order
    pub checkpoints: Vec<PathBuf>,
    /// Path of pronunciation_model.json
    pub artifact:    PathBuf,
}

/// Result of the epoch loop, before the final model is written
pub struct TrainOutcome<B: AutodiffBackend> {
    pub model:        SpeechClassifier<B>,
    pub classifier:   ClassifierConfig,
    pub tracker:      AccuracyTracker,
    pub checkpoints:  Vec<PathBuf>,
}

/// Train on the default device of the configured backend and save
/// the final model next to the checkpoints.
pub fn run_training(
    cfg:          &TrainConfig,
    index:        &SampleIndex,
    ckpt_manager: &CheckpointManager,
) -> Result<TrainingReport> {
    let device = <TrainBackend as Backend>::Device::default();
    tracing::info!("Using device: {:?}", device);

    let outcome = train_loop::<TrainBackend>(cfg, index, ckpt_manager, &device)?;
    let metrics = outcome.tracker.summary();

    let artifact = ModelArtifact {
        model_file:       ARTIFACT_STEM.to_string(),
        training_params:  TrainingParams::from(cfg),
        accuracy_metrics: metrics,
        labels:           index.vocabulary.clone(),
        features:         cfg.features.clone(),
        classifier:       outcome.classifier,
    };
    let artifact = ckpt_manager.save_artifact(&outcome.model.valid(), &artifact)?;

    Ok(TrainingReport { metrics, checkpoints: outcome.checkpoints, artifact })
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:          &TrainConfig,
    index:        &SampleIndex,
    ckpt_manager: &CheckpointManager,
    device:       &B::Device,
) -> Result<TrainOutcome<B>> {
    cfg.validate()?;
    validate_partitioning(index.len(), cfg.parts)?;
    B::seed(cfg.seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let extractor = Arc::new(FeatureExtractor::new(cfg.features.clone())?);
    let [_, n_mels, frames] = extractor.shape();
    let num_classes = index.vocabulary.len();

    let classifier = ClassifierConfig::new(num_classes, n_mels, frames)
        .with_hidden_size(cfg.hidden_size)
        .with_dropout(cfg.dropout);
    let mut model: SpeechClassifier<B> = classifier.init(device);
    tracing::info!(
        "Model ready: {} classes, input [1, {}, {}], dense {} → {}",
        num_classes, n_mels, frames, classifier.flattened_width(), cfg.hidden_size,
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    let mut optim = AdamConfig::new().with_epsilon(1e-8).init::<B, SpeechClassifier<B>>();

    // ── Resume ────────────────────────────────────────────────────────────────
    let mut tracker = AccuracyTracker::new();
    let mut start   = Some(TrainPosition::start());

    if let Some(path) = &cfg.resume_from {
        let manifest = CheckpointManager::load_manifest(path)?;
        manifest.validate(path, &classifier, &cfg.features, cfg.parts)?;
        (model, optim) = CheckpointManager::restore(path, &manifest, model, optim, device)?;

        tracker = AccuracyTracker::resume(manifest.best_accuracy, manifest.accuracy_history.clone());
        start   = resume_position(manifest.position(), cfg.epochs, cfg.parts);
        match start {
            Some(next) => tracing::info!(
                "Resuming from '{}' ({}), continuing at {}",
                path.display(), manifest.position(), next,
            ),
            None => tracing::info!(
                "Checkpoint '{}' already covers the whole schedule; nothing left to train",
                path.display(),
            ),
        }
    }

    let metrics_log = MetricsLogger::new(ckpt_manager.dir())?;
    let batcher     = AudioBatcher::<B>::new(extractor, cfg.workers, device.clone());
    let mut checkpoints = Vec::new();

    // ── Partition / epoch loop ────────────────────────────────────────────────
    let Some(first) = start else {
        return Ok(TrainOutcome { model, classifier, tracker, checkpoints });
    };

    for position in positions_from(first, cfg.epochs, cfg.parts) {
        let range = partition_range(index.len(), cfg.parts, position.partition);
        if position.epoch == 0 || position == first {
            tracing::info!(
                "Part {}/{}: samples {}..{} ({} files)",
                position.partition + 1, cfg.parts, range.start, range.end, range.len(),
            );
        }

        let dataset     = AudioDataset::from_slice(&index.records[range]);
        let num_batches = dataset.sample_count().div_ceil(cfg.batch_size);
        let loader = DataLoaderBuilder::new(batcher.clone())
            .batch_size(cfg.batch_size)
            .shuffle(epoch_shuffle_seed(cfg.seed, position.partition, position.epoch))
            .num_workers(1)
            .build(dataset);

        let bar = epoch_progress(cfg, position, num_batches)?;

        let mut loss_sum = 0.0f64;
        let mut acc_sum  = 0.0f64;
        let mut batches  = 0usize;
        let mut skipped  = 0usize;

        for (batch_idx, batch) in loader.iter().enumerate() {
            bar.inc(1);
            // None: no sample of the batch could be decoded
            let Some(batch) = batch else { continue };
            skipped += batch.skipped;

            let size = batch.size();
            let (loss, scores) = model.forward_loss(batch.features, batch.labels.clone());

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            if !loss_val.is_finite() {
                bar.abandon();
                return Err(TrainError::OptimizerDivergence {
                    partition: position.partition,
                    epoch:     position.epoch,
                    batch:     batch_idx,
                    loss:      loss_val,
                }
                .into());
            }

            let correct = correct_predictions(scores, batch.labels);
            loss_sum += loss_val;
            acc_sum  += correct as f64 * 100.0 / size as f64;
            batches  += 1;

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);

            bar.set_message(format!(
                "loss={:.4} acc={:.1}%",
                loss_sum / batches as f64,
                acc_sum / batches as f64,
            ));
        }

        if batches == 0 {
            bar.abandon();
            return Err(TrainError::NoUsableSamples { partition: position.partition }.into());
        }
        if skipped > 0 {
            tracing::warn!("{}: skipped {} undecodable samples", position, skipped);
        }

        let loss     = loss_sum / batches as f64;
        let accuracy = acc_sum / batches as f64;
        let best     = tracker.record(accuracy);
        bar.finish_and_clear();

        tracing::info!(
            "Part {}/{} | Epoch {:>3}/{} | loss={:.4} | acc={:.2}% | best={:.2}%",
            position.partition + 1, cfg.parts, position.epoch + 1, cfg.epochs,
            loss, accuracy, best,
        );

        metrics_log.log(&EpochMetrics {
            partition:     position.partition + 1,
            epoch:         position.epoch + 1,
            loss,
            accuracy,
            best_accuracy: best,
        })?;

        let state = CheckpointState {
            position,
            loss,
            accuracy,
            tracker:    &tracker,
            classifier: &classifier,
            features:   &cfg.features,
        };
        let path  = ckpt_manager
            .save_checkpoint(&state, &model, &optim)
            .with_context(|| format!("Saving checkpoint for {position}"))?;
        tracing::info!("Checkpoint saved: '{}'", path.display());
        checkpoints.push(path);
    }

    tracing::info!("Training complete!");
    Ok(TrainOutcome { model, classifier, tracker, checkpoints })
}

/// Per-epoch bar: batches done, running loss/accuracy, overall percent
fn epoch_progress(cfg: &TrainConfig, position: TrainPosition, num_batches: usize) -> Result<ProgressBar> {
    if cfg.no_progress {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new(num_batches as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{prefix} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos:>4}/{len:4} {msg}")?
            .progress_chars("#>-"),
    );
    bar.set_prefix(format!(
        "P{}/{} E{}/{} ({:.1}% total)",
        position.partition + 1,
        cfg.parts,
        position.epoch + 1,
        cfg.epochs,
        position.progress_percent(cfg.epochs, cfg.parts),
    ));
    Ok(bar)
}
