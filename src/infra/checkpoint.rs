// ============================================================
// Layer 6: Checkpoint Manager
// ============================================================
// Saves and restores training state with Burn's file recorders.
//
// Per completed epoch (never overwritten, full precision):
//   checkpoint_part{P}_epoch{E}.json       manifest, written last
//   checkpoint_part{P}_epoch{E}_model.mpk  classifier weights
//   checkpoint_part{P}_epoch{E}_optim.mpk  Adam moment estimates
//
// Once per run (CompactRecorder, half precision):
//   train_config.json                      configuration snapshot
//   pronunciation_model.json               final artifact metadata
//   pronunciation_model.mpk                final weights
//
// The manifest stores the classifier and feature settings; a resume
// with different shapes is refused before any record is loaded.
//
// P and E are 1-based in file names and 0-based in the manifest.
// A manifest only exists once both record files are on disk, so its
// presence marks a complete checkpoint.

use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    optim::Optimizer,
    prelude::*,
    record::{CompactRecorder, FileRecorder, FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::data::features::FeatureConfig;
use crate::domain::{error::TrainError, sample::LabelVocabulary};
use crate::infra::metrics::{AccuracyTracker, TrainingMetrics};
use crate::ml::model::{ClassifierConfig, SpeechClassifier};
use crate::ml::schedule::TrainPosition;

pub const CHECKPOINT_FORMAT_VERSION: u32 = 2;

/// File stem of the final artifact; the recorder appends its extension
pub const ARTIFACT_STEM: &str = "pronunciation_model";

/// Resume checkpoints keep f32 weights and moments so training
/// continues from exactly the saved state.
pub type CheckpointRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// `dir/stem.<ext>` as written by recorder `R`
pub fn record_file<B: Backend, R: FileRecorder<B>>(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}.{}", R::file_extension()))
}

// ─── Manifest ─────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointManifest {
    pub format_version:   u32,
    /// 0-based partition of the completed epoch
    pub partition:        usize,
    /// 0-based completed epoch within the partition
    pub epoch:            usize,
    pub loss:             f64,
    pub accuracy:         f64,
    pub best_accuracy:    f64,
    /// Accuracy of every epoch of the run up to and including this one
    pub accuracy_history: Vec<f64>,
    pub num_classes:      usize,
    /// Architecture the records were saved from
    pub classifier:       ClassifierConfig,
    /// Spectrogram settings the model was trained on
    pub features:         FeatureConfig,
    /// Record stems relative to the manifest's directory
    pub model_file:       String,
    pub optimizer_file:   String,
}

impl CheckpointManifest {
    pub fn position(&self) -> TrainPosition {
        TrainPosition { partition: self.partition, epoch: self.epoch }
    }

    /// Reject checkpoints that cannot continue the configured run.
    ///
    /// Records are loaded without shape checks, so every setting that
    /// changes a parameter shape or the meaning of the input is
    /// compared here.
    pub fn validate(
        &self,
        path:       &Path,
        classifier: &ClassifierConfig,
        features:   &FeatureConfig,
        parts:      usize,
    ) -> Result<(), TrainError> {
        let fail = |reason: String| Err(TrainError::CheckpointLoad { path: path.to_path_buf(), reason });

        if self.format_version != CHECKPOINT_FORMAT_VERSION {
            return fail(format!(
                "format version {} (expected {})",
                self.format_version, CHECKPOINT_FORMAT_VERSION
            ));
        }
        if self.num_classes != classifier.num_classes {
            return fail(format!(
                "checkpoint has {} classes but the dataset has {}",
                self.num_classes, classifier.num_classes
            ));
        }
        if self.features != *features {
            return fail(format!(
                "checkpoint was trained on features {:?} but the run uses {:?}",
                self.features, features
            ));
        }
        let saved = &self.classifier;
        if (saved.num_classes, saved.input_height, saved.input_width, saved.hidden_size)
            != (classifier.num_classes, classifier.input_height, classifier.input_width, classifier.hidden_size)
        {
            return fail(format!(
                "checkpoint model is {} classes, input {}x{}, hidden {} but the run builds \
                 {} classes, input {}x{}, hidden {}",
                saved.num_classes, saved.input_height, saved.input_width, saved.hidden_size,
                classifier.num_classes, classifier.input_height, classifier.input_width,
                classifier.hidden_size,
            ));
        }
        if self.partition >= parts {
            return fail(format!(
                "checkpoint is from part {} but the run has only {} parts",
                self.partition + 1, parts
            ));
        }
        Ok(())
    }
}

/// Everything a checkpoint records besides the weights
pub struct CheckpointState<'a> {
    pub position:    TrainPosition,
    pub loss:        f64,
    pub accuracy:    f64,
    pub tracker:     &'a AccuracyTracker,
    pub classifier:  &'a ClassifierConfig,
    pub features:    &'a FeatureConfig,
}

// ─── Final artifact ───────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    pub epochs:        usize,
    pub batch_size:    usize,
    pub learning_rate: f64,
    pub parts:         usize,
    pub resume_from:   Option<PathBuf>,
    pub seed:          u64,
}

impl From<&TrainConfig> for TrainingParams {
    fn from(cfg: &TrainConfig) -> Self {
        Self {
            epochs:        cfg.epochs,
            batch_size:    cfg.batch_size,
            learning_rate: cfg.lr,
            parts:         cfg.parts,
            resume_from:   cfg.resume_from.clone(),
            seed:          cfg.seed,
        }
    }
}

/// Metadata needed to rebuild the classifier and interpret its output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model_file:       String,
    pub training_params:  TrainingParams,
    pub accuracy_metrics: TrainingMetrics,
    pub labels:           LabelVocabulary,
    pub features:         FeatureConfig,
    pub classifier:       ClassifierConfig,
}

// ─── CheckpointManager ────────────────────────────────────────────────────────
/// Manages saving and loading of checkpoints and the final model.
/// All files are stored in the output directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory (and parents) if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, TrainError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| TrainError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn checkpoint_stem(position: TrainPosition) -> String {
        format!("checkpoint_part{}_epoch{}", position.partition + 1, position.epoch + 1)
    }

    pub fn manifest_path(&self, position: TrainPosition) -> PathBuf {
        self.dir.join(format!("{}.json", Self::checkpoint_stem(position)))
    }

    /// Persist model, optimizer and manifest for a completed epoch.
    /// Fails with `CheckpointExists` instead of replacing an earlier one.
    pub fn save_checkpoint<B, O>(
        &self,
        state: &CheckpointState<'_>,
        model: &SpeechClassifier<B>,
        optim: &O,
    ) -> Result<PathBuf, TrainError>
    where
        B: AutodiffBackend,
        O: Optimizer<SpeechClassifier<B>, B>,
    {
        let manifest_path = self.manifest_path(state.position);
        let stem          = Self::checkpoint_stem(state.position);
        let model_file    = format!("{stem}_model");
        let optim_file    = format!("{stem}_optim");

        for path in [
            manifest_path.clone(),
            record_file::<B, CheckpointRecorder>(&self.dir, &model_file),
            record_file::<B, CheckpointRecorder>(&self.dir, &optim_file),
        ] {
            if path.exists() {
                return Err(TrainError::CheckpointExists(path));
            }
        }

        let recorder = CheckpointRecorder::new();
        let path = self.dir.join(&model_file);
        <CheckpointRecorder as Recorder<B>>::record(&recorder, model.clone().into_record(), path.clone())
            .map_err(|e| persist_error(&path, e))?;

        let path = self.dir.join(&optim_file);
        <CheckpointRecorder as Recorder<B>>::record(&recorder, optim.to_record(), path.clone())
            .map_err(|e| persist_error(&path, e))?;

        let manifest = CheckpointManifest {
            format_version:   CHECKPOINT_FORMAT_VERSION,
            partition:        state.position.partition,
            epoch:            state.position.epoch,
            loss:             state.loss,
            accuracy:         state.accuracy,
            best_accuracy:    state.tracker.best(),
            accuracy_history: state.tracker.history().to_vec(),
            num_classes:      state.classifier.num_classes,
            classifier:       state.classifier.clone(),
            features:         state.features.clone(),
            model_file,
            optimizer_file:   optim_file,
        };
        write_json(&manifest_path, &manifest)?;

        tracing::debug!("Saved checkpoint '{}'", manifest_path.display());
        Ok(manifest_path)
    }

    /// Read and parse a manifest. Any failure is a `CheckpointLoad`.
    pub fn load_manifest(path: &Path) -> Result<CheckpointManifest, TrainError> {
        let load_error = |reason: String| TrainError::CheckpointLoad { path: path.to_path_buf(), reason };

        let json = fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        serde_json::from_str(&json).map_err(|e| load_error(format!("malformed manifest: {e}")))
    }

    /// Load the records a manifest points at into `model` and `optim`.
    /// Record files are resolved relative to the manifest.
    pub fn restore<B, O>(
        manifest_path: &Path,
        manifest:      &CheckpointManifest,
        model:         SpeechClassifier<B>,
        optim:         O,
        device:        &B::Device,
    ) -> Result<(SpeechClassifier<B>, O), TrainError>
    where
        B: AutodiffBackend,
        O: Optimizer<SpeechClassifier<B>, B>,
    {
        let base = manifest_path.parent().unwrap_or_else(|| Path::new("."));
        let recorder = CheckpointRecorder::new();

        let path = base.join(&manifest.model_file);
        let model_record = <CheckpointRecorder as Recorder<B>>::load(&recorder, path.clone(), device)
            .map_err(|e| TrainError::CheckpointLoad { path: path.clone(), reason: e.to_string() })?;

        let path = base.join(&manifest.optimizer_file);
        let optim_record: O::Record = <CheckpointRecorder as Recorder<B>>::load(&recorder, path.clone(), device)
            .map_err(|e| TrainError::CheckpointLoad { path: path.clone(), reason: e.to_string() })?;

        tracing::debug!(
            "Restored weights and optimizer state from '{}'",
            manifest_path.display()
        );
        Ok((model.load_record(model_record), optim.load_record(optim_record)))
    }

    /// Save the training configuration to JSON.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<(), TrainError> {
        let path = self.dir.join("train_config.json");
        write_json(&path, cfg)?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    /// Write the final weights and their metadata.
    pub fn save_artifact<B: Backend>(
        &self,
        model:    &SpeechClassifier<B>,
        artifact: &ModelArtifact,
    ) -> Result<PathBuf, TrainError> {
        let weights = self.dir.join(&artifact.model_file);
        <CompactRecorder as Recorder<B>>::record(&CompactRecorder::new(), model.clone().into_record(), weights.clone())
            .map_err(|e| persist_error(&weights, e))?;

        let path = self.dir.join(format!("{ARTIFACT_STEM}.json"));
        write_json(&path, artifact)?;
        tracing::debug!("Saved final model to '{}'", path.display());
        Ok(path)
    }

    /// Read `pronunciation_model.json` from a model directory.
    pub fn load_artifact(dir: &Path) -> Result<ModelArtifact, TrainError> {
        let path = dir.join(format!("{ARTIFACT_STEM}.json"));
        let load_error = |reason: String| TrainError::CheckpointLoad { path: path.clone(), reason };

        let json = fs::read_to_string(&path)
            .map_err(|e| load_error(format!("{e}. Have you run 'train' first?")))?;
        serde_json::from_str(&json).map_err(|e| load_error(format!("malformed model metadata: {e}")))
    }

    /// Rebuild the classifier described by `artifact` and load its weights.
    pub fn load_model<B: Backend>(
        dir:      &Path,
        artifact: &ModelArtifact,
        device:   &B::Device,
    ) -> Result<SpeechClassifier<B>, TrainError> {
        let path = dir.join(&artifact.model_file);
        let record = <CompactRecorder as Recorder<B>>::load(&CompactRecorder::new(), path.clone(), device)
            .map_err(|e| TrainError::CheckpointLoad { path, reason: e.to_string() })?;

        Ok(artifact.classifier.init::<B>(device).load_record(record))
    }

    /// Write the run summary next to the model.
    pub fn save_metrics(&self, metrics: &TrainingMetrics) -> Result<PathBuf, TrainError> {
        let path = self.dir.join("training_metrics.json");
        write_json(&path, metrics)?;
        Ok(path)
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), TrainError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| persist_error(path, e))?;
    fs::write(path, json).map_err(|e| TrainError::io(path, e))
}

fn persist_error(path: &Path, e: impl std::fmt::Display) -> TrainError {
    TrainError::Persist { path: path.to_path_buf(), reason: e.to_string() }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::{
        backend::{Autodiff, NdArray},
        optim::{AdamConfig, GradientsParams},
    };

    type TestBackend = Autodiff<NdArray>;

    fn classifier() -> ClassifierConfig {
        ClassifierConfig::new(3, 16, 16).with_hidden_size(8).with_dropout(0.0)
    }

    fn features() -> FeatureConfig {
        FeatureConfig {
            sample_rate:   8000,
            duration_secs: 0.25,
            n_fft:         256,
            hop_length:    128,
            n_mels:        16,
            top_db:        Some(80.0),
        }
    }

    fn state<'a>(
        tracker:    &'a AccuracyTracker,
        classifier: &'a ClassifierConfig,
        features:   &'a FeatureConfig,
        partition:  usize,
        epoch:      usize,
    ) -> CheckpointState<'a> {
        CheckpointState {
            position: TrainPosition { partition, epoch },
            loss: 1.25,
            accuracy: tracker.history().last().copied().unwrap_or(0.0),
            tracker,
            classifier,
            features,
        }
    }

    fn batch(phase: f32) -> (Tensor<TestBackend, 4>, Tensor<TestBackend, 1, Int>) {
        let device = Default::default();
        let values: Vec<f32> = (0..3 * 16 * 16).map(|i| (i as f32 * 0.37 + phase).sin()).collect();
        let features = Tensor::from_floats(TensorData::new(values, [3, 1, 16, 16]), &device);
        let labels   = Tensor::from_ints([0, 1, 2], &device);
        (features, labels)
    }

    fn step<O: Optimizer<SpeechClassifier<TestBackend>, TestBackend>>(
        model: SpeechClassifier<TestBackend>,
        optim: &mut O,
        phase: f32,
    ) -> SpeechClassifier<TestBackend> {
        let (features, labels) = batch(phase);
        let (loss, _) = model.forward_loss(features, labels);
        let grads = GradientsParams::from_grads(loss.backward(), &model);
        optim.step(1e-2, model, grads)
    }

    #[test]
    fn test_stem_is_one_based() {
        let stem = CheckpointManager::checkpoint_stem(TrainPosition { partition: 0, epoch: 4 });
        assert_eq!(stem, "checkpoint_part1_epoch5");
    }

    #[test]
    fn test_checkpoint_round_trip_restores_weights_and_adam_state() {
        let dir      = tempfile::tempdir().unwrap();
        let manager  = CheckpointManager::new(dir.path()).unwrap();
        let device   = Default::default();
        let cfg      = classifier();
        let features = features();

        // one step so the optimizer carries moment estimates
        let mut optim = AdamConfig::new().init::<TestBackend, SpeechClassifier<TestBackend>>();
        let model     = step(cfg.init::<TestBackend>(&device), &mut optim, 0.0);

        let mut tracker = AccuracyTracker::new();
        tracker.record(25.0);
        tracker.record(50.0);

        let path = manager
            .save_checkpoint(&state(&tracker, &cfg, &features, 1, 1), &model, &optim)
            .unwrap();
        assert!(path.ends_with("checkpoint_part2_epoch2.json"));
        assert!(dir.path().join("checkpoint_part2_epoch2_model.mpk").exists());
        assert!(dir.path().join("checkpoint_part2_epoch2_optim.mpk").exists());

        let manifest = CheckpointManager::load_manifest(&path).unwrap();
        assert_eq!(manifest.position(), TrainPosition { partition: 1, epoch: 1 });
        assert_eq!(manifest.accuracy_history, vec![25.0, 50.0]);
        assert_eq!(manifest.best_accuracy, 50.0);
        assert_eq!(manifest.features, features);
        manifest.validate(&path, &cfg, &features, 2).unwrap();

        let fresh       = cfg.init::<TestBackend>(&device);
        let fresh_optim = AdamConfig::new().init::<TestBackend, SpeechClassifier<TestBackend>>();
        let (restored, mut restored_optim) =
            CheckpointManager::restore(&path, &manifest, fresh, fresh_optim, &device).unwrap();

        model.output.weight.val().into_data()
            .assert_approx_eq(&restored.output.weight.val().into_data(), 6);

        // identical next step only if the Adam moments came back too
        let continued = step(model, &mut optim, 1.3);
        let resumed   = step(restored, &mut restored_optim, 1.3);
        continued.output.weight.val().into_data()
            .assert_approx_eq(&resumed.output.weight.val().into_data(), 5);
        continued.hidden.weight.val().into_data()
            .assert_approx_eq(&resumed.hidden.weight.val().into_data(), 5);
    }

    #[test]
    fn test_checkpoint_is_never_overwritten() {
        let dir      = tempfile::tempdir().unwrap();
        let manager  = CheckpointManager::new(dir.path()).unwrap();
        let device   = Default::default();
        let cfg      = classifier();
        let features = features();

        let model   = cfg.init::<TestBackend>(&device);
        let optim   = AdamConfig::new().init::<TestBackend, SpeechClassifier<TestBackend>>();
        let tracker = AccuracyTracker::new();

        manager.save_checkpoint(&state(&tracker, &cfg, &features, 0, 0), &model, &optim).unwrap();
        let err = manager
            .save_checkpoint(&state(&tracker, &cfg, &features, 0, 0), &model, &optim)
            .unwrap_err();
        assert!(matches!(err, TrainError::CheckpointExists(_)));
    }

    #[test]
    fn test_leftover_record_file_blocks_save() {
        let dir      = tempfile::tempdir().unwrap();
        let manager  = CheckpointManager::new(dir.path()).unwrap();
        let device   = Default::default();
        let cfg      = classifier();
        let features = features();

        // weights from an interrupted save, without a manifest
        let stray = record_file::<TestBackend, CheckpointRecorder>(dir.path(), "checkpoint_part1_epoch1_model");
        assert!(stray.ends_with("checkpoint_part1_epoch1_model.mpk"));
        fs::write(&stray, b"partial").unwrap();

        let model   = cfg.init::<TestBackend>(&device);
        let optim   = AdamConfig::new().init::<TestBackend, SpeechClassifier<TestBackend>>();
        let tracker = AccuracyTracker::new();

        let err = manager
            .save_checkpoint(&state(&tracker, &cfg, &features, 0, 0), &model, &optim)
            .unwrap_err();
        assert!(matches!(err, TrainError::CheckpointExists(p) if p == stray));
        assert_eq!(fs::read(&stray).unwrap(), b"partial");
    }

    #[test]
    fn test_malformed_manifest_is_load_error() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint_part1_epoch1.json");
        fs::write(&path, "{ not json").unwrap();

        let err = CheckpointManager::load_manifest(&path).unwrap_err();
        assert!(matches!(err, TrainError::CheckpointLoad { .. }));

        let missing = CheckpointManager::load_manifest(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, TrainError::CheckpointLoad { .. }));
    }

    #[test]
    fn test_validate_rejects_mismatched_run() {
        let cfg      = ClassifierConfig::new(28, 16, 16).with_hidden_size(8);
        let features = features();
        let manifest = CheckpointManifest {
            format_version:   CHECKPOINT_FORMAT_VERSION,
            partition:        3,
            epoch:            0,
            loss:             0.0,
            accuracy:         0.0,
            best_accuracy:    0.0,
            accuracy_history: vec![],
            num_classes:      28,
            classifier:       cfg.clone(),
            features:         features.clone(),
            model_file:       "m".into(),
            optimizer_file:   "o".into(),
        };
        let path = Path::new("ckpt.json");
        let rejected = |r: Result<(), TrainError>| matches!(r, Err(TrainError::CheckpointLoad { .. }));

        assert!(manifest.validate(path, &cfg, &features, 5).is_ok());
        // dropout has no parameters
        assert!(manifest.validate(path, &cfg.clone().with_dropout(0.1), &features, 5).is_ok());

        assert!(rejected(manifest.validate(path, &ClassifierConfig::new(27, 16, 16).with_hidden_size(8), &features, 5)));
        assert!(rejected(manifest.validate(path, &cfg.clone().with_hidden_size(16), &features, 5)));
        assert!(rejected(manifest.validate(path, &ClassifierConfig::new(28, 32, 16).with_hidden_size(8), &features, 5)));
        assert!(rejected(manifest.validate(path, &cfg, &FeatureConfig { n_mels: 32, ..features.clone() }, 5)));
        assert!(rejected(manifest.validate(path, &cfg, &features, 2)));

        let old = CheckpointManifest { format_version: 1, ..manifest };
        assert!(rejected(old.validate(path, &cfg, &features, 5)));
    }
}
