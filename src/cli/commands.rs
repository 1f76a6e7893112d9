// ============================================================
// Layer 1: CLI Commands and Arguments
// ============================================================
// Subcommands: `train`, `predict` and `inspect`, with their flags.
// Defaults match TrainConfig::default().

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::application::train_use_case::{default_workers, TrainConfig};
use crate::data::features::FeatureConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the pronunciation classifier on a directory of labelled clips
    Train(TrainArgs),

    /// Predict the letter spoken in one WAV file
    Predict(PredictArgs),

    /// Print statistics about a dataset directory
    Inspect(InspectArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Dataset root: one sub-directory of .wav files per letter
    #[arg(long, default_value = "dataset")]
    pub dataset_dir: PathBuf,

    /// Where checkpoints, metrics and the final model are written
    #[arg(long, default_value = "models")]
    pub output_dir: PathBuf,

    /// Epochs per partition
    #[arg(long, default_value_t = 50)]
    pub epochs: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Number of contiguous partitions trained one after another
    #[arg(long, default_value_t = 5)]
    pub parts: usize,

    /// Checkpoint manifest (checkpoint_partP_epochE.json) to continue from
    #[arg(long)]
    pub resume_from: Option<PathBuf>,

    /// Seeds weight init, dropout and batch shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Feature extraction threads (default: all cores)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Width of the hidden dense layer
    #[arg(long, default_value_t = 512)]
    pub hidden_size: usize,

    #[arg(long, default_value_t = 0.5)]
    pub dropout: f64,

    /// Hide the per-epoch progress bar
    #[arg(long)]
    pub no_progress: bool,

    #[command(flatten)]
    pub features: FeatureArgs,
}

/// Spectrogram settings
#[derive(Args, Debug)]
pub struct FeatureArgs {
    /// Target sample rate in Hz
    #[arg(long, default_value_t = 22050)]
    pub sample_rate: u32,

    /// Clip length in seconds after padding/truncation
    #[arg(long, default_value_t = 1.0)]
    pub duration: f32,

    #[arg(long, default_value_t = 2048)]
    pub n_fft: usize,

    #[arg(long, default_value_t = 512)]
    pub hop_length: usize,

    #[arg(long, default_value_t = 128)]
    pub n_mels: usize,

    /// Dynamic range kept below the loudest bin, in dB
    #[arg(long, default_value_t = 80.0)]
    pub top_db: f32,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            dataset_dir: a.dataset_dir,
            output_dir:  a.output_dir,
            epochs:      a.epochs,
            batch_size:  a.batch_size,
            lr:          a.lr,
            parts:       a.parts,
            resume_from: a.resume_from,
            seed:        a.seed,
            workers:     a.workers.unwrap_or_else(default_workers),
            hidden_size: a.hidden_size,
            dropout:     a.dropout,
            no_progress: a.no_progress,
            features:    a.features.into(),
        }
    }
}

impl From<FeatureArgs> for FeatureConfig {
    fn from(a: FeatureArgs) -> Self {
        FeatureConfig {
            sample_rate:   a.sample_rate,
            duration_secs: a.duration,
            n_fft:         a.n_fft,
            hop_length:    a.hop_length,
            n_mels:        a.n_mels,
            top_db:        Some(a.top_db),
        }
    }
}

/// All arguments for the `predict` command
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// WAV file to classify
    #[arg(long)]
    pub audio: PathBuf,

    /// Directory holding pronunciation_model.json
    #[arg(long, default_value = "models")]
    pub model_dir: PathBuf,

    /// How many candidate letters to show
    #[arg(long, default_value_t = 3)]
    pub top_k: usize,
}

/// All arguments for the `inspect` command
#[derive(Args, Debug)]
pub struct InspectArgs {
    #[arg(long, default_value = "dataset")]
    pub dataset_dir: PathBuf,

    /// Also report per-letter coverage from hijaiyah file names
    #[arg(long)]
    pub hijaiyah: bool,

    /// Save the statistics to this JSON file
    #[arg(long)]
    pub save: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_defaults_match_config_defaults() {
        let cli = Cli::parse_from(["hijaiyah-trainer", "train", "--workers", "2"]);
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg, TrainConfig { workers: 2, ..TrainConfig::default() });
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "hijaiyah-trainer", "inspect", "--hijaiyah", "-vv", "--log-file", "out/run.log",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_file, Some(PathBuf::from("out/run.log")));
        assert!(matches!(cli.command, Commands::Inspect(InspectArgs { hijaiyah: true, .. })));
    }
}
