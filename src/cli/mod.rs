// ============================================================
// Layer 1: CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and prints results. All work is
// delegated to Layer 2 (application).
//
//   train    index → extract features → partitioned training
//   predict  top-k letters for one clip
//   inspect  dataset statistics

pub mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser};
use commands::{Commands, InspectArgs, PredictArgs, TrainArgs};

use crate::application::{
    inspect_use_case::{InspectReport, InspectUseCase},
    predict_use_case::PredictUseCase,
    train_use_case::TrainUseCase,
};
use crate::domain::traits::LabelPredictor;

#[derive(Parser, Debug)]
#[command(
    name = "hijaiyah-trainer",
    version,
    about = "Train a CNN to recognise spoken Arabic letters, then use it."
)]
pub struct Cli {
    /// -v for debug, -vv for trace (RUST_LOG overrides)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Predict(args) => run_predict(args),
            Commands::Inspect(args) => run_inspect(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    let use_case = TrainUseCase::new(args.into());
    let report   = use_case.execute()?;

    println!("Training complete.");
    println!("  best accuracy:    {:.2}%", report.metrics.best_accuracy);
    println!("  final accuracy:   {:.2}%", report.metrics.final_accuracy);
    println!("  average accuracy: {:.2}%", report.metrics.average_accuracy);
    println!("  model:            {}", report.artifact.display());
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    let use_case = PredictUseCase::new(&args.model_dir)?;
    let scores   = use_case.predict(&args.audio, args.top_k)?;

    println!("\n{} (model: {})", args.audio.display(), use_case.model_dir().display());
    for (rank, score) in scores.iter().enumerate() {
        println!("  {}. {:<8} {:>6.2}%", rank + 1, score.label, score.probability * 100.0);
    }
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    let use_case = InspectUseCase {
        dataset_dir: args.dataset_dir,
        hijaiyah:    args.hijaiyah,
        save_to:     args.save,
    };
    print_report(&use_case.execute()?);
    Ok(())
}

fn print_report(report: &InspectReport) {
    let g = &report.general;
    println!("\n=== Dataset: {} ===", report.dataset_dir.display());
    println!("Total files:   {}", g.total_files);
    println!("Total classes: {}", g.total_classes);
    println!("Total size:    {:.2} MB", g.size_mb);
    println!("Audio: {} | Images: {} | Text: {}", g.audio_files, g.image_files, g.text_files);

    println!("\nAudio files per class:");
    for (class, count) in &g.classes {
        println!("  {:<12} {}", class, count);
    }

    let Some(h) = &report.hijaiyah else { return };
    println!("\n=== Hijaiyah coverage ===");
    println!("Audio files: {} ({:.2} MB)", h.audio_files, h.total_size_mb);
    for (letter, stats) in &h.by_letter {
        if stats.count > 0 {
            println!(
                "  {:<6} {:>5} files | {:>3} speakers | {:>3} sessions",
                letter,
                stats.count,
                stats.speakers.len(),
                stats.sessions.len(),
            );
        }
    }
    if h.missing_letters.is_empty() {
        println!("All expected letters are present.");
    } else {
        println!("Missing letters: {}", h.missing_letters.join(", "));
    }
}
