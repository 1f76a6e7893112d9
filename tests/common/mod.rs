#![allow(dead_code)]

use std::{fs, path::Path};

use hijaiyah_trainer::{application::train_use_case::TrainConfig, data::features::FeatureConfig};
use rand::{rngs::StdRng, Rng, SeedableRng};

pub const SAMPLE_RATE: u32 = 8000;

/// Writes `per_class` short clips per class. Each class gets its own
/// tone so the classes are separable; every clip adds its own noise.
pub fn write_dataset(root: &Path, classes: &[&str], per_class: usize) {
    for (c, class) in classes.iter().enumerate() {
        let dir = root.join(class);
        fs::create_dir_all(&dir).unwrap();
        let freq = 300.0 + 450.0 * c as f32;
        for i in 0..per_class {
            let seed = (c * 1000 + i) as u64;
            write_clip(&dir.join(format!("{:02}_{class}.wav", i)), freq, seed);
        }
    }
}

pub fn write_clip(path: &Path, freq: f32, seed: u64) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut rng    = StdRng::seed_from_u64(seed);
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..2000 {
        let t    = i as f32 / SAMPLE_RATE as f32;
        let tone = (2.0 * std::f32::consts::PI * freq * t).sin() * 9000.0;
        let hiss = rng.gen_range(-1500.0..1500.0);
        writer.write_sample((tone + hiss) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

/// A configuration small enough to train in a test
pub fn small_config(dataset_dir: &Path, output_dir: &Path) -> TrainConfig {
    TrainConfig {
        dataset_dir: dataset_dir.to_path_buf(),
        output_dir:  output_dir.to_path_buf(),
        epochs:      1,
        batch_size:  4,
        lr:          1e-3,
        parts:       2,
        resume_from: None,
        seed:        7,
        workers:     2,
        hidden_size: 16,
        dropout:     0.5,
        no_progress: true,
        features:    FeatureConfig {
            sample_rate:   SAMPLE_RATE,
            duration_secs: 0.25,
            n_fft:         256,
            hop_length:    128,
            n_mels:        16,
            top_db:        Some(80.0),
        },
    }
}
