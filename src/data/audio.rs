// ============================================================
// Layer 4: Audio Decoding and Resampling
// ============================================================
// WAV decoding uses hound; resampling uses rubato's sinc
// resampler. Everything returns mono f32 in [-1, 1].

use std::path::Path;

use rubato::{
    Resampler as _, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
    WindowFunction,
};

use crate::domain::error::TrainError;

/// Mono samples plus the rate they were recorded at
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples:     Vec<f32>,
    pub sample_rate: u32,
}

/// Decode a WAV file to mono f32.
///
/// When `max_seconds` is given only that much audio is read, which
/// keeps long recordings cheap when the clip is truncated anyway.
pub fn decode_wav(path: &Path, max_seconds: Option<f32>) -> Result<DecodedAudio, TrainError> {
    let corrupt = |reason: String| TrainError::CorruptAudioFile {
        path: path.to_path_buf(),
        reason,
    };

    let reader = hound::WavReader::open(path).map_err(|e| corrupt(e.to_string()))?;
    let spec   = reader.spec();
    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(corrupt(format!(
            "invalid header: {} channels at {} Hz",
            spec.channels, spec.sample_rate
        )));
    }
    let channels = spec.channels as usize;

    let max_values = max_seconds
        .filter(|s| *s > 0.0)
        .map(|s| ((s * spec.sample_rate as f32).ceil() as usize).saturating_mul(channels))
        .unwrap_or(usize::MAX);

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .take(max_values)
            .collect::<Result<_, _>>()
            .map_err(|e| corrupt(e.to_string()))?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .take(max_values)
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| corrupt(e.to_string()))?
        }
    };

    let samples = if channels > 1 {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    } else {
        interleaved
    };

    Ok(DecodedAudio { samples, sample_rate: spec.sample_rate })
}

/// Resample mono audio from one sample rate to another
pub fn resample(samples: &[f32], from_sr: u32, to_sr: u32) -> Result<Vec<f32>, String> {
    if from_sr == to_sr || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len:            256,
        f_cutoff:            0.95,
        interpolation:       SincInterpolationType::Linear,
        oversampling_factor: 256,
        window:              WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(
        to_sr as f64 / from_sr as f64,
        2.0,
        params,
        samples.len(),
        1,
    )
    .map_err(|e| e.to_string())?;

    let output = resampler
        .process(&[samples], None)
        .map_err(|e| e.to_string())?;
    Ok(output.into_iter().next().unwrap_or_default())
}

/// Pad with trailing zeros or truncate so the clip is exactly `len` samples
pub fn fit_length(mut samples: Vec<f32>, len: usize) -> Vec<f32> {
    samples.resize(len, 0.0);
    samples
}
