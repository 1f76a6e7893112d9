// ============================================================
// Layer 4: Data Pipeline
// ============================================================
// Everything from a directory of .wav files to tensor batches.
//
//   dataset/<class>/<file>.wav
//       │
//       ▼
//   DirectoryIndexer  → label vocabulary + ordered SampleRecords
//       │
//       ▼
//   partition_range   → contiguous slice for the current part
//       │
//       ▼
//   AudioDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   AudioBatcher      → FeatureExtractor per sample, stacked
//       │
//       ▼
//   DataLoader        → shuffled batches for one epoch
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Scans the class-per-directory layout
pub mod indexer;

/// WAV decoding, resampling, padding
pub mod audio;

/// STFT, mel filterbank and dB scaling
pub mod mel;

/// Fixed-shape normalised spectrograms
pub mod features;

/// Contiguous partitions and shuffle seeds
pub mod partition;

/// Implements Burn's Dataset trait for sample records
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Read-only dataset statistics
pub mod inspector;
