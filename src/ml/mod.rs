// ============================================================
// Layer 5: ML / Model Layer (Burn)
// ============================================================
// Everything that touches Burn modules, optimisers or recorders
// during training and inference lives here.
//
//   model.rs      3 × (conv → ReLU → pool) + dense head
//   schedule.rs   (partition, epoch) positions and resume logic
//   trainer.rs    partitioned training loop with checkpoints
//   inferencer.rs loads the final model, predicts one clip
//
// Backends: NdArray on the CPU by default; `--features wgpu`
// moves training and inference to the GPU.
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Convolutional classifier over mel spectrograms
pub mod model;

/// Two-level training schedule
pub mod schedule;

/// Training loop with per-epoch checkpoints
pub mod trainer;

/// Offline prediction from a saved model
pub mod inferencer;

#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray;

#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;

/// Training backend: InferBackend with automatic differentiation
pub type TrainBackend = burn::backend::Autodiff<InferBackend>;
