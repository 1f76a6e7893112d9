// ============================================================
// Layer 6: Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by the ML and application layers:
//
//   checkpoint.rs  per-epoch checkpoints, config snapshot and the
//                  final model, all through Burn's CompactRecorder
//                  plus JSON manifests
//
//   metrics.rs     metrics.csv rows and the run-level accuracy
//                  summary
//
//   logging.rs     tracing subscriber (console + optional file)
//
// Reference: Burn Book §5 (Checkpointing)

/// Checkpoint and final model persistence
pub mod checkpoint;

/// Training metrics CSV logger and summary
pub mod metrics;

/// Tracing subscriber setup
pub mod logging;
