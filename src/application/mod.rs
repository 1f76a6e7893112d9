// ============================================================
// Layer 2: Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal each
// (training, predicting, inspecting).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination

/// The training workflow
pub mod train_use_case;

/// Single-file prediction from a trained model
pub mod predict_use_case;

/// Dataset statistics
pub mod inspect_use_case;
