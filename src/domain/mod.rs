// ============================================================
// Layer 3: Domain Layer
// ============================================================
// Plain Rust types and traits that describe the problem:
// labelled audio samples, the label vocabulary, and the
// error taxonomy shared by every other layer.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

/// Sample records and the label vocabulary
pub mod sample;

/// Error taxonomy for indexing, extraction, training and checkpoints
pub mod error;

/// Core abstractions (traits) that other layers implement
pub mod traits;
