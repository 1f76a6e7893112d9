//! Train a convolutional classifier on spoken Arabic letters.
//!
//! Layers, outermost first: `cli` → `application` → `ml` / `data` /
//! `infra`, all sharing the types in `domain`.

#![recursion_limit = "256"]

pub mod cli;
pub mod application;
pub mod domain;
pub mod data;
pub mod ml;
pub mod infra;
