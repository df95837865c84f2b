//! Compatibility scoring between participant profiles
//!
//! This module contains the pure scoring logic used for candidate ranking
//! and request score snapshots. It performs no I/O and never errors.

pub mod compatibility;

pub use compatibility::{CompatibilityScorer, ScoringWeights};
