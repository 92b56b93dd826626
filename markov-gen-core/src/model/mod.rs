//! Top-level module for the Markov model system.
//!
//! This crate provides a variable-order character-level Markov chain, including:
//! - An alphabet-constrained normalizer (`Alphabet`, `NormalizedText`)
//! - Transition frequency counting (`TransitionCounts`)
//! - Conditional probability tables (`ProbabilityTable`, `TableSet`)
//! - A corpus training pipeline (`trainer`)
//! - A high-level generation interface (`Generator`)

/// Fixed symbol alphabet and text normalization.
///
/// All model components operate over the closed symbol set defined here;
/// every other input character folds into the designated space symbol.
pub mod alphabet;

/// Context -> next-symbol transition frequency counting.
///
/// Handles the single-pass counting scan for any order `k >= 0`
/// and post-pass minimum-count filtering.
pub mod counts;

/// Conditional probability distributions derived from transition counts.
///
/// Supports entropy measurement, CSV persistence with lossless
/// round-trips, and a compact binary fast-load cache.
pub mod table;

/// Corpus training pipeline.
///
/// Counts all orders 0..=K (fanned out across threads), derives and
/// persists probability tables, and writes the summary artifacts.
pub mod trainer;

/// High-level interface for synthesizing text from probability tables.
///
/// Exposes table loading, seeded generation, and the order backoff chain
/// with a guaranteed terminal default.
pub mod generator;
