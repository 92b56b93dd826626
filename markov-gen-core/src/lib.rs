//! Variable-order character-level Markov model library.
//!
//! This crate provides the training and generation pipeline:
//! - Alphabet-constrained text normalization
//! - Context -> next-symbol frequency counting for orders 0..K
//! - Conditional probability tables with entropy measurement and CSV persistence
//! - Text synthesis by weighted sampling with order backoff
//!
//! Only the high-level API is exposed publicly. Low-level components
//! are kept internal to ensure consistency and prevent misuse.

/// Core model types, training pipeline and generation logic.
///
/// This module exposes the high-level training and generation interface
/// while keeping internal file-naming conventions private.
pub mod model;

/// I/O utilities (corpus loading, artifact path helpers).
///
/// Not exposed
pub(crate) mod io;
