//! N-gram language models.
//!
//! This module contains:
//! - The n-gram key type (`NGram`) and the multi-order counter (`NGramCounter`)
//! - The vocabulary and the UNK policy applied while training
//! - Model settings and the sentence normalizer
//! - The `LanguageModel` trait and its shared state (`ModelBase`)
//! - Two smoothing strategies: back-off with discounting and linear interpolation

/// Katz-style back-off with absolute discounting.
///
/// Recursive over the n-gram order, with alpha normalization and
/// per-configuration caches.
pub mod backoff;

/// Multi-order frequency table built from padded sentences.
pub mod counter;

/// Linear interpolation of the maximum-likelihood estimates of every order.
pub mod interpolation;

/// Shared training and sentence scoring skeleton.
///
/// Defines the `LanguageModel` trait implemented by every smoothing strategy.
pub mod language_model;

/// Fixed-order token tuple with comparison-aware equality and hashing.
pub mod ngram;

/// Raw sentence to padded token sequence.
pub mod normalizer;

/// Model configuration and its invariants.
pub mod settings;

/// Vocabulary of counted tokens and UNK substitution during training.
pub mod vocabulary;

pub use backoff::BackOffModel;
pub use counter::NGramCounter;
pub use interpolation::LinearInterpolationModel;
pub use language_model::{LanguageModel, ModelBase, SentenceScore, TrainingSummary};
pub use ngram::{Comparison, NGram};
pub use normalizer::SentenceNormalizer;
pub use settings::{Settings, SmoothingTable};
pub use vocabulary::{UnkMode, UnkTracker, Vocabulary};
