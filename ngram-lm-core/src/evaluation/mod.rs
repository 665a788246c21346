//! Model evaluation.
//!
//! - `perplexity`: corpus-level perplexity of a trained model
//! - `optimizer`: grid search of the smoothing values minimizing perplexity

/// Perplexity of a corpus, normalized by the number of scored tokens.
pub mod perplexity;

/// Search over the per-order discounts or weights.
///
/// Evaluates every combination on a validation corpus, sequentially or on
/// one model clone per worker thread.
pub mod optimizer;

pub use optimizer::{Combination, OptimizationResult, Optimizer, PerplexityTable};
pub use perplexity::{PerplexityCalculator, PerplexityReport};
