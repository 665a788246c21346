//! N-gram language modeling library.
//!
//! This crate provides:
//! - Multi-order n-gram counting over padded sentences, with UNK substitution
//! - Two smoothed models: back-off with discounting and linear interpolation
//! - Perplexity evaluation and a search over the smoothing values
//! - Corpus loading and train/validate/test splitting
//!
//! Every fallible operation returns a [`ModelError`].

/// Crate-wide error type.
pub mod error;

/// Evaluation of trained models (perplexity, smoothing optimizer).
pub mod evaluation;

/// Corpus loading and partitioning.
pub mod io;

/// N-gram models, counting and configuration.
pub mod model;

pub use error::ModelError;
