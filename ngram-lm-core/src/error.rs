use std::fmt;

/// Errors raised while configuring, training or scoring a language model.
///
/// Absence is never an error: an unseen n-gram simply has a count of 0.
/// Errors describe either bad input, a configuration that breaks a model
/// invariant, or a statistical state in which a probability is undefined.
#[derive(Debug)]
pub enum ModelError {
	/// Argument rejected by an operation (empty n-gram, wrong percentages...)
	InvalidArgument(String),

	/// Settings that violate a model invariant.
	InvalidSettings(String),

	/// A probability was requested before any sentence was trained.
	NotTrained,

	/// The n-gram order is 0 or exceeds the configured order.
	OrderOutOfRange { order: usize, max: usize },

	/// A zero denominator or an empty redistribution mass met while scoring.
	DegenerateModel(String),

	/// The discount is not smaller than the observed count.
	NegativeDiscount { ngram: String, count: u64, discount: f64 },

	/// Back-off reached order 1 with a token that was never counted.
	UnseenUnigram(String),

	/// Corpus could not be read.
	Io(std::io::Error),
}

impl fmt::Display for ModelError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ModelError::InvalidArgument(s) => write!(f, "invalid argument: {}", s),
			ModelError::InvalidSettings(s) => write!(f, "invalid settings: {}", s),
			ModelError::NotTrained => write!(f, "the model has not been trained"),
			ModelError::OrderOutOfRange { order, max } => {
				write!(f, "n-gram order {} is outside 1..={}", order, max)
			}
			ModelError::DegenerateModel(s) => write!(f, "degenerate model state: {}", s),
			ModelError::NegativeDiscount { ngram, count, discount } => write!(
				f,
				"discount {} is not smaller than the count {} of {}",
				discount, count, ngram
			),
			ModelError::UnseenUnigram(token) => {
				write!(f, "token '{}' was never counted during training", token)
			}
			ModelError::Io(e) => write!(f, "corpus read error: {}", e),
		}
	}
}

impl std::error::Error for ModelError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			ModelError::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<std::io::Error> for ModelError {
	fn from(e: std::io::Error) -> Self {
		ModelError::Io(e)
	}
}
