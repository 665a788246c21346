use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// How tokens are compared inside n-grams and the vocabulary.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Comparison {
	#[default]
	CaseSensitive,
	CaseInsensitive,
}

impl Comparison {
	/// Returns `true` if both tokens are equal under this mode.
	pub fn tokens_equal(self, a: &str, b: &str) -> bool {
		match self {
			Comparison::CaseSensitive => a == b,
			Comparison::CaseInsensitive => a
				.chars()
				.flat_map(char::to_lowercase)
				.eq(b.chars().flat_map(char::to_lowercase)),
		}
	}

	/// Returns the canonical key of a token under this mode.
	///
	/// Two tokens are equal under the mode iff their keys are equal.
	pub fn key(self, token: &str) -> String {
		match self {
			Comparison::CaseSensitive => token.to_owned(),
			Comparison::CaseInsensitive => token.to_lowercase(),
		}
	}

	fn hash_token<H: Hasher>(self, token: &str, state: &mut H) {
		match self {
			Comparison::CaseSensitive => token.hash(state),
			Comparison::CaseInsensitive => {
				for c in token.chars().flat_map(char::to_lowercase) {
					c.hash(state);
				}
				// Token separator, same as `str::hash`
				state.write_u8(0xff);
			}
		}
	}
}

/// An ordered tuple of exactly `order` tokens.
///
/// The order is fixed at construction and the tokens are immutable, which
/// makes `NGram` safe to use as a map key. Equality compares the order and
/// each token under the n-gram's [`Comparison`] mode; hashing folds tokens
/// the same way so that equal n-grams always hash identically.
///
/// # Invariants
/// - `tokens` is never empty
#[derive(Clone, Debug)]
pub struct NGram {
	tokens: Box<[String]>,
	comparison: Comparison,
}

impl NGram {
	/// Creates an n-gram from its tokens.
	///
	/// # Errors
	/// Returns `InvalidArgument` if `tokens` is empty.
	pub fn new<S: Into<String>>(
		tokens: impl IntoIterator<Item = S>,
		comparison: Comparison,
	) -> Result<Self, ModelError> {
		let tokens: Box<[String]> = tokens.into_iter().map(Into::into).collect();
		if tokens.is_empty() {
			return Err(ModelError::InvalidArgument("an n-gram needs at least one token".to_owned()));
		}
		Ok(Self { tokens, comparison })
	}

	/// Builds an n-gram from a non-empty window. Callers guarantee the length.
	pub(crate) fn from_window(window: &[String], comparison: Comparison) -> Self {
		debug_assert!(!window.is_empty());
		Self { tokens: window.into(), comparison }
	}

	/// Number of tokens.
	pub fn order(&self) -> usize {
		self.tokens.len()
	}

	pub fn tokens(&self) -> &[String] {
		&self.tokens
	}

	pub fn token(&self, i: usize) -> Option<&str> {
		self.tokens.get(i).map(String::as_str)
	}

	/// Last token of the n-gram.
	pub fn last(&self) -> &str {
		// Never empty
		&self.tokens[self.tokens.len() - 1]
	}

	pub fn comparison(&self) -> Comparison {
		self.comparison
	}

	/// Leading `order - 1` tokens, or `None` for a unigram.
	pub fn context(&self) -> Option<NGram> {
		if self.order() < 2 {
			return None;
		}
		Some(Self::from_window(&self.tokens[..self.order() - 1], self.comparison))
	}

	/// Trailing `order - 1` tokens, or `None` for a unigram.
	pub fn suffix(&self) -> Option<NGram> {
		if self.order() < 2 {
			return None;
		}
		Some(Self::from_window(&self.tokens[1..], self.comparison))
	}

	/// Trailing `len` tokens, or `None` if `len` is 0 or above the order.
	pub fn tail(&self, len: usize) -> Option<NGram> {
		if len == 0 || len > self.order() {
			return None;
		}
		Some(Self::from_window(&self.tokens[self.order() - len..], self.comparison))
	}

	/// Returns a new n-gram of order `order + 1` ending with `word`.
	pub fn extend(&self, word: &str) -> NGram {
		let mut tokens = Vec::with_capacity(self.order() + 1);
		tokens.extend(self.tokens.iter().cloned());
		tokens.push(word.to_owned());
		Self { tokens: tokens.into_boxed_slice(), comparison: self.comparison }
	}
}

impl PartialEq for NGram {
	fn eq(&self, other: &Self) -> bool {
		self.comparison == other.comparison
			&& self.tokens.len() == other.tokens.len()
			&& self
				.tokens
				.iter()
				.zip(other.tokens.iter())
				.all(|(a, b)| self.comparison.tokens_equal(a, b))
	}
}

impl Eq for NGram {}

impl Hash for NGram {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.tokens.len().hash(state);
		for token in self.tokens.iter() {
			self.comparison.hash_token(token, state);
		}
	}
}

impl fmt::Display for NGram {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "({})", self.tokens.join(", "))
	}
}
