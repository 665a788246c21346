use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use super::ngram::Comparison;
use super::vocabulary::UnkMode;

/// Tolerance used when checking that interpolation weights sum to 1.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Which per-order table a smoothing strategy reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SmoothingTable {
	/// Back-off discounts (`beta`)
	Discounts,
	/// Linear interpolation weights (`lambda`)
	Weights,
}

/// Settings used to train and score a language model.
///
/// Every missing field of a deserialized file falls back to
/// [`Settings::default`].
///
/// # Invariants (checked by [`Settings::validate`])
/// - `order >= 1`
/// - `log_base > 0` and `log_base != 1`
/// - markers are non-empty and pairwise distinct, the separator is non-empty
/// - `unk_percentage` is within `[0, 100]`
/// - `discounts` and `weights` hold exactly `order` values
/// - each discount is within `[0, 1)`, strictly below the smallest possible
///   count of a seen n-gram
/// - each weight is within `[0, 1]` and the weights sum to 1
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Settings {
	/// The n-gram order (N)
	pub order: usize,

	/// Base of the logarithms used for sentence scores and perplexity
	pub log_base: f64,

	pub start_token: String,

	pub end_token: String,

	pub unk_token: String,

	pub unk_mode: UnkMode,

	/// Percentage of singleton words turned into UNK (`Singletons` mode)
	pub unk_percentage: f64,

	/// Token separator
	pub separator: String,

	/// Characters stripped from the end of a sentence
	pub sentence_terminators: String,

	pub comparison: Comparison,

	/// Back-off discount per order, `discounts[k - 1]` is beta of order k
	pub discounts: Vec<f64>,

	/// Interpolation weight per order, `weights[k - 1]` is lambda of order k
	pub weights: Vec<f64>,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			order: 3,
			log_base: 2.0,
			start_token: "{{*}}".to_owned(),
			end_token: "{{END}}".to_owned(),
			unk_token: "{{UNK}}".to_owned(),
			unk_mode: UnkMode::Singletons,
			unk_percentage: 100.0,
			separator: " ".to_owned(),
			sentence_terminators: ".".to_owned(),
			comparison: Comparison::CaseSensitive,
			discounts: vec![0.75, 0.5, 0.5],
			weights: vec![0.5, 0.2, 0.3],
		}
	}
}

impl Settings {
	/// Default settings for an order other than 3.
	///
	/// Discounts are 0.5 for every order and weights are uniform.
	pub fn with_order(order: usize) -> Self {
		if order == 3 {
			return Self::default();
		}
		let uniform = if order == 0 { 0.0 } else { 1.0 / order as f64 };
		Self {
			order,
			discounts: vec![0.5; order],
			weights: vec![uniform; order],
			..Self::default()
		}
	}

	/// Returns the values of one smoothing table.
	pub fn table(&self, table: SmoothingTable) -> &[f64] {
		match table {
			SmoothingTable::Discounts => &self.discounts,
			SmoothingTable::Weights => &self.weights,
		}
	}

	/// Replaces the values of one smoothing table.
	///
	/// # Errors
	/// Returns `InvalidSettings` and leaves the settings untouched if the new
	/// values break an invariant.
	pub fn set_table(&mut self, table: SmoothingTable, values: &[f64]) -> Result<(), ModelError> {
		match table {
			SmoothingTable::Discounts => {
				Self::check_discounts(self.order, values)?;
				self.discounts = values.to_vec();
			}
			SmoothingTable::Weights => {
				Self::check_weights(self.order, values)?;
				self.weights = values.to_vec();
			}
		}
		Ok(())
	}

	/// Checks every invariant.
	pub fn validate(&self) -> Result<(), ModelError> {
		if self.order == 0 {
			return Err(invalid("the n-gram order must be >= 1".to_owned()));
		}
		if !(self.log_base > 0.0) || self.log_base == 1.0 || !self.log_base.is_finite() {
			return Err(invalid(format!("log base must be positive and != 1, got {}", self.log_base)));
		}

		let markers = [&self.start_token, &self.end_token, &self.unk_token];
		if markers.iter().any(|m| m.is_empty()) {
			return Err(invalid("start, end and UNK tokens cannot be empty".to_owned()));
		}
		for (i, a) in markers.iter().enumerate() {
			for b in &markers[i + 1..] {
				if self.comparison.tokens_equal(a, b) {
					return Err(invalid(format!("marker token '{}' is used twice", a)));
				}
			}
		}
		if self.separator.is_empty() {
			return Err(invalid("the separator cannot be empty".to_owned()));
		}
		if !(0.0..=100.0).contains(&self.unk_percentage) {
			return Err(invalid(format!("UNK percentage must be within [0, 100], got {}", self.unk_percentage)));
		}

		Self::check_discounts(self.order, &self.discounts)?;
		Self::check_weights(self.order, &self.weights)
	}

	fn check_discounts(order: usize, discounts: &[f64]) -> Result<(), ModelError> {
		if discounts.len() != order {
			return Err(invalid(format!("expected {} discounts, got {}", order, discounts.len())));
		}
		if let Some(d) = discounts.iter().find(|d| !(0.0..1.0).contains(*d)) {
			return Err(invalid(format!("discounts must be within [0, 1), got {}", d)));
		}
		Ok(())
	}

	fn check_weights(order: usize, weights: &[f64]) -> Result<(), ModelError> {
		if weights.len() != order {
			return Err(invalid(format!("expected {} weights, got {}", order, weights.len())));
		}
		if let Some(w) = weights.iter().find(|w| !(0.0..=1.0).contains(*w)) {
			return Err(invalid(format!("weights must be within [0, 1], got {}", w)));
		}
		let sum: f64 = weights.iter().sum();
		if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
			return Err(invalid(format!("weights must sum to 1, got {}", sum)));
		}
		Ok(())
	}
}

fn invalid(message: String) -> ModelError {
	ModelError::InvalidSettings(message)
}
