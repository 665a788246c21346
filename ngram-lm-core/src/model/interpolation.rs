use crate::error::ModelError;
use super::language_model::{LanguageModel, ModelBase};
use super::ngram::NGram;
use super::settings::{Settings, SmoothingTable};

/// Linear interpolation of the maximum-likelihood estimates of every order.
///
/// `P(w_1..w_k) = sum over j in 1..=k of lambda[j] * MLE(w_{k-j+1}..w_k)`
///
/// The weights sum to 1, which is checked when they are configured. A term
/// whose MLE is undefined (its context was never counted) contributes 0: such
/// terms are filtered explicitly instead of letting NaN or infinity reach the
/// sum. This is an approximation, the mass of the dropped term is lost.
#[derive(Clone, Debug)]
pub struct LinearInterpolationModel {
	base: ModelBase,
}

impl LinearInterpolationModel {
	/// Creates an untrained model.
	///
	/// # Errors
	/// Returns `InvalidSettings` if `settings` break an invariant.
	pub fn new(settings: Settings) -> Result<Self, ModelError> {
		Ok(Self { base: ModelBase::new(settings)? })
	}
}

impl LanguageModel for LinearInterpolationModel {
	fn base(&self) -> &ModelBase {
		&self.base
	}

	fn base_mut(&mut self) -> &mut ModelBase {
		&mut self.base
	}

	fn smoothing_table(&self) -> SmoothingTable {
		SmoothingTable::Weights
	}

	fn estimate_probability(&mut self, ngram: &NGram) -> Result<f64, ModelError> {
		let mut probability = 0.0;
		for order in 1..=ngram.order() {
			let weight = self.base.settings().weights[order - 1];
			let Some(tail) = ngram.tail(order) else {
				continue;
			};
			let mle = self.base.mle(&tail);
			if mle.is_finite() {
				probability += weight * mle;
			}
		}
		Ok(probability)
	}

	/// The MLE cache does not depend on the weights.
	fn clear_cache_for_settings_change(&mut self) {}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::ngram::Comparison;

	const EPSILON: f64 = 1e-9;

	fn trained() -> LinearInterpolationModel {
		let mut model = LinearInterpolationModel::new(Settings::default()).unwrap();
		model.train(["I want to.", "I want you"]);
		model
	}

	#[test]
	fn test_weighted_sum_of_mle() {
		let mut model = trained();
		let ngram = model.base().ngram(["I", "want", "{{UNK}}"]).unwrap();

		// MLE: trigram 2/2, bigram (want UNK) 2/2, unigram UNK 2/12
		let expected = 0.3 * 1.0 + 0.2 * 1.0 + 0.5 * (2.0 / 12.0);
		assert!((model.probability(&ngram).unwrap() - expected).abs() < EPSILON);
	}

	#[test]
	fn test_undefined_terms_contribute_zero() {
		let mut model = trained();
		// The context (UNK, I) was never counted, its trigram MLE is 0/0
		let ngram = model.base().ngram(["{{UNK}}", "I", "want"]).unwrap();
		let p = model.probability(&ngram).unwrap();

		let expected = 0.2 * 1.0 + 0.5 * (2.0 / 12.0);
		assert!(p.is_finite());
		assert!((p - expected).abs() < EPSILON);
	}

	#[test]
	fn test_fixed_context_sums_to_one() {
		let mut model = trained();
		let words: Vec<String> = model.vocabulary().iter().map(str::to_owned).collect();
		let mut sum = 0.0;
		for word in &words {
			let ngram = model.base().ngram(["I", "want", word.as_str()]).unwrap();
			sum += model.probability(&ngram).unwrap();
		}
		// The start marker keeps part of the unigram mass
		assert_eq!(sum.round(), 1.0);
		assert!(sum <= 1.0 + EPSILON);
	}

	#[test]
	fn test_comparison_mode_must_match_the_model() {
		let mut model = trained();
		let foreign = NGram::new(["I", "want", "{{UNK}}"], Comparison::CaseInsensitive).unwrap();
		assert!(matches!(model.probability(&foreign), Err(ModelError::InvalidArgument(_))));

		let own = NGram::new(["I", "want", "{{UNK}}"], Comparison::CaseSensitive).unwrap();
		assert!(model.probability(&own).unwrap() > 0.0);
	}

	#[test]
	fn test_weights_are_validated() {
		let mut model = trained();
		assert!(model.set_smoothing_values(&[0.6, 0.6, 0.6]).is_err());
		assert!(model.set_smoothing_values(&[0.0, 0.0, 1.0]).is_ok());

		let ngram = model.base().ngram(["I", "want", "{{UNK}}"]).unwrap();
		assert!((model.probability(&ngram).unwrap() - 1.0).abs() < EPSILON);
	}
}
