use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ModelError;
use super::language_model::{LanguageModel, ModelBase};
use super::ngram::NGram;
use super::settings::{Settings, SmoothingTable};

/// Leftover mass below this is rounding noise, not mass to redistribute.
const ALPHA_TOLERANCE: f64 = 1e-12;

/// Words of the vocabulary split by whether they extend a context into an
/// n-gram seen in training.
#[derive(Clone, Debug, Default)]
struct Continuations {
	seen: Vec<String>,
	unseen: Vec<String>,
}

/// Katz-style back-off model with absolute discounting.
///
/// For an n-gram of order `k`:
/// - seen: `(count - beta[k]) / count(context)`
/// - unseen: `alpha(context) * P(suffix) / Z(context)` where `Z` sums the
///   lower-order probability of every continuation of `context` that was not
///   seen in training
///
/// `alpha(context)` is the mass left by discounting, so the probabilities of
/// every word following a seen context sum to 1. The recursion strictly
/// decreases the order and ends at order 1, where the denominator is the
/// total word count.
///
/// # Caches
/// - discounted MLE, alpha, unseen n-gram probability and `Z` depend on the
///   discounts and are cleared on any settings change
/// - continuations depend only on the counts and are cleared on training
#[derive(Clone, Debug)]
pub struct BackOffModel {
	base: ModelBase,
	discounted_cache: HashMap<NGram, f64>,
	alpha_cache: HashMap<NGram, f64>,
	unseen_cache: HashMap<NGram, f64>,
	mass_cache: HashMap<NGram, f64>,
	continuation_cache: HashMap<NGram, Arc<Continuations>>,
}

impl BackOffModel {
	/// Creates an untrained model.
	///
	/// # Errors
	/// Returns `InvalidSettings` if `settings` break an invariant.
	pub fn new(settings: Settings) -> Result<Self, ModelError> {
		Ok(Self {
			base: ModelBase::new(settings)?,
			discounted_cache: HashMap::new(),
			alpha_cache: HashMap::new(),
			unseen_cache: HashMap::new(),
			mass_cache: HashMap::new(),
			continuation_cache: HashMap::new(),
		})
	}

	/// Discounted MLE of a seen n-gram.
	///
	/// # Errors
	/// - `DegenerateModel` if the context count is 0
	/// - `NegativeDiscount` if the discount is not below the count
	pub fn discounted_mle(&mut self, ngram: &NGram) -> Result<f64, ModelError> {
		if let Some(p) = self.discounted_cache.get(ngram) {
			return Ok(*p);
		}

		let count = self.base.counter().count(ngram);
		let discount = self.base.settings().discounts[ngram.order() - 1];
		let numerator = count as f64 - discount;
		if numerator < 0.0 {
			return Err(ModelError::NegativeDiscount { ngram: ngram.to_string(), count, discount });
		}
		let denominator = self.base.context_count(ngram);
		if denominator == 0 {
			return Err(ModelError::DegenerateModel(format!("the context of {} was never counted", ngram)));
		}

		let p = numerator / denominator as f64;
		self.discounted_cache.insert(ngram.clone(), p);
		Ok(p)
	}

	/// Probability mass left to unseen continuations of `context`.
	///
	/// `1 - sum of the discounted MLE of every seen continuation`.
	pub fn alpha(&mut self, context: &NGram) -> Result<f64, ModelError> {
		if let Some(a) = self.alpha_cache.get(context) {
			return Ok(*a);
		}

		let continuations = self.continuations(context);
		let mut alpha = 1.0;
		for word in &continuations.seen {
			alpha -= self.discounted_mle(&context.extend(word))?;
		}

		self.alpha_cache.insert(context.clone(), alpha);
		Ok(alpha)
	}

	/// Lower-order probability summed over the unseen continuations of
	/// `context` (the `Z` of the back-off formula).
	fn backoff_mass(&mut self, context: &NGram) -> Result<f64, ModelError> {
		if let Some(z) = self.mass_cache.get(context) {
			return Ok(*z);
		}

		let continuations = self.continuations(context);
		let mut mass = 0.0;
		for word in &continuations.unseen {
			// The candidate n-gram minus its first token
			let lower = context.extend(word).suffix().ok_or_else(|| {
				ModelError::DegenerateModel(format!("context {} has no lower order", context))
			})?;
			mass += self.backoff_probability(&lower)?;
		}

		self.mass_cache.insert(context.clone(), mass);
		Ok(mass)
	}

	/// Splits the vocabulary by whether `context + word` was seen.
	fn continuations(&mut self, context: &NGram) -> Arc<Continuations> {
		if let Some(c) = self.continuation_cache.get(context) {
			return Arc::clone(c);
		}

		let mut continuations = Continuations::default();
		for word in self.base.vocabulary().iter() {
			if self.base.counter().count(&context.extend(word)) > 0 {
				continuations.seen.push(word.to_owned());
			} else {
				continuations.unseen.push(word.to_owned());
			}
		}

		let continuations = Arc::new(continuations);
		self.continuation_cache.insert(context.clone(), Arc::clone(&continuations));
		continuations
	}

	/// Recursive back-off probability, memoized per n-gram.
	fn backoff_probability(&mut self, ngram: &NGram) -> Result<f64, ModelError> {
		if self.base.counter().count(ngram) > 0 {
			return self.discounted_mle(ngram);
		}

		let (Some(context), Some(suffix)) = (ngram.context(), ngram.suffix()) else {
			// Order 1 and never counted: nothing left to back off to
			return Err(ModelError::UnseenUnigram(ngram.last().to_owned()));
		};

		if let Some(p) = self.unseen_cache.get(ngram) {
			return Ok(*p);
		}

		let alpha = self.alpha(&context)?;
		if alpha <= ALPHA_TOLERANCE {
			// Seen continuations hold all the mass (zero discounts)
			self.unseen_cache.insert(ngram.clone(), 0.0);
			return Ok(0.0);
		}
		let lower = self.backoff_probability(&suffix)?;
		let mass = self.backoff_mass(&context)?;
		if mass <= 0.0 {
			return Err(ModelError::DegenerateModel(format!(
				"no probability mass to redistribute after context {}",
				context
			)));
		}

		let p = alpha * lower / mass;
		self.unseen_cache.insert(ngram.clone(), p);
		Ok(p)
	}
}

impl LanguageModel for BackOffModel {
	fn base(&self) -> &ModelBase {
		&self.base
	}

	fn base_mut(&mut self) -> &mut ModelBase {
		&mut self.base
	}

	fn smoothing_table(&self) -> SmoothingTable {
		SmoothingTable::Discounts
	}

	fn estimate_probability(&mut self, ngram: &NGram) -> Result<f64, ModelError> {
		self.backoff_probability(ngram)
	}

	fn clear_cache_for_settings_change(&mut self) {
		self.discounted_cache.clear();
		self.alpha_cache.clear();
		self.unseen_cache.clear();
		self.mass_cache.clear();
	}

	fn clear_cache(&mut self) {
		self.base.clear_cache();
		self.clear_cache_for_settings_change();
		self.continuation_cache.clear();
	}
}
