use std::collections::HashMap;

use log::{debug, info};

use crate::error::ModelError;
use super::counter::NGramCounter;
use super::ngram::NGram;
use super::normalizer::SentenceNormalizer;
use super::settings::{Settings, SmoothingTable};
use super::vocabulary::{UnkTracker, Vocabulary};

/// Outcome of a training call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrainingSummary {
	pub sentences: usize,
	/// Tokens counted, markers included
	pub tokens: usize,
	/// Tokens replaced by the UNK marker
	pub unknown_replacements: usize,
}

/// Log-space score of one sentence.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SentenceScore {
	/// Sum of `log_base(P(ngram))` over the scored windows
	pub log_probability: f64,
	/// Real tokens scored (end marker included)
	pub scored_tokens: usize,
	/// Scored tokens that were mapped to UNK
	pub unknown_tokens: usize,
}

/// State shared by every smoothing strategy.
///
/// # Responsibilities
/// - Hold the settings, the normalizer and the n-gram counter
/// - Apply the UNK policy while training
/// - Memoize plain maximum-likelihood estimates
///
/// The MLE cache depends only on the counts and is cleared whenever new
/// sentences are trained.
#[derive(Clone, Debug)]
pub struct ModelBase {
	settings: Settings,
	normalizer: SentenceNormalizer,
	counter: NGramCounter,
	unk: UnkTracker,
	mle_cache: HashMap<NGram, f64>,
}

impl ModelBase {
	/// Creates an untrained model state.
	///
	/// # Errors
	/// Returns `InvalidSettings` if `settings` break an invariant.
	pub fn new(settings: Settings) -> Result<Self, ModelError> {
		settings.validate()?;
		let normalizer = SentenceNormalizer::new(&settings);
		let counter = NGramCounter::new(settings.order, settings.comparison, &settings.start_token);
		let unk = UnkTracker::new(
			settings.unk_mode,
			settings.unk_percentage,
			settings.comparison,
			&settings.unk_token,
			&[&settings.start_token, &settings.end_token],
		);
		Ok(Self { settings, normalizer, counter, unk, mle_cache: HashMap::new() })
	}

	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	pub fn counter(&self) -> &NGramCounter {
		&self.counter
	}

	pub fn vocabulary(&self) -> &Vocabulary {
		self.counter.vocabulary()
	}

	pub fn normalizer(&self) -> &SentenceNormalizer {
		&self.normalizer
	}

	/// Builds an n-gram with the model's comparison mode.
	pub fn ngram<S: Into<String>>(&self, tokens: impl IntoIterator<Item = S>) -> Result<NGram, ModelError> {
		NGram::new(tokens, self.settings.comparison)
	}

	/// Normalizes, applies the UNK policy and counts a batch of sentences.
	pub fn train<I, S>(&mut self, sentences: I) -> TrainingSummary
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut batch: Vec<Vec<String>> = sentences
			.into_iter()
			.map(|s| self.normalizer.normalize(s.as_ref()))
			.collect();

		let unknown_replacements = self.unk.substitute(&mut batch, self.counter.vocabulary());

		let mut tokens = 0;
		for sentence in &batch {
			self.counter.populate(sentence);
			tokens += sentence.len();
		}
		self.mle_cache.clear();

		let summary = TrainingSummary { sentences: batch.len(), tokens, unknown_replacements };
		info!(
			"Trained {} sentences ({} tokens, {} replaced by UNK), vocabulary size {}",
			summary.sentences,
			summary.tokens,
			summary.unknown_replacements,
			self.vocabulary().len()
		);
		summary
	}

	/// Count of the n-gram's context, or the total word count for a unigram.
	pub fn context_count(&self, ngram: &NGram) -> u64 {
		match ngram.context() {
			Some(context) => self.counter.count(&context),
			None => self.counter.total_words(),
		}
	}

	/// Maximum-likelihood estimate `count(ngram) / count(context)`.
	///
	/// Undefined estimates (unseen context) are returned as NaN or infinity,
	/// callers decide how to treat them.
	pub fn mle(&mut self, ngram: &NGram) -> f64 {
		if let Some(p) = self.mle_cache.get(ngram) {
			return *p;
		}
		let p = self.counter.count(ngram) as f64 / self.context_count(ngram) as f64;
		self.mle_cache.insert(ngram.clone(), p);
		p
	}

	/// Replaces one smoothing table, validated.
	pub(crate) fn set_table(&mut self, table: SmoothingTable, values: &[f64]) -> Result<(), ModelError> {
		self.settings.set_table(table, values)
	}

	pub fn clear_cache(&mut self) {
		self.mle_cache.clear();
	}

	/// Normalizes a sentence for scoring and maps unknown tokens to UNK.
	///
	/// Returns the tokens and the number of replaced tokens. Start markers are
	/// never replaced.
	fn scoring_tokens(&self, sentence: &str) -> (Vec<String>, usize) {
		let mut tokens = self.normalizer.normalize(sentence);
		let mut unknown = 0;
		let first = self.settings.order - 1;
		for token in tokens.iter_mut().skip(first) {
			if !self.vocabulary().contains(token) {
				*token = self.settings.unk_token.clone();
				unknown += 1;
			}
		}
		(tokens, unknown)
	}
}

/// A smoothed n-gram language model.
///
/// Implementors provide [`LanguageModel::estimate_probability`] and the
/// cache handling of their strategy; training, validation of requests and
/// sentence-level scoring are shared.
///
/// Every method that can change a probability (training, smoothing values)
/// clears the dependent caches before returning, so a cached value is never
/// read under a configuration it was not computed with.
pub trait LanguageModel {
	fn base(&self) -> &ModelBase;

	fn base_mut(&mut self) -> &mut ModelBase;

	/// The smoothing table this strategy reads.
	fn smoothing_table(&self) -> SmoothingTable;

	/// Strategy-specific probability of a validated n-gram.
	fn estimate_probability(&mut self, ngram: &NGram) -> Result<f64, ModelError>;

	/// Clears the caches that depend on the smoothing values.
	fn clear_cache_for_settings_change(&mut self);

	/// Clears every cache, count-derived ones included.
	fn clear_cache(&mut self) {
		self.base_mut().clear_cache();
		self.clear_cache_for_settings_change();
	}

	fn settings(&self) -> &Settings {
		self.base().settings()
	}

	fn vocabulary(&self) -> &Vocabulary {
		self.base().vocabulary()
	}

	/// Current values of the strategy's smoothing table.
	fn smoothing_values(&self) -> Vec<f64> {
		self.settings().table(self.smoothing_table()).to_vec()
	}

	/// Replaces the strategy's smoothing table and resets the caches.
	///
	/// # Errors
	/// Returns `InvalidSettings` if the values break an invariant; the model
	/// is left unchanged.
	fn set_smoothing_values(&mut self, values: &[f64]) -> Result<(), ModelError> {
		let table = self.smoothing_table();
		self.base_mut().set_table(table, values)?;
		self.clear_cache_for_settings_change();
		Ok(())
	}

	/// Trains the model with more sentences.
	///
	/// Counts accumulate across calls. Every cache is cleared.
	fn train<I, S>(&mut self, sentences: I) -> TrainingSummary
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
		Self: Sized,
	{
		let summary = self.base_mut().train(sentences);
		self.clear_cache();
		summary
	}

	/// Probability of an n-gram of order `1..=N`.
	///
	/// # Errors
	/// - `NotTrained` if no sentence was trained
	/// - `OrderOutOfRange` if the order is above `N`
	/// - `InvalidArgument` if the n-gram was built with another comparison
	///   mode than the model's, since none of its lookups could match
	/// - strategy errors (degenerate statistics, negative discount)
	fn probability(&mut self, ngram: &NGram) -> Result<f64, ModelError> {
		let max = self.settings().order;
		if ngram.order() > max {
			return Err(ModelError::OrderOutOfRange { order: ngram.order(), max });
		}
		let comparison = self.settings().comparison;
		if ngram.comparison() != comparison {
			return Err(ModelError::InvalidArgument(format!(
				"n-gram {} uses {:?} but the model compares tokens with {:?}",
				ngram,
				ngram.comparison(),
				comparison
			)));
		}
		if self.base().counter().total_words() == 0 {
			return Err(ModelError::NotTrained);
		}
		self.estimate_probability(ngram)
	}

	/// Probability of a sentence, the product of its order-N windows.
	fn sentence_probability(&mut self, sentence: &str) -> Result<f64, ModelError> {
		let (tokens, _) = self.base().scoring_tokens(sentence);
		let n = self.settings().order;
		let comparison = self.settings().comparison;

		let mut probability = 1.0;
		for i in n - 1..tokens.len() {
			let ngram = NGram::from_window(&tokens[i + 1 - n..=i], comparison);
			probability *= self.probability(&ngram)?;
		}
		Ok(probability)
	}

	/// Log-space score of a sentence.
	///
	/// Same windows as [`LanguageModel::sentence_probability`], summing
	/// `log_base` of each probability. A zero probability yields negative
	/// infinity.
	fn sentence_log_probability(&mut self, sentence: &str) -> Result<SentenceScore, ModelError> {
		let (tokens, unknown_tokens) = self.base().scoring_tokens(sentence);
		let n = self.settings().order;
		let comparison = self.settings().comparison;
		let log_base = self.settings().log_base;

		let mut score = SentenceScore { unknown_tokens, ..SentenceScore::default() };
		for i in n - 1..tokens.len() {
			let ngram = NGram::from_window(&tokens[i + 1 - n..=i], comparison);
			score.log_probability += self.probability(&ngram)?.log(log_base);
			score.scored_tokens += 1;
		}
		debug!(
			"Scored '{}': log probability {}, {} tokens, {} unknown",
			sentence, score.log_probability, score.scored_tokens, score.unknown_tokens
		);
		Ok(score)
	}
}
