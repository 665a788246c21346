use log::debug;

use crate::error::ModelError;
use crate::model::LanguageModel;

/// Aggregated score of a corpus.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerplexityReport {
	/// `log_base ^ (-log_probability / scored_tokens)`, infinite if no token
	/// was scored
	pub perplexity: f64,
	/// Sum of the sentence log-probabilities
	pub log_probability: f64,
	pub scored_tokens: usize,
	pub unknown_tokens: usize,
	pub sentences: usize,
}

impl PerplexityReport {
	/// Fraction of scored tokens that were mapped to UNK.
	pub fn unknown_rate(&self) -> f64 {
		if self.scored_tokens == 0 {
			return 0.0;
		}
		self.unknown_tokens as f64 / self.scored_tokens as f64
	}
}

/// Computes the perplexity of a model over a corpus.
///
/// The normalizer is the number of tokens scored over the whole corpus, not
/// the number of sentences.
pub struct PerplexityCalculator<'a, M: LanguageModel> {
	model: &'a mut M,
}

impl<'a, M: LanguageModel> PerplexityCalculator<'a, M> {
	pub fn new(model: &'a mut M) -> Self {
		Self { model }
	}

	/// Scores every sentence of `corpus`.
	///
	/// An empty corpus is not an error: the report holds an infinite
	/// perplexity and zero counts.
	pub fn perplexity<I, S>(&mut self, corpus: I) -> Result<PerplexityReport, ModelError>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut log_probability = 0.0;
		let mut scored_tokens = 0;
		let mut unknown_tokens = 0;
		let mut sentences = 0;

		for sentence in corpus {
			let score = self.model.sentence_log_probability(sentence.as_ref())?;
			log_probability += score.log_probability;
			scored_tokens += score.scored_tokens;
			unknown_tokens += score.unknown_tokens;
			sentences += 1;
		}

		let perplexity = if scored_tokens == 0 {
			f64::INFINITY
		} else {
			self.model.settings().log_base.powf(-log_probability / scored_tokens as f64)
		};

		debug!(
			"Perplexity {} over {} sentences ({} tokens, {} unknown)",
			perplexity, sentences, scored_tokens, unknown_tokens
		);

		Ok(PerplexityReport { perplexity, log_probability, scored_tokens, unknown_tokens, sentences })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::{LinearInterpolationModel, Settings};

	fn trained() -> LinearInterpolationModel {
		let mut model = LinearInterpolationModel::new(Settings::default()).unwrap();
		model.train(["I want to.", "I want you", "you want to eat"]);
		model
	}

	#[test]
	fn test_empty_corpus_is_infinite() {
		let mut model = trained();
		let corpus: Vec<&str> = Vec::new();
		let report = PerplexityCalculator::new(&mut model).perplexity(corpus).unwrap();

		assert!(report.perplexity.is_infinite());
		assert_eq!(report.scored_tokens, 0);
		assert_eq!(report.unknown_rate(), 0.0);
	}

	#[test]
	fn test_normalizes_by_total_tokens() {
		let mut model = trained();
		let corpus = ["I want to.", "you want"];

		let first = model.sentence_log_probability(corpus[0]).unwrap();
		let second = model.sentence_log_probability(corpus[1]).unwrap();
		let report = PerplexityCalculator::new(&mut model).perplexity(corpus).unwrap();

		let tokens = first.scored_tokens + second.scored_tokens;
		let expected = 2f64.powf(-(first.log_probability + second.log_probability) / tokens as f64);
		assert_eq!(report.scored_tokens, tokens);
		assert_eq!(report.sentences, 2);
		assert!((report.perplexity - expected).abs() < 1e-9);
		assert!(report.perplexity >= 1.0);
	}

	#[test]
	fn test_counts_unknown_tokens() {
		let mut model = trained();
		let report = PerplexityCalculator::new(&mut model)
			.perplexity(["I want pizza"])
			.unwrap();

		// I, want, pizza, end marker
		assert_eq!(report.scored_tokens, 4);
		assert_eq!(report.unknown_tokens, 1);
		assert!(report.perplexity.is_finite());
	}
}
