use std::collections::HashMap;

use super::ngram::{Comparison, NGram};
use super::vocabulary::Vocabulary;

/// Multi-order n-gram frequency table.
///
/// For each order `1..=N` the counter maps an [`NGram`] to the number of
/// times it was observed. It also tracks the total number of tokens counted
/// and the vocabulary of counted tokens.
///
/// # Invariants
/// - Counts only grow, and only through [`NGramCounter::populate`]
/// - A missing n-gram has a count of 0
/// - The sum of all unigram counts equals `total_words`
/// - The start marker is never part of the vocabulary
#[derive(Clone, Debug)]
pub struct NGramCounter {
	/// The maximum order (N)
	order: usize,

	comparison: Comparison,

	start_token: String,

	/// `counts[k - 1]` holds the counts of order `k`
	counts: Vec<HashMap<NGram, u64>>,

	/// Number of tokens counted, markers included
	total_words: u64,

	vocabulary: Vocabulary,
}

impl NGramCounter {
	/// Creates an empty counter for orders `1..=order`.
	pub fn new(order: usize, comparison: Comparison, start_token: &str) -> Self {
		Self {
			order,
			comparison,
			start_token: start_token.to_owned(),
			counts: (0..order).map(|_| HashMap::new()).collect(),
			total_words: 0,
			vocabulary: Vocabulary::new(comparison),
		}
	}

	/// Counts every n-gram of a padded sentence.
	///
	/// `tokens` must start with `N-1` start markers and end with the end
	/// marker.
	///
	/// # Behavior
	/// - The prefix made of the first `k` start markers (`k < N`) receives a
	///   weight of `N - k`. These prefixes are only ever seen at the start of a
	///   sentence and would otherwise be undercounted compared to full windows.
	/// - A window slides from the first real token; at each position the
	///   n-grams of every order ending there are incremented.
	pub fn populate(&mut self, tokens: &[String]) {
		let n = self.order;
		if tokens.len() < n {
			// Not padded, nothing to count
			return;
		}

		for k in 1..n {
			let prefix = NGram::from_window(&tokens[..k], self.comparison);
			*self.counts[k - 1].entry(prefix).or_insert(0) += (n - k) as u64;
		}

		for i in n - 1..tokens.len() {
			for k in 1..=n {
				let ngram = NGram::from_window(&tokens[i + 1 - k..=i], self.comparison);
				*self.counts[k - 1].entry(ngram).or_insert(0) += 1;
			}
		}

		for token in tokens {
			if !self.comparison.tokens_equal(token, &self.start_token) {
				self.vocabulary.insert(token);
			}
		}
		self.total_words += tokens.len() as u64;
	}

	/// Returns how many times `ngram` was counted.
	///
	/// Unknown orders and unseen n-grams both return 0.
	pub fn count(&self, ngram: &NGram) -> u64 {
		ngram
			.order()
			.checked_sub(1)
			.and_then(|index| self.counts.get(index))
			.and_then(|counts| counts.get(ngram))
			.copied()
			.unwrap_or(0)
	}

	/// Number of distinct n-grams counted at `order`.
	pub fn distinct(&self, order: usize) -> usize {
		order
			.checked_sub(1)
			.and_then(|index| self.counts.get(index))
			.map_or(0, HashMap::len)
	}

	pub fn order(&self) -> usize {
		self.order
	}

	pub fn total_words(&self) -> u64 {
		self.total_words
	}

	pub fn vocabulary(&self) -> &Vocabulary {
		&self.vocabulary
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn tokens(s: &str) -> Vec<String> {
		s.split(' ').map(str::to_owned).collect()
	}

	fn ngram(s: &str) -> NGram {
		NGram::new(s.split(' '), Comparison::CaseSensitive).unwrap()
	}

	#[test]
	fn test_trigram_counts() {
		let mut counter = NGramCounter::new(3, Comparison::CaseSensitive, "<s>");
		counter.populate(&tokens("<s> <s> I want to </s>"));
		counter.populate(&tokens("<s> <s> I want you </s>"));

		assert_eq!(counter.count(&ngram("I want")), 2);
		assert_eq!(counter.count(&ngram("I want to")), 1);
		assert_eq!(counter.count(&ngram("want you </s>")), 1);
		assert_eq!(counter.count(&ngram("<s> <s> I")), 2);
		assert_eq!(counter.count(&ngram("<s> I")), 2);
		// Start prefixes are weighted by N - k
		assert_eq!(counter.count(&ngram("<s>")), 4);
		assert_eq!(counter.count(&ngram("<s> <s>")), 2);
		assert_eq!(counter.total_words(), 12);
	}

	#[test]
	fn test_unigram_counts_sum_to_total_words() {
		let mut counter = NGramCounter::new(3, Comparison::CaseSensitive, "<s>");
		counter.populate(&tokens("<s> <s> a b a </s>"));
		counter.populate(&tokens("<s> <s> c </s>"));

		let unigrams: u64 = ["<s>", "a", "b", "c", "</s>"]
			.iter()
			.map(|t| counter.count(&ngram(t)))
			.sum();
		assert_eq!(unigrams, counter.total_words());
	}

	#[test]
	fn test_missing_ngrams_count_zero() {
		let mut counter = NGramCounter::new(2, Comparison::CaseSensitive, "<s>");
		counter.populate(&tokens("<s> a </s>"));

		assert_eq!(counter.count(&ngram("a b")), 0);
		assert_eq!(counter.count(&ngram("a b c d")), 0);
		assert_eq!(counter.distinct(5), 0);
		assert_eq!(counter.distinct(0), 0);
	}

	#[test]
	fn test_vocabulary_excludes_start_marker() {
		let mut counter = NGramCounter::new(2, Comparison::CaseSensitive, "<s>");
		counter.populate(&tokens("<s> a b </s>"));

		let words: Vec<&str> = counter.vocabulary().iter().collect();
		assert_eq!(words.len(), 3);
		assert!(!counter.vocabulary().contains("<s>"));
		assert!(counter.vocabulary().contains("</s>"));
	}

	#[test]
	fn test_unigram_model_has_no_prefix() {
		let mut counter = NGramCounter::new(1, Comparison::CaseSensitive, "<s>");
		counter.populate(&tokens("a a </s>"));

		assert_eq!(counter.count(&ngram("a")), 2);
		assert_eq!(counter.total_words(), 3);
		assert_eq!(counter.distinct(1), 2);
	}
}
