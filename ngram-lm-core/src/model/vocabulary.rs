use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::ngram::Comparison;

/// Set of distinct tokens observed during training.
///
/// Tokens are keyed under the comparison mode, so `"The"` and `"the"` are the
/// same word in case-insensitive mode. The first surface form seen is kept
/// and returned by [`Vocabulary::iter`]. Iteration order is deterministic,
/// which keeps sums over the vocabulary reproducible between runs.
#[derive(Clone, Debug)]
pub struct Vocabulary {
	comparison: Comparison,
	/// Mapping from the comparison key to the first surface form
	words: BTreeMap<String, String>,
}

impl Vocabulary {
	pub fn new(comparison: Comparison) -> Self {
		Self { comparison, words: BTreeMap::new() }
	}

	/// Adds a token. Returns `true` if it was not present yet.
	pub fn insert(&mut self, token: &str) -> bool {
		let key = self.comparison.key(token);
		if self.words.contains_key(&key) {
			return false;
		}
		self.words.insert(key, token.to_owned());
		true
	}

	pub fn contains(&self, token: &str) -> bool {
		self.words.contains_key(&self.comparison.key(token))
	}

	pub fn len(&self) -> usize {
		self.words.len()
	}

	pub fn is_empty(&self) -> bool {
		self.words.is_empty()
	}

	/// Iterates over the surface forms.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.words.values().map(String::as_str)
	}
}

/// Policy used during training to produce the UNK marker.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum UnkMode {
	/// Tokens are counted as they are.
	Disabled,
	/// The first training occurrence of every word becomes UNK.
	FirstOccurrence,
	/// A percentage of the words seen once in a training batch become UNK.
	#[default]
	Singletons,
}

/// Decides which training tokens are replaced by the UNK marker.
///
/// # Responsibilities
/// - Remember every word already met, so that only first occurrences are
///   replaced in `FirstOccurrence` mode
/// - Select singleton words of a batch in `Singletons` mode
///
/// The start, end and UNK markers are registered at construction and are
/// never replaced.
#[derive(Clone, Debug)]
pub struct UnkTracker {
	mode: UnkMode,
	percentage: f64,
	unk_token: String,
	comparison: Comparison,
	/// Comparison keys of every word met so far
	seen: HashSet<String>,
	/// Comparison keys of the markers
	reserved: HashSet<String>,
}

impl UnkTracker {
	pub fn new(
		mode: UnkMode,
		percentage: f64,
		comparison: Comparison,
		unk_token: &str,
		reserved: &[&str],
	) -> Self {
		let mut reserved_keys: HashSet<String> = reserved.iter().map(|t| comparison.key(t)).collect();
		reserved_keys.insert(comparison.key(unk_token));
		Self {
			mode,
			percentage,
			unk_token: unk_token.to_owned(),
			comparison,
			seen: reserved_keys.clone(),
			reserved: reserved_keys,
		}
	}

	pub fn mode(&self) -> UnkMode {
		self.mode
	}

	/// Replaces tokens of a training batch by the UNK marker in place.
	///
	/// `vocabulary` is the vocabulary before this batch; in `Singletons` mode
	/// words it already holds are never candidates.
	///
	/// Returns the number of replaced tokens.
	pub fn substitute(&mut self, batch: &mut [Vec<String>], vocabulary: &Vocabulary) -> usize {
		match self.mode {
			UnkMode::Disabled => 0,
			UnkMode::FirstOccurrence => self.substitute_first_occurrences(batch),
			UnkMode::Singletons => self.substitute_singletons(batch, vocabulary),
		}
	}

	fn substitute_first_occurrences(&mut self, batch: &mut [Vec<String>]) -> usize {
		let mut replaced = 0;
		for token in batch.iter_mut().flat_map(|sentence| sentence.iter_mut()) {
			if self.seen.insert(self.comparison.key(token)) {
				*token = self.unk_token.clone();
				replaced += 1;
			}
		}
		replaced
	}

	fn substitute_singletons(&mut self, batch: &mut [Vec<String>], vocabulary: &Vocabulary) -> usize {
		let mut occurrences: HashMap<String, usize> = HashMap::new();
		for token in batch.iter().flatten() {
			*occurrences.entry(self.comparison.key(token)).or_insert(0) += 1;
		}

		let singletons: HashSet<String> = occurrences
			.into_iter()
			.filter(|(key, count)| *count == 1 && !self.reserved.contains(key))
			.map(|(key, _)| key)
			.filter(|key| !vocabulary.contains(key))
			.collect();

		let mut budget = (self.percentage / 100.0 * singletons.len() as f64).round() as usize;
		let mut replaced = 0;
		for token in batch.iter_mut().flat_map(|sentence| sentence.iter_mut()) {
			if budget == 0 {
				break;
			}
			if singletons.contains(&self.comparison.key(token)) {
				*token = self.unk_token.clone();
				budget -= 1;
				replaced += 1;
			}
		}
		replaced
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn batch(sentences: &[&[&str]]) -> Vec<Vec<String>> {
		sentences
			.iter()
			.map(|s| s.iter().map(|t| t.to_string()).collect())
			.collect()
	}

	fn tracker(mode: UnkMode, percentage: f64) -> UnkTracker {
		UnkTracker::new(mode, percentage, Comparison::CaseSensitive, "<unk>", &["<s>", "</s>"])
	}

	#[test]
	fn test_vocabulary_keeps_first_surface_form() {
		let mut vocabulary = Vocabulary::new(Comparison::CaseInsensitive);
		assert!(vocabulary.insert("The"));
		assert!(!vocabulary.insert("the"));
		assert!(vocabulary.contains("THE"));
		assert_eq!(vocabulary.iter().collect::<Vec<_>>(), vec!["The"]);
		assert_eq!(vocabulary.len(), 1);
	}

	#[test]
	fn test_first_occurrence_replaces_only_new_words() {
		let mut unk = tracker(UnkMode::FirstOccurrence, 100.0);
		let mut tokens = batch(&[&["<s>", "a", "b", "a", "</s>"], &["<s>", "b", "c", "</s>"]]);

		let replaced = unk.substitute(&mut tokens, &Vocabulary::new(Comparison::CaseSensitive));

		assert_eq!(replaced, 3);
		assert_eq!(tokens[0], ["<s>", "<unk>", "<unk>", "a", "</s>"]);
		assert_eq!(tokens[1], ["<s>", "b", "<unk>", "</s>"]);
	}

	#[test]
	fn test_singletons_respect_percentage_and_order() {
		let mut unk = tracker(UnkMode::Singletons, 50.0);
		let mut tokens = batch(&[&["<s>", "x", "a", "y", "</s>"], &["<s>", "a", "z", "w", "</s>"]]);

		// 4 singletons (x, y, z, w), half of them replaced in corpus order
		let replaced = unk.substitute(&mut tokens, &Vocabulary::new(Comparison::CaseSensitive));

		assert_eq!(replaced, 2);
		assert_eq!(tokens[0], ["<s>", "<unk>", "a", "<unk>", "</s>"]);
		assert_eq!(tokens[1], ["<s>", "a", "z", "w", "</s>"]);
	}

	#[test]
	fn test_singletons_skip_known_words() {
		let mut unk = tracker(UnkMode::Singletons, 100.0);
		let mut vocabulary = Vocabulary::new(Comparison::CaseSensitive);
		vocabulary.insert("known");
		let mut tokens = batch(&[&["<s>", "known", "new", "</s>"]]);

		assert_eq!(unk.substitute(&mut tokens, &vocabulary), 1);
		assert_eq!(tokens[0], ["<s>", "known", "<unk>", "</s>"]);
	}

	#[test]
	fn test_disabled_keeps_tokens() {
		let mut unk = tracker(UnkMode::Disabled, 100.0);
		let mut tokens = batch(&[&["<s>", "a", "</s>"]]);
		assert_eq!(unk.substitute(&mut tokens, &Vocabulary::new(Comparison::CaseSensitive)), 0);
		assert_eq!(tokens[0], ["<s>", "a", "</s>"]);
	}
}
