use super::settings::Settings;

/// Turns a raw sentence into the padded token sequence the models count.
///
/// `"I want to."` with order 3 becomes
/// `[{{*}}, {{*}}, I, want, to, {{END}}]`.
#[derive(Clone, Debug)]
pub struct SentenceNormalizer {
	order: usize,
	start_token: String,
	end_token: String,
	separator: String,
	terminators: Vec<char>,
}

impl SentenceNormalizer {
	pub fn new(settings: &Settings) -> Self {
		Self {
			order: settings.order,
			start_token: settings.start_token.clone(),
			end_token: settings.end_token.clone(),
			separator: settings.separator.clone(),
			terminators: settings.sentence_terminators.chars().collect(),
		}
	}

	/// Strips trailing terminators, splits on the separator (dropping empty
	/// pieces) and pads with `N-1` start markers and one end marker.
	pub fn normalize(&self, sentence: &str) -> Vec<String> {
		let trimmed = sentence
			.trim()
			.trim_end_matches(|c| self.terminators.contains(&c))
			.trim_end();

		let mut tokens = Vec::with_capacity(self.order + trimmed.len() / 4 + 1);
		tokens.extend((1..self.order).map(|_| self.start_token.clone()));
		tokens.extend(
			trimmed
				.split(self.separator.as_str())
				.filter(|t| !t.is_empty())
				.map(str::to_owned),
		);
		tokens.push(self.end_token.clone());
		tokens
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn test_normalize_pads_and_strips() {
		let normalizer = SentenceNormalizer::new(&Settings::default());
		assert_eq!(
			normalizer.normalize("I want to."),
			vec!["{{*}}", "{{*}}", "I", "want", "to", "{{END}}"]
		);
	}

	#[test]
	fn test_normalize_collapses_repeated_separators() {
		let normalizer = SentenceNormalizer::new(&Settings::default());
		assert_eq!(
			normalizer.normalize("  I  want you ...  "),
			vec!["{{*}}", "{{*}}", "I", "want", "you", "{{END}}"]
		);
	}

	#[test]
	fn test_normalize_empty_sentence() {
		let normalizer = SentenceNormalizer::new(&Settings::with_order(2));
		assert_eq!(normalizer.normalize(""), vec!["{{*}}", "{{END}}"]);
	}

	#[test]
	fn test_custom_separator_and_terminators() {
		let settings = Settings {
			separator: "|".to_owned(),
			sentence_terminators: "!?".to_owned(),
			..Settings::with_order(1)
		};
		let normalizer = SentenceNormalizer::new(&settings);
		assert_eq!(normalizer.normalize("a|b||c?!"), vec!["a", "b", "c", "{{END}}"]);
	}
}
