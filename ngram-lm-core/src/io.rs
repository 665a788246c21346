use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::ModelError;

const PERCENTAGE_TOLERANCE: f64 = 1e-9;

/// Reads a corpus file and returns one sentence per line.
///
/// - Reads the entire file into memory
/// - Splits on `\n` / `\r\n`
/// - Drops blank lines
pub fn read_lines<P: AsRef<Path>>(filename: P) -> io::Result<Vec<String>> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	Ok(contents
		.lines()
		.filter(|line| !line.trim().is_empty())
		.map(str::to_owned)
		.collect())
}

/// A corpus split in three disjoint partitions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CorpusSplit {
	pub train: Vec<String>,
	pub validate: Vec<String>,
	pub test: Vec<String>,
}

/// Splits `lines` into train, validate and test partitions.
///
/// # Behavior
/// - The train and validate sizes are `percentage / 100 * len`, rounded half
///   to even; the test partition takes the remainder
/// - Lines keep their order unless `shuffle_seed` is given, in which case
///   they are shuffled deterministically first
///
/// # Errors
/// Returns `InvalidArgument` if a percentage is negative or if the three do
/// not sum to 100.
pub fn split_corpus(
	mut lines: Vec<String>,
	train: f64,
	validate: f64,
	test: f64,
	shuffle_seed: Option<u64>,
) -> Result<CorpusSplit, ModelError> {
	if [train, validate, test].iter().any(|p| !p.is_finite() || *p < 0.0) {
		return Err(ModelError::InvalidArgument(format!(
			"split percentages must be non-negative, got {} / {} / {}",
			train, validate, test
		)));
	}
	if (train + validate + test - 100.0).abs() > PERCENTAGE_TOLERANCE {
		return Err(ModelError::InvalidArgument(format!(
			"split percentages must sum to 100, got {} / {} / {}",
			train, validate, test
		)));
	}

	if let Some(seed) = shuffle_seed {
		lines.shuffle(&mut StdRng::seed_from_u64(seed));
	}

	let total = lines.len();
	let bucket = |percentage: f64| ((percentage / 100.0) * total as f64).round_ties_even() as usize;
	let train_len = bucket(train).min(total);
	let validate_len = bucket(validate).min(total - train_len);

	let mut rest = lines.split_off(train_len);
	let test_lines = rest.split_off(validate_len);
	let split = CorpusSplit { train: lines, validate: rest, test: test_lines };

	info!(
		"Split {} lines: {} train, {} validate, {} test",
		total,
		split.train.len(),
		split.validate.len(),
		split.test.len()
	);
	Ok(split)
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	fn numbered(count: usize) -> Vec<String> {
		(0..count).map(|i| format!("line {}", i)).collect()
	}

	#[test]
	fn test_split_sizes_follow_percentages() {
		let split = split_corpus(numbered(10), 80.0, 10.0, 10.0, None).unwrap();
		assert_eq!(split.train.len(), 8);
		assert_eq!(split.validate.len(), 1);
		assert_eq!(split.test.len(), 1);
		assert_eq!(split.train[0], "line 0");
		assert_eq!(split.test[0], "line 9");
	}

	#[test]
	fn test_test_partition_takes_the_remainder() {
		// 2.5 rounds to 2 twice, the test bucket gets what is left
		let split = split_corpus(numbered(5), 50.0, 50.0, 0.0, None).unwrap();
		assert_eq!(split.train.len(), 2);
		assert_eq!(split.validate.len(), 2);
		assert_eq!(split.test.len(), 1);
	}

	#[test]
	fn test_percentages_must_sum_to_100() {
		assert!(split_corpus(numbered(10), 80.0, 10.0, 5.0, None).is_err());
		assert!(split_corpus(numbered(10), 110.0, -10.0, 0.0, None).is_err());
	}

	#[test]
	fn test_shuffle_is_deterministic() {
		let first = split_corpus(numbered(50), 60.0, 20.0, 20.0, Some(7)).unwrap();
		let second = split_corpus(numbered(50), 60.0, 20.0, 20.0, Some(7)).unwrap();
		assert_eq!(first, second);

		let mut all: Vec<String> = first.train.into_iter().chain(first.validate).chain(first.test).collect();
		all.sort();
		let mut expected = numbered(50);
		expected.sort();
		assert_eq!(all, expected);
	}
}
