use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::mpsc;
use std::thread;

use log::{debug, info, warn};

use crate::error::ModelError;
use crate::model::LanguageModel;
use super::perplexity::PerplexityCalculator;

/// One point of the discretized simplex: per-order values expressed as
/// integer steps of `1 / resolution`.
///
/// Steps are kept as integers so that equality, hashing and the "sums to 1"
/// check are exact.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Combination {
	steps: Vec<u32>,
	resolution: u32,
}

impl Combination {
	pub fn new(steps: Vec<u32>, resolution: u32) -> Self {
		Self { steps, resolution }
	}

	pub fn steps(&self) -> &[u32] {
		&self.steps
	}

	/// Per-order values, `values()[k - 1]` belongs to order k.
	pub fn values(&self) -> Vec<f64> {
		self.steps
			.iter()
			.map(|s| *s as f64 / self.resolution as f64)
			.collect()
	}
}

impl fmt::Display for Combination {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let values: Vec<String> = self.values().iter().map(|v| v.to_string()).collect();
		write!(f, "[{}]", values.join(", "))
	}
}

/// Perplexity used as an ordered map key.
#[derive(Clone, Copy, Debug)]
struct Score(f64);

impl PartialEq for Score {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl Eq for Score {}

impl PartialOrd for Score {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for Score {
	fn cmp(&self, other: &Self) -> Ordering {
		self.0.total_cmp(&other.0)
	}
}

/// Every evaluated combination, grouped by perplexity.
#[derive(Debug, Default)]
pub struct PerplexityTable {
	scores: BTreeMap<Score, Vec<Combination>>,
}

impl PerplexityTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records a combination under its perplexity.
	///
	/// A NaN perplexity cannot be ranked and is dropped.
	pub fn record(&mut self, perplexity: f64, combination: Combination) {
		if perplexity.is_nan() {
			warn!("Combination {} has no comparable perplexity, skipped", combination);
			return;
		}
		self.scores.entry(Score(perplexity)).or_default().push(combination);
	}

	/// Lowest perplexity and every combination that reached it, sorted.
	pub fn best(&self) -> Option<(f64, Vec<Combination>)> {
		self.scores.iter().next().map(|(score, combinations)| {
			let mut combinations = combinations.clone();
			combinations.sort();
			(score.0, combinations)
		})
	}

	/// Number of recorded combinations.
	pub fn len(&self) -> usize {
		self.scores.values().map(Vec::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.scores.is_empty()
	}
}

/// Outcome of a sweep.
#[derive(Clone, Debug, PartialEq)]
pub struct OptimizationResult {
	/// Lowest perplexity reached, infinite if nothing was evaluated
	pub perplexity: f64,
	/// Every combination that reached `perplexity`
	pub combinations: Vec<Combination>,
	/// Number of evaluated combinations with a comparable perplexity
	pub trials: usize,
}

/// Grid search over the per-order smoothing values of a model.
///
/// # Behavior
/// - Enumerates combinations whose values are multiples of `1/resolution`
///   in `(0, 1)` and sum to 1: all coordinates but one share a base value,
///   the remaining one is swept
/// - For each combination, writes it into the model's smoothing table (which
///   resets the dependent caches) and computes the perplexity of the corpus
/// - Selects the minimum perplexity; ties are all returned
///
/// With more than one worker, the combinations are split across threads and
/// each thread evaluates its share on its own clone of the trained model, so
/// no cache is ever shared between threads.
#[derive(Clone, Debug)]
pub struct Optimizer {
	resolution: u32,
	workers: usize,
}

impl Optimizer {
	/// Creates a sequential optimizer.
	///
	/// # Errors
	/// Returns `InvalidArgument` if `resolution < 2`.
	pub fn new(resolution: u32) -> Result<Self, ModelError> {
		if resolution < 2 {
			return Err(ModelError::InvalidArgument(format!(
				"the trial resolution must be >= 2, got {}",
				resolution
			)));
		}
		Ok(Self { resolution, workers: 1 })
	}

	/// Sets the number of worker threads (at least 1).
	pub fn with_workers(mut self, workers: usize) -> Self {
		self.workers = workers.max(1);
		self
	}

	/// Uses one worker per logical CPU.
	pub fn with_all_cpus(self) -> Self {
		self.with_workers(num_cpus::get())
	}

	pub fn resolution(&self) -> u32 {
		self.resolution
	}

	/// Enumerates the candidate combinations for `order` coordinates.
	///
	/// For each base value and each free coordinate, the swept coordinate has
	/// a single value that closes the simplex; combinations where it falls
	/// outside `(0, 1)` are skipped. Duplicates are removed.
	pub fn combinations(&self, order: usize) -> Vec<Combination> {
		let resolution = self.resolution as u64;
		let fixed = order.saturating_sub(1) as u64;
		let mut seen = HashSet::new();
		let mut combinations = Vec::new();

		for base in 1..resolution {
			let Some(value) = resolution.checked_sub(base * fixed) else {
				break;
			};
			if value == 0 || value >= resolution {
				continue;
			}
			for free in 0..order {
				let mut steps = vec![base as u32; order];
				steps[free] = value as u32;
				let combination = Combination::new(steps, self.resolution);
				if seen.insert(combination.clone()) {
					combinations.push(combination);
				}
			}
		}
		combinations
	}

	/// Finds the smoothing values minimizing the perplexity of `corpus`.
	///
	/// The model is left configured with the first optimal combination, or
	/// with its original values if no combination could be evaluated.
	///
	/// # Errors
	/// - `InvalidArgument` for a model of order 1 (no free coordinate)
	/// - any scoring error raised while evaluating a combination
	pub fn optimal_weights<M, S>(&self, model: &mut M, corpus: &[S]) -> Result<OptimizationResult, ModelError>
	where
		M: LanguageModel + Clone + Send,
		S: AsRef<str> + Sync,
	{
		let order = model.settings().order;
		if order < 2 {
			return Err(ModelError::InvalidArgument(
				"optimizing smoothing values needs an order >= 2".to_owned(),
			));
		}

		let original = model.smoothing_values();
		let combinations = self.combinations(order);
		info!(
			"Evaluating {} combinations at resolution {} with {} worker(s)",
			combinations.len(),
			self.resolution,
			self.workers
		);

		let mut table = PerplexityTable::new();
		if let Err(e) = self.sweep(model, &combinations, corpus, &mut table) {
			model.set_smoothing_values(&original)?;
			return Err(e);
		}

		let trials = table.len();
		match table.best() {
			Some((perplexity, combinations)) => {
				model.set_smoothing_values(&combinations[0].values())?;
				info!(
					"Best perplexity {} reached by {} combination(s), first {}",
					perplexity,
					combinations.len(),
					combinations[0]
				);
				Ok(OptimizationResult { perplexity, combinations, trials })
			}
			None => {
				warn!("No valid combination at resolution {} for order {}", self.resolution, order);
				model.set_smoothing_values(&original)?;
				Ok(OptimizationResult { perplexity: f64::INFINITY, combinations: Vec::new(), trials })
			}
		}
	}

	/// Evaluates every combination into `table`.
	fn sweep<M, S>(
		&self,
		model: &mut M,
		combinations: &[Combination],
		corpus: &[S],
		table: &mut PerplexityTable,
	) -> Result<(), ModelError>
	where
		M: LanguageModel + Clone + Send,
		S: AsRef<str> + Sync,
	{
		if self.workers > 1 && combinations.len() > 1 {
			return self.evaluate_parallel(model, combinations, corpus, table);
		}
		for (perplexity, combination) in evaluate(model, combinations, corpus)? {
			table.record(perplexity, combination);
		}
		Ok(())
	}

	/// Splits the combinations in chunks evaluated on model clones.
	fn evaluate_parallel<M, S>(
		&self,
		model: &M,
		combinations: &[Combination],
		corpus: &[S],
		table: &mut PerplexityTable,
	) -> Result<(), ModelError>
	where
		M: LanguageModel + Clone + Send,
		S: AsRef<str> + Sync,
	{
		let chunk_size = combinations.len().div_ceil(self.workers);

		let (tx, rx) = mpsc::channel();
		thread::scope(|scope| {
			for chunk in combinations.chunks(chunk_size) {
				let tx = tx.clone();
				let mut worker_model = model.clone();
				scope.spawn(move || {
					let outcome = evaluate(&mut worker_model, chunk, corpus);
					if tx.send(outcome).is_err() {
						warn!("Optimizer result channel closed before a worker finished");
					}
				});
			}
		});
		drop(tx);

		for outcome in rx.iter() {
			for (perplexity, combination) in outcome? {
				table.record(perplexity, combination);
			}
		}
		Ok(())
	}
}

/// Evaluates combinations one after the other on a single model.
fn evaluate<M, S>(
	model: &mut M,
	combinations: &[Combination],
	corpus: &[S],
) -> Result<Vec<(f64, Combination)>, ModelError>
where
	M: LanguageModel,
	S: AsRef<str>,
{
	let mut results = Vec::with_capacity(combinations.len());
	for combination in combinations {
		model.set_smoothing_values(&combination.values())?;
		let report = PerplexityCalculator::new(model).perplexity(corpus)?;
		debug!("Combination {} -> perplexity {}", combination, report.perplexity);
		results.push((report.perplexity, combination.clone()));
	}
	Ok(results)
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	fn combination(steps: &[u32]) -> Combination {
		Combination::new(steps.to_vec(), 10)
	}

	#[test]
	fn test_resolution_must_be_at_least_two() {
		assert!(Optimizer::new(1).is_err());
		assert!(Optimizer::new(2).is_ok());
	}

	#[test]
	fn test_combinations_sum_to_resolution() {
		let optimizer = Optimizer::new(10).unwrap();
		let combinations = optimizer.combinations(3);

		// base 1..=4, the free coordinate closes the sum, three positions each
		assert_eq!(combinations.len(), 12);
		for c in &combinations {
			assert_eq!(c.steps().iter().sum::<u32>(), 10);
			assert!(c.steps().iter().all(|s| *s > 0 && *s < 10));
		}
		assert!(combinations.contains(&combination(&[1, 1, 8])));
		assert!(combinations.contains(&combination(&[4, 2, 4])));
	}

	#[test]
	fn test_bigram_combinations_cover_the_simplex() {
		let optimizer = Optimizer::new(4).unwrap();
		let combinations = optimizer.combinations(2);
		let mut steps: Vec<Vec<u32>> = combinations.iter().map(|c| c.steps().to_vec()).collect();
		steps.sort();
		assert_eq!(steps, vec![vec![1, 3], vec![2, 2], vec![3, 1]]);
	}

	#[test]
	fn test_table_selects_minimum() {
		let mut table = PerplexityTable::new();
		table.record(7.0, combination(&[2, 8]));
		table.record(5.0, combination(&[5, 5]));

		let (perplexity, best) = table.best().unwrap();
		assert_eq!(perplexity, 5.0);
		assert_eq!(best, vec![combination(&[5, 5])]);
	}

	#[test]
	fn test_table_returns_every_tie() {
		let mut table = PerplexityTable::new();
		table.record(5.0, combination(&[7, 3]));
		table.record(7.0, combination(&[2, 8]));
		table.record(5.0, combination(&[5, 5]));
		table.record(f64::INFINITY, combination(&[9, 1]));

		let (perplexity, best) = table.best().unwrap();
		assert_eq!(perplexity, 5.0);
		assert_eq!(best, vec![combination(&[5, 5]), combination(&[7, 3])]);
		assert_eq!(table.len(), 4);
	}

	#[test]
	fn test_table_skips_nan_scores() {
		let mut table = PerplexityTable::new();
		table.record(-f64::NAN, combination(&[1, 9]));
		table.record(f64::NAN, combination(&[3, 7]));
		assert!(table.best().is_none());

		table.record(5.0, combination(&[5, 5]));
		let (perplexity, best) = table.best().unwrap();
		assert_eq!(perplexity, 5.0);
		assert_eq!(best, vec![combination(&[5, 5])]);
		assert_eq!(table.len(), 1);
	}

	#[test]
	fn test_failed_sweep_restores_original_values() {
		use crate::model::{BackOffModel, Settings, UnkMode};

		let settings = Settings { unk_mode: UnkMode::Disabled, ..Settings::default() };
		let mut model = BackOffModel::new(settings).unwrap();
		model.train(["I want to.", "I want you"]);
		let original = model.smoothing_values();

		// UNK was never counted, scoring the unknown word fails at order 1
		let result = Optimizer::new(10).unwrap().optimal_weights(&mut model, &["I want zebra"]);
		assert!(matches!(result, Err(ModelError::UnseenUnigram(_))));
		assert_eq!(model.smoothing_values(), original);
	}

	#[test]
	fn test_combination_values_and_display() {
		let c = Combination::new(vec![1, 1, 2], 4);
		assert_eq!(c.values(), vec![0.25, 0.25, 0.5]);
		assert_eq!(c.to_string(), "[0.25, 0.25, 0.5]");
	}
}
