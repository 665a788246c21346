use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;

use ngram_lm_core::evaluation::{Optimizer, PerplexityCalculator};
use ngram_lm_core::io::{CorpusSplit, read_lines, split_corpus};
use ngram_lm_core::model::{
	BackOffModel, LanguageModel, LinearInterpolationModel, ModelBase, Settings, UnkMode,
};

#[derive(Parser, Debug)]
#[command(name = "ngram-lm-validator")]
#[command(about = "Trains n-gram language models and measures their perplexity")]
#[command(version)]
struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Train on the train split and report validation and test perplexity
	Evaluate(EvaluateArgs),

	/// Report how many validation tokens never appear in the train split
	Vocabulary(SplitArgs),
}

#[derive(Args, Debug)]
struct SplitArgs {
	/// Corpus file, one sentence per line
	corpus: PathBuf,

	/// Train, validate and test percentages
	#[arg(long, num_args = 3, value_names = ["TRAIN", "VALIDATE", "TEST"], default_values_t = [80.0, 10.0, 10.0])]
	split: Vec<f64>,

	/// Shuffle the lines with this seed before splitting
	#[arg(long)]
	shuffle_seed: Option<u64>,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
	#[command(flatten)]
	split: SplitArgs,

	/// Smoothing strategy
	#[arg(short, long, value_enum, default_value_t = ModelKind::Backoff)]
	model: ModelKind,

	/// N-gram order, resets the smoothing values to the defaults of that order
	#[arg(long)]
	order: Option<usize>,

	/// JSON settings file, missing fields take their default value
	#[arg(long)]
	settings: Option<PathBuf>,

	/// Comma-separated discounts or weights, one per order
	#[arg(long, value_delimiter = ',')]
	values: Option<Vec<f64>>,

	/// Search the smoothing values minimizing the validation perplexity
	#[arg(long)]
	optimize: bool,

	/// Number of steps between 0 and 1 tried by the optimizer
	#[arg(long, default_value_t = 100)]
	resolution: u32,

	/// Optimizer threads, 0 uses every CPU
	#[arg(long, default_value_t = 0)]
	workers: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ModelKind {
	Backoff,
	LinearInterpolation,
}

fn main() -> Result<(), Box<dyn Error>> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let cli = Cli::parse();
	match cli.command {
		Command::Evaluate(args) => evaluate(args),
		Command::Vocabulary(args) => vocabulary(args),
	}
}

/// Loads and splits the corpus.
fn load_split(args: &SplitArgs) -> Result<CorpusSplit, Box<dyn Error>> {
	let lines = read_lines(&args.corpus)?;
	info!("Loaded {} sentences from {}", lines.len(), args.corpus.display());

	let split = split_corpus(lines, args.split[0], args.split[1], args.split[2], args.shuffle_seed)?;
	println!("Training: {}", split.train.len());
	println!("Validate: {}", split.validate.len());
	println!("Test: {}", split.test.len());
	Ok(split)
}

/// Reads a settings file, or returns the defaults.
fn load_settings(path: Option<&Path>, order: Option<usize>) -> Result<Settings, Box<dyn Error>> {
	let mut settings = match path {
		Some(path) => serde_json::from_str::<Settings>(&fs::read_to_string(path)?)?,
		None => Settings::default(),
	};

	if let Some(order) = order.filter(|o| *o != settings.order) {
		let defaults = Settings::with_order(order);
		settings.order = order;
		settings.discounts = defaults.discounts;
		settings.weights = defaults.weights;
	}
	Ok(settings)
}

fn evaluate(args: EvaluateArgs) -> Result<(), Box<dyn Error>> {
	let split = load_split(&args.split)?;
	let settings = load_settings(args.settings.as_deref(), args.order)?;

	match args.model {
		ModelKind::Backoff => run(BackOffModel::new(settings)?, &split, &args),
		ModelKind::LinearInterpolation => run(LinearInterpolationModel::new(settings)?, &split, &args),
	}
}

/// Trains, optionally optimizes, and reports perplexities.
fn run<M>(mut model: M, split: &CorpusSplit, args: &EvaluateArgs) -> Result<(), Box<dyn Error>>
where
	M: LanguageModel + Clone + Send,
{
	if let Some(values) = &args.values {
		model.set_smoothing_values(values)?;
	}

	let summary = model.train(&split.train);
	println!(
		"Trained {} sentences, vocabulary of {} words ({} replaced by UNK)",
		summary.sentences,
		model.vocabulary().len(),
		summary.unknown_replacements
	);
	println!("Smoothing values: {:?}", model.smoothing_values());

	let validation = PerplexityCalculator::new(&mut model).perplexity(&split.validate)?;
	println!(
		"Validation perplexity: {} ({:.2}% unknown tokens)",
		validation.perplexity,
		validation.unknown_rate() * 100.0
	);

	if args.optimize {
		let mut optimizer = Optimizer::new(args.resolution)?;
		optimizer = match args.workers {
			0 => optimizer.with_all_cpus(),
			workers => optimizer.with_workers(workers),
		};

		let result = optimizer.optimal_weights(&mut model, &split.validate)?;
		println!("Optimum perplexity {} after {} trials", result.perplexity, result.trials);
		for combination in &result.combinations {
			println!("  {}", combination);
		}
		println!("Smoothing values: {:?}", model.smoothing_values());
	}

	let test = PerplexityCalculator::new(&mut model).perplexity(&split.test)?;
	println!("Test perplexity: {}", test.perplexity);
	Ok(())
}

/// Compares the validation vocabulary with the train vocabulary.
fn vocabulary(args: SplitArgs) -> Result<(), Box<dyn Error>> {
	let split = load_split(&args)?;

	let settings = Settings { unk_mode: UnkMode::Disabled, ..Settings::default() };
	let mut base = ModelBase::new(settings)?;
	base.train(&split.train);

	let settings = base.settings();
	let mut total = 0usize;
	let mut unseen = 0usize;
	for sentence in &split.validate {
		for token in base.normalizer().normalize(sentence) {
			if token == settings.start_token || token == settings.end_token {
				continue;
			}
			total += 1;
			if !base.vocabulary().contains(&token) {
				unseen += 1;
			}
		}
	}

	let rate = if total == 0 { 0.0 } else { unseen as f64 / total as f64 };
	println!("Train vocabulary: {} words", base.vocabulary().len());
	println!("Validation tokens never seen in training: {} of {} ({:.2}%)", unseen, total, rate * 100.0);
	Ok(())
}
