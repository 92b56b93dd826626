use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;

use markov_gen_core::model::alphabet::Alphabet;
use markov_gen_core::model::generator::Generator;
use markov_gen_core::model::trainer;

#[derive(Parser, Debug)]
#[command(author, version, about = "Character-level Markov model trainer and text generator", long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Train probability tables for orders 0..=K from a corpus
	Train(TrainArgs),
	/// Generate text from persisted probability tables
	Generate(GenerateArgs),
	/// Print descriptive statistics of a raw corpus
	Stats(StatsArgs),
}

#[derive(Args, Debug)]
struct TrainArgs {
	/// Path to the UTF-8 corpus file
	#[arg(long, value_name = "PATH")]
	corpus: PathBuf,

	/// Maximum order K to train
	#[arg(long, value_name = "K", default_value_t = 16)]
	max_k: usize,

	/// Drop contexts with fewer total transitions before persistence
	#[arg(long, value_name = "COUNT", default_value_t = 1)]
	min_count: u64,

	/// Output directory for CSV tables and summaries
	#[arg(long, value_name = "DIR", default_value = "outputs")]
	outputs: PathBuf,
}

#[derive(Args, Debug)]
struct GenerateArgs {
	/// Markov chain order to generate with
	#[arg(long, default_value_t = 3)]
	k: usize,

	/// Number of symbols to generate
	#[arg(long, default_value_t = 400)]
	length: usize,

	/// Seed string the output starts from
	#[arg(long, default_value = " ")]
	seed: String,

	/// Read the seed from a file instead (takes precedence over --seed)
	#[arg(long, value_name = "PATH")]
	seed_file: Option<PathBuf>,

	/// Directory holding the prob_k{K}.csv tables
	#[arg(long, value_name = "DIR", default_value = "outputs")]
	probs: PathBuf,

	/// Corpus path used when recomputation is requested
	#[arg(long, value_name = "PATH")]
	corpus: Option<PathBuf>,

	/// Recompute distributions from the corpus if no table is found
	#[arg(long)]
	recompute: bool,

	/// Write the generated text to a file instead of stdout
	#[arg(long, value_name = "PATH")]
	out: Option<PathBuf>,

	/// Seed the random source for reproducible output
	#[arg(long, value_name = "N")]
	rng_seed: Option<u64>,
}

#[derive(Args, Debug)]
struct StatsArgs {
	/// Path to the UTF-8 corpus file
	#[arg(long, value_name = "PATH")]
	corpus: PathBuf,
}

fn main() -> Result<()> {
	env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

	match Cli::parse().command {
		Commands::Train(args) => train(args),
		Commands::Generate(args) => generate(args),
		Commands::Stats(args) => stats(args),
	}
}

/// Bridges the core's boxed errors into the CLI error chain.
fn core_error(err: Box<dyn std::error::Error>) -> anyhow::Error {
	anyhow!("{err}")
}

fn train(args: TrainArgs) -> Result<()> {
	info!("training on {} up to k = {}", args.corpus.display(), args.max_k);

	let alphabet = Alphabet::russian();
	let report = trainer::train_corpus(&alphabet, &args.corpus, args.max_k, args.min_count, &args.outputs)
		.map_err(core_error)?;

	info!(
		"normalized corpus: {} symbols over a {}-symbol alphabet",
		report.normalized_len, report.alphabet_len
	);
	info!(
		"k = 0: {} symbols counted, H0 = {:.6} bits",
		report.total_symbols, report.entropy0
	);
	for order in report.orders.iter().filter(|o| o.order > 0) {
		info!(
			"k = {}: {} transitions, {} contexts, H = {:.6} bits",
			order.order, order.transitions, order.contexts, order.entropy
		);
	}
	info!("artifacts written to {}", args.outputs.display());

	Ok(())
}

fn generate(args: GenerateArgs) -> Result<()> {
	let seed = match &args.seed_file {
		Some(path) => fs::read_to_string(path)
			.with_context(|| format!("failed to read seed file {}", path.display()))?,
		None => args.seed.clone(),
	};

	let alphabet = Alphabet::russian();
	let generator = match Generator::from_dir(alphabet.clone(), args.k, &args.probs).map_err(core_error)? {
		Some(generator) => generator,
		None => match (&args.corpus, args.recompute) {
			(Some(corpus), true) => {
				info!(
					"no table for k = {} in {}, recomputing from {}",
					args.k,
					args.probs.display(),
					corpus.display()
				);
				let tables = trainer::tables_from_corpus(&alphabet, corpus, args.k).map_err(core_error)?;
				Generator::new(alphabet, args.k, tables)
			}
			_ => bail!(
				"no probability table for k = {} in {} (pass --corpus and --recompute to rebuild)",
				args.k,
				args.probs.display()
			),
		},
	};

	let generated = match args.rng_seed {
		Some(value) => generator.generate_with(&seed, args.length, &mut StdRng::seed_from_u64(value)),
		None => generator.generate(&seed, args.length),
	};

	match &args.out {
		Some(path) => {
			fs::write(path, &generated)
				.with_context(|| format!("failed to write {}", path.display()))?;
			info!("saved generated text to {}", path.display());
		}
		None => println!("{generated}"),
	}

	Ok(())
}

fn stats(args: StatsArgs) -> Result<()> {
	let report = trainer::corpus_report(&args.corpus).map_err(core_error)?;

	println!("Bytes: {}", report.bytes);
	println!("Chars: {} (no whitespace: {})", report.chars, report.chars_no_whitespace);
	println!(
		"Tokens: {} Types: {} TTR: {:.4}",
		report.tokens, report.types, report.type_token_ratio
	);
	println!("Shannon entropy (bits/char): {:.3}", report.char_entropy);
	println!("Top tokens:");
	for (token, count) in &report.top_tokens {
		println!("  {token}: {count}");
	}

	Ok(())
}
