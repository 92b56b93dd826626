use std::collections::HashMap;
use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use crate::io::{overall_summary_path, read_corpus, summary_path};
use super::alphabet::{Alphabet, NormalizedText};
use super::counts::TransitionCounts;
use super::table::{conditional_entropy, ProbabilityTable, TableSet};

/// Per-order outcome of a training run.
#[derive(Clone, Debug)]
pub struct OrderReport {
	/// The model order.
	pub order: usize,
	/// Transitions recorded during the counting pass (before filtering).
	pub transitions: u64,
	/// Distinct contexts kept after filtering.
	pub contexts: usize,
	/// Conditional entropy of the filtered table, in bits.
	pub entropy: f64,
}

/// Outcome of a full training run over one corpus.
#[derive(Clone, Debug)]
pub struct TrainingReport {
	/// Length of the normalized corpus in symbols.
	pub normalized_len: usize,
	/// Size of the alphabet, space included.
	pub alphabet_len: usize,
	/// Total order-0 symbol count.
	pub total_symbols: u64,
	/// Order-0 entropy in bits.
	pub entropy0: f64,
	/// One entry per trained order, ascending.
	pub orders: Vec<OrderReport>,
}

/// Trains probability tables for every order `0..=max_k` and persists them.
///
/// # Parameters
/// - `alphabet`: The symbol set the model operates over.
/// - `corpus_path`: UTF-8 corpus file; a missing file is the one fatal,
///   user-visible training failure.
/// - `max_k`: Highest order to train.
/// - `min_count`: Contexts with fewer total transitions are dropped before
///   persistence (1 disables the filter).
/// - `outputs_dir`: Created if missing; receives `prob_k{k}.csv` per order,
///   `summary_k{k}.txt` for k >= 1, `overall_summary.txt` and `model.bin`.
///
/// # Behavior
/// - Counting for the different orders is fanned out across threads; each
///   order is independent and reads the same immutable normalized text.
/// - Entropy is computed on the filtered counts.
pub fn train_corpus<PC, PO>(
	alphabet: &Alphabet,
	corpus_path: PC,
	max_k: usize,
	min_count: u64,
	outputs_dir: PO,
) -> Result<TrainingReport, Box<dyn std::error::Error>>
where
	PC: AsRef<Path>,
	PO: AsRef<Path>,
{
	let corpus_path = corpus_path.as_ref();
	if !corpus_path.exists() {
		return Err(format!("corpus file not found: {}", corpus_path.display()).into());
	}
	let raw = read_corpus(corpus_path)?;
	let text = alphabet.normalize(&raw);

	let outputs_dir = outputs_dir.as_ref();
	fs::create_dir_all(outputs_dir)?;

	let mut by_order = count_all_orders(alphabet, &text, max_k);
	let mut tables = TableSet::new();
	let mut reports = Vec::with_capacity(by_order.len());
	let mut total_symbols = 0;
	let mut entropy0 = 0.0;

	for counts in &mut by_order {
		counts.filter_min_count(min_count);
		let entropy = conditional_entropy(counts);
		let table = ProbabilityTable::derive(counts);
		table.save_csv(outputs_dir)?;

		let order = counts.order();
		if order == 0 {
			total_symbols = counts.total_transitions();
			entropy0 = entropy;
		} else {
			write_order_summary(outputs_dir, counts, entropy)?;
		}

		reports.push(OrderReport {
			order,
			transitions: counts.total_transitions(),
			contexts: counts.context_count(),
			entropy,
		});
		tables.insert(table);
	}

	tables.save_cache(outputs_dir)?;

	let report = TrainingReport {
		normalized_len: text.len(),
		alphabet_len: alphabet.len(),
		total_symbols,
		entropy0,
		orders: reports,
	};
	write_overall_summary(outputs_dir, &report)?;

	Ok(report)
}

/// Derives in-memory tables for orders `0..=max_k` straight from a corpus.
///
/// The recomputation path for generation when no persisted table exists:
/// nothing is filtered and nothing is written to disk.
pub fn tables_from_corpus<P: AsRef<Path>>(
	alphabet: &Alphabet,
	corpus_path: P,
	max_k: usize,
) -> Result<TableSet, Box<dyn std::error::Error>> {
	let corpus_path = corpus_path.as_ref();
	if !corpus_path.exists() {
		return Err(format!("corpus file not found: {}", corpus_path.display()).into());
	}
	let raw = read_corpus(corpus_path)?;
	let text = alphabet.normalize(&raw);

	let mut tables = TableSet::new();
	for counts in count_all_orders(alphabet, &text, max_k) {
		tables.insert(ProbabilityTable::derive(&counts));
	}
	Ok(tables)
}

/// Counts transitions for every order `0..=max_k`, fanned out over threads.
///
/// Orders are distributed round-robin across up to `num_cpus` workers and
/// the results are re-sorted by order; the output is identical to counting
/// each order sequentially.
fn count_all_orders(alphabet: &Alphabet, text: &NormalizedText, max_k: usize) -> Vec<TransitionCounts> {
	let workers = num_cpus::get().min(max_k + 1).max(1);

	let (tx, rx) = mpsc::channel();
	for worker in 0..workers {
		let tx = tx.clone();
		let alphabet = alphabet.clone();
		let text = text.clone();
		let orders: Vec<usize> = (0..=max_k).filter(|k| k % workers == worker).collect();

		thread::spawn(move || {
			for order in orders {
				let counts = TransitionCounts::count(&alphabet, &text, order);
				tx.send(counts).expect("Failed to send from thread");
			}
		});
	}
	drop(tx);

	let mut by_order: Vec<TransitionCounts> = rx.iter().collect();
	by_order.sort_by_key(TransitionCounts::order);
	by_order
}

/// Writes the human-readable per-order summary artifact.
///
/// Reports the raw transition total, the filtered context count, the
/// conditional entropy and the top 20 contexts with their top-5
/// next-symbol distributions.
fn write_order_summary(
	dir: &Path,
	counts: &TransitionCounts,
	entropy: f64,
) -> Result<(), Box<dyn std::error::Error>> {
	let mut file = File::create(summary_path(dir, counts.order()))?;
	writeln!(file, "k = {}", counts.order())?;
	writeln!(file, "Total transitions counted: {}", counts.total_transitions())?;
	writeln!(file, "Number of contexts (unique): {}", counts.context_count())?;
	writeln!(file, "Conditional entropy H(next|context): {entropy:.6} bits")?;
	writeln!(file)?;
	writeln!(file, "Top contexts by total count (up to 20):")?;

	for (context, total) in counts.top_contexts(20) {
		let observed = match counts.get(context) {
			Some(observed) if total > 0 => observed,
			_ => continue,
		};
		let mut pairs: Vec<(char, u64)> = observed.iter().map(|(&c, &n)| (c, n)).collect();
		pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
		pairs.truncate(5);

		let rendered: Vec<String> = pairs
			.iter()
			.map(|&(symbol, count)| format!("'{symbol}':{count}({:.3})", count as f64 / total as f64))
			.collect();
		writeln!(
			file,
			"Context '{context}' ({total} occurrences): top next -> {}",
			rendered.join(", ")
		)?;
	}

	Ok(())
}

/// Writes the overall training summary artifact.
fn write_overall_summary(dir: &Path, report: &TrainingReport) -> Result<(), Box<dyn std::error::Error>> {
	let mut file = File::create(overall_summary_path(dir))?;
	writeln!(file, "Corpus length (chars): {}", report.normalized_len)?;
	writeln!(file, "Unique symbols (allowed): {}", report.alphabet_len)?;
	writeln!(file, "Total counts (k=0): {}", report.total_symbols)?;
	writeln!(file, "Entropy H0 (single char): {:.6} bits", report.entropy0)?;
	Ok(())
}

/// Descriptive statistics of a raw corpus file.
///
/// Computed over the raw text, before any alphabet normalization.
#[derive(Clone, Debug)]
pub struct CorpusReport {
	/// File size in bytes.
	pub bytes: u64,
	/// Characters in the raw text.
	pub chars: usize,
	/// Characters excluding whitespace.
	pub chars_no_whitespace: usize,
	/// Word tokens (lowercased).
	pub tokens: usize,
	/// Distinct word tokens.
	pub types: usize,
	/// Type/token ratio; 0.0 for an empty corpus.
	pub type_token_ratio: f64,
	/// The 50 most frequent tokens with their counts, descending.
	pub top_tokens: Vec<(String, u64)>,
	/// Shannon entropy of the raw character distribution, bits per char.
	pub char_entropy: f64,
}

/// Returns true for characters that belong to a word token: Latin or
/// Cyrillic letters, ASCII digits and the apostrophe.
fn is_token_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || ('а'..='я').contains(&c) || c == 'ё' || c == '\''
}

/// Computes descriptive statistics for a raw corpus file.
///
/// # Errors
/// Fails when the file is missing or unreadable.
pub fn corpus_report<P: AsRef<Path>>(corpus_path: P) -> Result<CorpusReport, Box<dyn std::error::Error>> {
	let corpus_path = corpus_path.as_ref();
	if !corpus_path.exists() {
		return Err(format!("corpus file not found: {}", corpus_path.display()).into());
	}
	let bytes = fs::metadata(corpus_path)?.len();
	let raw = read_corpus(corpus_path)?;

	let chars = raw.chars().count();
	let chars_no_whitespace = raw.chars().filter(|c| !c.is_whitespace()).count();

	let mut vocabulary: HashMap<String, u64> = HashMap::new();
	let mut tokens = 0;
	let lowered: String = raw.chars().flat_map(char::to_lowercase).collect();
	for token in lowered.split(|c: char| !is_token_char(c)) {
		if token.is_empty() {
			continue;
		}
		tokens += 1;
		*vocabulary.entry(token.to_owned()).or_insert(0) += 1;
	}
	let types = vocabulary.len();
	let type_token_ratio = if tokens > 0 { types as f64 / tokens as f64 } else { 0.0 };

	let mut top_tokens: Vec<(String, u64)> = vocabulary.into_iter().collect();
	top_tokens.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
	top_tokens.truncate(50);

	let mut frequencies: HashMap<char, u64> = HashMap::new();
	for c in raw.chars() {
		*frequencies.entry(c).or_insert(0) += 1;
	}
	let mut char_entropy = 0.0;
	for &count in frequencies.values() {
		let p = count as f64 / chars as f64;
		char_entropy -= p * p.log2();
	}

	Ok(CorpusReport {
		bytes,
		chars,
		chars_no_whitespace,
		tokens,
		types,
		type_token_ratio,
		top_tokens,
		char_entropy,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parallel_counting_matches_sequential() {
		let alphabet = Alphabet::russian();
		let text = alphabet.normalize("мама мыла раму. мама ела кашу.");
		let parallel = count_all_orders(&alphabet, &text, 4);
		assert_eq!(parallel.len(), 5);
		for (order, counts) in parallel.iter().enumerate() {
			let sequential = TransitionCounts::count(&alphabet, &text, order);
			assert_eq!(counts.order(), order);
			assert_eq!(counts.total_transitions(), sequential.total_transitions());
			assert_eq!(counts.context_count(), sequential.context_count());
		}
	}

	#[test]
	fn token_characters_cover_latin_cyrillic_digits() {
		assert!(is_token_char('a'));
		assert!(is_token_char('я'));
		assert!(is_token_char('ё'));
		assert!(is_token_char('7'));
		assert!(is_token_char('\''));
		assert!(!is_token_char(' '));
		assert!(!is_token_char('.'));
	}

	#[test]
	fn missing_corpus_is_fatal() {
		let alphabet = Alphabet::russian();
		let missing = Path::new("definitely/not/here.txt");
		assert!(tables_from_corpus(&alphabet, missing, 2).is_err());
		assert!(corpus_report(missing).is_err());
	}
}
