use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::io::{cache_path, table_path};
use super::counts::TransitionCounts;

/// CSV header of the order-0 table.
const HEADER_K0: [&str; 3] = ["symbol", "count", "probability"];
/// CSV header of every order-k table for k >= 1.
const HEADER_KN: [&str; 4] = ["context", "next", "count", "probability"];

/// Next-symbol distribution recorded for one context.
///
/// The variant is fixed at construction time: a context loaded from disk
/// becomes `Unweighted` when any of its probability cells failed to parse,
/// so sampling never has to re-check for missing weights.
///
/// # Invariants
/// - `candidates`, `counts` and `weights` always share the same length
/// - At least one candidate is present
#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum Distribution {
	/// Every row carried a valid probability; sample proportionally.
	Weighted {
		candidates: Vec<char>,
		counts: Vec<u64>,
		weights: Vec<f64>,
	},
	/// At least one probability was absent or unparsable; sample uniformly.
	Unweighted {
		candidates: Vec<char>,
		counts: Vec<u64>,
	},
}

impl Distribution {
	/// Candidate next symbols, in recorded order.
	pub fn candidates(&self) -> &[char] {
		match self {
			Distribution::Weighted { candidates, .. } => candidates,
			Distribution::Unweighted { candidates, .. } => candidates,
		}
	}

	/// Occurrence counts parallel to `candidates`.
	pub fn counts(&self) -> &[u64] {
		match self {
			Distribution::Weighted { counts, .. } => counts,
			Distribution::Unweighted { counts, .. } => counts,
		}
	}

	/// Probability of the candidate at `index`, recomputed from counts when
	/// no parsed weight is available (used when re-persisting loaded tables).
	fn probability(&self, index: usize) -> f64 {
		match self {
			Distribution::Weighted { weights, .. } => weights[index],
			Distribution::Unweighted { counts, .. } => {
				let total: u64 = counts.iter().sum();
				if total == 0 {
					0.0
				} else {
					counts[index] as f64 / total as f64
				}
			}
		}
	}

	/// Picks a next symbol using weighted random sampling.
	///
	/// The probability of selecting a candidate is proportional to its
	/// weight; the `Unweighted` variant picks uniformly among candidates.
	///
	/// Returns `None` only if the distribution has no candidates, which
	/// derivation and loading never produce.
	pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<char> {
		match self {
			Distribution::Unweighted { candidates, .. } => {
				if candidates.is_empty() {
					return None;
				}
				Some(candidates[rng.random_range(0..candidates.len())])
			}
			Distribution::Weighted { candidates, weights, .. } => {
				if candidates.is_empty() {
					return None;
				}
				let total: f64 = weights.iter().sum();
				if !(total > 0.0) || !total.is_finite() {
					// Degenerate weights from a hand-crafted file (zero, NaN
					// or infinite); a non-finite range would panic the RNG.
					return Some(candidates[rng.random_range(0..candidates.len())]);
				}

				// Cumulative subtraction to select a bucket
				let mut r = rng.random_range(0.0..total);
				let mut fallback = None;
				for (candidate, weight) in candidates.iter().zip(weights) {
					if r < *weight {
						return Some(*candidate);
					}
					r -= weight;
					fallback = Some(*candidate);
				}

				// Floating-point drift can exhaust the loop; keep the last bucket.
				fallback
			}
		}
	}
}

/// Conditional probability table for one model order.
///
/// Maps every context to the distribution of its next symbol. Derived from
/// `TransitionCounts` during training, or loaded from a persisted CSV
/// without ever materializing counts.
///
/// # Invariants
/// - Per context, derived probabilities sum to 1.0 within floating tolerance
/// - An order-0 table has exactly one context: the empty string
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ProbabilityTable {
	/// The order of the model (context length in symbols).
	order: usize,
	/// Mapping from a context to its next-symbol distribution.
	contexts: HashMap<String, Distribution>,
}

impl ProbabilityTable {
	/// Derives conditional probabilities from a frequency table.
	///
	/// For every context, `probability(next) = count(context, next) / total`.
	/// A context with a single observed next symbol yields probability 1.0.
	pub fn derive(counts: &TransitionCounts) -> Self {
		let mut contexts = HashMap::with_capacity(counts.context_count());
		for (context, observed) in counts.contexts() {
			let total: u64 = observed.values().sum();
			if total == 0 {
				continue;
			}
			let mut candidates = Vec::with_capacity(observed.len());
			let mut row_counts = Vec::with_capacity(observed.len());
			let mut weights = Vec::with_capacity(observed.len());
			for (&next, &count) in observed {
				candidates.push(next);
				row_counts.push(count);
				weights.push(count as f64 / total as f64);
			}
			contexts.insert(
				context.to_owned(),
				Distribution::Weighted { candidates, counts: row_counts, weights },
			);
		}
		Self { order: counts.order(), contexts }
	}

	/// The order of the model.
	pub fn order(&self) -> usize {
		self.order
	}

	/// Number of contexts in the table.
	pub fn context_count(&self) -> usize {
		self.contexts.len()
	}

	/// Looks up the distribution recorded for one context.
	pub fn get(&self, context: &str) -> Option<&Distribution> {
		self.contexts.get(context)
	}

	/// Iterates over `(context, distribution)` pairs in no particular order.
	pub fn contexts(&self) -> impl Iterator<Item = (&str, &Distribution)> {
		self.contexts.iter().map(|(k, v)| (k.as_str(), v))
	}

	/// Persists the table as `prob_k{order}.csv` inside `dir`.
	///
	/// # Format
	/// - Order 0: `symbol,count,probability`, sorted by descending count.
	/// - Order k >= 1: `context,next,count,probability`; row order across
	///   contexts is unspecified.
	///
	/// Probabilities are written with 6 decimal places. Fields containing
	/// the `,` symbol are quoted by the CSV writer, so every alphabet
	/// symbol round-trips losslessly.
	pub fn save_csv<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf, Box<dyn std::error::Error>> {
		let path = table_path(&dir, self.order);
		let mut writer = csv::Writer::from_path(&path)?;

		if self.order == 0 {
			writer.write_record(HEADER_K0)?;
			if let Some(distribution) = self.contexts.get("") {
				let candidates = distribution.candidates();
				let counts = distribution.counts();
				let mut rows: Vec<usize> = (0..candidates.len()).collect();
				rows.sort_by(|&a, &b| counts[b].cmp(&counts[a]));
				for i in rows {
					writer.write_record([
						candidates[i].to_string(),
						counts[i].to_string(),
						format!("{:.6}", distribution.probability(i)),
					])?;
				}
			}
		} else {
			writer.write_record(HEADER_KN)?;
			for (context, distribution) in &self.contexts {
				let candidates = distribution.candidates();
				let counts = distribution.counts();
				for i in 0..candidates.len() {
					writer.write_record([
						context.clone(),
						candidates[i].to_string(),
						counts[i].to_string(),
						format!("{:.6}", distribution.probability(i)),
					])?;
				}
			}
		}

		writer.flush()?;
		Ok(path)
	}

	/// Loads the table persisted as `prob_k{k}.csv` inside `dir`.
	///
	/// # Returns
	/// - `Ok(None)` if the file does not exist, so callers can distinguish
	///   "no data" from an empty-but-present table.
	/// - `Ok(Some(table))` otherwise.
	///
	/// # Behavior
	/// - Counts and probabilities are parsed leniently: an unparsable count
	///   becomes 0 and an unparsable probability marks the whole context as
	///   `Unweighted`, which the generator resolves with uniform sampling.
	/// - Rows with an empty symbol cell are skipped.
	pub fn load_csv<P: AsRef<Path>>(dir: P, order: usize) -> Result<Option<Self>, Box<dyn std::error::Error>> {
		let path = table_path(&dir, order);
		if !path.exists() {
			return Ok(None);
		}
		// Flexible: a short row means a missing cell, not a broken file.
		let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(&path)?;

		// Candidate rows grouped per context before the variant is chosen.
		let mut grouped: HashMap<String, (Vec<char>, Vec<u64>, Vec<Option<f64>>)> = HashMap::new();

		for record in reader.records() {
			let record = record?;
			let (context, symbol_cell, count_cell, probability_cell) = if order == 0 {
				(String::new(), record.get(0), record.get(1), record.get(2))
			} else {
				(
					record.get(0).unwrap_or_default().to_owned(),
					record.get(1),
					record.get(2),
					record.get(3),
				)
			};

			let Some(next) = symbol_cell.and_then(|cell| cell.chars().next()) else {
				continue;
			};
			let count = count_cell.and_then(|cell| cell.trim().parse::<u64>().ok()).unwrap_or(0);
			let probability = probability_cell.and_then(|cell| cell.trim().parse::<f64>().ok());

			let entry = grouped.entry(context).or_default();
			entry.0.push(next);
			entry.1.push(count);
			entry.2.push(probability);
		}

		let mut contexts = HashMap::with_capacity(grouped.len());
		for (context, (candidates, counts, probabilities)) in grouped {
			if candidates.is_empty() {
				continue;
			}
			let distribution = if probabilities.iter().all(Option::is_some) {
				Distribution::Weighted {
					candidates,
					counts,
					weights: probabilities.into_iter().flatten().collect(),
				}
			} else {
				Distribution::Unweighted { candidates, counts }
			};
			contexts.insert(context, distribution);
		}

		Ok(Some(Self { order, contexts }))
	}
}

/// Computes the Shannon conditional entropy of an order-k frequency table.
///
/// `H = Σ_context P(context) · H(next|context)` where `P(context)` is the
/// context's share of all transitions. For order 0 this reduces to the
/// plain symbol entropy. Returns 0.0 when no transitions are recorded.
///
/// Entropy is non-increasing as the order grows for a fixed corpus, except
/// where sparsity makes every surviving context trivial.
pub fn conditional_entropy(counts: &TransitionCounts) -> f64 {
	let total: u64 = counts
		.contexts()
		.map(|(_, observed)| observed.values().sum::<u64>())
		.sum();
	if total == 0 {
		return 0.0;
	}

	let mut entropy = 0.0;
	for (_, observed) in counts.contexts() {
		let context_total: u64 = observed.values().sum();
		let context_share = context_total as f64 / total as f64;
		let mut context_entropy = 0.0;
		for &count in observed.values() {
			let p = count as f64 / context_total as f64;
			context_entropy -= p * p.log2();
		}
		entropy += context_share * context_entropy;
	}
	entropy
}

/// The bundle of probability tables produced by one training run.
///
/// Holds one `ProbabilityTable` per order; this is the unit the generator
/// consumes and the unit the binary fast-load cache serializes.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct TableSet {
	tables: HashMap<usize, ProbabilityTable>,
}

impl TableSet {
	/// Returns an empty set.
	pub fn new() -> Self {
		Self { tables: HashMap::new() }
	}

	/// Inserts a table under its own order, replacing any previous one.
	pub fn insert(&mut self, table: ProbabilityTable) {
		self.tables.insert(table.order(), table);
	}

	/// Looks up the table for one order.
	pub fn get(&self, order: usize) -> Option<&ProbabilityTable> {
		self.tables.get(&order)
	}

	/// Returns true if a table exists for `order`.
	pub fn contains(&self, order: usize) -> bool {
		self.tables.contains_key(&order)
	}

	/// Orders present in the set, ascending.
	pub fn orders(&self) -> Vec<usize> {
		let mut orders: Vec<usize> = self.tables.keys().copied().collect();
		orders.sort_unstable();
		orders
	}

	/// Serializes the whole set to `model.bin` inside `dir`.
	///
	/// Uses `postcard` for compact binary encoding; the cache is a fast-load
	/// convenience and never required for correctness.
	pub fn save_cache<P: AsRef<Path>>(&self, dir: P) -> Result<(), Box<dyn std::error::Error>> {
		let bytes = postcard::to_stdvec(self)?;
		fs::write(cache_path(dir), bytes)?;
		Ok(())
	}

	/// Loads a set previously serialized by `save_cache`.
	///
	/// Returns `Ok(None)` if no cache file exists.
	pub fn load_cache<P: AsRef<Path>>(dir: P) -> Result<Option<Self>, Box<dyn std::error::Error>> {
		let path = cache_path(dir);
		if !path.exists() {
			return Ok(None);
		}
		let bytes = fs::read(path)?;
		Ok(Some(postcard::from_bytes(&bytes)?))
	}
}
