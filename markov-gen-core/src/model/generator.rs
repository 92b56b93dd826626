use std::path::Path;

use rand::Rng;

use crate::io::normalize_folder;
use super::alphabet::Alphabet;
use super::table::{Distribution, ProbabilityTable, TableSet};

/// High-level text synthesizer over a set of probability tables.
///
/// # Responsibilities
/// - Load the order-k table plus every available lower-order fallback
/// - Resolve contexts through the backoff chain k, k-1, ..., 0
/// - Emit symbols by weighted random sampling with a guaranteed default
///
/// # Guarantees
/// Generation is total: it never fails for any `length >= 0` and any table
/// state, including all tables absent, which degenerates to repeated space
/// emission. Malformed persisted rows were already downgraded to uniform
/// distributions at load time.
#[derive(Clone, Debug)]
pub struct Generator {
	alphabet: Alphabet,
	/// Highest order tried before backing off.
	order: usize,
	tables: TableSet,
}

impl Generator {
	/// Creates a generator over an in-memory table set.
	///
	/// Tables for orders other than `0..=order` are ignored by resolution.
	pub fn new(alphabet: Alphabet, order: usize, tables: TableSet) -> Self {
		Self { alphabet, order, tables }
	}

	/// Creates a generator from a probability-table directory.
	///
	/// # Behavior
	/// - Tries the binary cache first and uses it when it covers `order`;
	///   an unreadable cache is skipped, not propagated.
	/// - Otherwise loads `prob_k{order}.csv` plus every lower-order CSV
	///   that exists; missing fallbacks are simply skipped.
	///
	/// # Returns
	/// - `Ok(None)` when neither the cache nor the CSV provides a table for
	///   the requested order; the caller decides whether to recompute.
	pub fn from_dir<P: AsRef<Path>>(
		alphabet: Alphabet,
		order: usize,
		dir: P,
	) -> Result<Option<Self>, Box<dyn std::error::Error>> {
		let folder = match dir.as_ref().to_str() {
			Some(s) => normalize_folder(s),
			None => dir.as_ref().to_path_buf(),
		};

		// A stale or corrupt cache must not block generation; the CSVs
		// remain the authoritative source.
		if let Ok(Some(cached)) = TableSet::load_cache(&folder) {
			if cached.contains(order) {
				return Ok(Some(Self::new(alphabet, order, cached)));
			}
		}

		let mut tables = TableSet::new();
		match ProbabilityTable::load_csv(&folder, order)? {
			Some(table) => tables.insert(table),
			None => return Ok(None),
		}
		for fallback_order in (0..order).rev() {
			if let Some(table) = ProbabilityTable::load_csv(&folder, fallback_order)? {
				tables.insert(table);
			}
		}

		Ok(Some(Self::new(alphabet, order, tables)))
	}

	/// The highest order this generator resolves against.
	pub fn order(&self) -> usize {
		self.order
	}

	/// Resolves a context through the backoff chain.
	///
	/// Tries the trailing `k` symbols of `window` against the order-k table
	/// for k = order, order-1, ..., 0. At order 0 the context is always the
	/// empty string, so an order-0 table (the explicit fallback when the
	/// primary order is higher, the primary table itself when order is 0)
	/// resolves whenever it holds any data.
	///
	/// Returns `None` only when every order, including 0, has nothing to
	/// offer; the caller then emits the space symbol.
	fn resolve(&self, window: &[char]) -> Option<&Distribution> {
		for order in (0..=self.order).rev() {
			let Some(table) = self.tables.get(order) else {
				continue;
			};
			let context: String = window[window.len() - order..].iter().collect();
			if let Some(distribution) = table.get(&context) {
				return Some(distribution);
			}
		}
		None
	}

	/// Generates `length` symbols after the seed, sampling from the process
	/// RNG.
	///
	/// See `generate_with` for the exact state machine; pass a seeded RNG
	/// there for reproducible output.
	pub fn generate(&self, seed: &str, length: usize) -> String {
		self.generate_with(seed, length, &mut rand::rng())
	}

	/// Generates `length` symbols after the seed using the provided RNG.
	///
	/// # Behavior
	/// 1. The output begins with the raw seed. If the seed normalizes to the
	///    empty sequence, one filler symbol is synthesized first: a weighted
	///    sample from the order-0 table when present, the space symbol
	///    otherwise.
	/// 2. The rolling window holds the normalized trailing symbols,
	///    left-padded with spaces up to the generator's order.
	/// 3. Each step resolves the window through the backoff chain, samples
	///    a symbol (space when nothing resolves), and appends it to both the
	///    output and the window.
	///
	/// # Notes
	/// - `length = 0` appends no symbols beyond the possible filler.
	/// - Never fails, for any seed and any table state.
	pub fn generate_with<R: Rng + ?Sized>(&self, seed: &str, length: usize, rng: &mut R) -> String {
		let space = self.alphabet.space();
		let mut out = seed.to_owned();

		let mut normalized = self.alphabet.normalize(seed);
		if normalized.is_empty() {
			let filler = self
				.tables
				.get(0)
				.and_then(|table| table.get(""))
				.and_then(|distribution| distribution.sample(rng))
				.unwrap_or(space);
			out.push(filler);
			normalized = self.alphabet.normalize(&out);
		}

		let mut window: Vec<char> = normalized.symbols().to_vec();
		if window.len() < self.order {
			let mut padded = vec![space; self.order - window.len()];
			padded.extend(window);
			window = padded;
		}

		for _ in 0..length {
			let symbol = self
				.resolve(&window)
				.and_then(|distribution| distribution.sample(rng))
				.unwrap_or(space);
			out.push(symbol);
			window.push(symbol);
			if window.len() > self.order {
				window.remove(0);
			}
		}

		out
	}
}
