use std::collections::HashMap;

use super::alphabet::{Alphabet, NormalizedText};

/// Transition frequency table for one model order.
///
/// Maps each context (the `order` symbols preceding a position) to the
/// observed next-symbol occurrence counts. Order 0 uses the single empty
/// context, so its inner map is the unconditional symbol distribution.
///
/// # Responsibilities
/// - Accumulate transitions in one linear pass over a normalized stream
/// - Apply the optional minimum-total-count filter after the pass
/// - Expose read-only views for derivation, entropy and summaries
///
/// # Invariants
/// - Every stored context key has exactly `order` symbols ("" for order 0)
/// - Every stored context has a non-empty inner map
/// - Every inner count is >= 1
#[derive(Clone, Debug)]
pub struct TransitionCounts {
	/// The order of the model (context length in symbols).
	order: usize,
	/// Mapping from a context to its next-symbol occurrence counts.
	contexts: HashMap<String, HashMap<char, u64>>,
	/// Transitions recorded during the pass, before any filtering.
	transitions: u64,
}

impl TransitionCounts {
	/// Scans a normalized symbol stream and accumulates the frequency table.
	///
	/// # Behavior
	/// - Order 0: counts each symbol under the empty context.
	/// - Order k >= 1: for every position `i` in `k..len`, the context is the
	///   `k` symbols before `i` and the next symbol is the one at `i`.
	/// - Symbols outside the alphabet are skipped defensively, even though
	///   normalization already guarantees membership.
	///
	/// # Notes
	/// - Pure computation: no global state is read or mutated.
	/// - A stream shorter than `k + 1` yields an empty table.
	pub fn count(alphabet: &Alphabet, text: &NormalizedText, order: usize) -> Self {
		let symbols = text.symbols();
		let mut contexts: HashMap<String, HashMap<char, u64>> = HashMap::new();
		let mut transitions = 0;

		if order == 0 {
			let mut inner: HashMap<char, u64> = HashMap::new();
			for &symbol in symbols {
				if !alphabet.contains(symbol) {
					continue;
				}
				*inner.entry(symbol).or_insert(0) += 1;
				transitions += 1;
			}
			if !inner.is_empty() {
				contexts.insert(String::new(), inner);
			}
		} else {
			for i in order..symbols.len() {
				let window = &symbols[i - order..i];
				let next = symbols[i];
				if !alphabet.contains(next) || !window.iter().all(|&c| alphabet.contains(c)) {
					continue;
				}
				let context: String = window.iter().collect();
				*contexts.entry(context).or_default().entry(next).or_insert(0) += 1;
				transitions += 1;
			}
		}

		Self { order, contexts, transitions }
	}

	/// The order of the model (context length).
	pub fn order(&self) -> usize {
		self.order
	}

	/// Transitions recorded during the counting pass.
	///
	/// Filtering does not change this figure; summaries report the raw
	/// pass total alongside the filtered context count.
	pub fn total_transitions(&self) -> u64 {
		self.transitions
	}

	/// Number of distinct contexts currently stored.
	pub fn context_count(&self) -> usize {
		self.contexts.len()
	}

	/// Returns true if no context holds any transition.
	pub fn is_empty(&self) -> bool {
		self.contexts.is_empty()
	}

	/// Iterates over `(context, next-symbol counts)` pairs in no particular order.
	pub fn contexts(&self) -> impl Iterator<Item = (&str, &HashMap<char, u64>)> {
		self.contexts.iter().map(|(k, v)| (k.as_str(), v))
	}

	/// Looks up the next-symbol counts recorded for one context.
	pub fn get(&self, context: &str) -> Option<&HashMap<char, u64>> {
		self.contexts.get(context)
	}

	/// Drops every context whose total observed transitions fall below
	/// `min_count`.
	///
	/// Applied once after the full counting pass, never incrementally.
	pub fn filter_min_count(&mut self, min_count: u64) {
		if min_count > 1 {
			self.contexts
				.retain(|_, counts| counts.values().sum::<u64>() >= min_count);
		}
	}

	/// Returns up to `limit` contexts sorted by descending total count.
	pub fn top_contexts(&self, limit: usize) -> Vec<(&str, u64)> {
		let mut totals: Vec<(&str, u64)> = self
			.contexts
			.iter()
			.map(|(context, counts)| (context.as_str(), counts.values().sum()))
			.collect();
		totals.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
		totals.truncate(limit);
		totals
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn counts_for(raw: &str, order: usize) -> TransitionCounts {
		let alphabet = Alphabet::russian();
		let text = alphabet.normalize(raw);
		TransitionCounts::count(&alphabet, &text, order)
	}

	#[test]
	fn order_zero_uses_single_empty_context() {
		let counts = counts_for("мама", 0);
		assert_eq!(counts.context_count(), 1);
		let inner = counts.get("").unwrap();
		assert_eq!(inner[&'м'], 2);
		assert_eq!(inner[&'а'], 2);
		assert_eq!(counts.total_transitions(), 4);
	}

	#[test]
	fn context_keys_have_exact_order_length() {
		for order in 1..=3 {
			let counts = counts_for("мама мыла раму.", order);
			for (context, inner) in counts.contexts() {
				assert_eq!(context.chars().count(), order);
				assert!(!inner.is_empty());
				assert!(inner.values().all(|&c| c >= 1));
			}
		}
	}

	#[test]
	fn order_one_transitions_of_reference_sentence() {
		let counts = counts_for("мама мыла раму.", 1);
		// 15 symbols -> 14 order-1 transitions
		assert_eq!(counts.total_transitions(), 14);
		let after_m = counts.get("м").unwrap();
		assert!(after_m.contains_key(&'а'));
		assert!(after_m[&'а'] >= 2);
		assert!(after_m.contains_key(&'ы'));
		assert!(after_m.contains_key(&'у'));
	}

	#[test]
	fn empty_stream_yields_empty_table() {
		let counts = counts_for("12345", 2);
		assert!(counts.is_empty());
		assert_eq!(counts.total_transitions(), 0);
	}

	#[test]
	fn stream_shorter_than_order_yields_empty_table() {
		let counts = counts_for("ма", 5);
		assert!(counts.is_empty());
	}

	#[test]
	fn min_count_filter_drops_sparse_contexts() {
		let mut counts = counts_for("мама мыла раму.", 1);
		let before = counts.context_count();
		counts.filter_min_count(2);
		assert!(counts.context_count() < before);
		for (_, inner) in counts.contexts() {
			assert!(inner.values().sum::<u64>() >= 2);
		}
		// raw pass total is unchanged by filtering
		assert_eq!(counts.total_transitions(), 14);
	}

	#[test]
	fn top_contexts_sorted_by_descending_total() {
		let counts = counts_for("абабаб", 1);
		let top = counts.top_contexts(10);
		assert_eq!(top.first().map(|t| t.0), Some("а"));
		for pair in top.windows(2) {
			assert!(pair[0].1 >= pair[1].1);
		}
	}
}
