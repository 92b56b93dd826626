use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Lowercase Russian letters of the reference alphabet, including 'ё'.
const RUSSIAN_LETTERS: &str = "абвгдеёжзийклмнопрстуфхцчшщъыьэюя";

/// Punctuation marks kept by the reference alphabet.
const PUNCTUATION: [char; 4] = ['.', ',', '!', '?'];

/// The closed symbol set the model operates over.
///
/// Every input character maps to exactly one symbol: itself if it belongs
/// to the alphabet, the designated space symbol otherwise. The alphabet is
/// an explicit immutable value passed into the counter and the generator,
/// not a hidden global, so tests can substitute alternate alphabets.
///
/// # Invariants
/// - The space symbol is always a member of the symbol set
/// - Membership testing is total: no input character is rejected
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Alphabet {
	/// Allowed symbols, space included.
	symbols: HashSet<char>,
	/// The designated filler symbol every foreign character folds into.
	space: char,
}

impl Alphabet {
	/// Builds the reference alphabet: the 33 lowercase Russian letters,
	/// the space symbol and the marks `.` `,` `!` `?` (38 symbols total).
	pub fn russian() -> Self {
		let mut symbols: HashSet<char> = RUSSIAN_LETTERS.chars().collect();
		symbols.extend(PUNCTUATION);
		symbols.insert(' ');
		Self { symbols, space: ' ' }
	}

	/// Builds an alphabet from an arbitrary symbol set.
	///
	/// The `space` symbol is inserted into the set if missing, keeping the
	/// membership invariant intact.
	pub fn new<I: IntoIterator<Item = char>>(symbols: I, space: char) -> Self {
		let mut symbols: HashSet<char> = symbols.into_iter().collect();
		symbols.insert(space);
		Self { symbols, space }
	}

	/// Returns true if `c` is a member of the alphabet.
	pub fn contains(&self, c: char) -> bool {
		self.symbols.contains(&c)
	}

	/// Returns the designated space (filler) symbol.
	pub fn space(&self) -> char {
		self.space
	}

	/// Number of symbols in the alphabet, space included.
	pub fn len(&self) -> usize {
		self.symbols.len()
	}

	/// Returns true if the alphabet holds no symbols at all.
	pub fn is_empty(&self) -> bool {
		self.symbols.is_empty()
	}

	/// Maps raw text to a constrained symbol stream over this alphabet.
	///
	/// # Behavior
	/// - Lower-cases the input (UTF-8 aware, one-to-many expansions included)
	/// - Replaces every character outside the alphabet with the space symbol
	/// - Collapses each maximal run of space symbols into a single space
	/// - Trims leading and trailing space
	///
	/// # Notes
	/// - Deterministic, total and pure: never fails, reads no hidden state.
	/// - An input that normalizes to the empty sequence is valid; downstream
	///   consumers handle it rather than this function rejecting it.
	pub fn normalize(&self, raw: &str) -> NormalizedText {
		let mut out: Vec<char> = Vec::with_capacity(raw.len());
		for c in raw.chars().flat_map(|c| c.to_lowercase()) {
			let symbol = if self.symbols.contains(&c) { c } else { self.space };
			if symbol == self.space && (out.is_empty() || out.last() == Some(&self.space)) {
				continue;
			}
			out.push(symbol);
		}
		if out.last() == Some(&self.space) {
			out.pop();
		}
		NormalizedText(out)
	}
}

/// An ordered symbol sequence drawn entirely from one `Alphabet`.
///
/// Produced only by `Alphabet::normalize`; immutable after creation.
///
/// # Invariants
/// - Every symbol is a member of the producing alphabet
/// - No two consecutive space symbols
/// - No leading or trailing space
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedText(Vec<char>);

impl NormalizedText {
	/// Number of symbols in the stream.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if normalization produced no symbols at all.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Read-only view of the symbol stream.
	pub fn symbols(&self) -> &[char] {
		&self.0
	}
}

impl fmt::Display for NormalizedText {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for c in &self.0 {
			write!(f, "{c}")?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn folds_foreign_characters_into_space() {
		let alphabet = Alphabet::russian();
		let text = alphabet.normalize("Мама123мыла\tраму");
		assert_eq!(text.to_string(), "мама мыла раму");
	}

	#[test]
	fn collapses_runs_and_trims() {
		let alphabet = Alphabet::russian();
		let text = alphabet.normalize("  мама   (!)  раму  ");
		assert_eq!(text.to_string(), "мама ! раму");
	}

	#[test]
	fn output_contains_only_alphabet_symbols() {
		let alphabet = Alphabet::russian();
		let text = alphabet.normalize("Zzz Привет, мир! 42");
		assert!(text.symbols().iter().all(|&c| alphabet.contains(c)));
		assert!(!text.to_string().contains("  "));
		assert!(!text.to_string().starts_with(' '));
		assert!(!text.to_string().ends_with(' '));
	}

	#[test]
	fn normalization_is_idempotent() {
		let alphabet = Alphabet::russian();
		for raw in ["Мама МЫЛА 77 раму...", "", "   ", "abcDEF", "ёж, уж и ...?!"] {
			let once = alphabet.normalize(raw);
			let twice = alphabet.normalize(&once.to_string());
			assert_eq!(once, twice, "not idempotent for {raw:?}");
		}
	}

	#[test]
	fn fully_foreign_input_normalizes_to_empty() {
		let alphabet = Alphabet::russian();
		assert!(alphabet.normalize("12345 --- ABC").is_empty());
		assert!(alphabet.normalize("").is_empty());
	}

	#[test]
	fn custom_alphabet_keeps_its_own_space() {
		let alphabet = Alphabet::new(['a', 'b'], '_');
		let text = alphabet.normalize("a!b??a");
		assert_eq!(text.to_string(), "a_b_a");
	}
}
