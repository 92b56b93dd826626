use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::{env, io};

/// Reads a whole UTF-8 text file into a single `String`.
///
/// The corpus is consumed as one stream; line structure is irrelevant
/// after normalization folds all whitespace into single spaces.
pub(crate) fn read_corpus<P: AsRef<Path>>(filename: P) -> io::Result<String> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	Ok(contents)
}

/// Path of the persisted probability table for order `k`.
///
/// Example:
/// `outputs` + `3` → `outputs/prob_k3.csv`
pub(crate) fn table_path<P: AsRef<Path>>(dir: P, k: usize) -> PathBuf {
	dir.as_ref().join(format!("prob_k{k}.csv"))
}

/// Path of the per-order summary artifact for order `k`.
pub(crate) fn summary_path<P: AsRef<Path>>(dir: P, k: usize) -> PathBuf {
	dir.as_ref().join(format!("summary_k{k}.txt"))
}

/// Path of the overall training summary artifact.
pub(crate) fn overall_summary_path<P: AsRef<Path>>(dir: P) -> PathBuf {
	dir.as_ref().join("overall_summary.txt")
}

/// Path of the binary fast-load cache for a trained table set.
pub(crate) fn cache_path<P: AsRef<Path>>(dir: P) -> PathBuf {
	dir.as_ref().join("model.bin")
}

/// Normalize a folder path.
///
/// - `"."` or `"./"` resolves to the current working directory
/// - Other paths are returned as-is (not canonicalized)
pub(crate) fn normalize_folder(input: &str) -> PathBuf {
	if input == "." || input == "./" {
		env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
	} else {
		PathBuf::from(input)
	}
}
