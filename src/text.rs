/// Player input helpers: normalising, splitting, and matching names

use crate::error::{MudError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Letters only, 3 to 12 of them
static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{3,12}$").expect("name pattern is a valid regex"));

/// Trim surrounding whitespace and lowercase
pub fn simplify(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Split a command line into the command word and its arguments
pub fn argify(input: &str) -> (String, Vec<String>) {
    let mut words = input.split_whitespace().map(str::to_string);
    let command = words.next().unwrap_or_default();
    (command, words.collect())
}

/// Capitalise the first letter and lowercase the rest
pub fn format_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Check that a character or NPC name is acceptable
pub fn validate_name(name: &str) -> Result<()> {
    if NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(MudError::InvalidName {
            name: name.to_string(),
            reason: "names must be 3-12 letters with no digits or symbols".to_string(),
        })
    }
}

/// Outcome of a case-insensitive prefix search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BestMatch {
    Found(usize),
    NotFound,
    Ambiguous,
}

/// Find the entry of `candidates` that `input` names
///
/// An exact (case-insensitive) match wins outright; otherwise `input` must be
/// a prefix of exactly one candidate.
pub fn best_match<S: AsRef<str>>(input: &str, candidates: &[S]) -> BestMatch {
    let needle = input.to_lowercase();
    if needle.is_empty() {
        return BestMatch::NotFound;
    }

    let mut found = BestMatch::NotFound;

    for (index, candidate) in candidates.iter().enumerate() {
        let candidate = candidate.as_ref().to_lowercase();

        if candidate == needle {
            return BestMatch::Found(index);
        }

        if candidate.starts_with(&needle) {
            found = match found {
                BestMatch::NotFound => BestMatch::Found(index),
                _ => BestMatch::Ambiguous,
            };
        }
    }

    found
}
