//! Parse the user input.

mod expense;

pub use expense::parse_expense;

use crate::error::InputError;

/// Split a whitespace-separated list of participant names.
///
/// Names are kept as typed: they are compared ignoring case later on.
pub fn parse_participants(s: &str) -> Result<Vec<String>, InputError> {
    let parts: Vec<_> = s.split_whitespace().map(|x| x.to_string()).collect();
    if parts.is_empty() {
        Err(InputError::participants_not_provided())
    } else {
        Ok(parts)
    }
}

/// Split the first whitespace-separated word from the rest of the input.
pub fn split_first_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}
