//! Functions that check the validity of user input.
//!
//! These functions are called after the parsing phase and execute
//! checks that are not easily done by the parser.

use std::collections::HashSet;

use crate::error::InputError;

mod database;
mod expense;

pub use database::{
    validate_expense_exists, validate_participant_exists, validate_participant_not_in_use,
    validate_participants_do_not_exist, validate_trip_unlocked,
};
pub use expense::{resolve_expense, validate_amount, validate_expense};

/// Participant names are ASCII alphanumeric and start with a letter.
pub fn is_valid_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Check the syntax of new participant names, and that the same name
/// (ignoring case) is not given twice.
pub fn validate_participant_names<T: AsRef<str>>(names: &[T]) -> Result<(), InputError> {
    let mut seen = HashSet::new();
    for name in names {
        let name = name.as_ref();
        if !is_valid_name(name) {
            return Err(InputError::invalid_participant_name(name));
        }
        if !seen.insert(name.to_lowercase()) {
            return Err(InputError::duplicate_participant(name));
        }
    }
    Ok(())
}

/// Trip slugs are non-empty and made of lower-case ASCII letters, digits and `-`.
pub fn validate_trip_slug(slug: &str) -> Result<(), InputError> {
    let is_valid = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if is_valid {
        Ok(())
    } else {
        Err(InputError::invalid_trip_slug(slug))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_name() {
        assert!(is_valid_name("alice"));
        assert!(is_valid_name("Bob2"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("2bob"));
        assert!(!is_valid_name("zoë"));
        assert!(!is_valid_name("a-b"));
    }

    #[test]
    fn test_validate_participant_names() {
        assert!(validate_participant_names(&["alice", "bob"]).is_ok());
        assert!(matches!(
            validate_participant_names(&["alice", "1x"]),
            Err(InputError::InvalidParticipantName(name)) if name == "1x"
        ));
        assert!(matches!(
            validate_participant_names(&["alice", "ALICE"]),
            Err(InputError::DuplicateParticipant(name)) if name == "ALICE"
        ));
    }

    #[test]
    fn test_validate_trip_slug() {
        assert!(validate_trip_slug("lisbon-2024").is_ok());
        assert!(validate_trip_slug("").is_err());
        assert!(validate_trip_slug("Lisbon").is_err());
        assert!(validate_trip_slug("lisbon 2024").is_err());
    }
}
