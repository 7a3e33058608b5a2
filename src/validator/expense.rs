//! Functions that check the validity of an expense parsed from user input.
//!
//! These functions are called after the parsing phase and execute
//! checks that are not easily done by the parser.

use chrono::NaiveDate;

use crate::error::InputError;
use crate::types::{Amount, NewExpense, ParsedExpense, Participant, ParticipantId};

/// Largest amount accepted for a single expense.
pub const MAX_AMOUNT: Amount = 1_000_000_000.0;

/// Some sanity checks on the expense that was submitted.
pub fn validate_expense(expense: &ParsedExpense) -> Result<(), InputError> {
    validate_amount(expense.amount)
}

/// Amounts are stored in cents, so they must be at least one cent once
/// rounded and no larger than [`MAX_AMOUNT`].
pub fn validate_amount(amount: Amount) -> Result<(), InputError> {
    if !amount.is_finite() {
        Err(InputError::invalid_expense("the amount is not a number"))
    } else if (amount * 100.0).round() <= 0.0 {
        Err(InputError::invalid_expense(
            "the amount must be at least 0.01",
        ))
    } else if amount > MAX_AMOUNT {
        Err(InputError::invalid_expense(format!(
            "the amount cannot be larger than {MAX_AMOUNT:.0}"
        )))
    } else {
        Ok(())
    }
}

/// Turn participant names into ids and fill in the defaults: everyone
/// shares the cost when no sharer is given, and the date is `today` when
/// missing.
///
/// Names are matched ignoring case. Sharers mentioned twice count once.
pub fn resolve_expense(
    expense: ParsedExpense,
    participants: &[Participant],
    today: NaiveDate,
) -> Result<NewExpense, InputError> {
    let paid_by = find_participant(participants, &expense.payer)?;

    let mut sharers: Vec<ParticipantId> = Vec::with_capacity(participants.len());
    if expense.sharers.is_empty() {
        sharers.extend(participants.iter().map(|p| p.id.clone()));
    } else {
        for name in &expense.sharers {
            let id = &find_participant(participants, name)?.id;
            if !sharers.contains(id) {
                sharers.push(id.clone());
            }
        }
    }

    if sharers.is_empty() {
        return Err(InputError::participants_not_provided());
    }

    Ok(NewExpense::new(
        expense.amount,
        expense.date.unwrap_or(today),
        expense.description.as_deref().unwrap_or_default(),
        &paid_by.id,
        sharers,
    )
    .with_place(expense.place))
}

pub(super) fn find_participant<'a>(
    participants: &'a [Participant],
    name: &str,
) -> Result<&'a Participant, InputError> {
    participants
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| InputError::unregistered_participant(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).expect("test")
    }

    fn roster() -> Vec<Participant> {
        vec![
            Participant::new("1", "alice"),
            Participant::new("2", "Bob"),
            Participant::new("3", "carol"),
        ]
    }

    fn parsed(payer: &str, amount: f64, sharers: &[&str]) -> ParsedExpense {
        ParsedExpense {
            payer: payer.to_string(),
            amount,
            sharers: sharers.iter().map(|s| s.to_string()).collect(),
            date: None,
            description: None,
            place: None,
        }
    }

    #[test]
    fn test_validate_expense() {
        assert!(validate_expense(&parsed("alice", 12.5, &[])).is_ok());
        assert!(validate_expense(&parsed("alice", 0.0, &[])).is_err());
        assert!(validate_expense(&parsed("alice", -3.0, &[])).is_err());
        assert!(validate_expense(&parsed("alice", f64::INFINITY, &[])).is_err());
        assert!(validate_expense(&parsed("alice", f64::NAN, &[])).is_err());
    }

    #[test]
    fn test_validate_amount_in_cents() {
        assert!(validate_amount(0.01).is_ok());
        assert!(validate_amount(0.005).is_ok());
        assert!(validate_amount(MAX_AMOUNT).is_ok());
        assert!(matches!(
            validate_amount(0.004),
            Err(InputError::InvalidExpense(_))
        ));
        assert!(matches!(
            validate_amount(MAX_AMOUNT + 1.0),
            Err(InputError::InvalidExpense(_))
        ));
        assert!(validate_amount(1e300).is_err());
    }

    #[test]
    fn test_resolve_everyone() -> anyhow::Result<()> {
        let expense = resolve_expense(parsed("ALICE", 30.0, &[]), &roster(), today())?;
        assert_eq!(expense.paid_by, "1");
        assert_eq!(expense.participants, vec!["1", "2", "3"]);
        assert_eq!(expense.date, today());
        assert_eq!(expense.description, "");
        assert_eq!(expense.place, None);
        Ok(())
    }

    #[test]
    fn test_resolve_sharers() -> anyhow::Result<()> {
        let mut input = parsed("carol", 9.0, &["bob", "alice", "Bob"]);
        input.date = NaiveDate::from_ymd_opt(2023, 12, 31);
        input.description = Some("dinner".to_string());
        input.place = Some("Luigi's".to_string());

        let expense = resolve_expense(input, &roster(), today())?;
        assert_eq!(expense.paid_by, "3");
        assert_eq!(expense.participants, vec!["2", "1"]);
        assert_eq!(expense.date, NaiveDate::from_ymd_opt(2023, 12, 31).expect("test"));
        assert_eq!(expense.description, "dinner");
        assert_eq!(expense.place, Some("Luigi's".to_string()));
        Ok(())
    }

    #[test]
    fn test_resolve_unknown_names() {
        assert!(matches!(
            resolve_expense(parsed("dave", 1.0, &[]), &roster(), today()),
            Err(InputError::UnregisteredParticipant(name)) if name == "dave"
        ));
        assert!(matches!(
            resolve_expense(parsed("alice", 1.0, &["bob", "erin"]), &roster(), today()),
            Err(InputError::UnregisteredParticipant(name)) if name == "erin"
        ));
    }

    #[test]
    fn test_resolve_without_participants() {
        let alone = vec![Participant::new("1", "alice")];
        assert!(resolve_expense(parsed("alice", 1.0, &[]), &alone, today()).is_ok());
        assert!(matches!(
            resolve_expense(parsed("alice", 1.0, &[]), &[], today()),
            Err(InputError::UnregisteredParticipant(_))
        ));
    }
}
