//! Parse an expense.
//!
//! Since expenses have a more or less complex syntax, we use nom.

use chrono::NaiveDate;
use nom::{
    bytes::complete::{is_not, tag, take_while_m_n},
    character::complete::{char, multispace0, multispace1, not_line_ending},
    combinator::{all_consuming, map, map_res, opt, recognize, verify},
    multi::many0,
    sequence::{preceded, terminated, tuple},
    AsChar, IResult, InputTakeAtPosition,
};

use crate::{
    types::{Amount, ParsedExpense},
    validator::is_valid_name,
};

/// Parse an expense submitted by the user, e.g.
/// `alice 12.50 bob carol 2024-03-01 - dinner @ Luigi's`.
///
/// Only the syntax is checked here: amounts may still be negative and names
/// may not be registered.
pub fn parse_expense(s: &str) -> IResult<&str, ParsedExpense> {
    let (s, (payer, amount, sharers, date, text)) = all_consuming(terminated(
        tuple((
            preceded(multispace0, parse_participant_name),
            preceded(multispace1, parse_amount),
            many0(preceded(multispace1, parse_participant_name)),
            opt(preceded(multispace1, parse_date)),
            opt(preceded(multispace0, parse_description)),
        )),
        multispace0,
    ))(s)?;

    let (description, place) = match text {
        Some(text) => split_place(text),
        None => (None, None),
    };

    Ok((
        s,
        ParsedExpense {
            payer: payer.to_string(),
            amount,
            sharers: sharers.into_iter().map(|p| p.to_string()).collect(),
            date,
            description,
            place,
        },
    ))
}

/// Participant name must be alphanumeric and cannot start with a number.
fn parse_participant_name(s: &str) -> IResult<&str, &str> {
    // Match until a whitespace is found, then use is_valid_name to make sure
    // that a name was matched (and not a number or a date).
    recognize(verify(is_not(" \t\r\n"), is_valid_name))(s)
}

fn float1(s: &str) -> IResult<&str, &str> {
    s.split_at_position1_complete(
        |item| !item.is_dec_digit() && item != ',' && item != '.' && item != '-' && item != '+',
        nom::error::ErrorKind::Float,
    )
}

/// Both `.` and `,` are accepted as decimal separator.
fn parse_amount(s: &str) -> IResult<&str, Amount> {
    fn do_parse(x: &str) -> Result<Amount, std::num::ParseFloatError> {
        x.replace(',', ".").parse::<Amount>()
    }

    map_res(float1, do_parse)(s)
}

fn parse_date(s: &str) -> IResult<&str, NaiveDate> {
    let digits = |n| take_while_m_n(n, n, |c: char| c.is_ascii_digit());
    map_res(
        recognize(tuple((digits(4), char('-'), digits(2), char('-'), digits(2)))),
        |d| NaiveDate::parse_from_str(d, "%Y-%m-%d"),
    )(s)
}

fn parse_description(s: &str) -> IResult<&str, &str> {
    preceded(tag("- "), map(not_line_ending, |s| s))(s)
}

/// `description @ place`; either side may be missing.
fn split_place(text: &str) -> (Option<String>, Option<String>) {
    let (description, place) = match text.split_once(" @ ") {
        Some((description, place)) => (description, Some(place)),
        None => match text.trim().strip_prefix("@ ") {
            Some(place) => ("", Some(place)),
            None => (text, None),
        },
    };

    let non_empty = |s: &str| {
        let s = s.trim();
        if s.is_empty() {
            None
        } else {
            Some(s.to_string())
        }
    };
    (non_empty(description), place.and_then(non_empty))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("test")
    }

    #[test]
    fn test_parse_participant_name() {
        assert_eq!(parse_participant_name("aBC rest"), Ok((" rest", "aBC")));
        assert!(parse_participant_name("1abc").is_err());
        assert!(parse_participant_name("12.5").is_err());
        assert!(parse_participant_name("2024-03-01").is_err());
        assert!(parse_participant_name("-").is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("3.45"), Ok(("", 3.45)));
        assert_eq!(parse_amount("3,45"), Ok(("", 3.45)));
        assert_eq!(parse_amount("3"), Ok(("", 3.0)));
        assert_eq!(parse_amount("+3"), Ok(("", 3.0)));
        assert_eq!(parse_amount("-3.45 x"), Ok((" x", -3.45)));
        assert!(parse_amount("3.4.5").is_err());
        assert!(parse_amount("abc").is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-03-01"), Ok(("", ymd(2024, 3, 1))));
        assert!(parse_date("2024-02-30").is_err());
        assert!(parse_date("24-03-01").is_err());
    }

    #[test]
    fn test_parse_description() {
        assert_eq!(parse_description("- abc  "), Ok(("", "abc  ")));
        assert_eq!(split_place("abc  def"), (Some("abc  def".to_string()), None));
        assert_eq!(
            split_place("dinner @ Luigi's "),
            (Some("dinner".to_string()), Some("Luigi's".to_string()))
        );
        assert_eq!(split_place("@ Luigi's"), (None, Some("Luigi's".to_string())));
        assert_eq!(split_place("mail@example.com"), (Some("mail@example.com".to_string()), None));
        assert_eq!(split_place("  "), (None, None));
    }

    #[test]
    fn test_parse() -> anyhow::Result<()> {
        let (rest, expense) =
            parse_expense(" alice 12,50  Bob carol 2024-03-01 - dinner out @ Luigi's ")?;
        assert_eq!(rest, "");
        assert_eq!(expense.payer, "alice");
        assert_eq!(expense.amount, 12.5);
        assert_eq!(expense.sharers, vec!["Bob", "carol"]);
        assert_eq!(expense.date, Some(ymd(2024, 3, 1)));
        assert_eq!(expense.description, Some("dinner out".to_string()));
        assert_eq!(expense.place, Some("Luigi's".to_string()));

        let (_, expense) = parse_expense("alice 30")?;
        assert_eq!(expense.amount, 30.0);
        assert!(expense.sharers.is_empty());
        assert_eq!(expense.date, None);
        assert_eq!(expense.description, None);
        assert_eq!(expense.place, None);

        let (_, expense) = parse_expense("alice 30 2024-03-01")?;
        assert!(expense.sharers.is_empty());
        assert_eq!(expense.date, Some(ymd(2024, 3, 1)));

        let (_, expense) = parse_expense("alice 30 bob - taxi")?;
        assert_eq!(expense.sharers, vec!["bob"]);
        assert_eq!(expense.description, Some("taxi".to_string()));
        Ok(())
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_expense("").is_err());
        assert!(parse_expense("alice").is_err());
        assert!(parse_expense("12 alice").is_err());
        assert!(parse_expense("alice 12 bob 2024-03-01 carol").is_err());
        assert!(parse_expense("alice 12 bob dinner").is_ok());
        assert!(parse_expense("alice 12 bob dinner!").is_err());
        assert!(parse_expense("alice 12 - ").is_ok());
    }
}
