//! Coerce raw cells into amounts, dates and currency codes.
//!
//! Each function returns the value together with the warning it raised, if
//! any, so that rows can be assembled without shared mutable state.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc};
use nom::{
    branch::alt,
    bytes::complete::take_while_m_n,
    character::complete::one_of,
    combinator::{all_consuming, map, map_res},
    sequence::tuple,
    IResult,
};

use super::RowWarning;
use crate::types::Amount;

/// Serial numbers strictly between 0 and this are Excel dates, anything
/// else is a millisecond timestamp.
const EXCEL_SERIAL_LIMIT: f64 = 60000.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// A cell as read from a CSV file or a spreadsheet.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Empty,
}

impl CellValue {
    /// Blank text counts as empty.
    pub fn text(s: &str) -> CellValue {
        if s.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }

    /// Trimmed textual form of the cell.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Date(d) => d.to_string(),
            CellValue::Empty => String::new(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.as_text().is_empty()
    }
}

/// Parse an amount, tolerating currency symbols, thousands separators and
/// a comma used as decimal separator. The result is rounded to cents.
///
/// Negative amounts are turned positive and flagged; zero or unparseable
/// amounts are flagged and dropped. An empty cell is simply absent.
pub fn parse_amount(cell: &CellValue) -> (Option<Amount>, Option<RowWarning>) {
    let mut s = cell.as_text();
    if s.is_empty() {
        return (None, None);
    }

    if !s.contains('.')
        && s.matches(',').count() == 1
        && s.chars().all(|c| c.is_ascii_digit() || c == ',' || c == '.')
    {
        s = s.replace(',', ".");
    }

    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | ',') && !c.is_whitespace())
        .collect();

    match cleaned.parse::<f64>() {
        Ok(n) if n.is_finite() && n != 0.0 => {
            if n < 0.0 {
                (Some(round_to_cents(n.abs())), Some(RowWarning::NegAdjusted))
            } else {
                (Some(round_to_cents(n)), None)
            }
        }
        _ => (None, Some(RowWarning::InvalidAmount)),
    }
}

fn round_to_cents(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

/// Parse a date cell. Missing dates silently default to `today`, dates that
/// cannot be understood default to `today` with a warning.
pub fn parse_date(cell: &CellValue, today: NaiveDate) -> (NaiveDate, Option<RowWarning>) {
    let text = match cell {
        CellValue::Empty => return (today, None),
        CellValue::Date(d) => return (*d, None),
        CellValue::Number(n) => match date_from_number(*n) {
            Some(d) => return (d, None),
            None => cell.as_text(),
        },
        CellValue::Text(s) => s.trim().to_string(),
    };

    if text.is_empty() {
        return (today, None);
    }

    match parse_date_text(&text).or_else(|| parse_numeric_date(&text)) {
        Some(d) => (d, None),
        None => (today, Some(RowWarning::DateFallback)),
    }
}

/// Excel serial dates count days from 1899-12-30, which absorbs the 1900
/// leap year bug for every date after February 1900.
fn date_from_number(n: f64) -> Option<NaiveDate> {
    if !n.is_finite() {
        return None;
    }
    if n > 0.0 && n < EXCEL_SERIAL_LIMIT {
        let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
        let offset = Duration::milliseconds((n * MILLIS_PER_DAY).round() as i64);
        epoch.checked_add_signed(offset).map(|d| d.date())
    } else {
        DateTime::<Utc>::from_timestamp_millis(n as i64).map(|d| d.date_naive())
    }
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%a %b %d %Y",
];

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// The common unambiguous textual date forms. Timestamps with an offset are
/// converted to UTC before taking the date.
///
/// Short years would land in the first century, so they count as unknown.
fn parse_date_text(s: &str) -> Option<NaiveDate> {
    parse_any_date_text(s).filter(|d| d.year() >= 1000)
}

fn parse_any_date_text(s: &str) -> Option<NaiveDate> {
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.with_timezone(&Utc).date_naive());
    }
    if let Ok(d) = DateTime::parse_from_rfc2822(s) {
        return Some(d.with_timezone(&Utc).date_naive());
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .or_else(|| {
            DATE_TIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|d| d.date())
        })
}

/// `D/M/YYYY` or `M/D/YYYY`, also with `-` as separator or a two-digit
/// year. The first number is a day only when it cannot be a month,
/// otherwise month comes first. Two-digit years below 50 are in the 2000s,
/// the others in the 1900s.
fn parse_numeric_date(s: &str) -> Option<NaiveDate> {
    let (_, (first, separator, second, other_separator, year)) = all_consuming(tuple((
        day_or_month,
        one_of("/-"),
        day_or_month,
        one_of("/-"),
        alt((full_year, short_year)),
    )))(s)
    .ok()?;

    if separator != other_separator {
        return None;
    }

    if first > 12 {
        NaiveDate::from_ymd_opt(year, second, first)
    } else {
        NaiveDate::from_ymd_opt(year, first, second)
    }
}

fn day_or_month(s: &str) -> IResult<&str, u32> {
    map_res(take_while_m_n(1, 2, |c: char| c.is_ascii_digit()), str::parse::<u32>)(s)
}

fn full_year(s: &str) -> IResult<&str, i32> {
    map_res(take_while_m_n(4, 4, |c: char| c.is_ascii_digit()), str::parse::<i32>)(s)
}

fn short_year(s: &str) -> IResult<&str, i32> {
    map(
        map_res(take_while_m_n(2, 2, |c: char| c.is_ascii_digit()), str::parse::<i32>),
        |y| if y < 50 { 2000 + y } else { 1900 + y },
    )(s)
}

/// Currency codes are three ASCII letters. An empty cell is not an error.
pub fn parse_currency(cell: &CellValue) -> (Option<String>, Option<RowWarning>) {
    let s = cell.as_text().to_uppercase();
    if s.is_empty() {
        (None, None)
    } else if s.len() == 3 && s.chars().all(|c| c.is_ascii_uppercase()) {
        (Some(s), None)
    } else {
        (None, Some(RowWarning::InvalidCurrency))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 6, 15).expect("test")
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("test")
    }

    fn amount(s: &str) -> (Option<f64>, Option<RowWarning>) {
        parse_amount(&CellValue::text(s))
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(amount("12.50"), (Some(12.5), None));
        assert_eq!(amount("12,50"), (Some(12.5), None));
        assert_eq!(amount("$1,234.567"), (Some(1234.57), None));
        assert_eq!(amount(" € 7 "), (Some(7.0), None));
        assert_eq!(amount("£3.1"), (Some(3.1), None));
        assert_eq!(amount("1,234,567"), (Some(1234567.0), None));
    }

    #[test]
    fn test_parse_amount_comma_heuristic_needs_plain_digits() {
        // The currency symbol disables the decimal comma guess.
        assert_eq!(amount("$12,50"), (Some(1250.0), None));
    }

    #[test]
    fn test_parse_amount_warnings() {
        assert_eq!(amount(""), (None, None));
        assert_eq!(amount("   "), (None, None));
        assert_eq!(amount("0"), (None, Some(RowWarning::InvalidAmount)));
        assert_eq!(amount("abc"), (None, Some(RowWarning::InvalidAmount)));
        assert_eq!(amount("$"), (None, Some(RowWarning::InvalidAmount)));
        assert_eq!(amount("inf"), (None, Some(RowWarning::InvalidAmount)));
        assert_eq!(amount("-12.50"), (Some(12.5), Some(RowWarning::NegAdjusted)));
    }

    #[test]
    fn test_parse_amount_from_number() {
        let (value, warning) = parse_amount(&CellValue::Number(19.999));
        assert_abs_diff_eq!(value.expect("test"), 20.0);
        assert_eq!(warning, None);
        assert_eq!(parse_amount(&CellValue::Empty), (None, None));
    }

    #[test]
    fn test_parse_date_text() {
        let text = |s: &str| parse_date(&CellValue::text(s), today());
        assert_eq!(text("2024-03-01"), (ymd(2024, 3, 1), None));
        assert_eq!(text("2024/03/01"), (ymd(2024, 3, 1), None));
        assert_eq!(text("2024-03-01T23:30:00-02:00"), (ymd(2024, 3, 2), None));
        assert_eq!(text("2024-03-01 10:15"), (ymd(2024, 3, 1), None));
        assert_eq!(text("1 Mar 2024"), (ymd(2024, 3, 1), None));
        assert_eq!(text("March 1, 2024"), (ymd(2024, 3, 1), None));
    }

    #[test]
    fn test_parse_slash_dates() {
        let text = |s: &str| parse_date(&CellValue::text(s), today());
        assert_eq!(text("13/01/2024"), (ymd(2024, 1, 13), None));
        assert_eq!(text("01/13/2024"), (ymd(2024, 1, 13), None));
        assert_eq!(text("3/4/2024"), (ymd(2024, 3, 4), None));
        assert_eq!(text("31/12/2023"), (ymd(2023, 12, 31), None));
        assert_eq!(text("1/2/24"), (ymd(2024, 1, 2), None));
        assert_eq!(text("25/12/99"), (ymd(1999, 12, 25), None));
        assert_eq!(text("03-01-2024"), (ymd(2024, 3, 1), None));
        assert_eq!(text("2024.03.01"), (ymd(2024, 3, 1), None));
    }

    #[test]
    fn test_parse_date_fallback() {
        let text = |s: &str| parse_date(&CellValue::text(s), today());
        assert_eq!(text("yesterday"), (today(), Some(RowWarning::DateFallback)));
        assert_eq!(text("13/13/2024"), (today(), Some(RowWarning::DateFallback)));
        assert_eq!(text("1/2-2024"), (today(), Some(RowWarning::DateFallback)));
        assert_eq!(text("1/2/202"), (today(), Some(RowWarning::DateFallback)));
        assert_eq!(text(""), (today(), None));
        assert_eq!(parse_date(&CellValue::Empty, today()), (today(), None));
    }

    #[test]
    fn test_parse_date_from_number() {
        let number = |n: f64| parse_date(&CellValue::Number(n), today());
        assert_eq!(number(45352.0), (ymd(2024, 3, 1), None));
        assert_eq!(number(45352.75), (ymd(2024, 3, 1), None));
        assert_eq!(number(1.0), (ymd(1899, 12, 31), None));
        assert_eq!(number(1_709_251_200_000.0), (ymd(2024, 3, 1), None));
        assert_eq!(number(0.0), (ymd(1970, 1, 1), None));
    }

    #[test]
    fn test_parse_date_native() {
        let d = ymd(2021, 7, 4);
        assert_eq!(parse_date(&CellValue::Date(d), today()), (d, None));
    }

    #[test]
    fn test_parse_currency() {
        let currency = |s: &str| parse_currency(&CellValue::text(s));
        assert_eq!(currency(" eur "), (Some("EUR".to_string()), None));
        assert_eq!(currency("USD"), (Some("USD".to_string()), None));
        assert_eq!(currency(""), (None, None));
        assert_eq!(currency("US$"), (None, Some(RowWarning::InvalidCurrency)));
        assert_eq!(currency("EURO"), (None, Some(RowWarning::InvalidCurrency)));
        assert_eq!(
            parse_currency(&CellValue::Number(978.0)),
            (None, Some(RowWarning::InvalidCurrency))
        );
    }
}
