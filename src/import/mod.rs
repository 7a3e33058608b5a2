//! Turn an uploaded CSV or XLSX file with an unknown layout into uniform
//! rows that can be reviewed before becoming expenses.
//!
//! The layout is guessed from the header row (see [`columns`]), then every
//! data row is coerced field by field (see [`cell`]). Problems never stop
//! the import: they are attached to the affected row as warnings. The only
//! hard failure is a file that is neither `.csv` nor `.xlsx`.

use std::fmt;

use chrono::{NaiveDate, Utc};
use log::debug;
use serde::{Serialize, Serializer};

use crate::error::ImportError;
use crate::types::Amount;

pub mod cell;
pub mod columns;
mod csv_file;
mod xlsx_file;

use cell::{parse_amount, parse_currency, parse_date, CellValue};
use columns::{ColumnMap, Field};

/// Rows beyond this are dropped and the last kept row is flagged.
pub const MAX_ROWS: usize = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowWarning {
    InvalidAmount,
    NegAdjusted,
    DateFallback,
    InvalidCurrency,
    GuessedDescription,
    MissingDescription,
    TruncatedRows,
}

impl RowWarning {
    pub fn tag(&self) -> &'static str {
        match self {
            RowWarning::InvalidAmount => "invalid-amount",
            RowWarning::NegAdjusted => "neg-adjusted",
            RowWarning::DateFallback => "date-fallback",
            RowWarning::InvalidCurrency => "invalid-currency",
            RowWarning::GuessedDescription => "guessed-description",
            RowWarning::MissingDescription => "missing-description",
            RowWarning::TruncatedRows => "truncated-rows",
        }
    }
}

impl fmt::Display for RowWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl Serialize for RowWarning {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParsedRow {
    pub index: usize,
    pub include: bool,
    pub amount: Option<Amount>,
    pub date: NaiveDate,
    pub description: String,
    pub merchant: Option<String>,
    pub currency: Option<String>,
    pub warnings: Vec<RowWarning>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub invalid_rows: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub rows: Vec<ParsedRow>,
    pub summary: ImportSummary,
}

impl ParsedRow {
    /// A row can become an expense only with a positive amount and a
    /// description.
    pub fn is_valid(&self) -> bool {
        self.amount.map_or(false, |a| a > 0.0) && !self.description.trim().is_empty()
    }

    /// Valid and not excluded by the reviewer.
    pub fn is_importable(&self) -> bool {
        self.include && self.is_valid()
    }
}

impl ImportReport {
    fn new(rows: Vec<ParsedRow>) -> ImportReport {
        let valid_rows = rows.iter().filter(|r| r.is_valid()).count();
        let summary = ImportSummary {
            total_rows: rows.len(),
            valid_rows,
            invalid_rows: rows.len() - valid_rows,
        };
        ImportReport { rows, summary }
    }
}

/// Parse an uploaded file. Dates that are missing or cannot be read
/// default to the current UTC date.
pub fn parse_spreadsheet(bytes: &[u8], file_name: &str) -> Result<ImportReport, ImportError> {
    parse_spreadsheet_at(bytes, file_name, Utc::now().date_naive())
}

/// Same as [`parse_spreadsheet`], with an explicit fallback date.
pub fn parse_spreadsheet_at(
    bytes: &[u8],
    file_name: &str,
    today: NaiveDate,
) -> Result<ImportReport, ImportError> {
    let lower = file_name.trim().to_lowercase();
    let rows = if lower.ends_with(".csv") {
        normalize_table(csv_file::read_records(bytes), today)
    } else if lower.ends_with(".xlsx") {
        normalize_table(xlsx_file::read_first_sheet(bytes), today)
    } else {
        return Err(ImportError::unsupported_file_type(file_name));
    };

    debug!("Parsed {} rows from {file_name}", rows.len());
    Ok(ImportReport::new(rows))
}

/// The first non-blank record is the header. Blank records are skipped and
/// reading stops as soon as it is clear that the row cap was exceeded.
fn normalize_table<I>(records: I, today: NaiveDate) -> Vec<ParsedRow>
where
    I: IntoIterator<Item = Vec<CellValue>>,
{
    let mut records = records
        .into_iter()
        .filter(|cells| !cells.iter().all(CellValue::is_blank));

    let columns = match records.next() {
        Some(header) => {
            let names: Vec<_> = header.iter().map(CellValue::as_text).collect();
            ColumnMap::detect(&names)
        }
        None => return vec![],
    };
    debug!("Detected columns: {:?}", columns);

    let mut rows: Vec<ParsedRow> = vec![];
    for cells in records {
        if rows.len() == MAX_ROWS {
            if let Some(last) = rows.last_mut() {
                last.warnings.push(RowWarning::TruncatedRows);
            }
            break;
        }
        let row = normalize_row(rows.len(), &cells, &columns, today);
        rows.push(row);
    }
    rows
}

fn normalize_row(
    index: usize,
    cells: &[CellValue],
    columns: &ColumnMap,
    today: NaiveDate,
) -> ParsedRow {
    let (amount, amount_warning) = parse_amount(pick(cells, columns.get(Field::Amount)));
    let (date, date_warning) = parse_date(pick(cells, columns.get(Field::Date)), today);
    let (description, description_warning) = resolve_description(cells, columns);
    let (currency, currency_warning) = match columns.get(Field::Currency) {
        Some(i) => parse_currency(pick(cells, Some(i))),
        None => (None, None),
    };

    let merchant = non_empty_text(cells, columns.get(Field::Merchant)).or(description.guessed);

    let warnings = [
        amount_warning,
        date_warning,
        description_warning,
        currency_warning,
    ]
    .into_iter()
    .flatten()
    .collect();

    ParsedRow {
        index,
        include: true,
        amount,
        date,
        description: description.text,
        merchant,
        currency,
        warnings,
    }
}

struct Description {
    text: String,
    /// Set when the text was taken from an unrelated column.
    guessed: Option<String>,
}

/// Use the description column, then the merchant column, then the first
/// non-empty column that is not bound to another field.
fn resolve_description(
    cells: &[CellValue],
    columns: &ColumnMap,
) -> (Description, Option<RowWarning>) {
    let explicit = non_empty_text(cells, columns.get(Field::Description))
        .or_else(|| non_empty_text(cells, columns.get(Field::Merchant)));
    if let Some(text) = explicit {
        return (
            Description {
                text,
                guessed: None,
            },
            None,
        );
    }

    let guessed = (0..cells.len())
        .filter(|i| !columns.is_reserved(*i))
        .find_map(|i| non_empty_text(cells, Some(i)));

    match guessed {
        Some(text) => (
            Description {
                text: text.clone(),
                guessed: Some(text),
            },
            Some(RowWarning::GuessedDescription),
        ),
        None => (
            Description {
                text: String::new(),
                guessed: None,
            },
            Some(RowWarning::MissingDescription),
        ),
    }
}

const EMPTY_CELL: CellValue = CellValue::Empty;

/// Unbound columns and short rows read as empty cells.
fn pick(cells: &[CellValue], index: Option<usize>) -> &CellValue {
    index.and_then(|i| cells.get(i)).unwrap_or(&EMPTY_CELL)
}

fn non_empty_text(cells: &[CellValue], index: Option<usize>) -> Option<String> {
    let text = pick(cells, index).as_text();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
