use std::io::Cursor;

use calamine::{Data, DataType, Reader, Xlsx};
use log::warn;

use super::cell::CellValue;

/// Every row of the first worksheet, header included. A workbook that
/// cannot be opened has no rows.
pub fn read_first_sheet(bytes: &[u8]) -> Vec<Vec<CellValue>> {
    let mut workbook: Xlsx<_> = match Xlsx::new(Cursor::new(bytes)) {
        Ok(workbook) => workbook,
        Err(e) => {
            warn!("Ignoring XLSX file that cannot be opened: {e}");
            return vec![];
        }
    };

    let range = match workbook.worksheet_range_at(0) {
        Some(Ok(range)) => range,
        Some(Err(e)) => {
            warn!("Ignoring unreadable first worksheet: {e}");
            return vec![];
        }
        None => return vec![],
    };

    range
        .rows()
        .map(|row| row.iter().map(to_cell_value).collect())
        .collect()
}

fn to_cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::text(s),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::text(&b.to_string()),
        Data::DateTime(_) => match data.as_datetime() {
            Some(dt) => CellValue::Date(dt.date()),
            None => data.as_f64().map_or(CellValue::Empty, CellValue::Number),
        },
        Data::Error(_) => CellValue::Empty,
    }
}
