use csv::ReaderBuilder;
use log::{debug, warn};

use super::cell::CellValue;

const BOM: char = '\u{feff}';

/// Every record of a CSV file, header included. Rows may have different
/// lengths. A file that is not valid UTF-8 has no records.
pub fn read_records(bytes: &[u8]) -> Vec<Vec<CellValue>> {
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text.trim_start_matches(BOM),
        Err(e) => {
            warn!("Ignoring CSV file that is not valid UTF-8: {e}");
            return vec![];
        }
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = vec![];
    for result in reader.records() {
        match result {
            Ok(record) => records.push(record.iter().map(CellValue::text).collect()),
            Err(e) => {
                debug!("Stopping at malformed CSV record: {e}");
                break;
            }
        }
    }
    records
}
