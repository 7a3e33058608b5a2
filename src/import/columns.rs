//! Guess which column holds which field from the header row.

/// Logical fields that can be read from an uploaded table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Amount,
    Date,
    Description,
    Merchant,
    Currency,
}

/// Zero-based column index of every field that was found in the header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub amount: Option<usize>,
    pub date: Option<usize>,
    pub description: Option<usize>,
    pub merchant: Option<usize>,
    pub currency: Option<usize>,
}

impl ColumnMap {
    /// Only the first column matching a field is bound.
    pub fn detect<T: AsRef<str>>(headers: &[T]) -> ColumnMap {
        let mut map = ColumnMap::default();
        for (index, header) in headers.iter().enumerate() {
            if let Some(field) = field_for_header(&normalize_header(header.as_ref())) {
                let slot = map.slot(field);
                if slot.is_none() {
                    *slot = Some(index);
                }
            }
        }
        map
    }

    pub fn get(&self, field: Field) -> Option<usize> {
        match field {
            Field::Amount => self.amount,
            Field::Date => self.date,
            Field::Description => self.description,
            Field::Merchant => self.merchant,
            Field::Currency => self.currency,
        }
    }

    /// Columns that never take part in the description guess. The currency
    /// column is not among them.
    pub fn is_reserved(&self, index: usize) -> bool {
        [self.amount, self.date, self.description, self.merchant].contains(&Some(index))
    }

    fn slot(&mut self, field: Field) -> &mut Option<usize> {
        match field {
            Field::Amount => &mut self.amount,
            Field::Date => &mut self.date,
            Field::Description => &mut self.description,
            Field::Merchant => &mut self.merchant,
            Field::Currency => &mut self.currency,
        }
    }
}

/// Lower-case, trim and drop everything that is not an ASCII letter or digit,
/// e.g. "Trans. Date" becomes "transdate".
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

fn field_for_header(normalized: &str) -> Option<Field> {
    match normalized {
        "amount" | "amt" | "total" | "value" => Some(Field::Amount),
        "date" | "transactiondate" | "dt" => Some(Field::Date),
        "description" | "desc" | "note" | "notes" | "memo" | "comment" | "comments" => {
            Some(Field::Description)
        }
        "merchant" | "vendor" | "store" | "place" | "shop" | "where" => Some(Field::Merchant),
        "currency" | "curr" | "ccy" => Some(Field::Currency),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Trans. Date "), "transdate");
        assert_eq!(normalize_header("Amount ($)"), "amount");
        assert_eq!(normalize_header("Transaction_Date"), "transactiondate");
        assert_eq!(normalize_header("Café"), "caf");
    }

    #[test]
    fn test_detect_columns() {
        let map = ColumnMap::detect(&["Date", "Description", "Amount"]);
        assert_eq!(map.date, Some(0));
        assert_eq!(map.description, Some(1));
        assert_eq!(map.amount, Some(2));
        assert_eq!(map.merchant, None);
        assert_eq!(map.currency, None);
    }

    #[test]
    fn test_first_match_wins() {
        let map = ColumnMap::detect(&["Total", "Amount", "Notes", "Memo", "CCY", "Vendor"]);
        assert_eq!(map.get(Field::Amount), Some(0));
        assert_eq!(map.get(Field::Description), Some(2));
        assert_eq!(map.get(Field::Currency), Some(4));
        assert_eq!(map.get(Field::Merchant), Some(5));
        assert_eq!(map.get(Field::Date), None);
    }

    #[test]
    fn test_headers_must_match_exactly() {
        let map = ColumnMap::detect(&["amount paid", "due date", "where?"]);
        assert_eq!(map.amount, None);
        assert_eq!(map.date, None);
        assert_eq!(map.merchant, Some(2));
    }

    #[test]
    fn test_reserved_columns() {
        let map = ColumnMap::detect(&["amount", "date", "currency", "memo", "other"]);
        assert!(map.is_reserved(0));
        assert!(map.is_reserved(1));
        assert!(!map.is_reserved(2));
        assert!(map.is_reserved(3));
        assert!(!map.is_reserved(4));
    }
}
