//! Produce the strings that are printed as replies.
//! The formatting consists in aligning columns, using a few emojis
//! and composing the actual output string.

use crate::import::{ImportReport, ParsedRow};
use crate::settlement::Balances;
use crate::types::{name_of, Amount, Expense, Participant, Settlement};

pub fn format_list_expenses(expenses: &[Expense], participants: &[Participant]) -> String {
    if expenses.is_empty() {
        "Nothing to show!".to_string()
    } else {
        expenses
            .iter()
            .map(|e| format_expense(e, participants))
            .fold(String::new(), |a, b| a + &b + "\n")
    }
}

fn format_expense(expense: &Expense, participants: &[Participant]) -> String {
    let sharers = expense
        .participants
        .iter()
        .map(|p| display_name(participants, p))
        .collect::<Vec<_>>()
        .join(" ");

    let mut result = format!(
        "💰  {}: {} {} {} → {}",
        expense.id,
        expense.date,
        display_name(participants, &expense.paid_by),
        format_amount(expense.amount),
        sharers
    );

    if !expense.description.is_empty() {
        result = format!("{result} - {}", expense.description);
    }
    if let Some(place) = &expense.place {
        result = format!("{result} @ {place}");
    }
    result
}

pub fn format_amount(amount: Amount) -> String {
    format!("{:.2}", amount)
}

fn display_name<'a>(participants: &'a [Participant], id: &'a str) -> &'a str {
    name_of(participants, id).unwrap_or(id)
}

pub fn format_balances(balances: &Balances, participants: &[Participant]) -> String {
    if balances.is_empty() {
        "Nothing to show!".to_string()
    } else {
        let names: Vec<_> = balances
            .iter()
            .map(|(id, amount)| (display_name(participants, id), *amount))
            .collect();
        let target_length = names.iter().map(|(n, _)| n.len()).max().unwrap_or(0);

        names
            .iter()
            .map(|(name, amount)| {
                format!(
                    "{}  {:>10}",
                    pad(name, target_length),
                    format!("{:+.2}", clean_zero(*amount))
                )
            })
            .fold(String::new(), |a, b| a + &b + "\n")
    }
}

/// Avoid printing `-0.00` for floating-point noise.
fn clean_zero(amount: Amount) -> Amount {
    if amount.abs() < 0.005 {
        0.0
    } else {
        amount
    }
}

pub fn format_settlements(settlements: &[Settlement], participants: &[Participant]) -> String {
    if settlements.is_empty() {
        "All clean!".to_string()
    } else {
        let max_debtor_length = settlements
            .iter()
            .map(|s| display_name(participants, &s.from).len())
            .max()
            .unwrap_or(0);
        settlements
            .iter()
            .map(|s| format_settlement(s, participants, max_debtor_length))
            .fold(String::new(), |a, b| a + &b + "\n")
    }
}

fn format_settlement(
    settlement: &Settlement,
    participants: &[Participant],
    target_length: usize,
) -> String {
    // We make sure that the amounts are always aligned, by padding the debtors where needed:
    let debtor = pad(display_name(participants, &settlement.from), target_length);

    format!(
        "💰  {} 💸  {}  {} 🤑",
        debtor,
        format_amount(settlement.amount),
        display_name(participants, &settlement.to)
    )
}

fn pad(s: &str, target_length: usize) -> String {
    format!("{:<width$}", s, width = target_length)
}

pub fn format_simple_list<T: AsRef<str>>(elements: &[T]) -> String {
    if elements.is_empty() {
        "Nothing to show!".to_string()
    } else {
        elements
            .iter()
            .map(|g| format!("- {}", g.as_ref()))
            .fold(String::new(), |a, b| a + &b + "\n")
    }
}

pub fn format_import_report(report: &ImportReport) -> String {
    let summary = format!(
        "{} rows, {} valid, {} invalid",
        report.summary.total_rows, report.summary.valid_rows, report.summary.invalid_rows
    );
    report
        .rows
        .iter()
        .map(format_row)
        .fold(String::new(), |a, b| a + &b + "\n")
        + &summary
}

fn format_row(row: &ParsedRow) -> String {
    let marker = if row.is_valid() { "✓" } else { "✗" };
    let amount = row.amount.map_or("-".to_string(), format_amount);

    let mut result = format!(
        "{marker} {:>3}  {}  {:>10}  {}",
        row.index, row.date, amount, row.description
    );
    if let Some(merchant) = &row.merchant {
        if merchant != &row.description {
            result = format!("{result} @ {merchant}");
        }
    }
    if let Some(currency) = &row.currency {
        result = format!("{result} [{currency}]");
    }
    if !row.warnings.is_empty() {
        let warnings: Vec<_> = row.warnings.iter().map(|w| w.tag()).collect();
        result = format!("{result} ({})", warnings.join(", "));
    }
    result
}
