//! Write the expense ledger and the settlement plan as CSV files.

use std::{fs::File, io};

use anyhow::Context;
use csv::{QuoteStyle, WriterBuilder};
use log::info;

use crate::formatter::format_amount;
use crate::types::{name_of, Expense, Participant, Settlement};

const EXPENSE_HEADERS: [&str; 8] = [
    "Date",
    "Place",
    "Amount",
    "Description",
    "Paid By",
    "Participants",
    "Amount Per Person",
    "Created At",
];

const SETTLEMENT_HEADERS: [&str; 3] = ["From", "To", "Amount"];

const UNKNOWN_PARTICIPANT: &str = "Unknown";

pub fn write_expenses<W: io::Write>(
    writer: W,
    expenses: &[Expense],
    participants: &[Participant],
) -> anyhow::Result<()> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);

    writer.write_record(EXPENSE_HEADERS)?;
    for expense in expenses {
        let paid_by = name_of(participants, &expense.paid_by).unwrap_or(UNKNOWN_PARTICIPANT);
        let sharers = expense
            .participants
            .iter()
            .map(|id| name_of(participants, id).unwrap_or(UNKNOWN_PARTICIPANT))
            .collect::<Vec<_>>()
            .join("; ");

        writer.write_record([
            expense.date.to_string(),
            expense.place.clone().unwrap_or_default(),
            format_amount(expense.amount),
            expense.description.clone(),
            paid_by.to_string(),
            sharers,
            format_amount(expense.per_head_share()),
            expense.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Ids without a participant are written as they are.
pub fn write_settlements<W: io::Write>(
    writer: W,
    settlements: &[Settlement],
    participants: &[Participant],
) -> anyhow::Result<()> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);

    writer.write_record(SETTLEMENT_HEADERS)?;
    for settlement in settlements {
        writer.write_record([
            name_of(participants, &settlement.from).unwrap_or(&settlement.from),
            name_of(participants, &settlement.to).unwrap_or(&settlement.to),
            format_amount(settlement.amount).as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_expenses(
    path: &str,
    expenses: &[Expense],
    participants: &[Participant],
) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("cannot create `{path}`"))?;
    write_expenses(file, expenses, participants)?;
    info!("Exported {} expenses to {path}", expenses.len());
    Ok(())
}

pub fn export_settlements(
    path: &str,
    settlements: &[Settlement],
    participants: &[Participant],
) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("cannot create `{path}`"))?;
    write_settlements(file, settlements, participants)?;
    info!("Exported {} settlements to {path}", settlements.len());
    Ok(())
}
