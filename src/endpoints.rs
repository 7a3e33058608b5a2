//! Core implementation of command handlers.
//!
//! This is split from `commands` so that the request-validate-persist logic
//! can be tested without going through the command grammar. Every handler
//! returns the text of the reply.

use std::sync::Arc;

use chrono::NaiveDate;
use log::{debug, info};
use tokio::sync::Mutex;

use crate::{
    database::Database,
    error::{ImportError, InputError},
    export::{export_expenses, export_settlements},
    formatter::{
        format_balances, format_import_report, format_list_expenses, format_settlements,
        format_simple_list,
    },
    import::{parse_spreadsheet, ImportReport},
    parser::{parse_expense, parse_participants, split_first_word},
    settlement::{compute_balances, compute_settlements},
    types::{NewExpense, ParsedExpense},
    validator::{
        resolve_expense, validate_amount, validate_expense, validate_expense_exists,
        validate_participant_exists, validate_participant_names, validate_participant_not_in_use,
        validate_participants_do_not_exist, validate_trip_unlocked,
    },
};

pub const DEFAULT_LIST_LIMIT: usize = 10;

pub async fn handle_list_participants<D: Database>(
    trip_id: i64,
    database: &Arc<Mutex<D>>,
) -> anyhow::Result<String> {
    let participants = database.lock().await.get_participants(trip_id)?;
    let names: Vec<_> = participants.iter().map(|p| &p.name).collect();
    Ok(format_simple_list(&names))
}

pub async fn handle_add_participants<D: Database>(
    trip_id: i64,
    database: &Arc<Mutex<D>>,
    payload: &str,
) -> anyhow::Result<String> {
    validate_trip_unlocked(trip_id, database).await?;

    let participants = parse_participants(payload)?;
    validate_participant_names(&participants)?;
    validate_participants_do_not_exist(&participants, trip_id, database).await?;

    debug!("Adding participants: {:?}", participants);
    let mut database = database.lock().await;
    for name in &participants {
        database.add_participant(trip_id, name)?;
    }

    Ok(format!("Added {}", participants.join(", ")))
}

pub async fn handle_remove_participant<D: Database>(
    trip_id: i64,
    database: &Arc<Mutex<D>>,
    payload: &str,
) -> anyhow::Result<String> {
    validate_trip_unlocked(trip_id, database).await?;

    let name = payload.trim();
    if name.is_empty() {
        return Err(InputError::MissingArgument("participant name").into());
    }

    let participant = validate_participant_exists(name, trip_id, database).await?;
    validate_participant_not_in_use(&participant, trip_id, database).await?;

    debug!("Removing participant: {:?}", participant);
    database
        .lock()
        .await
        .remove_participant(trip_id, &participant.id)?;
    Ok(format!("Removed {}", participant.name))
}

pub async fn handle_expense<D: Database>(
    trip_id: i64,
    database: &Arc<Mutex<D>>,
    payload: &str,
    today: NaiveDate,
) -> anyhow::Result<String> {
    validate_trip_unlocked(trip_id, database).await?;

    let expense = prepare_expense(trip_id, database, payload, today).await?;
    let expense_id = database.lock().await.save_expense(trip_id, &expense)?;

    info!("Saved expense {expense_id} in trip {trip_id}");
    Ok(format!("Saved expense {expense_id}"))
}

/// Replace an expense, keeping its ID. The payload is the expense ID
/// followed by the usual expense syntax.
pub async fn handle_edit<D: Database>(
    trip_id: i64,
    database: &Arc<Mutex<D>>,
    payload: &str,
    today: NaiveDate,
) -> anyhow::Result<String> {
    validate_trip_unlocked(trip_id, database).await?;

    let (expense_id, rest) = split_first_word(payload);
    let expense_id = parse_expense_id(expense_id)?;
    validate_expense_exists(expense_id, trip_id, database).await?;

    let expense = prepare_expense(trip_id, database, rest, today).await?;
    database
        .lock()
        .await
        .update_expense(trip_id, expense_id, &expense)?;

    info!("Updated expense {expense_id} in trip {trip_id}");
    Ok(format!("Updated expense {expense_id}"))
}

async fn prepare_expense<D: Database>(
    trip_id: i64,
    database: &Arc<Mutex<D>>,
    payload: &str,
    today: NaiveDate,
) -> anyhow::Result<NewExpense> {
    let (_, expense): (_, ParsedExpense) =
        parse_expense(payload).map_err(InputError::invalid_expense_syntax)?;
    validate_expense(&expense)?;

    let participants = database.lock().await.get_participants(trip_id)?;
    Ok(resolve_expense(expense, &participants, today)?)
}

pub async fn handle_delete<D: Database>(
    trip_id: i64,
    database: &Arc<Mutex<D>>,
    payload: &str,
) -> anyhow::Result<String> {
    validate_trip_unlocked(trip_id, database).await?;

    let expense_id = parse_expense_id(payload)?;
    validate_expense_exists(expense_id, trip_id, database).await?;

    database.lock().await.delete_expense(trip_id, expense_id)?;
    Ok(format!("Deleted expense {expense_id}"))
}

fn parse_expense_id(s: &str) -> Result<i64, InputError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(InputError::MissingArgument("expense ID"));
    }
    s.parse().map_err(|_| InputError::invalid_expense_id(s))
}

pub async fn handle_list<D: Database>(
    trip_id: i64,
    database: &Arc<Mutex<D>>,
    payload: &str,
) -> anyhow::Result<String> {
    let limit = match payload.trim() {
        "" => DEFAULT_LIST_LIMIT,
        s => match s.parse::<usize>() {
            Ok(limit) if limit > 0 => limit,
            _ => return Err(InputError::invalid_limit(s).into()),
        },
    };
    debug!("Producing the list of expenses with limit {}", limit);

    let database = database.lock().await;
    let expenses = database.get_latest_expenses(trip_id, limit)?;
    let participants = database.get_participants(trip_id)?;
    Ok(format_list_expenses(&expenses, &participants))
}

pub async fn handle_balances<D: Database>(
    trip_id: i64,
    database: &Arc<Mutex<D>>,
) -> anyhow::Result<String> {
    let database = database.lock().await;
    let expenses = database.get_expenses(trip_id)?;
    let participants = database.get_participants(trip_id)?;

    let balances = compute_balances(&expenses, &participants);
    Ok(format_balances(&balances, &participants))
}

/// The settlement plan is shown in the order it is computed.
pub async fn handle_settle<D: Database>(
    trip_id: i64,
    database: &Arc<Mutex<D>>,
) -> anyhow::Result<String> {
    let database = database.lock().await;
    let expenses = database.get_expenses(trip_id)?;
    let participants = database.get_participants(trip_id)?;

    let settlements = compute_settlements(&expenses, &participants);
    Ok(format_settlements(&settlements, &participants))
}

pub async fn handle_preview(payload: &str) -> anyhow::Result<String> {
    let report = load_spreadsheet(payload).await?;
    Ok(format_import_report(&report))
}

pub async fn handle_preview_json(payload: &str) -> anyhow::Result<String> {
    let report = load_spreadsheet(payload).await?;
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Create one expense per importable row, all paid by the same participant
/// and shared by everyone. Either every row is saved or none is.
pub async fn handle_import<D: Database>(
    trip_id: i64,
    database: &Arc<Mutex<D>>,
    payload: &str,
) -> anyhow::Result<String> {
    validate_trip_unlocked(trip_id, database).await?;

    let (path, payer) = match payload.trim().rsplit_once(char::is_whitespace) {
        Some((path, payer)) if !path.trim().is_empty() => (path.trim(), payer),
        _ => return Err(InputError::MissingArgument("file path and payer").into()),
    };
    let payer = validate_participant_exists(payer, trip_id, database).await?;
    let report = load_spreadsheet(path).await?;

    let participants = database.lock().await.get_participants(trip_id)?;
    let sharers: Vec<_> = participants.iter().map(|p| p.id.clone()).collect();

    let expenses: Vec<_> = report
        .rows
        .iter()
        .filter(|row| row.is_importable())
        .filter_map(|row| {
            row.amount.map(|amount| {
                NewExpense::new(
                    amount,
                    row.date,
                    row.description.trim(),
                    &payer.id,
                    sharers.clone(),
                )
                .with_place(row.merchant.clone())
            })
        })
        .collect();
    for expense in &expenses {
        validate_amount(expense.amount)?;
    }

    let saved = database.lock().await.save_expenses(trip_id, &expenses)?;
    let skipped = report.rows.len() - saved;

    info!("Imported {saved} expenses from {path} in trip {trip_id}");
    Ok(format!(
        "Imported {saved} expenses paid by {}, skipped {skipped} rows",
        payer.name
    ))
}

async fn load_spreadsheet(path: &str) -> anyhow::Result<ImportReport> {
    let path = path.trim();
    if path.is_empty() {
        return Err(InputError::MissingArgument("file path").into());
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ImportError::io(path, e))?;
    Ok(parse_spreadsheet(&bytes, path)?)
}

pub async fn handle_export_expenses<D: Database>(
    trip_id: i64,
    database: &Arc<Mutex<D>>,
    payload: &str,
) -> anyhow::Result<String> {
    let path = required_path(payload)?;

    let database = database.lock().await;
    let expenses = database.get_expenses(trip_id)?;
    let participants = database.get_participants(trip_id)?;

    export_expenses(path, &expenses, &participants)?;
    Ok(format!("Exported {} expenses to {path}", expenses.len()))
}

pub async fn handle_export_settlements<D: Database>(
    trip_id: i64,
    database: &Arc<Mutex<D>>,
    payload: &str,
) -> anyhow::Result<String> {
    let path = required_path(payload)?;

    let database = database.lock().await;
    let expenses = database.get_expenses(trip_id)?;
    let participants = database.get_participants(trip_id)?;
    let settlements = compute_settlements(&expenses, &participants);

    export_settlements(path, &settlements, &participants)?;
    Ok(format!("Exported {} settlements to {path}", settlements.len()))
}

fn required_path(payload: &str) -> Result<&str, InputError> {
    let path = payload.trim();
    if path.is_empty() {
        Err(InputError::MissingArgument("file path"))
    } else {
        Ok(path)
    }
}

pub async fn handle_lock<D: Database>(
    trip_id: i64,
    database: &Arc<Mutex<D>>,
    locked: bool,
) -> anyhow::Result<String> {
    database.lock().await.set_trip_locked(trip_id, locked)?;
    info!("Trip {trip_id} locked: {locked}");
    if locked {
        Ok("The trip is now locked".to_string())
    } else {
        Ok("The trip is now unlocked".to_string())
    }
}
