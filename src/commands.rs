//! Definition of the slash commands and their dispatch to the handlers.

use std::sync::Arc;

use chrono::Utc;
use log::{debug, error};
use nom::{
    bytes::complete::take_while1,
    character::complete::{char, multispace0},
    combinator::rest,
    sequence::{preceded, tuple},
    IResult,
};
use tokio::sync::Mutex;

use crate::database::Database;
use crate::endpoints::{
    handle_add_participants, handle_balances, handle_delete, handle_edit, handle_export_expenses,
    handle_export_settlements, handle_expense, handle_import, handle_list,
    handle_list_participants, handle_lock, handle_preview, handle_preview_json,
    handle_remove_participant, handle_settle,
};
use crate::error::{ImportError, InputError};

const HELP: &str = "This program keeps track of the shared expenses of a trip. Supported commands:
/help: shows this message.
/participants: list all participants.
/add p1 p2: add participants; names are letters and digits, starting with a letter.
/remove p1: remove a participant that is not part of any expense.
/expense payer 12.50 [p1 p2] [2024-03-01] [- description [@ place]]: add an expense; without participants it is split among everyone.
/e: shortcut for the /expense command.
/edit <id> <expense>: replace the expense with the given ID, same format as /expense.
/delete <id>: delete the expense with the given ID; to find the ID, use /list.
/list [n]: show the last n expenses (10 by default).
/balances: show how much each participant is owed (+) or owes (-).
/settle: show the payments that settle all debts.
/preview <file>: show how a .csv or .xlsx file would be imported.
/preview_json <file>: same as /preview, as JSON.
/import <file> <payer>: add one expense per valid row, paid by payer and split among everyone.
/export_expenses <file>: write all expenses to a CSV file.
/export_settlements <file>: write the settlement payments to a CSV file.
/lock: forbid any change to the trip.
/unlock: allow changes again.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Participants,
    Add(String),
    Remove(String),
    Expense(String),
    Edit(String),
    Delete(String),
    List(String),
    Balances,
    Settle,
    Preview(String),
    PreviewJson(String),
    Import(String),
    ExportExpenses(String),
    ExportSettlements(String),
    Lock,
    Unlock,
}

impl Command {
    /// Parse a line such as `/expense alice 10`. Command names ignore case;
    /// the argument is everything after the name, trimmed.
    pub fn parse(line: &str) -> Result<Command, InputError> {
        let (name, payload) = match parse_command_line(line) {
            Ok((_, result)) => result,
            Err(_) => return Err(InputError::unknown_command(line.trim())),
        };
        let payload = payload.trim().to_string();

        let command = match name.to_lowercase().as_str() {
            "help" | "start" => Command::Help,
            "participants" => Command::Participants,
            "add" => Command::Add(payload),
            "remove" => Command::Remove(payload),
            "expense" | "e" => Command::Expense(payload),
            "edit" => Command::Edit(payload),
            "delete" => Command::Delete(payload),
            "list" => Command::List(payload),
            "balances" | "balance" => Command::Balances,
            "settle" => Command::Settle,
            "preview" => Command::Preview(payload),
            "preview_json" => Command::PreviewJson(payload),
            "import" => Command::Import(payload),
            "export_expenses" => Command::ExportExpenses(payload),
            "export_settlements" => Command::ExportSettlements(payload),
            "lock" => Command::Lock,
            "unlock" => Command::Unlock,
            _ => return Err(InputError::unknown_command(name)),
        };
        Ok(command)
    }

    pub fn descriptions() -> &'static str {
        HELP
    }
}

fn parse_command_line(s: &str) -> IResult<&str, (&str, &str)> {
    tuple((
        preceded(
            tuple((multispace0, char('/'))),
            take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        ),
        rest,
    ))(s)
}

pub async fn execute<D: Database>(
    command: Command,
    trip_id: i64,
    database: &Arc<Mutex<D>>,
) -> anyhow::Result<String> {
    debug!("Executing {:?}", command);
    let today = Utc::now().date_naive();

    match command {
        Command::Help => Ok(Command::descriptions().to_string()),
        Command::Participants => handle_list_participants(trip_id, database).await,
        Command::Add(s) => handle_add_participants(trip_id, database, &s).await,
        Command::Remove(s) => handle_remove_participant(trip_id, database, &s).await,
        Command::Expense(s) => handle_expense(trip_id, database, &s, today).await,
        Command::Edit(s) => handle_edit(trip_id, database, &s, today).await,
        Command::Delete(s) => handle_delete(trip_id, database, &s).await,
        Command::List(s) => handle_list(trip_id, database, &s).await,
        Command::Balances => handle_balances(trip_id, database).await,
        Command::Settle => handle_settle(trip_id, database).await,
        Command::Preview(s) => handle_preview(&s).await,
        Command::PreviewJson(s) => handle_preview_json(&s).await,
        Command::Import(s) => handle_import(trip_id, database, &s).await,
        Command::ExportExpenses(s) => handle_export_expenses(trip_id, database, &s).await,
        Command::ExportSettlements(s) => handle_export_settlements(trip_id, database, &s).await,
        Command::Lock => handle_lock(trip_id, database, true).await,
        Command::Unlock => handle_lock(trip_id, database, false).await,
    }
}

/// Turn one input line into the reply to print, if any.
///
/// Mistakes in the input are explained to the user, anything else is logged
/// and reported with a generic message.
pub async fn handle_line<D: Database>(
    line: &str,
    trip_id: i64,
    database: &Arc<Mutex<D>>,
) -> Option<String> {
    if line.trim().is_empty() {
        return None;
    }

    let result = match Command::parse(line) {
        Ok(command) => execute(command, trip_id, database).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(reply) => Some(reply),
        Err(e) if e.is::<InputError>() || e.is::<ImportError>() => Some(e.to_string()),
        Err(e) => {
            error!("Cannot execute `{}`: {:#}", line.trim(), e);
            Some(format!("Something went wrong: {e}"))
        }
    }
}
