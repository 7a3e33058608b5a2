//! The implementation of a data storage using Sqlite.

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Params, Transaction};
use tokio::task::block_in_place;

use crate::{
    error::DatabaseError,
    types::{Amount, Expense, NewExpense, Participant, Trip},
};

use super::{Database, DatabaseResult};

mod schema;

const SELECT_EXPENSES: &str = "SELECT e.id, e.amount, e.date, e.place, e.description, e.paid_by,
       e.created_at, e.updated_at, ep.participant_id
FROM expense e
LEFT JOIN expense_participant ep ON e.id = ep.expense_id";

pub struct SqliteDatabase {
    connection: Connection,
}

impl SqliteDatabase {
    pub fn new(path: &str) -> DatabaseResult<SqliteDatabase> {
        block_in_place(|| {
            let connection = Connection::open(path)
                .map_err(|e| DatabaseError::new("cannot open database", e.into()))?;
            schema::create_all_tables(&connection)
                .map_err(|e| DatabaseError::new("cannot create tables", e))?;
            Ok(SqliteDatabase { connection })
        })
    }

    fn query_expenses<P: Params>(&self, filter: &str, params: P) -> anyhow::Result<Vec<Expense>> {
        let mut stmt = self
            .connection
            .prepare_cached(&format!("{SELECT_EXPENSES}\n{filter}"))?;

        let expense_iter = stmt.query_map(params, |row| {
            Ok(ExpenseQuery {
                id: row.get(0)?,
                amount: row.get(1)?,
                date: row.get(2)?,
                place: row.get(3)?,
                description: row.get(4)?,
                paid_by: row.get(5)?,
                created_at: row.get(6)?,
                updated_at: row.get(7)?,
                participant_id: row.get(8)?,
            })
        })?;

        let expenses: Result<Vec<_>, _> = expense_iter.collect();
        Ok(parse_expenses_query(expenses?))
    }
}

impl Database for SqliteDatabase {
    fn get_trip(&self, slug: &str) -> DatabaseResult<Option<Trip>> {
        let fn_impl = || -> anyhow::Result<Option<Trip>> {
            let trip = self
                .connection
                .query_row(
                    "SELECT id, slug, name, locked, created_at FROM trip WHERE slug = ?1",
                    params![&slug],
                    |row| {
                        Ok(Trip {
                            id: row.get(0)?,
                            slug: row.get(1)?,
                            name: row.get(2)?,
                            locked: row.get(3)?,
                            created_at: row.get(4)?,
                        })
                    },
                )
                .optional()?;
            Ok(trip)
        };

        block_in_place(|| fn_impl().map_err(|e| map_error("cannot get trip", e)))
    }

    fn create_trip(&mut self, slug: &str, name: &str) -> DatabaseResult<Trip> {
        debug!("Creating trip. Slug: {slug}");
        let fn_impl = || -> anyhow::Result<Trip> {
            let created_at = Utc::now();
            let id = self.connection.query_row(
                "INSERT INTO trip (slug, name, locked, created_at) VALUES (?1, ?2, 0, ?3) RETURNING id",
                params![&slug, &name, &created_at],
                |row| row.get(0),
            )?;

            Ok(Trip {
                id,
                slug: slug.to_string(),
                name: name.to_string(),
                locked: false,
                created_at,
            })
        };

        block_in_place(|| fn_impl().map_err(|e| map_error("cannot create trip", e)))
    }

    fn set_trip_locked(&mut self, trip_id: i64, locked: bool) -> DatabaseResult<()> {
        debug!("Setting lock. Trip ID: {trip_id}. Locked: {locked}");
        let fn_impl = || -> anyhow::Result<()> {
            let num_updated_rows = self.connection.execute(
                "UPDATE trip SET locked = ?1 WHERE id = ?2",
                params![&locked, &trip_id],
            )?;
            if num_updated_rows == 0 {
                return Err(DatabaseError::concurrency("the trip was not found").into());
            }

            Ok(())
        };

        block_in_place(|| fn_impl().map_err(|e| map_error("cannot lock or unlock trip", e)))
    }

    fn is_trip_locked(&self, trip_id: i64) -> DatabaseResult<bool> {
        let fn_impl = || -> anyhow::Result<bool> {
            let locked: Option<bool> = self
                .connection
                .query_row(
                    "SELECT locked FROM trip WHERE id = ?1",
                    params![&trip_id],
                    |row| row.get(0),
                )
                .optional()?;

            match locked {
                Some(locked) => Ok(locked),
                None => Err(DatabaseError::concurrency("the trip was not found").into()),
            }
        };

        block_in_place(|| fn_impl().map_err(|e| map_error("cannot check trip lock", e)))
    }

    fn add_participant(&mut self, trip_id: i64, name: &str) -> DatabaseResult<Participant> {
        let fn_impl = || -> anyhow::Result<Participant> {
            self.connection.execute(
                "INSERT INTO participant (trip_id, name) VALUES (?1, ?2)",
                params![&trip_id, &name],
            )?;
            let id = self.connection.last_insert_rowid();

            Ok(Participant::new(&id.to_string(), name))
        };

        block_in_place(|| fn_impl().map_err(|e| map_error("cannot add participant", e)))
    }

    fn get_participants(&self, trip_id: i64) -> DatabaseResult<Vec<Participant>> {
        let fn_impl = || -> anyhow::Result<Vec<Participant>> {
            let mut stmt = self.connection.prepare_cached(
                "SELECT id, name FROM participant
                 WHERE trip_id = :trip_id
                 ORDER BY id",
            )?;

            let participant_iter = stmt.query_map(&[(":trip_id", &trip_id)], |row| {
                let id: i64 = row.get(0)?;
                Ok(Participant {
                    id: id.to_string(),
                    name: row.get(1)?,
                })
            })?;

            let participants = participant_iter.collect::<Result<_, _>>()?;
            Ok(participants)
        };

        block_in_place(|| fn_impl().map_err(|e| map_error("cannot get participants", e)))
    }

    fn remove_participant(&mut self, trip_id: i64, participant_id: &str) -> DatabaseResult<()> {
        debug!("Removing participant. Trip ID: {trip_id}. Participant ID: {participant_id}");
        let fn_impl = || -> anyhow::Result<()> {
            let participant_id = parse_participant_id(participant_id)?;
            let num_deleted_rows = self.connection.execute(
                "DELETE FROM participant WHERE trip_id = ?1 AND id = ?2",
                params![&trip_id, &participant_id],
            )?;
            if num_deleted_rows == 0 {
                return Err(DatabaseError::concurrency("the participant was not found").into());
            }

            Ok(())
        };

        block_in_place(|| fn_impl().map_err(|e| map_error("cannot remove participant", e)))
    }

    fn is_participant_in_use(&self, trip_id: i64, participant_id: &str) -> DatabaseResult<bool> {
        let fn_impl = || -> anyhow::Result<bool> {
            let participant_id = parse_participant_id(participant_id)?;
            let in_use = self.connection.query_row(
                "SELECT EXISTS (
                   SELECT 1 FROM expense WHERE trip_id = ?1 AND paid_by = ?2
                 ) OR EXISTS (
                   SELECT 1 FROM expense_participant ep
                   INNER JOIN expense e ON e.id = ep.expense_id
                   WHERE e.trip_id = ?1 AND ep.participant_id = ?2
                 )",
                params![&trip_id, &participant_id],
                |row| row.get(0),
            )?;
            Ok(in_use)
        };

        block_in_place(|| fn_impl().map_err(|e| map_error("cannot check participant usage", e)))
    }

    fn save_expense(&mut self, trip_id: i64, expense: &NewExpense) -> DatabaseResult<i64> {
        let mut fn_impl = || -> anyhow::Result<i64> {
            let tx = self.connection.transaction()?;
            let expense_id = insert_expense(&tx, trip_id, expense, Utc::now())?;
            tx.commit()?;

            debug!("expense_id is {expense_id}");
            Ok(expense_id)
        };

        block_in_place(|| fn_impl().map_err(|e| map_error("cannot save expense", e)))
    }

    fn save_expenses(&mut self, trip_id: i64, expenses: &[NewExpense]) -> DatabaseResult<usize> {
        let mut fn_impl = || -> anyhow::Result<usize> {
            let tx = self.connection.transaction()?;
            let now = Utc::now();
            for expense in expenses {
                insert_expense(&tx, trip_id, expense, now)?;
            }
            tx.commit()?;

            Ok(expenses.len())
        };

        block_in_place(|| fn_impl().map_err(|e| map_error("cannot save expenses", e)))
    }

    fn update_expense(
        &mut self,
        trip_id: i64,
        expense_id: i64,
        expense: &NewExpense,
    ) -> DatabaseResult<()> {
        debug!("Updating expense. Trip ID: {trip_id}. Expense ID: {expense_id}");
        let mut fn_impl = || -> anyhow::Result<()> {
            let tx = self.connection.transaction()?;

            let paid_by = parse_participant_id(&expense.paid_by)?;
            let amount = to_cents(expense.amount)?;
            let num_updated_rows = tx.execute(
                "UPDATE expense
                 SET amount = ?1, date = ?2, place = ?3, description = ?4, paid_by = ?5, updated_at = ?6
                 WHERE trip_id = ?7 AND id = ?8
                 AND EXISTS (SELECT 1 FROM participant WHERE trip_id = ?7 AND id = ?5)",
                params![
                    &amount,
                    &expense.date,
                    &expense.place,
                    &expense.description,
                    &paid_by,
                    &Utc::now(),
                    &trip_id,
                    &expense_id,
                ],
            )?;
            if num_updated_rows == 0 {
                return Err(
                    DatabaseError::concurrency("the expense or its payer was not found").into(),
                );
            }

            tx.execute(
                "DELETE FROM expense_participant WHERE expense_id = ?1",
                params![&expense_id],
            )?;
            insert_expense_participants(&tx, trip_id, expense_id, &expense.participants)?;

            tx.commit()?;

            Ok(())
        };

        block_in_place(|| fn_impl().map_err(|e| map_error("cannot update expense", e)))
    }

    fn delete_expense(&mut self, trip_id: i64, expense_id: i64) -> DatabaseResult<()> {
        debug!("Deleting expense. Trip ID: {trip_id}. Expense ID: {expense_id}");
        let mut fn_impl = || -> anyhow::Result<()> {
            let tx = self.connection.transaction()?;

            tx.execute(
                "DELETE FROM expense_participant WHERE expense_id =
                   (SELECT id FROM expense WHERE trip_id = ?1 AND id = ?2)",
                params![&trip_id, &expense_id],
            )?;
            let num_deleted_rows = tx.execute(
                "DELETE FROM expense WHERE trip_id = ?1 AND id = ?2",
                params![&trip_id, &expense_id],
            )?;
            if num_deleted_rows == 0 {
                return Err(DatabaseError::concurrency("the expense was not found").into());
            }

            tx.commit()?;

            Ok(())
        };

        block_in_place(|| fn_impl().map_err(|e| map_error("cannot delete expense", e)))
    }

    fn get_expense(&self, trip_id: i64, expense_id: i64) -> DatabaseResult<Option<Expense>> {
        let fn_impl = || -> anyhow::Result<Option<Expense>> {
            let expenses = self.query_expenses(
                "WHERE e.trip_id = ?1 AND e.id = ?2 ORDER BY ep.rowid",
                params![&trip_id, &expense_id],
            )?;
            Ok(expenses.into_iter().next())
        };

        block_in_place(|| fn_impl().map_err(|e| map_error("cannot get expense", e)))
    }

    fn get_expenses(&self, trip_id: i64) -> DatabaseResult<Vec<Expense>> {
        let fn_impl = || {
            self.query_expenses(
                "WHERE e.trip_id = ?1 ORDER BY e.id, ep.rowid",
                params![&trip_id],
            )
        };

        block_in_place(|| fn_impl().map_err(|e| map_error("cannot get expenses", e)))
    }

    fn get_latest_expenses(&self, trip_id: i64, limit: usize) -> DatabaseResult<Vec<Expense>> {
        let fn_impl = || {
            let limit = i64::try_from(limit).unwrap_or(i64::MAX);
            self.query_expenses(
                "WHERE e.id IN (SELECT id FROM expense WHERE trip_id = ?1 ORDER BY id DESC LIMIT ?2)
                 ORDER BY e.id DESC, ep.rowid",
                params![&trip_id, &limit],
            )
        };

        block_in_place(|| fn_impl().map_err(|e| map_error("cannot get latest expenses", e)))
    }
}

/// The payer must belong to the trip, otherwise nothing is inserted.
fn insert_expense(
    tx: &Transaction,
    trip_id: i64,
    expense: &NewExpense,
    now: DateTime<Utc>,
) -> anyhow::Result<i64> {
    let paid_by = parse_participant_id(&expense.paid_by)?;
    let amount = to_cents(expense.amount)?;

    let expense_id: Option<i64> = {
        let mut insert_expense_stmt = tx.prepare_cached(
            "INSERT INTO expense (trip_id, amount, date, place, description, paid_by, created_at, updated_at)
             SELECT ?1, ?2, ?3, ?4, ?5, id, ?6, ?6 FROM participant
             WHERE trip_id = ?1 AND id = ?7
             RETURNING id",
        )?;

        insert_expense_stmt
            .query_row(
                params![
                    &trip_id,
                    &amount,
                    &expense.date,
                    &expense.place,
                    &expense.description,
                    &now,
                    &paid_by,
                ],
                |row| row.get(0),
            )
            .optional()?
    };

    let expense_id = match expense_id {
        Some(id) => id,
        None => return Err(DatabaseError::concurrency("the payer was not found").into()),
    };

    insert_expense_participants(tx, trip_id, expense_id, &expense.participants)?;
    Ok(expense_id)
}

fn insert_expense_participants(
    tx: &Transaction,
    trip_id: i64,
    expense_id: i64,
    participants: &[String],
) -> anyhow::Result<()> {
    let mut insert_participant_stmt = tx.prepare_cached(
        "INSERT INTO expense_participant (expense_id, participant_id)
         SELECT ?1, id FROM participant
         WHERE trip_id = ?2 AND id = ?3",
    )?;

    // It's unclear how to use an IN clause, so we use a loop
    // https://github.com/rusqlite/rusqlite/issues/345
    for participant in participants {
        let participant_id = parse_participant_id(participant)?;
        let num_inserted_rows =
            insert_participant_stmt.execute(params![&expense_id, &trip_id, &participant_id])?;
        if num_inserted_rows == 0 {
            return Err(DatabaseError::concurrency("the participant was not found").into());
        }
    }

    Ok(())
}

/// Participant ids are row ids; anything else cannot match a row.
fn parse_participant_id(id: &str) -> anyhow::Result<i64> {
    id.parse()
        .map_err(|_| DatabaseError::concurrency(format!("unknown participant id `{id}`")).into())
}

/// Amounts that do not fit the integer column are refused instead of being
/// saturated.
fn to_cents(amount: Amount) -> anyhow::Result<i64> {
    let cents = (amount * 100.0).round();
    if !cents.is_finite() || cents.abs() >= i64::MAX as f64 {
        return Err(anyhow!("the amount {amount} cannot be stored"));
    }
    Ok(cents as i64)
}

fn from_cents(cents: i64) -> Amount {
    cents as f64 / 100.0
}

/// Rows come one per (expense, cost-sharer) pair, already sorted.
fn parse_expenses_query(rows: Vec<ExpenseQuery>) -> Vec<Expense> {
    let mut result: IndexMap<i64, Expense> = IndexMap::new();
    for row in rows {
        let entry = result.entry(row.id).or_insert_with(|| Expense {
            id: row.id,
            amount: from_cents(row.amount),
            date: row.date,
            place: row.place,
            description: row.description,
            paid_by: row.paid_by.to_string(),
            participants: vec![],
            created_at: row.created_at,
            updated_at: row.updated_at,
        });

        if let Some(participant_id) = row.participant_id {
            entry.participants.push(participant_id.to_string());
        }
    }

    result.into_values().collect()
}

struct ExpenseQuery {
    id: i64,
    amount: i64,
    date: NaiveDate,
    place: Option<String>,
    description: String,
    paid_by: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    participant_id: Option<i64>,
}

fn map_error<T: AsRef<str>>(message: T, e: anyhow::Error) -> DatabaseError {
    match e.downcast::<DatabaseError>() {
        Ok(e) => e,
        Err(e) => DatabaseError::new(message, e),
    }
}
