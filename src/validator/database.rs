//! Functions that check the validity of user input by running query to the database.
//!
//! These checks are necessary in order to return nice error messages,
//! but the database should still re-run the checks and throw an error when the actual
//! query is run (in that case, a generic concurrency error is enough).

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::database::Database;
use crate::error::InputError;
use crate::types::Participant;

use super::expense::find_participant;

/// Check that the trip can still be modified.
pub async fn validate_trip_unlocked<D: Database>(
    trip_id: i64,
    database: &Arc<Mutex<D>>,
) -> anyhow::Result<()> {
    if database.lock().await.is_trip_locked(trip_id)? {
        Err(InputError::TripLocked.into())
    } else {
        Ok(())
    }
}

/// Check that none of the given names is already taken, ignoring case.
pub async fn validate_participants_do_not_exist<D: Database, T: AsRef<str>>(
    names: &[T],
    trip_id: i64,
    database: &Arc<Mutex<D>>,
) -> anyhow::Result<()> {
    if !names.is_empty() {
        let registered_participants = database.lock().await.get_participants(trip_id)?;

        for name in names {
            if find_participant(&registered_participants, name.as_ref()).is_ok() {
                return Err(InputError::duplicate_participant(name.as_ref()).into());
            }
        }
    }
    Ok(())
}

/// Check that a participant provided by the user exists in the database, and return it.
pub async fn validate_participant_exists<D: Database>(
    name: &str,
    trip_id: i64,
    database: &Arc<Mutex<D>>,
) -> anyhow::Result<Participant> {
    let registered_participants = database.lock().await.get_participants(trip_id)?;
    let participant = find_participant(&registered_participants, name)?;
    Ok(participant.clone())
}

/// Check that the participant is neither the payer nor a cost-sharer of any expense.
pub async fn validate_participant_not_in_use<D: Database>(
    participant: &Participant,
    trip_id: i64,
    database: &Arc<Mutex<D>>,
) -> anyhow::Result<()> {
    if database
        .lock()
        .await
        .is_participant_in_use(trip_id, &participant.id)?
    {
        Err(InputError::participant_in_use(&participant.name).into())
    } else {
        Ok(())
    }
}

/// Check that an expense with the given ID belongs to the trip.
pub async fn validate_expense_exists<D: Database>(
    expense_id: i64,
    trip_id: i64,
    database: &Arc<Mutex<D>>,
) -> anyhow::Result<()> {
    if database
        .lock()
        .await
        .get_expense(trip_id, expense_id)?
        .is_some()
    {
        Ok(())
    } else {
        Err(InputError::UnknownExpense(expense_id).into())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempdir::TempDir;

    use super::*;
    use crate::database::sqlite::SqliteDatabase;
    use crate::types::NewExpense;

    fn open(dir: &TempDir) -> anyhow::Result<(Arc<Mutex<SqliteDatabase>>, i64)> {
        let path = dir.path().join("test.db");
        let mut db = SqliteDatabase::new(path.to_str().expect("test"))?;
        let trip = db.create_trip("trip", "Trip")?;
        db.add_participant(trip.id, "alice")?;
        db.add_participant(trip.id, "bob")?;
        Ok((Arc::new(Mutex::new(db)), trip.id))
    }

    fn is_input_error(e: &anyhow::Error) -> bool {
        e.downcast_ref::<InputError>().is_some()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_trip_lock() -> anyhow::Result<()> {
        let dir = TempDir::new("tripsplit")?;
        let (database, trip_id) = open(&dir)?;

        assert!(validate_trip_unlocked(trip_id, &database).await.is_ok());
        database.lock().await.set_trip_locked(trip_id, true)?;
        let result = validate_trip_unlocked(trip_id, &database).await;
        assert!(matches!(
            result.map_err(|e| e.downcast::<InputError>()),
            Err(Ok(InputError::TripLocked))
        ));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_participants() -> anyhow::Result<()> {
        let dir = TempDir::new("tripsplit")?;
        let (database, trip_id) = open(&dir)?;

        assert!(validate_participants_do_not_exist(&["carol"], trip_id, &database)
            .await
            .is_ok());
        let result = validate_participants_do_not_exist(&["carol", "Bob"], trip_id, &database).await;
        assert!(is_input_error(&result.expect_err("test")));

        let alice = validate_participant_exists("ALICE", trip_id, &database).await?;
        assert_eq!(alice.name, "alice");
        let result = validate_participant_exists("dave", trip_id, &database).await;
        assert!(is_input_error(&result.expect_err("test")));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_usage_and_expense_existence() -> anyhow::Result<()> {
        let dir = TempDir::new("tripsplit")?;
        let (database, trip_id) = open(&dir)?;
        let participants = database.lock().await.get_participants(trip_id)?;
        let (alice, bob) = (&participants[0], &participants[1]);

        let day = NaiveDate::from_ymd_opt(2024, 3, 1).expect("test");
        let expense = NewExpense::new(5.0, day, "coffee", &alice.id, vec![alice.id.clone()]);
        let expense_id = database.lock().await.save_expense(trip_id, &expense)?;

        let result = validate_participant_not_in_use(alice, trip_id, &database).await;
        assert!(is_input_error(&result.expect_err("test")));
        assert!(validate_participant_not_in_use(bob, trip_id, &database)
            .await
            .is_ok());

        assert!(validate_expense_exists(expense_id, trip_id, &database)
            .await
            .is_ok());
        let result = validate_expense_exists(expense_id + 1, trip_id, &database).await;
        assert!(is_input_error(&result.expect_err("test")));
        Ok(())
    }
}
