//! Persistence of trips, participants and expenses.

use crate::{
    error::DatabaseError,
    types::{Expense, NewExpense, Participant, Trip},
};

type DatabaseResult<T> = Result<T, DatabaseError>;

pub mod sqlite;

/// This trait abstracts over the type of database.
///
/// Everything except trips is scoped by the id of the trip it belongs to.
pub trait Database {
    /// Get the trip with the given *slug*, if it exists.
    fn get_trip(&self, slug: &str) -> Result<Option<Trip>, DatabaseError>;

    /// Create a new, unlocked trip.
    fn create_trip(&mut self, slug: &str, name: &str) -> Result<Trip, DatabaseError>;

    fn set_trip_locked(&mut self, trip_id: i64, locked: bool) -> Result<(), DatabaseError>;

    /// Check the lock flag of the trip. An unknown trip is an error.
    fn is_trip_locked(&self, trip_id: i64) -> Result<bool, DatabaseError>;

    /// Add a participant to the given trip.
    ///
    /// Names are unique per trip, ignoring case: adding a duplicate is an error.
    fn add_participant(&mut self, trip_id: i64, name: &str)
        -> Result<Participant, DatabaseError>;

    /// Get the list of all participants in the given trip, in the order they were added.
    fn get_participants(&self, trip_id: i64) -> Result<Vec<Participant>, DatabaseError>;

    /// Remove a participant. Callers must make sure the participant is not in use.
    fn remove_participant(
        &mut self,
        trip_id: i64,
        participant_id: &str,
    ) -> Result<(), DatabaseError>;

    /// Check whether the participant paid for or shares the cost of any expense.
    fn is_participant_in_use(
        &self,
        trip_id: i64,
        participant_id: &str,
    ) -> Result<bool, DatabaseError>;

    /// Save an expense and return its ID.
    fn save_expense(&mut self, trip_id: i64, expense: &NewExpense) -> Result<i64, DatabaseError>;

    /// Save all the given expenses, or none of them.
    fn save_expenses(
        &mut self,
        trip_id: i64,
        expenses: &[NewExpense],
    ) -> Result<usize, DatabaseError>;

    /// Replace every field of an expense, except its creation time.
    fn update_expense(
        &mut self,
        trip_id: i64,
        expense_id: i64,
        expense: &NewExpense,
    ) -> Result<(), DatabaseError>;

    fn delete_expense(&mut self, trip_id: i64, expense_id: i64) -> Result<(), DatabaseError>;

    fn get_expense(&self, trip_id: i64, expense_id: i64)
        -> Result<Option<Expense>, DatabaseError>;

    /// Get all expenses of the trip, in the order they were created.
    fn get_expenses(&self, trip_id: i64) -> Result<Vec<Expense>, DatabaseError>;

    /// Get the *limit* most recent expenses, newest first.
    fn get_latest_expenses(
        &self,
        trip_id: i64,
        limit: usize,
    ) -> Result<Vec<Expense>, DatabaseError>;
}
