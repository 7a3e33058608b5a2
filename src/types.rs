//! Internal representation of data.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Money in currency units (two decimal places are meaningful).
pub type Amount = f64;

pub type ParticipantId = String;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trip {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub locked: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
}

/// An expense as typed by the user: participants are still names.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedExpense {
    pub payer: String,
    pub amount: Amount,
    /// Empty means everyone.
    pub sharers: Vec<String>,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
    pub place: Option<String>,
}

/// An expense ready to be saved, with participants resolved to ids.
#[derive(Clone, Debug, PartialEq)]
pub struct NewExpense {
    pub amount: Amount,
    pub date: NaiveDate,
    pub place: Option<String>,
    pub description: String,
    pub paid_by: ParticipantId,
    pub participants: Vec<ParticipantId>,
}

/// An expense read back from the database.
#[derive(Clone, Debug, PartialEq)]
pub struct Expense {
    pub id: i64,
    pub amount: Amount,
    pub date: NaiveDate,
    pub place: Option<String>,
    pub description: String,
    pub paid_by: ParticipantId,
    /// The cost-sharing set. It does not have to contain the payer.
    pub participants: Vec<ParticipantId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A payment that the debtor (`from`) must make to the creditor (`to`).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Settlement {
    pub from: ParticipantId,
    pub to: ParticipantId,
    pub amount: Amount,
}

impl Participant {
    pub fn new(id: &str, name: &str) -> Participant {
        Participant {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

/// Look up the display name of a participant id.
pub fn name_of<'a>(participants: &'a [Participant], id: &str) -> Option<&'a str> {
    participants
        .iter()
        .find(|p| p.id == id)
        .map(|p| p.name.as_str())
}

impl NewExpense {
    pub fn new(
        amount: Amount,
        date: NaiveDate,
        description: &str,
        paid_by: &str,
        participants: Vec<ParticipantId>,
    ) -> NewExpense {
        NewExpense {
            amount,
            date,
            place: None,
            description: description.to_string(),
            paid_by: paid_by.to_string(),
            participants,
        }
    }

    pub fn with_place(mut self, place: Option<String>) -> NewExpense {
        self.place = place;
        self
    }
}

#[cfg(test)]
impl Expense {
    pub fn new(
        id: i64,
        amount: Amount,
        paid_by: &str,
        participants: &[&str],
        date: NaiveDate,
    ) -> Expense {
        Expense {
            id,
            amount,
            date,
            place: None,
            description: String::new(),
            paid_by: paid_by.to_string(),
            participants: participants.iter().map(|p| p.to_string()).collect(),
            created_at: DateTime::<Utc>::MIN_UTC,
            updated_at: DateTime::<Utc>::MIN_UTC,
        }
    }
}

impl Expense {
    pub fn per_head_share(&self) -> Amount {
        if self.participants.is_empty() {
            0.0
        } else {
            self.amount / self.participants.len() as f64
        }
    }
}

impl Settlement {
    pub fn new(from: &str, to: &str, amount: Amount) -> Settlement {
        Settlement {
            from: from.to_string(),
            to: to.to_string(),
            amount,
        }
    }
}
