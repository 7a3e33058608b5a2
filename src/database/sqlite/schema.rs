const CREATE_TRIP_TABLE: &str = "CREATE TABLE IF NOT EXISTS trip (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  slug TEXT NOT NULL UNIQUE,
  name TEXT NOT NULL,
  locked BOOL NOT NULL DEFAULT 0,
  created_at DATETIME NOT NULL
)";

const CREATE_PARTICIPANT_TABLE: &str = "CREATE TABLE IF NOT EXISTS participant (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  trip_id INTEGER NOT NULL REFERENCES trip(id),
  name TEXT NOT NULL COLLATE NOCASE,
  UNIQUE(trip_id, name)
)";

const CREATE_EXPENSE_TABLE: &str = "CREATE TABLE IF NOT EXISTS expense (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  trip_id INTEGER NOT NULL REFERENCES trip(id),
  amount INTEGER NOT NULL,
  date DATE NOT NULL,
  place TEXT,
  description TEXT NOT NULL,
  paid_by INTEGER NOT NULL REFERENCES participant(id),
  created_at DATETIME NOT NULL,
  updated_at DATETIME NOT NULL
)";

const CREATE_EXPENSE_PARTICIPANT_TABLE: &str = "CREATE TABLE IF NOT EXISTS expense_participant (
  expense_id INTEGER NOT NULL REFERENCES expense(id),
  participant_id INTEGER NOT NULL REFERENCES participant(id),
  UNIQUE(expense_id, participant_id)
)";

pub fn create_all_tables(connection: &rusqlite::Connection) -> anyhow::Result<()> {
    connection.execute(CREATE_TRIP_TABLE, ())?;
    connection.execute(CREATE_PARTICIPANT_TABLE, ())?;
    connection.execute(CREATE_EXPENSE_TABLE, ())?;
    connection.execute(CREATE_EXPENSE_PARTICIPANT_TABLE, ())?;
    Ok(())
}
