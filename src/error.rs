use thiserror::Error;

/// Errors caused by what the user typed. Their message is shown as is.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum InputError {
    #[error(
        "invalid syntax for an expense; example of valid syntax: alice 12.50 bob carol 2024-03-01 - dinner @ Luigi's"
    )]
    InvalidExpenseSyntax(String),

    #[error("invalid expense: {0}")]
    InvalidExpense(String),

    #[error(
        "invalid participant name `{0}`: participant names must be alphanumeric, can only \
             include ASCII characters and must start with a letter"
    )]
    InvalidParticipantName(String),

    #[error("`{0}` is not a registered participant")]
    UnregisteredParticipant(String),

    #[error("a participant named `{0}` already exists")]
    DuplicateParticipant(String),

    #[error("`{0}` cannot be removed: they are part of at least one expense")]
    ParticipantInUse(String),

    #[error(
        "there must be at least one participant. Format must be \
             'participant_name [participant_name...]'"
    )]
    ParticipantsNotProvided,

    #[error("invalid value `{0}` for limit: expected a positive integer")]
    InvalidLimit(String),

    #[error("invalid value `{0}` for expense ID: expected an integer")]
    InvalidExpenseId(String),

    #[error("there is no expense with ID {0}")]
    UnknownExpense(i64),

    #[error("invalid trip slug `{0}`: use lower-case letters, digits and `-` only")]
    InvalidTripSlug(String),

    #[error("the trip is locked: unlock it with /unlock before changing it")]
    TripLocked,

    #[error("unknown command `{0}`; send /help for the list of commands")]
    UnknownCommand(String),

    #[error("missing {0}")]
    MissingArgument(&'static str),
}

impl InputError {
    pub fn invalid_expense_syntax(e: nom::Err<nom::error::Error<&str>>) -> Self {
        InputError::InvalidExpenseSyntax(e.to_string())
    }

    pub fn invalid_expense<T: Into<String>>(reason: T) -> Self {
        InputError::InvalidExpense(reason.into())
    }

    pub fn invalid_participant_name(name: &str) -> Self {
        InputError::InvalidParticipantName(name.to_string())
    }

    pub fn unregistered_participant(name: &str) -> Self {
        InputError::UnregisteredParticipant(name.to_string())
    }

    pub fn duplicate_participant(name: &str) -> Self {
        InputError::DuplicateParticipant(name.to_string())
    }

    pub fn participant_in_use(name: &str) -> Self {
        InputError::ParticipantInUse(name.to_string())
    }

    pub fn participants_not_provided() -> Self {
        InputError::ParticipantsNotProvided
    }

    pub fn invalid_limit(limit: &str) -> Self {
        InputError::InvalidLimit(limit.to_string())
    }

    pub fn invalid_expense_id(id: &str) -> Self {
        InputError::InvalidExpenseId(id.to_string())
    }

    pub fn invalid_trip_slug(slug: &str) -> Self {
        InputError::InvalidTripSlug(slug.to_string())
    }

    pub fn unknown_command(command: &str) -> Self {
        InputError::UnknownCommand(command.to_string())
    }
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("{message}: {cause}")]
    Generic {
        message: String,
        cause: anyhow::Error,
    },

    #[error("the data was modified while processing the request: {0}")]
    Concurrency(String),
}

impl DatabaseError {
    pub fn new<T: AsRef<str>>(message: T, cause: anyhow::Error) -> Self {
        DatabaseError::Generic {
            message: message.as_ref().to_string(),
            cause,
        }
    }

    pub fn concurrency<T: AsRef<str>>(message: T) -> Self {
        DatabaseError::Concurrency(message.as_ref().to_string())
    }
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("unsupported file type for `{0}`: expected a .csv or .xlsx file")]
    UnsupportedFileType(String),

    #[error("cannot read `{path}`: {cause}")]
    Io {
        path: String,
        cause: std::io::Error,
    },
}

impl ImportError {
    pub fn unsupported_file_type(file_name: &str) -> Self {
        ImportError::UnsupportedFileType(file_name.to_string())
    }

    pub fn io(path: &str, cause: std::io::Error) -> Self {
        ImportError::Io {
            path: path.to_string(),
            cause,
        }
    }
}
