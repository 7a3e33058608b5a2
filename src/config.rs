//! Startup configuration, read from the environment and the command line.

use std::env;

use crate::error::InputError;
use crate::validator::validate_trip_slug;

const DB_PATH_VAR: &str = "TRIPSPLIT_DB";
const DEFAULT_DB_PATH: &str = "tripsplit.db";

pub const USAGE: &str = "usage: tripsplit <trip-slug> [trip name...]";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub db_path: String,
    pub trip_slug: String,
    /// Only used when the trip does not exist yet.
    pub trip_name: String,
}

impl Config {
    /// `args` are the command-line arguments without the program name.
    pub fn from_env<I: IntoIterator<Item = String>>(args: I) -> anyhow::Result<Config> {
        Config::new(env::var(DB_PATH_VAR).ok(), args)
    }

    fn new<I: IntoIterator<Item = String>>(
        db_path: Option<String>,
        args: I,
    ) -> anyhow::Result<Config> {
        let mut args = args.into_iter();

        let trip_slug = args.next().ok_or(InputError::MissingArgument(USAGE))?;
        validate_trip_slug(&trip_slug)?;

        let trip_name = args.collect::<Vec<_>>().join(" ");
        let trip_name = if trip_name.trim().is_empty() {
            trip_slug.clone()
        } else {
            trip_name
        };

        let db_path = db_path
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_string());

        Ok(Config {
            db_path,
            trip_slug,
            trip_name,
        })
    }
}
