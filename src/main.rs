use std::{env, process, sync::Arc};

use log::{error, info, LevelFilter};
use tokio::{
    io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader},
    sync::Mutex,
};

mod commands;
mod config;
mod database;
mod endpoints;
mod error;
mod export;
mod formatter;
mod import;
mod parser;
mod settlement;
mod types;
mod validator;

use crate::commands::handle_line;
use crate::config::{Config, USAGE};
use crate::database::{sqlite::SqliteDatabase, Database};

#[tokio::main]
async fn main() {
    init_log();

    let config = match Config::from_env(env::args().skip(1)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            process::exit(2);
        }
    };

    if let Err(e) = run(config).await {
        error!("{:#}", e);
        process::exit(1);
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    info!("Initializing database {}...", config.db_path);
    let mut database = SqliteDatabase::new(&config.db_path)?;

    let trip = match database.get_trip(&config.trip_slug)? {
        Some(trip) => trip,
        None => {
            info!("Creating trip {}", config.trip_slug);
            database.create_trip(&config.trip_slug, &config.trip_name)?
        }
    };
    info!("Working on trip {} ({})", trip.slug, trip.name);

    let database = Arc::new(Mutex::new(database));

    let mut lines = BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();
    while let Some(line) = lines.next_line().await? {
        if let Some(reply) = handle_line(&line, trip.id, &database).await {
            stdout.write_all(reply.trim_end().as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
    }

    info!("End of input, bye");
    Ok(())
}

/// Log to stderr at `info` unless `RUST_LOG` says otherwise.
fn init_log() {
    let mut builder = pretty_env_logger::formatted_timed_builder();
    builder.filter_level(LevelFilter::Info);
    if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}
