use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::result::Error;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::info;
use serde::de::DeserializeOwned;
use serde::Serialize;
use snafu::ResultExt;

use crate::errors::{self, ConnectionSnafu, CustomResult, DatabaseSnafu};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// # open the document store
/// batch jobs for different races write concurrently, so writers wait on a
/// locked database instead of failing straight away.
///
/// ## Arguments
/// * `database_url` - path of the sqlite file
pub fn establish_connection(database_url: &str) -> CustomResult<SqliteConnection> {
    let mut conn = SqliteConnection::establish(database_url).context(ConnectionSnafu {
        url: database_url.to_string(),
    })?;

    conn.batch_execute("PRAGMA busy_timeout = 10000; PRAGMA journal_mode = WAL;")
        .context(DatabaseSnafu)?;

    Ok(conn)
}

/// # create or upgrade the document store
pub fn prepare_database(database_url: &str) -> CustomResult<()> {
    let conn = &mut establish_connection(database_url)?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|error| errors::Error::MigrationError {
            message: error.to_string(),
        })?;

    for migration in applied {
        info!(target: "models/general:prepare_database", "applied migration {}", migration);
    }

    Ok(())
}

pub fn now() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

pub fn to_body<T: Serialize>(document: &T) -> QueryResult<String> {
    serde_json::to_string(document).map_err(|error| Error::SerializationError(Box::new(error)))
}

pub fn from_body<T: DeserializeOwned>(body: &str) -> QueryResult<T> {
    serde_json::from_str(body).map_err(|error| Error::DeserializationError(Box::new(error)))
}
