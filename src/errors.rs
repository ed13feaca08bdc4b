use std::path::PathBuf;

use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Could not read {}: {}", path.display(), source))]
    ReadFileError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("{} is missing required column {}", path, column))]
    MissingColumnError { path: String, column: String },

    #[snafu(display("No usable rows in {}", path))]
    EmptyInputError { path: String },

    #[snafu(display("No sections file found for race {}", race_id))]
    MissingSectionsFileError { race_id: String },

    #[snafu(display("Invalid value `{}` for {}", value, key))]
    InvalidConfigError { key: String, value: String },

    #[snafu(display("Could not connect to database {}: {}", url, source))]
    ConnectionError {
        url: String,
        source: diesel::ConnectionError,
    },

    #[snafu(display("Database error: {}", source))]
    DatabaseError { source: diesel::result::Error },

    #[snafu(display("Could not run migrations: {}", message))]
    MigrationError { message: String },

    #[snafu(display("Narrative request failed: {}", source))]
    NarrativeTransportError { source: reqwest::Error },

    #[snafu(display("Narrative request timed out after {}s", seconds))]
    NarrativeTimeoutError { seconds: u64 },

    #[snafu(display("Narrative service answered with status {}", status))]
    NarrativeStatusError { status: u16 },

    #[snafu(display("Malformed narrative: {}", reason))]
    MalformedNarrativeError { reason: String },

    #[snafu(display("Batch task panicked or was cancelled: {}", source))]
    TaskJoinError { source: tokio::task::JoinError },
}

pub type CustomResult<T> = Result<T, Error>;
