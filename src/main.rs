use std::process::ExitCode;

use log::{error, info};

use kaizenlap_analytics::config::Config;
use kaizenlap_analytics::modules::helpers::logging::setup_logging;
use kaizenlap_analytics::modules::models::general::prepare_database;
use kaizenlap_analytics::server;

#[rocket::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Invalid configuration: {}", error);
            return ExitCode::FAILURE;
        }
    };

    if let Err(error) = setup_logging(config.logging_level, config.log_file.as_deref()) {
        eprintln!("Failed to setup logging: {}", error);
        return ExitCode::FAILURE;
    }

    if let Err(error) = prepare_database(&config.database_url) {
        error!(target: "main", "Could not prepare the document store: {}", error);
        return ExitCode::FAILURE;
    }

    info!(target: "main", "serving {} (cache enabled: {})", config.database_url, config.redis_url.is_some());

    // start the webserver
    match server::build(&config).launch().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            error!(target: "main", "Server stopped: {}", error);
            ExitCode::FAILURE
        }
    }
}
