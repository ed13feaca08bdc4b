use std::process::ExitCode;

use clap::Parser;
use log::error;

use kaizenlap_analytics::batch_jobs::delete_race;
use kaizenlap_analytics::config::Config;
use kaizenlap_analytics::modules::helpers::logging::setup_logging;

/// Delete every stored document of a race.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// race id, for example `barber-race-1`
    race_id: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

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

    match delete_race(&config, &args.race_id) {
        Ok(deleted) => {
            println!("Deleted {} documents of {}", deleted, args.race_id);
            ExitCode::SUCCESS
        }
        Err(error) => {
            error!(target: "bin/delete_race", "could not delete {}: {}", args.race_id, error);
            ExitCode::FAILURE
        }
    }
}
