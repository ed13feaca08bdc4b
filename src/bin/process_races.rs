use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use kaizenlap_analytics::batch_jobs::{process_races, BatchOptions};
use kaizenlap_analytics::config::Config;
use kaizenlap_analytics::modules::helpers::logging::setup_logging;

/// Analyze the race telemetry below the data directory and store the results.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// directory holding one folder per track
    #[arg(long, env = "DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// only process this track (folder name, id or alias)
    #[arg(long)]
    track: Option<String>,

    /// only process this race (race id or race number)
    #[arg(long)]
    race: Option<String>,

    /// do not call the narrative service
    #[arg(long)]
    skip_narrative: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Invalid configuration: {}", error);
            return ExitCode::FAILURE;
        }
    };
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }

    if let Err(error) = setup_logging(config.logging_level, config.log_file.as_deref()) {
        eprintln!("Failed to setup logging: {}", error);
        return ExitCode::FAILURE;
    }

    let options = BatchOptions {
        track: args.track,
        race: args.race,
        skip_narrative: args.skip_narrative,
    };

    match process_races(&config, &options).await {
        Ok(report) if report.is_success() => {
            info!(target: "bin/process_races", "processed {} races", report.succeeded.len());
            ExitCode::SUCCESS
        }
        Ok(report) => {
            for failed in &report.failed {
                error!(target: "bin/process_races", "{}: {}", failed.race_id, failed.reason);
            }
            ExitCode::FAILURE
        }
        Err(error) => {
            error!(target: "bin/process_races", "batch aborted: {}", error);
            ExitCode::FAILURE
        }
    }
}
