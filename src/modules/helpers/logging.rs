use std::path::Path;

use fern::Dispatch;
use log::LevelFilter;

/// # set up the global logger
/// lines go to stdout and, when a file is given, to that file as well.
/// calling it twice returns an error instead of replacing the logger.
pub fn setup_logging(level: LevelFilter, log_file: Option<&Path>) -> Result<(), fern::InitError> {
    let mut base_config = Dispatch::new()
        .level(level)
        // rocket and hyper are very chatty on info
        .level_for("hyper", LevelFilter::Warn)
        .level_for("rocket::server", LevelFilter::Warn)
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .chain(std::io::stdout());

    if let Some(path) = log_file {
        base_config = base_config.chain(fern::log_file(path)?);
    }

    base_config.apply()?;

    Ok(())
}
