use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use dotenvy::dotenv;
use log::LevelFilter;

use crate::errors::{CustomResult, Error};
use crate::modules::analysis::thresholds::Thresholds;

pub const DEFAULT_DATABASE_URL: &str = "kaizenlap.sqlite";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_NARRATIVE_MODEL: &str = "gemma3:4b";
pub const DEFAULT_NARRATIVE_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
pub const DEFAULT_LOG_FILE: &str = "program.log";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub cache_ttl_secs: u64,
    pub data_dir: PathBuf,
    pub narrative_endpoint: Option<String>,
    pub narrative_model: String,
    pub narrative_timeout_secs: u64,
    pub cors_origins: Vec<String>,
    pub logging_level: LevelFilter,
    pub log_file: Option<PathBuf>,
    pub thresholds: Thresholds,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            redis_url: None,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            narrative_endpoint: None,
            narrative_model: DEFAULT_NARRATIVE_MODEL.to_string(),
            narrative_timeout_secs: DEFAULT_NARRATIVE_TIMEOUT_SECS,
            cors_origins: vec!["*".to_string()],
            logging_level: LevelFilter::Info,
            log_file: Some(PathBuf::from(DEFAULT_LOG_FILE)),
            thresholds: Thresholds::default(),
        }
    }
}

impl Config {
    /// # read the configuration from the environment
    /// a `.env` file in the working directory is loaded first.
    pub fn from_env() -> CustomResult<Config> {
        dotenv().ok();
        Config::from_lookup(|key| env::var(key).ok())
    }

    /// # build the configuration from a key lookup
    /// unset and empty values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> CustomResult<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|value| value.trim().to_string()).filter(|value| !value.is_empty());
        let defaults = Config::default();
        let default_thresholds = Thresholds::default();

        let log_file = match get("LOG_FILE") {
            Some(value) if value.eq_ignore_ascii_case("none") => None,
            Some(value) => Some(PathBuf::from(value)),
            None => defaults.log_file,
        };

        Ok(Config {
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            redis_url: get("REDIS_URL"),
            cache_ttl_secs: parse_positive_or("CACHE_TTL_SECS", get("CACHE_TTL_SECS"), defaults.cache_ttl_secs)?,
            data_dir: get("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            narrative_endpoint: get("NARRATIVE_ENDPOINT").map(|url| url.trim_end_matches('/').to_string()),
            narrative_model: get("NARRATIVE_MODEL").unwrap_or(defaults.narrative_model),
            narrative_timeout_secs: parse_or(
                "NARRATIVE_TIMEOUT_SECS",
                get("NARRATIVE_TIMEOUT_SECS"),
                defaults.narrative_timeout_secs,
            )?,
            cors_origins: get("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|origin| origin.trim().to_string())
                        .filter(|origin| !origin.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            logging_level: parse_level(get("LOGGING_LEVEL").as_deref()),
            log_file,
            thresholds: Thresholds {
                p_value_cutoff: parse_or("P_VALUE_CUTOFF", get("P_VALUE_CUTOFF"), default_thresholds.p_value_cutoff)?,
                ..default_thresholds
            },
        })
    }
}

/// unknown levels default to info
pub fn parse_level(level: Option<&str>) -> LevelFilter {
    match level.map(|level| level.to_ascii_uppercase()).as_deref() {
        Some("OFF") => LevelFilter::Off,
        Some("ERROR") => LevelFilter::Error,
        Some("WARN") => LevelFilter::Warn,
        Some("DEBUG") => LevelFilter::Debug,
        Some("TRACE") => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> CustomResult<T> {
    match value {
        None => Ok(default),
        Some(value) => value.parse::<T>().map_err(|_| Error::InvalidConfigError {
            key: key.to_string(),
            value,
        }),
    }
}

/// redis refuses an expiry of zero seconds, so zero is not a usable value
fn parse_positive_or(key: &str, value: Option<String>, default: u64) -> CustomResult<u64> {
    match parse_or(key, value, default)? {
        0 => Err(Error::InvalidConfigError {
            key: key.to_string(),
            value: "0".to_string(),
        }),
        parsed => Ok(parsed),
    }
}
