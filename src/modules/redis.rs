use log::{debug, error, warn};
use redis::{Client, Commands, Connection, RedisResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::Config;

/// Response cache keyed by request uri. Every operation is a no-op when no
/// redis url is configured, and redis errors never fail a request.
pub struct Redis {
    client: Option<Client>,
    ttl_secs: u64,
}

impl Redis {
    pub fn disabled() -> Redis {
        Redis {
            client: None,
            ttl_secs: 0,
        }
    }

    /// caching stays disabled for a ttl of zero, redis rejects such an expiry
    pub fn new(redis_url: Option<&str>, ttl_secs: u64) -> Redis {
        if redis_url.is_some() && ttl_secs == 0 {
            warn!(target: "redis:new", "Cache ttl of 0 seconds, caching disabled");
            return Redis::disabled();
        }

        let client = redis_url.and_then(|url| match Client::open(url) {
            Ok(client) => Some(client),
            Err(error) => {
                error!(target: "redis:new", "Invalid redis url, caching disabled: {}", error);
                None
            }
        });

        Redis { client, ttl_secs }
    }

    pub fn from_config(config: &Config) -> Redis {
        Redis::new(config.redis_url.as_deref(), config.cache_ttl_secs)
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    fn connect(&self) -> Option<Connection> {
        let client = self.client.as_ref()?;
        match client.get_connection() {
            Ok(conn) => Some(conn),
            Err(error) => {
                warn!(target: "redis:connect", "Error connecting to redis: {}", error);
                None
            }
        }
    }

    pub fn get_data<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.connect()?;
        let data: Option<String> = match conn.get(key) {
            Ok(data) => data,
            Err(error) => {
                warn!(target: "redis:get_data", "Error reading {}: {}", key, error);
                return None;
            }
        };

        match serde_json::from_str(&data?) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(target: "redis:get_data", "Dropping unreadable cache entry {}: {}", key, error);
                let _: RedisResult<()> = conn.del(key);
                None
            }
        }
    }

    pub fn set_data<T: Serialize>(&self, key: &str, data: &T) {
        let Some(mut conn) = self.connect() else {
            return;
        };

        let body = match serde_json::to_string(data) {
            Ok(body) => body,
            Err(error) => {
                error!(target: "redis:set_data", "Error serializing {}: {}", key, error);
                return;
            }
        };

        let stored: RedisResult<()> = conn.set_ex(key, body, self.ttl_secs as usize);
        if let Err(error) = stored {
            warn!(target: "redis:set_data", "Error caching {}: {}", key, error);
        }
    }

    /// # remove every key matching one of the glob patterns
    /// returns the number of removed keys
    pub fn invalidate(&self, patterns: &[String]) -> usize {
        let Some(mut conn) = self.connect() else {
            return 0;
        };

        let mut removed = 0;
        for pattern in patterns {
            let keys: Vec<String> = match conn.keys(pattern) {
                Ok(keys) => keys,
                Err(error) => {
                    warn!(target: "redis:invalidate", "Error listing {}: {}", pattern, error);
                    continue;
                }
            };
            if keys.is_empty() {
                continue;
            }

            match conn.del::<_, usize>(&keys) {
                Ok(count) => removed += count,
                Err(error) => warn!(target: "redis:invalidate", "Error deleting keys for {}: {}", pattern, error),
            }
        }

        debug!(target: "redis:invalidate", "removed {} cached responses", removed);
        removed
    }
}

/// cache key patterns touched by rewriting a race of a track
pub fn race_cache_patterns(track_id: &str, race_id: &str) -> Vec<String> {
    vec![
        "/api/tracks".to_string(),
        format!("/api/tracks/{}*", track_id),
        format!("/api/races/{}*", race_id),
        "/api/recommendations*".to_string(),
    ]
}
