use rocket::{routes, Build, Rocket};

use crate::config::Config;
use crate::modules::helpers::fairings::cors::CORS;
use crate::modules::redis::Redis;
use crate::routes::{api, health};

/// Shared by every request handler.
pub struct AppState {
    pub database_url: String,
    pub cache: Redis,
}

impl AppState {
    pub fn from_config(config: &Config) -> AppState {
        AppState {
            database_url: config.database_url.clone(),
            cache: Redis::from_config(config),
        }
    }
}

/// # build the api server
/// the document store must already be prepared.
pub fn build(config: &Config) -> Rocket<Build> {
    build_with_state(config, AppState::from_config(config))
}

pub fn build_with_state(config: &Config, state: AppState) -> Rocket<Build> {
    rocket::build()
        .manage(state)
        .attach(CORS::new(config.cors_origins.clone()))
        .mount(
            "/api",
            routes![
                // tracks
                api::track::get_all,
                api::track::get_one,
                api::track::get_races,
                api::track::get_best_case,
                // races
                api::race::get_one,
                api::race::get_drivers,
                api::race::get_driver_laps,
                api::race::get_weather_impact,
                api::race::get_pattern_analysis,
                api::race::get_coaching_insights,
                // recommendations
                api::recommendation::search,
            ],
        )
        .mount("/", routes![health::health])
}
