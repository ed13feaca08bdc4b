use rocket::get;
use rocket::serde::json::Json;
use rocket::State;

use crate::models::Health;
use crate::modules::models::general::establish_connection;
use crate::server::AppState;

#[get("/health")]
pub fn health(state: &State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        database: establish_connection(&state.database_url).is_ok(),
        cache: state.cache.is_enabled(),
    })
}
