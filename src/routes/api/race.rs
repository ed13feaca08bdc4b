use log::error;
use rocket::get;
use rocket::http::uri::Origin;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;

use crate::macros::database_error_handeler::{db_connection_http, db_handle_get_error_http};
use crate::macros::request_caching::{cache_response, read_cache_request};
use crate::models::{
    CoachingInsightDoc, DriverLaps, DriverSummary, PatternRecommendationDoc, RaceDoc, WeatherRecommendationDoc,
};
use crate::modules::analysis::compare_driver_ids;
use crate::modules::models::coaching_insight::CoachingInsight;
use crate::modules::models::general::establish_connection;
use crate::modules::models::pattern_recommendation::PatternRecommendation;
use crate::modules::models::race::Race;
use crate::modules::models::section_recommendation::SectionRecommendation;
use crate::modules::models::weather_recommendation::WeatherRecommendation;
use crate::server::AppState;

/**************************************************************************************************/
/**************** ROUTES **************************************************************************/
/**************************************************************************************************/

#[get("/races/<race_id>")]
pub fn get_one(race_id: &str, state: &State<AppState>, origin: &Origin) -> Result<Json<Option<RaceDoc>>, Status> {
    read_cache_request!(state.cache, origin);

    let conn = &mut db_connection_http!(state, "routes/api/race:get_one");
    let race = db_handle_get_error_http!(Race::get_by_id(conn, race_id), "routes/api/race:get_one", "race");

    cache_response!(state.cache, origin, race);
}

/// # drivers of a race
/// numeric car numbers in numeric order
#[get("/races/<race_id>/drivers")]
pub fn get_drivers(race_id: &str, state: &State<AppState>, origin: &Origin) -> Result<Json<Vec<DriverSummary>>, Status> {
    read_cache_request!(state.cache, origin);

    let conn = &mut db_connection_http!(state, "routes/api/race:get_drivers");
    let patterns = db_handle_get_error_http!(
        PatternRecommendation::search(conn, Some(race_id), None),
        "routes/api/race:get_drivers",
        "drivers"
    );

    let mut drivers: Vec<DriverSummary> = patterns.iter().map(DriverSummary::from).collect();
    drivers.sort_by(|a, b| compare_driver_ids(&a.driver_id, &b.driver_id));

    cache_response!(state.cache, origin, drivers);
}

/// # lap and section breakdown of a driver
/// `null` when the race or the driver is unknown
#[get("/races/<race_id>/drivers/<driver_id>/laps")]
pub fn get_driver_laps(
    race_id: &str,
    driver_id: &str,
    state: &State<AppState>,
    origin: &Origin,
) -> Result<Json<Option<DriverLaps>>, Status> {
    read_cache_request!(state.cache, origin);

    let target = "routes/api/race:get_driver_laps";
    let conn = &mut db_connection_http!(state, target);

    let race = db_handle_get_error_http!(Race::get_by_id(conn, race_id), target, "race");
    let pattern = db_handle_get_error_http!(PatternRecommendation::from_driver(conn, race_id, driver_id), target, "pattern analysis");

    let breakdown = match (race, pattern) {
        (Some(race), Some(pattern)) => {
            let sections = db_handle_get_error_http!(
                SectionRecommendation::from_driver(conn, race_id, driver_id),
                target,
                "section recommendations"
            );
            Some(DriverLaps::build(&pattern, &sections, &race.sections))
        }
        _ => None,
    };

    cache_response!(state.cache, origin, breakdown);
}

#[get("/races/<race_id>/weather-impact")]
pub fn get_weather_impact(
    race_id: &str,
    state: &State<AppState>,
    origin: &Origin,
) -> Result<Json<Option<WeatherRecommendationDoc>>, Status> {
    read_cache_request!(state.cache, origin);

    let conn = &mut db_connection_http!(state, "routes/api/race:get_weather_impact");
    let weather = db_handle_get_error_http!(
        WeatherRecommendation::from_race(conn, race_id),
        "routes/api/race:get_weather_impact",
        "weather impact"
    );

    cache_response!(state.cache, origin, weather);
}

#[get("/races/<race_id>/drivers/<driver_id>/pattern-analysis")]
pub fn get_pattern_analysis(
    race_id: &str,
    driver_id: &str,
    state: &State<AppState>,
    origin: &Origin,
) -> Result<Json<Option<PatternRecommendationDoc>>, Status> {
    read_cache_request!(state.cache, origin);

    let conn = &mut db_connection_http!(state, "routes/api/race:get_pattern_analysis");
    let pattern = db_handle_get_error_http!(
        PatternRecommendation::from_driver(conn, race_id, driver_id),
        "routes/api/race:get_pattern_analysis",
        "pattern analysis"
    );

    cache_response!(state.cache, origin, pattern);
}

#[get("/races/<race_id>/drivers/<driver_id>/coaching-insights")]
pub fn get_coaching_insights(
    race_id: &str,
    driver_id: &str,
    state: &State<AppState>,
    origin: &Origin,
) -> Result<Json<Option<CoachingInsightDoc>>, Status> {
    read_cache_request!(state.cache, origin);

    let conn = &mut db_connection_http!(state, "routes/api/race:get_coaching_insights");
    let insight = db_handle_get_error_http!(
        CoachingInsight::from_driver(conn, race_id, driver_id),
        "routes/api/race:get_coaching_insights",
        "coaching insights"
    );

    cache_response!(state.cache, origin, insight);
}
