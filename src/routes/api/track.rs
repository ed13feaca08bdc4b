use log::error;
use rocket::get;
use rocket::http::uri::Origin;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;

use crate::macros::database_error_handeler::{db_connection_http, db_handle_get_error_http};
use crate::macros::request_caching::{cache_response, read_cache_request};
use crate::models::{CompositeDoc, RaceDoc, TrackDoc};
use crate::modules::models::composite::Composite;
use crate::modules::models::general::establish_connection;
use crate::modules::models::race::Race;
use crate::modules::models::track::Track;
use crate::server::AppState;

/**************************************************************************************************/
/**************** ROUTES **************************************************************************/
/**************************************************************************************************/

#[get("/tracks")]
pub fn get_all(state: &State<AppState>, origin: &Origin) -> Result<Json<Vec<TrackDoc>>, Status> {
    read_cache_request!(state.cache, origin);

    let conn = &mut db_connection_http!(state, "routes/api/track:get_all");
    let tracks = db_handle_get_error_http!(Track::get_all(conn), "routes/api/track:get_all", "tracks");

    cache_response!(state.cache, origin, tracks);
}

#[get("/tracks/<track_id>")]
pub fn get_one(track_id: &str, state: &State<AppState>, origin: &Origin) -> Result<Json<Option<TrackDoc>>, Status> {
    read_cache_request!(state.cache, origin);

    let conn = &mut db_connection_http!(state, "routes/api/track:get_one");
    let track = db_handle_get_error_http!(Track::get_by_id(conn, track_id), "routes/api/track:get_one", "track");

    cache_response!(state.cache, origin, track);
}

/// # races of a track, by race number
#[get("/tracks/<track_id>/races")]
pub fn get_races(track_id: &str, state: &State<AppState>, origin: &Origin) -> Result<Json<Vec<RaceDoc>>, Status> {
    read_cache_request!(state.cache, origin);

    let conn = &mut db_connection_http!(state, "routes/api/track:get_races");
    let races = db_handle_get_error_http!(Race::from_track(conn, track_id), "routes/api/track:get_races", "races");

    cache_response!(state.cache, origin, races);
}

/// # best case composite
/// race level when `race_id` is given, track level otherwise.
#[get("/tracks/<track_id>/best-case?<race_id>")]
pub fn get_best_case(
    track_id: &str,
    race_id: Option<&str>,
    state: &State<AppState>,
    origin: &Origin,
) -> Result<Json<Option<CompositeDoc>>, Status> {
    read_cache_request!(state.cache, origin);

    let conn = &mut db_connection_http!(state, "routes/api/track:get_best_case");
    let composite = db_handle_get_error_http!(
        Composite::get(conn, track_id, race_id),
        "routes/api/track:get_best_case",
        "best case composite"
    );

    cache_response!(state.cache, origin, composite);
}
