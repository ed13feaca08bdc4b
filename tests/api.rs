mod common;

use rocket::http::{Header, Status};
use rocket::local::blocking::Client;
use serde_json::Value;
use tempfile::{tempdir, TempDir};

use kaizenlap_analytics::batch_jobs::{process_races, BatchOptions};
use kaizenlap_analytics::modules::redis::Redis;
use kaizenlap_analytics::server::{build_with_state, AppState};

use common::{approx, fixture_data_dir, test_config};

/// processed fixtures behind a local client, the directory must outlive the client
fn client() -> (TempDir, Client) {
    let dir = tempdir().unwrap();
    let config = test_config(&dir, fixture_data_dir());

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let report = runtime
        .block_on(process_races(&config, &BatchOptions::default()))
        .unwrap();
    assert!(report.is_success());
    drop(runtime);

    let state = AppState {
        database_url: config.database_url.clone(),
        cache: Redis::disabled(),
    };
    let client = Client::tracked(build_with_state(&config, state)).unwrap();
    (dir, client)
}

fn get_json(client: &Client, uri: &str) -> Value {
    let response = client.get(uri).dispatch();
    assert_eq!(response.status(), Status::Ok, "{}", uri);
    response.into_json::<Value>().unwrap()
}

#[test]
fn lists_tracks_and_races() {
    let (_dir, client) = client();

    let tracks = get_json(&client, "/api/tracks");
    let ids: Vec<&str> = tracks
        .as_array()
        .unwrap()
        .iter()
        .map(|track| track["track_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["barber", "cota"]);
    assert_eq!(tracks[0]["race_count"], 2);
    assert_eq!(tracks[1]["race_count"], 1);

    let barber = get_json(&client, "/api/tracks/barber");
    assert_eq!(barber["name"], "Barber Motorsports Park");
    assert_eq!(barber["race_count"], 2);

    let races = get_json(&client, "/api/tracks/barber/races");
    assert_eq!(races.as_array().unwrap().len(), 2);
    assert_eq!(races[0]["race_id"], "barber-race-1");
    assert_eq!(races[1]["is_partial"], true);

    let race = get_json(&client, "/api/races/barber-race-1");
    assert_eq!(race["driver_count"], 3);
}

#[test]
fn unknown_entities_are_empty() {
    let (_dir, client) = client();

    assert_eq!(get_json(&client, "/api/tracks/monza"), Value::Null);
    assert_eq!(get_json(&client, "/api/tracks/monza/races"), serde_json::json!([]));
    assert_eq!(get_json(&client, "/api/tracks/monza/best-case"), Value::Null);
    assert_eq!(get_json(&client, "/api/races/monza-race-1/weather-impact"), Value::Null);
    assert_eq!(get_json(&client, "/api/races/barber-race-1/drivers/99/laps"), Value::Null);
    assert_eq!(get_json(&client, "/api/recommendations?driver_id=99"), serde_json::json!([]));
}

#[test]
fn best_case_by_scope() {
    let (_dir, client) = client();

    let track = get_json(&client, "/api/tracks/barber/best-case");
    assert_eq!(track["scope"], "track");
    assert_eq!(track["race_id"], Value::Null);

    let race = get_json(&client, "/api/tracks/barber/best-case?race_id=barber-race-1");
    assert_eq!(race["scope"], "race");
    assert!(approx(race["theoretical_best_lap_s"].as_f64().unwrap(), 99.0));
    assert_eq!(race["sections"][0]["driver_id"], "2");
}

#[test]
fn drivers_and_lap_breakdown() {
    let (_dir, client) = client();

    let drivers = get_json(&client, "/api/races/barber-race-1/drivers");
    let ids: Vec<&str> = drivers
        .as_array()
        .unwrap()
        .iter()
        .map(|driver| driver["driver_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["2", "7", "13"]);

    let laps = get_json(&client, "/api/races/barber-race-1/drivers/13/laps");
    let laps = laps["laps"].as_array().unwrap();
    assert_eq!(laps.len(), 4);
    assert_eq!(laps[3]["lap_time_s"], Value::Null);
    assert_eq!(laps[3]["sections"].as_array().unwrap().len(), 2);
    assert_eq!(laps[0]["sections"][0]["section_name"], "Section 1");
    assert!(approx(laps[0]["sections"][0]["gap_s"].as_f64().unwrap(), 0.7));
}

#[test]
fn driver_documents() {
    let (_dir, client) = client();

    let pattern = get_json(&client, "/api/races/barber-race-1/drivers/2/pattern-analysis");
    assert_eq!(pattern["lap_count"], 4);
    assert_eq!(pattern["kind"], Value::Null);

    let insight = get_json(&client, "/api/races/barber-race-1/drivers/7/coaching-insights");
    assert!(insight.get("narrative").is_none());
    assert_eq!(insight["statistics"]["driver_id"], "7");

    let weather = get_json(&client, "/api/races/barber-race-1/weather-impact");
    assert_eq!(weather["is_partial"], false);
    assert_eq!(weather["summary"]["samples"], 8);
}

#[test]
fn recommendation_filters() {
    let (_dir, client) = client();

    let by_section = get_json(&client, "/api/recommendations?race_id=barber-race-1&section=Section%201");
    let by_section = by_section.as_array().unwrap();
    assert_eq!(by_section.len(), 3);
    assert!(by_section.iter().all(|doc| doc["kind"] == "section_recommendation"));

    let weather = get_json(&client, "/api/recommendations?race_id=barber-race-1&kind=weather");
    assert_eq!(weather.as_array().unwrap().len(), 1);
    assert_eq!(weather[0]["kind"], "weather_recommendation");

    let driver = get_json(&client, "/api/recommendations?race_id=barber-race-1&driver_id=7");
    let kinds: Vec<&str> = driver
        .as_array()
        .unwrap()
        .iter()
        .map(|doc| doc["kind"].as_str().unwrap())
        .collect();
    assert_eq!(
        kinds,
        vec![
            "section_recommendation",
            "section_recommendation",
            "section_recommendation",
            "pattern_recommendation",
            "coaching_insight"
        ]
    );

    let response = client.get("/api/recommendations?kind=laps").dispatch();
    assert_eq!(response.status(), Status::BadRequest);
}

#[test]
fn health_and_cors() {
    let (_dir, client) = client();

    let response = client
        .get("/health")
        .header(Header::new("Origin", "https://kaizenlap.example"))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.headers().get_one("Access-Control-Allow-Origin"), Some("*"));

    let health = response.into_json::<Value>().unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["database"], true);
    assert_eq!(health["cache"], false);
}
