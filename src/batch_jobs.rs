use std::collections::BTreeSet;

use diesel::sqlite::SqliteConnection;
use diesel::QueryResult;
use log::{error, info, warn};
use snafu::ResultExt;
use tokio::task::JoinSet;

use crate::config::Config;
use crate::errors::{CustomResult, DatabaseSnafu, TaskJoinSnafu};
use crate::models::{CoachingInsightDoc, CompositeDoc};
use crate::modules::analysis::composite::build_track_composite;
use crate::modules::analysis::thresholds::Thresholds;
use crate::modules::analysis::{analyze_race, RaceAnalysis};
use crate::modules::helpers::track::{normalize_track_id, track_document};
use crate::modules::models::coaching_insight::CoachingInsight;
use crate::modules::models::composite::Composite;
use crate::modules::models::general::{establish_connection, prepare_database};
use crate::modules::models::pattern_recommendation::PatternRecommendation;
use crate::modules::models::race::Race;
use crate::modules::models::section_recommendation::SectionRecommendation;
use crate::modules::models::track::Track;
use crate::modules::models::weather_recommendation::WeatherRecommendation;
use crate::modules::narrative::NarrativeClient;
use crate::modules::redis::{race_cache_patterns, Redis};
use crate::modules::telemetry_loader::{discover_races, load_race, RaceSource};

/// Which races a batch run covers.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// track folder name, id or alias
    pub track: Option<String>,
    /// race id (`barber-race-1`) or race number within the track
    pub race: Option<String>,
    pub skip_narrative: bool,
}

impl BatchOptions {
    pub fn matches(&self, source: &RaceSource) -> bool {
        let track_matches = self
            .track
            .as_deref()
            .map_or(true, |track| normalize_track_id(track) == source.track_id);
        let race_matches = self.race.as_deref().map_or(true, |race| {
            race == source.race_id || race.parse::<u32>().map_or(false, |number| number == source.race_number)
        });

        track_matches && race_matches
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FailedRace {
    pub race_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<FailedRace>,
    pub refreshed_tracks: Vec<String>,
    pub invalidated_cache_keys: usize,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/**************************************************************************************************/
/**************** JOBS ****************************************************************************/
/**************************************************************************************************/

/// # process every selected race below the data directory
/// races run concurrently and each one is written in a single transaction,
/// so a failing race never touches the documents of another. afterwards the
/// track documents and track composites of every processed track are rebuilt
/// and the cached responses for them are dropped.
pub async fn process_races(config: &Config, options: &BatchOptions) -> CustomResult<BatchReport> {
    prepare_database(&config.database_url)?;

    let all_sources = discover_races(&config.data_dir)?;
    let selected: Vec<RaceSource> = all_sources
        .iter()
        .filter(|source| options.matches(source))
        .cloned()
        .collect();

    info!(
        target: "batch_jobs:process_races",
        "processing {} of {} races in {}",
        selected.len(), all_sources.len(), config.data_dir.display()
    );

    let narrative = if options.skip_narrative {
        NarrativeClient::Disabled
    } else {
        NarrativeClient::from_config(config)
    };

    let mut jobs = JoinSet::new();
    for source in selected {
        let database_url = config.database_url.clone();
        let thresholds = config.thresholds.clone();
        let narrative = narrative.clone();

        jobs.spawn(async move {
            let race_id = source.race_id.clone();
            let track_id = source.track_id.clone();
            let result = process_race(database_url, source, thresholds, narrative).await;
            (race_id, track_id, result)
        });
    }

    let mut report = BatchReport::default();
    let mut tracks = BTreeSet::new();

    while let Some(joined) = jobs.join_next().await {
        let (race_id, track_id, result) = joined.context(TaskJoinSnafu)?;
        match result {
            Ok(()) => {
                info!(target: "batch_jobs:process_races", "processed {}", race_id);
                tracks.insert(track_id);
                report.succeeded.push(race_id);
            }
            Err(error) => {
                error!(target: "batch_jobs:process_races", "failed to process {}: {}", race_id, error);
                report.failed.push(FailedRace {
                    race_id,
                    reason: error.to_string(),
                });
            }
        }
    }
    report.succeeded.sort();
    report.failed.sort_by(|a, b| a.race_id.cmp(&b.race_id));

    let conn = &mut establish_connection(&config.database_url)?;
    for track_id in &tracks {
        refresh_track(conn, track_id, &all_sources)?;
        report.refreshed_tracks.push(track_id.clone());
    }

    let cache = Redis::from_config(config);
    let mut patterns = BTreeSet::new();
    for source in all_sources.iter().filter(|source| report.succeeded.contains(&source.race_id)) {
        patterns.extend(race_cache_patterns(&source.track_id, &source.race_id));
    }
    let patterns: Vec<String> = patterns.into_iter().collect();
    report.invalidated_cache_keys = cache.invalidate(&patterns);

    info!(
        target: "batch_jobs:process_races",
        "done: {} succeeded, {} failed, {} tracks refreshed",
        report.succeeded.len(), report.failed.len(), report.refreshed_tracks.len()
    );

    Ok(report)
}

/// load, analyze and store a single race
async fn process_race(
    database_url: String,
    source: RaceSource,
    thresholds: Thresholds,
    narrative: NarrativeClient,
) -> CustomResult<()> {
    let analysis = tokio::task::spawn_blocking(move || -> CustomResult<RaceAnalysis> {
        let telemetry = load_race(&source)?;
        Ok(analyze_race(&telemetry, &thresholds))
    })
    .await
    .context(TaskJoinSnafu)??;

    let insights = coaching_insights(&narrative, &analysis).await;

    tokio::task::spawn_blocking(move || -> CustomResult<()> {
        let conn = &mut establish_connection(&database_url)?;
        save_race(conn, &analysis, &insights).context(DatabaseSnafu)
    })
    .await
    .context(TaskJoinSnafu)?
}

/// statistics of every driver plus the narrative when the service answers
pub async fn coaching_insights(narrative: &NarrativeClient, analysis: &RaceAnalysis) -> Vec<CoachingInsightDoc> {
    let mut insights = Vec::with_capacity(analysis.coaching_payloads.len());

    for payload in &analysis.coaching_payloads {
        insights.push(CoachingInsightDoc {
            track_id: payload.track_id.clone(),
            race_id: payload.race_id.clone(),
            driver_id: payload.driver_id.clone(),
            narrative: narrative.synthesize(payload).await,
            statistics: payload.clone(),
        });
    }

    insights
}

/************ STORE ************/

/// # replace every document of a race
/// readers see either the previous set or the new one.
pub fn save_race(
    conn: &mut SqliteConnection,
    analysis: &RaceAnalysis,
    insights: &[CoachingInsightDoc],
) -> QueryResult<()> {
    let race_id = analysis.race.race_id.as_str();

    conn.immediate_transaction(|conn| {
        Race::replace(conn, &analysis.race)?;
        Composite::delete_for_race(conn, race_id)?;
        Composite::replace(conn, &analysis.composite)?;
        SectionRecommendation::replace_for_race(conn, race_id, &analysis.section_recommendations)?;
        WeatherRecommendation::replace_for_race(conn, &analysis.weather)?;
        PatternRecommendation::replace_for_race(conn, race_id, &analysis.patterns)?;
        CoachingInsight::replace_for_race(conn, race_id, insights)?;
        Ok(())
    })
}

/// # rebuild the track document and track composite
/// the race count of the track document is the number of stored races. every race of the track found on disk contributes, races that fail to
/// load are left out with a warning.
pub fn refresh_track(conn: &mut SqliteConnection, track_id: &str, sources: &[RaceSource]) -> CustomResult<CompositeDoc> {
    let mut loaded = Vec::new();
    for source in sources.iter().filter(|source| source.track_id == track_id) {
        match load_race(source) {
            Ok(telemetry) => loaded.push(telemetry),
            Err(error) => {
                warn!(target: "batch_jobs:refresh_track", "{} left out of the {} composite: {}", source.race_id, track_id, error)
            }
        }
    }

    let composite = build_track_composite(
        track_id,
        loaded
            .iter()
            .map(|telemetry| (telemetry.sections.as_slice(), telemetry.section_times.as_slice())),
    );
    let race_count = conn
        .immediate_transaction(|conn| -> QueryResult<usize> {
            let race_count = Race::from_track(conn, track_id)?.len();
            Track::replace(conn, &track_document(track_id, race_count))?;
            Composite::replace(conn, &composite)?;
            Ok(race_count)
        })
        .context(DatabaseSnafu)?;

    info!(
        target: "batch_jobs:refresh_track",
        "{}: {} stored races, composite from {} races, theoretical best {:.3}s",
        track_id, race_count, loaded.len(), composite.theoretical_best_lap_s
    );

    Ok(composite)
}

/// # delete every document of a race
/// the track composite keeps the race's times until the track is processed
/// again. returns the number of deleted documents.
pub fn delete_race(config: &Config, race_id: &str) -> CustomResult<usize> {
    let conn = &mut establish_connection(&config.database_url)?;
    let race = Race::get_by_id(conn, race_id).context(DatabaseSnafu)?;

    let deleted = conn
        .immediate_transaction(|conn| -> QueryResult<usize> {
            Ok(Race::delete_id(conn, race_id)?
                + Composite::delete_for_race(conn, race_id)?
                + SectionRecommendation::delete_for_race(conn, race_id)?
                + WeatherRecommendation::delete_for_race(conn, race_id)?
                + PatternRecommendation::delete_for_race(conn, race_id)?
                + CoachingInsight::delete_for_race(conn, race_id)?)
        })
        .context(DatabaseSnafu)?;

    let track_id = race.map(|race| race.track_id).unwrap_or_default();
    let patterns = if track_id.is_empty() {
        vec![format!("/api/races/{}*", race_id), "/api/recommendations*".to_string()]
    } else {
        race_cache_patterns(&track_id, race_id)
    };
    Redis::from_config(config).invalidate(&patterns);

    info!(target: "batch_jobs:delete_race", "deleted {} documents of {}", deleted, race_id);
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn source(track_id: &str, race_number: u32) -> RaceSource {
        RaceSource {
            track_id: track_id.to_string(),
            track_folder: track_id.to_string(),
            race_number,
            race_id: format!("{}-race-{}", track_id, race_number),
            race_dir: PathBuf::from("data"),
            sections_path: None,
            weather_path: None,
        }
    }

    #[test]
    fn options_select_by_track_and_race() {
        let everything = BatchOptions::default();
        assert!(everything.matches(&source("barber", 1)));

        let barber = BatchOptions {
            track: Some("Barber".to_string()),
            ..Default::default()
        };
        assert!(barber.matches(&source("barber", 2)));
        assert!(!barber.matches(&source("cota", 1)));

        let by_number = BatchOptions {
            track: Some("indy".to_string()),
            race: Some("2".to_string()),
            ..Default::default()
        };
        assert!(by_number.matches(&source("indianapolis", 2)));
        assert!(!by_number.matches(&source("indianapolis", 1)));

        let by_id = BatchOptions {
            race: Some("cota-race-1".to_string()),
            ..Default::default()
        };
        assert!(by_id.matches(&source("cota", 1)));
        assert!(!by_id.matches(&source("barber", 1)));
    }

    #[test]
    fn report_fails_with_failed_races() {
        let mut report = BatchReport::default();
        assert!(report.is_success());
        report.failed.push(FailedRace {
            race_id: "barber-race-3".to_string(),
            reason: "No sections file found for race barber-race-3".to_string(),
        });
        assert!(!report.is_success());
    }
}
