use std::cmp::Ordering;
use std::collections::BTreeSet;

use log::info;

use crate::models::{
    CoachingPayload, CompositeDoc, PatternRecommendationDoc, PatternSummary, RaceDoc,
    SectionGapSummary, SectionRecommendationDoc, WeatherRecommendationDoc, WeatherSummary,
};
use crate::modules::telemetry_loader::RaceTelemetry;

use self::thresholds::Thresholds;

pub mod composite;
pub mod pattern;
pub mod section_gap;
pub mod thresholds;
pub mod weather;

/// Every document derived from one race.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceAnalysis {
    pub race: RaceDoc,
    pub composite: CompositeDoc,
    pub section_recommendations: Vec<SectionRecommendationDoc>,
    pub weather: WeatherRecommendationDoc,
    pub patterns: Vec<PatternRecommendationDoc>,
    pub coaching_payloads: Vec<CoachingPayload>,
}

/// numeric ids in numeric order, everything else after them by text
pub fn compare_driver_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a_number), Ok(b_number)) => a_number.cmp(&b_number).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// # analyze one race
/// pure function of the race's telemetry, running it twice gives equal
/// output.
pub fn analyze_race(telemetry: &RaceTelemetry, thresholds: &Thresholds) -> RaceAnalysis {
    let composite = composite::build_composite(
        &telemetry.track_id,
        Some(telemetry.race_id.as_str()),
        &telemetry.sections,
        &telemetry.section_times,
    );
    let section_recommendations = section_gap::analyze_section_gaps(&composite, &telemetry.section_times, thresholds);
    let weather = weather::analyze_weather(telemetry, thresholds);
    let patterns = pattern::analyze_patterns(
        &composite,
        &telemetry.laps,
        &telemetry.section_times,
        &section_recommendations,
        thresholds,
    );
    let coaching_payloads = patterns
        .iter()
        .map(|pattern| coaching_payload(&composite, &section_recommendations, pattern, &weather.summary))
        .collect();

    let race = race_document(telemetry, &composite, &weather);

    info!(
        target: "analysis:analyze_race",
        "{}: {} drivers, {} section recommendations, partial: {}",
        race.race_id, race.driver_count, section_recommendations.len(), race.is_partial
    );

    RaceAnalysis {
        race,
        composite,
        section_recommendations,
        weather,
        patterns,
        coaching_payloads,
    }
}

pub fn race_document(telemetry: &RaceTelemetry, composite: &CompositeDoc, weather: &WeatherRecommendationDoc) -> RaceDoc {
    let drivers: BTreeSet<&str> = telemetry.laps.iter().map(|lap| lap.driver_id.as_str()).collect();

    RaceDoc {
        race_id: telemetry.race_id.clone(),
        track_id: telemetry.track_id.clone(),
        race_number: telemetry.race_number,
        driver_count: drivers.len(),
        lap_count: telemetry.laps.len(),
        sections: telemetry.sections.clone(),
        missing_sections: composite.missing_sections.clone(),
        has_weather: !telemetry.weather.is_empty(),
        bad_rows: telemetry.bad_rows,
        warnings: telemetry.warnings.clone(),
        is_partial: composite.is_partial || weather.is_partial,
    }
}

/// # statistics handed to the narrative service for one driver
pub fn coaching_payload(
    composite: &CompositeDoc,
    section_recommendations: &[SectionRecommendationDoc],
    pattern: &PatternRecommendationDoc,
    weather: &WeatherSummary,
) -> CoachingPayload {
    CoachingPayload {
        track_id: pattern.track_id.clone(),
        race_id: pattern.race_id.clone(),
        driver_id: pattern.driver_id.clone(),
        theoretical_best_lap_s: composite.theoretical_best_lap_s,
        section_gaps: section_recommendations
            .iter()
            .filter(|doc| doc.driver_id == pattern.driver_id)
            .map(|doc| SectionGapSummary {
                section_name: doc.section_name.clone(),
                composite_time_s: doc.composite_time_s,
                mean_gap_s: doc.mean_gap_s,
                std_gap_s: doc.std_gap_s,
                field_percentile: doc.field_percentile,
            })
            .collect(),
        pattern: PatternSummary {
            lap_count: pattern.lap_count,
            best_lap_s: pattern.best_lap_s,
            mean_lap_s: pattern.mean_lap_s,
            consistency_score: pattern.consistency_score,
            consistency: pattern.consistency,
            trend: pattern.trend.as_ref().map(|trend| trend.direction),
        },
        weather: weather.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::telemetry_loader::{LapRecord, SectionTimeRecord};

    fn telemetry() -> RaceTelemetry {
        let mut section_times = Vec::new();
        let mut laps = Vec::new();
        let drivers = [("2", [[34.2, 40.1], [35.0, 40.0]]), ("7", [[34.5, 40.5], [34.8, 40.3]])];

        for (driver, driver_laps) in drivers {
            for (index, sections) in driver_laps.iter().enumerate() {
                let lap = index as u32 + 1;
                for (section_index, time) in sections.iter().enumerate() {
                    section_times.push(SectionTimeRecord {
                        track_id: "barber".to_string(),
                        race_id: "barber-race-2".to_string(),
                        driver_id: driver.to_string(),
                        lap,
                        section_name: format!("Section {}", section_index + 1),
                        elapsed_time_s: *time,
                    });
                }
                laps.push(LapRecord {
                    driver_id: driver.to_string(),
                    lap,
                    lap_time_s: Some(sections.iter().sum()),
                    race_elapsed_s: None,
                });
            }
        }

        RaceTelemetry {
            track_id: "barber".to_string(),
            race_id: "barber-race-2".to_string(),
            race_number: 2,
            sections: vec!["Section 1".to_string(), "Section 2".to_string(), "Section 3".to_string()],
            section_times,
            laps,
            weather: vec![],
            has_weather_file: false,
            bad_rows: 0,
            warnings: vec![],
        }
    }

    #[test]
    fn orders_driver_ids_numerically() {
        let mut ids = vec!["13", "2", "car", "7", "10"];
        ids.sort_by(|a, b| compare_driver_ids(a, b));
        assert_eq!(ids, vec!["2", "7", "10", "13", "car"]);
    }

    #[test]
    fn missing_section_race_is_partial() {
        let analysis = analyze_race(&telemetry(), &Thresholds::default());

        assert!(analysis.race.is_partial);
        assert_eq!(analysis.race.missing_sections, vec!["Section 3"]);
        assert_eq!(analysis.race.driver_count, 2);
        assert!(analysis
            .section_recommendations
            .iter()
            .all(|doc| doc.section_name != "Section 3"));
        assert_eq!(analysis.section_recommendations.len(), 4);
        assert_eq!(analysis.patterns.len(), 2);
        assert_eq!(analysis.coaching_payloads.len(), 2);
        assert_eq!(analysis.coaching_payloads[0].section_gaps.len(), 2);
    }

    #[test]
    fn analysis_is_repeatable() {
        let first = analyze_race(&telemetry(), &Thresholds::default());
        let second = analyze_race(&telemetry(), &Thresholds::default());

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first.composite).unwrap(),
            serde_json::to_string(&second.composite).unwrap()
        );
    }
}
