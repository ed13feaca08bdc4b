use std::cmp::Ordering;
use std::collections::BTreeMap;

use log::warn;

use crate::models::{CompositeDoc, CompositeScope, CompositeSection};
use crate::modules::helpers::general::Helpers;
use crate::modules::telemetry_loader::{is_valid_time, SectionTimeRecord};

use super::compare_driver_ids;

/// faster time first, then race, driver and lap
fn compare_candidates(a: &SectionTimeRecord, b: &SectionTimeRecord) -> Ordering {
    a.elapsed_time_s
        .total_cmp(&b.elapsed_time_s)
        .then_with(|| a.race_id.cmp(&b.race_id))
        .then_with(|| compare_driver_ids(&a.driver_id, &b.driver_id))
        .then_with(|| a.lap.cmp(&b.lap))
}

/// # build a best case composite
/// takes the fastest valid time of every section. declared sections without
/// a single valid time are listed as missing and mark the composite partial.
/// sections observed but not declared are appended after the declared ones.
///
/// ## Arguments
/// * `track_id` - track the records belong to
/// * `race_id` - the race for a race composite, `None` for a track composite
/// * `declared_sections` - sections in track order
/// * `records` - every section time of the race or track
pub fn build_composite(
    track_id: &str,
    race_id: Option<&str>,
    declared_sections: &[String],
    records: &[SectionTimeRecord],
) -> CompositeDoc {
    let mut best: BTreeMap<&str, &SectionTimeRecord> = BTreeMap::new();

    for record in records.iter().filter(|record| is_valid_time(record.elapsed_time_s)) {
        match best.get(record.section_name.as_str()) {
            Some(current) if compare_candidates(record, current) != Ordering::Less => {}
            _ => {
                best.insert(record.section_name.as_str(), record);
            }
        }
    }

    let mut order: Vec<String> = declared_sections.to_vec();
    let observed: Vec<String> = best.keys().map(|name| name.to_string()).collect();
    Helpers::extend_unique(&mut order, &observed);

    let sections: Vec<CompositeSection> = order
        .iter()
        .filter_map(|name| best.get(name.as_str()))
        .map(|record| CompositeSection {
            section_name: record.section_name.clone(),
            best_time_s: record.elapsed_time_s,
            race_id: record.race_id.clone(),
            driver_id: record.driver_id.clone(),
            lap: record.lap,
        })
        .collect();

    let missing_sections: Vec<String> = declared_sections
        .iter()
        .filter(|name| !best.contains_key(name.as_str()))
        .cloned()
        .collect();
    if !missing_sections.is_empty() {
        warn!(
            target: "analysis/composite:build_composite",
            "{} {}: no valid times for {:?}",
            track_id, race_id.unwrap_or("(all races)"), missing_sections
        );
    }

    CompositeDoc {
        track_id: track_id.to_string(),
        race_id: race_id.map(|race| race.to_string()),
        scope: if race_id.is_some() { CompositeScope::Race } else { CompositeScope::Track },
        theoretical_best_lap_s: sections.iter().map(|section| section.best_time_s).sum(),
        is_partial: !missing_sections.is_empty(),
        sections,
        missing_sections,
    }
}

/// # build the composite over every race of a track
/// declared sections are the union of the races' sections in race order.
pub fn build_track_composite<'a, I>(track_id: &str, races: I) -> CompositeDoc
where
    I: IntoIterator<Item = (&'a [String], &'a [SectionTimeRecord])>,
{
    let mut declared: Vec<String> = Vec::new();
    let mut records: Vec<SectionTimeRecord> = Vec::new();

    for (sections, race_records) in races {
        Helpers::extend_unique(&mut declared, sections);
        records.extend_from_slice(race_records);
    }

    build_composite(track_id, None, &declared, &records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(race: &str, driver: &str, lap: u32, section: &str, time: f64) -> SectionTimeRecord {
        SectionTimeRecord {
            track_id: "barber".to_string(),
            race_id: race.to_string(),
            driver_id: driver.to_string(),
            lap,
            section_name: section.to_string(),
            elapsed_time_s: time,
        }
    }

    fn sections(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn picks_minimum_per_section() {
        let records = vec![
            record("r1", "A", 1, "Section 1", 34.2),
            record("r1", "A", 2, "Section 1", 35.0),
            record("r1", "B", 1, "Section 1", 34.5),
            record("r1", "B", 2, "Section 1", 34.8),
            record("r1", "C", 1, "Section 1", 34.9),
            record("r1", "C", 2, "Section 1", 34.6),
            record("r1", "C", 1, "Section 2", 40.0),
        ];

        let composite = build_composite("barber", Some("r1"), &sections(&["Section 1", "Section 2"]), &records);

        assert_eq!(composite.scope, CompositeScope::Race);
        let first = composite.section("Section 1").unwrap();
        assert_eq!(first.best_time_s, 34.2);
        assert_eq!(first.driver_id, "A");
        assert_eq!(first.lap, 1);
        assert!((composite.theoretical_best_lap_s - 74.2).abs() < 1e-9);
        assert!(!composite.is_partial);
    }

    #[test]
    fn flags_sections_without_observations() {
        let records = vec![
            record("r2", "2", 1, "Section 1", 34.0),
            record("r2", "2", 1, "Section 2", 40.0),
        ];
        let declared = sections(&["Section 1", "Section 2", "Section 3"]);

        let composite = build_composite("barber", Some("r2"), &declared, &records);

        assert!(composite.is_partial);
        assert_eq!(composite.missing_sections, vec!["Section 3"]);
        assert_eq!(composite.sections.len(), 2);
        assert!((composite.theoretical_best_lap_s - 74.0).abs() < 1e-9);
    }

    #[test]
    fn ignores_invalid_times() {
        let records = vec![
            record("r1", "2", 1, "Section 1", 0.0),
            record("r1", "2", 2, "Section 1", f64::NAN),
            record("r1", "7", 1, "Section 1", 35.5),
        ];
        let composite = build_composite("barber", Some("r1"), &sections(&["Section 1"]), &records);
        assert_eq!(composite.section("Section 1").unwrap().driver_id, "7");
    }

    #[test]
    fn ties_resolve_the_same_way_regardless_of_order() {
        let mut records = vec![
            record("r1", "13", 2, "Section 1", 34.0),
            record("r1", "7", 3, "Section 1", 34.0),
            record("r1", "7", 1, "Section 1", 34.0),
        ];
        let declared = sections(&["Section 1"]);

        let forward = build_composite("barber", Some("r1"), &declared, &records);
        records.reverse();
        let backward = build_composite("barber", Some("r1"), &declared, &records);

        assert_eq!(forward, backward);
        let best = forward.section("Section 1").unwrap();
        assert_eq!((best.driver_id.as_str(), best.lap), ("7", 1));
    }

    #[test]
    fn track_composite_spans_races() {
        let race_1 = vec![record("barber-race-1", "2", 1, "Section 1", 34.2)];
        let race_2 = vec![
            record("barber-race-2", "7", 4, "Section 1", 33.9),
            record("barber-race-2", "7", 4, "Section 2", 40.1),
        ];
        let sections_1 = sections(&["Section 1"]);
        let sections_2 = sections(&["Section 1", "Section 2"]);

        let composite = build_track_composite(
            "barber",
            vec![
                (sections_1.as_slice(), race_1.as_slice()),
                (sections_2.as_slice(), race_2.as_slice()),
            ],
        );

        assert_eq!(composite.scope, CompositeScope::Track);
        assert_eq!(composite.race_id, None);
        let best = composite.section("Section 1").unwrap();
        assert_eq!(best.race_id, "barber-race-2");
        assert_eq!(composite.sections.len(), 2);
    }
}
