use std::collections::BTreeMap;

use crate::models::{CompositeDoc, LapGap, SectionRecommendationDoc};
use crate::modules::helpers::math::Math;
use crate::modules::telemetry_loader::{is_valid_time, SectionTimeRecord};

use super::thresholds::Thresholds;
use super::compare_driver_ids;

/// trend slopes smaller than this are reported as steady
const STEADY_GAP_SLOPE_S: f64 = 0.01;

/// # gap statistics of every driver in every section
/// a section without a composite time has no gaps. drivers are ordered
/// by id, sections in composite order.
pub fn analyze_section_gaps(
    composite: &CompositeDoc,
    records: &[SectionTimeRecord],
    thresholds: &Thresholds,
) -> Vec<SectionRecommendationDoc> {
    // section -> driver -> lap -> time
    let mut grouped: BTreeMap<&str, BTreeMap<&str, BTreeMap<u32, f64>>> = BTreeMap::new();
    for record in records.iter().filter(|record| is_valid_time(record.elapsed_time_s)) {
        grouped
            .entry(record.section_name.as_str())
            .or_default()
            .entry(record.driver_id.as_str())
            .or_default()
            .insert(record.lap, record.elapsed_time_s);
    }

    let mut docs = Vec::new();

    for section in &composite.sections {
        let Some(drivers) = grouped.get(section.section_name.as_str()) else {
            continue;
        };

        let mut section_docs: Vec<SectionRecommendationDoc> = drivers
            .iter()
            .filter_map(|(driver_id, laps)| {
                let laps: Vec<LapGap> = laps
                    .iter()
                    .map(|(lap, time)| LapGap {
                        lap: *lap,
                        time_s: *time,
                        gap_s: time - section.best_time_s,
                    })
                    .collect();
                let gaps: Vec<f64> = laps.iter().map(|lap| lap.gap_s).collect();
                let lap_numbers: Vec<f64> = laps.iter().map(|lap| lap.lap as f64).collect();

                let mean_gap_s = Math::mean(&gaps)?;
                Some(SectionRecommendationDoc {
                    track_id: composite.track_id.clone(),
                    race_id: section_race_id(composite, &section.race_id),
                    driver_id: driver_id.to_string(),
                    section_name: section.section_name.clone(),
                    composite_time_s: section.best_time_s,
                    mean_gap_s,
                    std_gap_s: Math::standard_deviation(&gaps)?,
                    best_gap_s: gaps.iter().copied().fold(f64::INFINITY, f64::min),
                    gap_trend_s_per_lap: Math::linear_regression_slope(&lap_numbers, &gaps),
                    field_percentile: 0.0,
                    priority_score: mean_gap_s.min(thresholds.max_priority_score),
                    commentary: String::new(),
                    laps,
                })
            })
            .collect();

        let field: Vec<f64> = section_docs.iter().map(|doc| doc.mean_gap_s).collect();
        for doc in section_docs.iter_mut() {
            doc.field_percentile = Math::percentile_rank(doc.mean_gap_s, &field);
            doc.commentary = commentary(doc);
        }

        docs.extend(section_docs);
    }

    docs.sort_by(|a, b| compare_driver_ids(&a.driver_id, &b.driver_id));
    docs
}

fn section_race_id(composite: &CompositeDoc, source_race_id: &str) -> String {
    composite
        .race_id
        .clone()
        .unwrap_or_else(|| source_race_id.to_string())
}

fn commentary(doc: &SectionRecommendationDoc) -> String {
    let lap_word = if doc.laps.len() == 1 { "lap" } else { "laps" };

    let mut line = if doc.best_gap_s <= 0.0 {
        format!(
            "Set the benchmark {} time of {:.3}s; averages {:.3}s off it over {} {}.",
            doc.section_name,
            doc.composite_time_s,
            doc.mean_gap_s,
            doc.laps.len(),
            lap_word
        )
    } else {
        format!(
            "Averages {:.3}s off the best {} time of {:.3}s over {} {}, best gap {:.3}s.",
            doc.mean_gap_s,
            doc.section_name,
            doc.composite_time_s,
            doc.laps.len(),
            lap_word,
            doc.best_gap_s
        )
    };

    match doc.gap_trend_s_per_lap {
        Some(slope) if slope < -STEADY_GAP_SLOPE_S => {
            line.push_str(&format!(" Closing the gap by {:.3}s per lap.", -slope))
        }
        Some(slope) if slope > STEADY_GAP_SLOPE_S => {
            line.push_str(&format!(" Losing {:.3}s per lap.", slope))
        }
        Some(_) => line.push_str(" Gap is steady."),
        None => {}
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::analysis::composite::build_composite;

    fn record(driver: &str, lap: u32, time: f64) -> SectionTimeRecord {
        SectionTimeRecord {
            track_id: "barber".to_string(),
            race_id: "barber-race-1".to_string(),
            driver_id: driver.to_string(),
            lap,
            section_name: "Section 1".to_string(),
            elapsed_time_s: time,
        }
    }

    fn example_records() -> Vec<SectionTimeRecord> {
        vec![
            record("A", 1, 34.2),
            record("A", 2, 35.0),
            record("B", 1, 34.5),
            record("B", 2, 34.8),
            record("C", 1, 34.9),
            record("C", 2, 34.6),
        ]
    }

    #[test]
    fn three_driver_example() {
        let records = example_records();
        let composite = build_composite("barber", Some("barber-race-1"), &["Section 1".to_string()], &records);
        let docs = analyze_section_gaps(&composite, &records, &Thresholds::default());

        assert_eq!(docs.len(), 3);
        let b = docs.iter().find(|doc| doc.driver_id == "B").unwrap();
        assert!((b.mean_gap_s - 0.45).abs() < 1e-9);
        assert!((b.std_gap_s - 0.15).abs() < 1e-9);
        assert!((b.best_gap_s - 0.3).abs() < 1e-9);
        assert_eq!(b.composite_time_s, 34.2);

        let a = docs.iter().find(|doc| doc.driver_id == "A").unwrap();
        assert_eq!(a.laps[0].gap_s, 0.0);
        assert_eq!(a.best_gap_s, 0.0);
    }

    #[test]
    fn percentile_orders_the_field() {
        let records = example_records();
        let composite = build_composite("barber", Some("barber-race-1"), &["Section 1".to_string()], &records);
        let docs = analyze_section_gaps(&composite, &records, &Thresholds::default());

        // mean gaps: A 0.4, B 0.45, C 0.55
        let percentile = |driver: &str| docs.iter().find(|doc| doc.driver_id == driver).unwrap().field_percentile;
        assert!((percentile("A") - 100.0 / 6.0).abs() < 1e-9);
        assert!((percentile("B") - 50.0).abs() < 1e-9);
        assert!((percentile("C") - 500.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn gap_trend_and_priority() {
        let records = example_records();
        let composite = build_composite("barber", Some("barber-race-1"), &["Section 1".to_string()], &records);
        let docs = analyze_section_gaps(&composite, &records, &Thresholds::default());

        let c = docs.iter().find(|doc| doc.driver_id == "C").unwrap();
        assert!((c.gap_trend_s_per_lap.unwrap() + 0.3).abs() < 1e-9);
        assert!(c.commentary.contains("Closing the gap"));
        assert!((c.priority_score - c.mean_gap_s).abs() < 1e-12);

        let thresholds = Thresholds {
            max_priority_score: 0.5,
            ..Thresholds::default()
        };
        let capped = analyze_section_gaps(&composite, &records, &thresholds);
        let c = capped.iter().find(|doc| doc.driver_id == "C").unwrap();
        assert_eq!(c.priority_score, 0.5);
    }

    #[test]
    fn single_lap_has_no_trend() {
        let records = vec![record("2", 1, 34.2), record("7", 1, 34.4)];
        let composite = build_composite("barber", Some("barber-race-1"), &["Section 1".to_string()], &records);
        let docs = analyze_section_gaps(&composite, &records, &Thresholds::default());

        assert!(docs.iter().all(|doc| doc.gap_trend_s_per_lap.is_none()));
        assert_eq!(docs[0].std_gap_s, 0.0);
        assert!(docs[0].commentary.contains("1 lap."));
    }
}
