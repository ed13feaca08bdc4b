use std::collections::BTreeMap;

use crate::models::{
    CompositeDoc, ConsistencyLevel, LapTime, LapTrend, PatternRecommendationDoc, SectionConsistency,
    SectionRecommendationDoc, TrendDirection,
};
use crate::modules::helpers::math::Math;
use crate::modules::telemetry_loader::{is_valid_time, LapRecord, SectionTimeRecord};

use super::compare_driver_ids;
use super::thresholds::Thresholds;

/// # consistency score of a driver
/// 10 for a driver without spread, lower as the driver's coefficient of
/// variation grows relative to the field's.
pub fn consistency_score(cv: f64, field_cv: f64) -> f64 {
    if cv <= 0.0 {
        return 10.0;
    }
    let ratio = if field_cv > 0.0 { cv / field_cv } else { 1.0 };
    10.0 / (1.0 + ratio)
}

pub fn consistency_level(score: f64, thresholds: &Thresholds) -> ConsistencyLevel {
    if score >= thresholds.consistency_high_score {
        ConsistencyLevel::High
    } else if score >= thresholds.consistency_moderate_score {
        ConsistencyLevel::Moderate
    } else {
        ConsistencyLevel::Low
    }
}

fn section_level(std_s: f64, thresholds: &Thresholds) -> ConsistencyLevel {
    if std_s < thresholds.section_consistency_high_std_s {
        ConsistencyLevel::High
    } else if std_s < thresholds.section_consistency_moderate_std_s {
        ConsistencyLevel::Moderate
    } else {
        ConsistencyLevel::Low
    }
}

/// # longest run of consecutive lap numbers
/// `laps` must be sorted by lap number. the earliest run wins a tie.
pub fn longest_contiguous_window(laps: &[(u32, f64)]) -> &[(u32, f64)] {
    let mut best = (0, 0);
    let mut start = 0;

    for index in 0..laps.len() {
        if index > 0 && laps[index].0 != laps[index - 1].0 + 1 {
            start = index;
        }
        if index + 1 - start > best.1 - best.0 {
            best = (start, index + 1);
        }
    }

    &laps[best.0..best.1]
}

pub fn lap_trend(laps: &[(u32, f64)], thresholds: &Thresholds) -> Option<LapTrend> {
    let window = longest_contiguous_window(laps);
    if window.len() < thresholds.min_laps_for_trend.max(2) {
        return None;
    }

    let xs: Vec<f64> = window.iter().map(|(lap, _)| *lap as f64).collect();
    let ys: Vec<f64> = window.iter().map(|(_, time)| *time).collect();
    let slope = Math::linear_regression_slope(&xs, &ys)?;

    let direction = if slope < -thresholds.trend_slope_s_per_lap {
        TrendDirection::Improving
    } else if slope > thresholds.trend_slope_s_per_lap {
        TrendDirection::Degrading
    } else {
        TrendDirection::Stable
    };

    Some(LapTrend {
        first_lap: window[0].0,
        last_lap: window[window.len() - 1].0,
        slope_s_per_lap: slope,
        direction,
    })
}

/// # pattern analysis of every driver of a race
/// the field coefficient of variation is the mean over every driver with
/// at least two timed laps.
pub fn analyze_patterns(
    composite: &CompositeDoc,
    laps: &[LapRecord],
    records: &[SectionTimeRecord],
    section_gaps: &[SectionRecommendationDoc],
    thresholds: &Thresholds,
) -> Vec<PatternRecommendationDoc> {
    let race_id = composite.race_id.clone().unwrap_or_default();

    let mut recorded: BTreeMap<&str, Vec<LapTime>> = BTreeMap::new();
    let mut timed: BTreeMap<&str, Vec<(u32, f64)>> = BTreeMap::new();
    for lap in laps {
        recorded.entry(lap.driver_id.as_str()).or_default().push(LapTime {
            lap: lap.lap,
            lap_time_s: lap.lap_time_s.filter(|time| is_valid_time(*time)),
        });
        let entry = timed.entry(lap.driver_id.as_str()).or_default();
        if let Some(time) = lap.lap_time_s.filter(|time| is_valid_time(*time)) {
            entry.push((lap.lap, time));
        }
    }
    for driver_laps in timed.values_mut() {
        driver_laps.sort_by_key(|(lap, _)| *lap);
    }
    for driver_laps in recorded.values_mut() {
        driver_laps.sort_by_key(|lap| lap.lap);
    }

    let cvs: BTreeMap<&str, f64> = timed
        .iter()
        .filter_map(|(driver_id, driver_laps)| {
            let times: Vec<f64> = driver_laps.iter().map(|(_, time)| *time).collect();
            Math::coefficient_of_variation(&times).map(|cv| (*driver_id, cv))
        })
        .collect();
    let field_values: Vec<f64> = cvs.values().copied().collect();
    let field_cv = Math::mean(&field_values);

    let mut docs: Vec<PatternRecommendationDoc> = timed
        .iter()
        .map(|(driver_id, driver_laps)| {
            let times: Vec<f64> = driver_laps.iter().map(|(_, time)| *time).collect();
            let cv = cvs.get(driver_id).copied();
            let score = cv.map(|cv| consistency_score(cv, field_cv.unwrap_or(cv)));

            let driver_gaps: Vec<&SectionRecommendationDoc> = section_gaps
                .iter()
                .filter(|doc| doc.driver_id == *driver_id)
                .collect();

            PatternRecommendationDoc {
                track_id: composite.track_id.clone(),
                race_id: race_id.clone(),
                driver_id: driver_id.to_string(),
                laps: recorded.get(driver_id).cloned().unwrap_or_default(),
                lap_count: times.len(),
                best_lap_s: times.iter().copied().reduce(f64::min),
                mean_lap_s: Math::mean(&times),
                std_lap_s: Math::standard_deviation(&times),
                trend: lap_trend(driver_laps, thresholds),
                coefficient_of_variation: cv,
                field_coefficient_of_variation: field_cv,
                consistency_score: score,
                consistency: score.map(|score| consistency_level(score, thresholds)),
                section_consistency: section_consistency(composite, records, driver_id, thresholds),
                strongest_section: extreme_section(&driver_gaps, false),
                weakest_section: extreme_section(&driver_gaps, true),
            }
        })
        .collect();

    docs.sort_by(|a, b| compare_driver_ids(&a.driver_id, &b.driver_id));
    docs
}

fn section_consistency(
    composite: &CompositeDoc,
    records: &[SectionTimeRecord],
    driver_id: &str,
    thresholds: &Thresholds,
) -> Vec<SectionConsistency> {
    composite
        .sections
        .iter()
        .filter_map(|section| {
            let times: Vec<f64> = records
                .iter()
                .filter(|record| {
                    record.driver_id == driver_id
                        && record.section_name == section.section_name
                        && is_valid_time(record.elapsed_time_s)
                })
                .map(|record| record.elapsed_time_s)
                .collect();
            if times.len() < 2 {
                return None;
            }

            let std_s = Math::standard_deviation(&times)?;
            Some(SectionConsistency {
                section_name: section.section_name.clone(),
                std_s,
                level: section_level(std_s, thresholds),
            })
        })
        .collect()
}

/// smallest or largest mean gap, the first section wins a tie
fn extreme_section(gaps: &[&SectionRecommendationDoc], largest: bool) -> Option<String> {
    let mut best: Option<&SectionRecommendationDoc> = None;
    for doc in gaps.iter().copied() {
        let better = match best {
            None => true,
            Some(current) if largest => doc.mean_gap_s > current.mean_gap_s,
            Some(current) => doc.mean_gap_s < current.mean_gap_s,
        };
        if better {
            best = Some(doc);
        }
    }
    best.map(|doc| doc.section_name.clone())
}
