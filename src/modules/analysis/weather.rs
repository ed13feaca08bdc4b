use log::debug;

use crate::models::{
    BestPerformer, CorrelationStrength, VariableStats, WeatherCorrelation, WeatherRecommendationDoc,
    WeatherSummary, WeatherVariable,
};
use crate::modules::helpers::math::Math;
use crate::modules::telemetry_loader::{is_valid_time, LapRecord, RaceTelemetry, WeatherSample};

use super::compare_driver_ids;
use super::thresholds::Thresholds;

const VARIABLES: [WeatherVariable; 4] = [
    WeatherVariable::AirTemp,
    WeatherVariable::TrackTemp,
    WeatherVariable::Humidity,
    WeatherVariable::WindSpeed,
];

fn value_of(sample: &WeatherSample, variable: WeatherVariable) -> Option<f64> {
    match variable {
        WeatherVariable::AirTemp => sample.air_temp_c,
        WeatherVariable::TrackTemp => sample.track_temp_c,
        WeatherVariable::Humidity => sample.humidity_pct,
        WeatherVariable::WindSpeed => sample.wind_speed,
    }
}

fn variable_stats(samples: &[WeatherSample], variable: WeatherVariable) -> Option<VariableStats> {
    let values: Vec<f64> = samples.iter().filter_map(|sample| value_of(sample, variable)).collect();

    Some(VariableStats {
        mean: Math::mean(&values)?,
        min: values.iter().copied().reduce(f64::min)?,
        max: values.iter().copied().reduce(f64::max)?,
    })
}

pub fn summarize(samples: &[WeatherSample]) -> WeatherSummary {
    WeatherSummary {
        air_temp_c: variable_stats(samples, WeatherVariable::AirTemp),
        track_temp_c: variable_stats(samples, WeatherVariable::TrackTemp),
        humidity_pct: variable_stats(samples, WeatherVariable::Humidity),
        wind_speed: variable_stats(samples, WeatherVariable::WindSpeed),
        rain: samples.iter().any(|sample| sample.rain == Some(true)),
        samples: samples.len(),
    }
}

/// the fastest timed lap of the race, ties go to the lower driver id and lap
pub fn best_performer(laps: &[LapRecord]) -> Option<BestPerformer> {
    laps.iter()
        .filter_map(|lap| {
            lap.lap_time_s
                .filter(|time| is_valid_time(*time))
                .map(|time| (lap, time))
        })
        .min_by(|(a, a_time), (b, b_time)| {
            a_time
                .total_cmp(b_time)
                .then_with(|| compare_driver_ids(&a.driver_id, &b.driver_id))
                .then_with(|| a.lap.cmp(&b.lap))
        })
        .map(|(lap, time)| BestPerformer {
            driver_id: lap.driver_id.clone(),
            lap: lap.lap,
            lap_time_s: time,
        })
}

/// # pair timed laps with the closest weather sample
/// a lap is placed at its start, the race clock at the end of the lap minus
/// its lap time. the first weather sample is taken as the start of the race,
/// so a sample offset and a lap start share one clock. laps without a race
/// clock are skipped.
pub fn align_laps<'a>(laps: &[LapRecord], samples: &'a [WeatherSample]) -> Vec<(f64, &'a WeatherSample)> {
    if samples.is_empty() {
        return Vec::new();
    }

    laps.iter()
        .filter_map(|lap| {
            let time = lap.lap_time_s.filter(|time| is_valid_time(*time))?;
            let started = lap.race_elapsed_s? - time;

            let nearest = samples.iter().min_by(|a, b| {
                (a.offset_s - started)
                    .abs()
                    .total_cmp(&(b.offset_s - started).abs())
            })?;
            Some((time, nearest))
        })
        .collect()
}

fn strength(r: f64, thresholds: &Thresholds) -> CorrelationStrength {
    if r.abs() > thresholds.strong_correlation {
        CorrelationStrength::Strong
    } else if r.abs() > thresholds.significant_correlation {
        CorrelationStrength::Moderate
    } else {
        CorrelationStrength::Weak
    }
}

pub fn correlate(aligned: &[(f64, &WeatherSample)], thresholds: &Thresholds) -> Vec<WeatherCorrelation> {
    VARIABLES
        .iter()
        .filter_map(|variable| {
            let (values, lap_times): (Vec<f64>, Vec<f64>) = aligned
                .iter()
                .filter_map(|(time, sample)| value_of(sample, *variable).map(|value| (value, *time)))
                .unzip();

            let r = Math::pearson(&values, &lap_times)?;
            let p_value = Math::pearson_p_value(r, values.len())?;

            Some(WeatherCorrelation {
                variable: *variable,
                r,
                p_value,
                samples: values.len(),
                strength: strength(r, thresholds),
                surfaced: p_value < thresholds.p_value_cutoff && r.abs() > thresholds.significant_correlation,
            })
        })
        .collect()
}

fn claim(correlation: &WeatherCorrelation) -> String {
    let slower_when_higher = correlation.r > 0.0;
    let evidence = format!("(r = {:.2}, p = {:.3})", correlation.r, correlation.p_value);

    match (correlation.variable, slower_when_higher) {
        (WeatherVariable::TrackTemp, true) => format!(
            "Higher track temperatures correlate with slower lap times {}, likely tire overheating and reduced grip.",
            evidence
        ),
        (WeatherVariable::TrackTemp, false) => format!(
            "Lower track temperatures correlate with slower lap times {}, tires may struggle to reach their operating window.",
            evidence
        ),
        (WeatherVariable::AirTemp, true) => format!(
            "Higher air temperatures correlate with slower lap times {}, affecting engine output and tire grip.",
            evidence
        ),
        (WeatherVariable::AirTemp, false) => format!(
            "Lower air temperatures correlate with slower lap times {}, affecting tire warm-up.",
            evidence
        ),
        (WeatherVariable::Humidity, true) => format!(
            "Higher humidity correlates with slower lap times {}, affecting engine power.",
            evidence
        ),
        (WeatherVariable::Humidity, false) => format!(
            "Lower humidity correlates with slower lap times {}.",
            evidence
        ),
        (WeatherVariable::WindSpeed, direction) => format!(
            "Wind speed shows a {} correlation with lap times {}, affecting aerodynamics and top speed.",
            if direction { "positive" } else { "negative" },
            evidence
        ),
    }
}

fn describe_conditions(summary: &WeatherSummary) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(air) = &summary.air_temp_c {
        lines.push(format!(
            "Air temperature averaged {:.1}°C (range {:.1}-{:.1}°C).",
            air.mean, air.min, air.max
        ));
    }
    if let Some(track) = &summary.track_temp_c {
        lines.push(format!("Track temperature averaged {:.1}°C.", track.mean));
    }
    if let Some(humidity) = &summary.humidity_pct {
        lines.push(format!("Humidity averaged {:.1}%.", humidity.mean));
    }
    if let Some(wind) = &summary.wind_speed {
        lines.push(format!("Wind speed averaged {:.1} (max {:.1}).", wind.mean, wind.max));
    }
    if summary.samples > 0 {
        lines.push(if summary.rain {
            "Rain was detected during the race.".to_string()
        } else {
            "No rain was detected during the race.".to_string()
        });
    }
    lines
}

/// # weather impact of a race
/// without weather samples or laps to align only the summary is produced
/// and the document is partial.
pub fn analyze_weather(telemetry: &RaceTelemetry, thresholds: &Thresholds) -> WeatherRecommendationDoc {
    let summary = summarize(&telemetry.weather);
    let aligned = align_laps(&telemetry.laps, &telemetry.weather);
    let correlations = correlate(&aligned, thresholds);

    debug!(
        target: "analysis/weather:analyze_weather",
        "{}: {} weather samples, {} aligned laps, {} correlations",
        telemetry.race_id, summary.samples, aligned.len(), correlations.len()
    );

    let mut interpretation = Vec::new();
    let is_partial = aligned.is_empty();

    if telemetry.weather.is_empty() {
        interpretation.push("No weather data available.".to_string());
    } else {
        interpretation.extend(describe_conditions(&summary));

        if is_partial {
            interpretation.push("Lap times could not be aligned with the weather readings, so no correlation was computed.".to_string());
        } else {
            let claims: Vec<String> = correlations
                .iter()
                .filter(|correlation| correlation.surfaced)
                .map(claim)
                .collect();

            if claims.is_empty() {
                interpretation.push(
                    "Weather conditions show no significant correlation with lap times; performance appears driver or setup dependent."
                        .to_string(),
                );
            } else {
                interpretation.extend(claims);
            }
        }
    }

    WeatherRecommendationDoc {
        track_id: telemetry.track_id.clone(),
        race_id: telemetry.race_id.clone(),
        summary,
        correlations,
        best_performer: best_performer(&telemetry.laps),
        interpretation,
        is_partial,
    }
}
