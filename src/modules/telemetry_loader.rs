use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use snafu::{OptionExt, ResultExt};

use crate::errors::{CustomResult, EmptyInputSnafu, Error, MissingSectionsFileSnafu, ReadFileSnafu};
use crate::modules::helpers::track::{
    normalize_track_id, parse_race_folder, parse_section_column, race_id, section_name,
};

pub const SECTIONS_FILE_PREFIX: &str = "23_analysisendurancewithsections";
pub const WEATHER_FILE_PREFIX: &str = "26_weather";

/// bad row warnings kept per file, the rest are only counted
const MAX_ROW_WARNINGS: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct RaceSource {
    pub track_id: String,
    pub track_folder: String,
    pub race_number: u32,
    pub race_id: String,
    pub race_dir: PathBuf,
    pub sections_path: Option<PathBuf>,
    pub weather_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionTimeRecord {
    pub track_id: String,
    pub race_id: String,
    pub driver_id: String,
    pub lap: u32,
    pub section_name: String,
    pub elapsed_time_s: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LapRecord {
    pub driver_id: String,
    pub lap: u32,
    pub lap_time_s: Option<f64>,
    /// race clock at the end of the lap
    pub race_elapsed_s: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeatherSample {
    /// seconds since the first sample of the file
    pub offset_s: f64,
    pub air_temp_c: Option<f64>,
    pub track_temp_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction_deg: Option<f64>,
    pub rain: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedSections {
    /// declared by the header, in track order
    pub sections: Vec<String>,
    pub section_times: Vec<SectionTimeRecord>,
    pub laps: Vec<LapRecord>,
    pub bad_rows: u64,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RaceTelemetry {
    pub track_id: String,
    pub race_id: String,
    pub race_number: u32,
    pub sections: Vec<String>,
    pub section_times: Vec<SectionTimeRecord>,
    pub laps: Vec<LapRecord>,
    pub weather: Vec<WeatherSample>,
    pub has_weather_file: bool,
    pub bad_rows: u64,
    pub warnings: Vec<String>,
}

/************ DISCOVERY ************/

/// # find every race below the data directory
/// every directory is a track, every `Race <n>` directory in it a race.
/// sorted by track id and race number.
pub fn discover_races(data_dir: &Path) -> CustomResult<Vec<RaceSource>> {
    let mut races = Vec::new();

    for track_dir in sorted_dirs(data_dir)? {
        let track_folder = folder_name(&track_dir);
        let track_id = normalize_track_id(&track_folder);

        for race_dir in sorted_dirs(&track_dir)? {
            let Some(race_number) = parse_race_folder(&folder_name(&race_dir)) else {
                debug!(target: "telemetry_loader:discover_races", "skipping {}", race_dir.display());
                continue;
            };

            races.push(RaceSource {
                track_id: track_id.clone(),
                track_folder: track_folder.clone(),
                race_number,
                race_id: race_id(&track_id, race_number),
                sections_path: find_file(&race_dir, SECTIONS_FILE_PREFIX)?,
                weather_path: find_file(&race_dir, WEATHER_FILE_PREFIX)?,
                race_dir,
            });
        }
    }

    races.sort_by(|a, b| {
        a.track_id
            .cmp(&b.track_id)
            .then(a.race_number.cmp(&b.race_number))
    });
    Ok(races)
}

fn sorted_dirs(dir: &Path) -> CustomResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).context(ReadFileSnafu { path: dir.to_path_buf() })?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.context(ReadFileSnafu { path: dir.to_path_buf() })?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn folder_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn find_file(dir: &Path, prefix: &str) -> CustomResult<Option<PathBuf>> {
    let entries = fs::read_dir(dir).context(ReadFileSnafu { path: dir.to_path_buf() })?;

    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry.context(ReadFileSnafu { path: dir.to_path_buf() })?;
        let name = entry.file_name().to_string_lossy().to_lowercase();
        if name.starts_with(prefix) && name.ends_with(".csv") {
            matches.push(entry.path());
        }
    }
    matches.sort();
    Ok(matches.into_iter().next())
}

/************ LOADING ************/

/// # load the telemetry of one race
/// fails only when the sections file is missing, unreadable or holds no
/// usable lap. weather problems end up as warnings.
pub fn load_race(source: &RaceSource) -> CustomResult<RaceTelemetry> {
    let sections_path = source.sections_path.as_ref().context(MissingSectionsFileSnafu {
        race_id: source.race_id.clone(),
    })?;

    let contents = fs::read_to_string(sections_path).context(ReadFileSnafu {
        path: sections_path.clone(),
    })?;
    let path_name = sections_path.display().to_string();
    let parsed = parse_sections_csv(&path_name, &contents, &source.track_id, &source.race_id)?;

    if parsed.laps.is_empty() {
        return EmptyInputSnafu { path: path_name }.fail();
    }

    let mut warnings = parsed.warnings;
    let mut bad_rows = parsed.bad_rows;
    let mut weather = Vec::new();

    if let Some(weather_path) = &source.weather_path {
        let weather_name = weather_path.display().to_string();
        match fs::read_to_string(weather_path) {
            Ok(contents) => match parse_weather_csv(&weather_name, &contents) {
                Ok((samples, weather_bad_rows, weather_warnings)) => {
                    weather = samples;
                    bad_rows += weather_bad_rows;
                    warnings.extend(weather_warnings);
                }
                Err(error) => {
                    warn!(target: "telemetry_loader:load_race", "ignoring weather of {}: {}", source.race_id, error);
                    warnings.push(format!("weather_ignored: {}", error));
                }
            },
            Err(error) => {
                warn!(target: "telemetry_loader:load_race", "could not read {}: {}", weather_name, error);
                warnings.push(format!("weather_unreadable: {}", weather_name));
            }
        }
    }

    Ok(RaceTelemetry {
        track_id: source.track_id.clone(),
        race_id: source.race_id.clone(),
        race_number: source.race_number,
        sections: parsed.sections,
        section_times: parsed.section_times,
        laps: parsed.laps,
        has_weather_file: source.weather_path.is_some(),
        weather,
        bad_rows,
        warnings,
    })
}

/************ PARSING ************/

/// header names trimmed, `;` preferred over `,`
fn split_header(header: &str) -> (char, Vec<String>) {
    let header = header.trim_start_matches('\u{feff}');
    let delimiter = if header.contains(';') { ';' } else { ',' };
    let columns = header
        .split(delimiter)
        .map(|column| column.trim().to_string())
        .collect();
    (delimiter, columns)
}

fn column_index(columns: &[String], name: &str) -> Option<usize> {
    columns.iter().position(|column| column.eq_ignore_ascii_case(name))
}

fn required_column(path: &str, columns: &[String], name: &str) -> CustomResult<usize> {
    column_index(columns, name).ok_or_else(|| Error::MissingColumnError {
        path: path.to_string(),
        column: name.to_string(),
    })
}

fn cell<'a>(fields: &[&'a str], index: Option<usize>) -> &'a str {
    index.and_then(|index| fields.get(index)).map(|field| field.trim()).unwrap_or("")
}

fn record_bad_row(warnings: &mut Vec<String>, bad_rows: &mut u64, line: usize, reason: &str) {
    *bad_rows += 1;
    if warnings.len() < MAX_ROW_WARNINGS {
        warnings.push(format!("bad_row: line {}: {}", line, reason));
    }
}

/// # parse a sections file
/// every valid section cell becomes a record, rows without a driver or lap
/// number are counted as bad and skipped.
pub fn parse_sections_csv(path: &str, contents: &str, track_id: &str, race_id: &str) -> CustomResult<ParsedSections> {
    let mut lines = contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let Some((_, header)) = lines.next() else {
        return EmptyInputSnafu { path }.fail();
    };
    let (delimiter, columns) = split_header(header);

    let number_index = required_column(path, &columns, "NUMBER")?;
    let lap_index = required_column(path, &columns, "LAP_NUMBER")?;
    let lap_time_index = column_index(&columns, "LAP_TIME");
    let elapsed_index = column_index(&columns, "ELAPSED");

    let mut section_columns: Vec<(usize, u32)> = columns
        .iter()
        .enumerate()
        .filter_map(|(index, column)| parse_section_column(column).map(|number| (index, number)))
        .collect();
    section_columns.sort_by_key(|(_, number)| *number);
    section_columns.dedup_by_key(|(_, number)| *number);

    let mut parsed = ParsedSections {
        sections: section_columns.iter().map(|(_, number)| section_name(*number)).collect(),
        ..ParsedSections::default()
    };

    if section_columns.is_empty() {
        parsed.warnings.push(format!("no_section_columns: {}", path));
    }

    let mut seen: HashSet<(String, u32)> = HashSet::new();

    for (line_index, line) in lines {
        let line_number = line_index + 1;
        let fields: Vec<&str> = line.split(delimiter).collect();

        let driver_id = cell(&fields, Some(number_index));
        if driver_id.is_empty() {
            record_bad_row(&mut parsed.warnings, &mut parsed.bad_rows, line_number, "missing NUMBER");
            continue;
        }

        let Some(lap) = parse_lap_number(cell(&fields, Some(lap_index))) else {
            record_bad_row(&mut parsed.warnings, &mut parsed.bad_rows, line_number, "invalid LAP_NUMBER");
            continue;
        };

        if !seen.insert((driver_id.to_string(), lap)) {
            parsed
                .warnings
                .push(format!("duplicate_lap: driver {} lap {} (line {})", driver_id, lap, line_number));
            continue;
        }

        let mut lap_sections = Vec::new();
        for (index, number) in &section_columns {
            if let Some(time) = parse_duration_s(cell(&fields, Some(*index))).filter(|time| is_valid_time(*time)) {
                lap_sections.push(time);
                parsed.section_times.push(SectionTimeRecord {
                    track_id: track_id.to_string(),
                    race_id: race_id.to_string(),
                    driver_id: driver_id.to_string(),
                    lap,
                    section_name: section_name(*number),
                    elapsed_time_s: time,
                });
            }
        }

        let lap_time_s = parse_duration_s(cell(&fields, lap_time_index))
            .filter(|time| is_valid_time(*time))
            .or_else(|| {
                let complete = !section_columns.is_empty() && lap_sections.len() == section_columns.len();
                complete.then(|| lap_sections.iter().sum())
            });

        parsed.laps.push(LapRecord {
            driver_id: driver_id.to_string(),
            lap,
            lap_time_s,
            race_elapsed_s: parse_duration_s(cell(&fields, elapsed_index)).filter(|time| time.is_finite()),
        });
    }

    debug!(
        target: "telemetry_loader:parse_sections_csv",
        "{}: {} laps, {} section times, {} bad rows",
        path, parsed.laps.len(), parsed.section_times.len(), parsed.bad_rows
    );
    Ok(parsed)
}

/// # parse a weather file
/// returns the samples ordered by time with offsets from the first sample,
/// the number of bad rows and the warnings.
pub fn parse_weather_csv(path: &str, contents: &str) -> CustomResult<(Vec<WeatherSample>, u64, Vec<String>)> {
    let mut lines = contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let Some((_, header)) = lines.next() else {
        return EmptyInputSnafu { path }.fail();
    };
    let (delimiter, columns) = split_header(header);

    let find = |fragment: &str| {
        columns
            .iter()
            .position(|column| column.to_ascii_uppercase().contains(fragment))
    };

    let time_index = find("TIME_UTC_SECONDS").ok_or_else(|| Error::MissingColumnError {
        path: path.to_string(),
        column: "TIME_UTC_SECONDS".to_string(),
    })?;
    let air_index = find("AIR_TEMP");
    let track_index = find("TRACK_TEMP");
    let humidity_index = find("HUMIDITY");
    let wind_speed_index = find("WIND_SPEED");
    let wind_direction_index = find("WIND_DIRECTION");
    let rain_index = find("RAIN");

    let number = |fields: &[&str], index: Option<usize>| {
        cell(fields, index).parse::<f64>().ok().filter(|value| value.is_finite())
    };

    let mut bad_rows = 0;
    let mut warnings = Vec::new();
    let mut timed = Vec::new();

    for (line_index, line) in lines {
        let fields: Vec<&str> = line.split(delimiter).collect();
        let Some(time) = number(&fields, Some(time_index)) else {
            record_bad_row(&mut warnings, &mut bad_rows, line_index + 1, "invalid TIME_UTC_SECONDS");
            continue;
        };

        timed.push((
            time,
            WeatherSample {
                offset_s: 0.0,
                air_temp_c: number(&fields, air_index),
                track_temp_c: number(&fields, track_index),
                humidity_pct: number(&fields, humidity_index),
                wind_speed: number(&fields, wind_speed_index),
                wind_direction_deg: number(&fields, wind_direction_index),
                rain: number(&fields, rain_index).map(|rain| rain > 0.0),
            },
        ));
    }

    timed.sort_by(|(a, _), (b, _)| a.total_cmp(b));
    let start = timed.first().map(|(time, _)| *time).unwrap_or(0.0);

    let samples = timed
        .into_iter()
        .map(|(time, sample)| WeatherSample {
            offset_s: time - start,
            ..sample
        })
        .collect();

    Ok((samples, bad_rows, warnings))
}

/// lap numbers are sometimes written as `3.0`
fn parse_lap_number(value: &str) -> Option<u32> {
    if let Ok(lap) = value.parse::<u32>() {
        return Some(lap);
    }
    let lap = value.parse::<f64>().ok()?;
    (lap.fract() == 0.0 && lap >= 0.0 && lap <= u32::MAX as f64).then_some(lap as u32)
}

pub fn is_valid_time(time: f64) -> bool {
    time.is_finite() && time > 0.0
}

/// # parse a duration to seconds
/// accepts `SS.mmm`, `M:SS.mmm` and `H:MM:SS.mmm`
pub fn parse_duration_s(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let parts = value
        .split(':')
        .map(|part| part.trim().parse::<f64>().ok())
        .collect::<Option<Vec<f64>>>()?;

    match parts.as_slice() {
        [seconds] => Some(*seconds),
        [minutes, seconds] => Some(minutes * 60.0 + seconds),
        [hours, minutes, seconds] => Some(hours * 3600.0 + minutes * 60.0 + seconds),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECTIONS: &str = "\
NUMBER; DRIVER_NUMBER; LAP_NUMBER; LAP_TIME; S1; S1_IMPROVEMENT; S2; S3; ELAPSED
2;1;1;1:39.300;34.2;0;40.1;25.0;1:39.300
2;1;2;;35.0;0;40.0;24.9;3:18.200
7;1;1;1:40.300;34.5;0;40.5;25.3;1:40.300
7;1;1;1:40.300;34.5;0;40.5;25.3;1:40.300
13;1;x;1:41.500;34.9;0;41.0;25.6;1:41.500
;1;3;1:41.500;34.9;0;41.0;25.6;1:41.500
13;1;2;;35.0;0;41.1;;3:20.000
";

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration_s("34.25"), Some(34.25));
        assert_eq!(parse_duration_s("1:39.5"), Some(99.5));
        assert_eq!(parse_duration_s("1:00:01.5"), Some(3601.5));
        assert_eq!(parse_duration_s(""), None);
        assert_eq!(parse_duration_s("fast"), None);
        assert_eq!(parse_duration_s("1:2:3:4"), None);
    }

    #[test]
    fn parses_sections_file() {
        let parsed = parse_sections_csv("sections.csv", SECTIONS, "barber", "barber-race-1").unwrap();

        assert_eq!(parsed.sections, vec!["Section 1", "Section 2", "Section 3"]);
        assert_eq!(parsed.laps.len(), 4);
        assert_eq!(parsed.bad_rows, 2);
        assert!(parsed.warnings.iter().any(|warning| warning.starts_with("duplicate_lap")));

        // lap time derived from the complete set of sections
        let second = &parsed.laps[1];
        assert_eq!(second.lap, 2);
        assert!((second.lap_time_s.unwrap() - 99.9).abs() < 1e-9);
        assert!((second.race_elapsed_s.unwrap() - 198.2).abs() < 1e-9);

        // incomplete lap without LAP_TIME has no lap time
        let incomplete = parsed.laps.iter().find(|lap| lap.driver_id == "13").unwrap();
        assert_eq!(incomplete.lap_time_s, None);
        let driver_13_sections: Vec<_> = parsed
            .section_times
            .iter()
            .filter(|record| record.driver_id == "13")
            .map(|record| record.section_name.as_str())
            .collect();
        assert_eq!(driver_13_sections, vec!["Section 1", "Section 2"]);
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let error = parse_sections_csv("x.csv", "NUMBER;S1\n2;34.2\n", "barber", "barber-race-1").unwrap_err();
        assert!(matches!(error, Error::MissingColumnError { ref column, .. } if column == "LAP_NUMBER"));
    }

    #[test]
    fn accepts_comma_delimiter() {
        let parsed = parse_sections_csv("x.csv", "NUMBER,LAP_NUMBER,S1\n5,1,30.5\n", "cota", "cota-race-1").unwrap();
        assert_eq!(parsed.section_times.len(), 1);
        assert_eq!(parsed.section_times[0].elapsed_time_s, 30.5);
    }

    #[test]
    fn parses_weather_file() {
        let contents = "\
TIME_UTC_SECONDS;TIME_UTC_STR;AIR_TEMP;TRACK_TEMP;HUMIDITY;PRESSURE;WIND_SPEED;WIND_DIRECTION;RAIN
1700000060;x;21.5;30.1;55;1013;3.2;180;0
1700000000;x;21.0;30.0;56;1013;3.2;180;0
bad;x;21.0;30.0;56;1013;3.2;180;1
";
        let (samples, bad_rows, _) = parse_weather_csv("weather.csv", contents).unwrap();

        assert_eq!(bad_rows, 1);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].offset_s, 0.0);
        assert_eq!(samples[0].air_temp_c, Some(21.0));
        assert_eq!(samples[1].offset_s, 60.0);
        assert_eq!(samples[1].rain, Some(false));
    }

    #[test]
    fn discovers_and_loads_races() {
        let dir = tempfile::tempdir().unwrap();
        let race_dir = dir.path().join("COTA").join("Race 1");
        fs::create_dir_all(&race_dir).unwrap();
        fs::create_dir_all(dir.path().join("COTA").join("notes")).unwrap();
        fs::write(
            race_dir.join("23_AnalysisEnduranceWithSections_Race 1_Anonymized.CSV"),
            SECTIONS,
        )
        .unwrap();

        let races = discover_races(dir.path()).unwrap();
        assert_eq!(races.len(), 1);
        assert_eq!(races[0].track_id, "cota");
        assert_eq!(races[0].race_id, "cota-race-1");
        assert!(races[0].weather_path.is_none());

        let telemetry = load_race(&races[0]).unwrap();
        assert!(!telemetry.has_weather_file);
        assert!(telemetry.weather.is_empty());
        assert_eq!(telemetry.laps.len(), 4);
    }

    #[test]
    fn race_without_sections_file_fails() {
        let source = RaceSource {
            track_id: "barber".to_string(),
            track_folder: "barber".to_string(),
            race_number: 9,
            race_id: "barber-race-9".to_string(),
            race_dir: PathBuf::from("/nonexistent"),
            sections_path: None,
            weather_path: None,
        };
        assert!(matches!(load_race(&source), Err(Error::MissingSectionsFileError { .. })));
    }
}
