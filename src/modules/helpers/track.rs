use std::cmp::Ordering;
use std::sync::OnceLock;

use inflections::case::{to_kebab_case, to_title_case};
use regex::Regex;

use crate::models::TrackDoc;

pub struct KnownTrack {
    pub track_id: &'static str,
    pub name: &'static str,
    pub abbreviation: &'static str,
}

pub const KNOWN_TRACKS: [KnownTrack; 7] = [
    KnownTrack { track_id: "barber", name: "Barber Motorsports Park", abbreviation: "barber" },
    KnownTrack { track_id: "cota", name: "Circuit of the Americas", abbreviation: "cota" },
    KnownTrack { track_id: "indianapolis", name: "Indianapolis Motor Speedway", abbreviation: "indy" },
    KnownTrack { track_id: "road-america", name: "Road America", abbreviation: "road-america" },
    KnownTrack { track_id: "sebring", name: "Sebring International Raceway", abbreviation: "sebring" },
    KnownTrack { track_id: "sonoma", name: "Sonoma Raceway", abbreviation: "sonoma" },
    KnownTrack {
        track_id: "virginia-international-raceway",
        name: "Virginia International Raceway",
        abbreviation: "vir",
    },
];

static RACE_FOLDER: OnceLock<Option<Regex>> = OnceLock::new();
static SECTION_COLUMN: OnceLock<Option<Regex>> = OnceLock::new();

const TRACK_ALIASES: [(&str, &str); 5] = [
    ("indy", "indianapolis"),
    ("vir", "virginia-international-raceway"),
    ("indianapolis motor speedway", "indianapolis"),
    ("virginia international raceway", "virginia-international-raceway"),
    ("circuit of the americas", "cota"),
];

/// # normalize a track folder or alias to a track id
/// known tracks and aliases map to their id, anything else becomes a
/// kebab case slug of the name.
pub fn normalize_track_id(name: &str) -> String {
    let lowered = name.trim().to_lowercase();

    if let Some(known) = KNOWN_TRACKS.iter().find(|track| track.track_id == lowered) {
        return known.track_id.to_string();
    }
    if let Some((_, track_id)) = TRACK_ALIASES.iter().find(|(alias, _)| *alias == lowered) {
        return track_id.to_string();
    }

    to_kebab_case(&lowered)
}

pub fn track_document(track_id: &str, race_count: usize) -> TrackDoc {
    match KNOWN_TRACKS.iter().find(|track| track.track_id == track_id) {
        Some(known) => TrackDoc {
            track_id: known.track_id.to_string(),
            name: known.name.to_string(),
            abbreviation: known.abbreviation.to_string(),
            race_count,
        },
        None => TrackDoc {
            track_id: track_id.to_string(),
            name: to_title_case(track_id),
            abbreviation: track_id.to_string(),
            race_count,
        },
    }
}

/// race number of a `Race <n>` folder name
pub fn parse_race_folder(folder_name: &str) -> Option<u32> {
    let re = RACE_FOLDER
        .get_or_init(|| Regex::new(r"(?i)^race[ _-]*(\d+)$").ok())
        .as_ref()?;
    re.captures(folder_name.trim())?.get(1)?.as_str().parse().ok()
}

pub fn race_id(track_id: &str, race_number: u32) -> String {
    format!("{}-race-{}", track_id, race_number)
}

/// section number of an `S<k>` column header, `S1_LARGE` and friends are not sections
pub fn parse_section_column(column: &str) -> Option<u32> {
    let re = SECTION_COLUMN
        .get_or_init(|| Regex::new(r"(?i)^s(\d+)$").ok())
        .as_ref()?;
    re.captures(column.trim())?.get(1)?.as_str().parse().ok()
}

pub fn section_name(section_number: u32) -> String {
    format!("Section {}", section_number)
}

/// `Section <k>` names by section number, any other name after them by text
pub fn compare_section_names(a: &str, b: &str) -> Ordering {
    let number = |name: &str| name.strip_prefix("Section ").and_then(|k| k.trim().parse::<u32>().ok());
    match (number(a), number(b)) {
        (Some(a_number), Some(b_number)) => a_number.cmp(&b_number).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}
