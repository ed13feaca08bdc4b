use std::str::FromStr;

use log::error;
use rocket::get;
use rocket::http::uri::Origin;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;

use crate::macros::database_error_handeler::{db_connection_http, db_handle_get_error_http};
use crate::macros::request_caching::{cache_response, read_cache_request};
use crate::models::Document;
use crate::modules::models::coaching_insight::CoachingInsight;
use crate::modules::models::general::establish_connection;
use crate::modules::models::pattern_recommendation::PatternRecommendation;
use crate::modules::models::section_recommendation::{SectionFilter, SectionRecommendation};
use crate::modules::models::weather_recommendation::WeatherRecommendation;
use crate::server::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationKind {
    Section,
    Weather,
    Pattern,
    Coaching,
}

impl FromStr for RecommendationKind {
    type Err = String;

    fn from_str(kind: &str) -> Result<Self, Self::Err> {
        match kind.trim().to_lowercase().as_str() {
            "section" | "section_recommendation" => Ok(RecommendationKind::Section),
            "weather" | "weather_recommendation" => Ok(RecommendationKind::Weather),
            "pattern" | "pattern_recommendation" => Ok(RecommendationKind::Pattern),
            "coaching" | "coaching_insight" => Ok(RecommendationKind::Coaching),
            other => Err(format!("unknown recommendation kind {}", other)),
        }
    }
}

/// Query filters of the recommendation search. `None` matches everything.
#[derive(Debug, Clone, Default)]
pub struct RecommendationQuery<'a> {
    pub driver_id: Option<&'a str>,
    pub race_id: Option<&'a str>,
    pub section: Option<&'a str>,
    pub kind: Option<RecommendationKind>,
}

impl RecommendationQuery<'_> {
    /// a kind without the filtered key never matches the filter
    pub fn includes(&self, kind: RecommendationKind) -> bool {
        if self.kind.map_or(false, |wanted| wanted != kind) {
            return false;
        }

        match kind {
            RecommendationKind::Section => true,
            RecommendationKind::Weather => self.driver_id.is_none() && self.section.is_none(),
            RecommendationKind::Pattern | RecommendationKind::Coaching => self.section.is_none(),
        }
    }
}

/**************************************************************************************************/
/**************** ROUTES **************************************************************************/
/**************************************************************************************************/

/// # search the recommendations
/// section, weather, pattern and coaching documents in that order.
#[get("/recommendations?<driver_id>&<race_id>&<section>&<kind>")]
pub fn search(
    driver_id: Option<&str>,
    race_id: Option<&str>,
    section: Option<&str>,
    kind: Option<&str>,
    state: &State<AppState>,
    origin: &Origin,
) -> Result<Json<Vec<Document>>, Status> {
    let kind = match kind.map(RecommendationKind::from_str).transpose() {
        Ok(kind) => kind,
        Err(_) => return Err(Status::BadRequest),
    };
    let query = RecommendationQuery {
        driver_id,
        race_id,
        section,
        kind,
    };

    read_cache_request!(state.cache, origin);

    let target = "routes/api/recommendation:search";
    let conn = &mut db_connection_http!(state, target);
    let mut documents = Vec::new();

    if query.includes(RecommendationKind::Section) {
        let filter = SectionFilter {
            race_id,
            driver_id,
            section_name: section,
        };
        let sections = db_handle_get_error_http!(SectionRecommendation::search(conn, &filter), target, "section recommendations");
        documents.extend(sections.into_iter().map(Document::SectionRecommendation));
    }
    if query.includes(RecommendationKind::Weather) {
        let weather = db_handle_get_error_http!(WeatherRecommendation::search(conn, race_id), target, "weather recommendations");
        documents.extend(weather.into_iter().map(Document::WeatherRecommendation));
    }
    if query.includes(RecommendationKind::Pattern) {
        let patterns = db_handle_get_error_http!(PatternRecommendation::search(conn, race_id, driver_id), target, "pattern recommendations");
        documents.extend(patterns.into_iter().map(Document::PatternRecommendation));
    }
    if query.includes(RecommendationKind::Coaching) {
        let insights = db_handle_get_error_http!(CoachingInsight::search(conn, race_id, driver_id), target, "coaching insights");
        documents.extend(insights.into_iter().map(Document::CoachingInsight));
    }

    cache_response!(state.cache, origin, documents);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kinds() {
        assert_eq!("Weather".parse::<RecommendationKind>(), Ok(RecommendationKind::Weather));
        assert_eq!("coaching_insight".parse::<RecommendationKind>(), Ok(RecommendationKind::Coaching));
        assert!("lap".parse::<RecommendationKind>().is_err());
    }

    #[test]
    fn filters_exclude_kinds_without_the_key() {
        let by_section = RecommendationQuery {
            section: Some("Section 1"),
            ..Default::default()
        };
        assert!(by_section.includes(RecommendationKind::Section));
        assert!(!by_section.includes(RecommendationKind::Weather));
        assert!(!by_section.includes(RecommendationKind::Pattern));

        let by_driver = RecommendationQuery {
            driver_id: Some("7"),
            ..Default::default()
        };
        assert!(!by_driver.includes(RecommendationKind::Weather));
        assert!(by_driver.includes(RecommendationKind::Coaching));

        let weather_only = RecommendationQuery {
            kind: Some(RecommendationKind::Weather),
            ..Default::default()
        };
        assert!(weather_only.includes(RecommendationKind::Weather));
        assert!(!weather_only.includes(RecommendationKind::Section));
    }
}
