use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::models::PatternRecommendationDoc;
use crate::modules::models::general::{from_body, now, to_body};
use crate::schema::pattern_recommendations;

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = pattern_recommendations)]
pub struct NewPatternRecommendation {
    pub doc_id: String,
    pub track_id: String,
    pub race_id: String,
    pub driver_id: String,
    pub body: String,
    pub updated_at: NaiveDateTime,
}

#[derive(Queryable, PartialEq, Debug, Clone)]
pub struct PatternRecommendation {
    pub doc_id: String,
    pub track_id: String,
    pub race_id: String,
    pub driver_id: String,
    pub body: String,
    pub updated_at: NaiveDateTime,
}

impl PatternRecommendation {
    pub fn doc_id(doc: &PatternRecommendationDoc) -> String {
        format!("race_{}_driver_{}_pattern_analysis", doc.race_id, doc.driver_id)
    }

    /************ INSERTERS ************/
    pub fn replace_for_race(
        conn: &mut SqliteConnection,
        race_id_in: &str,
        docs: &[PatternRecommendationDoc],
    ) -> QueryResult<usize> {
        PatternRecommendation::delete_for_race(conn, race_id_in)?;

        let rows = docs
            .iter()
            .map(|doc| {
                Ok(NewPatternRecommendation {
                    doc_id: PatternRecommendation::doc_id(doc),
                    track_id: doc.track_id.clone(),
                    race_id: doc.race_id.clone(),
                    driver_id: doc.driver_id.clone(),
                    body: to_body(doc)?,
                    updated_at: now(),
                })
            })
            .collect::<QueryResult<Vec<NewPatternRecommendation>>>()?;

        diesel::insert_into(pattern_recommendations::table)
            .values(&rows)
            .execute(conn)
    }

    pub fn delete_for_race(conn: &mut SqliteConnection, race_id_in: &str) -> QueryResult<usize> {
        use crate::schema::pattern_recommendations::dsl::*;
        diesel::delete(pattern_recommendations.filter(race_id.eq(race_id_in))).execute(conn)
    }

    /************ GETTERS ************/
    pub fn search(
        conn: &mut SqliteConnection,
        race_id_in: Option<&str>,
        driver_id_in: Option<&str>,
    ) -> QueryResult<Vec<PatternRecommendationDoc>> {
        use crate::schema::pattern_recommendations::dsl::*;

        let mut query = pattern_recommendations.into_boxed();
        if let Some(race) = race_id_in {
            query = query.filter(race_id.eq(race));
        }
        if let Some(driver) = driver_id_in {
            query = query.filter(driver_id.eq(driver));
        }

        query
            .order((race_id.asc(), driver_id.asc()))
            .load::<PatternRecommendation>(conn)?
            .iter()
            .map(PatternRecommendation::document)
            .collect()
    }

    pub fn from_driver(
        conn: &mut SqliteConnection,
        race_id_in: &str,
        driver_id_in: &str,
    ) -> QueryResult<Option<PatternRecommendationDoc>> {
        Ok(PatternRecommendation::search(conn, Some(race_id_in), Some(driver_id_in))?
            .into_iter()
            .next())
    }

    pub fn document(&self) -> QueryResult<PatternRecommendationDoc> {
        from_body(&self.body)
    }
}
