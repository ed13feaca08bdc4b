use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::models::CoachingInsightDoc;
use crate::modules::models::general::{from_body, now, to_body};
use crate::schema::coaching_insights;

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = coaching_insights)]
pub struct NewCoachingInsight {
    pub doc_id: String,
    pub track_id: String,
    pub race_id: String,
    pub driver_id: String,
    pub body: String,
    pub updated_at: NaiveDateTime,
}

#[derive(Queryable, PartialEq, Debug, Clone)]
pub struct CoachingInsight {
    pub doc_id: String,
    pub track_id: String,
    pub race_id: String,
    pub driver_id: String,
    pub body: String,
    pub updated_at: NaiveDateTime,
}

impl CoachingInsight {
    pub fn doc_id(doc: &CoachingInsightDoc) -> String {
        format!("race_{}_driver_{}", doc.race_id, doc.driver_id)
    }

    /************ INSERTERS ************/
    pub fn replace_for_race(
        conn: &mut SqliteConnection,
        race_id_in: &str,
        docs: &[CoachingInsightDoc],
    ) -> QueryResult<usize> {
        CoachingInsight::delete_for_race(conn, race_id_in)?;

        let rows = docs
            .iter()
            .map(|doc| {
                Ok(NewCoachingInsight {
                    doc_id: CoachingInsight::doc_id(doc),
                    track_id: doc.track_id.clone(),
                    race_id: doc.race_id.clone(),
                    driver_id: doc.driver_id.clone(),
                    body: to_body(doc)?,
                    updated_at: now(),
                })
            })
            .collect::<QueryResult<Vec<NewCoachingInsight>>>()?;

        diesel::insert_into(coaching_insights::table)
            .values(&rows)
            .execute(conn)
    }

    pub fn delete_for_race(conn: &mut SqliteConnection, race_id_in: &str) -> QueryResult<usize> {
        use crate::schema::coaching_insights::dsl::*;
        diesel::delete(coaching_insights.filter(race_id.eq(race_id_in))).execute(conn)
    }

    /************ GETTERS ************/
    pub fn search(
        conn: &mut SqliteConnection,
        race_id_in: Option<&str>,
        driver_id_in: Option<&str>,
    ) -> QueryResult<Vec<CoachingInsightDoc>> {
        use crate::schema::coaching_insights::dsl::*;

        let mut query = coaching_insights.into_boxed();
        if let Some(race) = race_id_in {
            query = query.filter(race_id.eq(race));
        }
        if let Some(driver) = driver_id_in {
            query = query.filter(driver_id.eq(driver));
        }

        query
            .order((race_id.asc(), driver_id.asc()))
            .load::<CoachingInsight>(conn)?
            .iter()
            .map(CoachingInsight::document)
            .collect()
    }

    pub fn from_driver(
        conn: &mut SqliteConnection,
        race_id_in: &str,
        driver_id_in: &str,
    ) -> QueryResult<Option<CoachingInsightDoc>> {
        Ok(CoachingInsight::search(conn, Some(race_id_in), Some(driver_id_in))?
            .into_iter()
            .next())
    }

    pub fn document(&self) -> QueryResult<CoachingInsightDoc> {
        from_body(&self.body)
    }
}
