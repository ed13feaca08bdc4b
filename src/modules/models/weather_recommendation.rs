use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::models::WeatherRecommendationDoc;
use crate::modules::models::general::{from_body, now, to_body};
use crate::schema::weather_recommendations;

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = weather_recommendations)]
pub struct NewWeatherRecommendation {
    pub doc_id: String,
    pub track_id: String,
    pub race_id: String,
    pub body: String,
    pub updated_at: NaiveDateTime,
}

#[derive(Queryable, PartialEq, Debug, Clone)]
pub struct WeatherRecommendation {
    pub doc_id: String,
    pub track_id: String,
    pub race_id: String,
    pub body: String,
    pub updated_at: NaiveDateTime,
}

impl WeatherRecommendation {
    pub fn doc_id(race_id: &str) -> String {
        format!("race_{}_weather_impact", race_id)
    }

    /************ INSERTERS ************/
    pub fn replace_for_race(conn: &mut SqliteConnection, doc: &WeatherRecommendationDoc) -> QueryResult<usize> {
        WeatherRecommendation::delete_for_race(conn, &doc.race_id)?;

        let new_recommendation = NewWeatherRecommendation {
            doc_id: WeatherRecommendation::doc_id(&doc.race_id),
            track_id: doc.track_id.clone(),
            race_id: doc.race_id.clone(),
            body: to_body(doc)?,
            updated_at: now(),
        };

        diesel::insert_into(weather_recommendations::table)
            .values(&new_recommendation)
            .execute(conn)
    }

    pub fn delete_for_race(conn: &mut SqliteConnection, race_id_in: &str) -> QueryResult<usize> {
        use crate::schema::weather_recommendations::dsl::*;
        diesel::delete(weather_recommendations.filter(race_id.eq(race_id_in))).execute(conn)
    }

    /************ GETTERS ************/
    pub fn from_race(conn: &mut SqliteConnection, race_id_in: &str) -> QueryResult<Option<WeatherRecommendationDoc>> {
        use crate::schema::weather_recommendations::dsl::*;

        weather_recommendations
            .filter(race_id.eq(race_id_in))
            .first::<WeatherRecommendation>(conn)
            .optional()?
            .map(|recommendation| recommendation.document())
            .transpose()
    }

    pub fn search(conn: &mut SqliteConnection, race_id_in: Option<&str>) -> QueryResult<Vec<WeatherRecommendationDoc>> {
        use crate::schema::weather_recommendations::dsl::*;

        let mut query = weather_recommendations.into_boxed();
        if let Some(race) = race_id_in {
            query = query.filter(race_id.eq(race));
        }

        query
            .order(race_id.asc())
            .load::<WeatherRecommendation>(conn)?
            .iter()
            .map(WeatherRecommendation::document)
            .collect()
    }

    pub fn document(&self) -> QueryResult<WeatherRecommendationDoc> {
        from_body(&self.body)
    }
}
