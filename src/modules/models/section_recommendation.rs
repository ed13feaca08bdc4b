use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::debug;

use crate::models::SectionRecommendationDoc;
use crate::modules::helpers::track::compare_section_names;
use crate::modules::models::general::{from_body, now, to_body};
use crate::schema::section_recommendations;

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = section_recommendations)]
pub struct NewSectionRecommendation {
    pub doc_id: String,
    pub track_id: String,
    pub race_id: String,
    pub driver_id: String,
    pub section_name: String,
    pub body: String,
    pub updated_at: NaiveDateTime,
}

#[derive(Queryable, PartialEq, Debug, Clone)]
pub struct SectionRecommendation {
    pub doc_id: String,
    pub track_id: String,
    pub race_id: String,
    pub driver_id: String,
    pub section_name: String,
    pub body: String,
    pub updated_at: NaiveDateTime,
}

/// Optional key filters, `None` matches everything.
#[derive(Debug, Clone, Default)]
pub struct SectionFilter<'a> {
    pub race_id: Option<&'a str>,
    pub driver_id: Option<&'a str>,
    pub section_name: Option<&'a str>,
}

impl SectionRecommendation {
    pub fn doc_id(doc: &SectionRecommendationDoc) -> String {
        format!("race_{}_driver_{}_{}", doc.race_id, doc.driver_id, doc.section_name)
    }

    /************ INSERTERS ************/
    /// # replace the section recommendations of a race
    /// removes every stored recommendation of the race before inserting the
    /// new set. run inside a transaction.
    ///
    /// ## Arguments
    /// * `conn` - The database connection to use
    /// * `race_id_in` - The race the recommendations belong to
    /// * `docs` - The complete new set for the race
    pub fn replace_for_race(
        conn: &mut SqliteConnection,
        race_id_in: &str,
        docs: &[SectionRecommendationDoc],
    ) -> QueryResult<usize> {
        SectionRecommendation::delete_for_race(conn, race_id_in)?;

        let rows = docs
            .iter()
            .map(|doc| {
                Ok(NewSectionRecommendation {
                    doc_id: SectionRecommendation::doc_id(doc),
                    track_id: doc.track_id.clone(),
                    race_id: doc.race_id.clone(),
                    driver_id: doc.driver_id.clone(),
                    section_name: doc.section_name.clone(),
                    body: to_body(doc)?,
                    updated_at: now(),
                })
            })
            .collect::<QueryResult<Vec<NewSectionRecommendation>>>()?;

        let inserted = diesel::insert_into(section_recommendations::table)
            .values(&rows)
            .execute(conn)?;

        debug!(target: "models/section_recommendation:replace_for_race", "stored {} section recommendations for {}", inserted, race_id_in);
        Ok(inserted)
    }

    pub fn delete_for_race(conn: &mut SqliteConnection, race_id_in: &str) -> QueryResult<usize> {
        use crate::schema::section_recommendations::dsl::*;
        diesel::delete(section_recommendations.filter(race_id.eq(race_id_in))).execute(conn)
    }

    /************ GETTERS ************/
    /// # search section recommendations
    /// ordered by race, driver and section number
    pub fn search(conn: &mut SqliteConnection, filter: &SectionFilter) -> QueryResult<Vec<SectionRecommendationDoc>> {
        use crate::schema::section_recommendations::dsl::*;

        let mut query = section_recommendations.into_boxed();
        if let Some(race) = filter.race_id {
            query = query.filter(race_id.eq(race));
        }
        if let Some(driver) = filter.driver_id {
            query = query.filter(driver_id.eq(driver));
        }
        if let Some(section) = filter.section_name {
            query = query.filter(section_name.eq(section));
        }

        let mut docs = query
            .order((race_id.asc(), driver_id.asc()))
            .load::<SectionRecommendation>(conn)?
            .iter()
            .map(SectionRecommendation::document)
            .collect::<QueryResult<Vec<SectionRecommendationDoc>>>()?;

        docs.sort_by(|a, b| {
            a.race_id
                .cmp(&b.race_id)
                .then_with(|| a.driver_id.cmp(&b.driver_id))
                .then_with(|| compare_section_names(&a.section_name, &b.section_name))
        });
        Ok(docs)
    }

    pub fn from_driver(
        conn: &mut SqliteConnection,
        race_id_in: &str,
        driver_id_in: &str,
    ) -> QueryResult<Vec<SectionRecommendationDoc>> {
        SectionRecommendation::search(
            conn,
            &SectionFilter {
                race_id: Some(race_id_in),
                driver_id: Some(driver_id_in),
                section_name: None,
            },
        )
    }

    pub fn document(&self) -> QueryResult<SectionRecommendationDoc> {
        from_body(&self.body)
    }
}
