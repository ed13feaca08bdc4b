use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::models::{CompositeDoc, CompositeScope};
use crate::modules::models::general::{from_body, now, to_body};
use crate::schema::best_case_composites;

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = best_case_composites)]
pub struct NewComposite {
    pub doc_id: String,
    pub track_id: String,
    pub race_id: Option<String>,
    pub scope: String,
    pub body: String,
    pub updated_at: NaiveDateTime,
}

#[derive(Queryable, PartialEq, Debug, Clone)]
pub struct Composite {
    pub doc_id: String,
    pub track_id: String,
    pub race_id: Option<String>,
    pub scope: String,
    pub body: String,
    pub updated_at: NaiveDateTime,
}

fn scope_name(scope: CompositeScope) -> &'static str {
    match scope {
        CompositeScope::Race => "race",
        CompositeScope::Track => "track",
    }
}

impl Composite {
    pub fn doc_id(doc: &CompositeDoc) -> String {
        match &doc.race_id {
            Some(race_id) => format!("track_{}_race_{}", doc.track_id, race_id),
            None => format!("track_{}", doc.track_id),
        }
    }

    /************ INSERTERS ************/
    /// # store a composite
    /// a race composite replaces the composite of that race, a track
    /// composite replaces the track wide one.
    pub fn replace(conn: &mut SqliteConnection, doc: &CompositeDoc) -> QueryResult<usize> {
        let new_composite = NewComposite {
            doc_id: Composite::doc_id(doc),
            track_id: doc.track_id.clone(),
            race_id: doc.race_id.clone(),
            scope: scope_name(doc.scope).to_string(),
            body: to_body(doc)?,
            updated_at: now(),
        };

        diesel::replace_into(best_case_composites::table)
            .values(&new_composite)
            .execute(conn)
    }

    pub fn delete_for_race(conn: &mut SqliteConnection, race_id_in: &str) -> QueryResult<usize> {
        use crate::schema::best_case_composites::dsl::*;
        diesel::delete(best_case_composites.filter(race_id.eq(race_id_in))).execute(conn)
    }

    /************ GETTERS ************/
    /// # get the best case composite
    /// the race composite when `race_id_in` is given, the track wide
    /// composite otherwise.
    pub fn get(
        conn: &mut SqliteConnection,
        track_id_in: &str,
        race_id_in: Option<&str>,
    ) -> QueryResult<Option<CompositeDoc>> {
        use crate::schema::best_case_composites::dsl::*;

        let query = best_case_composites
            .filter(track_id.eq(track_id_in))
            .into_boxed();

        let query = match race_id_in {
            Some(race) => query.filter(race_id.eq(race)),
            None => query.filter(scope.eq(scope_name(CompositeScope::Track))),
        };

        query
            .first::<Composite>(conn)
            .optional()?
            .map(|composite| composite.document())
            .transpose()
    }

    pub fn document(&self) -> QueryResult<CompositeDoc> {
        from_body(&self.body)
    }
}
