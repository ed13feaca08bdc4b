use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::models::RaceDoc;
use crate::modules::models::general::{from_body, now, to_body};
use crate::schema::races;

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = races)]
pub struct NewRace {
    pub race_id: String,
    pub track_id: String,
    pub body: String,
    pub updated_at: NaiveDateTime,
}

#[derive(Queryable, Identifiable, PartialEq, Debug, Clone)]
#[diesel(table_name = races, primary_key(race_id))]
pub struct Race {
    pub race_id: String,
    pub track_id: String,
    pub body: String,
    pub updated_at: NaiveDateTime,
}

impl Race {
    /************ INSERTERS ************/
    pub fn replace(conn: &mut SqliteConnection, doc: &RaceDoc) -> QueryResult<usize> {
        let new_race = NewRace {
            race_id: doc.race_id.clone(),
            track_id: doc.track_id.clone(),
            body: to_body(doc)?,
            updated_at: now(),
        };

        diesel::replace_into(races::table)
            .values(&new_race)
            .execute(conn)
    }

    pub fn delete_id(conn: &mut SqliteConnection, race_id_in: &str) -> QueryResult<usize> {
        use crate::schema::races::dsl::*;
        diesel::delete(races.filter(race_id.eq(race_id_in))).execute(conn)
    }

    /************ GETTERS ************/
    /// # get all races of a track
    /// ordered by race number
    pub fn from_track(conn: &mut SqliteConnection, track_id_in: &str) -> QueryResult<Vec<RaceDoc>> {
        use crate::schema::races::dsl::*;

        let mut docs = races
            .filter(track_id.eq(track_id_in))
            .load::<Race>(conn)?
            .iter()
            .map(Race::document)
            .collect::<QueryResult<Vec<RaceDoc>>>()?;

        docs.sort_by(|a, b| a.race_number.cmp(&b.race_number).then_with(|| a.race_id.cmp(&b.race_id)));
        Ok(docs)
    }

    pub fn get_by_id(conn: &mut SqliteConnection, race_id_in: &str) -> QueryResult<Option<RaceDoc>> {
        use crate::schema::races::dsl::*;

        races
            .filter(race_id.eq(race_id_in))
            .first::<Race>(conn)
            .optional()?
            .map(|race| race.document())
            .transpose()
    }

    pub fn document(&self) -> QueryResult<RaceDoc> {
        from_body(&self.body)
    }
}
