use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::error;

use crate::models::TrackDoc;
use crate::modules::models::general::{from_body, now, to_body};
use crate::schema::tracks;

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = tracks)]
pub struct NewTrack {
    pub track_id: String,
    pub body: String,
    pub updated_at: NaiveDateTime,
}

#[derive(Queryable, Identifiable, PartialEq, Debug, Clone)]
#[diesel(table_name = tracks, primary_key(track_id))]
pub struct Track {
    pub track_id: String,
    pub body: String,
    pub updated_at: NaiveDateTime,
}

impl Track {
    /************ INSERTERS ************/
    /// # store a track
    /// replaces the stored track with the same id
    pub fn replace(conn: &mut SqliteConnection, doc: &TrackDoc) -> QueryResult<usize> {
        let new_track = NewTrack {
            track_id: doc.track_id.clone(),
            body: to_body(doc)?,
            updated_at: now(),
        };

        diesel::replace_into(tracks::table)
            .values(&new_track)
            .execute(conn)
            .map_err(|error| {
                error!(target: "models/track:replace", "Error storing track {}: {}", doc.track_id, error);
                error
            })
    }

    /************ GETTERS ************/
    pub fn get_all(conn: &mut SqliteConnection) -> QueryResult<Vec<TrackDoc>> {
        use crate::schema::tracks::dsl::*;

        tracks
            .order(track_id.asc())
            .load::<Track>(conn)?
            .iter()
            .map(Track::document)
            .collect()
    }

    pub fn get_by_id(conn: &mut SqliteConnection, track_id_in: &str) -> QueryResult<Option<TrackDoc>> {
        use crate::schema::tracks::dsl::*;

        tracks
            .filter(track_id.eq(track_id_in))
            .first::<Track>(conn)
            .optional()?
            .map(|track| track.document())
            .transpose()
    }

    pub fn document(&self) -> QueryResult<TrackDoc> {
        from_body(&self.body)
    }
}
