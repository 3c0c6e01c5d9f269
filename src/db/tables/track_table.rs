//! Track table operations

use chrono::{DateTime, Utc};

use crate::db::DbEngine;
use crate::error::Result;
use crate::models::Track;

const ORDER: &str = r#"ORDER BY release_date, "release", disc_num, track_num"#;

/// Track table operations
pub struct TrackTable;

impl TrackTable {
    pub async fn get_by_id(db: &DbEngine, id: i64) -> Result<Option<Track>> {
        let pool = db.pool();

        let track = sqlx::query_as("SELECT * FROM tracks WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(track)
    }

    pub async fn get_by_uuid(db: &DbEngine, uuid: &str) -> Result<Option<Track>> {
        let pool = db.pool();

        let track = sqlx::query_as("SELECT * FROM tracks WHERE uuid = ?")
            .bind(uuid)
            .fetch_optional(pool)
            .await?;

        Ok(track)
    }

    pub async fn get_by_key(db: &DbEngine, key: &str) -> Result<Option<Track>> {
        let pool = db.pool();

        let track = sqlx::query_as("SELECT * FROM tracks WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

        Ok(track)
    }

    pub async fn get_by_etag(db: &DbEngine, etag: &str) -> Result<Option<Track>> {
        let pool = db.pool();

        let track = sqlx::query_as("SELECT * FROM tracks WHERE etag = ? LIMIT 1")
            .bind(etag)
            .fetch_optional(pool)
            .await?;

        Ok(track)
    }

    /// Any track of a recording
    pub async fn get_by_rid(db: &DbEngine, rid: &str) -> Result<Option<Track>> {
        let pool = db.pool();

        let track = sqlx::query_as("SELECT * FROM tracks WHERE rid = ? LIMIT 1")
            .bind(rid)
            .fetch_optional(pool)
            .await?;

        Ok(track)
    }

    /// Tracks by row id, in the order of `ids`; unknown ids are skipped
    pub async fn get_by_ids(db: &DbEngine, ids: &[i64]) -> Result<Vec<Track>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let pool = db.pool();

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT * FROM tracks WHERE id IN ({})", placeholders);
        let mut query = sqlx::query_as::<_, Track>(&sql);
        for id in ids {
            query = query.bind(id);
        }
        let mut tracks = query.fetch_all(pool).await?;

        tracks.sort_by_key(|t| ids.iter().position(|id| *id == t.id));
        Ok(tracks)
    }

    /// All tracks of an artist in release order
    pub async fn for_artist(db: &DbEngine, artist: &str) -> Result<Vec<Track>> {
        let pool = db.pool();

        let tracks = sqlx::query_as(&format!("SELECT * FROM tracks WHERE artist = ? {}", ORDER))
            .bind(artist)
            .fetch_all(pool)
            .await?;

        Ok(tracks)
    }

    /// Tracks of a release in disc and track order
    pub async fn for_release(db: &DbEngine, reid: &str) -> Result<Vec<Track>> {
        let pool = db.pool();

        let tracks = sqlx::query_as("SELECT * FROM tracks WHERE reid = ? ORDER BY disc_num, track_num")
            .bind(reid)
            .fetch_all(pool)
            .await?;

        Ok(tracks)
    }

    /// One track per popular title of an artist, by rank
    pub async fn popular(db: &DbEngine, artist: &str, limit: i64) -> Result<Vec<Track>> {
        let pool = db.pool();

        let tracks = sqlx::query_as(
            r#"SELECT t.* FROM popular p
               JOIN tracks t ON t.artist = p.artist AND t.title = p.title COLLATE NOCASE
               WHERE p.artist = ?
               GROUP BY p.rank ORDER BY p.rank LIMIT ?"#,
        )
        .bind(artist)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(tracks)
    }

    /// Tracks from releases typed as singles
    pub async fn singles(db: &DbEngine, artist: &str) -> Result<Vec<Track>> {
        let pool = db.pool();

        let tracks = sqlx::query_as(
            r#"SELECT t.* FROM tracks t JOIN releases r ON r.reid = t.reid
               WHERE t.artist = ? AND r.type = 'Single'
               ORDER BY t.release_date, t.disc_num, t.track_num"#,
        )
        .bind(artist)
        .fetch_all(pool)
        .await?;

        Ok(tracks)
    }

    /// Random tracks drawn from several artists
    pub async fn random_for_artists(db: &DbEngine, artists: &[String], limit: i64) -> Result<Vec<Track>> {
        if artists.is_empty() {
            return Ok(vec![]);
        }
        let pool = db.pool();

        let placeholders = vec!["?"; artists.len()].join(", ");
        let sql = format!(
            "SELECT * FROM tracks WHERE artist IN ({}) ORDER BY random() LIMIT ?",
            placeholders
        );
        let mut query = sqlx::query_as::<_, Track>(&sql);
        for artist in artists {
            query = query.bind(artist);
        }
        let tracks = query.bind(limit).fetch_all(pool).await?;

        Ok(tracks)
    }

    /// Newest additions first
    pub async fn recently_added(db: &DbEngine, limit: i64) -> Result<Vec<Track>> {
        let pool = db.pool();

        let tracks = sqlx::query_as("SELECT * FROM tracks ORDER BY last_modified DESC LIMIT ?")
            .bind(limit)
            .fetch_all(pool)
            .await?;

        Ok(tracks)
    }

    /// Tracks not yet bound to a recording
    pub async fn unresolved(db: &DbEngine) -> Result<Vec<Track>> {
        let pool = db.pool();

        let tracks = sqlx::query_as(&format!("SELECT * FROM tracks WHERE rid = '' {}", ORDER))
            .fetch_all(pool)
            .await?;

        Ok(tracks)
    }

    pub async fn count(db: &DbEngine) -> Result<i64> {
        let pool = db.pool();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tracks")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Modification time of the newest stored track
    pub async fn last_modified(db: &DbEngine) -> Result<Option<DateTime<Utc>>> {
        let pool = db.pool();

        let last: Option<DateTime<Utc>> = sqlx::query_scalar("SELECT MAX(last_modified) FROM tracks")
            .fetch_one(pool)
            .await?;

        Ok(last)
    }

    pub async fn insert(db: &DbEngine, track: &Track) -> Result<i64> {
        let pool = db.pool();

        let result = sqlx::query(
            r#"INSERT INTO tracks (uuid, artist, "release", title, track_num, disc_num, track_count,
                   disc_count, rid, rgid, reid, release_date, key, size, etag, last_modified)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&track.uuid)
        .bind(&track.artist)
        .bind(&track.release)
        .bind(&track.title)
        .bind(track.track_num)
        .bind(track.disc_num)
        .bind(track.track_count)
        .bind(track.disc_count)
        .bind(&track.rid)
        .bind(&track.rgid)
        .bind(&track.reid)
        .bind(track.release_date)
        .bind(&track.key)
        .bind(track.size)
        .bind(&track.etag)
        .bind(track.last_modified)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Update a track in place by storage key; the uuid never changes
    pub async fn update(db: &DbEngine, track: &Track) -> Result<()> {
        let pool = db.pool();

        sqlx::query(
            r#"UPDATE tracks SET artist = ?, "release" = ?, title = ?, track_num = ?, disc_num = ?,
                   track_count = ?, disc_count = ?, rid = ?, rgid = ?, reid = ?, release_date = ?,
                   size = ?, etag = ?, last_modified = ?
               WHERE key = ?"#,
        )
        .bind(&track.artist)
        .bind(&track.release)
        .bind(&track.title)
        .bind(track.track_num)
        .bind(track.disc_num)
        .bind(track.track_count)
        .bind(track.disc_count)
        .bind(&track.rid)
        .bind(&track.rgid)
        .bind(&track.reid)
        .bind(track.release_date)
        .bind(track.size)
        .bind(&track.etag)
        .bind(track.last_modified)
        .bind(&track.key)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn delete_by_key(db: &DbEngine, key: &str) -> Result<()> {
        let pool = db.pool();

        sqlx::query("DELETE FROM tracks WHERE key = ?")
            .bind(key)
            .execute(pool)
            .await?;

        Ok(())
    }
}
