//! Release table operations

use crate::db::DbEngine;
use crate::error::Result;
use crate::models::Release;

/// Release table operations
pub struct ReleaseTable;

impl ReleaseTable {
    pub async fn all(db: &DbEngine) -> Result<Vec<Release>> {
        let pool = db.pool();

        let releases = sqlx::query_as("SELECT * FROM releases ORDER BY artist, date")
            .fetch_all(pool)
            .await?;

        Ok(releases)
    }

    pub async fn get_by_id(db: &DbEngine, id: i64) -> Result<Option<Release>> {
        let pool = db.pool();

        let release = sqlx::query_as("SELECT * FROM releases WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(release)
    }

    pub async fn get_by_reid(db: &DbEngine, reid: &str) -> Result<Option<Release>> {
        let pool = db.pool();

        let release = sqlx::query_as("SELECT * FROM releases WHERE reid = ?")
            .bind(reid)
            .fetch_optional(pool)
            .await?;

        Ok(release)
    }

    /// Any stored release of a release group
    pub async fn get_by_rgid(db: &DbEngine, rgid: &str) -> Result<Option<Release>> {
        let pool = db.pool();

        let release = sqlx::query_as("SELECT * FROM releases WHERE rgid = ? LIMIT 1")
            .bind(rgid)
            .fetch_optional(pool)
            .await?;

        Ok(release)
    }

    /// Releases of an artist that have tracks, oldest first
    pub async fn for_artist(db: &DbEngine, artist: &str) -> Result<Vec<Release>> {
        let pool = db.pool();

        let releases = sqlx::query_as(
            r#"SELECT * FROM releases WHERE artist = ?
               AND reid IN (SELECT DISTINCT reid FROM tracks WHERE artist = ?)
               ORDER BY date, name"#,
        )
        .bind(artist)
        .bind(artist)
        .fetch_all(pool)
        .await?;

        Ok(releases)
    }

    /// Releases whose tracks were most recently added
    pub async fn recently_added(db: &DbEngine, limit: i64) -> Result<Vec<Release>> {
        let pool = db.pool();

        let releases = sqlx::query_as(
            r#"SELECT r.* FROM releases r
               JOIN (SELECT reid, MAX(last_modified) AS modified FROM tracks GROUP BY reid) t
               ON t.reid = r.reid
               ORDER BY t.modified DESC LIMIT ?"#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(releases)
    }

    /// Releases with tracks, newest release date first
    pub async fn recently_released(db: &DbEngine, limit: i64) -> Result<Vec<Release>> {
        let pool = db.pool();

        let releases = sqlx::query_as(
            r#"SELECT * FROM releases WHERE date IS NOT NULL
               AND reid IN (SELECT DISTINCT reid FROM tracks)
               ORDER BY date DESC LIMIT ?"#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(releases)
    }

    /// Insert or update a release by release id, returning its row id
    pub async fn upsert(db: &DbEngine, release: &Release) -> Result<i64> {
        let pool = db.pool();

        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO releases (artist, name, rgid, reid, disambiguation, type, secondary_types,
                   status, country, track_count, disc_count, artwork, front_artwork, back_artwork,
                   group_artwork, date, release_date)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(reid) DO UPDATE SET
                   artist = excluded.artist,
                   name = excluded.name,
                   rgid = excluded.rgid,
                   disambiguation = excluded.disambiguation,
                   type = excluded.type,
                   secondary_types = excluded.secondary_types,
                   status = excluded.status,
                   country = excluded.country,
                   track_count = excluded.track_count,
                   disc_count = excluded.disc_count,
                   date = excluded.date,
                   release_date = excluded.release_date
               RETURNING id"#,
        )
        .bind(&release.artist)
        .bind(&release.name)
        .bind(&release.rgid)
        .bind(&release.reid)
        .bind(&release.disambiguation)
        .bind(&release.release_type)
        .bind(&release.secondary_types)
        .bind(&release.status)
        .bind(&release.country)
        .bind(release.track_count)
        .bind(release.disc_count)
        .bind(release.artwork)
        .bind(release.front_artwork)
        .bind(release.back_artwork)
        .bind(release.group_artwork)
        .bind(release.date)
        .bind(release.release_date)
        .fetch_one(pool)
        .await?;

        Ok(id)
    }

    /// Record which cover images exist for a release
    pub async fn update_artwork(
        db: &DbEngine,
        reid: &str,
        front: bool,
        back: bool,
        group: bool,
    ) -> Result<()> {
        let pool = db.pool();

        sqlx::query(
            r#"UPDATE releases SET artwork = ?, front_artwork = ?, back_artwork = ?, group_artwork = ?
               WHERE reid = ?"#,
        )
        .bind(front || back)
        .bind(front)
        .bind(back)
        .bind(group)
        .bind(reid)
        .execute(pool)
        .await?;

        Ok(())
    }
}
