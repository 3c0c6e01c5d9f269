//! Station table operations

use crate::db::DbEngine;
use crate::error::Result;
use crate::models::station::SHARED_USER;
use crate::models::Station;

/// Station table operations
pub struct StationTable;

impl StationTable {
    /// Stations visible to a user: their own plus shared ones
    pub async fn for_user(db: &DbEngine, user: &str) -> Result<Vec<Station>> {
        let pool = db.pool();

        let stations = sqlx::query_as(
            "SELECT * FROM stations WHERE user = ? OR shared = 1 ORDER BY type, name COLLATE NOCASE",
        )
        .bind(user)
        .fetch_all(pool)
        .await?;

        Ok(stations)
    }

    pub async fn get_by_id(db: &DbEngine, id: i64) -> Result<Option<Station>> {
        let pool = db.pool();

        let station = sqlx::query_as("SELECT * FROM stations WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(station)
    }

    /// Station by name; the user's own wins over a shared one
    pub async fn get_by_name(db: &DbEngine, user: &str, name: &str) -> Result<Option<Station>> {
        let pool = db.pool();

        let station = sqlx::query_as(
            r#"SELECT * FROM stations WHERE name = ? AND (user = ? OR shared = 1)
               ORDER BY CASE WHEN user = ? THEN 0 ELSE 1 END LIMIT 1"#,
        )
        .bind(name)
        .bind(user)
        .bind(user)
        .fetch_optional(pool)
        .await?;

        Ok(station)
    }

    /// Insert or replace a station by (user, name)
    pub async fn upsert(db: &DbEngine, station: &Station) -> Result<i64> {
        let pool = db.pool();

        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO stations (user, shared, type, name, creator, ref, description, image, playlist)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(user, name) DO UPDATE SET
                   shared = excluded.shared,
                   type = excluded.type,
                   creator = excluded.creator,
                   ref = excluded.ref,
                   description = excluded.description,
                   image = excluded.image
               RETURNING id"#,
        )
        .bind(&station.user)
        .bind(station.shared)
        .bind(&station.station_type)
        .bind(&station.name)
        .bind(&station.creator)
        .bind(&station.reference)
        .bind(&station.description)
        .bind(&station.image)
        .bind(&station.playlist)
        .fetch_one(pool)
        .await?;

        Ok(id)
    }

    /// Store a materialized playlist for a station
    pub async fn update_playlist(db: &DbEngine, id: i64, playlist: &str) -> Result<()> {
        let pool = db.pool();

        sqlx::query("UPDATE stations SET playlist = ? WHERE id = ?")
            .bind(playlist)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Drop shared stations of a type that are not in `keep`
    pub async fn prune_shared(db: &DbEngine, station_type: &str, keep: &[String]) -> Result<u64> {
        let existing: Vec<(i64, String)> = sqlx::query_as(
            "SELECT id, name FROM stations WHERE user = ? AND type = ?",
        )
        .bind(SHARED_USER)
        .bind(station_type)
        .fetch_all(db.pool())
        .await?;

        let mut removed = 0;
        for (id, name) in existing {
            if !keep.contains(&name) {
                Self::delete(db, id).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub async fn delete(db: &DbEngine, id: i64) -> Result<()> {
        let pool = db.pool();

        sqlx::query("DELETE FROM stations WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }
}
