//! Playlist table operations
//!
//! Each user has one active playlist plus any number of named playlists.
//! Documents are stored as JSON text.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::db::DbEngine;
use crate::error::{Error, Result};
use crate::models::PlaylistInfo;

/// Database row for playlists table
#[derive(Debug, FromRow)]
struct PlaylistRow {
    id: i64,
    user: String,
    name: String,
    playlist: String,
    #[allow(dead_code)]
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

impl PlaylistRow {
    fn into_info(self) -> PlaylistInfo {
        PlaylistInfo {
            id: self.id,
            name: self.name,
            user: self.user,
            updated: self.updated,
        }
    }
}

/// Playlist table operations
pub struct PlaylistTable;

impl PlaylistTable {
    /// The user's active playlist document, if one was saved
    pub async fn active(db: &DbEngine, user: &str) -> Result<Option<String>> {
        let pool = db.pool();

        let playlist = sqlx::query_scalar("SELECT playlist FROM active_playlists WHERE user = ?")
            .bind(user)
            .fetch_optional(pool)
            .await?;

        Ok(playlist)
    }

    pub async fn save_active(db: &DbEngine, user: &str, playlist: &str) -> Result<()> {
        let pool = db.pool();

        sqlx::query(
            r#"INSERT INTO active_playlists (user, playlist, updated) VALUES (?, ?, ?)
               ON CONFLICT(user) DO UPDATE SET playlist = excluded.playlist, updated = excluded.updated"#,
        )
        .bind(user)
        .bind(playlist)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Named playlists of a user
    pub async fn for_user(db: &DbEngine, user: &str) -> Result<Vec<PlaylistInfo>> {
        let pool = db.pool();

        let rows: Vec<PlaylistRow> =
            sqlx::query_as("SELECT * FROM playlists WHERE user = ? ORDER BY name COLLATE NOCASE")
                .bind(user)
                .fetch_all(pool)
                .await?;

        Ok(rows.into_iter().map(|r| r.into_info()).collect())
    }

    /// A named playlist and its document
    pub async fn get_by_id(db: &DbEngine, id: i64) -> Result<Option<(PlaylistInfo, String)>> {
        let pool = db.pool();

        let row: Option<PlaylistRow> = sqlx::query_as("SELECT * FROM playlists WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(|r| {
            let playlist = r.playlist.clone();
            (r.into_info(), playlist)
        }))
    }

    pub async fn get_by_name(db: &DbEngine, user: &str, name: &str) -> Result<Option<(PlaylistInfo, String)>> {
        let pool = db.pool();

        let row: Option<PlaylistRow> =
            sqlx::query_as("SELECT * FROM playlists WHERE user = ? AND name = ?")
                .bind(user)
                .bind(name)
                .fetch_optional(pool)
                .await?;

        Ok(row.map(|r| {
            let playlist = r.playlist.clone();
            (r.into_info(), playlist)
        }))
    }

    /// Create a named playlist; names are unique per user
    pub async fn insert(db: &DbEngine, user: &str, name: &str, playlist: &str) -> Result<i64> {
        let pool = db.pool();
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO playlists (user, name, playlist, created, updated) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user)
        .bind(name)
        .bind(playlist)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await;

        match result {
            Ok(r) => Ok(r.last_insert_rowid()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(Error::InvalidParameter(format!("playlist {} exists", name)))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn update(db: &DbEngine, id: i64, name: &str, playlist: &str) -> Result<()> {
        let pool = db.pool();

        sqlx::query("UPDATE playlists SET name = ?, playlist = ?, updated = ? WHERE id = ?")
            .bind(name)
            .bind(playlist)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn delete(db: &DbEngine, id: i64) -> Result<()> {
        let pool = db.pool();

        sqlx::query("DELETE FROM playlists WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Schema;

    #[tokio::test]
    async fn test_active_playlist_is_singleton() {
        let db = DbEngine::memory(Schema::Media).await.unwrap();
        assert!(PlaylistTable::active(&db, "alice").await.unwrap().is_none());

        PlaylistTable::save_active(&db, "alice", "{\"a\":1}").await.unwrap();
        PlaylistTable::save_active(&db, "alice", "{\"a\":2}").await.unwrap();
        assert_eq!(
            PlaylistTable::active(&db, "alice").await.unwrap().as_deref(),
            Some("{\"a\":2}")
        );
    }

    #[tokio::test]
    async fn test_named_playlists() {
        let db = DbEngine::memory(Schema::Media).await.unwrap();
        let id = PlaylistTable::insert(&db, "alice", "my test", "{}").await.unwrap();
        assert_eq!(id, 1);
        assert!(PlaylistTable::insert(&db, "alice", "my test", "{}").await.is_err());
        PlaylistTable::insert(&db, "bob", "my test", "{}").await.unwrap();

        let list = PlaylistTable::for_user(&db, "alice").await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, 1);

        PlaylistTable::update(&db, id, "renamed", "{\"x\":1}").await.unwrap();
        let (info, doc) = PlaylistTable::get_by_id(&db, id).await.unwrap().unwrap();
        assert_eq!(info.name, "renamed");
        assert_eq!(info.user, "alice");
        assert_eq!(doc, "{\"x\":1}");

        PlaylistTable::delete(&db, id).await.unwrap();
        assert!(PlaylistTable::get_by_id(&db, id).await.unwrap().is_none());
    }
}
