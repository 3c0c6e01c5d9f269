//! Playback offset table operations

use chrono::Utc;

use crate::db::DbEngine;
use crate::error::Result;
use crate::models::Offset;

const SELECT: &str = r#"SELECT id, user, etag, duration, "offset", date FROM offsets"#;

/// Offset table operations
pub struct OffsetTable;

impl OffsetTable {
    /// Offsets of a user, most recent first
    pub async fn for_user(db: &DbEngine, user: &str) -> Result<Vec<Offset>> {
        let pool = db.pool();

        let offsets = sqlx::query_as(&format!("{} WHERE user = ? ORDER BY date DESC", SELECT))
            .bind(user)
            .fetch_all(pool)
            .await?;

        Ok(offsets)
    }

    pub async fn get_by_id(db: &DbEngine, id: i64) -> Result<Option<Offset>> {
        let pool = db.pool();

        let offset = sqlx::query_as(&format!("{} WHERE id = ?", SELECT))
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(offset)
    }

    pub async fn get_by_etag(db: &DbEngine, user: &str, etag: &str) -> Result<Option<Offset>> {
        let pool = db.pool();

        let offset = sqlx::query_as(&format!(
            "{} WHERE user = ? AND etag = ?",
            SELECT
        ))
        .bind(user)
        .bind(etag)
        .fetch_optional(pool)
        .await?;

        Ok(offset)
    }

    /// Insert or overwrite the offset for (user, etag) in one statement.
    ///
    /// An existing row only changes when `offset` is strictly newer; the
    /// duration is kept when the report does not carry one. Returns whether
    /// a row was written.
    pub async fn upsert(db: &DbEngine, offset: &Offset) -> Result<bool> {
        let pool = db.pool();
        let now = Utc::now();

        let result = sqlx::query(
            r#"INSERT INTO offsets (user, etag, duration, "offset", date, created, updated)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(user, etag) DO UPDATE SET
                   "offset" = excluded."offset",
                   date = excluded.date,
                   duration = CASE WHEN excluded.duration > 0
                       THEN excluded.duration ELSE offsets.duration END,
                   updated = excluded.updated
               WHERE excluded.date > offsets.date"#,
        )
        .bind(&offset.user)
        .bind(&offset.etag)
        .bind(offset.duration)
        .bind(offset.offset)
        .bind(offset.date)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(db: &DbEngine, id: i64) -> Result<()> {
        let pool = db.pool();

        sqlx::query("DELETE FROM offsets WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }
}
