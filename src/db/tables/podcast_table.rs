//! Podcast series, episode and subscription table operations

use crate::db::DbEngine;
use crate::error::Result;
use crate::models::{Episode, Series};

/// Podcast table operations
pub struct PodcastTable;

impl PodcastTable {
    pub async fn all_series(db: &DbEngine) -> Result<Vec<Series>> {
        let pool = db.pool();

        let series = sqlx::query_as("SELECT * FROM series ORDER BY title COLLATE NOCASE")
            .fetch_all(pool)
            .await?;

        Ok(series)
    }

    pub async fn series_by_id(db: &DbEngine, id: i64) -> Result<Option<Series>> {
        let pool = db.pool();

        let series = sqlx::query_as("SELECT * FROM series WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(series)
    }

    pub async fn series_by_sid(db: &DbEngine, sid: &str) -> Result<Option<Series>> {
        let pool = db.pool();

        let series = sqlx::query_as("SELECT * FROM series WHERE sid = ?")
            .bind(sid)
            .fetch_optional(pool)
            .await?;

        Ok(series)
    }

    pub async fn upsert_series(db: &DbEngine, series: &Series) -> Result<i64> {
        let pool = db.pool();

        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO series (sid, title, author, description, link, image, copyright, date, ttl)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(sid) DO UPDATE SET
                   title = excluded.title,
                   author = excluded.author,
                   description = excluded.description,
                   link = excluded.link,
                   image = excluded.image,
                   copyright = excluded.copyright,
                   date = excluded.date,
                   ttl = excluded.ttl
               RETURNING id"#,
        )
        .bind(&series.sid)
        .bind(&series.title)
        .bind(&series.author)
        .bind(&series.description)
        .bind(&series.link)
        .bind(&series.image)
        .bind(&series.copyright)
        .bind(series.date)
        .bind(series.ttl)
        .fetch_one(pool)
        .await?;

        Ok(id)
    }

    /// Episodes of a series, newest first
    pub async fn episodes(db: &DbEngine, sid: &str) -> Result<Vec<Episode>> {
        let pool = db.pool();

        let episodes = sqlx::query_as("SELECT * FROM episodes WHERE sid = ? ORDER BY date DESC")
            .bind(sid)
            .fetch_all(pool)
            .await?;

        Ok(episodes)
    }

    pub async fn episode_ids(db: &DbEngine, sid: &str) -> Result<Vec<String>> {
        let pool = db.pool();

        let ids = sqlx::query_scalar("SELECT eid FROM episodes WHERE sid = ?")
            .bind(sid)
            .fetch_all(pool)
            .await?;

        Ok(ids)
    }

    pub async fn episode_by_id(db: &DbEngine, id: i64) -> Result<Option<Episode>> {
        let pool = db.pool();

        let episode = sqlx::query_as("SELECT * FROM episodes WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(episode)
    }

    pub async fn episode_by_eid(db: &DbEngine, eid: &str) -> Result<Option<Episode>> {
        let pool = db.pool();

        let episode = sqlx::query_as("SELECT * FROM episodes WHERE eid = ?")
            .bind(eid)
            .fetch_optional(pool)
            .await?;

        Ok(episode)
    }

    /// Newest episodes across all series
    pub async fn recent_episodes(db: &DbEngine, limit: i64) -> Result<Vec<Episode>> {
        let pool = db.pool();

        let episodes = sqlx::query_as("SELECT * FROM episodes ORDER BY date DESC LIMIT ?")
            .bind(limit)
            .fetch_all(pool)
            .await?;

        Ok(episodes)
    }

    pub async fn upsert_episode(db: &DbEngine, episode: &Episode) -> Result<i64> {
        let pool = db.pool();

        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO episodes (eid, sid, title, author, description, link, url, content_type,
                   size, duration, date)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(eid) DO UPDATE SET
                   sid = excluded.sid,
                   title = excluded.title,
                   author = excluded.author,
                   description = excluded.description,
                   link = excluded.link,
                   url = excluded.url,
                   content_type = excluded.content_type,
                   size = excluded.size,
                   duration = excluded.duration,
                   date = excluded.date
               RETURNING id"#,
        )
        .bind(&episode.eid)
        .bind(&episode.sid)
        .bind(&episode.title)
        .bind(&episode.author)
        .bind(&episode.description)
        .bind(&episode.link)
        .bind(&episode.url)
        .bind(&episode.content_type)
        .bind(episode.size)
        .bind(episode.duration)
        .bind(episode.date)
        .fetch_one(pool)
        .await?;

        Ok(id)
    }

    pub async fn delete_episodes(db: &DbEngine, eids: &[String]) -> Result<()> {
        let mut tx = db.pool().begin().await?;

        for eid in eids {
            sqlx::query("DELETE FROM episodes WHERE eid = ?")
                .bind(eid)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn subscribe(db: &DbEngine, user: &str, sid: &str) -> Result<()> {
        let pool = db.pool();

        sqlx::query("INSERT OR IGNORE INTO subscriptions (user, sid) VALUES (?, ?)")
            .bind(user)
            .bind(sid)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn unsubscribe(db: &DbEngine, user: &str, sid: &str) -> Result<()> {
        let pool = db.pool();

        sqlx::query("DELETE FROM subscriptions WHERE user = ? AND sid = ?")
            .bind(user)
            .bind(sid)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn is_subscribed(db: &DbEngine, user: &str, sid: &str) -> Result<bool> {
        let pool = db.pool();

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions WHERE user = ? AND sid = ?")
                .bind(user)
                .bind(sid)
                .fetch_one(pool)
                .await?;

        Ok(count > 0)
    }

    /// Series a user subscribed to
    pub async fn subscribed_series(db: &DbEngine, user: &str) -> Result<Vec<Series>> {
        let pool = db.pool();

        let series = sqlx::query_as(
            r#"SELECT s.* FROM series s JOIN subscriptions u ON u.sid = s.sid
               WHERE u.user = ? ORDER BY s.title COLLATE NOCASE"#,
        )
        .bind(user)
        .fetch_all(pool)
        .await?;

        Ok(series)
    }
}
