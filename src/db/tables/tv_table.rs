//! TV series and episode table operations

use chrono::{DateTime, Utc};

use crate::db::DbEngine;
use crate::error::Result;
use crate::models::{Cast, Crew, TvEpisode, TvSeries};

/// TV table operations
pub struct TvTable;

impl TvTable {
    pub async fn all_series(db: &DbEngine) -> Result<Vec<TvSeries>> {
        let pool = db.pool();

        let series = sqlx::query_as("SELECT * FROM tv_series ORDER BY sort_name COLLATE NOCASE")
            .fetch_all(pool)
            .await?;

        Ok(series)
    }

    pub async fn series_by_id(db: &DbEngine, id: i64) -> Result<Option<TvSeries>> {
        let pool = db.pool();

        let series = sqlx::query_as("SELECT * FROM tv_series WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(series)
    }

    pub async fn series_by_tvid(db: &DbEngine, tvid: i64) -> Result<Option<TvSeries>> {
        let pool = db.pool();

        let series = sqlx::query_as("SELECT * FROM tv_series WHERE tvid = ?")
            .bind(tvid)
            .fetch_optional(pool)
            .await?;

        Ok(series)
    }

    pub async fn upsert_series(db: &DbEngine, series: &TvSeries) -> Result<i64> {
        let pool = db.pool();

        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO tv_series (tvid, name, sort_name, original_name, overview, tagline, rating,
                   vote_average, vote_count, season_count, episode_count, backdrop, poster, date, end_date)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(tvid) DO UPDATE SET
                   name = excluded.name,
                   sort_name = excluded.sort_name,
                   original_name = excluded.original_name,
                   overview = excluded.overview,
                   tagline = excluded.tagline,
                   rating = excluded.rating,
                   vote_average = excluded.vote_average,
                   vote_count = excluded.vote_count,
                   season_count = excluded.season_count,
                   episode_count = excluded.episode_count,
                   backdrop = excluded.backdrop,
                   poster = excluded.poster,
                   date = excluded.date,
                   end_date = excluded.end_date
               RETURNING id"#,
        )
        .bind(series.tvid)
        .bind(&series.name)
        .bind(&series.sort_name)
        .bind(&series.original_name)
        .bind(&series.overview)
        .bind(&series.tagline)
        .bind(&series.rating)
        .bind(series.vote_average)
        .bind(series.vote_count)
        .bind(series.season_count)
        .bind(series.episode_count)
        .bind(&series.backdrop)
        .bind(&series.poster)
        .bind(series.date)
        .bind(series.end_date)
        .fetch_one(pool)
        .await?;

        Ok(id)
    }

    /// Remove genres, keywords and credits of a series
    pub async fn delete_series_dependents(db: &DbEngine, tvid: i64) -> Result<()> {
        let mut tx = db.pool().begin().await?;

        for table in ["tv_genres", "tv_keywords", "tv_cast", "tv_crew"] {
            sqlx::query(&format!("DELETE FROM {} WHERE tvid = ?", table))
                .bind(tvid)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn genres(db: &DbEngine, tvid: i64) -> Result<Vec<String>> {
        let pool = db.pool();

        let names = sqlx::query_scalar("SELECT name FROM tv_genres WHERE tvid = ? ORDER BY id")
            .bind(tvid)
            .fetch_all(pool)
            .await?;

        Ok(names)
    }

    pub async fn keywords(db: &DbEngine, tvid: i64) -> Result<Vec<String>> {
        let pool = db.pool();

        let names = sqlx::query_scalar("SELECT name FROM tv_keywords WHERE tvid = ? ORDER BY id")
            .bind(tvid)
            .fetch_all(pool)
            .await?;

        Ok(names)
    }

    pub async fn add_genres(db: &DbEngine, tvid: i64, names: &[String]) -> Result<()> {
        Self::add_names(db, "tv_genres", tvid, names).await
    }

    pub async fn add_keywords(db: &DbEngine, tvid: i64, names: &[String]) -> Result<()> {
        Self::add_names(db, "tv_keywords", tvid, names).await
    }

    async fn add_names(db: &DbEngine, table: &str, tvid: i64, names: &[String]) -> Result<()> {
        let mut tx = db.pool().begin().await?;

        for name in names {
            sqlx::query(&format!("INSERT INTO {} (tvid, name) VALUES (?, ?)", table))
                .bind(tvid)
                .bind(name)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn cast(db: &DbEngine, tvid: i64) -> Result<Vec<Cast>> {
        let pool = db.pool();

        let cast = sqlx::query_as(
            "SELECT id, tvid AS tmid, peid, character, rank FROM tv_cast WHERE tvid = ? ORDER BY rank",
        )
        .bind(tvid)
        .fetch_all(pool)
        .await?;

        Ok(cast)
    }

    pub async fn crew(db: &DbEngine, tvid: i64) -> Result<Vec<Crew>> {
        let pool = db.pool();

        let crew = sqlx::query_as(
            "SELECT id, tvid AS tmid, peid, department, job FROM tv_crew WHERE tvid = ? ORDER BY id",
        )
        .bind(tvid)
        .fetch_all(pool)
        .await?;

        Ok(crew)
    }

    /// Cast rows carry the series id in `tmid`
    pub async fn add_cast(db: &DbEngine, cast: &[Cast]) -> Result<()> {
        let mut tx = db.pool().begin().await?;

        for c in cast {
            sqlx::query("INSERT INTO tv_cast (tvid, peid, character, rank) VALUES (?, ?, ?, ?)")
                .bind(c.tmid)
                .bind(c.peid)
                .bind(&c.character)
                .bind(c.rank)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn add_crew(db: &DbEngine, crew: &[Crew]) -> Result<()> {
        let mut tx = db.pool().begin().await?;

        for c in crew {
            sqlx::query("INSERT INTO tv_crew (tvid, peid, department, job) VALUES (?, ?, ?, ?)")
                .bind(c.tmid)
                .bind(c.peid)
                .bind(&c.department)
                .bind(&c.job)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn episodes(db: &DbEngine, tvid: i64) -> Result<Vec<TvEpisode>> {
        let pool = db.pool();

        let episodes = sqlx::query_as(
            "SELECT * FROM tv_episodes WHERE tvid = ? ORDER BY season, episode",
        )
        .bind(tvid)
        .fetch_all(pool)
        .await?;

        Ok(episodes)
    }

    pub async fn all_episodes(db: &DbEngine) -> Result<Vec<TvEpisode>> {
        let pool = db.pool();

        let episodes = sqlx::query_as("SELECT * FROM tv_episodes ORDER BY tvid, season, episode")
            .fetch_all(pool)
            .await?;

        Ok(episodes)
    }

    pub async fn episode_by_id(db: &DbEngine, id: i64) -> Result<Option<TvEpisode>> {
        let pool = db.pool();

        let episode = sqlx::query_as("SELECT * FROM tv_episodes WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(episode)
    }

    pub async fn episode_by_uuid(db: &DbEngine, uuid: &str) -> Result<Option<TvEpisode>> {
        let pool = db.pool();

        let episode = sqlx::query_as("SELECT * FROM tv_episodes WHERE uuid = ?")
            .bind(uuid)
            .fetch_optional(pool)
            .await?;

        Ok(episode)
    }

    pub async fn episode_by_key(db: &DbEngine, key: &str) -> Result<Option<TvEpisode>> {
        let pool = db.pool();

        let episode = sqlx::query_as("SELECT * FROM tv_episodes WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

        Ok(episode)
    }

    /// Another file already holding this (series, season, episode)
    pub async fn episode_by_number(
        db: &DbEngine,
        tvid: i64,
        season: i64,
        episode: i64,
    ) -> Result<Option<TvEpisode>> {
        let pool = db.pool();

        let found = sqlx::query_as(
            "SELECT * FROM tv_episodes WHERE tvid = ? AND season = ? AND episode = ? LIMIT 1",
        )
        .bind(tvid)
        .bind(season)
        .bind(episode)
        .fetch_optional(pool)
        .await?;

        Ok(found)
    }

    pub async fn episode_by_etag(db: &DbEngine, etag: &str) -> Result<Option<TvEpisode>> {
        let pool = db.pool();

        let episode = sqlx::query_as("SELECT * FROM tv_episodes WHERE etag = ? LIMIT 1")
            .bind(etag)
            .fetch_optional(pool)
            .await?;

        Ok(episode)
    }

    pub async fn last_modified(db: &DbEngine) -> Result<Option<DateTime<Utc>>> {
        let pool = db.pool();

        let last: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT MAX(last_modified) FROM tv_episodes")
                .fetch_one(pool)
                .await?;

        Ok(last)
    }

    pub async fn insert_episode(db: &DbEngine, episode: &TvEpisode) -> Result<i64> {
        let pool = db.pool();

        let result = sqlx::query(
            r#"INSERT INTO tv_episodes (uuid, tvid, name, overview, season, episode, runtime,
                   vote_average, vote_count, still, date, key, size, etag, last_modified)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&episode.uuid)
        .bind(episode.tvid)
        .bind(&episode.name)
        .bind(&episode.overview)
        .bind(episode.season)
        .bind(episode.episode)
        .bind(episode.runtime)
        .bind(episode.vote_average)
        .bind(episode.vote_count)
        .bind(&episode.still)
        .bind(episode.date)
        .bind(&episode.key)
        .bind(episode.size)
        .bind(&episode.etag)
        .bind(episode.last_modified)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update_episode(db: &DbEngine, episode: &TvEpisode) -> Result<()> {
        let pool = db.pool();

        sqlx::query(
            r#"UPDATE tv_episodes SET tvid = ?, name = ?, overview = ?, season = ?, episode = ?,
                   runtime = ?, vote_average = ?, vote_count = ?, still = ?, date = ?, size = ?,
                   etag = ?, last_modified = ?
               WHERE key = ?"#,
        )
        .bind(episode.tvid)
        .bind(&episode.name)
        .bind(&episode.overview)
        .bind(episode.season)
        .bind(episode.episode)
        .bind(episode.runtime)
        .bind(episode.vote_average)
        .bind(episode.vote_count)
        .bind(&episode.still)
        .bind(episode.date)
        .bind(episode.size)
        .bind(&episode.etag)
        .bind(episode.last_modified)
        .bind(&episode.key)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn delete_episode_by_key(db: &DbEngine, key: &str) -> Result<()> {
        let pool = db.pool();

        sqlx::query("DELETE FROM tv_episodes WHERE key = ?")
            .bind(key)
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
    async fn test_series_and_credits() {
        let db = DbEngine::memory(Schema::Media).await.unwrap();
        let series = TvSeries {
            tvid: 1396,
            name: "Breaking Bad".to_string(),
            sort_name: "Breaking Bad".to_string(),
            ..Default::default()
        };
        let id = TvTable::upsert_series(&db, &series).await.unwrap();
        assert_eq!(TvTable::upsert_series(&db, &series).await.unwrap(), id);

        TvTable::add_cast(
            &db,
            &[Cast {
                id: 0,
                tmid: 1396,
                peid: 17419,
                character: "Walter White".to_string(),
                rank: 0,
            }],
        )
        .await
        .unwrap();
        let cast = TvTable::cast(&db, 1396).await.unwrap();
        assert_eq!(cast[0].tmid, 1396);
        assert_eq!(cast[0].character, "Walter White");

        TvTable::delete_series_dependents(&db, 1396).await.unwrap();
        assert!(TvTable::cast(&db, 1396).await.unwrap().is_empty());
    }
}
