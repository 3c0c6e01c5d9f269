//! Activity event table operations

use chrono::{DateTime, NaiveDate, Utc};

use crate::db::DbEngine;
use crate::error::Result;
use crate::models::{EpisodeEvent, EventCount, MovieEvent, TrackEvent};
use crate::utils::dates::ChartPoint;

/// Which event table a query reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    Tracks,
    Movies,
    Episodes,
}

impl EventSource {
    fn table(&self) -> &'static str {
        match self {
            EventSource::Tracks => "track_events",
            EventSource::Movies => "movie_events",
            EventSource::Episodes => "episode_events",
        }
    }
}

/// Activity event table operations
pub struct EventTable;

impl EventTable {
    pub async fn insert_track(db: &DbEngine, event: &TrackEvent) -> Result<i64> {
        let pool = db.pool();

        let result = sqlx::query(
            r#"INSERT INTO track_events (user, date, day, rid, rgid, etag, artist, "release", title)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&event.user)
        .bind(event.date)
        .bind(&event.day)
        .bind(&event.rid)
        .bind(&event.rgid)
        .bind(&event.etag)
        .bind(&event.artist)
        .bind(&event.release)
        .bind(&event.title)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn insert_movie(db: &DbEngine, event: &MovieEvent) -> Result<i64> {
        let pool = db.pool();

        let result = sqlx::query(
            "INSERT INTO movie_events (user, date, day, tmid, imid, etag, title) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.user)
        .bind(event.date)
        .bind(&event.day)
        .bind(&event.tmid)
        .bind(&event.imid)
        .bind(&event.etag)
        .bind(&event.title)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn insert_episode(db: &DbEngine, event: &EpisodeEvent) -> Result<i64> {
        let pool = db.pool();

        let result = sqlx::query(
            "INSERT INTO episode_events (user, date, day, eid, title) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&event.user)
        .bind(event.date)
        .bind(&event.day)
        .bind(&event.eid)
        .bind(&event.title)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Track events of a user in `[start, end]`, newest first
    pub async fn tracks_between(
        db: &DbEngine,
        user: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<TrackEvent>> {
        let pool = db.pool();

        let events = sqlx::query_as(
            "SELECT * FROM track_events WHERE user = ? AND date BETWEEN ? AND ? ORDER BY date DESC LIMIT ?",
        )
        .bind(user)
        .bind(start)
        .bind(end)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(events)
    }

    pub async fn movies_between(
        db: &DbEngine,
        user: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<MovieEvent>> {
        let pool = db.pool();

        let events = sqlx::query_as(
            "SELECT * FROM movie_events WHERE user = ? AND date BETWEEN ? AND ? ORDER BY date DESC LIMIT ?",
        )
        .bind(user)
        .bind(start)
        .bind(end)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(events)
    }

    pub async fn episodes_between(
        db: &DbEngine,
        user: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<EpisodeEvent>> {
        let pool = db.pool();

        let events = sqlx::query_as(
            "SELECT * FROM episode_events WHERE user = ? AND date BETWEEN ? AND ? ORDER BY date DESC LIMIT ?",
        )
        .bind(user)
        .bind(start)
        .bind(end)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(events)
    }

    /// Most recent distinct release groups played, newest first
    pub async fn recent_releases(
        db: &DbEngine,
        user: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<EventCount>> {
        let pool = db.pool();

        let groups = sqlx::query_as(
            r#"SELECT rgid AS key, COUNT(rgid) AS count, MAX(date) AS date FROM track_events
               WHERE user = ? AND rgid != '' AND date BETWEEN ? AND ?
               GROUP BY rgid ORDER BY date DESC LIMIT ?"#,
        )
        .bind(user)
        .bind(start)
        .bind(end)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(groups)
    }

    /// Top tracks by recording id: count descending, ties by latest play
    pub async fn top_tracks(
        db: &DbEngine,
        user: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<EventCount>> {
        Self::top(db, "track_events", "rid", user, start, end, limit).await
    }

    pub async fn top_artists(
        db: &DbEngine,
        user: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<EventCount>> {
        Self::top(db, "track_events", "artist", user, start, end, limit).await
    }

    pub async fn top_releases(
        db: &DbEngine,
        user: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<EventCount>> {
        Self::top(db, "track_events", "rgid", user, start, end, limit).await
    }

    pub async fn top_movies(
        db: &DbEngine,
        user: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<EventCount>> {
        Self::top(db, "movie_events", "tmid", user, start, end, limit).await
    }

    async fn top(
        db: &DbEngine,
        table: &str,
        column: &str,
        user: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<EventCount>> {
        let pool = db.pool();

        let groups = sqlx::query_as(&format!(
            r#"SELECT {col} AS key, COUNT({col}) AS count, MAX(date) AS date FROM {table}
               WHERE user = ? AND {col} != '' AND date BETWEEN ? AND ?
               GROUP BY {col} ORDER BY count DESC, date DESC LIMIT ?"#,
            col = column,
            table = table
        ))
        .bind(user)
        .bind(start)
        .bind(end)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(groups)
    }

    /// Events per local day in `[start, end]`, days without events omitted
    pub async fn day_counts(
        db: &DbEngine,
        source: EventSource,
        user: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ChartPoint>> {
        let pool = db.pool();

        let rows: Vec<(String, i64)> = sqlx::query_as(&format!(
            "SELECT day, COUNT(*) FROM {} WHERE user = ? AND day BETWEEN ? AND ? GROUP BY day ORDER BY day",
            source.table()
        ))
        .bind(user)
        .bind(start.format("%Y-%m-%d").to_string())
        .bind(end.format("%Y-%m-%d").to_string())
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(day, count)| {
                NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                    .ok()
                    .map(|date| ChartPoint { date, count })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Schema;
    use chrono::TimeZone;

    fn track_event(rid: &str, artist: &str, hour: u32, day: u32) -> TrackEvent {
        TrackEvent {
            user: "alice".to_string(),
            date: Utc.with_ymd_and_hms(2024, 12, day, hour, 0, 0).unwrap(),
            day: format!("2024-12-{:02}", day),
            rid: rid.to_string(),
            rgid: format!("g-{}", rid),
            artist: artist.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_top_tracks_order() {
        let db = DbEngine::memory(Schema::Server).await.unwrap();
        for event in [
            track_event("a", "Prince", 1, 1),
            track_event("b", "Prince", 2, 1),
            track_event("b", "Prince", 3, 2),
            track_event("c", "Bowie", 4, 3),
            track_event("a", "Prince", 5, 4),
        ] {
            EventTable::insert_track(&db, &event).await.unwrap();
        }
        let mut other = track_event("c", "Bowie", 1, 5);
        other.user = "bob".to_string();
        EventTable::insert_track(&db, &other).await.unwrap();

        let start = Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();

        let top = EventTable::top_tracks(&db, "alice", start, end, 10).await.unwrap();
        let keys: Vec<_> = top.iter().map(|t| t.key.as_str()).collect();
        // a and b tie on count; a was played last
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(top[0].count, 2);

        let artists = EventTable::top_artists(&db, "alice", start, end, 1).await.unwrap();
        assert_eq!(artists[0].key, "Prince");
        assert_eq!(artists[0].count, 4);

        let recent = EventTable::tracks_between(&db, "alice", start, end, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].rid, "a");

        let days = EventTable::day_counts(
            &db,
            EventSource::Tracks,
            "alice",
            NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        )
        .await
        .unwrap();
        assert_eq!(days.len(), 4);
        assert_eq!(days[0].count, 2);
    }
}
