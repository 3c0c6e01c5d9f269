//! Activity event models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Track,
    Movie,
    Episode,
}

/// One event as posted by a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub etag: String,
    /// Track recording id
    #[serde(default)]
    pub rid: String,
    /// Track release group id
    #[serde(default)]
    pub rgid: String,
    /// Movie catalogue id
    #[serde(default)]
    pub tmid: String,
    /// Movie IMDb id
    #[serde(default)]
    pub imid: String,
    /// Podcast episode id
    #[serde(default)]
    pub eid: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub release: String,
    #[serde(default)]
    pub title: String,
}

/// A track play
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct TrackEvent {
    pub id: i64,
    pub user: String,
    pub date: DateTime<Utc>,
    /// Server local calendar day, `YYYY-MM-DD`
    pub day: String,
    pub rid: String,
    pub rgid: String,
    pub etag: String,
    pub artist: String,
    pub release: String,
    pub title: String,
}

/// A movie viewing
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct MovieEvent {
    pub id: i64,
    pub user: String,
    pub date: DateTime<Utc>,
    pub day: String,
    pub tmid: String,
    pub imid: String,
    pub etag: String,
    pub title: String,
}

/// A podcast episode play
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct EpisodeEvent {
    pub id: i64,
    pub user: String,
    pub date: DateTime<Utc>,
    pub day: String,
    pub eid: String,
    pub title: String,
}

/// One group of an activity aggregation
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventCount {
    /// Grouping key: recording id, artist name, release group id or movie id
    pub key: String,
    pub count: i64,
    /// Most recent event of the group
    pub date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json() {
        let events: Vec<Event> = serde_json::from_str(
            r#"[{"kind":"track","etag":"E","date":"2024-12-04T10:15:00-08:00"},
                {"kind":"episode","eid":"abc","date":"2024-12-05T00:00:00Z"}]"#,
        )
        .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::Track);
        assert_eq!(events[0].etag, "E");
        assert_eq!(events[0].date.to_rfc3339(), "2024-12-04T18:15:00+00:00");
        assert_eq!(events[1].kind, EventKind::Episode);
        assert!(events[1].rid.is_empty());
    }
}
