//! TV catalogue models

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct TvSeries {
    pub id: i64,
    /// TV catalogue id
    pub tvid: i64,
    pub name: String,
    pub sort_name: String,
    pub original_name: String,
    pub overview: String,
    pub tagline: String,
    pub rating: String,
    pub vote_average: f64,
    pub vote_count: i64,
    pub season_count: i64,
    pub episode_count: i64,
    pub backdrop: String,
    pub poster: String,
    /// First air date
    pub date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl TvSeries {
    pub fn year(&self) -> Option<i32> {
        self.date.map(|d| d.year())
    }
}

/// A playable TV episode file
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct TvEpisode {
    pub id: i64,
    pub uuid: String,
    pub tvid: i64,
    pub name: String,
    pub overview: String,
    pub season: i64,
    pub episode: i64,
    pub runtime: i64,
    pub vote_average: f64,
    pub vote_count: i64,
    pub still: String,
    pub date: Option<DateTime<Utc>>,
    pub key: String,
    pub size: i64,
    pub etag: String,
    pub last_modified: DateTime<Utc>,
}

impl TvEpisode {
    pub fn location(&self) -> String {
        format!("/api/tv/episodes/{}/location", self.uuid)
    }

    /// `S01E02` style label
    pub fn label(&self) -> String {
        format!("S{:02}E{:02}", self.season, self.episode)
    }
}
