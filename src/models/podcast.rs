//! Podcast models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A podcast feed
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct Series {
    pub id: i64,
    /// MD5 of the feed link
    pub sid: String,
    pub title: String,
    pub author: String,
    pub description: String,
    pub link: String,
    pub image: String,
    pub copyright: String,
    pub date: Option<DateTime<Utc>>,
    pub ttl: i64,
}

/// A podcast episode
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct Episode {
    pub id: i64,
    /// Item GUID, hashed when it is a URL
    pub eid: String,
    pub sid: String,
    pub title: String,
    pub author: String,
    pub description: String,
    pub link: String,
    /// Enclosure URL
    pub url: String,
    pub content_type: String,
    pub size: i64,
    /// Seconds
    pub duration: i64,
    pub date: Option<DateTime<Utc>>,
}

impl Episode {
    pub fn location(&self) -> String {
        format!("/api/episodes/{}/location", self.eid)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: i64,
    pub user: String,
    pub sid: String,
}
