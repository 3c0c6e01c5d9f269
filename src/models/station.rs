//! Radio station model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const TYPE_ARTIST: &str = "artist";
pub const TYPE_GENRE: &str = "genre";
pub const TYPE_PERIOD: &str = "period";
pub const TYPE_SIMILAR: &str = "similar";
pub const TYPE_SERIES: &str = "series";
pub const TYPE_STREAM: &str = "stream";
pub const TYPE_OTHER: &str = "other";

/// Owner of stations generated by the server rather than a user
pub const SHARED_USER: &str = "";

/// A named playlist recipe
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct Station {
    pub id: i64,
    pub user: String,
    pub shared: bool,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub station_type: String,
    pub name: String,
    pub creator: String,
    /// A playlist reference, or a stream source for `stream` stations
    #[sqlx(rename = "ref")]
    #[serde(rename = "ref")]
    pub reference: String,
    pub description: String,
    pub image: String,
    /// Materialized playlist document
    #[serde(skip)]
    pub playlist: Option<String>,
}

impl Station {
    pub fn is_stream(&self) -> bool {
        self.station_type == TYPE_STREAM
    }

    /// Stations a user may see: their own plus shared ones
    pub fn visible_to(&self, user: &str) -> bool {
        self.shared || self.user == user
    }
}
