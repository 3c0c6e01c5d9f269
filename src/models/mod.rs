//! Data models
//!
//! Plain serde structures for every persisted entity. Rows map onto these
//! directly through `sqlx::FromRow` unless a table needs a conversion step.

mod activity;
mod film;
mod music;
mod podcast;
mod progress;
pub mod station;
mod tv;
mod user;

pub use activity::{EpisodeEvent, Event, EventCount, EventKind, MovieEvent, TrackEvent};
pub use film::{Cast, Collection, Credit, Crew, Movie, Person, Trailer};
pub use music::{
    Artist, ArtistImage, Popular, Release, Similar, Track, COVER_ART_ARCHIVE, IMAGE_BACKGROUND,
    IMAGE_THUMB,
};
pub use podcast::{Episode, Series, Subscription};
pub use progress::Offset;
pub use station::Station;
pub use tv::{TvEpisode, TvSeries};
pub use user::{Code, Session, User};

/// A named playlist owned by a user
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PlaylistInfo {
    pub id: i64,
    pub name: String,
    #[serde(skip)]
    pub user: String,
    pub updated: chrono::DateTime<chrono::Utc>,
}
