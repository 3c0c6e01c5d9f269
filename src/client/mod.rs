//! Catalogue clients
//!
//! Thin HTTP clients for the external metadata services used by ingestion.
//! All share one `reqwest::Client`.

pub mod catalog;
pub mod coverart;
pub mod fanart;
pub mod imagecache;
pub mod lastfm;
pub mod musicbrainz;
pub mod pls;
pub mod rss;
pub mod tmdb;

pub use catalog::{FeedSource, MusicCatalog, VideoCatalog};
pub use coverart::CoverArtClient;
pub use fanart::FanartClient;
pub use imagecache::{ImageCache, ImageWriter};
pub use lastfm::LastFmClient;
pub use musicbrainz::MusicBrainzClient;
pub use rss::RssClient;
pub use tmdb::TmdbClient;

use anyhow::Result;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared HTTP client for catalogue requests
pub fn http_client(user_agent: &str) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(REQUEST_TIMEOUT)
        .build()?)
}
