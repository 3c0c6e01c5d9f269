//! Image cache warming
//!
//! Only the intent matters here: each job lists the upstream URLs a view
//! will ask for and makes sure the cache holds them.

use anyhow::Result;
use tracing::{info, warn};

use super::SyncSummary;
use crate::client::tmdb::image_url;
use crate::client::ImageWriter;
use crate::core::media::Media;
use crate::db::{MovieTable, PersonTable, TvTable};

/// Which pictures a warming job fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    FilmPosters,
    FilmBackdrops,
    FilmProfiles,
    TvPosters,
    TvBackdrops,
    TvStills,
}

impl ImageKind {
    pub fn name(&self) -> &'static str {
        match self {
            ImageKind::FilmPosters => "film posters",
            ImageKind::FilmBackdrops => "film backdrops",
            ImageKind::FilmProfiles => "film profiles",
            ImageKind::TvPosters => "tv posters",
            ImageKind::TvBackdrops => "tv backdrops",
            ImageKind::TvStills => "tv stills",
        }
    }
}

/// Upstream URLs for one kind of picture
pub async fn image_urls(media: &Media, kind: ImageKind) -> Result<Vec<String>> {
    let db = media.db();
    let tmdb = &media.config().tmdb;

    let urls: Vec<String> = match kind {
        ImageKind::FilmPosters => MovieTable::all(db)
            .await?
            .iter()
            .map(|m| image_url(tmdb, &tmdb.poster_size, &m.poster))
            .collect(),
        ImageKind::FilmBackdrops => MovieTable::all(db)
            .await?
            .iter()
            .map(|m| image_url(tmdb, &tmdb.backdrop_size, &m.backdrop))
            .collect(),
        ImageKind::FilmProfiles => PersonTable::with_profiles(db)
            .await?
            .iter()
            .map(|p| image_url(tmdb, &tmdb.profile_size, &p.profile))
            .collect(),
        ImageKind::TvPosters => TvTable::all_series(db)
            .await?
            .iter()
            .map(|s| image_url(tmdb, &tmdb.poster_size, &s.poster))
            .collect(),
        ImageKind::TvBackdrops => TvTable::all_series(db)
            .await?
            .iter()
            .map(|s| image_url(tmdb, &tmdb.backdrop_size, &s.backdrop))
            .collect(),
        ImageKind::TvStills => TvTable::all_episodes(db)
            .await?
            .iter()
            .map(|e| image_url(tmdb, &tmdb.still_size, &e.still))
            .collect(),
    };

    Ok(urls.into_iter().filter(|u| !u.is_empty()).collect())
}

/// Warm the cache for one kind of picture
pub async fn warm_images(media: &Media, writer: &ImageWriter, kind: ImageKind) -> Result<SyncSummary> {
    let mut summary = SyncSummary::default();

    for url in image_urls(media, kind).await? {
        match writer.warm(&url).await {
            Ok(true) => summary.added += 1,
            Ok(false) => summary.unchanged += 1,
            Err(e) => {
                warn!("{}: {} failed: {}", kind.name(), url, e);
                summary.failed += 1;
            }
        }
    }

    info!("{} for {}: {}", kind.name(), media.name(), summary);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ImageCache;
    use crate::config::{Config, ImageClientConfig};
    use crate::core::media::tests::test_media;
    use crate::models::Movie;
    use chrono::Utc;

    fn movie(key: &str, poster: &str) -> Movie {
        Movie {
            uuid: crate::utils::hashing::new_uuid(),
            tmid: key.len() as i64,
            title: key.to_string(),
            poster: poster.to_string(),
            key: key.to_string(),
            etag: key.to_string(),
            last_modified: Utc::now(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_poster_urls_skip_missing() {
        let media = test_media(Config::default(), None).await;
        MovieTable::insert(media.db(), &movie("a.mkv", "/a.jpg")).await.unwrap();
        MovieTable::insert(media.db(), &movie("bb.mkv", "")).await.unwrap();

        let urls = image_urls(&media, ImageKind::FilmPosters).await.unwrap();
        assert_eq!(urls, vec!["https://image.tmdb.org/t/p/w342/a.jpg".to_string()]);
    }

    #[tokio::test]
    async fn test_disabled_cache_fetches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let media = test_media(Config::default(), None).await;
        MovieTable::insert(media.db(), &movie("a.mkv", "/a.jpg")).await.unwrap();

        let config = ImageClientConfig {
            use_cache: false,
            ..Default::default()
        };
        let writer = ImageCache::writer(&config, dir.path(), reqwest::Client::new());
        let summary = warm_images(&media, &writer, ImageKind::FilmPosters).await.unwrap();
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.added, 0);
    }
}
