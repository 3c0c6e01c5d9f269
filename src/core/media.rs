//! Media collections
//!
//! A `Media` bundles what one named collection needs: its layered
//! configuration, catalogue database, search indexes and buckets. Collections
//! are opened on first use and kept for the life of the process.

use anyhow::{Context, Result};
use dashmap::DashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::bucket::{open_bucket, Bucket};
use crate::config::{Config, MediaType, Paths};
use crate::db::{DbEngine, Schema};
use crate::error::Error;
use crate::search::{FtsSearcher, Searcher};

const MUSIC_FACETS: &[&str] = &["artist", "release", "genre", "type", "date", "track", "disc"];
const FILM_FACETS: &[&str] = &["genre", "keyword", "rating", "collection", "date"];
const TV_FACETS: &[&str] = &["series", "genre", "keyword", "rating", "date"];
const PODCAST_FACETS: &[&str] = &["series", "author", "date"];

pub struct Media {
    name: String,
    config: Config,
    db: DbEngine,
    music: Arc<dyn Searcher>,
    film: Arc<dyn Searcher>,
    tv: Arc<dyn Searcher>,
    podcast: Arc<dyn Searcher>,
    buckets: Vec<Arc<dyn Bucket>>,
}

impl std::fmt::Debug for Media {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Media")
            .field("name", &self.name)
            .field("buckets", &self.buckets.len())
            .finish()
    }
}

impl Media {
    /// Open the collection `name` from the data directory
    pub async fn open(name: &str, base: &Config, paths: &Paths) -> Result<Self> {
        let config = base.load_media(paths, name)?;
        let db = DbEngine::open(&paths.media_db_path(name), Schema::Media)
            .await
            .with_context(|| format!("Failed to open database for media '{}'", name))?;
        let mut buckets = Vec::new();
        for bucket in &config.buckets {
            buckets.push(open_bucket(bucket).await?);
        }
        info!("Opened media '{}' with {} buckets", name, buckets.len());
        Self::assemble(name, config, db, buckets).await
    }

    /// Build a collection from parts already opened
    pub async fn assemble(
        name: &str,
        config: Config,
        db: DbEngine,
        buckets: Vec<Arc<dyn Bucket>>,
    ) -> Result<Self> {
        let music = FtsSearcher::open(&db, "music", MUSIC_FACETS).await?;
        let film = FtsSearcher::open(&db, "film", FILM_FACETS).await?;
        let tv = FtsSearcher::open(&db, "tv", TV_FACETS).await?;
        let podcast = FtsSearcher::open(&db, "podcast", PODCAST_FACETS).await?;

        Ok(Self {
            name: name.to_string(),
            config,
            db,
            music: Arc::new(music),
            film: Arc::new(film),
            tv: Arc::new(tv),
            podcast: Arc::new(podcast),
            buckets,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn db(&self) -> &DbEngine {
        &self.db
    }

    pub fn music_index(&self) -> &Arc<dyn Searcher> {
        &self.music
    }

    pub fn film_index(&self) -> &Arc<dyn Searcher> {
        &self.film
    }

    pub fn tv_index(&self) -> &Arc<dyn Searcher> {
        &self.tv
    }

    pub fn podcast_index(&self) -> &Arc<dyn Searcher> {
        &self.podcast
    }

    pub fn buckets(&self, media: MediaType) -> impl Iterator<Item = &Arc<dyn Bucket>> {
        self.buckets.iter().filter(move |b| b.media() == media)
    }

    /// Playable URL of an object.
    ///
    /// A local bucket holding the file wins; otherwise the first remote
    /// bucket presigns the key.
    pub async fn object_url(&self, media: MediaType, key: &str) -> crate::error::Result<String> {
        let mut remote = None;
        for bucket in self.buckets(media) {
            if bucket.is_local() {
                let url = bucket.object_url(key).await?;
                let exists = url
                    .strip_prefix("file://")
                    .map(|path| Path::new(path).exists())
                    .unwrap_or(false);
                if exists {
                    return Ok(url);
                }
            } else if remote.is_none() {
                remote = Some(bucket.clone());
            }
        }

        match remote {
            Some(bucket) => Ok(bucket.object_url(key).await?),
            None => Err(Error::NotFound("object")),
        }
    }
}

/// Process-wide map of opened collections, keyed by name
#[derive(Clone)]
pub struct MediaRegistry {
    config: Arc<Config>,
    paths: Arc<Paths>,
    media: Arc<DashMap<String, Arc<Media>>>,
    opening: Arc<Mutex<()>>,
}

impl MediaRegistry {
    pub fn new(config: Config, paths: Paths) -> Self {
        Self {
            config: Arc::new(config),
            paths: Arc::new(paths),
            media: Arc::new(DashMap::new()),
            opening: Arc::new(Mutex::new(())),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    /// The collection `name`, opening it on first use
    pub async fn get(&self, name: &str) -> Result<Arc<Media>> {
        if let Some(media) = self.cached(name) {
            return Ok(media);
        }

        let _opening = self.opening.lock().await;
        if let Some(media) = self.cached(name) {
            return Ok(media);
        }
        let media = Arc::new(Media::open(name, &self.config, &self.paths).await?);
        self.media.insert(name.to_string(), media.clone());
        Ok(media)
    }

    /// Register an already assembled collection
    pub fn insert(&self, media: Media) -> Arc<Media> {
        let media = Arc::new(media);
        self.media.insert(media.name().to_string(), media.clone());
        media
    }

    fn cached(&self, name: &str) -> Option<Arc<Media>> {
        self.media.get(name).map(|entry| entry.value().clone())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::bucket::{FsBucket, Rewriter};

    /// In-memory collection over an optional local music root
    pub(crate) async fn test_media(config: Config, root: Option<&Path>) -> Media {
        let db = DbEngine::memory(Schema::Media).await.unwrap();
        let buckets: Vec<Arc<dyn Bucket>> = match root {
            Some(root) => vec![Arc::new(FsBucket::new(
                MediaType::Music,
                root.to_path_buf(),
                Rewriter::default(),
            ))],
            None => vec![],
        };
        Media::assemble("test", config, db, buckets).await.unwrap()
    }

    #[tokio::test]
    async fn test_object_url_prefers_existing_local_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.flac"), b"x").unwrap();
        let media = test_media(Config::default(), Some(dir.path())).await;

        let url = media.object_url(MediaType::Music, "a.flac").await.unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("a.flac"));

        assert!(matches!(
            media.object_url(MediaType::Music, "missing.flac").await,
            Err(Error::NotFound(_))
        ));
        assert!(media.object_url(MediaType::Film, "a.flac").await.is_err());
    }

    #[tokio::test]
    async fn test_registry_memoizes() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(Some(dir.path().to_path_buf())).unwrap();
        let registry = MediaRegistry::new(Config::default(), paths);
        registry.insert(test_media(Config::default(), None).await);

        let a = registry.get("test").await.unwrap();
        let b = registry.get("test").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
