//! On-disk cache of upstream images
//!
//! Sync jobs warm the cache through an `ImageWriter`; request handlers get an
//! `ImageCache` reader which can only look up what is already there.

use anyhow::{Context, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::ImageClientConfig;
use crate::utils::hashing::md5_hex;

#[derive(Debug, Clone)]
pub struct ImageCache {
    dir: PathBuf,
    enabled: bool,
}

pub struct ImageWriter {
    cache: ImageCache,
    client: Client,
    user_agent: String,
}

impl ImageCache {
    /// Lookup-only cache for request handlers
    pub fn reader(config: &ImageClientConfig, default_dir: &Path) -> Self {
        Self {
            dir: config
                .cache_dir
                .clone()
                .unwrap_or_else(|| default_dir.to_path_buf()),
            enabled: config.use_cache,
        }
    }

    /// Cache that may fetch upstream
    pub fn writer(config: &ImageClientConfig, default_dir: &Path, client: Client) -> ImageWriter {
        ImageWriter {
            cache: Self::reader(config, default_dir),
            client,
            user_agent: config.user_agent.clone(),
        }
    }

    fn path_for(&self, url: &str) -> PathBuf {
        let hash = md5_hex(url);
        self.dir.join(&hash[..2]).join(hash)
    }

    /// Cached file for `url`, if present
    pub fn lookup(&self, url: &str) -> Option<PathBuf> {
        if !self.enabled || url.is_empty() {
            return None;
        }
        let path = self.path_for(url);
        path.is_file().then_some(path)
    }
}

impl ImageWriter {
    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    /// Ensure `url` is cached; true when it was fetched now
    pub async fn warm(&self, url: &str) -> Result<bool> {
        if !self.cache.enabled || url.is_empty() || self.cache.lookup(url).is_some() {
            return Ok(false);
        }

        let resp = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await?;
        if !resp.status().is_success() {
            debug!("image {} returned {}", url, resp.status());
            return Ok(false);
        }
        let bytes = resp.bytes().await?;

        let path = self.cache.path_for(url);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path).await?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let config = ImageClientConfig::default();
        let cache = ImageCache::reader(&config, dir.path());

        let url = "https://image.tmdb.org/t/p/w342/poster.jpg";
        assert!(cache.lookup(url).is_none());

        let path = cache.path_for(url);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"jpeg").unwrap();
        assert_eq!(cache.lookup(url), Some(path));
    }

    #[tokio::test]
    async fn test_disabled_writer_never_fetches() {
        let dir = tempfile::tempdir().unwrap();
        let config = ImageClientConfig {
            use_cache: false,
            ..Default::default()
        };
        let writer = ImageCache::writer(&config, dir.path(), Client::new());
        assert!(!writer.warm("http://127.0.0.1:9/none.jpg").await.unwrap());
    }
}
