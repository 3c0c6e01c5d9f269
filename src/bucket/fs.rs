//! Local directory bucket

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use super::{Bucket, Object, Rewriter};
use crate::config::MediaType;
use crate::utils::hashing::md5_hex;

pub struct FsBucket {
    media: MediaType,
    root: PathBuf,
    rewriter: Rewriter,
}

impl FsBucket {
    pub fn new(media: MediaType, root: PathBuf, rewriter: Rewriter) -> Self {
        Self {
            media,
            root,
            rewriter,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn scan(root: &Path, rewriter: &Rewriter, since: Option<DateTime<Utc>>) -> Result<Vec<Object>> {
        let mut objects = Vec::new();

        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if name.starts_with('.') {
                continue;
            }

            let meta = entry.metadata()?;
            let modified: DateTime<Utc> = meta.modified()?.into();
            if since.map(|s| modified <= s).unwrap_or(false) {
                continue;
            }

            let key = match entry.path().strip_prefix(root) {
                Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
                Err(_) => continue,
            };
            let size = meta.len() as i64;
            // local files have no content hash; identity is key, size and mtime
            let etag = md5_hex(&format!(
                "{}:{}:{}",
                key,
                size,
                modified.timestamp_nanos_opt().unwrap_or_default()
            ));

            objects.push(Object {
                path: rewriter.rewrite(&key),
                key,
                etag,
                size,
                last_modified: modified,
            });
        }

        Ok(objects)
    }
}

#[async_trait]
impl Bucket for FsBucket {
    fn media(&self) -> MediaType {
        self.media
    }

    fn is_local(&self) -> bool {
        true
    }

    fn list(&self, since: Option<DateTime<Utc>>) -> BoxStream<'_, Result<Object>> {
        let root = self.root.clone();
        let rewriter = self.rewriter.clone();

        let scan = async move {
            debug!("scanning {}", root.display());
            let objects = tokio::task::spawn_blocking(move || Self::scan(&root, &rewriter, since))
                .await
                .context("Directory scan task failed")?;
            objects
        };

        stream::once(scan)
            .flat_map(|result| match result {
                Ok(objects) => stream::iter(objects.into_iter().map(Ok)).boxed(),
                Err(e) => stream::iter(vec![Err(e)]).boxed(),
            })
            .boxed()
    }

    async fn object_url(&self, key: &str) -> Result<String> {
        Ok(format!("file://{}", self.root.join(key).display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_list_and_watermark() {
        let dir = tempfile::tempdir().unwrap();
        let release = dir.path().join("Prince/Purple Rain");
        std::fs::create_dir_all(&release).unwrap();
        std::fs::write(release.join("01-Let's Go Crazy.flac"), b"crazy").unwrap();
        std::fs::write(release.join("02-Take Me with U.flac"), b"take me").unwrap();
        std::fs::write(release.join(".DS_Store"), b"").unwrap();

        let bucket = FsBucket::new(MediaType::Music, dir.path().to_path_buf(), Rewriter::default());
        let mut objects: Vec<Object> = bucket.list(None).try_collect().await.unwrap();
        objects.sort_by(|a, b| a.key.cmp(&b.key));

        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].key, "Prince/Purple Rain/01-Let's Go Crazy.flac");
        assert_eq!(objects[0].path, objects[0].key);
        assert_eq!(objects[0].size, 5);
        assert_eq!(objects[0].etag.len(), 32);

        // listing twice yields the same etags
        let again: Vec<Object> = bucket.list(None).try_collect().await.unwrap();
        assert!(again.iter().any(|o| o.etag == objects[0].etag));

        let newest = objects.iter().map(|o| o.last_modified).max().unwrap();
        let none: Vec<Object> = bucket.list(Some(newest)).try_collect().await.unwrap();
        assert!(none.is_empty());

        let url = bucket.object_url(&objects[0].key).await.unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("01-Let's Go Crazy.flac"));
    }
}
