//! Object storage buckets
//!
//! A bucket is either a local directory tree or an S3-compatible bucket.
//! Sync passes list objects newer than a watermark; the HTTP surface turns
//! keys into playable URLs.

mod fs;
mod s3;

pub use fs::FsBucket;
pub use s3::S3Bucket;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use regex::Regex;
use std::sync::Arc;

use crate::config::{BucketConfig, MediaType, RewriteRule};

/// One stored object
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    /// Storage key
    pub key: String,
    /// Key after rewrite rules, used for file name parsing
    pub path: String,
    pub etag: String,
    pub size: i64,
    pub last_modified: DateTime<Utc>,
}

#[async_trait]
pub trait Bucket: Send + Sync {
    /// Media kind this bucket holds
    fn media(&self) -> MediaType;

    /// True when objects are local files served by `/d/`
    fn is_local(&self) -> bool;

    /// Objects modified strictly after `since`, in no particular order
    fn list(&self, since: Option<DateTime<Utc>>) -> BoxStream<'_, Result<Object>>;

    /// A `file://` URL for local buckets, a presigned URL otherwise
    async fn object_url(&self, key: &str) -> Result<String>;
}

/// Ordered regex replacements mapping keys to paths
#[derive(Debug, Clone, Default)]
pub struct Rewriter {
    rules: Vec<(Regex, String)>,
}

impl Rewriter {
    pub fn new(rules: &[RewriteRule]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|r| {
                Regex::new(&r.pattern)
                    .map(|re| (re, r.replace.clone()))
                    .with_context(|| format!("Invalid rewrite pattern '{}'", r.pattern))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn rewrite(&self, key: &str) -> String {
        self.rules
            .iter()
            .fold(key.to_string(), |path, (re, replace)| {
                re.replace_all(&path, replace.as_str()).into_owned()
            })
    }
}

/// Construct one bucket from its configuration
pub async fn open_bucket(config: &BucketConfig) -> Result<Arc<dyn Bucket>> {
    let rewriter = Rewriter::new(&config.rewrite)?;
    let bucket: Arc<dyn Bucket> = match &config.root {
        Some(root) => Arc::new(FsBucket::new(config.media, root.clone(), rewriter)),
        None => Arc::new(S3Bucket::new(config, rewriter).await?),
    };
    Ok(bucket)
}
