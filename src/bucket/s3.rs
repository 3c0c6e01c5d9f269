//! S3-compatible bucket

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tracing::debug;

use super::{Bucket, Object, Rewriter};
use crate::config::{BucketConfig, MediaType};

pub struct S3Bucket {
    media: MediaType,
    client: Client,
    bucket: String,
    prefix: String,
    expiration: Duration,
    rewriter: Rewriter,
}

struct Page {
    objects: Vec<Object>,
    next: Option<String>,
}

impl S3Bucket {
    pub async fn new(config: &BucketConfig, rewriter: Rewriter) -> Result<Self> {
        if config.bucket_name.is_empty() {
            return Err(anyhow!("Bucket for {:?} has neither root nor bucket name", config.media));
        }

        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "takeout",
        );

        let mut builder = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);

        if !config.endpoint.is_empty() {
            let endpoint = if config.endpoint.starts_with("http") {
                config.endpoint.trim_end_matches('/').to_string()
            } else {
                format!("https://{}", config.endpoint.trim_end_matches('/'))
            };
            builder = builder.endpoint_url(endpoint);
        }

        let aws_config = builder.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
            .force_path_style(true)
            .build();

        Ok(Self {
            media: config.media,
            client: Client::from_conf(s3_config),
            bucket: config.bucket_name.clone(),
            prefix: config.object_prefix.clone(),
            expiration: config.url_expiration,
            rewriter,
        })
    }

    async fn page(&self, token: Option<String>, since: Option<DateTime<Utc>>) -> Result<Page> {
        let mut req = self.client.list_objects_v2().bucket(&self.bucket);
        if !self.prefix.is_empty() {
            req = req.prefix(&self.prefix);
        }
        if let Some(token) = token {
            req = req.continuation_token(token);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("list {}/{}", self.bucket, self.prefix))?;

        let mut objects = Vec::new();
        for obj in resp.contents() {
            let Some(key) = obj.key() else { continue };
            let Some(modified) = obj
                .last_modified()
                .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos()))
            else {
                continue;
            };
            if since.map(|s| modified <= s).unwrap_or(false) {
                continue;
            }

            objects.push(Object {
                key: key.to_string(),
                path: self.rewriter.rewrite(key),
                etag: obj.e_tag().unwrap_or_default().trim_matches('"').to_string(),
                size: obj.size().unwrap_or_default(),
                last_modified: modified,
            });
        }

        let next = if resp.is_truncated() == Some(true) {
            resp.next_continuation_token().map(|s| s.to_string())
        } else {
            None
        };

        debug!("{}: {} objects in page", self.bucket, objects.len());
        Ok(Page { objects, next })
    }
}

#[async_trait]
impl Bucket for S3Bucket {
    fn media(&self) -> MediaType {
        self.media
    }

    fn is_local(&self) -> bool {
        false
    }

    fn list(&self, since: Option<DateTime<Utc>>) -> BoxStream<'_, Result<Object>> {
        stream::try_unfold((None::<String>, false), move |(token, done)| async move {
            if done {
                return Ok::<_, anyhow::Error>(None);
            }
            let page = self.page(token, since).await?;
            let last = page.next.is_none();
            Ok(Some((page.objects, (page.next, last))))
        })
        .map_ok(|objects| stream::iter(objects.into_iter().map(Ok)))
        .try_flatten()
        .boxed()
    }

    async fn object_url(&self, key: &str) -> Result<String> {
        let expires = self
            .expiration
            .to_std()
            .context("Invalid url expiration")?;
        let presign = PresigningConfig::expires_in(expires)?;

        let req = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign)
            .await
            .with_context(|| format!("presign {}", key))?;

        Ok(req.uri().to_string())
    }
}
