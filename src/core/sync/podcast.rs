//! Podcast ingestion
//!
//! Every configured feed is fetched in full. The store keeps exactly the
//! episodes the current feed lists; anything else is deleted along with its
//! index entry.

use anyhow::Result;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::SyncSummary;
use crate::client::rss::Feed;
use crate::client::FeedSource;
use crate::core::media::Media;
use crate::db::PodcastTable;
use crate::models::{Episode, Series};
use crate::search::IndexMap;
use crate::utils::hashing::{episode_id, md5_hex};

/// Sync every configured feed; one failing feed does not stop the others
pub async fn sync_podcasts(media: &Media, source: &dyn FeedSource) -> Result<SyncSummary> {
    let mut summary = SyncSummary::default();

    for url in &media.config().podcast.series {
        match sync_feed(media, source, url).await {
            Ok(feed) => summary.merge(feed),
            Err(e) => {
                warn!("podcast: {} failed: {}", url, e);
                summary.failed += 1;
            }
        }
    }

    info!("podcast sync for {}: {}", media.name(), summary);
    Ok(summary)
}

/// Sync one feed and retain only the episodes it lists
pub async fn sync_feed(media: &Media, source: &dyn FeedSource, url: &str) -> Result<SyncSummary> {
    let db = media.db();
    let feed = source.feed(url).await?;
    let series = series_row(url, &feed);
    PodcastTable::upsert_series(db, &series).await?;

    let stored = PodcastTable::episodes(db, &series.sid).await?;
    let known: HashSet<&str> = stored.iter().map(|e| e.eid.as_str()).collect();
    let mut summary = SyncSummary::default();
    let mut current = HashSet::new();
    let mut episodes = Vec::new();

    for item in &feed.items {
        if item.url.is_empty() {
            debug!("podcast: {} has no enclosure", item.title);
            summary.skipped += 1;
            continue;
        }
        let eid = episode_id(item.id());
        if !current.insert(eid.clone()) {
            continue;
        }
        let mut episode = Episode {
            eid,
            sid: series.sid.clone(),
            title: item.title.clone(),
            author: if item.author.is_empty() {
                feed.author.clone()
            } else {
                item.author.clone()
            },
            description: item.description.clone(),
            link: item.link.clone(),
            url: item.url.clone(),
            content_type: item.content_type.clone(),
            size: item.size,
            duration: item.duration,
            date: item.date,
            ..Default::default()
        };
        if known.contains(episode.eid.as_str()) {
            summary.updated += 1;
        } else {
            summary.added += 1;
        }
        episode.id = PodcastTable::upsert_episode(db, &episode).await?;
        episodes.push(episode);
    }

    let stale: Vec<&Episode> = stored.iter().filter(|e| !current.contains(&e.eid)).collect();
    if !stale.is_empty() {
        let eids: Vec<String> = stale.iter().map(|e| e.eid.clone()).collect();
        let ids: Vec<String> = stale.iter().map(|e| e.id.to_string()).collect();
        PodcastTable::delete_episodes(db, &eids).await?;
        media.podcast_index().delete(&ids).await?;
        summary.removed += stale.len();
    }

    index_episodes(media, &series, &episodes).await?;
    debug!("podcast: {}: {}", series.title, summary);
    Ok(summary)
}

fn series_row(url: &str, feed: &Feed) -> Series {
    Series {
        sid: md5_hex(url),
        title: feed.title.clone(),
        author: feed.author.clone(),
        description: feed.description.clone(),
        link: url.to_string(),
        image: feed.image.clone(),
        copyright: feed.copyright.clone(),
        date: feed.date,
        ttl: feed.ttl,
        ..Default::default()
    }
}

async fn index_episodes(media: &Media, series: &Series, episodes: &[Episode]) -> crate::error::Result<()> {
    let mut docs = IndexMap::new();
    for episode in episodes {
        let mut fields = crate::fields!(
            "series" => series.title,
            "title" => episode.title,
            "author" => episode.author,
            "description" => episode.description,
        );
        if let Some(date) = episode.date {
            fields.insert("date".into(), serde_json::json!(date.format("%Y-%m-%d").to_string()));
        }
        docs.insert(episode.id.to_string(), fields);
    }
    media.podcast_index().index(docs).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::rss::{parse_feed, FeedItem};
    use crate::config::Config;
    use crate::core::media::tests::test_media;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Science Hour</title>
    <link>https://example.com/show</link>
    <item>
      <title>Episode 2</title>
      <guid>https://example.com/show/2</guid>
      <pubDate>Wed, 04 Dec 2024 10:00:00 +0000</pubDate>
      <enclosure url="https://cdn.example.com/2.mp3" type="audio/mpeg" length="12345"/>
    </item>
    <item>
      <title>Episode 1</title>
      <guid>ep-1</guid>
      <enclosure url="https://cdn.example.com/1.mp3" type="audio/mpeg" length="999"/>
    </item>
  </channel>
</rss>"#;

    /// Serves whatever feed the test last installed
    struct StaticFeed(Mutex<Feed>);

    #[async_trait]
    impl FeedSource for StaticFeed {
        async fn feed(&self, url: &str) -> Result<Feed> {
            if url.contains("broken") {
                anyhow::bail!("unreachable");
            }
            Ok(self.0.lock().clone())
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.podcast.series = vec![
            "https://example.com/show.rss".to_string(),
            "https://broken.example.com/feed".to_string(),
        ];
        config
    }

    #[tokio::test]
    async fn test_sync_retains_feed_episodes() {
        let media = test_media(config(), None).await;
        let source = StaticFeed(Mutex::new(parse_feed(FEED).unwrap()));

        let summary = sync_podcasts(&media, &source).await.unwrap();
        assert_eq!(summary.added, 2);
        assert_eq!(summary.failed, 1);

        let sid = md5_hex("https://example.com/show.rss");
        let series = PodcastTable::series_by_sid(media.db(), &sid).await.unwrap().unwrap();
        assert_eq!(series.title, "Science Hour");
        let hashed = episode_id("https://example.com/show/2");
        assert!(PodcastTable::episode_by_eid(media.db(), &hashed).await.unwrap().is_some());
        assert!(PodcastTable::episode_by_eid(media.db(), "ep-1").await.unwrap().is_some());

        // the feed drops episode 1 and gains episode 3
        {
            let mut feed = source.0.lock();
            feed.items.pop();
            feed.items.push(FeedItem {
                guid: "ep-3".to_string(),
                title: "Episode 3".to_string(),
                url: "https://cdn.example.com/3.mp3".to_string(),
                ..Default::default()
            });
        }
        let summary = sync_podcasts(&media, &source).await.unwrap();
        assert_eq!(summary.added, 1);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.removed, 1);

        let eids = PodcastTable::episode_ids(media.db(), &sid).await.unwrap();
        assert_eq!(eids.len(), 2);
        assert!(!eids.contains(&"ep-1".to_string()));

        let hits = media.podcast_index().search("Episode", 10).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_items_without_enclosure_skipped() {
        let media = test_media(config(), None).await;
        let mut feed = parse_feed(FEED).unwrap();
        feed.items[0].url.clear();
        let source = StaticFeed(Mutex::new(feed));

        let summary = sync_feed(&media, &source, "https://example.com/show.rss").await.unwrap();
        assert_eq!(summary.added, 1);
        assert_eq!(summary.skipped, 1);
    }
}
