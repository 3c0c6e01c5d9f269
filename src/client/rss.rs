//! RSS podcast feeds

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::Client;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct Feed {
    pub title: String,
    pub author: String,
    pub description: String,
    pub link: String,
    pub image: String,
    pub copyright: String,
    pub date: Option<DateTime<Utc>>,
    pub ttl: i64,
    pub items: Vec<FeedItem>,
}

#[derive(Debug, Clone, Default)]
pub struct FeedItem {
    pub guid: String,
    pub title: String,
    pub author: String,
    pub description: String,
    pub link: String,
    pub url: String,
    pub content_type: String,
    pub size: i64,
    /// Seconds
    pub duration: i64,
    pub date: Option<DateTime<Utc>>,
}

impl FeedItem {
    /// GUID, falling back to the enclosure URL
    pub fn id(&self) -> &str {
        if self.guid.is_empty() {
            &self.url
        } else {
            &self.guid
        }
    }
}

pub struct RssClient {
    client: Client,
}

impl RssClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn fetch(&self, url: &str) -> Result<Feed> {
        debug!("fetching feed {}", url);
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_feed(&body).with_context(|| format!("Failed to parse feed {}", url))
    }
}

pub fn parse_feed(xml: &str) -> Result<Feed> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut feed = Feed::default();
    let mut item: Option<FeedItem> = None;
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = element_name(&e);
                if name == "item" {
                    item = Some(FeedItem::default());
                }
                attributes(&e, &name, &mut feed, item.as_mut())?;
                path.push(name);
            }
            Event::Empty(e) => {
                let name = element_name(&e);
                attributes(&e, &name, &mut feed, item.as_mut())?;
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                text_content(&path, &text, &mut feed, item.as_mut());
            }
            Event::CData(c) => {
                let bytes = c.into_inner();
                let text = String::from_utf8_lossy(&bytes);
                text_content(&path, &text, &mut feed, item.as_mut());
            }
            Event::End(_) => {
                if path.pop().as_deref() == Some("item") {
                    if let Some(done) = item.take() {
                        feed.items.push(done);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(feed)
}

fn element_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn attributes(e: &BytesStart, name: &str, feed: &mut Feed, item: Option<&mut FeedItem>) -> Result<()> {
    match (name, item) {
        ("enclosure", Some(item)) => {
            for attr in e.attributes() {
                let attr = attr?;
                let value = attr.unescape_value()?.into_owned();
                match attr.key.as_ref() {
                    b"url" => item.url = value,
                    b"type" => item.content_type = value,
                    b"length" => item.size = value.trim().parse().unwrap_or(0),
                    _ => {}
                }
            }
        }
        ("itunes:image", None) if feed.image.is_empty() => {
            for attr in e.attributes() {
                let attr = attr?;
                if attr.key.as_ref() == b"href" {
                    feed.image = attr.unescape_value()?.into_owned();
                }
            }
        }
        _ => {}
    }
    Ok(())
}

fn text_content(path: &[String], text: &str, feed: &mut Feed, item: Option<&mut FeedItem>) {
    let Some(current) = path.last().map(|s| s.as_str()) else {
        return;
    };

    if let Some(item) = item {
        match current {
            "title" => item.title.push_str(text),
            "description" => item.description.push_str(text),
            "link" => item.link.push_str(text),
            "guid" => item.guid.push_str(text),
            "author" | "itunes:author" | "dc:creator" if item.author.is_empty() => {
                item.author.push_str(text)
            }
            "pubDate" => item.date = parse_date(text),
            "itunes:duration" => item.duration = parse_duration(text),
            _ => {}
        }
        return;
    }

    let parent = path
        .len()
        .checked_sub(2)
        .and_then(|i| path.get(i))
        .map(|s| s.as_str());
    match (parent, current) {
        (Some("channel"), "title") => feed.title.push_str(text),
        (Some("channel"), "description") => feed.description.push_str(text),
        (Some("channel"), "link") => feed.link.push_str(text),
        (Some("channel"), "copyright") => feed.copyright.push_str(text),
        (Some("channel"), "itunes:author") => feed.author.push_str(text),
        (Some("channel"), "ttl") => feed.ttl = text.trim().parse().unwrap_or(0),
        (Some("channel"), "pubDate") | (Some("channel"), "lastBuildDate") => {
            if feed.date.is_none() {
                feed.date = parse_date(text);
            }
        }
        (Some("image"), "url") if feed.image.is_empty() => feed.image.push_str(text),
        _ => {}
    }
}

fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// `HH:MM:SS`, `MM:SS` or plain seconds
fn parse_duration(value: &str) -> i64 {
    value
        .trim()
        .split(':')
        .try_fold(0i64, |acc, part| part.parse::<i64>().map(|n| acc * 60 + n))
        .unwrap_or(0)
}
