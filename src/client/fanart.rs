//! Fanart.tv artist artwork

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Deserialize;

use crate::config::FanartConfig;

const FANART_API_URL: &str = "https://webservice.fanart.tv/v3/music";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FanartImage {
    pub id: String,
    pub url: String,
    pub likes: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArtistArt {
    pub artistthumb: Vec<FanartImage>,
    pub artistbackground: Vec<FanartImage>,
}

impl ArtistArt {
    pub fn thumbs(&self) -> Vec<String> {
        ranked(&self.artistthumb)
    }

    pub fn backgrounds(&self) -> Vec<String> {
        ranked(&self.artistbackground)
    }
}

/// Image URLs ordered by likes, most liked first
fn ranked(images: &[FanartImage]) -> Vec<String> {
    let mut sorted: Vec<&FanartImage> = images.iter().collect();
    sorted.sort_by_key(|i| std::cmp::Reverse(i.likes.parse::<i64>().unwrap_or(0)));
    sorted.into_iter().map(|i| i.url.clone()).collect()
}

pub struct FanartClient {
    client: Client,
    config: FanartConfig,
}

impl FanartClient {
    pub fn new(client: Client, config: FanartConfig) -> Self {
        Self { client, config }
    }

    pub fn is_enabled(&self) -> bool {
        !self.config.project_key.is_empty()
    }

    pub async fn artist_art(&self, arid: &str) -> Result<ArtistArt> {
        if !self.is_enabled() {
            return Err(anyhow!("fanart key not configured"));
        }

        let mut req = self
            .client
            .get(format!("{}/{}", FANART_API_URL, arid))
            .query(&[("api_key", self.config.project_key.as_str())]);
        if !self.config.personal_key.is_empty() {
            req = req.query(&[("client_key", self.config.personal_key.as_str())]);
        }

        let resp = req.send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(ArtistArt::default());
        }
        Ok(resp.error_for_status()?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranked_by_likes() {
        let art: ArtistArt = serde_json::from_value(serde_json::json!({
            "name": "David Bowie",
            "artistthumb": [
                {"id": "1", "url": "http://a/1.jpg", "likes": "2"},
                {"id": "2", "url": "http://a/2.jpg", "likes": "9"}
            ]
        }))
        .unwrap();
        assert_eq!(art.thumbs(), vec!["http://a/2.jpg", "http://a/1.jpg"]);
        assert!(art.backgrounds().is_empty());
    }
}
