//! Last.fm client for popular tracks and similar artists

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::LastFmConfig;

const LASTFM_API_URL: &str = "https://ws.audioscrobbler.com/2.0/";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TopTrack {
    pub name: String,
    pub mbid: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimilarArtist {
    pub name: String,
    pub mbid: String,
}

#[derive(Debug, Deserialize)]
struct TopTracksResponse {
    toptracks: Option<TopTracks>,
}

#[derive(Debug, Deserialize)]
struct TopTracks {
    #[serde(default)]
    track: Vec<TopTrack>,
}

#[derive(Debug, Deserialize)]
struct SimilarResponse {
    similarartists: Option<SimilarArtists>,
}

#[derive(Debug, Deserialize)]
struct SimilarArtists {
    #[serde(default)]
    artist: Vec<SimilarArtist>,
}

pub struct LastFmClient {
    client: Client,
    api_key: String,
    pub enabled: bool,
}

impl LastFmClient {
    pub fn new(client: Client, config: &LastFmConfig) -> Self {
        Self {
            client,
            api_key: config.key.clone(),
            enabled: !config.key.is_empty(),
        }
    }

    async fn call(&self, method: &str, arid: &str, limit: usize) -> Result<serde_json::Value> {
        if !self.enabled {
            return Err(anyhow!("Last.fm key not configured"));
        }

        let limit = limit.to_string();
        let params = [
            ("method", method),
            ("api_key", self.api_key.as_str()),
            ("mbid", arid),
            ("limit", limit.as_str()),
            ("format", "json"),
        ];
        debug!("lastfm {} {}", method, arid);

        let json: serde_json::Value = self
            .client
            .get(LASTFM_API_URL)
            .query(&params)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = json.get("error") {
            let msg = json
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown error");
            return Err(anyhow!("Last.fm error {}: {}", error, msg));
        }

        Ok(json)
    }

    /// Most played tracks of an artist, most popular first
    pub async fn top_tracks(&self, arid: &str, limit: usize) -> Result<Vec<TopTrack>> {
        let json = self.call("artist.gettoptracks", arid, limit).await?;
        let response: TopTracksResponse = serde_json::from_value(json)?;
        let mut tracks = response.toptracks.map(|t| t.track).unwrap_or_default();
        tracks.truncate(limit);
        Ok(tracks)
    }

    /// Similar artists, most similar first
    pub async fn similar_artists(&self, arid: &str, limit: usize) -> Result<Vec<SimilarArtist>> {
        let json = self.call("artist.getsimilar", arid, limit).await?;
        let response: SimilarResponse = serde_json::from_value(json)?;
        let mut artists = response.similarartists.map(|s| s.artist).unwrap_or_default();
        artists.truncate(limit);
        Ok(artists)
    }

    /// Submission is accepted and dropped.
    pub async fn scrobble(&self, user: &str, artist: &str, title: &str) -> Result<()> {
        info!("scrobble {} {} - {} (not submitted)", user, artist, title);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_tracks_json() {
        let json = serde_json::json!({
            "toptracks": {"track": [
                {"name": "Heroes", "mbid": "", "playcount": "100"},
                {"name": "Changes", "mbid": "x"}
            ]}
        });
        let response: TopTracksResponse = serde_json::from_value(json).unwrap();
        let tracks = response.toptracks.unwrap().track;
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].name, "Heroes");
    }

    #[tokio::test]
    async fn test_scrobble_accepts() {
        let client = LastFmClient::new(Client::new(), &LastFmConfig::default());
        assert!(!client.enabled);
        client.scrobble("alice", "Bowie", "Heroes").await.unwrap();
    }
}
