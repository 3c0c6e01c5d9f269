//! MusicBrainz client
//!
//! Requests are spaced by the configured interval; MusicBrainz rejects
//! clients that go faster than one request per second.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::MusicBrainzConfig;

const PAGE_LIMIT: usize = 100;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LifeSpan {
    pub begin: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Area {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Tag {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MbArtist {
    pub id: String,
    pub name: String,
    #[serde(rename = "sort-name")]
    pub sort_name: String,
    pub disambiguation: String,
    pub country: Option<String>,
    pub area: Option<Area>,
    #[serde(rename = "life-span")]
    pub life_span: LifeSpan,
    pub genres: Vec<Tag>,
    pub tags: Vec<Tag>,
    pub score: i64,
}

impl MbArtist {
    /// Most voted genre, falling back to tags
    pub fn primary_genre(&self) -> String {
        let source = if self.genres.is_empty() {
            &self.tags
        } else {
            &self.genres
        };
        source
            .iter()
            .max_by_key(|t| t.count)
            .map(|t| t.name.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MbReleaseGroup {
    pub id: String,
    pub title: String,
    #[serde(rename = "primary-type")]
    pub primary_type: Option<String>,
    #[serde(rename = "secondary-types")]
    pub secondary_types: Vec<String>,
    #[serde(rename = "first-release-date")]
    pub first_release_date: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MbRecording {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MbTrack {
    pub id: String,
    pub position: i64,
    pub title: String,
    pub recording: MbRecording,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MbMedia {
    pub position: i64,
    #[serde(rename = "track-count")]
    pub track_count: i64,
    pub tracks: Vec<MbTrack>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CoverArtArchive {
    pub artwork: bool,
    pub front: bool,
    pub back: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MbRelease {
    pub id: String,
    pub title: String,
    pub status: Option<String>,
    pub disambiguation: String,
    pub country: Option<String>,
    pub date: String,
    #[serde(rename = "release-group")]
    pub release_group: MbReleaseGroup,
    pub media: Vec<MbMedia>,
    #[serde(rename = "cover-art-archive")]
    pub cover_art_archive: CoverArtArchive,
}

impl MbRelease {
    pub fn track_count(&self) -> i64 {
        self.media.iter().map(|m| m.track_count).sum()
    }

    pub fn is_official(&self) -> bool {
        self.status.as_deref() == Some("Official")
    }

    /// Recording at `disc`/`position`, discs numbered from 1
    pub fn recording(&self, disc: i64, position: i64) -> Option<&MbTrack> {
        let disc = disc.max(1);
        self.media
            .iter()
            .find(|m| m.position == disc)
            .and_then(|m| m.tracks.iter().find(|t| t.position == position))
    }
}

#[derive(Debug, Deserialize)]
struct ArtistSearch {
    #[serde(default)]
    artists: Vec<MbArtist>,
}

#[derive(Debug, Deserialize)]
struct ReleaseBrowse {
    #[serde(default)]
    releases: Vec<MbRelease>,
    #[serde(default, rename = "release-count")]
    release_count: usize,
}

pub struct MusicBrainzClient {
    client: Client,
    config: MusicBrainzConfig,
    last_request: Mutex<Option<Instant>>,
}

impl MusicBrainzClient {
    pub fn new(client: Client, config: MusicBrainzConfig) -> Self {
        Self {
            client,
            config,
            last_request: Mutex::new(None),
        }
    }

    async fn wait_for_rate_limit(&self) {
        let interval = self.config.request_interval.to_std().unwrap_or_default();
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T> {
        let mut query: Vec<(&str, &str)> = vec![("fmt", "json")];
        query.extend_from_slice(params);
        let url = format!(
            "{}{}?{}",
            self.config.endpoint.trim_end_matches('/'),
            path,
            serde_urlencoded::to_string(&query)?
        );

        self.wait_for_rate_limit().await;
        debug!("musicbrainz {}", url);

        let response = self
            .client
            .get(&url)
            .header("User-Agent", &self.config.user_agent)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            warn!("musicbrainz {} returned {}", path, status);
        }

        response
            .error_for_status()
            .with_context(|| format!("musicbrainz {}", path))?
            .json()
            .await
            .with_context(|| format!("musicbrainz {} body", path))
    }

    pub async fn search_artist(&self, name: &str) -> Result<Vec<MbArtist>> {
        let query = format!("artist:\"{}\"", name.replace('"', ""));
        let result: ArtistSearch = self
            .get("/artist", &[("query", query.as_str())])
            .await?;
        Ok(result.artists)
    }

    pub async fn artist(&self, arid: &str) -> Result<MbArtist> {
        self.get(&format!("/artist/{}", arid), &[("inc", "genres+tags")])
            .await
    }

    /// All releases of an artist with media and recordings
    pub async fn releases(&self, arid: &str) -> Result<Vec<MbRelease>> {
        let mut releases = Vec::new();
        loop {
            let offset = releases.len().to_string();
            let limit = PAGE_LIMIT.to_string();
            let page: ReleaseBrowse = self
                .get(
                    "/release",
                    &[
                        ("artist", arid),
                        ("inc", "release-groups+media+recordings"),
                        ("limit", limit.as_str()),
                        ("offset", offset.as_str()),
                    ],
                )
                .await?;

            let count = page.releases.len();
            releases.extend(page.releases);
            if count == 0 || releases.len() >= page.release_count {
                break;
            }
        }
        Ok(releases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_json() {
        let json = r#"{
            "id": "b1e1",
            "title": "Low",
            "status": "Official",
            "country": "GB",
            "date": "1977-01-14",
            "release-group": {
                "id": "rg1",
                "title": "Low",
                "primary-type": "Album",
                "secondary-types": [],
                "first-release-date": "1977-01-14"
            },
            "media": [
                {"position": 1, "track-count": 2, "tracks": [
                    {"id": "t1", "position": 1, "title": "Speed of Life", "recording": {"id": "r1", "title": "Speed of Life"}},
                    {"id": "t2", "position": 2, "title": "Breaking Glass", "recording": {"id": "r2", "title": "Breaking Glass"}}
                ]}
            ],
            "cover-art-archive": {"artwork": true, "front": true, "back": false}
        }"#;
        let release: MbRelease = serde_json::from_str(json).unwrap();
        assert!(release.is_official());
        assert_eq!(release.track_count(), 2);
        assert_eq!(release.recording(1, 2).unwrap().recording.id, "r2");
        assert_eq!(release.recording(0, 1).unwrap().recording.id, "r1");
        assert!(release.recording(2, 1).is_none());
        assert!(release.cover_art_archive.front);
    }

    #[test]
    fn test_primary_genre() {
        let artist = MbArtist {
            tags: vec![
                Tag { name: "art rock".to_string(), count: 3 },
                Tag { name: "glam".to_string(), count: 5 },
            ],
            ..Default::default()
        };
        assert_eq!(artist.primary_genre(), "glam");
    }
}
