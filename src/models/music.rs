//! Music catalogue models

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const COVER_ART_ARCHIVE: &str = "https://coverartarchive.org";

/// An artist, keyed by canonical name
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct Artist {
    pub id: i64,
    pub name: String,
    pub sort_name: String,
    /// MusicBrainz artist id
    pub arid: String,
    pub disambiguation: String,
    pub country: String,
    pub area: String,
    pub date: String,
    pub end_date: String,
    pub genre: String,
}

/// Artist artwork from fan art providers
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ArtistImage {
    pub id: i64,
    pub artist: String,
    /// `thumb` or `background`
    pub kind: String,
    pub url: String,
    pub rank: i64,
}

pub const IMAGE_THUMB: &str = "thumb";
pub const IMAGE_BACKGROUND: &str = "background";

/// A release (album, single, EP) of an artist
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct Release {
    pub id: i64,
    /// Artist display name
    pub artist: String,
    pub name: String,
    /// MusicBrainz release group id
    pub rgid: String,
    /// MusicBrainz release id
    pub reid: String,
    pub disambiguation: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub release_type: String,
    pub secondary_types: String,
    pub status: String,
    pub country: String,
    pub track_count: i64,
    pub disc_count: i64,
    pub artwork: bool,
    pub front_artwork: bool,
    pub back_artwork: bool,
    pub group_artwork: bool,
    /// First release date of the group
    pub date: Option<DateTime<Utc>>,
    /// Date of this particular release
    pub release_date: Option<DateTime<Utc>>,
}

impl Release {
    /// Front cover URL at `size` (250, 500 or 1200), or empty without artwork
    pub fn cover(&self, size: u32) -> String {
        if self.artwork && self.front_artwork {
            format!("{}/release/{}/front-{}", COVER_ART_ARCHIVE, self.reid, size)
        } else if self.group_artwork {
            format!("{}/release-group/{}/front-{}", COVER_ART_ARCHIVE, self.rgid, size)
        } else {
            String::new()
        }
    }

    pub fn year(&self) -> Option<i32> {
        self.date.map(|d| d.year())
    }

    pub fn is_single(&self) -> bool {
        self.release_type.eq_ignore_ascii_case("single")
    }
}

/// A playable music file
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct Track {
    pub id: i64,
    pub uuid: String,
    pub artist: String,
    pub release: String,
    pub title: String,
    pub track_num: i64,
    pub disc_num: i64,
    pub track_count: i64,
    pub disc_count: i64,
    /// MusicBrainz recording id
    pub rid: String,
    pub rgid: String,
    pub reid: String,
    pub release_date: Option<DateTime<Utc>>,
    /// Storage key within the bucket
    pub key: String,
    pub size: i64,
    pub etag: String,
    pub last_modified: DateTime<Utc>,
}

impl Track {
    /// API location that redirects to the playable URL
    pub fn location(&self) -> String {
        format!("/api/tracks/{}/location", self.uuid)
    }

    pub fn year(&self) -> Option<i32> {
        self.release_date.map(|d| d.year())
    }
}

/// A popular track title of an artist, ranked from 1
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Popular {
    pub id: i64,
    pub artist: String,
    pub title: String,
    pub rank: i64,
}

/// A similar artist, by MusicBrainz id, ranked from 1
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Similar {
    pub id: i64,
    pub artist: String,
    pub arid: String,
    pub rank: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_cover() {
        let mut release = Release {
            reid: "r1".to_string(),
            rgid: "g1".to_string(),
            ..Default::default()
        };
        assert_eq!(release.cover(250), "");

        release.group_artwork = true;
        assert_eq!(
            release.cover(250),
            "https://coverartarchive.org/release-group/g1/front-250"
        );

        release.artwork = true;
        release.front_artwork = true;
        assert_eq!(
            release.cover(500),
            "https://coverartarchive.org/release/r1/front-500"
        );
    }

    #[test]
    fn test_track_location() {
        let track = Track {
            uuid: "65de7d6e-faae-4592-a3b8-81eabd18f212".to_string(),
            ..Default::default()
        };
        assert_eq!(
            track.location(),
            "/api/tracks/65de7d6e-faae-4592-a3b8-81eabd18f212/location"
        );
    }
}
