//! Cover Art Archive probe
//!
//! Release artwork flags come with the MusicBrainz release; release group
//! artwork is only known by asking the archive.

use anyhow::Result;
use reqwest::{Client, StatusCode};

use crate::models::COVER_ART_ARCHIVE;

pub struct CoverArtClient {
    client: Client,
}

impl CoverArtClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// True when the release group has a front image
    pub async fn has_group_front(&self, rgid: &str) -> Result<bool> {
        let resp = self.client.head(group_front_url(rgid)).send().await?;
        Ok(match resp.status() {
            StatusCode::NOT_FOUND => false,
            status => status.is_success() || status.is_redirection(),
        })
    }
}

pub fn group_front_url(rgid: &str) -> String {
    format!("{}/release-group/{}/front", COVER_ART_ARCHIVE, rgid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_url() {
        assert_eq!(
            group_front_url("rg"),
            "https://coverartarchive.org/release-group/rg/front"
        );
    }
}
