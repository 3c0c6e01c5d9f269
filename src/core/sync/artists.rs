//! Artist metadata jobs: popular tracks, similar artists, artwork

use anyhow::Result;
use tracing::{debug, info, warn};

use super::music::index_tracks;
use super::SyncSummary;
use crate::client::{CoverArtClient, FanartClient, LastFmClient};
use crate::core::media::Media;
use crate::db::{ArtistTable, ReleaseTable, TrackTable};
use crate::models::{IMAGE_BACKGROUND, IMAGE_THUMB};

/// Refresh each artist's ranked popular titles, then re-index their tracks
pub async fn sync_popular(media: &Media, lastfm: &LastFmClient) -> Result<SyncSummary> {
    let db = media.db();
    let limit = media.config().music.popular_limit;
    let mut summary = SyncSummary::default();

    for artist in ArtistTable::all(db).await? {
        if artist.arid.is_empty() {
            continue;
        }
        let titles: Vec<String> = match lastfm.top_tracks(&artist.arid, limit).await {
            Ok(tracks) => tracks.into_iter().map(|t| t.name).collect(),
            Err(e) => {
                warn!("popular: {} failed: {}", artist.name, e);
                summary.failed += 1;
                continue;
            }
        };
        ArtistTable::replace_popular(db, &artist.name, &titles).await?;
        index_tracks(media, &TrackTable::for_artist(db, &artist.name).await?).await?;
        summary.updated += 1;
    }

    info!("popular for {}: {}", media.name(), summary);
    Ok(summary)
}

/// Refresh each artist's ranked similar artists
pub async fn sync_similar(media: &Media, lastfm: &LastFmClient) -> Result<SyncSummary> {
    let db = media.db();
    let limit = media.config().music.similar_artists_limit;
    let mut summary = SyncSummary::default();

    for artist in ArtistTable::all(db).await? {
        if artist.arid.is_empty() {
            continue;
        }
        match lastfm.similar_artists(&artist.arid, limit).await {
            Ok(similar) => {
                let arids: Vec<String> = similar
                    .into_iter()
                    .map(|s| s.mbid)
                    .filter(|mbid| !mbid.is_empty())
                    .collect();
                ArtistTable::replace_similar(db, &artist.name, &arids).await?;
                summary.updated += 1;
            }
            Err(e) => {
                warn!("similar: {} failed: {}", artist.name, e);
                summary.failed += 1;
            }
        }
    }

    info!("similar for {}: {}", media.name(), summary);
    Ok(summary)
}

/// Probe release group covers for releases without their own artwork,
/// and refresh artist thumbnails and backgrounds
pub async fn sync_covers(media: &Media, coverart: &CoverArtClient, fanart: &FanartClient) -> Result<SyncSummary> {
    let db = media.db();
    let mut summary = SyncSummary::default();

    for release in ReleaseTable::all(db).await? {
        if release.front_artwork || release.group_artwork || release.rgid.is_empty() {
            summary.unchanged += 1;
            continue;
        }
        match coverart.has_group_front(&release.rgid).await {
            Ok(group) => {
                ReleaseTable::update_artwork(db, &release.reid, release.front_artwork, release.back_artwork, group)
                    .await?;
                summary.updated += 1;
            }
            Err(e) => {
                warn!("covers: {} failed: {}", release.name, e);
                summary.failed += 1;
            }
        }
    }

    if fanart.is_enabled() {
        for artist in ArtistTable::all(db).await? {
            if artist.arid.is_empty() {
                continue;
            }
            match fanart.artist_art(&artist.arid).await {
                Ok(art) => {
                    ArtistTable::replace_images(db, &artist.name, IMAGE_THUMB, &art.thumbs()).await?;
                    ArtistTable::replace_images(db, &artist.name, IMAGE_BACKGROUND, &art.backgrounds())
                        .await?;
                }
                Err(e) => debug!("fanart: {} failed: {}", artist.name, e),
            }
        }
    }

    info!("covers for {}: {}", media.name(), summary);
    Ok(summary)
}
