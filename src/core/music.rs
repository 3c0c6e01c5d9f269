//! Music queries shared by views and the resolver

use rand::seq::SliceRandom;
use std::collections::HashSet;

use super::media::Media;
use crate::db::{ArtistTable, TrackTable};
use crate::error::{Error, Result};
use crate::models::{Artist, Track};
use crate::utils::hashing::fuzzy_name;

/// Track lists an artist exposes under `/music/artists/{id}/{resource}`
pub const ARTIST_RESOURCES: &[&str] = &[
    "deep", "popular", "radio", "similar", "shuffle", "playlist", "singles", "tracks",
];

const SEARCH_LIMIT: usize = 100;
const RADIO_SEARCH_LIMIT: usize = 1000;

pub async fn artist(media: &Media, id: i64) -> Result<Artist> {
    ArtistTable::get_by_id(media.db(), id)
        .await?
        .ok_or(Error::NotFound("artist"))
}

pub async fn track(media: &Media, id: i64) -> Result<Track> {
    TrackTable::get_by_id(media.db(), id)
        .await?
        .ok_or(Error::NotFound("track"))
}

fn shuffled(mut tracks: Vec<Track>, limit: usize) -> Vec<Track> {
    tracks.shuffle(&mut rand::thread_rng());
    tracks.truncate(limit);
    tracks
}

async fn similar_names(media: &Media, artist: &Artist) -> Result<Vec<String>> {
    let limit = media.config().music.similar_artists_limit as i64;
    Ok(ArtistTable::similar_artists(media.db(), &artist.name, limit)
        .await?
        .into_iter()
        .map(|a| a.name)
        .collect())
}

/// Tracks of one artist resource; unknown resources are not found
pub async fn artist_tracks(media: &Media, artist: &Artist, resource: &str) -> Result<Vec<Track>> {
    let db = media.db();
    let music = &media.config().music;
    let radio_limit = music.radio_limit;

    let tracks = match resource {
        "tracks" | "playlist" => TrackTable::for_artist(db, &artist.name).await?,
        "singles" => TrackTable::singles(db, &artist.name).await?,
        "popular" => TrackTable::popular(db, &artist.name, music.popular_limit as i64).await?,
        "shuffle" => shuffled(TrackTable::for_artist(db, &artist.name).await?, radio_limit),
        "deep" => {
            let popular: HashSet<String> = ArtistTable::popular(db, &artist.name)
                .await?
                .into_iter()
                .map(|p| p.title.to_lowercase())
                .collect();
            let deep = TrackTable::for_artist(db, &artist.name)
                .await?
                .into_iter()
                .filter(|t| !popular.contains(&t.title.to_lowercase()))
                .collect();
            shuffled(deep, radio_limit)
        }
        "similar" => {
            let names = similar_names(media, artist).await?;
            TrackTable::random_for_artists(db, &names, radio_limit as i64).await?
        }
        "radio" => {
            let mut names = similar_names(media, artist).await?;
            names.push(artist.name.clone());
            TrackTable::random_for_artists(db, &names, radio_limit as i64).await?
        }
        _ => return Err(Error::NotFound("resource")),
    };
    Ok(tracks)
}

/// Radio seeded by one track: the seed, then its artist and similar artists
pub async fn track_radio(media: &Media, seed: &Track) -> Result<Vec<Track>> {
    let radio_limit = media.config().music.radio_limit;
    let mut names = match ArtistTable::get_by_name(media.db(), &seed.artist).await? {
        Some(artist) => similar_names(media, &artist).await?,
        None => vec![],
    };
    names.push(seed.artist.clone());

    let mut tracks = vec![seed.clone()];
    tracks.extend(
        TrackTable::random_for_artists(media.db(), &names, radio_limit as i64)
            .await?
            .into_iter()
            .filter(|t| t.id != seed.id),
    );
    tracks.truncate(radio_limit);
    Ok(tracks)
}

/// Tracks matching a search query, best first
pub async fn search(media: &Media, query: &str, limit: usize) -> Result<Vec<Track>> {
    let keys = media.music_index().search(query, limit).await?;
    let ids: Vec<i64> = keys.iter().filter_map(|k| k.parse().ok()).collect();
    TrackTable::get_by_ids(media.db(), &ids).await
}

/// Search as used by references.
///
/// `radio` shuffles and truncates to the radio limit. `matches` keeps up to
/// that many exact title hits, else exact release hits, else exact artist
/// hits, else the first results.
pub async fn search_tracks(
    media: &Media,
    query: &str,
    radio: bool,
    matches: Option<usize>,
) -> Result<Vec<Track>> {
    if radio {
        let tracks = search(media, query, RADIO_SEARCH_LIMIT).await?;
        return Ok(shuffled(tracks, media.config().music.radio_limit));
    }

    let tracks = search(media, query, SEARCH_LIMIT).await?;
    match matches {
        Some(n) => Ok(best_matches(query, tracks, n)),
        None => Ok(tracks),
    }
}

fn best_matches(query: &str, tracks: Vec<Track>, n: usize) -> Vec<Track> {
    let wanted = fuzzy_name(query);
    fn title(t: &Track) -> &str {
        &t.title
    }
    fn release(t: &Track) -> &str {
        &t.release
    }
    fn artist(t: &Track) -> &str {
        &t.artist
    }
    let tiers: [fn(&Track) -> &str; 3] = [title, release, artist];

    for field in tiers {
        let hits: Vec<Track> = tracks
            .iter()
            .filter(|t| fuzzy_name(field(t)) == wanted)
            .take(n)
            .cloned()
            .collect();
        if !hits.is_empty() {
            return hits;
        }
    }
    tracks.into_iter().take(n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: i64, artist: &str, release: &str, title: &str) -> Track {
        Track {
            id,
            artist: artist.to_string(),
            release: release.to_string(),
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_best_matches_tiers() {
        let tracks = vec![
            track(1, "Prince", "Purple Rain", "Let's Go Crazy"),
            track(2, "Prince", "Purple Rain", "Purple Rain"),
            track(3, "Purple Rain Tribute", "Covers", "Kiss"),
        ];

        let hits = best_matches("purple rain", tracks.clone(), 5);
        assert_eq!(hits.iter().map(|t| t.id).collect::<Vec<_>>(), vec![2]);

        let hits = best_matches("Prince", tracks.clone(), 1);
        assert_eq!(hits.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1]);

        let hits = best_matches("nothing", tracks, 2);
        assert_eq!(hits.len(), 2);
    }
}
