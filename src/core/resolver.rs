//! Playlist reference expansion
//!
//! A reference is a path with an optional query. Each recognised shape maps
//! to a handler producing concrete entries; anything else is dropped. A
//! station or named playlist may itself hold references, which are expanded
//! one level deep only.

use futures::future::{BoxFuture, FutureExt};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::activity::{self, Window};
use super::media::Media;
use super::music;
use crate::client::pls::fetch_pls;
use crate::client::tmdb::image_url;
use crate::config::{MediaType, StreamSource};
use crate::db::{DbEngine, MovieTable, PlaylistTable, PodcastTable, ReleaseTable, StationTable, TrackTable};
use crate::error::{Error, Result};
use crate::models::{Episode, Movie, Series, Station, Track};
use crate::spiff::{Entry, Spiff};
use crate::utils::parsers::{is_audio_url, is_pls_url};

const COVER_SIZE: u32 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefKind {
    ArtistResource,
    ReleaseTracks,
    Track,
    TrackRadio,
    Search,
    Station,
    Playlist,
    Movie,
    Series,
    Episode,
    ActivityTracks,
}

static REFS: Lazy<Vec<(Regex, RefKind)>> = Lazy::new(|| {
    [
        (r"^/music/artists/(\d+)/([a-z]+)$", RefKind::ArtistResource),
        (r"^/music/releases/(\d+)/tracks$", RefKind::ReleaseTracks),
        (r"^/music/tracks/(\d+)$", RefKind::Track),
        (r"^/music/tracks/(\d+)/radio$", RefKind::TrackRadio),
        (r"^/music/search$", RefKind::Search),
        (r"^/music/stations/([^/]+)$", RefKind::Station),
        (r"^/music/playlists/([^/]+)$", RefKind::Playlist),
        (r"^/movies/(\d+)$", RefKind::Movie),
        (r"^/podcasts/series/(\d+)$", RefKind::Series),
        (r"^/podcasts/episodes/(\d+)$", RefKind::Episode),
        (r"^/activity/tracks$", RefKind::ActivityTracks),
    ]
    .into_iter()
    .map(|(pattern, kind)| (Regex::new(pattern).unwrap(), kind))
    .collect()
});

/// Decode a percent-encoded path segment
fn decode_segment(raw: &str) -> String {
    serde_urlencoded::from_str::<Vec<(String, String)>>(&format!("v={}", raw))
        .ok()
        .and_then(|pairs| pairs.into_iter().next())
        .map(|(_, v)| v)
        .unwrap_or_else(|| raw.to_string())
}

fn query_params(query: &str) -> HashMap<String, String> {
    serde_urlencoded::from_str(query).unwrap_or_default()
}

fn date_string(date: Option<chrono::DateTime<chrono::Utc>>) -> String {
    date.map(|d| d.to_rfc3339()).unwrap_or_default()
}

pub fn track_entry(track: &Track, image: String) -> Entry {
    Entry {
        creator: track.artist.clone(),
        album: track.release.clone(),
        title: track.title.clone(),
        image,
        location: vec![track.location()],
        identifier: vec![track.etag.clone()],
        size: vec![track.size],
        date: date_string(track.release_date),
        ..Default::default()
    }
}

pub fn movie_entry(movie: &Movie, image: String) -> Entry {
    Entry {
        creator: String::new(),
        album: movie.title.clone(),
        title: movie.title.clone(),
        image,
        location: vec![movie.location()],
        identifier: vec![movie.etag.clone()],
        size: vec![movie.size],
        date: date_string(movie.date),
        ..Default::default()
    }
}

pub fn episode_entry(series: &Series, episode: &Episode) -> Entry {
    Entry {
        creator: if episode.author.is_empty() {
            series.author.clone()
        } else {
            episode.author.clone()
        },
        album: series.title.clone(),
        title: episode.title.clone(),
        image: series.image.clone(),
        location: vec![episode.location()],
        identifier: vec![episode.eid.clone()],
        size: vec![episode.size],
        date: date_string(episode.date),
        ..Default::default()
    }
}

/// Expands references on behalf of one user
pub struct Resolver<'a> {
    media: &'a Media,
    server: &'a DbEngine,
    client: &'a reqwest::Client,
    user: &'a str,
    covers: Mutex<HashMap<String, String>>,
}

impl<'a> Resolver<'a> {
    pub fn new(media: &'a Media, server: &'a DbEngine, client: &'a reqwest::Client, user: &'a str) -> Self {
        Self {
            media,
            server,
            client,
            user,
            covers: Mutex::new(HashMap::new()),
        }
    }

    pub fn media(&self) -> &'a Media {
        self.media
    }

    pub fn user(&self) -> &'a str {
        self.user
    }

    /// Expand every reference in place, then de-duplicate and retype
    pub async fn resolve(&self, spiff: &mut Spiff) -> Result<()> {
        let entries = std::mem::take(&mut spiff.playlist.entries);
        let mut resolved = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.is_reference() {
                resolved.extend(self.expand(&entry.reference, true).await?);
            } else {
                resolved.push(entry);
            }
        }
        spiff.playlist.entries = resolved;
        spiff.dedup();
        spiff.infer_type();
        Ok(())
    }

    /// Entries for one reference. A reference that cannot be resolved
    /// yields nothing; only store failures are returned.
    pub fn expand<'b>(&'b self, reference: &'b str, nested: bool) -> BoxFuture<'b, Result<Vec<Entry>>> {
        async move {
            match self.dispatch(reference, nested).await {
                Ok(entries) => Ok(entries),
                Err(e) if e.is_not_found() => {
                    debug!("reference {} not found", reference);
                    Ok(vec![])
                }
                Err(e @ Error::Database(_)) => Err(e),
                Err(e) => {
                    warn!("dropping reference {}: {}", reference, e);
                    Ok(vec![])
                }
            }
        }
        .boxed()
    }

    async fn dispatch(&self, reference: &str, nested: bool) -> Result<Vec<Entry>> {
        let (path, query) = reference.split_once('?').unwrap_or((reference, ""));
        let Some((caps, kind)) = REFS
            .iter()
            .find_map(|(re, kind)| re.captures(path).map(|caps| (caps, *kind)))
        else {
            debug!("dropping unrecognised reference {}", reference);
            return Ok(vec![]);
        };
        let id = |i: usize| -> Result<i64> {
            caps.get(i)
                .and_then(|m| m.as_str().parse().ok())
                .ok_or_else(|| Error::InvalidParameter("id".into()))
        };

        match kind {
            RefKind::ArtistResource => {
                let artist = music::artist(self.media, id(1)?).await?;
                let tracks = music::artist_tracks(self.media, &artist, &caps[2]).await?;
                self.track_entries(&tracks).await
            }
            RefKind::ReleaseTracks => {
                let release = ReleaseTable::get_by_id(self.media.db(), id(1)?)
                    .await?
                    .ok_or(Error::NotFound("release"))?;
                let tracks = TrackTable::for_release(self.media.db(), &release.reid).await?;
                self.track_entries(&tracks).await
            }
            RefKind::Track => {
                let track = music::track(self.media, id(1)?).await?;
                self.track_entries(std::slice::from_ref(&track)).await
            }
            RefKind::TrackRadio => {
                let seed = music::track(self.media, id(1)?).await?;
                let tracks = music::track_radio(self.media, &seed).await?;
                self.track_entries(&tracks).await
            }
            RefKind::Search => {
                let params = query_params(query);
                let q = params.get("q").map(|s| s.as_str()).unwrap_or_default();
                if q.is_empty() {
                    return Ok(vec![]);
                }
                let radio = params.get("radio").map(|v| v == "1" || v == "true").unwrap_or(false);
                let matches = params.get("m").and_then(|m| m.parse().ok()).filter(|m| *m > 0);
                let tracks = music::search_tracks(self.media, q, radio, matches).await?;
                self.track_entries(&tracks).await
            }
            RefKind::Station if nested => {
                let station = self.station(&decode_segment(&caps[1])).await?;
                self.station_entries(&station).await
            }
            RefKind::Playlist if nested => self.playlist_entries(&decode_segment(&caps[1])).await,
            RefKind::Station | RefKind::Playlist => {
                debug!("not following nested reference {}", reference);
                Ok(vec![])
            }
            RefKind::Movie => {
                let movie = MovieTable::get_by_id(self.media.db(), id(1)?)
                    .await?
                    .ok_or(Error::NotFound("movie"))?;
                let image = image_url(&self.media.config().tmdb, &self.media.config().tmdb.poster_size, &movie.poster);
                Ok(vec![movie_entry(&movie, image)])
            }
            RefKind::Series => {
                let series = PodcastTable::series_by_id(self.media.db(), id(1)?)
                    .await?
                    .ok_or(Error::NotFound("series"))?;
                let episodes = PodcastTable::episodes(self.media.db(), &series.sid).await?;
                Ok(episodes.iter().map(|e| episode_entry(&series, e)).collect())
            }
            RefKind::Episode => {
                let episode = PodcastTable::episode_by_id(self.media.db(), id(1)?)
                    .await?
                    .ok_or(Error::NotFound("episode"))?;
                let series = PodcastTable::series_by_sid(self.media.db(), &episode.sid)
                    .await?
                    .unwrap_or_default();
                Ok(vec![episode_entry(&series, &episode)])
            }
            RefKind::ActivityTracks => {
                let limit = self.media.config().activity.activity_limit as i64;
                let played = activity::recent_tracks(
                    self.server,
                    self.media.db(),
                    self.user,
                    Window::last_month(),
                    limit,
                )
                .await?;
                let tracks: Vec<Track> = played.into_iter().map(|p| p.item).collect();
                self.track_entries(&tracks).await
            }
        }
    }

    /// Station by numeric id or name, visible to the user
    pub async fn station(&self, id_or_name: &str) -> Result<Station> {
        let station = match id_or_name.parse::<i64>() {
            Ok(id) => StationTable::get_by_id(self.media.db(), id).await?,
            Err(_) => StationTable::get_by_name(self.media.db(), self.user, id_or_name).await?,
        };
        match station {
            Some(station) if station.visible_to(self.user) => Ok(station),
            Some(_) => Err(Error::AccessDenied),
            None => Err(Error::NotFound("station")),
        }
    }

    /// Entries of a station: live streams, or its reference expanded once
    pub async fn station_entries(&self, station: &Station) -> Result<Vec<Entry>> {
        if station.is_stream() {
            return self.stream_entries(station).await;
        }
        self.expand(&station.reference, false).await
    }

    async fn playlist_entries(&self, id_or_name: &str) -> Result<Vec<Entry>> {
        let found = match id_or_name.parse::<i64>() {
            Ok(id) => PlaylistTable::get_by_id(self.media.db(), id).await?,
            Err(_) => PlaylistTable::get_by_name(self.media.db(), self.user, id_or_name).await?,
        };
        let (info, document) = found.ok_or(Error::NotFound("playlist"))?;
        if info.user != self.user {
            return Err(Error::AccessDenied);
        }

        let spiff = Spiff::parse(document.as_bytes())?;
        let mut entries = Vec::new();
        for entry in spiff.playlist.entries {
            if entry.is_reference() {
                entries.extend(self.expand(&entry.reference, false).await?);
            } else {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    async fn stream_entries(&self, station: &Station) -> Result<Vec<Entry>> {
        let reference = station.reference.trim();
        let entry = |title: &str, locations: Vec<String>| Entry {
            creator: station.creator.clone(),
            title: if title.is_empty() {
                station.name.clone()
            } else {
                title.to_string()
            },
            image: station.image.clone(),
            location: locations,
            size: vec![-1],
            ..Default::default()
        };

        if reference.starts_with('[') {
            let sources: Vec<StreamSource> =
                serde_json::from_str(reference).map_err(|_| Error::InvalidContent)?;
            let locations = self.source_locations(sources).await;
            if locations.is_empty() {
                return Ok(vec![]);
            }
            Ok(vec![entry("", locations)])
        } else if is_pls_url(reference) {
            let items = match fetch_pls(self.client, reference).await {
                Ok(items) => items,
                Err(e) => {
                    warn!("station {} stream fetch failed: {}", station.name, e);
                    return Ok(vec![]);
                }
            };
            Ok(items
                .into_iter()
                .map(|item| entry(&item.title, vec![item.file]))
                .collect())
        } else if is_audio_url(reference) {
            Ok(vec![entry("", vec![reference.to_string()])])
        } else {
            warn!("station {} has an unknown stream source", station.name);
            Ok(vec![])
        }
    }

    /// Locations of each source, in source order. `.pls` sources are
    /// fetched concurrently and contribute their first entry.
    async fn source_locations(&self, sources: Vec<StreamSource>) -> Vec<String> {
        let mut locations: Vec<Option<String>> = vec![None; sources.len()];
        let mut fetches = JoinSet::new();

        for (i, source) in sources.into_iter().enumerate() {
            if is_pls_url(&source.url) {
                let client = self.client.clone();
                fetches.spawn(async move { (i, fetch_pls(&client, &source.url).await) });
            } else {
                locations[i] = Some(source.url);
            }
        }

        while let Some(joined) = fetches.join_next().await {
            match joined {
                Ok((i, Ok(items))) => {
                    locations[i] = items.into_iter().next().map(|item| item.file);
                }
                Ok((_, Err(e))) => warn!("stream source fetch failed: {}", e),
                Err(e) => warn!("stream source task failed: {}", e),
            }
        }

        locations.into_iter().flatten().collect()
    }

    async fn cover(&self, track: &Track) -> Result<String> {
        if let Some(cover) = self.covers.lock().get(&track.reid) {
            return Ok(cover.clone());
        }
        let cover = ReleaseTable::get_by_reid(self.media.db(), &track.reid)
            .await?
            .map(|r| r.cover(COVER_SIZE))
            .unwrap_or_default();
        self.covers.lock().insert(track.reid.clone(), cover.clone());
        Ok(cover)
    }

    pub async fn track_entries(&self, tracks: &[Track]) -> Result<Vec<Entry>> {
        let mut entries = Vec::with_capacity(tracks.len());
        for track in tracks {
            entries.push(track_entry(track, self.cover(track).await?));
        }
        Ok(entries)
    }

    /// Copy of `spiff` with API locations replaced by direct bucket URLs
    pub async fn direct_locations(&self, spiff: &Spiff) -> Result<Spiff> {
        static API_LOCATION: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"^/api/(tracks|movies|episodes)/([^/]+)/location$").unwrap()
        });

        let mut direct = spiff.clone();
        for entry in direct.playlist.entries.iter_mut() {
            for location in entry.location.iter_mut() {
                let Some(caps) = API_LOCATION.captures(location) else {
                    continue;
                };
                let db = self.media.db();
                let url = match &caps[1] {
                    "tracks" => match TrackTable::get_by_uuid(db, &caps[2]).await? {
                        Some(track) => Some(self.media.object_url(MediaType::Music, &track.key).await?),
                        None => None,
                    },
                    "movies" => match MovieTable::get_by_uuid(db, &caps[2]).await? {
                        Some(movie) => Some(self.media.object_url(MediaType::Film, &movie.key).await?),
                        None => None,
                    },
                    _ => PodcastTable::episode_by_eid(db, &caps[2]).await?.map(|e| e.url),
                };
                if let Some(url) = url {
                    *location = url;
                }
            }
        }
        Ok(direct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, RadioStream};
    use crate::core::media::tests::test_media;
    use crate::db::Schema;
    use crate::models::station::{SHARED_USER, TYPE_GENRE, TYPE_STREAM};
    use crate::search::Searcher;
    use crate::spiff::PlaylistType;
    use chrono::Utc;

    fn track(n: i64, uuid: &str, etag: &str, title: &str) -> Track {
        Track {
            uuid: uuid.to_string(),
            artist: "Prince".to_string(),
            release: "Purple Rain".to_string(),
            title: title.to_string(),
            track_num: n,
            disc_num: 1,
            rid: format!("rid-{}", n),
            reid: "reid".to_string(),
            rgid: "rgid".to_string(),
            key: format!("Prince/Purple Rain/{:02}-{}.flac", n, title),
            size: 1000 + n,
            etag: etag.to_string(),
            last_modified: Utc::now(),
            ..Default::default()
        }
    }

    async fn fixture() -> (Media, DbEngine, reqwest::Client) {
        let media = test_media(Config::default(), None).await;
        let server = DbEngine::memory(Schema::Server).await.unwrap();
        (media, server, reqwest::Client::new())
    }

    #[tokio::test]
    async fn test_track_reference() {
        let (media, server, client) = fixture().await;
        let uuid = "65de7d6e-faae-4592-a3b8-81eabd18f212";
        let id = TrackTable::insert(media.db(), &track(1, uuid, "E1", "Let's Go Crazy"))
            .await
            .unwrap();

        let resolver = Resolver::new(&media, &server, &client, "alice");
        let mut spiff = Spiff::from_ref("test", format!("/music/tracks/{}", id));
        resolver.resolve(&mut spiff).await.unwrap();

        assert_eq!(spiff.len(), 1);
        let entry = &spiff.playlist.entries[0];
        assert!(entry.reference.is_empty());
        assert_eq!(
            entry.location,
            vec![format!("/api/tracks/{}/location", uuid)]
        );
        assert_eq!(entry.identifier, vec!["E1".to_string()]);
        assert_eq!(spiff.kind, PlaylistType::Music);
    }

    #[tokio::test]
    async fn test_unknown_and_missing_references_are_dropped() {
        let (media, server, client) = fixture().await;
        let resolver = Resolver::new(&media, &server, &client, "alice");

        let mut spiff = Spiff::new(PlaylistType::Music, "test");
        spiff.playlist.entries = vec![
            Entry::reference("/nowhere/1"),
            Entry::reference("/music/tracks/999"),
            Entry::reference("/music/artists/1/bogus"),
        ];
        resolver.resolve(&mut spiff).await.unwrap();
        assert!(spiff.is_empty());
        assert!(!spiff.has_references());
    }

    #[tokio::test]
    async fn test_release_tracks_dedup_in_order() {
        let (media, server, client) = fixture().await;
        let a = TrackTable::insert(media.db(), &track(1, "u1", "E1", "One")).await.unwrap();
        TrackTable::insert(media.db(), &track(2, "u2", "E2", "Two")).await.unwrap();
        let release = crate::models::Release {
            artist: "Prince".to_string(),
            name: "Purple Rain".to_string(),
            reid: "reid".to_string(),
            rgid: "rgid".to_string(),
            ..Default::default()
        };
        let rid = ReleaseTable::upsert(media.db(), &release).await.unwrap();

        let resolver = Resolver::new(&media, &server, &client, "alice");
        let mut spiff = Spiff::new(PlaylistType::Music, "test");
        spiff.playlist.entries = vec![
            Entry::reference(format!("/music/tracks/{}", a)),
            Entry::reference(format!("/music/releases/{}/tracks", rid)),
        ];
        resolver.resolve(&mut spiff).await.unwrap();

        let ids: Vec<_> = spiff.playlist.entries.iter().map(|e| e.identifier[0].as_str()).collect();
        assert_eq!(ids, vec!["E1", "E2"]);
    }

    #[tokio::test]
    async fn test_search_reference() {
        let (media, server, client) = fixture().await;
        let id = TrackTable::insert(media.db(), &track(1, "u1", "E1", "When Doves Cry"))
            .await
            .unwrap();
        let mut docs = crate::search::IndexMap::new();
        docs.insert(
            id.to_string(),
            crate::fields!("artist" => "Prince", "title" => "When Doves Cry", "genre" => ["funk"]),
        );
        media.music_index().index(docs).await.unwrap();

        let resolver = Resolver::new(&media, &server, &client, "alice");
        let entries = resolver
            .expand("/music/search?q=%2Bgenre%3Afunk&radio=1", true)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);

        let entries = resolver.expand("/music/search?q=doves&m=1", true).await.unwrap();
        assert_eq!(entries[0].title, "When Doves Cry");
    }

    #[tokio::test]
    async fn test_station_is_one_hop() {
        let (media, server, client) = fixture().await;
        let id = TrackTable::insert(media.db(), &track(1, "u1", "E1", "One")).await.unwrap();

        let station = Station {
            user: SHARED_USER.to_string(),
            shared: true,
            station_type: TYPE_GENRE.to_string(),
            name: "Loop".to_string(),
            reference: "/music/stations/Loop".to_string(),
            ..Default::default()
        };
        StationTable::upsert(media.db(), &station).await.unwrap();
        let station = Station {
            name: "Single".to_string(),
            reference: format!("/music/tracks/{}", id),
            ..station
        };
        StationTable::upsert(media.db(), &station).await.unwrap();

        let resolver = Resolver::new(&media, &server, &client, "alice");
        assert!(resolver.expand("/music/stations/Loop", true).await.unwrap().is_empty());
        assert_eq!(resolver.expand("/music/stations/Single", true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_direct_stream_station() {
        let (media, server, client) = fixture().await;
        let radio = RadioStream {
            name: "KEXP".to_string(),
            ..Default::default()
        };
        let sources = vec![
            StreamSource {
                content_type: "audio/mpeg".to_string(),
                url: "https://example.com/live.mp3".to_string(),
            },
            StreamSource {
                content_type: "audio/aac".to_string(),
                url: "https://example.com/live.aac".to_string(),
            },
        ];
        let station = Station {
            user: SHARED_USER.to_string(),
            shared: true,
            station_type: TYPE_STREAM.to_string(),
            name: radio.name.clone(),
            reference: serde_json::to_string(&sources).unwrap(),
            ..Default::default()
        };
        StationTable::upsert(media.db(), &station).await.unwrap();

        let resolver = Resolver::new(&media, &server, &client, "alice");
        let mut spiff = Spiff::from_ref("KEXP", "/music/stations/KEXP");
        resolver.resolve(&mut spiff).await.unwrap();
        assert_eq!(spiff.len(), 1);
        assert_eq!(spiff.playlist.entries[0].location.len(), 2);
        assert_eq!(spiff.kind, PlaylistType::Stream);

        let single = Station {
            name: "Direct".to_string(),
            reference: "https://example.com/live.ogg".to_string(),
            ..station
        };
        let single = resolver.stream_entries(&single).await.unwrap();
        assert_eq!(single[0].size, vec![-1]);
    }

    #[tokio::test]
    async fn test_failing_references_are_dropped() {
        let (media, server, client) = fixture().await;
        let id = TrackTable::insert(media.db(), &track(1, "u1", "E1", "One")).await.unwrap();

        let offline = Station {
            user: SHARED_USER.to_string(),
            shared: true,
            station_type: TYPE_STREAM.to_string(),
            name: "Offline".to_string(),
            reference: "http://127.0.0.1:9/offline.pls".to_string(),
            ..Default::default()
        };
        StationTable::upsert(media.db(), &offline).await.unwrap();
        let broken = Station {
            name: "Broken".to_string(),
            reference: "[{\"url\": 7}]".to_string(),
            ..offline.clone()
        };
        StationTable::upsert(media.db(), &broken).await.unwrap();
        let private = Station {
            user: "bob".to_string(),
            shared: false,
            station_type: TYPE_GENRE.to_string(),
            name: "Mine".to_string(),
            reference: format!("/music/tracks/{}", id),
            ..Default::default()
        };
        let private = StationTable::upsert(media.db(), &private).await.unwrap();

        let resolver = Resolver::new(&media, &server, &client, "alice");
        let mut spiff = Spiff::new(PlaylistType::Music, "test");
        spiff.playlist.entries = vec![
            Entry::reference(format!("/music/tracks/{}", id)),
            Entry::reference("/music/stations/Offline"),
            Entry::reference("/music/stations/Broken"),
            Entry::reference(format!("/music/stations/{}", private)),
        ];
        resolver.resolve(&mut spiff).await.unwrap();

        assert_eq!(spiff.len(), 1);
        assert_eq!(spiff.playlist.entries[0].identifier, vec!["E1".to_string()]);
        assert_eq!(spiff.kind, PlaylistType::Music);
    }

    #[tokio::test]
    async fn test_direct_locations() {
        let dir = tempfile::tempdir().unwrap();
        let key = "Prince/Purple Rain/01-One.flac";
        std::fs::create_dir_all(dir.path().join("Prince/Purple Rain")).unwrap();
        std::fs::write(dir.path().join(key), b"x").unwrap();

        let media = test_media(Config::default(), Some(dir.path())).await;
        let server = DbEngine::memory(Schema::Server).await.unwrap();
        let client = reqwest::Client::new();
        let id = TrackTable::insert(media.db(), &track(1, "u1", "E1", "One")).await.unwrap();

        let resolver = Resolver::new(&media, &server, &client, "alice");
        let mut spiff = Spiff::from_ref("t", format!("/music/tracks/{}", id));
        resolver.resolve(&mut spiff).await.unwrap();
        let direct = resolver.direct_locations(&spiff).await.unwrap();
        assert!(direct.playlist.entries[0].location[0].starts_with("file://"));
        assert!(spiff.playlist.entries[0].location[0].starts_with("/api/"));
    }
}
