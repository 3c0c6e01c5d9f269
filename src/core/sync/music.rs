//! Music ingestion
//!
//! Paths are `<artist>/<release>/<track>-<title>.<ext>`. Artists resolve
//! through the override table or a catalogue search; a track binds to a
//! release only when the normalised titles agree and the release has a
//! recording at the track's disc and position.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::{list_objects, Outcome, SyncSummary};
use crate::bucket::Object;
use crate::client::musicbrainz::{MbArtist, MbRelease};
use crate::client::MusicCatalog;
use crate::config::MediaType;
use crate::core::media::Media;
use crate::db::{ArtistTable, ReleaseTable, TrackTable};
use crate::models::{Artist, Release, Track};
use crate::search::IndexMap;
use crate::utils::dates::parse_catalog_date;
use crate::utils::hashing::{fuzzy_name, new_uuid};
use crate::utils::parsers::{parse_track, TrackFile};

/// Constraints on one music pass
#[derive(Debug, Clone, Default)]
pub struct MusicOptions {
    /// Only objects modified after this; defaults to the newest stored track
    pub since: Option<DateTime<Utc>>,
    /// Only this artist's directory
    pub artist: Option<String>,
    /// Retry catalogue resolution for tracks stored without a recording
    pub resolve: bool,
}

pub struct MusicSync<'a> {
    media: &'a Media,
    catalog: &'a dyn MusicCatalog,
    artists: HashMap<String, Option<Artist>>,
    releases: HashMap<String, Vec<MbRelease>>,
}

impl<'a> MusicSync<'a> {
    pub fn new(media: &'a Media, catalog: &'a dyn MusicCatalog) -> Self {
        Self {
            media,
            catalog,
            artists: HashMap::new(),
            releases: HashMap::new(),
        }
    }

    pub async fn run(&mut self, options: &MusicOptions) -> Result<SyncSummary> {
        let db = self.media.db();
        let since = match options.since {
            Some(since) => Some(since),
            None => TrackTable::last_modified(db).await?,
        };
        let mut summary = SyncSummary::default();

        let media = self.media;
        for bucket in media.buckets(MediaType::Music) {
            let objects = list_objects(bucket, since).await?;
            debug!("music: {} objects since {:?}", objects.len(), since);
            for object in objects {
                match self.ingest(&object, options).await {
                    Ok(outcome) => summary.record(outcome),
                    Err(e) => {
                        warn!("music: {} failed: {}", object.key, e);
                        summary.failed += 1;
                    }
                }
            }
        }

        if options.resolve {
            for track in TrackTable::unresolved(db).await? {
                if !self.wanted(&track.artist, options) {
                    continue;
                }
                let key = track.key.clone();
                match self.retry(track).await {
                    Ok(outcome) => summary.record(outcome),
                    Err(e) => {
                        warn!("music: resolving {} failed: {}", key, e);
                        summary.failed += 1;
                    }
                }
            }
        }

        info!("music sync for {}: {}", self.media.name(), summary);
        Ok(summary)
    }

    fn wanted(&self, artist: &str, options: &MusicOptions) -> bool {
        match &options.artist {
            Some(only) => fuzzy_name(only) == fuzzy_name(artist),
            None => true,
        }
    }

    async fn ingest(&mut self, object: &Object, options: &MusicOptions) -> Result<Outcome> {
        let Some(file) = parse_track(&object.path) else {
            debug!("music: skipping {}", object.path);
            return Ok(Outcome::Skipped);
        };
        if !self.wanted(&file.artist, options) {
            return Ok(Outcome::Skipped);
        }

        let db = self.media.db();
        let existing = TrackTable::get_by_key(db, &object.key).await?;
        if let Some(existing) = &existing {
            if existing.etag == object.etag {
                return Ok(Outcome::Unchanged);
            }
        }

        let mut track = Track {
            uuid: existing.as_ref().map(|t| t.uuid.clone()).unwrap_or_else(new_uuid),
            artist: file.artist.clone(),
            release: file.release.clone(),
            title: file.title.clone(),
            track_num: file.track as i64,
            disc_num: file.disc as i64,
            key: object.key.clone(),
            size: object.size,
            etag: object.etag.clone(),
            last_modified: object.last_modified,
            ..Default::default()
        };
        self.resolve(&mut track, &file).await?;

        let outcome = match existing {
            Some(existing) => {
                track.id = existing.id;
                TrackTable::update(db, &track).await?;
                Outcome::Updated
            }
            None => {
                track.id = TrackTable::insert(db, &track).await?;
                Outcome::Added
            }
        };
        index_tracks(self.media, std::slice::from_ref(&track)).await?;
        Ok(outcome)
    }

    async fn retry(&mut self, mut track: Track) -> Result<Outcome> {
        let file = TrackFile {
            artist: track.artist.clone(),
            release: track.release.clone(),
            release_year: track.year(),
            disc: track.disc_num as i32,
            track: track.track_num as i32,
            title: track.title.clone(),
        };
        self.resolve(&mut track, &file).await?;
        if track.rid.is_empty() {
            return Ok(Outcome::Unchanged);
        }
        TrackTable::update(self.media.db(), &track).await?;
        index_tracks(self.media, std::slice::from_ref(&track)).await?;
        Ok(Outcome::Updated)
    }

    /// Bind `track` to catalogue ids where an unambiguous match exists
    async fn resolve(&mut self, track: &mut Track, file: &TrackFile) -> Result<()> {
        let Some(artist) = self.artist(&file.artist).await? else {
            debug!("music: no artist match for {}", file.artist);
            return Ok(());
        };
        track.artist = artist.name.clone();

        self.load_releases(&artist.arid).await?;
        let releases = self
            .releases
            .get(&artist.arid)
            .map(|r| r.as_slice())
            .unwrap_or_default();
        let countries = &self.media.config().music.release_countries;
        let Some(release) = pick_release(releases, file, countries) else {
            debug!("music: no release match for {} / {}", file.artist, file.release);
            return Ok(());
        };
        let Some(recording) = release.recording(file.disc as i64, file.track as i64) else {
            return Ok(());
        };

        let release_date = parse_catalog_date(&release.date)
            .or_else(|| parse_catalog_date(&release.release_group.first_release_date));
        track.release = release.title.clone();
        if !recording.title.is_empty() {
            track.title = recording.title.clone();
        }
        track.rid = recording.recording.id.clone();
        track.reid = release.id.clone();
        track.rgid = release.release_group.id.clone();
        track.release_date = release_date;
        track.track_count = release.track_count();
        track.disc_count = release.media.len() as i64;

        let row = release_row(&artist.name, release, release_date);
        ReleaseTable::upsert(self.media.db(), &row).await?;
        Ok(())
    }

    async fn artist(&mut self, name: &str) -> Result<Option<Artist>> {
        let key = fuzzy_name(name);
        if let Some(cached) = self.artists.get(&key) {
            return Ok(cached.clone());
        }

        let db = self.media.db();
        let mapped = self
            .media
            .config()
            .music
            .artist_map
            .iter()
            .find(|m| fuzzy_name(&m.name) == key)
            .map(|m| m.arid.clone());

        let artist = match ArtistTable::get_by_name(db, name).await? {
            Some(artist) if !artist.arid.is_empty() && mapped.is_none() => Some(artist),
            _ => {
                let found = match mapped {
                    Some(arid) => Some(self.catalog.artist(&arid).await?),
                    None => self
                        .catalog
                        .search_artist(name)
                        .await?
                        .into_iter()
                        .find(|a| fuzzy_name(&a.name) == key),
                };
                match found {
                    Some(mb) => {
                        let mut artist = artist_row(&mb);
                        artist.id = ArtistTable::upsert(db, &artist).await?;
                        Some(artist)
                    }
                    None => None,
                }
            }
        };

        self.artists.insert(key, artist.clone());
        Ok(artist)
    }

    async fn load_releases(&mut self, arid: &str) -> Result<()> {
        if !self.releases.contains_key(arid) {
            let releases = self.catalog.releases(arid).await?;
            self.releases.insert(arid.to_string(), releases);
        }
        Ok(())
    }
}

/// Best release for a file: same normalised title, a recording at the
/// file's position, official first, then preferred country, then earliest.
fn pick_release<'r>(releases: &'r [MbRelease], file: &TrackFile, countries: &[String]) -> Option<&'r MbRelease> {
    let title = fuzzy_name(&file.release);
    let year = file.release_year.map(|y| y.to_string());

    let mut candidates: Vec<&MbRelease> = releases
        .iter()
        .filter(|r| fuzzy_name(&r.title) == title)
        .filter(|r| r.recording(file.disc as i64, file.track as i64).is_some())
        .filter(|r| match &year {
            Some(year) => r.date.starts_with(year.as_str()) || r.release_group.first_release_date.starts_with(year.as_str()),
            None => true,
        })
        .collect();

    let country_rank = |r: &MbRelease| {
        r.country
            .as_ref()
            .and_then(|c| countries.iter().position(|p| p == c))
            .unwrap_or(countries.len())
    };
    candidates.sort_by(|a, b| {
        b.is_official()
            .cmp(&a.is_official())
            .then_with(|| country_rank(a).cmp(&country_rank(b)))
            .then_with(|| a.date.cmp(&b.date))
    });
    candidates.into_iter().next()
}

fn artist_row(mb: &MbArtist) -> Artist {
    Artist {
        id: 0,
        name: mb.name.clone(),
        sort_name: mb.sort_name.clone(),
        arid: mb.id.clone(),
        disambiguation: mb.disambiguation.clone(),
        country: mb.country.clone().unwrap_or_default(),
        area: mb.area.as_ref().map(|a| a.name.clone()).unwrap_or_default(),
        date: mb.life_span.begin.clone().unwrap_or_default(),
        end_date: mb.life_span.end.clone().unwrap_or_default(),
        genre: mb.primary_genre(),
    }
}

fn release_row(artist: &str, release: &MbRelease, date: Option<DateTime<Utc>>) -> Release {
    Release {
        artist: artist.to_string(),
        name: release.title.clone(),
        rgid: release.release_group.id.clone(),
        reid: release.id.clone(),
        disambiguation: release.disambiguation.clone(),
        release_type: release.release_group.primary_type.clone().unwrap_or_default(),
        secondary_types: release.release_group.secondary_types.join(", "),
        status: release.status.clone().unwrap_or_default(),
        country: release.country.clone().unwrap_or_default(),
        track_count: release.track_count(),
        disc_count: release.media.len() as i64,
        artwork: release.cover_art_archive.artwork,
        front_artwork: release.cover_art_archive.front,
        back_artwork: release.cover_art_archive.back,
        date: parse_catalog_date(&release.release_group.first_release_date),
        release_date: date,
        ..Default::default()
    }
}

/// Write index entries for tracks, keyed by row id
pub async fn index_tracks(media: &Media, tracks: &[Track]) -> crate::error::Result<()> {
    let db = media.db();
    let mut genres: HashMap<String, String> = HashMap::new();
    let mut ranks: HashMap<String, HashMap<String, i64>> = HashMap::new();
    let mut docs = IndexMap::new();

    for track in tracks {
        if !genres.contains_key(&track.artist) {
            let genre = ArtistTable::get_by_name(db, &track.artist)
                .await?
                .map(|a| a.genre)
                .unwrap_or_default();
            genres.insert(track.artist.clone(), genre);
        }
        if !ranks.contains_key(&track.artist) {
            let popular = ArtistTable::popular(db, &track.artist)
                .await?
                .into_iter()
                .map(|p| (p.title.to_lowercase(), p.rank))
                .collect();
            ranks.insert(track.artist.clone(), popular);
        }
        let release_type = match ReleaseTable::get_by_reid(db, &track.reid).await? {
            Some(release) => release.release_type,
            None => String::new(),
        };

        let mut fields = crate::fields!(
            "artist" => track.artist,
            "release" => track.release,
            "title" => track.title,
            "track" => track.track_num,
            "disc" => track.disc_num,
        );
        if let Some(genre) = genres.get(&track.artist).filter(|g| !g.is_empty()) {
            fields.insert("genre".into(), serde_json::json!(genre));
        }
        if !release_type.is_empty() {
            fields.insert("type".into(), serde_json::json!(release_type));
        }
        if let Some(date) = track.release_date {
            fields.insert("date".into(), serde_json::json!(date.format("%Y-%m-%d").to_string()));
        }
        if let Some(rank) = ranks
            .get(&track.artist)
            .and_then(|r| r.get(&track.title.to_lowercase()))
        {
            fields.insert("popularity".into(), serde_json::json!(rank));
        }
        docs.insert(track.id.to_string(), fields);
    }

    media.music_index().index(docs).await
}
