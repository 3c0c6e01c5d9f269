//! Listening and viewing activity
//!
//! Clients post batches of events; each is stamped with the user, given the
//! server-local calendar day, and completed from the catalogue when it only
//! names a file by etag. Events that still lack their catalogue id are
//! dropped.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;

use crate::db::{
    DbEngine, EventSource, EventTable, MovieTable, PodcastTable, ReleaseTable, TrackTable,
};
use crate::error::{Error, Result};
use crate::models::{
    EpisodeEvent, Event, EventCount, EventKind, Movie, MovieEvent, Release, Track, TrackEvent,
};
use crate::utils::dates::{
    end_of, fill_day_gaps, fill_month_gaps, localize, parse_day, start_of, ChartPoint,
};

const DEFAULT_WINDOW_DAYS: i64 = 30;

/// A catalogue item with when and how often it was played
#[derive(Debug, Clone, Serialize)]
pub struct Played<T> {
    pub date: DateTime<Utc>,
    pub count: i64,
    pub item: T,
}

/// Date window of an activity query, inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Window {
    /// Parse optional `start`/`end` days; the default is the last 30 days
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        let today = Local::now().date_naive();
        let end = match end.filter(|s| !s.is_empty()) {
            Some(value) => parse_day(value).ok_or_else(|| Error::InvalidParameter("end".into()))?,
            None => today,
        };
        let start = match start.filter(|s| !s.is_empty()) {
            Some(value) => {
                parse_day(value).ok_or_else(|| Error::InvalidParameter("start".into()))?
            }
            None => end - chrono::Duration::days(DEFAULT_WINDOW_DAYS),
        };
        if start > end {
            return Err(Error::InvalidParameter("start".into()));
        }
        Ok(Self { start, end })
    }

    pub fn last_month() -> Self {
        let end = Local::now().date_naive();
        Self {
            start: end - chrono::Duration::days(DEFAULT_WINDOW_DAYS),
            end,
        }
    }

    pub fn from(&self) -> DateTime<Utc> {
        start_of(self.start)
    }

    pub fn to(&self) -> DateTime<Utc> {
        end_of(self.end)
    }
}

fn local_day(date: DateTime<Utc>) -> String {
    localize(date).format("%Y-%m-%d").to_string()
}

/// Store a batch of events for `user`. Returns how many were kept.
pub async fn ingest(server: &DbEngine, media: &DbEngine, user: &str, events: Vec<Event>) -> Result<usize> {
    let mut kept = 0;
    for event in events {
        let stored = match event.kind {
            EventKind::Track => ingest_track(server, media, user, event).await?,
            EventKind::Movie => ingest_movie(server, media, user, event).await?,
            EventKind::Episode => ingest_episode(server, media, user, event).await?,
        };
        if stored {
            kept += 1;
        }
    }
    Ok(kept)
}

async fn ingest_track(server: &DbEngine, media: &DbEngine, user: &str, event: Event) -> Result<bool> {
    let mut record = TrackEvent {
        user: user.to_string(),
        date: event.date,
        day: local_day(event.date),
        rid: event.rid,
        rgid: event.rgid,
        etag: event.etag,
        artist: event.artist,
        release: event.release,
        title: event.title,
        ..Default::default()
    };

    if !record.etag.is_empty() {
        if let Some(track) = TrackTable::get_by_etag(media, &record.etag).await? {
            record.rid = track.rid;
            record.rgid = track.rgid;
            record.artist = track.artist;
            record.release = track.release;
            record.title = track.title;
        }
    }
    if record.rid.is_empty() {
        debug!("dropping track event without recording id");
        return Ok(false);
    }

    EventTable::insert_track(server, &record).await?;
    Ok(true)
}

async fn ingest_movie(server: &DbEngine, media: &DbEngine, user: &str, event: Event) -> Result<bool> {
    let mut record = MovieEvent {
        user: user.to_string(),
        date: event.date,
        day: local_day(event.date),
        tmid: event.tmid,
        imid: event.imid,
        etag: event.etag,
        title: event.title,
        ..Default::default()
    };

    if !record.etag.is_empty() {
        if let Some(movie) = MovieTable::get_by_etag(media, &record.etag).await? {
            record.tmid = movie.tmid.to_string();
            record.imid = movie.imid;
            record.title = movie.title;
        }
    }
    if record.tmid.is_empty() {
        debug!("dropping movie event without movie id");
        return Ok(false);
    }

    EventTable::insert_movie(server, &record).await?;
    Ok(true)
}

async fn ingest_episode(server: &DbEngine, media: &DbEngine, user: &str, event: Event) -> Result<bool> {
    if event.eid.is_empty() {
        debug!("dropping episode event without episode id");
        return Ok(false);
    }
    let mut title = event.title;
    if title.is_empty() {
        if let Some(episode) = PodcastTable::episode_by_eid(media, &event.eid).await? {
            title = episode.title;
        }
    }

    let record = EpisodeEvent {
        user: user.to_string(),
        date: event.date,
        day: local_day(event.date),
        eid: event.eid,
        title,
        ..Default::default()
    };
    EventTable::insert_episode(server, &record).await?;
    Ok(true)
}

/// Tracks played in the window, newest first
pub async fn recent_tracks(
    server: &DbEngine,
    media: &DbEngine,
    user: &str,
    window: Window,
    limit: i64,
) -> Result<Vec<Played<Track>>> {
    let events = EventTable::tracks_between(server, user, window.from(), window.to(), limit).await?;
    let mut played = Vec::new();
    for event in events {
        if let Some(track) = TrackTable::get_by_rid(media, &event.rid).await? {
            played.push(Played {
                date: event.date,
                count: 1,
                item: track,
            });
        }
    }
    Ok(played)
}

/// Most played tracks in the window
pub async fn popular_tracks(
    server: &DbEngine,
    media: &DbEngine,
    user: &str,
    window: Window,
    limit: i64,
) -> Result<Vec<Played<Track>>> {
    let groups = EventTable::top_tracks(server, user, window.from(), window.to(), limit).await?;
    let mut played = Vec::new();
    for EventCount { key, count, date } in groups {
        if let Some(track) = TrackTable::get_by_rid(media, &key).await? {
            played.push(Played { date, count, item: track });
        }
    }
    Ok(played)
}

pub async fn recent_movies(
    server: &DbEngine,
    media: &DbEngine,
    user: &str,
    window: Window,
    limit: i64,
) -> Result<Vec<Played<Movie>>> {
    let events = EventTable::movies_between(server, user, window.from(), window.to(), limit).await?;
    let mut played = Vec::new();
    for event in events {
        if let Some(movie) = movie_by_tmid(media, &event.tmid).await? {
            played.push(Played {
                date: event.date,
                count: 1,
                item: movie,
            });
        }
    }
    Ok(played)
}

pub async fn popular_movies(
    server: &DbEngine,
    media: &DbEngine,
    user: &str,
    window: Window,
    limit: i64,
) -> Result<Vec<Played<Movie>>> {
    let groups = EventTable::top_movies(server, user, window.from(), window.to(), limit).await?;
    let mut played = Vec::new();
    for EventCount { key, count, date } in groups {
        if let Some(movie) = movie_by_tmid(media, &key).await? {
            played.push(Played { date, count, item: movie });
        }
    }
    Ok(played)
}

async fn movie_by_tmid(media: &DbEngine, tmid: &str) -> Result<Option<Movie>> {
    match tmid.parse::<i64>() {
        Ok(tmid) => MovieTable::get_by_tmid(media, tmid).await,
        Err(_) => Ok(None),
    }
}

pub async fn recent_releases(
    server: &DbEngine,
    media: &DbEngine,
    user: &str,
    window: Window,
    limit: i64,
) -> Result<Vec<Played<Release>>> {
    let groups = EventTable::recent_releases(server, user, window.from(), window.to(), limit).await?;
    releases_of(media, groups).await
}

pub async fn popular_releases(
    server: &DbEngine,
    media: &DbEngine,
    user: &str,
    window: Window,
    limit: i64,
) -> Result<Vec<Played<Release>>> {
    let groups = EventTable::top_releases(server, user, window.from(), window.to(), limit).await?;
    releases_of(media, groups).await
}

async fn releases_of(media: &DbEngine, groups: Vec<EventCount>) -> Result<Vec<Played<Release>>> {
    let mut played = Vec::new();
    for EventCount { key, count, date } in groups {
        if let Some(release) = ReleaseTable::get_by_rgid(media, &key).await? {
            played.push(Played { date, count, item: release });
        }
    }
    Ok(played)
}

/// Artists by play count in the window
pub async fn popular_artists(server: &DbEngine, user: &str, window: Window, limit: i64) -> Result<Vec<EventCount>> {
    EventTable::top_artists(server, user, window.from(), window.to(), limit).await
}

/// Gap-filled chart of events per day, or per month when `monthly`
pub async fn chart(
    server: &DbEngine,
    source: EventSource,
    user: &str,
    window: Window,
    monthly: bool,
) -> Result<Vec<ChartPoint>> {
    let counts = EventTable::day_counts(server, source, user, window.start, window.end).await?;
    Ok(if monthly {
        fill_month_gaps(window.start, window.end, &counts)
    } else {
        fill_day_gaps(window.start, window.end, &counts)
    })
}
