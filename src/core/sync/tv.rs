//! TV ingestion
//!
//! File names are `<series> (<year>) S<nn>E<nn>[ - <title>].(mkv|mp4)`.
//! Series metadata is fetched once per pass; episode metadata per file.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use super::film::{credit_rows, store_people};
use super::{list_objects, prefer, Outcome, SyncSummary};
use crate::bucket::Object;
use crate::client::tmdb::{preferred_rating, EpisodeDetail, TvDetail, TvResult};
use crate::client::VideoCatalog;
use crate::config::MediaType;
use crate::core::media::Media;
use crate::db::{PersonTable, TvTable};
use crate::error::Error;
use crate::models::{TvEpisode, TvSeries};
use crate::search::IndexMap;
use crate::utils::dates::parse_catalog_date;
use crate::utils::hashing::{fuzzy_name, new_uuid, sort_name};
use crate::utils::parsers::{parse_episode, EpisodeFile};

pub struct TvSync<'a> {
    media: &'a Media,
    catalog: &'a dyn VideoCatalog,
    series: HashMap<String, Option<i64>>,
    seasons: HashSet<(i64, i64)>,
    people: HashSet<i64>,
}

impl<'a> TvSync<'a> {
    pub fn new(media: &'a Media, catalog: &'a dyn VideoCatalog) -> Self {
        Self {
            media,
            catalog,
            series: HashMap::new(),
            seasons: HashSet::new(),
            people: HashSet::new(),
        }
    }

    /// Ingest objects modified after `since`, or after the newest stored episode
    pub async fn run(&mut self, since: Option<DateTime<Utc>>) -> Result<SyncSummary> {
        let since = match since {
            Some(since) => Some(since),
            None => TvTable::last_modified(self.media.db()).await?,
        };
        let mut summary = SyncSummary::default();

        let media = self.media;
        for bucket in media.buckets(MediaType::Tv) {
            let objects = list_objects(bucket, since).await?;
            debug!("tv: {} objects since {:?}", objects.len(), since);
            for object in objects {
                match self.ingest(&object).await {
                    Ok(outcome) => summary.record(outcome),
                    Err(e) => {
                        warn!("tv: {} failed: {}", object.key, e);
                        summary.failed += 1;
                    }
                }
            }
        }

        info!("tv sync for {}: {}", self.media.name(), summary);
        Ok(summary)
    }

    async fn ingest(&mut self, object: &Object) -> Result<Outcome> {
        let Some(file) = parse_episode(&object.path) else {
            debug!("tv: skipping {}", object.path);
            return Ok(Outcome::Skipped);
        };

        let db = self.media.db();
        let existing = TvTable::episode_by_key(db, &object.key).await?;
        if let Some(existing) = &existing {
            if existing.etag == object.etag {
                return Ok(Outcome::Unchanged);
            }
        }

        let Some(tvid) = self.sync_series(&file).await? else {
            debug!("tv: no series match for {} ({})", file.series, file.year);
            return Ok(Outcome::Skipped);
        };
        let (season, number) = (file.season as i64, file.episode as i64);

        let duplicate = match TvTable::episode_by_number(db, tvid, season, number).await? {
            Some(other) if other.key != object.key => {
                let policy = self.media.config().tv.duplicate_policy;
                if let Err(e) = prefer(policy, object, other.size) {
                    debug!("tv: {} against {}: {}", object.key, other.key, e);
                    return Ok(Outcome::Skipped);
                }
                Some(other)
            }
            _ => None,
        };

        self.sync_season(tvid, season).await?;
        let detail = self
            .catalog
            .episode_detail(tvid, season, number)
            .await
            .map_err(|_| Error::InvalidEpisode)?;

        if let Some(other) = duplicate {
            debug!("tv: {} replaces {}", object.key, other.key);
            TvTable::delete_episode_by_key(db, &other.key).await?;
            self.media.tv_index().delete(&[other.id.to_string()]).await?;
        }

        let mut episode = episode_row(tvid, &detail, object);
        episode.uuid = existing.as_ref().map(|e| e.uuid.clone()).unwrap_or_else(new_uuid);
        let outcome = match existing {
            Some(existing) => {
                episode.id = existing.id;
                TvTable::update_episode(db, &episode).await?;
                Outcome::Updated
            }
            None => {
                episode.id = TvTable::insert_episode(db, &episode).await?;
                Outcome::Added
            }
        };

        index_episodes(self.media, std::slice::from_ref(&episode)).await?;
        Ok(outcome)
    }

    /// Match and store a series the first time a pass sees it
    async fn sync_series(&mut self, file: &EpisodeFile) -> Result<Option<i64>> {
        let key = format!("{}:{}", fuzzy_name(&file.series), file.year);
        if let Some(tvid) = self.series.get(&key) {
            return Ok(*tvid);
        }

        let results = self.catalog.tv_search(&file.series).await?;
        let tvid = match best_match(&results, file) {
            Some(result) => {
                self.store_series(result.id).await?;
                Some(result.id)
            }
            None => None,
        };
        self.series.insert(key, tvid);
        Ok(tvid)
    }

    async fn store_series(&mut self, tvid: i64) -> Result<()> {
        let db = self.media.db();
        let detail = self.catalog.tv_detail(tvid).await?;
        let ratings = self.catalog.tv_content_ratings(tvid).await?;
        let countries = &self.media.config().tv.release_countries;

        let mut series = series_row(&detail);
        series.rating = preferred_rating(&ratings, countries).unwrap_or_default();
        TvTable::upsert_series(db, &series).await?;
        TvTable::delete_series_dependents(db, tvid).await?;

        let genres: Vec<String> = detail.genres.iter().map(|g| g.name.clone()).collect();
        TvTable::add_genres(db, tvid, &genres).await?;
        let keywords: Vec<String> = self
            .catalog
            .tv_keywords(tvid)
            .await?
            .into_iter()
            .map(|k| k.name)
            .collect();
        TvTable::add_keywords(db, tvid, &keywords).await?;

        let credits = self.catalog.tv_credits(tvid).await?;
        store_people(self.media, self.catalog, &mut self.people, &credits).await?;
        let (cast, crew) = credit_rows(tvid, &credits);
        TvTable::add_cast(db, &cast).await?;
        TvTable::add_crew(db, &crew).await?;
        Ok(())
    }

    /// Fold a season's credits into the series credits once per pass
    async fn sync_season(&mut self, tvid: i64, season: i64) -> Result<()> {
        if !self.seasons.insert((tvid, season)) {
            return Ok(());
        }
        let db = self.media.db();
        let credits = self.catalog.season_credits(tvid, season).await?;
        store_people(self.media, self.catalog, &mut self.people, &credits).await?;

        let known_cast: HashSet<i64> = TvTable::cast(db, tvid).await?.iter().map(|c| c.peid).collect();
        let known_crew: HashSet<(i64, String)> = TvTable::crew(db, tvid)
            .await?
            .into_iter()
            .map(|c| (c.peid, c.job))
            .collect();
        let (cast, crew) = credit_rows(tvid, &credits);
        let cast: Vec<_> = cast.into_iter().filter(|c| !known_cast.contains(&c.peid)).collect();
        let crew: Vec<_> = crew
            .into_iter()
            .filter(|c| !known_crew.contains(&(c.peid, c.job.clone())))
            .collect();
        TvTable::add_cast(db, &cast).await?;
        TvTable::add_crew(db, &crew).await?;
        Ok(())
    }
}

fn best_match<'r>(results: &'r [TvResult], file: &EpisodeFile) -> Option<&'r TvResult> {
    let name = fuzzy_name(&file.series);
    let year = file.year.to_string();
    results.iter().find(|r| {
        (fuzzy_name(&r.name) == name || fuzzy_name(&r.original_name) == name)
            && r.first_air_date.contains(year.as_str())
    })
}

fn series_row(detail: &TvDetail) -> TvSeries {
    TvSeries {
        tvid: detail.id,
        name: detail.name.clone(),
        sort_name: sort_name(&detail.name),
        original_name: detail.original_name.clone(),
        overview: detail.overview.clone(),
        tagline: detail.tagline.clone(),
        vote_average: detail.vote_average,
        vote_count: detail.vote_count,
        season_count: detail.number_of_seasons,
        episode_count: detail.number_of_episodes,
        backdrop: detail.backdrop_path.clone().unwrap_or_default(),
        poster: detail.poster_path.clone().unwrap_or_default(),
        date: parse_catalog_date(&detail.first_air_date),
        end_date: detail.last_air_date.as_deref().and_then(parse_catalog_date),
        ..Default::default()
    }
}

fn episode_row(tvid: i64, detail: &EpisodeDetail, object: &Object) -> TvEpisode {
    TvEpisode {
        tvid,
        name: detail.name.clone(),
        overview: detail.overview.clone(),
        season: detail.season_number,
        episode: detail.episode_number,
        runtime: detail.runtime.unwrap_or_default(),
        vote_average: detail.vote_average,
        vote_count: detail.vote_count,
        still: detail.still_path.clone().unwrap_or_default(),
        date: detail.air_date.as_deref().and_then(parse_catalog_date),
        key: object.key.clone(),
        size: object.size,
        etag: object.etag.clone(),
        last_modified: object.last_modified,
        ..Default::default()
    }
}

/// Write index entries for episodes, keyed by row id
pub async fn index_episodes(media: &Media, episodes: &[TvEpisode]) -> crate::error::Result<()> {
    let db = media.db();
    let mut series: HashMap<i64, Option<TvSeries>> = HashMap::new();
    let mut docs = IndexMap::new();

    for episode in episodes {
        if !series.contains_key(&episode.tvid) {
            series.insert(episode.tvid, TvTable::series_by_tvid(db, episode.tvid).await?);
        }
        let Some(Some(show)) = series.get(&episode.tvid) else {
            continue;
        };
        let genres = TvTable::genres(db, episode.tvid).await?;
        let keywords = TvTable::keywords(db, episode.tvid).await?;
        let peids: Vec<i64> = TvTable::cast(db, episode.tvid)
            .await?
            .iter()
            .map(|c| c.peid)
            .collect();
        let names: Vec<String> = PersonTable::get_by_peids(db, &peids)
            .await?
            .into_iter()
            .map(|p| p.name)
            .collect();

        let mut fields = crate::fields!(
            "series" => show.name,
            "title" => episode.name,
            "season" => episode.season,
            "episode" => episode.episode,
            "genre" => genres,
            "keyword" => keywords,
            "cast" => names,
        );
        if !show.rating.is_empty() {
            fields.insert("rating".into(), serde_json::json!(show.rating));
        }
        if let Some(date) = episode.date {
            fields.insert("date".into(), serde_json::json!(date.format("%Y-%m-%d").to_string()));
        }
        docs.insert(episode.id.to_string(), fields);
    }

    media.tv_index().index(docs).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tmdb::Genre;
    use crate::config::{Config, DuplicatePolicy};
    use crate::core::sync::film::tests::{video_media, weaver, FakeVideo};

    fn catalog() -> FakeVideo {
        let episode = |season, number, name: &str| EpisodeDetail {
            id: season * 100 + number,
            name: name.to_string(),
            season_number: season,
            episode_number: number,
            air_date: Some("2008-01-20".to_string()),
            ..Default::default()
        };
        FakeVideo {
            series: vec![TvDetail {
                id: 1396,
                name: "Breaking Bad".to_string(),
                original_name: "Breaking Bad".to_string(),
                first_air_date: "2008-01-20".to_string(),
                genres: vec![Genre {
                    id: 18,
                    name: "Drama".to_string(),
                }],
                ..Default::default()
            }],
            episodes: vec![episode(1, 1, "Pilot"), episode(1, 2, "Cat's in the Bag...")],
            credits: weaver(),
            ..Default::default()
        }
    }

    fn library() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let season = dir.path().join("Breaking Bad/Season 1");
        std::fs::create_dir_all(&season).unwrap();
        std::fs::write(season.join("Breaking Bad (2008) S01E01 - Pilot.mkv"), b"one").unwrap();
        std::fs::write(season.join("Breaking Bad (2008) S01E02.mkv"), b"two").unwrap();
        std::fs::write(season.join("Breaking Bad (2008) S01E09.mkv"), b"missing").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_series_fetched_once_per_pass() {
        let dir = library();
        let media = video_media(Config::default(), MediaType::Tv, dir.path()).await;
        let catalog = catalog();

        let summary = TvSync::new(&media, &catalog).run(None).await.unwrap();
        assert_eq!(summary.added, 2);
        assert_eq!(summary.failed, 1);

        assert_eq!(catalog.count("tv_search"), 1);
        assert_eq!(catalog.count("tv_detail"), 1);
        assert_eq!(catalog.count("season_credits"), 1);
        assert_eq!(catalog.count("episode_detail"), 3);

        let db = media.db();
        let series = TvTable::series_by_tvid(db, 1396).await.unwrap().unwrap();
        assert_eq!(series.rating, "TV-14");
        let episodes = TvTable::episodes(db, 1396).await.unwrap();
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[1].name, "Cat's in the Bag...");
        // season credits repeat the series credits and add nothing
        assert_eq!(TvTable::cast(db, 1396).await.unwrap().len(), 1);

        let hits = media
            .tv_index()
            .search("+series:\"breaking bad\" +genre:drama", 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_series_skipped() {
        let dir = library();
        let media = video_media(Config::default(), MediaType::Tv, dir.path()).await;
        let catalog = FakeVideo::default();

        let summary = TvSync::new(&media, &catalog).run(None).await.unwrap();
        assert_eq!(summary.skipped, 3);
        assert_eq!(catalog.count("tv_search"), 1);
    }
    #[tokio::test]
    async fn test_failed_episode_lookup_keeps_stored_copy() {
        let dir = library();
        let mut config = Config::default();
        config.tv.duplicate_policy = DuplicatePolicy::Largest;
        let media = video_media(config, MediaType::Tv, dir.path()).await;
        TvSync::new(&media, &catalog()).run(None).await.unwrap();

        let season = dir.path().join("Breaking Bad/Season 1");
        std::fs::write(season.join("Breaking Bad (2008) S01E01.mkv"), b"a much larger copy").unwrap();
        let offline = FakeVideo {
            offline: true,
            ..catalog()
        };
        let summary = TvSync::new(&media, &offline)
            .run(Some(DateTime::<Utc>::MIN_UTC))
            .await
            .unwrap();
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.unchanged, 2);

        let episodes = TvTable::episodes(media.db(), 1396).await.unwrap();
        assert_eq!(episodes.len(), 2);
        assert!(episodes[0].key.ends_with("S01E01 - Pilot.mkv"));
        let hits = media.tv_index().search("+series:\"breaking bad\"", 10).await.unwrap();
        assert_eq!(hits.len(), 2);
    }
}
