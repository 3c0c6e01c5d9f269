//! Film ingestion
//!
//! File names are `<title> (<year>)[ - <quality>].(mkv|mp4)`. A movie binds
//! to the first search result whose fuzzy title matches and whose release
//! date carries the file's year.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::{list_objects, prefer, Outcome, SyncSummary};
use crate::bucket::Object;
use crate::client::tmdb::{Credits, MovieDetail, MovieResult, ReleaseDate, Video};
use crate::client::VideoCatalog;
use crate::config::MediaType;
use crate::core::media::Media;
use crate::db::{MovieTable, PersonTable};
use crate::models::{Cast, Crew, Movie, Person, Trailer};
use crate::search::IndexMap;
use crate::utils::dates::parse_catalog_date;
use crate::utils::hashing::{fuzzy_name, new_uuid, sort_name};
use crate::utils::parsers::{parse_movie, MovieFile};

const CAST_LIMIT: usize = 20;
const CREW_JOBS: &[&str] = &["Director", "Screenplay", "Writer", "Producer", "Original Music Composer"];

/// Catalogue data for one movie
struct MovieDetails {
    detail: MovieDetail,
    release: Option<ReleaseDate>,
    keywords: Vec<String>,
    credits: Credits,
    videos: Vec<Video>,
}

pub struct FilmSync<'a> {
    media: &'a Media,
    catalog: &'a dyn VideoCatalog,
    people: HashSet<i64>,
}

impl<'a> FilmSync<'a> {
    pub fn new(media: &'a Media, catalog: &'a dyn VideoCatalog) -> Self {
        Self {
            media,
            catalog,
            people: HashSet::new(),
        }
    }

    /// Ingest objects modified after `since`, or after the newest stored movie
    pub async fn run(&mut self, since: Option<DateTime<Utc>>) -> Result<SyncSummary> {
        let since = match since {
            Some(since) => Some(since),
            None => MovieTable::last_modified(self.media.db()).await?,
        };
        let mut summary = SyncSummary::default();

        let media = self.media;
        for bucket in media.buckets(MediaType::Film) {
            let objects = list_objects(bucket, since).await?;
            debug!("film: {} objects since {:?}", objects.len(), since);
            for object in objects {
                match self.ingest(&object).await {
                    Ok(outcome) => summary.record(outcome),
                    Err(e) => {
                        warn!("film: {} failed: {}", object.key, e);
                        summary.failed += 1;
                    }
                }
            }
        }

        info!("film sync for {}: {}", self.media.name(), summary);
        Ok(summary)
    }

    async fn ingest(&mut self, object: &Object) -> Result<Outcome> {
        let Some(file) = parse_movie(&object.path) else {
            debug!("film: skipping {}", object.path);
            return Ok(Outcome::Skipped);
        };

        let db = self.media.db();
        let existing = MovieTable::get_by_key(db, &object.key).await?;
        if let Some(existing) = &existing {
            if existing.etag == object.etag {
                return Ok(Outcome::Unchanged);
            }
        }

        let results = self.catalog.movie_search(&file.title).await?;
        let Some(result) = best_match(&results, &file) else {
            debug!("film: no match for {} ({})", file.title, file.year);
            return Ok(Outcome::Skipped);
        };

        let duplicate = match MovieTable::get_by_tmid(db, result.id).await? {
            Some(other) if other.key != object.key => {
                let policy = self.media.config().film.duplicate_policy;
                if let Err(e) = prefer(policy, object, other.size) {
                    debug!("film: {} against {}: {}", object.key, other.key, e);
                    return Ok(Outcome::Skipped);
                }
                Some(other)
            }
            _ => None,
        };

        // everything from the catalogue before touching stored rows
        let details = self.fetch(result.id).await?;

        if let Some(other) = duplicate {
            debug!("film: {} replaces {}", object.key, other.key);
            MovieTable::delete_by_key(db, &other.key).await?;
            self.media.film_index().delete(&[other.id.to_string()]).await?;
        }

        let mut movie = movie_row(&details.detail, object);
        movie.uuid = existing.as_ref().map(|m| m.uuid.clone()).unwrap_or_else(new_uuid);
        if let Some(release) = &details.release {
            movie.rating = release.certification.clone();
        }

        MovieTable::delete_dependents(db, movie.tmid).await?;
        let outcome = match existing {
            Some(existing) => {
                movie.id = existing.id;
                MovieTable::update(db, &movie).await?;
                Outcome::Updated
            }
            None => {
                movie.id = MovieTable::insert(db, &movie).await?;
                Outcome::Added
            }
        };

        self.dependents(&movie, &details).await?;
        index_movies(self.media, std::slice::from_ref(&movie)).await?;
        Ok(outcome)
    }

    async fn fetch(&self, tmid: i64) -> Result<MovieDetails> {
        let detail = self.catalog.movie_detail(tmid).await?;
        let countries = &self.media.config().film.release_countries;
        let release = self.catalog.movie_certification(tmid, countries).await?;
        let keywords = self
            .catalog
            .movie_keywords(tmid)
            .await?
            .into_iter()
            .map(|k| k.name)
            .collect();
        let credits = self.catalog.movie_credits(tmid).await?;
        let videos = self.catalog.movie_videos(tmid).await?;
        Ok(MovieDetails {
            detail,
            release,
            keywords,
            credits,
            videos,
        })
    }

    async fn dependents(&mut self, movie: &Movie, details: &MovieDetails) -> Result<()> {
        let db = self.media.db();
        let tmid = movie.tmid;
        let detail = &details.detail;

        let genres: Vec<String> = detail.genres.iter().map(|g| g.name.clone()).collect();
        MovieTable::add_genres(db, tmid, &genres).await?;
        MovieTable::add_keywords(db, tmid, &details.keywords).await?;

        if let Some(collection) = &detail.belongs_to_collection {
            MovieTable::set_collection(db, tmid, &collection.name, collection.id).await?;
        }

        self.store_people(&details.credits).await?;
        let (cast, crew) = credit_rows(tmid, &details.credits);
        MovieTable::add_cast(db, &cast).await?;
        MovieTable::add_crew(db, &crew).await?;

        let trailers: Vec<Trailer> = details
            .videos
            .iter()
            .filter(|v| v.kind == "Trailer")
            .map(|v| Trailer {
                id: 0,
                tmid,
                name: v.name.clone(),
                key: v.key.clone(),
                site: v.site.clone(),
                kind: v.kind.clone(),
            })
            .collect();
        MovieTable::add_trailers(db, &trailers).await?;
        Ok(())
    }

    async fn store_people(&mut self, credits: &Credits) -> Result<()> {
        store_people(self.media, self.catalog, &mut self.people, credits).await
    }
}

/// First search result with the same fuzzy title released in the file's year
fn best_match<'r>(results: &'r [MovieResult], file: &MovieFile) -> Option<&'r MovieResult> {
    let title = fuzzy_name(&file.title);
    let year = file.year.to_string();
    results.iter().find(|r| {
        (fuzzy_name(&r.title) == title || fuzzy_name(&r.original_title) == title)
            && r.release_date.contains(year.as_str())
    })
}

fn movie_row(detail: &MovieDetail, object: &Object) -> Movie {
    Movie {
        tmid: detail.id,
        imid: detail.imdb_id.clone().unwrap_or_default(),
        title: detail.title.clone(),
        sort_title: sort_name(&detail.title),
        original_title: detail.original_title.clone(),
        overview: detail.overview.clone(),
        tagline: detail.tagline.clone(),
        budget: detail.budget,
        revenue: detail.revenue,
        runtime: detail.runtime.unwrap_or_default(),
        vote_average: detail.vote_average,
        vote_count: detail.vote_count,
        backdrop: detail.backdrop_path.clone().unwrap_or_default(),
        poster: detail.poster_path.clone().unwrap_or_default(),
        date: parse_catalog_date(&detail.release_date),
        key: object.key.clone(),
        size: object.size,
        etag: object.etag.clone(),
        last_modified: object.last_modified,
        ..Default::default()
    }
}

/// Cast in billing order and the crew jobs worth showing
pub(super) fn credit_rows(id: i64, credits: &Credits) -> (Vec<Cast>, Vec<Crew>) {
    let cast = credits
        .cast
        .iter()
        .take(CAST_LIMIT)
        .map(|c| Cast {
            id: 0,
            tmid: id,
            peid: c.id,
            character: c.character.clone(),
            rank: c.order,
        })
        .collect();
    let crew = credits
        .crew
        .iter()
        .filter(|c| CREW_JOBS.contains(&c.job.as_str()))
        .map(|c| Crew {
            id: 0,
            tmid: id,
            peid: c.id,
            department: c.department.clone(),
            job: c.job.clone(),
        })
        .collect();
    (cast, crew)
}

/// Fetch and store people not yet seen in this pass or the store
pub(super) async fn store_people(
    media: &Media,
    catalog: &dyn VideoCatalog,
    seen: &mut HashSet<i64>,
    credits: &Credits,
) -> Result<()> {
    let db = media.db();
    let (cast, crew) = credit_rows(0, credits);
    let peids = cast.iter().map(|c| c.peid).chain(crew.iter().map(|c| c.peid));

    for peid in peids {
        if !seen.insert(peid) {
            continue;
        }
        if PersonTable::get_by_peid(db, peid).await?.is_some() {
            continue;
        }
        let detail = catalog.person_detail(peid).await?;
        let person = Person {
            peid: detail.id,
            imid: detail.imdb_id.unwrap_or_default(),
            name: detail.name,
            profile: detail.profile_path.unwrap_or_default(),
            bio: detail.biography,
            birthplace: detail.place_of_birth.unwrap_or_default(),
            birthday: detail.birthday.as_deref().and_then(parse_catalog_date),
            deathday: detail.deathday.as_deref().and_then(parse_catalog_date),
            ..Default::default()
        };
        PersonTable::upsert(db, &person).await?;
    }
    Ok(())
}

/// Write index entries for movies, keyed by row id
pub async fn index_movies(media: &Media, movies: &[Movie]) -> crate::error::Result<()> {
    let db = media.db();
    let mut docs = IndexMap::new();

    for movie in movies {
        let genres = MovieTable::genres(db, movie.tmid).await?;
        let keywords = MovieTable::keywords(db, movie.tmid).await?;
        let cast = MovieTable::cast(db, movie.tmid).await?;
        let peids: Vec<i64> = cast.iter().map(|c| c.peid).collect();
        let names: Vec<String> = PersonTable::get_by_peids(db, &peids)
            .await?
            .into_iter()
            .map(|p| p.name)
            .collect();

        let mut fields = crate::fields!(
            "title" => movie.title,
            "genre" => genres,
            "keyword" => keywords,
            "cast" => names,
        );
        if !movie.rating.is_empty() {
            fields.insert("rating".into(), serde_json::json!(movie.rating));
        }
        if let Some(collection) = MovieTable::collection(db, movie.tmid).await? {
            fields.insert("collection".into(), serde_json::json!(collection.name));
        }
        if let Some(date) = movie.date {
            fields.insert("date".into(), serde_json::json!(date.format("%Y-%m-%d").to_string()));
        }
        docs.insert(movie.id.to_string(), fields);
    }

    media.film_index().index(docs).await
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::bucket::{Bucket, FsBucket, Rewriter};
    use crate::client::tmdb::{
        CastMember, CollectionRef, ContentRating, CrewMember, EpisodeDetail, Genre, Keyword,
        PersonDetail, ReleaseDate, TvDetail, TvResult, Video,
    };
    use crate::config::{Config, DuplicatePolicy};
    use crate::db::{DbEngine, Schema};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::path::Path;
    use std::sync::Arc;

    /// Canned movie and TV catalogue that records calls
    #[derive(Default)]
    pub(crate) struct FakeVideo {
        pub movies: Vec<MovieDetail>,
        pub series: Vec<TvDetail>,
        pub episodes: Vec<EpisodeDetail>,
        pub credits: Credits,
        /// Movie and episode lookups fail while set
        pub offline: bool,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeVideo {
        fn call(&self, name: String) {
            self.calls.lock().push(name);
        }

        pub(crate) fn count(&self, prefix: &str) -> usize {
            self.calls.lock().iter().filter(|c| c.starts_with(prefix)).count()
        }
    }

    #[async_trait]
    impl VideoCatalog for FakeVideo {
        async fn movie_search(&self, query: &str) -> Result<Vec<MovieResult>> {
            self.call(format!("movie_search:{}", query));
            Ok(self
                .movies
                .iter()
                .map(|m| MovieResult {
                    id: m.id,
                    title: m.title.clone(),
                    original_title: m.original_title.clone(),
                    release_date: m.release_date.clone(),
                })
                .collect())
        }

        async fn movie_detail(&self, tmid: i64) -> Result<MovieDetail> {
            self.call(format!("movie_detail:{}", tmid));
            if self.offline {
                anyhow::bail!("catalogue unavailable");
            }
            self.movies
                .iter()
                .find(|m| m.id == tmid)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no movie {}", tmid))
        }

        async fn movie_credits(&self, _tmid: i64) -> Result<Credits> {
            Ok(self.credits.clone())
        }

        async fn movie_keywords(&self, _tmid: i64) -> Result<Vec<Keyword>> {
            Ok(vec![Keyword {
                id: 1,
                name: "space".to_string(),
            }])
        }

        async fn movie_videos(&self, _tmid: i64) -> Result<Vec<Video>> {
            Ok(vec![
                Video {
                    name: "Trailer".to_string(),
                    key: "abc".to_string(),
                    site: "YouTube".to_string(),
                    kind: "Trailer".to_string(),
                },
                Video {
                    name: "Clip".to_string(),
                    key: "def".to_string(),
                    site: "YouTube".to_string(),
                    kind: "Clip".to_string(),
                },
            ])
        }

        async fn movie_certification(&self, _tmid: i64, _countries: &[String]) -> Result<Option<ReleaseDate>> {
            Ok(Some(ReleaseDate {
                certification: "R".to_string(),
                release_date: "1979-05-25T00:00:00.000Z".to_string(),
                kind: 3,
            }))
        }

        async fn tv_search(&self, query: &str) -> Result<Vec<TvResult>> {
            self.call(format!("tv_search:{}", query));
            Ok(self
                .series
                .iter()
                .map(|s| TvResult {
                    id: s.id,
                    name: s.name.clone(),
                    original_name: s.original_name.clone(),
                    first_air_date: s.first_air_date.clone(),
                })
                .collect())
        }

        async fn tv_detail(&self, tvid: i64) -> Result<TvDetail> {
            self.call(format!("tv_detail:{}", tvid));
            self.series
                .iter()
                .find(|s| s.id == tvid)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no series {}", tvid))
        }

        async fn tv_keywords(&self, _tvid: i64) -> Result<Vec<Keyword>> {
            Ok(vec![])
        }

        async fn tv_content_ratings(&self, _tvid: i64) -> Result<Vec<ContentRating>> {
            Ok(vec![ContentRating {
                iso_3166_1: "US".to_string(),
                rating: "TV-14".to_string(),
            }])
        }

        async fn tv_credits(&self, _tvid: i64) -> Result<Credits> {
            Ok(self.credits.clone())
        }

        async fn season_credits(&self, tvid: i64, season: i64) -> Result<Credits> {
            self.call(format!("season_credits:{}:{}", tvid, season));
            Ok(self.credits.clone())
        }

        async fn episode_detail(&self, tvid: i64, season: i64, episode: i64) -> Result<EpisodeDetail> {
            self.call(format!("episode_detail:{}:{}:{}", tvid, season, episode));
            if self.offline {
                anyhow::bail!("catalogue unavailable");
            }
            self.episodes
                .iter()
                .find(|e| e.season_number == season && e.episode_number == episode)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no episode"))
        }

        async fn person_detail(&self, peid: i64) -> Result<PersonDetail> {
            self.call(format!("person_detail:{}", peid));
            Ok(PersonDetail {
                id: peid,
                name: format!("Person {}", peid),
                ..Default::default()
            })
        }

        fn poster_url(&self, path: &str) -> String {
            path.to_string()
        }

        fn backdrop_url(&self, path: &str) -> String {
            path.to_string()
        }

        fn still_url(&self, path: &str) -> String {
            path.to_string()
        }

        fn profile_url(&self, path: &str) -> String {
            path.to_string()
        }
    }

    pub(crate) fn weaver() -> Credits {
        Credits {
            cast: vec![CastMember {
                id: 10205,
                name: "Sigourney Weaver".to_string(),
                character: "Ripley".to_string(),
                order: 0,
                profile_path: None,
            }],
            crew: vec![
                CrewMember {
                    id: 578,
                    name: "Ridley Scott".to_string(),
                    department: "Directing".to_string(),
                    job: "Director".to_string(),
                    profile_path: None,
                },
                CrewMember {
                    id: 9999,
                    name: "Someone".to_string(),
                    department: "Crew".to_string(),
                    job: "Caterer".to_string(),
                    profile_path: None,
                },
            ],
        }
    }

    fn alien() -> MovieDetail {
        MovieDetail {
            id: 348,
            title: "Alien".to_string(),
            original_title: "Alien".to_string(),
            release_date: "1979-05-25".to_string(),
            runtime: Some(117),
            poster_path: Some("/alien.jpg".to_string()),
            genres: vec![Genre {
                id: 27,
                name: "Horror".to_string(),
            }],
            belongs_to_collection: Some(CollectionRef {
                id: 8091,
                name: "Alien Collection".to_string(),
            }),
            ..Default::default()
        }
    }

    fn catalog() -> FakeVideo {
        FakeVideo {
            movies: vec![alien()],
            credits: weaver(),
            ..Default::default()
        }
    }

    pub(crate) async fn video_media(config: Config, media: MediaType, root: &Path) -> Media {
        let db = DbEngine::memory(Schema::Media).await.unwrap();
        let buckets: Vec<Arc<dyn Bucket>> = vec![Arc::new(FsBucket::new(
            media,
            root.to_path_buf(),
            Rewriter::default(),
        ))];
        Media::assemble("test", config, db, buckets).await.unwrap()
    }

    fn everything() -> Option<DateTime<Utc>> {
        Some(DateTime::<Utc>::MIN_UTC)
    }

    #[tokio::test]
    async fn test_sync_movie_with_dependents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Alien (1979).mkv"), b"movie").unwrap();
        std::fs::write(dir.path().join("Alien (1986).mkv"), b"wrong year").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        let media = video_media(Config::default(), MediaType::Film, dir.path()).await;
        let catalog = catalog();

        let summary = FilmSync::new(&media, &catalog).run(None).await.unwrap();
        assert_eq!(summary.added, 1);
        assert_eq!(summary.skipped, 2);

        let db = media.db();
        let movie = MovieTable::get_by_tmid(db, 348).await.unwrap().unwrap();
        assert_eq!(movie.rating, "R");
        assert_eq!(movie.runtime, 117);
        assert_eq!(movie.key, "Alien (1979).mkv");
        assert_eq!(MovieTable::genres(db, 348).await.unwrap(), vec!["Horror"]);
        assert_eq!(MovieTable::trailers(db, 348).await.unwrap().len(), 1);
        assert_eq!(MovieTable::crew(db, 348).await.unwrap().len(), 1);
        assert!(PersonTable::get_by_peid(db, 10205).await.unwrap().is_some());

        let hits = media
            .film_index()
            .search("+collection:\"Alien Collection\" +rating:R", 10)
            .await
            .unwrap();
        assert_eq!(hits, vec![movie.id.to_string()]);
    }

    #[tokio::test]
    async fn test_resync_keeps_uuid() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Alien (1979).mkv"), b"movie").unwrap();
        let media = video_media(Config::default(), MediaType::Film, dir.path()).await;
        let catalog = catalog();

        FilmSync::new(&media, &catalog).run(None).await.unwrap();
        let first = MovieTable::get_by_tmid(media.db(), 348).await.unwrap().unwrap();

        let summary = FilmSync::new(&media, &catalog).run(everything()).await.unwrap();
        assert_eq!(summary.unchanged, 1);
        let second = MovieTable::get_by_tmid(media.db(), 348).await.unwrap().unwrap();
        assert_eq!(first.uuid, second.uuid);
        assert_eq!(catalog.count("person_detail"), 2);
    }

    #[tokio::test]
    async fn test_duplicate_policy() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Alien (1979) - SD.mkv"), b"small").unwrap();
        let mut config = Config::default();
        config.film.duplicate_policy = DuplicatePolicy::Largest;
        let media = video_media(config, MediaType::Film, dir.path()).await;
        let catalog = catalog();
        FilmSync::new(&media, &catalog).run(None).await.unwrap();

        std::fs::write(dir.path().join("Alien (1979) - HD.mkv"), b"much larger file").unwrap();
        let summary = FilmSync::new(&media, &catalog).run(everything()).await.unwrap();
        assert_eq!(summary.added, 1);

        let movies = MovieTable::all(media.db()).await.unwrap();
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].key, "Alien (1979) - HD.mkv");

        // the smaller copy now loses against the stored one
        let summary = FilmSync::new(&media, &catalog).run(everything()).await.unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(MovieTable::all(media.db()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_catalogue_failure_keeps_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Alien (1979) - SD.mkv"), b"small").unwrap();
        let mut config = Config::default();
        config.film.duplicate_policy = DuplicatePolicy::Largest;
        let media = video_media(config, MediaType::Film, dir.path()).await;
        FilmSync::new(&media, &catalog()).run(None).await.unwrap();
        let stored = MovieTable::get_by_tmid(media.db(), 348).await.unwrap().unwrap();

        std::fs::write(dir.path().join("Alien (1979) - HD.mkv"), b"much larger file").unwrap();
        let offline = FakeVideo {
            offline: true,
            ..catalog()
        };
        let summary = FilmSync::new(&media, &offline).run(everything()).await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(offline.count("movie_detail"), 1);

        let movies = MovieTable::all(media.db()).await.unwrap();
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].key, "Alien (1979) - SD.mkv");
        assert_eq!(movies[0].uuid, stored.uuid);
        let hits = media.film_index().search("title:alien", 10).await.unwrap();
        assert_eq!(hits, vec![stored.id.to_string()]);
    }

    #[test]
    fn test_best_match_uses_year() {
        let results = vec![
            MovieResult {
                id: 1,
                title: "Dune".to_string(),
                release_date: "1984-12-14".to_string(),
                ..Default::default()
            },
            MovieResult {
                id: 2,
                title: "Dune".to_string(),
                release_date: "2021-09-15".to_string(),
                ..Default::default()
            },
        ];
        let file = MovieFile {
            title: "Dune".to_string(),
            year: 2021,
            quality: None,
        };
        assert_eq!(best_match(&results, &file).map(|r| r.id), Some(2));
    }
}
