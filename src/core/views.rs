//! JSON views
//!
//! Each view gathers what one client screen needs from the entity store.
//! Views never mutate anything.

use chrono::{Local, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::activity::{self, Played, Window};
use super::media::Media;
use super::music;
use crate::client::tmdb::image_url;
use crate::db::{
    ArtistTable, DbEngine, MovieTable, PersonTable, PlaylistTable, PodcastTable, ReleaseTable,
    StationTable, TrackTable, TvTable,
};
use crate::error::{Error, Result};
use crate::models::{
    Artist, Cast, Credit, Crew, Episode, Movie, Offset, Person, PlaylistInfo, Release, Series,
    Station, Track, TvEpisode, TvSeries, IMAGE_BACKGROUND, IMAGE_THUMB,
};
use crate::utils::dates::day_in_range;
use crate::utils::hashing::fuzzy_name;

const COVER_SIZE: u32 = 250;
const SEARCH_LIMIT: usize = 100;

#[derive(Debug, Serialize)]
pub struct IndexView {
    /// Milliseconds since the epoch
    pub time: i64,
    pub has_music: bool,
    pub has_movies: bool,
    pub has_tv: bool,
    pub has_podcasts: bool,
}

#[derive(Debug, Serialize)]
pub struct Recommendation {
    pub name: String,
    pub movies: Vec<Movie>,
}

#[derive(Debug, Serialize)]
pub struct HomeView {
    pub added_releases: Vec<Release>,
    pub new_releases: Vec<Release>,
    pub added_movies: Vec<Movie>,
    pub new_movies: Vec<Movie>,
    pub recommend_movies: Vec<Recommendation>,
    pub new_episodes: Vec<Episode>,
}

#[derive(Debug, Serialize)]
pub struct SearchView {
    pub query: String,
    pub artists: Vec<Artist>,
    pub releases: Vec<Release>,
    pub tracks: Vec<Track>,
    pub movies: Vec<Movie>,
    pub hits: usize,
}

#[derive(Debug, Serialize)]
pub struct ArtistsView {
    pub artists: Vec<Artist>,
}

#[derive(Debug, Serialize)]
pub struct ArtistView {
    pub artist: Artist,
    pub image: String,
    pub background: String,
    pub releases: Vec<Release>,
    pub popular: Vec<Track>,
    pub singles: Vec<Track>,
    pub similar: Vec<Artist>,
}

#[derive(Debug, Serialize)]
pub struct ReleaseView {
    pub artist: Option<Artist>,
    pub release: Release,
    pub image: String,
    pub tracks: Vec<Track>,
    pub others: Vec<Release>,
}

/// Stations a user sees, grouped by type
#[derive(Debug, Serialize)]
pub struct RadioView {
    pub stations: BTreeMap<String, Vec<Station>>,
}

#[derive(Debug, Serialize)]
pub struct MoviesView {
    pub movies: Vec<Movie>,
}

#[derive(Debug, Serialize)]
pub struct MovieView {
    pub movie: Movie,
    pub poster: String,
    pub backdrop: String,
    pub collection: Option<String>,
    pub others: Vec<Movie>,
    pub genres: Vec<String>,
    pub keywords: Vec<String>,
    pub cast: Vec<Credit>,
    pub crew: Vec<Credit>,
    pub trailers: Vec<String>,
    /// Vote average as a whole percentage
    pub vote: i64,
}

#[derive(Debug, Serialize)]
pub struct PersonView {
    pub person: Person,
    pub profile: String,
    pub starring: Vec<Movie>,
    pub directing: Vec<Movie>,
    pub writing: Vec<Movie>,
}

/// Movies sharing a genre or keyword
#[derive(Debug, Serialize)]
pub struct TagView {
    pub name: String,
    pub movies: Vec<Movie>,
}

#[derive(Debug, Serialize)]
pub struct TvView {
    pub series: Vec<TvSeries>,
}

#[derive(Debug, Serialize)]
pub struct TvSeriesView {
    pub series: TvSeries,
    pub poster: String,
    pub genres: Vec<String>,
    pub cast: Vec<Credit>,
    pub episodes: Vec<TvEpisode>,
}

#[derive(Debug, Serialize)]
pub struct PodcastsView {
    pub series: Vec<Series>,
}

#[derive(Debug, Serialize)]
pub struct SeriesView {
    pub series: Series,
    pub subscribed: bool,
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Serialize)]
pub struct EpisodeView {
    pub series: Series,
    pub episode: Episode,
}

#[derive(Debug, Serialize)]
pub struct PlaylistsView {
    pub playlists: Vec<PlaylistInfo>,
}

#[derive(Debug, Serialize)]
pub struct ProgressView {
    pub offsets: Vec<Offset>,
}

#[derive(Debug, Serialize)]
pub struct ActivityView {
    pub recent_tracks: Vec<Played<Track>>,
    pub recent_movies: Vec<Played<Movie>>,
    pub recent_releases: Vec<Played<Release>>,
}

pub async fn index(media: &Media) -> Result<IndexView> {
    let db = media.db();
    Ok(IndexView {
        time: Utc::now().timestamp_millis(),
        has_music: TrackTable::count(db).await? > 0,
        has_movies: !MovieTable::recently_added(db, 1).await?.is_empty(),
        has_tv: !TvTable::all_series(db).await?.is_empty(),
        has_podcasts: !PodcastTable::all_series(db).await?.is_empty(),
    })
}

pub async fn home(media: &Media) -> Result<HomeView> {
    let db = media.db();
    let config = media.config();
    let music_limit = config.music.recent_limit as i64;
    let film_limit = config.film.recent_limit as i64;

    let today = Local::now().date_naive();
    let mut recommend_movies = Vec::new();
    for recommend in &config.film.recommend {
        if !day_in_range(today, &recommend.start, &recommend.end) {
            continue;
        }
        let movies = search_movies(media, &recommend.query, config.film.search_limit).await?;
        if !movies.is_empty() {
            recommend_movies.push(Recommendation {
                name: recommend.name.clone(),
                movies,
            });
        }
    }

    Ok(HomeView {
        added_releases: ReleaseTable::recently_added(db, music_limit).await?,
        new_releases: ReleaseTable::recently_released(db, music_limit).await?,
        added_movies: MovieTable::recently_added(db, film_limit).await?,
        new_movies: MovieTable::recently_released(db, film_limit).await?,
        recommend_movies,
        new_episodes: PodcastTable::recent_episodes(db, config.podcast.recent_limit as i64).await?,
    })
}

async fn search_movies(media: &Media, query: &str, limit: usize) -> Result<Vec<Movie>> {
    let keys = media.film_index().search(query, limit).await?;
    let ids: Vec<i64> = keys.iter().filter_map(|k| k.parse().ok()).collect();
    MovieTable::get_by_ids(media.db(), &ids).await
}

/// Music and film matches for a query; artists match on their name alone
pub async fn search(media: &Media, query: &str) -> Result<SearchView> {
    let db = media.db();
    let tracks = music::search(media, query, SEARCH_LIMIT).await?;
    let movies = search_movies(media, query, media.config().film.search_limit).await?;

    let wanted = fuzzy_name(query);
    let artists: Vec<Artist> = if wanted.is_empty() {
        vec![]
    } else {
        ArtistTable::all(db)
            .await?
            .into_iter()
            .filter(|a| fuzzy_name(&a.name).contains(&wanted))
            .collect()
    };

    let mut seen = HashSet::new();
    let mut releases = Vec::new();
    for track in &tracks {
        if track.reid.is_empty() || !seen.insert(track.reid.clone()) {
            continue;
        }
        if let Some(release) = ReleaseTable::get_by_reid(db, &track.reid).await? {
            releases.push(release);
        }
    }

    let hits = artists.len() + releases.len() + tracks.len() + movies.len();
    Ok(SearchView {
        query: query.to_string(),
        artists,
        releases,
        tracks,
        movies,
        hits,
    })
}

pub async fn artists(media: &Media) -> Result<ArtistsView> {
    Ok(ArtistsView {
        artists: ArtistTable::all(media.db()).await?,
    })
}

pub async fn artist(media: &Media, id: i64) -> Result<ArtistView> {
    let db = media.db();
    let config = &media.config().music;
    let artist = music::artist(media, id).await?;

    Ok(ArtistView {
        image: ArtistTable::image(db, &artist.name, IMAGE_THUMB).await?.unwrap_or_default(),
        background: ArtistTable::image(db, &artist.name, IMAGE_BACKGROUND)
            .await?
            .unwrap_or_default(),
        releases: ReleaseTable::for_artist(db, &artist.name).await?,
        popular: TrackTable::popular(db, &artist.name, config.popular_limit as i64).await?,
        singles: TrackTable::singles(db, &artist.name).await?,
        similar: ArtistTable::similar_artists(db, &artist.name, config.similar_artists_limit as i64)
            .await?,
        artist,
    })
}

pub async fn release(media: &Media, id: i64) -> Result<ReleaseView> {
    let db = media.db();
    let release = ReleaseTable::get_by_id(db, id)
        .await?
        .ok_or(Error::NotFound("release"))?;
    let others = ReleaseTable::for_artist(db, &release.artist)
        .await?
        .into_iter()
        .filter(|r| r.rgid != release.rgid)
        .collect();

    Ok(ReleaseView {
        artist: ArtistTable::get_by_name(db, &release.artist).await?,
        image: release.cover(COVER_SIZE),
        tracks: TrackTable::for_release(db, &release.reid).await?,
        others,
        release,
    })
}

pub async fn radio(media: &Media, user: &str) -> Result<RadioView> {
    let mut stations: BTreeMap<String, Vec<Station>> = BTreeMap::new();
    for station in StationTable::for_user(media.db(), user).await? {
        stations.entry(station.station_type.clone()).or_default().push(station);
    }
    Ok(RadioView { stations })
}

/// A station the user may see
pub async fn station(media: &Media, user: &str, id: i64) -> Result<Station> {
    let station = StationTable::get_by_id(media.db(), id)
        .await?
        .ok_or(Error::NotFound("station"))?;
    if !station.visible_to(user) {
        return Err(Error::AccessDenied);
    }
    Ok(station)
}

pub async fn movies(media: &Media) -> Result<MoviesView> {
    Ok(MoviesView {
        movies: MovieTable::all(media.db()).await?,
    })
}

async fn credits(db: &DbEngine, cast: &[Cast], crew: &[Crew]) -> Result<(Vec<Credit>, Vec<Credit>)> {
    let peids: Vec<i64> = cast.iter().map(|c| c.peid).chain(crew.iter().map(|c| c.peid)).collect();
    let people: HashMap<i64, Person> = PersonTable::get_by_peids(db, &peids)
        .await?
        .into_iter()
        .map(|p| (p.peid, p))
        .collect();

    let cast = cast
        .iter()
        .filter_map(|c| {
            people.get(&c.peid).map(|p| Credit {
                person: p.clone(),
                character: c.character.clone(),
                department: String::new(),
                job: String::new(),
            })
        })
        .collect();
    let crew = crew
        .iter()
        .filter_map(|c| {
            people.get(&c.peid).map(|p| Credit {
                person: p.clone(),
                character: String::new(),
                department: c.department.clone(),
                job: c.job.clone(),
            })
        })
        .collect();
    Ok((cast, crew))
}

pub async fn movie(media: &Media, id: i64) -> Result<MovieView> {
    let db = media.db();
    let tmdb = &media.config().tmdb;
    let movie = MovieTable::get_by_id(db, id)
        .await?
        .ok_or(Error::NotFound("movie"))?;

    let (collection, others) = match MovieTable::collection(db, movie.tmid).await? {
        Some(collection) => {
            let others = MovieTable::collection_movies(db, collection.collection_id)
                .await?
                .into_iter()
                .filter(|m| m.id != movie.id)
                .collect();
            (Some(collection.name), others)
        }
        None => (None, vec![]),
    };
    let cast = MovieTable::cast(db, movie.tmid).await?;
    let crew = MovieTable::crew(db, movie.tmid).await?;
    let (cast, crew) = credits(db, &cast, &crew).await?;
    let trailers = MovieTable::trailers(db, movie.tmid)
        .await?
        .iter()
        .filter_map(|t| t.url())
        .collect();

    Ok(MovieView {
        poster: image_url(tmdb, &tmdb.poster_size, &movie.poster),
        backdrop: image_url(tmdb, &tmdb.backdrop_size, &movie.backdrop),
        collection,
        others,
        genres: MovieTable::genres(db, movie.tmid).await?,
        keywords: MovieTable::keywords(db, movie.tmid).await?,
        cast,
        crew,
        trailers,
        vote: (movie.vote_average * 10.0).round() as i64,
        movie,
    })
}

pub async fn person(media: &Media, id: i64) -> Result<PersonView> {
    let db = media.db();
    let tmdb = &media.config().tmdb;
    let person = PersonTable::get_by_id(db, id)
        .await?
        .ok_or(Error::NotFound("person"))?;

    let mut view = PersonView {
        profile: image_url(tmdb, &tmdb.profile_size, &person.profile),
        starring: vec![],
        directing: vec![],
        writing: vec![],
        person,
    };
    for movie in MovieTable::for_person(db, view.person.peid).await? {
        let peid = view.person.peid;
        let jobs: Vec<String> = MovieTable::crew(db, movie.tmid)
            .await?
            .into_iter()
            .filter(|c| c.peid == peid)
            .map(|c| c.job)
            .collect();
        if jobs.iter().any(|j| j == "Director") {
            view.directing.push(movie.clone());
        }
        if jobs.iter().any(|j| j == "Writer" || j == "Screenplay") {
            view.writing.push(movie.clone());
        }
        if MovieTable::cast(db, movie.tmid).await?.iter().any(|c| c.peid == peid) {
            view.starring.push(movie);
        }
    }
    Ok(view)
}

pub async fn genre(media: &Media, name: &str) -> Result<TagView> {
    Ok(TagView {
        name: name.to_string(),
        movies: MovieTable::by_genre(media.db(), name).await?,
    })
}

pub async fn keyword(media: &Media, name: &str) -> Result<TagView> {
    Ok(TagView {
        name: name.to_string(),
        movies: MovieTable::by_keyword(media.db(), name).await?,
    })
}

pub async fn tv(media: &Media) -> Result<TvView> {
    Ok(TvView {
        series: TvTable::all_series(media.db()).await?,
    })
}

pub async fn tv_series(media: &Media, id: i64) -> Result<TvSeriesView> {
    let db = media.db();
    let tmdb = &media.config().tmdb;
    let series = TvTable::series_by_id(db, id)
        .await?
        .ok_or(Error::NotFound("series"))?;
    let cast = TvTable::cast(db, series.tvid).await?;
    let (cast, _) = credits(db, &cast, &[]).await?;

    Ok(TvSeriesView {
        poster: image_url(tmdb, &tmdb.poster_size, &series.poster),
        genres: TvTable::genres(db, series.tvid).await?,
        cast,
        episodes: TvTable::episodes(db, series.tvid).await?,
        series,
    })
}

pub async fn podcasts(media: &Media) -> Result<PodcastsView> {
    Ok(PodcastsView {
        series: PodcastTable::all_series(media.db()).await?,
    })
}

pub async fn subscribed(media: &Media, user: &str) -> Result<PodcastsView> {
    Ok(PodcastsView {
        series: PodcastTable::subscribed_series(media.db(), user).await?,
    })
}

pub async fn series(media: &Media, user: &str, id: i64) -> Result<SeriesView> {
    let db = media.db();
    let series = PodcastTable::series_by_id(db, id)
        .await?
        .ok_or(Error::NotFound("series"))?;
    Ok(SeriesView {
        subscribed: PodcastTable::is_subscribed(db, user, &series.sid).await?,
        episodes: PodcastTable::episodes(db, &series.sid).await?,
        series,
    })
}

pub async fn episode(media: &Media, id: i64) -> Result<EpisodeView> {
    let db = media.db();
    let episode = PodcastTable::episode_by_id(db, id)
        .await?
        .ok_or(Error::NotFound("episode"))?;
    let series = PodcastTable::series_by_sid(db, &episode.sid)
        .await?
        .ok_or(Error::NotFound("series"))?;
    Ok(EpisodeView { series, episode })
}

pub async fn playlists(media: &Media, user: &str) -> Result<PlaylistsView> {
    Ok(PlaylistsView {
        playlists: PlaylistTable::for_user(media.db(), user).await?,
    })
}

pub async fn progress(server: &DbEngine, user: &str) -> Result<ProgressView> {
    Ok(ProgressView {
        offsets: super::progress::offsets(server, user).await?,
    })
}

pub async fn activity(server: &DbEngine, media: &Media, user: &str) -> Result<ActivityView> {
    let db = media.db();
    let limit = media.config().activity.recent_limit as i64;
    let window = Window::last_month();

    Ok(ActivityView {
        recent_tracks: activity::recent_tracks(server, db, user, window, limit).await?,
        recent_movies: activity::recent_movies(server, db, user, window, limit).await?,
        recent_releases: activity::recent_releases(server, db, user, window, limit).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::core::media::tests::test_media;
    use crate::core::sync::music::index_tracks;
    use crate::models::station::{TYPE_GENRE, TYPE_STREAM};
    use crate::utils::hashing::new_uuid;

    fn track(key: &str, title: &str, num: i64) -> Track {
        Track {
            uuid: new_uuid(),
            artist: "Prince".to_string(),
            release: "Purple Rain".to_string(),
            title: title.to_string(),
            track_num: num,
            disc_num: 1,
            reid: "reid-us".to_string(),
            rgid: "rgid-purple".to_string(),
            rid: format!("rec-{}", num),
            key: key.to_string(),
            etag: key.to_string(),
            last_modified: Utc::now(),
            ..Default::default()
        }
    }

    async fn library() -> Media {
        let media = test_media(Config::default(), None).await;
        let db = media.db();
        ArtistTable::upsert(
            db,
            &Artist {
                name: "Prince".to_string(),
                sort_name: "Prince".to_string(),
                arid: "arid-prince".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        ReleaseTable::upsert(
            db,
            &Release {
                artist: "Prince".to_string(),
                name: "Purple Rain".to_string(),
                rgid: "rgid-purple".to_string(),
                reid: "reid-us".to_string(),
                release_type: "Album".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let mut tracks = vec![
            track("a.flac", "Let's Go Crazy", 1),
            track("b.flac", "Take Me with U", 2),
        ];
        for t in tracks.iter_mut() {
            t.id = TrackTable::insert(db, t).await.unwrap();
        }
        index_tracks(&media, &tracks).await.unwrap();
        media
    }

    #[tokio::test]
    async fn test_search_groups_results() {
        let media = library().await;
        let view = search(&media, "prince").await.unwrap();
        assert_eq!(view.artists.len(), 1);
        assert_eq!(view.tracks.len(), 2);
        assert_eq!(view.releases.len(), 1);
        assert_eq!(view.hits, 4);
    }

    #[tokio::test]
    async fn test_release_view_and_missing() {
        let media = library().await;
        let id = ReleaseTable::get_by_reid(media.db(), "reid-us")
            .await
            .unwrap()
            .unwrap()
            .id;
        let view = release(&media, id).await.unwrap();
        assert_eq!(view.tracks.len(), 2);
        assert!(view.artist.is_some());

        assert!(matches!(release(&media, 999).await, Err(Error::NotFound("release"))));
        assert!(matches!(movie(&media, 1).await, Err(Error::NotFound("movie"))));
    }

    #[tokio::test]
    async fn test_radio_groups_and_station_access() {
        let media = test_media(Config::default(), None).await;
        let db = media.db();
        let mine = StationTable::upsert(
            db,
            &Station {
                user: "alice".to_string(),
                station_type: TYPE_GENRE.to_string(),
                name: "Funk".to_string(),
                reference: "/music/search?q=funk".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        StationTable::upsert(
            db,
            &Station {
                shared: true,
                station_type: TYPE_STREAM.to_string(),
                name: "KEXP".to_string(),
                reference: "[]".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let view = radio(&media, "alice").await.unwrap();
        assert_eq!(view.stations[TYPE_GENRE].len(), 1);
        assert_eq!(view.stations[TYPE_STREAM].len(), 1);

        assert!(station(&media, "alice", mine).await.is_ok());
        assert!(matches!(station(&media, "bob", mine).await, Err(Error::AccessDenied)));
    }

    #[tokio::test]
    async fn test_index_flags() {
        let media = library().await;
        let view = index(&media).await.unwrap();
        assert!(view.has_music);
        assert!(!view.has_movies);
        assert!(!view.has_podcasts);
    }
}
