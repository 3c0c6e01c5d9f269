//! Catalogue seams used by ingestion
//!
//! Sync passes talk to these traits; the HTTP clients implement them.

use anyhow::Result;
use async_trait::async_trait;

use super::musicbrainz::{MbArtist, MbRelease, MusicBrainzClient};
use super::rss::{Feed, RssClient};
use super::tmdb::{
    ContentRating, Credits, EpisodeDetail, Keyword, MovieDetail, MovieResult, PersonDetail,
    ReleaseDate, TmdbClient, TvDetail, TvResult, Video,
};

#[async_trait]
pub trait MusicCatalog: Send + Sync {
    async fn search_artist(&self, name: &str) -> Result<Vec<MbArtist>>;
    async fn artist(&self, arid: &str) -> Result<MbArtist>;
    async fn releases(&self, arid: &str) -> Result<Vec<MbRelease>>;
}

#[async_trait]
impl MusicCatalog for MusicBrainzClient {
    async fn search_artist(&self, name: &str) -> Result<Vec<MbArtist>> {
        MusicBrainzClient::search_artist(self, name).await
    }

    async fn artist(&self, arid: &str) -> Result<MbArtist> {
        MusicBrainzClient::artist(self, arid).await
    }

    async fn releases(&self, arid: &str) -> Result<Vec<MbRelease>> {
        MusicBrainzClient::releases(self, arid).await
    }
}

#[async_trait]
pub trait VideoCatalog: Send + Sync {
    async fn movie_search(&self, query: &str) -> Result<Vec<MovieResult>>;
    async fn movie_detail(&self, tmid: i64) -> Result<MovieDetail>;
    async fn movie_credits(&self, tmid: i64) -> Result<Credits>;
    async fn movie_keywords(&self, tmid: i64) -> Result<Vec<Keyword>>;
    async fn movie_videos(&self, tmid: i64) -> Result<Vec<Video>>;
    async fn movie_certification(&self, tmid: i64, countries: &[String]) -> Result<Option<ReleaseDate>>;
    async fn tv_search(&self, query: &str) -> Result<Vec<TvResult>>;
    async fn tv_detail(&self, tvid: i64) -> Result<TvDetail>;
    async fn tv_keywords(&self, tvid: i64) -> Result<Vec<Keyword>>;
    async fn tv_content_ratings(&self, tvid: i64) -> Result<Vec<ContentRating>>;
    async fn tv_credits(&self, tvid: i64) -> Result<Credits>;
    async fn season_credits(&self, tvid: i64, season: i64) -> Result<Credits>;
    async fn episode_detail(&self, tvid: i64, season: i64, episode: i64) -> Result<EpisodeDetail>;
    async fn person_detail(&self, peid: i64) -> Result<PersonDetail>;

    fn poster_url(&self, path: &str) -> String;
    fn backdrop_url(&self, path: &str) -> String;
    fn still_url(&self, path: &str) -> String;
    fn profile_url(&self, path: &str) -> String;
}

#[async_trait]
impl VideoCatalog for TmdbClient {
    async fn movie_search(&self, query: &str) -> Result<Vec<MovieResult>> {
        TmdbClient::movie_search(self, query).await
    }

    async fn movie_detail(&self, tmid: i64) -> Result<MovieDetail> {
        TmdbClient::movie_detail(self, tmid).await
    }

    async fn movie_credits(&self, tmid: i64) -> Result<Credits> {
        TmdbClient::movie_credits(self, tmid).await
    }

    async fn movie_keywords(&self, tmid: i64) -> Result<Vec<Keyword>> {
        TmdbClient::movie_keywords(self, tmid).await
    }

    async fn movie_videos(&self, tmid: i64) -> Result<Vec<Video>> {
        TmdbClient::movie_videos(self, tmid).await
    }

    async fn movie_certification(&self, tmid: i64, countries: &[String]) -> Result<Option<ReleaseDate>> {
        TmdbClient::movie_certification(self, tmid, countries).await
    }

    async fn tv_search(&self, query: &str) -> Result<Vec<TvResult>> {
        TmdbClient::tv_search(self, query).await
    }

    async fn tv_detail(&self, tvid: i64) -> Result<TvDetail> {
        TmdbClient::tv_detail(self, tvid).await
    }

    async fn tv_keywords(&self, tvid: i64) -> Result<Vec<Keyword>> {
        TmdbClient::tv_keywords(self, tvid).await
    }

    async fn tv_content_ratings(&self, tvid: i64) -> Result<Vec<ContentRating>> {
        TmdbClient::tv_content_ratings(self, tvid).await
    }

    async fn tv_credits(&self, tvid: i64) -> Result<Credits> {
        TmdbClient::tv_credits(self, tvid).await
    }

    async fn season_credits(&self, tvid: i64, season: i64) -> Result<Credits> {
        TmdbClient::season_credits(self, tvid, season).await
    }

    async fn episode_detail(&self, tvid: i64, season: i64, episode: i64) -> Result<EpisodeDetail> {
        TmdbClient::episode_detail(self, tvid, season, episode).await
    }

    async fn person_detail(&self, peid: i64) -> Result<PersonDetail> {
        TmdbClient::person_detail(self, peid).await
    }

    fn poster_url(&self, path: &str) -> String {
        TmdbClient::poster_url(self, path)
    }

    fn backdrop_url(&self, path: &str) -> String {
        TmdbClient::backdrop_url(self, path)
    }

    fn still_url(&self, path: &str) -> String {
        TmdbClient::still_url(self, path)
    }

    fn profile_url(&self, path: &str) -> String {
        TmdbClient::profile_url(self, path)
    }
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn feed(&self, url: &str) -> Result<Feed>;
}

#[async_trait]
impl FeedSource for RssClient {
    async fn feed(&self, url: &str) -> Result<Feed> {
        self.fetch(url).await
    }
}
