//! The Movie Database client
//!
//! Responses are cached by URL in a small LRU so that a sync pass asking for
//! the same season credits or person twice only fetches once.

use anyhow::{anyhow, Context, Result};
use lru::LruCache;
use parking_lot::Mutex;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::num::NonZeroUsize;
use tracing::debug;

use crate::config::TmdbConfig;
use crate::error::Error;

const CACHE_SIZE: usize = 512;

const RELEASE_THEATRICAL: i32 = 3;
const RELEASE_DIGITAL: i32 = 4;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Keyword {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MovieResult {
    pub id: i64,
    pub title: String,
    pub original_title: String,
    pub release_date: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TvResult {
    pub id: i64,
    pub name: String,
    pub original_name: String,
    pub first_air_date: String,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CastMember {
    pub id: i64,
    pub name: String,
    pub character: String,
    pub order: i64,
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CrewMember {
    pub id: i64,
    pub name: String,
    pub department: String,
    pub job: String,
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Credits {
    pub cast: Vec<CastMember>,
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Video {
    pub name: String,
    pub key: String,
    pub site: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CollectionRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReleaseDate {
    pub certification: String,
    pub release_date: String,
    #[serde(rename = "type")]
    pub kind: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CountryReleases {
    pub iso_3166_1: String,
    pub release_dates: Vec<ReleaseDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MovieDetail {
    pub id: i64,
    pub imdb_id: Option<String>,
    pub title: String,
    pub original_title: String,
    pub overview: String,
    pub tagline: String,
    pub budget: i64,
    pub revenue: i64,
    pub runtime: Option<i64>,
    pub vote_average: f64,
    pub vote_count: i64,
    pub backdrop_path: Option<String>,
    pub poster_path: Option<String>,
    pub release_date: String,
    pub genres: Vec<Genre>,
    pub belongs_to_collection: Option<CollectionRef>,
}

#[derive(Debug, Deserialize)]
struct KeywordList {
    #[serde(default, alias = "results")]
    keywords: Vec<Keyword>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContentRating {
    pub iso_3166_1: String,
    pub rating: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TvDetail {
    pub id: i64,
    pub name: String,
    pub original_name: String,
    pub overview: String,
    pub tagline: String,
    pub vote_average: f64,
    pub vote_count: i64,
    pub number_of_seasons: i64,
    pub number_of_episodes: i64,
    pub backdrop_path: Option<String>,
    pub poster_path: Option<String>,
    pub first_air_date: String,
    pub last_air_date: Option<String>,
    pub genres: Vec<Genre>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EpisodeDetail {
    pub id: i64,
    pub name: String,
    pub overview: String,
    pub air_date: Option<String>,
    pub runtime: Option<i64>,
    pub vote_average: f64,
    pub vote_count: i64,
    pub still_path: Option<String>,
    pub season_number: i64,
    pub episode_number: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PersonDetail {
    pub id: i64,
    pub imdb_id: Option<String>,
    pub name: String,
    pub profile_path: Option<String>,
    pub biography: String,
    pub place_of_birth: Option<String>,
    pub birthday: Option<String>,
    pub deathday: Option<String>,
}

pub struct TmdbClient {
    client: Client,
    config: TmdbConfig,
    cache: Mutex<LruCache<String, String>>,
}

impl TmdbClient {
    pub fn new(client: Client, config: TmdbConfig) -> Self {
        let size = NonZeroUsize::new(CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        Self {
            client,
            config,
            cache: Mutex::new(LruCache::new(size)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.config.key.is_empty()
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T> {
        if !self.is_enabled() {
            return Err(anyhow!("tmdb key not configured"));
        }

        let mut query: Vec<(&str, &str)> = vec![
            ("api_key", self.config.key.as_str()),
            ("language", self.config.language.as_str()),
        ];
        query.extend_from_slice(params);
        let url = format!(
            "{}{}?{}",
            self.config.endpoint.trim_end_matches('/'),
            path,
            serde_urlencoded::to_string(&query)?
        );

        let cached = self.cache.lock().get(&url).cloned();
        let body = match cached {
            Some(body) => body,
            None => {
                debug!("tmdb {}", path);
                let body = self
                    .client
                    .get(&url)
                    .send()
                    .await?
                    .error_for_status()
                    .with_context(|| format!("tmdb {}", path))?
                    .text()
                    .await?;
                self.cache.lock().put(url, body.clone());
                body
            }
        };

        Ok(serde_json::from_str(&body)?)
    }

    pub async fn movie_search(&self, query: &str) -> Result<Vec<MovieResult>> {
        let page: Page<MovieResult> = self.get("/search/movie", &[("query", query)]).await?;
        Ok(page.results)
    }

    pub async fn movie_detail(&self, tmid: i64) -> Result<MovieDetail> {
        self.get(&format!("/movie/{}", tmid), &[]).await
    }

    pub async fn movie_credits(&self, tmid: i64) -> Result<Credits> {
        self.get(&format!("/movie/{}/credits", tmid), &[]).await
    }

    pub async fn movie_keywords(&self, tmid: i64) -> Result<Vec<Keyword>> {
        let list: KeywordList = self.get(&format!("/movie/{}/keywords", tmid), &[]).await?;
        Ok(list.keywords)
    }

    pub async fn movie_videos(&self, tmid: i64) -> Result<Vec<Video>> {
        let page: Page<Video> = self.get(&format!("/movie/{}/videos", tmid), &[]).await?;
        Ok(page.results)
    }

    pub async fn movie_release_dates(&self, tmid: i64) -> Result<Vec<CountryReleases>> {
        let page: Page<CountryReleases> =
            self.get(&format!("/movie/{}/release_dates", tmid), &[]).await?;
        Ok(page.results)
    }

    /// Certification and date for the first preferred country with a
    /// theatrical or digital release.
    pub async fn movie_certification(
        &self,
        tmid: i64,
        countries: &[String],
    ) -> Result<Option<ReleaseDate>> {
        let releases = self.movie_release_dates(tmid).await?;
        Ok(preferred_release(&releases, countries))
    }

    pub async fn tv_search(&self, query: &str) -> Result<Vec<TvResult>> {
        let page: Page<TvResult> = self.get("/search/tv", &[("query", query)]).await?;
        Ok(page.results)
    }

    pub async fn tv_detail(&self, tvid: i64) -> Result<TvDetail> {
        self.get(&format!("/tv/{}", tvid), &[]).await
    }

    pub async fn tv_keywords(&self, tvid: i64) -> Result<Vec<Keyword>> {
        let list: KeywordList = self.get(&format!("/tv/{}/keywords", tvid), &[]).await?;
        Ok(list.keywords)
    }

    pub async fn tv_content_ratings(&self, tvid: i64) -> Result<Vec<ContentRating>> {
        let page: Page<ContentRating> =
            self.get(&format!("/tv/{}/content_ratings", tvid), &[]).await?;
        Ok(page.results)
    }

    pub async fn tv_credits(&self, tvid: i64) -> Result<Credits> {
        self.get(&format!("/tv/{}/credits", tvid), &[]).await
    }

    pub async fn season_credits(&self, tvid: i64, season: i64) -> Result<Credits> {
        self.get(&format!("/tv/{}/season/{}/credits", tvid, season), &[])
            .await
    }

    pub async fn episode_detail(&self, tvid: i64, season: i64, episode: i64) -> Result<EpisodeDetail> {
        self.get(
            &format!("/tv/{}/season/{}/episode/{}", tvid, season, episode),
            &[],
        )
        .await
    }

    pub async fn person_detail(&self, peid: i64) -> Result<PersonDetail> {
        self.get(&format!("/person/{}", peid), &[]).await
    }

    pub fn poster_url(&self, path: &str) -> String {
        self.image_url(&self.config.poster_size, path)
    }

    pub fn backdrop_url(&self, path: &str) -> String {
        self.image_url(&self.config.backdrop_size, path)
    }

    pub fn still_url(&self, path: &str) -> String {
        self.image_url(&self.config.still_size, path)
    }

    pub fn profile_url(&self, path: &str) -> String {
        self.image_url(&self.config.profile_size, path)
    }

    fn image_url(&self, size: &str, path: &str) -> String {
        image_url(&self.config, size, path)
    }
}

/// Image URL of a catalogue path at `size`; empty paths stay empty
pub fn image_url(config: &TmdbConfig, size: &str, path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    format!(
        "{}/{}{}",
        config.image_endpoint.trim_end_matches('/'),
        size,
        path
    )
}

fn release_of<'a>(
    releases: &'a [CountryReleases],
    country: &str,
    kind: i32,
) -> crate::error::Result<&'a ReleaseDate> {
    releases
        .iter()
        .filter(|r| r.iso_3166_1 == country)
        .flat_map(|r| r.release_dates.iter())
        .find(|d| d.kind == kind && !d.certification.is_empty())
        .ok_or(Error::ReleaseTypeNotFound)
}

/// First theatrical then digital release, for the first country that has one
pub fn preferred_release(releases: &[CountryReleases], countries: &[String]) -> Option<ReleaseDate> {
    for country in countries {
        for kind in [RELEASE_THEATRICAL, RELEASE_DIGITAL] {
            match release_of(releases, country, kind) {
                Ok(release) => return Some(release.clone()),
                Err(Error::ReleaseTypeNotFound) => continue,
                Err(_) => break,
            }
        }
    }
    None
}

/// Content rating of the first preferred country that rates the series
pub fn preferred_rating(ratings: &[ContentRating], countries: &[String]) -> Option<String> {
    countries.iter().find_map(|country| {
        ratings
            .iter()
            .find(|r| &r.iso_3166_1 == country && !r.rating.is_empty())
            .map(|r| r.rating.clone())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(cert: &str, kind: i32) -> ReleaseDate {
        ReleaseDate {
            certification: cert.to_string(),
            release_date: "1984-06-08T00:00:00.000Z".to_string(),
            kind,
        }
    }

    #[test]
    fn test_preferred_release() {
        let releases = vec![
            CountryReleases {
                iso_3166_1: "GB".to_string(),
                release_dates: vec![release("15", RELEASE_THEATRICAL)],
            },
            CountryReleases {
                iso_3166_1: "US".to_string(),
                release_dates: vec![release("", RELEASE_THEATRICAL), release("PG", RELEASE_DIGITAL)],
            },
        ];

        let countries = vec!["US".to_string(), "GB".to_string()];
        let found = preferred_release(&releases, &countries).unwrap();
        assert_eq!(found.certification, "PG");
        assert_eq!(found.kind, RELEASE_DIGITAL);

        let countries = vec!["DE".to_string(), "GB".to_string()];
        assert_eq!(preferred_release(&releases, &countries).unwrap().certification, "15");

        assert!(preferred_release(&releases, &["FR".to_string()]).is_none());
    }

    #[test]
    fn test_preferred_rating() {
        let ratings = vec![
            ContentRating {
                iso_3166_1: "US".to_string(),
                rating: "TV-MA".to_string(),
            },
            ContentRating {
                iso_3166_1: "DE".to_string(),
                rating: "16".to_string(),
            },
        ];
        assert_eq!(
            preferred_rating(&ratings, &["GB".to_string(), "DE".to_string()]).as_deref(),
            Some("16")
        );
    }
}
