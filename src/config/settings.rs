//! Layered server configuration
//!
//! Settings come from an optional `takeout.{toml,yaml,json}` file in the data
//! directory (or an explicit `--config` file), then `TAKEOUT__SECTION__KEY`
//! environment variables. Each media collection may layer its own
//! `media/<name>/takeout.*` on top of the base file.

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::utils::dates::duration_str;

use super::Paths;

const ENV_PREFIX: &str = "TAKEOUT";
const CONFIG_NAME: &str = "takeout";

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub buckets: Vec<BucketConfig>,
    pub music: MusicConfig,
    pub film: FilmConfig,
    pub tv: TvConfig,
    pub podcast: PodcastConfig,
    pub tmdb: TmdbConfig,
    pub lastfm: LastFmConfig,
    pub fanart: FanartConfig,
    pub musicbrainz: MusicBrainzConfig,
    pub activity: ActivityConfig,
    pub image_client: ImageClientConfig,
    pub task: TaskConfig,

    /// Files this configuration was layered from, in order
    #[serde(skip)]
    sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    pub port: u16,
    /// Externally visible base URL
    pub url: String,
    /// Local directories the `/d/` endpoint may serve from
    pub include_dirs: Vec<String>,
    /// Local directories the `/d/` endpoint must never serve from
    pub exclude_dirs: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1".to_string(),
            port: 3000,
            url: "http://localhost:3000".to_string(),
            include_dirs: Vec::new(),
            exclude_dirs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    #[serde(with = "duration_str")]
    pub session_age: Duration,
    #[serde(with = "duration_str")]
    pub code_age: Duration,
    pub access_token: TokenConfig,
    pub media_token: TokenConfig,
    pub code_token: TokenConfig,
    pub file_token: TokenConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_age: Duration::days(30),
            code_age: Duration::minutes(5),
            access_token: TokenConfig::with_age(Duration::hours(4)),
            media_token: TokenConfig::with_age(Duration::days(365)),
            code_token: TokenConfig::with_age(Duration::minutes(5)),
            file_token: TokenConfig::with_age(Duration::hours(1)),
        }
    }
}

/// One JWT family
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub issuer: String,
    #[serde(with = "duration_str")]
    pub age: Duration,
    pub secret: String,
    /// File whose trimmed contents are the secret; wins over `secret`
    pub secret_file: String,
}

impl TokenConfig {
    fn with_age(age: Duration) -> Self {
        Self {
            age,
            ..Self::default()
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            issuer: "takeout".to_string(),
            age: Duration::hours(1),
            secret: String::new(),
            secret_file: String::new(),
        }
    }
}

/// Kind of media a bucket holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Music,
    #[serde(alias = "video", alias = "movies")]
    Film,
    Tv,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketConfig {
    pub media: MediaType,
    /// Local filesystem root; when set the bucket is local and S3 fields are ignored
    pub root: Option<PathBuf>,
    pub endpoint: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    pub object_prefix: String,
    #[serde(with = "duration_str")]
    pub url_expiration: Duration,
    /// Ordered regex rewrites applied to keys to produce paths
    pub rewrite: Vec<RewriteRule>,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            media: MediaType::Music,
            root: None,
            endpoint: String::new(),
            region: "us-east-1".to_string(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            bucket_name: String::new(),
            object_prefix: String::new(),
            url_expiration: Duration::hours(72),
            rewrite: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteRule {
    pub pattern: String,
    pub replace: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistMapping {
    pub name: String,
    /// MusicBrainz artist id
    pub arid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadioPeriod {
    pub name: String,
    pub start: i32,
    pub end: i32,
}

/// One format of an internet radio stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSource {
    #[serde(default, alias = "content_type")]
    pub content_type: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioStream {
    pub name: String,
    pub creator: String,
    pub image: String,
    pub description: String,
    pub sources: Vec<StreamSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicConfig {
    pub artist_map: Vec<ArtistMapping>,
    pub radio_genres: Vec<String>,
    pub radio_periods: Vec<RadioPeriod>,
    pub radio_streams: Vec<RadioStream>,
    pub radio_limit: usize,
    pub popular_limit: usize,
    pub similar_artists_limit: usize,
    pub recent_limit: usize,
    /// Preferred release countries when several releases of a group match
    pub release_countries: Vec<String>,
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            artist_map: Vec::new(),
            radio_genres: ["rock", "pop", "jazz", "electronic", "hip hop", "folk", "metal"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            radio_periods: (1960..=2020)
                .step_by(10)
                .map(|start| RadioPeriod {
                    name: format!("{}s", start),
                    start,
                    end: start + 9,
                })
                .collect(),
            radio_streams: Vec::new(),
            radio_limit: 25,
            popular_limit: 10,
            similar_artists_limit: 10,
            recent_limit: 50,
            release_countries: vec!["US".to_string(), "GB".to_string(), "XW".to_string()],
        }
    }
}

/// Which file to keep when two files match the same catalogue entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    Largest,
    Smallest,
}

impl DuplicatePolicy {
    /// True when a candidate of `new_size` should replace one of `old_size`
    pub fn prefers(&self, new_size: i64, old_size: i64) -> bool {
        match self {
            DuplicatePolicy::Largest => new_size > old_size,
            DuplicatePolicy::Smallest => new_size < old_size,
        }
    }
}

/// A canned search enabled between two `MM-DD` dates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommend {
    pub name: String,
    pub start: String,
    pub end: String,
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilmConfig {
    pub release_countries: Vec<String>,
    pub duplicate_policy: DuplicatePolicy,
    pub recommend: Vec<Recommend>,
    pub recent_limit: usize,
    pub search_limit: usize,
}

impl Default for FilmConfig {
    fn default() -> Self {
        Self {
            release_countries: vec!["US".to_string()],
            duplicate_policy: DuplicatePolicy::Largest,
            recommend: vec![
                Recommend {
                    name: "Halloween".to_string(),
                    start: "10-01".to_string(),
                    end: "10-31".to_string(),
                    query: "+genre:horror".to_string(),
                },
                Recommend {
                    name: "Christmas".to_string(),
                    start: "12-01".to_string(),
                    end: "12-31".to_string(),
                    query: "+keyword:christmas".to_string(),
                },
            ],
            recent_limit: 50,
            search_limit: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TvConfig {
    pub release_countries: Vec<String>,
    pub duplicate_policy: DuplicatePolicy,
    pub recent_limit: usize,
}

impl Default for TvConfig {
    fn default() -> Self {
        Self {
            release_countries: vec!["US".to_string()],
            duplicate_policy: DuplicatePolicy::Largest,
            recent_limit: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PodcastConfig {
    /// Feed URLs
    pub series: Vec<String>,
    pub recent_limit: usize,
}

impl Default for PodcastConfig {
    fn default() -> Self {
        Self {
            series: Vec::new(),
            recent_limit: 25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbConfig {
    pub key: String,
    pub language: String,
    pub endpoint: String,
    pub image_endpoint: String,
    pub poster_size: String,
    pub backdrop_size: String,
    pub still_size: String,
    pub profile_size: String,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            language: "en-US".to_string(),
            endpoint: "https://api.themoviedb.org/3".to_string(),
            image_endpoint: "https://image.tmdb.org/t/p".to_string(),
            poster_size: "w342".to_string(),
            backdrop_size: "w1280".to_string(),
            still_size: "w300".to_string(),
            profile_size: "w185".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LastFmConfig {
    pub key: String,
    pub secret: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FanartConfig {
    pub project_key: String,
    pub personal_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicBrainzConfig {
    pub endpoint: String,
    pub user_agent: String,
    /// Minimum delay between requests
    #[serde(with = "duration_str")]
    pub request_interval: Duration,
}

impl Default for MusicBrainzConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://musicbrainz.org/ws/2".to_string(),
            user_agent: format!("takeout/{} ( https://takeout.fm )", env!("CARGO_PKG_VERSION")),
            request_interval: Duration::seconds(1),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityConfig {
    pub activity_limit: usize,
    pub recent_limit: usize,
    pub top_limit: usize,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            activity_limit: 50,
            recent_limit: 50,
            top_limit: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageClientConfig {
    pub use_cache: bool,
    /// Defaults to `<data>/imagecache`
    pub cache_dir: Option<PathBuf>,
    pub user_agent: String,
}

impl Default for ImageClientConfig {
    fn default() -> Self {
        Self {
            use_cache: true,
            cache_dir: None,
            user_agent: format!("takeout/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Scheduler intervals
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    #[serde(with = "duration_str")]
    pub housekeeping: Duration,
    #[serde(with = "duration_str")]
    pub music_sync: Duration,
    #[serde(with = "duration_str")]
    pub music_popular: Duration,
    #[serde(with = "duration_str")]
    pub music_similar: Duration,
    #[serde(with = "duration_str")]
    pub music_covers: Duration,
    #[serde(with = "duration_str")]
    pub film_sync: Duration,
    #[serde(with = "duration_str")]
    pub film_posters: Duration,
    #[serde(with = "duration_str")]
    pub film_backdrops: Duration,
    #[serde(with = "duration_str")]
    pub film_profiles: Duration,
    #[serde(with = "duration_str")]
    pub tv_sync: Duration,
    #[serde(with = "duration_str")]
    pub tv_posters: Duration,
    #[serde(with = "duration_str")]
    pub tv_backdrops: Duration,
    #[serde(with = "duration_str")]
    pub tv_stills: Duration,
    #[serde(with = "duration_str")]
    pub podcast_sync: Duration,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            housekeeping: Duration::minutes(5),
            music_sync: Duration::hours(1),
            music_popular: Duration::days(1),
            music_similar: Duration::days(1),
            music_covers: Duration::days(1),
            film_sync: Duration::hours(1),
            film_posters: Duration::days(1),
            film_backdrops: Duration::days(1),
            film_profiles: Duration::days(1),
            tv_sync: Duration::hours(1),
            tv_posters: Duration::days(1),
            tv_backdrops: Duration::days(1),
            tv_stills: Duration::days(1),
            podcast_sync: Duration::hours(1),
        }
    }
}

impl Config {
    /// Load the base configuration.
    ///
    /// An explicit `file` must exist; otherwise `<data>/takeout.*` is optional.
    pub fn load(file: Option<&Path>, paths: &Paths) -> Result<Config> {
        let (source, required) = match file {
            Some(path) => (path.to_string_lossy().to_string(), true),
            None => (paths.config_base().to_string_lossy().to_string(), false),
        };
        let sources = vec![(source, required)];
        Self::build(&sources)
    }

    /// Load the configuration of one media collection, layered over the base.
    pub fn load_media(&self, paths: &Paths, media: &str) -> Result<Config> {
        let mut sources: Vec<(String, bool)> =
            self.sources.iter().map(|s| (s.clone(), false)).collect();
        sources.push((
            paths.media_config_base(media).to_string_lossy().to_string(),
            false,
        ));
        Self::build(&sources)
            .with_context(|| format!("Failed to load configuration for media '{}'", media))
    }

    fn build(sources: &[(String, bool)]) -> Result<Config> {
        let mut builder = ::config::Config::builder();
        for (source, required) in sources {
            builder = builder.add_source(::config::File::with_name(source).required(*required));
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let mut cfg: Config = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        cfg.sources = sources.iter().map(|(s, _)| s.clone()).collect();
        Ok(cfg)
    }

    /// Buckets configured for `media`
    pub fn buckets_for(&self, media: MediaType) -> impl Iterator<Item = &BucketConfig> {
        self.buckets.iter().filter(move |b| b.media == media)
    }

    pub fn has_media(&self, media: MediaType) -> bool {
        self.buckets_for(media).next().is_some()
    }
}

/// Name of the config file without extension
pub fn config_name() -> &'static str {
    CONFIG_NAME
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.auth.session_age, Duration::days(30));
        assert_eq!(config.auth.access_token.age, Duration::hours(4));
        assert_eq!(config.auth.media_token.age, Duration::days(365));
        assert_eq!(config.auth.code_token.age, Duration::minutes(5));
        assert_eq!(config.auth.file_token.age, Duration::hours(1));
        assert_eq!(config.auth.code_age, Duration::minutes(5));
        assert_eq!(config.music.radio_limit, 25);
        assert_eq!(config.music.popular_limit, 10);
        assert_eq!(config.film.duplicate_policy, DuplicatePolicy::Largest);
        assert_eq!(config.task.housekeeping, Duration::minutes(5));
        assert_eq!(config.task.podcast_sync, Duration::hours(1));
    }

    #[test]
    fn test_load_file_and_media_layer() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(Some(dir.path().to_path_buf())).unwrap();

        std::fs::write(
            dir.path().join("takeout.toml"),
            r#"
[auth]
session_age = "7d"

[auth.access_token]
issuer = "example"
secret = "s3cret"

[[buckets]]
media = "video"
root = "/srv/movies"

[music]
radio_limit = 40
"#,
        )
        .unwrap();

        let config = Config::load(None, &paths).unwrap();
        assert_eq!(config.auth.session_age, Duration::days(7));
        assert_eq!(config.auth.access_token.issuer, "example");
        assert_eq!(config.auth.access_token.age, Duration::hours(4));
        assert_eq!(config.buckets.len(), 1);
        assert_eq!(config.buckets[0].media, MediaType::Film);
        assert_eq!(config.music.radio_limit, 40);

        std::fs::create_dir_all(paths.media_dir("family")).unwrap();
        std::fs::write(
            paths.media_dir("family").join("takeout.toml"),
            "[music]\npopular_limit = 3\n",
        )
        .unwrap();

        let media = config.load_media(&paths, "family").unwrap();
        assert_eq!(media.music.radio_limit, 40);
        assert_eq!(media.music.popular_limit, 3);
    }

    #[test]
    fn test_unknown_duplicate_policy_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(Some(dir.path().to_path_buf())).unwrap();
        std::fs::write(
            dir.path().join("takeout.toml"),
            "[film]\nduplicate_policy = \"newest\"\n",
        )
        .unwrap();
        assert!(Config::load(None, &paths).is_err());
    }

    #[test]
    fn test_duplicate_policy() {
        assert!(DuplicatePolicy::Largest.prefers(10, 5));
        assert!(!DuplicatePolicy::Largest.prefers(5, 10));
        assert!(DuplicatePolicy::Smallest.prefers(5, 10));
        assert!(!DuplicatePolicy::Smallest.prefers(10, 10));
    }
}
