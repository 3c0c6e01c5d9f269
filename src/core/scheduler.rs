//! Periodic jobs
//!
//! One task per job ticks on its configured interval. Media jobs run once for
//! every collection assigned to any user. A job never overlaps itself: a tick
//! or manual run that finds the job busy is dropped.

use anyhow::{Context, Result};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

use super::media::{Media, MediaRegistry};
use super::sync::artists::{sync_covers, sync_popular, sync_similar};
use super::sync::film::FilmSync;
use super::sync::images::{warm_images, ImageKind};
use super::sync::music::{MusicOptions, MusicSync};
use super::sync::podcast::sync_podcasts;
use super::sync::stations::sync_stations;
use super::sync::tv::TvSync;
use crate::auth::Auth;
use crate::client::{
    http_client, CoverArtClient, FanartClient, ImageCache, LastFmClient, MusicBrainzClient,
    RssClient, TmdbClient,
};
use crate::config::TaskConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Job {
    Housekeeping,
    MusicSync,
    MusicPopular,
    MusicSimilar,
    MusicCovers,
    FilmSync,
    FilmPosters,
    FilmBackdrops,
    FilmProfiles,
    TvSync,
    TvPosters,
    TvBackdrops,
    TvStills,
    PodcastSync,
}

impl Job {
    pub const ALL: [Job; 14] = [
        Job::Housekeeping,
        Job::MusicSync,
        Job::MusicPopular,
        Job::MusicSimilar,
        Job::MusicCovers,
        Job::FilmSync,
        Job::FilmPosters,
        Job::FilmBackdrops,
        Job::FilmProfiles,
        Job::TvSync,
        Job::TvPosters,
        Job::TvBackdrops,
        Job::TvStills,
        Job::PodcastSync,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Job::Housekeeping => "housekeeping",
            Job::MusicSync => "music_sync",
            Job::MusicPopular => "music_popular",
            Job::MusicSimilar => "music_similar",
            Job::MusicCovers => "music_covers",
            Job::FilmSync => "film_sync",
            Job::FilmPosters => "film_posters",
            Job::FilmBackdrops => "film_backdrops",
            Job::FilmProfiles => "film_profiles",
            Job::TvSync => "tv_sync",
            Job::TvPosters => "tv_posters",
            Job::TvBackdrops => "tv_backdrops",
            Job::TvStills => "tv_stills",
            Job::PodcastSync => "podcast_sync",
        }
    }

    pub fn parse(name: &str) -> Option<Job> {
        Job::ALL.into_iter().find(|job| job.name() == name)
    }

    pub fn interval(&self, task: &TaskConfig) -> chrono::Duration {
        match self {
            Job::Housekeeping => task.housekeeping,
            Job::MusicSync => task.music_sync,
            Job::MusicPopular => task.music_popular,
            Job::MusicSimilar => task.music_similar,
            Job::MusicCovers => task.music_covers,
            Job::FilmSync => task.film_sync,
            Job::FilmPosters => task.film_posters,
            Job::FilmBackdrops => task.film_backdrops,
            Job::FilmProfiles => task.film_profiles,
            Job::TvSync => task.tv_sync,
            Job::TvPosters => task.tv_posters,
            Job::TvBackdrops => task.tv_backdrops,
            Job::TvStills => task.tv_stills,
            Job::PodcastSync => task.podcast_sync,
        }
    }

    fn image_kind(&self) -> Option<ImageKind> {
        match self {
            Job::FilmPosters => Some(ImageKind::FilmPosters),
            Job::FilmBackdrops => Some(ImageKind::FilmBackdrops),
            Job::FilmProfiles => Some(ImageKind::FilmProfiles),
            Job::TvPosters => Some(ImageKind::TvPosters),
            Job::TvBackdrops => Some(ImageKind::TvBackdrops),
            Job::TvStills => Some(ImageKind::TvStills),
            _ => None,
        }
    }
}

impl std::fmt::Display for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone)]
pub struct Scheduler {
    auth: Auth,
    registry: MediaRegistry,
    locks: Arc<HashMap<Job, Arc<Mutex<()>>>>,
}

impl Scheduler {
    pub fn new(auth: Auth, registry: MediaRegistry) -> Self {
        let locks = Job::ALL
            .into_iter()
            .map(|job| (job, Arc::new(Mutex::new(()))))
            .collect();
        Self {
            auth,
            registry,
            locks: Arc::new(locks),
        }
    }

    /// Spawn one interval task per job. The first run waits a full interval.
    pub fn start(&self) -> Result<()> {
        for job in Job::ALL {
            let period = job
                .interval(&self.registry.config().task)
                .to_std()
                .with_context(|| format!("Invalid interval for job {}", job))?;
            if period.is_zero() {
                info!("job {} disabled", job);
                continue;
            }

            let scheduler = self.clone();
            tokio::spawn(async move {
                let mut interval = time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                interval.tick().await;
                loop {
                    interval.tick().await;
                    if let Err(e) = scheduler.run(job).await {
                        error!("job {} failed: {:#}", job, e);
                    }
                }
            });
        }
        info!("scheduler started with {} jobs", Job::ALL.len());
        Ok(())
    }

    /// Run a job now. Returns false when the job is already running.
    pub async fn run(&self, job: Job) -> Result<bool> {
        let Some(lock) = self.locks.get(&job) else {
            return Ok(false);
        };
        let Ok(_running) = lock.try_lock() else {
            debug!("job {} still running, skipped", job);
            return Ok(false);
        };

        info!("job {} started", job);
        if job == Job::Housekeeping {
            let (sessions, codes) = self.auth.delete_expired().await?;
            info!("housekeeping removed {} sessions, {} codes", sessions, codes);
            return Ok(true);
        }

        for name in self.media_names().await? {
            let media = match self.registry.get(&name).await {
                Ok(media) => media,
                Err(e) => {
                    error!("job {}: media {} unavailable: {:#}", job, name, e);
                    continue;
                }
            };
            if let Err(e) = self.run_media(job, &media).await {
                error!("job {} for {} failed: {:#}", job, name, e);
            }
        }
        info!("job {} finished", job);
        Ok(true)
    }

    /// Every collection assigned to at least one user
    async fn media_names(&self) -> Result<BTreeSet<String>> {
        Ok(self
            .auth
            .users()
            .await?
            .iter()
            .flat_map(|user| user.media_list())
            .collect())
    }

    async fn run_media(&self, job: Job, media: &Media) -> Result<()> {
        let config = media.config();
        let http = http_client(&config.musicbrainz.user_agent)?;

        if let Some(kind) = job.image_kind() {
            let writer = ImageCache::writer(&config.image_client, &self.registry.paths().image_cache_dir(), http);
            warm_images(media, &writer, kind).await?;
            return Ok(());
        }

        match job {
            Job::MusicSync => {
                let catalog = MusicBrainzClient::new(http, config.musicbrainz.clone());
                MusicSync::new(media, &catalog).run(&MusicOptions::default()).await?;
                sync_stations(media).await?;
            }
            Job::MusicPopular => {
                sync_popular(media, &LastFmClient::new(http, &config.lastfm)).await?;
            }
            Job::MusicSimilar => {
                sync_similar(media, &LastFmClient::new(http, &config.lastfm)).await?;
            }
            Job::MusicCovers => {
                let coverart = CoverArtClient::new(http.clone());
                let fanart = FanartClient::new(http, config.fanart.clone());
                sync_covers(media, &coverart, &fanart).await?;
            }
            Job::FilmSync => {
                let catalog = TmdbClient::new(http, config.tmdb.clone());
                FilmSync::new(media, &catalog).run(None).await?;
            }
            Job::TvSync => {
                let catalog = TmdbClient::new(http, config.tmdb.clone());
                TvSync::new(media, &catalog).run(None).await?;
            }
            Job::PodcastSync => {
                sync_podcasts(media, &RssClient::new(http)).await?;
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, Config, Paths};
    use crate::db::{DbEngine, Schema};

    async fn scheduler(dir: &std::path::Path) -> Scheduler {
        let db = DbEngine::memory(Schema::Server).await.unwrap();
        let mut config = AuthConfig::default();
        config.access_token.secret = "access".to_string();
        config.media_token.secret = "media".to_string();
        config.code_token.secret = "code".to_string();
        config.file_token.secret = "file".to_string();
        let auth = Auth::new(db, config).unwrap();
        let paths = Paths::new(Some(dir.to_path_buf())).unwrap();
        Scheduler::new(auth, MediaRegistry::new(Config::default(), paths))
    }

    #[test]
    fn test_job_names() {
        for job in Job::ALL {
            assert_eq!(Job::parse(job.name()), Some(job));
        }
        assert_eq!(Job::parse("nightly"), None);
        assert_eq!(Job::FilmPosters.image_kind(), Some(ImageKind::FilmPosters));
        assert_eq!(Job::MusicSync.image_kind(), None);
    }

    #[test]
    fn test_default_intervals() {
        let task = TaskConfig::default();
        assert_eq!(Job::Housekeeping.interval(&task), chrono::Duration::minutes(5));
        assert_eq!(Job::PodcastSync.interval(&task), chrono::Duration::hours(1));
        assert_eq!(Job::TvStills.interval(&task), chrono::Duration::days(1));
    }

    #[tokio::test]
    async fn test_busy_job_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = scheduler(dir.path()).await;

        assert!(scheduler.run(Job::Housekeeping).await.unwrap());

        let lock = scheduler.locks[&Job::Housekeeping].clone();
        let _held = lock.lock().await;
        assert!(!scheduler.run(Job::Housekeeping).await.unwrap());
    }

    #[tokio::test]
    async fn test_media_job_without_users() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = scheduler(dir.path()).await;
        assert!(scheduler.media_names().await.unwrap().is_empty());
        assert!(scheduler.run(Job::PodcastSync).await.unwrap());
    }
}
