//! Database engine and schema management

use anyhow::{Context, Result};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use super::migrations::run_migrations;

/// Which set of tables a database holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// Users, sessions, pairing codes, offsets and activity events
    Server,
    /// Catalogue of one media collection plus its search index
    Media,
}

impl Schema {
    pub fn name(&self) -> &'static str {
        match self {
            Schema::Server => "server",
            Schema::Media => "media",
        }
    }
}

/// Handle to one SQLite database; cheap to clone
#[derive(Debug, Clone)]
pub struct DbEngine {
    pool: SqlitePool,
    schema: Schema,
}

impl DbEngine {
    /// Open (creating if missing) a database file and bring its schema up to date
    pub async fn open(path: &Path, schema: Schema) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30))
            .pragma("cache_size", "10000")
            .pragma("foreign_keys", "ON")
            .pragma("temp_store", "FILE")
            .pragma("mmap_size", "0");

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database {}", path.display()))?;

        Self::setup(pool, schema).await
    }

    /// Private in-memory database, used by tests and one-shot commands
    pub async fn memory(schema: Schema) -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // every pooled connection to :memory: is a distinct database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("Failed to open in-memory database")?;

        Self::setup(pool, schema).await
    }

    async fn setup(pool: SqlitePool, schema: Schema) -> Result<Self> {
        let engine = Self { pool, schema };
        match schema {
            Schema::Server => create_server_tables(&engine).await?,
            Schema::Media => create_media_tables(&engine).await?,
        }
        run_migrations(&engine).await?;
        Ok(engine)
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

async fn create_migration_table(db: &DbEngine) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dbmigration (
            id INTEGER PRIMARY KEY,
            version INTEGER NOT NULL DEFAULT 0
        );
        INSERT OR IGNORE INTO dbmigration (id, version) VALUES (1, 0);
        "#,
    )
    .execute(db.pool())
    .await?;
    Ok(())
}

async fn create_server_tables(db: &DbEngine) -> Result<()> {
    let pool = db.pool();

    // Users
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            key BLOB NOT NULL,
            salt BLOB NOT NULL,
            totp TEXT,
            media TEXT NOT NULL DEFAULT '',
            created TEXT NOT NULL,
            updated TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Login sessions
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user TEXT NOT NULL,
            token TEXT NOT NULL UNIQUE,
            expires TEXT NOT NULL,
            created TEXT NOT NULL,
            updated TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user);
        CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires);
        "#,
    )
    .execute(pool)
    .await?;

    // Device pairing codes
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS codes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            value TEXT NOT NULL UNIQUE,
            expires TEXT NOT NULL,
            token TEXT,
            created TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_codes_expires ON codes(expires);
        "#,
    )
    .execute(pool)
    .await?;

    // Playback offsets
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS offsets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user TEXT NOT NULL,
            etag TEXT NOT NULL,
            duration INTEGER NOT NULL DEFAULT 0,
            "offset" INTEGER NOT NULL DEFAULT 0,
            date TEXT NOT NULL,
            created TEXT NOT NULL,
            updated TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Activity events
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS track_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user TEXT NOT NULL,
            date TEXT NOT NULL,
            day TEXT NOT NULL,
            rid TEXT NOT NULL,
            rgid TEXT NOT NULL DEFAULT '',
            etag TEXT NOT NULL DEFAULT '',
            artist TEXT NOT NULL DEFAULT '',
            "release" TEXT NOT NULL DEFAULT '',
            title TEXT NOT NULL DEFAULT ''
        );
        CREATE INDEX IF NOT EXISTS idx_track_events_user_date ON track_events(user, date);
        CREATE INDEX IF NOT EXISTS idx_track_events_rid ON track_events(rid);

        CREATE TABLE IF NOT EXISTS movie_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user TEXT NOT NULL,
            date TEXT NOT NULL,
            day TEXT NOT NULL,
            tmid TEXT NOT NULL,
            imid TEXT NOT NULL DEFAULT '',
            etag TEXT NOT NULL DEFAULT '',
            title TEXT NOT NULL DEFAULT ''
        );
        CREATE INDEX IF NOT EXISTS idx_movie_events_user_date ON movie_events(user, date);

        CREATE TABLE IF NOT EXISTS episode_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user TEXT NOT NULL,
            date TEXT NOT NULL,
            day TEXT NOT NULL,
            eid TEXT NOT NULL,
            title TEXT NOT NULL DEFAULT ''
        );
        CREATE INDEX IF NOT EXISTS idx_episode_events_user_date ON episode_events(user, date);
        "#,
    )
    .execute(pool)
    .await?;

    create_migration_table(db).await
}

async fn create_media_tables(db: &DbEngine) -> Result<()> {
    let pool = db.pool();

    // Music
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artists (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            sort_name TEXT NOT NULL,
            arid TEXT NOT NULL DEFAULT '',
            disambiguation TEXT NOT NULL DEFAULT '',
            country TEXT NOT NULL DEFAULT '',
            area TEXT NOT NULL DEFAULT '',
            date TEXT NOT NULL DEFAULT '',
            end_date TEXT NOT NULL DEFAULT '',
            genre TEXT NOT NULL DEFAULT ''
        );
        CREATE INDEX IF NOT EXISTS idx_artists_arid ON artists(arid);

        CREATE TABLE IF NOT EXISTS artist_images (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            artist TEXT NOT NULL,
            kind TEXT NOT NULL,
            url TEXT NOT NULL,
            rank INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_artist_images_artist ON artist_images(artist, kind);

        CREATE TABLE IF NOT EXISTS releases (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            artist TEXT NOT NULL,
            name TEXT NOT NULL,
            rgid TEXT NOT NULL DEFAULT '',
            reid TEXT NOT NULL UNIQUE,
            disambiguation TEXT NOT NULL DEFAULT '',
            type TEXT NOT NULL DEFAULT '',
            secondary_types TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT '',
            country TEXT NOT NULL DEFAULT '',
            track_count INTEGER NOT NULL DEFAULT 0,
            disc_count INTEGER NOT NULL DEFAULT 0,
            artwork INTEGER NOT NULL DEFAULT 0,
            front_artwork INTEGER NOT NULL DEFAULT 0,
            back_artwork INTEGER NOT NULL DEFAULT 0,
            group_artwork INTEGER NOT NULL DEFAULT 0,
            date TEXT,
            release_date TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_releases_artist ON releases(artist);
        CREATE INDEX IF NOT EXISTS idx_releases_rgid ON releases(rgid);

        CREATE TABLE IF NOT EXISTS tracks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            artist TEXT NOT NULL,
            "release" TEXT NOT NULL,
            title TEXT NOT NULL,
            track_num INTEGER NOT NULL DEFAULT 0,
            disc_num INTEGER NOT NULL DEFAULT 1,
            track_count INTEGER NOT NULL DEFAULT 0,
            disc_count INTEGER NOT NULL DEFAULT 0,
            rid TEXT NOT NULL DEFAULT '',
            rgid TEXT NOT NULL DEFAULT '',
            reid TEXT NOT NULL DEFAULT '',
            release_date TEXT,
            key TEXT NOT NULL UNIQUE,
            size INTEGER NOT NULL DEFAULT 0,
            etag TEXT NOT NULL,
            last_modified TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_tracks_artist ON tracks(artist);
        CREATE INDEX IF NOT EXISTS idx_tracks_reid ON tracks(reid);
        CREATE INDEX IF NOT EXISTS idx_tracks_rid ON tracks(rid);
        CREATE INDEX IF NOT EXISTS idx_tracks_etag ON tracks(etag);

        CREATE TABLE IF NOT EXISTS popular (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            artist TEXT NOT NULL,
            title TEXT NOT NULL,
            rank INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_popular_artist ON popular(artist);

        CREATE TABLE IF NOT EXISTS similar (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            artist TEXT NOT NULL,
            arid TEXT NOT NULL,
            rank INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_similar_artist ON similar(artist);
        "#,
    )
    .execute(pool)
    .await?;

    // Film
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS movies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            tmid INTEGER NOT NULL,
            imid TEXT NOT NULL DEFAULT '',
            title TEXT NOT NULL,
            sort_title TEXT NOT NULL,
            original_title TEXT NOT NULL DEFAULT '',
            overview TEXT NOT NULL DEFAULT '',
            tagline TEXT NOT NULL DEFAULT '',
            rating TEXT NOT NULL DEFAULT '',
            budget INTEGER NOT NULL DEFAULT 0,
            revenue INTEGER NOT NULL DEFAULT 0,
            runtime INTEGER NOT NULL DEFAULT 0,
            vote_average REAL NOT NULL DEFAULT 0,
            vote_count INTEGER NOT NULL DEFAULT 0,
            backdrop TEXT NOT NULL DEFAULT '',
            poster TEXT NOT NULL DEFAULT '',
            date TEXT,
            key TEXT NOT NULL UNIQUE,
            size INTEGER NOT NULL DEFAULT 0,
            etag TEXT NOT NULL,
            last_modified TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_movies_tmid ON movies(tmid);
        CREATE INDEX IF NOT EXISTS idx_movies_etag ON movies(etag);

        CREATE TABLE IF NOT EXISTS collections (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tmid INTEGER NOT NULL,
            name TEXT NOT NULL,
            sort_name TEXT NOT NULL,
            collection_id INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_collections_tmid ON collections(tmid);

        CREATE TABLE IF NOT EXISTS movie_genres (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tmid INTEGER NOT NULL,
            name TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_movie_genres_tmid ON movie_genres(tmid);

        CREATE TABLE IF NOT EXISTS movie_keywords (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tmid INTEGER NOT NULL,
            name TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_movie_keywords_tmid ON movie_keywords(tmid);

        CREATE TABLE IF NOT EXISTS movie_cast (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tmid INTEGER NOT NULL,
            peid INTEGER NOT NULL,
            character TEXT NOT NULL DEFAULT '',
            rank INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_movie_cast_tmid ON movie_cast(tmid);
        CREATE INDEX IF NOT EXISTS idx_movie_cast_peid ON movie_cast(peid);

        CREATE TABLE IF NOT EXISTS movie_crew (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tmid INTEGER NOT NULL,
            peid INTEGER NOT NULL,
            department TEXT NOT NULL DEFAULT '',
            job TEXT NOT NULL DEFAULT ''
        );
        CREATE INDEX IF NOT EXISTS idx_movie_crew_tmid ON movie_crew(tmid);
        CREATE INDEX IF NOT EXISTS idx_movie_crew_peid ON movie_crew(peid);

        CREATE TABLE IF NOT EXISTS trailers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tmid INTEGER NOT NULL,
            name TEXT NOT NULL DEFAULT '',
            key TEXT NOT NULL,
            site TEXT NOT NULL DEFAULT '',
            kind TEXT NOT NULL DEFAULT ''
        );
        CREATE INDEX IF NOT EXISTS idx_trailers_tmid ON trailers(tmid);

        CREATE TABLE IF NOT EXISTS people (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            peid INTEGER NOT NULL UNIQUE,
            imid TEXT NOT NULL DEFAULT '',
            name TEXT NOT NULL,
            profile TEXT NOT NULL DEFAULT '',
            bio TEXT NOT NULL DEFAULT '',
            birthplace TEXT NOT NULL DEFAULT '',
            birthday TEXT,
            deathday TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    // TV
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tv_series (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tvid INTEGER NOT NULL UNIQUE,
            name TEXT NOT NULL,
            sort_name TEXT NOT NULL,
            original_name TEXT NOT NULL DEFAULT '',
            overview TEXT NOT NULL DEFAULT '',
            tagline TEXT NOT NULL DEFAULT '',
            rating TEXT NOT NULL DEFAULT '',
            vote_average REAL NOT NULL DEFAULT 0,
            vote_count INTEGER NOT NULL DEFAULT 0,
            season_count INTEGER NOT NULL DEFAULT 0,
            episode_count INTEGER NOT NULL DEFAULT 0,
            backdrop TEXT NOT NULL DEFAULT '',
            poster TEXT NOT NULL DEFAULT '',
            date TEXT,
            end_date TEXT
        );

        CREATE TABLE IF NOT EXISTS tv_episodes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            tvid INTEGER NOT NULL,
            name TEXT NOT NULL DEFAULT '',
            overview TEXT NOT NULL DEFAULT '',
            season INTEGER NOT NULL,
            episode INTEGER NOT NULL,
            runtime INTEGER NOT NULL DEFAULT 0,
            vote_average REAL NOT NULL DEFAULT 0,
            vote_count INTEGER NOT NULL DEFAULT 0,
            still TEXT NOT NULL DEFAULT '',
            date TEXT,
            key TEXT NOT NULL UNIQUE,
            size INTEGER NOT NULL DEFAULT 0,
            etag TEXT NOT NULL,
            last_modified TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_tv_episodes_tvid ON tv_episodes(tvid, season, episode);
        CREATE INDEX IF NOT EXISTS idx_tv_episodes_etag ON tv_episodes(etag);

        CREATE TABLE IF NOT EXISTS tv_genres (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tvid INTEGER NOT NULL,
            name TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_tv_genres_tvid ON tv_genres(tvid);

        CREATE TABLE IF NOT EXISTS tv_keywords (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tvid INTEGER NOT NULL,
            name TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_tv_keywords_tvid ON tv_keywords(tvid);

        CREATE TABLE IF NOT EXISTS tv_cast (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tvid INTEGER NOT NULL,
            peid INTEGER NOT NULL,
            character TEXT NOT NULL DEFAULT '',
            rank INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_tv_cast_tvid ON tv_cast(tvid);

        CREATE TABLE IF NOT EXISTS tv_crew (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tvid INTEGER NOT NULL,
            peid INTEGER NOT NULL,
            department TEXT NOT NULL DEFAULT '',
            job TEXT NOT NULL DEFAULT ''
        );
        CREATE INDEX IF NOT EXISTS idx_tv_crew_tvid ON tv_crew(tvid);
        "#,
    )
    .execute(pool)
    .await?;

    // Podcasts
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS series (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sid TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            author TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            link TEXT NOT NULL,
            image TEXT NOT NULL DEFAULT '',
            copyright TEXT NOT NULL DEFAULT '',
            date TEXT,
            ttl INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS episodes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            eid TEXT NOT NULL UNIQUE,
            sid TEXT NOT NULL,
            title TEXT NOT NULL,
            author TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            link TEXT NOT NULL DEFAULT '',
            url TEXT NOT NULL,
            content_type TEXT NOT NULL DEFAULT '',
            size INTEGER NOT NULL DEFAULT 0,
            duration INTEGER NOT NULL DEFAULT 0,
            date TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_episodes_sid ON episodes(sid, date);

        CREATE TABLE IF NOT EXISTS subscriptions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user TEXT NOT NULL,
            sid TEXT NOT NULL,
            UNIQUE(user, sid)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Stations and playlists
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user TEXT NOT NULL,
            shared INTEGER NOT NULL DEFAULT 0,
            type TEXT NOT NULL,
            name TEXT NOT NULL,
            creator TEXT NOT NULL DEFAULT '',
            ref TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            image TEXT NOT NULL DEFAULT '',
            playlist TEXT,
            UNIQUE(user, name)
        );

        CREATE TABLE IF NOT EXISTS active_playlists (
            user TEXT PRIMARY KEY,
            playlist TEXT NOT NULL,
            updated TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS playlists (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user TEXT NOT NULL,
            name TEXT NOT NULL,
            playlist TEXT NOT NULL,
            created TEXT NOT NULL,
            updated TEXT NOT NULL,
            UNIQUE(user, name)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Search side table; per-namespace FTS tables are created by the searcher
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS search_fields (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ns TEXT NOT NULL,
            key TEXT NOT NULL,
            field TEXT NOT NULL,
            value TEXT NOT NULL,
            num REAL
        );
        CREATE INDEX IF NOT EXISTS idx_search_fields_key ON search_fields(ns, key);
        CREATE INDEX IF NOT EXISTS idx_search_fields_field ON search_fields(ns, field, value);
        "#,
    )
    .execute(pool)
    .await?;

    create_migration_table(db).await
}
