//! Database migrations

use anyhow::Result;
use tracing::info;

use super::engine::{DbEngine, Schema};

/// Current migration version per schema
fn current_version(schema: Schema) -> i32 {
    match schema {
        Schema::Server => 3,
        Schema::Media => 2,
    }
}

/// Run database migrations
pub(super) async fn run_migrations(db: &DbEngine) -> Result<()> {
    let pool = db.pool();
    let target = current_version(db.schema());

    // Get current version
    let row: (i32,) = sqlx::query_as("SELECT version FROM dbmigration WHERE id = 1")
        .fetch_one(pool)
        .await?;
    let current = row.0;

    if current >= target {
        tracing::debug!(
            "{} database is up to date (version {})",
            db.schema().name(),
            current
        );
        return Ok(());
    }

    info!(
        "Running {} migrations from version {} to {}",
        db.schema().name(),
        current,
        target
    );

    for version in (current + 1)..=target {
        run_migration(db, version).await?;

        sqlx::query("UPDATE dbmigration SET version = ? WHERE id = 1")
            .bind(version)
            .execute(pool)
            .await?;

        info!("Applied {} migration {}", db.schema().name(), version);
    }

    Ok(())
}

async fn run_migration(db: &DbEngine, version: i32) -> Result<()> {
    let pool = db.pool();

    match (db.schema(), version) {
        // tables are created in place on a fresh database
        (_, 1) => {}
        (Schema::Server, 2) => {
            // backfill the local day of events recorded before it was stored
            let has_column: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM pragma_table_info('track_events') WHERE name = 'day'",
            )
            .fetch_one(pool)
            .await
            .unwrap_or(1);

            if has_column == 0 {
                for table in ["track_events", "movie_events", "episode_events"] {
                    sqlx::query(&format!(
                        "ALTER TABLE {} ADD COLUMN day TEXT NOT NULL DEFAULT ''",
                        table
                    ))
                    .execute(pool)
                    .await?;
                    sqlx::query(&format!(
                        "UPDATE {} SET day = substr(date, 1, 10) WHERE day = ''",
                        table
                    ))
                    .execute(pool)
                    .await?;
                }
            }
        }
        (Schema::Server, 3) => {
            // one offset per user and item; keep the newest report
            sqlx::query(
                r#"
                DROP INDEX IF EXISTS idx_offsets_user_etag;
                DELETE FROM offsets WHERE EXISTS (
                    SELECT 1 FROM offsets newer
                    WHERE newer.user = offsets.user AND newer.etag = offsets.etag
                      AND (newer.date > offsets.date
                           OR (newer.date = offsets.date AND newer.id > offsets.id))
                );
                CREATE UNIQUE INDEX IF NOT EXISTS idx_offsets_user_etag ON offsets(user, etag);
                "#,
            )
            .execute(pool)
            .await?;
        }
        (Schema::Media, 2) => {
            // watermark queries scan by modification time
            sqlx::query(
                r#"
                CREATE INDEX IF NOT EXISTS idx_tracks_last_modified ON tracks(last_modified);
                CREATE INDEX IF NOT EXISTS idx_movies_last_modified ON movies(last_modified);
                CREATE INDEX IF NOT EXISTS idx_tv_episodes_last_modified ON tv_episodes(last_modified);
                "#,
            )
            .execute(pool)
            .await?;
        }
        (schema, _) => {
            tracing::warn!("Unknown {} migration version: {}", schema.name(), version);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_reach_current_version() {
        for schema in [Schema::Server, Schema::Media] {
            let db = DbEngine::memory(schema).await.unwrap();
            let version: i32 = sqlx::query_scalar("SELECT version FROM dbmigration WHERE id = 1")
                .fetch_one(db.pool())
                .await
                .unwrap();
            assert_eq!(version, current_version(schema));

            // running again is a no-op
            run_migrations(&db).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_offsets_deduplicated_on_upgrade() {
        let db = DbEngine::memory(Schema::Server).await.unwrap();
        let pool = db.pool();

        // an older store without the unique index
        sqlx::query(
            r#"
            DROP INDEX idx_offsets_user_etag;
            CREATE INDEX idx_offsets_user_etag ON offsets(user, etag);
            UPDATE dbmigration SET version = 2 WHERE id = 1;
            INSERT INTO offsets (user, etag, "offset", date, created, updated) VALUES
                ('alice', 'E', 10, '2024-12-04T10:00:00+00:00', '', ''),
                ('alice', 'E', 30, '2024-12-04T10:30:00+00:00', '', ''),
                ('alice', 'E', 20, '2024-12-04T10:20:00+00:00', '', ''),
                ('bob', 'E', 5, '2024-12-04T09:00:00+00:00', '', '');
            "#,
        )
        .execute(pool)
        .await
        .unwrap();

        run_migrations(&db).await.unwrap();

        let kept: Vec<(String, i64)> =
            sqlx::query_as(r#"SELECT user, "offset" FROM offsets ORDER BY user"#)
                .fetch_all(pool)
                .await
                .unwrap();
        assert_eq!(kept, vec![("alice".to_string(), 30), ("bob".to_string(), 5)]);

        let unique: i64 = sqlx::query_scalar(
            "SELECT \"unique\" FROM pragma_index_list('offsets') WHERE name = 'idx_offsets_user_etag'",
        )
        .fetch_one(pool)
        .await
        .unwrap();
        assert_eq!(unique, 1);
    }
}
