//! Session and pairing code table operations

use chrono::{DateTime, Utc};

use crate::db::DbEngine;
use crate::error::{Error, Result};
use crate::models::{Code, Session};

/// Session table operations
pub struct SessionTable;

impl SessionTable {
    pub async fn insert(db: &DbEngine, user: &str, token: &str, expires: DateTime<Utc>) -> Result<Session> {
        let pool = db.pool();
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO sessions (user, token, expires, created, updated) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user)
        .bind(token)
        .bind(expires)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(Session {
            id: result.last_insert_rowid(),
            user: user.to_string(),
            token: token.to_string(),
            expires,
            created: now,
            updated: now,
        })
    }

    pub async fn get_by_token(db: &DbEngine, token: &str) -> Result<Option<Session>> {
        let pool = db.pool();

        let session = sqlx::query_as("SELECT * FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(pool)
            .await?;

        Ok(session)
    }

    pub async fn for_user(db: &DbEngine, user: &str) -> Result<Vec<Session>> {
        let pool = db.pool();

        let sessions = sqlx::query_as("SELECT * FROM sessions WHERE user = ? ORDER BY created DESC")
            .bind(user)
            .fetch_all(pool)
            .await?;

        Ok(sessions)
    }

    /// Move a session's expiry
    pub async fn update_expires(db: &DbEngine, token: &str, expires: DateTime<Utc>) -> Result<()> {
        let pool = db.pool();

        let result = sqlx::query("UPDATE sessions SET expires = ?, updated = ? WHERE token = ?")
            .bind(expires)
            .bind(Utc::now())
            .bind(token)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::SessionNotFound);
        }
        Ok(())
    }

    /// Expire every session of `user` at `now`
    pub async fn expire_all(db: &DbEngine, user: &str, now: DateTime<Utc>) -> Result<u64> {
        let pool = db.pool();

        let result = sqlx::query("UPDATE sessions SET expires = ?, updated = ? WHERE user = ?")
            .bind(now)
            .bind(now)
            .bind(user)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete(db: &DbEngine, token: &str) -> Result<()> {
        let pool = db.pool();

        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Delete sessions that expired at or before `now`
    pub async fn delete_expired(db: &DbEngine, now: DateTime<Utc>) -> Result<u64> {
        let pool = db.pool();

        let result = sqlx::query("DELETE FROM sessions WHERE expires <= ?")
            .bind(now)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// Pairing code table operations
pub struct CodeTable;

impl CodeTable {
    pub async fn insert(db: &DbEngine, value: &str, expires: DateTime<Utc>) -> Result<Code> {
        let pool = db.pool();
        let now = Utc::now();

        let result = sqlx::query("INSERT INTO codes (value, expires, created) VALUES (?, ?, ?)")
            .bind(value)
            .bind(expires)
            .bind(now)
            .execute(pool)
            .await?;

        Ok(Code {
            id: result.last_insert_rowid(),
            value: value.to_string(),
            expires,
            token: None,
            created: now,
        })
    }

    pub async fn get_by_value(db: &DbEngine, value: &str) -> Result<Option<Code>> {
        let pool = db.pool();

        let code = sqlx::query_as("SELECT * FROM codes WHERE value = ?")
            .bind(value)
            .fetch_optional(pool)
            .await?;

        Ok(code)
    }

    /// Link a code to a session token; only succeeds once
    pub async fn link(db: &DbEngine, value: &str, token: &str) -> Result<bool> {
        let pool = db.pool();

        let result = sqlx::query(
            "UPDATE codes SET token = ? WHERE value = ? AND (token IS NULL OR token = '')",
        )
        .bind(token)
        .bind(value)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn delete_expired(db: &DbEngine, now: DateTime<Utc>) -> Result<u64> {
        let pool = db.pool();

        let result = sqlx::query("DELETE FROM codes WHERE expires <= ?")
            .bind(now)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
