//! User table operations

use chrono::Utc;
use sqlx::FromRow;

use crate::db::DbEngine;
use crate::error::{Error, Result};
use crate::models::User;

/// Database row for users table
#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    name: String,
    key: Vec<u8>,
    salt: Vec<u8>,
    totp: Option<String>,
    media: String,
    created: chrono::DateTime<Utc>,
    updated: chrono::DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: self.id,
            name: self.name,
            key: self.key,
            salt: self.salt,
            totp: self.totp.filter(|t| !t.is_empty()),
            media: self.media,
            created: self.created,
            updated: self.updated,
        }
    }
}

/// User table operations
pub struct UserTable;

impl UserTable {
    /// Get all users, by name
    pub async fn all(db: &DbEngine) -> Result<Vec<User>> {
        let pool = db.pool();

        let rows: Vec<UserRow> = sqlx::query_as("SELECT * FROM users ORDER BY name")
            .fetch_all(pool)
            .await?;

        Ok(rows.into_iter().map(|r| r.into_user()).collect())
    }

    /// Get user by name
    pub async fn get_by_name(db: &DbEngine, name: &str) -> Result<Option<User>> {
        let pool = db.pool();

        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE name = ?")
            .bind(name)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(|r| r.into_user()))
    }

    /// Insert a user, failing if the name is taken
    pub async fn insert(db: &DbEngine, name: &str, key: &[u8], salt: &[u8]) -> Result<i64> {
        let pool = db.pool();
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO users (name, key, salt, media, created, updated) VALUES (?, ?, ?, '', ?, ?)",
        )
        .bind(name)
        .bind(key)
        .bind(salt)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await;

        match result {
            Ok(r) => Ok(r.last_insert_rowid()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(Error::UserExists),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the derived key and salt
    pub async fn update_key(db: &DbEngine, name: &str, key: &[u8], salt: &[u8]) -> Result<()> {
        let pool = db.pool();

        let result = sqlx::query("UPDATE users SET key = ?, salt = ?, updated = ? WHERE name = ?")
            .bind(key)
            .bind(salt)
            .bind(Utc::now())
            .bind(name)
            .execute(pool)
            .await?;

        Self::expect_one(result.rows_affected())
    }

    /// Set or clear (empty string) the TOTP URI
    pub async fn update_totp(db: &DbEngine, name: &str, totp: &str) -> Result<()> {
        let pool = db.pool();

        let result = sqlx::query("UPDATE users SET totp = ?, updated = ? WHERE name = ?")
            .bind(if totp.is_empty() { None } else { Some(totp) })
            .bind(Utc::now())
            .bind(name)
            .execute(pool)
            .await?;

        Self::expect_one(result.rows_affected())
    }

    /// Replace the comma separated media list
    pub async fn update_media(db: &DbEngine, name: &str, media: &str) -> Result<()> {
        let pool = db.pool();

        let result = sqlx::query("UPDATE users SET media = ?, updated = ? WHERE name = ?")
            .bind(media)
            .bind(Utc::now())
            .bind(name)
            .execute(pool)
            .await?;

        Self::expect_one(result.rows_affected())
    }

    fn expect_one(rows: u64) -> Result<()> {
        if rows == 0 {
            Err(Error::UserNotFound)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Schema;

    #[tokio::test]
    async fn test_user_crud() {
        let db = DbEngine::memory(Schema::Server).await.unwrap();

        UserTable::insert(&db, "alice", &[1, 2], &[3, 4]).await.unwrap();
        assert!(matches!(
            UserTable::insert(&db, "alice", &[1], &[2]).await,
            Err(Error::UserExists)
        ));

        UserTable::update_media(&db, "alice", "music,family").await.unwrap();
        UserTable::update_totp(&db, "alice", "otpauth://totp/x?secret=AB").await.unwrap();

        let user = UserTable::get_by_name(&db, "alice").await.unwrap().unwrap();
        assert_eq!(user.key, vec![1, 2]);
        assert_eq!(user.salt, vec![3, 4]);
        assert_eq!(user.first_media().as_deref(), Some("music"));
        assert!(user.has_totp());

        UserTable::update_totp(&db, "alice", "").await.unwrap();
        let user = UserTable::get_by_name(&db, "alice").await.unwrap().unwrap();
        assert!(!user.has_totp());

        assert!(matches!(
            UserTable::update_media(&db, "bob", "x").await,
            Err(Error::UserNotFound)
        ));
        assert_eq!(UserTable::all(&db).await.unwrap().len(), 1);
    }
}
