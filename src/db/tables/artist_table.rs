//! Artist table operations, with artwork, popular tracks and similar artists

use crate::db::DbEngine;
use crate::error::Result;
use crate::models::{Artist, ArtistImage, Popular, Similar};

/// Artist table operations
pub struct ArtistTable;

impl ArtistTable {
    /// Get all artists, by sort name
    pub async fn all(db: &DbEngine) -> Result<Vec<Artist>> {
        let pool = db.pool();

        let artists = sqlx::query_as("SELECT * FROM artists ORDER BY sort_name COLLATE NOCASE")
            .fetch_all(pool)
            .await?;

        Ok(artists)
    }

    pub async fn get_by_id(db: &DbEngine, id: i64) -> Result<Option<Artist>> {
        let pool = db.pool();

        let artist = sqlx::query_as("SELECT * FROM artists WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(artist)
    }

    pub async fn get_by_name(db: &DbEngine, name: &str) -> Result<Option<Artist>> {
        let pool = db.pool();

        let artist = sqlx::query_as("SELECT * FROM artists WHERE name = ?")
            .bind(name)
            .fetch_optional(pool)
            .await?;

        Ok(artist)
    }

    pub async fn get_by_arid(db: &DbEngine, arid: &str) -> Result<Option<Artist>> {
        let pool = db.pool();

        let artist = sqlx::query_as("SELECT * FROM artists WHERE arid = ? LIMIT 1")
            .bind(arid)
            .fetch_optional(pool)
            .await?;

        Ok(artist)
    }

    /// Artists tagged with `genre`
    pub async fn by_genre(db: &DbEngine, genre: &str) -> Result<Vec<Artist>> {
        let pool = db.pool();

        let artists = sqlx::query_as(
            "SELECT * FROM artists WHERE genre = ? COLLATE NOCASE ORDER BY sort_name COLLATE NOCASE",
        )
        .bind(genre)
        .fetch_all(pool)
        .await?;

        Ok(artists)
    }

    /// Insert or update an artist by name, returning its id
    pub async fn upsert(db: &DbEngine, artist: &Artist) -> Result<i64> {
        let pool = db.pool();

        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO artists (name, sort_name, arid, disambiguation, country, area, date, end_date, genre)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(name) DO UPDATE SET
                   sort_name = excluded.sort_name,
                   arid = excluded.arid,
                   disambiguation = excluded.disambiguation,
                   country = excluded.country,
                   area = excluded.area,
                   date = excluded.date,
                   end_date = excluded.end_date,
                   genre = excluded.genre
               RETURNING id"#,
        )
        .bind(&artist.name)
        .bind(&artist.sort_name)
        .bind(&artist.arid)
        .bind(&artist.disambiguation)
        .bind(&artist.country)
        .bind(&artist.area)
        .bind(&artist.date)
        .bind(&artist.end_date)
        .bind(&artist.genre)
        .fetch_one(pool)
        .await?;

        Ok(id)
    }

    pub async fn images(db: &DbEngine, artist: &str, kind: &str) -> Result<Vec<ArtistImage>> {
        let pool = db.pool();

        let images = sqlx::query_as(
            "SELECT * FROM artist_images WHERE artist = ? AND kind = ? ORDER BY rank",
        )
        .bind(artist)
        .bind(kind)
        .fetch_all(pool)
        .await?;

        Ok(images)
    }

    /// First image of a kind, if any
    pub async fn image(db: &DbEngine, artist: &str, kind: &str) -> Result<Option<String>> {
        Ok(Self::images(db, artist, kind)
            .await?
            .into_iter()
            .next()
            .map(|i| i.url))
    }

    pub async fn replace_images(db: &DbEngine, artist: &str, kind: &str, urls: &[String]) -> Result<()> {
        let mut tx = db.pool().begin().await?;

        sqlx::query("DELETE FROM artist_images WHERE artist = ? AND kind = ?")
            .bind(artist)
            .bind(kind)
            .execute(&mut *tx)
            .await?;
        for (rank, url) in urls.iter().enumerate() {
            sqlx::query("INSERT INTO artist_images (artist, kind, url, rank) VALUES (?, ?, ?, ?)")
                .bind(artist)
                .bind(kind)
                .bind(url)
                .bind(rank as i64 + 1)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn popular(db: &DbEngine, artist: &str) -> Result<Vec<Popular>> {
        let pool = db.pool();

        let popular = sqlx::query_as("SELECT * FROM popular WHERE artist = ? ORDER BY rank")
            .bind(artist)
            .fetch_all(pool)
            .await?;

        Ok(popular)
    }

    /// Replace the ranked popular titles of an artist
    pub async fn replace_popular(db: &DbEngine, artist: &str, titles: &[String]) -> Result<()> {
        let mut tx = db.pool().begin().await?;

        sqlx::query("DELETE FROM popular WHERE artist = ?")
            .bind(artist)
            .execute(&mut *tx)
            .await?;
        for (rank, title) in titles.iter().enumerate() {
            sqlx::query("INSERT INTO popular (artist, title, rank) VALUES (?, ?, ?)")
                .bind(artist)
                .bind(title)
                .bind(rank as i64 + 1)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn similar(db: &DbEngine, artist: &str) -> Result<Vec<Similar>> {
        let pool = db.pool();

        let similar = sqlx::query_as("SELECT * FROM similar WHERE artist = ? ORDER BY rank")
            .bind(artist)
            .fetch_all(pool)
            .await?;

        Ok(similar)
    }

    /// Similar artists that exist in this collection, by rank
    pub async fn similar_artists(db: &DbEngine, artist: &str, limit: i64) -> Result<Vec<Artist>> {
        let pool = db.pool();

        let artists = sqlx::query_as(
            r#"SELECT a.* FROM similar s JOIN artists a ON a.arid = s.arid
               WHERE s.artist = ? ORDER BY s.rank LIMIT ?"#,
        )
        .bind(artist)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(artists)
    }

    /// Replace the ranked similar artist ids of an artist
    pub async fn replace_similar(db: &DbEngine, artist: &str, arids: &[String]) -> Result<()> {
        let mut tx = db.pool().begin().await?;

        sqlx::query("DELETE FROM similar WHERE artist = ?")
            .bind(artist)
            .execute(&mut *tx)
            .await?;
        for (rank, arid) in arids.iter().enumerate() {
            sqlx::query("INSERT INTO similar (artist, arid, rank) VALUES (?, ?, ?)")
                .bind(artist)
                .bind(arid)
                .bind(rank as i64 + 1)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Schema;

    fn artist(name: &str, arid: &str) -> Artist {
        Artist {
            name: name.to_string(),
            sort_name: crate::utils::hashing::sort_name(name),
            arid: arid.to_string(),
            genre: "rock".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_upsert_keeps_id() {
        let db = DbEngine::memory(Schema::Media).await.unwrap();
        let id = ArtistTable::upsert(&db, &artist("The Cure", "a1")).await.unwrap();
        let mut updated = artist("The Cure", "a1");
        updated.country = "GB".to_string();
        assert_eq!(ArtistTable::upsert(&db, &updated).await.unwrap(), id);

        let found = ArtistTable::get_by_arid(&db, "a1").await.unwrap().unwrap();
        assert_eq!(found.country, "GB");
        assert_eq!(found.sort_name, "Cure, The");
    }

    #[tokio::test]
    async fn test_similar_and_popular() {
        let db = DbEngine::memory(Schema::Media).await.unwrap();
        ArtistTable::upsert(&db, &artist("Joy Division", "jd")).await.unwrap();
        ArtistTable::upsert(&db, &artist("New Order", "no")).await.unwrap();

        ArtistTable::replace_similar(
            &db,
            "Joy Division",
            &["missing".to_string(), "no".to_string()],
        )
        .await
        .unwrap();
        let similar = ArtistTable::similar_artists(&db, "Joy Division", 10).await.unwrap();
        assert_eq!(similar.len(), 1);
        assert_eq!(similar[0].name, "New Order");

        let titles = vec!["Atmosphere".to_string(), "Transmission".to_string()];
        ArtistTable::replace_popular(&db, "Joy Division", &titles).await.unwrap();
        ArtistTable::replace_popular(&db, "Joy Division", &titles[..1]).await.unwrap();
        let popular = ArtistTable::popular(&db, "Joy Division").await.unwrap();
        assert_eq!(popular.len(), 1);
        assert_eq!(popular[0].rank, 1);
    }
}
