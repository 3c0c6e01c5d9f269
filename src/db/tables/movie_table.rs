//! Movie table operations, with genres, keywords, collections, credits and trailers

use chrono::{DateTime, Utc};

use crate::db::DbEngine;
use crate::error::Result;
use crate::models::{Cast, Collection, Crew, Movie, Trailer};

/// Movie table operations
pub struct MovieTable;

impl MovieTable {
    pub async fn all(db: &DbEngine) -> Result<Vec<Movie>> {
        let pool = db.pool();

        let movies = sqlx::query_as("SELECT * FROM movies ORDER BY sort_title COLLATE NOCASE")
            .fetch_all(pool)
            .await?;

        Ok(movies)
    }

    pub async fn get_by_id(db: &DbEngine, id: i64) -> Result<Option<Movie>> {
        let pool = db.pool();

        let movie = sqlx::query_as("SELECT * FROM movies WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(movie)
    }

    pub async fn get_by_uuid(db: &DbEngine, uuid: &str) -> Result<Option<Movie>> {
        let pool = db.pool();

        let movie = sqlx::query_as("SELECT * FROM movies WHERE uuid = ?")
            .bind(uuid)
            .fetch_optional(pool)
            .await?;

        Ok(movie)
    }

    pub async fn get_by_tmid(db: &DbEngine, tmid: i64) -> Result<Option<Movie>> {
        let pool = db.pool();

        let movie = sqlx::query_as("SELECT * FROM movies WHERE tmid = ? LIMIT 1")
            .bind(tmid)
            .fetch_optional(pool)
            .await?;

        Ok(movie)
    }

    pub async fn get_by_key(db: &DbEngine, key: &str) -> Result<Option<Movie>> {
        let pool = db.pool();

        let movie = sqlx::query_as("SELECT * FROM movies WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

        Ok(movie)
    }

    pub async fn get_by_etag(db: &DbEngine, etag: &str) -> Result<Option<Movie>> {
        let pool = db.pool();

        let movie = sqlx::query_as("SELECT * FROM movies WHERE etag = ? LIMIT 1")
            .bind(etag)
            .fetch_optional(pool)
            .await?;

        Ok(movie)
    }

    /// Movies by row id, in the order of `ids`
    pub async fn get_by_ids(db: &DbEngine, ids: &[i64]) -> Result<Vec<Movie>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let pool = db.pool();

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT * FROM movies WHERE id IN ({})", placeholders);
        let mut query = sqlx::query_as::<_, Movie>(&sql);
        for id in ids {
            query = query.bind(id);
        }
        let mut movies = query.fetch_all(pool).await?;

        movies.sort_by_key(|m| ids.iter().position(|id| *id == m.id));
        Ok(movies)
    }

    pub async fn recently_added(db: &DbEngine, limit: i64) -> Result<Vec<Movie>> {
        let pool = db.pool();

        let movies = sqlx::query_as("SELECT * FROM movies ORDER BY last_modified DESC LIMIT ?")
            .bind(limit)
            .fetch_all(pool)
            .await?;

        Ok(movies)
    }

    pub async fn recently_released(db: &DbEngine, limit: i64) -> Result<Vec<Movie>> {
        let pool = db.pool();

        let movies = sqlx::query_as(
            "SELECT * FROM movies WHERE date IS NOT NULL ORDER BY date DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(movies)
    }

    pub async fn by_genre(db: &DbEngine, genre: &str) -> Result<Vec<Movie>> {
        let pool = db.pool();

        let movies = sqlx::query_as(
            r#"SELECT m.* FROM movies m JOIN movie_genres g ON g.tmid = m.tmid
               WHERE g.name = ? COLLATE NOCASE ORDER BY m.sort_title COLLATE NOCASE"#,
        )
        .bind(genre)
        .fetch_all(pool)
        .await?;

        Ok(movies)
    }

    pub async fn by_keyword(db: &DbEngine, keyword: &str) -> Result<Vec<Movie>> {
        let pool = db.pool();

        let movies = sqlx::query_as(
            r#"SELECT m.* FROM movies m JOIN movie_keywords k ON k.tmid = m.tmid
               WHERE k.name = ? COLLATE NOCASE ORDER BY m.sort_title COLLATE NOCASE"#,
        )
        .bind(keyword)
        .fetch_all(pool)
        .await?;

        Ok(movies)
    }

    /// Movies in the same collection, by release date
    pub async fn collection_movies(db: &DbEngine, collection_id: i64) -> Result<Vec<Movie>> {
        let pool = db.pool();

        let movies = sqlx::query_as(
            r#"SELECT m.* FROM movies m JOIN collections c ON c.tmid = m.tmid
               WHERE c.collection_id = ? ORDER BY m.date"#,
        )
        .bind(collection_id)
        .fetch_all(pool)
        .await?;

        Ok(movies)
    }

    /// Movies a person appears in, as cast or crew
    pub async fn for_person(db: &DbEngine, peid: i64) -> Result<Vec<Movie>> {
        let pool = db.pool();

        let movies = sqlx::query_as(
            r#"SELECT * FROM movies WHERE tmid IN (
                   SELECT tmid FROM movie_cast WHERE peid = ?
                   UNION SELECT tmid FROM movie_crew WHERE peid = ?)
               ORDER BY date"#,
        )
        .bind(peid)
        .bind(peid)
        .fetch_all(pool)
        .await?;

        Ok(movies)
    }

    pub async fn last_modified(db: &DbEngine) -> Result<Option<DateTime<Utc>>> {
        let pool = db.pool();

        let last: Option<DateTime<Utc>> = sqlx::query_scalar("SELECT MAX(last_modified) FROM movies")
            .fetch_one(pool)
            .await?;

        Ok(last)
    }

    pub async fn insert(db: &DbEngine, movie: &Movie) -> Result<i64> {
        let pool = db.pool();

        let result = sqlx::query(
            r#"INSERT INTO movies (uuid, tmid, imid, title, sort_title, original_title, overview, tagline,
                   rating, budget, revenue, runtime, vote_average, vote_count, backdrop, poster, date,
                   key, size, etag, last_modified)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&movie.uuid)
        .bind(movie.tmid)
        .bind(&movie.imid)
        .bind(&movie.title)
        .bind(&movie.sort_title)
        .bind(&movie.original_title)
        .bind(&movie.overview)
        .bind(&movie.tagline)
        .bind(&movie.rating)
        .bind(movie.budget)
        .bind(movie.revenue)
        .bind(movie.runtime)
        .bind(movie.vote_average)
        .bind(movie.vote_count)
        .bind(&movie.backdrop)
        .bind(&movie.poster)
        .bind(movie.date)
        .bind(&movie.key)
        .bind(movie.size)
        .bind(&movie.etag)
        .bind(movie.last_modified)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Update a movie in place by storage key; the uuid never changes
    pub async fn update(db: &DbEngine, movie: &Movie) -> Result<()> {
        let pool = db.pool();

        sqlx::query(
            r#"UPDATE movies SET tmid = ?, imid = ?, title = ?, sort_title = ?, original_title = ?,
                   overview = ?, tagline = ?, rating = ?, budget = ?, revenue = ?, runtime = ?,
                   vote_average = ?, vote_count = ?, backdrop = ?, poster = ?, date = ?, size = ?,
                   etag = ?, last_modified = ?
               WHERE key = ?"#,
        )
        .bind(movie.tmid)
        .bind(&movie.imid)
        .bind(&movie.title)
        .bind(&movie.sort_title)
        .bind(&movie.original_title)
        .bind(&movie.overview)
        .bind(&movie.tagline)
        .bind(&movie.rating)
        .bind(movie.budget)
        .bind(movie.revenue)
        .bind(movie.runtime)
        .bind(movie.vote_average)
        .bind(movie.vote_count)
        .bind(&movie.backdrop)
        .bind(&movie.poster)
        .bind(movie.date)
        .bind(movie.size)
        .bind(&movie.etag)
        .bind(movie.last_modified)
        .bind(&movie.key)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn delete_by_key(db: &DbEngine, key: &str) -> Result<()> {
        let pool = db.pool();

        sqlx::query("DELETE FROM movies WHERE key = ?")
            .bind(key)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Remove genres, keywords, collection, credits and trailers of a movie
    pub async fn delete_dependents(db: &DbEngine, tmid: i64) -> Result<()> {
        let mut tx = db.pool().begin().await?;

        for table in [
            "collections",
            "movie_genres",
            "movie_keywords",
            "movie_cast",
            "movie_crew",
            "trailers",
        ] {
            sqlx::query(&format!("DELETE FROM {} WHERE tmid = ?", table))
                .bind(tmid)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn genres(db: &DbEngine, tmid: i64) -> Result<Vec<String>> {
        let pool = db.pool();

        let names = sqlx::query_scalar("SELECT name FROM movie_genres WHERE tmid = ? ORDER BY id")
            .bind(tmid)
            .fetch_all(pool)
            .await?;

        Ok(names)
    }

    pub async fn keywords(db: &DbEngine, tmid: i64) -> Result<Vec<String>> {
        let pool = db.pool();

        let names = sqlx::query_scalar("SELECT name FROM movie_keywords WHERE tmid = ? ORDER BY id")
            .bind(tmid)
            .fetch_all(pool)
            .await?;

        Ok(names)
    }

    pub async fn add_genres(db: &DbEngine, tmid: i64, names: &[String]) -> Result<()> {
        Self::add_names(db, "movie_genres", tmid, names).await
    }

    pub async fn add_keywords(db: &DbEngine, tmid: i64, names: &[String]) -> Result<()> {
        Self::add_names(db, "movie_keywords", tmid, names).await
    }

    async fn add_names(db: &DbEngine, table: &str, tmid: i64, names: &[String]) -> Result<()> {
        let mut tx = db.pool().begin().await?;

        for name in names {
            sqlx::query(&format!("INSERT INTO {} (tmid, name) VALUES (?, ?)", table))
                .bind(tmid)
                .bind(name)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn collection(db: &DbEngine, tmid: i64) -> Result<Option<Collection>> {
        let pool = db.pool();

        let collection = sqlx::query_as("SELECT * FROM collections WHERE tmid = ?")
            .bind(tmid)
            .fetch_optional(pool)
            .await?;

        Ok(collection)
    }

    pub async fn set_collection(db: &DbEngine, tmid: i64, name: &str, collection_id: i64) -> Result<()> {
        let pool = db.pool();

        sqlx::query("INSERT INTO collections (tmid, name, sort_name, collection_id) VALUES (?, ?, ?, ?)")
            .bind(tmid)
            .bind(name)
            .bind(crate::utils::hashing::sort_name(name))
            .bind(collection_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn cast(db: &DbEngine, tmid: i64) -> Result<Vec<Cast>> {
        let pool = db.pool();

        let cast = sqlx::query_as("SELECT * FROM movie_cast WHERE tmid = ? ORDER BY rank")
            .bind(tmid)
            .fetch_all(pool)
            .await?;

        Ok(cast)
    }

    pub async fn crew(db: &DbEngine, tmid: i64) -> Result<Vec<Crew>> {
        let pool = db.pool();

        let crew = sqlx::query_as("SELECT * FROM movie_crew WHERE tmid = ? ORDER BY id")
            .bind(tmid)
            .fetch_all(pool)
            .await?;

        Ok(crew)
    }

    pub async fn add_cast(db: &DbEngine, cast: &[Cast]) -> Result<()> {
        let mut tx = db.pool().begin().await?;

        for c in cast {
            sqlx::query("INSERT INTO movie_cast (tmid, peid, character, rank) VALUES (?, ?, ?, ?)")
                .bind(c.tmid)
                .bind(c.peid)
                .bind(&c.character)
                .bind(c.rank)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn add_crew(db: &DbEngine, crew: &[Crew]) -> Result<()> {
        let mut tx = db.pool().begin().await?;

        for c in crew {
            sqlx::query("INSERT INTO movie_crew (tmid, peid, department, job) VALUES (?, ?, ?, ?)")
                .bind(c.tmid)
                .bind(c.peid)
                .bind(&c.department)
                .bind(&c.job)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn trailers(db: &DbEngine, tmid: i64) -> Result<Vec<Trailer>> {
        let pool = db.pool();

        let trailers = sqlx::query_as("SELECT * FROM trailers WHERE tmid = ? ORDER BY id")
            .bind(tmid)
            .fetch_all(pool)
            .await?;

        Ok(trailers)
    }

    pub async fn add_trailers(db: &DbEngine, trailers: &[Trailer]) -> Result<()> {
        let mut tx = db.pool().begin().await?;

        for t in trailers {
            sqlx::query("INSERT INTO trailers (tmid, name, key, site, kind) VALUES (?, ?, ?, ?, ?)")
                .bind(t.tmid)
                .bind(&t.name)
                .bind(&t.key)
                .bind(&t.site)
                .bind(&t.kind)
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

    fn movie(key: &str, tmid: i64, title: &str) -> Movie {
        Movie {
            uuid: crate::utils::hashing::new_uuid(),
            tmid,
            title: title.to_string(),
            sort_title: title.to_string(),
            key: key.to_string(),
            etag: format!("etag-{}", tmid),
            last_modified: Utc::now(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_movie_dependents() {
        let db = DbEngine::memory(Schema::Media).await.unwrap();
        MovieTable::insert(&db, &movie("Alien (1979).mkv", 348, "Alien")).await.unwrap();
        MovieTable::insert(&db, &movie("Aliens (1986).mkv", 679, "Aliens")).await.unwrap();

        MovieTable::add_genres(&db, 348, &["Horror".to_string(), "Science Fiction".to_string()])
            .await
            .unwrap();
        MovieTable::set_collection(&db, 348, "Alien Collection", 8091).await.unwrap();
        MovieTable::set_collection(&db, 679, "Alien Collection", 8091).await.unwrap();

        assert_eq!(MovieTable::by_genre(&db, "horror").await.unwrap().len(), 1);
        assert_eq!(MovieTable::collection_movies(&db, 8091).await.unwrap().len(), 2);

        MovieTable::delete_dependents(&db, 348).await.unwrap();
        assert!(MovieTable::genres(&db, 348).await.unwrap().is_empty());
        assert!(MovieTable::collection(&db, 348).await.unwrap().is_none());
        assert!(MovieTable::collection(&db, 679).await.unwrap().is_some());
    }
}
