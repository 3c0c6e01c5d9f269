//! Person table operations

use crate::db::DbEngine;
use crate::error::Result;
use crate::models::Person;

/// Person table operations
pub struct PersonTable;

impl PersonTable {
    pub async fn get_by_id(db: &DbEngine, id: i64) -> Result<Option<Person>> {
        let pool = db.pool();

        let person = sqlx::query_as("SELECT * FROM people WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(person)
    }

    pub async fn get_by_peid(db: &DbEngine, peid: i64) -> Result<Option<Person>> {
        let pool = db.pool();

        let person = sqlx::query_as("SELECT * FROM people WHERE peid = ?")
            .bind(peid)
            .fetch_optional(pool)
            .await?;

        Ok(person)
    }

    /// People by catalogue id, keeping the order of `peids`
    pub async fn get_by_peids(db: &DbEngine, peids: &[i64]) -> Result<Vec<Person>> {
        if peids.is_empty() {
            return Ok(vec![]);
        }
        let pool = db.pool();

        let placeholders = vec!["?"; peids.len()].join(", ");
        let sql = format!("SELECT * FROM people WHERE peid IN ({})", placeholders);
        let mut query = sqlx::query_as::<_, Person>(&sql);
        for peid in peids {
            query = query.bind(peid);
        }
        let mut people = query.fetch_all(pool).await?;

        people.sort_by_key(|p| peids.iter().position(|id| *id == p.peid));
        Ok(people)
    }

    /// Everyone with a profile image, for image cache warming
    pub async fn with_profiles(db: &DbEngine) -> Result<Vec<Person>> {
        let pool = db.pool();

        let people = sqlx::query_as("SELECT * FROM people WHERE profile != ''")
            .fetch_all(pool)
            .await?;

        Ok(people)
    }

    /// Insert or refresh a person by catalogue id
    pub async fn upsert(db: &DbEngine, person: &Person) -> Result<i64> {
        let pool = db.pool();

        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO people (peid, imid, name, profile, bio, birthplace, birthday, deathday)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(peid) DO UPDATE SET
                   imid = excluded.imid,
                   name = excluded.name,
                   profile = excluded.profile,
                   bio = excluded.bio,
                   birthplace = excluded.birthplace,
                   birthday = excluded.birthday,
                   deathday = excluded.deathday
               RETURNING id"#,
        )
        .bind(person.peid)
        .bind(&person.imid)
        .bind(&person.name)
        .bind(&person.profile)
        .bind(&person.bio)
        .bind(&person.birthplace)
        .bind(person.birthday)
        .bind(person.deathday)
        .fetch_one(pool)
        .await?;

        Ok(id)
    }
}
