//! Film catalogue models

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A playable movie file matched to the movie catalogue
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct Movie {
    pub id: i64,
    pub uuid: String,
    /// Movie catalogue id
    pub tmid: i64,
    /// IMDb id
    pub imid: String,
    pub title: String,
    pub sort_title: String,
    pub original_title: String,
    pub overview: String,
    pub tagline: String,
    /// Certification, e.g. `PG-13`
    pub rating: String,
    pub budget: i64,
    pub revenue: i64,
    /// Minutes
    pub runtime: i64,
    pub vote_average: f64,
    pub vote_count: i64,
    pub backdrop: String,
    pub poster: String,
    pub date: Option<DateTime<Utc>>,
    pub key: String,
    pub size: i64,
    pub etag: String,
    pub last_modified: DateTime<Utc>,
}

impl Movie {
    pub fn location(&self) -> String {
        format!("/api/movies/{}/location", self.uuid)
    }

    pub fn year(&self) -> Option<i32> {
        self.date.map(|d| d.year())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Collection {
    pub id: i64,
    pub tmid: i64,
    pub name: String,
    pub sort_name: String,
    pub collection_id: i64,
}

/// Cast membership of a person in a movie or TV series
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Cast {
    pub id: i64,
    /// Movie or TV series catalogue id
    pub tmid: i64,
    pub peid: i64,
    pub character: String,
    pub rank: i64,
}

/// Crew membership of a person in a movie or TV series
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Crew {
    pub id: i64,
    pub tmid: i64,
    pub peid: i64,
    pub department: String,
    pub job: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trailer {
    pub id: i64,
    pub tmid: i64,
    pub name: String,
    pub key: String,
    pub site: String,
    pub kind: String,
}

impl Trailer {
    pub fn url(&self) -> Option<String> {
        match self.site.as_str() {
            "YouTube" => Some(format!("https://www.youtube.com/watch?v={}", self.key)),
            "Vimeo" => Some(format!("https://vimeo.com/{}", self.key)),
            _ => None,
        }
    }
}

/// A person credited in movies or TV
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct Person {
    pub id: i64,
    pub peid: i64,
    pub imid: String,
    pub name: String,
    pub profile: String,
    pub bio: String,
    pub birthplace: String,
    pub birthday: Option<DateTime<Utc>>,
    pub deathday: Option<DateTime<Utc>>,
}

/// A person together with their role, for views
#[derive(Debug, Clone, Serialize)]
pub struct Credit {
    pub person: Person,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub character: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub department: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub job: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailer_url() {
        let trailer = Trailer {
            id: 1,
            tmid: 949,
            name: "Trailer".to_string(),
            key: "abc".to_string(),
            site: "YouTube".to_string(),
            kind: "Trailer".to_string(),
        };
        assert_eq!(
            trailer.url().as_deref(),
            Some("https://www.youtube.com/watch?v=abc")
        );
    }
}
