//! User, session and pairing code models

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Database ID
    pub id: i64,
    /// Unique user name
    pub name: String,
    /// Derived password key (never serialized)
    #[serde(skip)]
    pub key: Vec<u8>,
    /// Password salt (never serialized)
    #[serde(skip)]
    pub salt: Vec<u8>,
    /// `otpauth://` URI, stored verbatim
    #[serde(skip)]
    pub totp: Option<String>,
    /// Comma separated media collection names
    pub media: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl User {
    /// Media collections assigned to this user, in order
    pub fn media_list(&self) -> Vec<String> {
        self.media
            .split(',')
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .map(|m| m.to_string())
            .collect()
    }

    /// The collection HTTP requests are served from
    pub fn first_media(&self) -> Option<String> {
        self.media_list().into_iter().next()
    }

    pub fn has_totp(&self) -> bool {
        self.totp.as_deref().map(|t| !t.is_empty()).unwrap_or(false)
    }
}

/// A login session
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub id: i64,
    pub user: String,
    /// Opaque session token, also used as the refresh token
    pub token: String,
    pub expires: DateTime<Utc>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Session {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.expires > now
    }

    /// Remaining lifetime; negative once expired
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        self.expires - now
    }
}

/// A device pairing code
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Code {
    pub id: i64,
    pub value: String,
    pub expires: DateTime<Utc>,
    /// Session token of the client that authorized the code
    pub token: Option<String>,
    pub created: DateTime<Utc>,
}

impl Code {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires
    }

    pub fn is_linked(&self) -> bool {
        self.token.as_deref().map(|t| !t.is_empty()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(media: &str) -> User {
        User {
            id: 1,
            name: "alice".to_string(),
            key: vec![],
            salt: vec![],
            totp: None,
            media: media.to_string(),
            created: Utc::now(),
            updated: Utc::now(),
        }
    }

    #[test]
    fn test_media_list() {
        assert_eq!(user("music, family,").media_list(), vec!["music", "family"]);
        assert_eq!(user("family").first_media().as_deref(), Some("family"));
        assert_eq!(user("").first_media(), None);
    }

    #[test]
    fn test_user_json_hides_secrets() {
        let mut u = user("music");
        u.key = vec![1, 2, 3];
        u.totp = Some("otpauth://totp/x?secret=ABC".to_string());
        let json = serde_json::to_value(&u).unwrap();
        assert!(json.get("key").is_none());
        assert!(json.get("salt").is_none());
        assert!(json.get("totp").is_none());
        assert_eq!(json["name"], "alice");
    }

    #[test]
    fn test_session_validity() {
        let now = Utc::now();
        let session = Session {
            id: 1,
            user: "alice".to_string(),
            token: "t".to_string(),
            expires: now + Duration::hours(1),
            created: now,
            updated: now,
        };
        assert!(session.is_valid(now));
        assert!(!session.is_valid(now + Duration::hours(2)));
        assert_eq!(session.remaining(now), Duration::hours(1));
    }
}
