//! Playback progress model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Resume position of one user in one media file
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Offset {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub user: String,
    pub etag: String,
    /// Seconds; zero when unknown
    #[serde(default)]
    pub duration: i64,
    /// Seconds from the start
    pub offset: i64,
    pub date: DateTime<Utc>,
}

impl Offset {
    /// Client supplied offsets must name a file and carry sane numbers
    pub fn is_valid(&self) -> bool {
        !self.etag.is_empty()
            && self.offset >= 0
            && self.duration >= 0
            && (self.duration == 0 || self.offset <= self.duration)
            && self.date.timestamp() > 0
    }

    /// Whole percent played, when the duration is known
    pub fn percent_complete(&self) -> Option<i64> {
        if self.duration > 0 {
            Some(self.offset * 100 / self.duration)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn offset(etag: &str, offset: i64, duration: i64) -> Offset {
        Offset {
            id: 0,
            user: String::new(),
            etag: etag.to_string(),
            duration,
            offset,
            date: Utc.with_ymd_and_hms(2024, 12, 4, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_validity() {
        assert!(offset("e", 10, 100).is_valid());
        assert!(offset("e", 10, 0).is_valid());
        assert!(!offset("", 10, 100).is_valid());
        assert!(!offset("e", -1, 100).is_valid());
        assert!(!offset("e", 101, 100).is_valid());
    }

    #[test]
    fn test_percent_complete() {
        assert_eq!(offset("e", 50, 200).percent_complete(), Some(25));
        assert_eq!(offset("e", 50, 0).percent_complete(), None);
    }
}
