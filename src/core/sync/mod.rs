//! Ingestion passes
//!
//! Each pass lists bucket objects newer than the kind's watermark, matches
//! them against a catalogue and writes entities then index entries. Per-file
//! failures are logged and counted; a failing bucket listing aborts the pass.

pub mod artists;
pub mod film;
pub mod images;
pub mod music;
pub mod podcast;
pub mod stations;
pub mod tv;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::bucket::{Bucket, Object};
use crate::config::DuplicatePolicy;
use crate::error::Error;

/// What happened to one listed object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Added,
    Updated,
    Unchanged,
    Skipped,
}

/// Counters for one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub removed: usize,
}

impl SyncSummary {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Added => self.added += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Unchanged => self.unchanged += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }

    pub fn merge(&mut self, other: SyncSummary) {
        self.added += other.added;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.removed += other.removed;
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} added, {} updated, {} unchanged, {} skipped, {} failed, {} removed",
            self.added, self.updated, self.unchanged, self.skipped, self.failed, self.removed
        )
    }
}

/// Every object of `bucket` modified after `since`
pub async fn list_objects(bucket: &Arc<dyn Bucket>, since: Option<DateTime<Utc>>) -> Result<Vec<Object>> {
    bucket.list(since).try_collect().await
}

/// `DuplicateFound` unless `object` wins against a stored copy of `other_size`
pub fn prefer(policy: DuplicatePolicy, object: &Object, other_size: i64) -> crate::error::Result<()> {
    if policy.prefers(object.size, other_size) {
        Ok(())
    } else {
        Err(Error::DuplicateFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_merge() {
        let mut a = SyncSummary::default();
        a.record(Outcome::Added);
        a.record(Outcome::Skipped);
        let mut b = SyncSummary::default();
        b.record(Outcome::Added);
        b.failed = 2;
        a.merge(b);
        assert_eq!(a.added, 2);
        assert_eq!(a.failed, 2);
        assert_eq!(
            a.to_string(),
            "2 added, 0 updated, 0 unchanged, 1 skipped, 2 failed, 0 removed"
        );
    }

    #[test]
    fn test_prefer_smallest() {
        let object = Object {
            key: "a.mkv".to_string(),
            path: "a.mkv".to_string(),
            etag: "e".to_string(),
            size: 10,
            last_modified: Utc::now(),
        };
        assert!(prefer(DuplicatePolicy::Smallest, &object, 20).is_ok());
        let err = prefer(DuplicatePolicy::Largest, &object, 20).unwrap_err();
        assert!(err.is_benign());
    }
}
