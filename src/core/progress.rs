//! Playback progress
//!
//! Offsets are keyed by (user, etag). A newer client report overwrites the
//! stored position; older or identical reports are refused so that devices
//! replaying stale state never move a user backwards.

use tracing::debug;

use crate::db::{DbEngine, OffsetTable};
use crate::error::{Error, Result};
use crate::models::Offset;

pub async fn offsets(db: &DbEngine, user: &str) -> Result<Vec<Offset>> {
    OffsetTable::for_user(db, user).await
}

/// One offset, only if it belongs to `user`
pub async fn offset(db: &DbEngine, user: &str, id: i64) -> Result<Offset> {
    let offset = OffsetTable::get_by_id(db, id)
        .await?
        .ok_or(Error::NotFound("offset"))?;
    if offset.user != user {
        return Err(Error::AccessDenied);
    }
    Ok(offset)
}

pub async fn offset_by_etag(db: &DbEngine, user: &str, etag: &str) -> Result<Option<Offset>> {
    OffsetTable::get_by_etag(db, user, etag).await
}

/// Store a client reported offset for `user`.
///
/// Fails with `OffsetTooOld` or `OffsetSame` when the stored offset is newer
/// or from the same instant; the stored row is left untouched.
pub async fn update(db: &DbEngine, user: &str, mut offset: Offset) -> Result<()> {
    if !offset.is_valid() {
        return Err(Error::InvalidOffset);
    }
    offset.user = user.to_string();

    if !OffsetTable::upsert(db, &offset).await? {
        // refused by the stored row; report why
        let stored = OffsetTable::get_by_etag(db, user, &offset.etag).await?;
        return match stored {
            Some(stored) if stored.date == offset.date => Err(Error::OffsetSame),
            _ => Err(Error::OffsetTooOld),
        };
    }

    debug!("offset {} for {} at {}", offset.etag, user, offset.offset);
    Ok(())
}

/// Apply a batch, accepting stale and repeated reports
pub async fn update_all(db: &DbEngine, user: &str, offsets: Vec<Offset>) -> Result<()> {
    for offset in offsets {
        match update(db, user, offset).await {
            Ok(()) => {}
            Err(e) if e.is_benign() => debug!("offset skipped: {}", e),
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

pub async fn delete(db: &DbEngine, user: &str, id: i64) -> Result<()> {
    let offset = offset(db, user, id).await?;
    OffsetTable::delete(db, offset.id).await
}
