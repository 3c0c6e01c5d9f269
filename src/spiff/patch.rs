//! JSON-patch application

use crate::error::{Error, Result};

use super::Spiff;

/// Apply a JSON-patch document (RFC 6902) to a playlist.
///
/// Malformed patches, failed operations and results that are no longer a
/// playlist are all `invalid-content`.
pub fn apply_patch(spiff: &Spiff, body: &[u8]) -> Result<Spiff> {
    let patch: json_patch::Patch =
        serde_json::from_slice(body).map_err(|_| Error::InvalidContent)?;

    let mut doc = serde_json::to_value(spiff)?;
    json_patch::patch(&mut doc, &patch.0).map_err(|e| {
        tracing::debug!("playlist patch failed: {}", e);
        Error::InvalidContent
    })?;

    serde_json::from_value(doc).map_err(|_| Error::InvalidContent)
}
