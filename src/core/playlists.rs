//! Active and named playlists
//!
//! Documents are stored resolved: every write runs the patched document
//! through the resolver before it is persisted.

use tracing::debug;

use super::resolver::Resolver;
use crate::db::PlaylistTable;
use crate::error::{Error, Result};
use crate::models::PlaylistInfo;
use crate::spiff::{apply_patch, PlaylistType, Spiff};

/// The user's active playlist, empty if none was saved yet
pub async fn active(resolver: &Resolver<'_>) -> Result<Spiff> {
    match PlaylistTable::active(resolver.media().db(), resolver.user()).await? {
        Some(doc) => Spiff::parse(doc.as_bytes()),
        None => Ok(Spiff::new(PlaylistType::Music, "")),
    }
}

/// Patch, resolve and save the active playlist.
///
/// Returns the new document when its entries changed, `None` when only
/// metadata did.
pub async fn patch_active(resolver: &Resolver<'_>, body: &[u8]) -> Result<Option<Spiff>> {
    let before = active(resolver).await?;
    let mut after = apply_patch(&before, body)?;
    resolver.resolve(&mut after).await?;
    PlaylistTable::save_active(resolver.media().db(), resolver.user(), &after.to_json()?).await?;

    if after.same_entries(&before) {
        debug!("active playlist for {} kept its entries", resolver.user());
        Ok(None)
    } else {
        Ok(Some(after))
    }
}

pub async fn list(resolver: &Resolver<'_>) -> Result<Vec<PlaylistInfo>> {
    PlaylistTable::for_user(resolver.media().db(), resolver.user()).await
}

/// Store a new named playlist; the document title becomes its name
pub async fn create(resolver: &Resolver<'_>, mut spiff: Spiff) -> Result<(PlaylistInfo, Spiff)> {
    let name = spiff.playlist.title.trim().to_string();
    if name.is_empty() {
        return Err(Error::MissingTitle);
    }
    resolver.resolve(&mut spiff).await?;
    let db = resolver.media().db();
    let id = PlaylistTable::insert(db, resolver.user(), &name, &spiff.to_json()?).await?;
    get(resolver, id).await
}

/// A named playlist owned by the user
pub async fn get(resolver: &Resolver<'_>, id: i64) -> Result<(PlaylistInfo, Spiff)> {
    let (info, doc) = PlaylistTable::get_by_id(resolver.media().db(), id)
        .await?
        .ok_or(Error::NotFound("playlist"))?;
    if info.user != resolver.user() {
        return Err(Error::AccessDenied);
    }
    Ok((info, Spiff::parse(doc.as_bytes())?))
}

/// Patch a named playlist, renaming it when the title changes
pub async fn patch(resolver: &Resolver<'_>, id: i64, body: &[u8]) -> Result<Option<Spiff>> {
    let (_, before) = get(resolver, id).await?;
    let mut after = apply_patch(&before, body)?;
    let name = after.playlist.title.trim().to_string();
    if name.is_empty() {
        return Err(Error::MissingTitle);
    }
    resolver.resolve(&mut after).await?;
    PlaylistTable::update(resolver.media().db(), id, &name, &after.to_json()?).await?;

    if after.same_entries(&before) {
        Ok(None)
    } else {
        Ok(Some(after))
    }
}

pub async fn delete(resolver: &Resolver<'_>, id: i64) -> Result<()> {
    let (info, _) = get(resolver, id).await?;
    PlaylistTable::delete(resolver.media().db(), info.id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::core::media::tests::test_media;
    use crate::db::{DbEngine, Schema};
    use crate::spiff::Entry;

    fn entry(id: &str, size: i64, title: &str) -> Entry {
        Entry {
            title: title.to_string(),
            identifier: vec![id.to_string()],
            size: vec![size],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_named_playlist_lifecycle() {
        let media = test_media(Config::default(), None).await;
        let server = DbEngine::memory(Schema::Server).await.unwrap();
        let client = reqwest::Client::new();
        let resolver = Resolver::new(&media, &server, &client, "alice");

        let mut spiff = Spiff::new(PlaylistType::Music, "my test");
        spiff.playlist.entries.push(entry("abc", 123, "t"));
        let (info, _) = create(&resolver, spiff).await.unwrap();

        let all = list(&resolver).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, 1);
        assert_eq!(info.name, "my test");

        let body = br#"[{"op":"add","path":"/playlist/entry/-","value":{"identifier":["cba"],"size":[456],"title":"u"}}]"#;
        let changed = patch(&resolver, info.id, body).await.unwrap().unwrap();
        assert_eq!(changed.len(), 2);
        let (_, stored) = get(&resolver, info.id).await.unwrap();
        assert_eq!(stored.len(), 2);

        let other = Resolver::new(&media, &server, &client, "bob");
        assert!(matches!(get(&other, info.id).await, Err(Error::AccessDenied)));
        assert!(matches!(delete(&other, info.id).await, Err(Error::AccessDenied)));

        delete(&resolver, info.id).await.unwrap();
        assert!(list(&resolver).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_title() {
        let media = test_media(Config::default(), None).await;
        let server = DbEngine::memory(Schema::Server).await.unwrap();
        let client = reqwest::Client::new();
        let resolver = Resolver::new(&media, &server, &client, "alice");

        let spiff = Spiff::new(PlaylistType::Music, "  ");
        assert!(matches!(create(&resolver, spiff).await, Err(Error::MissingTitle)));
    }

    #[tokio::test]
    async fn test_patch_active_reports_entry_changes() {
        let media = test_media(Config::default(), None).await;
        let server = DbEngine::memory(Schema::Server).await.unwrap();
        let client = reqwest::Client::new();
        let resolver = Resolver::new(&media, &server, &client, "alice");

        assert!(active(&resolver).await.unwrap().is_empty());

        let body = br#"[{"op":"add","path":"/playlist/entry/-","value":{"identifier":["abc"],"size":[1],"title":"t"}}]"#;
        assert!(patch_active(&resolver, body).await.unwrap().is_some());

        let body = br#"[{"op":"replace","path":"/playlist/title","value":"queue"}]"#;
        assert!(patch_active(&resolver, body).await.unwrap().is_none());

        let saved = active(&resolver).await.unwrap();
        assert_eq!(saved.playlist.title, "queue");
        assert_eq!(saved.len(), 1);

        // references are expanded before saving; unknown ones vanish
        let body = br#"[{"op":"add","path":"/playlist/entry/-","value":{"ref":"/nowhere"}}]"#;
        assert!(patch_active(&resolver, body).await.unwrap().is_none());
        assert!(!active(&resolver).await.unwrap().has_references());
    }
}
