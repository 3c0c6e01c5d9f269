//! Media locations and local file delivery
//!
//! Location routes redirect to a playable URL: a presigned bucket URL, the
//! podcast enclosure, or `/d/<path>?token=<file token>` for local files.
//! `/d/` serves a local file only with a file token issued for that exact
//! path, and only inside the configured directories.

use actix_files::NamedFile;
use actix_web::http::header;
use actix_web::{get, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use std::path::{Component, Path};
use tracing::debug;

use super::context::{AppState, MediaContext};
use crate::config::{MediaType, ServerConfig};
use crate::db::{MovieTable, PodcastTable, TrackTable, TvTable};
use crate::error::{Error, Result};
use crate::utils::hashing::is_uuid;

const FILE_URL_PREFIX: &str = "file://";

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    pub token: Option<String>,
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::TemporaryRedirect()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// `/d/` URL for a local path, carrying a token bound to that path
fn local_location(state: &AppState, path: &str) -> Result<String> {
    let token = state.auth.file_token(path)?;
    let mut url = reqwest::Url::parse("http://localhost/").map_err(|e| Error::Other(e.into()))?;
    url.set_path(&format!("/d{}", path));
    url.query_pairs_mut().append_pair("token", &token);
    Ok(format!("{}?{}", url.path(), url.query().unwrap_or_default()))
}

async fn object_redirect(ctx: &MediaContext, media: MediaType, key: &str) -> Result<HttpResponse> {
    let url = ctx.media.object_url(media, key).await?;
    let location = match url.strip_prefix(FILE_URL_PREFIX) {
        Some(path) => local_location(&ctx.state, path)?,
        None => url,
    };
    Ok(redirect(&location))
}

fn check_uuid(uuid: &str) -> Result<()> {
    if is_uuid(uuid) {
        Ok(())
    } else {
        Err(Error::InvalidUuid)
    }
}

#[get("/tracks/{uuid}/location")]
pub async fn track_location(ctx: MediaContext, path: web::Path<String>) -> Result<HttpResponse> {
    let uuid = path.into_inner();
    check_uuid(&uuid)?;
    let track = TrackTable::get_by_uuid(ctx.media.db(), &uuid)
        .await?
        .ok_or(Error::NotFound("track"))?;
    object_redirect(&ctx, MediaType::Music, &track.key).await
}

#[get("/movies/{uuid}/location")]
pub async fn movie_location(ctx: MediaContext, path: web::Path<String>) -> Result<HttpResponse> {
    let uuid = path.into_inner();
    check_uuid(&uuid)?;
    let movie = MovieTable::get_by_uuid(ctx.media.db(), &uuid)
        .await?
        .ok_or(Error::NotFound("movie"))?;
    object_redirect(&ctx, MediaType::Film, &movie.key).await
}

#[get("/tv/episodes/{uuid}/location")]
pub async fn tv_episode_location(ctx: MediaContext, path: web::Path<String>) -> Result<HttpResponse> {
    let uuid = path.into_inner();
    check_uuid(&uuid)?;
    let episode = TvTable::episode_by_uuid(ctx.media.db(), &uuid)
        .await?
        .ok_or(Error::NotFound("episode"))?;
    object_redirect(&ctx, MediaType::Tv, &episode.key).await
}

/// Podcast episodes play straight from the publisher
#[get("/episodes/{eid}/location")]
pub async fn episode_location(ctx: MediaContext, path: web::Path<String>) -> Result<HttpResponse> {
    let episode = PodcastTable::episode_by_eid(ctx.media.db(), &path.into_inner())
        .await?
        .ok_or(Error::NotFound("episode"))?;
    Ok(redirect(&episode.url))
}

/// Local paths `/d/` may serve
pub fn allowed_path(path: &Path, server: &ServerConfig) -> bool {
    if !path.is_absolute() || path.components().any(|c| matches!(c, Component::ParentDir)) {
        return false;
    }
    let included = server.include_dirs.is_empty()
        || server.include_dirs.iter().any(|dir| path.starts_with(dir));
    let excluded = server.exclude_dirs.iter().any(|dir| path.starts_with(dir));
    included && !excluded
}

#[get("/d/{path:.*}")]
pub async fn download(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<FileQuery>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let full = format!("/{}", path.into_inner());
    if !allowed_path(Path::new(&full), &state.registry.config().server) {
        debug!("refusing to serve {}", full);
        return Err(Error::AccessDenied);
    }
    let token = query
        .token
        .as_deref()
        .ok_or_else(|| Error::MissingParameter("token".into()))?;
    state.auth.check_file_token(token, &full)?;

    let file = NamedFile::open_async(&full).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound("file"),
        _ => Error::Io(e),
    })?;
    Ok(file.into_response(&req))
}

/// Location lookups under `/api`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(track_location)
        .service(movie_location)
        .service(tv_episode_location)
        .service(episode_location);
}

/// File delivery at the root
pub fn configure_files(cfg: &mut web::ServiceConfig) {
    cfg.service(download);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::test_state;
    use actix_web::http::StatusCode;
    use actix_web::test::{call_service, init_service, read_body, TestRequest};
    use actix_web::App;

    #[test]
    fn test_allowed_paths() {
        let mut server = ServerConfig::default();
        assert!(allowed_path(Path::new("/media/music/a.flac"), &server));
        assert!(!allowed_path(Path::new("/media/../etc/passwd"), &server));
        assert!(!allowed_path(Path::new("media/a.flac"), &server));

        server.include_dirs = vec!["/media".to_string()];
        server.exclude_dirs = vec!["/media/private".to_string()];
        assert!(allowed_path(Path::new("/media/music/a.flac"), &server));
        assert!(!allowed_path(Path::new("/srv/a.flac"), &server));
        assert!(!allowed_path(Path::new("/media/private/a.flac"), &server));
    }

    #[actix_web::test]
    async fn test_download_needs_matching_token() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("song.flac");
        std::fs::write(&file, b"fLaC").unwrap();
        let path = file.to_string_lossy().to_string();

        let state = test_state(dir.path()).await;
        let location = local_location(&state, &path).unwrap();
        let other = local_location(&state, "/somewhere/else.flac").unwrap();
        let app = init_service(App::new().app_data(state.clone()).configure(configure_files)).await;

        let resp = call_service(&app, TestRequest::get().uri(&location).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(read_body(resp).await.as_ref(), b"fLaC");

        // a token for another path does not open this one
        let token = other.split_once('?').unwrap().1;
        let uri = format!("{}?{}", location.split_once('?').unwrap().0, token);
        let resp = call_service(&app, TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = call_service(
            &app,
            TestRequest::get().uri("/d/tmp/../etc/passwd?token=x").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
