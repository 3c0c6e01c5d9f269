//! Artist, release and radio routes

use actix_web::{get, web, HttpResponse};
use serde::Serialize;

use super::context::ApiContext;
use super::playlist::{ref_response, spiff_response, wants_xspf};
use crate::core::music::{self, ARTIST_RESOURCES};
use crate::core::views;
use crate::error::{Error, Result};
use crate::models::{Artist, Track};
use crate::spiff::{PlaylistType, Spiff};

/// Default resource behind an artist's own playlist
const ARTIST_PLAYLIST: &str = "shuffle";

#[derive(Debug, Serialize)]
struct ArtistResourceView {
    artist: Artist,
    resource: String,
    tracks: Vec<Track>,
}

fn check_resource(resource: &str) -> Result<()> {
    if ARTIST_RESOURCES.contains(&resource) {
        Ok(())
    } else {
        Err(Error::NotFound("resource"))
    }
}

#[get("/artists")]
pub async fn artists(ctx: ApiContext) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(views::artists(&ctx.media).await?))
}

#[get("/artists/{id}")]
pub async fn artist(ctx: ApiContext, path: web::Path<i64>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(views::artist(&ctx.media, path.into_inner()).await?))
}

#[get("/artists/{id}/{file:playlist(\\.xspf)?}")]
pub async fn artist_playlist(ctx: ApiContext, path: web::Path<(i64, String)>) -> Result<HttpResponse> {
    let (id, file) = path.into_inner();
    let found = music::artist(&ctx.media, id).await?;
    let reference = format!("/music/artists/{}/{}", id, ARTIST_PLAYLIST);
    ref_response(&ctx, &found.name, reference, wants_xspf(&file)).await
}

#[get("/artists/{id}/{res}")]
pub async fn artist_resource(ctx: ApiContext, path: web::Path<(i64, String)>) -> Result<HttpResponse> {
    let (id, resource) = path.into_inner();
    check_resource(&resource)?;
    let found = music::artist(&ctx.media, id).await?;
    let tracks = music::artist_tracks(&ctx.media, &found, &resource).await?;
    Ok(HttpResponse::Ok().json(ArtistResourceView {
        artist: found,
        resource,
        tracks,
    }))
}

#[get("/artists/{id}/{res}/{file:playlist(\\.xspf)?}")]
pub async fn artist_resource_playlist(
    ctx: ApiContext,
    path: web::Path<(i64, String, String)>,
) -> Result<HttpResponse> {
    let (id, resource, file) = path.into_inner();
    check_resource(&resource)?;
    let found = music::artist(&ctx.media, id).await?;
    let title = format!("{} - {}", found.name, resource);
    let reference = format!("/music/artists/{}/{}", id, resource);
    ref_response(&ctx, &title, reference, wants_xspf(&file)).await
}

#[get("/releases/{id}")]
pub async fn release(ctx: ApiContext, path: web::Path<i64>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(views::release(&ctx.media, path.into_inner()).await?))
}

#[get("/releases/{id}/{file:playlist(\\.xspf)?}")]
pub async fn release_playlist(ctx: ApiContext, path: web::Path<(i64, String)>) -> Result<HttpResponse> {
    let (id, file) = path.into_inner();
    let view = views::release(&ctx.media, id).await?;
    let reference = format!("/music/releases/{}/tracks", id);
    ref_response(&ctx, &view.release.name, reference, wants_xspf(&file)).await
}

#[get("/radio")]
pub async fn radio(ctx: ApiContext) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(views::radio(&ctx.media, &ctx.user.name).await?))
}

async fn station_view(ctx: ApiContext, id: i64) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(views::station(&ctx.media, &ctx.user.name, id).await?))
}

/// A station expanded on demand; streams resolve to their live sources
async fn station_playlist(ctx: ApiContext, id: i64, xspf: bool) -> Result<HttpResponse> {
    let resolver = ctx.resolver();
    let st = resolver.station(&id.to_string()).await?;
    let kind = if st.is_stream() {
        PlaylistType::Stream
    } else {
        PlaylistType::Music
    };
    let mut spiff = Spiff::new(kind, st.name.clone());
    spiff.playlist.creator = st.creator.clone();
    spiff.playlist.image = st.image.clone();
    spiff.playlist.entries = resolver.station_entries(&st).await?;
    spiff.dedup();
    if !st.is_stream() {
        spiff.infer_type();
    }
    spiff_response(&resolver, &spiff, xspf).await
}

#[get("/radio/{id}")]
pub async fn radio_station(ctx: ApiContext, path: web::Path<i64>) -> Result<HttpResponse> {
    station_view(ctx, path.into_inner()).await
}

#[get("/radio/{id}/{file:playlist(\\.xspf)?}")]
pub async fn radio_playlist(ctx: ApiContext, path: web::Path<(i64, String)>) -> Result<HttpResponse> {
    let (id, file) = path.into_inner();
    station_playlist(ctx, id, wants_xspf(&file)).await
}

#[get("/stations/{id}")]
pub async fn station(ctx: ApiContext, path: web::Path<i64>) -> Result<HttpResponse> {
    station_view(ctx, path.into_inner()).await
}

#[get("/stations/{id}/{file:playlist(\\.xspf)?}")]
pub async fn station_playlist_route(ctx: ApiContext, path: web::Path<(i64, String)>) -> Result<HttpResponse> {
    let (id, file) = path.into_inner();
    station_playlist(ctx, id, wants_xspf(&file)).await
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(artists)
        .service(artist)
        .service(artist_playlist)
        .service(artist_resource)
        .service(artist_resource_playlist)
        .service(release)
        .service(release_playlist)
        .service(radio)
        .service(radio_station)
        .service(radio_playlist)
        .service(station)
        .service(station_playlist_route);
}
