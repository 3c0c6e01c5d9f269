//! Active and named playlists, plus the shared playlist responders

use actix_web::http::header;
use actix_web::{delete, get, patch, post, web, HttpResponse};

use super::context::ApiContext;
use crate::core::playlists;
use crate::core::resolver::Resolver;
use crate::error::Result;
use crate::spiff::{encode_xspf, Spiff};

pub const XSPF_CONTENT_TYPE: &str = "application/xspf+xml";

/// True for `playlist.xspf` path endings
pub fn wants_xspf(file: &str) -> bool {
    file.ends_with(".xspf")
}

/// A resolved document as JSON, or as XSPF with direct locations
pub async fn spiff_response(resolver: &Resolver<'_>, spiff: &Spiff, xspf: bool) -> Result<HttpResponse> {
    if xspf {
        let direct = resolver.direct_locations(spiff).await?;
        return Ok(HttpResponse::Ok()
            .content_type(XSPF_CONTENT_TYPE)
            .body(encode_xspf(&direct)?));
    }
    Ok(HttpResponse::Ok().json(spiff))
}

/// Resolve a single reference into a titled playlist
pub async fn ref_response(
    ctx: &ApiContext,
    title: &str,
    reference: String,
    xspf: bool,
) -> Result<HttpResponse> {
    let resolver = ctx.resolver();
    let mut spiff = Spiff::from_ref(title, reference);
    resolver.resolve(&mut spiff).await?;
    spiff_response(&resolver, &spiff, xspf).await
}

fn patched(spiff: Option<Spiff>) -> HttpResponse {
    match spiff {
        Some(spiff) => HttpResponse::Ok().json(spiff),
        None => HttpResponse::NoContent().finish(),
    }
}

#[get("/playlist")]
pub async fn get_active(ctx: ApiContext) -> Result<HttpResponse> {
    let resolver = ctx.resolver();
    let spiff = playlists::active(&resolver).await?;
    Ok(HttpResponse::Ok().json(spiff))
}

#[patch("/playlist")]
pub async fn patch_active(ctx: ApiContext, body: web::Bytes) -> Result<HttpResponse> {
    let resolver = ctx.resolver();
    Ok(patched(playlists::patch_active(&resolver, &body).await?))
}

#[get("/playlists")]
pub async fn list_playlists(ctx: ApiContext) -> Result<HttpResponse> {
    let resolver = ctx.resolver();
    Ok(HttpResponse::Ok().json(playlists::list(&resolver).await?))
}

#[post("/playlists")]
pub async fn create_playlist(ctx: ApiContext, body: web::Bytes) -> Result<HttpResponse> {
    let spiff = Spiff::parse(&body)?;
    let resolver = ctx.resolver();
    let (info, spiff) = playlists::create(&resolver, spiff).await?;
    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, format!("/api/playlists/{}", info.id)))
        .json(spiff))
}

#[get("/playlists/{id}")]
pub async fn get_playlist(ctx: ApiContext, path: web::Path<i64>) -> Result<HttpResponse> {
    let resolver = ctx.resolver();
    let (info, _) = playlists::get(&resolver, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(info))
}

#[get("/playlists/{id}/{file:playlist(\\.xspf)?}")]
pub async fn get_playlist_document(ctx: ApiContext, path: web::Path<(i64, String)>) -> Result<HttpResponse> {
    let (id, file) = path.into_inner();
    let resolver = ctx.resolver();
    let (_, spiff) = playlists::get(&resolver, id).await?;
    spiff_response(&resolver, &spiff, wants_xspf(&file)).await
}

#[patch("/playlists/{id}/playlist")]
pub async fn patch_playlist(ctx: ApiContext, path: web::Path<i64>, body: web::Bytes) -> Result<HttpResponse> {
    let resolver = ctx.resolver();
    Ok(patched(playlists::patch(&resolver, path.into_inner(), &body).await?))
}

#[delete("/playlists/{id}")]
pub async fn delete_playlist(ctx: ApiContext, path: web::Path<i64>) -> Result<HttpResponse> {
    let resolver = ctx.resolver();
    playlists::delete(&resolver, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_active)
        .service(patch_active)
        .service(list_playlists)
        .service(create_playlist)
        .service(get_playlist_document)
        .service(patch_playlist)
        .service(get_playlist)
        .service(delete_playlist);
}
