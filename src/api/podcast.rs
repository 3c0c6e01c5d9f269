//! Podcast series and episode routes

use actix_web::{delete, get, put, web, HttpResponse};

use super::context::ApiContext;
use super::playlist::{ref_response, wants_xspf};
use crate::core::views;
use crate::db::PodcastTable;
use crate::error::{Error, Result};

#[get("/podcasts")]
pub async fn podcasts(ctx: ApiContext) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(views::podcasts(&ctx.media).await?))
}

#[get("/podcasts/subscribed")]
pub async fn subscribed(ctx: ApiContext) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(views::subscribed(&ctx.media, &ctx.user.name).await?))
}

#[get("/series/{id}")]
pub async fn series(ctx: ApiContext, path: web::Path<i64>) -> Result<HttpResponse> {
    let view = views::series(&ctx.media, &ctx.user.name, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[get("/series/{id}/{file:playlist(\\.xspf)?}")]
pub async fn series_playlist(ctx: ApiContext, path: web::Path<(i64, String)>) -> Result<HttpResponse> {
    let (id, file) = path.into_inner();
    let found = PodcastTable::series_by_id(ctx.media.db(), id)
        .await?
        .ok_or(Error::NotFound("series"))?;
    let reference = format!("/podcasts/series/{}", id);
    ref_response(&ctx, &found.title, reference, wants_xspf(&file)).await
}

async fn series_sid(ctx: &ApiContext, id: i64) -> Result<String> {
    PodcastTable::series_by_id(ctx.media.db(), id)
        .await?
        .map(|s| s.sid)
        .ok_or(Error::NotFound("series"))
}

#[put("/series/{id}/subscribed")]
pub async fn subscribe(ctx: ApiContext, path: web::Path<i64>) -> Result<HttpResponse> {
    let sid = series_sid(&ctx, path.into_inner()).await?;
    PodcastTable::subscribe(ctx.media.db(), &ctx.user.name, &sid).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[delete("/series/{id}/subscribed")]
pub async fn unsubscribe(ctx: ApiContext, path: web::Path<i64>) -> Result<HttpResponse> {
    let sid = series_sid(&ctx, path.into_inner()).await?;
    PodcastTable::unsubscribe(ctx.media.db(), &ctx.user.name, &sid).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[get("/episodes/{id}")]
pub async fn episode(ctx: ApiContext, path: web::Path<i64>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(views::episode(&ctx.media, path.into_inner()).await?))
}

#[get("/episodes/{id}/{file:playlist(\\.xspf)?}")]
pub async fn episode_playlist(ctx: ApiContext, path: web::Path<(i64, String)>) -> Result<HttpResponse> {
    let (id, file) = path.into_inner();
    let view = views::episode(&ctx.media, id).await?;
    let reference = format!("/podcasts/episodes/{}", id);
    ref_response(&ctx, &view.episode.title, reference, wants_xspf(&file)).await
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(podcasts)
        .service(subscribed)
        .service(series_playlist)
        .service(subscribe)
        .service(unsubscribe)
        .service(series)
        .service(episode_playlist)
        .service(episode);
}
