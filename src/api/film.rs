//! Movie and TV routes

use actix_web::{get, web, HttpResponse};

use super::context::ApiContext;
use super::playlist::{ref_response, wants_xspf};
use crate::core::views;
use crate::error::Result;

#[get("/movies")]
pub async fn movies(ctx: ApiContext) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(views::movies(&ctx.media).await?))
}

#[get("/movies/{id}")]
pub async fn movie(ctx: ApiContext, path: web::Path<i64>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(views::movie(&ctx.media, path.into_inner()).await?))
}

#[get("/movies/{id}/{file:playlist(\\.xspf)?}")]
pub async fn movie_playlist(ctx: ApiContext, path: web::Path<(i64, String)>) -> Result<HttpResponse> {
    let (id, file) = path.into_inner();
    let view = views::movie(&ctx.media, id).await?;
    ref_response(&ctx, &view.movie.title, format!("/movies/{}", id), wants_xspf(&file)).await
}

#[get("/profiles/{id}")]
pub async fn person(ctx: ApiContext, path: web::Path<i64>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(views::person(&ctx.media, path.into_inner()).await?))
}

#[get("/genres/{name}")]
pub async fn genre(ctx: ApiContext, path: web::Path<String>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(views::genre(&ctx.media, &path.into_inner()).await?))
}

#[get("/keywords/{name}")]
pub async fn keyword(ctx: ApiContext, path: web::Path<String>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(views::keyword(&ctx.media, &path.into_inner()).await?))
}

#[get("/tv")]
pub async fn tv(ctx: ApiContext) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(views::tv(&ctx.media).await?))
}

#[get("/tv/series/{id}")]
pub async fn tv_series(ctx: ApiContext, path: web::Path<i64>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(views::tv_series(&ctx.media, path.into_inner()).await?))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(movies)
        .service(movie)
        .service(movie_playlist)
        .service(person)
        .service(genre)
        .service(keyword)
        .service(tv)
        .service(tv_series);
}
