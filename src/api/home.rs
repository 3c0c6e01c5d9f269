//! Home, index and search views

use actix_web::{get, web, HttpResponse};
use serde::Deserialize;

use super::context::ApiContext;
use crate::core::views;
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[get("/home")]
pub async fn home(ctx: ApiContext) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(views::home(&ctx.media).await?))
}

#[get("/index")]
pub async fn index(ctx: ApiContext) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(views::index(&ctx.media).await?))
}

#[get("/search")]
pub async fn search(ctx: ApiContext, query: web::Query<SearchQuery>) -> Result<HttpResponse> {
    let q = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| Error::MissingParameter("q".into()))?;
    Ok(HttpResponse::Ok().json(views::search(&ctx.media, q).await?))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(home).service(index).service(search);
}
