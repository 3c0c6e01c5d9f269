//! Playback progress routes

use actix_web::{delete, get, post, web, HttpResponse};
use serde::Deserialize;

use super::context::ApiContext;
use crate::core::{progress, views};
use crate::error::Result;
use crate::models::Offset;

/// Either `{"offsets": [...]}` or a bare list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OffsetsBody {
    Wrapped { offsets: Vec<Offset> },
    List(Vec<Offset>),
}

impl OffsetsBody {
    fn into_offsets(self) -> Vec<Offset> {
        match self {
            OffsetsBody::Wrapped { offsets } | OffsetsBody::List(offsets) => offsets,
        }
    }
}

#[get("/progress")]
pub async fn get_progress(ctx: ApiContext) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(views::progress(ctx.server(), &ctx.user.name).await?))
}

#[post("/progress")]
pub async fn post_progress(ctx: ApiContext, body: web::Json<OffsetsBody>) -> Result<HttpResponse> {
    progress::update_all(ctx.server(), &ctx.user.name, body.into_inner().into_offsets()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[get("/progress/{id}")]
pub async fn get_offset(ctx: ApiContext, path: web::Path<i64>) -> Result<HttpResponse> {
    let offset = progress::offset(ctx.server(), &ctx.user.name, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(offset))
}

#[delete("/progress/{id}")]
pub async fn delete_offset(ctx: ApiContext, path: web::Path<i64>) -> Result<HttpResponse> {
    progress::delete(ctx.server(), &ctx.user.name, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_progress)
        .service(post_progress)
        .service(get_offset)
        .service(delete_offset);
}
