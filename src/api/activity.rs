//! Activity routes: posting events and listing what was played

use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;

use super::context::ApiContext;
use super::playlist::{spiff_response, wants_xspf};
use crate::client::tmdb::image_url;
use crate::core::activity::{self, Window};
use crate::core::resolver::movie_entry;
use crate::core::views;
use crate::db::TrackTable;
use crate::error::{Error, Result};
use crate::models::Event;
use crate::spiff::{PlaylistType, Spiff};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EventsBody {
    Wrapped { events: Vec<Event> },
    List(Vec<Event>),
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl WindowQuery {
    fn window(&self) -> Result<Window> {
        Window::parse(self.start.as_deref(), self.end.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Tracks,
    Movies,
    Releases,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ranking {
    Recent,
    Popular,
}

fn parse_kind(kind: &str) -> Result<Kind> {
    match kind {
        "tracks" => Ok(Kind::Tracks),
        "movies" => Ok(Kind::Movies),
        "releases" => Ok(Kind::Releases),
        _ => Err(Error::NotFound("activity")),
    }
}

fn parse_ranking(res: &str) -> Result<Ranking> {
    match res {
        "recent" => Ok(Ranking::Recent),
        "popular" => Ok(Ranking::Popular),
        _ => Err(Error::NotFound("activity")),
    }
}

#[get("/activity")]
pub async fn get_activity(ctx: ApiContext) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(views::activity(ctx.server(), &ctx.media, &ctx.user.name).await?))
}

#[post("/activity")]
pub async fn post_activity(ctx: ApiContext, body: web::Json<EventsBody>) -> Result<HttpResponse> {
    let events = match body.into_inner() {
        EventsBody::Wrapped { events } | EventsBody::List(events) => events,
    };
    activity::ingest(ctx.server(), ctx.media.db(), &ctx.user.name, events).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn listing(ctx: &ApiContext, kind: Kind, ranking: Ranking, window: Window) -> Result<HttpResponse> {
    let (server, db, user) = (ctx.server(), ctx.media.db(), ctx.user.name.as_str());
    let limit = ctx.media.config().activity.activity_limit as i64;

    let response = match (kind, ranking) {
        (Kind::Tracks, Ranking::Recent) => {
            HttpResponse::Ok().json(activity::recent_tracks(server, db, user, window, limit).await?)
        }
        (Kind::Tracks, Ranking::Popular) => {
            HttpResponse::Ok().json(activity::popular_tracks(server, db, user, window, limit).await?)
        }
        (Kind::Movies, Ranking::Recent) => {
            HttpResponse::Ok().json(activity::recent_movies(server, db, user, window, limit).await?)
        }
        (Kind::Movies, Ranking::Popular) => {
            HttpResponse::Ok().json(activity::popular_movies(server, db, user, window, limit).await?)
        }
        (Kind::Releases, Ranking::Recent) => {
            HttpResponse::Ok().json(activity::recent_releases(server, db, user, window, limit).await?)
        }
        (Kind::Releases, Ranking::Popular) => {
            HttpResponse::Ok().json(activity::popular_releases(server, db, user, window, limit).await?)
        }
    };
    Ok(response)
}

async fn playlist(ctx: &ApiContext, kind: Kind, ranking: Ranking, window: Window, xspf: bool) -> Result<HttpResponse> {
    let (server, db, user) = (ctx.server(), ctx.media.db(), ctx.user.name.as_str());
    let limit = ctx.media.config().activity.activity_limit as i64;
    let resolver = ctx.resolver();

    let (title, entries) = match kind {
        Kind::Tracks => {
            let played = match ranking {
                Ranking::Recent => activity::recent_tracks(server, db, user, window, limit).await?,
                Ranking::Popular => activity::popular_tracks(server, db, user, window, limit).await?,
            };
            let tracks: Vec<_> = played.into_iter().map(|p| p.item).collect();
            ("Tracks", resolver.track_entries(&tracks).await?)
        }
        Kind::Movies => {
            let played = match ranking {
                Ranking::Recent => activity::recent_movies(server, db, user, window, limit).await?,
                Ranking::Popular => activity::popular_movies(server, db, user, window, limit).await?,
            };
            let tmdb = &ctx.media.config().tmdb;
            let entries = played
                .iter()
                .map(|p| movie_entry(&p.item, image_url(tmdb, &tmdb.poster_size, &p.item.poster)))
                .collect();
            ("Movies", entries)
        }
        Kind::Releases => {
            let played = match ranking {
                Ranking::Recent => activity::recent_releases(server, db, user, window, limit).await?,
                Ranking::Popular => activity::popular_releases(server, db, user, window, limit).await?,
            };
            let mut tracks = Vec::new();
            for release in played.iter().map(|p| &p.item) {
                tracks.extend(TrackTable::for_release(db, &release.reid).await?);
            }
            ("Releases", resolver.track_entries(&tracks).await?)
        }
    };

    let mut spiff = Spiff::new(PlaylistType::Music, title);
    spiff.playlist.entries = entries;
    spiff.dedup();
    spiff.infer_type();
    spiff_response(&resolver, &spiff, xspf).await
}

#[get("/activity/{kind}/{file:playlist(\\.xspf)?}")]
pub async fn kind_playlist(
    ctx: ApiContext,
    path: web::Path<(String, String)>,
    query: web::Query<WindowQuery>,
) -> Result<HttpResponse> {
    let (kind, file) = path.into_inner();
    playlist(&ctx, parse_kind(&kind)?, Ranking::Recent, query.window()?, wants_xspf(&file)).await
}

#[get("/activity/{kind}")]
pub async fn kind_listing(
    ctx: ApiContext,
    path: web::Path<String>,
    query: web::Query<WindowQuery>,
) -> Result<HttpResponse> {
    listing(&ctx, parse_kind(&path)?, Ranking::Recent, query.window()?).await
}

#[get("/activity/{kind}/{res}/{file:playlist(\\.xspf)?}")]
pub async fn ranked_playlist(
    ctx: ApiContext,
    path: web::Path<(String, String, String)>,
    query: web::Query<WindowQuery>,
) -> Result<HttpResponse> {
    let (kind, res, file) = path.into_inner();
    let window = query.window()?;
    playlist(&ctx, parse_kind(&kind)?, parse_ranking(&res)?, window, wants_xspf(&file)).await
}

#[get("/activity/{kind}/{res}")]
pub async fn ranked_listing(
    ctx: ApiContext,
    path: web::Path<(String, String)>,
    query: web::Query<WindowQuery>,
) -> Result<HttpResponse> {
    let (kind, res) = path.into_inner();
    listing(&ctx, parse_kind(&kind)?, parse_ranking(&res)?, query.window()?).await
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_activity)
        .service(post_activity)
        .service(kind_playlist)
        .service(kind_listing)
        .service(ranked_playlist)
        .service(ranked_listing);
}
