//! Request context and authorization extractors
//!
//! Each handler names the credentials it accepts with a policy bitmask. The
//! extractor tries a bearer access token, then a bearer media token, then the
//! session cookie, in that order, keeping only those the policy allows.

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::{http::header, web, FromRequest, HttpRequest};
use chrono::Utc;
use futures::future::LocalBoxFuture;
use std::sync::Arc;
use tracing::debug;

use crate::auth::Auth;
use crate::core::media::{Media, MediaRegistry};
use crate::core::resolver::Resolver;
use crate::db::DbEngine;
use crate::error::{Error, Result};
use crate::models::{Session, User};

pub const ACCESS_TOKEN: u8 = 1;
pub const MEDIA_TOKEN: u8 = 2;
pub const COOKIE: u8 = 4;

pub const COOKIE_NAME: &str = "Takeout";

/// Process-wide services shared by all handlers
pub struct AppState {
    pub auth: Auth,
    pub registry: MediaRegistry,
    /// Users, sessions, offsets and events
    pub server: DbEngine,
    pub http: reqwest::Client,
}

/// An authorized request: the user and the media collection they are served
pub struct Authorized<const POLICY: u8> {
    pub state: web::Data<AppState>,
    pub user: User,
    pub media: Arc<Media>,
}

/// API calls: access token or cookie
pub type ApiContext = Authorized<{ ACCESS_TOKEN | COOKIE }>;
/// Media location lookups: media token or cookie
pub type MediaContext = Authorized<{ MEDIA_TOKEN | COOKIE }>;

impl<const POLICY: u8> Authorized<POLICY> {
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.media, &self.state.server, &self.state.http, &self.user.name)
    }

    pub fn server(&self) -> &DbEngine {
        &self.state.server
    }
}

fn app_state(req: &HttpRequest) -> Result<web::Data<AppState>> {
    req.app_data::<web::Data<AppState>>()
        .cloned()
        .ok_or_else(|| Error::Other(anyhow::anyhow!("application state missing")))
}

/// `Authorization: Bearer <jwt>` or a bare `<jwt>`
pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

async fn authorize_user(req: &HttpRequest, state: &AppState, policy: u8) -> Result<User> {
    let mut failure = None;

    if let Some(token) = bearer_token(req) {
        if policy & ACCESS_TOKEN != 0 {
            match state.auth.check_access_token(&token).await {
                Ok(user) => return Ok(user),
                Err(e) => failure = Some(e),
            }
        }
        if policy & MEDIA_TOKEN != 0 {
            match state.auth.check_media_token(&token).await {
                Ok(user) => return Ok(user),
                Err(e) => failure = failure.or(Some(e)),
            }
        }
    }

    if policy & COOKIE != 0 {
        if let Some(cookie) = req.cookie(COOKIE_NAME) {
            return match state.auth.session_user(cookie.value()).await {
                Ok((user, _)) => Ok(user),
                Err(e) => {
                    debug!("cookie rejected: {}", e);
                    Err(Error::AccessDeniedRedirect)
                }
            };
        }
    }

    Err(failure.unwrap_or(Error::SessionNotFound))
}

impl<const POLICY: u8> FromRequest for Authorized<POLICY> {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let state = app_state(&req)?;
            let user = authorize_user(&req, &state, POLICY).await?;
            let name = user.first_media().ok_or(Error::AccessDenied)?;
            let media = state.registry.get(&name).await?;
            Ok(Authorized { state, user, media })
        })
    }
}

/// A refresh request: the bearer token is the session token
pub struct Refresh {
    pub state: web::Data<AppState>,
    pub user: User,
    pub session: Session,
}

impl FromRequest for Refresh {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let state = app_state(&req)?;
            let token = bearer_token(&req).ok_or(Error::SessionNotFound)?;
            let (user, session) = state.auth.check_refresh_token(&token).await?;
            Ok(Refresh { state, user, session })
        })
    }
}

/// The session cookie, for login state changes
pub fn session_cookie(session: &Session) -> Cookie<'static> {
    let remaining = session.remaining(Utc::now()).num_seconds().max(0);
    Cookie::build(COOKIE_NAME, session.token.clone())
        .path("/")
        .max_age(CookieDuration::seconds(remaining))
        .secure(true)
        .http_only(true)
        .same_site(SameSite::Strict)
        .finish()
}

/// A cookie that clears the session cookie
pub fn expired_cookie() -> Cookie<'static> {
    Cookie::build(COOKIE_NAME, "")
        .path("/")
        .max_age(CookieDuration::ZERO)
        .secure(true)
        .http_only(true)
        .same_site(SameSite::Strict)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_bearer_token_forms() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer abc.def.ghi"))
            .to_http_request();
        assert_eq!(bearer_token(&req).as_deref(), Some("abc.def.ghi"));

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "abc.def.ghi"))
            .to_http_request();
        assert_eq!(bearer_token(&req).as_deref(), Some("abc.def.ghi"));

        let req = TestRequest::default().to_http_request();
        assert_eq!(bearer_token(&req), None);
    }

    #[test]
    fn test_session_cookie_flags() {
        let now = Utc::now();
        let session = Session {
            id: 1,
            user: "alice".to_string(),
            token: "token".to_string(),
            expires: now + chrono::Duration::hours(1),
            created: now,
            updated: now,
        };
        let cookie = session_cookie(&session);
        assert_eq!(cookie.name(), COOKIE_NAME);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        let age = cookie.max_age().unwrap().whole_seconds();
        assert!(age > 3500 && age <= 3600);

        let cleared = expired_cookie();
        assert_eq!(cleared.secure(), Some(true));
        assert_eq!(cleared.max_age(), Some(CookieDuration::ZERO));
    }
}
