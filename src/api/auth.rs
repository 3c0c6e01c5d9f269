//! Login, tokens and device pairing

use actix_web::{get, post, web, HttpRequest, HttpResponse};
use serde::Deserialize;

use super::context::{bearer_token, expired_cookie, session_cookie, AppState, Refresh, COOKIE_NAME};
use crate::auth::Auth;
use crate::error::{Error, Result};
use crate::models::Session;

/// Credentials as posted by clients
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Credentials {
    pub user: String,
    pub pass: String,
    #[serde(default)]
    pub passcode: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LinkRequest {
    pub code: String,
    pub user: String,
    pub pass: String,
    #[serde(default)]
    pub passcode: Option<String>,
}

async fn login_session(auth: &Auth, credentials: &Credentials) -> Result<Session> {
    match credentials.passcode.as_deref() {
        Some(passcode) if !passcode.is_empty() => {
            auth.passcode_login(&credentials.user, &credentials.pass, passcode).await
        }
        _ => auth.login(&credentials.user, &credentials.pass).await,
    }
}

/// Credentials to tokens
#[post("/token")]
pub async fn create_token(state: web::Data<AppState>, body: web::Json<Credentials>) -> Result<HttpResponse> {
    let session = login_session(&state.auth, &body).await?;
    Ok(HttpResponse::Ok().json(state.auth.tokens(&session)?))
}

/// New access token; the session is extended
#[get("/token")]
pub async fn refresh_token(refresh: Refresh) -> Result<HttpResponse> {
    let auth = &refresh.state.auth;
    let session = auth.refresh(&refresh.session).await?;
    Ok(HttpResponse::Ok().json(auth.tokens(&session)?))
}

#[get("/code")]
pub async fn generate_code(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.auth.generate_code().await?))
}

/// Poll with the code token; tokens once the code is linked
#[post("/code")]
pub async fn check_code(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let token = bearer_token(&req).ok_or(Error::SessionNotFound)?;
    Ok(HttpResponse::Ok().json(state.auth.check_code(&token).await?))
}

#[post("/link")]
pub async fn link(state: web::Data<AppState>, body: web::Json<LinkRequest>) -> Result<HttpResponse> {
    state
        .auth
        .link(&body.code, &body.user, &body.pass, body.passcode.as_deref())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Browser login: sets the session cookie
#[post("/login")]
pub async fn login(state: web::Data<AppState>, body: web::Json<Credentials>) -> Result<HttpResponse> {
    let session = login_session(&state.auth, &body).await?;
    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&session))
        .json(&session))
}

#[get("/logout")]
pub async fn logout(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    if let Some(cookie) = req.cookie(COOKIE_NAME) {
        if let Ok(session) = state.auth.session(cookie.value()).await {
            state.auth.logout(&session).await?;
        }
    }
    Ok(HttpResponse::NoContent().cookie(expired_cookie()).finish())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_token)
        .service(refresh_token)
        .service(generate_code)
        .service(check_code)
        .service(link)
        .service(login)
        .service(logout);
}
