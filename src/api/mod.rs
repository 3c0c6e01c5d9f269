//! HTTP routes

pub mod activity;
pub mod auth;
pub mod context;
pub mod errors;
pub mod film;
pub mod home;
pub mod music;
pub mod playlist;
pub mod podcast;
pub mod progress;
pub mod stream;

use actix_web::web;

pub use context::AppState;

/// Configure all routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            // Login, tokens and device pairing
            .configure(auth::configure)
            // Home, index and search
            .configure(home::configure)
            // Playable locations
            .configure(stream::configure)
            .configure(music::configure)
            .configure(film::configure)
            .configure(podcast::configure)
            .configure(playlist::configure)
            .configure(progress::configure)
            .configure(activity::configure),
    )
    // Local file delivery
    .configure(stream::configure_files);
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::Auth;
    use crate::config::{Config, Paths};
    use crate::core::media::tests::test_media;
    use crate::core::media::MediaRegistry;
    use crate::db::{DbEngine, Schema, SessionTable, TrackTable};
    use actix_web::cookie::Cookie;
    use crate::models::Track;
    use actix_web::http::{header, StatusCode};
    use actix_web::test::{call_service, init_service, read_body_json, TestRequest};
    use actix_web::App;
    use chrono::{Duration, Utc};
    use context::COOKIE_NAME;
    use serde_json::{json, Value};
    use std::path::Path;

    pub(crate) const PASSWORD: &str = "Corr3ctHorse!BatteryStaple";

    /// App state with one user, alice, assigned the collection "test"
    pub(crate) async fn test_state(dir: &Path) -> web::Data<AppState> {
        let server = DbEngine::memory(Schema::Server).await.unwrap();
        let mut config = Config::default();
        config.auth.access_token.secret = "access".to_string();
        config.auth.media_token.secret = "media".to_string();
        config.auth.code_token.secret = "code".to_string();
        config.auth.file_token.secret = "file".to_string();

        let auth = Auth::new(server.clone(), config.auth.clone()).unwrap();
        auth.add_user("alice", PASSWORD).await.unwrap();
        auth.assign_media("alice", &["test".to_string()]).await.unwrap();

        let paths = Paths::new(Some(dir.to_path_buf())).unwrap();
        let registry = MediaRegistry::new(config.clone(), paths);
        registry.insert(test_media(config, None).await);

        web::Data::new(AppState {
            auth,
            registry,
            server,
            http: reqwest::Client::new(),
        })
    }

    fn bearer(token: &str) -> (header::HeaderName, String) {
        (header::AUTHORIZATION, format!("Bearer {}", token))
    }

    #[actix_web::test]
    async fn test_token_login() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;
        let app = init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = TestRequest::post()
            .uri("/api/token")
            .set_json(json!({"User": "alice", "Pass": "wrong password"}))
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = TestRequest::post()
            .uri("/api/token")
            .set_json(json!({"User": "alice", "Pass": PASSWORD}))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let tokens: Value = read_body_json(resp).await;
        let access = tokens["AccessToken"].as_str().unwrap();
        assert!(!tokens["MediaToken"].as_str().unwrap().is_empty());

        let req = TestRequest::get()
            .uri("/api/playlists")
            .insert_header(bearer(access))
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::OK);

        let req = TestRequest::get().uri("/api/playlists").to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    async fn access_token(state: &web::Data<AppState>) -> String {
        let session = state.auth.login("alice", PASSWORD).await.unwrap();
        state.auth.tokens(&session).unwrap().access_token
    }

    #[actix_web::test]
    async fn test_playlist_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;
        let token = access_token(&state).await;
        let app = init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = TestRequest::post()
            .uri("/api/playlists")
            .insert_header(bearer(&token))
            .set_json(json!({
                "playlist": {
                    "title": "my test",
                    "entry": [{"identifier": ["abc"], "size": [123], "title": "first"}]
                }
            }))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let location = resp.headers().get(header::LOCATION).unwrap().to_str().unwrap().to_string();
        assert_eq!(location, "/api/playlists/1");

        let req = TestRequest::get()
            .uri("/api/playlists")
            .insert_header(bearer(&token))
            .to_request();
        let list: Value = read_body_json(call_service(&app, req).await).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["id"], 1);
        assert_eq!(list[0]["name"], "my test");

        let req = TestRequest::patch()
            .uri("/api/playlists/1/playlist")
            .insert_header(bearer(&token))
            .set_json(json!([{
                "op": "add",
                "path": "/playlist/entry/-",
                "value": {"identifier": ["cba"], "size": [456], "title": "second"}
            }]))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = TestRequest::get()
            .uri("/api/playlists/1/playlist")
            .insert_header(bearer(&token))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let doc: Value = read_body_json(resp).await;
        let entries = doc["playlist"]["entry"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1]["identifier"][0], "cba");

        // patching in nothing new is not a change
        let req = TestRequest::patch()
            .uri("/api/playlists/1/playlist")
            .insert_header(bearer(&token))
            .set_json(json!([]))
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

        let req = TestRequest::delete()
            .uri("/api/playlists/1")
            .insert_header(bearer(&token))
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

        let req = TestRequest::get()
            .uri("/api/playlists/1")
            .insert_header(bearer(&token))
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_track_activity_by_etag() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;
        let token = access_token(&state).await;

        let media = state.registry.get("test").await.unwrap();
        let track = Track {
            uuid: "0b7b1c1e-8e0c-4d0f-9a53-3c4a7e1f2d10".to_string(),
            artist: "Prince".to_string(),
            release: "Purple Rain".to_string(),
            title: "Purple Rain".to_string(),
            rid: "R".to_string(),
            reid: "RE".to_string(),
            key: "Prince/Purple Rain/09-Purple Rain.flac".to_string(),
            etag: "E".to_string(),
            ..Default::default()
        };
        TrackTable::insert(media.db(), &track).await.unwrap();

        let app = init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = TestRequest::post()
            .uri("/api/activity")
            .insert_header(bearer(&token))
            .set_json(json!({
                "events": [{"kind": "track", "etag": "E", "date": "2024-12-04T12:00:00Z"}]
            }))
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

        let req = TestRequest::get()
            .uri("/api/activity/tracks?start=2024-12-01&end=2024-12-31")
            .insert_header(bearer(&token))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let played: Value = read_body_json(resp).await;
        let played = played.as_array().unwrap();
        assert_eq!(played.len(), 1);
        assert_eq!(played[0]["item"]["rid"], "R");

        let req = TestRequest::get()
            .uri("/api/activity/tracks?start=2025-01-01&end=2025-01-31")
            .insert_header(bearer(&token))
            .to_request();
        let played: Value = read_body_json(call_service(&app, req).await).await;
        assert!(played.as_array().unwrap().is_empty());
    }
    #[actix_web::test]
    async fn test_refresh_token() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;
        let session = state.auth.login("alice", PASSWORD).await.unwrap();
        let app = init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = TestRequest::get()
            .uri("/api/token")
            .insert_header(bearer(&session.token))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let tokens: Value = read_body_json(resp).await;
        assert_eq!(tokens["RefreshToken"], session.token.as_str());
        let req = TestRequest::get()
            .uri("/api/playlists")
            .insert_header(bearer(tokens["AccessToken"].as_str().unwrap()))
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::OK);

        // an access token is not a refresh token
        let req = TestRequest::get()
            .uri("/api/token")
            .insert_header(bearer(tokens["AccessToken"].as_str().unwrap()))
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        // a session ending before a new access token would is not refreshed
        let soon = Utc::now() + Duration::hours(1);
        SessionTable::update_expires(&state.server, &session.token, soon).await.unwrap();
        let req = TestRequest::get()
            .uri("/api/token")
            .insert_header(bearer(&session.token))
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = TestRequest::get().uri("/api/token").to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_device_pairing() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;
        let app = init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = TestRequest::get().uri("/api/code").to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let pairing: Value = read_body_json(resp).await;
        let code = pairing["Code"].as_str().unwrap().to_string();
        let poll_token = pairing["AccessToken"].as_str().unwrap().to_string();
        assert_eq!(code.len(), crate::auth::CODE_LENGTH);

        // not linked yet
        let req = TestRequest::post()
            .uri("/api/code")
            .insert_header(bearer(&poll_token))
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = TestRequest::post()
            .uri("/api/link")
            .set_json(json!({"Code": code, "User": "alice", "Pass": "wrong password"}))
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = TestRequest::post()
            .uri("/api/link")
            .set_json(json!({"Code": code, "User": "alice", "Pass": PASSWORD}))
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

        let req = TestRequest::post()
            .uri("/api/code")
            .insert_header(bearer(&poll_token))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let tokens: Value = read_body_json(resp).await;
        let req = TestRequest::get()
            .uri("/api/playlists")
            .insert_header(bearer(tokens["AccessToken"].as_str().unwrap()))
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::OK);

        // a code links once
        let req = TestRequest::post()
            .uri("/api/link")
            .set_json(json!({"Code": code, "User": "alice", "Pass": PASSWORD}))
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = TestRequest::post().uri("/api/code").to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_cookie_session() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;
        let app = init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = TestRequest::post()
            .uri("/api/login")
            .set_json(json!({"User": "alice", "Pass": PASSWORD}))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == COOKIE_NAME)
            .unwrap();
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.http_only(), Some(true));
        let cookie = Cookie::new(COOKIE_NAME, cookie.value().to_string());

        let req = TestRequest::get()
            .uri("/api/playlists")
            .cookie(cookie.clone())
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::OK);

        let req = TestRequest::get()
            .uri("/api/playlists")
            .cookie(Cookie::new(COOKIE_NAME, "not-a-session"))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap().to_str().unwrap(), "/login");

        let req = TestRequest::get()
            .uri("/api/logout")
            .cookie(cookie.clone())
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let cleared = resp
            .response()
            .cookies()
            .find(|c| c.name() == COOKIE_NAME)
            .unwrap();
        assert_eq!(cleared.value(), "");

        // the session is gone with the logout
        let req = TestRequest::get()
            .uri("/api/playlists")
            .cookie(cookie)
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::FOUND);
    }
}
