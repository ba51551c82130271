#![allow(dead_code)]

use std::net::SocketAddr;

use agora::auth::CookieJar;
use agora::config::Config;
use agora::state::{AppState, DbPool};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

pub const GOOD_TOKEN: &str = "tok-a";

/// Serve `app` on an ephemeral port and return its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock API");
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn state_with_pool(base_url: &str, pool: DbPool) -> AppState {
    let mut config = Config::default();
    config.api.base_url = base_url.to_string();
    config.api.timeout_secs = 5;
    AppState::build(config, pool).expect("Failed to build state")
}

pub fn fresh_state(base_url: &str) -> AppState {
    state_with_pool(base_url, agora::db::memory_pool().unwrap())
}

/// A state whose stored access token is accepted by [`current_user`].
pub async fn signed_in_state(base_url: &str) -> AppState {
    let pool = agora::db::memory_pool().unwrap();
    CookieJar::new(pool.clone())
        .set_hours("access_token", GOOD_TOKEN, 24)
        .unwrap();
    let state = state_with_pool(base_url, pool);
    state.sessions().init().await;
    assert!(state.session.is_authenticated());
    state
}

pub fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

pub async fn current_user(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if bearer(&headers) == Some(GOOD_TOKEN) {
        (
            StatusCode::OK,
            Json(json!({ "user": { "id": 1, "username": "ana", "email": "a@b.com" } })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Token is invalid or expired" })),
        )
    }
}

/// Adds `GET /api/v1/auth/user/` to a mock router.
pub fn with_auth(app: Router) -> Router {
    app.route("/api/v1/auth/user/", get(current_user))
}
