//! Shared fixtures for router-level tests.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::auth::password::hash_password_with_cost;
use crate::auth::session::SESSION_COOKIE;
use crate::config::Config;
use crate::db::memory::MemoryStore;
use crate::db::Store;
use crate::{create_app, AppState};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "correct-horse-battery";

pub struct TestContext {
    pub state: AppState,
    pub upload_dir: TempDir,
    pub static_dir: TempDir,
}

pub async fn test_context() -> TestContext {
    let upload_dir = tempfile::tempdir().unwrap();
    let static_dir = tempfile::tempdir().unwrap();
    let uploads = upload_dir.path().to_string_lossy().to_string();
    let statics = static_dir.path().to_string_lossy().to_string();

    let config = Config::from_lookup(|name| match name {
        "SESSION_SECRET" => Some("test-session-secret".to_string()),
        "DATABASE_URL" => Some("memory://".to_string()),
        "UPLOAD_DIR" => Some(uploads.clone()),
        "STATIC_DIR" => Some(statics.clone()),
        _ => None,
    })
    .unwrap();

    let store = MemoryStore::new();
    let hash = hash_password_with_cost(ADMIN_PASSWORD.to_string(), 4)
        .await
        .unwrap();
    store.users().create(ADMIN_USERNAME, &hash).await.unwrap();

    let state = AppState::new(config, Arc::new(store)).unwrap();
    TestContext {
        state,
        upload_dir,
        static_dir,
    }
}

pub async fn test_app() -> (Router, TestContext) {
    let ctx = test_context().await;
    (create_app(ctx.state.clone()), ctx)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::HOST, "localhost")
        .body(Body::empty())
        .unwrap()
}

pub fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::HOST, "localhost")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

pub fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(uri)
        .header(header::HOST, "localhost")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_string(res: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn location(res: &Response<Body>) -> String {
    res.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// `name=value` pair of the named cookie set by `res`.
pub fn set_cookie(res: &Response<Body>, name: &str) -> Option<String> {
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with(&format!("{name}=")))
        .map(str::to_string)
}

/// Log in as the fixture admin and return the session cookie pair.
pub async fn login(app: &Router) -> String {
    let body = format!("username={ADMIN_USERNAME}&password={ADMIN_PASSWORD}");
    let res = app
        .clone()
        .oneshot(post_form("/admin/login", &body, None))
        .await
        .unwrap();
    set_cookie(&res, SESSION_COOKIE).expect("login should set a session cookie")
}
