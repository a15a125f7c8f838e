//! Shared helpers for the HTTP integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::TimeZone;
use http_body_util::BodyExt;
use tower::ServiceExt;

use sanity_blog::client::MemoryBackend;
use sanity_blog::config::SiteConfig;
use sanity_blog::content::{Author, Post, Slug};
use sanity_blog::server::{self, AppState};
use sanity_blog::Blog;

/// A post with a one-paragraph body
pub fn post(id: &str, slug: &str, title: &str) -> Post {
    Post {
        id: id.to_string(),
        created_at: chrono::Utc.with_ymd_and_hms(2022, 3, 1, 9, 0, 0).unwrap(),
        title: title.to_string(),
        author: Some(Author {
            name: "Ada Lovelace".to_string(),
            image: None,
        }),
        comments: Vec::new(),
        description: Some(format!("About {}", title)),
        main_image: None,
        slug: Slug::new(slug),
        body: serde_json::from_value(serde_json::json!([
            { "_type": "block", "children": [{ "_type": "span", "text": format!("Body of {}", title) }] }
        ]))
        .unwrap(),
    }
}

/// Backend holding two posts: `hello` (p1) and `second` (p2)
pub fn backend() -> Arc<MemoryBackend> {
    Arc::new(MemoryBackend::from_posts(vec![
        post("p1", "hello", "Hello World"),
        post("p2", "second", "Second Post"),
    ]))
}

pub fn test_config() -> SiteConfig {
    let mut config = SiteConfig::default();
    config.title = "Test Blog".to_string();
    config.backend.project_id = "proj".to_string();
    config
}

/// Application state wired to an in-memory backend
pub fn test_state(backend: Arc<MemoryBackend>) -> AppState {
    let blog = Blog::with_backend(
        PathBuf::from("."),
        test_config(),
        backend.clone(),
        backend,
    );
    AppState::new(&blog).unwrap()
}

pub fn test_app(backend: Arc<MemoryBackend>) -> Router {
    server::router(test_state(backend))
}

pub async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_string(response).await)
}

pub async fn post_form(app: &Router, uri: &str, body: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_string(response).await)
}

/// POST a JSON body without a content type, the way a bare `fetch` does
pub async fn post_json(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let text = body_string(response).await;
    (status, serde_json::from_str(&text).unwrap())
}

/// Let spawned background tasks run
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
