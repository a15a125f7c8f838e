//! Integration tests for the list and post pages.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{backend, get, post, settle, test_app, test_state};
use sanity_blog::client::{ContentSource, MemoryBackend};
use sanity_blog::server;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// List page
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_page_renders_one_card_per_post() {
    let app = test_app(backend());
    let (status, html) = get(&app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(html.matches(r#"class="card""#).count(), 2);
    assert!(html.contains(r#"href="/post/hello""#));
    assert!(html.contains(r#"href="/post/second""#));
    assert!(html.contains("About Hello World by Ada Lovelace"));
    assert!(html.contains("is place to write, read &amp; connect."));
}

#[tokio::test]
async fn list_page_with_no_posts_is_empty_grid() {
    let app = test_app(Arc::new(MemoryBackend::new()));
    let (status, html) = get(&app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(html.matches(r#"class="card""#).count(), 0);
    assert!(html.contains(r#"<div class="grid">"#));
}

#[tokio::test]
async fn list_page_is_fetched_fresh_every_request() {
    let backend = backend();
    let app = test_app(backend.clone());
    get(&app, "/").await;

    backend.upsert_post(post("p3", "third", "Third Post"));
    let (_, html) = get(&app, "/").await;
    assert_eq!(html.matches(r#"class="card""#).count(), 3);
}

#[tokio::test]
async fn list_page_escapes_backend_text() {
    let backend = Arc::new(MemoryBackend::from_posts(vec![post(
        "p1",
        "x",
        "<script>alert(1)</script>",
    )]));
    let app = test_app(backend);
    let (_, html) = get(&app, "/").await;

    assert!(!html.contains("<script>alert(1)</script>"));
    assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
}

#[tokio::test]
async fn backend_failure_renders_error_page() {
    let backend = backend();
    backend.set_offline(true);
    let app = test_app(backend);

    let (status, html) = get(&app, "/").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(html.contains("Something went wrong"));

    let (status, _) = get(&app, "/post/hello").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

// ---------------------------------------------------------------------------
// Post pages
// ---------------------------------------------------------------------------

#[tokio::test]
async fn every_enumerated_slug_renders_its_post() {
    let backend = backend();
    let app = test_app(backend.clone());

    for entry in backend.slugs().await.unwrap() {
        let (status, html) = get(&app, &format!("/post/{}", entry.slug.current)).await;
        assert_eq!(status, StatusCode::OK);
        let expected = if entry.id == "p1" {
            "Hello World"
        } else {
            "Second Post"
        };
        assert!(html.contains(&format!(r#"<h1 class="post-title">{}</h1>"#, expected)));
    }
}

#[tokio::test]
async fn post_page_shows_article_and_form() {
    let app = test_app(backend());
    let (status, html) = get(&app, "/post/hello").await;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("<title>Hello World | Test Blog</title>"));
    assert!(html.contains("<p>Body of Hello World</p>"));
    assert!(html.contains("Blog post by <span class=\"author\">Ada Lovelace</span>"));
    assert!(html.contains("Leave a comment below!"));
    assert!(html.contains(r#"<form class="comment-form" method="post" action="/post/hello">"#));
}

#[tokio::test]
async fn unknown_slug_is_not_found() {
    let app = test_app(backend());

    let (status, html) = get(&app, "/post/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(html.contains("This page could not be found."));

    let (status, _) = get(&app, "/no/such/route").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn prerender_fills_cache_for_known_slugs() {
    let backend = backend();
    let state = test_state(backend.clone());

    assert_eq!(server::prerender(&state).await, 2);
    assert_eq!(state.pages.len(), 2);
    let fetches = backend.post_requests();

    let app = server::router(state);
    let (status, html) = get(&app, "/post/second").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Second Post"));
    assert_eq!(backend.post_requests(), fetches);
}

#[tokio::test]
async fn prerender_tolerates_backend_failure() {
    let backend = backend();
    backend.set_offline(true);
    let state = test_state(backend.clone());
    assert_eq!(server::prerender(&state).await, 0);

    // Pages render on demand once the backend is back
    backend.set_offline(false);
    let app = server::router(state);
    let (status, _) = get(&app, "/post/hello").await;
    assert_eq!(status, StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Stale-while-revalidate
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn stale_page_is_served_then_refreshed() {
    let backend = backend();
    let app = test_app(backend.clone());

    let (_, html) = get(&app, "/post/hello").await;
    assert!(html.contains("Hello World"));

    backend.upsert_post(post("p1", "hello", "Hello Again"));

    // Still fresh: no refetch, old content
    let (_, html) = get(&app, "/post/hello").await;
    assert!(html.contains("Hello World"));

    tokio::time::advance(Duration::from_secs(601)).await;

    // Stale: served immediately from cache while regenerating
    let (status, html) = get(&app, "/post/hello").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Hello World"));

    settle().await;
    let (_, html) = get(&app, "/post/hello").await;
    assert!(html.contains("Hello Again"));
    assert!(!html.contains("Hello World"));
}

#[tokio::test(start_paused = true)]
async fn stale_page_survives_backend_outage() {
    let backend = backend();
    let app = test_app(backend.clone());
    get(&app, "/post/hello").await;

    backend.set_offline(true);
    tokio::time::advance(Duration::from_secs(601)).await;

    let (status, html) = get(&app, "/post/hello").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Hello World"));

    settle().await;
    let (status, html) = get(&app, "/post/hello").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Hello World"));
}

#[tokio::test(start_paused = true)]
async fn deleted_post_becomes_not_found_after_refresh() {
    let backend = backend();
    let app = test_app(backend.clone());
    get(&app, "/post/second").await;

    backend.remove_post("second");
    tokio::time::advance(Duration::from_secs(601)).await;

    let (status, _) = get(&app, "/post/second").await;
    assert_eq!(status, StatusCode::OK);

    settle().await;
    let (status, _) = get(&app, "/post/second").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
