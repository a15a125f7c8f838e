//! Integration tests for comment submission: the post page form and the
//! `/api/createComment` endpoint.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use common::{backend, get, post_form, post_json, test_app};
use sanity_blog::client::{ClientError, CommentSink, EndpointSink};
use sanity_blog::form::CommentInput;
use sanity_blog::server;

const THANK_YOU: &str = "Thank you for submitting your comment!";
const FORM_TAG: &str = r#"<form class="comment-form""#;

// ---------------------------------------------------------------------------
// Post page form
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_fields_block_submission() {
    let backend = backend();
    let app = test_app(backend.clone());

    let (status, html) = post_form(&app, "/post/hello", "_id=p1&name=&email=ada%40example.com&comment=").await;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("The name field is required"));
    assert!(html.contains("The comment field is required"));
    assert!(!html.contains("The email field is required"));
    // Typed input is kept
    assert!(html.contains(r#"value="ada@example.com""#));
    assert!(html.contains(FORM_TAG));
    assert_eq!(backend.comment_requests(), 0);
}

#[tokio::test]
async fn valid_submission_sends_once_and_thanks() {
    let backend = backend();
    let app = test_app(backend.clone());

    let (status, html) = post_form(
        &app,
        "/post/hello",
        "_id=p1&name=Bob&email=bob%40example.com&comment=Great+post",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(THANK_YOU));
    assert!(html.contains("once its been approved, it will show below!"));
    assert!(!html.contains(FORM_TAG));
    assert_eq!(backend.comment_requests(), 1);

    let stored = backend.comments_for("p1");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].name, "Bob");
    assert_eq!(stored[0].email, "bob@example.com");
    assert!(!stored[0].approved);
}

#[tokio::test]
async fn post_id_comes_from_the_page_not_the_form() {
    let backend = backend();
    let app = test_app(backend.clone());

    post_form(
        &app,
        "/post/second",
        "_id=p1&name=Bob&email=bob%40example.com&comment=Hi",
    )
    .await;

    assert!(backend.comments_for("p1").is_empty());
    assert_eq!(backend.comments_for("p2").len(), 1);
}

#[tokio::test]
async fn unapproved_comment_stays_hidden_until_approved() {
    let backend = backend();
    let app = test_app(backend.clone());

    post_form(
        &app,
        "/post/hello",
        "name=Bob&email=bob%40example.com&comment=Pending+moderation",
    )
    .await;

    let (_, html) = get(&app, "/post/hello").await;
    assert!(!html.contains("Pending moderation"));

    let id = backend.comments_for("p1")[0].id.clone();
    assert!(backend.approve(&id));

    // A fresh render picks the approved comment up
    let app = test_app(backend.clone());
    let (_, html) = get(&app, "/post/hello").await;
    assert!(html.contains("Pending moderation"));
    assert!(html.contains(r#"<span class="comment-author">Bob: </span>"#));
    assert!(!html.contains("bob@example.com"));
}

#[tokio::test]
async fn failed_submission_keeps_form_and_input() {
    let backend = backend();
    let app = test_app(backend.clone());

    // Cache the page first, then take the backend down
    get(&app, "/post/hello").await;
    backend.set_offline(true);

    let (status, html) = post_form(
        &app,
        "/post/hello",
        "name=Bob&email=bob%40example.com&comment=Lost%3F",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Your comment could not be submitted"));
    assert!(html.contains(FORM_TAG));
    assert!(html.contains(r#"value="Bob""#));
    assert!(html.contains(">Lost?</textarea>"));
    assert!(!html.contains(THANK_YOU));
    assert_eq!(backend.comment_requests(), 1);
}

#[tokio::test]
async fn submitting_to_unknown_post_is_not_found() {
    let backend = backend();
    let app = test_app(backend.clone());

    let (status, _) = post_form(
        &app,
        "/post/nope",
        "name=Bob&email=bob%40example.com&comment=Hi",
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(backend.comment_requests(), 0);
}

// ---------------------------------------------------------------------------
// /api/createComment
// ---------------------------------------------------------------------------

#[tokio::test]
async fn api_creates_unapproved_comment() {
    let backend = backend();
    let app = test_app(backend.clone());

    let (status, json) = post_json(
        &app,
        "/api/createComment",
        serde_json::json!({ "_id": "p2", "name": "Eve", "email": "eve@example.com", "comment": "Hi" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Comment submitted");
    let stored = backend.comments_for("p2");
    assert_eq!(stored.len(), 1);
    assert!(!stored[0].approved);
}

#[tokio::test]
async fn api_rejects_missing_fields() {
    let backend = backend();
    let app = test_app(backend.clone());

    let (status, json) = post_json(
        &app,
        "/api/createComment",
        serde_json::json!({ "_id": "p2", "name": "Eve" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json["errors"],
        serde_json::json!(["The email field is required", "The comment field is required"])
    );
    assert_eq!(backend.comment_requests(), 0);
}

#[tokio::test]
async fn api_reports_backend_failure() {
    let backend = backend();
    backend.set_offline(true);
    let app = test_app(backend);

    let (status, json) = post_json(
        &app,
        "/api/createComment",
        serde_json::json!({ "_id": "p1", "name": "Eve", "email": "e@x.io", "comment": "Hi" }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["message"], "Couldn't submit comment");
}

// ---------------------------------------------------------------------------
// EndpointSink against a live server
// ---------------------------------------------------------------------------

#[tokio::test]
async fn endpoint_sink_posts_to_create_comment_route() {
    let backend = backend();
    let app = server::router(common::test_state(backend.clone()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let sink = EndpointSink::new(
        format!("http://{}/api/createComment", addr),
        Duration::from_secs(5),
    )
    .unwrap();
    let sink: Arc<dyn CommentSink> = Arc::new(sink);

    let input = CommentInput {
        post_id: "p1".to_string(),
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
        comment: "Over the wire".to_string(),
    };
    sink.create_comment(&input).await.unwrap();
    assert_eq!(backend.comments_for("p1")[0].comment, "Over the wire");

    let orphan = CommentInput {
        post_id: "missing".to_string(),
        ..input
    };
    let err = sink.create_comment(&orphan).await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 500, .. }));
}
