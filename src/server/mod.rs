//! HTTP server: list page, post pages and comment submission

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::cache::PageCache;
use crate::client::{ClientError, CommentSink, ContentSource};
use crate::content::Post;
use crate::form::{CommentForm, CommentSubmission};
use crate::generator::PageRenderer;
use crate::Blog;

/// Why a page could not be produced
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("page not found")]
    NotFound,

    #[error(transparent)]
    Fetch(#[from] ClientError),

    #[error("template rendering failed: {0}")]
    Render(#[from] tera::Error),
}

/// A rendered post page as kept in the page cache
#[derive(Debug, Clone)]
pub struct PostPage {
    pub post: Post,
    /// Page HTML with an empty comment form
    pub html: String,
}

/// Shared server state
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn ContentSource>,
    /// Writes comments to the backend (`/api/createComment`)
    pub sink: Arc<dyn CommentSink>,
    /// Where the post page's form sends comments
    pub form_sink: Arc<dyn CommentSink>,
    pub renderer: Arc<PageRenderer>,
    pub pages: PageCache<PostPage>,
    pub comment_timeout: Duration,
    pub static_dir: std::path::PathBuf,
}

impl AppState {
    pub fn new(blog: &Blog) -> Result<Self> {
        Ok(Self {
            source: Arc::clone(&blog.source),
            sink: Arc::clone(&blog.sink),
            form_sink: blog.form_sink()?,
            renderer: Arc::new(PageRenderer::new(&blog.config)?),
            pages: PageCache::new(blog.config.freshness()),
            comment_timeout: blog.config.comments.timeout(),
            static_dir: blog.static_dir.clone(),
        })
    }

    /// Turn a page result into a response, rendering status pages for errors
    fn respond(&self, result: Result<String, PageError>) -> Response {
        match result {
            Ok(html) => Html(html).into_response(),
            Err(PageError::NotFound) => {
                let html = self
                    .renderer
                    .not_found_page()
                    .unwrap_or_else(|_| "Not found".to_string());
                (StatusCode::NOT_FOUND, Html(html)).into_response()
            }
            Err(e) => {
                tracing::error!("Page generation failed: {}", e);
                let html = self
                    .renderer
                    .error_page()
                    .unwrap_or_else(|_| "Server error".to_string());
                (StatusCode::INTERNAL_SERVER_ERROR, Html(html)).into_response()
            }
        }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let static_dir = state.static_dir.clone();

    Router::new()
        .route("/", get(index_handler))
        .route("/post/:slug", get(post_handler).post(submit_form_handler))
        .route("/api/createComment", post(create_comment_handler))
        .nest_service("/static", ServeDir::new(&static_dir))
        .route_service("/favicon.ico", ServeFile::new(static_dir.join("favicon.ico")))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server
pub async fn start(blog: &Blog, ip: &str, port: u16, prerender_pages: bool) -> Result<()> {
    let state = AppState::new(blog)?;

    if prerender_pages {
        prerender(&state).await;
    }

    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Render every known post into the page cache.
///
/// Failures are logged and skipped; those pages render on first request.
pub async fn prerender(state: &AppState) -> usize {
    let slugs = match state.source.slugs().await {
        Ok(slugs) => slugs,
        Err(e) => {
            tracing::warn!("Could not enumerate posts, pages will render on demand: {}", e);
            return 0;
        }
    };

    let mut count = 0;
    for entry in slugs {
        let slug = entry.slug.current;
        let rendered = render_post_page(
            Arc::clone(&state.source),
            Arc::clone(&state.renderer),
            state.comment_timeout,
            slug.clone(),
        )
        .await;

        match rendered {
            Ok(Some(page)) => {
                state.pages.insert(&slug, page);
                count += 1;
            }
            Ok(None) => tracing::debug!("Post vanished before pre-rendering: {}", slug),
            Err(e) => tracing::warn!("Failed to pre-render {}: {}", slug, e),
        }
    }

    tracing::info!("Pre-rendered {} post pages", count);
    count
}

/// Fetch one post and render its idle page
async fn render_post_page(
    source: Arc<dyn ContentSource>,
    renderer: Arc<PageRenderer>,
    comment_timeout: Duration,
    slug: String,
) -> Result<Option<PostPage>, PageError> {
    let Some(post) = source.post_by_slug(&slug).await? else {
        return Ok(None);
    };
    let submission = CommentSubmission::new(post.id.clone(), comment_timeout);
    let html = renderer.post_page(&post, &submission)?;
    Ok(Some(PostPage { post, html }))
}

/// Cached post page, rendering or regenerating it as needed
async fn load_post(state: &AppState, slug: &str) -> Result<Arc<PostPage>, PageError> {
    let source = Arc::clone(&state.source);
    let renderer = Arc::clone(&state.renderer);
    let timeout = state.comment_timeout;

    state
        .pages
        .get_or_render(slug, move |slug| {
            render_post_page(source, renderer, timeout, slug)
        })
        .await?
        .ok_or(PageError::NotFound)
}

async fn index_page(state: &AppState) -> Result<String, PageError> {
    let posts = state.source.list_posts().await?;
    Ok(state.renderer.list_page(&posts)?)
}

async fn index_handler(State(state): State<AppState>) -> Response {
    let result = index_page(&state).await;
    state.respond(result)
}

async fn post_handler(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    let result = load_post(&state, &slug).await.map(|page| page.html.clone());
    state.respond(result)
}

async fn submit_form(
    state: &AppState,
    slug: &str,
    form: CommentForm,
) -> Result<String, PageError> {
    let page = load_post(state, slug).await?;
    let mut submission = CommentSubmission::new(page.post.id.clone(), state.comment_timeout);
    submission.submit(form, state.form_sink.as_ref()).await;
    Ok(state.renderer.post_page(&page.post, &submission)?)
}

async fn submit_form_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Form(form): Form<CommentForm>,
) -> Response {
    let result = submit_form(&state, &slug, form).await;
    state.respond(result)
}

/// `POST /api/createComment` with `{ _id, name, email, comment }`.
///
/// The body is read as JSON whatever its content type.
async fn create_comment_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let form: CommentForm = match serde_json::from_slice(&body) {
        Ok(form) => form,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "message": "Invalid request body", "error": e.to_string() })),
            )
                .into_response();
        }
    };

    let input = match form.validate() {
        Ok(input) => input,
        Err(missing) => {
            let errors: Vec<&str> = missing.iter().map(|f| f.message()).collect();
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "message": "Missing required fields", "errors": errors })),
            )
                .into_response();
        }
    };

    let outcome = tokio::time::timeout(state.comment_timeout, state.sink.create_comment(&input)).await;
    let error = match outcome {
        Ok(Ok(())) => {
            return (
                StatusCode::OK,
                Json(serde_json::json!({ "message": "Comment submitted" })),
            )
                .into_response();
        }
        Ok(Err(e)) => e.to_string(),
        Err(_) => format!("timed out after {}s", state.comment_timeout.as_secs()),
    };

    tracing::error!(post = %input.post_id, "Couldn't submit comment: {}", error);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "message": "Couldn't submit comment", "error": error })),
    )
        .into_response()
}

async fn fallback_handler(State(state): State<AppState>) -> Response {
    state.respond(Err(PageError::NotFound))
}
