//! Content client - reads documents from the content backend and writes comments
//!
//! Pages talk to the backend only through [`ContentSource`] and
//! [`CommentSink`], so the HTTP client and the in-memory dataset are
//! interchangeable.

mod endpoint;
mod memory;
mod sanity;

use async_trait::async_trait;

use crate::content::{Post, PostSummary, SlugEntry};
use crate::form::CommentInput;

pub use endpoint::EndpointSink;
pub use memory::MemoryBackend;
pub use sanity::{SanityClient, DETAIL_QUERY, LIST_QUERY, SLUGS_QUERY};

/// Errors from the content backend
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status code.
    #[error("backend error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The response body did not match the expected shape.
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A write was attempted without a configured API token.
    #[error("no API token configured for writes")]
    MissingToken,

    /// The backend refused to serve the request.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Read side of the content backend
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// All posts, list projection
    async fn list_posts(&self) -> Result<Vec<PostSummary>, ClientError>;

    /// One post with author and approved comments, `None` if no post has this slug
    async fn post_by_slug(&self, slug: &str) -> Result<Option<Post>, ClientError>;

    /// Every known slug, for pre-rendering
    async fn slugs(&self) -> Result<Vec<SlugEntry>, ClientError>;
}

/// Write side: creates unapproved comments
#[async_trait]
pub trait CommentSink: Send + Sync {
    async fn create_comment(&self, input: &CommentInput) -> Result<(), ClientError>;
}
