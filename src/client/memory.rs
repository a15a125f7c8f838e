//! In-process content backend
//!
//! Holds posts and comments in memory, optionally loaded from a JSON fixture
//! file. Used for offline development (`--fixture`) and in tests. It applies
//! the same visibility rule as the detail query: only approved comments are
//! returned with a post.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use super::{ClientError, CommentSink, ContentSource};
use crate::content::{Comment, Post, PostSummary, SlugEntry};
use crate::form::CommentInput;

/// Reference from a comment to its post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRef {
    #[serde(rename = "_ref")]
    pub id: String,
}

/// A comment as stored by the backend, including the write-only email
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredComment {
    #[serde(rename = "_id")]
    pub id: String,
    pub post: PostRef,
    pub name: String,
    pub email: String,
    pub comment: String,
    #[serde(default)]
    pub approved: bool,
}

/// Fixture file layout
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub posts: Vec<Post>,
    #[serde(default)]
    pub comments: Vec<StoredComment>,
}

/// In-memory implementation of [`ContentSource`] and [`CommentSink`]
#[derive(Default)]
pub struct MemoryBackend {
    data: RwLock<Dataset>,
    offline: AtomicBool,
    next_comment: AtomicU64,
    comment_requests: AtomicUsize,
    post_requests: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_posts(posts: Vec<Post>) -> Self {
        Self::from_dataset(Dataset {
            posts,
            comments: Vec::new(),
        })
    }

    pub fn from_dataset(dataset: Dataset) -> Self {
        Self {
            data: RwLock::new(dataset),
            ..Default::default()
        }
    }

    /// Load a dataset from a JSON fixture file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let dataset: Dataset = serde_json::from_str(&content)?;
        tracing::info!(
            "Loaded fixture {:?}: {} posts, {} comments",
            path.as_ref(),
            dataset.posts.len(),
            dataset.comments.len()
        );
        Ok(Self::from_dataset(dataset))
    }

    /// Insert a post, replacing any post with the same slug
    pub fn upsert_post(&self, post: Post) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.posts.retain(|p| p.slug != post.slug);
        data.posts.push(post);
    }

    /// Remove the post with this slug
    pub fn remove_post(&self, slug: &str) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.posts.retain(|p| p.slug.current != slug);
    }

    /// Mark a comment approved, returning whether it exists
    pub fn approve(&self, comment_id: &str) -> bool {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        match data.comments.iter_mut().find(|c| c.id == comment_id) {
            Some(comment) => {
                comment.approved = true;
                true
            }
            None => false,
        }
    }

    /// Every stored comment for a post, approved or not
    pub fn comments_for(&self, post_id: &str) -> Vec<StoredComment> {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        data.comments
            .iter()
            .filter(|c| c.post.id == post_id)
            .cloned()
            .collect()
    }

    /// Make every request fail with [`ClientError::Unavailable`]
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of comment writes received, successful or not
    pub fn comment_requests(&self) -> usize {
        self.comment_requests.load(Ordering::SeqCst)
    }

    /// Number of single-post fetches received
    pub fn post_requests(&self) -> usize {
        self.post_requests.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<(), ClientError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ClientError::Unavailable("backend is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentSource for MemoryBackend {
    async fn list_posts(&self) -> Result<Vec<PostSummary>, ClientError> {
        self.check_online()?;
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        Ok(data
            .posts
            .iter()
            .map(|p| PostSummary {
                id: p.id.clone(),
                title: p.title.clone(),
                author: p.author.clone(),
                description: p.description.clone(),
                main_image: p.main_image.clone(),
                slug: p.slug.clone(),
            })
            .collect())
    }

    async fn post_by_slug(&self, slug: &str) -> Result<Option<Post>, ClientError> {
        self.post_requests.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        let Some(post) = data.posts.iter().find(|p| p.slug.current == slug) else {
            return Ok(None);
        };

        let mut post = post.clone();
        post.comments = data
            .comments
            .iter()
            .filter(|c| c.post.id == post.id && c.approved)
            .map(|c| Comment {
                id: c.id.clone(),
                name: c.name.clone(),
                comment: c.comment.clone(),
                approved: c.approved,
            })
            .collect();
        Ok(Some(post))
    }

    async fn slugs(&self) -> Result<Vec<SlugEntry>, ClientError> {
        self.check_online()?;
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        Ok(data
            .posts
            .iter()
            .map(|p| SlugEntry {
                id: p.id.clone(),
                slug: p.slug.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl CommentSink for MemoryBackend {
    async fn create_comment(&self, input: &CommentInput) -> Result<(), ClientError> {
        self.comment_requests.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;

        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        if !data.posts.iter().any(|p| p.id == input.post_id) {
            return Err(ClientError::Api {
                status: 400,
                body: format!("reference to missing document {}", input.post_id),
            });
        }

        let id = format!(
            "comment-{}",
            self.next_comment.fetch_add(1, Ordering::SeqCst) + 1
        );
        tracing::debug!(post = %input.post_id, comment = %id, "Stored unapproved comment");
        data.comments.push(StoredComment {
            id,
            post: PostRef {
                id: input.post_id.clone(),
            },
            name: input.name.clone(),
            email: input.email.clone(),
            comment: input.comment.clone(),
            approved: false,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Slug;
    use chrono::TimeZone;

    fn post(id: &str, slug: &str) -> Post {
        Post {
            id: id.to_string(),
            created_at: chrono::Utc.with_ymd_and_hms(2022, 1, 2, 3, 4, 5).unwrap(),
            title: format!("Title {}", id),
            author: None,
            comments: Vec::new(),
            description: None,
            main_image: None,
            slug: Slug::new(slug),
            body: Vec::new(),
        }
    }

    fn input(post_id: &str) -> CommentInput {
        CommentInput {
            post_id: post_id.to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            comment: "Hello".to_string(),
        }
    }

    #[tokio::test]
    async fn test_comments_hidden_until_approved() {
        let backend = MemoryBackend::from_posts(vec![post("p1", "one")]);
        backend.create_comment(&input("p1")).await.unwrap();

        let stored = backend.comments_for("p1");
        assert_eq!(stored.len(), 1);
        assert!(!stored[0].approved);

        let fetched = backend.post_by_slug("one").await.unwrap().unwrap();
        assert!(fetched.comments.is_empty());

        assert!(backend.approve(&stored[0].id));
        let fetched = backend.post_by_slug("one").await.unwrap().unwrap();
        assert_eq!(fetched.comments.len(), 1);
        assert_eq!(fetched.comments[0].name, "Ada");
    }

    #[tokio::test]
    async fn test_missing_post_and_offline() {
        let backend = MemoryBackend::from_posts(vec![post("p1", "one")]);
        assert!(backend.post_by_slug("nope").await.unwrap().is_none());
        assert!(matches!(
            backend.create_comment(&input("ghost")).await,
            Err(ClientError::Api { status: 400, .. })
        ));

        backend.set_offline(true);
        assert!(matches!(
            backend.list_posts().await,
            Err(ClientError::Unavailable(_))
        ));
        assert_eq!(backend.comment_requests(), 1);
    }

    #[tokio::test]
    async fn test_upsert_and_remove() {
        let backend = MemoryBackend::new();
        backend.upsert_post(post("p1", "one"));
        let mut updated = post("p1", "one");
        updated.title = "Updated".to_string();
        backend.upsert_post(updated);

        let slugs = backend.slugs().await.unwrap();
        assert_eq!(slugs.len(), 1);
        assert_eq!(backend.list_posts().await.unwrap()[0].title, "Updated");

        backend.remove_post("one");
        assert!(backend.list_posts().await.unwrap().is_empty());
    }

    #[test]
    fn test_load_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.json");
        fs::write(
            &path,
            r#"{
                "posts": [{ "_id": "p1", "_createdAt": "2022-01-01T00:00:00Z", "title": "T", "slug": { "current": "t" } }],
                "comments": [{ "_id": "c1", "post": { "_ref": "p1" }, "name": "N", "email": "e", "comment": "C", "approved": true }]
            }"#,
        )
        .unwrap();

        let backend = MemoryBackend::load(&path).unwrap();
        assert_eq!(backend.comments_for("p1").len(), 1);
    }
}
