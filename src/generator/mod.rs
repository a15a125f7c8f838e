//! Page generation - turns backend documents into HTML pages
//!
//! [`PageRenderer`] builds the template context for each page kind.
//! [`Generator`] uses it to export the whole site as static files.

use anyhow::Result;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tera::Context;

use crate::client::ContentSource;
use crate::config::SiteConfig;
use crate::content::{BodyRenderer, Post, PostSummary};
use crate::form::{CommentSubmission, SubmissionState};
use crate::helpers::ImageResolver;
use crate::templates::{CardData, CommentData, FormData, PostData, SiteData, TemplateRenderer};

/// Path of a post's detail page
pub fn post_path(slug: &str) -> String {
    format!("/post/{}", slug)
}

/// Renders the list, detail and status pages
pub struct PageRenderer {
    templates: TemplateRenderer,
    images: ImageResolver,
    body: BodyRenderer,
    site: SiteData,
}

impl PageRenderer {
    pub fn new(config: &SiteConfig) -> tera::Result<Self> {
        let images = ImageResolver::new(&config.backend);
        Ok(Self {
            templates: TemplateRenderer::new()?,
            body: BodyRenderer::new(images.clone()),
            images,
            site: SiteData {
                title: config.title.clone(),
                description: config.description.clone(),
            },
        })
    }

    /// Home page: one card per post
    pub fn list_page(&self, posts: &[PostSummary]) -> tera::Result<String> {
        let cards: Vec<CardData> = posts
            .iter()
            .map(|p| CardData {
                title: p.title.clone(),
                description: p.description.clone().unwrap_or_default(),
                author_name: p.author_name().to_string(),
                author_image: self
                    .images
                    .url_or_empty(p.author.as_ref().and_then(|a| a.image.as_ref())),
                main_image: self.images.url_or_empty(p.main_image.as_ref()),
                path: post_path(&p.slug.current),
            })
            .collect();

        let mut context = Context::new();
        context.insert("site", &self.site);
        context.insert("cards", &cards);
        self.templates.render("index.html", &context)
    }

    /// Detail page with the comment form drawn for `submission`'s state
    pub fn post_page(&self, post: &Post, submission: &CommentSubmission) -> tera::Result<String> {
        let draft = submission.draft();
        let form = FormData {
            action: post_path(&post.slug.current),
            submitted: submission.is_submitted(),
            failure: match submission.state() {
                SubmissionState::Failed(reason) => Some(reason.clone()),
                _ => None,
            },
            name: draft.name.clone(),
            email: draft.email.clone(),
            comment: draft.comment.clone(),
            errors: submission.errors().iter().map(|f| f.message()).collect(),
        };

        let mut context = Context::new();
        context.insert("site", &self.site);
        context.insert("post", &self.post_data(post));
        context.insert("form", &form);
        self.templates.render("post.html", &context)
    }

    pub fn not_found_page(&self) -> tera::Result<String> {
        let mut context = Context::new();
        context.insert("site", &self.site);
        self.templates.render("not_found.html", &context)
    }

    pub fn error_page(&self) -> tera::Result<String> {
        let mut context = Context::new();
        context.insert("site", &self.site);
        self.templates.render("error.html", &context)
    }

    fn post_data(&self, post: &Post) -> PostData {
        PostData {
            id: post.id.clone(),
            title: post.title.clone(),
            description: post.description.clone().unwrap_or_default(),
            author_name: post.author_name().to_string(),
            author_image: self
                .images
                .url_or_empty(post.author.as_ref().and_then(|a| a.image.as_ref())),
            main_image: self.images.url_or_empty(post.main_image.as_ref()),
            created_at: post.created_at.to_rfc3339(),
            body: self.body.render(&post.body),
            comments: post
                .approved_comments()
                .map(|c| CommentData {
                    name: c.name.clone(),
                    comment: c.comment.clone(),
                })
                .collect(),
            path: post_path(&post.slug.current),
        }
    }
}

/// Static site exporter
pub struct Generator {
    source: Arc<dyn ContentSource>,
    renderer: Arc<PageRenderer>,
    comment_timeout: std::time::Duration,
}

impl Generator {
    pub fn new(
        source: Arc<dyn ContentSource>,
        renderer: Arc<PageRenderer>,
        config: &SiteConfig,
    ) -> Self {
        Self {
            source,
            renderer,
            comment_timeout: config.comments.timeout(),
        }
    }

    /// Write `index.html` and `post/{slug}/index.html` for every post.
    ///
    /// Returns the number of post pages written.
    pub async fn generate(&self, public_dir: &Path) -> Result<usize> {
        fs::create_dir_all(public_dir)?;

        let posts = self.source.list_posts().await?;
        let index = self.renderer.list_page(&posts)?;
        fs::write(public_dir.join("index.html"), index)?;
        tracing::debug!("Generated index with {} posts", posts.len());

        let slugs = self.source.slugs().await?;
        let mut written = 0;
        for entry in slugs {
            let slug = entry.slug.current;
            if slug.is_empty() || slug.contains('/') || slug.contains("..") {
                tracing::warn!("Skipping post {} with unusable slug {:?}", entry.id, slug);
                continue;
            }

            let Some(post) = self.source.post_by_slug(&slug).await? else {
                tracing::warn!("Post disappeared while generating: {}", slug);
                continue;
            };
            let submission = CommentSubmission::new(post.id.clone(), self.comment_timeout);
            let html = self.renderer.post_page(&post, &submission)?;

            let dir = public_dir.join("post").join(&slug);
            fs::create_dir_all(&dir)?;
            fs::write(dir.join("index.html"), html)?;
            tracing::debug!("Generated: post/{}/index.html", slug);
            written += 1;
        }

        Ok(written)
    }
}
