//! sanity-blog-rs: a server-rendered blog front-end for a Sanity content backend
//!
//! Posts, authors and approved comments are fetched from the content API and
//! rendered with embedded Tera templates. Post pages are cached and
//! regenerated in the background once stale; readers can leave comments that
//! appear after moderation.

pub mod cache;
pub mod client;
pub mod commands;
pub mod config;
pub mod content;
pub mod form;
pub mod generator;
pub mod helpers;
pub mod server;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use client::{CommentSink, ContentSource, EndpointSink, MemoryBackend, SanityClient};

/// The blog application
#[derive(Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (static export) directory
    pub public_dir: PathBuf,
    /// Static assets directory
    pub static_dir: PathBuf,
    /// Where posts are read from
    pub source: Arc<dyn ContentSource>,
    /// Where comments are written to
    pub sink: Arc<dyn CommentSink>,
}

impl Blog {
    /// Create a new Blog from a directory containing `_config.yml`
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let config = Self::load_config(base_dir.as_ref())?;
        Self::with_config(base_dir.as_ref().to_path_buf(), config)
    }

    /// Open the site for the command line: `cwd` defaults to the current
    /// directory, and a `fixture` given on the command line is resolved
    /// against the current directory rather than the site directory
    pub fn open(cwd: Option<PathBuf>, fixture: Option<PathBuf>) -> Result<Self> {
        let current_dir = std::env::current_dir()?;
        let base_dir = match cwd {
            Some(dir) => current_dir.join(dir),
            None => current_dir.clone(),
        };

        let mut config = Self::load_config(&base_dir)?;
        if let Some(fixture) = fixture {
            config.backend.fixture = Some(current_dir.join(fixture));
        }
        Self::with_config(base_dir, config)
    }

    /// Read `_config.yml` from `base_dir` (defaults if absent) and apply
    /// environment overrides
    pub fn load_config(base_dir: &Path) -> Result<config::SiteConfig> {
        let config_path = base_dir.join("_config.yml");

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            tracing::debug!("No _config.yml in {:?}, using defaults", base_dir);
            config::SiteConfig::default()
        };
        config.apply_env();

        Ok(config)
    }

    /// Create a Blog with an explicit configuration, connecting to the
    /// configured backend. A relative `backend.fixture` is resolved against
    /// `base_dir`.
    pub fn with_config(base_dir: PathBuf, config: config::SiteConfig) -> Result<Self> {
        let (source, sink): (Arc<dyn ContentSource>, Arc<dyn CommentSink>) =
            match &config.backend.fixture {
                Some(fixture) => {
                    let backend = Arc::new(MemoryBackend::load(base_dir.join(fixture))?);
                    (backend.clone(), backend)
                }
                None => {
                    if config.backend.project_id.is_empty() {
                        anyhow::bail!(
                            "backend.project_id is not set in _config.yml (or use --fixture)"
                        );
                    }
                    let client = Arc::new(SanityClient::new(config.backend.clone())?);
                    (client.clone(), client)
                }
            };

        Ok(Self::with_backend(base_dir, config, source, sink))
    }

    /// Create a Blog around an existing backend
    pub fn with_backend(
        base_dir: PathBuf,
        config: config::SiteConfig,
        source: Arc<dyn ContentSource>,
        sink: Arc<dyn CommentSink>,
    ) -> Self {
        let public_dir = base_dir.join(&config.public_dir);
        let static_dir = base_dir.join(&config.static_dir);

        Self {
            config,
            base_dir,
            public_dir,
            static_dir,
            source,
            sink,
        }
    }

    /// Sink used by the post page's comment form: the configured submission
    /// endpoint if any, otherwise the backend itself
    pub fn form_sink(&self) -> Result<Arc<dyn CommentSink>> {
        match &self.config.comments.endpoint {
            Some(url) => {
                tracing::debug!("Comment form posts to {}", url);
                Ok(Arc::new(EndpointSink::new(
                    url.clone(),
                    self.config.comments.timeout(),
                )?))
            }
            None => Ok(Arc::clone(&self.sink)),
        }
    }

    /// Export the site as static files
    pub async fn generate(&self) -> Result<usize> {
        commands::generate::run(self).await
    }
}
