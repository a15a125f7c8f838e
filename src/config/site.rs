//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `backend.token`
pub const TOKEN_ENV: &str = "SANITY_API_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub url: String,

    // Directory
    pub public_dir: String,
    pub static_dir: String,

    /// Seconds a rendered post page stays fresh
    pub revalidate: u64,

    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub comments: CommentsConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Medium Blog".to_string(),
            description: String::new(),
            url: "http://localhost:3000".to_string(),

            public_dir: "public".to_string(),
            static_dir: "static".to_string(),

            revalidate: 600,

            backend: BackendConfig::default(),
            comments: CommentsConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Apply overrides taken from the process environment.
    ///
    /// Only the write token is read here so that secrets can stay out of
    /// `_config.yml`; nothing else consults the environment.
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.is_empty() {
                tracing::debug!("Using backend token from {}", TOKEN_ENV);
                self.backend.token = Some(token);
            }
        }
    }

    /// Freshness window for cached post pages
    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.revalidate)
    }
}

/// Content backend (Sanity project) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub project_id: String,
    pub dataset: String,
    pub api_version: String,
    pub use_cdn: bool,
    /// Write token, needed only to create comments
    pub token: Option<String>,
    /// Request timeout in seconds
    pub timeout: u64,
    /// Serve content from a local JSON dataset instead of the API
    pub fixture: Option<PathBuf>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            dataset: "production".to_string(),
            api_version: "2021-10-21".to_string(),
            use_cdn: true,
            token: None,
            timeout: 30,
            fixture: None,
        }
    }
}

impl BackendConfig {
    /// Base URL of the query API
    pub fn query_url(&self) -> String {
        let host = if self.use_cdn { "apicdn" } else { "api" };
        format!(
            "https://{}.{}.sanity.io/v{}/data/query/{}",
            self.project_id, host, self.api_version, self.dataset
        )
    }

    /// Base URL of the mutation API (never served from the CDN)
    pub fn mutate_url(&self) -> String {
        format!(
            "https://{}.api.sanity.io/v{}/data/mutate/{}",
            self.project_id, self.api_version, self.dataset
        )
    }
}

/// Comment submission configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    /// POST comments to this endpoint instead of writing to the backend directly
    pub endpoint: Option<String>,
    /// Submission timeout in seconds
    pub timeout: u64,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: 10,
        }
    }
}

impl CommentsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}
