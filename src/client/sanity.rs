//! HTTP client for the Sanity query and mutation APIs.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use super::{ClientError, CommentSink, ContentSource};
use crate::config::BackendConfig;
use crate::content::{Post, PostSummary, SlugEntry};
use crate::form::CommentInput;

/// All posts, list projection
pub const LIST_QUERY: &str = r#"*[_type == "post"]{
  _id,
  title,
  author-> {
    name,
    image
  },
  description,
  mainImage,
  slug
}"#;

/// One post by `$slug`, with author, approved comments and body
pub const DETAIL_QUERY: &str = r#"*[_type == "post" && slug.current == $slug][0]{
  _id,
  _createdAt,
  title,
  author-> {
    name,
    image
  },
  'comments': *[_type == "comment" && post._ref == ^._id && approved == true]{
    _id,
    name,
    comment,
    approved
  },
  description,
  mainImage,
  slug,
  body
}"#;

/// Id and slug of every post
pub const SLUGS_QUERY: &str = r#"*[_type == "post"]{
  _id,
  slug {
    current
  }
}"#;

/// Envelope of a query response
#[derive(Debug, Deserialize)]
struct QueryResponse<T> {
    result: T,
}

/// Client for one Sanity project and dataset
#[derive(Clone)]
pub struct SanityClient {
    client: reqwest::Client,
    config: BackendConfig,
}

impl SanityClient {
    pub fn new(config: BackendConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;
        Ok(Self { client, config })
    }

    /// Reuse an existing [`reqwest::Client`]
    pub fn with_client(client: reqwest::Client, config: BackendConfig) -> Self {
        Self { client, config }
    }

    /// Run a GROQ query with bound parameters and decode its `result`.
    ///
    /// Parameters are sent as `$name=<json value>` query-string pairs.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        query: &str,
        params: &[(&str, serde_json::Value)],
    ) -> Result<T, ClientError> {
        let mut pairs = vec![("query".to_string(), query.to_string())];
        for (name, value) in params {
            pairs.push((format!("${}", name), serde_json::to_string(value)?));
        }

        let mut request = self.client.get(self.config.query_url()).query(&pairs);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        tracing::debug!("Querying backend: {}", query.lines().next().unwrap_or(""));
        let response = Self::ensure_success(request.send().await?).await?;
        let bytes = response.bytes().await?;
        let envelope: QueryResponse<T> = serde_json::from_slice(&bytes)?;
        Ok(envelope.result)
    }

    /// Ensure the response has a success status code, returning the body
    /// text inside [`ClientError::Api`] otherwise.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// Mutation body creating one unapproved comment
pub(crate) fn create_comment_mutation(input: &CommentInput) -> serde_json::Value {
    serde_json::json!({
        "mutations": [{
            "create": {
                "_type": "comment",
                "post": {
                    "_type": "reference",
                    "_ref": input.post_id,
                },
                "name": input.name,
                "email": input.email,
                "comment": input.comment,
            }
        }]
    })
}

#[async_trait]
impl ContentSource for SanityClient {
    async fn list_posts(&self) -> Result<Vec<PostSummary>, ClientError> {
        self.fetch(LIST_QUERY, &[]).await
    }

    async fn post_by_slug(&self, slug: &str) -> Result<Option<Post>, ClientError> {
        self.fetch(DETAIL_QUERY, &[("slug", serde_json::Value::from(slug))])
            .await
    }

    async fn slugs(&self) -> Result<Vec<SlugEntry>, ClientError> {
        self.fetch(SLUGS_QUERY, &[]).await
    }
}

#[async_trait]
impl CommentSink for SanityClient {
    async fn create_comment(&self, input: &CommentInput) -> Result<(), ClientError> {
        let token = self.config.token.as_ref().ok_or(ClientError::MissingToken)?;

        let response = self
            .client
            .post(self.config.mutate_url())
            .bearer_auth(token)
            .json(&create_comment_mutation(input))
            .send()
            .await?;

        Self::ensure_success(response).await?;
        tracing::info!(post = %input.post_id, "Created comment");
        Ok(())
    }
}
