//! Comment submission through an HTTP endpoint
//!
//! Posts `{ _id, name, email, comment }` as JSON to a configured URL such as
//! this server's own `/api/createComment`. Only the status code matters.

use async_trait::async_trait;
use std::time::Duration;

use super::{ClientError, CommentSink};
use crate::form::CommentInput;

/// [`CommentSink`] that forwards comments to a submission endpoint
#[derive(Clone)]
pub struct EndpointSink {
    client: reqwest::Client,
    url: String,
}

impl EndpointSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CommentSink for EndpointSink {
    async fn create_comment(&self, input: &CommentInput) -> Result<(), ClientError> {
        let response = self.client.post(&self.url).json(input).send().await?;

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
        Ok(())
    }
}
