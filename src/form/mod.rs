//! Comment form: field validation and the submission state machine
//!
//! A submission moves `Idle -> Submitting -> Submitted | Failed`. Validation
//! runs before any network call and never changes the state. `Submitted` is
//! terminal for the page visit.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::client::CommentSink;

/// Raw form input, as posted by the browser
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentForm {
    #[serde(rename = "_id", default)]
    pub post_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub comment: String,
}

/// Validated comment, ready to send to the submission endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentInput {
    #[serde(rename = "_id")]
    pub post_id: String,
    pub name: String,
    pub email: String,
    pub comment: String,
}

/// A required form field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    #[serde(rename = "_id")]
    PostId,
    Name,
    Email,
    Comment,
}

impl Field {
    /// Inline message shown next to the form
    pub fn message(self) -> &'static str {
        match self {
            Field::PostId => "The post id is required",
            Field::Name => "The name field is required",
            Field::Email => "The email field is required",
            Field::Comment => "The comment field is required",
        }
    }
}

impl CommentForm {
    /// Check that every field is present.
    ///
    /// Returns the missing fields in form order.
    pub fn validate(&self) -> Result<CommentInput, Vec<Field>> {
        let fields = [
            (Field::PostId, &self.post_id),
            (Field::Name, &self.name),
            (Field::Email, &self.email),
            (Field::Comment, &self.comment),
        ];
        let missing: Vec<Field> = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| *field)
            .collect();

        if !missing.is_empty() {
            return Err(missing);
        }

        Ok(CommentInput {
            post_id: self.post_id.trim().to_string(),
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            comment: self.comment.trim().to_string(),
        })
    }
}

/// Where a submission stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    /// Form visible, nothing sent (or only rejected by validation)
    Idle,
    /// Request in flight
    Submitting,
    /// Accepted by the endpoint; the form is replaced by a thank-you notice
    Submitted,
    /// Endpoint failed or timed out; the form is shown again
    Failed(String),
}

/// One page visit's comment form
#[derive(Debug, Clone)]
pub struct CommentSubmission {
    post_id: String,
    state: SubmissionState,
    draft: CommentForm,
    errors: Vec<Field>,
    timeout: Duration,
}

impl CommentSubmission {
    pub fn new(post_id: impl Into<String>, timeout: Duration) -> Self {
        let post_id = post_id.into();
        Self {
            draft: CommentForm {
                post_id: post_id.clone(),
                ..Default::default()
            },
            post_id,
            state: SubmissionState::Idle,
            errors: Vec::new(),
            timeout,
        }
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    /// Input to pre-fill the form with
    pub fn draft(&self) -> &CommentForm {
        &self.draft
    }

    /// Fields that failed validation on the last attempt
    pub fn errors(&self) -> &[Field] {
        &self.errors
    }

    pub fn is_submitted(&self) -> bool {
        self.state == SubmissionState::Submitted
    }

    /// Validate and send a comment.
    ///
    /// Issues at most one request per call and none once submitted or when
    /// validation fails. The typed input is kept unless the send succeeds.
    pub async fn submit(&mut self, form: CommentForm, sink: &dyn CommentSink) -> &SubmissionState {
        if self.is_submitted() {
            return &self.state;
        }

        let form = CommentForm {
            post_id: self.post_id.clone(),
            ..form
        };

        let input = match form.validate() {
            Ok(input) => input,
            Err(missing) => {
                tracing::debug!(post = %self.post_id, ?missing, "Comment form incomplete");
                self.errors = missing;
                self.draft = form;
                return &self.state;
            }
        };

        self.errors.clear();
        self.draft = form;
        self.state = SubmissionState::Submitting;

        self.state = match tokio::time::timeout(self.timeout, sink.create_comment(&input)).await {
            Ok(Ok(())) => {
                tracing::info!(post = %self.post_id, "Comment submitted");
                self.draft = CommentForm {
                    post_id: self.post_id.clone(),
                    ..Default::default()
                };
                SubmissionState::Submitted
            }
            Ok(Err(e)) => {
                tracing::warn!(post = %self.post_id, error = %e, "Comment submission failed");
                SubmissionState::Failed(e.to_string())
            }
            Err(_) => {
                tracing::warn!(
                    post = %self.post_id,
                    timeout_secs = self.timeout.as_secs(),
                    "Comment submission timed out"
                );
                SubmissionState::Failed(format!(
                    "request timed out after {}s",
                    self.timeout.as_secs()
                ))
            }
        };

        &self.state
    }
}
