use async_trait::async_trait;
use model::LifecycleResponse;

mod http;
mod retry;

pub use http::HttpSubmitter;
pub use retry::RetryPolicy;

/// Delivers a lifecycle response to the callback endpoint of its request.
///
/// A failed submission leaves CloudFormation waiting on the resource, so
/// implementations should retry before giving up.
#[async_trait]
pub trait ResponseSubmitter: Send + Sync {
    async fn submit(
        &self,
        response_url: &str,
        response: &LifecycleResponse,
    ) -> Result<(), SubmissionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("callback request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("callback endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<SubmissionError>,
    },
}

impl SubmissionError {
    /// Whether trying the same PUT again could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SubmissionError::Transport(_) => true,
            SubmissionError::Status { status, .. } => *status == 429 || *status >= 500,
            SubmissionError::Serialize(_) | SubmissionError::Exhausted { .. } => false,
        }
    }
}
