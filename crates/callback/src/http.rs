use crate::{ResponseSubmitter, RetryPolicy, SubmissionError};
use async_trait::async_trait;
use model::LifecycleResponse;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Submits responses with an HTTP PUT to the pre-signed S3 URL.
///
/// The URL is signed without a content type, so the header is sent empty.
#[derive(Clone)]
pub struct HttpSubmitter {
    client: Client,
    retry: RetryPolicy,
}

impl HttpSubmitter {
    pub fn new(client: Client, retry: RetryPolicy) -> Self {
        HttpSubmitter { client, retry }
    }

    /// Create a submitter whose individual requests time out.
    pub fn with_timeout(timeout: Duration, retry: RetryPolicy) -> Result<Self, SubmissionError> {
        let client: Client = Client::builder().timeout(timeout).build()?;

        Ok(HttpSubmitter::new(client, retry))
    }

    async fn put(&self, response_url: &str, body: Vec<u8>) -> Result<(), SubmissionError> {
        let response: reqwest::Response = self
            .client
            .put(response_url)
            .header(CONTENT_TYPE, "")
            .body(body)
            .send()
            .await?;

        let status: StatusCode = response.status();
        // Only used for diagnostics
        let text: String = response.text().await.unwrap_or_default();

        if status.is_success() {
            tracing::debug!(status = status.as_u16(), body = %text, "Callback accepted");
            Ok(())
        } else {
            Err(SubmissionError::Status {
                status: status.as_u16(),
                body: text,
            })
        }
    }
}

#[async_trait]
impl ResponseSubmitter for HttpSubmitter {
    async fn submit(
        &self,
        response_url: &str,
        response: &LifecycleResponse,
    ) -> Result<(), SubmissionError> {
        let body: Vec<u8> = serde_json::to_vec(response)?;
        let max_attempts: u32 = self.retry.max_attempts.max(1);

        let mut attempt: u32 = 1;
        loop {
            let err: SubmissionError = match self.put(response_url, body.clone()).await {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };

            if !err.is_retryable() {
                return Err(err);
            }
            if attempt >= max_attempts {
                return Err(SubmissionError::Exhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            let delay: Duration = self.retry.delay_after(attempt);
            tracing::warn!(attempt, ?delay, "Callback submission failed, retrying: {err}");

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
