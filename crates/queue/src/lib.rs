use async_trait::async_trait;
use model::{Error, QueueMessage};
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// A broker holding lifecycle requests.
///
/// Messages are delivered at least once. A fetched message stays hidden from
/// other consumers for the visibility timeout and is redelivered unless it is
/// deleted before then.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn fetch(&self, options: &FetchOptions) -> Result<Vec<QueueMessage>, QueueError>;

    /// Acknowledge a message so it is never redelivered.
    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    pub max_messages: u32,
    // Zero disables long polling
    pub wait_time: Duration,
    pub visibility_timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        FetchOptions {
            max_messages: 10,
            wait_time: Duration::ZERO,
            visibility_timeout: Duration::from_secs(10),
        }
    }
}

/// Errors arising from talking to the broker.
/// These are transient from the consumer's point of view.
#[derive(Debug, thiserror::Error)]
#[error("queue {operation} failed for {queue_url}: {reason}")]
pub struct QueueError {
    pub queue_url: String,

    pub operation: QueueOperation,
    #[source]
    pub reason: QueueErrorReason,
}

#[derive(Debug, thiserror::Error)]
pub enum QueueErrorReason {
    // The broker returned a message without the parts needed to handle it
    #[error("message is missing its {0}")]
    IncompleteMessage(&'static str),
    // The receipt handle does not belong to an in-flight message
    #[error("receipt handle `{0}` is not in flight")]
    UnknownReceiptHandle(String),
    // An error from the underlying broker client
    #[error("{0}")]
    BackendFailure(#[source] Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOperation {
    Fetch,
    Delete,
}

impl Display for QueueOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueOperation::Fetch => f.write_str("fetch"),
            QueueOperation::Delete => f.write_str("delete"),
        }
    }
}

impl QueueError {
    pub fn new(queue_url: String, operation: QueueOperation, reason: QueueErrorReason) -> Self {
        QueueError {
            queue_url,
            operation,
            reason,
        }
    }
}
