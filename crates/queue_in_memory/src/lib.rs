use async_trait::async_trait;
use model::QueueMessage;
use queue::QueueErrorReason::UnknownReceiptHandle;
use queue::QueueOperation::Delete;
use queue::{FetchOptions, MessageQueue, QueueError};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tokio::time::Instant;

const QUEUE_URL: &str = "in-memory";

/// A queue held in memory which mimics SQS visibility timeouts.
/// Uses tokio time so tests can pause and advance the clock.
#[derive(Default)]
pub struct InMemoryQueue {
    messages: Mutex<Vec<StoredMessage>>,
    next_id: AtomicU64,
}

struct StoredMessage {
    message_id: String,
    body: String,
    // Set while the message is in flight
    receipt_handle: Option<String>,
    invisible_until: Option<Instant>,
    receive_count: u32,
}

impl StoredMessage {
    fn new(id: u64, body: String) -> Self {
        StoredMessage {
            message_id: format!("message-{id}"),
            body,
            receipt_handle: None,
            invisible_until: None,
            receive_count: 0,
        }
    }

    fn is_visible(&self, now: Instant) -> bool {
        self.invisible_until.is_none_or(|until| until <= now)
    }
}

impl InMemoryQueue {
    pub fn with_messages<I, S>(bodies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let messages: Vec<StoredMessage> = bodies
            .into_iter()
            .enumerate()
            .map(|(id, body)| StoredMessage::new(id as u64, body.into()))
            .collect();

        InMemoryQueue {
            next_id: AtomicU64::new(messages.len() as u64),
            messages: Mutex::new(messages),
        }
    }

    /// Publish a message, returning its id.
    pub async fn send(&self, body: impl Into<String>) -> String {
        let message: StoredMessage = self.stored(body.into());
        let message_id: String = message.message_id.clone();

        self.messages.lock().await.push(message);

        message_id
    }

    /// Messages not yet deleted, visible or in flight.
    pub async fn len(&self) -> usize {
        self.messages.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// How many times the message has been handed to a consumer.
    pub async fn receive_count(&self, message_id: &str) -> Option<u32> {
        self.messages
            .lock()
            .await
            .iter()
            .find(|message| message.message_id == message_id)
            .map(|message| message.receive_count)
    }

    fn stored(&self, body: String) -> StoredMessage {
        StoredMessage::new(self.next_id.fetch_add(1, Ordering::Relaxed), body)
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn fetch(&self, options: &FetchOptions) -> Result<Vec<QueueMessage>, QueueError> {
        let now: Instant = Instant::now();
        let mut messages = self.messages.lock().await;

        Ok(messages
            .iter_mut()
            .filter(|message| message.is_visible(now))
            .take(options.max_messages as usize)
            .map(|message| {
                message.receive_count += 1;
                // Every receive hands out a fresh handle, like SQS
                let receipt_handle: String =
                    format!("{}-{}", message.message_id, message.receive_count);

                message.receipt_handle = Some(receipt_handle.clone());
                message.invisible_until = Some(now + options.visibility_timeout);

                QueueMessage::new(
                    message.message_id.clone(),
                    receipt_handle,
                    message.body.clone(),
                )
                .with_receive_count(message.receive_count)
            })
            .collect())
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
        let mut messages = self.messages.lock().await;

        let position: usize = messages
            .iter()
            .position(|message| message.receipt_handle.as_deref() == Some(receipt_handle))
            .ok_or_else(|| {
                QueueError::new(
                    QUEUE_URL.to_string(),
                    Delete,
                    UnknownReceiptHandle(receipt_handle.to_string()),
                )
            })?;

        messages.remove(position);

        Ok(())
    }
}
