use crate::config::ConsumerConfig;
use crate::processor::{Disposition, ProcessError, RequestProcessor};
use model::{QueueMessage, ResponseStatus};
use queue::{FetchOptions, MessageQueue, QueueError};
use std::future::Future;
use std::sync::Arc;
use tracing::{Instrument, Span};

/// Counts for one fetched batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub received: usize,
    /// Deleted after a response was submitted
    pub acknowledged: usize,
    /// Deleted without a response
    pub discarded: usize,
    pub unacknowledged: usize,
}

impl BatchSummary {
    fn count(&mut self, disposition: Disposition) {
        self.received += 1;
        match disposition {
            Disposition::Acknowledge => self.acknowledged += 1,
            Disposition::Discard => self.discarded += 1,
            Disposition::Retry => self.unacknowledged += 1,
        }
    }
}

/// Polls a queue for lifecycle requests and handles them.
///
/// Messages in a batch are processed concurrently. Each one is deleted once
/// its own response has been submitted. Messages which can never be handled
/// are deleted straight away, and a message whose response could not be
/// submitted is left for redelivery until it reaches `max_receives`.
pub struct QueueConsumer {
    queue: Arc<dyn MessageQueue>,
    processor: Arc<RequestProcessor>,
    config: ConsumerConfig,
}

impl QueueConsumer {
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        processor: Arc<RequestProcessor>,
        config: ConsumerConfig,
    ) -> Self {
        QueueConsumer {
            queue,
            processor,
            config,
        }
    }

    /// Poll until the process is killed.
    pub async fn start(&self) {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Poll until `shutdown` resolves. The current batch is always finished first.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) {
        tracing::info!(
            batch_size = self.config.batch_size,
            visibility_timeout = ?self.config.visibility_timeout,
            max_receives = self.config.max_receives,
            "Starting to consume messages"
        );

        tokio::pin!(shutdown);

        loop {
            match self.poll_once().await {
                Ok(summary) if summary.received > 0 => {
                    tracing::info!(
                        received = summary.received,
                        acknowledged = summary.acknowledged,
                        discarded = summary.discarded,
                        unacknowledged = summary.unacknowledged,
                        "Finished batch"
                    );
                }
                Ok(_) => tracing::trace!("No messages available"),
                // Broker errors are transient, try again next iteration
                Err(err) => tracing::error!("Failed to fetch messages: {err}"),
            }

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        tracing::info!("Stopped consuming messages");
    }

    /// Fetch and handle a single batch.
    pub async fn poll_once(&self) -> Result<BatchSummary, QueueError> {
        let options: FetchOptions = self.config.fetch_options();
        let messages: Vec<QueueMessage> = self.queue.fetch(&options).await?;

        let tasks = messages.into_iter().map(|message: QueueMessage| {
            let message_span: Span = tracing::span!(
                tracing::Level::INFO,
                "Lifecycle request",
                message_id = %message.message_id,
                receive_count = message.receive_count
            );

            self.handle_message(message).instrument(message_span)
        });

        let dispositions: Vec<Disposition> = futures::future::join_all(tasks).await;

        let mut summary: BatchSummary = BatchSummary::default();
        dispositions
            .into_iter()
            .for_each(|disposition| summary.count(disposition));

        Ok(summary)
    }

    async fn handle_message(&self, message: QueueMessage) -> Disposition {
        tracing::debug!(body = %message.body, "Processing a new message");

        let result: Result<ResponseStatus, ProcessError> =
            self.processor.process(&message.body).await;
        let disposition: Disposition =
            Disposition::of(&result, message.receive_count, self.config.max_receives);

        if let Err(err) = &result {
            match disposition {
                Disposition::Retry => {
                    tracing::error!("Leaving message for redelivery: {err}");
                    return Disposition::Retry;
                }
                _ if err.is_retryable() => tracing::error!(
                    message_id = %message.message_id,
                    receive_count = message.receive_count,
                    "Giving up on message: {err}"
                ),
                _ => tracing::error!(
                    message_id = %message.message_id,
                    "Discarding message which can never be handled: {err}"
                ),
            }
        }

        match self.queue.delete(&message.receipt_handle).await {
            Ok(()) => {
                tracing::debug!(?disposition, "Finished processing message");
                disposition
            }
            Err(err) => {
                // A redelivery will handle the message again
                tracing::error!("Failed to delete message: {err}");
                Disposition::Retry
            }
        }
    }
}
