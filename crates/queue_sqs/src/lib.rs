use async_trait::async_trait;
use aws_sdk_sqs::operation::receive_message::ReceiveMessageOutput;
use aws_sdk_sqs::types::{Message, MessageSystemAttributeName};
use model::QueueMessage;
use queue::QueueErrorReason::{BackendFailure, IncompleteMessage};
use queue::QueueOperation::{Delete, Fetch};
use queue::{FetchOptions, MessageQueue, QueueError};

// SQS rejects batches larger than this
const MAX_BATCH_SIZE: u32 = 10;
// Longest long poll SQS allows, in seconds
const MAX_WAIT_TIME: u64 = 20;
// Twelve hours, in seconds
const MAX_VISIBILITY_TIMEOUT: u64 = 43_200;

fn seconds(duration: std::time::Duration, max: u64) -> i32 {
    i32::try_from(duration.as_secs().min(max)).unwrap_or(i32::MAX)
}

pub struct SqsQueue {
    pub sqs: aws_sdk_sqs::Client,
    pub queue_url: String,
}

impl SqsQueue {
    pub fn new(sqs: aws_sdk_sqs::Client, queue_url: String) -> Self {
        Self { sqs, queue_url }
    }

    fn error(&self, operation: queue::QueueOperation, reason: queue::QueueErrorReason) -> QueueError {
        QueueError::new(self.queue_url.clone(), operation, reason)
    }

    fn to_queue_message(&self, message: Message) -> Result<QueueMessage, QueueError> {
        let message_id: String = message
            .message_id
            .ok_or_else(|| self.error(Fetch, IncompleteMessage("message id")))?;
        let receipt_handle: String = message
            .receipt_handle
            .ok_or_else(|| self.error(Fetch, IncompleteMessage("receipt handle")))?;
        // Only missing when the attribute wasn't requested
        let receive_count: u32 = message
            .attributes
            .as_ref()
            .and_then(|attributes| attributes.get(&MessageSystemAttributeName::ApproximateReceiveCount))
            .and_then(|count| count.parse().ok())
            .unwrap_or(1);

        Ok(QueueMessage::new(
            message_id,
            receipt_handle,
            message.body.unwrap_or_default(),
        )
        .with_receive_count(receive_count))
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    async fn fetch(&self, options: &FetchOptions) -> Result<Vec<QueueMessage>, QueueError> {
        let output: ReceiveMessageOutput = self
            .sqs
            .receive_message()
            .queue_url(self.queue_url.as_str())
            .max_number_of_messages(options.max_messages.clamp(1, MAX_BATCH_SIZE) as i32)
            .wait_time_seconds(seconds(options.wait_time, MAX_WAIT_TIME))
            .visibility_timeout(seconds(options.visibility_timeout, MAX_VISIBILITY_TIMEOUT))
            .message_system_attribute_names(MessageSystemAttributeName::ApproximateReceiveCount)
            .send()
            .await
            .map_err(|err| self.error(Fetch, BackendFailure(err.into())))?;

        let messages: Vec<Message> = output.messages.unwrap_or_default();

        tracing::debug!("Fetched [{}] messages from {}", messages.len(), self.queue_url);

        // A message without a receipt handle can't be acknowledged, skip it
        // and let SQS redeliver it
        Ok(messages
            .into_iter()
            .filter_map(|message: Message| match self.to_queue_message(message) {
                Ok(message) => Some(message),
                Err(err) => {
                    tracing::warn!("Skipping message: {err}");
                    None
                }
            })
            .collect())
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
        self.sqs
            .delete_message()
            .queue_url(self.queue_url.as_str())
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|err| self.error(Delete, BackendFailure(err.into())))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_sqs::operation::delete_message::{DeleteMessageError, DeleteMessageOutput};
    use aws_sdk_sqs::operation::receive_message::ReceiveMessageError;
    use aws_sdk_sqs::types::error::{QueueDoesNotExist, ReceiptHandleIsInvalid};
    use aws_smithy_mocks::{mock, mock_client};
    use std::time::Duration;

    const QUEUE_URL: &str = "https://sqs.eu-west-1.amazonaws.com/123456789012/cfn";

    fn message(id: &str, body: &str) -> Message {
        Message::builder()
            .message_id(id)
            .receipt_handle(format!("handle-{id}"))
            .body(body)
            .build()
    }

    #[tokio::test]
    async fn fetch_passes_options_and_maps_messages() {
        let receive_rule = mock!(aws_sdk_sqs::Client::receive_message)
            .match_requests(|req| {
                req.queue_url() == Some(QUEUE_URL)
                    && req.max_number_of_messages() == Some(10)
                    && req.wait_time_seconds() == Some(0)
                    && req.visibility_timeout() == Some(10)
                    && req
                        .message_system_attribute_names()
                        .contains(&MessageSystemAttributeName::ApproximateReceiveCount)
            })
            .then_output(|| {
                ReceiveMessageOutput::builder()
                    .messages(message("1", "{}"))
                    .messages(message("2", "{\"a\":1}"))
                    .build()
            });

        let queue: SqsQueue = SqsQueue::new(
            mock_client!(aws_sdk_sqs, [&receive_rule]),
            QUEUE_URL.to_string(),
        );

        let messages: Vec<QueueMessage> = queue
            .fetch(&FetchOptions::default())
            .await
            .expect("Fetch should succeed");

        assert_eq!(
            vec![
                QueueMessage::new("1".to_string(), "handle-1".to_string(), "{}".to_string()),
                QueueMessage::new(
                    "2".to_string(),
                    "handle-2".to_string(),
                    "{\"a\":1}".to_string()
                ),
            ],
            messages
        );
        assert_eq!(1, receive_rule.num_calls());
    }

    #[tokio::test]
    async fn fetch_clamps_batch_size_to_sqs_limit() {
        let receive_rule = mock!(aws_sdk_sqs::Client::receive_message)
            .match_requests(|req| req.max_number_of_messages() == Some(10))
            .then_output(|| ReceiveMessageOutput::builder().build());

        let queue: SqsQueue = SqsQueue::new(
            mock_client!(aws_sdk_sqs, [&receive_rule]),
            QUEUE_URL.to_string(),
        );
        let options: FetchOptions = FetchOptions {
            max_messages: 25,
            wait_time: Duration::ZERO,
            visibility_timeout: Duration::from_secs(30),
        };

        let messages: Vec<QueueMessage> = queue.fetch(&options).await.expect("Fetch should succeed");

        assert!(messages.is_empty());
        assert_eq!(1, receive_rule.num_calls());
    }

    #[tokio::test]
    async fn fetch_caps_durations_at_sqs_limits() {
        let receive_rule = mock!(aws_sdk_sqs::Client::receive_message)
            .match_requests(|req| {
                req.wait_time_seconds() == Some(20) && req.visibility_timeout() == Some(43_200)
            })
            .then_output(|| ReceiveMessageOutput::builder().build());

        let queue: SqsQueue = SqsQueue::new(
            mock_client!(aws_sdk_sqs, [&receive_rule]),
            QUEUE_URL.to_string(),
        );
        let options: FetchOptions = FetchOptions {
            max_messages: 10,
            wait_time: Duration::from_secs(60),
            visibility_timeout: Duration::from_secs(u64::from(u32::MAX) + 1),
        };

        queue.fetch(&options).await.expect("Fetch should succeed");

        assert_eq!(1, receive_rule.num_calls());
    }

    #[tokio::test]
    async fn fetch_reads_approximate_receive_count() {
        let receive_rule = mock!(aws_sdk_sqs::Client::receive_message).then_output(|| {
            ReceiveMessageOutput::builder()
                .messages(
                    Message::builder()
                        .message_id("1")
                        .receipt_handle("handle-1")
                        .body("{}")
                        .attributes(MessageSystemAttributeName::ApproximateReceiveCount, "4")
                        .build(),
                )
                .build()
        });

        let queue: SqsQueue = SqsQueue::new(
            mock_client!(aws_sdk_sqs, [&receive_rule]),
            QUEUE_URL.to_string(),
        );

        let messages: Vec<QueueMessage> = queue
            .fetch(&FetchOptions::default())
            .await
            .expect("Fetch should succeed");

        assert_eq!(4, messages[0].receive_count);
    }

    #[tokio::test]
    async fn fetch_skips_messages_without_receipt_handle() {
        let receive_rule = mock!(aws_sdk_sqs::Client::receive_message).then_output(|| {
            ReceiveMessageOutput::builder()
                .messages(Message::builder().message_id("orphan").body("{}").build())
                .messages(message("1", "{}"))
                .build()
        });

        let queue: SqsQueue = SqsQueue::new(
            mock_client!(aws_sdk_sqs, [&receive_rule]),
            QUEUE_URL.to_string(),
        );

        let messages: Vec<QueueMessage> = queue
            .fetch(&FetchOptions::default())
            .await
            .expect("Fetch should succeed");

        assert_eq!(1, messages.len());
        assert_eq!("1", messages[0].message_id);
    }

    #[tokio::test]
    async fn fetch_failure_is_a_queue_error() {
        let receive_rule = mock!(aws_sdk_sqs::Client::receive_message).then_error(|| {
            ReceiveMessageError::QueueDoesNotExist(QueueDoesNotExist::builder().build())
        });

        let queue: SqsQueue = SqsQueue::new(
            mock_client!(aws_sdk_sqs, [&receive_rule]),
            QUEUE_URL.to_string(),
        );

        let err: QueueError = queue
            .fetch(&FetchOptions::default())
            .await
            .expect_err("Fetch should fail");

        assert_eq!(queue::QueueOperation::Fetch, err.operation);
        assert_eq!(QUEUE_URL, err.queue_url);
    }

    #[tokio::test]
    async fn delete_uses_receipt_handle() {
        let delete_rule = mock!(aws_sdk_sqs::Client::delete_message)
            .match_requests(|req| {
                req.queue_url() == Some(QUEUE_URL) && req.receipt_handle() == Some("handle-1")
            })
            .then_output(|| DeleteMessageOutput::builder().build());

        let queue: SqsQueue = SqsQueue::new(
            mock_client!(aws_sdk_sqs, [&delete_rule]),
            QUEUE_URL.to_string(),
        );

        queue.delete("handle-1").await.expect("Delete should succeed");

        assert_eq!(1, delete_rule.num_calls());
    }

    #[tokio::test]
    async fn delete_failure_is_a_queue_error() {
        let delete_rule = mock!(aws_sdk_sqs::Client::delete_message).then_error(|| {
            DeleteMessageError::ReceiptHandleIsInvalid(ReceiptHandleIsInvalid::builder().build())
        });

        let queue: SqsQueue = SqsQueue::new(
            mock_client!(aws_sdk_sqs, [&delete_rule]),
            QUEUE_URL.to_string(),
        );

        let err: QueueError = queue
            .delete("stale")
            .await
            .expect_err("Delete should fail");

        assert_eq!(queue::QueueOperation::Delete, err.operation);
    }
}
