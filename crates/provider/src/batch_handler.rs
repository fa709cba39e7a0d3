use crate::processor::{Disposition, ProcessError, RequestProcessor};
use aws_lambda_events::sqs::{BatchItemFailure, SqsBatchResponse, SqsEvent, SqsMessage};
use lambda_runtime::{Error, LambdaEvent};
use model::ResponseStatus;
use tracing::instrument::Instrumented;
use tracing::{Instrument, Span};

/// Handles an SQS event when running as a Lambda function.
///
/// Lambda deletes every record not listed in the returned failures, so the
/// function *must* have `ReportBatchItemFailures` enabled. Only records whose
/// response could not be submitted are listed, until they reach `max_receives`.
pub async fn handle_sqs_batch(
    processor: &RequestProcessor,
    max_receives: u32,
    event: LambdaEvent<SqsEvent>,
) -> Result<SqsBatchResponse, Error> {
    let records: Vec<SqsMessage> = event.payload.records;

    tracing::info!("Handling batch of [{}] from SQS", records.len());

    // Start a task for each SQS message
    let (ids, tasks): (Vec<(String, u32)>, Vec<_>) = records
        .into_iter()
        .map(|message: SqsMessage| {
            let receive_count: u32 = receive_count(&message);
            // We need to keep the message_id to report failures to SQS
            let message_id: String = message.message_id.unwrap_or_default();
            let body: String = message.body.unwrap_or_default();

            let message_span: Span = tracing::span!(
                tracing::Level::INFO,
                "Lifecycle request",
                message_id = %message_id
            );

            let task: Instrumented<_> =
                async move { processor.process(&body).await }.instrument(message_span);

            ((message_id, receive_count), task)
        })
        .unzip();

    // Process all messages concurrently
    let results: Vec<Result<ResponseStatus, ProcessError>> =
        futures::future::join_all(tasks).await;

    Ok(SqsBatchResponse {
        batch_item_failures: collect_batch_failures(ids.into_iter().zip(results), max_receives),
    })
}

fn receive_count(message: &SqsMessage) -> u32 {
    message
        .attributes
        .get("ApproximateReceiveCount")
        .and_then(|count| count.parse().ok())
        .unwrap_or(1)
}

fn collect_batch_failures(
    results: impl Iterator<Item = ((String, u32), Result<ResponseStatus, ProcessError>)>,
    max_receives: u32,
) -> Vec<BatchItemFailure> {
    results
        .filter_map(|((message_id, receive_count), result)| {
            match (Disposition::of(&result, receive_count, max_receives), result) {
                (_, Ok(_)) => None,
                (Disposition::Retry, Err(err)) => {
                    tracing::error!("Failed to process msg {message_id}, {err}");

                    Some(message_id)
                }
                (_, Err(err)) => {
                    tracing::error!(receive_count, "Discarding msg {message_id}, {err}");

                    None
                }
            }
        })
        .map(|id| BatchItemFailure {
            item_identifier: id,
        })
        .collect()
}
