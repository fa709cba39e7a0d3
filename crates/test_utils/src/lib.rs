use async_trait::async_trait;
use aws_lambda_events::sqs::SqsMessage;
use callback::{ResponseSubmitter, SubmissionError};
use model::{LifecycleRequest, LifecycleResponse, QueueMessage, ResourceProperties};
use provisioner::{ProvisionError, Provisioner};
use queue::{FetchOptions, MessageQueue, QueueError, QueueErrorReason, QueueOperation};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const TEST_RESPONSE_URL: &str = "https://cloudformation-custom-resource-response.s3.amazonaws.com/callback";
pub const TEST_STACK_ID: &str = "arn:aws:cloudformation:eu-west-1:123456789012:stack/test/1";
pub const TEST_REQUEST_ID: &str = "request-1";
pub const TEST_LOGICAL_RESOURCE_ID: &str = "MyResource";

/// Output printed by the sample provisioning container
pub const SAMPLE_OUTPUT: &str =
    "{\"Result1\": \"sample result 1\", \"Result2\": \"sample json result 2\"}";

/// A request as CloudFormation would send it
pub fn lifecycle_request(request_type: &str, resource_name: &str) -> LifecycleRequest {
    LifecycleRequest {
        request_type: request_type.to_string(),
        response_url: TEST_RESPONSE_URL.to_string(),
        stack_id: TEST_STACK_ID.to_string(),
        request_id: TEST_REQUEST_ID.to_string(),
        logical_resource_id: TEST_LOGICAL_RESOURCE_ID.to_string(),
        resource_properties: ResourceProperties {
            resource_name: resource_name.to_string(),
            other: Default::default(),
        },
    }
}

/// The JSON message body for a request
pub fn request_body(request_type: &str, resource_name: &str) -> String {
    json!({
        "RequestType": request_type,
        "ResponseURL": TEST_RESPONSE_URL,
        "StackId": TEST_STACK_ID,
        "RequestId": TEST_REQUEST_ID,
        "LogicalResourceId": TEST_LOGICAL_RESOURCE_ID,
        "ResourceProperties": { "ResourceName": resource_name }
    })
    .to_string()
}

/// Create a dummy SQS event record with a set body
pub fn sqs_message_with_body(message_id: &str, body: String) -> SqsMessage {
    sqs_message_received(message_id, body, 1)
}

/// Create a dummy SQS event record which has been delivered `receive_count` times
pub fn sqs_message_received(message_id: &str, body: String, receive_count: u32) -> SqsMessage {
    SqsMessage {
        message_id: Some(message_id.to_string()),
        receipt_handle: None,
        body: Some(body),
        md5_of_body: None,
        md5_of_message_attributes: None,
        attributes: [(
            "ApproximateReceiveCount".to_string(),
            receive_count.to_string(),
        )]
        .into_iter()
        .collect(),
        message_attributes: Default::default(),
        event_source_arn: None,
        event_source: None,
        aws_region: None,
    }
}

/// Records every submission instead of sending it.
/// Can be switched into failing mode to simulate an unreachable endpoint.
#[derive(Default)]
pub struct RecordingSubmitter {
    submissions: Mutex<Vec<(String, LifecycleResponse)>>,
    failing: bool,
}

impl RecordingSubmitter {
    pub fn failing() -> Self {
        RecordingSubmitter {
            submissions: Default::default(),
            failing: true,
        }
    }

    /// Responses submitted so far, paired with the URL they were sent to
    pub fn submissions(&self) -> Vec<(String, LifecycleResponse)> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn responses(&self) -> Vec<LifecycleResponse> {
        self.submissions()
            .into_iter()
            .map(|(_, response)| response)
            .collect()
    }
}

#[async_trait]
impl ResponseSubmitter for RecordingSubmitter {
    async fn submit(
        &self,
        response_url: &str,
        response: &LifecycleResponse,
    ) -> Result<(), SubmissionError> {
        if self.failing {
            return Err(SubmissionError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }

        self.submissions
            .lock()
            .unwrap()
            .push((response_url.to_string(), response.clone()));

        Ok(())
    }
}

/// A provisioner which returns a fixed result and counts invocations.
pub struct ScriptedProvisioner {
    result: Result<String, fn() -> ProvisionError>,
    runs: AtomicUsize,
}

impl ScriptedProvisioner {
    pub fn returning(output: impl Into<String>) -> Self {
        ScriptedProvisioner {
            result: Ok(output.into()),
            runs: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: fn() -> ProvisionError) -> Self {
        ScriptedProvisioner {
            result: Err(error),
            runs: AtomicUsize::new(0),
        }
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provisioner for ScriptedProvisioner {
    async fn run(&self, _image: &str, _command: &str) -> Result<String, ProvisionError> {
        self.runs.fetch_add(1, Ordering::SeqCst);

        match &self.result {
            Ok(output) => Ok(output.clone()),
            Err(error) => Err(error()),
        }
    }
}

/// Fails the first `failures` fetches before delegating to the inner queue.
/// Counts fetches and the messages handed out.
pub struct FailingQueue<Q> {
    inner: Arc<Q>,
    failures: usize,
    fetches: AtomicUsize,
    received: AtomicUsize,
}

impl<Q: MessageQueue> FailingQueue<Q> {
    pub fn new(inner: Arc<Q>, failures: usize) -> Self {
        FailingQueue {
            inner,
            failures,
            fetches: AtomicUsize::new(0),
            received: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> usize {
        self.received.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<Q: MessageQueue> MessageQueue for FailingQueue<Q> {
    async fn fetch(&self, options: &FetchOptions) -> Result<Vec<QueueMessage>, QueueError> {
        let fetch: usize = self.fetches.fetch_add(1, Ordering::SeqCst);

        if fetch < self.failures {
            return Err(QueueError::new(
                "failing".to_string(),
                QueueOperation::Fetch,
                QueueErrorReason::BackendFailure("connection reset".into()),
            ));
        }

        let messages: Vec<QueueMessage> = self.inner.fetch(options).await?;
        self.received.fetch_add(messages.len(), Ordering::SeqCst);

        Ok(messages)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
        self.inner.delete(receipt_handle).await
    }
}
