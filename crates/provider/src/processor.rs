use crate::dispatcher::{DispatchError, RequestDispatcher};
use callback::{ResponseSubmitter, SubmissionError};
use model::{LifecycleRequest, LifecycleResponse, ResponseStatus, UnknownRequestType};
use std::sync::Arc;

/// Why a message was not handled to completion.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("message body is not a lifecycle request: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    UnknownRequestType(#[from] UnknownRequestType),
    #[error("failed to report {status:?} for request {request_id}: {source}")]
    Submission {
        request_id: String,
        status: ResponseStatus,
        #[source]
        source: SubmissionError,
    },
}

impl ProcessError {
    /// Whether handling the same message again could succeed.
    /// A body that can't be decoded or dispatched never will.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProcessError::Submission { .. })
    }
}

/// What happens to a message once processing has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// A response was submitted, delete the message
    Acknowledge,
    /// Delete the message without a response, it will never be handled
    Discard,
    /// Leave the message for the broker to redeliver
    Retry,
}

impl Disposition {
    /// `receive_count` includes the current delivery.
    pub fn of(
        result: &Result<ResponseStatus, ProcessError>,
        receive_count: u32,
        max_receives: u32,
    ) -> Self {
        match result {
            Ok(_) => Disposition::Acknowledge,
            Err(err) if !err.is_retryable() => Disposition::Discard,
            Err(_) if receive_count >= max_receives => Disposition::Discard,
            Err(_) => Disposition::Retry,
        }
    }

    pub fn deletes_message(self) -> bool {
        self != Disposition::Retry
    }
}

/// Takes a message body through dispatch and submission.
///
/// Handler failures are reported to CloudFormation as FAILED so the stack
/// never waits on a request that will not complete.
pub struct RequestProcessor {
    dispatcher: RequestDispatcher,
    submitter: Arc<dyn ResponseSubmitter>,
}

impl RequestProcessor {
    pub fn new(dispatcher: RequestDispatcher, submitter: Arc<dyn ResponseSubmitter>) -> Self {
        RequestProcessor {
            dispatcher,
            submitter,
        }
    }

    /// Returns the status reported to CloudFormation.
    pub async fn process(&self, body: &str) -> Result<ResponseStatus, ProcessError> {
        let request: LifecycleRequest = serde_json::from_str(body)?;

        tracing::info!(
            request_type = %request.request_type,
            request_id = %request.request_id,
            logical_resource_id = %request.logical_resource_id,
            "Processing lifecycle request"
        );

        let response: LifecycleResponse = match self.dispatcher.dispatch(&request).await {
            Ok(response) => response,
            Err(DispatchError::UnknownRequestType(err)) => return Err(err.into()),
            Err(err @ DispatchError::Handler { .. }) => {
                tracing::error!("Reporting failure to CloudFormation: {err}");

                LifecycleResponse::failed(&request, err.to_string())
            }
        };

        let status: ResponseStatus = response.status;
        self.submitter
            .submit(&request.response_url, &response)
            .await
            .map_err(|source| ProcessError::Submission {
                request_id: request.request_id.clone(),
                status,
                source,
            })?;

        tracing::info!(?status, "Notified CloudFormation");

        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProvisionSpec;
    use provisioner::ProvisionError;
    use serde_json::json;
    use test_utils::{
        RecordingSubmitter, SAMPLE_OUTPUT, ScriptedProvisioner, TEST_LOGICAL_RESOURCE_ID,
        TEST_REQUEST_ID, TEST_RESPONSE_URL, TEST_STACK_ID, request_body,
    };

    fn processor(
        provisioner: ScriptedProvisioner,
        submitter: Arc<RecordingSubmitter>,
    ) -> RequestProcessor {
        RequestProcessor::new(
            RequestDispatcher::with_provisioner(Arc::new(provisioner), ProvisionSpec::default()),
            submitter,
        )
    }

    #[tokio::test]
    async fn every_known_type_submits_exactly_once_with_request_identity() {
        for request_type in ["Create", "Update", "Delete"] {
            let submitter: Arc<RecordingSubmitter> = Arc::new(RecordingSubmitter::default());
            let processor: RequestProcessor =
                processor(ScriptedProvisioner::returning(SAMPLE_OUTPUT), submitter.clone());

            processor
                .process(&request_body(request_type, "my-res"))
                .await
                .expect("Processing should complete");

            let submissions: Vec<(String, LifecycleResponse)> = submitter.submissions();
            assert_eq!(1, submissions.len(), "{request_type}");

            let (url, response) = &submissions[0];
            assert_eq!(TEST_RESPONSE_URL, url);
            assert_eq!("my-res", response.physical_resource_id);
            assert_eq!(TEST_STACK_ID, response.stack_id);
            assert_eq!(TEST_REQUEST_ID, response.request_id);
            assert_eq!(TEST_LOGICAL_RESOURCE_ID, response.logical_resource_id);
        }
    }

    #[tokio::test]
    async fn handler_failure_is_reported_as_failed() {
        let submitter: Arc<RecordingSubmitter> = Arc::new(RecordingSubmitter::default());
        let processor: RequestProcessor = processor(
            ScriptedProvisioner::failing(|| ProvisionError::MalformedOutput("eof".to_string())),
            submitter.clone(),
        );

        let status: ResponseStatus = processor
            .process(&request_body("Create", "my-res"))
            .await
            .expect("Failure should be reported");

        assert_eq!(ResponseStatus::Failed, status);

        let response: LifecycleResponse = submitter.responses().remove(0);
        assert_eq!(ResponseStatus::Failed, response.status);
        assert_eq!("my-res", response.physical_resource_id);
        assert!(response.reason.expect("FAILED needs a reason").contains("eof"));
    }

    #[tokio::test]
    async fn update_is_reported_as_failed() {
        let submitter: Arc<RecordingSubmitter> = Arc::new(RecordingSubmitter::default());
        let processor: RequestProcessor =
            processor(ScriptedProvisioner::returning(SAMPLE_OUTPUT), submitter.clone());

        let status: ResponseStatus = processor
            .process(&request_body("Update", "my-res"))
            .await
            .expect("Failure should be reported");

        assert_eq!(ResponseStatus::Failed, status);
        assert_eq!(
            Some("update handler failed: update requests are not supported by this provider"),
            submitter.responses()[0].reason.as_deref()
        );
    }

    #[tokio::test]
    async fn unknown_type_is_not_submitted() {
        let submitter: Arc<RecordingSubmitter> = Arc::new(RecordingSubmitter::default());
        let processor: RequestProcessor =
            processor(ScriptedProvisioner::returning(SAMPLE_OUTPUT), submitter.clone());

        let result: Result<ResponseStatus, ProcessError> =
            processor.process(&request_body("patch", "my-res")).await;

        assert!(matches!(result, Err(ProcessError::UnknownRequestType(_))));
        assert!(submitter.submissions().is_empty());
    }

    #[tokio::test]
    async fn undecodable_body_is_rejected() {
        let submitter: Arc<RecordingSubmitter> = Arc::new(RecordingSubmitter::default());
        let processor: RequestProcessor =
            processor(ScriptedProvisioner::returning(SAMPLE_OUTPUT), submitter.clone());

        let result: Result<ResponseStatus, ProcessError> = processor
            .process(&json!({ "RequestType": "Create" }).to_string())
            .await;

        assert!(matches!(result, Err(ProcessError::Decode(_))));
        assert!(submitter.submissions().is_empty());
    }

    #[tokio::test]
    async fn submission_failure_is_an_error() {
        let submitter: Arc<RecordingSubmitter> = Arc::new(RecordingSubmitter::failing());
        let processor: RequestProcessor =
            processor(ScriptedProvisioner::returning(SAMPLE_OUTPUT), submitter);

        let result: Result<ResponseStatus, ProcessError> =
            processor.process(&request_body("Delete", "my-res")).await;

        assert!(matches!(
            result,
            Err(ProcessError::Submission {
                status: ResponseStatus::Success,
                ..
            })
        ));
    }

    fn submission_failure() -> ProcessError {
        ProcessError::Submission {
            request_id: TEST_REQUEST_ID.to_string(),
            status: ResponseStatus::Success,
            source: SubmissionError::Status {
                status: 503,
                body: String::new(),
            },
        }
    }

    #[test]
    fn unknown_type_is_discarded_on_first_receive() {
        let result: Result<ResponseStatus, ProcessError> = Err(
            ProcessError::UnknownRequestType(UnknownRequestType("Patch".to_string())),
        );

        assert_eq!(Disposition::Discard, Disposition::of(&result, 1, 5));
    }

    #[test]
    fn failed_submission_is_retried_until_receive_limit() {
        let result: Result<ResponseStatus, ProcessError> = Err(submission_failure());

        assert_eq!(Disposition::Retry, Disposition::of(&result, 1, 3));
        assert_eq!(Disposition::Retry, Disposition::of(&result, 2, 3));
        assert_eq!(Disposition::Discard, Disposition::of(&result, 3, 3));
    }

    #[test]
    fn reported_failure_is_acknowledged() {
        let result: Result<ResponseStatus, ProcessError> = Ok(ResponseStatus::Failed);

        assert_eq!(Disposition::Acknowledge, Disposition::of(&result, 1, 5));
        assert!(Disposition::Acknowledge.deletes_message());
        assert!(!Disposition::Retry.deletes_message());
    }
}
