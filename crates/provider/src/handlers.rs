use crate::config::ProvisionSpec;
use async_trait::async_trait;
use model::{LifecycleRequest, LifecycleResponse, ProvisioningOutput, RequestType};
use provisioner::{ProvisionError, Provisioner, extract_output};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Performs the work for one kind of lifecycle request.
///
/// Implementations build the response but never submit it. Returning an error
/// makes the caller report FAILED to CloudFormation.
#[async_trait]
pub trait LifecycleHandler: Send + Sync {
    async fn handle(&self, request: &LifecycleRequest) -> Result<LifecycleResponse, HandlerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error(transparent)]
    Provisioning(#[from] ProvisionError),
    #[error("provisioning output is missing `{0}`")]
    MissingOutput(String),
    #[error("{0} requests are not supported by this provider")]
    NotImplemented(RequestType),
}

// (response key, provisioning output key)
const CREATE_DATA_KEYS: [(&str, &str); 2] = [("Result", "Result1"), ("Result2", "Result2")];

/// Provisions a resource by running a container and reporting what it printed.
pub struct CreateHandler {
    provisioner: Arc<dyn Provisioner>,
    spec: ProvisionSpec,
}

impl CreateHandler {
    pub fn new(provisioner: Arc<dyn Provisioner>, spec: ProvisionSpec) -> Self {
        CreateHandler { provisioner, spec }
    }
}

#[async_trait]
impl LifecycleHandler for CreateHandler {
    async fn handle(&self, request: &LifecycleRequest) -> Result<LifecycleResponse, HandlerError> {
        tracing::info!(
            physical_resource_id = request.physical_resource_id(),
            "Creating a new resource"
        );

        let timeout: Duration = self.spec.timeout;
        // The provisioner tears down its environment when the run is dropped
        let raw: String = tokio::time::timeout(
            timeout,
            self.provisioner.run(&self.spec.image, &self.spec.command),
        )
        .await
        .map_err(|_| ProvisionError::Timeout(timeout))??;

        let outputs: ProvisioningOutput = extract_output(&raw)?;

        let data: ProvisioningOutput = CREATE_DATA_KEYS
            .iter()
            .map(|&(data_key, output_key)| -> Result<(String, Value), HandlerError> {
                let value: Value = outputs
                    .get(output_key)
                    .cloned()
                    .ok_or_else(|| HandlerError::MissingOutput(output_key.to_string()))?;

                Ok((data_key.to_string(), value))
            })
            .collect::<Result<_, _>>()?;

        Ok(LifecycleResponse::success(request, data))
    }
}

/// Deletion has nothing to tear down, it only acknowledges the request.
pub struct DeleteHandler;

const DELETE_RESULT: &str = "CustomResult";

#[async_trait]
impl LifecycleHandler for DeleteHandler {
    async fn handle(&self, request: &LifecycleRequest) -> Result<LifecycleResponse, HandlerError> {
        tracing::info!(
            physical_resource_id = request.physical_resource_id(),
            "Deleting existing resource"
        );

        let data: ProvisioningOutput =
            ProvisioningOutput::from([("Result".to_string(), Value::from(DELETE_RESULT))]);

        Ok(LifecycleResponse::success(request, data))
    }
}

/// Updates are rejected so the stack update fails and rolls back, rather than
/// reporting a change that never happened.
pub struct UpdateHandler;

#[async_trait]
impl LifecycleHandler for UpdateHandler {
    async fn handle(&self, _request: &LifecycleRequest) -> Result<LifecycleResponse, HandlerError> {
        Err(HandlerError::NotImplemented(RequestType::Update))
    }
}
