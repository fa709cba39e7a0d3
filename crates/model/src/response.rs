use crate::LifecycleRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Named results of a provisioning action, sent back under `Data`.
pub type ProvisioningOutput = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// The payload PUT to the pre-signed `ResponseURL` of a request.
///
/// https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/crpg-ref-responses.html
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    #[serde(default)]
    pub data: ProvisioningOutput,
}

impl LifecycleResponse {
    pub fn success(request: &LifecycleRequest, data: ProvisioningOutput) -> Self {
        Self::for_request(request, ResponseStatus::Success, None, data)
    }

    /// CloudFormation requires a reason whenever the status is FAILED.
    pub fn failed(request: &LifecycleRequest, reason: impl Into<String>) -> Self {
        Self::for_request(
            request,
            ResponseStatus::Failed,
            Some(reason.into()),
            ProvisioningOutput::new(),
        )
    }

    // Identity fields are always echoed from the request
    fn for_request(
        request: &LifecycleRequest,
        status: ResponseStatus,
        reason: Option<String>,
        data: ProvisioningOutput,
    ) -> Self {
        Self {
            status,
            reason,
            physical_resource_id: request.physical_resource_id().to_string(),
            stack_id: request.stack_id.clone(),
            request_id: request.request_id.clone(),
            logical_resource_id: request.logical_resource_id.clone(),
            data,
        }
    }
}
