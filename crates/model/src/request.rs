use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A lifecycle request as published by CloudFormation.
///
/// https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/crpg-ref-requests.html
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleRequest {
    // Kept as the raw string so unknown types reach the dispatcher
    pub request_type: String,
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub resource_properties: ResourceProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceProperties {
    #[serde(rename = "ResourceName")]
    pub resource_name: String,
    #[serde(flatten)]
    pub other: HashMap<String, Value>,
}

impl LifecycleRequest {
    /// The physical id reported back for every response to this request.
    pub fn physical_resource_id(&self) -> &str {
        &self.resource_properties.resource_name
    }
}

/// A message fetched from the broker.
/// The receipt handle is only used to acknowledge the message.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueMessage {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: String,
    /// How many times the broker has handed out this message, including this one
    pub receive_count: u32,
}

impl QueueMessage {
    pub fn new(message_id: String, receipt_handle: String, body: String) -> Self {
        Self {
            message_id,
            receipt_handle,
            body,
            receive_count: 1,
        }
    }

    pub fn with_receive_count(mut self, receive_count: u32) -> Self {
        self.receive_count = receive_count;
        self
    }

    pub fn decode(&self) -> Result<LifecycleRequest, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}
