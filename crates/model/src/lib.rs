use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub mod env;
pub mod request;
pub mod response;

pub use request::{LifecycleRequest, QueueMessage, ResourceProperties};
pub use response::{LifecycleResponse, ProvisioningOutput, ResponseStatus};

pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// The lifecycle operations CloudFormation can ask a custom resource provider for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Create => "create",
            RequestType::Update => "update",
            RequestType::Delete => "delete",
        }
    }
}

impl Display for RequestType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request type with no registered handler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown request type `{0}`")]
pub struct UnknownRequestType(pub String);

impl FromStr for RequestType {
    type Err = UnknownRequestType;

    /// Matching is case-insensitive, CloudFormation sends `Create` while
    /// handlers are keyed by `create`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "create" => Ok(RequestType::Create),
            "update" => Ok(RequestType::Update),
            "delete" => Ok(RequestType::Delete),
            _ => Err(UnknownRequestType(value.to_string())),
        }
    }
}
