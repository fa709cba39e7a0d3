use async_trait::async_trait;
use model::ProvisioningOutput;
use serde_json::Value;
use std::time::Duration;

mod docker;

pub use docker::DockerProvisioner;

/// An isolated environment which runs provisioning work.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Run `command` inside a fresh instance of `image`, returning its standard output.
    ///
    /// Dropping the returned future must stop the environment it started.
    async fn run(&self, image: &str, command: &str) -> Result<String, ProvisionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("failed to start provisioning action: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("provisioning action exited with {code:?}: {stderr}")]
    ExitStatus { code: Option<i32>, stderr: String },
    #[error("provisioning action did not finish within {0:?}")]
    Timeout(Duration),
    #[error("malformed provisioning output: {0}")]
    MalformedOutput(String),
}

/// Parse the JSON object printed by a provisioning action.
pub fn extract_output(raw: &str) -> Result<ProvisioningOutput, ProvisionError> {
    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|err| ProvisionError::MalformedOutput(err.to_string()))?;

    match value {
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(ProvisionError::MalformedOutput(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}
