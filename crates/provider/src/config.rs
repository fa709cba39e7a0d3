use queue::FetchOptions;
use std::time::Duration;

/// How the consumer polls its queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerConfig {
    pub batch_size: u32,
    /// Should cover the provisioning timeout plus every submission attempt.
    /// A shorter timeout makes a slow message visible to other consumers
    /// while it is still being handled, so it may be provisioned twice.
    pub visibility_timeout: Duration,
    pub wait_time: Duration,
    /// Pause after every batch, including empty ones
    pub poll_interval: Duration,
    /// Deliveries after which a message whose response could not be
    /// submitted is deleted instead of being left for redelivery
    pub max_receives: u32,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        ConsumerConfig {
            batch_size: 10,
            visibility_timeout: Duration::from_secs(10),
            wait_time: Duration::ZERO,
            poll_interval: Duration::from_secs(5),
            max_receives: 5,
        }
    }
}

impl ConsumerConfig {
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            max_messages: self.batch_size,
            wait_time: self.wait_time,
            visibility_timeout: self.visibility_timeout,
        }
    }
}

/// What the create handler runs and how long it may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionSpec {
    pub image: String,
    pub command: String,
    pub timeout: Duration,
}

pub const DEFAULT_IMAGE: &str = "alpine";
pub const DEFAULT_COMMAND: &str =
    "echo '{\"Result1\": \"sample result 1\", \"Result2\": \"sample json result 2\"}'";

impl Default for ProvisionSpec {
    fn default() -> Self {
        ProvisionSpec {
            image: DEFAULT_IMAGE.to_string(),
            command: DEFAULT_COMMAND.to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}
