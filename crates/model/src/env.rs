/// Environment variable holding the logging level name
pub const PROVIDER_LOGGING_LEVEL: &str = "PROVIDER_LOGGING_LEVEL";
/// Environment variable holding the URL of the queue CloudFormation publishes requests to
pub const PROVIDER_CFN_QUEUE_URL: &str = "PROVIDER_CFN_QUEUE_URL";
pub const PROVIDER_BATCH_SIZE: &str = "PROVIDER_BATCH_SIZE";
pub const PROVIDER_VISIBILITY_TIMEOUT: &str = "PROVIDER_VISIBILITY_TIMEOUT";
pub const PROVIDER_POLL_INTERVAL: &str = "PROVIDER_POLL_INTERVAL";
/// Container image used by the create handler
pub const PROVIDER_IMAGE: &str = "PROVIDER_IMAGE";
/// Command run inside the container, expected to print a JSON object
pub const PROVIDER_COMMAND: &str = "PROVIDER_COMMAND";
pub const PROVIDER_PROVISION_TIMEOUT: &str = "PROVIDER_PROVISION_TIMEOUT";
pub const PROVIDER_CALLBACK_TIMEOUT: &str = "PROVIDER_CALLBACK_TIMEOUT";
pub const PROVIDER_SUBMIT_ATTEMPTS: &str = "PROVIDER_SUBMIT_ATTEMPTS";
/// Deliveries after which a message that keeps failing is discarded
pub const PROVIDER_MAX_RECEIVES: &str = "PROVIDER_MAX_RECEIVES";
