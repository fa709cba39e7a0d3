use clap::Parser;
use model::env::{
    PROVIDER_BATCH_SIZE, PROVIDER_CALLBACK_TIMEOUT, PROVIDER_CFN_QUEUE_URL, PROVIDER_COMMAND,
    PROVIDER_IMAGE, PROVIDER_LOGGING_LEVEL, PROVIDER_MAX_RECEIVES, PROVIDER_POLL_INTERVAL,
    PROVIDER_PROVISION_TIMEOUT, PROVIDER_SUBMIT_ATTEMPTS, PROVIDER_VISIBILITY_TIMEOUT,
};
use provider::config::{DEFAULT_COMMAND, DEFAULT_IMAGE};
use provider::{ConsumerConfig, ProvisionSpec};
use std::time::Duration;

/// Process the command line arguments for creating the custom resource provider.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// Specifies the log level used by the custom resource provider.
    #[arg(short = 'l', long, env = PROVIDER_LOGGING_LEVEL)]
    pub logging_level: String,

    /// Specifies the SQS queue to listen to for communicating with the parent CFN stack.
    #[arg(short = 'c', long, env = PROVIDER_CFN_QUEUE_URL, required_unless_present = "lambda")]
    pub cfn_queue: Option<String>,

    /// Maximum number of messages fetched per poll.
    #[arg(long, env = PROVIDER_BATCH_SIZE, default_value_t = 10,
        value_parser = clap::value_parser!(u32).range(1..=10))]
    pub batch_size: u32,

    /// Seconds a fetched message stays hidden from other consumers, at most 12 hours.
    #[arg(long, env = PROVIDER_VISIBILITY_TIMEOUT, default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(0..=43_200))]
    pub visibility_timeout: u64,

    /// Seconds to wait between polls.
    #[arg(long, env = PROVIDER_POLL_INTERVAL, default_value_t = 5)]
    pub poll_interval: u64,

    /// Container image the create handler runs.
    #[arg(long, env = PROVIDER_IMAGE, default_value = DEFAULT_IMAGE)]
    pub image: String,

    /// Command run in the container. Must print a JSON object with `Result1` and `Result2`.
    #[arg(long, env = PROVIDER_COMMAND, default_value = DEFAULT_COMMAND)]
    pub command: String,

    /// Seconds the provisioning container may run for.
    #[arg(long, env = PROVIDER_PROVISION_TIMEOUT, default_value_t = 300)]
    pub provision_timeout: u64,

    /// Seconds a single callback PUT may take.
    #[arg(long, env = PROVIDER_CALLBACK_TIMEOUT, default_value_t = 30)]
    pub callback_timeout: u64,

    /// Attempts made to deliver a response before leaving the message for redelivery.
    #[arg(long, env = PROVIDER_SUBMIT_ATTEMPTS, default_value_t = 5,
        value_parser = clap::value_parser!(u32).range(1..))]
    pub submit_attempts: u32,

    /// Deliveries of a message whose response could not be submitted before it is dropped.
    #[arg(long, env = PROVIDER_MAX_RECEIVES, default_value_t = 5,
        value_parser = clap::value_parser!(u32).range(1..))]
    pub max_receives: u32,

    /// Run as an SQS triggered Lambda function instead of polling.
    #[arg(long)]
    pub lambda: bool,
}

impl Args {
    pub fn consumer_config(&self) -> ConsumerConfig {
        ConsumerConfig {
            batch_size: self.batch_size,
            visibility_timeout: Duration::from_secs(self.visibility_timeout),
            poll_interval: Duration::from_secs(self.poll_interval),
            max_receives: self.max_receives,
            ..ConsumerConfig::default()
        }
    }

    /// Longest a single message can take, ignoring the pauses between submission attempts.
    pub fn worst_case_processing(&self) -> Duration {
        Duration::from_secs(self.provision_timeout)
            + Duration::from_secs(self.callback_timeout) * self.submit_attempts
    }

    /// Whether a message can become visible again while it is still being handled.
    pub fn visibility_timeout_too_short(&self) -> bool {
        self.worst_case_processing() > Duration::from_secs(self.visibility_timeout)
    }

    pub fn provision_spec(&self) -> ProvisionSpec {
        ProvisionSpec {
            image: self.image.clone(),
            command: self.command.clone(),
            timeout: Duration::from_secs(self.provision_timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_required_arguments_with_defaults() {
        let args: Args =
            Args::try_parse_from(["provider", "-l", "info", "-c", "https://sqs/queue"]).unwrap();

        assert_eq!("info", args.logging_level);
        assert_eq!(Some("https://sqs/queue".to_string()), args.cfn_queue);
        assert_eq!(ConsumerConfig::default(), args.consumer_config());
        assert_eq!(ProvisionSpec::default(), args.provision_spec());
        assert_eq!(5, args.submit_attempts);
        assert!(!args.lambda);
    }

    #[test]
    fn queue_is_required_when_polling() {
        assert!(Args::try_parse_from(["provider", "-l", "info"]).is_err());
    }

    #[test]
    fn queue_is_optional_for_lambda() {
        let args: Args = Args::try_parse_from(["provider", "-l", "info", "--lambda"]).unwrap();

        assert!(args.lambda);
        assert_eq!(None, args.cfn_queue);
    }

    #[test]
    fn batch_size_is_limited_to_sqs_maximum() {
        let result = Args::try_parse_from([
            "provider",
            "-l",
            "info",
            "-c",
            "q",
            "--batch-size",
            "11",
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn visibility_timeout_is_limited_to_sqs_maximum() {
        let parse = |timeout: &str| {
            Args::try_parse_from([
                "provider",
                "-l",
                "info",
                "-c",
                "q",
                "--visibility-timeout",
                timeout,
            ])
        };

        assert!(parse("43201").is_err());
        assert_eq!(43_200, parse("43200").unwrap().visibility_timeout);
    }

    #[test]
    fn max_receives_is_passed_to_consumer() {
        let args: Args = Args::try_parse_from([
            "provider",
            "-l",
            "info",
            "-c",
            "q",
            "--max-receives",
            "2",
        ])
        .unwrap();

        assert_eq!(2, args.consumer_config().max_receives);
        assert!(
            Args::try_parse_from(["provider", "-l", "info", "-c", "q", "--max-receives", "0"])
                .is_err()
        );
    }

    #[test]
    fn default_visibility_timeout_is_shorter_than_processing() {
        let args: Args = Args::try_parse_from(["provider", "-l", "info", "-c", "q"]).unwrap();

        // 300s provisioning plus 5 attempts of 30s
        assert_eq!(Duration::from_secs(450), args.worst_case_processing());
        assert!(args.visibility_timeout_too_short());

        let args: Args = Args::try_parse_from([
            "provider",
            "-l",
            "info",
            "-c",
            "q",
            "--visibility-timeout",
            "600",
        ])
        .unwrap();

        assert!(!args.visibility_timeout_too_short());
    }

    #[test]
    fn definition_is_valid() {
        use clap::CommandFactory;

        Args::command().debug_assert();
    }
}
