use aws_config::BehaviorVersion;
use aws_lambda_events::sqs::SqsEvent;
use callback::{HttpSubmitter, ResponseSubmitter, RetryPolicy};
use clap::Parser;
use lambda_runtime::{LambdaEvent, service_fn};
use model::Error;
use provider::{QueueConsumer, RequestDispatcher, RequestProcessor, handle_sqs_batch};
use provisioner::DockerProvisioner;
use queue_sqs::SqsQueue;
use std::sync::Arc;
use std::time::Duration;

mod cli;
mod logger;

use cli::Args;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args: Args = Args::parse();
    logger::init(&args.logging_level)?;

    tracing::info!("Starting the custom resource provider");

    let retry: RetryPolicy = RetryPolicy {
        max_attempts: args.submit_attempts,
        ..RetryPolicy::default()
    };
    let submitter: Arc<dyn ResponseSubmitter> = Arc::new(HttpSubmitter::with_timeout(
        Duration::from_secs(args.callback_timeout),
        retry,
    )?);
    let dispatcher: RequestDispatcher = RequestDispatcher::with_provisioner(
        Arc::new(DockerProvisioner::default()),
        args.provision_spec(),
    );
    let processor: Arc<RequestProcessor> = Arc::new(RequestProcessor::new(dispatcher, submitter));

    if args.lambda {
        let max_receives: u32 = args.max_receives;
        return lambda_runtime::run(service_fn(move |event: LambdaEvent<SqsEvent>| {
            let processor: Arc<RequestProcessor> = processor.clone();

            async move { handle_sqs_batch(&processor, max_receives, event).await }
        }))
        .await;
    }

    let queue_url: String = args
        .cfn_queue
        .clone()
        .ok_or("--cfn-queue is required unless running with --lambda")?;

    if args.visibility_timeout_too_short() {
        tracing::warn!(
            visibility_timeout = args.visibility_timeout,
            worst_case_processing = ?args.worst_case_processing(),
            "Visibility timeout is shorter than message processing can take, \
             other consumers may handle the same request twice"
        );
    }

    let sqs_client: aws_sdk_sqs::Client =
        aws_sdk_sqs::Client::new(&aws_config::load_defaults(BehaviorVersion::latest()).await);
    let consumer: QueueConsumer = QueueConsumer::new(
        Arc::new(SqsQueue::new(sqs_client, queue_url)),
        processor,
        args.consumer_config(),
    );

    consumer
        .run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
                std::future::pending::<()>().await
            }
        })
        .await;

    Ok(())
}
