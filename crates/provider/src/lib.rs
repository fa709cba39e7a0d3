//! Provider side of the CloudFormation custom resource lifecycle.
//!
//! Requests arrive on a queue, are routed to a [`handlers::LifecycleHandler`]
//! by type, and the outcome is PUT to the request's `ResponseURL`. A handler
//! failure is reported as FAILED instead of leaving the stack waiting.

mod batch_handler;
pub mod config;
pub mod consumer;
pub mod dispatcher;
pub mod handlers;
pub mod processor;

pub use batch_handler::handle_sqs_batch;
pub use config::{ConsumerConfig, ProvisionSpec};
pub use consumer::{BatchSummary, QueueConsumer};
pub use dispatcher::{DispatchError, RequestDispatcher};
pub use handlers::{CreateHandler, DeleteHandler, HandlerError, LifecycleHandler, UpdateHandler};
pub use processor::{Disposition, ProcessError, RequestProcessor};
