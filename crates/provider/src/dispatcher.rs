use crate::config::ProvisionSpec;
use crate::handlers::{CreateHandler, DeleteHandler, HandlerError, LifecycleHandler, UpdateHandler};
use model::{LifecycleRequest, LifecycleResponse, RequestType, UnknownRequestType};
use provisioner::Provisioner;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    // Retrying will not help, this needs to surface
    #[error(transparent)]
    UnknownRequestType(#[from] UnknownRequestType),
    #[error("{request_type} handler failed: {source}")]
    Handler {
        request_type: RequestType,
        #[source]
        source: HandlerError,
    },
}

/// Routes a request to the handler registered for its type.
#[derive(Clone)]
pub struct RequestDispatcher {
    create: Arc<dyn LifecycleHandler>,
    update: Arc<dyn LifecycleHandler>,
    delete: Arc<dyn LifecycleHandler>,
}

impl RequestDispatcher {
    pub fn new(
        create: Arc<dyn LifecycleHandler>,
        update: Arc<dyn LifecycleHandler>,
        delete: Arc<dyn LifecycleHandler>,
    ) -> Self {
        RequestDispatcher {
            create,
            update,
            delete,
        }
    }

    /// The default handlers, provisioning through `provisioner`.
    pub fn with_provisioner(provisioner: Arc<dyn Provisioner>, spec: ProvisionSpec) -> Self {
        RequestDispatcher::new(
            Arc::new(CreateHandler::new(provisioner, spec)),
            Arc::new(UpdateHandler),
            Arc::new(DeleteHandler),
        )
    }

    pub fn handler(&self, request_type: RequestType) -> &dyn LifecycleHandler {
        match request_type {
            RequestType::Create => self.create.as_ref(),
            RequestType::Update => self.update.as_ref(),
            RequestType::Delete => self.delete.as_ref(),
        }
    }

    pub async fn dispatch(
        &self,
        request: &LifecycleRequest,
    ) -> Result<LifecycleResponse, DispatchError> {
        let request_type: RequestType = request.request_type.parse()?;

        self.handler(request_type)
            .handle(request)
            .await
            .map_err(|source| DispatchError::Handler {
                request_type,
                source,
            })
    }
}
