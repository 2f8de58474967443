//! Handler invocation.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use ruo_core::{BoxFuture, HandlerRegistry, Invocation, PipelineError, Principal};
use tracing::debug;

use crate::chain::panic_message;
use crate::context::RequestContext;
use crate::stage::{Flow, Stage};
use crate::types::Request;

/// Calls the handler bound to the resolved operation.
///
/// Unclassified handler errors and handler panics become `HandlerFailed`;
/// errors of a declared kind pass through.
#[derive(Debug, Clone)]
pub struct InvokerStage {
    handlers: Arc<HandlerRegistry>,
}

impl InvokerStage {
    /// Creates an invoker over `handlers`.
    #[must_use]
    pub fn new(handlers: Arc<HandlerRegistry>) -> Self {
        Self { handlers }
    }
}

impl Stage for InvokerStage {
    fn name(&self) -> &'static str {
        "invocation"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: &'a mut Request,
    ) -> BoxFuture<'a, Result<Flow, PipelineError>> {
        Box::pin(async move {
            let operation = ctx
                .operation()
                .cloned()
                .ok_or_else(|| PipelineError::unhandled("invoker ran without an operation"))?;
            let operation_id = operation.operation_id();

            let handler = self.handlers.get(operation_id).cloned().ok_or_else(|| {
                PipelineError::unhandled(format!("no handler bound to operation '{operation_id}'"))
            })?;

            let invocation =
                Invocation::new(ctx.request_id(), Arc::clone(&operation), ctx.api_version_arc())
                    .with_request(
                        request.method().clone(),
                        request.uri().clone(),
                        request.headers().clone(),
                    )
                    .with_params(ctx.validated_params().cloned().unwrap_or_default())
                    .with_principal(ctx.get_extension::<Principal>().cloned());

            debug!(request_id = %ctx.request_id(), operation_id, "Invoking handler");
            match AssertUnwindSafe(handler.call(invocation)).catch_unwind().await {
                Ok(Ok(reply)) => Ok(Flow::Respond(reply)),
                Ok(Err(err)) => Err(err.into_handler_outcome(operation_id)),
                Err(panic) => Err(PipelineError::handler_failed(
                    operation_id,
                    anyhow::anyhow!("handler panicked: {}", panic_message(panic.as_ref())),
                )),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::Method;
    use ruo_core::{fixtures, ErrorKind, OperationCatalog, Reply, RequestId};
    use serde_json::json;

    fn bound(path: &str) -> RequestContext {
        let catalog = OperationCatalog::from_definition(&fixtures::users_definition()).unwrap();
        let mut ctx = RequestContext::new(RequestId::new(), Arc::from("1.0.0"), Method::GET, path);
        ctx.set_operation(catalog.resolve(&Method::GET, path).unwrap());
        ctx
    }

    async fn invoke(
        handlers: HandlerRegistry,
        ctx: &mut RequestContext,
    ) -> Result<Flow, PipelineError> {
        let stage = InvokerStage::new(Arc::new(handlers));
        let mut request = http::Request::builder()
            .uri(ctx.path().to_string())
            .body(Bytes::new())
            .unwrap();
        stage.process(ctx, &mut request).await
    }

    async fn failing(_inv: Invocation) -> Result<Reply, PipelineError> {
        Err(anyhow::anyhow!("database unavailable").into())
    }

    async fn panicking(_inv: Invocation) -> Result<Reply, PipelineError> {
        panic!("handler exploded")
    }

    #[tokio::test]
    async fn test_handler_receives_invocation() {
        let mut handlers = HandlerRegistry::new();
        handlers.insert("getUser", |inv: Invocation| async move {
            Ok::<_, PipelineError>(Reply::ok(json!({
                "op": inv.operation().operation_id(),
                "version": inv.api_version(),
                "principal": inv.principal().map(Principal::log_id),
            })))
        });

        let mut ctx = bound("/users/1");
        ctx.set_extension(Principal::user("u1", Vec::<String>::new()));
        let Flow::Respond(reply) = invoke(handlers, &mut ctx).await.unwrap() else {
            panic!("expected a reply");
        };
        assert_eq!(
            reply.json_body(),
            Some(&json!({"op": "getUser", "version": "1.0.0", "principal": "user:u1"}))
        );
    }

    #[tokio::test]
    async fn test_unclassified_error_becomes_handler_failed() {
        let mut handlers = HandlerRegistry::new();
        handlers.insert("getUser", failing);
        let err = invoke(handlers, &mut bound("/users/1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HandlerFailed);
    }

    #[tokio::test]
    async fn test_declared_error_passes_through() {
        let mut handlers = HandlerRegistry::new();
        handlers.insert("getUser", |_inv: Invocation| async {
            Err::<Reply, _>(PipelineError::not_found("user not found"))
        });
        let err = invoke(handlers, &mut bound("/users/1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_panic_becomes_handler_failed() {
        let mut handlers = HandlerRegistry::new();
        handlers.insert("getUser", panicking);
        let err = invoke(handlers, &mut bound("/users/1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HandlerFailed);
    }

    #[tokio::test]
    async fn test_missing_binding_is_unhandled() {
        let err = invoke(HandlerRegistry::new(), &mut bound("/users/1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unhandled);
    }
}
