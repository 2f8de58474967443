//! The stage engine.
//!
//! A [`StageChain`] runs request stages strictly in order until one of
//! them produces a reply or an error. A [`ResponseChain`] runs response
//! stages over every reply. Both are immutable once built and shared by
//! all requests.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use ruo_core::{PipelineError, Reply};
use tracing::{debug, error, trace};

use crate::context::RequestContext;
use crate::stage::{Flow, ResponseStage, Stage};
use crate::types::Request;

/// An ordered list of request stages.
#[derive(Clone, Default)]
pub struct StageChain {
    stages: Vec<Arc<dyn Stage>>,
}

impl StageChain {
    /// Creates a chain from stages in execution order.
    #[must_use]
    pub fn new(stages: Vec<Arc<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the chain has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs the chain.
    ///
    /// Stages that need an operation are skipped while none is resolved. A
    /// panicking stage ends the chain with `Unhandled`, and so does a chain
    /// that runs out of stages without a reply.
    pub async fn run(
        &self,
        ctx: &mut RequestContext,
        request: &mut Request,
    ) -> Result<Reply, PipelineError> {
        for stage in &self.stages {
            if stage.requires_operation() && ctx.operation().is_none() {
                trace!(
                    request_id = %ctx.request_id(),
                    stage = stage.name(),
                    "Skipping operation-bound stage"
                );
                continue;
            }

            trace!(request_id = %ctx.request_id(), stage = stage.name(), "Running stage");
            let outcome = AssertUnwindSafe(stage.process(ctx, request))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(Flow::Continue)) => {}
                Ok(Ok(Flow::Respond(reply))) => {
                    debug!(
                        request_id = %ctx.request_id(),
                        stage = stage.name(),
                        status = reply.status().as_u16(),
                        "Stage produced a response"
                    );
                    return Ok(reply);
                }
                Ok(Err(err)) => {
                    debug!(
                        request_id = %ctx.request_id(),
                        stage = stage.name(),
                        kind = %err.kind(),
                        "Stage terminated the request"
                    );
                    return Err(err);
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!(
                        request_id = %ctx.request_id(),
                        stage = stage.name(),
                        panic = %message,
                        "Stage panicked"
                    );
                    return Err(PipelineError::unhandled(format!(
                        "stage '{}' panicked: {message}",
                        stage.name()
                    )));
                }
            }
        }

        Err(PipelineError::unhandled(
            "request pipeline finished without a response",
        ))
    }
}

impl fmt::Debug for StageChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageChain")
            .field("stages", &self.names())
            .finish()
    }
}

/// An ordered list of response stages.
#[derive(Clone, Default)]
pub struct ResponseChain {
    stages: Vec<Arc<dyn ResponseStage>>,
}

impl ResponseChain {
    /// Creates a chain from stages in execution order.
    #[must_use]
    pub fn new(stages: Vec<Arc<dyn ResponseStage>>) -> Self {
        Self { stages }
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Runs every stage over the reply.
    ///
    /// A panicking stage is logged and skipped; the remaining stages still run.
    pub async fn run(&self, ctx: &mut RequestContext, reply: &mut Reply) {
        for stage in &self.stages {
            trace!(request_id = %ctx.request_id(), stage = stage.name(), "Running response stage");
            if let Err(panic) = AssertUnwindSafe(stage.process(ctx, reply))
                .catch_unwind()
                .await
            {
                error!(
                    request_id = %ctx.request_id(),
                    stage = stage.name(),
                    panic = %panic_message(panic.as_ref()),
                    "Response stage panicked"
                );
            }
        }
    }
}

impl fmt::Debug for ResponseChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseChain")
            .field("stages", &self.names())
            .finish()
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{FnResponseStage, FnStage};
    use bytes::Bytes;
    use http::{Method, StatusCode};
    use ruo_core::{fixtures, ErrorKind, OperationCatalog, RequestId};
    use serde_json::json;
    use std::sync::Mutex;

    type Trace = Arc<Mutex<Vec<&'static str>>>;

    fn tracking(name: &'static str, trace: &Trace, bound: bool) -> Arc<dyn Stage> {
        let trace = Arc::clone(trace);
        let stage = FnStage::new(name, move |_ctx, _req| {
            let trace = Arc::clone(&trace);
            Box::pin(async move {
                trace.lock().unwrap().push(name);
                Ok(Flow::Continue)
            })
        });
        if bound {
            Arc::new(stage.operation_bound())
        } else {
            Arc::new(stage)
        }
    }

    fn responding(status: StatusCode) -> Arc<dyn Stage> {
        Arc::new(FnStage::new("respond", move |_ctx, _req| {
            Box::pin(async move {
                Ok(Flow::Respond(Reply::ok(json!({"status": status.as_u16()}))))
            })
        }))
    }

    async fn explode() -> Result<Flow, PipelineError> {
        panic!("stage exploded")
    }

    async fn explode_quietly() {
        panic!("response stage exploded")
    }

    fn context() -> RequestContext {
        RequestContext::new(RequestId::new(), Arc::from("1.0.0"), Method::GET, "/users/1")
    }

    fn request() -> Request {
        http::Request::builder()
            .uri("/users/1")
            .body(Bytes::new())
            .unwrap()
    }

    #[tokio::test]
    async fn test_stages_run_in_order() {
        let trace: Trace = Arc::default();
        let chain = StageChain::new(vec![
            tracking("first", &trace, false),
            tracking("second", &trace, false),
            responding(StatusCode::OK),
            tracking("never", &trace, false),
        ]);

        let reply = chain.run(&mut context(), &mut request()).await.unwrap();
        assert_eq!(reply.status(), StatusCode::OK);
        assert_eq!(*trace.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_operation_bound_stages_skipped_without_operation() {
        let trace: Trace = Arc::default();
        let chain = StageChain::new(vec![
            tracking("unbound", &trace, false),
            tracking("bound", &trace, true),
            responding(StatusCode::OK),
        ]);

        chain.run(&mut context(), &mut request()).await.unwrap();
        assert_eq!(*trace.lock().unwrap(), vec!["unbound"]);

        let catalog = OperationCatalog::from_definition(&fixtures::users_definition()).unwrap();
        let mut ctx = context();
        ctx.set_operation(catalog.resolve(&Method::GET, "/users/1").unwrap());
        chain.run(&mut ctx, &mut request()).await.unwrap();
        assert_eq!(
            *trace.lock().unwrap(),
            vec!["unbound", "unbound", "bound"]
        );
    }

    #[tokio::test]
    async fn test_error_stops_chain() {
        let trace: Trace = Arc::default();
        let failing: Arc<dyn Stage> = Arc::new(FnStage::new("fail", |_ctx, _req| {
            Box::pin(async { Err::<Flow, _>(PipelineError::not_found("gone")) })
        }));
        let chain = StageChain::new(vec![failing, tracking("after", &trace, false)]);

        let err = chain.run(&mut context(), &mut request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(trace.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_panic_becomes_unhandled() {
        let panicking: Arc<dyn Stage> = Arc::new(FnStage::new("boom", |_ctx, _req| {
            Box::pin(explode())
        }));
        let chain = StageChain::new(vec![panicking]);

        let err = chain.run(&mut context(), &mut request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unhandled);
        assert!(err.to_string().contains("stage exploded"));
    }

    #[tokio::test]
    async fn test_exhausted_chain_is_unhandled() {
        let trace: Trace = Arc::default();
        let chain = StageChain::new(vec![tracking("only", &trace, false)]);
        let err = chain.run(&mut context(), &mut request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unhandled);
    }

    #[tokio::test]
    async fn test_response_chain_survives_panics() {
        let boom: Arc<dyn ResponseStage> = Arc::new(FnResponseStage::new("boom", |_ctx, _reply| {
            Box::pin(explode_quietly())
        }));
        let tag: Arc<dyn ResponseStage> = Arc::new(FnResponseStage::new("tag", |_ctx, reply| {
            Box::pin(async move {
                reply.headers_mut().insert("x-tag", http::HeaderValue::from_static("1"));
            })
        }));
        let chain = ResponseChain::new(vec![boom, tag]);
        assert_eq!(chain.names(), vec!["boom", "tag"]);

        let mut reply = Reply::ok(json!({}));
        chain.run(&mut context(), &mut reply).await;
        assert_eq!(reply.headers().get("x-tag").unwrap(), "1");
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42_u8), "unknown panic");
    }
}
