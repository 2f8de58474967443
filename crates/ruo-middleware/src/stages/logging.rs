//! Request and response logging.

use ruo_core::{BoxFuture, PipelineError, Reply};
use tracing::info;

use crate::context::RequestContext;
use crate::stage::{Flow, ResponseStage, Stage};
use crate::stages::hooks::StageTimings;
use crate::types::Request;

/// Logs each request once its operation is known.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLoggingStage;

impl Stage for RequestLoggingStage {
    fn name(&self) -> &'static str {
        "request_logging"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: &'a mut Request,
    ) -> BoxFuture<'a, Result<Flow, PipelineError>> {
        info!(
            request_id = %ctx.request_id(),
            operation_id = ctx.operation_id().unwrap_or("-"),
            http.method = %ctx.method(),
            http.path = ctx.path(),
            http.query = request.uri().query().unwrap_or(""),
            body_bytes = request.body().len(),
            "Request received"
        );
        Box::pin(std::future::ready(Ok(Flow::Continue)))
    }
}

/// Logs every response with its status and timings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseLoggingStage;

impl ResponseStage for ResponseLoggingStage {
    fn name(&self) -> &'static str {
        "response_logging"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        reply: &'a mut Reply,
    ) -> BoxFuture<'a, ()> {
        let handler_ms = ctx
            .get_extension::<StageTimings>()
            .and_then(StageTimings::handler_duration)
            .map(|d| d.as_secs_f64() * 1000.0);
        let principal = ctx
            .principal()
            .map_or_else(|| "-".to_string(), |p| p.log_id());

        info!(
            request_id = %ctx.request_id(),
            operation_id = ctx.operation_id().unwrap_or("-"),
            http.method = %ctx.method(),
            http.path = ctx.path(),
            http.status_code = reply.status().as_u16(),
            principal = %principal,
            duration_ms = ctx.elapsed().as_secs_f64() * 1000.0,
            handler_ms,
            "Request completed"
        );
        Box::pin(std::future::ready(()))
    }
}
