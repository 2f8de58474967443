//! Fallback for unmatched requests.

use ruo_core::{BoxFuture, PipelineError};

use crate::context::RequestContext;
use crate::stage::{Flow, Stage};
use crate::types::Request;

/// Ends any request that reached it with `NotFound`.
///
/// Placed after the invoker, it is only reached when no operation was
/// resolved, since the invoker always responds otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFoundStage;

impl Stage for NotFoundStage {
    fn name(&self) -> &'static str {
        "not_found"
    }

    fn requires_operation(&self) -> bool {
        false
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        _request: &'a mut Request,
    ) -> BoxFuture<'a, Result<Flow, PipelineError>> {
        let message = format!("No operation matches {} {}", ctx.method(), ctx.path());
        Box::pin(async move { Err(PipelineError::not_found(message)) })
    }
}
