//! Operation resolution.

use std::sync::Arc;

use ruo_core::{BoxFuture, OperationCatalog, PipelineError};
use tracing::debug;

use crate::context::RequestContext;
use crate::stage::{Flow, Stage};
use crate::types::Request;

/// Matches the request against the operation catalog.
///
/// A miss is not an error here: the request continues with no operation,
/// so operation-bound stages are skipped until the not-found stage ends it.
#[derive(Debug, Clone)]
pub struct ResolutionStage {
    catalog: Arc<OperationCatalog>,
}

impl ResolutionStage {
    /// Creates a resolution stage over `catalog`.
    #[must_use]
    pub fn new(catalog: Arc<OperationCatalog>) -> Self {
        Self { catalog }
    }
}

impl Stage for ResolutionStage {
    fn name(&self) -> &'static str {
        "resolution"
    }

    fn requires_operation(&self) -> bool {
        false
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        _request: &'a mut Request,
    ) -> BoxFuture<'a, Result<Flow, PipelineError>> {
        Box::pin(async move {
            match self.catalog.resolve(ctx.method(), ctx.path()) {
                Some(resolved) => {
                    debug!(
                        request_id = %ctx.request_id(),
                        operation_id = resolved.operation.operation_id(),
                        "Resolved operation"
                    );
                    ctx.set_operation(resolved);
                }
                None => {
                    debug!(
                        request_id = %ctx.request_id(),
                        method = %ctx.method(),
                        path = ctx.path(),
                        "No operation matches"
                    );
                }
            }
            Ok(Flow::Continue)
        })
    }
}
