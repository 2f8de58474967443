//! The seam between the transport and whatever answers requests.

use ruo_core::BoxFuture;
use ruo_middleware::{Pipeline, PipelineAbort, Request, Response};

/// Answers one collected request.
///
/// An `Err` means no response can be produced; the server closes the
/// connection instead of replying.
pub trait Dispatch: Send + Sync + 'static {
    /// Produces the response for `request`.
    fn dispatch(&self, request: Request) -> BoxFuture<'_, Result<Response, PipelineAbort>>;
}

impl Dispatch for Pipeline {
    fn dispatch(&self, request: Request) -> BoxFuture<'_, Result<Response, PipelineAbort>> {
        Box::pin(self.process(request))
    }
}
