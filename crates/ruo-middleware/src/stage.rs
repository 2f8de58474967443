//! Stage traits.
//!
//! Request stages run in a fixed order and either let the request
//! [`Continue`](Flow::Continue) or end it with a [`Reply`]. Response stages
//! run on every reply, in their own fixed order, and may only modify it.

use std::fmt;

use ruo_core::{BoxFuture, PipelineError, Reply};

use crate::context::RequestContext;
use crate::types::Request;

/// What a request stage decided.
#[derive(Debug)]
pub enum Flow {
    /// Hand the request to the next stage.
    Continue,
    /// End the request pipeline with this reply.
    Respond(Reply),
}

/// A step of the request pipeline.
///
/// Stages receive exclusive access to the context and request for the
/// duration of their call. Returning `Err` terminates the pipeline and
/// hands the error to the error funnel.
pub trait Stage: Send + Sync + 'static {
    /// Returns the stage name used in logs.
    fn name(&self) -> &'static str;

    /// Whether the stage needs a resolved operation.
    ///
    /// The engine skips such stages when resolution found nothing.
    fn requires_operation(&self) -> bool {
        true
    }

    /// Processes the request.
    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: &'a mut Request,
    ) -> BoxFuture<'a, Result<Flow, PipelineError>>;
}

/// A step of the response pipeline.
///
/// Response stages cannot fail; problems are logged and the reply is sent
/// as it stands.
pub trait ResponseStage: Send + Sync + 'static {
    /// Returns the stage name used in logs.
    fn name(&self) -> &'static str;

    /// Processes the reply.
    fn process<'a>(&'a self, ctx: &'a mut RequestContext, reply: &'a mut Reply)
        -> BoxFuture<'a, ()>;
}

/// A request stage built from a function.
///
/// # Example
///
/// ```
/// use ruo_middleware::stage::{Flow, FnStage};
///
/// let stage = FnStage::new("tag_request", |ctx, _request| {
///     Box::pin(async move {
///         ctx.set_extension("tagged");
///         Ok(Flow::Continue)
///     })
/// });
/// ```
pub struct FnStage<F> {
    name: &'static str,
    requires_operation: bool,
    func: F,
}

impl<F> FnStage<F>
where
    F: for<'a> Fn(
            &'a mut RequestContext,
            &'a mut Request,
        ) -> BoxFuture<'a, Result<Flow, PipelineError>>
        + Send
        + Sync
        + 'static,
{
    /// Creates a stage that runs whether or not an operation was resolved.
    pub fn new(name: &'static str, func: F) -> Self {
        Self {
            name,
            requires_operation: false,
            func,
        }
    }

    /// Marks the stage as operation-bound.
    #[must_use]
    pub fn operation_bound(mut self) -> Self {
        self.requires_operation = true;
        self
    }
}

impl<F> fmt::Debug for FnStage<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStage")
            .field("name", &self.name)
            .field("requires_operation", &self.requires_operation)
            .finish_non_exhaustive()
    }
}

impl<F> Stage for FnStage<F>
where
    F: for<'a> Fn(
            &'a mut RequestContext,
            &'a mut Request,
        ) -> BoxFuture<'a, Result<Flow, PipelineError>>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn requires_operation(&self) -> bool {
        self.requires_operation
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: &'a mut Request,
    ) -> BoxFuture<'a, Result<Flow, PipelineError>> {
        (self.func)(ctx, request)
    }
}

/// A response stage built from a function.
pub struct FnResponseStage<F> {
    name: &'static str,
    func: F,
}

impl<F> FnResponseStage<F>
where
    F: for<'a> Fn(&'a mut RequestContext, &'a mut Reply) -> BoxFuture<'a, ()>
        + Send
        + Sync
        + 'static,
{
    /// Creates a response stage.
    pub fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> fmt::Debug for FnResponseStage<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnResponseStage")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<F> ResponseStage for FnResponseStage<F>
where
    F: for<'a> Fn(&'a mut RequestContext, &'a mut Reply) -> BoxFuture<'a, ()>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        reply: &'a mut Reply,
    ) -> BoxFuture<'a, ()> {
        (self.func)(ctx, reply)
    }
}
