//! Pipeline assembly and execution.
//!
//! A [`Pipeline`] binds a context, runs the request chain, funnels any
//! terminal error into a reply, runs the response chain over that reply,
//! and serializes it. [`Pipeline::standard`] assembles the fixed order:
//!
//! ```text
//! Request:  context_binding → documentation → resolution → request_logging
//!           → request_validation → security → pre_handler_hook → invocation
//!           → not_found → error_funnel
//! Response: post_handler_hook → response_validation → response_logging
//! ```

use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use ruo_core::{HandlerRegistry, OperationCatalog, SchemaValidator, SecuritySchemeRegistry};
use serde_json::Value;

use crate::binder::ContextBinder;
use crate::chain::{ResponseChain, StageChain};
use crate::funnel::{
    ErrorFunnel, ErrorRenderer, FunnelOptions, FunnelReply, JsonErrorRenderer, PipelineAbort,
};
use crate::stage::{ResponseStage, Stage};
use crate::stages::{
    DocsStage, InvokerStage, NotFoundStage, ObserveHook, PostHandlerHookStage,
    PreHandlerHookStage, RequestLoggingStage, RequestValidationStage, ResolutionStage,
    ResponseLoggingStage, ResponseValidationStage, SecurityDispatcher, SecurityStage,
};
use crate::types::{into_response, Request, Response};

/// Request-side phases of the standard pipeline, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestPhase {
    /// Create the request context.
    ContextBinding,
    /// Serve the API document.
    Documentation,
    /// Match the request to an operation.
    Resolution,
    /// Log the request.
    RequestLogging,
    /// Coerce and validate inputs.
    RequestValidation,
    /// Evaluate security requirements.
    Security,
    /// Observe before the handler.
    PreHandlerHook,
    /// Call the handler.
    Invocation,
    /// Terminate unmatched requests.
    NotFound,
    /// Render terminal errors.
    ErrorFunnel,
}

impl RequestPhase {
    /// Returns the phase name, matching the stage name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ContextBinding => "context_binding",
            Self::Documentation => "documentation",
            Self::Resolution => "resolution",
            Self::RequestLogging => "request_logging",
            Self::RequestValidation => "request_validation",
            Self::Security => "security",
            Self::PreHandlerHook => "pre_handler_hook",
            Self::Invocation => "invocation",
            Self::NotFound => "not_found",
            Self::ErrorFunnel => "error_funnel",
        }
    }

    /// Returns all phases in execution order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::ContextBinding,
            Self::Documentation,
            Self::Resolution,
            Self::RequestLogging,
            Self::RequestValidation,
            Self::Security,
            Self::PreHandlerHook,
            Self::Invocation,
            Self::NotFound,
            Self::ErrorFunnel,
        ]
    }

    /// Returns true if the phase is skipped when no operation resolved.
    #[must_use]
    pub const fn requires_operation(&self) -> bool {
        matches!(
            self,
            Self::RequestLogging
                | Self::RequestValidation
                | Self::Security
                | Self::PreHandlerHook
                | Self::Invocation
        )
    }
}

/// Response-side phases of the standard pipeline, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponsePhase {
    /// Observe after the handler.
    PostHandlerHook,
    /// Prune and check the body.
    ResponseValidation,
    /// Log the response.
    ResponseLogging,
}

impl ResponsePhase {
    /// Returns the phase name, matching the stage name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PostHandlerHook => "post_handler_hook",
            Self::ResponseValidation => "response_validation",
            Self::ResponseLogging => "response_logging",
        }
    }

    /// Returns all phases in execution order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::PostHandlerHook,
            Self::ResponseValidation,
            Self::ResponseLogging,
        ]
    }
}

/// Behavior switches of the standard pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Path the API document is served at; `None` disables serving it.
    pub docs_path: Option<String>,
    /// Check pruned response bodies against their schema and log mismatches.
    pub validate_responses: bool,
    /// Error funnel settings.
    pub funnel: FunnelOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            docs_path: Some("/api-docs".to_string()),
            validate_responses: true,
            funnel: FunnelOptions::default(),
        }
    }
}

impl PipelineOptions {
    /// Sets the status used for unauthenticated denials.
    #[must_use]
    pub fn unauthenticated_status(mut self, status: StatusCode) -> Self {
        self.funnel.unauthenticated_status = status;
        self
    }

    /// Sets the status used for forbidden denials.
    #[must_use]
    pub fn forbidden_status(mut self, status: StatusCode) -> Self {
        self.funnel.forbidden_status = status;
        self
    }
}

/// Optional observers around the handler.
#[derive(Clone, Default)]
pub struct Hooks {
    /// Runs after security and before the handler.
    pub pre_handler: Option<ObserveHook>,
    /// Runs first on the response side, for every reply.
    pub post_handler: Option<ObserveHook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("pre_handler", &self.pre_handler.is_some())
            .field("post_handler", &self.post_handler.is_some())
            .finish()
    }
}

/// Everything the standard pipeline is assembled from.
#[derive(Clone)]
pub struct PipelineComponents {
    /// Resolvable operations.
    pub catalog: Arc<OperationCatalog>,
    /// Operation handlers.
    pub handlers: Arc<HandlerRegistry>,
    /// Security schemes.
    pub schemes: Arc<SecuritySchemeRegistry>,
    /// Schema capability for requests and responses.
    pub validator: Arc<dyn SchemaValidator>,
    /// API version stamped on every context.
    pub api_version: String,
    /// The API document served by the documentation stage.
    pub document: Arc<Value>,
    /// Observers.
    pub hooks: Hooks,
    /// Error body renderer.
    pub renderer: Arc<dyn ErrorRenderer>,
    /// Behavior switches.
    pub options: PipelineOptions,
}

/// The assembled request/response pipeline.
///
/// Immutable after construction and shared across requests.
pub struct Pipeline {
    binder: ContextBinder,
    request_chain: StageChain,
    response_chain: ResponseChain,
    funnel: ErrorFunnel,
}

impl Pipeline {
    /// Creates a builder for a custom stage order.
    #[must_use]
    pub fn builder(api_version: impl Into<Arc<str>>) -> PipelineBuilder {
        PipelineBuilder::new(api_version)
    }

    /// Assembles the standard stage order.
    #[must_use]
    pub fn standard(components: PipelineComponents) -> Self {
        let PipelineComponents {
            catalog,
            handlers,
            schemes,
            validator,
            api_version,
            document,
            hooks,
            renderer,
            options,
        } = components;

        let mut builder = Self::builder(api_version);
        if let Some(path) = &options.docs_path {
            builder = builder.stage(DocsStage::new(path.clone(), &document));
        }

        builder
            .stage(ResolutionStage::new(catalog))
            .stage(RequestLoggingStage)
            .stage(RequestValidationStage::new(Arc::clone(&validator)))
            .stage(SecurityStage::new(SecurityDispatcher::new(schemes)))
            .stage(PreHandlerHookStage::new(hooks.pre_handler))
            .stage(InvokerStage::new(handlers))
            .stage(NotFoundStage)
            .response_stage(PostHandlerHookStage::new(hooks.post_handler))
            .response_stage(ResponseValidationStage::new(
                validator,
                options.validate_responses,
            ))
            .response_stage(ResponseLoggingStage)
            .funnel(ErrorFunnel::new(renderer, options.funnel))
            .build()
    }

    /// Returns the request-side stage names, including the binder and funnel.
    #[must_use]
    pub fn request_stage_names(&self) -> Vec<&'static str> {
        let mut names = vec![RequestPhase::ContextBinding.name()];
        names.extend(self.request_chain.names());
        names.push(RequestPhase::ErrorFunnel.name());
        names
    }

    /// Returns the response-side stage names.
    #[must_use]
    pub fn response_stage_names(&self) -> Vec<&'static str> {
        self.response_chain.names()
    }

    /// Returns the error funnel.
    #[must_use]
    pub const fn funnel(&self) -> &ErrorFunnel {
        &self.funnel
    }

    /// Processes one request.
    ///
    /// Every outcome, including errors, becomes a response that went
    /// through the response chain.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineAbort`] only when the error funnel itself failed;
    /// the caller should close the connection without a response.
    pub async fn process(&self, mut request: Request) -> Result<Response, PipelineAbort> {
        let mut ctx = self.binder.bind(&request);

        let mut reply = match self.request_chain.run(&mut ctx, &mut request).await {
            Ok(reply) => reply,
            Err(error) => {
                let reply = self.funnel.handle(&error, &ctx)?;
                ctx.set_extension(FunnelReply);
                reply
            }
        };

        self.response_chain.run(&mut ctx, &mut reply).await;
        Ok(into_response(reply, ctx.request_id()))
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("binder", &self.binder)
            .field("request_chain", &self.request_chain)
            .field("response_chain", &self.response_chain)
            .field("funnel", &self.funnel)
            .finish()
    }
}

/// Builder for a [`Pipeline`] with a custom stage order.
///
/// # Example
///
/// ```
/// use ruo_middleware::pipeline::Pipeline;
/// use ruo_middleware::stages::{NotFoundStage, ResponseLoggingStage};
///
/// let pipeline = Pipeline::builder("1.0.0")
///     .stage(NotFoundStage)
///     .response_stage(ResponseLoggingStage)
///     .build();
///
/// assert_eq!(
///     pipeline.request_stage_names(),
///     vec!["context_binding", "not_found", "error_funnel"]
/// );
/// ```
pub struct PipelineBuilder {
    binder: ContextBinder,
    stages: Vec<Arc<dyn Stage>>,
    response_stages: Vec<Arc<dyn ResponseStage>>,
    funnel: ErrorFunnel,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new(api_version: impl Into<Arc<str>>) -> Self {
        Self {
            binder: ContextBinder::new(api_version),
            stages: Vec::new(),
            response_stages: Vec::new(),
            funnel: ErrorFunnel::new(Arc::new(JsonErrorRenderer), FunnelOptions::default()),
        }
    }

    /// Appends a request stage.
    #[must_use]
    pub fn stage(mut self, stage: impl Stage) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Appends a response stage.
    #[must_use]
    pub fn response_stage(mut self, stage: impl ResponseStage) -> Self {
        self.response_stages.push(Arc::new(stage));
        self
    }

    /// Replaces the error funnel.
    #[must_use]
    pub fn funnel(mut self, funnel: ErrorFunnel) -> Self {
        self.funnel = funnel;
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            binder: self.binder,
            request_chain: StageChain::new(self.stages),
            response_chain: ResponseChain::new(self.response_stages),
            funnel: self.funnel,
        }
    }
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("stages", &self.stages.len())
            .field("response_stages", &self.response_stages.len())
            .finish_non_exhaustive()
    }
}
