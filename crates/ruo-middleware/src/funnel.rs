//! The terminal error funnel.
//!
//! Every [`PipelineError`] that ends a request passes through the
//! [`ErrorFunnel`], which logs it, maps its kind to a status, and renders
//! the client-facing body through a pluggable [`ErrorRenderer`].
//!
//! | Kind | Status | Default message |
//! |------|--------|-----------------|
//! | `NotFound` | 404 | the error's message |
//! | `ValidationFailed` | 400 | `Request validation failed`, with `details` |
//! | `SecurityDenied` | 401 / 403 | the last denial's reason |
//! | `HandlerFailed` | 500 | generic unless internal errors are exposed |
//! | `Unhandled` | 500 | generic unless internal errors are exposed |

use std::error::Error as StdError;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use http::StatusCode;
use ruo_core::{ErrorKind, PipelineError, Reply, Violation};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::chain::panic_message;
use crate::context::RequestContext;

/// The client-facing error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEnvelope {
    /// Stable code, one per error kind.
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Violations, for validation failures only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<Violation>>,
}

/// Turns an [`ErrorEnvelope`] into a reply.
///
/// A renderer that fails or panics aborts the request: the server closes
/// the connection instead of answering.
pub trait ErrorRenderer: Send + Sync + 'static {
    /// Renders the envelope with the given status.
    ///
    /// # Errors
    ///
    /// Any error aborts the request.
    fn render(&self, status: StatusCode, envelope: &ErrorEnvelope) -> anyhow::Result<Reply>;
}

/// Renders the envelope as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonErrorRenderer;

impl ErrorRenderer for JsonErrorRenderer {
    fn render(&self, status: StatusCode, envelope: &ErrorEnvelope) -> anyhow::Result<Reply> {
        Ok(Reply::serialize(status, envelope)?)
    }
}

/// Context marker set when the reply came from the funnel rather than a
/// handler. Response stages leave such replies untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunnelReply;

/// The error funnel itself could not produce a reply.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("error funnel failed while rendering {kind}: {reason}")]
pub struct PipelineAbort {
    /// Kind of the error being rendered.
    pub kind: ErrorKind,
    /// What went wrong in the renderer.
    pub reason: String,
}

/// Funnel settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunnelOptions {
    /// Send internal error messages to clients.
    pub expose_internal_errors: bool,
    /// Status for unauthenticated denials.
    pub unauthenticated_status: StatusCode,
    /// Status for forbidden denials.
    pub forbidden_status: StatusCode,
}

impl Default for FunnelOptions {
    fn default() -> Self {
        Self {
            expose_internal_errors: false,
            unauthenticated_status: StatusCode::UNAUTHORIZED,
            forbidden_status: StatusCode::FORBIDDEN,
        }
    }
}

/// Maps terminal errors to replies.
#[derive(Clone)]
pub struct ErrorFunnel {
    renderer: Arc<dyn ErrorRenderer>,
    options: FunnelOptions,
}

impl ErrorFunnel {
    /// Creates a funnel.
    #[must_use]
    pub fn new(renderer: Arc<dyn ErrorRenderer>, options: FunnelOptions) -> Self {
        Self { renderer, options }
    }

    /// Returns the funnel options.
    #[must_use]
    pub const fn options(&self) -> &FunnelOptions {
        &self.options
    }

    /// Builds the envelope a client sees for `error`.
    #[must_use]
    pub fn envelope(&self, error: &PipelineError) -> ErrorEnvelope {
        let kind = error.kind();
        ErrorEnvelope {
            code: kind.code(),
            message: error.client_message(self.options.expose_internal_errors),
            details: (kind == ErrorKind::ValidationFailed).then(|| error.violations().to_vec()),
        }
    }

    /// Logs `error` and renders its reply.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineAbort`] if the renderer fails or panics.
    pub fn handle(
        &self,
        error: &PipelineError,
        ctx: &RequestContext,
    ) -> Result<Reply, PipelineAbort> {
        log_error(error, ctx);

        let kind = error.kind();
        let status = error.status_code(
            self.options.unauthenticated_status,
            self.options.forbidden_status,
        );
        let envelope = self.envelope(error);

        match std::panic::catch_unwind(AssertUnwindSafe(|| self.renderer.render(status, &envelope)))
        {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(err)) => {
                error!(
                    request_id = %ctx.request_id(),
                    error.kind = %kind,
                    error = %format!("{err:#}"),
                    "Error renderer failed"
                );
                Err(PipelineAbort {
                    kind,
                    reason: format!("{err:#}"),
                })
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!(
                    request_id = %ctx.request_id(),
                    error.kind = %kind,
                    panic = %reason,
                    "Error renderer panicked"
                );
                Err(PipelineAbort { kind, reason })
            }
        }
    }
}

impl Default for ErrorFunnel {
    fn default() -> Self {
        Self::new(Arc::new(JsonErrorRenderer), FunnelOptions::default())
    }
}

impl fmt::Debug for ErrorFunnel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorFunnel")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn log_error(error: &PipelineError, ctx: &RequestContext) {
    let request_id = ctx.request_id();
    let operation_id = ctx.operation_id().unwrap_or("-");
    match error {
        PipelineError::NotFound { .. } => {
            debug!(%request_id, method = %ctx.method(), path = ctx.path(), "Not found");
        }
        PipelineError::ValidationFailed { violations } => {
            info!(%request_id, operation_id, violations = ?violations, "Validation failed");
        }
        PipelineError::SecurityDenied { reason, denial } => {
            info!(%request_id, operation_id, ?denial, %reason, "Security denied");
        }
        PipelineError::HandlerFailed { .. } | PipelineError::Unhandled { .. } => {
            error!(
                %request_id,
                operation_id,
                error.kind = %error.kind(),
                error = %error_chain(error),
                "Request failed"
            );
        }
    }
}

/// Formats an error with its whole source chain.
fn error_chain(error: &dyn StdError) -> String {
    let mut out = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
