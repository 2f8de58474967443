//! Error types for Ruo.
//!
//! [`PipelineError`] is the single outcome type every request-side stage
//! terminates with when it does not produce a response. Its [`ErrorKind`]
//! decides the status code and envelope the Terminal Error Funnel renders.
//!
//! | Kind | Status | Client message |
//! |---|---|---|
//! | `NotFound` | 404 | as given |
//! | `ValidationFailed` | 400 | generic, plus violation list |
//! | `SecurityDenied` | 401 / 403 | denial reason |
//! | `HandlerFailed` | 500 | redacted |
//! | `Unhandled` | 500 | redacted |
//!
//! [`DefinitionError`] covers problems found while loading the API
//! definition document and building the catalog.

use http::StatusCode;
use ruo_router::RouteError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`PipelineError`].
pub type PipelineResult<T> = Result<T, PipelineError>;

/// The kind of a [`PipelineError`].
///
/// Serialized with the variant name, which is also the `code` field of the
/// error envelope sent to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// No operation matches the request.
    NotFound,
    /// Request parameters or body violate the declared schema.
    ValidationFailed,
    /// No security requirement set was satisfied.
    SecurityDenied,
    /// The bound handler raised an error.
    HandlerFailed,
    /// Anything not classified, typically a defect inside a stage.
    Unhandled,
}

impl ErrorKind {
    /// Returns the string code used in the error envelope.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "NotFound",
            Self::ValidationFailed => "ValidationFailed",
            Self::SecurityDenied => "SecurityDenied",
            Self::HandlerFailed => "HandlerFailed",
            Self::Unhandled => "Unhandled",
        }
    }

    /// Returns true for kinds whose detail must not reach the client.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::HandlerFailed | Self::Unhandled)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A single schema violation.
///
/// `location` is a JSON-pointer style path rooted at the request part, for
/// example `/body/name` or `/query/limit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Where the violation occurred.
    pub location: String,
    /// What is wrong.
    pub message: String,
}

impl Violation {
    /// Creates a new violation.
    #[must_use]
    pub fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Whether a security denial means "who are you" or "not you".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    /// Credentials are missing or invalid.
    Unauthenticated,
    /// Credentials are valid but insufficient.
    Forbidden,
}

/// A terminal outcome of the request pipeline.
///
/// # Example
///
/// ```
/// use ruo_core::{ErrorKind, PipelineError, Violation};
///
/// let err = PipelineError::validation(vec![Violation::new("/body/name", "is required")]);
/// assert_eq!(err.kind(), ErrorKind::ValidationFailed);
/// assert_eq!(err.violations().len(), 1);
/// ```
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No operation (or, from a handler, no resource) matches.
    #[error("not found: {message}")]
    NotFound {
        /// Client-facing message.
        message: String,
    },

    /// Schema violations, aggregated.
    #[error("validation failed with {} violation(s)", violations.len())]
    ValidationFailed {
        /// Every violation found, never just the first.
        violations: Vec<Violation>,
    },

    /// No security requirement set was satisfied.
    #[error("security requirements not satisfied: {reason}")]
    SecurityDenied {
        /// Reason reported by the last evaluated requirement set.
        reason: String,
        /// Unauthenticated or forbidden.
        denial: DenialKind,
    },

    /// The bound handler raised an error.
    #[error("handler for operation '{operation_id}' failed")]
    HandlerFailed {
        /// The operation whose handler failed.
        operation_id: String,
        /// The original error.
        #[source]
        source: anyhow::Error,
    },

    /// Unclassified failure.
    #[error("unhandled pipeline error: {message}")]
    Unhandled {
        /// Internal description, never sent to clients by default.
        message: String,
        /// Underlying error, when there is one.
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl PipelineError {
    /// Creates a `NotFound` error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a `ValidationFailed` error.
    #[must_use]
    pub fn validation(violations: Vec<Violation>) -> Self {
        Self::ValidationFailed { violations }
    }

    /// Creates a `SecurityDenied` error for missing or bad credentials.
    #[must_use]
    pub fn unauthenticated(reason: impl Into<String>) -> Self {
        Self::SecurityDenied {
            reason: reason.into(),
            denial: DenialKind::Unauthenticated,
        }
    }

    /// Creates a `SecurityDenied` error for insufficient credentials.
    #[must_use]
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::SecurityDenied {
            reason: reason.into(),
            denial: DenialKind::Forbidden,
        }
    }

    /// Wraps a handler error, preserving it as the cause.
    #[must_use]
    pub fn handler_failed(operation_id: impl Into<String>, source: anyhow::Error) -> Self {
        Self::HandlerFailed {
            operation_id: operation_id.into(),
            source,
        }
    }

    /// Creates an `Unhandled` error without an underlying cause.
    #[must_use]
    pub fn unhandled(message: impl Into<String>) -> Self {
        Self::Unhandled {
            message: message.into(),
            source: None,
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::ValidationFailed { .. } => ErrorKind::ValidationFailed,
            Self::SecurityDenied { .. } => ErrorKind::SecurityDenied,
            Self::HandlerFailed { .. } => ErrorKind::HandlerFailed,
            Self::Unhandled { .. } => ErrorKind::Unhandled,
        }
    }

    /// Returns the violations carried by a `ValidationFailed` error.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::ValidationFailed { violations } => violations,
            _ => &[],
        }
    }

    /// Returns the HTTP status for this error.
    ///
    /// Security denials use the supplied statuses so deployments can choose
    /// between 401 and 403.
    #[must_use]
    pub const fn status_code(
        &self,
        unauthenticated: StatusCode,
        forbidden: StatusCode,
    ) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            Self::SecurityDenied {
                denial: DenialKind::Unauthenticated,
                ..
            } => unauthenticated,
            Self::SecurityDenied {
                denial: DenialKind::Forbidden,
                ..
            } => forbidden,
            Self::HandlerFailed { .. } | Self::Unhandled { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the message a client is allowed to see.
    #[must_use]
    pub fn client_message(&self, expose_internal: bool) -> String {
        match self {
            Self::NotFound { message } => message.clone(),
            Self::ValidationFailed { .. } => "Request validation failed".to_string(),
            Self::SecurityDenied { reason, .. } => reason.clone(),
            Self::HandlerFailed { .. } | Self::Unhandled { .. } if expose_internal => {
                self.to_string()
            }
            Self::HandlerFailed { .. } | Self::Unhandled { .. } => {
                "An internal error occurred".to_string()
            }
        }
    }

    /// Re-tags an unclassified error raised by a handler as `HandlerFailed`.
    ///
    /// Declared kinds pass through unchanged.
    #[must_use]
    pub fn into_handler_outcome(self, operation_id: &str) -> Self {
        match self {
            Self::Unhandled {
                source: Some(source),
                ..
            } => Self::handler_failed(operation_id, source),
            Self::Unhandled {
                message,
                source: None,
            } => Self::handler_failed(operation_id, anyhow::anyhow!(message)),
            other => other,
        }
    }
}

impl From<anyhow::Error> for PipelineError {
    fn from(source: anyhow::Error) -> Self {
        Self::Unhandled {
            message: source.to_string(),
            source: Some(source),
        }
    }
}

/// Errors raised while loading an API definition or building the catalog.
#[derive(Error, Debug)]
pub enum DefinitionError {
    /// The document could not be read.
    #[error("failed to read API definition '{path}': {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON.
    #[error("failed to parse API definition as JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The document is not valid YAML.
    #[error("failed to parse API definition as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The file extension is not one of `.json`, `.yaml`, `.yml`.
    #[error("unsupported API definition format: {0}")]
    UnsupportedFormat(String),

    /// The document parsed but is structurally invalid.
    #[error("invalid API definition at '{pointer}': {message}")]
    Invalid {
        /// JSON pointer of the offending node.
        pointer: String,
        /// What is wrong.
        message: String,
    },

    /// A `$ref` points to nothing.
    #[error("unresolvable reference '{reference}' at '{pointer}'")]
    UnresolvedRef {
        /// The reference text.
        reference: String,
        /// Where it was used.
        pointer: String,
    },

    /// A `$ref` chain loops back on itself.
    #[error("recursive reference '{reference}' at '{pointer}'")]
    RecursiveRef {
        /// The reference text.
        reference: String,
        /// Where it was used.
        pointer: String,
    },

    /// Two operations share an `operationId`.
    #[error("duplicate operationId '{0}'")]
    DuplicateOperation(String),

    /// Two operations overlap with equal specificity, or a template is bad.
    #[error(transparent)]
    Route(#[from] RouteError),
}

impl DefinitionError {
    pub(crate) fn invalid(pointer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            pointer: pointer.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statuses(err: &PipelineError) -> StatusCode {
        err.status_code(StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN)
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(statuses(&PipelineError::not_found("x")), StatusCode::NOT_FOUND);
        assert_eq!(
            statuses(&PipelineError::validation(vec![])),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            statuses(&PipelineError::unauthenticated("no key")),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            statuses(&PipelineError::forbidden("no scope")),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            statuses(&PipelineError::unhandled("boom")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_denial_status_is_configurable() {
        let err = PipelineError::unauthenticated("no key");
        assert_eq!(
            err.status_code(StatusCode::FORBIDDEN, StatusCode::FORBIDDEN),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_internal_messages_are_redacted() {
        let err = PipelineError::handler_failed("getUser", anyhow::anyhow!("db password wrong"));
        assert_eq!(err.client_message(false), "An internal error occurred");
        assert!(err.client_message(true).contains("getUser"));
    }

    #[test]
    fn test_anyhow_becomes_unhandled() {
        let err: PipelineError = anyhow::anyhow!("boom").into();
        assert_eq!(err.kind(), ErrorKind::Unhandled);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_handler_outcome_retags_unhandled_only() {
        let err: PipelineError = anyhow::anyhow!("db down").into();
        let err = err.into_handler_outcome("getUser");
        assert_eq!(err.kind(), ErrorKind::HandlerFailed);
        let chain = match &err {
            PipelineError::HandlerFailed { source, .. } => format!("{source:#}"),
            _ => String::new(),
        };
        assert!(chain.contains("db down"));

        let err = PipelineError::not_found("no such user").into_handler_outcome("getUser");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_kind_codes() {
        assert_eq!(ErrorKind::ValidationFailed.code(), "ValidationFailed");
        assert_eq!(
            serde_json::to_value(ErrorKind::SecurityDenied).unwrap(),
            "SecurityDenied"
        );
        assert!(ErrorKind::Unhandled.is_internal());
        assert!(!ErrorKind::NotFound.is_internal());
    }
}
