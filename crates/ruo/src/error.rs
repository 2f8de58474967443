//! Startup errors.

use std::fmt;

use ruo_config::ConfigError;
use ruo_core::DefinitionError;
use ruo_server::ServerError;
use ruo_telemetry::TelemetryError;
use thiserror::Error;

/// Errors raised while building or starting an [`Application`](crate::Application).
#[derive(Error, Debug)]
pub enum StartupError {
    /// No API definition was given, directly or through configuration.
    #[error("no API definition configured")]
    MissingDefinition,

    /// The API definition could not be loaded or routed.
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Handlers or security schemes do not match the definition.
    #[error("{} binding problem(s): {}", .0.len(), BindingList(.0))]
    Binding(Vec<BindingProblem>),

    /// Logging could not be initialized.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// The HTTP server failed.
    #[error(transparent)]
    Server(#[from] ServerError),
}

impl StartupError {
    /// Returns the binding problems, empty for other errors.
    #[must_use]
    pub fn binding_problems(&self) -> &[BindingProblem] {
        match self {
            Self::Binding(problems) => problems,
            _ => &[],
        }
    }
}

/// One mismatch between the definition and what was registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingProblem {
    /// Two operations declare the same `operationId`.
    DuplicateOperation(String),
    /// A handler was registered twice for one operation.
    DuplicateHandler(String),
    /// A handler names an operation the definition does not declare.
    UnknownOperation(String),
    /// A declared operation has no handler.
    MissingHandler(String),
    /// An operation requires a scheme nobody registered.
    UnregisteredScheme(String),
}

impl fmt::Display for BindingProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateOperation(id) => write!(f, "duplicate operationId '{id}'"),
            Self::DuplicateHandler(id) => write!(f, "handler for '{id}' registered twice"),
            Self::UnknownOperation(id) => write!(f, "handler for unknown operation '{id}'"),
            Self::MissingHandler(id) => write!(f, "operation '{id}' has no handler"),
            Self::UnregisteredScheme(name) => {
                write!(f, "security scheme '{name}' is referenced but not registered")
            }
        }
    }
}

struct BindingList<'a>(&'a [BindingProblem]);

impl fmt::Display for BindingList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, problem) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{problem}")?;
        }
        Ok(())
    }
}
