//! # Ruo Core
//!
//! Core types and capabilities for the Ruo request pipeline.
//!
//! This crate provides the operation model every other crate reads:
//!
//! - [`ApiDefinition`] / [`OperationDescriptor`] - the declared operations
//! - [`DefinitionLoader`] - reads a JSON or YAML API definition document
//! - [`OperationCatalog`] - immutable `(method, path)` → operation resolution
//! - [`PipelineError`] / [`ErrorKind`] - the pipeline's error taxonomy
//! - [`SchemaValidator`] - the validate / coerce / prune schema capability
//! - [`OperationHandler`] / [`HandlerRegistry`] - business handler binding
//! - [`SecurityScheme`] / [`SecuritySchemeRegistry`] - pluggable authorization
//! - [`Reply`] - the structured response a handler or the funnel produces

#![doc(html_root_url = "https://docs.rs/ruo-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod catalog;
mod definition;
mod error;
pub mod fixtures;
mod handler;
mod loader;
mod principal;
mod reply;
mod request_id;
pub mod schema;
mod security;

pub use catalog::{OperationCatalog, ResolvedOperation};
pub use definition::{
    ApiDefinition, BodySpec, OperationBuilder, OperationDescriptor, ParameterLocation,
    ParameterSpec, SchemeRequirement, SecurityRequirementSet,
};
pub use error::{DefinitionError, DenialKind, ErrorKind, PipelineError, PipelineResult, Violation};
pub use handler::{HandlerRegistry, Invocation, OperationHandler, ValidatedParams};
pub use loader::DefinitionLoader;
pub use principal::Principal;
pub use reply::{Reply, ReplyBody};
pub use request_id::RequestId;
pub use schema::{JsonSchemaValidator, SchemaValidator, ValidationOutcome};
pub use security::{
    Denial, SchemeDecision, SchemeRequest, SecurityScheme, SecuritySchemeRegistry,
};

use std::future::Future;
use std::pin::Pin;

/// A boxed future that is `Send`.
///
/// Capabilities that may suspend (handlers, security schemes, schema
/// validators) return this so they can be stored as trait objects.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
