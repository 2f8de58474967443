//! Built-in pipeline stages.
//!
//! Request stages, in the order the standard pipeline runs them:
//!
//! | Stage | Needs an operation | Purpose |
//! |-------|--------------------|---------|
//! | [`DocsStage`] | no | Serve the API document |
//! | [`ResolutionStage`] | no | Match method and path to an operation |
//! | [`RequestLoggingStage`] | yes | Log the incoming request |
//! | [`RequestValidationStage`] | yes | Coerce and validate inputs |
//! | [`SecurityStage`] | yes | Evaluate security requirements |
//! | [`PreHandlerHookStage`] | yes | Observe the request before the handler |
//! | [`InvokerStage`] | yes | Call the bound handler |
//! | [`NotFoundStage`] | no | Terminate unmatched requests |
//!
//! Response stages: [`PostHandlerHookStage`], [`ResponseValidationStage`],
//! [`ResponseLoggingStage`].

mod docs;
mod hooks;
mod invoker;
mod logging;
mod not_found;
mod resolution;
mod security;
mod validation;

pub use docs::DocsStage;
pub use hooks::{ObserveHook, PostHandlerHookStage, PreHandlerHookStage, StageTimings};
pub use invoker::InvokerStage;
pub use logging::{RequestLoggingStage, ResponseLoggingStage};
pub use not_found::NotFoundStage;
pub use resolution::ResolutionStage;
pub use security::{Authorization, SecurityDispatcher, SecurityStage};
pub use validation::{RequestValidationStage, ResponseValidationStage};
