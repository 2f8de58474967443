//! # Ruo Middleware
//!
//! The ordered request/response pipeline every Ruo request flows through.
//!
//! ## Pipeline Stages
//!
//! ```text
//! Request → Bind → Docs → Resolve → Log → Validate → Security → PreHook → Invoke → NotFound
//!                                                                            ↓ (or any error)
//! Response ← Log ← Prune/Validate ← PostHook ←──────────────────────── ErrorFunnel
//! ```
//!
//! | Stage | Needs an operation | Purpose |
//! |-------|--------------------|---------|
//! | `context_binding` | no | Create the per-request context |
//! | `documentation` | no | Serve the API document |
//! | `resolution` | no | Match method and path to an operation |
//! | `request_logging` | yes | Log the request |
//! | `request_validation` | yes | Coerce and validate every input |
//! | `security` | yes | OR across requirement sets, AND within one |
//! | `pre_handler_hook` | yes | Observe before the handler |
//! | `invocation` | yes | Call the bound handler |
//! | `not_found` | no | Terminate unmatched requests |
//! | `error_funnel` | no | Map terminal errors to replies |
//!
//! The response chain (`post_handler_hook`, `response_validation`,
//! `response_logging`) runs for every reply, including error replies.
//!
//! ## Example
//!
//! ```
//! use ruo_middleware::pipeline::RequestPhase;
//!
//! let phases = RequestPhase::all();
//! assert_eq!(phases.len(), 10);
//! assert_eq!(phases[0].name(), "context_binding");
//! assert_eq!(phases[9].name(), "error_funnel");
//! ```

#![doc(html_root_url = "https://docs.rs/ruo-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod binder;
pub mod chain;
pub mod context;
pub mod funnel;
pub mod pipeline;
pub mod stage;
pub mod stages;
pub mod types;

// Re-export main types at crate root
pub use binder::ContextBinder;
pub use chain::{ResponseChain, StageChain};
pub use context::RequestContext;
pub use funnel::{
    ErrorEnvelope, ErrorFunnel, ErrorRenderer, FunnelOptions, FunnelReply, JsonErrorRenderer,
    PipelineAbort,
};
pub use pipeline::{
    Hooks, Pipeline, PipelineBuilder, PipelineComponents, PipelineOptions, RequestPhase,
    ResponsePhase,
};
pub use ruo_core::BoxFuture;
pub use stage::{Flow, FnResponseStage, FnStage, ResponseStage, Stage};
pub use stages::{ObserveHook, StageTimings};
pub use types::{into_response, Request, Response, ResponseExt, REQUEST_ID_HEADER};
