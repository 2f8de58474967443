//! # Ruo
//!
//! **A definition-driven HTTP request pipeline.**
//!
//! Ruo takes an OpenAPI-style API definition and puts a fixed pipeline in
//! front of your handlers. Every request is resolved to a declared
//! operation, its inputs are coerced and validated, its security
//! requirements are checked, and only then is the handler called. Every
//! reply, error replies included, is pruned to its declared schema.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ruo::prelude::*;
//! use serde_json::json;
//!
//! async fn get_user(inv: Invocation) -> Result<Reply, PipelineError> {
//!     let id = inv.path_param("id").unwrap_or_default().to_string();
//!     Ok(Reply::ok(json!({"id": id, "name": "Ada"})))
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::new()
//!         .with_optional_file("ruo.toml")?
//!         .with_env_prefix("RUO")
//!         .load()?;
//!
//!     let app = Application::builder()
//!         .config(config)
//!         .handler("getUser", get_user)
//!         .build()?;
//!
//!     app.init_logging()?;
//!     app.serve().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → Bind → Docs → Resolve → Log → Validate → Security → PreHook → Invoke → NotFound
//!                                                                            ↓ (or any error)
//! Response ← Log ← Prune/Validate ← PostHook ←──────────────────────── ErrorFunnel
//! ```

#![doc(html_root_url = "https://docs.rs/ruo/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod application;
mod error;

pub use application::{Application, ApplicationBuilder};
pub use error::{BindingProblem, StartupError};

// Re-export the member crates
pub use ruo_config as config;
pub use ruo_core as core;
pub use ruo_middleware as middleware;
pub use ruo_router as router;
pub use ruo_server as server;
pub use ruo_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use ruo::prelude::*;
///
/// let config = RuoConfig::default();
/// assert_eq!(config.docs.path, "/api-docs");
/// ```
pub mod prelude {
    pub use crate::{Application, ApplicationBuilder, BindingProblem, StartupError};

    pub use ruo_core::{
        ApiDefinition, DefinitionLoader, DenialKind, ErrorKind, Invocation, OperationHandler,
        PipelineError, Principal, Reply, RequestId, SchemeDecision, SchemeRequest,
        SecurityScheme, ValidatedParams, Violation,
    };

    pub use ruo_middleware::{
        ErrorEnvelope, ErrorRenderer, PipelineAbort, RequestContext, StageTimings,
    };

    pub use ruo_config::{ConfigLoader, RuoConfig};

    pub use ruo_server::ShutdownSignal;
}
