//! # Ruo Server
//!
//! HTTP/1.1 transport for the Ruo request pipeline.
//!
//! - Accept loop on a Tokio `TcpListener`, one task per connection
//! - Request bodies collected up front, bounded by a timeout
//! - Graceful shutdown on SIGTERM/SIGINT or a programmatic signal
//! - Connections closed without a reply when the pipeline aborts
//!
//! The server knows nothing about operations or stages. It hands each
//! collected request to a [`Dispatch`] implementation, normally a
//! [`Pipeline`](ruo_middleware::Pipeline) or the application facade.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ruo_server::{Server, ServerConfig, ShutdownSignal};
//!
//! let server = Server::new(
//!     ServerConfig::builder().http_addr("127.0.0.1:8080").build(),
//!     Arc::new(pipeline),
//! );
//! server.run_with_shutdown(ShutdownSignal::with_os_signals()).await?;
//! ```

#![doc(html_root_url = "https://docs.rs/ruo-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod server;
pub mod shutdown;

// Re-export main types at crate root
pub use config::{ServerConfig, ServerConfigBuilder};
pub use dispatch::Dispatch;
pub use error::ServerError;
pub use server::{bind, Server};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownReceiver, ShutdownSignal};
