//! Structured logging for Ruo services.
//!
//! Every Ruo crate logs through the `tracing` macros. This crate installs the
//! subscriber that turns those events into output:
//!
//! - **JSON** lines for production, one object per event
//! - **Pretty** multi-line output for development
//!
//! Both formats are filtered by an [`EnvFilter`](tracing_subscriber::EnvFilter)
//! built from [`LogConfig::level`], so directives such as
//! `"info,ruo_middleware=debug"` work as expected.
//!
//! # Example
//!
//! ```rust,ignore
//! use ruo_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(operation_id = "getUser", "Processing request");
//! ```
//!
//! # Standard Fields
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `request_id` | Request identifier, also sent as `x-request-id` |
//! | `operation_id` | Resolved operation, `-` when none matched |
//! | `http.method` | Request method |
//! | `http.path` | Request path |
//! | `http.status_code` | Response status |
//! | `duration_ms` | Time since the context was bound |
//! | `error.kind` | Error kind for failed requests |

#![doc(html_root_url = "https://docs.rs/ruo-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

// Re-export main types at crate root
pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
