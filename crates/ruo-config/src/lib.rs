//! Typed configuration for Ruo services.
//!
//! Configuration is applied in layers, later layers overriding earlier ones:
//!
//! 1. Built-in defaults (or a development/production preset)
//! 2. A TOML or JSON file, chosen by extension
//! 3. Environment variables of the form `RUO__SECTION__KEY`
//!
//! Unknown fields are rejected at every layer, and the final result is
//! checked by [`RuoConfig::validate`].
//!
//! # File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! request_timeout_ms = 30000
//! shutdown_timeout_secs = 30
//! max_body_bytes = 2097152
//!
//! [logging]
//! level = "info"
//! format = "json"
//! service_name = "users"
//!
//! [definition]
//! path = "api/users.yaml"
//!
//! [docs]
//! enabled = true
//! path = "/api-docs"
//!
//! [pipeline]
//! expose_internal_errors = false
//! validate_responses = true
//! unauthenticated_status = 401
//! forbidden_status = 403
//! ```
//!
//! # Example
//!
//! ```no_run
//! use ruo_config::ConfigLoader;
//!
//! # fn main() -> Result<(), ruo_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_file("ruo.toml")?
//!     .with_env_prefix("RUO")
//!     .load()?;
//!
//! println!("listening on {}", config.server.http_addr);
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/ruo-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

// Re-export main types at crate root
pub use config::{RuoConfig, RuoConfigBuilder};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use ruo_telemetry::{LogConfig, LogFormat};
pub use schema::{DefinitionConfig, DocsConfig, PipelineConfig, ServerConfig};
