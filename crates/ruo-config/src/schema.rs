//! Configuration section types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Server configuration section.
///
/// # Example
///
/// ```
/// use ruo_config::ServerConfig;
///
/// let config = ServerConfig {
///     http_addr: "127.0.0.1:3000".to_string(),
///     ..Default::default()
/// };
/// assert_eq!(config.request_timeout_ms, 30000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// HTTP server bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Time allowed for receiving a request body, in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Largest request body accepted, in bytes. Larger bodies get a 413.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            request_timeout_ms: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_request_timeout() -> u64 {
    30000
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_max_body_bytes() -> u64 {
    2 * 1024 * 1024
}

/// Location of the API definition document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct DefinitionConfig {
    /// Path to a `.json`, `.yaml` or `.yml` document.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Documentation endpoint section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DocsConfig {
    /// Serve the API definition document.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Path the document is served on.
    #[serde(default = "default_docs_path")]
    pub path: String,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_docs_path(),
        }
    }
}

fn default_docs_path() -> String {
    "/api-docs".to_string()
}

/// Request pipeline section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Send handler and internal error messages to clients.
    #[serde(default)]
    pub expose_internal_errors: bool,

    /// Check pruned replies against their response schema and log mismatches.
    #[serde(default = "default_true")]
    pub validate_responses: bool,

    /// Status for requests without acceptable credentials.
    #[serde(default = "default_unauthenticated_status")]
    pub unauthenticated_status: u16,

    /// Status for requests whose credentials lack permission.
    #[serde(default = "default_forbidden_status")]
    pub forbidden_status: u16,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            expose_internal_errors: false,
            validate_responses: true,
            unauthenticated_status: default_unauthenticated_status(),
            forbidden_status: default_forbidden_status(),
        }
    }
}

fn default_unauthenticated_status() -> u16 {
    401
}

fn default_forbidden_status() -> u16 {
    403
}

fn default_true() -> bool {
    true
}
