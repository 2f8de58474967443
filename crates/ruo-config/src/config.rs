//! The root configuration type and its builder.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, DefinitionConfig, DocsConfig, LogConfig, PipelineConfig, ServerConfig};

/// Complete Ruo service configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use ruo_config::RuoConfig;
///
/// let config = RuoConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert_eq!(config.docs.path, "/api-docs");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct RuoConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LogConfig,

    /// API definition document.
    #[serde(default)]
    pub definition: DefinitionConfig,

    /// Documentation endpoint.
    #[serde(default)]
    pub docs: DocsConfig,

    /// Request pipeline behavior.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl RuoConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> RuoConfigBuilder {
        RuoConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if:
    /// - The server address is not a socket address
    /// - The request timeout is zero
    /// - The body size limit is zero
    /// - A denial status is not a 4xx status
    /// - The docs path does not start with `/`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.http_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "server.request_timeout_ms",
                "must be greater than zero",
            ));
        }

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_body_bytes",
                "must be greater than zero",
            ));
        }

        for (field, status) in [
            ("pipeline.unauthenticated_status", self.pipeline.unauthenticated_status),
            ("pipeline.forbidden_status", self.pipeline.forbidden_status),
        ] {
            if !(400..500).contains(&status) {
                return Err(ConfigError::invalid_value(
                    field,
                    format!("{status} is not a client error status"),
                ));
            }
        }

        if self.docs.enabled && !self.docs.path.starts_with('/') {
            return Err(ConfigError::invalid_value(
                "docs.path",
                format!("'{}' must start with '/'", self.docs.path),
            ));
        }

        Ok(())
    }

    /// Development preset: pretty debug logs, internal errors exposed.
    ///
    /// # Example
    ///
    /// ```
    /// use ruo_config::RuoConfig;
    ///
    /// let config = RuoConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// assert!(config.pipeline.expose_internal_errors);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        Self {
            logging: LogConfig::development(),
            pipeline: PipelineConfig {
                expose_internal_errors: true,
                ..PipelineConfig::default()
            },
            ..Self::default()
        }
    }

    /// Production preset: JSON logs at info, internal errors hidden.
    ///
    /// # Example
    ///
    /// ```
    /// use ruo_config::{LogFormat, RuoConfig};
    ///
    /// let config = RuoConfig::production();
    /// assert_eq!(config.logging.format, LogFormat::Json);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        Self {
            logging: LogConfig::production(),
            ..Self::default()
        }
    }
}

/// Builder for [`RuoConfig`].
#[derive(Debug, Default)]
pub struct RuoConfigBuilder {
    server: Option<ServerConfig>,
    logging: Option<LogConfig>,
    definition: Option<DefinitionConfig>,
    docs: Option<DocsConfig>,
    pipeline: Option<PipelineConfig>,
}

impl RuoConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server configuration.
    #[must_use]
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.server = Some(server);
        self
    }

    /// Set the logging configuration.
    #[must_use]
    pub fn logging(mut self, logging: LogConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Set the definition configuration.
    #[must_use]
    pub fn definition(mut self, definition: DefinitionConfig) -> Self {
        self.definition = Some(definition);
        self
    }

    /// Set the docs configuration.
    #[must_use]
    pub fn docs(mut self, docs: DocsConfig) -> Self {
        self.docs = Some(docs);
        self
    }

    /// Set the pipeline configuration.
    #[must_use]
    pub fn pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Build the configuration. Unset sections use their defaults.
    #[must_use]
    pub fn build(self) -> RuoConfig {
        RuoConfig {
            server: self.server.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
            definition: self.definition.unwrap_or_default(),
            docs: self.docs.unwrap_or_default(),
            pipeline: self.pipeline.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<RuoConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
