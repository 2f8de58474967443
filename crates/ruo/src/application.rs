//! The application object.
//!
//! An [`Application`] is built once from an API definition, a set of
//! operation handlers and a set of security schemes. Building checks that
//! these agree with each other and reports every mismatch at once. After
//! that the application is immutable and shared by every request.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use ruo_config::{ConfigError, DocsConfig, PipelineConfig, RuoConfig};
use ruo_core::{
    ApiDefinition, BoxFuture, DefinitionLoader, HandlerRegistry, JsonSchemaValidator,
    OperationCatalog, OperationHandler, SchemaValidator, SecurityScheme, SecuritySchemeRegistry,
};
use ruo_middleware::{
    ErrorRenderer, FunnelOptions, Hooks, JsonErrorRenderer, Pipeline, PipelineAbort,
    PipelineComponents, PipelineOptions, Request, RequestContext, Response,
};
use ruo_server::{Dispatch, Server, ShutdownSignal};
use serde_json::Value;
use tokio::net::TcpListener;

use crate::error::{BindingProblem, StartupError};

/// A built, immutable application.
///
/// Cloning is cheap; clones share the pipeline.
///
/// # Example
///
/// ```
/// use ruo::prelude::*;
/// use ruo::core::fixtures;
/// use serde_json::json;
///
/// async fn reply(_inv: Invocation) -> Result<Reply, PipelineError> {
///     Ok(Reply::ok(json!({"id": "1", "name": "Ada"})))
/// }
///
/// let mut builder = Application::builder().definition(fixtures::users_definition());
/// for id in ["getUser", "getCurrentUser", "listUsers", "createUser", "deleteUser"] {
///     builder = builder.handler(id, reply);
/// }
/// let app = builder
///     .security_scheme("apiKey", |_req: SchemeRequest| async {
///         SchemeDecision::unauthenticated("no key")
///     })
///     .security_scheme("bearer", |_req: SchemeRequest| async {
///         SchemeDecision::unauthenticated("no token")
///     })
///     .build()
///     .unwrap();
///
/// assert_eq!(app.api_version(), "1.0.0");
/// ```
#[derive(Clone)]
pub struct Application {
    pipeline: Arc<Pipeline>,
    config: Arc<RuoConfig>,
    title: Arc<str>,
    api_version: Arc<str>,
}

impl Application {
    /// Creates a builder with default configuration.
    #[must_use]
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// Runs one request through the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineAbort`] when no response could be rendered.
    pub async fn handle(&self, request: Request) -> Result<Response, PipelineAbort> {
        self.pipeline.process(request).await
    }

    /// Returns the assembled pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Returns the configuration the application was built with.
    #[must_use]
    pub fn config(&self) -> &RuoConfig {
        &self.config
    }

    /// Returns the API title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the API version.
    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Installs the global tracing subscriber from the logging section.
    ///
    /// # Errors
    ///
    /// Fails if a subscriber is already installed or the level is invalid.
    pub fn init_logging(&self) -> Result<(), StartupError> {
        ruo_telemetry::init_logging(&self.config.logging)?;
        Ok(())
    }

    /// Returns the transport settings from the server section.
    #[must_use]
    pub fn server_config(&self) -> ruo_server::ServerConfig {
        let server = &self.config.server;
        ruo_server::ServerConfig::builder()
            .http_addr(server.http_addr.clone())
            .request_timeout(Duration::from_millis(server.request_timeout_ms))
            .shutdown_timeout(Duration::from_secs(server.shutdown_timeout_secs))
            .max_body_bytes(usize::try_from(server.max_body_bytes).unwrap_or(usize::MAX))
            .build()
    }

    /// Serves HTTP until SIGTERM or SIGINT.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured address cannot be bound.
    pub async fn serve(self) -> Result<(), StartupError> {
        self.serve_with_shutdown(ShutdownSignal::with_os_signals())
            .await
    }

    /// Serves HTTP until `shutdown` triggers.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured address cannot be bound.
    pub async fn serve_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), StartupError> {
        let server = Server::new(self.server_config(), Arc::new(self));
        server.run_with_shutdown(shutdown).await?;
        Ok(())
    }

    /// Serves HTTP on an already bound listener until `shutdown` triggers.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener's address cannot be read.
    pub async fn serve_listener(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), StartupError> {
        let server = Server::new(self.server_config(), Arc::new(self));
        server.serve(listener, shutdown).await?;
        Ok(())
    }
}

impl Dispatch for Application {
    fn dispatch(&self, request: Request) -> BoxFuture<'_, Result<Response, PipelineAbort>> {
        Box::pin(self.handle(request))
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("title", &self.title)
            .field("api_version", &self.api_version)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

enum DefinitionSource {
    Loaded(ApiDefinition),
    Path(PathBuf),
    Document(Value),
}

/// Builder for [`Application`].
#[must_use]
pub struct ApplicationBuilder {
    definition: Option<DefinitionSource>,
    config: RuoConfig,
    handlers: Vec<(String, Arc<dyn OperationHandler>)>,
    schemes: SecuritySchemeRegistry,
    validator: Arc<dyn SchemaValidator>,
    hooks: Hooks,
    renderer: Arc<dyn ErrorRenderer>,
}

impl ApplicationBuilder {
    /// Creates a builder with default configuration, the JSON schema
    /// validator and the JSON error renderer.
    pub fn new() -> Self {
        Self {
            definition: None,
            config: RuoConfig::default(),
            handlers: Vec::new(),
            schemes: SecuritySchemeRegistry::new(),
            validator: Arc::new(JsonSchemaValidator::new()),
            hooks: Hooks::default(),
            renderer: Arc::new(JsonErrorRenderer),
        }
    }

    /// Uses an already loaded definition.
    pub fn definition(mut self, definition: ApiDefinition) -> Self {
        self.definition = Some(DefinitionSource::Loaded(definition));
        self
    }

    /// Loads the definition from a `.json`, `.yaml` or `.yml` file.
    pub fn definition_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.definition = Some(DefinitionSource::Path(path.into()));
        self
    }

    /// Loads the definition from a parsed document.
    pub fn definition_document(mut self, document: Value) -> Self {
        self.definition = Some(DefinitionSource::Document(document));
        self
    }

    /// Sets the configuration.
    ///
    /// `definition.path` is used when no definition is given directly.
    pub fn config(mut self, config: RuoConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds a handler to an operation id.
    pub fn handler(
        mut self,
        operation_id: impl Into<String>,
        handler: impl OperationHandler,
    ) -> Self {
        self.handlers.push((operation_id.into(), Arc::new(handler)));
        self
    }

    /// Registers a security scheme under the name the definition uses.
    pub fn security_scheme(mut self, name: impl Into<String>, scheme: impl SecurityScheme) -> Self {
        self.schemes.insert(name, scheme);
        self
    }

    /// Replaces the schema validator.
    pub fn validator(mut self, validator: impl SchemaValidator) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    /// Observes every request that reaches the handler, just before it runs.
    pub fn pre_handler_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&RequestContext) + Send + Sync + 'static,
    {
        self.hooks.pre_handler = Some(Arc::new(hook));
        self
    }

    /// Observes every reply, error replies included, before it is pruned.
    pub fn post_handler_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&RequestContext) + Send + Sync + 'static,
    {
        self.hooks.post_handler = Some(Arc::new(hook));
        self
    }

    /// Replaces the error renderer.
    pub fn error_renderer(mut self, renderer: impl ErrorRenderer) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    /// Builds the application.
    ///
    /// # Errors
    ///
    /// - [`StartupError::Config`] if the configuration is invalid
    /// - [`StartupError::MissingDefinition`] / [`StartupError::Definition`]
    ///   if the definition is absent or cannot be loaded
    /// - [`StartupError::Binding`] listing every mismatch between the
    ///   definition, the handlers and the security schemes
    pub fn build(self) -> Result<Application, StartupError> {
        self.config.validate()?;

        let definition = match self.definition {
            Some(DefinitionSource::Loaded(definition)) => definition,
            Some(DefinitionSource::Path(path)) => DefinitionLoader::from_path(path)?,
            Some(DefinitionSource::Document(document)) => DefinitionLoader::from_value(document)?,
            None => match &self.config.definition.path {
                Some(path) => DefinitionLoader::from_path(path)?,
                None => return Err(StartupError::MissingDefinition),
            },
        };

        let problems = binding_problems(&definition, &self.handlers, &self.schemes);
        if !problems.is_empty() {
            for problem in &problems {
                tracing::error!(%problem, "Startup check failed");
            }
            return Err(StartupError::Binding(problems));
        }

        let catalog = OperationCatalog::from_definition(&definition)?;
        let mut handlers = HandlerRegistry::new();
        for (operation_id, handler) in self.handlers {
            handlers.insert_arc(operation_id, handler);
        }

        let options = pipeline_options(&self.config.pipeline, &self.config.docs)?;
        let title: Arc<str> = definition.title().into();
        let api_version: Arc<str> = definition.version().into();

        tracing::info!(
            title = %title,
            api_version = %api_version,
            operations = catalog.len(),
            docs_path = options.docs_path.as_deref().unwrap_or("disabled"),
            "Application built"
        );

        let pipeline = Pipeline::standard(PipelineComponents {
            catalog: Arc::new(catalog),
            handlers: Arc::new(handlers),
            schemes: Arc::new(self.schemes),
            validator: self.validator,
            api_version: api_version.to_string(),
            document: Arc::clone(definition.document()),
            hooks: self.hooks,
            renderer: self.renderer,
            options,
        });

        Ok(Application {
            pipeline: Arc::new(pipeline),
            config: Arc::new(self.config),
            title,
            api_version,
        })
    }
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ApplicationBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers: Vec<&str> = self.handlers.iter().map(|(id, _)| id.as_str()).collect();
        f.debug_struct("ApplicationBuilder")
            .field("config", &self.config)
            .field("handlers", &handlers)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

/// Every mismatch between the definition and the registrations, in a
/// stable order: operations first, then handlers, then schemes.
fn binding_problems(
    definition: &ApiDefinition,
    handlers: &[(String, Arc<dyn OperationHandler>)],
    schemes: &SecuritySchemeRegistry,
) -> Vec<BindingProblem> {
    let mut problems = Vec::new();

    let mut declared = HashSet::new();
    for operation in definition.operations() {
        let id = operation.operation_id();
        if !declared.insert(id) {
            problems.push(BindingProblem::DuplicateOperation(id.to_string()));
        }
    }

    let mut bound = HashSet::new();
    for (id, _) in handlers {
        if !bound.insert(id.as_str()) {
            problems.push(BindingProblem::DuplicateHandler(id.clone()));
        } else if !declared.contains(id.as_str()) {
            problems.push(BindingProblem::UnknownOperation(id.clone()));
        }
    }

    let mut reported = HashSet::new();
    for operation in definition.operations() {
        let id = operation.operation_id();
        if !bound.contains(id) && reported.insert(id) {
            problems.push(BindingProblem::MissingHandler(id.to_string()));
        }
    }

    for name in definition.referenced_schemes() {
        if !schemes.contains(name) {
            problems.push(BindingProblem::UnregisteredScheme(name.to_string()));
        }
    }

    problems
}

fn pipeline_options(
    pipeline: &PipelineConfig,
    docs: &DocsConfig,
) -> Result<PipelineOptions, ConfigError> {
    let status = |field: &str, code: u16| {
        StatusCode::from_u16(code).map_err(|e| ConfigError::invalid_value(field, e.to_string()))
    };

    Ok(PipelineOptions {
        docs_path: docs.enabled.then(|| docs.path.clone()),
        validate_responses: pipeline.validate_responses,
        funnel: FunnelOptions {
            expose_internal_errors: pipeline.expose_internal_errors,
            unauthenticated_status: status(
                "pipeline.unauthenticated_status",
                pipeline.unauthenticated_status,
            )?,
            forbidden_status: status("pipeline.forbidden_status", pipeline.forbidden_status)?,
        },
    })
}
