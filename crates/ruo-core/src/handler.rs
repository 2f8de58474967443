//! Business handler binding.
//!
//! Each declared operation is bound to exactly one [`OperationHandler`] by
//! its operation id. Handlers receive an [`Invocation`] carrying the
//! validated, coerced inputs and return a [`Reply`] or a [`PipelineError`].

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use http::{HeaderMap, Method, Uri};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::definition::{OperationDescriptor, ParameterLocation};
use crate::error::{PipelineError, Violation};
use crate::principal::Principal;
use crate::reply::Reply;
use crate::request_id::RequestId;
use crate::BoxFuture;

/// Parameter values after coercion and validation.
///
/// Only declared parameters appear here, already converted to the type
/// their schema names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedParams {
    path: Map<String, Value>,
    query: Map<String, Value>,
    header: Map<String, Value>,
    body: Option<Value>,
}

impl ValidatedParams {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a validated value. A `Body` location replaces the body.
    pub fn insert(&mut self, location: ParameterLocation, name: impl Into<String>, value: Value) {
        match location {
            ParameterLocation::Path => {
                self.path.insert(name.into(), value);
            }
            ParameterLocation::Query => {
                self.query.insert(name.into(), value);
            }
            ParameterLocation::Header => {
                self.header.insert(name.into(), value);
            }
            ParameterLocation::Body => self.body = Some(value),
        }
    }

    /// Returns a value by location and name.
    #[must_use]
    pub fn get(&self, location: ParameterLocation, name: &str) -> Option<&Value> {
        match location {
            ParameterLocation::Path => self.path.get(name),
            ParameterLocation::Query => self.query.get(name),
            ParameterLocation::Header => self.header.get(name),
            ParameterLocation::Body => self.body.as_ref(),
        }
    }

    /// Returns a path parameter.
    #[must_use]
    pub fn path(&self, name: &str) -> Option<&Value> {
        self.path.get(name)
    }

    /// Returns a query parameter.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&Value> {
        self.query.get(name)
    }

    /// Returns a header parameter.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&Value> {
        self.header.get(name)
    }

    /// Returns the body.
    #[must_use]
    pub const fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

/// Everything a handler receives for one call.
#[derive(Debug, Clone)]
pub struct Invocation {
    request_id: RequestId,
    operation: Arc<OperationDescriptor>,
    api_version: Arc<str>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    params: ValidatedParams,
    principal: Option<Principal>,
}

impl Invocation {
    /// Creates an invocation for an operation.
    #[must_use]
    pub fn new(
        request_id: RequestId,
        operation: Arc<OperationDescriptor>,
        api_version: Arc<str>,
    ) -> Self {
        Self {
            request_id,
            method: operation.method().clone(),
            operation,
            api_version,
            uri: Uri::default(),
            headers: HeaderMap::new(),
            params: ValidatedParams::new(),
            principal: None,
        }
    }

    /// Attaches the request line and headers.
    #[must_use]
    pub fn with_request(mut self, method: Method, uri: Uri, headers: HeaderMap) -> Self {
        self.method = method;
        self.uri = uri;
        self.headers = headers;
        self
    }

    /// Attaches validated parameters.
    #[must_use]
    pub fn with_params(mut self, params: ValidatedParams) -> Self {
        self.params = params;
        self
    }

    /// Attaches the authenticated principal.
    #[must_use]
    pub fn with_principal(mut self, principal: Option<Principal>) -> Self {
        self.principal = principal;
        self
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the operation being invoked.
    #[must_use]
    pub fn operation(&self) -> &OperationDescriptor {
        &self.operation
    }

    /// Returns the API version string.
    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Returns the request method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub const fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the raw request headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns all validated parameters.
    #[must_use]
    pub const fn params(&self) -> &ValidatedParams {
        &self.params
    }

    /// Returns the principal established by security dispatch.
    #[must_use]
    pub const fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Returns a path parameter as a string.
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.params.path(name).and_then(Value::as_str)
    }

    /// Deserializes the validated body.
    ///
    /// The body already passed schema validation, so a failure here means
    /// the Rust type is stricter than the schema; it is reported at `/body`.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, PipelineError> {
        let body = self.params.body().cloned().unwrap_or(Value::Null);
        serde_json::from_value(body).map_err(|e| {
            PipelineError::validation(vec![Violation::new("/body", e.to_string())])
        })
    }
}

/// A business handler bound to one operation.
///
/// Implemented for any `Fn(Invocation) -> impl Future<Output = Result<Reply,
/// PipelineError>>`, so async closures and functions work directly.
///
/// # Example
///
/// ```
/// use ruo_core::{HandlerRegistry, Invocation, PipelineError, Reply};
/// use serde_json::json;
///
/// async fn get_user(inv: Invocation) -> Result<Reply, PipelineError> {
///     let id = inv.path_param("id").unwrap_or_default().to_string();
///     Ok(Reply::ok(json!({"id": id, "name": "A"})))
/// }
///
/// let mut handlers = HandlerRegistry::new();
/// handlers.insert("getUser", get_user);
/// assert!(handlers.contains("getUser"));
/// ```
pub trait OperationHandler: Send + Sync + 'static {
    /// Handles one invocation.
    fn call(&self, invocation: Invocation) -> BoxFuture<'static, Result<Reply, PipelineError>>;
}

impl<F, Fut> OperationHandler for F
where
    F: Fn(Invocation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Reply, PipelineError>> + Send + 'static,
{
    fn call(&self, invocation: Invocation) -> BoxFuture<'static, Result<Reply, PipelineError>> {
        Box::pin(self(invocation))
    }
}

/// Operation id → handler bindings.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn OperationHandler>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a handler, returning true if it replaced an earlier binding.
    pub fn insert(
        &mut self,
        operation_id: impl Into<String>,
        handler: impl OperationHandler,
    ) -> bool {
        self.insert_arc(operation_id, Arc::new(handler))
    }

    /// Binds an already shared handler.
    pub fn insert_arc(
        &mut self,
        operation_id: impl Into<String>,
        handler: Arc<dyn OperationHandler>,
    ) -> bool {
        self.handlers.insert(operation_id.into(), handler).is_some()
    }

    /// Returns the handler for an operation.
    #[must_use]
    pub fn get(&self, operation_id: &str) -> Option<&Arc<dyn OperationHandler>> {
        self.handlers.get(operation_id)
    }

    /// Returns true if a handler is bound to the operation.
    #[must_use]
    pub fn contains(&self, operation_id: &str) -> bool {
        self.handlers.contains_key(operation_id)
    }

    /// Iterates over bound operation ids.
    pub fn operation_ids(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Returns the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.operation_ids().collect();
        ids.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("operations", &ids)
            .finish()
    }
}
