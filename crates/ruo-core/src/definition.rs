//! The in-memory operation model.
//!
//! An [`ApiDefinition`] is what the [`DefinitionLoader`](crate::DefinitionLoader)
//! produces from a document and what the catalog is built from. Every type
//! here is immutable once built.

use http::Method;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Where a parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    /// A `{name}` segment of the path template.
    Path,
    /// A query string key.
    Query,
    /// A request header (matched case-insensitively).
    Header,
    /// The request body.
    Body,
}

impl ParameterLocation {
    /// Returns the location name used in violation pointers.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Body => "body",
        }
    }
}

impl std::fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared path, query or header parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    /// Parameter name.
    pub name: String,
    /// Where it is read from.
    pub location: ParameterLocation,
    /// Whether it must be present. Path parameters are always required.
    pub required: bool,
    /// JSON schema for the coerced value.
    pub schema: Value,
}

impl ParameterSpec {
    /// Creates a parameter spec.
    #[must_use]
    pub fn new(name: impl Into<String>, location: ParameterLocation, schema: Value) -> Self {
        Self {
            name: name.into(),
            location,
            required: location == ParameterLocation::Path,
            schema,
        }
    }

    /// Marks the parameter as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// A declared JSON request body.
#[derive(Debug, Clone, PartialEq)]
pub struct BodySpec {
    /// Whether a body must be sent.
    pub required: bool,
    /// JSON schema for the body.
    pub schema: Value,
}

/// One scheme of a requirement set, with the scopes it must grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeRequirement {
    /// Name of a registered security scheme.
    pub scheme: String,
    /// Scopes the scheme must grant.
    pub scopes: Vec<String>,
}

/// One alternative way to satisfy an operation's security.
///
/// Every scheme must accept (AND). An empty set is satisfied by anyone,
/// which is how a document expresses optional authentication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityRequirementSet {
    /// Schemes that must all accept.
    pub schemes: Vec<SchemeRequirement>,
}

impl SecurityRequirementSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a scheme with no scopes.
    #[must_use]
    pub fn scheme(self, scheme: impl Into<String>) -> Self {
        self.scheme_with_scopes(scheme, Vec::<String>::new())
    }

    /// Adds a scheme with required scopes.
    #[must_use]
    pub fn scheme_with_scopes<I, S>(mut self, scheme: impl Into<String>, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schemes.push(SchemeRequirement {
            scheme: scheme.into(),
            scopes: scopes.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Returns the scheme names in declaration order.
    pub fn scheme_names(&self) -> impl Iterator<Item = &str> {
        self.schemes.iter().map(|s| s.scheme.as_str())
    }
}

/// One declared API operation.
///
/// # Example
///
/// ```
/// use ruo_core::{OperationDescriptor, ParameterLocation, ParameterSpec};
/// use http::Method;
/// use serde_json::json;
///
/// let op = OperationDescriptor::builder("getUser")
///     .method(Method::GET)
///     .path("/users/{id}")
///     .parameter(ParameterSpec::new("id", ParameterLocation::Path, json!({"type": "string"})))
///     .response("200", json!({"type": "object"}))
///     .build();
///
/// assert_eq!(op.operation_id(), "getUser");
/// assert!(op.response_schema(200).is_some());
/// assert!(op.security().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    operation_id: String,
    method: Method,
    path: String,
    summary: Option<String>,
    tags: Vec<String>,
    parameters: Vec<ParameterSpec>,
    body: Option<BodySpec>,
    responses: IndexMap<String, Option<Value>>,
    security: Vec<SecurityRequirementSet>,
}

impl OperationDescriptor {
    /// Creates a builder for an operation.
    #[must_use]
    pub fn builder(operation_id: impl Into<String>) -> OperationBuilder {
        OperationBuilder::new(operation_id)
    }

    /// Returns the operation key.
    #[must_use]
    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    /// Returns the HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the path template.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the summary, if declared.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Returns the tags.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Returns the path, query and header parameters.
    #[must_use]
    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    /// Returns the request body declaration.
    #[must_use]
    pub const fn body(&self) -> Option<&BodySpec> {
        self.body.as_ref()
    }

    /// Returns the declared responses keyed by status text.
    #[must_use]
    pub const fn responses(&self) -> &IndexMap<String, Option<Value>> {
        &self.responses
    }

    /// Returns the requirement sets; empty means no security.
    #[must_use]
    pub fn security(&self) -> &[SecurityRequirementSet] {
        &self.security
    }

    /// Returns the response schema for a status code.
    ///
    /// Looks up the exact code, then the `NXX` range, then `default`.
    #[must_use]
    pub fn response_schema(&self, status: u16) -> Option<&Value> {
        let exact = status.to_string();
        let range = format!("{}XX", status / 100);
        self.responses
            .get(&exact)
            .or_else(|| {
                self.responses
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(&range))
                    .map(|(_, schema)| schema)
            })
            .or_else(|| self.responses.get("default"))
            .and_then(Option::as_ref)
    }
}

/// Builder for [`OperationDescriptor`].
#[derive(Debug, Clone)]
pub struct OperationBuilder {
    inner: OperationDescriptor,
}

impl OperationBuilder {
    /// Creates a builder with `GET /` defaults.
    #[must_use]
    pub fn new(operation_id: impl Into<String>) -> Self {
        Self {
            inner: OperationDescriptor {
                operation_id: operation_id.into(),
                method: Method::GET,
                path: "/".to_string(),
                summary: None,
                tags: Vec::new(),
                parameters: Vec::new(),
                body: None,
                responses: IndexMap::new(),
                security: Vec::new(),
            },
        }
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.inner.method = method;
        self
    }

    /// Sets the path template.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.inner.path = path.into();
        self
    }

    /// Sets the summary.
    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.inner.summary = Some(summary.into());
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.inner.tags.push(tag.into());
        self
    }

    /// Adds a path, query or header parameter.
    ///
    /// A later parameter with the same name and location replaces an
    /// earlier one, which is how operation parameters override path-level
    /// ones.
    #[must_use]
    pub fn parameter(mut self, parameter: ParameterSpec) -> Self {
        self.inner
            .parameters
            .retain(|p| !(p.name == parameter.name && p.location == parameter.location));
        self.inner.parameters.push(parameter);
        self
    }

    /// Declares a JSON request body.
    #[must_use]
    pub fn body(mut self, schema: Value, required: bool) -> Self {
        self.inner.body = Some(BodySpec { required, schema });
        self
    }

    /// Declares a response with a JSON schema.
    #[must_use]
    pub fn response(mut self, status: impl Into<String>, schema: Value) -> Self {
        self.inner.responses.insert(status.into(), Some(schema));
        self
    }

    /// Declares a response without a body schema.
    #[must_use]
    pub fn empty_response(mut self, status: impl Into<String>) -> Self {
        self.inner.responses.insert(status.into(), None);
        self
    }

    /// Adds an alternative requirement set.
    #[must_use]
    pub fn security(mut self, set: SecurityRequirementSet) -> Self {
        self.inner.security.push(set);
        self
    }

    /// Builds the descriptor.
    #[must_use]
    pub fn build(self) -> OperationDescriptor {
        self.inner
    }
}

/// A loaded API definition.
#[derive(Debug, Clone)]
pub struct ApiDefinition {
    title: String,
    version: String,
    operations: Vec<OperationDescriptor>,
    security_schemes: Vec<String>,
    document: Arc<Value>,
}

impl ApiDefinition {
    /// Creates a definition from already-built operations.
    ///
    /// `document` is what the documentation stage serves.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        version: impl Into<String>,
        operations: Vec<OperationDescriptor>,
        security_schemes: Vec<String>,
        document: Value,
    ) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            operations,
            security_schemes,
            document: Arc::new(document),
        }
    }

    /// Returns the API title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the API version string (`info.version`).
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the declared operations in document order.
    #[must_use]
    pub fn operations(&self) -> &[OperationDescriptor] {
        &self.operations
    }

    /// Returns the names of the declared security schemes.
    #[must_use]
    pub fn security_schemes(&self) -> &[String] {
        &self.security_schemes
    }

    /// Returns the original document.
    #[must_use]
    pub fn document(&self) -> &Arc<Value> {
        &self.document
    }

    /// Returns every scheme name referenced by any operation, deduplicated.
    #[must_use]
    pub fn referenced_schemes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for set in self.operations.iter().flat_map(OperationDescriptor::security) {
            for name in set.scheme_names() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Consumes the definition, returning its operations.
    #[must_use]
    pub fn into_operations(self) -> Vec<OperationDescriptor> {
        self.operations
    }
}
