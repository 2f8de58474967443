//! Per-request context.
//!
//! A [`RequestContext`] is created by the [`ContextBinder`](crate::binder::ContextBinder)
//! for every request, threaded by `&mut` through each stage, and dropped
//! once the response is built. It is never shared between requests.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use http::Method;
use ruo_core::{OperationDescriptor, Principal, RequestId, ResolvedOperation, ValidatedParams};
use ruo_router::Params;

/// Mutable state for one request.
///
/// # Example
///
/// ```
/// use ruo_middleware::context::RequestContext;
/// use ruo_core::RequestId;
/// use http::Method;
///
/// #[derive(Debug, PartialEq)]
/// struct Attempt(u32);
///
/// let mut ctx = RequestContext::new(RequestId::new(), "1.0.0".into(), Method::GET, "/users");
/// assert!(ctx.operation().is_none());
///
/// ctx.set_extension(Attempt(1));
/// assert_eq!(ctx.get_extension::<Attempt>(), Some(&Attempt(1)));
/// ```
#[derive(Debug)]
pub struct RequestContext {
    request_id: RequestId,
    api_version: Arc<str>,
    method: Method,
    path: String,
    operation: Option<Arc<OperationDescriptor>>,
    path_params: Params,
    started_at: Instant,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl RequestContext {
    /// Creates a context for a request.
    #[must_use]
    pub fn new(
        request_id: RequestId,
        api_version: Arc<str>,
        method: Method,
        path: impl Into<String>,
    ) -> Self {
        Self {
            request_id,
            api_version,
            method,
            path: path.into(),
            operation: None,
            path_params: Params::new(),
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the API version string.
    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Returns the shared API version string.
    #[must_use]
    pub fn api_version_arc(&self) -> Arc<str> {
        Arc::clone(&self.api_version)
    }

    /// Returns the request method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path, without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the resolved operation, if any.
    #[must_use]
    pub const fn operation(&self) -> Option<&Arc<OperationDescriptor>> {
        self.operation.as_ref()
    }

    /// Returns the resolved operation id, if any.
    #[must_use]
    pub fn operation_id(&self) -> Option<&str> {
        self.operation.as_deref().map(OperationDescriptor::operation_id)
    }

    /// Records the resolved operation and its raw path parameters.
    ///
    /// Set by the resolution stage.
    pub fn set_operation(&mut self, resolved: ResolvedOperation) {
        self.operation = Some(resolved.operation);
        self.path_params = resolved.path_params;
    }

    /// Returns the raw, percent-decoded path parameters.
    #[must_use]
    pub const fn path_params(&self) -> &Params {
        &self.path_params
    }

    /// Returns the principal established by security dispatch.
    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        self.get_extension::<Principal>()
    }

    /// Returns the validated parameters, once request validation ran.
    #[must_use]
    pub fn validated_params(&self) -> Option<&ValidatedParams> {
        self.get_extension::<ValidatedParams>()
    }

    /// Returns when the context was bound.
    #[must_use]
    pub const fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the elapsed time since the context was bound.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed extension value, replacing any previous one.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Retrieves a typed extension value for modification.
    pub fn get_extension_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.extensions
            .get_mut(&TypeId::of::<T>())
            .and_then(|v| v.downcast_mut())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Checks if an extension of the given type exists.
    #[must_use]
    pub fn has_extension<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ruo_core::fixtures;
    use ruo_core::OperationCatalog;

    fn context() -> RequestContext {
        RequestContext::new(RequestId::new(), Arc::from("1.0.0"), Method::GET, "/users/7")
    }

    #[test]
    fn test_set_operation() {
        let catalog = OperationCatalog::from_definition(&fixtures::users_definition()).unwrap();
        let mut ctx = context();
        assert!(ctx.operation_id().is_none());

        ctx.set_operation(catalog.resolve(&Method::GET, "/users/7").unwrap());
        assert_eq!(ctx.operation_id(), Some("getUser"));
        assert_eq!(ctx.path_params().get("id"), Some("7"));
    }

    #[test]
    fn test_extensions() {
        #[derive(Debug, PartialEq)]
        struct Counter(u32);

        let mut ctx = context();
        assert!(!ctx.has_extension::<Counter>());

        ctx.set_extension(Counter(1));
        if let Some(counter) = ctx.get_extension_mut::<Counter>() {
            counter.0 += 1;
        }
        assert_eq!(ctx.get_extension::<Counter>(), Some(&Counter(2)));
        assert_eq!(ctx.remove_extension::<Counter>(), Some(Counter(2)));
        assert!(!ctx.has_extension::<Counter>());
    }

    #[test]
    fn test_principal_is_an_extension() {
        let mut ctx = context();
        assert!(ctx.principal().is_none());
        ctx.set_extension(Principal::user("u1", ["admin"]));
        assert_eq!(ctx.principal().unwrap().log_id(), "user:u1");
    }

    #[test]
    fn test_api_version() {
        let ctx = context();
        assert_eq!(ctx.api_version(), "1.0.0");
        assert!(Arc::ptr_eq(&ctx.api_version_arc(), &ctx.api_version_arc()));
    }
}
