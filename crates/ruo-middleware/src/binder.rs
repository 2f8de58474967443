//! Context binding.
//!
//! The binder is the entry step of every request: it creates the
//! [`RequestContext`] before any stage runs.

use std::sync::Arc;

use ruo_core::RequestId;

use crate::context::RequestContext;
use crate::types::{Request, REQUEST_ID_HEADER};

/// Creates a fresh [`RequestContext`] per request.
#[derive(Debug, Clone)]
pub struct ContextBinder {
    api_version: Arc<str>,
}

impl ContextBinder {
    /// Creates a binder stamping contexts with `api_version`.
    #[must_use]
    pub fn new(api_version: impl Into<Arc<str>>) -> Self {
        Self {
            api_version: api_version.into(),
        }
    }

    /// Returns the API version stamped on every context.
    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Binds a context for `request`.
    ///
    /// A well-formed UUID in `x-request-id` is adopted; anything else gets
    /// a freshly generated id.
    #[must_use]
    pub fn bind(&self, request: &Request) -> RequestContext {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(RequestId::from_header)
            .unwrap_or_default();

        RequestContext::new(
            request_id,
            Arc::clone(&self.api_version),
            request.method().clone(),
            request.uri().path(),
        )
    }
}
