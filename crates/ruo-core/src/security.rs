//! Pluggable security schemes.
//!
//! A [`SecurityScheme`] is registered under the name an API definition uses
//! in its `security` requirements. The pipeline's security dispatcher calls
//! the schemes a requirement set names and combines their decisions.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use http::{HeaderMap, Method, Uri};

use crate::error::DenialKind;
use crate::principal::Principal;
use crate::BoxFuture;

/// What a scheme sees of the request.
#[derive(Debug, Clone)]
pub struct SchemeRequest {
    /// Request method.
    pub method: Method,
    /// Request URI, including the query string.
    pub uri: Uri,
    /// Request headers.
    pub headers: HeaderMap,
    /// The operation being authorized.
    pub operation_id: String,
    /// Scopes the requirement asks this scheme to grant.
    pub scopes: Vec<String>,
}

impl SchemeRequest {
    /// Returns a header value as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the token of an `Authorization: Bearer <token>` header.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        let value = self.header("authorization")?;
        let (scheme, token) = value.split_once(' ')?;
        scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
    }
}

/// Why a scheme rejected a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    /// Client-facing reason.
    pub reason: String,
    /// Unauthenticated or forbidden.
    pub kind: DenialKind,
}

/// The decision of one scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemeDecision {
    /// The scheme accepts the request as this principal.
    Allowed(Principal),
    /// The scheme rejects the request.
    Denied(Denial),
}

impl SchemeDecision {
    /// Denies because credentials are missing or invalid.
    #[must_use]
    pub fn unauthenticated(reason: impl Into<String>) -> Self {
        Self::Denied(Denial {
            reason: reason.into(),
            kind: DenialKind::Unauthenticated,
        })
    }

    /// Denies because the credentials are insufficient.
    #[must_use]
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Denied(Denial {
            reason: reason.into(),
            kind: DenialKind::Forbidden,
        })
    }
}

/// An authorization capability.
///
/// Schemes may suspend, for example to introspect a token remotely. Any
/// failure of their own must be mapped to a [`SchemeDecision::Denied`].
///
/// # Example
///
/// ```
/// use ruo_core::{Principal, SchemeDecision, SchemeRequest, SecuritySchemeRegistry};
///
/// let mut schemes = SecuritySchemeRegistry::new();
/// schemes.insert("apiKey", |req: SchemeRequest| async move {
///     match req.header("x-api-key") {
///         Some("secret") => {
///             SchemeDecision::Allowed(Principal::api_key("k1", Vec::<String>::new()))
///         }
///         Some(_) => SchemeDecision::unauthenticated("invalid api key"),
///         None => SchemeDecision::unauthenticated("missing api key"),
///     }
/// });
/// assert!(schemes.contains("apiKey"));
/// ```
pub trait SecurityScheme: Send + Sync + 'static {
    /// Decides whether the request satisfies this scheme.
    fn authorize(&self, request: SchemeRequest) -> BoxFuture<'static, SchemeDecision>;
}

impl<F, Fut> SecurityScheme for F
where
    F: Fn(SchemeRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = SchemeDecision> + Send + 'static,
{
    fn authorize(&self, request: SchemeRequest) -> BoxFuture<'static, SchemeDecision> {
        Box::pin(self(request))
    }
}

/// Scheme name → scheme bindings.
#[derive(Clone, Default)]
pub struct SecuritySchemeRegistry {
    schemes: HashMap<String, Arc<dyn SecurityScheme>>,
}

impl SecuritySchemeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a scheme, returning true if it replaced an earlier one.
    pub fn insert(&mut self, name: impl Into<String>, scheme: impl SecurityScheme) -> bool {
        self.insert_arc(name, Arc::new(scheme))
    }

    /// Registers an already shared scheme.
    pub fn insert_arc(&mut self, name: impl Into<String>, scheme: Arc<dyn SecurityScheme>) -> bool {
        self.schemes.insert(name.into(), scheme).is_some()
    }

    /// Returns a scheme by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn SecurityScheme>> {
        self.schemes.get(name)
    }

    /// Returns true if a scheme is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.schemes.contains_key(name)
    }

    /// Returns the number of registered schemes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemes.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }
}

impl fmt::Debug for SecuritySchemeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.schemes.keys().collect();
        names.sort_unstable();
        f.debug_struct("SecuritySchemeRegistry")
            .field("schemes", &names)
            .finish()
    }
}
