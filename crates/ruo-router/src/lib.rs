//! Segment trie router for declared API operations.
//!
//! This crate resolves an incoming `(method, path)` pair to the key of the
//! operation declared for it. Patterns use `{name}` segments for path
//! parameters, exactly as written in an OpenAPI `paths` object.
//!
//! # Features
//!
//! - **Trie Matching**: lookup cost grows with path depth, not route count
//! - **Specificity**: the pattern with fewer parameter segments wins
//! - **Build-Time Conflicts**: equally specific overlapping patterns are
//!   rejected when inserted, never resolved arbitrarily at request time
//! - **Method Tables**: each trie node carries a per-method target table
//!
//! # Example
//!
//! ```rust
//! use ruo_router::Router;
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.insert(Method::GET, "/users", "listUsers").unwrap();
//! router.insert(Method::POST, "/users", "createUser").unwrap();
//! router.insert(Method::GET, "/users/{id}", "getUser").unwrap();
//!
//! let m = router.match_route(&Method::GET, "/users/123").unwrap();
//! assert_eq!(m.key, "getUser");
//! assert_eq!(m.params.get("id"), Some("123"));
//! ```
//!
//! # Architecture
//!
//! ```text
//!                    (root)
//!                      │
//!                   "users"  [GET listUsers, POST createUser]
//!                      │
//!                    {param} [GET getUser]
//! ```

#![doc(html_root_url = "https://docs.rs/ruo-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod method_router;
mod node;
mod params;
mod pattern;
mod router;

pub use method_router::{MethodRouter, RouteTarget};
pub use node::Node;
pub use params::Params;
pub use pattern::{PathPattern, Segment};
pub use router::Router;

use http::Method;
use thiserror::Error;

/// A matched route with its operation key and extracted parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    /// The operation key registered for the route
    pub key: &'a str,
    /// The path template that matched
    pub pattern: &'a str,
    /// Extracted, percent-decoded path parameters
    pub params: Params,
}

/// Errors raised while building a router.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The path template is malformed.
    #[error("invalid path pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending template
        pattern: String,
        /// What is wrong with it
        reason: String,
    },

    /// Two routes for the same method overlap with equal specificity.
    #[error("ambiguous routes for {method}: {existing} and {incoming}")]
    Conflict {
        /// The HTTP method both routes use
        method: Method,
        /// The route registered first
        existing: String,
        /// The route being inserted
        incoming: String,
    },
}

impl RouteError {
    pub(crate) fn invalid(pattern: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}
