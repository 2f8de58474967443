//! HTTP method table for a single trie node.
//!
//! A node that terminates one or more patterns carries a [`MethodRouter`]
//! mapping each method to the operation key registered for it.

use http::Method;
use smallvec::SmallVec;

use crate::pattern::PathPattern;

/// An operation registered at a node for one method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    /// The operation key (usually the `operationId`)
    pub key: String,
    /// The pattern the operation was declared with
    pub pattern: PathPattern,
}

/// Maps HTTP methods to route targets for one node.
///
/// Most paths declare one to three methods, so entries are stored inline.
///
/// # Example
///
/// ```rust
/// use ruo_router::{MethodRouter, PathPattern, RouteTarget};
/// use http::Method;
///
/// let pattern = PathPattern::parse("/users").unwrap();
/// let mut methods = MethodRouter::new();
/// methods.set(Method::GET, RouteTarget { key: "listUsers".into(), pattern: pattern.clone() });
/// methods.set(Method::POST, RouteTarget { key: "createUser".into(), pattern });
///
/// assert_eq!(methods.get(&Method::GET).map(|t| t.key.as_str()), Some("listUsers"));
/// assert!(methods.get(&Method::DELETE).is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MethodRouter {
    entries: SmallVec<[(Method, RouteTarget); 3]>,
}

impl MethodRouter {
    /// Creates an empty method table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a target for a method, returning the previous one if any.
    pub fn set(&mut self, method: Method, target: RouteTarget) -> Option<RouteTarget> {
        if let Some((_, existing)) = self.entries.iter_mut().find(|(m, _)| *m == method) {
            return Some(std::mem::replace(existing, target));
        }
        self.entries.push((method, target));
        None
    }

    /// Returns the target registered for a method.
    #[must_use]
    pub fn get(&self, method: &Method) -> Option<&RouteTarget> {
        self.entries
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, t)| t)
    }

    /// Returns the methods registered at this node.
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.entries.iter().map(|(m, _)| m)
    }

    /// Returns true if no method is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(key: &str) -> RouteTarget {
        RouteTarget {
            key: key.to_string(),
            pattern: PathPattern::parse("/x").unwrap(),
        }
    }

    #[test]
    fn test_set_and_get() {
        let mut router = MethodRouter::new();
        assert!(router.is_empty());
        assert!(router.set(Method::GET, target("a")).is_none());
        assert_eq!(router.get(&Method::GET).unwrap().key, "a");
        assert!(router.get(&Method::PUT).is_none());
    }

    #[test]
    fn test_set_replaces() {
        let mut router = MethodRouter::new();
        router.set(Method::GET, target("a"));
        let previous = router.set(Method::GET, target("b"));
        assert_eq!(previous.unwrap().key, "a");
        assert_eq!(router.get(&Method::GET).unwrap().key, "b");
    }

    #[test]
    fn test_extension_method() {
        let mut router = MethodRouter::new();
        let purge = Method::from_bytes(b"PURGE").unwrap();
        router.set(purge.clone(), target("purge"));
        assert_eq!(router.get(&purge).unwrap().key, "purge");
        assert_eq!(router.methods().count(), 1);
    }
}
