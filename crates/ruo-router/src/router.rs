//! High-level router API.

use http::Method;

use crate::method_router::RouteTarget;
use crate::node::{Captures, Node};
use crate::params::{decode_segment, Params};
use crate::pattern::PathPattern;
use crate::{RouteError, RouteMatch};

/// A segment trie router.
///
/// Lookup walks the trie once per request segment, so resolution cost grows
/// with path depth rather than with the number of registered routes.
///
/// # Route Priority
///
/// When several patterns match a path, the one with the fewest parameter
/// segments wins: `/users/me` beats `/users/{id}` for `/users/me`. Two
/// patterns that could match the same path with the same number of
/// parameters are rejected at insertion time.
///
/// # Example
///
/// ```rust
/// use ruo_router::Router;
/// use http::Method;
///
/// let mut router = Router::new();
/// router.insert(Method::GET, "/users/{id}", "getUser").unwrap();
/// router.insert(Method::GET, "/users/me", "getMe").unwrap();
///
/// let m = router.match_route(&Method::GET, "/users/123").unwrap();
/// assert_eq!(m.key, "getUser");
/// assert_eq!(m.params.get("id"), Some("123"));
///
/// let m = router.match_route(&Method::GET, "/users/me").unwrap();
/// assert_eq!(m.key, "getMe");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Router {
    root: Node,
    routes: Vec<(Method, PathPattern, String)>,
}

impl Router {
    /// Creates a new empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an operation key for a method and path template.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidPattern`] for a malformed template and
    /// [`RouteError::Conflict`] when an existing route for the same method
    /// overlaps with equal specificity.
    pub fn insert(
        &mut self,
        method: Method,
        path: &str,
        key: impl Into<String>,
    ) -> Result<(), RouteError> {
        let pattern = PathPattern::parse(path)?;
        let key = key.into();

        if let Some((_, existing, existing_key)) = self.routes.iter().find(|(m, p, _)| {
            *m == method && p.param_count() == pattern.param_count() && p.overlaps(&pattern)
        }) {
            return Err(RouteError::Conflict {
                method,
                existing: format!("{existing} ({existing_key})"),
                incoming: format!("{pattern} ({key})"),
            });
        }

        let segments = pattern.segments().to_vec();
        self.root.insert(
            &segments,
            method.clone(),
            RouteTarget {
                key: key.clone(),
                pattern: pattern.clone(),
            },
        );
        self.routes.push((method, pattern, key));
        Ok(())
    }

    /// Matches a method and request path.
    ///
    /// The path must not include the query string. Empty segments are
    /// ignored, so `/users/` and `/users` resolve identically.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut best = None;
        self.root
            .find(method, &segments, 0, &mut Captures::new(), &mut best);

        best.map(|candidate| {
            let params = candidate
                .target
                .pattern
                .param_names()
                .zip(candidate.captures.iter())
                .map(|(name, &pos)| (name.to_string(), decode_segment(segments[pos])))
                .collect::<Params>();
            RouteMatch {
                key: &candidate.target.key,
                pattern: candidate.target.pattern.as_str(),
                params,
            }
        })
    }

    /// Returns the methods registered for any pattern matching `path`.
    ///
    /// Useful for diagnostics; the pipeline itself never leaks this to
    /// clients.
    #[must_use]
    pub fn methods_for(&self, path: &str) -> Vec<Method> {
        let mut methods: Vec<Method> = Vec::new();
        for (method, _, _) in &self.routes {
            if !methods.contains(method) && self.match_route(method, path).is_some() {
                methods.push(method.clone());
            }
        }
        methods
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_router() {
        let router = Router::new();
        assert!(router.is_empty());
        assert!(router.match_route(&Method::GET, "/").is_none());
    }

    #[test]
    fn test_root_route() {
        let mut router = Router::new();
        router.insert(Method::GET, "/", "root").unwrap();
        assert_eq!(router.match_route(&Method::GET, "/").unwrap().key, "root");
    }

    #[test]
    fn test_trailing_slash() {
        let mut router = Router::new();
        router.insert(Method::GET, "/users", "listUsers").unwrap();
        assert!(router.match_route(&Method::GET, "/users/").is_some());
    }

    #[test]
    fn test_param_names_are_per_route() {
        let mut router = Router::new();
        router.insert(Method::GET, "/users/{id}", "getUser").unwrap();
        router
            .insert(Method::GET, "/users/{userId}/posts", "listPosts")
            .unwrap();

        let m = router.match_route(&Method::GET, "/users/9/posts").unwrap();
        assert_eq!(m.key, "listPosts");
        assert_eq!(m.params.get("userId"), Some("9"));
        assert_eq!(m.params.get("id"), None);
        assert_eq!(m.pattern, "/users/{userId}/posts");
    }

    #[test]
    fn test_params_are_decoded() {
        let mut router = Router::new();
        router.insert(Method::GET, "/files/{name}", "getFile").unwrap();
        let m = router.match_route(&Method::GET, "/files/a%20b.txt").unwrap();
        assert_eq!(m.params.get("name"), Some("a b.txt"));
    }

    #[test]
    fn test_identical_shape_conflicts() {
        let mut router = Router::new();
        router.insert(Method::GET, "/users/{id}", "getUser").unwrap();
        let err = router
            .insert(Method::GET, "/users/{name}", "getUserByName")
            .unwrap_err();
        assert!(matches!(err, RouteError::Conflict { .. }));
        assert!(err.to_string().contains("getUserByName"));
    }

    #[test]
    fn test_equal_specificity_overlap_conflicts() {
        let mut router = Router::new();
        router.insert(Method::GET, "/a/{x}", "first").unwrap();
        assert!(router.insert(Method::GET, "/{y}/b", "second").is_err());
    }

    #[test]
    fn test_overlap_with_other_method_is_allowed() {
        let mut router = Router::new();
        router.insert(Method::GET, "/a/{x}", "first").unwrap();
        router.insert(Method::POST, "/{y}/b", "second").unwrap();
        assert_eq!(router.len(), 2);
    }

    #[test]
    fn test_more_specific_overlap_is_allowed() {
        let mut router = Router::new();
        router.insert(Method::GET, "/users/{id}", "getUser").unwrap();
        router.insert(Method::GET, "/users/me", "getMe").unwrap();
        assert_eq!(router.len(), 2);
    }

    #[test]
    fn test_methods_for() {
        let mut router = Router::new();
        router.insert(Method::GET, "/users/{id}", "getUser").unwrap();
        router.insert(Method::DELETE, "/users/{id}", "deleteUser").unwrap();
        let methods = router.methods_for("/users/1");
        assert_eq!(methods, vec![Method::GET, Method::DELETE]);
        assert!(router.methods_for("/nope").is_empty());
    }
}
