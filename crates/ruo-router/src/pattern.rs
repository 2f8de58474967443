//! Path pattern parsing.
//!
//! A pattern is split on `/` into segments. A segment written as `{name}` is
//! a named parameter that matches exactly one request segment; every other
//! segment must match literally.

use crate::RouteError;

/// One segment of a parsed path pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Literal segment (e.g., "users", "v1")
    Static(String),
    /// Named parameter (e.g., "{id}")
    Param(String),
}

impl Segment {
    /// Returns true if this segment is a parameter.
    #[must_use]
    pub const fn is_param(&self) -> bool {
        matches!(self, Self::Param(_))
    }
}

/// A parsed path pattern such as `/users/{id}/posts`.
///
/// # Example
///
/// ```rust
/// use ruo_router::PathPattern;
///
/// let pattern = PathPattern::parse("/users/{id}").unwrap();
/// assert_eq!(pattern.param_count(), 1);
/// assert_eq!(pattern.param_names().collect::<Vec<_>>(), vec!["id"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parses a path template.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidPattern`] if the template does not start
    /// with `/`, contains an empty or unbalanced parameter, or repeats a
    /// parameter name.
    pub fn parse(raw: &str) -> Result<Self, RouteError> {
        if !raw.starts_with('/') {
            return Err(RouteError::invalid(raw, "pattern must start with '/'"));
        }

        let mut segments = Vec::new();
        for part in raw.split('/').filter(|s| !s.is_empty()) {
            if let Some(inner) = part.strip_prefix('{') {
                let name = inner.strip_suffix('}').ok_or_else(|| {
                    RouteError::invalid(raw, format!("unbalanced parameter '{part}'"))
                })?;
                if name.is_empty() || name.contains(['{', '}']) {
                    return Err(RouteError::invalid(raw, format!("malformed parameter '{part}'")));
                }
                if segments
                    .iter()
                    .any(|s| matches!(s, Segment::Param(existing) if existing == name))
                {
                    return Err(RouteError::invalid(raw, format!("duplicate parameter '{name}'")));
                }
                segments.push(Segment::Param(name.to_string()));
            } else if part.contains(['{', '}']) {
                return Err(RouteError::invalid(
                    raw,
                    format!("parameter must span a whole segment: '{part}'"),
                ));
            } else {
                segments.push(Segment::Static(part.to_string()));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Returns the template as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns the number of parameter segments.
    ///
    /// Fewer parameters means a more specific pattern.
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_param()).count()
    }

    /// Returns parameter names in positional order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Static(_) => None,
        })
    }

    /// Returns true if some concrete path is matched by both patterns.
    ///
    /// Two patterns overlap when they have the same number of segments and
    /// every position is either the same literal or a parameter on at least
    /// one side.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Static(a), Segment::Static(b)) => a == b,
                    _ => true,
                })
    }
}

impl std::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
