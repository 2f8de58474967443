//! Segment trie node.
//!
//! Each node represents one path segment. Static children are kept sorted
//! for binary search; all parameter segments at a position share a single
//! parameter child, since parameter names only matter once a route is chosen.

use http::Method;
use smallvec::SmallVec;

use crate::method_router::{MethodRouter, RouteTarget};
use crate::pattern::Segment;

/// Positions of request segments captured by parameter nodes.
pub(crate) type Captures = SmallVec<[usize; 4]>;

/// The best match found so far during a lookup.
#[derive(Debug)]
pub(crate) struct Candidate<'a> {
    pub(crate) target: &'a RouteTarget,
    pub(crate) captures: Captures,
}

/// A node in the segment trie.
#[derive(Debug, Clone, Default)]
pub struct Node {
    /// The literal segment, empty for the root and parameter nodes
    segment: String,

    /// Operations terminating at this node
    methods: MethodRouter,

    /// Static children, sorted by segment
    static_children: Vec<Node>,

    /// Shared parameter child
    param_child: Option<Box<Node>>,
}

impl Node {
    /// Creates a root node.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    fn new_static(segment: &str) -> Self {
        Self {
            segment: segment.to_string(),
            ..Self::default()
        }
    }

    /// Inserts a target under the given segments.
    ///
    /// Returns the target previously registered for the same method and
    /// segment shape, if any.
    pub(crate) fn insert(
        &mut self,
        segments: &[Segment],
        method: Method,
        target: RouteTarget,
    ) -> Option<RouteTarget> {
        let Some((first, rest)) = segments.split_first() else {
            return self.methods.set(method, target);
        };

        let child = match first {
            Segment::Static(literal) => {
                let idx = match self
                    .static_children
                    .binary_search_by(|c| c.segment.as_str().cmp(literal))
                {
                    Ok(idx) => idx,
                    Err(idx) => {
                        self.static_children.insert(idx, Node::new_static(literal));
                        idx
                    }
                };
                &mut self.static_children[idx]
            }
            Segment::Param(_) => self.param_child.get_or_insert_with(Box::default),
        };
        child.insert(rest, method, target)
    }

    /// Finds the most specific target for `method` under `segments`.
    ///
    /// Static children are explored before the parameter child, and a branch
    /// is abandoned as soon as it cannot beat the current best on parameter
    /// count. Build-time conflict checks guarantee the winner is unique.
    pub(crate) fn find<'a>(
        &'a self,
        method: &Method,
        segments: &[&str],
        position: usize,
        captures: &mut Captures,
        best: &mut Option<Candidate<'a>>,
    ) {
        if best
            .as_ref()
            .is_some_and(|b| captures.len() >= b.captures.len())
        {
            return;
        }

        let Some((first, rest)) = segments.split_first() else {
            if let Some(target) = self.methods.get(method) {
                let better = best
                    .as_ref()
                    .map_or(true, |b| captures.len() < b.captures.len());
                if better {
                    *best = Some(Candidate {
                        target,
                        captures: captures.clone(),
                    });
                }
            }
            return;
        };

        if let Ok(idx) = self
            .static_children
            .binary_search_by(|c| c.segment.as_str().cmp(first))
        {
            self.static_children[idx].find(method, rest, position + 1, captures, best);
        }

        if let Some(child) = &self.param_child {
            captures.push(position);
            child.find(method, rest, position + 1, captures, best);
            captures.pop();
        }
    }

    /// Returns the number of nodes in this subtree, including this one.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self
            .static_children
            .iter()
            .map(Node::node_count)
            .sum::<usize>()
            + self.param_child.as_ref().map_or(0, |c| c.node_count())
    }
}
