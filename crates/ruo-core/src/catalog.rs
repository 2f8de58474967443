//! The Operation Catalog.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use ruo_router::{Params, Router};

use crate::definition::{ApiDefinition, OperationDescriptor};
use crate::error::DefinitionError;

/// The outcome of a successful resolution.
#[derive(Debug, Clone)]
pub struct ResolvedOperation {
    /// The shared descriptor; the same allocation on every resolution.
    pub operation: Arc<OperationDescriptor>,
    /// Percent-decoded path parameters.
    pub path_params: Params,
}

/// Immutable `(method, path)` → operation lookup, built once at startup.
///
/// Resolution walks a segment trie, so its cost depends on the number of
/// path segments rather than on the number of operations. The catalog is
/// read-only after construction and can be shared across requests behind
/// an `Arc` without synchronization.
///
/// # Example
///
/// ```
/// use ruo_core::{fixtures, OperationCatalog};
/// use http::Method;
/// use std::sync::Arc;
///
/// let catalog = OperationCatalog::from_definition(&fixtures::users_definition()).unwrap();
///
/// let first = catalog.resolve(&Method::GET, "/users/42").unwrap();
/// let second = catalog.resolve(&Method::GET, "/users/42").unwrap();
/// assert!(Arc::ptr_eq(&first.operation, &second.operation));
/// assert_eq!(first.path_params.get("id"), Some("42"));
///
/// assert!(catalog.resolve(&Method::GET, "/nope").is_none());
/// ```
#[derive(Debug, Default)]
pub struct OperationCatalog {
    router: Router,
    operations: HashMap<String, Arc<OperationDescriptor>>,
}

impl OperationCatalog {
    /// Builds a catalog from operation descriptors.
    ///
    /// # Errors
    ///
    /// Fails on duplicate operation ids, malformed path templates, and
    /// overlapping templates of equal specificity for the same method.
    pub fn new(
        operations: impl IntoIterator<Item = OperationDescriptor>,
    ) -> Result<Self, DefinitionError> {
        let mut catalog = Self::default();
        for operation in operations {
            let key = operation.operation_id().to_string();
            if catalog.operations.contains_key(&key) {
                return Err(DefinitionError::DuplicateOperation(key));
            }
            catalog
                .router
                .insert(operation.method().clone(), operation.path(), key.clone())?;
            catalog.operations.insert(key, Arc::new(operation));
        }
        Ok(catalog)
    }

    /// Builds a catalog from a loaded definition.
    pub fn from_definition(definition: &ApiDefinition) -> Result<Self, DefinitionError> {
        Self::new(definition.operations().iter().cloned())
    }

    /// Resolves a request to its declared operation.
    ///
    /// `None` is not an error here; the pipeline turns it into `NotFound`
    /// at the end of the chain.
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> Option<ResolvedOperation> {
        let matched = self.router.match_route(method, path)?;
        let operation = self.operations.get(matched.key)?;
        Some(ResolvedOperation {
            operation: Arc::clone(operation),
            path_params: matched.params,
        })
    }

    /// Returns an operation by id.
    #[must_use]
    pub fn get(&self, operation_id: &str) -> Option<&Arc<OperationDescriptor>> {
        self.operations.get(operation_id)
    }

    /// Returns true if an operation with this id exists.
    #[must_use]
    pub fn contains(&self, operation_id: &str) -> bool {
        self.operations.contains_key(operation_id)
    }

    /// Iterates over every operation, in no particular order.
    pub fn operations(&self) -> impl Iterator<Item = &Arc<OperationDescriptor>> {
        self.operations.values()
    }

    /// Returns the number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns true if the catalog has no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
