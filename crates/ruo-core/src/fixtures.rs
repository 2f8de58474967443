//! Test fixtures for Ruo development and testing.
//!
//! Provides a small user-service definition used by tests across the
//! workspace.
//!
//! # Example
//!
//! ```
//! use ruo_core::fixtures;
//!
//! let definition = fixtures::users_definition();
//! assert!(definition
//!     .operations()
//!     .iter()
//!     .any(|op| op.operation_id() == "getUser"));
//! ```

use http::Method;
use serde_json::{json, Value};

use crate::definition::{
    ApiDefinition, OperationDescriptor, ParameterLocation, ParameterSpec, SecurityRequirementSet,
};

/// Creates the user-service definition.
///
/// | Operation | Route | Security |
/// |---|---|---|
/// | `getUser` | `GET /users/{id}` | none |
/// | `getCurrentUser` | `GET /users/me` | `apiKey` |
/// | `listUsers` | `GET /users` | none |
/// | `createUser` | `POST /users` | `apiKey` or (`bearer` + `admin` scope) |
/// | `deleteUser` | `DELETE /users/{id}` | `apiKey` and `bearer` |
#[must_use]
pub fn users_definition() -> ApiDefinition {
    let operations = vec![
        OperationDescriptor::builder("getUser")
            .method(Method::GET)
            .path("/users/{id}")
            .tag("users")
            .parameter(ParameterSpec::new(
                "id",
                ParameterLocation::Path,
                json!({"type": "string"}),
            ))
            .response("200", user_schema())
            .response("default", error_schema())
            .build(),
        OperationDescriptor::builder("getCurrentUser")
            .method(Method::GET)
            .path("/users/me")
            .tag("users")
            .response("200", user_schema())
            .security(SecurityRequirementSet::new().scheme("apiKey"))
            .build(),
        OperationDescriptor::builder("listUsers")
            .method(Method::GET)
            .path("/users")
            .tag("users")
            .parameter(ParameterSpec::new(
                "limit",
                ParameterLocation::Query,
                json!({"type": "integer", "minimum": 1, "maximum": 100}),
            ))
            .parameter(ParameterSpec::new(
                "tags",
                ParameterLocation::Query,
                json!({"type": "array", "items": {"type": "string"}}),
            ))
            .response(
                "200",
                json!({
                    "type": "object",
                    "required": ["users"],
                    "properties": {
                        "users": {"type": "array", "items": user_schema()},
                        "total": {"type": "integer"}
                    }
                }),
            )
            .build(),
        OperationDescriptor::builder("createUser")
            .method(Method::POST)
            .path("/users")
            .tag("users")
            .body(
                json!({
                    "type": "object",
                    "required": ["name"],
                    "properties": {
                        "name": {"type": "string", "minLength": 1},
                        "email": {"type": "string", "pattern": "^[^@]+@[^@]+$"}
                    },
                    "additionalProperties": false
                }),
                true,
            )
            .response("201", user_schema())
            .security(SecurityRequirementSet::new().scheme("apiKey"))
            .security(SecurityRequirementSet::new().scheme_with_scopes("bearer", ["admin"]))
            .build(),
        OperationDescriptor::builder("deleteUser")
            .method(Method::DELETE)
            .path("/users/{id}")
            .tag("users")
            .parameter(ParameterSpec::new(
                "id",
                ParameterLocation::Path,
                json!({"type": "string"}),
            ))
            .parameter(
                ParameterSpec::new(
                    "x-reason",
                    ParameterLocation::Header,
                    json!({"type": "string"}),
                )
                .required(),
            )
            .empty_response("204")
            .security(SecurityRequirementSet::new().scheme("apiKey").scheme("bearer"))
            .build(),
    ];

    ApiDefinition::new(
        "user-service",
        "1.0.0",
        operations,
        vec!["apiKey".to_string(), "bearer".to_string()],
        json!({
            "openapi": "3.0.3",
            "info": {"title": "user-service", "version": "1.0.0"}
        }),
    )
}

/// The `User` schema: `id` and `name` required, `email` nullable.
#[must_use]
pub fn user_schema() -> Value {
    json!({
        "type": "object",
        "required": ["id", "name"],
        "properties": {
            "id": {"type": "string"},
            "name": {"type": "string"},
            "email": {"type": "string", "nullable": true}
        }
    })
}

/// The error envelope schema.
#[must_use]
pub fn error_schema() -> Value {
    json!({
        "type": "object",
        "required": ["code", "message"],
        "properties": {
            "code": {"type": "string"},
            "message": {"type": "string"},
            "details": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "location": {"type": "string"},
                        "message": {"type": "string"}
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OperationCatalog;

    #[test]
    fn test_fixture_builds_a_catalog() {
        let catalog = OperationCatalog::from_definition(&users_definition()).unwrap();
        assert_eq!(catalog.len(), 5);
    }

    #[test]
    fn test_referenced_schemes_are_declared() {
        let definition = users_definition();
        for name in definition.referenced_schemes() {
            assert!(definition.security_schemes().iter().any(|s| s == name));
        }
    }
}
