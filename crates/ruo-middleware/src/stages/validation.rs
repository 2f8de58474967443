//! Request validation and response pruning.
//!
//! Request inputs arrive as strings (path, query, headers) or JSON bytes
//! (body). Strings are coerced to the type their schema names before
//! validation, and every violation across every location is collected
//! before the request is rejected.

use std::sync::Arc;

use ruo_core::schema::{coerce_all, prune};
use ruo_core::{
    BoxFuture, OperationDescriptor, ParameterLocation, PipelineError, Reply, ReplyBody,
    SchemaValidator, ValidatedParams, ValidationOutcome, Violation,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::RequestContext;
use crate::funnel::FunnelReply;
use crate::stage::{Flow, ResponseStage, Stage};
use crate::types::Request;

/// Coerces and validates path, query, header and body inputs.
///
/// On success the [`ValidatedParams`] are stored in the context for the
/// invoker.
#[derive(Clone)]
pub struct RequestValidationStage {
    validator: Arc<dyn SchemaValidator>,
}

impl RequestValidationStage {
    /// Creates a validation stage using `validator`.
    #[must_use]
    pub fn new(validator: Arc<dyn SchemaValidator>) -> Self {
        Self { validator }
    }

    async fn validate(
        &self,
        ctx: &RequestContext,
        request: &Request,
        operation: &OperationDescriptor,
    ) -> Result<ValidatedParams, Vec<Violation>> {
        let mut violations = Vec::new();
        let mut params = ValidatedParams::new();

        let query: Vec<(String, String)> = match request.uri().query() {
            Some(raw) => serde_urlencoded::from_str(raw).unwrap_or_else(|e| {
                violations.push(Violation::new("/query", format!("malformed query string: {e}")));
                Vec::new()
            }),
            None => Vec::new(),
        };

        for spec in operation.parameters() {
            let location = format!("/{}/{}", spec.location, spec.name);
            let raw: Vec<&str> = match spec.location {
                ParameterLocation::Path => ctx.path_params().get(&spec.name).into_iter().collect(),
                ParameterLocation::Query => query
                    .iter()
                    .filter(|(key, _)| *key == spec.name)
                    .map(|(_, value)| value.as_str())
                    .collect(),
                ParameterLocation::Header => request
                    .headers()
                    .get_all(spec.name.as_str())
                    .iter()
                    .filter_map(|v| v.to_str().ok())
                    .collect(),
                ParameterLocation::Body => Vec::new(),
            };

            if raw.is_empty() {
                if spec.required {
                    violations.push(Violation::new(location, "is required"));
                }
                continue;
            }

            let value = coerce_all(&raw, &spec.schema);
            match self.validator.validate(value, &spec.schema, &location).await {
                ValidationOutcome::Valid(value) => {
                    params.insert(spec.location, spec.name.clone(), value);
                }
                ValidationOutcome::Invalid(found) => violations.extend(found),
            }
        }

        if let Some(body) = operation.body() {
            let bytes = request.body();
            if bytes.iter().all(u8::is_ascii_whitespace) {
                if body.required {
                    violations.push(Violation::new("/body", "request body is required"));
                }
            } else {
                match serde_json::from_slice::<Value>(bytes) {
                    Ok(value) => match self.validator.validate(value, &body.schema, "/body").await {
                        ValidationOutcome::Valid(value) => {
                            params.insert(ParameterLocation::Body, "body", value);
                        }
                        ValidationOutcome::Invalid(found) => violations.extend(found),
                    },
                    Err(e) => {
                        violations.push(Violation::new("/body", format!("malformed JSON: {e}")));
                    }
                }
            }
        }

        if violations.is_empty() {
            Ok(params)
        } else {
            Err(violations)
        }
    }
}

impl std::fmt::Debug for RequestValidationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestValidationStage").finish_non_exhaustive()
    }
}

impl Stage for RequestValidationStage {
    fn name(&self) -> &'static str {
        "request_validation"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: &'a mut Request,
    ) -> BoxFuture<'a, Result<Flow, PipelineError>> {
        Box::pin(async move {
            let operation = ctx.operation().cloned().ok_or_else(|| {
                PipelineError::unhandled("request validation ran without an operation")
            })?;

            match self.validate(ctx, request, &operation).await {
                Ok(params) => {
                    ctx.set_extension(params);
                    Ok(Flow::Continue)
                }
                Err(violations) => {
                    debug!(
                        request_id = %ctx.request_id(),
                        operation_id = operation.operation_id(),
                        violations = violations.len(),
                        "Request failed validation"
                    );
                    Err(PipelineError::validation(violations))
                }
            }
        })
    }
}

/// Prunes JSON replies to their declared response schema.
///
/// Fields the schema does not declare are removed, as are nulls the schema
/// does not allow. When `validate` is on, the pruned body is also checked;
/// mismatches are logged and the reply is sent anyway.
#[derive(Clone)]
pub struct ResponseValidationStage {
    validator: Arc<dyn SchemaValidator>,
    validate: bool,
}

impl ResponseValidationStage {
    /// Creates a response stage.
    #[must_use]
    pub fn new(validator: Arc<dyn SchemaValidator>, validate: bool) -> Self {
        Self {
            validator,
            validate,
        }
    }
}

impl std::fmt::Debug for ResponseValidationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseValidationStage")
            .field("validate", &self.validate)
            .finish_non_exhaustive()
    }
}

impl ResponseStage for ResponseValidationStage {
    fn name(&self) -> &'static str {
        "response_validation"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        reply: &'a mut Reply,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if ctx.has_extension::<FunnelReply>() {
                return;
            }
            let Some(operation) = ctx.operation().cloned() else {
                return;
            };
            let status = reply.status();
            let Some(schema) = operation.response_schema(status.as_u16()) else {
                return;
            };
            let ReplyBody::Json(body) = reply.body_mut() else {
                return;
            };

            prune(body, schema);

            if self.validate {
                if let ValidationOutcome::Invalid(violations) = self
                    .validator
                    .validate(body.clone(), schema, "/response")
                    .await
                {
                    warn!(
                        request_id = %ctx.request_id(),
                        operation_id = operation.operation_id(),
                        status = status.as_u16(),
                        violations = ?violations,
                        "Response does not match its declared schema"
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{Method, StatusCode};
    use ruo_core::{fixtures, ErrorKind, JsonSchemaValidator, OperationCatalog, RequestId};
    use serde_json::json;

    fn catalog() -> OperationCatalog {
        OperationCatalog::from_definition(&fixtures::users_definition()).unwrap()
    }

    fn bound(method: Method, uri: &str, body: &str) -> (RequestContext, Request) {
        let request = http::Request::builder()
            .method(method.clone())
            .uri(uri)
            .body(Bytes::from(body.to_string()))
            .unwrap();
        let mut ctx =
            RequestContext::new(RequestId::new(), Arc::from("1"), method, request.uri().path());
        let resolved = catalog().resolve(ctx.method(), ctx.path()).unwrap();
        ctx.set_operation(resolved);
        (ctx, request)
    }

    fn stage() -> RequestValidationStage {
        RequestValidationStage::new(Arc::new(JsonSchemaValidator::new()))
    }

    #[tokio::test]
    async fn test_query_is_coerced() {
        let (mut ctx, mut request) = bound(Method::GET, "/users?limit=10&tags=a&tags=b", "");
        stage().process(&mut ctx, &mut request).await.unwrap();

        let params = ctx.validated_params().unwrap();
        assert_eq!(params.query("limit"), Some(&json!(10)));
        assert_eq!(params.query("tags"), Some(&json!(["a", "b"])));
    }

    #[tokio::test]
    async fn test_query_out_of_range() {
        let (mut ctx, mut request) = bound(Method::GET, "/users?limit=0", "");
        let err = stage().process(&mut ctx, &mut request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        assert_eq!(err.violations()[0].location, "/query/limit");
        assert!(ctx.validated_params().is_none());
    }

    #[tokio::test]
    async fn test_body_violations_are_aggregated() {
        let (mut ctx, mut request) =
            bound(Method::POST, "/users", r#"{"email": "nope", "extra": 1}"#);
        let err = stage().process(&mut ctx, &mut request).await.unwrap_err();

        let locations: Vec<_> = err.violations().iter().map(|v| v.location.as_str()).collect();
        assert!(locations.contains(&"/body/name"));
        assert!(locations.contains(&"/body/email"));
        assert!(err.violations().len() >= 3);
    }

    #[tokio::test]
    async fn test_missing_required_body() {
        let (mut ctx, mut request) = bound(Method::POST, "/users", "");
        let err = stage().process(&mut ctx, &mut request).await.unwrap_err();
        assert_eq!(err.violations()[0].location, "/body");
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let (mut ctx, mut request) = bound(Method::POST, "/users", "{not json");
        let err = stage().process(&mut ctx, &mut request).await.unwrap_err();
        assert!(err.violations()[0].message.starts_with("malformed JSON"));
    }

    #[tokio::test]
    async fn test_valid_body_is_stored() {
        let (mut ctx, mut request) = bound(Method::POST, "/users", r#"{"name": "Ada"}"#);
        stage().process(&mut ctx, &mut request).await.unwrap();
        assert_eq!(
            ctx.validated_params().unwrap().body(),
            Some(&json!({"name": "Ada"}))
        );
    }

    #[tokio::test]
    async fn test_required_header() {
        let (mut ctx, mut request) = bound(Method::DELETE, "/users/7", "");
        let err = stage().process(&mut ctx, &mut request).await.unwrap_err();
        assert_eq!(err.violations()[0].location, "/header/x-reason");

        request
            .headers_mut()
            .insert("x-reason", http::HeaderValue::from_static("cleanup"));
        stage().process(&mut ctx, &mut request).await.unwrap();
        let params = ctx.validated_params().unwrap();
        assert_eq!(params.header("x-reason"), Some(&json!("cleanup")));
        assert_eq!(params.path("id"), Some(&json!("7")));
    }

    #[tokio::test]
    async fn test_response_is_pruned() {
        let (mut ctx, _) = bound(Method::GET, "/users/7", "");
        let mut reply = Reply::ok(json!({
            "id": "7",
            "name": "Ada",
            "password_hash": "secret",
            "email": null
        }));

        let stage = ResponseValidationStage::new(Arc::new(JsonSchemaValidator::new()), true);
        stage.process(&mut ctx, &mut reply).await;
        assert_eq!(
            reply.json_body(),
            Some(&json!({"id": "7", "name": "Ada", "email": null}))
        );
    }

    #[tokio::test]
    async fn test_undeclared_status_is_untouched() {
        let (mut ctx, _) = bound(Method::GET, "/users/me", "");
        let mut reply = Reply::json(StatusCode::ACCEPTED, json!({"extra": true}));

        let stage = ResponseValidationStage::new(Arc::new(JsonSchemaValidator::new()), false);
        stage.process(&mut ctx, &mut reply).await;
        assert_eq!(reply.json_body(), Some(&json!({"extra": true})));
    }

    #[tokio::test]
    async fn test_funnel_reply_is_untouched() {
        let (mut ctx, _) = bound(Method::GET, "/users/7", "");
        ctx.set_extension(FunnelReply);
        let envelope = json!({
            "code": "ValidationFailed",
            "message": "Request validation failed",
            "details": [{"location": "/path/id", "message": "bad"}],
            "trace": "kept"
        });
        let mut reply = Reply::json(StatusCode::BAD_REQUEST, envelope.clone());

        let stage = ResponseValidationStage::new(Arc::new(JsonSchemaValidator::new()), true);
        stage.process(&mut ctx, &mut reply).await;
        assert_eq!(reply.json_body(), Some(&envelope));
    }
}
