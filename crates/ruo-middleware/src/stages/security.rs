//! Security dispatch.
//!
//! An operation lists security requirement sets. The request is authorized
//! if any one set is satisfied (sets are tried in order and the first
//! success wins); a set is satisfied only if every scheme it names allows
//! the request. An empty list means the operation is public.

use std::sync::Arc;

use ruo_core::{
    BoxFuture, Denial, DenialKind, OperationDescriptor, PipelineError, Principal, SchemeDecision,
    SchemeRequest, SecurityRequirementSet, SecuritySchemeRegistry,
};
use tracing::debug;

use crate::context::RequestContext;
use crate::stage::{Flow, Stage};
use crate::types::Request;

/// Result of evaluating an operation's requirement sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    /// Some set was satisfied.
    Allowed(Principal),
    /// No set was satisfied; carries the last set's denial.
    Denied(Denial),
}

/// Evaluates requirement sets against registered schemes.
#[derive(Debug, Clone)]
pub struct SecurityDispatcher {
    schemes: Arc<SecuritySchemeRegistry>,
}

impl SecurityDispatcher {
    /// Creates a dispatcher over `schemes`.
    #[must_use]
    pub fn new(schemes: Arc<SecuritySchemeRegistry>) -> Self {
        Self { schemes }
    }

    /// Authorizes `request` for `operation`.
    ///
    /// Sets after the first satisfied one are never evaluated, and neither
    /// are the schemes after the first denial within a set. The principal
    /// of a satisfied set is the first non-anonymous one its schemes
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns `Unhandled` if a set names a scheme nobody registered.
    pub async fn authorize(
        &self,
        request: &Request,
        operation: &OperationDescriptor,
        sets: &[SecurityRequirementSet],
    ) -> Result<Authorization, PipelineError> {
        let mut last_denial = None;
        for set in sets {
            match self.evaluate_set(request, operation, set).await? {
                Ok(principal) => return Ok(Authorization::Allowed(principal)),
                Err(denial) => last_denial = Some(denial),
            }
        }

        Ok(match last_denial {
            Some(denial) => Authorization::Denied(denial),
            None => Authorization::Allowed(Principal::Anonymous),
        })
    }

    async fn evaluate_set(
        &self,
        request: &Request,
        operation: &OperationDescriptor,
        set: &SecurityRequirementSet,
    ) -> Result<Result<Principal, Denial>, PipelineError> {
        let mut principal = Principal::Anonymous;
        for requirement in &set.schemes {
            let scheme = self.schemes.get(&requirement.scheme).ok_or_else(|| {
                PipelineError::unhandled(format!(
                    "security scheme '{}' is not registered",
                    requirement.scheme
                ))
            })?;

            let scheme_request = SchemeRequest {
                method: request.method().clone(),
                uri: request.uri().clone(),
                headers: request.headers().clone(),
                operation_id: operation.operation_id().to_string(),
                scopes: requirement.scopes.clone(),
            };

            match scheme.authorize(scheme_request).await {
                SchemeDecision::Allowed(granted) => {
                    if principal.is_anonymous() {
                        principal = granted;
                    }
                }
                SchemeDecision::Denied(denial) => {
                    debug!(
                        operation_id = operation.operation_id(),
                        scheme = %requirement.scheme,
                        reason = %denial.reason,
                        "Security scheme denied the request"
                    );
                    return Ok(Err(denial));
                }
            }
        }
        Ok(Ok(principal))
    }
}

/// Runs the [`SecurityDispatcher`] for the resolved operation.
///
/// On success the principal is stored in the context.
#[derive(Debug, Clone)]
pub struct SecurityStage {
    dispatcher: SecurityDispatcher,
}

impl SecurityStage {
    /// Creates a security stage.
    #[must_use]
    pub fn new(dispatcher: SecurityDispatcher) -> Self {
        Self { dispatcher }
    }
}

impl Stage for SecurityStage {
    fn name(&self) -> &'static str {
        "security"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: &'a mut Request,
    ) -> BoxFuture<'a, Result<Flow, PipelineError>> {
        Box::pin(async move {
            let operation = ctx
                .operation()
                .cloned()
                .ok_or_else(|| {
                    PipelineError::unhandled("security stage ran without an operation")
                })?;

            match self
                .dispatcher
                .authorize(request, &operation, operation.security())
                .await?
            {
                Authorization::Allowed(principal) => {
                    debug!(
                        request_id = %ctx.request_id(),
                        principal = %principal.log_id(),
                        "Request authorized"
                    );
                    ctx.set_extension(principal);
                    Ok(Flow::Continue)
                }
                Authorization::Denied(Denial { reason, kind }) => Err(match kind {
                    DenialKind::Unauthenticated => PipelineError::unauthenticated(reason),
                    DenialKind::Forbidden => PipelineError::forbidden(reason),
                }),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::Method;
    use ruo_core::{ErrorKind, RequestId};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Probe {
        calls: Arc<AtomicUsize>,
    }

    fn registry(calls: &Arc<AtomicUsize>) -> SecuritySchemeRegistry {
        let mut schemes = SecuritySchemeRegistry::new();

        let counter = Arc::clone(calls);
        schemes.insert("apiKey", move |req: SchemeRequest| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                match req.header("x-api-key") {
                    Some("good") => SchemeDecision::Allowed(Principal::api_key(
                        "k1",
                        Vec::<String>::new(),
                    )),
                    Some(_) => SchemeDecision::unauthenticated("invalid api key"),
                    None => SchemeDecision::unauthenticated("missing api key"),
                }
            }
        });

        let counter = Arc::clone(calls);
        schemes.insert("bearer", move |req: SchemeRequest| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                match req.bearer_token() {
                    Some("admin") => SchemeDecision::Allowed(Principal::user("u1", ["admin"])),
                    Some("user") if req.scopes.iter().any(|s| s == "admin") => {
                        SchemeDecision::forbidden("admin scope required")
                    }
                    Some("user") => SchemeDecision::Allowed(Principal::user("u2", ["read"])),
                    _ => SchemeDecision::unauthenticated("missing bearer token"),
                }
            }
        });
        schemes
    }

    fn setup() -> (SecurityDispatcher, Probe) {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = SecurityDispatcher::new(Arc::new(registry(&calls)));
        (dispatcher, Probe { calls })
    }

    fn request(headers: &[(&'static str, &'static str)]) -> Request {
        let mut builder = http::Request::builder().method(Method::POST).uri("/users");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Bytes::new()).unwrap()
    }

    fn operation() -> OperationDescriptor {
        OperationDescriptor::builder("createUser")
            .method(Method::POST)
            .path("/users")
            .build()
    }

    fn either() -> Vec<SecurityRequirementSet> {
        vec![
            SecurityRequirementSet::new().scheme("apiKey"),
            SecurityRequirementSet::new().scheme_with_scopes("bearer", ["admin"]),
        ]
    }

    fn both() -> Vec<SecurityRequirementSet> {
        vec![SecurityRequirementSet::new().scheme("apiKey").scheme("bearer")]
    }

    #[tokio::test]
    async fn test_empty_requirements_allow_anonymously() {
        let (dispatcher, probe) = setup();
        let auth = dispatcher
            .authorize(&request(&[]), &operation(), &[])
            .await
            .unwrap();
        assert_eq!(auth, Authorization::Allowed(Principal::Anonymous));
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_first_satisfied_set_short_circuits() {
        let (dispatcher, probe) = setup();
        let auth = dispatcher
            .authorize(&request(&[("x-api-key", "good")]), &operation(), &either())
            .await
            .unwrap();
        assert!(matches!(auth, Authorization::Allowed(Principal::ApiKey { .. })));
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_set_can_satisfy() {
        let (dispatcher, probe) = setup();
        let auth = dispatcher
            .authorize(
                &request(&[("authorization", "Bearer admin")]),
                &operation(),
                &either(),
            )
            .await
            .unwrap();
        assert!(matches!(auth, Authorization::Allowed(Principal::User { .. })));
        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_denial_reports_last_set() {
        let (dispatcher, _probe) = setup();
        let auth = dispatcher
            .authorize(
                &request(&[("authorization", "Bearer user")]),
                &operation(),
                &either(),
            )
            .await
            .unwrap();
        assert_eq!(
            auth,
            Authorization::Denied(Denial {
                reason: "admin scope required".to_string(),
                kind: DenialKind::Forbidden,
            })
        );
    }

    #[tokio::test]
    async fn test_and_within_set_stops_at_first_denial() {
        let (dispatcher, probe) = setup();
        let auth = dispatcher
            .authorize(
                &request(&[("authorization", "Bearer admin")]),
                &operation(),
                &both(),
            )
            .await
            .unwrap();
        assert!(matches!(auth, Authorization::Denied(_)));
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_and_within_set_keeps_first_principal() {
        let (dispatcher, probe) = setup();
        let auth = dispatcher
            .authorize(
                &request(&[("x-api-key", "good"), ("authorization", "Bearer user")]),
                &operation(),
                &both(),
            )
            .await
            .unwrap();
        assert!(matches!(auth, Authorization::Allowed(Principal::ApiKey { .. })));
        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unregistered_scheme_is_unhandled() {
        let (dispatcher, _probe) = setup();
        let sets = vec![SecurityRequirementSet::new().scheme("oauth")];
        let err = dispatcher
            .authorize(&request(&[]), &operation(), &sets)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unhandled);
    }

    #[tokio::test]
    async fn test_stage_stores_principal() {
        let (dispatcher, _probe) = setup();
        let stage = SecurityStage::new(dispatcher);
        let catalog =
            ruo_core::OperationCatalog::from_definition(&ruo_core::fixtures::users_definition())
                .unwrap();

        let mut ctx =
            RequestContext::new(RequestId::new(), Arc::from("1"), Method::GET, "/users/me");
        ctx.set_operation(catalog.resolve(&Method::GET, "/users/me").unwrap());

        let mut denied = request(&[]);
        let err = stage.process(&mut ctx, &mut denied).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SecurityDenied);
        assert!(ctx.principal().is_none());

        let mut allowed = request(&[("x-api-key", "good")]);
        stage.process(&mut ctx, &mut allowed).await.unwrap();
        assert_eq!(ctx.principal().unwrap().log_id(), "apikey:k1");
    }
}
