//! Shared user-service application for the scenario tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ruo::core::fixtures;
use ruo::prelude::*;
use ruo_test::TestClient;
use serde_json::json;

/// Side-effect counters the handlers and hooks bump.
#[derive(Debug, Clone, Default)]
pub struct Counters {
    pub handler_calls: Arc<AtomicUsize>,
    pub completed: Arc<AtomicUsize>,
    pub pre_hook: Arc<AtomicUsize>,
}

impl Counters {
    pub fn handler_calls(&self) -> usize {
        self.handler_calls.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn pre_hook(&self) -> usize {
        self.pre_hook.load(Ordering::SeqCst)
    }
}

async fn api_key(req: SchemeRequest) -> SchemeDecision {
    match req.header("x-api-key") {
        Some("secret") => SchemeDecision::Allowed(Principal::api_key("k1", Vec::<String>::new())),
        Some(_) => SchemeDecision::unauthenticated("invalid api key"),
        None => SchemeDecision::unauthenticated("missing api key"),
    }
}

async fn bearer(req: SchemeRequest) -> SchemeDecision {
    match req.bearer_token() {
        Some("admin-token") => SchemeDecision::Allowed(Principal::user("admin", ["admin"])),
        Some(_) if !req.scopes.is_empty() => SchemeDecision::forbidden("insufficient scope"),
        Some(_) => SchemeDecision::Allowed(Principal::user("u1", Vec::<String>::new())),
        None => SchemeDecision::unauthenticated("missing bearer token"),
    }
}

/// A builder with every fixture operation bound.
///
/// `getUser` behaves by id: `boom` fails, `panic` panics, `missing` is a
/// declared 404, `slow` sleeps for ten seconds, anything else succeeds
/// with an undeclared `extra: null` field.
pub fn builder(counters: &Counters) -> ApplicationBuilder {
    let calls = Arc::clone(&counters.handler_calls);
    let completed = Arc::clone(&counters.completed);
    let get_user = move |inv: Invocation| {
        calls.fetch_add(1, Ordering::SeqCst);
        let completed = Arc::clone(&completed);
        async move {
            let id = inv.path_param("id").unwrap_or_default().to_string();
            match id.as_str() {
                "boom" => {
                    let cause = anyhow::anyhow!("connection refused by db-primary:5432");
                    return Err(PipelineError::from(cause));
                }
                "panic" => panic!("handler bug"),
                "missing" => return Err(PipelineError::not_found("user not found")),
                "slow" => tokio::time::sleep(Duration::from_secs(10)).await,
                _ => {}
            }
            completed.fetch_add(1, Ordering::SeqCst);
            Ok(Reply::ok(json!({"id": id, "name": "A", "extra": null})))
        }
    };

    let calls = Arc::clone(&counters.handler_calls);
    let create_user = move |inv: Invocation| {
        calls.fetch_add(1, Ordering::SeqCst);
        async move {
            let name = inv.params().body().and_then(|b| b.get("name")).cloned();
            Ok::<_, PipelineError>(Reply::json(
                http::StatusCode::CREATED,
                json!({"id": "new", "name": name}),
            ))
        }
    };

    let current_user = |inv: Invocation| async move {
        let who = inv.principal().map_or_else(|| "nobody".to_string(), Principal::log_id);
        Ok::<_, PipelineError>(Reply::ok(json!({"id": who, "name": "me"})))
    };

    let list_users = |inv: Invocation| async move {
        let total = inv.params().query("limit").cloned().unwrap_or(json!(0));
        Ok::<_, PipelineError>(Reply::ok(json!({"users": [], "total": total})))
    };

    let delete_user = |_inv: Invocation| async move {
        Ok::<_, PipelineError>(Reply::empty(http::StatusCode::NO_CONTENT))
    };

    let pre_hook = Arc::clone(&counters.pre_hook);

    Application::builder()
        .definition(fixtures::users_definition())
        .handler("getUser", get_user)
        .handler("createUser", create_user)
        .handler("getCurrentUser", current_user)
        .handler("listUsers", list_users)
        .handler("deleteUser", delete_user)
        .security_scheme("apiKey", api_key)
        .security_scheme("bearer", bearer)
        .pre_handler_hook(move |_ctx| {
            pre_hook.fetch_add(1, Ordering::SeqCst);
        })
}

/// A client for the default user-service application.
pub fn client() -> (TestClient, Counters) {
    let counters = Counters::default();
    let app = builder(&counters).build().expect("fixture application builds");
    (TestClient::new(app), counters)
}
