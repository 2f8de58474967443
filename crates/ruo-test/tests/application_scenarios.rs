//! Scenario tests that drive a complete application through the test client.
//!
//! 1. Unmatched requests end in the generic 404 and never reach operation stages
//! 2. Responses are pruned to the declared schema
//! 3. Security denials use the configured statuses and never reach the handler
//! 4. Handler failures are hidden from clients
//! 5. Request identity, concurrency isolation and cancellation
//! 6. A failing error renderer aborts the request

mod common;

use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use ruo::core::{fixtures, schema};
use ruo::prelude::*;
use ruo_test::{TestClient, TestError};
use serde_json::json;

#[tokio::test]
async fn test_unregistered_path_is_generic_not_found() {
    let (client, counters) = common::client();

    let response = client.get("/nope").send().await;

    response
        .assert_status(StatusCode::NOT_FOUND)
        .assert_json_eq(&json!({
            "code": "NotFound",
            "message": "No operation matches GET /nope"
        }));
    assert!(response.request_id().is_some());
    assert_eq!(counters.pre_hook(), 0);
    assert_eq!(counters.handler_calls(), 0);
}

#[tokio::test]
async fn test_get_user_is_pruned_to_declared_fields() {
    let (client, counters) = common::client();

    let response = client.get("/users/1").send().await;

    response
        .assert_status_code(200)
        .assert_json_eq(&json!({"id": "1", "name": "A"}));
    assert_eq!(counters.pre_hook(), 1);
}

#[tokio::test]
async fn test_pruned_body_is_a_fixed_point() {
    let (client, _) = common::client();

    let body = client.get("/users/1").send().await.json_value().unwrap();
    let mut again = body.clone();
    schema::prune(&mut again, &fixtures::user_schema());
    assert_eq!(again, body);
}

#[tokio::test]
async fn test_missing_api_key_is_denied_before_handler() {
    let (client, counters) = common::client();

    client
        .get("/users/me")
        .send()
        .await
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_error_code("SecurityDenied");
    assert_eq!(counters.handler_calls(), 0);

    client
        .get("/users/me")
        .header("x-api-key", "secret")
        .send()
        .await
        .assert_status_code(200)
        .assert_json_eq(&json!({"id": "apikey:k1", "name": "me"}));
}

#[tokio::test]
async fn test_denial_status_follows_configuration() {
    let counters = common::Counters::default();
    let mut config = RuoConfig::default();
    config.pipeline.unauthenticated_status = 403;
    let app = common::builder(&counters).config(config).build().unwrap();
    let client = TestClient::new(app);

    client
        .get("/users/me")
        .send()
        .await
        .assert_status(StatusCode::FORBIDDEN)
        .assert_error_code("SecurityDenied");
}

#[tokio::test]
async fn test_denial_reports_last_requirement_set() {
    let (client, counters) = common::client();

    // createUser: apiKey OR bearer(admin). The bearer set is evaluated last.
    let response = client
        .post("/users")
        .bearer_token("user-token")
        .json(&json!({"name": "Ada"}))
        .send()
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json_value().unwrap()["message"], "insufficient scope");
    assert_eq!(counters.handler_calls(), 0);

    client
        .post("/users")
        .bearer_token("admin-token")
        .json(&json!({"name": "Ada"}))
        .send()
        .await
        .assert_status(StatusCode::CREATED)
        .assert_json_eq(&json!({"id": "new", "name": "Ada"}));
}

#[tokio::test]
async fn test_missing_required_field_never_reaches_handler() {
    let (client, counters) = common::client();

    let response = client
        .post("/users")
        .header("x-api-key", "secret")
        .json(&json!({"email": "ada@example.com"}))
        .send()
        .await;

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_code("ValidationFailed");
    let details = response.json_value().unwrap()["details"].clone();
    assert!(details
        .as_array()
        .unwrap()
        .iter()
        .any(|v| v["location"] == "/body/name"));
    assert_eq!(counters.handler_calls(), 0);
}

#[tokio::test]
async fn test_query_is_coerced_for_the_handler() {
    let (client, _) = common::client();

    client
        .get("/users")
        .query(&[("limit", "5")])
        .send()
        .await
        .assert_status_code(200)
        .assert_json_eq(&json!({"users": [], "total": 5}));

    client
        .get("/users?limit=500")
        .send()
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_handler_failure_is_hidden() {
    let (client, _) = common::client();

    let response = client.get("/users/boom").send().await;

    response
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_error_code("HandlerFailed");
    let text = response.text().unwrap();
    assert!(!text.contains("db-primary"), "cause leaked: {text}");
}

#[tokio::test]
async fn test_handler_panic_is_handler_failed() {
    let (client, _) = common::client();

    client
        .get("/users/panic")
        .send()
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_error_code("HandlerFailed");

    // The application keeps serving.
    client.get("/users/2").send().await.assert_status_code(200);
}

#[tokio::test]
async fn test_declared_handler_outcome_passes_through() {
    let (client, _) = common::client();

    client
        .get("/users/missing")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND)
        .assert_json_eq(&json!({"code": "NotFound", "message": "user not found"}));
}

#[tokio::test]
async fn test_request_id_is_propagated_or_generated() {
    let (client, _) = common::client();
    let id = "0190a5c4-7c2e-7b6a-9d3f-5e4c3b2a1908";

    client
        .get("/users/1")
        .header("x-request-id", id)
        .send()
        .await
        .assert_header("x-request-id", id);

    let generated = client
        .get("/users/1")
        .header("x-request-id", "not a uuid")
        .send()
        .await;
    let generated = generated.request_id().unwrap();
    assert_ne!(generated, "not a uuid");
    assert!(RequestId::from_header(generated).is_some());
}

#[tokio::test]
async fn test_concurrent_requests_are_isolated() {
    let (client, _) = common::client();
    let mut tasks = tokio::task::JoinSet::new();

    for i in 0..32 {
        let client = client.clone();
        tasks.spawn(async move {
            let response = client.get(format!("/users/u{i}")).send().await;
            (i, response.json_value().unwrap())
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (i, body) = joined.unwrap();
        assert_eq!(body, json!({"id": format!("u{i}"), "name": "A"}));
    }
}

#[tokio::test]
async fn test_dropped_request_stops_the_chain() {
    let (client, counters) = common::client();

    let result = tokio::time::timeout(
        Duration::from_millis(50),
        client.get("/users/slow").send(),
    )
    .await;
    assert!(result.is_err(), "slow request should not finish");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(counters.handler_calls(), 1);
    assert_eq!(counters.completed(), 0);
}

#[tokio::test]
async fn test_document_is_served() {
    let (client, _) = common::client();

    let response = client.get("/api-docs").send().await;
    response.assert_status_code(200);
    assert_eq!(response.json_value().unwrap()["info"]["version"], "1.0.0");
}

struct BrokenRenderer;

impl ErrorRenderer for BrokenRenderer {
    fn render(&self, _status: StatusCode, _envelope: &ErrorEnvelope) -> anyhow::Result<Reply> {
        anyhow::bail!("template missing")
    }
}

#[tokio::test]
async fn test_failing_renderer_aborts_the_request() {
    let counters = common::Counters::default();
    let app = common::builder(&counters)
        .error_renderer(BrokenRenderer)
        .build()
        .unwrap();
    let client = TestClient::new(app);

    let err = client.get("/nope").try_send().await.unwrap_err();
    match err {
        TestError::Aborted(abort) => {
            assert_eq!(abort.kind, ErrorKind::NotFound);
            assert!(abort.reason.contains("template missing"));
        }
        other => panic!("expected an abort, got {other:?}"),
    }

    // Successful replies do not touch the renderer.
    client.get("/users/1").send().await.assert_status_code(200);
}

struct PlainTextRenderer;

impl ErrorRenderer for PlainTextRenderer {
    fn render(&self, status: StatusCode, envelope: &ErrorEnvelope) -> anyhow::Result<Reply> {
        Ok(Reply::raw(
            status,
            http::HeaderValue::from_static("text/plain"),
            format!("{}: {}", envelope.code, envelope.message).into(),
        ))
    }
}

#[tokio::test]
async fn test_custom_renderer_shapes_error_bodies() {
    let counters = common::Counters::default();
    let app = common::builder(&counters)
        .error_renderer(PlainTextRenderer)
        .build()
        .unwrap();
    let client = TestClient::from_arc(Arc::new(app));

    let response = client.get("/users/me").send().await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.content_type(), Some("text/plain"));
    assert_eq!(response.text().unwrap(), "SecurityDenied: missing api key");
}
