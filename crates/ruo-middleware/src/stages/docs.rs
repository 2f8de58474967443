//! API document serving.

use bytes::Bytes;
use http::header::HeaderValue;
use http::{Method, StatusCode};
use ruo_core::{BoxFuture, PipelineError, Reply};
use serde_json::Value;

use crate::context::RequestContext;
use crate::stage::{Flow, Stage};
use crate::types::Request;

/// Serves the API definition document at a fixed path.
///
/// The document is encoded once at construction.
#[derive(Debug, Clone)]
pub struct DocsStage {
    path: String,
    body: Bytes,
}

impl DocsStage {
    /// Creates a stage answering `GET path` with `document`.
    #[must_use]
    pub fn new(path: impl Into<String>, document: &Value) -> Self {
        Self {
            path: path.into(),
            body: Bytes::from(document.to_string()),
        }
    }

    /// Returns the path the document is served at.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Stage for DocsStage {
    fn name(&self) -> &'static str {
        "documentation"
    }

    fn requires_operation(&self) -> bool {
        false
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        _request: &'a mut Request,
    ) -> BoxFuture<'a, Result<Flow, PipelineError>> {
        Box::pin(async move {
            if ctx.method() == Method::GET && ctx.path() == self.path {
                return Ok(Flow::Respond(Reply::raw(
                    StatusCode::OK,
                    HeaderValue::from_static("application/json"),
                    self.body.clone(),
                )));
            }
            Ok(Flow::Continue)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ruo_core::{ReplyBody, RequestId};
    use serde_json::json;
    use std::sync::Arc;

    fn run(stage: &DocsStage, method: Method, path: &str) -> Flow {
        let mut ctx = RequestContext::new(RequestId::new(), Arc::from("1"), method, path);
        let mut request = http::Request::new(Bytes::new());
        tokio_test::block_on(stage.process(&mut ctx, &mut request)).unwrap()
    }

    #[test]
    fn test_serves_document() {
        let stage = DocsStage::new("/openapi.json", &json!({"openapi": "3.0.3"}));
        let Flow::Respond(reply) = run(&stage, Method::GET, "/openapi.json") else {
            panic!("expected a response");
        };
        let ReplyBody::Raw { bytes, .. } = reply.body() else {
            panic!("expected raw body");
        };
        assert_eq!(bytes.as_ref(), br#"{"openapi":"3.0.3"}"#);
    }

    #[test]
    fn test_other_requests_continue() {
        let stage = DocsStage::new("/openapi.json", &json!({}));
        assert!(matches!(run(&stage, Method::POST, "/openapi.json"), Flow::Continue));
        assert!(matches!(run(&stage, Method::GET, "/users"), Flow::Continue));
    }
}
