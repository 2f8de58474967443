//! Common types used throughout the pipeline.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;
use ruo_core::{Reply, ReplyBody, RequestId};

/// Header carrying the request identifier in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The HTTP request type used in the pipeline.
///
/// The body is collected before the pipeline runs, so stages can read it
/// without awaiting.
pub type Request = http::Request<Bytes>;

/// The HTTP response type produced by the pipeline.
pub type Response = http::Response<Full<Bytes>>;

/// Extension trait for building error responses outside the pipeline.
pub trait ResponseExt {
    /// Creates a JSON error response in the standard `{code, message}` shape.
    fn json_error(status: StatusCode, code: &str, message: &str) -> Response;
}

impl ResponseExt for Response {
    fn json_error(status: StatusCode, code: &str, message: &str) -> Response {
        let body = serde_json::json!({
            "code": code,
            "message": message,
        });

        let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}

/// Serializes a [`Reply`] into the wire response.
///
/// Adds `content-type` for JSON and raw bodies unless the reply set one,
/// and always sets `x-request-id`.
#[must_use]
pub fn into_response(reply: Reply, request_id: RequestId) -> Response {
    let (mut status, headers, body) = reply.into_parts();

    let (content_type, bytes) = match body {
        ReplyBody::Empty => (None, Bytes::new()),
        ReplyBody::Json(value) => match serde_json::to_vec(&value) {
            Ok(encoded) => (
                Some(HeaderValue::from_static("application/json")),
                Bytes::from(encoded),
            ),
            Err(error) => {
                tracing::error!(%request_id, %error, "Failed to encode response body");
                status = StatusCode::INTERNAL_SERVER_ERROR;
                (None, Bytes::new())
            }
        },
        ReplyBody::Raw {
            content_type,
            bytes,
        } => (Some(content_type), bytes),
    };

    let mut response = Response::new(Full::new(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = headers;

    if let Some(content_type) = content_type {
        response
            .headers_mut()
            .entry(CONTENT_TYPE)
            .or_insert(content_type);
    }
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::json;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_json_error_response() {
        let response = Response::json_error(StatusCode::REQUEST_TIMEOUT, "Timeout", "too slow");
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(
            body_json(response).await,
            json!({"code": "Timeout", "message": "too slow"})
        );
    }

    #[tokio::test]
    async fn test_into_response_json() {
        let id = RequestId::new();
        let response = into_response(Reply::ok(json!({"id": "1"})), id);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(REQUEST_ID_HEADER).unwrap(),
            id.to_string().as_str()
        );
        assert_eq!(body_json(response).await, json!({"id": "1"}));
    }

    #[test]
    fn test_into_response_keeps_explicit_content_type() {
        let reply = Reply::ok(json!({})).with_header("content-type", "application/problem+json");
        let response = into_response(reply, RequestId::new());
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/problem+json"
        );
    }

    #[test]
    fn test_into_response_empty() {
        let response = into_response(Reply::empty(StatusCode::NO_CONTENT), RequestId::new());
        assert!(response.headers().get(CONTENT_TYPE).is_none());
    }
}
