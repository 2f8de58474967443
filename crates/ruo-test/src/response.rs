//! Test response wrapper.

use std::fmt;

use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use http_body_util::BodyExt;
use ruo_middleware::REQUEST_ID_HEADER;
use serde::de::DeserializeOwned;

use crate::error::TestError;

/// A collected response with assertion helpers.
#[derive(Clone)]
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Collects an HTTP response.
    ///
    /// # Errors
    ///
    /// Returns [`TestError::BodyRead`] if the body cannot be collected.
    pub async fn from_http<B>(response: http::Response<B>) -> Result<Self, TestError>
    where
        B: BodyExt,
        B::Error: fmt::Display,
    {
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| TestError::BodyRead(e.to_string()))?
            .to_bytes();

        Ok(Self {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }

    /// Returns the status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the status as a u16.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Returns the headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Gets a header value by name.
    #[must_use]
    pub fn header(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.headers.get(name.as_ref())
    }

    /// Gets a header value as a string.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.header(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the Content-Type header value.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header_str(header::CONTENT_TYPE.as_str())
    }

    /// Returns the `x-request-id` header value.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.header_str(REQUEST_ID_HEADER)
    }

    /// Returns the raw body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid UTF-8.
    pub fn text(&self) -> Result<String, TestError> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| TestError::BodyRead(format!("Invalid UTF-8: {e}")))
    }

    /// Deserializes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`TestError::Json`] if the body does not deserialize.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Deserializes the body as a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`TestError::Json`] if the body is not JSON.
    pub fn json_value(&self) -> Result<serde_json::Value, TestError> {
        self.json()
    }

    /// Asserts the status.
    ///
    /// # Panics
    ///
    /// Panics if the status differs; the message includes the body.
    #[track_caller]
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {expected}, got {} with body {}",
            self.status,
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Asserts the status as a u16.
    ///
    /// # Panics
    ///
    /// Panics if the status differs.
    #[track_caller]
    pub fn assert_status_code(&self, expected: u16) -> &Self {
        assert_eq!(
            self.status.as_u16(),
            expected,
            "Expected status {expected}, got {} with body {}",
            self.status.as_u16(),
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Asserts the error envelope's `code`.
    ///
    /// # Panics
    ///
    /// Panics if the body is not an envelope with that code.
    #[track_caller]
    pub fn assert_error_code(&self, expected: &str) -> &Self {
        let code = self
            .json_value()
            .ok()
            .and_then(|body| body.get("code").and_then(|c| c.as_str()).map(String::from));
        assert_eq!(
            code.as_deref(),
            Some(expected),
            "Expected error code {expected}, body was {}",
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Asserts a header value.
    ///
    /// # Panics
    ///
    /// Panics if the header is missing or differs.
    #[track_caller]
    pub fn assert_header(&self, name: impl AsRef<str>, expected: impl AsRef<str>) -> &Self {
        let name = name.as_ref();
        assert_eq!(
            self.header_str(name),
            Some(expected.as_ref()),
            "Header {name} mismatch"
        );
        self
    }

    /// Asserts the JSON body equals `expected`.
    ///
    /// # Panics
    ///
    /// Panics if the body is not JSON or differs.
    #[track_caller]
    pub fn assert_json_eq(&self, expected: &serde_json::Value) -> &Self {
        match self.json_value() {
            Ok(actual) => assert_eq!(&actual, expected, "JSON body mismatch"),
            Err(e) => panic!("Body is not JSON ({e}): {}", String::from_utf8_lossy(&self.body)),
        }
        self
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &String::from_utf8_lossy(&self.body))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;
    use serde_json::json;

    async fn response(status: StatusCode, body: &str) -> TestResponse {
        let response = http::Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .header("x-request-id", "abc")
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap();
        TestResponse::from_http(response).await.unwrap()
    }

    #[tokio::test]
    async fn test_accessors() {
        let response = response(StatusCode::OK, r#"{"id": "7"}"#).await;
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.content_type(), Some("application/json"));
        assert_eq!(response.request_id(), Some("abc"));
        assert_eq!(response.json_value().unwrap(), json!({"id": "7"}));
    }

    #[tokio::test]
    async fn test_assertions_chain() {
        let response = response(
            StatusCode::NOT_FOUND,
            r#"{"code": "NotFound", "message": "gone"}"#,
        )
        .await;
        response
            .assert_status(StatusCode::NOT_FOUND)
            .assert_error_code("NotFound")
            .assert_header("x-request-id", "abc")
            .assert_json_eq(&json!({"code": "NotFound", "message": "gone"}));
    }

    #[tokio::test]
    #[should_panic(expected = "Expected status 200")]
    async fn test_status_mismatch_panics() {
        response(StatusCode::BAD_REQUEST, "{}").await.assert_status_code(200);
    }

    #[tokio::test]
    async fn test_non_json_body() {
        let response = response(StatusCode::OK, "plain").await;
        assert_eq!(response.text().unwrap(), "plain");
        assert!(matches!(response.json_value(), Err(TestError::Json(_))));
    }
}
