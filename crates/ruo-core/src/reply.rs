//! Structured responses.
//!
//! Handlers and the error funnel produce a [`Reply`] rather than a raw HTTP
//! response so the response pipeline can still inspect and prune the JSON
//! body before it is serialized.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::error::PipelineError;

/// The body of a [`Reply`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    /// No body.
    Empty,
    /// A JSON document; subject to response pruning and validation.
    Json(Value),
    /// Pre-encoded bytes, sent as-is.
    Raw {
        /// Value of the `content-type` header.
        content_type: HeaderValue,
        /// Encoded body.
        bytes: Bytes,
    },
}

/// A response produced by a handler or by the pipeline.
///
/// # Example
///
/// ```
/// use ruo_core::{Reply, ReplyBody};
/// use http::StatusCode;
/// use serde_json::json;
///
/// let reply = Reply::json(StatusCode::CREATED, json!({"id": "1"}))
///     .with_header("location", "/users/1");
///
/// assert_eq!(reply.status(), StatusCode::CREATED);
/// assert!(matches!(reply.body(), ReplyBody::Json(_)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: ReplyBody,
}

impl Reply {
    /// Creates a reply with a JSON body.
    #[must_use]
    pub fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: ReplyBody::Json(body),
        }
    }

    /// Creates a `200 OK` reply with a JSON body.
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self::json(StatusCode::OK, body)
    }

    /// Serializes `body` into a JSON reply.
    ///
    /// A serialization failure is a handler defect, so it surfaces as
    /// `Unhandled`.
    pub fn serialize<T: Serialize>(status: StatusCode, body: &T) -> Result<Self, PipelineError> {
        let value = serde_json::to_value(body).map_err(anyhow::Error::from)?;
        Ok(Self::json(status, value))
    }

    /// Creates a reply without a body.
    #[must_use]
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: ReplyBody::Empty,
        }
    }

    /// Creates a reply with pre-encoded bytes.
    #[must_use]
    pub fn raw(status: StatusCode, content_type: HeaderValue, bytes: Bytes) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: ReplyBody::Raw {
                content_type,
                bytes,
            },
        }
    }

    /// Adds a header. Invalid names or values are ignored.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Returns the status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the headers for modification.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the body.
    #[must_use]
    pub const fn body(&self) -> &ReplyBody {
        &self.body
    }

    /// Returns the body for modification.
    pub fn body_mut(&mut self) -> &mut ReplyBody {
        &mut self.body
    }

    /// Returns the JSON body, if there is one.
    #[must_use]
    pub const fn json_body(&self) -> Option<&Value> {
        match &self.body {
            ReplyBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Splits the reply into its parts.
    #[must_use]
    pub fn into_parts(self) -> (StatusCode, HeaderMap, ReplyBody) {
        (self.status, self.headers, self.body)
    }
}
