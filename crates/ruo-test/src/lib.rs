//! # Ruo Test
//!
//! In-process testing for Ruo applications. Requests go through the
//! complete pipeline, exactly as they would behind the HTTP server, but no
//! socket is bound.
//!
//! ## Example
//!
//! ```ignore
//! use ruo_test::TestClient;
//!
//! #[tokio::test]
//! async fn test_get_user() {
//!     let client = TestClient::new(app);
//!
//!     let response = client
//!         .get("/users/123")
//!         .header("x-api-key", "secret")
//!         .send()
//!         .await;
//!
//!     response.assert_status_code(200);
//!     assert_eq!(response.json_value().unwrap()["id"], "123");
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/ruo-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

// Re-export main types at crate root
pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::{TestRequest, TestRequestBuilder};
pub use response::TestResponse;
