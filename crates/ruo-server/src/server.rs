//! The HTTP accept loop.
//!
//! Each connection runs on its own task with Hyper's HTTP/1.1 codec. For
//! every request the body is collected (bounded by the request timeout and
//! the body size limit) and the complete request is handed to the
//! [`Dispatch`] implementation.
//!
//! | Outcome | Wire behavior |
//! |---------|---------------|
//! | Body read fails | `400 BadRequest` |
//! | Body exceeds the size limit | `413 PayloadTooLarge` |
//! | Body not received in time | `408 RequestTimeout` |
//! | Dispatch returns a response | the response |
//! | Dispatch aborts | connection closed, no response |
//!
//! Dropping a connection drops its in-flight dispatch future, which
//! cancels the request wherever it is suspended.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use ruo_middleware::{PipelineAbort, Request, Response, ResponseExt};
use tokio::net::{TcpListener, TcpStream};

use crate::config::ServerConfig;
use crate::dispatch::Dispatch;
use crate::error::ServerError;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// The Ruo HTTP server.
pub struct Server {
    config: ServerConfig,
    dispatcher: Arc<dyn Dispatch>,
}

impl Server {
    /// Creates a server that answers requests with `dispatcher`.
    #[must_use]
    pub fn new(config: ServerConfig, dispatcher: Arc<dyn Dispatch>) -> Self {
        Self { config, dispatcher }
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Runs until SIGTERM or SIGINT.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals()).await
    }

    /// Binds the configured address and runs until `shutdown` triggers.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self
            .config
            .socket_addr()
            .map_err(|source| ServerError::InvalidAddress {
                addr: self.config.http_addr().to_string(),
                source,
            })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        self.serve(listener, shutdown).await
    }

    /// Serves connections from an already bound listener until `shutdown`
    /// triggers, then waits for open connections up to the shutdown timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener's local address cannot be read.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "Server listening");

        let tracker = ConnectionTracker::new();
        let limits = BodyLimits {
            timeout: self.config.request_timeout(),
            max_bytes: self.config.max_body_bytes(),
        };

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let dispatcher = Arc::clone(&self.dispatcher);
                            let token = tracker.acquire();
                            let shutdown = shutdown.clone();

                            tokio::spawn(async move {
                                let served =
                                    serve_connection(stream, dispatcher, limits, shutdown).await;
                                if let Err(error) = served {
                                    tracing::debug!(
                                        %remote_addr,
                                        %error,
                                        "Connection closed with error"
                                    );
                                }
                                drop(token);
                            });
                        }
                        Err(error) => {
                            tracing::error!(%error, "Failed to accept connection");
                        }
                    }
                }

                () = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        let shutdown_timeout = self.config.shutdown_timeout();
        tracing::info!(
            active_connections = tracker.active_connections(),
            timeout_secs = shutdown_timeout.as_secs(),
            "Waiting for connections to close"
        );

        tokio::select! {
            () = tracker.wait_for_shutdown() => {
                tracing::info!("All connections closed");
            }
            () = tokio::time::sleep(shutdown_timeout) => {
                tracing::warn!(
                    active_connections = tracker.active_connections(),
                    "Shutdown timeout reached"
                );
            }
        }

        tracing::info!("Server stopped");
        Ok(())
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// How much of a request body the server waits for.
#[derive(Debug, Clone, Copy)]
struct BodyLimits {
    timeout: Duration,
    max_bytes: usize,
}

async fn serve_connection(
    stream: TcpStream,
    dispatcher: Arc<dyn Dispatch>,
    limits: BodyLimits,
    shutdown: ShutdownSignal,
) -> Result<(), hyper::Error> {
    let io = TokioIo::new(stream);

    let service = service_fn(move |request: http::Request<Incoming>| {
        let dispatcher = Arc::clone(&dispatcher);
        async move { handle_request(dispatcher.as_ref(), request, limits).await }
    });

    let conn = http1::Builder::new().serve_connection(io, service);
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => result,
        () = shutdown.recv() => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    }
}

async fn handle_request(
    dispatcher: &dyn Dispatch,
    request: http::Request<Incoming>,
    limits: BodyLimits,
) -> Result<Response, PipelineAbort> {
    let (parts, body) = request.into_parts();
    let body = Limited::new(body, limits.max_bytes);

    let bytes = match tokio::time::timeout(limits.timeout, body.collect()).await {
        Ok(Ok(collected)) => collected.to_bytes(),
        Ok(Err(error)) if error.is::<LengthLimitError>() => {
            tracing::warn!(
                limit = limits.max_bytes,
                method = %parts.method,
                path = parts.uri.path(),
                "Request body exceeds the size limit"
            );
            return Ok(Response::json_error(
                StatusCode::PAYLOAD_TOO_LARGE,
                "PayloadTooLarge",
                "Request body exceeds the size limit",
            ));
        }
        Ok(Err(error)) => {
            tracing::warn!(
                %error,
                method = %parts.method,
                path = parts.uri.path(),
                "Failed to read request body"
            );
            return Ok(Response::json_error(
                StatusCode::BAD_REQUEST,
                "BadRequest",
                "Failed to read request body",
            ));
        }
        Err(_) => {
            tracing::warn!(
                method = %parts.method,
                path = parts.uri.path(),
                "Request body timed out"
            );
            return Ok(Response::json_error(
                StatusCode::REQUEST_TIMEOUT,
                "RequestTimeout",
                "Request body was not received in time",
            ));
        }
    };

    let result = dispatcher.dispatch(Request::from_parts(parts, bytes)).await;
    if let Err(abort) = &result {
        tracing::error!(error = %abort, "Request aborted, closing connection");
    }
    result
}

/// Binds `addr` and returns the listener with its local address.
///
/// Useful with port `0`, where the real port is only known after binding.
///
/// # Errors
///
/// Returns an error if the address is invalid or cannot be bound.
pub async fn bind(addr: &str) -> Result<(TcpListener, SocketAddr), ServerError> {
    let parsed: SocketAddr = addr.parse().map_err(|source| ServerError::InvalidAddress {
        addr: addr.to_string(),
        source,
    })?;
    let listener = TcpListener::bind(parsed)
        .await
        .map_err(|source| ServerError::Bind {
            addr: parsed,
            source,
        })?;
    let local = listener.local_addr()?;
    Ok((listener, local))
}
