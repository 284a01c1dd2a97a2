//! Buffered and streaming upstream forwarding.
//!
//! # Responsibilities
//! - Execute one upstream HTTP call per inbound request, no retries
//! - Enforce the timeout tiers: connect and pool-acquire are fixed,
//!   the read deadline is resolved per route
//! - Relay streaming bodies chunk-by-chunk without full-body buffering
//! - Classify upstream failures (timeout / unreachable / other)
//!
//! # Design Decisions
//! - One shared connection pool process-wide; a semaphore caps total
//!   concurrent upstream connections on top of hyper's idle pooling
//! - Request bodies are fully buffered before dispatch, so transmission
//!   is bounded together with the read deadline
//! - A streaming response holds its pool slot until the relay finishes;
//!   dropping the response body (caller disconnect) cancels the upstream
//!   call and releases the slot

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, Response, Uri};
use hyper::body::{Body as HttpBody, Frame, Incoming, SizeHint};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tower_http::timeout::TimeoutBody;

use crate::config::UpstreamConfig;
use crate::proxy::error::ProxyError;
use crate::proxy::headers::{filter_headers, Direction};

/// Fixed timeout tiers applied to every upstream call. The read deadline
/// is not part of this set; it is resolved per route.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutTiers {
    /// TCP connection establishment.
    pub connect: Duration,

    /// Waiting for a free slot in the upstream connection pool.
    pub pool_acquire: Duration,
}

impl Default for TimeoutTiers {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            pool_acquire: Duration::from_secs(10),
        }
    }
}

/// Shared upstream HTTP client with pooling and admission control.
pub struct UpstreamClient {
    client: Client<HttpConnector, Body>,
    base_url: String,
    pool: Arc<Semaphore>,
    tiers: TimeoutTiers,
}

impl UpstreamClient {
    /// Build the shared client from upstream configuration.
    pub fn new(config: &UpstreamConfig) -> Self {
        Self::with_tiers(config, TimeoutTiers::default())
    }

    pub fn with_tiers(config: &UpstreamConfig, tiers: TimeoutTiers) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(tiers.connect));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(config.max_idle_connections)
            .build(connector);

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            pool: Arc::new(Semaphore::new(config.max_connections)),
            tiers,
        }
    }

    /// Forward one request and return the complete upstream response.
    ///
    /// The resolved read timeout bounds both the wait for response headers
    /// and the read of the full body.
    pub async fn forward_buffered(
        &self,
        method: Method,
        path_and_query: &str,
        headers: &HeaderMap,
        body: Bytes,
        read_timeout: Duration,
    ) -> Result<Response<Body>, ProxyError> {
        let path = uri_path(path_and_query);
        let _slot = self.acquire_slot(&path).await?;

        let request = self.build_request(method, path_and_query, headers, body)?;
        let response = self.dispatch(request, &path, read_timeout).await?;
        let (parts, upstream_body) = response.into_parts();

        let bytes = tokio::time::timeout(
            read_timeout,
            axum::body::to_bytes(Body::new(upstream_body), usize::MAX),
        )
        .await
        .map_err(|_| ProxyError::Timeout { path: path.clone(), timeout: read_timeout })?
        .map_err(|e| ProxyError::Other(format!("failed to read upstream response body: {e}")))?;

        let mut response = Response::builder()
            .status(parts.status)
            .body(Body::from(bytes))
            .map_err(|e| ProxyError::Other(format!("failed to build response: {e}")))?;
        *response.headers_mut() = filter_headers(&parts.headers, Direction::Response);
        Ok(response)
    }

    /// Forward one request and relay its response body incrementally.
    ///
    /// Status and filtered headers are returned as soon as the upstream
    /// response arrives; body chunks are then relayed from the same call
    /// with the read timeout applied per chunk. A failure after headers
    /// have been returned truncates the stream.
    pub async fn forward_streaming(
        &self,
        method: Method,
        path_and_query: &str,
        headers: &HeaderMap,
        body: Bytes,
        read_timeout: Duration,
    ) -> Result<Response<Body>, ProxyError> {
        let path = uri_path(path_and_query);
        let slot = self.acquire_slot(&path).await?;

        let request = self.build_request(method, path_and_query, headers, body)?;
        let response = self.dispatch(request, &path, read_timeout).await?;
        let (parts, upstream_body) = response.into_parts();

        // The slot rides along with the relayed body; it is released when
        // the stream ends or the caller goes away.
        let relay = RelayBody { inner: upstream_body, _slot: slot };
        let mut response = Response::builder()
            .status(parts.status)
            .body(Body::new(TimeoutBody::new(read_timeout, relay)))
            .map_err(|e| ProxyError::Other(format!("failed to build response: {e}")))?;
        *response.headers_mut() = filter_headers(&parts.headers, Direction::Response);
        Ok(response)
    }

    /// Wait for a free upstream connection slot, bounded by the
    /// pool-acquire tier.
    async fn acquire_slot(&self, path: &str) -> Result<OwnedSemaphorePermit, ProxyError> {
        tokio::time::timeout(self.tiers.pool_acquire, self.pool.clone().acquire_owned())
            .await
            .map_err(|_| ProxyError::Timeout {
                path: path.to_string(),
                timeout: self.tiers.pool_acquire,
            })?
            .map_err(|_| ProxyError::Other("upstream connection pool closed".to_string()))
    }

    fn build_request(
        &self,
        method: Method,
        path_and_query: &str,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<Request<Body>, ProxyError> {
        let uri: Uri = format!("{}{}", self.base_url, path_and_query)
            .parse()
            .map_err(|e| ProxyError::Other(format!("invalid upstream uri: {e}")))?;

        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::from(body))
            .map_err(|e| ProxyError::Other(format!("failed to build upstream request: {e}")))?;
        *request.headers_mut() = filter_headers(headers, Direction::Request);
        Ok(request)
    }

    /// Issue the upstream call, bounded by the read deadline, and
    /// classify failures.
    async fn dispatch(
        &self,
        request: Request<Body>,
        path: &str,
        read_timeout: Duration,
    ) -> Result<Response<Incoming>, ProxyError> {
        tokio::time::timeout(read_timeout, self.client.request(request))
            .await
            .map_err(|_| ProxyError::Timeout { path: path.to_string(), timeout: read_timeout })?
            .map_err(|e| self.classify(e, path))
    }

    fn classify(&self, err: hyper_util::client::legacy::Error, path: &str) -> ProxyError {
        if err.is_connect() {
            // A connect-phase failure is either the connect tier elapsing
            // or the upstream being unreachable.
            if io_timed_out(&err) {
                return ProxyError::Timeout {
                    path: path.to_string(),
                    timeout: self.tiers.connect,
                };
            }
            return ProxyError::Unreachable(root_cause(&err));
        }
        ProxyError::Other(root_cause(&err))
    }
}

fn uri_path(path_and_query: &str) -> String {
    match path_and_query.split_once('?') {
        Some((path, _)) => path.to_string(),
        None => path_and_query.to_string(),
    }
}

/// Walk the source chain for an I/O timeout.
fn io_timed_out(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return true;
            }
        }
        current = e.source();
    }
    false
}

/// The innermost error message in the source chain.
fn root_cause(err: &(dyn std::error::Error + 'static)) -> String {
    let mut current: &(dyn std::error::Error + 'static) = err;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}

/// Upstream response body carrying its pool slot for the lifetime of
/// the relay.
struct RelayBody {
    inner: Incoming,
    _slot: OwnedSemaphorePermit,
}

impl HttpBody for RelayBody {
    type Data = Bytes;
    type Error = hyper::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.get_mut().inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
