//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum router with the liveness and proxy handlers
//! - Wire up middleware (tracing, request ID)
//! - Classify requests (streaming vs buffered) from the JSON body
//! - Resolve the per-route timeout and dispatch to a forwarder
//! - Serve over TLS with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, on, MethodFilter};
use axum::{Json, Router};
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::proxy::UpstreamClient;
use crate::routing::RouteTable;

/// Application state injected into handlers. Constructed once from the
/// merged configuration; no ambient globals.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub upstream: Arc<UpstreamClient>,
}

/// The HTTPS reverse proxy server.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new server from a merged, validated configuration.
    pub fn new(config: &AppConfig) -> Self {
        let routes = Arc::new(RouteTable::new(
            config.effective_routes(),
            config.upstream.default_timeout(),
        ));
        let upstream = Arc::new(UpstreamClient::new(&config.upstream));

        let state = AppState { routes, upstream };
        Self { router: Self::build_router(state) }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let proxied = MethodFilter::GET
            .or(MethodFilter::POST)
            .or(MethodFilter::PUT)
            .or(MethodFilter::DELETE);

        Router::new()
            .route("/health", get(health_handler))
            .route("/", on(proxied, proxy_handler))
            .route("/{*path}", on(proxied, proxy_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server on `addr`, terminating TLS with `tls`, until a
    /// shutdown signal arrives.
    pub async fn run(self, addr: SocketAddr, tls: RustlsConfig) -> Result<(), std::io::Error> {
        let handle = Handle::new();
        tokio::spawn(shutdown_signal(handle.clone()));
        self.run_with_handle(addr, tls, handle).await
    }

    /// Run the server with an externally controlled lifecycle handle.
    pub async fn run_with_handle(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        handle: Handle,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

/// Liveness endpoint. Never proxied, answers regardless of backend
/// reachability.
async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Main proxy handler: buffer the body, classify, resolve the timeout,
/// and forward.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let (parts, body) = request.into_parts();

    let method = parts.method.clone();
    let path = parts.uri.path().to_string();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| path.clone());

    // The body is read once; the same bytes are probed for the stream
    // flag and handed onward to the forwarder.
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(method = %method, path = %path, error = %e, "failed to read request body");
            return (StatusCode::BAD_REQUEST, "failed to read request body").into_response();
        }
    };

    let probe = probe_body(&body_bytes);
    let timeout = state.routes.resolve_timeout(&path);

    tracing::debug!(
        method = %method,
        path = %path,
        streaming = probe.streaming,
        timeout_secs = timeout.as_secs(),
        "proxying request"
    );

    let result = if probe.streaming {
        state
            .upstream
            .forward_streaming(method.clone(), &path_and_query, &parts.headers, body_bytes, timeout)
            .await
    } else {
        state
            .upstream
            .forward_buffered(method.clone(), &path_and_query, &parts.headers, body_bytes, timeout)
            .await
    };

    let response = match result {
        Ok(response) => response.into_response(),
        Err(err) => {
            tracing::warn!(method = %method, path = %path, error = %err, "upstream request failed");
            err.into_response()
        }
    };

    tracing::info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        model = probe.model.as_deref(),
        "request completed"
    );
    response
}

/// What the JSON body probe learned about a request.
struct BodyProbe {
    streaming: bool,
    model: Option<String>,
}

/// Probe the request body for the top-level `stream` flag and the model
/// name. Lenient on purpose: an empty body, a non-JSON body, or a
/// non-boolean `stream` value all mean non-streaming.
fn probe_body(body: &[u8]) -> BodyProbe {
    if body.is_empty() {
        return BodyProbe { streaming: false, model: None };
    }
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value) => BodyProbe {
            streaming: value.get("stream").and_then(|v| v.as_bool()).unwrap_or(false),
            model: value.get("model").and_then(|v| v.as_str()).map(str::to_string),
        },
        Err(_) => BodyProbe { streaming: false, model: None },
    }
}

/// Wait for ctrl-c, then drain connections before exiting.
async fn shutdown_signal(handle: Handle) {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutdown signal received");
        handle.graceful_shutdown(Some(Duration::from_secs(10)));
    }
}
