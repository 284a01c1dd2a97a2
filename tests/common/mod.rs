//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use axum_server::Handle;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use ollama_router::config::AppConfig;
use ollama_router::http::HttpServer;
use ollama_router::tls::{load_rustls_config, CertManager};

/// Read one HTTP/1.1 request (headers, plus body per content-length).
async fn read_request(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let Ok(n) = socket.read(&mut chunk).await else { return };
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = find_headers_end(&buf) {
            let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + content_length {
                return;
            }
        }
    }
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Start a mock backend that returns a fixed response with the given
/// extra header lines. Returns the address it listens on.
pub async fn start_mock_backend(extra_headers: &'static str, body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else { break };
            tokio::spawn(async move {
                read_request(&mut socket).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n{}",
                    body.len(),
                    extra_headers,
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start a mock backend that waits `delay` before answering.
#[allow(dead_code)]
pub async fn start_slow_backend(delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else { break };
            tokio::spawn(async move {
                read_request(&mut socket).await;
                tokio::time::sleep(delay).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok")
                    .await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start a mock backend that streams the given chunks with small delays
/// using chunked transfer encoding.
#[allow(dead_code)]
pub async fn start_streaming_backend(chunks: &'static [&'static str]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else { break };
            tokio::spawn(async move {
                read_request(&mut socket).await;
                let head = "HTTP/1.1 200 OK\r\n\
                     Content-Type: application/x-ndjson\r\n\
                     Transfer-Encoding: chunked\r\n\
                     Connection: close\r\n\r\n";
                let _ = socket.write_all(head.as_bytes()).await;
                for chunk in chunks {
                    let framed = format!("{:x}\r\n{}\r\n", chunk.len(), chunk);
                    if socket.write_all(framed.as_bytes()).await.is_err() {
                        return;
                    }
                    let _ = socket.flush().await;
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
                let _ = socket.write_all(b"0\r\n\r\n").await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// An address with nothing listening on it.
#[allow(dead_code)]
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Start the router with auto-generated certificates in a temp dir.
/// Returns the HTTPS address it listens on.
pub async fn spawn_router(mut config: AppConfig) -> SocketAddr {
    let certs = tempfile::TempDir::new().unwrap();
    config.server.tls.cert_dir = certs.path().to_path_buf();

    let manager = CertManager::new(config.server.tls.clone());
    let (cert_path, key_path) = manager.ensure_certificates().unwrap();
    let tls = load_rustls_config(&cert_path, &key_path).await.unwrap();

    let server = HttpServer::new(&config);
    let handle = Handle::new();
    let serve_handle = handle.clone();
    tokio::spawn(async move {
        // Keep the cert dir alive for the lifetime of the server task.
        let _certs = certs;
        server
            .run_with_handle("127.0.0.1:0".parse().unwrap(), tls, serve_handle)
            .await
            .unwrap();
    });

    handle.listening().await.unwrap()
}

/// HTTPS client that accepts the router's self-signed certificate.
pub fn https_client() -> reqwest::Client {
    reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()
        .unwrap()
}
