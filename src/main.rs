//! Ollama Router
//!
//! An HTTPS reverse proxy for Ollama built with Tokio and Axum.
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                OLLAMA ROUTER                 │
//!                      │                                              │
//!   Client (HTTPS)     │  ┌─────────┐   ┌─────────┐   ┌───────────┐  │
//!   ───────────────────┼─▶│   tls   │──▶│  http   │──▶│  routing  │  │
//!                      │  │listener │   │ server  │   │ (timeout) │  │
//!                      │  └─────────┘   └─────────┘   └─────┬─────┘  │
//!                      │                                    ▼        │
//!   Client Response    │  ┌─────────┐   ┌───────────────────────┐    │
//!   ◀──────────────────┼──│ header  │◀──│  proxy (buffered or   │◀───┼── Ollama
//!                      │  │ filter  │   │  streaming forwarder) │    │  (HTTP)
//!                      │  └─────────┘   └───────────────────────┘    │
//!                      └──────────────────────────────────────────────┘
//! ```
//!
//! Startup order: parse CLI → merge config (defaults < env < file < CLI)
//! → validate → init logging → ensure TLS certificates → bind and serve.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use ollama_router::config::{self, AppConfig};
use ollama_router::http::HttpServer;
use ollama_router::observability::init_logging;
use ollama_router::tls::{load_rustls_config, CertManager};

#[derive(Parser)]
#[command(name = "ollama-router", version)]
#[command(about = "HTTPS reverse proxy for Ollama with per-route timeouts", long_about = None)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server bind address (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Server port (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Ollama base URL (overrides config)
    #[arg(long)]
    base_url: Option<String>,
}

impl Cli {
    /// Apply command-line overrides; highest precedence in the merge.
    fn apply_to(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(base_url) = &self.base_url {
            config.upstream.base_url = base_url.clone();
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ollama-router: startup failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = config::load_config(cli.config.as_deref())?;
    cli.apply_to(&mut config);
    config::validate(&config)?;

    init_logging(&config.logging);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ollama-router starting");

    // Certificate material must be valid before the listener can bind.
    let cert_manager = CertManager::new(config.server.tls.clone());
    let (cert_path, key_path) = cert_manager.ensure_certificates()?;
    tracing::info!(cert = %cert_path.display(), "TLS certificates ready");
    let tls = load_rustls_config(&cert_path, &key_path).await?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!(
        address = %addr,
        base_url = %config.upstream.base_url,
        default_timeout_secs = config.upstream.timeout_secs,
        routes = config.effective_routes().len(),
        "configuration loaded"
    );

    let server = HttpServer::new(&config);
    server.run(addr, tls).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
