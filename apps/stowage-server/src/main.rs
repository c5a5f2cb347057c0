//! Stowage server, an HTTP API for provisioning compartment-scoped Object
//! Storage buckets.
//!
//! The server signs every upstream call with the credentials of the
//! environment resolved from the compartment (or an explicit `env`
//! parameter), and optionally answers directory membership lookups for a
//! configured identity registration.
//!
//! # Usage
//!
//! ```text
//! SERVER_LISTEN=0.0.0.0:8000 stowage-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SERVER_LISTEN` | `0.0.0.0:8000` | Bind address |
//! | `ALLOWED_ORIGINS` | Vite dev origins | Comma-separated CORS allow list |
//! | `AUDIT_DIR` | `./logs` | Audit trail directory |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |
//!
//! Signing credentials come from the `OCI_*` variables read by
//! `CredentialRegistry::from_env` and `StorageConfig::from_env`; the optional
//! directory registration from the `DIRECTORY_*` variables read by
//! `DirectoryConfig::from_env`.

mod audit;
mod config;
mod handlers;
mod multipart;
mod router;
mod service;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use stowage_auth::{CredentialRegistry, Environment};
use stowage_client::{ObjectStorageClient, StorageConfig};
use stowage_directory::{DirectoryClient, DirectoryConfig};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::audit::AuditLog;
use crate::config::ServerConfig;
use crate::service::{ApiService, AppState};

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve(listener: TcpListener, service: ApiService) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    // Wait for in-flight requests to complete.
    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Perform a health check by requesting the health endpoint.
///
/// Used by the `--health-check` flag for container HEALTHCHECK probes.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.contains("200 OK") && response.contains("\"ok\":true") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env();

    // Handle --health-check flag for Docker HEALTHCHECK.
    if std::env::args().any(|a| a == "--health-check") {
        let addr = config.listen.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&config.log_level)?;

    let registry = CredentialRegistry::from_env().context("loading signing credentials")?;
    let environments: Vec<Environment> = registry.environments().collect();
    if environments.is_empty() {
        warn!("no credential environments configured; signed routes will fail");
    } else {
        info!(?environments, "loaded credential registry");
    }

    let storage = ObjectStorageClient::new(StorageConfig::from_env(), registry);

    let directory = DirectoryConfig::from_env().map(DirectoryClient::new);
    if directory.is_none() {
        warn!("directory registration absent; /user/groups will answer 502");
    }

    let state = AppState {
        storage,
        directory,
        audit: AuditLog::new(config.audit_dir.clone()),
        allowed_origins: config.allowed_origins.clone(),
    };
    let service = ApiService::new(state);

    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(
        %addr,
        version = env!("CARGO_PKG_VERSION"),
        "starting stowage server",
    );

    serve(listener, service).await
}
