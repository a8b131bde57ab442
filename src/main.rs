// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use axum::{http::StatusCode, routing::get, Router};
use clap::Parser;
use kube::Client;
use lbsync::{
    constants::{DEFAULT_METRICS_ADDR, DEFAULT_WEBHOOK_ADDR, VALIDATE_TARGET_GROUP_BINDING_PATH},
    metrics::gather_metrics,
    webhook::{self, TargetGroupBindingValidator, WebhookState},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Admission webhook and metrics server for lbsync.
#[derive(Debug, Parser)]
#[command(name = "lbsync", version, about)]
struct Args {
    /// Address the admission webhook listens on (TLS is terminated in front of it)
    #[arg(long, env = "LBSYNC_WEBHOOK_ADDR", default_value = DEFAULT_WEBHOOK_ADDR)]
    webhook_addr: SocketAddr,

    /// Address the Prometheus metrics endpoint listens on
    #[arg(long, env = "LBSYNC_METRICS_ADDR", default_value = DEFAULT_METRICS_ADDR)]
    metrics_addr: SocketAddr,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .thread_name("lbsync-webhook")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<()> {
    // Respects RUST_LOG (default INFO) and RUST_LOG_FORMAT=json|text
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    info!("Starting lbsync admission webhook");
    debug!("Logging initialized with file and line number tracking");

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let state = Arc::new(WebhookState {
        validator: TargetGroupBindingValidator::new(Arc::new(client)),
    });

    // Servers should never exit - if one does, log it and exit the main process
    tokio::select! {
        result = run_webhook_server(args.webhook_addr, state) => {
            error!("CRITICAL: webhook server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("webhook server exited unexpectedly without error")
        }
        result = run_metrics_server(args.metrics_addr) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("metrics server exited unexpectedly without error")
        }
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Received shutdown signal, exiting");
            Ok(())
        }
    }
}

/// Serve `TargetGroupBinding` admission reviews.
async fn run_webhook_server(addr: SocketAddr, state: Arc<WebhookState>) -> Result<()> {
    info!(
        "Starting webhook server on {} (path {})",
        addr, VALIDATE_TARGET_GROUP_BINDING_PATH
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, webhook::router(state)).await?;
    Ok(())
}

/// Serve Prometheus metrics on `/metrics`.
async fn run_metrics_server(addr: SocketAddr) -> Result<()> {
    info!("Starting metrics server on {}", addr);
    let app = Router::new().route("/metrics", get(metrics_handler));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn metrics_handler() -> (StatusCode, String) {
    match gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            error!("Failed to gather metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
