// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::Parser;
use cloudflare_operator::{
    cloudflare::CloudflareClient, config::OperatorConfig, constants::TOKIO_WORKER_THREADS,
    controller::Operator, credentials::SecretCredentialResolver, metrics,
};
use kube::Client;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

fn main() -> Result<()> {
    let config = OperatorConfig::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("cloudflare-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

/// Initialize logging.
///
/// Format: timestamp file:line LEVEL message
/// Example: 2025-11-29T23:45:00.123456Z main.rs:49 INFO Starting Cloudflare Operator
///
/// Respects `RUST_LOG` (default `info`) and `RUST_LOG_FORMAT` (`json` or `text`).
fn init_logging() {
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
}

async fn async_main(config: OperatorConfig) -> Result<()> {
    init_logging();

    info!("Starting Cloudflare Operator");
    debug!(?config, "Loaded configuration");

    let default_credential = config.default_credential()?;
    if default_credential.is_none() {
        warn!("No default Cloudflare credential configured; resources must set credentialRef");
    }

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;

    let cloudflare = Arc::new(CloudflareClient::new(&config.api_url, config.api_timeout())?);
    let credentials = Arc::new(SecretCredentialResolver::new(
        client.clone(),
        default_credential,
    ));

    let operator = Operator::new(
        client,
        cloudflare,
        credentials,
        config.settings(),
        config.concurrency,
    );

    info!("Starting all controllers");

    // Controllers should never exit - if one fails, we log it and exit the main process
    tokio::select! {
        result = operator.run() => {
            error!("CRITICAL: controllers exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Controllers exited unexpectedly without error")
        }
        result = metrics::serve(config.metrics_bind_address) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Metrics server exited unexpectedly without error")
        }
        result = shutdown_signal() => {
            result?;
            info!("Shutdown signal received, stopping");
            Ok(())
        }
    }
}

/// Wait for SIGTERM or Ctrl+C.
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = sigterm.recv() => debug!("Received SIGTERM"),
            result = tokio::signal::ctrl_c() => {
                result?;
                debug!("Received SIGINT");
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        debug!("Received SIGINT");
    }
    Ok(())
}

#[cfg(test)]
mod main_tests;
