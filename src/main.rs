use pagsmile_checkout::api::types::ClientConfig;
use pagsmile_checkout::api::{router, ApiState};
use pagsmile_checkout::config::AppConfig;
use pagsmile_checkout::logging::init_tracing;
use pagsmile_checkout::payments::constants::endpoints;
use pagsmile_checkout::payments::types::PagsmileRegion;
use pagsmile_checkout::payments::PagsmileGateway;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    init_tracing(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Pagsmile checkout service"
    );

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(e.into());
    }

    let pagsmile = &config.pagsmile;
    info!(
        env = %pagsmile.env,
        gateway = %pagsmile.gateway_url(),
        security_host = endpoints(pagsmile.env).security,
        notify_url = %pagsmile.notify_url,
        poll_interval_ms = config.polling.interval.as_millis() as u64,
        poll_timeout_secs = config.polling.timeout.as_secs(),
        "Pagsmile configuration loaded"
    );

    let client_config = ClientConfig::from_pagsmile(pagsmile, PagsmileRegion::Bra);
    let gateway = PagsmileGateway::new(pagsmile.clone())?;
    let state = ApiState::new(Arc::new(gateway), client_config);
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to address {}: {}", addr, e);
        e
    })?;

    info!(address = %addr, base_url = %config.server.base_url, "Server is ready to accept connections");
    info!("  GET  /health");
    info!("  GET  /api/config");
    info!("  POST /api/orders");
    info!("  POST /api/payments");
    info!("  GET  /api/payments/{{out_trade_no}}");
    info!("  POST /api/webhooks/pagsmile");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
