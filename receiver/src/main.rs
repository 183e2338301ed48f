//! msngrhook Web Server - Messenger-style webhook receiver.
//!
//! This binary:
//! - Answers the webhook subscription handshake
//! - Receives push notifications and hands each event to the consumer
//! - Logs every delivered update with its normalized text

mod consumer;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use msngrhook::web::health;
use msngrhook::{webhook_router, Config, WebhookState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        webhook_path = %config.webhook_path,
        verify_token_configured = config.verify_token.is_some(),
        update_channel_capacity = config.update_channel_capacity,
        "config_loaded"
    );

    let verify_token = config
        .verify_token
        .clone()
        .context("VERIFY_TOKEN must be set")?;

    let (state, updates) = WebhookState::new(verify_token, config.update_channel_capacity);
    let consumer = tokio::spawn(consumer::run(updates));

    // Build the router
    let app = Router::new()
        .route("/health", get(health))
        .merge(webhook_router(&config.webhook_path, state))
        .layer(TraceLayer::new_for_http());

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // The router held the last sender; the consumer finishes once it is drained
    consumer.await.context("Consumer task failed")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
