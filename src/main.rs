// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::chart_service::ChartService;
use crate::application::session::TelemetrySession;
use crate::application::streaming_service::TelemetryStreamService;
use crate::infrastructure::backend_client::BackendClient;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::ws_transport::WebSocketTransport;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    chart_frame, export_csv, export_json, health_check, pause_stream, resume_stream, send_command,
    stream_chart, stream_status, telemetry_history,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_app_config()?;

    // Start the telemetry stream (application layer)
    let session = TelemetrySession::shared(config.buffer.capacity);
    let stream = Arc::new(TelemetryStreamService::start(
        config.stream.clone(),
        Arc::new(WebSocketTransport::new()),
        session,
    ));
    let charts = Arc::new(ChartService::new(config.geometry()));
    let backend = Arc::new(BackendClient::new(config.backend.base_url.clone()));

    let state = Arc::new(AppState {
        stream: stream.clone(),
        charts,
        backend,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/telemetry/state", get(stream_status))
        .route("/telemetry/chart", get(chart_frame))
        .route("/telemetry/chart/stream", get(stream_chart))
        .route("/telemetry/pause", post(pause_stream))
        .route("/telemetry/resume", post(resume_stream))
        .route("/telemetry/export.csv", get(export_csv))
        .route("/telemetry/export.json", get(export_json))
        .route("/telemetry/history", get(telemetry_history))
        .route("/control/command", post(send_command))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid server.bind address {}", config.server.bind))?;
    tracing::info!(
        "Starting oht-telemetry on {}, streaming from {}",
        addr,
        config.stream.endpoint()
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(stream.clone()))
        .await?;

    // No-op if the signal handler already stopped it
    stream.stop().await;
    Ok(())
}

/// Waits for Ctrl-C, then tears the stream down so open SSE clients finish.
async fn shutdown_signal(stream: Arc<TelemetryStreamService>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown requested");
    stream.stop().await;
}
