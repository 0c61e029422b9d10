//! # Transcription Relay - Main Application Entry Point
//!
//! An Actix-web server that forwards uploaded audio to an asynchronous
//! transcription provider and lets clients poll for the result:
//!
//! 1. `POST /upload` dispatches the audio and returns the provider's `request_id`
//! 2. The provider later posts the transcript to `POST /webhook`
//! 3. Clients poll `GET /status/{request_id}` until the job is completed or failed
//! 4. A background sweep drops finished jobs after the retention window
//!
//! ## Application Architecture:
//! - **config**: Application configuration (TOML file + environment variables)
//! - **jobs**: Job store, lifecycle transitions, status queries, reclamation
//! - **provider**: Deepgram dispatch client and callback parsing
//! - **submission**: Glue between uploads, the provider and the job store
//! - **state**: Shared application state and request metrics
//! - **handlers**: HTTP request handlers for upload, webhook and status routes
//! - **health**: Health and metrics endpoints
//! - **middleware**: Per-route request metrics
//! - **error**: Error types and HTTP error responses

mod config;
mod error;
mod handlers;
mod health;
mod jobs;
mod middleware;
mod provider;
mod state;
mod submission;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Result;
use crate::config::AppConfig;
use crate::jobs::SystemClock;
use crate::provider::DeepgramClient;
use crate::state::AppState;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// The main application entry point.
///
/// ## What this function does:
/// 1. **Loads configuration** from files and environment variables
/// 2. **Sets up logging** for debugging and monitoring
/// 3. **Creates shared application state** (job store, provider client, metrics)
/// 4. **Starts the reclamation sweep** on its own timer
/// 5. **Runs the HTTP server** until a shutdown signal arrives
#[actix_web::main]
async fn main() -> Result<()> {
    // .ok() means "ignore errors" - it's fine if there's no .env file
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting transcription-relay v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {}:{}", config.server.host, config.server.port);

    if config.provider.api_key.is_none() {
        warn!("DEEPGRAM_API_KEY environment variable not set. Transcription will not work.");
    }
    info!(callback_url = %config.callback_url(), "Provider callbacks will be delivered to this URL");

    let provider = Arc::new(DeepgramClient::new(config.provider.clone())?);
    let app_state = AppState::new(config.clone(), provider, Arc::new(SystemClock));
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    let reclaimer = app_state
        .jobs
        .spawn_reclaimer(config.sweep_interval(), config.retention());
    info!(
        retention_secs = config.jobs.retention_secs,
        sweep_interval_secs = config.jobs.sweep_interval_secs,
        "Job reclamation scheduled"
    );

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            // Middleware executes in reverse order for responses
            .wrap(cors)
            .wrap(middleware::MetricsMiddleware)
            .wrap(TracingLogger::default())
            .configure(handlers::configure)
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Err(e)) => error!("Server error: {}", e),
                Err(e) => error!("Server task error: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    reclaimer.abort();
    info!("Server stopped gracefully");
    Ok(())
}

/// Initialize the tracing (logging) system for the application.
///
/// ## Environment Variables:
/// - `RUST_LOG`: Controls what gets logged (e.g., "debug", "transcription_relay=trace")
/// - If not set, defaults to "transcription_relay=debug,actix_web=info"
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "transcription_relay=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}

/// Resolve when SIGTERM or SIGINT (Ctrl+C) arrives.
///
/// If a handler cannot be installed the failure is logged and that signal is
/// simply never observed; the server keeps running.
async fn wait_for_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    let interrupt = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT"),
            Err(e) => {
                error!("Failed to install SIGINT handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = terminate => {}
        _ = interrupt => {}
    }
}
