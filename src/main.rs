//! Focus Session - Pomodoro focus timer daemon
//!
//! This is the main entry point for the focus-session application.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use focus_session::{
    config::Config,
    create_router,
    services::{CommandAudioPort, HttpSessionService, SessionService, TimeBlockService},
    state::{FileStorage, Storage},
    utils::shutdown_signal,
    Collaborators, Runtime, RuntimeOptions,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "focus_session={},tower_http=info",
            config.log_level()
        ))
        .init();

    info!("Starting focus-session server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, data_dir={}, session_api={}",
        config.host,
        config.port,
        config.data_dir.display(),
        config.session_api_url().unwrap_or("disabled")
    );

    let storage: Arc<dyn Storage> = Arc::new(
        FileStorage::open(&config.data_dir)
            .with_context(|| format!("opening data dir {}", config.data_dir.display()))?,
    );

    let (sessions, blocks) = match config.session_api_url() {
        Some(url) => {
            let client = Arc::new(
                HttpSessionService::new(url, config.api_token.clone(), config.request_timeout())
                    .context("configuring session service")?,
            );
            let sessions: Arc<dyn SessionService> = client.clone();
            let blocks: Arc<dyn TimeBlockService> = client;
            (Some(sessions), Some(blocks))
        }
        None => (None, None),
    };

    let runtime = Runtime::launch(
        Collaborators {
            storage,
            audio: Arc::new(CommandAudioPort::new(config.audio_player.clone())),
            sessions,
            blocks,
        },
        RuntimeOptions::from_config(&config),
    );

    // Create HTTP router with all endpoints
    let app = create_router(runtime.state());

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /timer, /widget, /status, /health");
    info!("  POST /timer/start|pause|skip|cancel|reset");
    info!("  GET/PUT/DELETE /settings, /preferences, /ambient");
    info!("  GET  /sessions/active, /sessions/today");
    info!("  GET/PUT /title");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    runtime.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}
