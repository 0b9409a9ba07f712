//! File Exchange Server
//!
//! Accepts job submissions, serves their archives and preloaded task files,
//! and stores worker results under one storage root.
//!
//! Usage: `file-exchange-server [TASKS_DIR]`

use std::path::PathBuf;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use file_exchange_server::config::Config;
use file_exchange_server::state::AppState;
use file_exchange_server::storage::Layout;
use file_exchange_server::tasks::{preload, TaskStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "file_exchange_server=info,tower_http=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let mut config = Config::from_env().context("invalid configuration")?;
    if let Some(tasks_source) = std::env::args_os().nth(1) {
        config.storage.tasks_source = Some(PathBuf::from(tasks_source));
    }

    tracing::info!("Starting File Exchange Server v{}", env!("CARGO_PKG_VERSION"));

    // Storage root; the temporary one is removed when `_ephemeral_root` drops
    let (root, _ephemeral_root) = match &config.storage.root {
        Some(root) => (root.clone(), None),
        None => {
            let dir = tempfile::Builder::new()
                .prefix("file-exchange-")
                .tempdir()
                .context("failed to create temporary storage root")?;
            (dir.path().to_path_buf(), Some(dir))
        }
    };

    let layout = Layout::create(&root)
        .with_context(|| format!("failed to prepare storage root {}", root.display()))?;

    // Seed the task store before accepting any request
    if let Some(source) = config.storage.tasks_source.clone() {
        let store = TaskStore::new(&layout);
        let report = tokio::task::spawn_blocking(move || preload(&source, &store))
            .await
            .context("task preload panicked")?
            .context("task preload failed")?;
        tracing::info!(
            "Task store holds {} distinct files from {} sources",
            report.unique_digests(),
            report.entries.len()
        );
    }

    let app_state = AppState::new(config.clone(), layout).context("failed to open storage")?;
    let app = file_exchange_server::app(app_state);

    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.server.host, config.server.port))?;

    tracing::info!(
        "Serving files from {} at port {}...",
        root.display(),
        config.server.port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
