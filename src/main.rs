mod config;
mod db;
mod engine;
mod error;
mod handlers;
mod models;
mod router;
mod status;

use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use db::Store;
use status::{PingProber, Prober};

/// Application state shared across handlers
pub struct AppState {
    pub store: Store,
    pub prober: Arc<dyn Prober>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "patchbay=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let cfg = Config::load();
    tracing::info!("Starting Patchbay Server");
    tracing::info!("Storage: {}", cfg.storage_backend);
    match cfg.storage_backend.as_str() {
        "file" => tracing::info!("Data file: {}", cfg.data_file),
        _ => tracing::info!("Database: {}", cfg.db_path),
    }
    tracing::info!("Listen: {}", cfg.listen_addr);

    // Open the selected backend once
    let store = Store::open(&cfg).await?;
    tracing::info!("Storage initialized");

    let state = Arc::new(AppState {
        store,
        prober: Arc::new(PingProber::new(cfg.ping_timeout_secs)),
    });

    // Build router
    let app = router::build(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr).await?;
    tracing::info!("Patchbay listening on {}", cfg.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Patchbay shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
