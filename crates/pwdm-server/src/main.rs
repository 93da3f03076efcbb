//! pwdm server entry point.
//!
//! Loads configuration, generates the process signing key, opens the
//! storage backend and starts the Axum HTTP server with graceful shutdown.
//! The storage backend is closed once, after the last in-flight request has
//! finished.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use pwdm_core::{SigningKey, TokenService};
use pwdm_storage::{CredentialHasher, MemoryStorage, Storage};

use pwdm_server::config::{ServerConfig, StorageBackendType};
use pwdm_server::routes;
use pwdm_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("failed to load configuration")?;

    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(storage = ?config.storage_backend, "pwdm starting");

    let key = SigningKey::generate().context("failed to generate token signing key")?;
    let ttl = chrono::Duration::try_seconds(config.token_ttl_secs)
        .context("token lifetime out of range")?;
    let tokens = TokenService::new(key, ttl);

    let storage = open_storage(&config).await?;
    let state = Arc::new(AppState::new(Arc::clone(&storage), tokens));
    let app = routes::build_router(state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "pwdm server listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // In-flight requests have drained by the time serve returns.
    storage.close().await;
    served.context("server error")?;

    info!("pwdm server stopped");
    Ok(())
}

/// Open the configured backend. For PostgreSQL this also creates the schema.
async fn open_storage(config: &ServerConfig) -> anyhow::Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match &config.storage_backend {
        StorageBackendType::Memory => {
            info!("using in-memory storage (data will not persist)");
            Arc::new(MemoryStorage::with_hasher(CredentialHasher::default()))
        }
        #[cfg(feature = "postgres-backend")]
        StorageBackendType::Postgres { url } => {
            info!(url = %"[redacted]", max_connections = config.max_connections, "using PostgreSQL storage");
            let store = pwdm_storage::PostgresStorage::connect(url, config.max_connections)
                .await
                .context("failed to connect to PostgreSQL storage")?;
            pwdm_storage::schema::initialize(store.pool())
                .await
                .context("failed to initialize database schema")?;
            Arc::new(store)
        }
        #[cfg(not(feature = "postgres-backend"))]
        StorageBackendType::Postgres { .. } => {
            anyhow::bail!("PostgreSQL backend requested but feature 'postgres-backend' is not enabled");
        }
    };

    Ok(storage)
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}
