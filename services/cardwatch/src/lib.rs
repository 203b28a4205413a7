//! Cardwatch - API documentation monitoring service
//!
//! Keeps a registry of monitored Swagger/OpenAPI sources ("cards"), polls the
//! auto-refreshing ones through a backend proxy, detects response changes, and
//! serves card state over a small HTTP dashboard. Registry state survives
//! restarts through a write-through file store.

pub mod client;
pub mod config;
pub mod dashboard;
pub mod detect;
pub mod error;
pub mod io;
pub mod registry;
pub mod scheduler;
pub mod store;

pub use config::{load_config, Config};
pub use error::{CardwatchError, FetchError, Result};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::client::BackendClient;
use crate::io::ReqwestHttpClient;
use crate::scheduler::PollScheduler;
use crate::store::{FileStore, Store};

/// Run the cardwatch service with the given configuration
pub async fn run(config: Config) -> Result<()> {
    let store: Arc<dyn Store> = Arc::new(FileStore::new(&config.state_dir));
    let registry = registry::new_registry_handle(store, config.refresh_interval_ms);

    let http: Arc<dyn io::HttpClient> = Arc::new(ReqwestHttpClient::default());
    let client = Arc::new(BackendClient::new(&config.backend_url, http));

    let cancel = CancellationToken::new();
    let scheduler = Arc::new(PollScheduler::new(
        Arc::clone(&registry),
        Arc::clone(&client),
        cancel.clone(),
    ));
    scheduler.rebuild().await;

    // Setup shutdown handler
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        cancel_for_signal.cancel();
    });

    // Start dashboard if enabled
    if config.dashboard.enabled {
        let dashboard_port = config.dashboard.port;
        let router = dashboard::build_router(
            Arc::clone(&registry),
            Arc::clone(&scheduler),
            Arc::clone(&client),
        );
        let cancel_for_dashboard = cancel.clone();

        tokio::spawn(async move {
            let addr = SocketAddr::from(([0, 0, 0, 0], dashboard_port));
            tracing::info!("Dashboard listening on http://{}", addr);

            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(l) => l,
                Err(e) => {
                    tracing::error!(
                        "Failed to bind dashboard to port {}: {}. Continuing without dashboard.",
                        dashboard_port,
                        e
                    );
                    return;
                }
            };

            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    cancel_for_dashboard.cancelled().await;
                })
                .await
                .ok();

            tracing::debug!("Dashboard stopped");
        });
    }

    tracing::info!("Cardwatch engine started");

    // Block until cancelled
    cancel.cancelled().await;
    tracing::info!("Cardwatch engine stopped");

    Ok(())
}
