//! Polling scheduler: one auto-refresh loop per card
//!
//! Timers never drift from registry state because every relevant mutation
//! triggers a full rebuild: the previous generation of loops is cancelled and
//! a new one is spawned from the current card set. Cancellation stops future
//! ticks only; a fetch already in flight completes and its result is still
//! applied (last response to resolve wins).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::client::BackendClient;
use crate::registry::RegistryHandle;

pub struct PollScheduler {
    registry: RegistryHandle,
    client: Arc<BackendClient>,
    shutdown: CancellationToken,
    generation: Mutex<CancellationToken>,
}

impl std::fmt::Debug for PollScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollScheduler").finish()
    }
}

impl PollScheduler {
    pub fn new(
        registry: RegistryHandle,
        client: Arc<BackendClient>,
        shutdown: CancellationToken,
    ) -> Self {
        let generation = Mutex::new(shutdown.child_token());
        Self {
            registry,
            client,
            shutdown,
            generation,
        }
    }

    /// Tear down all polling loops and recreate them from the current card set.
    ///
    /// Edge-triggered on every change to the card set or the shared interval.
    /// Cheap for small card counts.
    pub async fn rebuild(&self) {
        let (targets, interval) = {
            let registry = self.registry.read().await;
            let targets: Vec<(String, String)> = registry
                .cards()
                .iter()
                .filter(|card| card.auto_refresh)
                .map(|card| (card.id.clone(), card.url.clone()))
                .collect();
            (targets, registry.refresh_interval())
        };

        let mut generation = self.generation.lock().await;
        generation.cancel();
        *generation = self.shutdown.child_token();

        tracing::debug!(
            "Rebuilding polling loops: {} active, interval {:?}",
            targets.len(),
            interval
        );

        for (card_id, url) in targets {
            let registry = Arc::clone(&self.registry);
            let client = Arc::clone(&self.client);
            let cancel = generation.clone();
            tokio::spawn(async move {
                poll_loop(registry, client, card_id, url, interval, cancel).await;
            });
        }
    }

    /// One-shot user-initiated fetch, outside any timer
    pub async fn refresh_now(&self, card_id: &str) -> crate::Result<()> {
        let url = {
            let registry = self.registry.read().await;
            registry
                .card(card_id)
                .ok_or_else(|| crate::CardwatchError::NotFound(card_id.to_string()))?
                .url
                .clone()
        };

        self.registry.write().await.begin_fetch(card_id);
        let outcome = self.client.fetch_swagger(&url).await;
        let mut registry = self.registry.write().await;
        match outcome {
            Ok(value) => registry.apply_success(card_id, value, false),
            Err(e) => registry.apply_failure(card_id, e.to_string()),
        }
        Ok(())
    }
}

async fn poll_loop(
    registry: RegistryHandle,
    client: Arc<BackendClient>,
    card_id: String,
    url: String,
    interval: Duration,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = cancel.cancelled() => {
                tracing::debug!("Polling loop for card {} cancelled", card_id);
                break;
            }
        }

        registry.write().await.begin_fetch(&card_id);
        let outcome = client.fetch_swagger(&url).await;

        let mut registry_lock = registry.write().await;
        match outcome {
            Ok(value) => {
                tracing::debug!("Poll for card {} succeeded", card_id);
                registry_lock.apply_success(&card_id, value, true);
            }
            Err(e) => {
                // Polling continues; the next tick may recover
                tracing::debug!("Poll for card {} failed: {}", card_id, e);
                registry_lock.apply_failure(&card_id, e.to_string());
            }
        }
    }
}
