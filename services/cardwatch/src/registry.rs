//! Card registry: the single writer of card state, mirrored to the store
//!
//! Every mutation re-serializes the full card list synchronously
//! (write-through, last-write-wins). The store is read only once, at restore.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::detect;
use crate::store::{Store, CARDS_KEY, CHANGED_IDS_KEY, REFRESH_INTERVAL_KEY};

/// One monitored API source and its last-known fetch outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    /// Unique, immutable, time-based id
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub swagger_url: Option<String>,
    #[serde(default)]
    pub auto_refresh: bool,
    /// True only while a fetch is in flight; forced false on restore
    #[serde(default)]
    pub loading: bool,
    /// Last successfully parsed response body
    #[serde(default)]
    pub response: Option<serde_json::Value>,
    /// Last classified fetch error; cleared by a successful fetch
    #[serde(default)]
    pub error: Option<String>,
    /// Epoch ms of the last response that differed from the previous one
    #[serde(default)]
    pub last_updated: Option<u64>,
}

/// Partial update for [`CardRegistry::update_card`]; absent fields stay untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardPatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub swagger_url: Option<String>,
    pub auto_refresh: Option<bool>,
}

/// Ordered collection of cards plus the shared interval and changed-id set
pub struct CardRegistry {
    cards: Vec<Card>,
    changed: HashSet<String>,
    refresh_interval_ms: u64,
    store: Arc<dyn Store>,
    last_id_ms: u64,
}

impl std::fmt::Debug for CardRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardRegistry")
            .field("cards", &self.cards.len())
            .field("refresh_interval_ms", &self.refresh_interval_ms)
            .finish()
    }
}

impl CardRegistry {
    /// Restore registry state from the store.
    ///
    /// Absent or unreadable data falls back to a single built-in default card
    /// and the given default interval. Restored cards never come back loading.
    pub fn restore(store: Arc<dyn Store>, default_interval_ms: u64) -> Self {
        let mut cards = store
            .load(CARDS_KEY)
            .and_then(|bytes| match serde_json::from_slice::<Vec<Card>>(&bytes) {
                Ok(cards) => Some(cards),
                Err(e) => {
                    tracing::warn!("Discarding unreadable card list: {}", e);
                    None
                }
            })
            .unwrap_or_else(|| vec![default_card()]);
        for card in &mut cards {
            card.loading = false;
        }

        let changed = store
            .load(CHANGED_IDS_KEY)
            .and_then(|bytes| serde_json::from_slice::<Vec<String>>(&bytes).ok())
            .map(HashSet::from_iter)
            .unwrap_or_default();

        let refresh_interval_ms = store
            .load(REFRESH_INTERVAL_KEY)
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .and_then(|text| text.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(default_interval_ms);

        let last_id_ms = cards
            .iter()
            .filter_map(|card| card.id.parse::<u64>().ok())
            .max()
            .unwrap_or(0);

        tracing::info!(
            "Restored {} cards, interval {}ms, {} changed",
            cards.len(),
            refresh_interval_ms,
            changed.len()
        );

        Self {
            cards,
            changed,
            refresh_interval_ms,
            store,
            last_id_ms,
        }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|card| card.id == id)
    }

    /// Add a card to the end of the sequence
    pub fn add_card(
        &mut self,
        name: &str,
        url: &str,
        swagger_url: Option<String>,
    ) -> crate::Result<Card> {
        if name.trim().is_empty() {
            return Err(crate::CardwatchError::Validation(
                "Card name must not be empty".to_string(),
            ));
        }
        if url.trim().is_empty() {
            return Err(crate::CardwatchError::Validation(
                "Card url must not be empty".to_string(),
            ));
        }

        let card = Card {
            id: self.next_id(),
            name: name.trim().to_string(),
            url: url.trim().to_string(),
            swagger_url,
            auto_refresh: false,
            loading: false,
            response: None,
            error: None,
            last_updated: None,
        };
        tracing::info!("Added card '{}' ({})", card.name, card.id);
        self.cards.push(card.clone());
        self.persist_cards();
        Ok(card)
    }

    /// Merge the provided fields into an existing card
    pub fn update_card(&mut self, id: &str, patch: CardPatch) -> crate::Result<()> {
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(crate::CardwatchError::Validation(
                "Card name must not be empty".to_string(),
            ));
        }
        if patch.url.as_deref().is_some_and(|u| u.trim().is_empty()) {
            return Err(crate::CardwatchError::Validation(
                "Card url must not be empty".to_string(),
            ));
        }

        let card = self
            .cards
            .iter_mut()
            .find(|card| card.id == id)
            .ok_or_else(|| crate::CardwatchError::NotFound(id.to_string()))?;

        if let Some(name) = patch.name {
            card.name = name.trim().to_string();
        }
        if let Some(url) = patch.url {
            card.url = url.trim().to_string();
        }
        if let Some(swagger_url) = patch.swagger_url {
            card.swagger_url = Some(swagger_url);
        }
        if let Some(auto_refresh) = patch.auto_refresh {
            card.auto_refresh = auto_refresh;
        }
        self.persist_cards();
        Ok(())
    }

    /// Remove a card and purge its changed highlight
    pub fn delete_card(&mut self, id: &str) -> crate::Result<()> {
        let before = self.cards.len();
        self.cards.retain(|card| card.id != id);
        if self.cards.len() == before {
            return Err(crate::CardwatchError::NotFound(id.to_string()));
        }
        tracing::info!("Deleted card {}", id);
        self.changed.remove(id);
        self.persist_cards();
        self.persist_changed();
        Ok(())
    }

    /// Toggle the auto-refresh flag; timers are the scheduler's concern
    pub fn set_auto_refresh(&mut self, id: &str, enabled: bool) -> crate::Result<()> {
        let card = self
            .cards
            .iter_mut()
            .find(|card| card.id == id)
            .ok_or_else(|| crate::CardwatchError::NotFound(id.to_string()))?;
        card.auto_refresh = enabled;
        self.persist_cards();
        Ok(())
    }

    pub fn refresh_interval_ms(&self) -> u64 {
        self.refresh_interval_ms
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    /// Set the interval shared by all auto-refreshing cards
    pub fn set_refresh_interval_ms(&mut self, ms: u64) -> crate::Result<()> {
        if ms == 0 {
            return Err(crate::CardwatchError::Validation(
                "Refresh interval must be positive".to_string(),
            ));
        }
        self.refresh_interval_ms = ms;
        if let Err(e) = self
            .store
            .save(REFRESH_INTERVAL_KEY, ms.to_string().as_bytes())
        {
            tracing::warn!("Failed to persist refresh interval: {}", e);
        }
        Ok(())
    }

    /// Mark a fetch as in flight
    pub fn begin_fetch(&mut self, id: &str) {
        if let Some(card) = self.cards.iter_mut().find(|card| card.id == id) {
            card.loading = true;
        }
    }

    /// Apply a successful fetch outcome.
    ///
    /// Only a structurally different response advances `last_updated`; a
    /// change seen by an auto-refresh fetch also flags the card as changed.
    /// Outcomes for ids deleted mid-flight are dropped.
    pub fn apply_success(&mut self, id: &str, value: serde_json::Value, auto_refresh: bool) {
        let Some(card) = self.cards.iter_mut().find(|card| card.id == id) else {
            tracing::debug!("Dropping fetch result for deleted card {}", id);
            return;
        };
        card.loading = false;
        card.error = None;
        if detect::response_changed(card.response.as_ref(), &value) {
            card.response = Some(value);
            card.last_updated = Some(current_epoch_ms());
            if auto_refresh {
                self.changed.insert(id.to_string());
                self.persist_changed();
            }
        }
        self.persist_cards();
    }

    /// Apply a failed fetch outcome; the stale response is kept for reference
    pub fn apply_failure(&mut self, id: &str, message: String) {
        let Some(card) = self.cards.iter_mut().find(|card| card.id == id) else {
            tracing::debug!("Dropping fetch failure for deleted card {}", id);
            return;
        };
        card.loading = false;
        card.error = Some(message);
        self.persist_cards();
    }

    /// Ids of cards whose last auto-refresh fetch changed their response
    pub fn changed_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.changed.iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_changed(&self, id: &str) -> bool {
        self.changed.contains(id)
    }

    /// Clear a card's changed highlight, driven by the detail view
    pub fn mark_viewed(&mut self, id: &str) {
        if self.changed.remove(id) {
            self.persist_changed();
        }
    }

    /// Time-based id, bumped past the previous one on same-millisecond adds
    fn next_id(&mut self) -> String {
        let mut ms = current_epoch_ms();
        if ms <= self.last_id_ms {
            ms = self.last_id_ms + 1;
        }
        self.last_id_ms = ms;
        ms.to_string()
    }

    fn persist_cards(&self) {
        match serde_json::to_vec(&self.cards) {
            Ok(bytes) => {
                if let Err(e) = self.store.save(CARDS_KEY, &bytes) {
                    tracing::warn!("Failed to persist card list: {}", e);
                }
            }
            Err(e) => tracing::warn!("Failed to serialize card list: {}", e),
        }
    }

    fn persist_changed(&self) {
        match serde_json::to_vec(&self.changed_ids()) {
            Ok(bytes) => {
                if let Err(e) = self.store.save(CHANGED_IDS_KEY, &bytes) {
                    tracing::warn!("Failed to persist changed-card ids: {}", e);
                }
            }
            Err(e) => tracing::warn!("Failed to serialize changed-card ids: {}", e),
        }
    }
}

/// Card seeded on first start, before any state has been persisted
fn default_card() -> Card {
    Card {
        id: current_epoch_ms().to_string(),
        name: "Petstore".to_string(),
        url: "https://petstore.swagger.io/v2/swagger.json".to_string(),
        swagger_url: None,
        auto_refresh: false,
        loading: false,
        response: None,
        error: None,
        last_updated: None,
    }
}

pub(crate) fn current_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Thread-safe registry handle shared by scheduler and dashboard
pub type RegistryHandle = Arc<RwLock<CardRegistry>>;

pub fn new_registry_handle(store: Arc<dyn Store>, default_interval_ms: u64) -> RegistryHandle {
    Arc::new(RwLock::new(CardRegistry::restore(
        store,
        default_interval_ms,
    )))
}
