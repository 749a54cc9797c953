//! Browser score backend persisted to LocalStorage
//!
//! The whole table is stored as one JSON document. Every call re-reads it so
//! writes from other tabs are picked up.

use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;

use super::table::{SCORES_STORAGE_KEY, ScoreTable, SubscriberList, concerns_scores, normalize_identity};
use super::{ChangeCallback, GatewayFuture, SaveOutcome, ScoreGateway, SubscriptionId};
use crate::error::PersistenceError;
use crate::leaderboard::{LeaderboardEntry, RankLimit};

#[derive(Debug, Clone, Default)]
pub struct LocalStorageGateway {
    subscribers: Rc<SubscriberList>,
}

impl LocalStorageGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notify subscribers when another tab rewrites the score table
    pub fn watch_other_tabs(&self) {
        let Some(window) = web_sys::window() else { return };
        let subscribers = self.subscribers.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::StorageEvent| {
            if concerns_scores(event.key().as_deref()) {
                subscribers.notify();
            }
        });
        let _ = window.add_event_listener_with_callback("storage", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn storage() -> Result<web_sys::Storage, PersistenceError> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .ok_or(PersistenceError::Unavailable)
    }

    fn load() -> Result<ScoreTable, PersistenceError> {
        let storage = Self::storage()?;
        match storage.get_item(SCORES_STORAGE_KEY) {
            Ok(Some(json)) => Ok(serde_json::from_str(&json)?),
            Ok(None) => Ok(ScoreTable::new()),
            Err(_) => Err(PersistenceError::Storage("read failed".to_string())),
        }
    }

    fn store(table: &ScoreTable) -> Result<(), PersistenceError> {
        let storage = Self::storage()?;
        let json = serde_json::to_string(table)?;
        storage
            .set_item(SCORES_STORAGE_KEY, &json)
            .map_err(|_| PersistenceError::Storage("write failed (quota?)".to_string()))
    }
}

impl ScoreGateway for LocalStorageGateway {
    fn high_score(&self, identity: &str) -> GatewayFuture<u64> {
        let identity = identity.to_string();
        Box::pin(async move {
            let identity = normalize_identity(&identity)?;
            Ok(Self::load()?.high_score(&identity))
        })
    }

    fn save_score_if_higher(&self, identity: &str, score: u64) -> GatewayFuture<SaveOutcome> {
        let subscribers = self.subscribers.clone();
        let identity = identity.to_string();
        Box::pin(async move {
            let identity = normalize_identity(&identity)?;
            let mut table = Self::load()?;
            let outcome = table.save_if_higher(&identity, score);
            if outcome == SaveOutcome::Written {
                Self::store(&table)?;
                log::info!("High score {} saved for {}", score, identity);
                subscribers.notify();
            }
            Ok(outcome)
        })
    }

    fn set_presence(&self, identity: &str, active: bool) -> GatewayFuture<()> {
        let subscribers = self.subscribers.clone();
        let identity = identity.to_string();
        Box::pin(async move {
            let identity = normalize_identity(&identity)?;
            let mut table = Self::load()?;
            table.set_presence(&identity, active);
            Self::store(&table)?;
            subscribers.notify();
            Ok(())
        })
    }

    fn fetch_ranked(&self, limit: RankLimit) -> GatewayFuture<Vec<LeaderboardEntry>> {
        Box::pin(async move { Ok(Self::load()?.ranked(limit)) })
    }

    fn subscribe(&self, callback: ChangeCallback) -> SubscriptionId {
        self.subscribers.subscribe(callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }
}
