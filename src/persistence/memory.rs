//! In-process score backend
//!
//! Used by the native build and by tests. Work happens when the returned
//! future is polled, like a network round-trip, so a session's save can be
//! held "in flight" by simply not draining the task pool.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::table::{ScoreTable, SubscriberList, normalize_identity};
use super::{ChangeCallback, GatewayFuture, SaveOutcome, ScoreGateway, SubscriptionId};
use crate::error::PersistenceError;
use crate::leaderboard::{LeaderboardEntry, RankLimit};

#[derive(Debug, Default)]
struct Shared {
    table: RefCell<ScoreTable>,
    subscribers: SubscriberList,
    offline: Cell<bool>,
    writes: Cell<u32>,
}

/// Gateway over an in-memory [`ScoreTable`]; clones share the same rows
#[derive(Debug, Clone, Default)]
pub struct InMemoryGateway {
    shared: Rc<Shared>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a stored score for `identity`
    pub fn with_score(self, identity: &str, score: u64) -> Self {
        self.shared.table.borrow_mut().set_score(identity, score);
        self
    }

    /// Simulate the backend going away (every call fails)
    pub fn set_offline(&self, offline: bool) {
        self.shared.offline.set(offline);
    }

    /// Number of score writes that actually changed a row
    pub fn score_writes(&self) -> u32 {
        self.shared.writes.get()
    }

    pub fn stored_score(&self, identity: &str) -> u64 {
        self.shared.table.borrow().high_score(identity)
    }

    pub fn is_active(&self, identity: &str) -> bool {
        self.shared.table.borrow().is_active(identity)
    }

    fn check_online(shared: &Shared) -> Result<(), PersistenceError> {
        if shared.offline.get() {
            Err(PersistenceError::Unavailable)
        } else {
            Ok(())
        }
    }
}

impl ScoreGateway for InMemoryGateway {
    fn high_score(&self, identity: &str) -> GatewayFuture<u64> {
        let shared = self.shared.clone();
        let identity = identity.to_string();
        Box::pin(async move {
            Self::check_online(&shared)?;
            let identity = normalize_identity(&identity)?;
            Ok(shared.table.borrow().high_score(&identity))
        })
    }

    fn save_score_if_higher(&self, identity: &str, score: u64) -> GatewayFuture<SaveOutcome> {
        let shared = self.shared.clone();
        let identity = identity.to_string();
        Box::pin(async move {
            Self::check_online(&shared)?;
            let identity = normalize_identity(&identity)?;
            let outcome = shared.table.borrow_mut().save_if_higher(&identity, score);
            if outcome == SaveOutcome::Written {
                shared.writes.set(shared.writes.get() + 1);
                shared.subscribers.notify();
            }
            Ok(outcome)
        })
    }

    fn set_presence(&self, identity: &str, active: bool) -> GatewayFuture<()> {
        let shared = self.shared.clone();
        let identity = identity.to_string();
        Box::pin(async move {
            Self::check_online(&shared)?;
            let identity = normalize_identity(&identity)?;
            shared.table.borrow_mut().set_presence(&identity, active);
            shared.subscribers.notify();
            Ok(())
        })
    }

    fn fetch_ranked(&self, limit: RankLimit) -> GatewayFuture<Vec<LeaderboardEntry>> {
        let shared = self.shared.clone();
        Box::pin(async move {
            Self::check_online(&shared)?;
            Ok(shared.table.borrow().ranked(limit))
        })
    }

    fn subscribe(&self, callback: ChangeCallback) -> SubscriptionId {
        self.shared.subscribers.subscribe(callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.subscribers.unsubscribe(id)
    }
}
