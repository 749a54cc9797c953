//! Row storage and subscriber bookkeeping shared by the gateway backends

use std::cell::RefCell;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ChangeCallback, SaveOutcome, SubscriptionId};
use crate::error::PersistenceError;
use crate::leaderboard::{LeaderboardEntry, RankLimit, sort_ranked};

/// LocalStorage key for the score table
pub const SCORES_STORAGE_KEY: &str = "wireframe_runner_scores";

/// Whether a storage change under `key` touches the score table
///
/// A `None` key means the whole storage area was cleared.
pub fn concerns_scores(key: Option<&str>) -> bool {
    key.is_none_or(|k| k == SCORES_STORAGE_KEY)
}

/// Trim an identity and reject empty ones
pub fn normalize_identity(identity: &str) -> Result<String, PersistenceError> {
    let trimmed = identity.trim();
    if trimmed.is_empty() {
        return Err(PersistenceError::InvalidIdentity);
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Row {
    score: u64,
    active: bool,
}

/// All persisted rows, keyed by identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreTable {
    rows: BTreeMap<String, Row>,
}

impl ScoreTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn high_score(&self, identity: &str) -> u64 {
        self.rows.get(identity).map(|r| r.score).unwrap_or(0)
    }

    pub fn is_active(&self, identity: &str) -> bool {
        self.rows.get(identity).is_some_and(|r| r.active)
    }

    /// Overwrite a row's score unconditionally (seeding, imports)
    pub fn set_score(&mut self, identity: &str, score: u64) {
        self.rows.entry(identity.to_string()).or_default().score = score;
    }

    pub fn save_if_higher(&mut self, identity: &str, score: u64) -> SaveOutcome {
        match self.rows.get_mut(identity) {
            Some(row) if score <= row.score => SaveOutcome::Unchanged { stored: row.score },
            Some(row) => {
                row.score = score;
                SaveOutcome::Written
            }
            None => {
                self.rows.insert(
                    identity.to_string(),
                    Row {
                        score,
                        active: false,
                    },
                );
                SaveOutcome::Written
            }
        }
    }

    pub fn set_presence(&mut self, identity: &str, active: bool) {
        self.rows.entry(identity.to_string()).or_default().active = active;
    }

    pub fn ranked(&self, limit: RankLimit) -> Vec<LeaderboardEntry> {
        let mut rows: Vec<LeaderboardEntry> = self
            .rows
            .iter()
            .map(|(identity, row)| LeaderboardEntry {
                identity: identity.clone(),
                score: row.score,
                active: row.active,
            })
            .collect();
        sort_ranked(&mut rows);
        limit.apply(&mut rows);
        rows
    }
}

#[derive(Default)]
struct SubscriberState {
    next_id: u64,
    callbacks: Vec<(SubscriptionId, ChangeCallback)>,
    /// Ids whose callbacks are currently checked out by `notify`
    checked_out: Vec<SubscriptionId>,
    /// Checked-out ids unsubscribed while their callbacks were running
    dropped: Vec<SubscriptionId>,
}

/// Change subscribers. Callbacks may subscribe or unsubscribe while running.
#[derive(Default)]
pub struct SubscriberList {
    state: RefCell<SubscriberState>,
}

impl SubscriberList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: ChangeCallback) -> SubscriptionId {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = SubscriptionId(state.next_id);
        state.callbacks.push((id, callback));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.borrow_mut();
        let before = state.callbacks.len();
        state.callbacks.retain(|(sub, _)| *sub != id);
        if state.callbacks.len() != before {
            return true;
        }
        if state.checked_out.contains(&id) && !state.dropped.contains(&id) {
            state.dropped.push(id);
            return true;
        }
        false
    }

    pub fn len(&self) -> usize {
        self.state.borrow().callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every callback once
    pub fn notify(&self) {
        let mut running = {
            let mut state = self.state.borrow_mut();
            state.checked_out = state.callbacks.iter().map(|(id, _)| *id).collect();
            std::mem::take(&mut state.callbacks)
        };
        for (_, callback) in running.iter_mut() {
            callback();
        }
        let mut state = self.state.borrow_mut();
        let dropped = std::mem::take(&mut state.dropped);
        state.checked_out.clear();
        running.retain(|(id, _)| !dropped.contains(id));
        // Callbacks added during notify go after the existing ones
        running.append(&mut state.callbacks);
        state.callbacks = running;
    }
}

impl std::fmt::Debug for SubscriberList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberList")
            .field("subscribers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_normalize_identity() {
        assert_eq!(normalize_identity("  ada "), Ok("ada".to_string()));
        assert_eq!(normalize_identity("   "), Err(PersistenceError::InvalidIdentity));
    }

    #[test]
    fn test_storage_key_filter() {
        assert!(concerns_scores(Some(SCORES_STORAGE_KEY)));
        assert!(concerns_scores(None));
        assert!(!concerns_scores(Some("wireframe_runner_settings")));
    }

    #[test]
    fn test_save_if_higher() {
        let mut table = ScoreTable::new();
        table.set_score("ada", 1000);
        assert_eq!(
            table.save_if_higher("ada", 500),
            SaveOutcome::Unchanged { stored: 1000 }
        );
        assert_eq!(
            table.save_if_higher("ada", 1000),
            SaveOutcome::Unchanged { stored: 1000 }
        );
        assert_eq!(table.save_if_higher("ada", 1001), SaveOutcome::Written);
        assert_eq!(table.high_score("ada"), 1001);
        assert_eq!(table.save_if_higher("new", 1), SaveOutcome::Written);
    }

    #[test]
    fn test_presence_creates_zero_row() {
        let mut table = ScoreTable::new();
        table.set_presence("ada", true);
        assert_eq!(table.high_score("ada"), 0);
        assert!(table.is_active("ada"));
        table.save_if_higher("ada", 50);
        assert!(table.is_active("ada"), "saving keeps presence");
    }

    #[test]
    fn test_ranked_order_and_limit() {
        let mut table = ScoreTable::new();
        table.set_score("low", 10);
        table.set_score("high", 300);
        table.set_score("mid", 200);
        let ranked = table.ranked(RankLimit::Top(2));
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].identity, "high");
        assert_eq!(ranked[1].identity, "mid");
        assert_eq!(table.ranked(RankLimit::All).len(), 3);
    }

    #[test]
    fn test_subscribers_notify_and_unsubscribe() {
        let list = SubscriberList::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let id = list.subscribe(Box::new(move || h.set(h.get() + 1)));
        list.notify();
        list.notify();
        assert_eq!(hits.get(), 2);
        assert!(list.unsubscribe(id));
        assert!(!list.unsubscribe(id));
        list.notify();
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_callback_can_unsubscribe_itself() {
        let list = Rc::new(SubscriberList::new());
        let hits = Rc::new(Cell::new(0));
        let own_id: Rc<Cell<Option<SubscriptionId>>> = Rc::new(Cell::new(None));
        let (l, h, own) = (list.clone(), hits.clone(), own_id.clone());
        let id = list.subscribe(Box::new(move || {
            h.set(h.get() + 1);
            if let Some(id) = own.get() {
                l.unsubscribe(id);
            }
        }));
        own_id.set(Some(id));
        list.notify();
        list.notify();
        assert_eq!(hits.get(), 1);
        assert!(list.is_empty());
    }
}
