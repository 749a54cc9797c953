//! High score and presence persistence
//!
//! Features:
//! - Async gateway contract over boxed local futures; the host picks the spawner
//! - One row per identity: best score plus an "actively playing" flag
//! - Change subscriptions for live leaderboard refresh
//! - In-memory backend for native builds and tests
//! - LocalStorage backend for the browser build

pub mod executor;
pub mod memory;
pub mod table;

#[cfg(target_arch = "wasm32")]
pub mod local_storage;

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::leaderboard::{LeaderboardEntry, RankLimit};

pub use executor::TaskSpawner;
pub use memory::InMemoryGateway;
pub use table::{ScoreTable, SubscriberList, normalize_identity};

#[cfg(target_arch = "wasm32")]
pub use executor::WasmSpawner;
#[cfg(target_arch = "wasm32")]
pub use local_storage::LocalStorageGateway;

/// A boxed, single-threaded future
pub type LocalFuture<T> = Pin<Box<dyn Future<Output = T>>>;

/// Result of a gateway call
pub type GatewayFuture<T> = LocalFuture<Result<T, PersistenceError>>;

/// Called after any row changes
pub type ChangeCallback = Box<dyn FnMut()>;

/// Handle returned by [`ScoreGateway::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

/// What a save actually did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveOutcome {
    /// New best score stored
    Written,
    /// Existing score was equal or higher
    Unchanged { stored: u64 },
}

/// Backend contract for scores, presence and the leaderboard
///
/// Every call returns a `'static` future so the session can hand it to a
/// spawner and keep ticking; implementations clone whatever shared state they
/// need into the future.
pub trait ScoreGateway {
    /// Best score on record for `identity` (0 if none)
    fn high_score(&self, identity: &str) -> GatewayFuture<u64>;

    /// Store `score` only if it beats the stored one
    fn save_score_if_higher(&self, identity: &str, score: u64) -> GatewayFuture<SaveOutcome>;

    /// Mark `identity` as playing or not, creating a zero-score row if needed
    fn set_presence(&self, identity: &str, active: bool) -> GatewayFuture<()>;

    /// Rows sorted by score descending
    fn fetch_ranked(&self, limit: RankLimit) -> GatewayFuture<Vec<LeaderboardEntry>>;

    /// Register for change notifications
    fn subscribe(&self, callback: ChangeCallback) -> SubscriptionId;

    /// Remove a subscription. Returns false if it was not registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
