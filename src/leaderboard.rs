//! Ranked leaderboard view over persisted score rows
//!
//! One row per identity, sorted by score descending. Only the UI reads this;
//! gameplay never depends on it.

use serde::{Deserialize, Serialize};

/// Default number of rows shown on the in-game leaderboard
pub const DEFAULT_LEADERBOARD_SIZE: usize = 5;

/// A single persisted row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Player name (unique key)
    pub identity: String,
    /// Best score on record
    pub score: u64,
    /// Currently playing
    #[serde(default)]
    pub active: bool,
}

/// How many rows to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankLimit {
    Top(usize),
    All,
}

impl Default for RankLimit {
    fn default() -> Self {
        RankLimit::Top(DEFAULT_LEADERBOARD_SIZE)
    }
}

impl RankLimit {
    /// `Top(0)` means everything, like an absent limit
    pub fn apply<T>(self, rows: &mut Vec<T>) {
        if let RankLimit::Top(n) = self {
            if n > 0 {
                rows.truncate(n);
            }
        }
    }
}

/// Leaderboard sorted by score (descending), ties by identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    /// Build from unordered rows
    pub fn from_rows(mut rows: Vec<LeaderboardEntry>) -> Self {
        sort_ranked(&mut rows);
        Self { entries: rows }
    }

    /// Rows for a given limit
    pub fn top(&self, limit: RankLimit) -> Vec<LeaderboardEntry> {
        let mut rows = self.entries.clone();
        limit.apply(&mut rows);
        rows
    }

    /// Rank of an identity (1-indexed)
    pub fn rank_of(&self, identity: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.identity == identity)
            .map(|i| i + 1)
    }

    /// Number of players currently in a run
    pub fn online_count(&self) -> usize {
        self.entries.iter().filter(|e| e.active).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the top score (if any)
    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }
}

/// Sort rows into leaderboard order
pub fn sort_ranked(rows: &mut [LeaderboardEntry]) {
    rows.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.identity.cmp(&b.identity)));
}

/// One display line, e.g. `"1. alice 4200 ●"`
pub fn format_row(rank: usize, entry: &LeaderboardEntry, highlight: Option<&str>) -> String {
    let marker = if entry.active { " ●" } else { "" };
    let you = if highlight == Some(entry.identity.as_str()) {
        " (you)"
    } else {
        ""
    };
    format!("{}. {}{} {}{}", rank, entry.identity, you, entry.score, marker)
}
