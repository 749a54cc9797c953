//! Error types for session setup, ticking and persistence

use core::fmt;

/// Session could not be built because required wiring is missing
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionError {
    MissingSink,
    MissingGateway,
    MissingSpawner,
    InvalidIdentity { identity: String },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSink => write!(f, "session has no presentation sink"),
            Self::MissingGateway => write!(f, "session has no score gateway"),
            Self::MissingSpawner => write!(f, "session has no task spawner"),
            Self::InvalidIdentity { identity } => {
                write!(f, "invalid player identity: {identity:?}")
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// Fatal-for-this-run error raised inside a tick
#[derive(Clone, Debug, PartialEq)]
pub enum TickError {
    InvalidDelta { dt: f32 },
    LaneDesync { player_lanes: usize, pool_lanes: usize },
}

impl fmt::Display for TickError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDelta { dt } => write!(f, "invalid frame delta: {dt}"),
            Self::LaneDesync {
                player_lanes,
                pool_lanes,
            } => write!(
                f,
                "lane desync: player sees {player_lanes} lanes, obstacles see {pool_lanes}"
            ),
        }
    }
}

impl std::error::Error for TickError {}

/// Backend failure. Never fatal to gameplay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PersistenceError {
    Unavailable,
    InvalidIdentity,
    Storage(String),
    Serialization(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "score backend unavailable"),
            Self::InvalidIdentity => write!(f, "identity is empty"),
            Self::Storage(msg) => write!(f, "storage error: {msg}"),
            Self::Serialization(msg) => write!(f, "serialization error: {msg}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
