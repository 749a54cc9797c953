//! Time-integrated difficulty curve

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Current obstacle speed and spawn interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyState {
    /// Forward obstacle speed (units/sec), grows without bound
    pub speed: f32,
    /// Seconds between spawns, decays to a floor
    pub spawn_interval: f32,
}

impl Default for DifficultyState {
    fn default() -> Self {
        Self {
            speed: BASE_SPEED,
            spawn_interval: SPAWN_INTERVAL_INITIAL,
        }
    }
}

impl DifficultyState {
    /// State after `dt` more seconds of active play
    #[must_use]
    pub fn advance(self, dt: f32) -> Self {
        Self {
            speed: self.speed + SPEED_INCREASE_RATE * dt,
            spawn_interval: (self.spawn_interval - SPAWN_RATE_INCREASE * dt).max(SPAWN_INTERVAL_MIN),
        }
    }
}

/// Free-function form of [`DifficultyState::advance`]
pub fn advance(state: DifficultyState, dt: f32) -> DifficultyState {
    state.advance(dt)
}
