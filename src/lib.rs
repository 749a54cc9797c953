//! Wireframe Runner - A lane-switching endless runner
//!
//! Core modules:
//! - `sim`: Lanes, player, obstacles, difficulty and collision
//! - `session`: Gameplay state machine tying the simulation together
//! - `driver`: Per-frame loop that feeds the session and halts on errors
//! - `persistence`: Async high score / presence gateway and task spawning
//! - `presentation`: Events the session pushes to the UI
//! - `platform`: Browser input mapping

pub mod driver;
pub mod error;
pub mod leaderboard;
pub mod persistence;
pub mod platform;
pub mod presentation;
pub mod session;
pub mod settings;
pub mod sim;

pub use driver::{FrameLoop, FrameStatus};
pub use error::{PersistenceError, SessionError, TickError};
pub use leaderboard::{Leaderboard, LeaderboardEntry, RankLimit};
pub use presentation::{EventLog, PresentationSink, SessionEvent};
pub use session::{GameSession, Intent, SessionBuilder, SessionSnapshot, TickOutcome};
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Player sphere diameter
    pub const PLAYER_SIZE: f32 = 1.0;
    /// Distance between neighbouring lanes
    pub const LANE_WIDTH: f32 = 2.5;
    /// Fraction of the remaining lateral distance covered each tick
    pub const LANE_APPROACH_FACTOR: f32 = 0.15;
    /// Player spin (radians/sec, cosmetic)
    pub const PLAYER_SPIN_SPEED: f32 = 1.0;

    /// Score needed for 5, 7 and 9 lanes
    pub const LANE_EXPANSION_LEVEL_1_SCORE: u64 = 700;
    pub const LANE_EXPANSION_LEVEL_2_SCORE: u64 = 1200;
    pub const LANE_EXPANSION_LEVEL_3_SCORE: u64 = 1700;

    /// Obstacles spawn far ahead and travel toward +z
    pub const OBSTACLE_SPAWN_Z: f32 = -60.0;
    /// Obstacles past this point are behind the camera
    pub const OBSTACLE_DESPAWN_Z: f32 = 15.0;
    /// Obstacle tumble (radians/sec, cosmetic)
    pub const OBSTACLE_SPIN_SPEED: f32 = 0.8;
    /// The player sits on the z = 0 plane
    pub const PLAYER_Z: f32 = 0.0;

    /// Difficulty curve
    pub const BASE_SPEED: f32 = 30.0;
    pub const SPEED_INCREASE_RATE: f32 = 1.0;
    pub const SPAWN_INTERVAL_INITIAL: f32 = 0.7;
    pub const SPAWN_INTERVAL_MIN: f32 = 0.2;
    pub const SPAWN_RATE_INCREASE: f32 = 0.015;

    /// Milestone banner every this many points
    pub const MILESTONE_STEP: u64 = 1000;

    /// Largest frame delta the frame loop will feed the session (seconds)
    pub const MAX_FRAME_DT: f32 = 0.1;
    /// Delta used for the very first frame, before a previous timestamp exists
    pub const FIRST_FRAME_DT: f32 = 1.0 / 60.0;
}
