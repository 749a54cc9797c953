//! Simulation module
//!
//! All gameplay rules live here. Nothing in this module touches the DOM,
//! storage or the network:
//! - Lanes are fixed tables swapped wholesale
//! - Seeded RNG only
//! - Time only enters through `dt`

pub mod collision;
pub mod difficulty;
pub mod lanes;
pub mod notifications;
pub mod obstacles;
pub mod player;

pub use difficulty::DifficultyState;
pub use lanes::{LaneLevel, LaneSet, expansion_threshold, lanes_for_level, next_level};
pub use notifications::{Notification, NotificationTimers};
pub use obstacles::{Obstacle, ObstaclePool, ObstacleShape};
pub use player::Player;
