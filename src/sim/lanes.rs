//! Lane topology and the score-driven expansion policy
//!
//! The track starts with three lanes and widens to five, seven and nine lanes
//! as the score crosses fixed thresholds. Lane sets are fixed tables; a run
//! swaps the whole set, it never edits one.

use serde::{Deserialize, Serialize};

use crate::consts::*;

const LANES_LEVEL_0: [f32; 3] = [-LANE_WIDTH, 0.0, LANE_WIDTH];
const LANES_LEVEL_1: [f32; 5] = [-2.0 * LANE_WIDTH, -LANE_WIDTH, 0.0, LANE_WIDTH, 2.0 * LANE_WIDTH];
const LANES_LEVEL_2: [f32; 7] = [
    -3.0 * LANE_WIDTH,
    -2.0 * LANE_WIDTH,
    -LANE_WIDTH,
    0.0,
    LANE_WIDTH,
    2.0 * LANE_WIDTH,
    3.0 * LANE_WIDTH,
];
const LANES_LEVEL_3: [f32; 9] = [
    -4.0 * LANE_WIDTH,
    -3.0 * LANE_WIDTH,
    -2.0 * LANE_WIDTH,
    -LANE_WIDTH,
    0.0,
    LANE_WIDTH,
    2.0 * LANE_WIDTH,
    3.0 * LANE_WIDTH,
    4.0 * LANE_WIDTH,
];

/// Lane expansion level (0 = initial three lanes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum LaneLevel {
    #[default]
    Three,
    Five,
    Seven,
    Nine,
}

impl LaneLevel {
    pub const ALL: [LaneLevel; 4] = [Self::Three, Self::Five, Self::Seven, Self::Nine];

    /// Score that unlocks this level (`None` for the starting level)
    pub fn threshold(self) -> Option<u64> {
        match self {
            Self::Three => None,
            Self::Five => Some(LANE_EXPANSION_LEVEL_1_SCORE),
            Self::Seven => Some(LANE_EXPANSION_LEVEL_2_SCORE),
            Self::Nine => Some(LANE_EXPANSION_LEVEL_3_SCORE),
        }
    }

    pub fn lane_count(self) -> usize {
        lanes_for_level(self).len()
    }
}

/// An immutable set of lateral lane offsets
///
/// Cheap to copy; Player and ObstaclePool each hold the same value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "LaneLevel", into = "LaneLevel")]
pub struct LaneSet {
    level: LaneLevel,
    offsets: &'static [f32],
}

impl LaneSet {
    pub fn level(&self) -> LaneLevel {
        self.level
    }

    pub fn offsets(&self) -> &'static [f32] {
        self.offsets
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn center_index(&self) -> usize {
        self.offsets.len() / 2
    }

    /// Lateral offset of a lane, if the index exists in this set
    pub fn offset(&self, index: usize) -> Option<f32> {
        self.offsets.get(index).copied()
    }

    pub fn last_index(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }
}

impl Default for LaneSet {
    fn default() -> Self {
        lanes_for_level(LaneLevel::Three)
    }
}

impl From<LaneLevel> for LaneSet {
    fn from(level: LaneLevel) -> Self {
        lanes_for_level(level)
    }
}

impl From<LaneSet> for LaneLevel {
    fn from(lanes: LaneSet) -> Self {
        lanes.level
    }
}

/// Lane set for an expansion level
pub fn lanes_for_level(level: LaneLevel) -> LaneSet {
    let offsets: &'static [f32] = match level {
        LaneLevel::Three => &LANES_LEVEL_0,
        LaneLevel::Five => &LANES_LEVEL_1,
        LaneLevel::Seven => &LANES_LEVEL_2,
        LaneLevel::Nine => &LANES_LEVEL_3,
    };
    LaneSet { level, offsets }
}

/// Score threshold for an expansion level
pub fn expansion_threshold(level: LaneLevel) -> Option<u64> {
    level.threshold()
}

/// Level the track should be at, given the current level and score
///
/// Levels are checked from the widest down and the first qualifying one wins,
/// so a score that jumped past several thresholds in one frame produces a
/// single transition straight to the widest unlocked level.
pub fn next_level(current: LaneLevel, score: u64) -> LaneLevel {
    LaneLevel::ALL
        .iter()
        .rev()
        .copied()
        .filter(|&level| level > current)
        .find(|level| level.threshold().is_some_and(|t| score >= t))
        .unwrap_or(current)
}
