//! The player's runner: lane index plus a smoothed lateral position

use serde::{Deserialize, Serialize};

use super::lanes::LaneSet;
use crate::consts::*;

/// The player entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    lanes: LaneSet,
    lane_index: usize,
    /// Rendered lateral position, chases `target_x`
    pub current_x: f32,
    target_x: f32,
    /// Spin angle (radians, cosmetic)
    pub spin: f32,
}

impl Player {
    /// Create a player centered on the given lanes
    pub fn new(lanes: LaneSet) -> Self {
        let lane_index = lanes.center_index();
        let target_x = lanes.offset(lane_index).unwrap_or(0.0);
        Self {
            lanes,
            lane_index,
            current_x: target_x,
            target_x,
            spin: 0.0,
        }
    }

    /// Re-center on a fresh lane set (teleports, unlike `update_lanes`)
    pub fn reset(&mut self, lanes: LaneSet) {
        *self = Self::new(lanes);
    }

    pub fn lanes(&self) -> LaneSet {
        self.lanes
    }

    pub fn lane_index(&self) -> usize {
        self.lane_index
    }

    pub fn target_x(&self) -> f32 {
        self.target_x
    }

    pub fn bounding_radius(&self) -> f32 {
        PLAYER_SIZE / 2.0
    }

    /// Move one lane left. Returns false at the left edge.
    pub fn move_left(&mut self) -> bool {
        if self.lane_index == 0 {
            return false;
        }
        self.set_lane(self.lane_index - 1);
        true
    }

    /// Move one lane right. Returns false at the right edge.
    pub fn move_right(&mut self) -> bool {
        if self.lane_index >= self.lanes.last_index() {
            return false;
        }
        self.set_lane(self.lane_index + 1);
        true
    }

    /// Ease toward the target lane
    pub fn tick(&mut self, dt: f32) {
        self.current_x += (self.target_x - self.current_x) * LANE_APPROACH_FACTOR;
        self.spin = (self.spin + PLAYER_SPIN_SPEED * dt) % std::f32::consts::TAU;
    }

    /// Re-project onto a new lane set, keeping the offset from the center lane
    pub fn update_lanes(&mut self, lanes: LaneSet) {
        let shift = lanes.center_index() as isize - self.lanes.center_index() as isize;
        let index = (self.lane_index as isize + shift).clamp(0, lanes.last_index() as isize);
        self.lanes = lanes;
        self.set_lane(index as usize);
        log::debug!(
            "Player lanes updated: index {}, target x {}",
            self.lane_index,
            self.target_x
        );
    }

    fn set_lane(&mut self, index: usize) {
        self.lane_index = index;
        self.target_x = self.lanes.offset(index).unwrap_or(self.target_x);
    }
}
