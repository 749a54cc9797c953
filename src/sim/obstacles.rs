//! Obstacle spawning, movement and despawning

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::lanes::LaneSet;
use crate::consts::*;

/// Obstacle mesh catalog. Only the bounding radius matters to the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleShape {
    Icosahedron,
    TorusKnot,
    Sphere,
    Cone,
    Cylinder,
}

impl ObstacleShape {
    pub const ALL: [ObstacleShape; 5] = [
        Self::Icosahedron,
        Self::TorusKnot,
        Self::Sphere,
        Self::Cone,
        Self::Cylinder,
    ];

    /// Bounding sphere radius of the mesh
    pub fn radius(self) -> f32 {
        match self {
            Self::Icosahedron => 0.8,
            Self::TorusKnot => 0.8,
            Self::Sphere => 0.7,
            Self::Cone => 1.03,
            Self::Cylinder => 0.9,
        }
    }
}

/// An obstacle in flight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    /// Ground-plane position: x = lane offset, y = forward z
    pub pos: Vec2,
    pub radius: f32,
    pub shape: ObstacleShape,
    pub lane_index: usize,
    /// Tumble angle (radians, cosmetic)
    #[serde(default)]
    pub spin: f32,
}

impl Obstacle {
    pub fn new(shape: ObstacleShape, lane_index: usize, x: f32) -> Self {
        Self {
            pos: Vec2::new(x, OBSTACLE_SPAWN_Z),
            radius: shape.radius(),
            shape,
            lane_index,
            spin: 0.0,
        }
    }

    /// Place an obstacle at an explicit position (used for scripted setups)
    pub fn at(pos: Vec2, radius: f32) -> Self {
        Self {
            pos,
            radius,
            shape: ObstacleShape::Sphere,
            lane_index: 0,
            spin: 0.0,
        }
    }

    pub fn z(&self) -> f32 {
        self.pos.y
    }

    pub fn is_past_despawn(&self) -> bool {
        self.pos.y > OBSTACLE_DESPAWN_Z
    }
}

/// The set of active obstacles
#[derive(Debug, Clone)]
pub struct ObstaclePool {
    obstacles: Vec<Obstacle>,
    lanes: LaneSet,
    last_lane: Option<usize>,
    rng: Pcg32,
}

impl ObstaclePool {
    pub fn new(lanes: LaneSet, seed: u64) -> Self {
        Self {
            obstacles: Vec::new(),
            lanes,
            last_lane: None,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Drop every obstacle and start over on the given lanes
    pub fn reset(&mut self, lanes: LaneSet, seed: u64) {
        *self = Self::new(lanes, seed);
    }

    pub fn active(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    pub fn lanes(&self) -> LaneSet {
        self.lanes
    }

    pub fn last_lane(&self) -> Option<usize> {
        self.last_lane
    }

    /// Insert an obstacle directly, bypassing lane selection
    pub fn push(&mut self, obstacle: Obstacle) {
        self.obstacles.push(obstacle);
    }

    /// Spawn one obstacle at the far end of the track
    ///
    /// The lane is drawn uniformly and redrawn while it matches the previous
    /// spawn's lane, so two consecutive obstacles never share a lane when more
    /// than one lane exists.
    pub fn spawn(&mut self) -> &Obstacle {
        let lane_count = self.lanes.len();
        let mut lane = self.rng.random_range(0..lane_count);
        while lane_count > 1 && Some(lane) == self.last_lane {
            lane = self.rng.random_range(0..lane_count);
        }
        self.last_lane = Some(lane);

        let shape = ObstacleShape::ALL[self.rng.random_range(0..ObstacleShape::ALL.len())];
        let x = self.lanes.offset(lane).unwrap_or(0.0);
        log::debug!("Spawned {:?} in lane {} at x={}", shape, lane, x);

        let index = self.obstacles.len();
        self.obstacles.push(Obstacle::new(shape, lane, x));
        &self.obstacles[index]
    }

    /// Advance every obstacle toward the player, then drop those behind it
    pub fn tick(&mut self, dt: f32, speed: f32) {
        let step = speed * dt;
        for obstacle in &mut self.obstacles {
            obstacle.pos.y += step;
            obstacle.spin = (obstacle.spin + OBSTACLE_SPIN_SPEED * dt) % std::f32::consts::TAU;
        }
        self.obstacles.retain(|o| !o.is_past_despawn());
    }

    /// Switch to a new lane set. Obstacles already in flight keep their x.
    pub fn update_lanes(&mut self, lanes: LaneSet) {
        self.lanes = lanes;
        self.last_lane = None;
        log::debug!("Obstacle lanes updated to {} lanes", lanes.len());
    }
}
