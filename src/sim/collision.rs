//! Player vs obstacle collision detection
//!
//! Both the runner and the obstacles are bounding spheres resting on the
//! track, so each center sits one radius above the ground. A hit is a sphere
//! overlap in 3D (x, height, z).

use glam::Vec3;

use super::obstacles::Obstacle;
use super::player::Player;
use crate::consts::{PLAYER_SIZE, PLAYER_Z};

/// World-space center of the player
#[inline]
pub fn player_center(player: &Player) -> Vec3 {
    Vec3::new(player.current_x, PLAYER_SIZE / 2.0, PLAYER_Z)
}

/// World-space center of an obstacle
#[inline]
pub fn obstacle_center(obstacle: &Obstacle) -> Vec3 {
    Vec3::new(obstacle.pos.x, obstacle.radius, obstacle.pos.y)
}

/// Check if two spheres overlap (touching is not a hit)
#[inline]
pub fn spheres_overlap(a: Vec3, a_radius: f32, b: Vec3, b_radius: f32) -> bool {
    a.distance(b) < a_radius + b_radius
}

/// Find the first obstacle overlapping the given sphere
pub fn first_hit(center: Vec3, radius: f32, obstacles: &[Obstacle]) -> Option<&Obstacle> {
    obstacles
        .iter()
        .find(|o| spheres_overlap(center, radius, obstacle_center(o), o.radius))
}

/// Whether the player overlaps any obstacle
pub fn check(player: &Player, obstacles: &[Obstacle]) -> bool {
    first_hit(player_center(player), player.bounding_radius(), obstacles).is_some()
}
