//! Mayhem - a top-down arcade simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (collisions, movement, vehicles, combat, NPCs)
//! - `config`: Data-driven tuning constants
//! - `render`: Render hook contract for an external renderer

pub mod config;
pub mod render;
pub mod sim;

pub use config::{ConfigError, SimConfig};

use glam::Vec2;

/// Simulation configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Normal returned when two colliders share a center
    pub const DEFAULT_NORMAL: glam::Vec2 = glam::Vec2::X;

    /// Vehicle speed divisor for impact damage: max(1, floor(speed / 30))
    pub const IMPACT_DAMAGE_DIVISOR: f32 = 30.0;
    /// Player must be this close to a vehicle to enter it
    pub const VEHICLE_ENTER_RANGE: f32 = 50.0;
    /// Patrol waypoints are scattered within this radius of the spawn point
    pub const NPC_PATROL_RADIUS: f32 = 100.0;
    /// NPCs spawn on a ring this far from the player
    pub const NPC_SPAWN_DISTANCE: f32 = 600.0;
    /// NPCs farther than this from the player are despawned
    pub const NPC_DESPAWN_DISTANCE: f32 = 1000.0;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Convert cartesian (x, y) to polar (r, theta)
#[inline]
pub fn cartesian_to_polar(pos: Vec2) -> (f32, f32) {
    (pos.length(), pos.y.atan2(pos.x))
}

/// Unit vector pointing along `theta`
#[inline]
pub fn unit_from_angle(theta: f32) -> Vec2 {
    polar_to_cartesian(1.0, theta)
}
