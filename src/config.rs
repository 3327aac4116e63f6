//! Simulation tuning
//!
//! Every magic number the simulation depends on lives here. Values are tuned,
//! not derived; keep them exact when editing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// Errors raised while loading or validating a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// JSON could not be parsed into a configuration
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value is outside its permitted range
    #[error("config value `{field}` out of range: {value}")]
    OutOfRange { field: &'static str, value: f32 },
}

/// Player tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    /// Walk speed (units/s)
    pub speed: f32,
    pub radius: f32,
    pub max_health: f32,
    /// Pickups within this distance of the player are collected
    pub pickup_radius: f32,
    /// Maximum distance to a vehicle for entering it
    pub vehicle_enter_range: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            speed: 200.0,
            radius: 12.0,
            max_health: 100.0,
            pickup_radius: 24.0,
            vehicle_enter_range: VEHICLE_ENTER_RANGE,
        }
    }
}

/// Vehicle tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleTuning {
    /// Acceleration along heading (units/s²)
    pub acceleration: f32,
    pub max_speed: f32,
    /// Per-tick velocity multiplier (< 1)
    pub friction: f32,
    /// Steering rate at full speed (radians/s)
    pub turn_rate: f32,
    /// Bounce coefficient in [0, 1]
    pub restitution: f32,
    /// Impacts above this speed damage the vehicle
    pub damage_speed_threshold: f32,
    pub damage_divisor: f32,
    pub radius: f32,
    pub max_health: f32,
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            acceleration: 400.0,
            max_speed: 400.0,
            friction: 0.98,
            turn_rate: 3.0,
            restitution: 0.6,
            damage_speed_threshold: 50.0,
            damage_divisor: IMPACT_DAMAGE_DIVISOR,
            radius: 20.0,
            max_health: 100.0,
        }
    }
}

/// NPC tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NpcTuning {
    /// Base walk speed (units/s)
    pub speed: f32,
    pub radius: f32,
    pub max_health: f32,
    pub vision_range: f32,
    /// Full cone angle (radians)
    pub vision_angle: f32,
    /// Seconds spent idle before patrolling
    pub idle_timeout: f32,
    /// Distance at which a waypoint counts as reached
    pub arrival_distance: f32,
    pub patrol_radius: f32,
    pub patrol_waypoints: usize,
    /// Fleeing stops once the threat is farther than this
    pub flee_radius: f32,
    /// Seconds between shots while chasing
    pub shoot_cooldown: f32,
    pub chase_multiplier: f32,
    pub flee_multiplier: f32,
    pub projectile_speed: f32,
    pub projectile_damage: f32,
    pub projectile_range: f32,
    pub projectile_radius: f32,
}

impl Default for NpcTuning {
    fn default() -> Self {
        Self {
            speed: 80.0,
            radius: 12.0,
            max_health: 50.0,
            vision_range: 300.0,
            vision_angle: 120f32.to_radians(),
            idle_timeout: 2.0,
            arrival_distance: 10.0,
            patrol_radius: NPC_PATROL_RADIUS,
            patrol_waypoints: 4,
            flee_radius: 400.0,
            shoot_cooldown: 1.0,
            chase_multiplier: 1.2,
            flee_multiplier: 1.5,
            projectile_speed: 400.0,
            projectile_damage: 5.0,
            projectile_range: 500.0,
            projectile_radius: 3.0,
        }
    }
}

/// NPC population tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnTuning {
    pub spawn_distance: f32,
    pub despawn_distance: f32,
    pub max_npcs: usize,
    /// Seconds between spawn attempts
    pub spawn_interval: f32,
}

impl Default for SpawnTuning {
    fn default() -> Self {
        Self {
            spawn_distance: NPC_SPAWN_DISTANCE,
            despawn_distance: NPC_DESPAWN_DISTANCE,
            max_npcs: 8,
            spawn_interval: 3.0,
        }
    }
}

/// Complete simulation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub player: PlayerTuning,
    pub vehicle: VehicleTuning,
    pub npc: NpcTuning,
    pub spawn: SpawnTuning,
}

impl SimConfig {
    /// Parse a (possibly partial) JSON config and validate it
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every value is inside its permitted range
    pub fn validate(&self) -> Result<(), ConfigError> {
        let v = &self.vehicle;
        if !(0.0..=1.0).contains(&v.restitution) {
            return Err(out_of_range("vehicle.restitution", v.restitution));
        }
        if v.friction <= 0.0 || v.friction > 1.0 {
            return Err(out_of_range("vehicle.friction", v.friction));
        }
        if v.damage_divisor <= 0.0 {
            return Err(out_of_range("vehicle.damage_divisor", v.damage_divisor));
        }

        let positive = [
            ("player.speed", self.player.speed),
            ("player.radius", self.player.radius),
            ("player.max_health", self.player.max_health),
            ("vehicle.max_speed", v.max_speed),
            ("vehicle.radius", v.radius),
            ("vehicle.max_health", v.max_health),
            ("npc.speed", self.npc.speed),
            ("npc.radius", self.npc.radius),
            ("npc.max_health", self.npc.max_health),
            ("npc.vision_range", self.npc.vision_range),
            ("npc.projectile_range", self.npc.projectile_range),
            ("spawn.despawn_distance", self.spawn.despawn_distance),
        ];
        for (field, value) in positive {
            if value <= 0.0 {
                return Err(out_of_range(field, value));
            }
        }

        let angle = self.npc.vision_angle;
        if angle <= 0.0 || angle > std::f32::consts::TAU {
            return Err(out_of_range("npc.vision_angle", angle));
        }
        Ok(())
    }
}

fn out_of_range(field: &'static str, value: f32) -> ConfigError {
    log::warn!("Rejected config value {} = {}", field, value);
    ConfigError::OutOfRange { field, value }
}
