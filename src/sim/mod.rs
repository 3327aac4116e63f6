//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (registration / spawn order)
//! - No rendering or platform dependencies

pub mod arena;
pub mod collision;
pub mod combat;
pub mod geometry;
pub mod movement;
pub mod npc;
pub mod pickup;
pub mod player;
pub mod projectile;
pub mod state;
pub mod tick;
pub mod vehicle;
pub mod weapon;

pub use arena::{EntityAllocator, EntityId};
pub use collision::{Collider, CollisionRegistry, Shape};
pub use combat::{Faction, HitExclusions, Hit, TargetKind, Targetable, nearest_living, resolve_hits};
pub use geometry::{OpenField, SolidQuery, StaticGeometry};
pub use movement::{MoveOutcome, MoveResult, MovementResolver};
pub use npc::{Npc, NpcManager, NpcState, ShootHandler, ShotRequest, SpawnHandler, is_point_in_vision};
pub use pickup::{Pickup, PickupField, PickupKind};
pub use player::Player;
pub use projectile::{Projectile, ProjectilePool, ProjectileSpawn};
pub use state::{GameEvent, GamePhase, GameState, HudSnapshot};
pub use tick::{TickInput, tick};
pub use vehicle::{DriveInput, Impact, Vehicle};
pub use weapon::{Arsenal, FireMode, ReloadState, Trigger, Weapon, WeaponKind, WeaponSpec};
