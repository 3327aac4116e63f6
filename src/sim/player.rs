//! The player character: walking, aiming and shooting

use glam::Vec2;
use rand::Rng;

use super::arena::EntityId;
use super::collision::{Collider, CollisionRegistry};
use super::combat::{Faction, TargetKind, Targetable};
use super::movement::{MoveResult, MovementResolver};
use super::projectile::ProjectileSpawn;
use super::weapon::{Arsenal, Trigger, Weapon, WeaponKind};
use crate::config::PlayerTuning;

/// The player-controlled character
#[derive(Debug, Clone)]
pub struct Player {
    pub id: EntityId,
    pub position: Vec2,
    pub radius: f32,
    pub speed: f32,
    pub health: f32,
    pub max_health: f32,
    pub is_dead: bool,
    /// Unit aim direction
    pub facing: Vec2,
    pub arsenal: Arsenal,
    /// Vehicle being driven, if any
    pub vehicle: Option<EntityId>,
}

impl Player {
    /// New player holding a loaded pistol
    pub fn new(id: EntityId, position: Vec2, tuning: &PlayerTuning) -> Self {
        Self {
            id,
            position,
            radius: tuning.radius,
            speed: tuning.speed,
            health: tuning.max_health,
            max_health: tuning.max_health,
            is_dead: false,
            facing: Vec2::X,
            arsenal: Arsenal::new(Weapon::new(WeaponKind::Pistol)),
            vehicle: None,
        }
    }

    pub fn collider(&self) -> Collider {
        Collider::circle(self.position, self.radius)
    }

    pub fn is_driving(&self) -> bool {
        self.vehicle.is_some()
    }

    pub fn weapon(&self) -> &Weapon {
        self.arsenal.current()
    }

    /// Face a world-space aim point. Aiming at our own position keeps the old facing.
    pub fn aim_at(&mut self, point: Vec2) {
        if let Some(dir) = (point - self.position).try_normalize() {
            self.facing = dir;
        }
    }

    /// Walk along `intent` (length clamped to 1) with axis sliding
    pub fn walk(&mut self, registry: &mut CollisionRegistry, intent: Vec2, dt: f32) -> MoveResult {
        let displacement = intent.clamp_length_max(1.0) * self.speed * dt;
        let result = MovementResolver::resolve(registry, self.id, self.position, displacement);
        self.position = result.position;
        result
    }

    /// Restore health, clamped to max. Returns the amount actually restored.
    pub fn heal(&mut self, amount: f32) -> f32 {
        if self.is_dead {
            return 0.0;
        }
        let before = self.health;
        self.health = (self.health + amount).min(self.max_health);
        self.health - before
    }

    /// Pull the trigger on the current weapon
    ///
    /// An empty magazine with reserve ammo starts a reload instead of firing.
    pub fn shoot<R: Rng>(&mut self, now: f32, trigger: Trigger, rng: &mut R) -> Vec<ProjectileSpawn> {
        if self.is_dead || !(trigger.pressed || trigger.held) {
            return Vec::new();
        }
        let weapon = self.arsenal.current_mut();
        if weapon.current_ammo == 0 {
            if weapon.start_reload(now) {
                log::debug!("{} empty, reloading", weapon.kind.as_str());
            }
            return Vec::new();
        }

        let Some(directions) = weapon.try_fire(now, trigger, self.facing, rng) else {
            return Vec::new();
        };
        let spec = weapon.spec;
        directions
            .into_iter()
            .map(|direction| ProjectileSpawn {
                owner: self.id,
                faction: Faction::Player,
                origin: self.position,
                direction,
                speed: spec.projectile_speed,
                damage: spec.damage,
                range: spec.range,
                radius: spec.projectile_radius,
            })
            .collect()
    }

    pub fn reload(&mut self, now: f32) -> bool {
        self.arsenal.current_mut().start_reload(now)
    }

    pub fn switch_weapon(&mut self, kind: WeaponKind) -> bool {
        self.arsenal.switch_to(kind)
    }

    /// Advance the current weapon's reload timer
    pub fn update_weapon(&mut self, now: f32) -> bool {
        self.arsenal.current_mut().update(now)
    }
}

impl Targetable for Player {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> TargetKind {
        TargetKind::Player
    }

    fn faction(&self) -> Faction {
        Faction::Player
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn radius(&self) -> f32 {
        self.radius
    }

    fn is_dead(&self) -> bool {
        self.is_dead
    }

    fn take_damage(&mut self, amount: f32, _source: Vec2) -> bool {
        if self.is_dead {
            return false;
        }
        self.health = (self.health - amount).max(0.0);
        if self.health <= 0.0 {
            self.is_dead = true;
            log::info!("Player killed");
            return true;
        }
        false
    }
}
