//! Projectile lifecycle
//!
//! A projectile is created by a weapon or an NPC shot and is destroyed when it
//! has travelled past its range, enters solid scenery, or hits something.
//! Range is a distance budget, not a lifetime. After creation only position
//! and travelled distance change.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::arena::EntityId;
use super::combat::Faction;
use super::geometry::SolidQuery;

/// Parameters for a new projectile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileSpawn {
    pub owner: EntityId,
    pub faction: Faction,
    pub origin: Vec2,
    /// Unit direction
    pub direction: Vec2,
    pub speed: f32,
    pub damage: f32,
    pub range: f32,
    pub radius: f32,
}

/// A live projectile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    id: u32,
    owner: EntityId,
    faction: Faction,
    position: Vec2,
    velocity: Vec2,
    damage: f32,
    range: f32,
    radius: f32,
    traveled: f32,
    alive: bool,
}

impl Projectile {
    pub fn new(id: u32, spawn: ProjectileSpawn) -> Self {
        let direction = spawn.direction.try_normalize().unwrap_or(Vec2::X);
        Self {
            id,
            owner: spawn.owner,
            faction: spawn.faction,
            position: spawn.origin,
            velocity: direction * spawn.speed,
            damage: spawn.damage,
            range: spawn.range,
            radius: spawn.radius,
            traveled: 0.0,
            alive: true,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn owner(&self) -> EntityId {
        self.owner
    }

    pub fn faction(&self) -> Faction {
        self.faction
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn damage(&self) -> f32 {
        self.damage
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn traveled(&self) -> f32 {
        self.traveled
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Mark for removal (hit or scenery)
    pub fn destroy(&mut self) {
        self.alive = false;
    }

    /// Advance one tick. Dies once the distance budget is exceeded.
    pub fn advance(&mut self, dt: f32) {
        if !self.alive {
            return;
        }
        let step = self.velocity * dt;
        self.position += step;
        self.traveled += step.length();
        if self.traveled > self.range {
            self.alive = false;
        }
    }
}

/// Owns every live projectile, in creation order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectilePool {
    projectiles: Vec<Projectile>,
    next_id: u32,
}

impl ProjectilePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, spawn: ProjectileSpawn) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.projectiles.push(Projectile::new(id, spawn));
        id
    }

    /// Move everything, then kill projectiles that entered solid scenery
    pub fn update(&mut self, dt: f32, solids: &dyn SolidQuery) {
        for p in &mut self.projectiles {
            p.advance(dt);
            if p.alive && solids.is_position_inside_solid(p.position) {
                p.alive = false;
            }
        }
    }

    /// Drop dead projectiles
    pub fn prune(&mut self) {
        self.projectiles.retain(|p| p.alive);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.iter()
    }

    pub fn as_mut_slice(&mut self) -> &mut [Projectile] {
        &mut self.projectiles
    }

    pub fn len(&self) -> usize {
        self.projectiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projectiles.is_empty()
    }
}
