//! NPC perception and behavior
//!
//! ```text
//! Idle --timeout--> Patrol --target seen--> Chase --target lost--> Patrol
//!                                  any state --damaged--> Chase
//! Flee --threat beyond flee radius--> Patrol
//! ```
//!
//! Nothing in the simulation enters `Flee` on its own; it is reachable only
//! through [`Npc::flee_from`].
//!
//! Behavior runs in two halves each tick: [`Npc::apply_movement`] moves along
//! the velocity chosen last tick, and [`Npc::think`] re-evaluates perception
//! after combat has resolved, choosing the next velocity and possibly shooting.
//! Shots are reported through a per-NPC [`ShootHandler`]; NPCs have no ammo,
//! only a cooldown.

use std::fmt;

use glam::Vec2;
use rand::Rng;

use super::arena::{EntityAllocator, EntityId};
use super::collision::{Collider, CollisionRegistry};
use super::combat::{Faction, TargetKind, Targetable};
use super::movement::MovementResolver;
use crate::config::NpcTuning;
use crate::{cartesian_to_polar, normalize_angle, polar_to_cartesian};

/// Behavior state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NpcState {
    Idle { elapsed: f32 },
    Patrol,
    /// Moving toward the last known target position
    Chase { target: Vec2 },
    /// Running from a threat position
    Flee { threat: Vec2 },
}

impl NpcState {
    pub fn name(&self) -> &'static str {
        match self {
            NpcState::Idle { .. } => "Idle",
            NpcState::Patrol => "Patrol",
            NpcState::Chase { .. } => "Chase",
            NpcState::Flee { .. } => "Flee",
        }
    }
}

/// An NPC asking to fire at its target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotRequest {
    pub shooter: EntityId,
    pub position: Vec2,
    /// Unit aim direction
    pub direction: Vec2,
}

/// Receives an NPC's shot requests
pub trait ShootHandler {
    fn on_shoot(&mut self, shot: &ShotRequest);
}

impl<F: FnMut(&ShotRequest)> ShootHandler for F {
    fn on_shoot(&mut self, shot: &ShotRequest) {
        self(shot)
    }
}

/// Invoked synchronously for every NPC the manager creates
pub trait SpawnHandler {
    fn on_spawn(&mut self, npc: &mut Npc);
}

impl<F: FnMut(&mut Npc)> SpawnHandler for F {
    fn on_spawn(&mut self, npc: &mut Npc) {
        self(npc)
    }
}

/// Vision cone test
///
/// Visible iff within `range` and the bearing differs from `facing` by at most
/// half of `angle`, after normalizing the difference into [-π, π).
pub fn is_point_in_vision(origin: Vec2, facing: Vec2, range: f32, angle: f32, point: Vec2) -> bool {
    let (distance, bearing) = cartesian_to_polar(point - origin);
    if distance > range {
        return false;
    }
    let facing_angle = facing.y.atan2(facing.x);
    normalize_angle(bearing - facing_angle).abs() <= angle * 0.5
}

/// Random cyclic patrol route around `center`
pub fn patrol_route<R: Rng>(center: Vec2, radius: f32, count: usize, rng: &mut R) -> Vec<Vec2> {
    (0..count)
        .map(|_| {
            let theta = rng.random_range(-std::f32::consts::PI..std::f32::consts::PI);
            let r = rng.random_range(0.0..=radius);
            center + polar_to_cartesian(r, theta)
        })
        .collect()
}

/// An autonomous NPC
pub struct Npc {
    pub id: EntityId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
    pub health: f32,
    pub max_health: f32,
    pub is_dead: bool,
    /// Unit facing direction
    pub facing: Vec2,
    pub state: NpcState,
    pub route: Vec<Vec2>,
    pub waypoint: usize,
    pub speed: f32,
    pub vision_range: f32,
    pub vision_angle: f32,
    pub shoot_cooldown: f32,
    last_shot: Option<f32>,
    shooter: Option<Box<dyn ShootHandler>>,
}

impl fmt::Debug for Npc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Npc")
            .field("id", &self.id)
            .field("position", &self.position)
            .field("health", &self.health)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Npc {
    pub fn new(id: EntityId, position: Vec2, route: Vec<Vec2>, tuning: &NpcTuning) -> Self {
        Self {
            id,
            position,
            velocity: Vec2::ZERO,
            radius: tuning.radius,
            health: tuning.max_health,
            max_health: tuning.max_health,
            is_dead: false,
            facing: Vec2::X,
            state: NpcState::Idle { elapsed: 0.0 },
            route,
            waypoint: 0,
            speed: tuning.speed,
            vision_range: tuning.vision_range,
            vision_angle: tuning.vision_angle,
            shoot_cooldown: tuning.shoot_cooldown,
            last_shot: None,
            shooter: None,
        }
    }

    pub fn collider(&self) -> Collider {
        Collider::circle(self.position, self.radius)
    }

    pub fn set_shoot_handler(&mut self, handler: Box<dyn ShootHandler>) {
        self.shooter = Some(handler);
    }

    pub fn is_point_in_vision(&self, point: Vec2) -> bool {
        is_point_in_vision(
            self.position,
            self.facing,
            self.vision_range,
            self.vision_angle,
            point,
        )
    }

    fn transition(&mut self, next: NpcState) {
        if std::mem::discriminant(&self.state) != std::mem::discriminant(&next) {
            log::debug!("NPC {} {} -> {}", self.id, self.state.name(), next.name());
        }
        self.state = next;
    }

    /// Switch to chasing whoever hurt us, whatever we were doing
    pub fn on_damaged(&mut self, source: Vec2) {
        if self.is_dead {
            return;
        }
        self.transition(NpcState::Chase { target: source });
    }

    /// Run from `threat`. The simulation never calls this itself.
    pub fn flee_from(&mut self, threat: Vec2) {
        if self.is_dead {
            return;
        }
        self.transition(NpcState::Flee { threat });
    }

    fn face(&mut self, direction: Vec2) {
        if let Some(dir) = direction.try_normalize() {
            self.facing = dir;
        }
    }

    /// Perception and state transitions; picks the velocity for next tick's move
    pub fn think(
        &mut self,
        target: Option<&dyn Targetable>,
        now: f32,
        dt: f32,
        tuning: &NpcTuning,
    ) {
        if self.is_dead {
            self.velocity = Vec2::ZERO;
            return;
        }
        let target = target.filter(|t| !t.is_dead());

        match self.state {
            NpcState::Idle { elapsed } => {
                self.velocity = Vec2::ZERO;
                let elapsed = elapsed + dt;
                if elapsed >= tuning.idle_timeout {
                    self.transition(NpcState::Patrol);
                } else {
                    self.state = NpcState::Idle { elapsed };
                }
            }
            NpcState::Patrol => {
                if let Some(t) = target.filter(|t| self.is_point_in_vision(t.position())) {
                    self.transition(NpcState::Chase {
                        target: t.position(),
                    });
                    self.velocity = self.steer_toward(t.position(), tuning.chase_multiplier);
                } else {
                    self.velocity = self.patrol_velocity(tuning);
                }
            }
            NpcState::Chase { target: last_known } => {
                self.face(last_known - self.position);
                match target.filter(|t| self.is_point_in_vision(t.position())) {
                    Some(t) => {
                        let seen_at = t.position();
                        self.state = NpcState::Chase { target: seen_at };
                        self.face(seen_at - self.position);
                        self.velocity = self.steer_toward(seen_at, tuning.chase_multiplier);
                        self.try_shoot(seen_at, now);
                    }
                    None => {
                        self.transition(NpcState::Patrol);
                        self.velocity = self.patrol_velocity(tuning);
                    }
                }
            }
            NpcState::Flee { threat } => {
                if self.position.distance(threat) > tuning.flee_radius {
                    self.transition(NpcState::Patrol);
                    self.velocity = self.patrol_velocity(tuning);
                } else {
                    let away = (self.position - threat).try_normalize().unwrap_or(self.facing);
                    self.velocity = away * self.speed * tuning.flee_multiplier;
                }
            }
        }

        if !matches!(self.state, NpcState::Chase { .. }) {
            let velocity = self.velocity;
            self.face(velocity);
        }
    }

    fn steer_toward(&self, point: Vec2, multiplier: f32) -> Vec2 {
        (point - self.position).normalize_or_zero() * self.speed * multiplier
    }

    fn patrol_velocity(&mut self, tuning: &NpcTuning) -> Vec2 {
        if self.route.is_empty() {
            return Vec2::ZERO;
        }
        if self.position.distance(self.route[self.waypoint]) <= tuning.arrival_distance {
            self.waypoint = (self.waypoint + 1) % self.route.len();
        }
        self.steer_toward(self.route[self.waypoint], 1.0)
    }

    fn try_shoot(&mut self, at: Vec2, now: f32) {
        if let Some(last) = self.last_shot {
            if now - last < self.shoot_cooldown {
                return;
            }
        }
        let Some(direction) = (at - self.position).try_normalize() else {
            return;
        };
        self.last_shot = Some(now);
        let shot = ShotRequest {
            shooter: self.id,
            position: self.position,
            direction,
        };
        if let Some(handler) = self.shooter.as_mut() {
            handler.on_shoot(&shot);
        }
    }

    /// Move along the current velocity, sliding against the registry
    pub fn apply_movement(&mut self, registry: &mut CollisionRegistry, dt: f32) {
        if self.is_dead {
            return;
        }
        let result = MovementResolver::resolve(registry, self.id, self.position, self.velocity * dt);
        self.position = result.position;
    }
}

impl Targetable for Npc {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> TargetKind {
        TargetKind::Npc
    }

    fn faction(&self) -> Faction {
        Faction::Npc
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

    fn take_damage(&mut self, amount: f32, source: Vec2) -> bool {
        if self.is_dead {
            return false;
        }
        self.health = (self.health - amount).max(0.0);
        if self.health <= 0.0 {
            self.is_dead = true;
            self.velocity = Vec2::ZERO;
            log::debug!("NPC {} killed", self.id);
            return true;
        }
        self.on_damaged(source);
        false
    }
}

/// Owns the NPC population and their colliders
#[derive(Default)]
pub struct NpcManager {
    npcs: Vec<Npc>,
    spawn_handlers: Vec<Box<dyn SpawnHandler>>,
}

impl NpcManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handlers run in registration order for every NPC created after this point
    pub fn add_spawn_handler(&mut self, handler: Box<dyn SpawnHandler>) {
        self.spawn_handlers.push(handler);
    }

    /// Create an NPC, register its collider and run the spawn handlers
    pub fn spawn(
        &mut self,
        alloc: &mut EntityAllocator,
        registry: &mut CollisionRegistry,
        position: Vec2,
        route: Vec<Vec2>,
        tuning: &NpcTuning,
    ) -> EntityId {
        let id = alloc.allocate();
        let mut npc = Npc::new(id, position, route, tuning);
        registry.register(id, npc.collider());
        for handler in &mut self.spawn_handlers {
            handler.on_spawn(&mut npc);
        }
        log::info!("Spawned NPC {} at ({:.0}, {:.0})", id, position.x, position.y);
        self.npcs.push(npc);
        id
    }

    /// Remove an NPC and its collider
    pub fn despawn(
        &mut self,
        alloc: &mut EntityAllocator,
        registry: &mut CollisionRegistry,
        id: EntityId,
    ) -> bool {
        let Some(idx) = self.npcs.iter().position(|n| n.id == id) else {
            return false;
        };
        self.npcs.remove(idx);
        registry.unregister(id);
        alloc.free(id);
        true
    }

    /// Remove every dead NPC. Returns how many were removed.
    pub fn prune_dead(&mut self, alloc: &mut EntityAllocator, registry: &mut CollisionRegistry) -> usize {
        let before = self.npcs.len();
        self.npcs.retain(|npc| {
            if npc.is_dead {
                registry.unregister(npc.id);
                alloc.free(npc.id);
                false
            } else {
                true
            }
        });
        before - self.npcs.len()
    }

    pub fn get(&self, id: EntityId) -> Option<&Npc> {
        self.npcs.iter().find(|n| n.id == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Npc> {
        self.npcs.iter_mut().find(|n| n.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Npc> {
        self.npcs.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Npc> {
        self.npcs.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.npcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.npcs.is_empty()
    }
}
