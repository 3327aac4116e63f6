//! World state
//!
//! Owns every entity, the shared collision registry and the seeded RNG.
//! Entities of all kinds draw their ids from one allocator, so a handle is
//! unique across players, NPCs, vehicles and scenery.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::arena::{EntityAllocator, EntityId};
use super::collision::{Collider, CollisionRegistry};
use super::combat::{Faction, Hit};
use super::geometry::{SolidQuery, StaticGeometry};
use super::npc::{Npc, NpcManager, ShotRequest, SpawnHandler, patrol_route};
use super::pickup::{Pickup, PickupField, PickupKind};
use super::player::Player;
use super::projectile::{ProjectilePool, ProjectileSpawn};
use super::vehicle::Vehicle;
use super::weapon::WeaponKind;
use crate::config::{ConfigError, SimConfig};
use crate::polar_to_cartesian;
use crate::render::{Projector, RenderSink, SpriteKind, SpriteView};

/// Ring positions tried per NPC spawn before giving up until the next interval
const SPAWN_ATTEMPTS: usize = 8;

/// Game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Playing,
    /// Player died; the simulation no longer advances
    GameOver,
}

/// Things that happened during the last tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    ShotFired { shooter: EntityId, weapon: WeaponKind, pellets: usize },
    Reloaded(WeaponKind),
    Hit(Hit),
    NpcKilled(EntityId),
    NpcSpawned(EntityId),
    NpcDespawned(EntityId),
    VehicleImpact { vehicle: EntityId, damage: f32 },
    VehicleDestroyed(EntityId),
    EnteredVehicle(EntityId),
    ExitedVehicle(EntityId),
    PickupCollected(Pickup),
    PlayerDied,
}

/// Numbers a HUD shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HudSnapshot {
    pub health: f32,
    pub max_health: f32,
    pub weapon: WeaponKind,
    pub ammo: u32,
    pub reserve: u32,
    pub reloading: bool,
    pub score: u64,
    /// Health of the vehicle being driven
    pub vehicle_health: Option<f32>,
    pub npcs: usize,
    pub phase: GamePhase,
    pub time: f32,
}

/// Complete simulation state
pub struct GameState {
    pub config: SimConfig,
    /// Run seed for reproducibility
    pub seed: u64,
    pub(crate) rng: Pcg32,
    /// Simulation clock (seconds)
    pub time: f32,
    pub time_ticks: u64,
    pub phase: GamePhase,
    /// NPC kills
    pub score: u64,
    pub alloc: EntityAllocator,
    pub registry: CollisionRegistry,
    pub geometry: StaticGeometry,
    pub player: Player,
    /// Vehicles in spawn order
    pub vehicles: Vec<Vehicle>,
    pub npcs: NpcManager,
    pub projectiles: ProjectilePool,
    pub pickups: PickupField,
    /// Events from the most recent tick
    pub events: Vec<GameEvent>,
    shot_queue: Rc<RefCell<Vec<ShotRequest>>>,
    spawn_timer: f32,
}

impl GameState {
    /// Create a world with the player at the origin
    pub fn new(seed: u64, config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut alloc = EntityAllocator::new();
        let mut registry = CollisionRegistry::new();
        let player = Player::new(alloc.allocate(), Vec2::ZERO, &config.player);
        registry.register(player.id, player.collider());

        // Every NPC reports its shots into a queue drained at the start of the next tick
        let shot_queue: Rc<RefCell<Vec<ShotRequest>>> = Rc::default();
        let mut npcs = NpcManager::new();
        let queue = Rc::clone(&shot_queue);
        npcs.add_spawn_handler(Box::new(move |npc: &mut Npc| {
            let queue = Rc::clone(&queue);
            npc.set_shoot_handler(Box::new(move |shot: &ShotRequest| {
                queue.borrow_mut().push(*shot)
            }));
        }));

        log::info!("New world, seed {seed}");
        Ok(Self {
            config,
            seed,
            rng: Pcg32::seed_from_u64(seed),
            time: 0.0,
            time_ticks: 0,
            phase: GamePhase::Playing,
            score: 0,
            alloc,
            registry,
            geometry: StaticGeometry::new(),
            player,
            vehicles: Vec::new(),
            npcs,
            projectiles: ProjectilePool::new(),
            pickups: PickupField::new(),
            events: Vec::new(),
            shot_queue,
            spawn_timer: 0.0,
        })
    }

    /// Observe every NPC spawned from now on
    pub fn add_npc_spawn_handler(&mut self, handler: Box<dyn SpawnHandler>) {
        self.npcs.add_spawn_handler(handler);
    }

    /// Add an axis-aligned solid block
    pub fn add_solid(&mut self, min: Vec2, size: Vec2) -> EntityId {
        self.geometry
            .add_solid(&mut self.alloc, &mut self.registry, min, size)
    }

    /// Place a vehicle, or `None` if the spot overlaps anything but the player
    pub fn spawn_vehicle(&mut self, position: Vec2, heading: f32) -> Option<EntityId> {
        let footprint = Collider::circle(position, self.config.vehicle.radius);
        let player = self.player.id;
        let blocked = self.geometry.is_position_inside_solid(position)
            || self
                .registry
                .query_collider(&footprint)
                .into_iter()
                .any(|other| other != player);
        if blocked {
            log::warn!("Vehicle spawn at {position} rejected: spot is occupied");
            return None;
        }

        let id = self.alloc.allocate();
        let vehicle = Vehicle::new(id, position, heading, &self.config.vehicle);
        self.registry.register(id, vehicle.collider());
        self.vehicles.push(vehicle);
        log::debug!("Spawned vehicle {id}");
        Some(id)
    }

    /// Spawn an NPC with a random patrol route around `position`
    pub fn spawn_npc(&mut self, position: Vec2) -> EntityId {
        let tuning = &self.config.npc;
        let route = patrol_route(
            position,
            tuning.patrol_radius,
            tuning.patrol_waypoints,
            &mut self.rng,
        );
        self.spawn_npc_with_route(position, route)
    }

    pub fn spawn_npc_with_route(&mut self, position: Vec2, route: Vec<Vec2>) -> EntityId {
        let id = self.npcs.spawn(
            &mut self.alloc,
            &mut self.registry,
            position,
            route,
            &self.config.npc,
        );
        self.events.push(GameEvent::NpcSpawned(id));
        id
    }

    pub fn despawn_npc(&mut self, id: EntityId) -> bool {
        let removed = self.npcs.despawn(&mut self.alloc, &mut self.registry, id);
        if removed {
            self.events.push(GameEvent::NpcDespawned(id));
        }
        removed
    }

    pub fn spawn_pickup(&mut self, position: Vec2, kind: PickupKind) -> u32 {
        self.pickups.spawn(position, kind)
    }

    /// Remove pickups lying within `radius` of `position`
    pub fn despawn_pickups_near(&mut self, position: Vec2, radius: f32) -> usize {
        self.pickups.remove_near(position, radius)
    }

    pub fn vehicle(&self, id: EntityId) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.id == id)
    }

    pub fn vehicle_mut(&mut self, id: EntityId) -> Option<&mut Vehicle> {
        self.vehicles.iter_mut().find(|v| v.id == id)
    }

    /// Nothing solid and no collider overlaps a circle at `position`
    pub fn is_spot_clear(&self, position: Vec2, radius: f32) -> bool {
        !self.geometry.is_position_inside_solid(position)
            && self
                .registry
                .query_collider(&Collider::circle(position, radius))
                .is_empty()
    }

    /// Climb into the nearest free vehicle within range
    pub fn enter_vehicle(&mut self) -> bool {
        if self.player.is_dead || self.player.is_driving() {
            return false;
        }
        let range = self.config.player.vehicle_enter_range;
        let from = self.player.position;
        let nearest = self
            .vehicles
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_dead && !v.is_occupied() && v.position.distance(from) <= range)
            .min_by(|(_, a), (_, b)| {
                a.position
                    .distance_squared(from)
                    .total_cmp(&b.position.distance_squared(from))
            })
            .map(|(idx, _)| idx);
        let Some(idx) = nearest else {
            return false;
        };

        let vehicle = &mut self.vehicles[idx];
        if !vehicle.enter(self.player.id) {
            return false;
        }
        self.player.vehicle = Some(vehicle.id);
        self.player.position = vehicle.position;
        self.registry.unregister(self.player.id);
        self.events.push(GameEvent::EnteredVehicle(vehicle.id));
        true
    }

    /// Step out beside the vehicle. Rejected when both sides are blocked.
    pub fn exit_vehicle(&mut self) -> bool {
        let Some(vehicle_id) = self.player.vehicle else {
            return false;
        };
        let Some(idx) = self.vehicles.iter().position(|v| v.id == vehicle_id) else {
            self.dismount_at(None, self.player.position);
            return true;
        };
        let spots = self.vehicles[idx].exit_positions(self.player.radius);
        let Some(spot) = spots
            .into_iter()
            .find(|spot| self.is_spot_clear(*spot, self.player.radius))
        else {
            log::debug!("Exit from vehicle {vehicle_id} blocked on both sides");
            return false;
        };
        self.dismount_at(Some(idx), spot);
        true
    }

    /// Force the driver out of a vehicle, even if every side is blocked
    fn eject(&mut self, idx: usize) {
        let vehicle = &self.vehicles[idx];
        let spot = vehicle
            .exit_positions(self.player.radius)
            .into_iter()
            .find(|spot| self.is_spot_clear(*spot, self.player.radius))
            .unwrap_or(vehicle.position);
        self.dismount_at(Some(idx), spot);
    }

    fn dismount_at(&mut self, vehicle_idx: Option<usize>, spot: Vec2) {
        if let Some(idx) = vehicle_idx {
            let vehicle = &mut self.vehicles[idx];
            vehicle.exit();
            self.events.push(GameEvent::ExitedVehicle(vehicle.id));
        }
        self.player.vehicle = None;
        self.player.position = spot;
        self.registry.register(self.player.id, self.player.collider());
    }

    /// Turn last tick's NPC shot requests into projectiles
    pub(crate) fn spawn_queued_shots(&mut self) -> usize {
        let shots = std::mem::take(&mut *self.shot_queue.borrow_mut());
        let tuning = &self.config.npc;
        for shot in &shots {
            self.projectiles.spawn(ProjectileSpawn {
                owner: shot.shooter,
                faction: Faction::Npc,
                origin: shot.position,
                direction: shot.direction,
                speed: tuning.projectile_speed,
                damage: tuning.projectile_damage,
                range: tuning.projectile_range,
                radius: tuning.projectile_radius,
            });
        }
        shots.len()
    }

    /// Remove dead entities and their colliders. Dead vehicles eject their driver first.
    pub(crate) fn prune_dead(&mut self) {
        let wrecks: Vec<usize> = (0..self.vehicles.len())
            .filter(|&i| self.vehicles[i].is_dead && self.vehicles[i].is_occupied())
            .collect();
        for idx in wrecks {
            self.eject(idx);
        }

        let (alloc, registry) = (&mut self.alloc, &mut self.registry);
        self.vehicles.retain(|v| {
            if v.is_dead {
                registry.unregister(v.id);
                alloc.free(v.id);
                false
            } else {
                true
            }
        });

        self.npcs.prune_dead(&mut self.alloc, &mut self.registry);
        self.projectiles.prune();
    }

    /// Despawn distant NPCs and spawn new ones on the ring around the player
    pub(crate) fn update_population(&mut self, dt: f32) {
        let center = self.player.position;
        let spawn = self.config.spawn.clone();

        let distant: Vec<EntityId> = self
            .npcs
            .iter()
            .filter(|npc| npc.position.distance(center) > spawn.despawn_distance)
            .map(|npc| npc.id)
            .collect();
        for id in distant {
            log::debug!("Despawning distant NPC {id}");
            self.despawn_npc(id);
        }

        if self.npcs.len() >= spawn.max_npcs {
            return;
        }
        self.spawn_timer += dt;
        if self.spawn_timer < spawn.spawn_interval {
            return;
        }
        self.spawn_timer = 0.0;

        let radius = self.config.npc.radius;
        for _ in 0..SPAWN_ATTEMPTS {
            let theta = self
                .rng
                .random_range(-std::f32::consts::PI..std::f32::consts::PI);
            let position = center + polar_to_cartesian(spawn.spawn_distance, theta);
            if self.is_spot_clear(position, radius) {
                self.spawn_npc(position);
                return;
            }
        }
        log::debug!("No clear spawn point found");
    }

    pub fn hud(&self) -> HudSnapshot {
        let weapon = self.player.weapon();
        HudSnapshot {
            health: self.player.health,
            max_health: self.player.max_health,
            weapon: weapon.kind,
            ammo: weapon.current_ammo,
            reserve: weapon.reserve_ammo,
            reloading: weapon.is_reloading(),
            score: self.score,
            vehicle_health: self
                .player
                .vehicle
                .and_then(|id| self.vehicle(id))
                .map(|v| v.health),
            npcs: self.npcs.len(),
            phase: self.phase,
            time: self.time,
        }
    }

    /// Emit one sprite per visible entity, back to front
    pub fn render(&self, projector: &dyn Projector, sink: &mut dyn RenderSink) {
        let scale = projector.scale();
        let disc = |kind, position: Vec2, radius: f32, rotation, health| SpriteView {
            kind,
            position: projector.world_to_screen(position),
            size: Vec2::splat(radius * 2.0 * scale),
            rotation,
            health,
        };

        for (_, solid) in self.geometry.iter() {
            let (min, max) = solid.bounds();
            sink.draw(&SpriteView {
                kind: SpriteKind::Solid,
                position: projector.world_to_screen(solid.position),
                size: (max - min) * scale,
                rotation: 0.0,
                health: None,
            });
        }
        for pickup in self.pickups.iter() {
            sink.draw(&disc(SpriteKind::Pickup, pickup.position, 6.0, 0.0, None));
        }
        for v in &self.vehicles {
            sink.draw(&disc(
                SpriteKind::Vehicle,
                v.position,
                v.radius,
                v.heading,
                Some(v.health / v.max_health),
            ));
        }
        for npc in self.npcs.iter() {
            sink.draw(&disc(
                SpriteKind::Npc,
                npc.position,
                npc.radius,
                npc.facing.y.atan2(npc.facing.x),
                Some(npc.health / npc.max_health),
            ));
        }
        if !self.player.is_driving() {
            let p = &self.player;
            sink.draw(&disc(
                SpriteKind::Player,
                p.position,
                p.radius,
                p.facing.y.atan2(p.facing.x),
                Some(p.health / p.max_health),
            ));
        }
        for bullet in self.projectiles.iter() {
            let v = bullet.velocity();
            sink.draw(&disc(
                SpriteKind::Projectile,
                bullet.position(),
                bullet.radius(),
                v.y.atan2(v.x),
                None,
            ));
        }
    }
}
