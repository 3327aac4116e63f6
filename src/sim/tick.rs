//! Fixed timestep simulation tick
//!
//! Phases run in a fixed order every tick:
//! 1. queued NPC shots become projectiles
//! 2. player commands (weapons, vehicle enter/exit, walking, shooting)
//! 3. vehicles
//! 4. NPC movement
//! 5. projectile movement
//! 6. hit resolution against post-movement positions
//! 7. pickups
//! 8. NPC perception and decisions
//! 9. removal of the dead, NPC population upkeep

use std::collections::HashMap;

use glam::Vec2;

use super::arena::EntityId;
use super::combat::{HitExclusions, TargetKind, Targetable, nearest_living, resolve_hits};
use super::state::{GameEvent, GamePhase, GameState};
use super::vehicle::DriveInput;
use super::weapon::{Trigger, WeaponKind};

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Movement intent, each axis in [-1, 1], +Y down
    pub move_intent: Vec2,
    /// World-space aim point
    pub aim: Option<Vec2>,
    pub fire: Trigger,
    pub reload: bool,
    /// Enter or leave a vehicle
    pub interact: bool,
    pub switch_to: Option<WeaponKind>,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    if state.phase == GamePhase::GameOver {
        return;
    }
    state.events.clear();
    let now = state.time;

    state.spawn_queued_shots();
    update_player(state, input, now, dt);
    update_vehicles(state, input, dt);

    for npc in state.npcs.iter_mut() {
        npc.apply_movement(&mut state.registry, dt);
    }

    state.projectiles.update(dt, &state.geometry);
    resolve_combat(state);

    let radius = state.config.player.pickup_radius;
    for pickup in state.pickups.collect(&mut state.player, radius) {
        log::debug!("Collected {:?}", pickup.kind);
        state.events.push(GameEvent::PickupCollected(pickup));
    }

    update_npcs(state, now, dt);

    state.prune_dead();
    state.update_population(dt);

    if state.player.is_dead {
        state.phase = GamePhase::GameOver;
        log::info!("Game over: score {}", state.score);
    }

    state.time += dt;
    state.time_ticks += 1;
}

fn update_player(state: &mut GameState, input: &TickInput, now: f32, dt: f32) {
    if state.player.is_dead {
        return;
    }

    if let Some(kind) = input.switch_to {
        state.player.switch_weapon(kind);
    }
    if input.reload {
        state.player.reload(now);
    }
    if state.player.update_weapon(now) {
        let kind = state.player.weapon().kind;
        state.events.push(GameEvent::Reloaded(kind));
    }

    if input.interact {
        if state.player.is_driving() {
            state.exit_vehicle();
        } else {
            state.enter_vehicle();
        }
    }

    if !state.player.is_driving() {
        state
            .player
            .walk(&mut state.registry, input.move_intent, dt);
    }
    if let Some(aim) = input.aim {
        state.player.aim_at(aim);
    }

    let spawns = state.player.shoot(now, input.fire, &mut state.rng);
    if !spawns.is_empty() {
        state.events.push(GameEvent::ShotFired {
            shooter: state.player.id,
            weapon: state.player.weapon().kind,
            pellets: spawns.len(),
        });
    }
    for spawn in spawns {
        state.projectiles.spawn(spawn);
    }
}

fn update_vehicles(state: &mut GameState, input: &TickInput, dt: f32) {
    let driver = state.player.id;
    for vehicle in &mut state.vehicles {
        let drive = if vehicle.occupant == Some(driver) {
            DriveInput {
                throttle: -input.move_intent.y,
                steer: input.move_intent.x,
            }
        } else {
            DriveInput::default()
        };
        let Some(impact) = vehicle.step(&mut state.registry, drive, &state.config.vehicle, dt) else {
            continue;
        };
        if impact.damage > 0.0 {
            state.events.push(GameEvent::VehicleImpact {
                vehicle: vehicle.id,
                damage: impact.damage,
            });
        }
        if impact.destroyed {
            state.events.push(GameEvent::VehicleDestroyed(vehicle.id));
        }
    }

    // The driver rides along
    if let Some(id) = state.player.vehicle {
        if let Some(vehicle) = state.vehicles.iter().find(|v| v.id == id) {
            state.player.position = vehicle.position;
        }
    }
}

fn resolve_combat(state: &mut GameState) {
    let mut exclusions = HitExclusions::new();
    if let Some(vehicle) = state.player.vehicle {
        exclusions.exclude(state.player.id, vehicle);
    }

    let positions: HashMap<EntityId, Vec2> = std::iter::once((state.player.id, state.player.position))
        .chain(state.npcs.iter().map(|npc| (npc.id, npc.position)))
        .collect();

    let hits = {
        let mut targets: Vec<&mut dyn Targetable> = Vec::new();
        // A driver is shielded by the vehicle
        if !state.player.is_driving() {
            targets.push(&mut state.player);
        }
        for npc in state.npcs.iter_mut() {
            targets.push(npc);
        }
        for vehicle in state.vehicles.iter_mut() {
            targets.push(vehicle);
        }
        resolve_hits(
            state.projectiles.as_mut_slice(),
            &mut targets,
            &exclusions,
            |id| positions.get(&id).copied(),
        )
    };

    for hit in hits {
        state.events.push(GameEvent::Hit(hit));
        if !hit.killed {
            continue;
        }
        match hit.kind {
            TargetKind::Npc => {
                state.score += 1;
                state.events.push(GameEvent::NpcKilled(hit.target));
            }
            TargetKind::Vehicle => state.events.push(GameEvent::VehicleDestroyed(hit.target)),
            TargetKind::Player => state.events.push(GameEvent::PlayerDied),
        }
    }
}

fn update_npcs(state: &mut GameState, now: f32, dt: f32) {
    // NPCs hunt the player, or the vehicle they are driving
    let mut hostiles: Vec<&dyn Targetable> = Vec::new();
    match state.player.vehicle {
        Some(id) => hostiles.extend(
            state
                .vehicles
                .iter()
                .filter(|v| v.id == id)
                .map(|v| v as &dyn Targetable),
        ),
        None => hostiles.push(&state.player),
    }
    for npc in state.npcs.iter_mut() {
        let target = nearest_living(npc.position, &hostiles);
        npc.think(target, now, dt, &state.config.npc);
    }
}
