//! End-to-end scenarios driven through `tick`

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use mayhem_sim::SimConfig;
use mayhem_sim::consts::SIM_DT;
use mayhem_sim::sim::{
    Faction, GameEvent, GameState, MoveOutcome, Npc, NpcState, ProjectileSpawn, TargetKind,
    TickInput, Trigger, WeaponKind, tick,
};
use mayhem_sim::unit_from_angle;

fn quiet_world() -> GameState {
    let mut config = SimConfig::default();
    config.spawn.max_npcs = 0;
    GameState::new(1234, config).unwrap()
}

fn idle() -> TickInput {
    TickInput::default()
}

#[test]
fn pistol_clears_magazine_and_kills_one_npc() {
    let mut state = quiet_world();
    let npc = state.spawn_npc_with_route(Vec2::new(100.0, 0.0), Vec::new());

    let mut npc_hits = 0;
    let mut kills = 0;
    let mut ticks = 0;
    while state.player.weapon().current_ammo > 0 && ticks < 1200 {
        let aim = state
            .npcs
            .get(npc)
            .map(|n| n.position)
            .unwrap_or(Vec2::new(1000.0, 0.0));
        let input = TickInput {
            aim: Some(aim),
            fire: Trigger::press(),
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT);
        for event in &state.events {
            match event {
                GameEvent::Hit(hit) if hit.kind == TargetKind::Npc => npc_hits += 1,
                GameEvent::NpcKilled(_) => kills += 1,
                _ => {}
            }
        }
        ticks += 1;
    }
    // Let the last bullets finish
    for _ in 0..60 {
        tick(&mut state, &idle(), SIM_DT);
        for event in &state.events {
            match event {
                GameEvent::Hit(hit) if hit.kind == TargetKind::Npc => npc_hits += 1,
                GameEvent::NpcKilled(_) => kills += 1,
                _ => {}
            }
        }
    }

    assert_eq!(state.player.weapon().current_ammo, 0);
    assert_eq!(npc_hits, 5);
    assert_eq!(kills, 1);
    assert_eq!(state.score, 1);
    assert!(state.npcs.get(npc).is_none());
    assert!(!state.registry.contains(npc));
}

#[test]
fn vehicle_bounces_off_wall_head_on() {
    let mut config = SimConfig::default();
    config.spawn.max_npcs = 0;
    config.vehicle.friction = 1.0;
    let mut state = GameState::new(1, config).unwrap();

    let car = state.spawn_vehicle(Vec2::new(0.0, 300.0), 0.0).unwrap();
    state.add_solid(Vec2::new(21.0, 250.0), Vec2::new(20.0, 100.0));
    state.vehicle_mut(car).unwrap().velocity = Vec2::new(100.0, 0.0);

    tick(&mut state, &idle(), SIM_DT);

    let vehicle = state.vehicle(car).unwrap();
    assert!((vehicle.velocity - Vec2::new(-60.0, 0.0)).length() < 1e-3);
    assert_eq!(vehicle.position, Vec2::new(0.0, 300.0));
    assert_eq!(vehicle.health, 97.0);
    assert_eq!(vehicle.last_collision_normal, Some(Vec2::NEG_X));
    assert!(state.events.iter().any(|e| matches!(
        e,
        GameEvent::VehicleImpact { vehicle, damage } if *vehicle == car && *damage == 3.0
    )));
}

#[test]
fn vision_cone_boundary_decides_chase() {
    // Player sits at the origin, straight "behind" the NPC's +X axis
    for (offset_deg, expect_chase) in [(59.0f32, true), (61.0, false)] {
        let mut state = quiet_world();
        let npc = state.spawn_npc_with_route(Vec2::new(200.0, 0.0), Vec::new());
        {
            let n = state.npcs.get_mut(npc).unwrap();
            n.state = NpcState::Patrol;
            n.facing = unit_from_angle(std::f32::consts::PI - offset_deg.to_radians());
        }
        tick(&mut state, &idle(), SIM_DT);
        let chasing = matches!(state.npcs.get(npc).unwrap().state, NpcState::Chase { .. });
        assert_eq!(chasing, expect_chase, "offset {offset_deg}°");
    }
}

#[test]
fn two_bullets_same_tick_hit_once() {
    let mut state = quiet_world();
    let car = state.spawn_vehicle(Vec2::new(200.0, 0.0), 0.0).unwrap();
    let npc = state.spawn_npc_with_route(Vec2::new(-300.0, 0.0), Vec::new());

    for (owner, faction) in [(state.player.id, Faction::Player), (npc, Faction::Npc)] {
        state.projectiles.spawn(ProjectileSpawn {
            owner,
            faction,
            origin: Vec2::new(195.0, 0.0),
            direction: Vec2::X,
            speed: 0.0,
            damage: 10.0,
            range: 100.0,
            radius: 3.0,
        });
    }
    tick(&mut state, &idle(), SIM_DT);

    let hits: Vec<_> = state
        .events
        .iter()
        .filter_map(|e| match e {
            GameEvent::Hit(hit) => Some(*hit),
            _ => None,
        })
        .collect();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].owner, state.player.id);
    assert_eq!(state.vehicle(car).unwrap().health, 90.0);
    // The second bullet is still in flight
    assert_eq!(state.projectiles.len(), 1);
}

#[test]
fn killing_blow_scores_once() {
    let mut state = quiet_world();
    let npc = state.spawn_npc_with_route(Vec2::new(200.0, 0.0), Vec::new());
    state.npcs.get_mut(npc).unwrap().health = 10.0;

    for origin in [Vec2::new(195.0, 0.0), Vec2::new(205.0, 0.0)] {
        state.projectiles.spawn(ProjectileSpawn {
            owner: state.player.id,
            faction: Faction::Player,
            origin,
            direction: Vec2::X,
            speed: 0.0,
            damage: 10.0,
            range: 100.0,
            radius: 3.0,
        });
    }
    tick(&mut state, &idle(), SIM_DT);
    tick(&mut state, &idle(), SIM_DT);

    assert_eq!(state.score, 1);
    assert!(state.npcs.get(npc).is_none());
    assert!(!state.registry.contains(npc));
}

#[test]
fn reload_refills_from_reserve() {
    let mut state = quiet_world();
    let fire = TickInput {
        fire: Trigger::press(),
        aim: Some(Vec2::new(0.0, -100.0)),
        ..Default::default()
    };
    let mut fired = 0;
    while fired < 3 {
        tick(&mut state, &fire, SIM_DT);
        fired += state
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::ShotFired { .. }))
            .count();
    }
    assert_eq!(state.player.weapon().current_ammo, 7);

    let reload = TickInput {
        reload: true,
        ..Default::default()
    };
    tick(&mut state, &reload, SIM_DT);
    assert!(state.hud().reloading);

    let mut reloaded = false;
    for _ in 0..120 {
        tick(&mut state, &idle(), SIM_DT);
        reloaded |= state
            .events
            .contains(&GameEvent::Reloaded(WeaponKind::Pistol));
    }
    assert!(reloaded);
    let hud = state.hud();
    assert_eq!(hud.ammo, 10);
    assert_eq!(hud.reserve, 27);
    assert!(!hud.reloading);
}

#[test]
fn player_slides_along_wall() {
    let mut state = quiet_world();
    state.add_solid(Vec2::new(30.0, -500.0), Vec2::new(30.0, 1000.0));
    let input = TickInput {
        move_intent: Vec2::new(1.0, 1.0),
        ..Default::default()
    };
    for _ in 0..60 {
        tick(&mut state, &input, SIM_DT);
    }
    assert!(state.player.position.x <= 18.0);
    assert!(state.player.position.x > 10.0);
    assert!(state.player.position.y > 100.0);
}

#[test]
fn driver_cannot_shoot_own_vehicle() {
    let mut state = quiet_world();
    let car = state.spawn_vehicle(Vec2::new(30.0, 0.0), 0.0).unwrap();
    assert!(state.enter_vehicle());

    let input = TickInput {
        fire: Trigger::press(),
        aim: Some(Vec2::new(500.0, 0.0)),
        ..Default::default()
    };
    tick(&mut state, &input, SIM_DT);

    assert_eq!(state.vehicle(car).unwrap().health, 100.0);
    assert_eq!(state.projectiles.len(), 1);
}

#[test]
fn spawn_observer_sees_every_npc() {
    let mut state = quiet_world();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    state.add_npc_spawn_handler(Box::new(move |npc: &mut Npc| log.borrow_mut().push(npc.id)));

    let a = state.spawn_npc(Vec2::new(100.0, 100.0));
    let b = state.spawn_npc(Vec2::new(-100.0, 100.0));
    assert_eq!(*seen.borrow(), vec![a, b]);
}

#[test]
fn walking_into_wall_reports_blocked() {
    let mut state = quiet_world();
    state.add_solid(Vec2::new(13.0, -50.0), Vec2::new(20.0, 100.0));
    let result = state
        .player
        .walk(&mut state.registry, Vec2::X, SIM_DT);
    assert_eq!(result.outcome, MoveOutcome::Blocked);
    assert_eq!(state.player.position, Vec2::ZERO);
}
