//! Mayhem headless runner
//!
//! Runs a scripted session against the simulation and prints the HUD as JSON
//! once per simulated second. Usage: `mayhem-sim [config.json] [seed]`

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use glam::Vec2;
    use mayhem_sim::SimConfig;
    use mayhem_sim::consts::*;
    use mayhem_sim::sim::{GamePhase, GameState, PickupKind, TickInput, Trigger, WeaponKind, tick};

    env_logger::init();
    log::info!("Mayhem (headless) starting...");

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => {
            let loaded = std::fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|json| SimConfig::from_json(&json).map_err(|e| e.to_string()));
            match loaded {
                Ok(config) => config,
                Err(e) => {
                    log::error!("Failed to load {path}: {e}");
                    std::process::exit(1);
                }
            }
        }
        None => SimConfig::default(),
    };
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(0xC0FFEE);

    let mut state = match GameState::new(seed, config) {
        Ok(state) => state,
        Err(e) => {
            log::error!("Invalid config: {e}");
            std::process::exit(1);
        }
    };

    // A small block of scenery, a car and some loot
    state.add_solid(Vec2::new(150.0, -40.0), Vec2::new(40.0, 80.0));
    state.spawn_vehicle(Vec2::new(-45.0, 0.0), 0.0);
    state.spawn_pickup(Vec2::new(0.0, 60.0), PickupKind::Weapon(WeaponKind::Shotgun));
    state.spawn_pickup(Vec2::new(0.0, 90.0), PickupKind::Health(25.0));

    // Fixed-step loop driven by a fake 144 Hz frame clock
    let frame_dt = 1.0 / 144.0;
    let mut accumulator = 0.0;
    let mut next_report = 1.0;
    let mut frame = 0u32;

    while state.time < 20.0 && state.phase == GamePhase::Playing {
        accumulator += frame_dt;
        let mut substeps = 0;
        while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = scripted_input(state.time, frame);
            tick(&mut state, &input, SIM_DT);
            accumulator -= SIM_DT;
            substeps += 1;
        }
        frame += 1;

        if state.time >= next_report {
            next_report += 1.0;
            match serde_json::to_string(&state.hud()) {
                Ok(json) => println!("{json}"),
                Err(e) => log::warn!("Failed to serialize HUD: {e}"),
            }
        }
    }

    log::info!(
        "Session over after {:.1}s: score {}, {:?}",
        state.time,
        state.score,
        state.phase
    );

    /// Walk over the pickups and back, shoot at whatever is ahead, then take the car for a spin
    fn scripted_input(time: f32, frame: u32) -> TickInput {
        let mut input = TickInput {
            aim: Some(Vec2::new(1000.0, 0.0)),
            ..Default::default()
        };
        if time < 0.6 {
            input.move_intent = Vec2::Y;
        } else if time < 1.2 {
            input.move_intent = Vec2::NEG_Y;
        } else if time < 8.0 {
            input.fire = if frame % 20 == 0 {
                Trigger::press()
            } else {
                Trigger::default()
            };
        } else if time < 8.0 + SIM_DT {
            input.interact = true;
        } else {
            input.move_intent = Vec2::new(0.3, -1.0);
        }
        input
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The simulation is a library on the web; there is no headless runner
}
