//! Weapons: fire-mode and reload state machines
//!
//! Invalid commands (fire while empty or reloading, reload while full or with
//! no reserve, switch to an unowned weapon) are ignored and report `false`.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::unit_from_angle;

/// Largest extra deviation (radians) at accuracy 0
pub const MAX_INACCURACY: f32 = 0.5;

/// Weapon types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponKind {
    Pistol,
    Shotgun,
    Rifle,
}

/// Trigger discipline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FireMode {
    /// One shot per trigger press
    Semi,
    /// Fires at the fire interval while the trigger is held
    FullAuto,
}

/// Static weapon stats
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponSpec {
    pub damage: f32,
    pub capacity: u32,
    /// Seconds between shots
    pub fire_interval: f32,
    /// Seconds to reload
    pub reload_time: f32,
    pub mode: FireMode,
    /// Projectiles per shot
    pub pellets: u32,
    /// Full spread cone (radians)
    pub spread: f32,
    /// 1.0 = no extra deviation
    pub accuracy: f32,
    pub projectile_speed: f32,
    pub range: f32,
    pub projectile_radius: f32,
    /// Reserve rounds granted on pickup
    pub starting_reserve: u32,
}

impl WeaponKind {
    pub fn spec(&self) -> WeaponSpec {
        match self {
            WeaponKind::Pistol => WeaponSpec {
                damage: 10.0,
                capacity: 10,
                fire_interval: 0.3,
                reload_time: 1.5,
                mode: FireMode::Semi,
                pellets: 1,
                spread: 0.0,
                accuracy: 1.0,
                projectile_speed: 800.0,
                range: 600.0,
                projectile_radius: 3.0,
                starting_reserve: 30,
            },
            WeaponKind::Shotgun => WeaponSpec {
                damage: 8.0,
                capacity: 6,
                fire_interval: 0.8,
                reload_time: 2.0,
                mode: FireMode::Semi,
                pellets: 6,
                spread: 30f32.to_radians(),
                accuracy: 0.9,
                projectile_speed: 700.0,
                range: 300.0,
                projectile_radius: 2.5,
                starting_reserve: 12,
            },
            WeaponKind::Rifle => WeaponSpec {
                damage: 12.0,
                capacity: 30,
                fire_interval: 0.1,
                reload_time: 2.2,
                mode: FireMode::FullAuto,
                pellets: 1,
                spread: 0.0,
                accuracy: 0.95,
                projectile_speed: 1000.0,
                range: 800.0,
                projectile_radius: 3.0,
                starting_reserve: 90,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WeaponKind::Pistol => "Pistol",
            WeaponKind::Shotgun => "Shotgun",
            WeaponKind::Rifle => "Rifle",
        }
    }
}

/// Reload state machine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReloadState {
    Idle,
    Reloading { started_at: f32 },
}

/// Trigger input for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Trigger {
    /// Pressed this tick (edge)
    pub pressed: bool,
    /// Currently held down
    pub held: bool,
}

impl Trigger {
    pub fn press() -> Self {
        Self {
            pressed: true,
            held: true,
        }
    }

    pub fn hold() -> Self {
        Self {
            pressed: false,
            held: true,
        }
    }
}

/// A weapon instance with its own ammo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weapon {
    pub kind: WeaponKind,
    pub spec: WeaponSpec,
    pub current_ammo: u32,
    pub reserve_ammo: u32,
    last_fire_time: Option<f32>,
    reload: ReloadState,
}

impl Weapon {
    /// Full magazine plus the kind's starting reserve
    pub fn new(kind: WeaponKind) -> Self {
        let spec = kind.spec();
        Self::with_ammo(kind, spec.capacity, spec.starting_reserve)
    }

    /// Magazine is clamped to capacity
    pub fn with_ammo(kind: WeaponKind, current: u32, reserve: u32) -> Self {
        let spec = kind.spec();
        Self {
            kind,
            spec,
            current_ammo: current.min(spec.capacity),
            reserve_ammo: reserve,
            last_fire_time: None,
            reload: ReloadState::Idle,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.spec.capacity
    }

    pub fn is_reloading(&self) -> bool {
        matches!(self.reload, ReloadState::Reloading { .. })
    }

    pub fn reload_state(&self) -> ReloadState {
        self.reload
    }

    pub fn is_full(&self) -> bool {
        self.current_ammo >= self.spec.capacity
    }

    /// Ammo loaded, not reloading, fire interval elapsed
    pub fn can_fire(&self, now: f32) -> bool {
        if self.current_ammo == 0 || self.is_reloading() {
            return false;
        }
        match self.last_fire_time {
            Some(last) => now - last >= self.spec.fire_interval,
            None => true,
        }
    }

    /// Spend one round and stamp the fire time
    pub fn fire(&mut self, now: f32) -> bool {
        if !self.can_fire(now) {
            return false;
        }
        self.current_ammo -= 1;
        self.last_fire_time = Some(now);
        true
    }

    /// Gate on fire mode, fire, and return one direction per pellet
    ///
    /// Semi-auto needs a fresh press; full-auto fires while held.
    pub fn try_fire<R: Rng>(
        &mut self,
        now: f32,
        trigger: Trigger,
        aim: Vec2,
        rng: &mut R,
    ) -> Option<Vec<Vec2>> {
        let triggered = match self.spec.mode {
            FireMode::Semi => trigger.pressed,
            FireMode::FullAuto => trigger.held || trigger.pressed,
        };
        if !triggered || !self.fire(now) {
            return None;
        }
        let aim = aim.try_normalize().unwrap_or(Vec2::X);
        Some(
            (0..self.spec.pellets)
                .map(|_| self.deviate(aim, rng))
                .collect(),
        )
    }

    fn deviate<R: Rng>(&self, aim: Vec2, rng: &mut R) -> Vec2 {
        let mut angle = aim.y.atan2(aim.x);
        let half_spread = self.spec.spread * 0.5;
        if half_spread > 0.0 {
            angle += rng.random_range(-half_spread..=half_spread);
        }
        if self.spec.accuracy < 1.0 {
            let max_dev = (1.0 - self.spec.accuracy) * MAX_INACCURACY;
            angle += rng.random_range(-max_dev..=max_dev);
        }
        unit_from_angle(angle)
    }

    /// Begin reloading. No-op while reloading, when full, or with no reserve.
    pub fn start_reload(&mut self, now: f32) -> bool {
        if self.is_reloading() || self.is_full() || self.reserve_ammo == 0 {
            return false;
        }
        self.reload = ReloadState::Reloading { started_at: now };
        true
    }

    /// Abort an in-progress reload without moving any ammo
    pub fn cancel_reload(&mut self) {
        self.reload = ReloadState::Idle;
    }

    /// Finish the reload once its duration has elapsed. Returns true on completion.
    pub fn update(&mut self, now: f32) -> bool {
        let ReloadState::Reloading { started_at } = self.reload else {
            return false;
        };
        if now - started_at < self.spec.reload_time {
            return false;
        }
        let moved = (self.spec.capacity - self.current_ammo).min(self.reserve_ammo);
        self.current_ammo += moved;
        self.reserve_ammo -= moved;
        self.reload = ReloadState::Idle;
        log::debug!(
            "{} reloaded: {}/{} (+{})",
            self.kind.as_str(),
            self.current_ammo,
            self.reserve_ammo,
            moved
        );
        true
    }

    pub fn add_reserve(&mut self, rounds: u32) {
        self.reserve_ammo = self.reserve_ammo.saturating_add(rounds);
    }
}

/// All weapons an entity has picked up; exactly one is current
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arsenal {
    weapons: Vec<Weapon>,
    current: usize,
}

impl Arsenal {
    /// An arsenal always holds at least its starting weapon
    pub fn new(starting: Weapon) -> Self {
        Self {
            weapons: vec![starting],
            current: 0,
        }
    }

    pub fn current(&self) -> &Weapon {
        &self.weapons[self.current]
    }

    pub fn current_mut(&mut self) -> &mut Weapon {
        &mut self.weapons[self.current]
    }

    pub fn get(&self, kind: WeaponKind) -> Option<&Weapon> {
        self.weapons.iter().find(|w| w.kind == kind)
    }

    /// Make `kind` current. Unowned kinds are ignored. Switching away cancels a reload.
    pub fn switch_to(&mut self, kind: WeaponKind) -> bool {
        let Some(idx) = self.weapons.iter().position(|w| w.kind == kind) else {
            return false;
        };
        if idx == self.current {
            return false;
        }
        self.weapons[self.current].cancel_reload();
        self.current = idx;
        true
    }

    /// Acquire a weapon. A duplicate adds one magazine to reserve instead.
    /// Returns true when the weapon is new (and becomes current).
    pub fn pick_up(&mut self, kind: WeaponKind) -> bool {
        if let Some(existing) = self.weapons.iter_mut().find(|w| w.kind == kind) {
            existing.add_reserve(existing.spec.capacity);
            return false;
        }
        self.weapons.push(Weapon::new(kind));
        let idx = self.weapons.len() - 1;
        self.weapons[self.current].cancel_reload();
        self.current = idx;
        true
    }

    /// Add reserve rounds to an owned weapon
    pub fn add_ammo(&mut self, kind: WeaponKind, rounds: u32) -> bool {
        match self.weapons.iter_mut().find(|w| w.kind == kind) {
            Some(weapon) => {
                weapon.add_reserve(rounds);
                true
            }
            None => false,
        }
    }
}
