//! World pickups collected by walking over them

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::player::Player;
use super::weapon::WeaponKind;

/// What a pickup grants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PickupKind {
    /// New weapon, or one magazine of reserve if already owned
    Weapon(WeaponKind),
    /// Reserve rounds for an owned weapon
    Ammo(WeaponKind, u32),
    /// Health, clamped to max
    Health(f32),
}

/// A pickup lying in the world
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pickup {
    pub id: u32,
    pub position: Vec2,
    pub kind: PickupKind,
}

impl Pickup {
    /// Grant this pickup to the player. Returns false if it does not apply
    /// (ammo for a weapon the player does not own), leaving it in the world.
    pub fn apply(&self, player: &mut Player) -> bool {
        match self.kind {
            PickupKind::Weapon(kind) => {
                player.arsenal.pick_up(kind);
                true
            }
            PickupKind::Ammo(kind, rounds) => player.arsenal.add_ammo(kind, rounds),
            PickupKind::Health(amount) => {
                player.heal(amount);
                true
            }
        }
    }
}

/// All pickups in the world, in spawn order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PickupField {
    pickups: Vec<Pickup>,
    next_id: u32,
}

impl PickupField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, position: Vec2, kind: PickupKind) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.pickups.push(Pickup { id, position, kind });
        id
    }

    /// Remove every pickup within `radius` of `position`
    pub fn remove_near(&mut self, position: Vec2, radius: f32) -> usize {
        let before = self.pickups.len();
        self.pickups.retain(|p| p.position.distance(position) > radius);
        before - self.pickups.len()
    }

    /// Hand the player every applicable pickup within `radius` of them
    pub fn collect(&mut self, player: &mut Player, radius: f32) -> Vec<Pickup> {
        if player.is_dead || player.is_driving() {
            return Vec::new();
        }
        let mut collected = Vec::new();
        self.pickups.retain(|p| {
            if p.position.distance(player.position) <= radius && p.apply(player) {
                collected.push(*p);
                false
            } else {
                true
            }
        });
        collected
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pickup> {
        self.pickups.iter()
    }

    pub fn len(&self) -> usize {
        self.pickups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pickups.is_empty()
    }
}
