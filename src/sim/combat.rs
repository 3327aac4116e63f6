//! Projectile hit resolution
//!
//! Every live projectile is tested against every eligible target in order; the
//! first overlap wins and consumes the projectile (no piercing). A target takes
//! at most one hit per pass: later projectiles overlapping it in the same pass
//! are left alive. Dead targets are skipped. Death is reported only on the
//! alive → dead transition, so score side effects fire once per kill.

use std::collections::HashSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::arena::EntityId;
use super::projectile::Projectile;

/// Side an entity or projectile fights for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    Player,
    Npc,
    /// Vehicles: anyone may shoot them
    Neutral,
}

impl Faction {
    /// Can a projectile of this faction damage a target of `target`'s faction
    pub fn opposes(&self, target: Faction) -> bool {
        matches!(
            (self, target),
            (_, Faction::Neutral) | (Faction::Player, Faction::Npc) | (Faction::Npc, Faction::Player)
        )
    }
}

/// Kinds of damageable entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    Player,
    Npc,
    Vehicle,
}

/// Anything with a position that can be hit and killed
pub trait Targetable {
    fn id(&self) -> EntityId;
    fn kind(&self) -> TargetKind;
    fn faction(&self) -> Faction;
    fn position(&self) -> Vec2;
    fn radius(&self) -> f32;
    fn is_dead(&self) -> bool;
    /// Apply damage from an attacker at `source`. Returns true on the alive → dead transition.
    fn take_damage(&mut self, amount: f32, source: Vec2) -> bool;
}

/// Shooter/target pairs that must never hit each other this tick
///
/// A shooter never hits itself. Callers add the vehicle a shooter is driving.
#[derive(Debug, Clone, Default)]
pub struct HitExclusions {
    pairs: HashSet<(EntityId, EntityId)>,
}

impl HitExclusions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclude(&mut self, shooter: EntityId, target: EntityId) {
        self.pairs.insert((shooter, target));
    }

    pub fn is_excluded(&self, shooter: EntityId, target: EntityId) -> bool {
        shooter == target || self.pairs.contains(&(shooter, target))
    }
}

/// One resolved hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub projectile: u32,
    pub owner: EntityId,
    pub target: EntityId,
    pub kind: TargetKind,
    pub damage: f32,
    /// This hit killed the target
    pub killed: bool,
}

/// Bullet overlaps target iff center distance < bullet radius + target radius
#[inline]
pub fn projectile_hits(projectile: &Projectile, target: &dyn Targetable) -> bool {
    projectile.position().distance(target.position()) < projectile.radius() + target.radius()
}

/// Resolve hits for one tick against post-movement positions
///
/// `attacker_position` locates a projectile's owner so damaged NPCs can turn
/// on them; unknown owners fall back to the projectile's own position.
pub fn resolve_hits(
    projectiles: &mut [Projectile],
    targets: &mut [&mut dyn Targetable],
    exclusions: &HitExclusions,
    attacker_position: impl Fn(EntityId) -> Option<Vec2>,
) -> Vec<Hit> {
    let mut hits = Vec::new();
    let mut struck_this_pass: HashSet<EntityId> = HashSet::new();

    for projectile in projectiles.iter_mut() {
        if !projectile.is_alive() {
            continue;
        }
        let owner = projectile.owner();
        let bullet: &Projectile = projectile;

        let struck = targets.iter_mut().find(|t| {
            !t.is_dead()
                && !struck_this_pass.contains(&t.id())
                && bullet.faction().opposes(t.faction())
                && !exclusions.is_excluded(owner, t.id())
                && projectile_hits(bullet, &***t)
        });

        if let Some(target) = struck {
            let source = attacker_position(owner).unwrap_or(projectile.position());
            let killed = target.take_damage(projectile.damage(), source);
            struck_this_pass.insert(target.id());
            projectile.destroy();
            log::debug!(
                "Projectile {} from {} hit {} for {}{}",
                projectile.id(),
                owner,
                target.id(),
                projectile.damage(),
                if killed { " (killed)" } else { "" }
            );
            hits.push(Hit {
                projectile: projectile.id(),
                owner,
                target: target.id(),
                kind: target.kind(),
                damage: projectile.damage(),
                killed,
            });
        }
    }

    hits
}

/// Closest living target to `from`
pub fn nearest_living<'a>(from: Vec2, targets: &[&'a dyn Targetable]) -> Option<&'a dyn Targetable> {
    targets
        .iter()
        .copied()
        .filter(|t| !t.is_dead())
        .min_by(|a, b| {
            from.distance_squared(a.position())
                .partial_cmp(&from.distance_squared(b.position()))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}
