//! Vehicle physics: acceleration, friction and bounce
//!
//! Vehicles do not stop dead like walkers. When one axis is free the vehicle
//! slides along it and the blocked axis velocity is reflected and damped by the
//! restitution coefficient. When both are blocked the velocity is reflected
//! about the true contact normal:
//!
//! v' = v - (1 + e)(v·n)n, only when v·n < 0
//!
//! Hard impacts above a speed threshold damage the vehicle.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::arena::EntityId;
use super::collision::{Collider, CollisionRegistry};
use super::combat::{Faction, TargetKind, Targetable};
use super::movement::MoveOutcome;
use crate::config::VehicleTuning;
use crate::{normalize_angle, unit_from_angle};

/// Driver controls for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriveInput {
    /// Forward (+1) / reverse (-1)
    pub throttle: f32,
    /// Left (-1) / right (+1)
    pub steer: f32,
}

/// Report for a tick in which the vehicle hit something
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impact {
    pub outcome: MoveOutcome,
    /// Speed before the collision response
    pub speed: f32,
    /// Contact normal, only for fully blocked impacts
    pub normal: Option<Vec2>,
    /// Damage applied to the vehicle (0 below the threshold)
    pub damage: f32,
    /// This impact killed the vehicle
    pub destroyed: bool,
}

/// A drivable vehicle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: EntityId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
    pub health: f32,
    pub max_health: f32,
    pub is_dead: bool,
    /// Radians, 0 = +X
    pub heading: f32,
    pub restitution: f32,
    pub occupant: Option<EntityId>,
    /// Last contact normal (informational)
    pub last_collision_normal: Option<Vec2>,
}

impl Vehicle {
    pub fn new(id: EntityId, position: Vec2, heading: f32, tuning: &VehicleTuning) -> Self {
        Self {
            id,
            position,
            velocity: Vec2::ZERO,
            radius: tuning.radius,
            health: tuning.max_health,
            max_health: tuning.max_health,
            is_dead: false,
            heading: normalize_angle(heading),
            restitution: tuning.restitution,
            occupant: None,
            last_collision_normal: None,
        }
    }

    pub fn collider(&self) -> Collider {
        Collider::circle(self.position, self.radius)
    }

    /// Unit vector along the heading
    pub fn forward(&self) -> Vec2 {
        unit_from_angle(self.heading)
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    pub fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }

    /// Apply damage, clamped at zero. Returns true on the alive → dead transition.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if self.is_dead {
            return false;
        }
        self.health = (self.health - amount).max(0.0);
        if self.health <= 0.0 {
            self.is_dead = true;
            log::info!("Vehicle {} destroyed", self.id);
            return true;
        }
        false
    }

    /// Bind a driver. Rejected if occupied or wrecked.
    pub fn enter(&mut self, occupant: EntityId) -> bool {
        if self.is_dead || self.occupant.is_some() {
            return false;
        }
        self.occupant = Some(occupant);
        log::info!("{} entered vehicle {}", occupant, self.id);
        true
    }

    /// Unbind the driver and stop the vehicle
    pub fn exit(&mut self) -> Option<EntityId> {
        let occupant = self.occupant.take()?;
        self.velocity = Vec2::ZERO;
        log::info!("{} exited vehicle {}", occupant, self.id);
        Some(occupant)
    }

    /// Candidate drop-off points beside the vehicle, left side first
    pub fn exit_positions(&self, occupant_radius: f32) -> [Vec2; 2] {
        let side = self.forward().perp();
        let offset = self.radius + occupant_radius + 4.0;
        [self.position + side * offset, self.position - side * offset]
    }

    /// Advance one tick: friction, throttle, steering, then movement with bounce
    pub fn step(
        &mut self,
        registry: &mut CollisionRegistry,
        input: DriveInput,
        tuning: &VehicleTuning,
        dt: f32,
    ) -> Option<Impact> {
        if self.is_dead {
            return None;
        }

        self.velocity *= tuning.friction;

        let throttle = input.throttle.clamp(-1.0, 1.0);
        if throttle != 0.0 {
            self.velocity += self.forward() * throttle * tuning.acceleration * dt;
            self.velocity = self.velocity.clamp_length_max(tuning.max_speed);
        }

        let steer = input.steer.clamp(-1.0, 1.0);
        if steer != 0.0 && tuning.max_speed > 0.0 {
            let speed_ratio = (self.speed() / tuning.max_speed).min(1.0);
            let direction = if self.velocity.dot(self.forward()) < 0.0 { -1.0 } else { 1.0 };
            self.heading =
                normalize_angle(self.heading + steer * tuning.turn_rate * speed_ratio * direction * dt);
        }

        let displacement = self.velocity * dt;
        if displacement == Vec2::ZERO {
            return None;
        }
        if !registry.contains(self.id) {
            self.position += displacement;
            return None;
        }

        let from = self.position;
        let speed = self.speed();

        registry.update_position(self.id, from + displacement);
        if !registry.has_collisions(self.id) {
            self.position = from + displacement;
            return None;
        }

        let e = self.restitution;
        let mut normal = None;

        let id = self.id;
        let fits = |registry: &mut CollisionRegistry, position: Vec2| {
            registry.update_position(id, position);
            !registry.has_collisions(id)
        };
        let x_only = from + Vec2::new(displacement.x, 0.0);
        let y_only = from + Vec2::new(0.0, displacement.y);

        let outcome = if displacement.x != 0.0 && fits(registry, x_only) {
            self.position = x_only;
            self.velocity.y = -self.velocity.y * e;
            MoveOutcome::SlidX
        } else if displacement.y != 0.0 && fits(registry, y_only) {
            self.position = y_only;
            self.velocity.x = -self.velocity.x * e;
            MoveOutcome::SlidY
        } else {
            // Normal is measured at the tentative full position, from the obstacle toward us
            registry.update_position(self.id, from + displacement);
            normal = registry
                .get_collisions(self.id)
                .first()
                .and_then(|other| registry.collision_normal(*other, self.id));
            registry.update_position(self.id, from);
            self.position = from;

            self.velocity = bounce(self.velocity, normal, e);
            MoveOutcome::Blocked
        };
        registry.update_position(self.id, self.position);
        if normal.is_some() {
            self.last_collision_normal = normal;
        }

        let mut damage = 0.0;
        let mut destroyed = false;
        if speed > tuning.damage_speed_threshold {
            damage = (speed / tuning.damage_divisor).floor().max(1.0);
            destroyed = self.take_damage(damage);
        }
        log::debug!(
            "Vehicle {} impact {:?} at speed {:.1}, damage {}",
            self.id,
            outcome,
            speed,
            damage
        );

        Some(Impact {
            outcome,
            speed,
            normal,
            damage,
            destroyed,
        })
    }
}

/// Reflect `velocity` off a surface with restitution `e`.
///
/// Only velocity heading into the surface (`v·n < 0`) is reflected. Without a
/// normal the velocity is reversed and damped.
pub fn bounce(velocity: Vec2, normal: Option<Vec2>, e: f32) -> Vec2 {
    match normal {
        Some(n) => {
            let vn = velocity.dot(n);
            if vn < 0.0 {
                velocity - (1.0 + e) * vn * n
            } else {
                velocity
            }
        }
        None => -e * velocity,
    }
}

impl Targetable for Vehicle {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> TargetKind {
        TargetKind::Vehicle
    }

    fn faction(&self) -> Faction {
        Faction::Neutral
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
        Vehicle::take_damage(self, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::arena::EntityAllocator;

    fn tuning() -> VehicleTuning {
        VehicleTuning {
            friction: 1.0,
            ..VehicleTuning::default()
        }
    }

    fn setup(wall_min: Vec2, wall_size: Vec2) -> (CollisionRegistry, Vehicle) {
        let mut alloc = EntityAllocator::new();
        let mut reg = CollisionRegistry::new();
        let id = alloc.allocate();
        let wall = alloc.allocate();
        let vehicle = Vehicle::new(id, Vec2::ZERO, 0.0, &tuning());
        reg.register(id, vehicle.collider());
        reg.register(wall, Collider::rect_from_min(wall_min, wall_size.x, wall_size.y));
        (reg, vehicle)
    }

    #[test]
    fn test_friction_decays_speed() {
        let (mut reg, mut v) = setup(Vec2::new(1000.0, 0.0), Vec2::splat(10.0));
        let tuning = VehicleTuning::default();
        v.velocity = Vec2::new(100.0, 0.0);
        v.step(&mut reg, DriveInput::default(), &tuning, 1.0 / 60.0);
        assert!((v.velocity.x - 98.0).abs() < 1e-4);
    }

    #[test]
    fn test_throttle_clamped_to_max_speed() {
        let (mut reg, mut v) = setup(Vec2::new(10_000.0, 0.0), Vec2::splat(10.0));
        let tuning = tuning();
        for _ in 0..600 {
            v.step(&mut reg, DriveInput { throttle: 1.0, steer: 0.0 }, &tuning, 1.0 / 60.0);
        }
        assert!(v.speed() <= tuning.max_speed + 1e-3);
        assert!(v.speed() > tuning.max_speed * 0.99);
    }

    #[test]
    fn test_head_on_wall_reflects_and_damages() {
        // Wall face at x = 21; vehicle radius 20 moving +X at 100
        let (mut reg, mut v) = setup(Vec2::new(21.0, -100.0), Vec2::new(20.0, 200.0));
        v.velocity = Vec2::new(100.0, 0.0);
        let impact = v
            .step(&mut reg, DriveInput::default(), &tuning(), 1.0 / 60.0)
            .expect("should hit the wall");

        assert_eq!(impact.outcome, MoveOutcome::Blocked);
        assert_eq!(impact.normal, Some(Vec2::NEG_X));
        assert!((v.velocity.x - (-60.0)).abs() < 1e-3);
        assert!(v.velocity.y.abs() < 1e-6);
        assert_eq!(impact.damage, 3.0);
        assert_eq!(v.health, v.max_health - 3.0);
        assert_eq!(v.position, Vec2::ZERO);
        assert_eq!(v.last_collision_normal, Some(Vec2::NEG_X));
    }

    #[test]
    fn test_glancing_hit_reflects_blocked_axis_only() {
        // Floor below the vehicle; moving diagonally down-right
        let (mut reg, mut v) = setup(Vec2::new(-500.0, 20.5), Vec2::new(1000.0, 20.0));
        v.velocity = Vec2::new(60.0, 60.0);
        let impact = v
            .step(&mut reg, DriveInput::default(), &tuning(), 1.0 / 60.0)
            .expect("should graze the floor");

        assert_eq!(impact.outcome, MoveOutcome::SlidX);
        assert!((v.velocity.x - 60.0).abs() < 1e-4);
        assert!((v.velocity.y - (-36.0)).abs() < 1e-4);
        assert!(v.position.x > 0.0);
        assert_eq!(v.position.y, 0.0);
    }

    #[test]
    fn test_moving_away_from_overlap_is_not_reflected() {
        let (mut reg, mut v) = setup(Vec2::new(1000.0, 0.0), Vec2::splat(10.0));
        let post = EntityId::new(9, 0);
        reg.register(post, Collider::circle(Vec2::new(25.0, 0.0), 10.0));
        v.velocity = Vec2::new(-30.0, 0.0);

        let impact = v
            .step(&mut reg, DriveInput::default(), &tuning(), 1.0 / 60.0)
            .expect("still overlapping the post");
        assert_eq!(impact.outcome, MoveOutcome::Blocked);
        assert_eq!(impact.normal, Some(Vec2::NEG_X));
        assert_eq!(v.velocity, Vec2::new(-30.0, 0.0));
        assert_eq!(v.position, Vec2::ZERO);
    }

    #[test]
    fn test_bounce_rules() {
        let v = Vec2::new(100.0, 0.0);
        assert_eq!(bounce(v, Some(Vec2::NEG_X), 0.5), Vec2::new(-50.0, 0.0));
        // Already separating
        assert_eq!(bounce(v, Some(Vec2::X), 0.5), v);
        // No normal: reverse and damp
        assert_eq!(bounce(Vec2::new(10.0, -20.0), None, 0.5), Vec2::new(-5.0, 10.0));
    }

    #[test]
    fn test_slow_impact_no_damage() {
        let (mut reg, mut v) = setup(Vec2::new(20.5, -100.0), Vec2::new(20.0, 200.0));
        v.velocity = Vec2::new(40.0, 0.0);
        let impact = v.step(&mut reg, DriveInput::default(), &tuning(), 1.0 / 60.0).unwrap();
        assert_eq!(impact.damage, 0.0);
        assert_eq!(v.health, v.max_health);
    }

    #[test]
    fn test_minimum_impact_damage_is_one() {
        let (mut reg, mut v) = setup(Vec2::new(20.5, -100.0), Vec2::new(20.0, 200.0));
        v.velocity = Vec2::new(55.0, 0.0);
        let impact = v.step(&mut reg, DriveInput::default(), &tuning(), 1.0 / 60.0).unwrap();
        assert_eq!(impact.damage, 1.0);
    }

    #[test]
    fn test_impacts_kill_vehicle_and_clamp_health() {
        let (mut reg, mut v) = setup(Vec2::new(21.0, -100.0), Vec2::new(20.0, 200.0));
        v.health = 2.0;
        v.velocity = Vec2::new(300.0, 0.0);
        let impact = v.step(&mut reg, DriveInput::default(), &tuning(), 1.0 / 60.0).unwrap();
        assert!(impact.destroyed);
        assert!(v.is_dead);
        assert_eq!(v.health, 0.0);
        assert!(!v.take_damage(10.0));
        assert_eq!(v.health, 0.0);
    }

    #[test]
    fn test_enter_exit_binds_and_stops() {
        let (_, mut v) = setup(Vec2::new(1000.0, 0.0), Vec2::splat(10.0));
        let driver = EntityId::new(7, 0);
        assert!(v.enter(driver));
        assert!(!v.enter(EntityId::new(8, 0)));
        v.velocity = Vec2::new(50.0, 0.0);
        assert_eq!(v.exit(), Some(driver));
        assert_eq!(v.velocity, Vec2::ZERO);
        assert_eq!(v.exit(), None);
    }

    #[test]
    fn test_exit_positions_beside_heading() {
        let (_, v) = setup(Vec2::new(1000.0, 0.0), Vec2::splat(10.0));
        let [left, right] = v.exit_positions(12.0);
        // Heading +X: exits are offset along ±Y
        assert!(left.x.abs() < 1e-4 && (left.y - 36.0).abs() < 1e-4);
        assert!(right.x.abs() < 1e-4 && (right.y + 36.0).abs() < 1e-4);
    }
}
