//! Collision detection for circles and axis-aligned rects
//!
//! Every entity that takes part in movement collisions owns exactly one
//! collider in the [`CollisionRegistry`]. Queries are brute force: each
//! `get_collisions` call scans every registered collider, so a full tick of
//! queries is O(n²). There is no broad phase.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::arena::EntityId;
use crate::consts::DEFAULT_NORMAL;

/// Collider geometry. Size is fixed once registered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle { radius: f32 },
    /// Axis-aligned rect centered on the collider position
    Rect { width: f32, height: f32 },
}

/// A positioned shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub shape: Shape,
    /// World position (center for both shapes)
    pub position: Vec2,
}

impl Collider {
    pub fn circle(position: Vec2, radius: f32) -> Self {
        Self {
            shape: Shape::Circle { radius },
            position,
        }
    }

    pub fn rect(center: Vec2, width: f32, height: f32) -> Self {
        Self {
            shape: Shape::Rect { width, height },
            position: center,
        }
    }

    /// Rect from its min (top-left) corner
    pub fn rect_from_min(min: Vec2, width: f32, height: f32) -> Self {
        Self::rect(min + Vec2::new(width, height) * 0.5, width, height)
    }

    /// Axis-aligned bounds as (min, max)
    pub fn bounds(&self) -> (Vec2, Vec2) {
        let half = match self.shape {
            Shape::Circle { radius } => Vec2::splat(radius),
            Shape::Rect { width, height } => Vec2::new(width, height) * 0.5,
        };
        (self.position - half, self.position + half)
    }

    /// Point membership: strict inside the circle radius, inclusive on rect edges
    pub fn contains_point(&self, point: Vec2) -> bool {
        match self.shape {
            Shape::Circle { radius } => point.distance(self.position) < radius,
            Shape::Rect { .. } => {
                let (min, max) = self.bounds();
                point_in_rect(point, min, max)
            }
        }
    }

    /// Same shape at a different position
    pub fn at(&self, position: Vec2) -> Self {
        Self {
            shape: self.shape,
            position,
        }
    }
}

/// Circles overlap iff center distance < r1 + r2 (tangency does not count)
#[inline]
pub fn circle_circle(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    a.distance(b) < ra + rb
}

/// Closest point of a rect to `point`
#[inline]
pub fn closest_point_on_rect(point: Vec2, min: Vec2, max: Vec2) -> Vec2 {
    point.clamp(min, max)
}

/// Circle overlaps rect iff its center is closer than `radius` to the clamped point
#[inline]
pub fn circle_rect(center: Vec2, radius: f32, min: Vec2, max: Vec2) -> bool {
    center.distance(closest_point_on_rect(center, min, max)) < radius
}

/// Inclusive overlap on all four half-plane conditions
#[inline]
pub fn rect_rect(a_min: Vec2, a_max: Vec2, b_min: Vec2, b_max: Vec2) -> bool {
    a_min.x <= b_max.x && a_max.x >= b_min.x && a_min.y <= b_max.y && a_max.y >= b_min.y
}

#[inline]
pub fn point_in_rect(point: Vec2, min: Vec2, max: Vec2) -> bool {
    point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
}

/// Shape-dispatched intersection test
pub fn intersects(a: &Collider, b: &Collider) -> bool {
    match (a.shape, b.shape) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            circle_circle(a.position, ra, b.position, rb)
        }
        (Shape::Circle { radius }, Shape::Rect { .. }) => {
            let (min, max) = b.bounds();
            circle_rect(a.position, radius, min, max)
        }
        (Shape::Rect { .. }, Shape::Circle { radius }) => {
            let (min, max) = a.bounds();
            circle_rect(b.position, radius, min, max)
        }
        (Shape::Rect { .. }, Shape::Rect { .. }) => {
            let (a_min, a_max) = a.bounds();
            let (b_min, b_max) = b.bounds();
            rect_rect(a_min, a_max, b_min, b_max)
        }
    }
}

/// Unit contact normal between two colliders
///
/// - circle/circle: from `a`'s center toward `b`'s center
/// - circle/rect (either order): from the rect's closest point toward the circle center
/// - rect/rect: along the axis of least overlap, from `a` toward `b`
///
/// Zero separation yields [`DEFAULT_NORMAL`].
pub fn contact_normal(a: &Collider, b: &Collider) -> Vec2 {
    let raw = match (a.shape, b.shape) {
        (Shape::Circle { .. }, Shape::Circle { .. }) => b.position - a.position,
        (Shape::Circle { .. }, Shape::Rect { .. }) => {
            let (min, max) = b.bounds();
            a.position - closest_point_on_rect(a.position, min, max)
        }
        (Shape::Rect { .. }, Shape::Circle { .. }) => {
            let (min, max) = a.bounds();
            b.position - closest_point_on_rect(b.position, min, max)
        }
        (Shape::Rect { .. }, Shape::Rect { .. }) => rect_rect_axis(a, b),
    };
    raw.try_normalize().unwrap_or(DEFAULT_NORMAL)
}

fn rect_rect_axis(a: &Collider, b: &Collider) -> Vec2 {
    let (a_min, a_max) = a.bounds();
    let (b_min, b_max) = b.bounds();
    let overlap_x = a_max.x.min(b_max.x) - a_min.x.max(b_min.x);
    let overlap_y = a_max.y.min(b_max.y) - a_min.y.max(b_min.y);
    let delta = b.position - a.position;
    // signum(0.0) == 1.0, so coincident centers fall back to +X
    if overlap_x <= overlap_y {
        Vec2::new(delta.x.signum(), 0.0)
    } else {
        Vec2::new(0.0, delta.y.signum())
    }
}

#[derive(Debug, Clone)]
struct Slot {
    id: EntityId,
    collider: Collider,
}

/// One collider per entity id, stored densely by slot index
#[derive(Debug, Clone, Default)]
pub struct CollisionRegistry {
    slots: Vec<Option<Slot>>,
}

impl CollisionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collider for `id`
    ///
    /// Returns false if `id` is already registered; its shape stays as it was.
    /// A leftover entry from an older generation of the same slot is replaced.
    pub fn register(&mut self, id: EntityId, collider: Collider) -> bool {
        let i = id.index();
        if i >= self.slots.len() {
            self.slots.resize(i + 1, None);
        }
        if let Some(existing) = &self.slots[i] {
            if existing.id == id {
                return false;
            }
            log::warn!("Replacing stale collider {} with {}", existing.id, id);
        }
        self.slots[i] = Some(Slot { id, collider });
        true
    }

    /// Remove the collider for `id`
    pub fn unregister(&mut self, id: EntityId) -> Option<Collider> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.as_ref().is_some_and(|s| s.id == id) {
            slot.take().map(|s| s.collider)
        } else {
            None
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&Collider> {
        match self.slots.get(id.index()) {
            Some(Some(slot)) if slot.id == id => Some(&slot.collider),
            _ => None,
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Move a collider. Returns false for unknown ids.
    pub fn update_position(&mut self, id: EntityId, position: Vec2) -> bool {
        match self.slots.get_mut(id.index()) {
            Some(Some(slot)) if slot.id == id => {
                slot.collider.position = position;
                true
            }
            _ => false,
        }
    }

    /// Symmetric pair test. False if either id is absent or both are the same.
    pub fn is_colliding(&self, a: EntityId, b: EntityId) -> bool {
        if a == b {
            return false;
        }
        match (self.get(a), self.get(b)) {
            (Some(ca), Some(cb)) => intersects(ca, cb),
            _ => false,
        }
    }

    /// Every registered id overlapping `id`, in slot order. Linear scan.
    pub fn get_collisions(&self, id: EntityId) -> Vec<EntityId> {
        let Some(collider) = self.get(id) else {
            return Vec::new();
        };
        self.iter()
            .filter(|(other, c)| *other != id && intersects(collider, c))
            .map(|(other, _)| other)
            .collect()
    }

    /// True if anything other than `id` overlaps it
    pub fn has_collisions(&self, id: EntityId) -> bool {
        let Some(collider) = self.get(id) else {
            return false;
        };
        self.iter()
            .any(|(other, c)| other != id && intersects(collider, c))
    }

    /// Registered colliders overlapping an unregistered probe shape
    pub fn query_collider(&self, probe: &Collider) -> Vec<EntityId> {
        self.iter()
            .filter(|(_, c)| intersects(probe, c))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn point_in_collider(&self, point: Vec2, id: EntityId) -> bool {
        self.get(id).is_some_and(|c| c.contains_point(point))
    }

    /// Contact normal between two registered colliders, see [`contact_normal`]
    pub fn collision_normal(&self, a: EntityId, b: EntityId) -> Option<Vec2> {
        Some(contact_normal(self.get(a)?, self.get(b)?))
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Collider)> {
        self.slots
            .iter()
            .flatten()
            .map(|slot| (slot.id, &slot.collider))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::arena::EntityAllocator;
    use proptest::prelude::*;

    fn ids(n: usize) -> Vec<EntityId> {
        let mut alloc = EntityAllocator::new();
        (0..n).map(|_| alloc.allocate()).collect()
    }

    #[test]
    fn test_circle_circle_tangent_is_not_colliding() {
        assert!(!circle_circle(Vec2::ZERO, 5.0, Vec2::new(10.0, 0.0), 5.0));
        assert!(circle_circle(Vec2::ZERO, 5.0, Vec2::new(9.99, 0.0), 5.0));
    }

    #[test]
    fn test_circle_rect_uses_clamped_point() {
        let min = Vec2::new(0.0, 0.0);
        let max = Vec2::new(10.0, 10.0);
        // Near the corner: distance to (10,10) is ~4.24
        assert!(circle_rect(Vec2::new(13.0, 13.0), 4.5, min, max));
        assert!(!circle_rect(Vec2::new(13.0, 13.0), 4.0, min, max));
        // Touching an edge exactly is not a collision
        assert!(!circle_rect(Vec2::new(15.0, 5.0), 5.0, min, max));
    }

    #[test]
    fn test_rect_rect_overlap_inclusive() {
        let a = Collider::rect_from_min(Vec2::ZERO, 10.0, 10.0);
        let b = Collider::rect_from_min(Vec2::new(10.0, 0.0), 10.0, 10.0);
        let c = Collider::rect_from_min(Vec2::new(10.5, 0.0), 10.0, 10.0);
        assert!(intersects(&a, &b));
        assert!(!intersects(&a, &c));
    }

    #[test]
    fn test_registry_get_collisions_excludes_self() {
        let ids = ids(3);
        let mut reg = CollisionRegistry::new();
        reg.register(ids[0], Collider::circle(Vec2::ZERO, 10.0));
        reg.register(ids[1], Collider::circle(Vec2::new(15.0, 0.0), 10.0));
        reg.register(ids[2], Collider::circle(Vec2::new(100.0, 0.0), 10.0));

        assert_eq!(reg.get_collisions(ids[0]), vec![ids[1]]);
        assert_eq!(reg.get_collisions(ids[2]), Vec::<EntityId>::new());
        assert!(reg.is_colliding(ids[0], ids[1]));
        assert!(!reg.is_colliding(ids[0], ids[0]));
    }

    #[test]
    fn test_unregistered_id_is_absent_everywhere() {
        let ids = ids(2);
        let mut reg = CollisionRegistry::new();
        reg.register(ids[0], Collider::circle(Vec2::ZERO, 10.0));

        assert!(reg.get_collisions(ids[1]).is_empty());
        assert!(!reg.is_colliding(ids[0], ids[1]));
        assert!(!reg.point_in_collider(Vec2::ZERO, ids[1]));
        assert!(reg.collision_normal(ids[0], ids[1]).is_none());
        assert!(!reg.update_position(ids[1], Vec2::ONE));
    }

    #[test]
    fn test_unregister_removes_stale_collider() {
        let ids = ids(2);
        let mut reg = CollisionRegistry::new();
        reg.register(ids[0], Collider::circle(Vec2::ZERO, 10.0));
        reg.register(ids[1], Collider::circle(Vec2::new(5.0, 0.0), 10.0));
        assert!(reg.unregister(ids[1]).is_some());
        assert!(reg.get_collisions(ids[0]).is_empty());
        assert!(reg.unregister(ids[1]).is_none());
    }

    #[test]
    fn test_register_twice_keeps_original_size() {
        let ids = ids(1);
        let mut reg = CollisionRegistry::new();
        assert!(reg.register(ids[0], Collider::circle(Vec2::ZERO, 10.0)));
        assert!(!reg.register(ids[0], Collider::circle(Vec2::ZERO, 50.0)));
        assert_eq!(reg.get(ids[0]).unwrap().shape, Shape::Circle { radius: 10.0 });
    }

    #[test]
    fn test_stale_generation_does_not_resolve() {
        let mut alloc = EntityAllocator::new();
        let old = alloc.allocate();
        let mut reg = CollisionRegistry::new();
        reg.register(old, Collider::circle(Vec2::ZERO, 10.0));
        reg.unregister(old);
        alloc.free(old);
        let new = alloc.allocate();
        reg.register(new, Collider::circle(Vec2::ZERO, 10.0));
        assert_eq!(old.index(), new.index());
        assert!(reg.get(old).is_none());
        assert!(reg.get(new).is_some());
    }

    #[test]
    fn test_collision_normals() {
        let ids = ids(3);
        let mut reg = CollisionRegistry::new();
        reg.register(ids[0], Collider::circle(Vec2::ZERO, 10.0));
        reg.register(ids[1], Collider::circle(Vec2::new(0.0, 5.0), 10.0));
        reg.register(ids[2], Collider::rect_from_min(Vec2::new(8.0, -50.0), 10.0, 100.0));

        let n = reg.collision_normal(ids[0], ids[1]).unwrap();
        assert!((n - Vec2::Y).length() < 1e-6);

        // From the rect's closest point toward the circle, either argument order
        let n = reg.collision_normal(ids[0], ids[2]).unwrap();
        assert!((n - Vec2::NEG_X).length() < 1e-6);
        let n = reg.collision_normal(ids[2], ids[0]).unwrap();
        assert!((n - Vec2::NEG_X).length() < 1e-6);
    }

    #[test]
    fn test_degenerate_normal_defaults() {
        let ids = ids(2);
        let mut reg = CollisionRegistry::new();
        reg.register(ids[0], Collider::circle(Vec2::ONE, 10.0));
        reg.register(ids[1], Collider::circle(Vec2::ONE, 4.0));
        assert_eq!(reg.collision_normal(ids[0], ids[1]), Some(Vec2::X));
    }

    #[test]
    fn test_point_in_collider_boundaries() {
        let ids = ids(2);
        let mut reg = CollisionRegistry::new();
        reg.register(ids[0], Collider::circle(Vec2::ZERO, 10.0));
        reg.register(ids[1], Collider::rect_from_min(Vec2::ZERO, 10.0, 10.0));

        assert!(!reg.point_in_collider(Vec2::new(10.0, 0.0), ids[0]));
        assert!(reg.point_in_collider(Vec2::new(9.9, 0.0), ids[0]));
        assert!(reg.point_in_collider(Vec2::new(10.0, 10.0), ids[1]));
        assert!(!reg.point_in_collider(Vec2::new(10.01, 10.0), ids[1]));
    }

    fn arb_collider() -> impl Strategy<Value = Collider> {
        let pos = (-100.0f32..100.0, -100.0f32..100.0).prop_map(|(x, y)| Vec2::new(x, y));
        prop_oneof![
            (pos.clone(), 1.0f32..50.0).prop_map(|(p, r)| Collider::circle(p, r)),
            (pos, 1.0f32..80.0, 1.0f32..80.0).prop_map(|(p, w, h)| Collider::rect(p, w, h)),
        ]
    }

    proptest! {
        #[test]
        fn prop_is_colliding_symmetric(a in arb_collider(), b in arb_collider()) {
            let ids = ids(2);
            let mut reg = CollisionRegistry::new();
            reg.register(ids[0], a);
            reg.register(ids[1], b);
            prop_assert_eq!(reg.is_colliding(ids[0], ids[1]), reg.is_colliding(ids[1], ids[0]));
        }

        #[test]
        fn prop_circle_circle_matches_distance(
            ax in -100.0f32..100.0, ay in -100.0f32..100.0,
            bx in -100.0f32..100.0, by in -100.0f32..100.0,
            ra in 1.0f32..50.0, rb in 1.0f32..50.0,
        ) {
            let a = Vec2::new(ax, ay);
            let b = Vec2::new(bx, by);
            prop_assert_eq!(circle_circle(a, ra, b, rb), a.distance(b) < ra + rb);
        }

        #[test]
        fn prop_point_in_rect_agrees_with_degenerate_rect_overlap(
            px in -60.0f32..60.0, py in -60.0f32..60.0,
            w in 1.0f32..80.0, h in 1.0f32..80.0,
        ) {
            let rect = Collider::rect(Vec2::ZERO, w, h);
            let point = Vec2::new(px, py);
            // A zero-size rect at the point overlaps iff the point is inside
            let probe = Collider::rect(point, 0.0, 0.0);
            prop_assert_eq!(rect.contains_point(point), intersects(&rect, &probe));
        }

        #[test]
        fn prop_contact_normal_is_unit(a in arb_collider(), b in arb_collider()) {
            let n = contact_normal(&a, &b);
            prop_assert!((n.length() - 1.0).abs() < 1e-3);
        }
    }
}
