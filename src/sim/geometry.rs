//! Static world geometry
//!
//! Buildings and walls are solid axis-aligned rects. They are registered in the
//! collision registry like any other collider and also answer point queries
//! for projectile removal and spawn validation.

use glam::Vec2;

use super::arena::{EntityAllocator, EntityId};
use super::collision::{Collider, CollisionRegistry};

/// Point query against solid scenery
pub trait SolidQuery {
    fn is_position_inside_solid(&self, point: Vec2) -> bool;
}

/// Scenery with no solids
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenField;

impl SolidQuery for OpenField {
    fn is_position_inside_solid(&self, _point: Vec2) -> bool {
        false
    }
}

/// Solid rects owned by the world layer
#[derive(Debug, Clone, Default)]
pub struct StaticGeometry {
    solids: Vec<(EntityId, Collider)>,
}

impl StaticGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a solid rect and register its collider
    pub fn add_solid(
        &mut self,
        alloc: &mut EntityAllocator,
        registry: &mut CollisionRegistry,
        min: Vec2,
        size: Vec2,
    ) -> EntityId {
        let id = alloc.allocate();
        let collider = Collider::rect_from_min(min, size.x, size.y);
        registry.register(id, collider);
        self.solids.push((id, collider));
        id
    }

    /// Remove a solid and its collider
    pub fn remove_solid(
        &mut self,
        alloc: &mut EntityAllocator,
        registry: &mut CollisionRegistry,
        id: EntityId,
    ) -> bool {
        let Some(idx) = self.solids.iter().position(|(sid, _)| *sid == id) else {
            return false;
        };
        self.solids.remove(idx);
        registry.unregister(id);
        alloc.free(id);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Collider)> {
        self.solids.iter().map(|(id, c)| (*id, c))
    }

    pub fn len(&self) -> usize {
        self.solids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solids.is_empty()
    }
}

impl SolidQuery for StaticGeometry {
    fn is_position_inside_solid(&self, point: Vec2) -> bool {
        self.solids.iter().any(|(_, c)| c.contains_point(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_registers_collider() {
        let mut alloc = EntityAllocator::new();
        let mut reg = CollisionRegistry::new();
        let mut geo = StaticGeometry::new();
        let id = geo.add_solid(&mut alloc, &mut reg, Vec2::ZERO, Vec2::new(10.0, 20.0));

        assert!(reg.contains(id));
        assert!(geo.is_position_inside_solid(Vec2::new(5.0, 19.0)));
        assert!(!geo.is_position_inside_solid(Vec2::new(11.0, 5.0)));
    }

    #[test]
    fn test_remove_solid_unregisters() {
        let mut alloc = EntityAllocator::new();
        let mut reg = CollisionRegistry::new();
        let mut geo = StaticGeometry::new();
        let id = geo.add_solid(&mut alloc, &mut reg, Vec2::ZERO, Vec2::splat(10.0));

        assert!(geo.remove_solid(&mut alloc, &mut reg, id));
        assert!(!reg.contains(id));
        assert!(!geo.is_position_inside_solid(Vec2::splat(5.0)));
        assert!(!geo.remove_solid(&mut alloc, &mut reg, id));
    }
}
