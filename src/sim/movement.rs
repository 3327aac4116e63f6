//! Axis-sliding movement correction
//!
//! Walkers (player on foot, NPCs) move by trying the full displacement, then X
//! alone, then Y alone, and give up for the tick if all three collide. Against
//! axis-aligned walls this slides the mover along the wall instead of stopping
//! it dead.
//!
//! There is no sub-stepping: a mover whose per-tick displacement exceeds the
//! thickness of an obstacle can tunnel through it. Known limitation.

use glam::Vec2;

use super::arena::EntityId;
use super::collision::CollisionRegistry;

/// Which candidate displacement was committed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Full displacement, no contact
    Free,
    /// Y was blocked, only X was applied
    SlidX,
    /// X was blocked, only Y was applied
    SlidY,
    /// Both axes blocked, position unchanged
    Blocked,
}

impl MoveOutcome {
    /// Whether any contact occurred
    pub fn collided(&self) -> bool {
        !matches!(self, MoveOutcome::Free)
    }
}

/// Result of one resolved move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveResult {
    pub position: Vec2,
    pub outcome: MoveOutcome,
}

/// Applies displacements against the collision registry
pub struct MovementResolver;

impl MovementResolver {
    /// Move `id` from `from` by `displacement`, sliding along blockers
    ///
    /// The registry entry for `id` ends at the committed position. An id with
    /// no collider has nothing to collide with and always moves freely.
    pub fn resolve(
        registry: &mut CollisionRegistry,
        id: EntityId,
        from: Vec2,
        displacement: Vec2,
    ) -> MoveResult {
        if !registry.contains(id) {
            return MoveResult {
                position: from + displacement,
                outcome: MoveOutcome::Free,
            };
        }
        if displacement == Vec2::ZERO {
            registry.update_position(id, from);
            return MoveResult {
                position: from,
                outcome: MoveOutcome::Free,
            };
        }

        // X is always tried before Y. A zero axis component is not an escape.
        let candidates = [
            (displacement, MoveOutcome::Free),
            (Vec2::new(displacement.x, 0.0), MoveOutcome::SlidX),
            (Vec2::new(0.0, displacement.y), MoveOutcome::SlidY),
        ];

        for (step, outcome) in candidates {
            if outcome != MoveOutcome::Free && step == Vec2::ZERO {
                continue;
            }
            let position = from + step;
            registry.update_position(id, position);
            if !registry.has_collisions(id) {
                return MoveResult { position, outcome };
            }
        }

        registry.update_position(id, from);
        MoveResult {
            position: from,
            outcome: MoveOutcome::Blocked,
        }
    }
}
