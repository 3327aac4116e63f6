//! Render hooks
//!
//! The simulation never draws. A frontend supplies a [`Projector`] to map world
//! coordinates to the screen and a [`RenderSink`] that receives one
//! [`SpriteView`] per visible entity, back to front.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// World → screen transform
pub trait Projector {
    fn world_to_screen(&self, world: Vec2) -> Vec2;
    /// Screen pixels per world unit
    fn scale(&self) -> f32;
}

/// Camera centered on a world point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub center: Vec2,
    pub zoom: f32,
    /// Viewport size in pixels
    pub viewport: Vec2,
}

impl Camera {
    pub fn new(center: Vec2, viewport: Vec2) -> Self {
        Self {
            center,
            zoom: 1.0,
            viewport,
        }
    }
}

impl Projector for Camera {
    fn world_to_screen(&self, world: Vec2) -> Vec2 {
        (world - self.center) * self.zoom + self.viewport * 0.5
    }

    fn scale(&self) -> f32 {
        self.zoom
    }
}

/// Sprite categories, in draw order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpriteKind {
    Solid,
    Pickup,
    Vehicle,
    Npc,
    Player,
    Projectile,
}

/// One entity ready to draw, in screen space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpriteView {
    pub kind: SpriteKind,
    pub position: Vec2,
    pub size: Vec2,
    /// Radians, 0 = +X
    pub rotation: f32,
    /// Remaining health in [0, 1] for damageable entities
    pub health: Option<f32>,
}

/// Receives sprites from `GameState::render`
pub trait RenderSink {
    fn draw(&mut self, sprite: &SpriteView);
}

impl RenderSink for Vec<SpriteView> {
    fn draw(&mut self, sprite: &SpriteView) {
        self.push(*sprite);
    }
}
