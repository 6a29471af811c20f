//! Camera follow and parallax background layers.

use serde::{Deserialize, Serialize};

use crate::math::Vec2;
use crate::world::EntityId;

/// Camera that sits at a fixed offset from its target.
#[derive(Clone, Copy, Debug)]
pub struct CameraFollow {
    pub target: Option<EntityId>,
    pub offset: Vec2,
    pub position: Vec2,
}

impl CameraFollow {
    pub fn new(offset: Vec2) -> Self {
        Self {
            target: None,
            offset,
            position: offset,
        }
    }

    #[must_use]
    pub fn follow_entity(mut self, entity: EntityId) -> Self {
        self.target = Some(entity);
        self
    }

    /// Snap to `target_position + offset`. A camera without a target stays put.
    pub fn update(&mut self, target_position: Option<Vec2>) {
        if let Some(target) = target_position {
            self.position = target + self.offset;
        }
    }
}

/// A background strip that scrolls at a fraction of the camera speed and
/// wraps around once the camera has moved a full strip length past it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParallaxLayer {
    /// 0 scrolls with the world, 1 stays glued to the camera.
    pub factor: f32,
    /// Width of one tile of the strip.
    pub length: f32,
    pub start_x: f32,
    pub y: f32,
    #[serde(skip)]
    pub x: f32,
}

impl ParallaxLayer {
    pub fn new(start_x: f32, y: f32, length: f32, factor: f32) -> Self {
        Self {
            factor,
            length,
            start_x,
            y,
            x: start_x,
        }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn update(&mut self, camera_x: f32) {
        let travelled = camera_x * (1.0 - self.factor);
        self.x = self.start_x + camera_x * self.factor;

        if self.length <= 0.0 {
            return;
        }
        if travelled > self.start_x + self.length {
            self.start_x += self.length;
        } else if travelled < self.start_x - self.length {
            self.start_x -= self.length;
        }
    }
}
