//! Level layout: what a level contains and how it is built into a world.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::camera::ParallaxLayer;
use crate::chest::spawn_chest;
use crate::config::GameConfig;
use crate::math::Vec2;
use crate::physics::{BodyDesc, ColliderShape, PhysicsWorld};
use crate::player::spawn_player;
use crate::spawner::Spawner;
use crate::world::{EntityId, Tag, Transform, World};

/// Current layout format version.
pub const LEVEL_VERSION: u32 = 1;

/// Static solid box (ground, ledges).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub center: Vec2,
    pub size: Vec2,
    #[serde(default = "default_friction")]
    pub friction: f32,
}

fn default_friction() -> f32 {
    0.7
}

impl Platform {
    pub fn new(center: Vec2, size: Vec2) -> Self {
        Self {
            center,
            size,
            friction: default_friction(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelLayout {
    /// Layout version for migration support.
    pub version: u32,
    pub player_start: Vec2,
    #[serde(default)]
    pub platforms: Vec<Platform>,
    #[serde(default)]
    pub chests: Vec<Vec2>,
    #[serde(default)]
    pub spawner_position: Vec2,
    /// Where enemies appear. A level without spawn points never spawns any.
    #[serde(default)]
    pub spawn_points: Vec<Vec2>,
    #[serde(default)]
    pub parallax: Vec<ParallaxLayer>,
}

/// Entities created by [`LevelLayout::build`].
#[derive(Clone, Debug)]
pub struct LoadedLevel {
    pub player: EntityId,
    pub spawner: EntityId,
    pub chests: Vec<EntityId>,
    pub platforms: Vec<EntityId>,
    pub parallax: Vec<ParallaxLayer>,
}

impl Default for LevelLayout {
    /// The built-in level: a long floor, one ledge, two chests, three spawn points.
    fn default() -> Self {
        Self {
            version: LEVEL_VERSION,
            player_start: Vec2::new(0.0, 1.0),
            platforms: vec![
                Platform::new(Vec2::new(50.0, -0.5), Vec2::new(200.0, 1.0)),
                Platform::new(Vec2::new(15.0, 2.5), Vec2::new(6.0, 0.5)),
            ],
            chests: vec![Vec2::new(8.0, 0.4), Vec2::new(30.0, 0.4)],
            spawner_position: Vec2::new(20.0, 1.0),
            spawn_points: vec![
                Vec2::new(20.0, 1.0),
                Vec2::new(40.0, 1.0),
                Vec2::new(-10.0, 1.0),
            ],
            parallax: vec![
                ParallaxLayer::new(0.0, 6.0, 20.0, 0.3),
                ParallaxLayer::new(0.0, 4.0, 20.0, 0.6),
            ],
        }
    }
}

impl LevelLayout {
    /// A bare floor `width` wide starting under the player, with no chests and
    /// no spawn points.
    pub fn flat(width: f32) -> Self {
        Self {
            version: LEVEL_VERSION,
            player_start: Vec2::new(0.0, 1.0),
            platforms: vec![Platform::new(
                Vec2::new(width / 2.0 - 10.0, -0.5),
                Vec2::new(width, 1.0),
            )],
            chests: Vec::new(),
            spawner_position: Vec2::ZERO,
            spawn_points: Vec::new(),
            parallax: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let layout: Self = serde_json::from_str(json)?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading level {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("parsing level {}", path.display()))
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json).with_context(|| format!("writing level {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.version > LEVEL_VERSION {
            return Err(anyhow!(
                "level version {} is newer than supported version {}",
                self.version,
                LEVEL_VERSION
            ));
        }
        if let Some(p) = self.platforms.iter().find(|p| p.size.x <= 0.0 || p.size.y <= 0.0) {
            return Err(anyhow!("platform at ({}, {}) has no area", p.center.x, p.center.y));
        }
        if self.platforms.is_empty() {
            log::warn!("Level has no platforms; everything will fall forever");
        }
        Ok(())
    }

    /// Spawn the level into an empty world.
    pub fn build(
        &self,
        world: &mut World,
        physics: &mut PhysicsWorld,
        config: &GameConfig,
    ) -> Result<LoadedLevel> {
        let mut platforms = Vec::with_capacity(self.platforms.len());
        for platform in &self.platforms {
            let id = world.spawn(Tag::Ground);
            world.insert(id, Transform::new(platform.center));
            physics.create_body(id, BodyDesc::fixed(platform.center))?;
            physics.add_collider(
                id,
                ColliderShape::Box {
                    hx: platform.size.x / 2.0,
                    hy: platform.size.y / 2.0,
                },
                platform.friction,
            )?;
            platforms.push(id);
        }

        let player = spawn_player(world, physics, &config.player, self.player_start)?;

        let chests = self
            .chests
            .iter()
            .map(|position| spawn_chest(world, physics, &config.chest, *position))
            .collect::<Result<Vec<_>>>()?;

        let spawner = world.spawn(Tag::Spawner);
        world.insert(spawner, Transform::new(self.spawner_position));
        world.insert(spawner, Spawner::new(&config.spawner, self.spawn_points.clone()));

        log::info!(
            "Level built: {} platforms, {} chests, {} spawn points",
            platforms.len(),
            chests.len(),
            self.spawn_points.len()
        );

        Ok(LoadedLevel {
            player,
            spawner,
            chests,
            platforms,
            parallax: self.parallax.clone(),
        })
    }
}
