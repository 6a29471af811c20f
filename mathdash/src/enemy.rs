//! Enemy AI: idle until the player comes near, then chase and attack.

use anyhow::Result;

use crate::animation::Animator;
use crate::config::EnemyConfig;
use crate::math::Vec2;
use crate::physics::{BodyDesc, ColliderShape, PhysicsWorld};
use crate::world::{EntityId, Tag, Transform, World};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnemyState {
    Idle,
    Chasing,
    Dead,
}

/// What an enemy wants to do this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyIntent {
    pub velocity: Vec2,
    pub moving: bool,
    /// New sprite mirroring, if the horizontal direction is known.
    pub flip_x: Option<bool>,
    /// Player is within attack range.
    pub attack: bool,
}

impl EnemyIntent {
    fn still() -> Self {
        Self {
            velocity: Vec2::ZERO,
            moving: false,
            flip_x: None,
            attack: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DamageResult {
    /// Already dead.
    Ignored,
    Hit,
    Died,
}

#[derive(Clone, Debug)]
pub struct Enemy {
    state: EnemyState,
    health: u32,
    spawner: Option<EntityId>,
    attack_pending: bool,
    move_speed: f32,
    detection_range: f32,
    attack_range: f32,
    damage: u32,
}

impl Enemy {
    pub fn new(config: &EnemyConfig, spawner: Option<EntityId>) -> Self {
        Self {
            state: EnemyState::Idle,
            health: config.health,
            spawner,
            attack_pending: false,
            move_speed: config.move_speed,
            detection_range: config.detection_range,
            attack_range: config.attack_range,
            damage: config.damage,
        }
    }

    pub fn think(&mut self, own: Vec2, player: Option<Vec2>) -> EnemyIntent {
        if self.state == EnemyState::Dead {
            return EnemyIntent::still();
        }

        let Some(player) = player else {
            self.state = EnemyState::Idle;
            return EnemyIntent::still();
        };

        let distance = own.distance(player);
        if distance > self.detection_range {
            self.state = EnemyState::Idle;
            return EnemyIntent::still();
        }

        self.state = EnemyState::Chasing;
        let direction = (player - own).normalized();
        let flip_x = if direction.x > 0.0 {
            Some(false)
        } else if direction.x < 0.0 {
            Some(true)
        } else {
            None
        };

        EnemyIntent {
            velocity: direction * self.move_speed,
            moving: true,
            flip_x,
            attack: distance <= self.attack_range,
        }
    }

    pub fn in_attack_range(&self, own: Vec2, player: Vec2) -> bool {
        own.distance(player) <= self.attack_range
    }

    /// Start an attack swing unless one is already in progress.
    pub fn begin_attack(&mut self) -> bool {
        if self.is_dead() || self.attack_pending {
            return false;
        }
        self.attack_pending = true;
        true
    }

    /// The swing landed. Returns the damage to deal if the enemy is still alive.
    pub fn finish_attack(&mut self) -> Option<u32> {
        self.attack_pending = false;
        (!self.is_dead()).then_some(self.damage)
    }

    pub fn take_damage(&mut self, amount: u32) -> DamageResult {
        if self.is_dead() {
            return DamageResult::Ignored;
        }
        self.health = self.health.saturating_sub(amount);
        if self.health == 0 {
            self.state = EnemyState::Dead;
            self.attack_pending = false;
            DamageResult::Died
        } else {
            DamageResult::Hit
        }
    }

    pub fn state(&self) -> EnemyState {
        self.state
    }

    pub fn is_dead(&self) -> bool {
        self.state == EnemyState::Dead
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn spawner(&self) -> Option<EntityId> {
        self.spawner
    }
}

pub fn spawn_enemy(
    world: &mut World,
    physics: &mut PhysicsWorld,
    config: &EnemyConfig,
    position: Vec2,
    spawner: Option<EntityId>,
) -> Result<EntityId> {
    let id = world.spawn(Tag::Enemy);
    world.insert(id, Transform::new(position));
    world.insert(id, Enemy::new(config, spawner));
    world.insert(id, Animator::new());

    physics.create_body(id, BodyDesc::dynamic(position))?;
    physics.add_collider(
        id,
        ColliderShape::Box {
            hx: config.half_extents.x,
            hy: config.half_extents.y,
        },
        0.0,
    )?;
    log::debug!("Spawned enemy {} at ({:.1}, {:.1})", id.to_u32(), position.x, position.y);
    Ok(id)
}
