//! Reward gate: a chest that asks a math question when the player touches it.

use anyhow::Result;

use crate::animation::Animator;
use crate::config::ChestConfig;
use crate::math::Vec2;
use crate::physics::{BodyDesc, ColliderShape, PhysicsWorld};
use crate::world::{EntityId, Tag, Transform, World};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChestState {
    Active,
    Cooldown,
}

/// Chest state. The cooldown itself is a `ChestReopen` timer owned by the
/// chest entity; it starts when the chest opens, whatever the answer.
#[derive(Clone, Debug)]
pub struct MathChest {
    state: ChestState,
    cue_visible: bool,
    cooldown: f32,
}

impl MathChest {
    pub fn new(cooldown: f32) -> Self {
        Self {
            state: ChestState::Active,
            cue_visible: false,
            cooldown,
        }
    }

    pub fn state(&self) -> ChestState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ChestState::Active
    }

    pub fn is_cue_visible(&self) -> bool {
        self.cue_visible
    }

    pub fn cooldown(&self) -> f32 {
        self.cooldown
    }

    /// Open the chest. Returns false (and changes nothing) during cooldown.
    pub fn activate(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.state = ChestState::Cooldown;
        self.cue_visible = false;
        true
    }

    /// End the cooldown. Returns false if the chest was already active.
    pub fn reactivate(&mut self) -> bool {
        if self.is_active() {
            return false;
        }
        self.state = ChestState::Active;
        true
    }

    pub fn on_proximity_enter(&mut self) {
        if self.is_active() {
            self.cue_visible = true;
        }
    }

    pub fn on_proximity_exit(&mut self) {
        self.cue_visible = false;
    }
}

/// Spawn a chest: fixed body with a trigger volume.
pub fn spawn_chest(
    world: &mut World,
    physics: &mut PhysicsWorld,
    config: &ChestConfig,
    position: Vec2,
) -> Result<EntityId> {
    let id = world.spawn(Tag::MathChest);
    world.insert(id, Transform::new(position));
    world.insert(id, MathChest::new(config.cooldown));
    world.insert(id, Animator::new());

    physics.create_body(id, BodyDesc::fixed(position))?;
    physics.add_sensor(
        id,
        ColliderShape::Box {
            hx: config.half_extents.x,
            hy: config.half_extents.y,
        },
    )?;
    log::debug!("Spawned chest {} at ({:.1}, {:.1})", id.to_u32(), position.x, position.y);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_during_cooldown_is_a_no_op() {
        let mut chest = MathChest::new(30.0);
        assert!(chest.activate());
        assert_eq!(chest.state(), ChestState::Cooldown);
        assert!(!chest.activate());
        assert_eq!(chest.state(), ChestState::Cooldown);

        assert!(chest.reactivate());
        assert!(chest.is_active());
        assert!(!chest.reactivate());
    }

    #[test]
    fn cue_only_while_active() {
        let mut chest = MathChest::new(30.0);
        chest.on_proximity_enter();
        assert!(chest.is_cue_visible());

        chest.activate();
        assert!(!chest.is_cue_visible());
        chest.on_proximity_enter();
        assert!(!chest.is_cue_visible());

        chest.reactivate();
        chest.on_proximity_enter();
        chest.on_proximity_exit();
        assert!(!chest.is_cue_visible());
    }

    #[test]
    fn spawn_creates_sensor_body() {
        let mut world = World::new();
        let mut physics = PhysicsWorld::with_gravity(Vec2::new(0.0, -9.81));
        let id = spawn_chest(&mut world, &mut physics, &ChestConfig::default(), Vec2::new(8.0, 0.4)).unwrap();
        assert_eq!(world.tag(id), Some(Tag::MathChest));
        assert!(physics.has_body(id));
        assert!(world.get::<MathChest>(id).unwrap().is_active());

        physics.step(1.0 / 60.0);
        // Fixed bodies stay put.
        assert_eq!(physics.body_position(id), Some(Vec2::new(8.0, 0.4)));
    }
}
