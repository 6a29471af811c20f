//! Animation cues.
//!
//! Nothing is blended or drawn here. An [`Animator`] records the parameters
//! and triggers gameplay sets so a renderer (or a test) can react to them.
//! Entities without an animator are allowed; the helpers below do nothing
//! for them.

use std::collections::HashMap;

use crate::world::{EntityId, World};

/// Parameter and trigger names shared by gameplay and animation assets.
pub mod cues {
    pub const JUMP: &str = "Jump";
    pub const IS_SLIDING: &str = "IsSliding";
    pub const IS_GROUNDED: &str = "IsGrounded";
    pub const SPEED: &str = "Speed";
    pub const IS_MOVING: &str = "IsMoving";
    pub const ATTACK: &str = "Attack";
    pub const HIT: &str = "Hit";
    pub const DIE: &str = "Die";
    pub const OPEN: &str = "Open";
    pub const CLOSE: &str = "Close";
}

#[derive(Clone, Debug, Default)]
pub struct Animator {
    bools: HashMap<&'static str, bool>,
    floats: HashMap<&'static str, f32>,
    triggers: Vec<&'static str>,
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_bool(&mut self, name: &'static str, value: bool) {
        self.bools.insert(name, value);
    }

    pub fn set_float(&mut self, name: &'static str, value: f32) {
        self.floats.insert(name, value);
    }

    /// Fire a one-shot trigger. Triggers queue until drained; the game drains
    /// them every frame.
    pub fn set_trigger(&mut self, name: &'static str) {
        self.triggers.push(name);
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.bools.get(name).copied()
    }

    pub fn get_float(&self, name: &str) -> Option<f32> {
        self.floats.get(name).copied()
    }

    pub fn pending_triggers(&self) -> &[&'static str] {
        &self.triggers
    }

    /// Take the triggers fired since the last drain, oldest first.
    pub fn drain_triggers(&mut self) -> Vec<&'static str> {
        std::mem::take(&mut self.triggers)
    }
}

pub fn set_bool(world: &mut World, entity: EntityId, name: &'static str, value: bool) {
    if let Some(animator) = world.get_mut::<Animator>(entity) {
        animator.set_bool(name, value);
    }
}

pub fn set_float(world: &mut World, entity: EntityId, name: &'static str, value: f32) {
    if let Some(animator) = world.get_mut::<Animator>(entity) {
        animator.set_float(name, value);
    }
}

pub fn set_trigger(world: &mut World, entity: EntityId, name: &'static str) {
    if let Some(animator) = world.get_mut::<Animator>(entity) {
        animator.set_trigger(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Tag;

    #[test]
    fn triggers_drain_in_order() {
        let mut animator = Animator::new();
        animator.set_trigger(cues::ATTACK);
        animator.set_trigger(cues::DIE);
        assert_eq!(animator.pending_triggers(), &[cues::ATTACK, cues::DIE]);
        assert_eq!(animator.drain_triggers(), vec![cues::ATTACK, cues::DIE]);
        assert!(animator.drain_triggers().is_empty());
    }

    #[test]
    fn parameters_overwrite() {
        let mut animator = Animator::new();
        animator.set_bool(cues::IS_GROUNDED, true);
        animator.set_bool(cues::IS_GROUNDED, false);
        animator.set_float(cues::SPEED, 0.5);
        assert_eq!(animator.get_bool(cues::IS_GROUNDED), Some(false));
        assert_eq!(animator.get_float(cues::SPEED), Some(0.5));
        assert_eq!(animator.get_bool(cues::IS_SLIDING), None);
    }

    #[test]
    fn missing_animator_is_a_no_op() {
        let mut world = World::new();
        let bare = world.spawn(Tag::Enemy);
        set_trigger(&mut world, bare, cues::HIT);
        set_bool(&mut world, bare, cues::IS_MOVING, true);
        assert!(world.get::<Animator>(bare).is_none());

        let animated = world.spawn(Tag::Enemy);
        world.insert(animated, Animator::new());
        set_trigger(&mut world, animated, cues::HIT);
        assert_eq!(world.get::<Animator>(animated).unwrap().pending_triggers(), &[cues::HIT]);
    }
}
