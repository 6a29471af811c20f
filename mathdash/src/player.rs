//! Player controller: run, jump, slide and shoot.

use anyhow::Result;

use crate::animation::Animator;
use crate::config::PlayerConfig;
use crate::input::{Action, InputState};
use crate::math::Vec2;
use crate::physics::{BodyDesc, ColliderShape, PhysicsWorld};
use crate::world::{EntityId, Tag, Transform, World};

/// Gap between the collider bottom and the ground probe origin.
const PROBE_GAP: f32 = 0.02;

/// What the controller decided this frame; the game applies it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlayerFrame {
    pub velocity: Vec2,
    pub jumped: bool,
    pub slide_started: bool,
    pub slide_ended: bool,
    /// A bullet was taken from the magazine and must be spawned.
    pub fired: bool,
    /// `|axis|`, fed to the `Speed` animation parameter.
    pub speed: f32,
}

/// Per-level player state. Ammunition lives here, so a level reload empties it.
#[derive(Clone, Debug)]
pub struct PlayerController {
    ammo: u32,
    facing_right: bool,
    grounded: bool,
    sliding: bool,
    slide_timer: f32,
}

impl Default for PlayerController {
    fn default() -> Self {
        Self {
            ammo: 0,
            facing_right: true,
            grounded: false,
            sliding: false,
            slide_timer: 0.0,
        }
    }
}

impl PlayerController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one frame of control.
    ///
    /// `velocity` is the body's current velocity; only the component the
    /// input changes is replaced.
    pub fn control(
        &mut self,
        config: &PlayerConfig,
        input: &InputState,
        grounded: bool,
        velocity: Vec2,
        dt: f32,
    ) -> PlayerFrame {
        self.grounded = grounded;
        let axis = input.horizontal_axis();
        let mut frame = PlayerFrame {
            velocity,
            speed: axis.abs(),
            ..PlayerFrame::default()
        };

        if input.is_pressed(Action::Jump) && self.grounded {
            frame.velocity.y = config.jump_force;
            frame.jumped = true;
        }

        if input.is_pressed(Action::Slide) && self.grounded && !self.sliding {
            self.sliding = true;
            self.slide_timer = config.slide_duration;
            frame.slide_started = true;
        }

        if input.is_pressed(Action::Shoot) && self.take_bullet() {
            frame.fired = true;
        }

        if self.sliding {
            self.slide_timer -= dt;
            frame.velocity.x = self.facing_sign() * config.slide_speed;
            if self.slide_timer <= 0.0 {
                self.sliding = false;
                frame.slide_ended = true;
            }
        } else {
            frame.velocity.x = axis * config.move_speed;
        }

        if (axis > 0.0 && !self.facing_right) || (axis < 0.0 && self.facing_right) {
            self.facing_right = !self.facing_right;
        }

        frame
    }

    /// Returns the new total.
    pub fn add_bullets(&mut self, amount: u32) -> u32 {
        self.ammo = self.ammo.saturating_add(amount);
        self.ammo
    }

    /// Take one bullet if any is left.
    pub fn take_bullet(&mut self) -> bool {
        if self.ammo == 0 {
            return false;
        }
        self.ammo -= 1;
        true
    }

    pub fn ammo(&self) -> u32 {
        self.ammo
    }

    pub fn facing_right(&self) -> bool {
        self.facing_right
    }

    /// +1 facing right, -1 facing left.
    pub fn facing_sign(&self) -> f32 {
        if self.facing_right {
            1.0
        } else {
            -1.0
        }
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    pub fn is_sliding(&self) -> bool {
        self.sliding
    }

    /// Muzzle position for a player centered at `position`.
    pub fn fire_point(&self, config: &PlayerConfig, position: Vec2) -> Vec2 {
        position + Vec2::new(config.fire_offset.x * self.facing_sign(), config.fire_offset.y)
    }
}

/// Probe straight down from just below the player's feet.
pub fn probe_ground(physics: &PhysicsWorld, config: &PlayerConfig, position: Vec2) -> bool {
    let origin = position - Vec2::new(0.0, config.half_extents.y + PROBE_GAP);
    physics
        .cast_ray(origin, Vec2::new(0.0, -1.0), config.ground_check_radius)
        .is_some()
}

pub fn spawn_player(
    world: &mut World,
    physics: &mut PhysicsWorld,
    config: &PlayerConfig,
    position: Vec2,
) -> Result<EntityId> {
    let id = world.spawn(Tag::Player);
    world.insert(id, Transform::new(position));
    world.insert(id, PlayerController::new());
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
    log::debug!("Spawned player {} at ({:.1}, {:.1})", id.to_u32(), position.x, position.y);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn pressed(actions: &[Action]) -> InputState {
        let mut input = InputState::new();
        for action in actions {
            input.press(*action);
        }
        input
    }

    #[test]
    fn jump_needs_ground() {
        let config = PlayerConfig::default();
        let mut player = PlayerController::new();
        let input = pressed(&[Action::Jump]);

        let air = player.control(&config, &input, false, Vec2::new(0.0, -1.0), DT);
        assert!(!air.jumped);
        assert_eq!(air.velocity.y, -1.0);

        let ground = player.control(&config, &input, true, Vec2::ZERO, DT);
        assert!(ground.jumped);
        assert_eq!(ground.velocity.y, 10.0);
    }

    #[test]
    fn runs_and_flips_with_axis() {
        let config = PlayerConfig::default();
        let mut player = PlayerController::new();
        let frame = player.control(&config, &pressed(&[Action::MoveLeft]), true, Vec2::ZERO, DT);
        assert_eq!(frame.velocity.x, -5.0);
        assert_eq!(frame.speed, 1.0);
        assert!(!player.facing_right());

        let idle = player.control(&config, &InputState::new(), true, Vec2::ZERO, DT);
        assert_eq!(idle.velocity.x, 0.0);
        assert!(!player.facing_right(), "facing is kept without input");
    }

    #[test]
    fn slide_lasts_its_duration() {
        let config = PlayerConfig::default();
        let mut player = PlayerController::new();
        let start = player.control(&config, &pressed(&[Action::Slide]), true, Vec2::ZERO, DT);
        assert!(start.slide_started);
        assert_eq!(start.velocity.x, 8.0);

        let mut ended_after = None;
        for frame_index in 1..60 {
            let frame = player.control(&config, &InputState::new(), true, Vec2::ZERO, DT);
            if frame.slide_ended {
                ended_after = Some(frame_index);
                break;
            }
            assert_eq!(frame.velocity.x, 8.0);
        }
        // 0.5 s at 60 Hz, counting the starting frame.
        assert!(matches!(ended_after, Some(29..=30)), "ended after {ended_after:?}");
        assert!(!player.is_sliding());
    }

    #[test]
    fn shooting_spends_ammo() {
        let config = PlayerConfig::default();
        let mut player = PlayerController::new();
        let input = pressed(&[Action::Shoot]);

        assert!(!player.control(&config, &input, true, Vec2::ZERO, DT).fired);
        assert_eq!(player.add_bullets(2), 2);
        assert!(player.control(&config, &input, true, Vec2::ZERO, DT).fired);
        assert_eq!(player.ammo(), 1);
        assert!(player.take_bullet());
        assert!(!player.take_bullet());
        assert_eq!(player.ammo(), 0);
    }

    #[test]
    fn fire_point_follows_facing() {
        let config = PlayerConfig::default();
        let mut player = PlayerController::new();
        assert_eq!(player.fire_point(&config, Vec2::ZERO), Vec2::new(0.7, 0.2));
        player.control(&config, &pressed(&[Action::MoveLeft]), true, Vec2::ZERO, DT);
        assert_eq!(player.fire_point(&config, Vec2::ZERO), Vec2::new(-0.7, 0.2));
    }

    #[test]
    fn ground_probe_finds_floor() {
        let mut world = World::new();
        let mut physics = PhysicsWorld::with_gravity(Vec2::new(0.0, -9.81));
        let config = PlayerConfig::default();

        let ground = world.spawn(Tag::Ground);
        physics.create_body(ground, BodyDesc::fixed(Vec2::new(0.0, -0.5))).unwrap();
        physics.add_collider(ground, ColliderShape::Box { hx: 20.0, hy: 0.5 }, 0.7).unwrap();
        let player = spawn_player(&mut world, &mut physics, &config, Vec2::new(0.0, 3.0)).unwrap();

        physics.step(DT);
        let airborne = physics.body_position(player).unwrap();
        assert!(!probe_ground(&physics, &config, airborne));

        for _ in 0..120 {
            physics.step(DT);
        }
        let landed = physics.body_position(player).unwrap();
        assert!(probe_ground(&physics, &config, landed), "player at {landed:?}");
    }
}
