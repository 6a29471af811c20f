//! Bullets fired by the player.

use anyhow::Result;

use crate::config::ProjectileConfig;
use crate::math::Vec2;
use crate::physics::{BodyDesc, ColliderShape, PhysicsWorld};
use crate::scheduler::{Clock, Scheduler, TimerEvent, TimerOwner};
use crate::world::{EntityId, Tag, Transform, World};

/// Bullet state. `velocity` is re-applied every frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projectile {
    pub lifetime: f32,
    pub velocity: Vec2,
}

/// A bullet is destroyed by any contact except with the player who fired it.
pub fn destroyed_by_contact(other: Option<Tag>) -> bool {
    other != Some(Tag::Player)
}

/// Spawn a bullet moving horizontally; `direction` is +1 (right) or -1 (left).
///
/// The bullet expires after its lifetime even if it never hits anything.
pub fn spawn_projectile(
    world: &mut World,
    physics: &mut PhysicsWorld,
    scheduler: &mut Scheduler,
    config: &ProjectileConfig,
    position: Vec2,
    direction: f32,
) -> Result<EntityId> {
    let projectile = Projectile {
        lifetime: config.lifetime,
        velocity: Vec2::new(direction.signum() * config.speed, 0.0),
    };

    let id = world.spawn(Tag::Bullet);
    world.insert(id, Transform::new(position));
    world.insert(id, projectile);

    physics.create_body(id, BodyDesc::dynamic(position).with_gravity_scale(0.0))?;
    physics.add_collider(
        id,
        ColliderShape::Circle {
            radius: config.radius,
        },
        0.0,
    )?;
    physics.set_linear_velocity(id, projectile.velocity);

    scheduler.schedule(
        TimerOwner::Entity(id),
        Clock::Scaled,
        projectile.lifetime,
        TimerEvent::ProjectileExpire,
    );
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_contact_is_friendly() {
        assert!(!destroyed_by_contact(Some(Tag::Player)));
        assert!(destroyed_by_contact(Some(Tag::Enemy)));
        assert!(destroyed_by_contact(Some(Tag::Ground)));
        assert!(destroyed_by_contact(Some(Tag::Bullet)));
        assert!(destroyed_by_contact(None));
    }

    #[test]
    fn bullet_flies_straight_and_expires() {
        let mut world = World::new();
        let mut physics = PhysicsWorld::with_gravity(Vec2::new(0.0, -9.81));
        let mut scheduler = Scheduler::new();
        let config = ProjectileConfig::default();

        let id = spawn_projectile(&mut world, &mut physics, &mut scheduler, &config, Vec2::new(0.0, 5.0), -1.0).unwrap();
        for _ in 0..30 {
            physics.step(1.0 / 60.0);
        }
        let pos = physics.body_position(id).unwrap();
        assert!((pos.y - 5.0).abs() < 1e-3, "bullet dropped to {}", pos.y);
        assert!(pos.x < -4.0);

        assert!(scheduler.advance(2.9, 1.0).is_empty());
        let fired = scheduler.advance(0.2, 1.0);
        assert_eq!(fired[0].event, TimerEvent::ProjectileExpire);
        assert_eq!(fired[0].owner, TimerOwner::Entity(id));
    }
}
