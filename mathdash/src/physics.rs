use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::math::Vec2;
use crate::world::EntityId;

// Rapier is private implementation detail: do NOT re-export it.
use rapier2d::prelude::*;

/// Game-facing rigid body type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RigidBodyType {
    Dynamic,
    Kinematic,
    Fixed,
}

/// Game-facing collider shape.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    Box { hx: f32, hy: f32 },
    Circle { radius: f32 },
}

/// Game-facing collision event. Uses EntityId only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhysicsEvent {
    CollisionEnter { a: EntityId, b: EntityId },
    CollisionExit { a: EntityId, b: EntityId },
    TriggerEnter { a: EntityId, b: EntityId },
    TriggerExit { a: EntityId, b: EntityId },
}

/// Everything needed to create a body for an entity.
#[derive(Clone, Copy, Debug)]
pub struct BodyDesc {
    pub body_type: RigidBodyType,
    pub position: Vec2,
    pub gravity_scale: f32,
    pub lock_rotations: bool,
}

impl BodyDesc {
    pub fn dynamic(position: Vec2) -> Self {
        Self {
            body_type: RigidBodyType::Dynamic,
            position,
            gravity_scale: 1.0,
            lock_rotations: true,
        }
    }

    pub fn fixed(position: Vec2) -> Self {
        Self {
            body_type: RigidBodyType::Fixed,
            position,
            gravity_scale: 1.0,
            lock_rotations: true,
        }
    }

    #[must_use]
    pub fn with_gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }
}

pub struct PhysicsWorld {
    // --- rapier internals ---
    pipeline: PhysicsPipeline,
    integration_parameters: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    rigid_bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,

    // Event channels
    event_recv_collision: crossbeam_channel::Receiver<CollisionEvent>,
    // Contact forces are not used by gameplay but the collector needs a sink.
    _event_recv_contact_force: crossbeam_channel::Receiver<ContactForceEvent>,
    event_handler: ChannelEventCollector,

    // --- mappings (game <-> rapier) ---
    entity_to_body: HashMap<EntityId, RigidBodyHandle>,
    body_to_entity: HashMap<RigidBodyHandle, EntityId>,

    gravity: Vec2,

    // Collected game-facing events for the frame
    pending_events: Vec<PhysicsEvent>,
}

impl PhysicsWorld {
    pub fn with_gravity(gravity: Vec2) -> Self {
        let (send_col, recv_col) = crossbeam_channel::unbounded();
        let (send_force, recv_force) = crossbeam_channel::unbounded();
        let event_handler = ChannelEventCollector::new(send_col, send_force);

        Self {
            pipeline: PhysicsPipeline::new(),
            integration_parameters: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),

            event_recv_collision: recv_col,
            _event_recv_contact_force: recv_force,
            event_handler,

            entity_to_body: HashMap::new(),
            body_to_entity: HashMap::new(),

            gravity,
            pending_events: Vec::new(),
        }
    }

    /// Drop every body and collider, keeping gravity. Used on level reload.
    pub fn clear(&mut self) {
        let gravity = self.gravity;
        *self = Self::with_gravity(gravity);
    }

    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    /// Create/replace the body for an entity.
    pub fn create_body(&mut self, entity: EntityId, desc: BodyDesc) -> Result<()> {
        // Remove existing body if any (keeps invariant 1 body per entity).
        self.remove_body(entity);

        let rb_type = match desc.body_type {
            RigidBodyType::Dynamic => rapier2d::prelude::RigidBodyType::Dynamic,
            RigidBodyType::Kinematic => rapier2d::prelude::RigidBodyType::KinematicPositionBased,
            RigidBodyType::Fixed => rapier2d::prelude::RigidBodyType::Fixed,
        };

        let mut builder = RigidBodyBuilder::new(rb_type)
            .translation(vector![desc.position.x, desc.position.y])
            .gravity_scale(desc.gravity_scale);

        if desc.lock_rotations {
            builder = builder.lock_rotations();
        }

        // CCD keeps fast bullets from tunnelling through thin enemies.
        if matches!(desc.body_type, RigidBodyType::Dynamic) {
            builder = builder.ccd_enabled(true);
        }

        let handle = self.rigid_bodies.insert(builder.build());
        self.entity_to_body.insert(entity, handle);
        self.body_to_entity.insert(handle, entity);
        Ok(())
    }

    /// Remove a body (and its colliders) for an entity. Returns whether one existed.
    pub fn remove_body(&mut self, entity: EntityId) -> bool {
        if let Some(handle) = self.entity_to_body.remove(&entity) {
            self.rigid_bodies.remove(
                handle,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            );
            self.body_to_entity.remove(&handle);
            true
        } else {
            false
        }
    }

    /// Add a solid collider that reports contacts.
    pub fn add_collider(&mut self, entity: EntityId, shape: ColliderShape, friction: f32) -> Result<()> {
        let body = self.body_handle(entity)?;

        let collider = ColliderBuilder::new(to_rapier_shape(shape))
            .density(1.0)
            .friction(friction)
            .restitution(0.0)
            .sensor(false)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();

        self.colliders
            .insert_with_parent(collider, body, &mut self.rigid_bodies);

        Ok(())
    }

    /// Add a sensor (trigger volume).
    pub fn add_sensor(&mut self, entity: EntityId, shape: ColliderShape) -> Result<()> {
        let body = self.body_handle(entity)?;

        let collider = ColliderBuilder::new(to_rapier_shape(shape))
            .sensor(true)
            // ensure we get collision events for sensors:
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();

        self.colliders
            .insert_with_parent(collider, body, &mut self.rigid_bodies);

        Ok(())
    }

    /// Step simulation by fixed dt (seconds).
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;

        let gravity = vector![self.gravity.x, self.gravity.y];
        let hooks = &();

        self.pipeline.step(
            &gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            hooks,
            &self.event_handler,
        );

        self.query_pipeline
            .update(&self.island_manager, &self.rigid_bodies, &self.colliders);

        self.collect_events();
    }

    /// Drain physics events collected since last drain.
    pub fn drain_events(&mut self) -> Vec<PhysicsEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn body_position(&self, entity: EntityId) -> Option<Vec2> {
        let h = *self.entity_to_body.get(&entity)?;
        let b = self.rigid_bodies.get(h)?;
        let t = b.translation();
        Some(Vec2::new(t.x, t.y))
    }

    pub fn linear_velocity(&self, entity: EntityId) -> Option<Vec2> {
        let h = *self.entity_to_body.get(&entity)?;
        let b = self.rigid_bodies.get(h)?;
        let v = b.linvel();
        Some(Vec2::new(v.x, v.y))
    }

    pub fn set_linear_velocity(&mut self, entity: EntityId, vel: Vec2) {
        if let Some(h) = self.entity_to_body.get(&entity).copied() {
            if let Some(b) = self.rigid_bodies.get_mut(h) {
                b.set_linvel(vector![vel.x, vel.y], true);
            }
        }
    }

    /// Return true if an entity currently has a physics body.
    pub fn has_body(&self, entity: EntityId) -> bool {
        self.entity_to_body.contains_key(&entity)
    }

    /// Entities that currently own a body.
    pub fn entities_with_bodies(&self) -> Vec<EntityId> {
        self.entity_to_body.keys().copied().collect()
    }

    /// First hit along a ray, as `(entity, hit point, time of impact)`.
    pub fn cast_ray(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_toi: f32,
    ) -> Option<(EntityId, Vec2, f32)> {
        let ray = Ray::new(
            point![origin.x, origin.y],
            vector![direction.x, direction.y],
        );

        let (col_handle, toi) = self.query_pipeline.cast_ray(
            &self.rigid_bodies,
            &self.colliders,
            &ray,
            max_toi,
            true,
            QueryFilter::default().exclude_sensors(),
        )?;

        let collider = self.colliders.get(col_handle)?;
        let body = collider.parent()?;
        let entity = *self.body_to_entity.get(&body)?;

        let hit = ray.point_at(toi);
        Some((entity, Vec2::new(hit.x, hit.y), toi))
    }

    fn body_handle(&self, entity: EntityId) -> Result<RigidBodyHandle> {
        self.entity_to_body
            .get(&entity)
            .copied()
            .ok_or_else(|| anyhow!("Entity {:?} has no physics body", entity))
    }

    fn collect_events(&mut self) {
        while let Ok(ev) = self.event_recv_collision.try_recv() {
            match ev {
                CollisionEvent::Started(c1, c2, _) => {
                    if let Some((a, b, is_trigger)) = self.map_pair(c1, c2) {
                        let e = if is_trigger {
                            PhysicsEvent::TriggerEnter { a, b }
                        } else {
                            PhysicsEvent::CollisionEnter { a, b }
                        };
                        self.pending_events.push(e);
                    }
                }
                CollisionEvent::Stopped(c1, c2, _) => {
                    if let Some((a, b, is_trigger)) = self.map_pair(c1, c2) {
                        let e = if is_trigger {
                            PhysicsEvent::TriggerExit { a, b }
                        } else {
                            PhysicsEvent::CollisionExit { a, b }
                        };
                        self.pending_events.push(e);
                    }
                }
            }
        }
    }

    fn map_pair(
        &self,
        c1: ColliderHandle,
        c2: ColliderHandle,
    ) -> Option<(EntityId, EntityId, bool)> {
        let col1 = self.colliders.get(c1)?;
        let col2 = self.colliders.get(c2)?;
        let b1 = col1.parent()?;
        let b2 = col2.parent()?;
        let e1 = *self.body_to_entity.get(&b1)?;
        let e2 = *self.body_to_entity.get(&b2)?;

        // sensor if either collider is a sensor
        let is_trigger = col1.is_sensor() || col2.is_sensor();
        Some((e1, e2, is_trigger))
    }
}

fn to_rapier_shape(s: ColliderShape) -> SharedShape {
    match s {
        ColliderShape::Box { hx, hy } => SharedShape::cuboid(hx, hy),
        ColliderShape::Circle { radius } => SharedShape::ball(radius),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Tag, World};

    fn ground_and_box(world: &mut World, physics: &mut PhysicsWorld) -> (EntityId, EntityId) {
        let ground = world.spawn(Tag::Ground);
        physics
            .create_body(ground, BodyDesc::fixed(Vec2::new(0.0, -0.5)))
            .unwrap();
        physics
            .add_collider(ground, ColliderShape::Box { hx: 50.0, hy: 0.5 }, 0.7)
            .unwrap();

        let crate_box = world.spawn(Tag::Enemy);
        physics
            .create_body(crate_box, BodyDesc::dynamic(Vec2::new(0.0, 2.0)))
            .unwrap();
        physics
            .add_collider(crate_box, ColliderShape::Box { hx: 0.5, hy: 0.5 }, 0.7)
            .unwrap();
        (ground, crate_box)
    }

    #[test]
    fn dynamic_body_falls_onto_ground() {
        let mut world = World::new();
        let mut physics = PhysicsWorld::with_gravity(Vec2::new(0.0, -9.81));
        let (ground, crate_box) = ground_and_box(&mut world, &mut physics);

        for _ in 0..180 {
            physics.step(1.0 / 60.0);
        }

        let pos = physics.body_position(crate_box).unwrap();
        assert!(pos.y > 0.3 && pos.y < 0.7, "resting height was {}", pos.y);

        let hit = physics.cast_ray(Vec2::new(0.0, -0.02 + pos.y - 0.5), Vec2::new(0.0, -1.0), 0.2);
        assert_eq!(hit.map(|(e, _, _)| e), Some(ground));
    }

    #[test]
    fn contact_reports_collision_enter() {
        let mut world = World::new();
        let mut physics = PhysicsWorld::with_gravity(Vec2::new(0.0, -9.81));
        let (ground, crate_box) = ground_and_box(&mut world, &mut physics);

        let mut events = Vec::new();
        for _ in 0..180 {
            physics.step(1.0 / 60.0);
            events.extend(physics.drain_events());
        }

        assert!(events.iter().any(|e| matches!(
            *e,
            PhysicsEvent::CollisionEnter { a, b }
                if (a == ground && b == crate_box) || (a == crate_box && b == ground)
        )));
    }

    #[test]
    fn remove_body_forgets_entity() {
        let mut world = World::new();
        let mut physics = PhysicsWorld::with_gravity(Vec2::ZERO);
        let (_, crate_box) = ground_and_box(&mut world, &mut physics);

        assert!(physics.remove_body(crate_box));
        assert!(!physics.has_body(crate_box));
        assert!(physics.body_position(crate_box).is_none());
        assert!(physics.add_sensor(crate_box, ColliderShape::Circle { radius: 1.0 }).is_err());
    }
}
