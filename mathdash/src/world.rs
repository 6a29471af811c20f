use std::any::{Any, TypeId};
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::math::Vec2;

/// Unique identifier for an entity in the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Get the underlying integer ID (useful for logging).
    pub fn to_u32(self) -> u32 {
        self.0
    }
}

/// Collision label attached to every entity.
///
/// Gameplay decides what a contact means by looking at the tags of the two
/// entities involved, never at their component types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    Player,
    Enemy,
    Bullet,
    MathChest,
    Ground,
    Spawner,
}

impl Tag {
    /// The label the level editor and logs use for this tag.
    pub fn label(self) -> &'static str {
        match self {
            Tag::Player => "Player",
            Tag::Enemy => "Enemy",
            Tag::Bullet => "Bullet",
            Tag::MathChest => "MathChest",
            Tag::Ground => "Ground",
            Tag::Spawner => "Spawner",
        }
    }
}

/// Last known placement of an entity, synced from physics every step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec2,
    /// Sprite mirrored horizontally (facing left).
    pub flip_x: bool,
}

impl Transform {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            flip_x: false,
        }
    }
}

trait ComponentStorage {
    fn remove_entity(&mut self, entity: EntityId);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static> ComponentStorage for HashMap<EntityId, T> {
    fn remove_entity(&mut self, entity: EntityId) {
        self.remove(&entity);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Entity container for one loaded level.
///
/// - Entities are identified by `EntityId` and always carry a [`Tag`]
/// - Components are stored in one map per Rust type, keyed by `EntityId`
/// - Iteration helpers return ids sorted ascending so that a tick visits
///   entities in spawn order
pub struct World {
    next_id: u32,
    tags: HashMap<EntityId, Tag>,
    storages: HashMap<TypeId, Box<dyn ComponentStorage>>,
}

impl World {
    /// Create a new, empty world.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            tags: HashMap::new(),
            storages: HashMap::new(),
        }
    }

    /// Spawn a new entity with the given tag and return its `EntityId`.
    pub fn spawn(&mut self, tag: Tag) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.tags.insert(id, tag);
        id
    }

    /// Despawn an entity, removing it and all of its components.
    pub fn despawn(&mut self, entity: EntityId) -> bool {
        if self.tags.remove(&entity).is_none() {
            return false;
        }
        for storage in self.storages.values_mut() {
            storage.remove_entity(entity);
        }
        true
    }

    /// Remove every entity. Ids keep increasing so stale ids never alias.
    pub fn clear(&mut self) {
        self.tags.clear();
        self.storages.clear();
    }

    /// Check if an entity is currently alive.
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.tags.contains_key(&entity)
    }

    /// Tag of a live entity.
    pub fn tag(&self, entity: EntityId) -> Option<Tag> {
        self.tags.get(&entity).copied()
    }

    /// Number of alive entities.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns true if there are no entities in the world.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// All live entities carrying `tag`, in spawn order.
    pub fn with_tag(&self, tag: Tag) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .tags
            .iter()
            .filter(|(_, t)| **t == tag)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Insert a component of type `T` for an entity, overwriting any existing one.
    pub fn insert<T: 'static>(&mut self, entity: EntityId, component: T) {
        let storage = self
            .storages
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(HashMap::<EntityId, T>::new()));

        if let Some(map) = storage.as_any_mut().downcast_mut::<HashMap<EntityId, T>>() {
            map.insert(entity, component);
        }
    }

    /// Remove and return a component of type `T` for an entity, if it exists.
    pub fn remove<T: 'static>(&mut self, entity: EntityId) -> Option<T> {
        self.storage_mut::<T>()?.remove(&entity)
    }

    /// Get an immutable reference to a component of type `T` for an entity.
    pub fn get<T: 'static>(&self, entity: EntityId) -> Option<&T> {
        self.storage::<T>()?.get(&entity)
    }

    /// Get a mutable reference to a component of type `T` for an entity.
    pub fn get_mut<T: 'static>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.storage_mut::<T>()?.get_mut(&entity)
    }

    /// Ids of all entities that have a component of type `T`, in spawn order.
    ///
    /// Returning owned ids lets callers mutate the world while iterating.
    pub fn entities_with<T: 'static>(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .storage::<T>()
            .map(|map| map.keys().copied().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    fn storage<T: 'static>(&self) -> Option<&HashMap<EntityId, T>> {
        self.storages
            .get(&TypeId::of::<T>())?
            .as_any()
            .downcast_ref::<HashMap<EntityId, T>>()
    }

    fn storage_mut<T: 'static>(&mut self) -> Option<&mut HashMap<EntityId, T>> {
        self.storages
            .get_mut(&TypeId::of::<T>())?
            .as_any_mut()
            .downcast_mut::<HashMap<EntityId, T>>()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
