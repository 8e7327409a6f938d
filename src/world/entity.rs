//! Tracked-entity bookkeeping consumed by follow mode.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::geom::Vec3;

/// Identifier of a tracked entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntityId(pub u32);

/// Thread-safe store of last-known entity positions.
///
/// Updated by whatever ingests world state (out of scope here); the
/// navigator only reads from it.
pub struct EntityRegistry {
    entities: RwLock<HashMap<EntityId, Vec3>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or update an entity's position.
    pub fn upsert(&self, id: EntityId, position: Vec3) {
        self.entities.write().insert(id, position);
    }

    /// Remove an entity that left tracking range.
    pub fn remove(&self, id: EntityId) {
        self.entities.write().remove(&id);
    }

    /// Last known position, `None` once the entity has disappeared.
    pub fn position(&self, id: EntityId) -> Option<Vec3> {
        self.entities.read().get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
