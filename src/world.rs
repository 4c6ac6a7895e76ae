use std::collections::HashMap;

use nalgebra::{UnitQuaternion, Vector3};

// ---------------------------------------------------------------------------
// Entity lookup table
// ---------------------------------------------------------------------------
//
// The simulation owns entity lifetimes; the controller only holds stable
// integer handles and resolves them through this table each use. A handle
// that no longer resolves (entity closed or removed) is an expected state,
// not an error.

/// Stable handle for a simulated entity (vehicle, station, debris...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub u64);

/// Stable handle for a sub-block mounted on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub u64);

/// Live kinematic state of a simulated entity.
#[derive(Debug, Clone)]
pub struct Entity {
    pub position: Vector3<f64>,         // m, world, center
    pub velocity: Vector3<f64>,         // m/s, world
    pub acceleration: Vector3<f64>,     // m/s^2, world
    pub orientation: UnitQuaternion<f64>,
    pub closed: bool,
}

impl Entity {
    pub fn at_rest(position: Vector3<f64>) -> Self {
        Self {
            position,
            velocity: Vector3::zeros(),
            acceleration: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            closed: false,
        }
    }
}

/// A sub-block: owned by an entity, placed at a local offset.
#[derive(Debug, Clone)]
pub struct Block {
    pub owner: EntityId,
    pub local_position: Vector3<f64>,
    pub closed: bool,
}

/// Lookup table resolving handles to live state.
#[derive(Debug, Default)]
pub struct World {
    entities: HashMap<EntityId, Entity>,
    blocks: HashMap<BlockId, Block>,
    next_id: u64,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        self.next_id += 1;
        let id = EntityId(self.next_id);
        self.entities.insert(id, entity);
        id
    }

    pub fn mount_block(&mut self, owner: EntityId, local_position: Vector3<f64>) -> BlockId {
        self.next_id += 1;
        let id = BlockId(self.next_id);
        self.blocks.insert(
            id,
            Block {
                owner,
                local_position,
                closed: false,
            },
        );
        id
    }

    /// Resolve an entity handle. `None` if unknown or closed.
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id).filter(|e| !e.closed)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id).filter(|e| !e.closed)
    }

    /// Resolve a block handle. `None` if unknown, closed, or its owner is gone.
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        let block = self.blocks.get(&id).filter(|b| !b.closed)?;
        self.entity(block.owner)?;
        Some(block)
    }

    /// World position of a block (owner position + rotated local offset).
    pub fn block_position(&self, id: BlockId) -> Option<Vector3<f64>> {
        let block = self.block(id)?;
        let owner = self.entity(block.owner)?;
        Some(owner.position + owner.orientation.transform_vector(&block.local_position))
    }

    /// Mark an entity closed; its handles stop resolving.
    pub fn close(&mut self, id: EntityId) {
        if let Some(e) = self.entities.get_mut(&id) {
            e.closed = true;
        }
    }

    pub fn close_block(&mut self, id: BlockId) {
        if let Some(b) = self.blocks.get_mut(&id) {
            b.closed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_entity_stops_resolving() {
        let mut world = World::new();
        let id = world.spawn(Entity::at_rest(Vector3::new(1.0, 2.0, 3.0)));
        assert!(world.entity(id).is_some());
        world.close(id);
        assert!(world.entity(id).is_none());
    }

    #[test]
    fn block_resolution_requires_live_owner() {
        let mut world = World::new();
        let owner = world.spawn(Entity::at_rest(Vector3::zeros()));
        let block = world.mount_block(owner, Vector3::new(0.0, 5.0, 0.0));
        assert!(world.block(block).is_some());
        world.close(owner);
        assert!(world.block(block).is_none());
    }

    #[test]
    fn block_position_applies_owner_orientation() {
        let mut world = World::new();
        let owner = world.spawn(Entity::at_rest(Vector3::new(10.0, 0.0, 0.0)));
        let block = world.mount_block(owner, Vector3::new(0.0, 0.0, -2.0));
        world.entity_mut(owner).unwrap().orientation =
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f64::consts::FRAC_PI_2);
        let pos = world.block_position(block).unwrap();
        assert!((pos - Vector3::new(8.0, 0.0, 0.0)).norm() < 1e-9);
    }
}
