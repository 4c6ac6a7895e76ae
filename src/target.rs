use nalgebra::Vector3;

use crate::world::{BlockId, EntityId, World};

// ---------------------------------------------------------------------------
// Last-seen samples
// ---------------------------------------------------------------------------

/// Samples older than this (simulated seconds) must not be used for direct
/// position reads; the predictor extrapolates instead.
pub const RECENCY_WINDOW: f64 = 10.0;

/// One observation of a target. Immutable; replaced wholesale on each new
/// observation.
#[derive(Debug, Clone, Copy)]
pub struct LastSeen {
    pub position: Vector3<f64>,     // m, world
    pub velocity: Vector3<f64>,     // m/s, world
    pub acceleration: Vector3<f64>, // m/s^2, world
    pub seen_at: f64,               // s, simulated
}

impl LastSeen {
    pub fn age(&self, now: f64) -> f64 {
        now - self.seen_at
    }

    pub fn is_recent(&self, now: f64) -> bool {
        self.age(now) <= RECENCY_WINDOW
    }

    /// Linear extrapolation from the sample. No acceleration term: after
    /// losing contact, acceleration is assumed unknown.
    pub fn predict_position(&self, now: f64) -> Vector3<f64> {
        self.position + self.velocity * self.age(now)
    }
}

// ---------------------------------------------------------------------------
// Destination descriptors
// ---------------------------------------------------------------------------

/// Where the controller is being sent. Entity-relative kinds carry the
/// observation sample they were built from; handles are resolved through the
/// world table on every read.
#[derive(Debug, Clone)]
pub enum Destination {
    None,
    /// Fixed world point.
    Coordinate { point: Vector3<f64> },
    /// Fixed world point from a route; same resolution as `Coordinate`.
    Waypoint { point: Vector3<f64> },
    /// Center of a target entity.
    Grid { entity: EntityId, last_seen: LastSeen },
    /// A specific block on a target entity.
    Block {
        entity: EntityId,
        block: BlockId,
        last_seen: LastSeen,
    },
    /// Target entity plus an offset in its local frame.
    Offset {
        entity: EntityId,
        offset: Vector3<f64>,
        last_seen: LastSeen,
    },
    /// Landing approach: a block plus a local-frame standoff offset.
    Landing {
        entity: EntityId,
        block: BlockId,
        offset: Vector3<f64>,
        last_seen: LastSeen,
    },
}

impl Destination {
    pub fn is_none(&self) -> bool {
        matches!(self, Destination::None)
    }

    /// True if every handle in the descriptor still resolves. For block
    /// kinds the block's owner must be the referenced entity.
    pub fn is_valid(&self, world: &World) -> bool {
        match *self {
            Destination::None => false,
            Destination::Coordinate { .. } | Destination::Waypoint { .. } => true,
            Destination::Grid { entity, .. } | Destination::Offset { entity, .. } => {
                world.entity(entity).is_some()
            }
            Destination::Block { entity, block, .. }
            | Destination::Landing { entity, block, .. } => match world.block(block) {
                Some(b) => b.owner == entity,
                None => false,
            },
        }
    }

    /// Resolve to a concrete world-frame sample, or `None` if any handle is
    /// dead — callers treat `None` as "no destination", never an error.
    ///
    /// Recent samples read the live entity (local-frame offset applied);
    /// stale samples extrapolate position linearly with zero acceleration.
    pub fn resolve(&self, world: &World, now: f64) -> Option<TargetSample> {
        match *self {
            Destination::None => None,
            Destination::Coordinate { point } | Destination::Waypoint { point } => {
                Some(TargetSample::fixed(point))
            }
            Destination::Grid { entity, last_seen } => {
                self.resolve_entity(world, now, entity, None, None, last_seen)
            }
            Destination::Offset {
                entity,
                offset,
                last_seen,
            } => self.resolve_entity(world, now, entity, None, Some(offset), last_seen),
            Destination::Block {
                entity,
                block,
                last_seen,
            } => self.resolve_entity(world, now, entity, Some(block), None, last_seen),
            Destination::Landing {
                entity,
                block,
                offset,
                last_seen,
            } => self.resolve_entity(world, now, entity, Some(block), Some(offset), last_seen),
        }
    }

    fn resolve_entity(
        &self,
        world: &World,
        now: f64,
        entity: EntityId,
        block: Option<BlockId>,
        offset: Option<Vector3<f64>>,
        last_seen: LastSeen,
    ) -> Option<TargetSample> {
        if !self.is_valid(world) {
            return None;
        }
        if last_seen.is_recent(now) {
            let live = world.entity(entity)?;
            let mut position = match block {
                Some(b) => world.block_position(b)?,
                None => live.position,
            };
            if let Some(off) = offset {
                position += live.orientation.transform_vector(&off);
            }
            Some(TargetSample {
                position,
                velocity: live.velocity,
                acceleration: live.acceleration,
            })
        } else {
            log::trace!(
                "stale sample ({:.1}s old), extrapolating position",
                last_seen.age(now)
            );
            Some(TargetSample {
                position: last_seen.predict_position(now),
                velocity: last_seen.velocity,
                acceleration: Vector3::zeros(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Interception predictor
// ---------------------------------------------------------------------------

/// A destination resolved to concrete world-frame kinematics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetSample {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub acceleration: Vector3<f64>,
}

impl TargetSample {
    pub fn fixed(position: Vector3<f64>) -> Self {
        Self {
            position,
            velocity: Vector3::zeros(),
            acceleration: Vector3::zeros(),
        }
    }
}

/// Lead a moving target: aim where it will be, not where it is.
///
/// Time-to-intercept is estimated from the perpendicular distance between
/// the observer and the target's velocity line, divided by observer speed
/// (floored at 1 m/s so a near-stationary observer cannot produce an
/// unbounded lead). The target is then projected forward under constant
/// velocity plus half-acceleration.
pub fn aim_point(
    target: &TargetSample,
    observer_position: Vector3<f64>,
    observer_velocity: Vector3<f64>,
) -> Vector3<f64> {
    let speed_sq = target.velocity.norm_squared();
    if speed_sq < 1e-12 {
        return target.position;
    }

    let to_observer = observer_position - target.position;
    let perpendicular = (target.velocity / speed_sq.sqrt()).cross(&to_observer).norm();
    let observer_speed = observer_velocity.norm().max(1.0);
    let seconds = perpendicular / observer_speed;

    target.position + target.velocity * seconds + target.acceleration * (seconds * seconds * 0.5)
}
