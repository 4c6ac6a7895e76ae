use nalgebra::{UnitQuaternion, Vector3};

// ---------------------------------------------------------------------------
// Local-frame conventions
// ---------------------------------------------------------------------------
//
// The controlling block's frame: +X right, +Y up, -Z forward. Azimuth and
// elevation in `control::mover` assume this layout.

/// The six cardinal directions of the controlling block's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction6 {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

impl Direction6 {
    /// Unit vector in the block's local frame.
    pub fn unit(self) -> Vector3<f64> {
        match self {
            Direction6::Forward => Vector3::new(0.0, 0.0, -1.0),
            Direction6::Backward => Vector3::new(0.0, 0.0, 1.0),
            Direction6::Left => Vector3::new(-1.0, 0.0, 0.0),
            Direction6::Right => Vector3::new(1.0, 0.0, 0.0),
            Direction6::Up => Vector3::new(0.0, 1.0, 0.0),
            Direction6::Down => Vector3::new(0.0, -1.0, 0.0),
        }
    }

    /// The opposite direction.
    pub fn flip(self) -> Direction6 {
        match self {
            Direction6::Forward => Direction6::Backward,
            Direction6::Backward => Direction6::Forward,
            Direction6::Left => Direction6::Right,
            Direction6::Right => Direction6::Left,
            Direction6::Up => Direction6::Down,
            Direction6::Down => Direction6::Up,
        }
    }

    /// Direction along a local axis index (0 = X, 1 = Y, 2 = Z).
    pub fn along(axis: usize, positive: bool) -> Direction6 {
        debug_assert!(axis < 3, "axis index out of range: {}", axis);
        match (axis, positive) {
            (0, true) => Direction6::Right,
            (0, false) => Direction6::Left,
            (1, true) => Direction6::Up,
            (1, false) => Direction6::Down,
            (_, true) => Direction6::Backward,
            (_, false) => Direction6::Forward,
        }
    }
}

// ---------------------------------------------------------------------------
// Thrust capacity: asymmetric, per cardinal direction
// ---------------------------------------------------------------------------

/// Currently available thrust force (N) in each cardinal local direction.
///
/// Capacities are asymmetric: a freighter with one big aft engine has far
/// more `forward` than `backward` force. Values already account for damage
/// and power state; they are queried fresh each tick by the caller.
#[derive(Debug, Clone, Copy)]
pub struct ThrustCapacity {
    pub forward: f64,
    pub backward: f64,
    pub left: f64,
    pub right: f64,
    pub up: f64,
    pub down: f64,
}

impl ThrustCapacity {
    /// Equal capacity in every direction.
    pub fn uniform(force: f64) -> Self {
        Self {
            forward: force,
            backward: force,
            left: force,
            right: force,
            up: force,
            down: force,
        }
    }

    /// Available force (N) in the given local direction.
    pub fn available(&self, dir: Direction6) -> f64 {
        match dir {
            Direction6::Forward => self.forward,
            Direction6::Backward => self.backward,
            Direction6::Left => self.left,
            Direction6::Right => self.right,
            Direction6::Up => self.up,
            Direction6::Down => self.down,
        }
    }

    /// True if some thrust is available on every axis in both senses.
    pub fn can_move_any_direction(&self) -> bool {
        self.forward > 0.0
            && self.backward > 0.0
            && self.left > 0.0
            && self.right > 0.0
            && self.up > 0.0
            && self.down > 0.0
    }
}

// ---------------------------------------------------------------------------
// Per-tick kinematic snapshot
// ---------------------------------------------------------------------------

/// Kinematics of the controlling block, captured once per tick.
#[derive(Debug, Clone)]
pub struct BodyState {
    pub tick: u64,
    pub time: f64,                      // s, simulated
    pub position: Vector3<f64>,         // m, world
    pub velocity: Vector3<f64>,         // m/s, world
    pub orientation: UnitQuaternion<f64>, // local -> world rotation
    pub angular_velocity: Vector3<f64>, // rad/s, world
    pub mass: f64,                      // kg
}

impl BodyState {
    /// Transform a world-frame direction into the block's local frame.
    pub fn to_local(&self, world: &Vector3<f64>) -> Vector3<f64> {
        self.orientation.inverse_transform_vector(world)
    }

    /// Transform a local-frame direction into the world frame.
    pub fn to_world(&self, local: &Vector3<f64>) -> Vector3<f64> {
        self.orientation.transform_vector(local)
    }
}
