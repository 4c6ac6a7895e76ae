use nalgebra::{Vector2, Vector3};

// ---------------------------------------------------------------------------
// Actuator submission interface
// ---------------------------------------------------------------------------

/// One tick's worth of actuator input, in hardware units: thrust ratio per
/// local axis in [-1, 1], rotation as pitch/yaw pixel-equivalents plus roll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveCommand {
    pub thrust_ratio: Vector3<f64>,
    pub pitch_yaw: Vector2<f64>,
    pub roll: f64,
}

/// Fire-and-forget per-tick command sink.
///
/// `full_stop` is distinct from an all-zero `move_and_rotate`: the hardware
/// treats "all zero" as "pilot idle" and will not arrest residual motion.
pub trait Actuators {
    fn move_and_rotate(&mut self, command: MoveCommand);
    fn full_stop(&mut self);
    /// Enable or disable the vehicle's built-in velocity dampers.
    fn set_dampeners(&mut self, enabled: bool);
}
