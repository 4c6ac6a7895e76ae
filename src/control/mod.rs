pub mod actuators;
pub mod mover;
pub mod profiler;

pub use actuators::{Actuators, MoveCommand};
pub use mover::{max_speed, AxisState, Mover, MoverConfig};
pub use profiler::{ActuatorHandle, RotationProfile, TorqueActuator};
