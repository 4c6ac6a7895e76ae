pub mod body;
pub mod control;
pub mod settings;
pub mod sim;
pub mod target;
pub mod world;

// Flat re-exports for the common path: build a ship, aim it, fly it.
pub use body::{BodyState, Direction6, ThrustCapacity};
pub use control::{Actuators, MoveCommand, Mover, MoverConfig};
pub use settings::{NavMode, NavSettings, Permissions, Scope, ScopeLevel};
pub use target::{aim_point, Destination, LastSeen, TargetSample};
pub use world::{BlockId, EntityId, World};
