// Swerve module control core for an independently steered, independently driven wheel base
//
// Provides:
// - 2D vector math for chassis/module velocities
// - Continuous-heading PID controller (wraps across ±180°)
// - Module inverse kinematics with 180° flip optimization
// - The per-module command/control state machine
// - Hardware capability traits and a simulated plant

mod error;
pub mod hardware;
pub mod heading;
pub mod kinematics;
mod module;
pub mod sim;
pub mod vector;

pub use error::ConfigError;
pub use hardware::{AngleSensor, DriveActuator, SteeringActuator};
pub use heading::{HeadingController, HeadingGains, wrap_degrees};
pub use kinematics::{HeadingTarget, ModuleGeometry};
pub use module::{
    DEFAULT_PERIOD_S, ModuleCommand, ModuleOutput, SwerveModule, SwerveModuleBuilder, validate_gains,
};
pub use vector::{DegenerateVectorError, Vector2};
