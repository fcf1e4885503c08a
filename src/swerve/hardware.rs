// Capability interfaces between a swerve module and its hardware
//
// A module only sees these three traits, so real bus-backed devices and the
// simulated plant in `sim` are interchangeable.

/// Absolute steering angle sensor (e.g. a magnetic encoder on the steering shaft)
pub trait AngleSensor: Send {
    /// Latest absolute reading in degrees, nominally [0, 360)
    ///
    /// A sensor that has stopped updating keeps returning its last value.
    fn read_absolute_angle_degrees(&mut self) -> f64;
}

/// Wheel drive motor
pub trait DriveActuator: Send {
    /// Velocity or open-loop command; units are owned by the actuator
    fn set_drive_command(&mut self, command: f64);
}

/// Steering motor
pub trait SteeringActuator: Send {
    /// Bounded control output, nominally [-1, 1]
    fn set_steering_command(&mut self, command: f64);
}
