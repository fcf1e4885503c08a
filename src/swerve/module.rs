// One swerve module: geometry, heading controller and its three hardware handles
//
// Command phase: `update_local_velocity` turns a chassis command into a target
// velocity and heading setpoint.
// Control phase: `periodic` runs once per fixed period, reads the sensor and drives
// both actuators.

use tracing::{debug, info};

use super::error::ConfigError;
use super::hardware::{AngleSensor, DriveActuator, SteeringActuator};
use super::heading::{HeadingController, HeadingGains, wrap_degrees};
use super::kinematics::{self, HeadingTarget, ModuleGeometry};
use super::vector::Vector2;

/// Control period used when the builder is not given one (50 Hz)
pub const DEFAULT_PERIOD_S: f64 = 0.02;

/// Latest chassis command a module was given
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModuleCommand {
    pub chassis_velocity: Vector2,
    pub rotation_rate: f64,
}

/// Everything a module emitted during one control step
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleOutput {
    pub measured_heading_deg: f64,
    pub target_heading_deg: f64,
    pub reversed: bool,
    /// Speed along the current heading before `drive_output_scale`
    pub speed: f64,
    /// Value sent to the drive actuator
    pub drive: f64,
    /// Value sent to the steering actuator
    pub steering: f64,
    pub at_setpoint: bool,
}

pub struct SwerveModule {
    name: String,
    geometry: ModuleGeometry,
    angle_offset_deg: f64,
    sensor_inverted: bool,
    drive_output_scale: f64,

    sensor: Box<dyn AngleSensor>,
    drive: Box<dyn DriveActuator>,
    steering: Box<dyn SteeringActuator>,

    controller: HeadingController,
    command: ModuleCommand,
    target_local_velocity: Vector2,
    target: HeadingTarget,
    last_heading_deg: f64,
}

impl SwerveModule {
    pub fn builder(name: impl Into<String>) -> SwerveModuleBuilder {
        SwerveModuleBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> &ModuleGeometry {
        &self.geometry
    }

    pub fn controller(&self) -> &HeadingController {
        &self.controller
    }

    pub fn command(&self) -> ModuleCommand {
        self.command
    }

    pub fn target(&self) -> HeadingTarget {
        self.target
    }

    pub fn target_local_velocity(&self) -> Vector2 {
        self.target_local_velocity
    }

    /// Magnitude of the target local velocity
    pub fn target_speed(&self) -> f64 {
        self.target_local_velocity.norm()
    }

    /// Measured heading in degrees, (-180, 180]
    ///
    /// A non-finite reading falls back to the last good heading.
    pub fn measured_heading_deg(&mut self) -> f64 {
        let raw = self.sensor.read_absolute_angle_degrees();
        let corrected = raw - self.angle_offset_deg;
        let signed = if self.sensor_inverted { -corrected } else { corrected };
        let heading = wrap_degrees(signed);
        if heading.is_finite() {
            self.last_heading_deg = heading;
        }
        self.last_heading_deg
    }

    /// Command phase: derive target velocity and heading from a chassis command
    pub fn update_local_velocity(&mut self, chassis_velocity: Vector2, rotation_rate: f64) {
        self.command = ModuleCommand {
            chassis_velocity,
            rotation_rate,
        };
        self.apply_command();
    }

    /// Move the pivot, then re-apply the latest command against the new geometry
    pub fn update_center_of_rotation(&mut self, center_of_rotation: Vector2) {
        if center_of_rotation == self.geometry.center_of_rotation() {
            return;
        }
        self.geometry.set_center_of_rotation(center_of_rotation);
        info!(
            module = %self.name,
            center_of_rotation = %center_of_rotation,
            "center of rotation updated"
        );
        self.apply_command();
    }

    fn apply_command(&mut self) {
        let ModuleCommand {
            chassis_velocity,
            rotation_rate,
        } = self.command;
        self.target_local_velocity = self.geometry.local_velocity(chassis_velocity, rotation_rate);
        self.retarget();
    }

    /// Re-derive the heading setpoint from the current target local velocity
    fn retarget(&mut self) {
        let current = self.measured_heading_deg();
        match kinematics::target_heading(self.target_local_velocity, current) {
            Some(target) => {
                if target.reversed {
                    debug!(
                        module = %self.name,
                        current,
                        target = target.target_heading_deg,
                        "flipping heading, wheel drives reversed"
                    );
                }
                self.target = target;
                self.controller.set_setpoint(target.target_heading_deg);
            }
            None => {
                // No direction to steer to; hold the previous heading
                debug!(module = %self.name, "zero local velocity, holding heading");
            }
        }
    }

    /// Rescale the target local velocity to `speed` along its current direction
    ///
    /// A negative speed points the target the other way, so the heading is re-derived.
    /// Does nothing while the target velocity is zero.
    pub fn set_target_speed(&mut self, speed: f64) {
        match self.target_local_velocity.normalize() {
            Ok(direction) => {
                self.target_local_velocity = direction * speed;
                self.retarget();
            }
            Err(_) => debug!(module = %self.name, "cannot rescale zero target velocity"),
        }
    }

    /// Control phase: read the sensor and drive both actuators
    pub fn periodic(&mut self) -> ModuleOutput {
        let measured = self.measured_heading_deg();

        let speed = kinematics::drive_speed(self.target_local_velocity, measured);
        let drive = speed * self.drive_output_scale;
        self.drive.set_drive_command(drive);

        let steering = self.controller.calculate(measured);
        self.steering.set_steering_command(steering);

        ModuleOutput {
            measured_heading_deg: measured,
            target_heading_deg: self.target.target_heading_deg,
            reversed: self.target.reversed,
            speed,
            drive,
            steering,
            at_setpoint: self.controller.at_setpoint(),
        }
    }
}

/// Collects the module's parts; `build` refuses to produce a partially wired module
pub struct SwerveModuleBuilder {
    name: String,
    sensor: Option<Box<dyn AngleSensor>>,
    drive: Option<Box<dyn DriveActuator>>,
    steering: Option<Box<dyn SteeringActuator>>,
    position: Option<Vector2>,
    center_of_rotation: Option<Vector2>,
    angle_offset_deg: Option<f64>,
    sensor_inverted: bool,
    gains: HeadingGains,
    period_s: f64,
    drive_output_scale: f64,
}

impl SwerveModuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sensor: None,
            drive: None,
            steering: None,
            position: None,
            center_of_rotation: None,
            angle_offset_deg: None,
            sensor_inverted: false,
            gains: HeadingGains::default(),
            period_s: DEFAULT_PERIOD_S,
            drive_output_scale: 1.0,
        }
    }

    pub fn angle_sensor(mut self, sensor: impl AngleSensor + 'static) -> Self {
        self.sensor = Some(Box::new(sensor));
        self
    }

    pub fn drive_actuator(mut self, drive: impl DriveActuator + 'static) -> Self {
        self.drive = Some(Box::new(drive));
        self
    }

    pub fn steering_actuator(mut self, steering: impl SteeringActuator + 'static) -> Self {
        self.steering = Some(Box::new(steering));
        self
    }

    pub fn position(mut self, position: Vector2) -> Self {
        self.position = Some(position);
        self
    }

    pub fn center_of_rotation(mut self, center_of_rotation: Vector2) -> Self {
        self.center_of_rotation = Some(center_of_rotation);
        self
    }

    pub fn angle_offset_deg(mut self, offset: f64) -> Self {
        self.angle_offset_deg = Some(offset);
        self
    }

    pub fn sensor_inverted(mut self, inverted: bool) -> Self {
        self.sensor_inverted = inverted;
        self
    }

    pub fn heading_gains(mut self, gains: HeadingGains) -> Self {
        self.gains = gains;
        self
    }

    pub fn period_s(mut self, period_s: f64) -> Self {
        self.period_s = period_s;
        self
    }

    pub fn drive_output_scale(mut self, scale: f64) -> Self {
        self.drive_output_scale = scale;
        self
    }

    fn missing(&self, field: &'static str) -> ConfigError {
        ConfigError::MissingField {
            module: self.name.clone(),
            field,
        }
    }

    pub fn build(self) -> Result<SwerveModule, ConfigError> {
        let position = self.position.ok_or_else(|| self.missing("position"))?;
        let center_of_rotation = self
            .center_of_rotation
            .ok_or_else(|| self.missing("center_of_rotation"))?;
        let angle_offset_deg = self
            .angle_offset_deg
            .ok_or_else(|| self.missing("angle_offset_deg"))?;

        if !position.is_finite() || !center_of_rotation.is_finite() || !angle_offset_deg.is_finite() {
            return Err(ConfigError::InvalidGeometry {
                module: self.name,
                reason: "position, center of rotation and sensor offset must be finite".to_string(),
            });
        }
        validate_gains(&self.gains)?;
        if !(self.period_s.is_finite() && self.period_s > 0.0) {
            return Err(ConfigError::InvalidGain {
                name: "period_s",
                value: self.period_s,
            });
        }
        if !self.drive_output_scale.is_finite() {
            return Err(ConfigError::InvalidGain {
                name: "drive_output_scale",
                value: self.drive_output_scale,
            });
        }

        let sensor = self.sensor.ok_or_else(|| ConfigError::MissingField {
            module: self.name.clone(),
            field: "angle_sensor",
        })?;
        let drive = self.drive.ok_or_else(|| ConfigError::MissingField {
            module: self.name.clone(),
            field: "drive_actuator",
        })?;
        let steering = self.steering.ok_or_else(|| ConfigError::MissingField {
            module: self.name.clone(),
            field: "steering_actuator",
        })?;

        let geometry = ModuleGeometry::new(position, center_of_rotation);
        info!(
            module = %self.name,
            position = %position,
            center_of_rotation = %center_of_rotation,
            angle_offset_deg,
            "swerve module configured"
        );

        let mut module = SwerveModule {
            name: self.name,
            geometry,
            angle_offset_deg,
            sensor_inverted: self.sensor_inverted,
            drive_output_scale: self.drive_output_scale,
            sensor,
            drive,
            steering,
            controller: HeadingController::new(self.gains, self.period_s),
            command: ModuleCommand::default(),
            target_local_velocity: Vector2::ZERO,
            target: HeadingTarget {
                target_heading_deg: 0.0,
                reversed: false,
            },
            last_heading_deg: 0.0,
        };

        // Start by holding whatever heading the wheel is already at
        let current = module.measured_heading_deg();
        module.target.target_heading_deg = current;
        module.controller.set_setpoint(current);
        Ok(module)
    }
}

/// Reject gains a controller can't run with
pub fn validate_gains(gains: &HeadingGains) -> Result<(), ConfigError> {
    let checks: [(&'static str, f64, bool); 5] = [
        ("kp", gains.kp, gains.kp >= 0.0),
        ("ki", gains.ki, gains.ki >= 0.0),
        ("kd", gains.kd, gains.kd >= 0.0),
        ("tolerance_deg", gains.tolerance_deg, gains.tolerance_deg > 0.0),
        ("output_limit", gains.output_limit, gains.output_limit > 0.0),
    ];
    for (name, value, ok) in checks {
        if !value.is_finite() || !ok {
            return Err(ConfigError::InvalidGain { name, value });
        }
    }
    Ok(())
}
